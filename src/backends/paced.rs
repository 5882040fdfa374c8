//! Text-only speech output
//!
//! Replies are shown in the chat log; this synthesizer only reproduces the
//! timing of speech so the turn cycle behaves as if the reply were read out.

use crate::events::{EventSender, LoopEvent};
use crate::speech::synthesis::{SpeechEvent, Synthesizer, Utterance, Voice};
use crate::{AvatarError, Result};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::thread;
use std::time::{Duration, Instant};
use tracing::debug;

const MIN_DURATION: Duration = Duration::from_millis(300);
const POLL_INTERVAL: Duration = Duration::from_millis(20);

/// How long reading `text` takes at `words_per_minute`, scaled by `rate`
pub fn speaking_duration(text: &str, words_per_minute: u32, rate: f32) -> Duration {
    let words = text.split_whitespace().count().max(1) as f64;
    let secs = words * 60.0 / words_per_minute.max(1) as f64 / rate.max(0.1) as f64;
    Duration::from_secs_f64(secs).max(MIN_DURATION)
}

pub struct PacedSynthesizer {
    event_tx: EventSender,
    words_per_minute: u32,
    /// Utterance currently playing, 0 for none
    current: Arc<AtomicU64>,
}

impl PacedSynthesizer {
    pub fn new(event_tx: EventSender, words_per_minute: u32) -> Self {
        Self {
            event_tx,
            words_per_minute,
            current: Arc::new(AtomicU64::new(0)),
        }
    }
}

impl Synthesizer for PacedSynthesizer {
    fn voices(&self) -> Vec<Voice> {
        vec![Voice::new("Text Reader", "en-US")]
    }

    fn speak(&mut self, utterance: Utterance) -> Result<()> {
        let id = utterance.id;
        let duration = speaking_duration(&utterance.text, self.words_per_minute, utterance.rate);
        debug!("Pacing utterance {} for {:?}", id, duration);

        self.current.store(id, Ordering::SeqCst);
        self.event_tx
            .send(LoopEvent::Speech(SpeechEvent::Started { utterance: id }))
            .map_err(|e| AvatarError::SynthesisError(format!("Failed to send event: {}", e)))?;

        let current = Arc::clone(&self.current);
        let event_tx = self.event_tx.clone();
        thread::Builder::new()
            .name("paced-speech".to_string())
            .spawn(move || {
                let deadline = Instant::now() + duration;
                while Instant::now() < deadline {
                    if current.load(Ordering::SeqCst) != id {
                        return;
                    }
                    thread::sleep(POLL_INTERVAL);
                }
                if current
                    .compare_exchange(id, 0, Ordering::SeqCst, Ordering::SeqCst)
                    .is_ok()
                {
                    let _ = event_tx.send(LoopEvent::Speech(SpeechEvent::Ended { utterance: id }));
                }
            })
            .map_err(|e| AvatarError::SynthesisError(format!("Failed to spawn: {}", e)))?;

        Ok(())
    }

    fn cancel(&mut self) {
        self.current.store(0, Ordering::SeqCst);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn utterance(id: u64, text: &str) -> Utterance {
        Utterance {
            id,
            text: text.to_string(),
            voice: None,
            rate: 1.0,
            pitch: 1.0,
        }
    }

    #[test]
    fn test_duration_scales_with_words_and_rate() {
        let ten_words = "one two three four five six seven eight nine ten";
        assert_eq!(speaking_duration(ten_words, 60, 1.0), Duration::from_secs(10));
        assert_eq!(speaking_duration(ten_words, 60, 2.0), Duration::from_secs(5));
        assert_eq!(speaking_duration("", 180, 1.0), MIN_DURATION);
    }

    #[test]
    fn test_utterance_ends_naturally() {
        let (tx, rx) = crossbeam_channel::unbounded();
        let mut synth = PacedSynthesizer::new(tx, 6000);

        synth.speak(utterance(1, "Hi")).unwrap();

        assert_eq!(
            rx.recv_timeout(Duration::from_secs(1)).unwrap(),
            LoopEvent::Speech(SpeechEvent::Started { utterance: 1 })
        );
        assert_eq!(
            rx.recv_timeout(Duration::from_secs(2)).unwrap(),
            LoopEvent::Speech(SpeechEvent::Ended { utterance: 1 })
        );
    }

    #[test]
    fn test_cancel_suppresses_end() {
        let (tx, rx) = crossbeam_channel::unbounded();
        let mut synth = PacedSynthesizer::new(tx, 60);

        synth.speak(utterance(1, "a fairly long reply")).unwrap();
        synth.cancel();

        let _started = rx.recv_timeout(Duration::from_secs(1)).unwrap();
        assert!(rx.recv_timeout(Duration::from_millis(500)).is_err());
    }
}
