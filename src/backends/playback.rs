//! Sink playback shared by the audio synthesizers
//!
//! `current` holds the utterance that may play, 0 for none. Cancelling
//! stores 0; the playing sink is stopped at the next poll.

use crate::events::{EventSender, LoopEvent};
use crate::speech::synthesis::SpeechEvent;
use rodio::Sink;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::thread;
use std::time::Duration;
use tracing::debug;

const POLL_INTERVAL: Duration = Duration::from_millis(50);

pub(crate) struct Playback {
    current: Arc<AtomicU64>,
    event_tx: EventSender,
}

impl Playback {
    pub(crate) fn new(current: Arc<AtomicU64>, event_tx: EventSender) -> Self {
        Self { current, event_tx }
    }

    pub(crate) fn is_current(&self, id: u64) -> bool {
        self.current.load(Ordering::SeqCst) == id
    }

    fn emit(&self, event: SpeechEvent) {
        let _ = self.event_tx.send(LoopEvent::Speech(event));
    }

    /// Report a failure, unless the utterance was cancelled meanwhile
    pub(crate) fn fail(&self, id: u64, reason: String) {
        if self.is_current(id) {
            self.emit(SpeechEvent::Failed {
                utterance: id,
                reason,
            });
        }
    }

    /// Play what was appended to `sink` until it drains or `id` is cancelled
    pub(crate) fn play_to_end(&self, sink: &Sink, id: u64) {
        self.emit(SpeechEvent::Started { utterance: id });

        loop {
            if !self.is_current(id) {
                sink.stop();
                debug!("Utterance {} cancelled", id);
                return;
            }
            if sink.empty() {
                break;
            }
            thread::sleep(POLL_INTERVAL);
        }

        if self
            .current
            .compare_exchange(id, 0, Ordering::SeqCst, Ordering::SeqCst)
            .is_ok()
        {
            self.emit(SpeechEvent::Ended { utterance: id });
        }
    }
}
