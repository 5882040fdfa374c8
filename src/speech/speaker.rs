//! Reply playback
//!
//! The speaker owns the single active utterance. Starting a new one cancels
//! the previous one, and events for utterances that are no longer current are
//! dropped.

use crate::config::SpeechConfig;
use crate::speech::synthesis::{SpeechEvent, Synthesizer, Utterance, Voice};
use crate::{AvatarError, Result};
use tracing::{debug, info, warn};

/// Voice selection and prosody
#[derive(Clone, Debug)]
pub struct SpeakerConfig {
    /// Substring of the preferred voice name
    pub preferred_voice: String,
    /// Locale used when the preferred voice is missing
    pub locale: String,
    pub rate: f32,
    pub pitch: f32,
}

impl Default for SpeakerConfig {
    fn default() -> Self {
        Self::from(&SpeechConfig::default())
    }
}

impl From<&SpeechConfig> for SpeakerConfig {
    fn from(config: &SpeechConfig) -> Self {
        Self {
            preferred_voice: config.preferred_voice.clone(),
            locale: config.locale.clone(),
            rate: config.rate,
            pitch: config.pitch,
        }
    }
}

/// Signals reported to the coordinator
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum SpeakerOutput {
    Started,
    /// Playback finished naturally
    Finished,
    /// Playback was cancelled by `stop()`
    Stopped,
    Failed(String),
}

/// Pick a voice: preferred name, then locale, then the first one
pub fn select_voice(voices: &[Voice], preferred: &str, locale: &str) -> Option<Voice> {
    let by_name = (!preferred.is_empty())
        .then(|| voices.iter().find(|v| v.name.contains(preferred)))
        .flatten();

    by_name
        .or_else(|| voices.iter().find(|v| v.locale == locale))
        .or_else(|| voices.first())
        .cloned()
}

pub struct Speaker {
    synthesizer: Box<dyn Synthesizer>,
    config: SpeakerConfig,
    current: Option<u64>,
    next_id: u64,
}

impl Speaker {
    pub fn new(synthesizer: Box<dyn Synthesizer>, config: SpeakerConfig) -> Self {
        Self {
            synthesizer,
            config,
            current: None,
            next_id: 1,
        }
    }

    pub fn is_speaking(&self) -> bool {
        self.current.is_some()
    }

    /// Speak `text`, replacing anything in flight. Returns the utterance id.
    pub fn speak(&mut self, text: &str) -> Result<u64> {
        if !self.synthesizer.is_available() {
            return Err(AvatarError::CapabilityUnavailable(
                "speech synthesis".to_string(),
            ));
        }

        if self.current.take().is_some() {
            debug!("Cancelling previous utterance");
            self.synthesizer.cancel();
        }

        let voices = self.synthesizer.voices();
        let voice = select_voice(&voices, &self.config.preferred_voice, &self.config.locale);
        match &voice {
            Some(v) => debug!("Using voice {} ({})", v.name, v.locale),
            None => debug!("No voices reported, using synthesizer default"),
        }

        let id = self.next_id;
        self.next_id += 1;

        self.synthesizer.speak(Utterance {
            id,
            text: text.to_string(),
            voice,
            rate: self.config.rate,
            pitch: self.config.pitch,
        })?;

        self.current = Some(id);
        info!("Speaking utterance {}", id);
        Ok(id)
    }

    /// Cancel playback. Returns `Stopped` if something was playing.
    pub fn stop(&mut self) -> Option<SpeakerOutput> {
        self.current.take().map(|id| {
            info!("Stopping utterance {}", id);
            self.synthesizer.cancel();
            SpeakerOutput::Stopped
        })
    }

    /// Feed a synthesizer callback
    pub fn handle_event(&mut self, event: SpeechEvent) -> Option<SpeakerOutput> {
        let utterance = match &event {
            SpeechEvent::Started { utterance }
            | SpeechEvent::Ended { utterance }
            | SpeechEvent::Failed { utterance, .. } => *utterance,
        };

        if self.current != Some(utterance) {
            debug!("Ignoring event for stale utterance {}", utterance);
            return None;
        }

        match event {
            SpeechEvent::Started { .. } => Some(SpeakerOutput::Started),
            SpeechEvent::Ended { .. } => {
                self.current = None;
                Some(SpeakerOutput::Finished)
            }
            SpeechEvent::Failed { reason, .. } => {
                warn!("Speech synthesis failed: {}", reason);
                self.current = None;
                Some(SpeakerOutput::Failed(reason))
            }
        }
    }
}
