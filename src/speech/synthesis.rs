//! Speech synthesizer abstraction

use crate::Result;

/// A synthesis voice
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Voice {
    pub name: String,
    /// BCP 47 language tag, e.g. `en-US`
    pub locale: String,
}

impl Voice {
    pub fn new(name: impl Into<String>, locale: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            locale: locale.into(),
        }
    }
}

/// One request to speak
#[derive(Clone, Debug, PartialEq)]
pub struct Utterance {
    /// Identifies this utterance in `SpeechEvent`s
    pub id: u64,
    pub text: String,
    pub voice: Option<Voice>,
    pub rate: f32,
    pub pitch: f32,
}

/// Progress of an utterance
#[derive(Clone, Debug, PartialEq)]
pub enum SpeechEvent {
    Started { utterance: u64 },
    /// Playback finished naturally
    Ended { utterance: u64 },
    Failed { utterance: u64, reason: String },
}

/// Platform speech synthesis facility
///
/// `cancel()` stops playback without emitting `Ended` for the cancelled
/// utterance.
pub trait Synthesizer: Send {
    fn is_available(&self) -> bool {
        true
    }

    fn voices(&self) -> Vec<Voice>;

    fn speak(&mut self, utterance: Utterance) -> Result<()>;

    fn cancel(&mut self);
}
