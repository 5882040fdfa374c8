//! Speech input and output
//!
//! This module provides:
//! - Recognizer and synthesizer traits implemented by the backends
//! - The transcriber, which keeps recognition listening between turns
//! - The speaker, which plays replies and supports cancellation

pub mod recognition;
pub mod speaker;
pub mod synthesis;
pub mod transcriber;

// Re-export commonly used types
pub use recognition::{RecognitionErrorKind, RecognitionEvent, Recognizer};
pub use speaker::{select_voice, Speaker, SpeakerConfig, SpeakerOutput};
pub use synthesis::{SpeechEvent, Synthesizer, Utterance, Voice};
pub use transcriber::{Transcriber, TranscriberConfig, TranscriberOutput};
