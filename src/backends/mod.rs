//! Concrete speech backends
//!
//! The default build ships text stand-ins: typed input plays the part of the
//! recognizer and replies are "spoken" as paced text. With the `audio-io`
//! feature, the microphone is transcribed locally with Whisper and replies
//! are spoken by a local VITS model, or by the server's TTS endpoint when
//! configured.

pub mod keyboard;
pub mod paced;
pub mod voices;

#[cfg(feature = "audio-io")]
pub mod microphone;
#[cfg(feature = "audio-io")]
mod playback;
#[cfg(feature = "audio-io")]
pub mod remote;
#[cfg(feature = "audio-io")]
pub mod vits;

pub use keyboard::{keyboard_backend, KeyboardInput, KeyboardRecognizer};
pub use paced::{speaking_duration, PacedSynthesizer};

#[cfg(feature = "audio-io")]
pub use microphone::MicrophoneRecognizer;
#[cfg(feature = "audio-io")]
pub use remote::RemoteSynthesizer;
#[cfg(feature = "audio-io")]
pub use vits::VitsSynthesizer;
