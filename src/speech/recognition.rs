//! Speech recognizer abstraction
//!
//! A `Recognizer` is a one-shot recognition session: `start()` opens it, the
//! backend reports progress as `RecognitionEvent`s on the voice loop channel,
//! and every session finishes with `RecognitionEvent::Ended`.

use crate::Result;

/// Recognition error reported by a backend
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum RecognitionErrorKind {
    /// Microphone permission refused
    NotAllowed,
    /// Recognition service refused
    ServiceNotAllowed,
    /// Session ended without detecting speech
    NoSpeech,
    /// Session aborted
    Aborted,
    /// Audio capture failed
    AudioCapture,
    /// Recognition service unreachable
    Network,
    /// Anything else
    Other(String),
}

impl RecognitionErrorKind {
    /// Fatal errors disable voice input for the session
    pub fn is_fatal(&self) -> bool {
        matches!(
            self,
            RecognitionErrorKind::NotAllowed | RecognitionErrorKind::ServiceNotAllowed
        )
    }
}

impl std::fmt::Display for RecognitionErrorKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            RecognitionErrorKind::NotAllowed => write!(f, "not-allowed"),
            RecognitionErrorKind::ServiceNotAllowed => write!(f, "service-not-allowed"),
            RecognitionErrorKind::NoSpeech => write!(f, "no-speech"),
            RecognitionErrorKind::Aborted => write!(f, "aborted"),
            RecognitionErrorKind::AudioCapture => write!(f, "audio-capture"),
            RecognitionErrorKind::Network => write!(f, "network"),
            RecognitionErrorKind::Other(reason) => write!(f, "{}", reason),
        }
    }
}

/// Progress of a recognition session
#[derive(Clone, Debug, PartialEq)]
pub enum RecognitionEvent {
    /// The session is capturing audio
    Started,
    /// Voice activity detected
    SpeechDetected,
    /// Interim or final transcript
    Result { transcript: String, is_final: bool },
    /// The session is over (always the last event of a session)
    Ended,
    /// The session failed; `Ended` follows
    Error(RecognitionErrorKind),
}

/// Platform speech recognition facility
pub trait Recognizer: Send {
    /// Check capability and permission before the first session
    fn probe(&mut self) -> Result<()> {
        Ok(())
    }

    /// Open a session. Returns `AvatarError::RecognitionBusy` if one is
    /// still running.
    fn start(&mut self) -> Result<()>;

    /// Ask the running session to end; `Ended` follows
    fn stop(&mut self);
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_only_permission_errors_are_fatal() {
        assert!(RecognitionErrorKind::NotAllowed.is_fatal());
        assert!(RecognitionErrorKind::ServiceNotAllowed.is_fatal());
        assert!(!RecognitionErrorKind::NoSpeech.is_fatal());
        assert!(!RecognitionErrorKind::Aborted.is_fatal());
        assert!(!RecognitionErrorKind::Other("weird".into()).is_fatal());
    }

    #[test]
    fn test_error_display_uses_platform_codes() {
        assert_eq!(RecognitionErrorKind::NoSpeech.to_string(), "no-speech");
        assert_eq!(
            RecognitionErrorKind::ServiceNotAllowed.to_string(),
            "service-not-allowed"
        );
    }
}
