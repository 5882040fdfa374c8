//! Error types for the voice avatar
//!
//! A single error enum covers every layer: speech capabilities, the chat
//! endpoint, the voice loop plumbing and configuration.

use thiserror::Error;

/// Voice avatar errors
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum AvatarError {
    /// A speech capability (microphone, recognition, synthesis) does not exist
    #[error("Capability unavailable: {0}")]
    CapabilityUnavailable(String),

    /// The user or the platform refused microphone access
    #[error("Permission denied: {0}")]
    PermissionDenied(String),

    /// The recognizer refused to start because a session is still running
    #[error("Recognition already started")]
    RecognitionBusy,

    /// Speech recognition failed
    #[error("Recognition error: {0}")]
    RecognitionError(String),

    /// Speech synthesis failed
    #[error("Synthesis error: {0}")]
    SynthesisError(String),

    /// The chat endpoint could not be reached or answered badly
    #[error("Chat error: {0}")]
    ChatError(String),

    /// Audio device initialization or operation error
    #[error("Audio device error: {0}")]
    AudioDeviceError(String),

    /// Channel communication error
    #[error("Channel error: {0}")]
    ChannelError(String),

    /// File system I/O error
    #[error("IO error: {0}")]
    IOError(String),

    /// Configuration error
    #[error("Configuration error: {0}")]
    ConfigError(String),
}

impl From<std::io::Error> for AvatarError {
    fn from(e: std::io::Error) -> Self {
        AvatarError::IOError(e.to_string())
    }
}

impl From<reqwest::Error> for AvatarError {
    fn from(e: reqwest::Error) -> Self {
        AvatarError::ChatError(e.to_string())
    }
}

impl AvatarError {
    /// Check if this error is recoverable
    ///
    /// Unrecoverable errors disable voice input for the rest of the session;
    /// everything else is retried or replaced by a fallback.
    pub fn is_recoverable(&self) -> bool {
        match self {
            AvatarError::CapabilityUnavailable(_) => false,
            AvatarError::PermissionDenied(_) => false,
            AvatarError::RecognitionBusy => true,
            AvatarError::RecognitionError(_) => true,
            AvatarError::SynthesisError(_) => true,
            AvatarError::ChatError(_) => true,
            AvatarError::AudioDeviceError(_) => false,
            AvatarError::ChannelError(_) => false,
            AvatarError::IOError(_) => false,
            AvatarError::ConfigError(_) => false,
        }
    }

    /// Get a user-friendly description of the error
    pub fn user_message(&self) -> String {
        match self {
            AvatarError::CapabilityUnavailable(_) => {
                "Microphone access not supported. Please check your audio setup.".to_string()
            }
            AvatarError::PermissionDenied(_) => {
                "Microphone access denied. Please allow microphone access to use voice features."
                    .to_string()
            }
            AvatarError::RecognitionBusy | AvatarError::RecognitionError(_) => {
                "Speech recognition failed. Please try again.".to_string()
            }
            AvatarError::SynthesisError(_) => {
                "Text-to-speech failed. The reply is shown as text.".to_string()
            }
            AvatarError::ChatError(_) => "Server error. Please check backend.".to_string(),
            AvatarError::AudioDeviceError(_) => {
                "Audio device error. Please check your microphone/speakers.".to_string()
            }
            AvatarError::ChannelError(_) => {
                "Internal communication error. Please restart the application.".to_string()
            }
            AvatarError::IOError(_) => "File system error occurred.".to_string(),
            AvatarError::ConfigError(_) => {
                "Configuration error. Please check settings.".to_string()
            }
        }
    }
}

/// Result type alias for voice avatar operations
pub type Result<T> = std::result::Result<T, AvatarError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_terminal_errors_are_not_recoverable() {
        assert!(!AvatarError::PermissionDenied("mic".into()).is_recoverable());
        assert!(!AvatarError::CapabilityUnavailable("mic".into()).is_recoverable());
        assert!(AvatarError::RecognitionBusy.is_recoverable());
        assert!(AvatarError::ChatError("500".into()).is_recoverable());
    }

    #[test]
    fn test_permission_message_mentions_microphone() {
        let message = AvatarError::PermissionDenied("not-allowed".into()).user_message();
        assert!(message.contains("Microphone access denied"));
    }

    #[test]
    fn test_io_error_conversion() {
        let io = std::io::Error::new(std::io::ErrorKind::NotFound, "missing");
        let err: AvatarError = io.into();
        assert!(matches!(err, AvatarError::IOError(_)));
    }
}
