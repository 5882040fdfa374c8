//! Configuration for the voice avatar
//!
//! Provides centralized configuration for all components. Every field has a
//! default, so a TOML file only needs the values it wants to change.

use crate::{AvatarError, Result};
use serde::Deserialize;
use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

/// Default system prompt seeded into every conversation
pub const DEFAULT_SYSTEM_PROMPT: &str = "You are a helpful, friendly, and concise AI assistant. \
Always respond in English in a conversational human-like style. \
Keep your responses brief and engaging.";

/// Reply substituted when the chat endpoint fails
pub const DEFAULT_FALLBACK_REPLY: &str =
    "Sorry, something went wrong. Please try again in a moment.";

/// Complete application configuration
#[derive(Clone, Debug, Default, Deserialize)]
#[serde(default)]
pub struct AppConfig {
    /// Chat endpoint settings
    pub server: ServerConfig,
    /// Speech recognition settings
    pub listening: ListeningConfig,
    /// Speech synthesis settings
    pub speech: SpeechConfig,
    /// Conversation settings
    pub conversation: ConversationConfig,
    /// UI settings
    pub ui: UiConfig,
}

/// Chat endpoint settings
#[derive(Clone, Debug, Deserialize)]
#[serde(default)]
pub struct ServerConfig {
    /// Base URL the `/api/...` paths are appended to
    pub base_url: String,
    /// Request timeout in milliseconds
    pub request_timeout_ms: u64,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            base_url: "http://127.0.0.1:8000".to_string(),
            request_timeout_ms: 30_000,
        }
    }
}

/// Speech recognition settings
#[derive(Clone, Debug, Deserialize)]
#[serde(default)]
pub struct ListeningConfig {
    /// Recognition language tag
    pub language: String,
    /// Silence after which a listening session is recycled
    pub silence_timeout_ms: u64,
    /// Delay before recognition restarts after a session ends
    pub restart_delay_ms: u64,
    /// Delay before retrying when the recognizer reports it is still running
    pub retry_delay_ms: u64,
    /// Microphone backend: give up on a session with no speech after this long
    pub no_speech_timeout_ms: u64,
    /// Microphone backend: trailing silence that ends an utterance
    pub end_of_speech_ms: u64,
    /// Microphone backend: RMS level above which audio counts as speech
    pub energy_threshold: f32,
    /// Microphone backend: path to the Whisper model
    pub whisper_model: PathBuf,
}

impl Default for ListeningConfig {
    fn default() -> Self {
        Self {
            language: "en-US".to_string(),
            silence_timeout_ms: 5_000,
            restart_delay_ms: 1_000,
            retry_delay_ms: 500,
            no_speech_timeout_ms: 8_000,
            end_of_speech_ms: 800,
            energy_threshold: 0.02,
            whisper_model: PathBuf::from("models/ggml-base.en.bin"),
        }
    }
}

impl ListeningConfig {
    pub fn silence_timeout(&self) -> Duration {
        Duration::from_millis(self.silence_timeout_ms)
    }

    pub fn restart_delay(&self) -> Duration {
        Duration::from_millis(self.restart_delay_ms)
    }

    pub fn retry_delay(&self) -> Duration {
        Duration::from_millis(self.retry_delay_ms)
    }
}

/// Speech synthesis settings
#[derive(Clone, Debug, Deserialize)]
#[serde(default)]
pub struct SpeechConfig {
    /// Substring of the voice name to prefer
    pub preferred_voice: String,
    /// Locale used when the preferred voice is missing
    pub locale: String,
    /// Speaking rate (0.1 to 10.0)
    pub rate: f32,
    /// Pitch (0.0 to 2.0)
    pub pitch: f32,
    /// Text-only backend: reading speed used to pace utterances
    pub words_per_minute: u32,
    /// Audio backend: which engine speaks replies
    pub engine: SpeechEngine,
    /// Local engine: VITS model file
    pub vits_model: PathBuf,
    /// Local engine: token table of the model
    pub vits_tokens: PathBuf,
    /// Local engine: espeak-ng data directory, empty when the model has a lexicon
    pub vits_data_dir: PathBuf,
    /// Voices offered by the local engine
    pub voices: Vec<VoiceProfile>,
}

impl Default for SpeechConfig {
    fn default() -> Self {
        Self {
            preferred_voice: "David".to_string(),
            locale: "en-US".to_string(),
            rate: 1.0,
            pitch: 1.0,
            words_per_minute: 180,
            engine: SpeechEngine::default(),
            vits_model: PathBuf::from("models/vits/model.onnx"),
            vits_tokens: PathBuf::from("models/vits/tokens.txt"),
            vits_data_dir: PathBuf::from("models/vits/espeak-ng-data"),
            voices: vec![
                VoiceProfile::new("David", "en-US", 0),
                VoiceProfile::new("Zira", "en-US", 1),
                VoiceProfile::new("Hazel", "en-GB", 2),
            ],
        }
    }
}

/// Engine used by the audio build to speak replies
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SpeechEngine {
    /// On-device VITS synthesis
    #[default]
    Local,
    /// The server's `/api/tts` endpoint
    Remote,
}

/// A named voice of a multi-speaker model
#[derive(Clone, Debug, PartialEq, Eq, Deserialize)]
pub struct VoiceProfile {
    pub name: String,
    pub locale: String,
    /// Speaker index inside the model
    pub speaker_id: i32,
}

impl VoiceProfile {
    pub fn new(name: impl Into<String>, locale: impl Into<String>, speaker_id: i32) -> Self {
        Self {
            name: name.into(),
            locale: locale.into(),
            speaker_id,
        }
    }
}

/// Conversation settings
#[derive(Clone, Debug, Deserialize)]
#[serde(default)]
pub struct ConversationConfig {
    /// System prompt seeded at the start of the history (empty for none)
    pub system_prompt: String,
    /// Reply used when the chat endpoint fails
    pub fallback_reply: String,
}

impl Default for ConversationConfig {
    fn default() -> Self {
        Self {
            system_prompt: DEFAULT_SYSTEM_PROMPT.to_string(),
            fallback_reply: DEFAULT_FALLBACK_REPLY.to_string(),
        }
    }
}

/// UI settings
#[derive(Clone, Debug, Default, Deserialize)]
#[serde(default)]
pub struct UiConfig {
    /// Show the debug panel at startup
    pub debug: bool,
}

impl AppConfig {
    /// Load a configuration from a TOML file
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        let content = fs::read_to_string(path).map_err(|e| {
            AvatarError::ConfigError(format!("Failed to read {}: {}", path.display(), e))
        })?;
        Self::from_toml_str(&content)
    }

    /// Parse and validate a configuration from TOML text
    pub fn from_toml_str(content: &str) -> Result<Self> {
        let config: AppConfig = toml::from_str(content)
            .map_err(|e| AvatarError::ConfigError(format!("Invalid configuration: {}", e)))?;
        config.validate()?;
        Ok(config)
    }

    /// Set the chat endpoint base URL
    pub fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
        self.server.base_url = base_url.into();
        self
    }

    /// Validate the configuration
    pub fn validate(&self) -> Result<()> {
        if self.server.base_url.trim().is_empty() {
            return Err(AvatarError::ConfigError(
                "server.base_url must not be empty".to_string(),
            ));
        }

        let durations = [
            ("server.request_timeout_ms", self.server.request_timeout_ms),
            ("listening.silence_timeout_ms", self.listening.silence_timeout_ms),
            ("listening.restart_delay_ms", self.listening.restart_delay_ms),
            ("listening.retry_delay_ms", self.listening.retry_delay_ms),
            ("listening.no_speech_timeout_ms", self.listening.no_speech_timeout_ms),
            ("listening.end_of_speech_ms", self.listening.end_of_speech_ms),
        ];
        for (name, value) in durations {
            if value == 0 {
                return Err(AvatarError::ConfigError(format!(
                    "{} must be greater than 0",
                    name
                )));
            }
        }

        if !(0.1..=10.0).contains(&self.speech.rate) {
            return Err(AvatarError::ConfigError(format!(
                "speech.rate must be between 0.1 and 10.0, got {}",
                self.speech.rate
            )));
        }

        if !(0.0..=2.0).contains(&self.speech.pitch) {
            return Err(AvatarError::ConfigError(format!(
                "speech.pitch must be between 0.0 and 2.0, got {}",
                self.speech.pitch
            )));
        }

        if self.speech.words_per_minute == 0 {
            return Err(AvatarError::ConfigError(
                "speech.words_per_minute must be greater than 0".to_string(),
            ));
        }

        for voice in &self.speech.voices {
            if voice.name.trim().is_empty() || voice.speaker_id < 0 {
                return Err(AvatarError::ConfigError(format!(
                    "speech.voices entry {:?} needs a name and a non-negative speaker_id",
                    voice.name
                )));
            }
        }

        if self.conversation.fallback_reply.trim().is_empty() {
            return Err(AvatarError::ConfigError(
                "conversation.fallback_reply must not be empty".to_string(),
            ));
        }

        Ok(())
    }
}
