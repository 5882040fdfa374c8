//! Turn state and the shared status the UI renders
//!
//! The coordinator is the only writer of this state. The UI holds a clone of
//! `SharedVoiceState` and reads snapshots every frame.

use chrono::Local;
use parking_lot::RwLock;
use std::collections::VecDeque;
use std::sync::Arc;

/// Maximum number of debug log lines kept for the debug panel
pub const DEBUG_LOG_CAPACITY: usize = 100;

/// Position in the listen/think/speak cycle
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash)]
pub enum TurnState {
    /// Waiting for recognition to (re)start
    #[default]
    Idle,
    /// Recognition session running
    Listening,
    /// Waiting for the chat endpoint
    Thinking,
    /// Reply being spoken
    Speaking,
}

impl TurnState {
    pub fn is_idle(&self) -> bool {
        matches!(self, TurnState::Idle)
    }

    pub fn is_listening(&self) -> bool {
        matches!(self, TurnState::Listening)
    }

    pub fn is_speaking(&self) -> bool {
        matches!(self, TurnState::Speaking)
    }

    /// Thinking or speaking: recognition must not run
    pub fn is_processing(&self) -> bool {
        matches!(self, TurnState::Thinking | TurnState::Speaking)
    }
}

impl std::fmt::Display for TurnState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            TurnState::Idle => write!(f, "idle"),
            TurnState::Listening => write!(f, "listening"),
            TurnState::Thinking => write!(f, "thinking"),
            TurnState::Speaking => write!(f, "speaking"),
        }
    }
}

/// Severity of a debug log line
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum LogLevel {
    Info,
    Success,
    Warning,
    Error,
}

/// One line in the debug panel
#[derive(Clone, Debug)]
pub struct DebugLine {
    pub time: String,
    pub level: LogLevel,
    pub message: String,
}

/// Status snapshot rendered by the UI
#[derive(Clone, Debug, Default)]
pub struct VoiceStatus {
    /// Current turn state
    pub turn: TurnState,
    /// Stop control is bound to active speech
    pub stop_enabled: bool,
    /// Listening visualizer is animating
    pub visualizer_active: bool,
    /// Terminal microphone problem shown to the user
    pub mic_error: Option<String>,
    /// Server problem replacing the normal status line
    pub server_status: Option<String>,
    /// Recent debug lines, oldest first
    pub debug_log: VecDeque<DebugLine>,
}

impl VoiceStatus {
    pub fn new() -> Self {
        Self {
            debug_log: VecDeque::with_capacity(DEBUG_LOG_CAPACITY),
            ..Default::default()
        }
    }

    pub fn add_log(&mut self, level: LogLevel, message: impl Into<String>) {
        if self.debug_log.len() >= DEBUG_LOG_CAPACITY {
            self.debug_log.pop_front();
        }
        self.debug_log.push_back(DebugLine {
            time: Local::now().format("%H:%M:%S").to_string(),
            level,
            message: message.into(),
        });
    }
}

/// Thread-safe shared voice status
#[derive(Clone, Default)]
pub struct SharedVoiceState {
    inner: Arc<RwLock<VoiceStatus>>,
}

impl SharedVoiceState {
    pub fn new() -> Self {
        Self {
            inner: Arc::new(RwLock::new(VoiceStatus::new())),
        }
    }

    /// Get a write lock on the status
    pub fn write(&self) -> parking_lot::RwLockWriteGuard<'_, VoiceStatus> {
        self.inner.write()
    }

    /// Copy of the current status (no lock held after return)
    pub fn snapshot(&self) -> VoiceStatus {
        self.inner.read().clone()
    }

    pub fn turn(&self) -> TurnState {
        self.inner.read().turn
    }

    pub fn is_stop_enabled(&self) -> bool {
        self.inner.read().stop_enabled
    }

    pub fn is_visualizer_active(&self) -> bool {
        self.inner.read().visualizer_active
    }

    pub fn mic_error(&self) -> Option<String> {
        self.inner.read().mic_error.clone()
    }

    pub fn server_status(&self) -> Option<String> {
        self.inner.read().server_status.clone()
    }

    pub fn log(&self, level: LogLevel, message: impl Into<String>) {
        self.inner.write().add_log(level, message);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_processing_states() {
        assert!(!TurnState::Idle.is_processing());
        assert!(!TurnState::Listening.is_processing());
        assert!(TurnState::Thinking.is_processing());
        assert!(TurnState::Speaking.is_processing());
    }

    #[test]
    fn test_display_matches_state_names() {
        assert_eq!(TurnState::Idle.to_string(), "idle");
        assert_eq!(TurnState::Speaking.to_string(), "speaking");
    }

    #[test]
    fn test_debug_log_is_bounded() {
        let shared = SharedVoiceState::new();
        for i in 0..(DEBUG_LOG_CAPACITY + 10) {
            shared.log(LogLevel::Info, format!("line {}", i));
        }

        let snapshot = shared.snapshot();
        assert_eq!(snapshot.debug_log.len(), DEBUG_LOG_CAPACITY);
        assert_eq!(
            snapshot.debug_log.front().map(|l| l.message.as_str()),
            Some("line 10")
        );
    }

    #[test]
    fn test_snapshot_is_independent() {
        let shared = SharedVoiceState::new();
        let before = shared.snapshot();

        shared.write().turn = TurnState::Listening;

        assert!(before.turn.is_idle());
        assert!(shared.turn().is_listening());
    }
}
