//! Voice loop thread and the handle the UI holds

use crate::coordinator::Coordinator;
use crate::events::{EventReceiver, EventSender, LoopEvent};
use crate::messages::ChatTranscript;
use crate::state::SharedVoiceState;
use crate::{AvatarError, Result};
use crossbeam_channel::unbounded;
use std::thread::{self, JoinHandle};
use tracing::{debug, info, warn};

/// Runs the coordinator against the loop event channel
pub struct VoiceLoop {
    coordinator: Coordinator,
    event_rx: EventReceiver,
}

impl VoiceLoop {
    /// Create the loop event channel. Backends, timers and the chat worker
    /// get clones of the sender.
    pub fn channel() -> (EventSender, EventReceiver) {
        unbounded()
    }

    pub fn new(coordinator: Coordinator, event_rx: EventReceiver) -> Self {
        Self {
            coordinator,
            event_rx,
        }
    }

    /// Run on the current thread until `Shutdown` or the channel closes
    pub fn run(mut self) {
        self.coordinator.begin();

        loop {
            match self.event_rx.recv() {
                Ok(LoopEvent::Shutdown) => {
                    info!("Voice loop shutdown requested");
                    self.coordinator.handle(LoopEvent::Shutdown);
                    break;
                }
                Ok(event) => {
                    debug!("Loop event: {:?}", event);
                    self.coordinator.handle(event);
                }
                Err(_) => {
                    warn!("Event channel disconnected");
                    break;
                }
            }
        }

        info!("Voice loop stopped");
    }

    /// Run on a dedicated thread
    pub fn spawn(self, event_tx: EventSender) -> Result<VoiceLoopHandle> {
        let state = self.coordinator.state();
        let transcript = self.coordinator.transcript();

        let thread = thread::Builder::new()
            .name("voice-loop".to_string())
            .spawn(move || self.run())
            .map_err(|e| AvatarError::ChannelError(format!("Failed to spawn voice loop: {}", e)))?;

        let mut handle = VoiceLoopHandle::new(event_tx, state, transcript);
        handle.thread = Some(thread);
        Ok(handle)
    }
}

/// Handle for controlling the voice loop from the UI
pub struct VoiceLoopHandle {
    event_tx: EventSender,
    state: SharedVoiceState,
    transcript: ChatTranscript,
    thread: Option<JoinHandle<()>>,
}

impl VoiceLoopHandle {
    /// Handle over an existing channel and shared state, without a thread
    pub fn new(event_tx: EventSender, state: SharedVoiceState, transcript: ChatTranscript) -> Self {
        Self {
            event_tx,
            state,
            transcript,
            thread: None,
        }
    }

    pub fn state(&self) -> &SharedVoiceState {
        &self.state
    }

    pub fn transcript(&self) -> &ChatTranscript {
        &self.transcript
    }

    fn send(&self, event: LoopEvent) -> Result<()> {
        self.event_tx
            .send(event)
            .map_err(|e| AvatarError::ChannelError(format!("Failed to send event: {}", e)))
    }

    /// The stop control was pressed
    pub fn stop_speaking(&self) -> Result<()> {
        self.send(LoopEvent::StopSpeaking)
    }

    /// Stop the loop and wait for its thread
    pub fn shutdown(&mut self) {
        let _ = self.send(LoopEvent::Shutdown);
        if let Some(thread) = self.thread.take() {
            if thread.join().is_err() {
                warn!("Voice loop thread panicked");
            }
        }
    }
}

impl Drop for VoiceLoopHandle {
    fn drop(&mut self) {
        self.shutdown();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::AppConfig;
    use crate::speech::RecognitionEvent;
    use crate::state::TurnState;
    use crate::testing::{FakeChat, FakeRecognizer, FakeSynthesizer, ManualTimers};
    use std::time::{Duration, Instant};

    fn wait_for(mut condition: impl FnMut() -> bool) -> bool {
        let deadline = Instant::now() + Duration::from_secs(2);
        while Instant::now() < deadline {
            if condition() {
                return true;
            }
            thread::sleep(Duration::from_millis(5));
        }
        false
    }

    #[test]
    fn test_loop_processes_events_until_shutdown() {
        let (recognizer, recognizer_probe) = FakeRecognizer::new();
        let (synth, _) = FakeSynthesizer::new();
        let (chat, chat_probe) = FakeChat::new();
        let coordinator = Coordinator::new(
            &AppConfig::default(),
            Box::new(recognizer),
            Box::new(synth),
            Box::new(chat),
            Box::new(ManualTimers::new()),
        );

        let (event_tx, event_rx) = VoiceLoop::channel();
        let mut handle = VoiceLoop::new(coordinator, event_rx)
            .spawn(event_tx.clone())
            .unwrap();

        assert!(wait_for(|| chat_probe.health_checks() == 1));
        event_tx.send(LoopEvent::HealthChecked(true)).unwrap();
        event_tx
            .send(LoopEvent::Recognition(RecognitionEvent::Started))
            .unwrap();

        let state = handle.state().clone();
        assert!(wait_for(|| state.turn() == TurnState::Listening));
        assert_eq!(recognizer_probe.starts(), 1);

        handle.shutdown();
        // The receiver went away with the loop thread
        assert!(matches!(
            handle.stop_speaking(),
            Err(AvatarError::ChannelError(_))
        ));
    }
}
