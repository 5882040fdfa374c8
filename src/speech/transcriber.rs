//! Listening session manager
//!
//! Wraps a one-shot `Recognizer` and keeps it listening: sessions that end
//! naturally, time out on silence or fail transiently are restarted after a
//! delay, unless the coordinator has suspended listening while it processes a
//! turn. Permission errors disable the transcriber for good.

use crate::config::ListeningConfig;
use crate::speech::recognition::{RecognitionErrorKind, RecognitionEvent, Recognizer};
use crate::timer::{TimerId, TimerKind, TimerSlot, Timers};
use crate::{AvatarError, Result};
use std::time::Duration;
use tracing::{debug, error, info, warn};

/// Timing for the listening cycle
#[derive(Clone, Debug)]
pub struct TranscriberConfig {
    /// No recognition activity for this long recycles the session
    pub silence_timeout: Duration,
    /// Delay between a session ending and the next one starting
    pub restart_delay: Duration,
    /// Delay before retrying when the recognizer is still busy
    pub retry_delay: Duration,
}

impl Default for TranscriberConfig {
    fn default() -> Self {
        Self::from(&ListeningConfig::default())
    }
}

impl From<&ListeningConfig> for TranscriberConfig {
    fn from(config: &ListeningConfig) -> Self {
        Self {
            silence_timeout: config.silence_timeout(),
            restart_delay: config.restart_delay(),
            retry_delay: config.retry_delay(),
        }
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
enum Phase {
    /// No session running
    Idle,
    /// `start()` accepted, waiting for `Started`
    Starting,
    /// Capturing audio
    Listening,
    /// Asked the session to stop, waiting for `Ended`
    Stopping,
    /// Terminal
    Disabled,
}

/// What the transcriber reports to the coordinator
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum TranscriberOutput {
    ListeningStarted,
    ListeningStopped,
    /// Finalized, trimmed, non-empty utterance
    Transcript(String),
    /// Voice input is off for the rest of the session; carries the user message
    Disabled(String),
}

pub struct Transcriber {
    recognizer: Box<dyn Recognizer>,
    config: TranscriberConfig,
    phase: Phase,
    /// The coordinator wants listening on
    active: bool,
    /// A turn is being processed; no restarts
    suspended: bool,
    /// A `Started` was seen for the running session
    capturing: bool,
    silence: TimerSlot,
    restart: TimerSlot,
}

impl Transcriber {
    pub fn new(recognizer: Box<dyn Recognizer>, config: TranscriberConfig) -> Self {
        Self {
            recognizer,
            config,
            phase: Phase::Idle,
            active: false,
            suspended: false,
            capturing: false,
            silence: TimerSlot::new(TimerKind::Silence),
            restart: TimerSlot::new(TimerKind::Restart),
        }
    }

    /// Check that recognition exists and the microphone may be used.
    /// On failure the transcriber is disabled.
    pub fn probe(&mut self) -> Result<()> {
        if let Err(e) = self.recognizer.probe() {
            error!("Speech recognition unavailable: {}", e);
            self.disable();
            return Err(e);
        }
        Ok(())
    }

    pub fn is_listening(&self) -> bool {
        self.phase == Phase::Listening
    }

    pub fn is_disabled(&self) -> bool {
        self.phase == Phase::Disabled
    }

    pub fn is_suspended(&self) -> bool {
        self.suspended
    }

    /// Set by the coordinator while a turn is in progress
    pub fn set_suspended(&mut self, suspended: bool) {
        self.suspended = suspended;
    }

    /// Turn listening on
    pub fn start(&mut self, timers: &mut dyn Timers) -> Vec<TranscriberOutput> {
        if self.phase == Phase::Disabled {
            debug!("Transcriber disabled, ignoring start");
            return Vec::new();
        }
        if self.suspended {
            debug!("Refusing to listen while a turn is processing");
            return Vec::new();
        }

        self.active = true;
        match self.phase {
            Phase::Starting | Phase::Listening => {
                debug!("Already listening");
                Vec::new()
            }
            // `Ended` will restart the session
            Phase::Stopping => Vec::new(),
            Phase::Idle => self.launch(timers),
            Phase::Disabled => Vec::new(),
        }
    }

    /// Turn listening off and suppress restarts
    pub fn stop(&mut self) {
        self.active = false;
        self.silence.cancel();
        self.restart.cancel();

        if matches!(self.phase, Phase::Starting | Phase::Listening) {
            self.recognizer.stop();
            self.phase = Phase::Stopping;
        }
    }

    /// Feed a recognizer callback
    pub fn handle_event(
        &mut self,
        event: RecognitionEvent,
        timers: &mut dyn Timers,
    ) -> Vec<TranscriberOutput> {
        if self.phase == Phase::Disabled {
            return Vec::new();
        }

        match event {
            RecognitionEvent::Started => {
                if self.phase != Phase::Starting {
                    debug!("Ignoring start of a session being stopped");
                    return Vec::new();
                }
                self.phase = Phase::Listening;
                self.capturing = true;
                self.silence.arm(timers, self.config.silence_timeout);
                info!("Listening");
                vec![TranscriberOutput::ListeningStarted]
            }
            RecognitionEvent::SpeechDetected => {
                self.rearm_silence(timers);
                debug!("Speech detected");
                Vec::new()
            }
            RecognitionEvent::Result {
                transcript,
                is_final,
            } => {
                self.rearm_silence(timers);
                if !is_final {
                    return Vec::new();
                }

                let text = transcript.trim();
                if text.is_empty() {
                    debug!("Dropping empty transcript");
                    return Vec::new();
                }
                debug!("Final transcript: {}", text);
                vec![TranscriberOutput::Transcript(text.to_string())]
            }
            RecognitionEvent::Error(kind) => self.on_error(kind, timers),
            RecognitionEvent::Ended => self.on_ended(timers),
        }
    }

    /// Feed a timer expiry; unknown or stale ids are ignored
    pub fn handle_timer(&mut self, id: TimerId, timers: &mut dyn Timers) -> Vec<TranscriberOutput> {
        if self.silence.fire(id) {
            if matches!(self.phase, Phase::Starting | Phase::Listening) && !self.suspended {
                info!(
                    "No speech for {:?}, restarting recognition",
                    self.config.silence_timeout
                );
                self.recognizer.stop();
                self.phase = Phase::Stopping;
            }
            return Vec::new();
        }

        if self.restart.fire(id) {
            if self.active && !self.suspended && self.phase == Phase::Idle {
                return self.launch(timers);
            }
            debug!("Skipping restart (phase {:?})", self.phase);
        }

        Vec::new()
    }

    fn launch(&mut self, timers: &mut dyn Timers) -> Vec<TranscriberOutput> {
        self.restart.cancel();

        match self.recognizer.start() {
            Ok(()) => {
                self.phase = Phase::Starting;
                Vec::new()
            }
            Err(AvatarError::RecognitionBusy) => {
                warn!("Recognition already started, retrying");
                self.recognizer.stop();
                self.restart.arm(timers, self.config.retry_delay);
                Vec::new()
            }
            Err(e) if !e.is_recoverable() => {
                error!("Cannot start recognition: {}", e);
                self.disable();
                vec![TranscriberOutput::Disabled(e.user_message())]
            }
            Err(e) => {
                warn!("Failed to start recognition: {}", e);
                self.restart.arm(timers, self.config.restart_delay);
                Vec::new()
            }
        }
    }

    fn on_error(
        &mut self,
        kind: RecognitionErrorKind,
        timers: &mut dyn Timers,
    ) -> Vec<TranscriberOutput> {
        if kind.is_fatal() {
            error!("Recognition error: {}", kind);
            let was_capturing = self.capturing;
            self.recognizer.stop();
            self.disable();

            let mut outputs = Vec::new();
            if was_capturing {
                outputs.push(TranscriberOutput::ListeningStopped);
            }
            outputs.push(TranscriberOutput::Disabled(
                AvatarError::PermissionDenied(kind.to_string()).user_message(),
            ));
            return outputs;
        }

        debug!("Recoverable recognition error: {}", kind);
        if self.active && !self.suspended {
            self.restart.arm(timers, self.config.restart_delay);
        }
        Vec::new()
    }

    fn on_ended(&mut self, timers: &mut dyn Timers) -> Vec<TranscriberOutput> {
        let was_capturing = self.capturing;
        self.capturing = false;
        self.phase = Phase::Idle;
        self.silence.cancel();
        self.restart.cancel();

        if self.active && !self.suspended {
            debug!("Recognition ended, restarting in {:?}", self.config.restart_delay);
            self.restart.arm(timers, self.config.restart_delay);
        } else {
            debug!("Recognition ended");
        }

        if was_capturing {
            vec![TranscriberOutput::ListeningStopped]
        } else {
            Vec::new()
        }
    }

    fn rearm_silence(&mut self, timers: &mut dyn Timers) {
        if self.phase == Phase::Listening {
            self.silence.arm(timers, self.config.silence_timeout);
        }
    }

    fn disable(&mut self) {
        self.phase = Phase::Disabled;
        self.active = false;
        self.capturing = false;
        self.silence.cancel();
        self.restart.cancel();
    }
}
