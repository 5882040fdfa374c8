//! Conversation turn coordinator
//!
//! Drives the `idle -> listening -> thinking -> speaking -> idle` cycle. The
//! coordinator owns the conversation history and the processing flag, and is
//! the only writer of `SharedVoiceState` and `ChatTranscript`. It runs on the
//! voice loop thread and handles one `LoopEvent` at a time, so a turn can
//! never overlap another.

use crate::chat::ChatBackend;
use crate::config::AppConfig;
use crate::events::LoopEvent;
use crate::messages::{Author, ChatTranscript, Conversation};
use crate::speech::{
    Recognizer, Speaker, SpeakerConfig, SpeakerOutput, SpeechEvent, Synthesizer, Transcriber,
    TranscriberConfig, TranscriberOutput,
};
use crate::state::{LogLevel, SharedVoiceState, TurnState};
use crate::timer::Timers;
use tracing::{debug, error, info, warn};

/// Status line shown when the health check fails
pub const SERVER_ERROR_STATUS: &str = "Server error. Please check backend.";

pub struct Coordinator {
    transcriber: Transcriber,
    speaker: Speaker,
    chat: Box<dyn ChatBackend>,
    timers: Box<dyn Timers>,
    conversation: Conversation,
    transcript: ChatTranscript,
    state: SharedVoiceState,
    turn: TurnState,
    processing: bool,
    fallback_reply: String,
}

impl Coordinator {
    pub fn new(
        config: &AppConfig,
        recognizer: Box<dyn Recognizer>,
        synthesizer: Box<dyn Synthesizer>,
        chat: Box<dyn ChatBackend>,
        timers: Box<dyn Timers>,
    ) -> Self {
        let transcriber = Transcriber::new(recognizer, TranscriberConfig::from(&config.listening));
        let speaker = Speaker::new(synthesizer, SpeakerConfig::from(&config.speech));

        Self {
            transcriber,
            speaker,
            chat,
            timers,
            conversation: Conversation::new(&config.conversation.system_prompt),
            transcript: ChatTranscript::new(),
            state: SharedVoiceState::new(),
            turn: TurnState::Idle,
            processing: false,
            fallback_reply: config.conversation.fallback_reply.clone(),
        }
    }

    /// Status shared with the UI
    pub fn state(&self) -> SharedVoiceState {
        self.state.clone()
    }

    /// Displayed chat lines shared with the UI
    pub fn transcript(&self) -> ChatTranscript {
        self.transcript.clone()
    }

    pub fn conversation(&self) -> &Conversation {
        &self.conversation
    }

    pub fn turn(&self) -> TurnState {
        self.turn
    }

    pub fn is_processing(&self) -> bool {
        self.processing
    }

    /// Startup: probe the microphone, then check the server.
    /// Listening begins once the health check succeeds.
    pub fn begin(&mut self) {
        info!("Voice loop starting");

        if let Err(e) = self.transcriber.probe() {
            let message = e.user_message();
            self.log(LogLevel::Error, format!("Microphone unavailable: {}", e));
            self.state.write().mic_error = Some(message);
            return;
        }
        self.log(LogLevel::Success, "Speech recognition ready");

        self.log(LogLevel::Info, "Checking server connection");
        if let Err(e) = self.chat.check_health() {
            error!("Could not issue health check: {}", e);
            self.on_health_checked(false);
        }
    }

    /// Handle one loop event
    pub fn handle(&mut self, event: LoopEvent) {
        match event {
            LoopEvent::Recognition(event) => {
                let outputs = self.transcriber.handle_event(event, self.timers.as_mut());
                self.apply(outputs);
            }
            LoopEvent::Timer(id) => {
                let outputs = self.transcriber.handle_timer(id, self.timers.as_mut());
                self.apply(outputs);
            }
            LoopEvent::Speech(event) => self.on_speech_event(event),
            LoopEvent::Reply(text) => self.on_reply(text),
            LoopEvent::HealthChecked(ok) => self.on_health_checked(ok),
            LoopEvent::StopSpeaking => self.request_stop(),
            LoopEvent::Shutdown => {
                debug!("Shutdown reached the coordinator");
                self.transcriber.stop();
                self.speaker.stop();
            }
        }
    }

    /// A finalized utterance: start a turn unless one is in progress
    pub fn process_user_input(&mut self, text: &str) {
        let text = text.trim();
        if text.is_empty() {
            debug!("Ignoring empty input");
            return;
        }
        if self.processing {
            self.log(
                LogLevel::Warning,
                format!("Already processing, dropping: {}", text),
            );
            return;
        }

        self.transcriber.set_suspended(true);
        self.transcriber.stop();
        self.state.write().visualizer_active = false;
        self.processing = true;

        self.conversation.push_user(text);
        self.transcript.add(Author::User, text);
        self.log(LogLevel::Info, format!("User: {}", text));
        self.set_turn(TurnState::Thinking);

        if let Err(e) = self.chat.request(self.conversation.messages().to_vec()) {
            error!("Chat request could not be sent: {}", e);
            let fallback = self.fallback_reply.clone();
            self.on_reply(fallback);
        }
    }

    /// The user pressed stop; only meaningful while speaking
    pub fn request_stop(&mut self) {
        if !self.turn.is_speaking() {
            debug!("Stop requested while {}, ignoring", self.turn);
            return;
        }

        if let Some(SpeakerOutput::Stopped) = self.speaker.stop() {
            self.log(LogLevel::Info, "Speech stopped by user");
        }
        self.finish_turn();
    }

    fn on_reply(&mut self, text: String) {
        if self.turn != TurnState::Thinking {
            warn!("Reply arrived while {}, ignoring", self.turn);
            return;
        }

        self.conversation.push_assistant(text.as_str());
        self.transcript.add(Author::Bot, text.as_str());
        self.log(LogLevel::Success, format!("Bot: {}", text));

        match self.speaker.speak(&text) {
            Ok(_) => {
                self.state.write().stop_enabled = true;
                self.set_turn(TurnState::Speaking);
            }
            Err(e) => {
                self.log(LogLevel::Error, format!("Cannot speak reply: {}", e));
                self.finish_turn();
            }
        }
    }

    fn on_speech_event(&mut self, event: SpeechEvent) {
        match self.speaker.handle_event(event) {
            Some(SpeakerOutput::Started) => debug!("Speech started"),
            Some(SpeakerOutput::Finished) => {
                self.log(LogLevel::Info, "Speech finished");
                self.finish_turn();
            }
            Some(SpeakerOutput::Failed(reason)) => {
                self.log(LogLevel::Error, format!("Speech failed: {}", reason));
                self.finish_turn();
            }
            Some(SpeakerOutput::Stopped) | None => {}
        }
    }

    fn on_health_checked(&mut self, ok: bool) {
        if ok {
            self.state.write().server_status = None;
            self.log(LogLevel::Success, "Connected to server");
            self.start_listening();
        } else {
            self.state.write().server_status = Some(SERVER_ERROR_STATUS.to_string());
            self.log(LogLevel::Error, "Server health check failed");
        }
    }

    fn finish_turn(&mut self) {
        self.processing = false;
        self.state.write().stop_enabled = false;
        self.set_turn(TurnState::Idle);
        self.transcriber.set_suspended(false);
        self.start_listening();
    }

    fn start_listening(&mut self) {
        let outputs = self.transcriber.start(self.timers.as_mut());
        self.apply(outputs);
    }

    fn apply(&mut self, outputs: Vec<TranscriberOutput>) {
        for output in outputs {
            match output {
                TranscriberOutput::ListeningStarted => {
                    if self.processing {
                        continue;
                    }
                    self.state.write().visualizer_active = true;
                    self.set_turn(TurnState::Listening);
                }
                TranscriberOutput::ListeningStopped => {
                    self.state.write().visualizer_active = false;
                    if self.turn.is_listening() {
                        self.set_turn(TurnState::Idle);
                    }
                }
                TranscriberOutput::Transcript(text) => self.process_user_input(&text),
                TranscriberOutput::Disabled(message) => {
                    self.log(LogLevel::Error, "Voice input disabled");
                    {
                        let mut state = self.state.write();
                        state.mic_error = Some(message);
                        state.visualizer_active = false;
                    }
                    if self.turn.is_listening() {
                        self.set_turn(TurnState::Idle);
                    }
                }
            }
        }
    }

    fn set_turn(&mut self, turn: TurnState) {
        if self.turn == turn {
            return;
        }
        debug!("Turn state: {} -> {}", self.turn, turn);
        self.turn = turn;
        let mut state = self.state.write();
        state.turn = turn;
        state.add_log(LogLevel::Info, format!("State: {}", turn));
    }

    fn log(&self, level: LogLevel, message: impl Into<String>) {
        let message = message.into();
        match level {
            LogLevel::Error => error!("{}", message),
            LogLevel::Warning => warn!("{}", message),
            LogLevel::Info | LogLevel::Success => info!("{}", message),
        }
        self.state.log(level, message);
    }
}
