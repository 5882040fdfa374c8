//! Conversation turn tests against recording fakes

use voice_avatar::backends::keyboard_backend;
use voice_avatar::config::AppConfig;
use voice_avatar::coordinator::Coordinator;
use voice_avatar::events::{EventReceiver, LoopEvent};
use voice_avatar::messages::{Author, Role};
use voice_avatar::speech::{RecognitionErrorKind, RecognitionEvent, SpeechEvent};
use voice_avatar::state::TurnState;
use voice_avatar::testing::{
    ChatProbe, FakeChat, FakeRecognizer, FakeSynthesizer, ManualTimers, RecognizerProbe,
    SynthesizerProbe,
};
use voice_avatar::timer::TimerKind;
use voice_avatar::AvatarError;

struct Session {
    coordinator: Coordinator,
    recognizer: RecognizerProbe,
    synth: SynthesizerProbe,
    chat: ChatProbe,
    timers: ManualTimers,
}

impl Session {
    /// Started, healthy and listening
    fn listening() -> Self {
        let (recognizer, recognizer_probe) = FakeRecognizer::new();
        let (synth, synth_probe) = FakeSynthesizer::new();
        let (chat, chat_probe) = FakeChat::new();
        let timers = ManualTimers::new();
        let mut coordinator = Coordinator::new(
            &AppConfig::default(),
            Box::new(recognizer),
            Box::new(synth),
            Box::new(chat),
            Box::new(timers.clone()),
        );

        coordinator.begin();
        coordinator.handle(LoopEvent::HealthChecked(true));
        coordinator.handle(LoopEvent::Recognition(RecognitionEvent::Started));

        Self {
            coordinator,
            recognizer: recognizer_probe,
            synth: synth_probe,
            chat: chat_probe,
            timers,
        }
    }

    fn recognition(&mut self, event: RecognitionEvent) {
        self.coordinator.handle(LoopEvent::Recognition(event));
    }

    fn say(&mut self, text: &str) {
        self.recognition(RecognitionEvent::SpeechDetected);
        self.recognition(RecognitionEvent::Result {
            transcript: text.to_string(),
            is_final: true,
        });
    }

    fn fire(&mut self, kind: TimerKind) {
        let (id, _) = self.timers.last(kind).expect("timer was scheduled");
        self.coordinator.handle(LoopEvent::Timer(id));
    }

    fn finish_speaking(&mut self) {
        let utterance = self.synth.last_utterance().expect("something was spoken");
        self.coordinator
            .handle(LoopEvent::Speech(SpeechEvent::Started { utterance }));
        self.coordinator
            .handle(LoopEvent::Speech(SpeechEvent::Ended { utterance }));
    }

    fn assert_not_listening_while_speaking(&self) {
        let state = self.coordinator.state().snapshot();
        if state.turn == TurnState::Speaking {
            assert!(!state.visualizer_active);
        }
    }
}

#[test]
fn test_full_turn() {
    let mut session = Session::listening();
    assert_eq!(session.coordinator.turn(), TurnState::Listening);
    assert!(session.coordinator.state().is_visualizer_active());

    session.say("Hello");
    assert_eq!(session.coordinator.turn(), TurnState::Thinking);
    session.recognition(RecognitionEvent::Ended);

    session.coordinator.handle(LoopEvent::Reply("Hi".to_string()));
    assert_eq!(session.coordinator.turn(), TurnState::Speaking);
    assert_eq!(session.synth.spoken_texts(), vec!["Hi".to_string()]);
    session.assert_not_listening_while_speaking();

    session.finish_speaking();
    assert_eq!(session.coordinator.turn(), TurnState::Idle);
    assert_eq!(session.recognizer.starts(), 2);

    session.recognition(RecognitionEvent::Started);
    assert_eq!(session.coordinator.turn(), TurnState::Listening);

    let transcript = session.coordinator.transcript().get_all();
    let lines: Vec<_> = transcript
        .iter()
        .map(|entry| (entry.author, entry.text.as_str()))
        .collect();
    assert_eq!(lines, vec![(Author::User, "Hello"), (Author::Bot, "Hi")]);
}

#[test]
fn test_history_grows_across_turns() {
    let mut session = Session::listening();

    session.say("Hello");
    session.recognition(RecognitionEvent::Ended);
    session.coordinator.handle(LoopEvent::Reply("Hi".to_string()));
    session.finish_speaking();
    session.recognition(RecognitionEvent::Started);

    session.say("How are you?");
    let requests = session.chat.requests();
    assert_eq!(requests.len(), 2);

    let roles: Vec<_> = requests[1].iter().map(|m| m.role).collect();
    assert_eq!(
        roles,
        vec![Role::System, Role::User, Role::Assistant, Role::User]
    );
    assert_eq!(requests[1][3].content, "How are you?");
}

#[test]
fn test_empty_transcript_sends_nothing() {
    let mut session = Session::listening();
    session.say("   ");

    assert_eq!(session.chat.request_count(), 0);
    assert_eq!(session.coordinator.turn(), TurnState::Listening);
    assert!(session.coordinator.transcript().is_empty());
}

#[test]
fn test_interim_results_are_not_sent() {
    let mut session = Session::listening();
    session.recognition(RecognitionEvent::Result {
        transcript: "Hel".to_string(),
        is_final: false,
    });

    assert_eq!(session.chat.request_count(), 0);
}

#[test]
fn test_stop_restarts_listening_once() {
    let mut session = Session::listening();
    session.say("Tell me a story");
    session.recognition(RecognitionEvent::Ended);
    session
        .coordinator
        .handle(LoopEvent::Reply("Once upon a time".to_string()));
    assert!(session.coordinator.state().is_stop_enabled());

    session.coordinator.handle(LoopEvent::StopSpeaking);
    assert_eq!(session.coordinator.turn(), TurnState::Idle);
    assert_eq!(session.synth.cancels(), 1);
    assert!(!session.coordinator.state().is_stop_enabled());
    assert_eq!(session.recognizer.starts(), 2);

    // The cancelled utterance still reports its end
    let utterance = session.synth.last_utterance().unwrap();
    session
        .coordinator
        .handle(LoopEvent::Speech(SpeechEvent::Ended { utterance }));
    assert_eq!(session.recognizer.starts(), 2);
    assert!(!session.coordinator.is_processing());
}

#[test]
fn test_stop_before_session_ended_restarts_once() {
    let mut session = Session::listening();
    session.say("Tell me a story");
    session
        .coordinator
        .handle(LoopEvent::Reply("Once upon a time".to_string()));
    session.coordinator.handle(LoopEvent::StopSpeaking);

    // The old session is still winding down
    assert_eq!(session.recognizer.starts(), 1);

    session.recognition(RecognitionEvent::Ended);
    session.fire(TimerKind::Restart);
    assert_eq!(session.recognizer.starts(), 2);

    session.recognition(RecognitionEvent::Started);
    assert_eq!(session.coordinator.turn(), TurnState::Listening);
}

#[test]
fn test_silence_recycles_session_without_chat() {
    let mut session = Session::listening();
    session.fire(TimerKind::Silence);
    assert_eq!(session.recognizer.stops(), 1);

    session.recognition(RecognitionEvent::Ended);
    assert_eq!(session.coordinator.turn(), TurnState::Idle);

    session.fire(TimerKind::Restart);
    assert_eq!(session.recognizer.starts(), 2);
    assert_eq!(session.chat.request_count(), 0);
}

#[test]
fn test_speech_during_speaking_is_dropped() {
    let mut session = Session::listening();
    session.say("Hello");
    session.recognition(RecognitionEvent::Ended);
    session.coordinator.handle(LoopEvent::Reply("Hi".to_string()));

    session.say("interrupting");
    assert_eq!(session.chat.request_count(), 1);
    assert_eq!(session.coordinator.turn(), TurnState::Speaking);
    session.assert_not_listening_while_speaking();
}

#[test]
fn test_no_restart_while_thinking() {
    let mut session = Session::listening();
    session.say("Hello");
    session.recognition(RecognitionEvent::Error(RecognitionErrorKind::Network));
    session.recognition(RecognitionEvent::Ended);

    assert!(session.timers.last(TimerKind::Restart).is_none());
    assert_eq!(session.recognizer.starts(), 1);
    assert_eq!(session.coordinator.turn(), TurnState::Thinking);
}

#[test]
fn test_permission_revoked_disables_voice_input() {
    let mut session = Session::listening();
    session.recognition(RecognitionEvent::Error(RecognitionErrorKind::NotAllowed));
    session.recognition(RecognitionEvent::Ended);

    assert_eq!(session.coordinator.turn(), TurnState::Idle);
    assert!(session.coordinator.state().mic_error().is_some());
    assert!(!session.coordinator.state().is_visualizer_active());
    assert!(session.timers.last(TimerKind::Restart).is_none());
}

#[test]
fn test_speech_failure_mid_reply_ends_turn() {
    let mut session = Session::listening();
    session.say("Hello");
    session.recognition(RecognitionEvent::Ended);
    session.coordinator.handle(LoopEvent::Reply("Hi".to_string()));

    let utterance = session.synth.last_utterance().unwrap();
    session
        .coordinator
        .handle(LoopEvent::Speech(SpeechEvent::Started { utterance }));
    session.coordinator.handle(LoopEvent::Speech(SpeechEvent::Failed {
        utterance,
        reason: "audio device lost".to_string(),
    }));

    assert_eq!(session.coordinator.turn(), TurnState::Idle);
    assert!(!session.coordinator.is_processing());
    assert!(!session.coordinator.state().is_stop_enabled());
    assert_eq!(session.recognizer.starts(), 2);
}

#[test]
fn test_stale_speech_failure_is_ignored() {
    let mut session = Session::listening();
    session.say("Hello");
    session.recognition(RecognitionEvent::Ended);
    session.coordinator.handle(LoopEvent::Reply("Hi".to_string()));

    let current = session.synth.last_utterance().unwrap();
    session.coordinator.handle(LoopEvent::Speech(SpeechEvent::Failed {
        utterance: current + 1,
        reason: "superseded".to_string(),
    }));

    assert_eq!(session.coordinator.turn(), TurnState::Speaking);
    assert!(session.coordinator.is_processing());
    assert!(session.coordinator.state().is_stop_enabled());
    assert_eq!(session.recognizer.starts(), 1);
}

#[test]
fn test_rejected_utterance_ends_turn() {
    let mut session = Session::listening();
    session
        .synth
        .fail_next_speak(AvatarError::SynthesisError("engine busy".to_string()));
    session.say("Hello");
    session.recognition(RecognitionEvent::Ended);
    session.coordinator.handle(LoopEvent::Reply("Hi".to_string()));

    assert!(session.synth.spoken().is_empty());
    assert_eq!(session.coordinator.turn(), TurnState::Idle);
    assert!(!session.coordinator.is_processing());
    assert_eq!(session.recognizer.starts(), 2);
    assert_eq!(
        session.coordinator.transcript().last_from(Author::Bot).as_deref(),
        Some("Hi")
    );
}

fn pump(coordinator: &mut Coordinator, event_rx: &EventReceiver) {
    for event in event_rx.try_iter().collect::<Vec<_>>() {
        coordinator.handle(event);
    }
}

#[test]
fn test_typing_keeps_typed_session_open() {
    let (event_tx, event_rx) = crossbeam_channel::unbounded();
    let (recognizer, input) = keyboard_backend(event_tx);
    let (synth, _) = FakeSynthesizer::new();
    let (chat, chat_probe) = FakeChat::new();
    let timers = ManualTimers::new();
    let mut coordinator = Coordinator::new(
        &AppConfig::default(),
        Box::new(recognizer),
        Box::new(synth),
        Box::new(chat),
        Box::new(timers.clone()),
    );

    coordinator.begin();
    coordinator.handle(LoopEvent::HealthChecked(true));
    pump(&mut coordinator, &event_rx);
    assert_eq!(coordinator.turn(), TurnState::Listening);
    let (first_silence, _) = timers.last(TimerKind::Silence).unwrap();

    assert!(input.typing());
    pump(&mut coordinator, &event_rx);
    let (rearmed, _) = timers.last(TimerKind::Silence).unwrap();
    assert_ne!(rearmed, first_silence);

    // The silence deadline from before the edit has passed
    coordinator.handle(LoopEvent::Timer(first_silence));
    pump(&mut coordinator, &event_rx);
    assert!(input.is_listening());

    assert!(input.submit("what is the weather in Paris today"));
    pump(&mut coordinator, &event_rx);
    assert_eq!(chat_probe.request_count(), 1);
    assert_eq!(coordinator.turn(), TurnState::Thinking);
}

#[test]
fn test_silence_without_typing_closes_typed_session() {
    let (event_tx, event_rx) = crossbeam_channel::unbounded();
    let (recognizer, input) = keyboard_backend(event_tx);
    let (synth, _) = FakeSynthesizer::new();
    let (chat, _) = FakeChat::new();
    let timers = ManualTimers::new();
    let mut coordinator = Coordinator::new(
        &AppConfig::default(),
        Box::new(recognizer),
        Box::new(synth),
        Box::new(chat),
        Box::new(timers.clone()),
    );

    coordinator.begin();
    coordinator.handle(LoopEvent::HealthChecked(true));
    pump(&mut coordinator, &event_rx);

    let (silence, after) = timers.last(TimerKind::Silence).unwrap();
    coordinator.handle(LoopEvent::Timer(silence));
    pump(&mut coordinator, &event_rx);
    assert!(!input.is_listening());

    let scheduled = timers.scheduled();
    let (_, restart_after) = scheduled.last().copied().unwrap();
    assert_eq!(scheduled.last().map(|(id, _)| id.kind), Some(TimerKind::Restart));
    assert!(restart_after < after);
}
