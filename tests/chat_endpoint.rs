//! Voice loop against a mock chat server

use serde_json::json;
use std::time::{Duration, Instant};
use voice_avatar::chat::{ChatClient, ChatWorker};
use voice_avatar::config::AppConfig;
use voice_avatar::coordinator::{Coordinator, SERVER_ERROR_STATUS};
use voice_avatar::events::{EventSender, LoopEvent};
use voice_avatar::messages::Author;
use voice_avatar::runtime::{VoiceLoop, VoiceLoopHandle};
use voice_avatar::speech::{RecognitionEvent, SpeechEvent};
use voice_avatar::state::TurnState;
use voice_avatar::testing::{
    FakeRecognizer, FakeSynthesizer, ManualTimers, RecognizerProbe, SynthesizerProbe,
};
use wiremock::matchers::{method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

struct Running {
    handle: VoiceLoopHandle,
    event_tx: EventSender,
    recognizer: RecognizerProbe,
    synth: SynthesizerProbe,
}

fn start_loop(base_url: &str) -> Running {
    let config = AppConfig::default().with_base_url(base_url);
    let (recognizer, recognizer_probe) = FakeRecognizer::new();
    let (synth, synth_probe) = FakeSynthesizer::new();

    let (event_tx, event_rx) = VoiceLoop::channel();
    let client = ChatClient::from_config(&config).unwrap();
    let chat = ChatWorker::spawn(client, event_tx.clone()).unwrap();
    let coordinator = Coordinator::new(
        &config,
        Box::new(recognizer),
        Box::new(synth),
        Box::new(chat),
        Box::new(ManualTimers::new()),
    );
    let handle = VoiceLoop::new(coordinator, event_rx)
        .spawn(event_tx.clone())
        .unwrap();

    Running {
        handle,
        event_tx,
        recognizer: recognizer_probe,
        synth: synth_probe,
    }
}

async fn wait_for(mut condition: impl FnMut() -> bool) -> bool {
    let deadline = Instant::now() + Duration::from_secs(5);
    while Instant::now() < deadline {
        if condition() {
            return true;
        }
        tokio::time::sleep(Duration::from_millis(10)).await;
    }
    false
}

async fn mount_health(server: &MockServer) {
    Mock::given(method("GET"))
        .and(path("/api/test"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({"status": "ok"})))
        .mount(server)
        .await;
}

fn recognition(running: &Running, event: RecognitionEvent) {
    running
        .event_tx
        .send(LoopEvent::Recognition(event))
        .unwrap();
}

async fn speak_to(running: &Running, text: &str) {
    let recognizer = running.recognizer.clone();
    assert!(wait_for(|| recognizer.starts() == 1).await);
    recognition(running, RecognitionEvent::Started);
    recognition(
        running,
        RecognitionEvent::Result {
            transcript: text.to_string(),
            is_final: true,
        },
    );
    recognition(running, RecognitionEvent::Ended);
}

#[tokio::test(flavor = "multi_thread")]
async fn test_reply_is_spoken_and_listening_resumes() {
    let server = MockServer::start().await;
    mount_health(&server).await;
    Mock::given(method("POST"))
        .and(path("/api/chat"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "choices": [{"message": {"content": "Hi there!"}}]
        })))
        .expect(1)
        .mount(&server)
        .await;

    let mut running = start_loop(&server.uri());
    speak_to(&running, "Hello").await;

    let synth = running.synth.clone();
    assert!(wait_for(|| !synth.spoken().is_empty()).await);
    assert_eq!(synth.spoken_texts(), vec!["Hi there!".to_string()]);

    let state = running.handle.state().clone();
    assert!(wait_for(|| state.turn() == TurnState::Speaking).await);

    let utterance = synth.last_utterance().unwrap();
    running
        .event_tx
        .send(LoopEvent::Speech(SpeechEvent::Ended { utterance }))
        .unwrap();

    let recognizer = running.recognizer.clone();
    assert!(wait_for(|| recognizer.starts() == 2).await);
    assert_eq!(state.turn(), TurnState::Idle);

    running.handle.shutdown();
}

#[tokio::test(flavor = "multi_thread")]
async fn test_server_error_speaks_apology() {
    let server = MockServer::start().await;
    mount_health(&server).await;
    Mock::given(method("POST"))
        .and(path("/api/chat"))
        .respond_with(ResponseTemplate::new(500))
        .expect(1)
        .mount(&server)
        .await;

    let mut running = start_loop(&server.uri());
    speak_to(&running, "Hello").await;

    let synth = running.synth.clone();
    assert!(wait_for(|| !synth.spoken().is_empty()).await);

    let fallback = AppConfig::default().conversation.fallback_reply;
    assert_eq!(synth.spoken_texts(), vec![fallback.clone()]);
    assert_eq!(
        running.handle.transcript().last_from(Author::Bot),
        Some(fallback)
    );

    let utterance = synth.last_utterance().unwrap();
    running
        .event_tx
        .send(LoopEvent::Speech(SpeechEvent::Ended { utterance }))
        .unwrap();

    let recognizer = running.recognizer.clone();
    assert!(wait_for(|| recognizer.starts() == 2).await);
    assert_eq!(running.handle.state().turn(), TurnState::Idle);

    running.handle.shutdown();
}

#[tokio::test(flavor = "multi_thread")]
async fn test_unhealthy_server_blocks_listening() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/api/test"))
        .respond_with(ResponseTemplate::new(503))
        .mount(&server)
        .await;

    let mut running = start_loop(&server.uri());

    let state = running.handle.state().clone();
    assert!(wait_for(|| state.server_status().is_some()).await);
    assert_eq!(state.server_status().as_deref(), Some(SERVER_ERROR_STATUS));
    assert_eq!(running.recognizer.starts(), 0);

    running.handle.shutdown();
}
