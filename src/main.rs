use anyhow::{anyhow, Context, Result};
use eframe::egui;
use tracing::info;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};
use voice_avatar::backends::KeyboardInput;
use voice_avatar::chat::{ChatClient, ChatWorker};
use voice_avatar::config::AppConfig;
use voice_avatar::coordinator::Coordinator;
use voice_avatar::events::EventSender;
use voice_avatar::runtime::VoiceLoop;
use voice_avatar::speech::{Recognizer, Synthesizer};
use voice_avatar::timer::ThreadTimers;
use voice_avatar::ui::{AvatarApp, TITLE};

type Backends = (Box<dyn Recognizer>, Box<dyn Synthesizer>, Option<KeyboardInput>);

#[cfg(not(feature = "audio-io"))]
fn build_backends(config: &AppConfig, event_tx: &EventSender) -> Result<Backends> {
    use voice_avatar::backends::{keyboard_backend, PacedSynthesizer};

    info!("Using typed input and paced text replies");
    let (recognizer, keyboard) = keyboard_backend(event_tx.clone());
    let synthesizer = PacedSynthesizer::new(event_tx.clone(), config.speech.words_per_minute);
    Ok((Box::new(recognizer), Box::new(synthesizer), Some(keyboard)))
}

#[cfg(feature = "audio-io")]
fn build_backends(config: &AppConfig, event_tx: &EventSender) -> Result<Backends> {
    use std::time::Duration;
    use voice_avatar::backends::{MicrophoneRecognizer, RemoteSynthesizer, VitsSynthesizer};
    use voice_avatar::config::SpeechEngine;

    let recognizer = MicrophoneRecognizer::new(event_tx.clone(), &config.listening);
    let synthesizer: Box<dyn Synthesizer> = match config.speech.engine {
        SpeechEngine::Local => {
            info!("Using microphone input and local speech synthesis");
            Box::new(
                VitsSynthesizer::new(&config.speech, event_tx.clone())
                    .context("Failed to create speech synthesizer")?,
            )
        }
        SpeechEngine::Remote => {
            info!("Using microphone input and server speech synthesis");
            Box::new(
                RemoteSynthesizer::new(
                    &config.server.base_url,
                    Duration::from_millis(config.server.request_timeout_ms),
                    event_tx.clone(),
                )
                .context("Failed to create speech synthesizer")?,
            )
        }
    };
    Ok((Box::new(recognizer), synthesizer, None))
}

fn main() -> Result<()> {
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "voice_avatar=debug,info".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    info!("Starting voice avatar");

    let config = match std::env::args().nth(1) {
        Some(path) => AppConfig::load(&path).with_context(|| format!("Loading {}", path))?,
        None => AppConfig::default(),
    };

    let (event_tx, event_rx) = VoiceLoop::channel();
    let (recognizer, synthesizer, keyboard) = build_backends(&config, &event_tx)?;

    let client = ChatClient::from_config(&config).context("Failed to create chat client")?;
    let chat = ChatWorker::spawn(client, event_tx.clone())?;
    let timers = ThreadTimers::new(event_tx.clone());

    let coordinator = Coordinator::new(
        &config,
        recognizer,
        synthesizer,
        Box::new(chat),
        Box::new(timers),
    );
    let handle = VoiceLoop::new(coordinator, event_rx).spawn(event_tx)?;

    let options = eframe::NativeOptions {
        viewport: egui::ViewportBuilder::default()
            .with_inner_size([480.0, 720.0])
            .with_min_inner_size([360.0, 480.0])
            .with_title(TITLE),
        ..Default::default()
    };

    let show_debug = config.ui.debug;
    eframe::run_native(
        TITLE,
        options,
        Box::new(move |cc| {
            Ok(Box::new(AvatarApp::from_creation_context(
                cc, handle, keyboard, show_debug,
            )))
        }),
    )
    .map_err(|e| anyhow!("UI error: {}", e))
}
