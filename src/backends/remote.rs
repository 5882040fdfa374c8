//! Speech through the server's TTS endpoint
//!
//! `POST {base_url}/api/tts` with `{"text": ...}` returns an encoded audio
//! clip, which is decoded and played with rodio. The server picks the voice;
//! only the rate is applied locally.

use crate::backends::playback::Playback;
use crate::events::EventSender;
use crate::speech::synthesis::{Synthesizer, Utterance, Voice};
use crate::{AvatarError, Result};
use crossbeam_channel::{unbounded, Receiver, Sender};
use rodio::{Decoder, OutputStream, Sink};
use serde::Serialize;
use std::io::Cursor;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::Arc;
use std::thread;
use std::time::Duration;
use tracing::{debug, error, info, warn};

/// Path of the TTS endpoint
pub const TTS_PATH: &str = "/api/tts";

#[derive(Serialize)]
struct TtsRequest<'a> {
    text: &'a str,
}

enum PlayerCommand {
    Play(Utterance),
    Shutdown,
}

pub struct RemoteSynthesizer {
    command_tx: Sender<PlayerCommand>,
    /// Utterance that may play, 0 for none
    current: Arc<AtomicU64>,
    available: Arc<AtomicBool>,
}

impl RemoteSynthesizer {
    pub fn new(base_url: &str, timeout: Duration, event_tx: EventSender) -> Result<Self> {
        let client = reqwest::blocking::Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| AvatarError::ConfigError(format!("Failed to create HTTP client: {}", e)))?;

        let (command_tx, command_rx) = unbounded();
        let current = Arc::new(AtomicU64::new(0));
        let available = Arc::new(AtomicBool::new(true));

        let player = Player {
            client,
            url: format!("{}{}", base_url.trim_end_matches('/'), TTS_PATH),
            available: Arc::clone(&available),
            playback: Playback::new(Arc::clone(&current), event_tx),
        };
        thread::Builder::new()
            .name("tts-player".to_string())
            .spawn(move || player.run(command_rx))
            .map_err(|e| AvatarError::AudioDeviceError(format!("Failed to spawn player: {}", e)))?;

        Ok(Self {
            command_tx,
            current,
            available,
        })
    }
}

impl Synthesizer for RemoteSynthesizer {
    fn is_available(&self) -> bool {
        self.available.load(Ordering::SeqCst)
    }

    fn voices(&self) -> Vec<Voice> {
        vec![Voice::new("Server Voice", "en-US")]
    }

    fn speak(&mut self, utterance: Utterance) -> Result<()> {
        self.current.store(utterance.id, Ordering::SeqCst);
        self.command_tx
            .send(PlayerCommand::Play(utterance))
            .map_err(|e| AvatarError::SynthesisError(format!("Player stopped: {}", e)))
    }

    fn cancel(&mut self) {
        self.current.store(0, Ordering::SeqCst);
    }
}

impl Drop for RemoteSynthesizer {
    fn drop(&mut self) {
        self.current.store(0, Ordering::SeqCst);
        let _ = self.command_tx.send(PlayerCommand::Shutdown);
    }
}

struct Player {
    client: reqwest::blocking::Client,
    url: String,
    available: Arc<AtomicBool>,
    playback: Playback,
}

impl Player {
    fn run(self, command_rx: Receiver<PlayerCommand>) {
        let (_stream, handle) = match OutputStream::try_default() {
            Ok(output) => output,
            Err(e) => {
                error!("No audio output device: {}", e);
                self.available.store(false, Ordering::SeqCst);
                return;
            }
        };
        info!("TTS player ready");

        for command in command_rx.iter() {
            let utterance = match command {
                PlayerCommand::Play(utterance) => utterance,
                PlayerCommand::Shutdown => break,
            };
            let id = utterance.id;
            if !self.playback.is_current(id) {
                continue;
            }

            if let Err(reason) = self.play(&handle, &utterance) {
                warn!("TTS playback failed: {}", reason);
                self.playback.fail(id, reason);
            }
        }

        debug!("TTS player stopped");
    }

    fn play(
        &self,
        handle: &rodio::OutputStreamHandle,
        utterance: &Utterance,
    ) -> std::result::Result<(), String> {
        let id = utterance.id;
        let audio = self
            .client
            .post(&self.url)
            .json(&TtsRequest {
                text: &utterance.text,
            })
            .send()
            .and_then(|response| response.error_for_status())
            .and_then(|response| response.bytes())
            .map_err(|e| e.to_string())?;

        if !self.playback.is_current(id) {
            return Ok(());
        }

        let source = Decoder::new(Cursor::new(audio.to_vec())).map_err(|e| e.to_string())?;
        let sink = Sink::try_new(handle).map_err(|e| e.to_string())?;
        sink.set_speed(utterance.rate);
        sink.append(source);
        self.playback.play_to_end(&sink, id);
        Ok(())
    }
}
