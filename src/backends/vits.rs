//! On-device speech with a multi-speaker VITS model (sherpa-rs)
//!
//! Each configured voice maps to a speaker index of the model. Rate and
//! pitch are split between the model's speed and the sink's playback speed.
//! The model and the output stream both live on the player thread.

use crate::backends::playback::Playback;
use crate::backends::voices::{prosody, speaker_id, voice_list};
use crate::config::{SpeechConfig, VoiceProfile};
use crate::events::EventSender;
use crate::speech::synthesis::{Synthesizer, Utterance, Voice};
use crate::{AvatarError, Result};
use crossbeam_channel::{unbounded, Receiver, Sender};
use rodio::buffer::SamplesBuffer;
use rodio::{OutputStream, OutputStreamHandle, Sink};
use sherpa_rs::tts::{VitsTts, VitsTtsConfig};
use std::path::Path;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::Arc;
use std::thread;
use tracing::{debug, error, info, warn};

enum PlayerCommand {
    Play(Utterance),
    Shutdown,
}

pub struct VitsSynthesizer {
    command_tx: Sender<PlayerCommand>,
    /// Utterance that may play, 0 for none
    current: Arc<AtomicU64>,
    available: Arc<AtomicBool>,
    voices: Vec<Voice>,
}

impl VitsSynthesizer {
    /// Start the player thread
    ///
    /// Missing model files leave the synthesizer unavailable rather than
    /// failing, so the loop still runs with speech disabled.
    pub fn new(config: &SpeechConfig, event_tx: EventSender) -> Result<Self> {
        let (command_tx, command_rx) = unbounded();
        let current = Arc::new(AtomicU64::new(0));
        let available = Arc::new(AtomicBool::new(true));

        let vits_config = match model_config(config) {
            Ok(vits_config) => Some(vits_config),
            Err(e) => {
                warn!("Local speech disabled: {}", e);
                available.store(false, Ordering::SeqCst);
                None
            }
        };

        let player = Player {
            profiles: config.voices.clone(),
            available: Arc::clone(&available),
            playback: Playback::new(Arc::clone(&current), event_tx),
        };
        thread::Builder::new()
            .name("vits-player".to_string())
            .spawn(move || {
                if let Some(vits_config) = vits_config {
                    player.run(vits_config, command_rx)
                }
            })
            .map_err(|e| AvatarError::AudioDeviceError(format!("Failed to spawn player: {}", e)))?;

        Ok(Self {
            command_tx,
            current,
            available,
            voices: voice_list(&config.voices),
        })
    }
}

fn model_config(config: &SpeechConfig) -> Result<VitsTtsConfig> {
    for (what, path) in [("Model", &config.vits_model), ("Tokens file", &config.vits_tokens)] {
        if !path.exists() {
            return Err(AvatarError::CapabilityUnavailable(format!(
                "{} not found: {}",
                what,
                path.display()
            )));
        }
    }

    Ok(VitsTtsConfig {
        model: path_string(&config.vits_model),
        tokens: path_string(&config.vits_tokens),
        data_dir: path_string(&config.vits_data_dir),
        length_scale: 1.0,
        noise_scale: 0.667,
        noise_scale_w: 0.8,
        ..Default::default()
    })
}

fn path_string(path: &Path) -> String {
    path.to_string_lossy().into_owned()
}

impl Synthesizer for VitsSynthesizer {
    fn is_available(&self) -> bool {
        self.available.load(Ordering::SeqCst)
    }

    fn voices(&self) -> Vec<Voice> {
        self.voices.clone()
    }

    fn speak(&mut self, utterance: Utterance) -> Result<()> {
        if !self.is_available() {
            return Err(AvatarError::CapabilityUnavailable(
                "Local speech is not available".to_string(),
            ));
        }
        self.current.store(utterance.id, Ordering::SeqCst);
        self.command_tx
            .send(PlayerCommand::Play(utterance))
            .map_err(|e| AvatarError::SynthesisError(format!("Player stopped: {}", e)))
    }

    fn cancel(&mut self) {
        self.current.store(0, Ordering::SeqCst);
    }
}

impl Drop for VitsSynthesizer {
    fn drop(&mut self) {
        self.current.store(0, Ordering::SeqCst);
        let _ = self.command_tx.send(PlayerCommand::Shutdown);
    }
}

struct Player {
    profiles: Vec<VoiceProfile>,
    available: Arc<AtomicBool>,
    playback: Playback,
}

impl Player {
    fn run(self, vits_config: VitsTtsConfig, command_rx: Receiver<PlayerCommand>) {
        let (_stream, handle) = match OutputStream::try_default() {
            Ok(output) => output,
            Err(e) => {
                error!("No audio output device: {}", e);
                self.available.store(false, Ordering::SeqCst);
                return;
            }
        };

        info!("Loading VITS model from: {}", vits_config.model);
        let mut tts = VitsTts::new(vits_config);
        info!("VITS player ready");

        for command in command_rx.iter() {
            let utterance = match command {
                PlayerCommand::Play(utterance) => utterance,
                PlayerCommand::Shutdown => break,
            };
            let id = utterance.id;
            if !self.playback.is_current(id) {
                continue;
            }

            if let Err(reason) = self.play(&mut tts, &handle, &utterance) {
                warn!("Local speech failed: {}", reason);
                self.playback.fail(id, reason);
            }
        }

        debug!("VITS player stopped");
    }

    fn play(
        &self,
        tts: &mut VitsTts,
        handle: &OutputStreamHandle,
        utterance: &Utterance,
    ) -> std::result::Result<(), String> {
        let id = utterance.id;
        let speaker = speaker_id(&self.profiles, utterance.voice.as_ref());
        let prosody = prosody(utterance.rate, utterance.pitch);
        debug!(
            "Synthesizing utterance {} with speaker {} at {:?}",
            id, speaker, prosody
        );

        let audio = tts
            .create(&utterance.text, speaker, prosody.synthesis_speed)
            .map_err(|e| format!("Synthesis failed: {}", e))?;

        if !self.playback.is_current(id) {
            return Ok(());
        }

        let sink = Sink::try_new(handle).map_err(|e| e.to_string())?;
        sink.set_speed(prosody.playback_speed);
        sink.append(SamplesBuffer::new(1, audio.sample_rate as u32, audio.samples));
        self.playback.play_to_end(&sink, id);
        Ok(())
    }
}
