//! Microphone recognition with local Whisper transcription
//!
//! Each session runs on its own capture thread, which owns the cpal stream.
//! Audio is gated by RMS energy: the first loud chunk marks the start of
//! speech, and `end_of_speech_ms` of quiet after it closes the utterance.
//! The utterance is resampled to 16 kHz and transcribed with Whisper.

use crate::config::ListeningConfig;
use crate::events::{EventSender, LoopEvent};
use crate::speech::recognition::{RecognitionErrorKind, RecognitionEvent, Recognizer};
use crate::{AvatarError, Result};
use cpal::traits::{DeviceTrait, HostTrait, StreamTrait};
use crossbeam_channel::{bounded, RecvTimeoutError};
use rubato::{Resampler, SincFixedIn, SincInterpolationParameters, SincInterpolationType, WindowFunction};
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::thread;
use std::time::{Duration, Instant};
use tracing::{debug, error, info, warn};
use whisper_rs::{FullParams, SamplingStrategy, WhisperContext, WhisperContextParameters};

/// Sample rate Whisper expects
pub const WHISPER_SAMPLE_RATE: u32 = 16_000;

/// Utterances shorter than this are treated as noise
const MIN_UTTERANCE: Duration = Duration::from_millis(300);

/// Root mean square level of a chunk
pub fn rms(samples: &[f32]) -> f32 {
    if samples.is_empty() {
        return 0.0;
    }
    (samples.iter().map(|s| s * s).sum::<f32>() / samples.len() as f32).sqrt()
}

/// Resample mono audio to 16 kHz
pub fn resample_to_whisper(input: &[f32], input_rate: u32) -> Result<Vec<f32>> {
    if input_rate == WHISPER_SAMPLE_RATE || input.is_empty() {
        return Ok(input.to_vec());
    }

    let ratio = WHISPER_SAMPLE_RATE as f64 / input_rate as f64;
    let params = SincInterpolationParameters {
        sinc_len: 256,
        f_cutoff: 0.95,
        interpolation: SincInterpolationType::Linear,
        oversampling_factor: 256,
        window: WindowFunction::BlackmanHarris2,
    };
    let chunk_size = 1024;
    let mut resampler = SincFixedIn::<f32>::new(ratio, 2.0, params, chunk_size, 1)
        .map_err(|e| AvatarError::AudioDeviceError(format!("Failed to create resampler: {}", e)))?;

    let mut output = Vec::with_capacity((input.len() as f64 * ratio * 1.1) as usize);
    for chunk in input.chunks(chunk_size) {
        // SincFixedIn wants full chunks; the tail is zero padded
        let mut frame = vec![0.0f32; chunk_size];
        frame[..chunk.len()].copy_from_slice(chunk);

        let resampled = resampler
            .process(&[frame], None)
            .map_err(|e| AvatarError::AudioDeviceError(format!("Resampling failed: {}", e)))?;

        let take = if chunk.len() < chunk_size {
            ((chunk.len() as f64) * ratio).ceil() as usize
        } else {
            resampled[0].len()
        };
        output.extend_from_slice(&resampled[0][..take.min(resampled[0].len())]);
    }

    Ok(output)
}

/// Loaded Whisper model
struct WhisperModel {
    context: WhisperContext,
    language: String,
}

impl WhisperModel {
    fn load(path: &Path, language: &str) -> Result<Self> {
        info!("Loading Whisper model from: {:?}", path);
        if !path.exists() {
            return Err(AvatarError::CapabilityUnavailable(format!(
                "Whisper model not found: {:?}",
                path
            )));
        }

        let path_str = path
            .to_str()
            .ok_or_else(|| AvatarError::ConfigError("Invalid model path".to_string()))?;
        let context = WhisperContext::new_with_params(path_str, WhisperContextParameters::default())
            .map_err(|e| {
                AvatarError::CapabilityUnavailable(format!("Failed to load Whisper model: {:?}", e))
            })?;

        // "en-US" -> "en"
        let language = language.split('-').next().unwrap_or("en").to_lowercase();
        info!("Whisper model loaded");
        Ok(Self { context, language })
    }

    fn transcribe(&self, samples: &[f32]) -> Result<String> {
        let mut params = FullParams::new(SamplingStrategy::Greedy { best_of: 1 });
        params.set_n_threads(4);
        params.set_translate(false);
        params.set_print_special(false);
        params.set_print_progress(false);
        params.set_print_realtime(false);
        params.set_print_timestamps(false);
        params.set_language(Some(&self.language));

        let mut state = self.context.create_state().map_err(|e| {
            AvatarError::RecognitionError(format!("Failed to create state: {:?}", e))
        })?;
        state
            .full(params, samples)
            .map_err(|e| AvatarError::RecognitionError(format!("Transcription failed: {:?}", e)))?;

        let segments = state.full_n_segments().map_err(|e| {
            AvatarError::RecognitionError(format!("Failed to get segments: {:?}", e))
        })?;

        let mut text = String::new();
        for i in 0..segments {
            let segment = state.full_get_segment_text(i).map_err(|e| {
                AvatarError::RecognitionError(format!("Failed to get segment text: {:?}", e))
            })?;
            text.push_str(&segment);
        }
        Ok(text.trim().to_string())
    }
}

#[derive(Clone, Debug)]
struct SessionConfig {
    energy_threshold: f32,
    end_of_speech: Duration,
    no_speech_timeout: Duration,
}

pub struct MicrophoneRecognizer {
    event_tx: EventSender,
    config: SessionConfig,
    model_path: PathBuf,
    language: String,
    model: Option<Arc<WhisperModel>>,
    running: Arc<AtomicBool>,
    stop_flag: Arc<AtomicBool>,
}

impl MicrophoneRecognizer {
    pub fn new(event_tx: EventSender, config: &ListeningConfig) -> Self {
        Self {
            event_tx,
            config: SessionConfig {
                energy_threshold: config.energy_threshold,
                end_of_speech: Duration::from_millis(config.end_of_speech_ms),
                no_speech_timeout: Duration::from_millis(config.no_speech_timeout_ms),
            },
            model_path: config.whisper_model.clone(),
            language: config.language.clone(),
            model: None,
            running: Arc::new(AtomicBool::new(false)),
            stop_flag: Arc::new(AtomicBool::new(false)),
        }
    }
}

impl Recognizer for MicrophoneRecognizer {
    fn probe(&mut self) -> Result<()> {
        let host = cpal::default_host();
        let device = host.default_input_device().ok_or_else(|| {
            AvatarError::CapabilityUnavailable("No input device available".to_string())
        })?;
        device.default_input_config().map_err(|e| {
            AvatarError::PermissionDenied(format!("Cannot open input device: {}", e))
        })?;

        if self.model.is_none() {
            self.model = Some(Arc::new(WhisperModel::load(&self.model_path, &self.language)?));
        }
        Ok(())
    }

    fn start(&mut self) -> Result<()> {
        if self.running.swap(true, Ordering::SeqCst) {
            return Err(AvatarError::RecognitionBusy);
        }
        self.stop_flag.store(false, Ordering::SeqCst);

        let model = match &self.model {
            Some(model) => Arc::clone(model),
            None => {
                self.running.store(false, Ordering::SeqCst);
                return Err(AvatarError::CapabilityUnavailable(
                    "Microphone was not probed".to_string(),
                ));
            }
        };

        let session = CaptureSession {
            event_tx: self.event_tx.clone(),
            config: self.config.clone(),
            model,
            stop_flag: Arc::clone(&self.stop_flag),
        };
        let running = Arc::clone(&self.running);

        thread::Builder::new()
            .name("mic-capture".to_string())
            .spawn(move || {
                session.run();
                running.store(false, Ordering::SeqCst);
                session.emit(RecognitionEvent::Ended);
            })
            .map_err(|e| {
                self.running.store(false, Ordering::SeqCst);
                AvatarError::AudioDeviceError(format!("Failed to spawn capture thread: {}", e))
            })?;

        Ok(())
    }

    fn stop(&mut self) {
        self.stop_flag.store(true, Ordering::SeqCst);
    }
}

struct CaptureSession {
    event_tx: EventSender,
    config: SessionConfig,
    model: Arc<WhisperModel>,
    stop_flag: Arc<AtomicBool>,
}

impl CaptureSession {
    fn emit(&self, event: RecognitionEvent) {
        let _ = self.event_tx.send(LoopEvent::Recognition(event));
    }

    fn fail(&self, kind: RecognitionErrorKind, detail: impl std::fmt::Display) {
        warn!("Microphone session failed ({}): {}", kind, detail);
        self.emit(RecognitionEvent::Error(kind));
    }

    fn run(&self) {
        let host = cpal::default_host();
        let Some(device) = host.default_input_device() else {
            self.fail(RecognitionErrorKind::AudioCapture, "no input device");
            return;
        };
        let stream_config: cpal::StreamConfig = match device.default_input_config() {
            Ok(config) => config.into(),
            Err(e) => {
                self.fail(RecognitionErrorKind::AudioCapture, e);
                return;
            }
        };

        let sample_rate = stream_config.sample_rate.0;
        let channels = stream_config.channels as usize;
        let (audio_tx, audio_rx) = bounded::<Vec<f32>>(256);

        let stream = device.build_input_stream(
            &stream_config,
            move |data: &[f32], _: &cpal::InputCallbackInfo| {
                let mono: Vec<f32> = if channels == 1 {
                    data.to_vec()
                } else {
                    data.chunks(channels)
                        .map(|frame| frame.iter().sum::<f32>() / channels as f32)
                        .collect()
                };
                let _ = audio_tx.try_send(mono);
            },
            |err| error!("Audio input stream error: {}", err),
            None,
        );
        let stream = match stream {
            Ok(stream) => stream,
            Err(e) => {
                self.fail(RecognitionErrorKind::AudioCapture, e);
                return;
            }
        };
        if let Err(e) = stream.play() {
            self.fail(RecognitionErrorKind::AudioCapture, e);
            return;
        }

        self.emit(RecognitionEvent::Started);
        debug!("Capturing at {} Hz, {} channel(s)", sample_rate, channels);

        let opened = Instant::now();
        let mut utterance: Vec<f32> = Vec::new();
        let mut speech_started: Option<Instant> = None;
        let mut last_voice = Instant::now();

        loop {
            if self.stop_flag.load(Ordering::SeqCst) {
                debug!("Capture stopped");
                break;
            }

            match audio_rx.recv_timeout(Duration::from_millis(50)) {
                Ok(chunk) => {
                    let loud = rms(&chunk) >= self.config.energy_threshold;
                    if loud {
                        if speech_started.is_none() {
                            speech_started = Some(Instant::now());
                        }
                        // Each burst counts as recognition activity
                        if last_voice.elapsed() >= self.config.end_of_speech / 2 {
                            self.emit(RecognitionEvent::SpeechDetected);
                        }
                        last_voice = Instant::now();
                    }
                    if speech_started.is_some() {
                        utterance.extend_from_slice(&chunk);
                    }
                }
                Err(RecvTimeoutError::Timeout) => {}
                Err(RecvTimeoutError::Disconnected) => {
                    self.fail(RecognitionErrorKind::AudioCapture, "stream closed");
                    return;
                }
            }

            match speech_started {
                None if opened.elapsed() >= self.config.no_speech_timeout => {
                    self.emit(RecognitionEvent::Error(RecognitionErrorKind::NoSpeech));
                    return;
                }
                Some(_) if last_voice.elapsed() >= self.config.end_of_speech => break,
                _ => {}
            }
        }

        drop(stream);

        let Some(started) = speech_started else {
            return;
        };
        if started.elapsed() < MIN_UTTERANCE + self.config.end_of_speech {
            debug!("Utterance too short, discarding");
            self.emit(RecognitionEvent::Error(RecognitionErrorKind::NoSpeech));
            return;
        }

        let samples = match resample_to_whisper(&utterance, sample_rate) {
            Ok(samples) => samples,
            Err(e) => {
                self.fail(RecognitionErrorKind::Other("resample".to_string()), e);
                return;
            }
        };

        match self.model.transcribe(&samples) {
            Ok(text) => self.emit(RecognitionEvent::Result {
                transcript: text,
                is_final: true,
            }),
            Err(e) => self.fail(RecognitionErrorKind::Other("transcription".to_string()), e),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_rms() {
        assert_eq!(rms(&[]), 0.0);
        assert!((rms(&[0.5, -0.5, 0.5, -0.5]) - 0.5).abs() < 1e-6);
    }

    #[test]
    fn test_resample_halves_length() {
        let input = vec![0.0f32; 32_000];
        let output = resample_to_whisper(&input, 32_000).unwrap();
        let expected = 16_000i64;
        assert!((output.len() as i64 - expected).abs() < 600);
    }

    #[test]
    fn test_resample_same_rate_is_identity() {
        let input = vec![0.25f32; 100];
        assert_eq!(resample_to_whisper(&input, 16_000).unwrap(), input);
    }
}
