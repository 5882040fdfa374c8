//! Voice and prosody mapping for multi-speaker synthesis models

use crate::config::VoiceProfile;
use crate::speech::synthesis::Voice;

/// Slowest playback speed used to raise or lower pitch
const MIN_PLAYBACK_SPEED: f32 = 0.5;
const MAX_PLAYBACK_SPEED: f32 = 2.0;

/// Voices a model offers, in configuration order
pub fn voice_list(profiles: &[VoiceProfile]) -> Vec<Voice> {
    profiles
        .iter()
        .map(|profile| Voice::new(&profile.name, &profile.locale))
        .collect()
}

/// Speaker index for a requested voice
///
/// Falls back to the first configured profile, then to speaker 0.
pub fn speaker_id(profiles: &[VoiceProfile], voice: Option<&Voice>) -> i32 {
    voice
        .and_then(|voice| {
            profiles
                .iter()
                .find(|p| p.name == voice.name && p.locale == voice.locale)
                .or_else(|| profiles.iter().find(|p| p.name == voice.name))
        })
        .or_else(|| profiles.first())
        .map(|profile| profile.speaker_id)
        .unwrap_or(0)
}

/// How an utterance's rate and pitch are applied to generated audio
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Prosody {
    /// Speed passed to the model
    pub synthesis_speed: f32,
    /// Resampling speed of the output sink
    pub playback_speed: f32,
}

/// Pitch is applied by resampling playback, which also changes tempo, so the
/// model speed is compensated to keep the overall speaking rate at `rate`.
pub fn prosody(rate: f32, pitch: f32) -> Prosody {
    let playback_speed = pitch.clamp(MIN_PLAYBACK_SPEED, MAX_PLAYBACK_SPEED);
    Prosody {
        synthesis_speed: rate.max(0.1) / playback_speed,
        playback_speed,
    }
}
