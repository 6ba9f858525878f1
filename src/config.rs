use crate::building_blocks::{FreeverbTuning, MAX_FREQUENCY, MIN_FREQUENCY};
use crate::theremin::ChannelMode;

/// Startup configuration. Nothing here is persisted,
/// every start begins from these values.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct EngineConfig {
    pub sample_rate: u32,
    /// per-buffer EMA factor for pitch, 1.0 is instant
    pub pitch_smoothing: f32,
    /// per-buffer EMA factor for amplitude, 1.0 is instant
    pub volume_smoothing: f32,
    /// output samples quieter than this are forced to zero, 0 disables
    pub master_noise_gate: i16,
    pub min_frequency: f32,
    pub max_frequency: f32,
    pub channel_mode: ChannelMode,
    /// reverb constants, `None` means the stock tuning for `sample_rate`
    pub reverb_tuning: Option<FreeverbTuning>,
}

pub const MIN_SMOOTHING: f32 = 0.01;

pub(crate) fn clamp_smoothing(factor: f32) -> f32 {
    if factor.is_nan() {
        1.0
    } else {
        factor.clamp(MIN_SMOOTHING, 1.0)
    }
}

/// order and clamp a frequency range into what the oscillators can do
pub(crate) fn clamp_range(min: f32, max: f32) -> (f32, f32) {
    let clamp = |f: f32| {
        if f.is_nan() {
            MIN_FREQUENCY
        } else {
            f.clamp(MIN_FREQUENCY, MAX_FREQUENCY)
        }
    };
    let (a, b) = (clamp(min), clamp(max));
    if a <= b {
        (a, b)
    } else {
        (b, a)
    }
}

impl Default for EngineConfig {
    fn default() -> Self {
        EngineConfig {
            sample_rate: 22050,
            pitch_smoothing: 0.8,
            volume_smoothing: 0.8,
            master_noise_gate: 150,
            min_frequency: MIN_FREQUENCY,
            max_frequency: MAX_FREQUENCY,
            channel_mode: ChannelMode::Stereo,
            reverb_tuning: None,
        }
    }
}

impl EngineConfig {
    /// Same config with every value pulled into its valid range.
    pub fn sanitized(&self) -> Self {
        let (min_frequency, max_frequency) = clamp_range(self.min_frequency, self.max_frequency);
        EngineConfig {
            sample_rate: self.sample_rate.max(1),
            pitch_smoothing: clamp_smoothing(self.pitch_smoothing),
            volume_smoothing: clamp_smoothing(self.volume_smoothing),
            master_noise_gate: self.master_noise_gate.max(0),
            min_frequency,
            max_frequency,
            channel_mode: self.channel_mode,
            reverb_tuning: self.reverb_tuning,
        }
    }
}
