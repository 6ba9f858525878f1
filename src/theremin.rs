pub mod audio_engine;
pub mod melody;
pub mod theremin_controls;
pub mod theremin_playhead;

use parking_lot::Mutex;
use std::sync::Arc;

use crate::building_blocks::{EffectsSettings, Waveform};
use crate::config::EngineConfig;
use crate::stats::RenderStats;

pub use crate::theremin::{
    audio_engine::*, melody::*, theremin_controls::*, theremin_playhead::*,
};

pub const DEFAULT_BUFSIZE: usize = 256;
pub const NUM_OSCILLATORS: usize = 3;
pub const NUM_CHANNELS: usize = 2;

/// where the mono engine signal ends up in the stereo frame
#[repr(C)]
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ChannelMode {
    Stereo,
    LeftOnly,
    RightOnly,
}

/// Per-oscillator selections made by the control path.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct OscillatorSettings {
    pub waveform: Waveform,
    pub octave_shift: i32,
    pub volume: f32,
}

impl OscillatorSettings {
    pub fn new(waveform: Waveform, octave_shift: i32, volume: f32) -> Self {
        OscillatorSettings {
            waveform,
            octave_shift: octave_shift.clamp(-1, 1),
            volume: if volume.is_nan() {
                0.0
            } else {
                volume.clamp(0.0, 1.0)
            },
        }
    }
}

/// Everything the control path may change while audio is running.
/// Lives behind one mutex; the audio side copies it out in one go.
#[derive(Clone, Copy, Debug, PartialEq)]
pub(crate) struct ParameterRegion {
    pub frequency: f32,
    /// 0 - 100
    pub amplitude: f32,
    pub oscillators: [OscillatorSettings; NUM_OSCILLATORS],
    pub effects: EffectsSettings,
    pub pitch_smoothing: f32,
    pub volume_smoothing: f32,
    pub min_frequency: f32,
    pub max_frequency: f32,
    pub channel_mode: ChannelMode,
    pub master_noise_gate: i16,
}

impl ParameterRegion {
    /// the power-on state of the instrument
    pub fn with_config(config: &EngineConfig) -> Self {
        ParameterRegion {
            frequency: config.min_frequency,
            amplitude: 0.0,
            oscillators: [
                OscillatorSettings::new(Waveform::Triangle, 0, 1.0),
                OscillatorSettings::new(Waveform::Silent, 0, 0.6),
                OscillatorSettings::new(Waveform::Silent, 0, 0.5),
            ],
            effects: EffectsSettings::default(),
            pitch_smoothing: config.pitch_smoothing,
            volume_smoothing: config.volume_smoothing,
            min_frequency: config.min_frequency,
            max_frequency: config.max_frequency,
            channel_mode: config.channel_mode,
            master_noise_gate: config.master_noise_gate,
        }
    }
}

/// Set up the shared state and split it into the part for the
/// control thread and the part for the audio thread.
pub fn init_theremin<const BUFSIZE: usize>(
    config: &EngineConfig,
) -> (ThereminControls, ThereminPlayhead<BUFSIZE>) {
    let config = config.sanitized();
    let defaults = ParameterRegion::with_config(&config);

    let params = Arc::new(Mutex::new(defaults));
    let stats = Arc::new(RenderStats::default());

    let controls = ThereminControls::new(defaults, &params, &stats);
    let playhead = ThereminPlayhead::<BUFSIZE>::new(&config, &params, &stats);

    (controls, playhead)
}

// TEST TEST TEST
#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_state() {
        let (controls, playhead) = init_theremin::<128>(&EngineConfig::default());

        assert_eq!(controls.amplitude(), 0.0);
        assert_eq!(controls.oscillator_waveform(1), Some(Waveform::Triangle));
        assert_eq!(controls.oscillator_waveform(2), Some(Waveform::Silent));
        assert_eq!(controls.oscillator_volume(3), Some(0.5));
        assert!(!controls.effects().delay.is_enabled());

        assert_eq!(playhead.smoothed_amplitude(), 0.0);
        assert_eq!(playhead.effects().settings(), controls.effects());
    }

    #[test]
    fn test_oscillator_settings_clamp() {
        let settings = OscillatorSettings::new(Waveform::Sine, 4, 2.0);
        assert_eq!(settings.octave_shift, 1);
        assert_eq!(settings.volume, 1.0);
    }
}
