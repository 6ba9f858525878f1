use crossbeam::atomic::AtomicCell;
use parking_lot::Mutex;
use std::sync::Arc;

use crate::building_blocks::*;
use crate::config::{clamp_range, clamp_smoothing};
use crate::stats::{RenderStats, RenderStatsSnapshot};
use crate::theremin::{ChannelMode, OscillatorSettings, ParameterRegion, NUM_OSCILLATORS};

/// These are the controls, the part which you use in your control thread
/// (sensor polling, buttons, display ...) to play the theremin.
///
/// Every setter takes the parameter lock with an unbounded wait and
/// clamps its input. Nothing here ever fails: out-of-range requests end
/// up at the nearest valid value, unknown oscillator indices are ignored.
/// Cloning gives another handle on the same engine.
#[derive(Clone)]
pub struct ThereminControls {
    params: Arc<Mutex<ParameterRegion>>,
    stats: Arc<RenderStats>,
    // overruns already warned about
    reported_overruns: Arc<AtomicCell<u64>>,
    defaults: ParameterRegion,
}

fn osc_slot(index: usize) -> Option<usize> {
    if (1..=NUM_OSCILLATORS).contains(&index) {
        Some(index - 1)
    } else {
        None
    }
}

fn clamp_frequency(hz: f32, min: f32, max: f32) -> f32 {
    if hz.is_nan() {
        min
    } else {
        hz.clamp(min, max)
    }
}

impl ThereminControls {
    pub(crate) fn new(
        defaults: ParameterRegion,
        params: &Arc<Mutex<ParameterRegion>>,
        stats: &Arc<RenderStats>,
    ) -> ThereminControls {
        ThereminControls {
            params: Arc::clone(params),
            stats: Arc::clone(stats),
            reported_overruns: Arc::new(AtomicCell::new(0)),
            defaults,
        }
    }

    /// target pitch in Hz, clamped into the current frequency range
    pub fn set_frequency(&self, hz: f32) {
        let mut params = self.params.lock();
        params.frequency = clamp_frequency(hz, params.min_frequency, params.max_frequency);
    }

    /// target amplitude in percent
    pub fn set_amplitude(&self, percent: f32) {
        let mut params = self.params.lock();
        params.amplitude = if percent.is_nan() {
            0.0
        } else {
            percent.clamp(0.0, 100.0)
        };
    }

    /// Returns false, without touching anything, for an unknown index.
    fn with_oscillator<F: FnOnce(&mut OscillatorSettings)>(&self, index: usize, f: F) -> bool {
        match osc_slot(index) {
            Some(slot) => {
                f(&mut self.params.lock().oscillators[slot]);
                true
            }
            None => {
                log::warn!("ignoring request for oscillator {}, valid are 1-3", index);
                false
            }
        }
    }

    /// `index` counts from 1
    pub fn set_oscillator_waveform(&self, index: usize, waveform: Waveform) {
        if self.with_oscillator(index, |osc| osc.waveform = waveform) {
            log::debug!("oscillator {} waveform {:?}", index, waveform);
        }
    }

    pub fn set_oscillator_octave(&self, index: usize, shift: i32) {
        if self.with_oscillator(index, |osc| osc.octave_shift = shift.clamp(-1, 1)) {
            log::debug!("oscillator {} octave shift {}", index, shift);
        }
    }

    pub fn set_oscillator_volume(&self, index: usize, volume: f32) {
        let applied = self.with_oscillator(index, |osc| {
            *osc = OscillatorSettings::new(osc.waveform, osc.octave_shift, volume)
        });
        if applied {
            log::debug!("oscillator {} volume {}", index, volume);
        }
    }

    pub fn frequency(&self) -> f32 {
        self.params.lock().frequency
    }

    pub fn amplitude(&self) -> f32 {
        self.params.lock().amplitude
    }

    pub fn oscillator(&self, index: usize) -> Option<OscillatorSettings> {
        osc_slot(index).map(|slot| self.params.lock().oscillators[slot])
    }

    pub fn oscillator_waveform(&self, index: usize) -> Option<Waveform> {
        self.oscillator(index).map(|osc| osc.waveform)
    }

    pub fn oscillator_octave(&self, index: usize) -> Option<i32> {
        self.oscillator(index).map(|osc| osc.octave_shift)
    }

    pub fn oscillator_volume(&self, index: usize) -> Option<f32> {
        self.oscillator(index).map(|osc| osc.volume)
    }

    pub fn set_pitch_smoothing(&self, factor: f32) {
        self.params.lock().pitch_smoothing = clamp_smoothing(factor);
        log::debug!("pitch smoothing {}", factor);
    }

    pub fn set_volume_smoothing(&self, factor: f32) {
        self.params.lock().volume_smoothing = clamp_smoothing(factor);
        log::debug!("volume smoothing {}", factor);
    }

    /// sets pitch and volume smoothing together
    pub fn set_smoothing_preset(&self, preset: SmoothingPreset) {
        let mut params = self.params.lock();
        params.pitch_smoothing = preset.factor();
        params.volume_smoothing = preset.factor();
        log::debug!("smoothing preset {:?}", preset);
    }

    pub fn pitch_smoothing(&self) -> f32 {
        self.params.lock().pitch_smoothing
    }

    pub fn volume_smoothing(&self) -> f32 {
        self.params.lock().volume_smoothing
    }

    /// Narrow (or widen) the playable pitch range.
    /// The current target is pulled into the new range.
    pub fn set_frequency_range(&self, min: f32, max: f32) {
        let (min, max) = clamp_range(min, max);
        let mut params = self.params.lock();
        params.min_frequency = min;
        params.max_frequency = max;
        params.frequency = clamp_frequency(params.frequency, min, max);
        log::debug!("frequency range {} - {} Hz", min, max);
    }

    pub fn frequency_range(&self) -> (f32, f32) {
        let params = self.params.lock();
        (params.min_frequency, params.max_frequency)
    }

    pub fn set_channel_mode(&self, mode: ChannelMode) {
        self.params.lock().channel_mode = mode;
        log::debug!("channel mode {:?}", mode);
    }

    pub fn channel_mode(&self) -> ChannelMode {
        self.params.lock().channel_mode
    }

    /// current effect tunables, as last written by the control side
    pub fn effects(&self) -> EffectsSettings {
        self.params.lock().effects
    }

    pub fn delay(&self) -> DelayControls<'_> {
        DelayControls {
            params: &self.params,
        }
    }

    pub fn chorus(&self) -> ChorusControls<'_> {
        ChorusControls {
            params: &self.params,
        }
    }

    pub fn reverb(&self) -> ReverbControls<'_> {
        ReverbControls {
            params: &self.params,
        }
    }

    /// back to the power-on state, engine keeps running
    pub fn reset_to_defaults(&self) {
        *self.params.lock() = self.defaults;
        log::info!("settings reset to defaults");
    }

    /// Render counters. New overruns since the last call are
    /// logged here, the audio thread itself never logs.
    pub fn stats(&self) -> RenderStatsSnapshot {
        let snapshot = self.stats.snapshot();
        let reported = self.reported_overruns.swap(snapshot.overruns);
        if snapshot.overruns > reported {
            log::warn!(
                "{} render overrun(s), last render took {} us",
                snapshot.overruns - reported,
                snapshot.last_render_micros
            );
        }
        snapshot
    }

    #[cfg(test)]
    pub(crate) fn hold_parameter_lock(&self) -> parking_lot::MutexGuard<'_, ParameterRegion> {
        self.params.lock()
    }
}

/// Delay setters, each one a single locked write.
pub struct DelayControls<'a> {
    params: &'a Mutex<ParameterRegion>,
}

impl DelayControls<'_> {
    pub fn set_enabled(&self, enabled: bool) {
        self.params.lock().effects.delay.set_enabled(enabled);
        log::debug!("delay enabled {}", enabled);
    }

    pub fn set_delay_time(&self, ms: u32) {
        self.params.lock().effects.delay.set_delay_time(ms);
        log::debug!("delay time {} ms", ms);
    }

    pub fn set_feedback(&self, feedback: f32) {
        self.params.lock().effects.delay.set_feedback(feedback);
        log::debug!("delay feedback {}", feedback);
    }

    pub fn set_mix(&self, mix: f32) {
        self.params.lock().effects.delay.set_mix(mix);
        log::debug!("delay mix {}", mix);
    }

    pub fn set_preset(&self, preset: DelayPreset) {
        preset.apply(&mut self.params.lock().effects.delay);
        log::debug!("delay preset {:?}", preset);
    }

    pub fn settings(&self) -> DelaySettings {
        self.params.lock().effects.delay
    }
}

/// Chorus setters, each one a single locked write.
pub struct ChorusControls<'a> {
    params: &'a Mutex<ParameterRegion>,
}

impl ChorusControls<'_> {
    pub fn set_enabled(&self, enabled: bool) {
        self.params.lock().effects.chorus.set_enabled(enabled);
        log::debug!("chorus enabled {}", enabled);
    }

    pub fn set_rate(&self, rate: f32) {
        self.params.lock().effects.chorus.set_rate(rate);
        log::debug!("chorus rate {} Hz", rate);
    }

    pub fn set_depth(&self, depth_ms: f32) {
        self.params.lock().effects.chorus.set_depth(depth_ms);
        log::debug!("chorus depth {} ms", depth_ms);
    }

    pub fn set_mix(&self, mix: f32) {
        self.params.lock().effects.chorus.set_mix(mix);
        log::debug!("chorus mix {}", mix);
    }

    pub fn set_preset(&self, preset: ChorusPreset) {
        preset.apply(&mut self.params.lock().effects.chorus);
        log::debug!("chorus preset {:?}", preset);
    }

    pub fn settings(&self) -> ChorusSettings {
        self.params.lock().effects.chorus
    }
}

/// Reverb setters, each one a single locked write.
pub struct ReverbControls<'a> {
    params: &'a Mutex<ParameterRegion>,
}

impl ReverbControls<'_> {
    pub fn set_enabled(&self, enabled: bool) {
        self.params.lock().effects.reverb.set_enabled(enabled);
        log::debug!("reverb enabled {}", enabled);
    }

    pub fn set_room_size(&self, room_size: f32) {
        self.params.lock().effects.reverb.set_room_size(room_size);
        log::debug!("reverb room size {}", room_size);
    }

    pub fn set_damping(&self, damping: f32) {
        self.params.lock().effects.reverb.set_damping(damping);
        log::debug!("reverb damping {}", damping);
    }

    pub fn set_mix(&self, mix: f32) {
        self.params.lock().effects.reverb.set_mix(mix);
        log::debug!("reverb mix {}", mix);
    }

    pub fn set_preset(&self, preset: ReverbPreset) {
        preset.apply(&mut self.params.lock().effects.reverb);
        log::debug!("reverb preset {:?}", preset);
    }

    pub fn settings(&self) -> ReverbSettings {
        self.params.lock().effects.reverb
    }
}
