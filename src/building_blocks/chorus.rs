use crate::building_blocks::delay::clamp_unit;
use crate::building_blocks::{clamp16, ms_to_samples, MonoEffect, Oscillator, Waveform};

pub const MIN_CHORUS_RATE: f32 = 0.1;
pub const MAX_CHORUS_RATE: f32 = 10.0;
pub const MIN_CHORUS_DEPTH_MS: f32 = 1.0;
pub const MAX_CHORUS_DEPTH_MS: f32 = 50.0;

const CHORUS_MARGIN: usize = 100;

fn clamp_rate(rate: f32) -> f32 {
    if rate.is_nan() {
        MIN_CHORUS_RATE
    } else {
        rate.clamp(MIN_CHORUS_RATE, MAX_CHORUS_RATE)
    }
}

fn clamp_depth(depth: f32) -> f32 {
    if depth.is_nan() {
        MIN_CHORUS_DEPTH_MS
    } else {
        depth.clamp(MIN_CHORUS_DEPTH_MS, MAX_CHORUS_DEPTH_MS)
    }
}

/// The chorus tunables as the control path sees them.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct ChorusSettings {
    enabled: bool,
    rate: f32,
    depth_ms: f32,
    mix: f32,
}

impl Default for ChorusSettings {
    fn default() -> Self {
        ChorusSettings {
            enabled: false,
            rate: 2.0,
            depth_ms: 15.0,
            mix: 0.4,
        }
    }
}

impl ChorusSettings {
    pub fn new(rate: f32, depth_ms: f32, mix: f32) -> Self {
        let mut settings = ChorusSettings::default();
        settings.set_rate(rate);
        settings.set_depth(depth_ms);
        settings.set_mix(mix);
        settings
    }

    pub fn set_enabled(&mut self, enabled: bool) {
        self.enabled = enabled;
    }

    pub fn set_rate(&mut self, rate: f32) {
        self.rate = clamp_rate(rate);
    }

    pub fn set_depth(&mut self, depth_ms: f32) {
        self.depth_ms = clamp_depth(depth_ms);
    }

    pub fn set_mix(&mut self, mix: f32) {
        self.mix = clamp_unit(mix);
    }

    pub fn is_enabled(&self) -> bool {
        self.enabled
    }

    pub fn rate(&self) -> f32 {
        self.rate
    }

    pub fn depth(&self) -> f32 {
        self.depth_ms
    }

    pub fn mix(&self) -> f32 {
        self.mix
    }
}

/**
 * Modulated delay line.
 *
 * The delay time swings between 0 and twice the depth, driven by
 * a sine `Oscillator` running at the chorus rate.
 * The buffer is sized once for the deepest setting and never resized.
 */
pub struct MonoChorus {
    enabled: bool,
    depth_ms: f32,
    mix: f32,
    lfo: Oscillator,

    buffer: Vec<i16>,
    cursor: usize,
    current_delay_ms: f32,
    samplerate: f32,
}

impl MonoChorus {
    pub fn new(sr: f32) -> Self {
        let defaults = ChorusSettings::default();
        let len = ms_to_samples(2.0 * MAX_CHORUS_DEPTH_MS, sr) + CHORUS_MARGIN;

        MonoChorus {
            enabled: defaults.enabled,
            depth_ms: defaults.depth_ms,
            mix: defaults.mix,
            lfo: Oscillator::with_waveform(Waveform::Sine, defaults.rate, sr),
            buffer: vec![0; len],
            cursor: 0,
            current_delay_ms: defaults.depth_ms,
            samplerate: sr,
        }
    }

    pub fn set_rate(&mut self, rate: f32) {
        self.lfo.set_frequency(clamp_rate(rate));
    }

    pub fn set_depth(&mut self, depth_ms: f32) {
        self.depth_ms = clamp_depth(depth_ms);
    }

    pub fn set_mix(&mut self, mix: f32) {
        self.mix = clamp_unit(mix);
    }

    pub fn apply_settings(&mut self, settings: &ChorusSettings) {
        self.set_rate(settings.rate);
        self.set_depth(settings.depth_ms);
        self.set_mix(settings.mix);
        self.set_enabled(settings.enabled);
    }

    pub fn settings(&self) -> ChorusSettings {
        ChorusSettings {
            enabled: self.enabled,
            rate: self.rate(),
            depth_ms: self.depth_ms,
            mix: self.mix,
        }
    }

    pub fn rate(&self) -> f32 {
        self.lfo.frequency()
    }

    pub fn depth(&self) -> f32 {
        self.depth_ms
    }

    pub fn mix(&self) -> f32 {
        self.mix
    }

    /// modulated delay used for the most recent sample, in ms
    pub fn current_delay_ms(&self) -> f32 {
        self.current_delay_ms
    }

    pub fn buffer_len(&self) -> usize {
        self.buffer.len()
    }

    /// linear interpolation, `delay` samples behind the write cursor
    #[inline(always)]
    fn read_interpolated(&self, delay: f32) -> f32 {
        let len = self.buffer.len();
        let mut read_pos = self.cursor as f32 - delay;

        if read_pos < 0.0 {
            read_pos += len as f32;
        }
        if read_pos >= len as f32 {
            read_pos -= len as f32;
        }

        let idx = (read_pos as usize).min(len - 1);
        let next = if idx + 1 == len { 0 } else { idx + 1 };
        let frac = read_pos - idx as f32;

        self.buffer[idx] as f32 * (1.0 - frac) + self.buffer[next] as f32 * frac
    }
}

impl MonoEffect for MonoChorus {
    #[inline(always)]
    fn process(&mut self, sample: i16) -> i16 {
        if !self.enabled {
            return sample;
        }

        self.buffer[self.cursor] = sample;

        let lfo = self.lfo.next_sample_normalized();
        self.current_delay_ms = self.depth_ms + lfo * self.depth_ms;
        let wet = self.read_interpolated(self.current_delay_ms / 1000.0 * self.samplerate);

        self.cursor += 1;
        if self.cursor >= self.buffer.len() {
            self.cursor = 0;
        }

        clamp16(sample as f32 * (1.0 - self.mix) + wet * self.mix)
    }

    fn set_enabled(&mut self, enabled: bool) {
        self.enabled = enabled;
    }

    fn is_enabled(&self) -> bool {
        self.enabled
    }

    fn reset(&mut self) {
        self.buffer.iter_mut().for_each(|s| *s = 0);
        self.cursor = 0;
        self.lfo.reset_phase();
    }
}
