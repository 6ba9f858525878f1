use crate::building_blocks::{clamp16, ms_to_samples, MonoEffect};

pub const MIN_DELAY_MS: u32 = 10;
pub const MAX_DELAY_MS: u32 = 2000;
pub const MAX_DELAY_FEEDBACK: f32 = 0.95;

// a few extra samples on top of the nominal delay time
const DELAY_MARGIN: usize = 10;

/// buffer length for a given delay time
pub fn delay_buffer_len(ms: u32, sr: f32) -> usize {
    ms_to_samples(ms as f32, sr) + DELAY_MARGIN
}

/// The delay tunables as the control path sees them.
/// Setters clamp the same way `MonoDelay` does.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct DelaySettings {
    enabled: bool,
    time_ms: u32,
    feedback: f32,
    mix: f32,
}

impl Default for DelaySettings {
    fn default() -> Self {
        DelaySettings {
            enabled: false,
            time_ms: 300,
            feedback: 0.5,
            mix: 0.3,
        }
    }
}

impl DelaySettings {
    pub fn new(time_ms: u32, feedback: f32, mix: f32) -> Self {
        let mut settings = DelaySettings::default();
        settings.set_delay_time(time_ms);
        settings.set_feedback(feedback);
        settings.set_mix(mix);
        settings
    }

    pub fn set_enabled(&mut self, enabled: bool) {
        self.enabled = enabled;
    }

    pub fn set_delay_time(&mut self, ms: u32) {
        self.time_ms = ms.clamp(MIN_DELAY_MS, MAX_DELAY_MS);
    }

    pub fn set_feedback(&mut self, feedback: f32) {
        self.feedback = clamp_unit(feedback).min(MAX_DELAY_FEEDBACK);
    }

    pub fn set_mix(&mut self, mix: f32) {
        self.mix = clamp_unit(mix);
    }

    pub fn is_enabled(&self) -> bool {
        self.enabled
    }

    pub fn delay_time_ms(&self) -> u32 {
        self.time_ms
    }

    pub fn feedback(&self) -> f32 {
        self.feedback
    }

    pub fn mix(&self) -> f32 {
        self.mix
    }
}

/// clamp into [0,1], NaN counts as 0
pub(crate) fn clamp_unit(val: f32) -> f32 {
    if val.is_nan() {
        0.0
    } else {
        val.clamp(0.0, 1.0)
    }
}

/**
 * Single feedback delay line on 16-bit samples.
 *
 * Storage for the longest delay time is reserved up front, so changing
 * the delay time re-lengths and zeroes the buffer without allocating.
 */
pub struct MonoDelay {
    // user parameters
    enabled: bool,
    time_ms: u32,
    feedback: f32,
    mix: f32,

    // internal parameters
    buffer: Vec<i16>,
    cursor: usize,
    samplerate: f32,
}

impl MonoDelay {
    pub fn new(sr: f32) -> Self {
        let defaults = DelaySettings::default();
        let mut buffer = Vec::with_capacity(delay_buffer_len(MAX_DELAY_MS, sr));
        buffer.resize(delay_buffer_len(defaults.time_ms, sr), 0);

        MonoDelay {
            enabled: defaults.enabled,
            time_ms: defaults.time_ms,
            feedback: defaults.feedback,
            mix: defaults.mix,
            buffer,
            cursor: 0,
            samplerate: sr,
        }
    }

    /// Change the delay time. Zeroes the line and rewinds the cursor.
    /// A request for the current time is a no-op.
    pub fn set_delay_time(&mut self, ms: u32) {
        let ms = ms.clamp(MIN_DELAY_MS, MAX_DELAY_MS);
        if ms == self.time_ms {
            return;
        }

        let len = delay_buffer_len(ms, self.samplerate);
        self.time_ms = ms;
        self.buffer.clear();
        self.buffer.resize(len, 0);
        self.cursor = 0;
    }

    pub fn set_feedback(&mut self, feedback: f32) {
        self.feedback = clamp_unit(feedback).min(MAX_DELAY_FEEDBACK);
    }

    pub fn set_mix(&mut self, mix: f32) {
        self.mix = clamp_unit(mix);
    }

    pub fn apply_settings(&mut self, settings: &DelaySettings) {
        self.set_delay_time(settings.time_ms);
        self.set_feedback(settings.feedback);
        self.set_mix(settings.mix);
        self.set_enabled(settings.enabled);
    }

    pub fn settings(&self) -> DelaySettings {
        DelaySettings {
            enabled: self.enabled,
            time_ms: self.time_ms,
            feedback: self.feedback,
            mix: self.mix,
        }
    }

    pub fn delay_time_ms(&self) -> u32 {
        self.time_ms
    }

    pub fn feedback(&self) -> f32 {
        self.feedback
    }

    pub fn mix(&self) -> f32 {
        self.mix
    }

    /// current line length in samples
    pub fn delay_len(&self) -> usize {
        self.buffer.len()
    }

    pub fn cursor(&self) -> usize {
        self.cursor
    }
}

impl MonoEffect for MonoDelay {
    #[inline(always)]
    fn process(&mut self, sample: i16) -> i16 {
        if !self.enabled {
            return sample;
        }

        let delayed = self.buffer[self.cursor];
        self.buffer[self.cursor] = clamp16(sample as f32 + delayed as f32 * self.feedback);

        // increment delay idx
        self.cursor += 1;
        if self.cursor >= self.buffer.len() {
            self.cursor = 0;
        }

        clamp16(sample as f32 * (1.0 - self.mix) + delayed as f32 * self.mix)
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
    }
}

// TEST TEST TEST
#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_bypass_is_bit_exact() {
        let mut rng = fastrand::Rng::with_seed(42);
        let mut delay = MonoDelay::new(22050.0);
        delay.set_enabled(true);
        // fill the line so bypass can't hide behind silence
        for _ in 0..20000 {
            delay.process(rng.i16(..));
        }
        delay.set_enabled(false);

        for _ in 0..5000 {
            let x = rng.i16(..);
            assert_eq!(delay.process(x), x);
        }
        assert_eq!(delay.process(i16::MIN), i16::MIN);
        assert_eq!(delay.process(i16::MAX), i16::MAX);
    }

    #[test]
    fn test_impulse_response() {
        let mut delay = MonoDelay::new(22050.0);
        delay.set_delay_time(100);
        delay.set_feedback(0.5);
        delay.set_mix(0.5);
        delay.set_enabled(true);

        let len = delay.delay_len();
        assert_eq!(len, 2205 + 10);

        let mut out = Vec::new();
        out.push(delay.process(i16::MAX));
        for _ in 1..(2 * len + 1) {
            out.push(delay.process(0));
        }

        // dry part of the impulse
        assert_eq!(out[0], 16384);
        for s in out.iter().take(len).skip(1) {
            assert_eq!(*s, 0);
        }
        // first echo, m * fullscale
        assert_eq!(out[len], 16384);
        for s in out.iter().take(2 * len).skip(len + 1) {
            assert_eq!(*s, 0);
        }
        // second echo, m * round(g * fullscale)
        assert_eq!(out[2 * len], 8192);
    }

    #[test]
    fn test_feedback_never_runs_away() {
        let mut delay = MonoDelay::new(22050.0);
        delay.set_feedback(5.0);
        assert_eq!(delay.feedback(), 0.95);
        delay.set_feedback(-1.0);
        assert_eq!(delay.feedback(), 0.0);
        delay.set_mix(2.0);
        assert_eq!(delay.mix(), 1.0);
    }

    #[test]
    fn test_delay_time_is_clamped() {
        let mut delay = MonoDelay::new(22050.0);
        delay.set_delay_time(1);
        assert_eq!(delay.delay_time_ms(), 10);
        assert_eq!(delay.delay_len(), 220 + 10);
        delay.set_delay_time(100000);
        assert_eq!(delay.delay_time_ms(), 2000);
        assert_eq!(delay.delay_len(), 44100 + 10);
    }

    #[test]
    fn test_resize_keeps_cursor_in_range() {
        let mut rng = fastrand::Rng::with_seed(7);
        let mut delay = MonoDelay::new(22050.0);
        delay.set_enabled(true);
        let capacity = delay_buffer_len(MAX_DELAY_MS, 22050.0);

        for _ in 0..200 {
            let ms = rng.u32(0..3000);
            delay.set_delay_time(ms);
            assert!(delay.cursor() < delay.delay_len());
            assert_eq!(
                delay.delay_len(),
                delay_buffer_len(ms.clamp(MIN_DELAY_MS, MAX_DELAY_MS), 22050.0)
            );
            assert!(delay.delay_len() <= capacity);

            for _ in 0..rng.usize(0..5000) {
                delay.process(rng.i16(..));
                assert!(delay.cursor() < delay.delay_len());
            }
        }
    }

    #[test]
    fn test_resize_zeroes_the_line() {
        let mut delay = MonoDelay::new(22050.0);
        delay.set_enabled(true);
        delay.set_mix(1.0);
        for _ in 0..1000 {
            delay.process(i16::MAX);
        }
        delay.set_delay_time(50);
        for _ in 0..delay.delay_len() {
            assert_eq!(delay.process(0), 0);
        }
    }

    #[test]
    fn test_reset_keeps_size() {
        let mut delay = MonoDelay::new(22050.0);
        delay.set_enabled(true);
        delay.set_mix(1.0);
        delay.set_delay_time(20);
        let len = delay.delay_len();
        for _ in 0..100 {
            delay.process(1000);
        }
        delay.reset();
        assert_eq!(delay.delay_len(), len);
        for _ in 0..len {
            assert_eq!(delay.process(0), 0);
        }
    }

    #[test]
    fn test_settings_clamp_like_the_stage() {
        let settings = DelaySettings::new(5, 2.0, -3.0);
        assert_eq!(settings.delay_time_ms(), 10);
        assert_eq!(settings.feedback(), 0.95);
        assert_eq!(settings.mix(), 0.0);

        let mut delay = MonoDelay::new(22050.0);
        let mut settings = DelaySettings::new(600, 0.6, 0.5);
        settings.set_enabled(true);
        delay.apply_settings(&settings);
        assert_eq!(delay.settings(), settings);
        assert!(delay.is_enabled());
    }
}
