pub mod chorus;
pub mod delay;
pub mod effects_chain;
pub mod freeverb;
pub mod oscillator;
pub mod presets;

pub use crate::building_blocks::chorus::*;
pub use crate::building_blocks::delay::*;
pub use crate::building_blocks::effects_chain::*;
pub use crate::building_blocks::freeverb::*;
pub use crate::building_blocks::oscillator::*;
pub use crate::building_blocks::presets::*;

/// largest positive sample value, used as "full scale"
pub const FULL_SCALE: f32 = i16::MAX as f32;

/// Saturate a float into the 16-bit sample range, rounding to nearest.
#[inline(always)]
pub fn clamp16(val: f32) -> i16 {
    val.round().clamp(i16::MIN as f32, i16::MAX as f32) as i16
}

/// Saturate a wide integer into the 16-bit sample range.
#[inline(always)]
pub fn clamp16_i32(val: i32) -> i16 {
    val.clamp(i16::MIN as i32, i16::MAX as i32) as i16
}

/// Force anything quieter than `threshold` to exact zero.
#[inline(always)]
pub fn noise_gate(sample: i16, threshold: i16) -> i16 {
    if (sample as i32).abs() < threshold as i32 {
        0
    } else {
        sample
    }
}

/// length of `ms` milliseconds at `samplerate`, truncated
#[inline(always)]
pub fn ms_to_samples(ms: f32, samplerate: f32) -> usize {
    ((ms / 1000.0) * samplerate) as usize
}

/// Every stage in the effects chain is a mono, sample-by-sample
/// effect on 16-bit samples.
///
/// A disabled effect must return its input untouched (bit-exact bypass).
pub trait MonoEffect {
    fn process(&mut self, sample: i16) -> i16;
    fn set_enabled(&mut self, enabled: bool);
    fn is_enabled(&self) -> bool;

    /// zero all internal state, keep buffer sizes
    fn reset(&mut self);
}

// TEST TEST TEST
#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_clamp16_saturates_and_rounds() {
        assert_eq!(clamp16(40000.0), i16::MAX);
        assert_eq!(clamp16(-40000.0), i16::MIN);
        assert_eq!(clamp16(1.5), 2);
        assert_eq!(clamp16(-1.4), -1);
        assert_eq!(clamp16_i32(i32::MAX), i16::MAX);
        assert_eq!(clamp16_i32(-70000), i16::MIN);
    }

    #[test]
    fn test_noise_gate_is_symmetric() {
        assert_eq!(noise_gate(99, 100), 0);
        assert_eq!(noise_gate(-99, 100), 0);
        assert_eq!(noise_gate(100, 100), 100);
        assert_eq!(noise_gate(-100, 100), -100);
        assert_eq!(noise_gate(i16::MIN, 100), i16::MIN);
        assert_eq!(noise_gate(5, 0), 5);
    }

    #[test]
    fn test_ms_to_samples() {
        assert_eq!(ms_to_samples(1000.0, 22050.0), 22050);
        assert_eq!(ms_to_samples(10.0, 22050.0), 220);
    }
}
