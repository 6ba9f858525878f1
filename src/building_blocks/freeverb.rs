use crate::building_blocks::delay::clamp_unit;
use crate::building_blocks::{clamp16, clamp16_i32, ms_to_samples, noise_gate, MonoEffect};

pub const NUM_COMBS: usize = 8;
pub const NUM_ALLPASSES: usize = 4;

// feedback caps above this are never accepted, whatever the tuning says
const FEEDBACK_CEILING: f32 = 0.98;

// more fractional bits than this overflow the i64 filter math
pub const MAX_PRECISION_BITS: u32 = 16;

// damping/feedback coefficients are Q16
const COEFF_BITS: u32 = 16;
const COEFF_ONE: i64 = 1 << COEFF_BITS;

#[inline(always)]
fn to_coeff(val: f32) -> i64 {
    (val * COEFF_ONE as f32).round() as i64
}

struct FreeverbDefaultTuning;

/// The default tuning, with the delay times expressed in milliseconds
/// so they can be scaled to any sample rate.
impl FreeverbDefaultTuning {
    const FIXED_GAIN: f32 = 0.015;
    const SCALE_WET: f32 = 3.0;
    const SCALE_DAMP: f32 = 0.4;
    const SCALE_ROOM: f32 = 0.66;
    const OFFSET_ROOM: f32 = 0.28;
    const MAX_FEEDBACK: f32 = 0.94;
    const INPUT_GATE: i16 = 100;
    const OUTPUT_GATE: i16 = 100;
    const FILTER_GATE: f32 = 1.0;
    const PRECISION_BITS: u32 = 8;

    const COMB_TUNING_MS: [f32; NUM_COMBS] =
        [25.31, 26.94, 28.96, 30.75, 32.24, 33.81, 35.31, 36.66];
    const ALLPASS_TUNING_MS: [f32; NUM_ALLPASSES] = [12.61, 10.0, 7.73, 5.1];
}

/// Every constant the reverb depends on.
///
/// `FreeverbTuning::new` gives the stock values; any field may be
/// changed before handing the tuning to `MonoFreeverb::with_tuning`.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct FreeverbTuning {
    /// input gain before the comb bank
    pub fixed_gain: f32,
    /// gain on the allpass output
    pub scale_wet: f32,
    pub scale_damp: f32,
    pub scale_room: f32,
    pub offset_room: f32,
    /// comb feedback never exceeds this, whatever the room size
    pub max_feedback: f32,
    pub input_gate: i16,
    pub output_gate: i16,
    /// gate on the comb filter state, in sample units
    pub filter_gate: f32,
    /// extra fractional bits for the comb filter state
    pub precision_bits: u32,
    pub comb_tuning: [usize; NUM_COMBS],
    pub allpass_tuning: [usize; NUM_ALLPASSES],
}

impl FreeverbTuning {
    pub fn new(sr: f32) -> Self {
        let mut comb_tuning = [0; NUM_COMBS];
        for (len, ms) in comb_tuning
            .iter_mut()
            .zip(FreeverbDefaultTuning::COMB_TUNING_MS.iter())
        {
            *len = ms_to_samples(*ms, sr).max(1);
        }

        let mut allpass_tuning = [0; NUM_ALLPASSES];
        for (len, ms) in allpass_tuning
            .iter_mut()
            .zip(FreeverbDefaultTuning::ALLPASS_TUNING_MS.iter())
        {
            *len = ms_to_samples(*ms, sr).max(1);
        }

        FreeverbTuning {
            fixed_gain: FreeverbDefaultTuning::FIXED_GAIN,
            scale_wet: FreeverbDefaultTuning::SCALE_WET,
            scale_damp: FreeverbDefaultTuning::SCALE_DAMP,
            scale_room: FreeverbDefaultTuning::SCALE_ROOM,
            offset_room: FreeverbDefaultTuning::OFFSET_ROOM,
            max_feedback: FreeverbDefaultTuning::MAX_FEEDBACK,
            input_gate: FreeverbDefaultTuning::INPUT_GATE,
            output_gate: FreeverbDefaultTuning::OUTPUT_GATE,
            filter_gate: FreeverbDefaultTuning::FILTER_GATE,
            precision_bits: FreeverbDefaultTuning::PRECISION_BITS,
            comb_tuning,
            allpass_tuning,
        }
    }
}

/**
 * Comb filter with a one-pole lowpass in the feedback path.
 *
 * The lowpass state lives at `precision_bits` extra fractional bits.
 * All downshifts truncate toward zero, so a decaying tail can only
 * shrink in magnitude and ends in exact silence.
 */
pub struct Comb {
    buffer: Vec<i16>,
    cursor: usize,
    feedback: i64,
    filterstore: i64,
    damp1: i64,
    damp2: i64,
    precision_bits: u32,
    filter_gate: i64,
}

impl Comb {
    pub fn with_buffer_size(size: usize, precision_bits: u32, filter_gate: f32) -> Self {
        let precision_bits = precision_bits.min(MAX_PRECISION_BITS);
        Comb {
            buffer: vec![0; size.max(1)],
            cursor: 0,
            feedback: 0,
            filterstore: 0,
            damp1: 0,
            damp2: COEFF_ONE,
            precision_bits,
            filter_gate: (filter_gate * (1i64 << precision_bits) as f32) as i64,
        }
    }

    pub fn set_feedback(&mut self, feedback: f32) {
        self.feedback = to_coeff(feedback);
    }

    pub fn set_damp(&mut self, damp: f32) {
        self.damp1 = to_coeff(damp);
        self.damp2 = COEFF_ONE - self.damp1;
    }

    pub fn len(&self) -> usize {
        self.buffer.len()
    }

    pub fn is_empty(&self) -> bool {
        self.buffer.is_empty()
    }

    pub fn reset(&mut self) {
        self.buffer.iter_mut().for_each(|s| *s = 0);
        self.filterstore = 0;
        self.cursor = 0;
    }

    fn is_settled(&self) -> bool {
        self.filterstore == 0 && self.buffer.iter().all(|s| *s == 0)
    }

    /// sum of squares of everything circulating in the feedback loop
    #[cfg(test)]
    fn stored_energy(&self) -> u64 {
        self.buffer
            .iter()
            .map(|s| (*s as i64 * *s as i64) as u64)
            .sum()
    }

    #[inline(always)]
    pub fn process_sample(&mut self, input: i16) -> i16 {
        let out = self.buffer[self.cursor];

        self.filterstore = (((out as i64) << self.precision_bits) * self.damp2
            + self.filterstore * self.damp1)
            / COEFF_ONE;

        if self.filterstore.abs() < self.filter_gate {
            self.filterstore = 0;
        }

        let next = (((input as i64) << self.precision_bits)
            + self.filterstore * self.feedback / COEFF_ONE)
            / (1i64 << self.precision_bits);

        self.buffer[self.cursor] = next.clamp(i16::MIN as i64, i16::MAX as i64) as i16;

        self.cursor += 1;
        if self.cursor >= self.buffer.len() {
            self.cursor = 0;
        }

        out
    }
}

/**
 * Schroeder allpass with a fixed 0.5 feedback.
 */
pub struct Allpass {
    buffer: Vec<i16>,
    cursor: usize,
}

impl Allpass {
    pub fn with_buffer_size(size: usize) -> Self {
        Allpass {
            buffer: vec![0; size.max(1)],
            cursor: 0,
        }
    }

    pub fn len(&self) -> usize {
        self.buffer.len()
    }

    pub fn is_empty(&self) -> bool {
        self.buffer.is_empty()
    }

    pub fn reset(&mut self) {
        self.buffer.iter_mut().for_each(|s| *s = 0);
        self.cursor = 0;
    }

    fn is_settled(&self) -> bool {
        self.buffer.iter().all(|s| *s == 0)
    }

    #[inline(always)]
    pub fn process_sample(&mut self, input: i16) -> i16 {
        let bufout = self.buffer[self.cursor] as i32;

        let output = -(input as i32) + bufout;
        self.buffer[self.cursor] = clamp16_i32(input as i32 + bufout / 2);

        self.cursor += 1;
        if self.cursor >= self.buffer.len() {
            self.cursor = 0;
        }

        clamp16_i32(output)
    }
}

/// The reverb tunables as the control path sees them.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct ReverbSettings {
    enabled: bool,
    room_size: f32,
    damping: f32,
    mix: f32,
}

impl Default for ReverbSettings {
    fn default() -> Self {
        ReverbSettings {
            enabled: false,
            room_size: 0.5,
            damping: 0.5,
            mix: 0.3,
        }
    }
}

impl ReverbSettings {
    pub fn new(room_size: f32, damping: f32, mix: f32) -> Self {
        let mut settings = ReverbSettings::default();
        settings.set_room_size(room_size);
        settings.set_damping(damping);
        settings.set_mix(mix);
        settings
    }

    pub fn set_enabled(&mut self, enabled: bool) {
        self.enabled = enabled;
    }

    pub fn set_room_size(&mut self, room_size: f32) {
        self.room_size = clamp_unit(room_size);
    }

    pub fn set_damping(&mut self, damping: f32) {
        self.damping = clamp_unit(damping);
    }

    pub fn set_mix(&mut self, mix: f32) {
        self.mix = clamp_unit(mix);
    }

    pub fn is_enabled(&self) -> bool {
        self.enabled
    }

    pub fn room_size(&self) -> f32 {
        self.room_size
    }

    pub fn damping(&self) -> f32 {
        self.damping
    }

    pub fn mix(&self) -> f32 {
        self.mix
    }
}

/**
 * Mono Freeverb on 16-bit samples: 8 parallel combs into 4 serial allpasses.
 *
 * Noise gates sit at the input, on each comb's filter state and at the
 * output, so quantization noise never circulates in the feedback loops.
 */
pub struct MonoFreeverb {
    enabled: bool,
    room_size: f32,
    damping: f32,
    mix: f32,
    combs: Vec<Comb>,
    allpasses: Vec<Allpass>,
    tuning: FreeverbTuning,
}

impl MonoFreeverb {
    pub fn new(sr: f32) -> Self {
        MonoFreeverb::with_tuning(FreeverbTuning::new(sr))
    }

    pub fn with_tuning(mut tuning: FreeverbTuning) -> Self {
        tuning.max_feedback = clamp_unit(tuning.max_feedback).min(FEEDBACK_CEILING);
        tuning.precision_bits = tuning.precision_bits.min(MAX_PRECISION_BITS);

        let combs = tuning
            .comb_tuning
            .iter()
            .map(|len| Comb::with_buffer_size(*len, tuning.precision_bits, tuning.filter_gate))
            .collect();

        let allpasses = tuning
            .allpass_tuning
            .iter()
            .map(|len| Allpass::with_buffer_size(*len))
            .collect();

        let defaults = ReverbSettings::default();
        let mut reverb = MonoFreeverb {
            enabled: defaults.enabled,
            room_size: defaults.room_size,
            damping: defaults.damping,
            mix: defaults.mix,
            combs,
            allpasses,
            tuning,
        };

        reverb.set_room_size(defaults.room_size);
        reverb.set_damping(defaults.damping);
        reverb
    }

    pub fn set_room_size(&mut self, room_size: f32) {
        self.room_size = clamp_unit(room_size);
        let feedback = self.comb_feedback();
        for comb in self.combs.iter_mut() {
            comb.set_feedback(feedback);
        }
    }

    pub fn set_damping(&mut self, damping: f32) {
        self.damping = clamp_unit(damping);
        let damp = self.damping * self.tuning.scale_damp;
        for comb in self.combs.iter_mut() {
            comb.set_damp(damp);
        }
    }

    pub fn set_mix(&mut self, mix: f32) {
        self.mix = clamp_unit(mix);
    }

    pub fn apply_settings(&mut self, settings: &ReverbSettings) {
        if settings.room_size != self.room_size {
            self.set_room_size(settings.room_size);
        }
        if settings.damping != self.damping {
            self.set_damping(settings.damping);
        }
        self.set_mix(settings.mix);
        self.set_enabled(settings.enabled);
    }

    pub fn settings(&self) -> ReverbSettings {
        ReverbSettings {
            enabled: self.enabled,
            room_size: self.room_size,
            damping: self.damping,
            mix: self.mix,
        }
    }

    pub fn room_size(&self) -> f32 {
        self.room_size
    }

    pub fn damping(&self) -> f32 {
        self.damping
    }

    pub fn mix(&self) -> f32 {
        self.mix
    }

    /// feedback the combs currently run with
    pub fn comb_feedback(&self) -> f32 {
        (self.room_size * self.tuning.scale_room + self.tuning.offset_room)
            .min(self.tuning.max_feedback)
    }

    pub fn tuning(&self) -> &FreeverbTuning {
        &self.tuning
    }

    /// length of the longest comb, i.e. one full comb period
    pub fn longest_comb_len(&self) -> usize {
        self.combs.iter().map(|c| c.len()).max().unwrap_or(1)
    }

    #[cfg(test)]
    fn comb_energy(&self) -> u64 {
        self.combs.iter().map(|c| c.stored_energy()).sum()
    }

    /// true once every buffer and filter state is exactly zero
    pub fn is_settled(&self) -> bool {
        self.combs.iter().all(|c| c.is_settled()) && self.allpasses.iter().all(|a| a.is_settled())
    }
}

impl MonoEffect for MonoFreeverb {
    fn process(&mut self, sample: i16) -> i16 {
        if !self.enabled {
            return sample;
        }

        let input = noise_gate(sample, self.tuning.input_gate);
        let scaled = clamp16(input as f32 * self.tuning.fixed_gain);

        let mut comb_sum: i32 = 0;
        for comb in self.combs.iter_mut() {
            comb_sum += comb.process_sample(scaled) as i32;
        }

        let mut acc = clamp16_i32(comb_sum / self.combs.len() as i32);
        for allpass in self.allpasses.iter_mut() {
            acc = allpass.process_sample(acc);
        }

        let wet = acc as f32 * self.tuning.scale_wet;
        let out = clamp16(input as f32 * (1.0 - self.mix) + wet * self.mix);

        noise_gate(out, self.tuning.output_gate)
    }

    fn set_enabled(&mut self, enabled: bool) {
        self.enabled = enabled;
    }

    fn is_enabled(&self) -> bool {
        self.enabled
    }

    fn reset(&mut self) {
        for comb in self.combs.iter_mut() {
            comb.reset();
        }
        for allpass in self.allpasses.iter_mut() {
            allpass.reset();
        }
    }
}
