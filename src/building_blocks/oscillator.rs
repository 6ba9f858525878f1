use crate::building_blocks::{clamp16, FULL_SCALE};

pub const SINE_TABLE_SIZE: usize = 256;
pub const MIN_FREQUENCY: f32 = 0.1;
pub const MAX_FREQUENCY: f32 = 20000.0;

lazy_static! {
    /// one full sine period, so the audio path never calls `sin()`
    pub static ref SINE_TABLE: [f32; SINE_TABLE_SIZE] = {
        let mut table = [0.0; SINE_TABLE_SIZE];
        for (i, val) in table.iter_mut().enumerate() {
            *val = (2.0 * std::f32::consts::PI * i as f32 / SINE_TABLE_SIZE as f32).sin();
        }
        table
    };
}

/// The closed set of shapes an oscillator can produce.
#[repr(C)]
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Waveform {
    Silent,
    Sine,
    Square,
    Triangle,
    Sawtooth,
}

impl Waveform {
    /// value of this shape at `phase` (in [0,1)), in [-1, 1]
    #[inline(always)]
    pub fn shape(&self, phase: f32) -> f32 {
        match self {
            Waveform::Silent => 0.0,
            Waveform::Sine => SINE_TABLE[(phase * SINE_TABLE_SIZE as f32) as usize & (SINE_TABLE_SIZE - 1)],
            Waveform::Square => {
                if phase < 0.5 {
                    -1.0
                } else {
                    1.0
                }
            }
            Waveform::Triangle => {
                if phase < 0.5 {
                    4.0 * phase - 1.0
                } else {
                    3.0 - 4.0 * phase
                }
            }
            Waveform::Sawtooth => 2.0 * phase - 1.0,
        }
    }

    pub fn is_silent(&self) -> bool {
        matches!(self, Waveform::Silent)
    }
}

/**
 * A phase-accumulator oscillator.
 *
 * Each instance owns its phase, so any number of them
 * (three voices plus the chorus LFO) can run side by side.
 */
#[derive(Clone, Debug)]
pub struct Oscillator {
    waveform: Waveform,
    phase: f32,
    freq: f32,
    octave_shift: i8,
    volume: f32,
    samplerate: f32,
}

impl Oscillator {
    pub fn new(sr: f32) -> Self {
        Oscillator {
            waveform: Waveform::Sine,
            phase: 0.0,
            freq: 440.0,
            octave_shift: 0,
            volume: 1.0,
            samplerate: sr,
        }
    }

    pub fn with_waveform(waveform: Waveform, freq: f32, sr: f32) -> Self {
        let mut osc = Oscillator::new(sr);
        osc.set_waveform(waveform);
        osc.set_frequency(freq);
        osc
    }

    pub fn set_frequency(&mut self, hz: f32) {
        // NaN would poison the phase forever
        self.freq = if hz.is_nan() {
            MIN_FREQUENCY
        } else {
            hz.clamp(MIN_FREQUENCY, MAX_FREQUENCY)
        };
    }

    pub fn set_waveform(&mut self, waveform: Waveform) {
        self.waveform = waveform;
    }

    /// -1 is an octave down, +1 an octave up, anything else is clamped
    pub fn set_octave_shift(&mut self, shift: i32) {
        self.octave_shift = shift.clamp(-1, 1) as i8;
    }

    pub fn set_volume(&mut self, volume: f32) {
        self.volume = if volume.is_nan() {
            0.0
        } else {
            volume.clamp(0.0, 1.0)
        };
    }

    pub fn reset_phase(&mut self) {
        self.phase = 0.0;
    }

    pub fn waveform(&self) -> Waveform {
        self.waveform
    }

    pub fn frequency(&self) -> f32 {
        self.freq
    }

    pub fn octave_shift(&self) -> i32 {
        self.octave_shift as i32
    }

    pub fn volume(&self) -> f32 {
        self.volume
    }

    pub fn phase(&self) -> f32 {
        self.phase
    }

    pub fn is_active(&self) -> bool {
        !self.waveform.is_silent()
    }

    pub fn effective_frequency(&self) -> f32 {
        match self.octave_shift {
            -1 => self.freq * 0.5,
            1 => self.freq * 2.0,
            _ => self.freq,
        }
    }

    #[inline(always)]
    fn next_raw(&mut self) -> f32 {
        let val = self.waveform.shape(self.phase);

        self.phase += self.effective_frequency() / self.samplerate;
        if self.phase >= 1.0 {
            self.phase -= self.phase.floor();
        }

        val
    }

    /// next sample, full 16-bit range scaled by volume
    #[inline(always)]
    pub fn next_sample(&mut self) -> i16 {
        clamp16(self.next_raw() * self.volume * FULL_SCALE)
    }

    /// Same as `next_sample`, but in [-1, 1].
    /// Meant for modulation, not for the audio mix.
    #[inline(always)]
    pub fn next_sample_normalized(&mut self) -> f32 {
        self.next_sample() as f32 / FULL_SCALE
    }
}
