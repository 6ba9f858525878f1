use parking_lot::Mutex;
use std::sync::Arc;
use std::time::{Duration, Instant};

use crate::building_blocks::*;
use crate::config::EngineConfig;
use crate::stats::RenderStats;
use crate::theremin::{ChannelMode, ParameterRegion, NUM_CHANNELS, NUM_OSCILLATORS};

/// average of the active voices, None if all are silent
#[inline(always)]
pub(crate) fn average(sum: i32, active: i32) -> Option<i32> {
    if active == 0 {
        None
    } else {
        Some(sum / active)
    }
}

/// This is the "Playhead", that is, the part you use in the audio thread.
///
/// Owns the oscillators and the effects chain. Each call to `process`
/// renders one buffer of `BUFSIZE` interleaved stereo frames. It never
/// waits on the control side: if the parameter lock is taken, the
/// values from the last successful read are used.
pub struct ThereminPlayhead<const BUFSIZE: usize> {
    params: Arc<Mutex<ParameterRegion>>,
    stats: Arc<RenderStats>,
    current: ParameterRegion,
    applied_effects: EffectsSettings,
    oscillators: [Oscillator; NUM_OSCILLATORS],
    effects: EffectsChain,
    smoothed_amplitude: f32,
    smoothed_frequency: f32,
    out_buf: Vec<i16>,
    buffer_period: Duration,
}

impl<const BUFSIZE: usize> ThereminPlayhead<BUFSIZE> {
    pub(crate) fn new(
        config: &EngineConfig,
        params: &Arc<Mutex<ParameterRegion>>,
        stats: &Arc<RenderStats>,
    ) -> Self {
        let sr = config.sample_rate as f32;
        let current = *params.lock();

        let mut effects = match config.reverb_tuning {
            Some(tuning) => EffectsChain::with_reverb_tuning(sr, tuning),
            None => EffectsChain::new(sr),
        };
        effects.apply_settings(&current.effects);

        let mut playhead = ThereminPlayhead {
            params: Arc::clone(params),
            stats: Arc::clone(stats),
            current,
            applied_effects: current.effects,
            oscillators: [Oscillator::new(sr), Oscillator::new(sr), Oscillator::new(sr)],
            effects,
            smoothed_amplitude: 0.0,
            smoothed_frequency: current.frequency,
            out_buf: vec![0; BUFSIZE * NUM_CHANNELS],
            buffer_period: Duration::from_secs_f64(BUFSIZE as f64 / sr as f64),
        };
        playhead.update_oscillators();
        playhead
    }

    pub(crate) fn shared_state(&self) -> (Arc<Mutex<ParameterRegion>>, Arc<RenderStats>) {
        (Arc::clone(&self.params), Arc::clone(&self.stats))
    }

    /// Pull in the latest parameters if the lock is free, then advance
    /// pitch and amplitude smoothing by one step.
    fn update_parameters(&mut self) {
        match self.params.try_lock() {
            Some(params) => self.current = *params,
            None => self.stats.record_lock_miss(),
        }

        let p = &self.current;
        // a freshly narrowed range applies at once, not after the glide
        self.smoothed_frequency = self
            .smoothed_frequency
            .clamp(p.min_frequency, p.max_frequency);
        self.smoothed_frequency += (p.frequency - self.smoothed_frequency) * p.pitch_smoothing;
        self.smoothed_amplitude += (p.amplitude - self.smoothed_amplitude) * p.volume_smoothing;

        self.update_oscillators();

        // between buffers is the only place the delay line may be resized
        if self.current.effects != self.applied_effects {
            self.effects.apply_settings(&self.current.effects);
            self.applied_effects = self.current.effects;
            self.stats.record_retune();
        }
    }

    fn update_oscillators(&mut self) {
        for (osc, settings) in self.oscillators.iter_mut().zip(self.current.oscillators.iter()) {
            osc.set_frequency(self.smoothed_frequency);
            osc.set_waveform(settings.waveform);
            osc.set_octave_shift(settings.octave_shift);
            osc.set_volume(settings.volume);
        }
    }

    #[inline(always)]
    fn next_mixed_sample(&mut self) -> i16 {
        let mut sum: i32 = 0;
        let mut active: i32 = 0;

        for osc in self.oscillators.iter_mut().filter(|o| o.is_active()) {
            sum += osc.next_sample() as i32;
            active += 1;
        }

        // averaging keeps the mix in range, no clamp needed
        average(sum, active).map_or(0, clamp16_i32)
    }

    /// Render the next buffer, interleaved L/R.
    pub fn process(&mut self) -> &[i16] {
        let start = Instant::now();

        self.update_parameters();

        let gain = self.smoothed_amplitude / 100.0;
        let gate = self.current.master_noise_gate;
        let mode = self.current.channel_mode;

        for frame in 0..BUFSIZE {
            let mixed = self.next_mixed_sample();
            let wet = self.effects.process(mixed);
            let sample = noise_gate(clamp16(wet as f32 * gain), gate);

            let (left, right) = match mode {
                ChannelMode::Stereo => (sample, sample),
                ChannelMode::LeftOnly => (sample, 0),
                ChannelMode::RightOnly => (0, sample),
            };
            self.out_buf[frame * NUM_CHANNELS] = left;
            self.out_buf[frame * NUM_CHANNELS + 1] = right;
        }

        // overruns are reported from the control side
        self.stats.record_render(start.elapsed(), self.buffer_period);

        &self.out_buf
    }

    pub fn smoothed_amplitude(&self) -> f32 {
        self.smoothed_amplitude
    }

    pub fn smoothed_frequency(&self) -> f32 {
        self.smoothed_frequency
    }

    pub fn oscillators(&self) -> &[Oscillator] {
        &self.oscillators
    }

    pub fn effects(&self) -> &EffectsChain {
        &self.effects
    }

}
