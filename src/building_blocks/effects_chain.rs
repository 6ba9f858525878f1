use crate::building_blocks::*;

/// Tunables of the whole chain, one plain value the control path
/// can copy in and out under a single lock.
#[derive(Clone, Copy, Debug, Default, PartialEq)]
pub struct EffectsSettings {
    pub delay: DelaySettings,
    pub chorus: ChorusSettings,
    pub reverb: ReverbSettings,
}

/// Delay -> Chorus -> Reverb, each stage bypassable on its own.
pub struct EffectsChain {
    delay: MonoDelay,
    chorus: MonoChorus,
    reverb: MonoFreeverb,
}

impl EffectsChain {
    pub fn new(sr: f32) -> Self {
        EffectsChain {
            delay: MonoDelay::new(sr),
            chorus: MonoChorus::new(sr),
            reverb: MonoFreeverb::new(sr),
        }
    }

    pub fn with_reverb_tuning(sr: f32, tuning: FreeverbTuning) -> Self {
        EffectsChain {
            delay: MonoDelay::new(sr),
            chorus: MonoChorus::new(sr),
            reverb: MonoFreeverb::with_tuning(tuning),
        }
    }

    #[inline(always)]
    pub fn process(&mut self, sample: i16) -> i16 {
        let sample = self.delay.process(sample);
        let sample = self.chorus.process(sample);
        self.reverb.process(sample)
    }

    pub fn delay(&self) -> &MonoDelay {
        &self.delay
    }

    pub fn delay_mut(&mut self) -> &mut MonoDelay {
        &mut self.delay
    }

    pub fn chorus(&self) -> &MonoChorus {
        &self.chorus
    }

    pub fn chorus_mut(&mut self) -> &mut MonoChorus {
        &mut self.chorus
    }

    pub fn reverb(&self) -> &MonoFreeverb {
        &self.reverb
    }

    pub fn reverb_mut(&mut self) -> &mut MonoFreeverb {
        &mut self.reverb
    }

    pub fn set_delay_preset(&mut self, preset: DelayPreset) {
        let mut settings = self.delay.settings();
        preset.apply(&mut settings);
        self.delay.apply_settings(&settings);
    }

    pub fn set_chorus_preset(&mut self, preset: ChorusPreset) {
        let mut settings = self.chorus.settings();
        preset.apply(&mut settings);
        self.chorus.apply_settings(&settings);
    }

    pub fn set_reverb_preset(&mut self, preset: ReverbPreset) {
        let mut settings = self.reverb.settings();
        preset.apply(&mut settings);
        self.reverb.apply_settings(&settings);
    }

    /// Bring every stage in line with `settings`.
    /// A changed delay time re-lengths the delay line,
    /// so call this between buffers only.
    pub fn apply_settings(&mut self, settings: &EffectsSettings) {
        self.delay.apply_settings(&settings.delay);
        self.chorus.apply_settings(&settings.chorus);
        self.reverb.apply_settings(&settings.reverb);
    }

    pub fn settings(&self) -> EffectsSettings {
        EffectsSettings {
            delay: self.delay.settings(),
            chorus: self.chorus.settings(),
            reverb: self.reverb.settings(),
        }
    }

    pub fn reset(&mut self) {
        self.delay.reset();
        self.chorus.reset();
        self.reverb.reset();
    }
}

// TEST TEST TEST
#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_all_bypassed_is_identity() {
        let mut rng = fastrand::Rng::with_seed(5);
        let mut chain = EffectsChain::new(22050.0);
        for _ in 0..5000 {
            let x = rng.i16(..);
            assert_eq!(chain.process(x), x);
        }
    }

    #[test]
    fn test_stage_order() {
        let mut chain = EffectsChain::new(22050.0);
        chain.set_delay_preset(DelayPreset::Short);
        chain.set_chorus_preset(ChorusPreset::Medium);
        chain.set_reverb_preset(ReverbPreset::Normal);
        let settings = chain.settings();

        let mut delay = MonoDelay::new(22050.0);
        delay.apply_settings(&settings.delay);
        let mut chorus = MonoChorus::new(22050.0);
        chorus.apply_settings(&settings.chorus);
        let mut reverb = MonoFreeverb::new(22050.0);
        reverb.apply_settings(&settings.reverb);

        let mut osc = Oscillator::with_waveform(Waveform::Triangle, 330.0, 22050.0);
        for _ in 0..20000 {
            let x = osc.next_sample();
            let expected = reverb.process(chorus.process(delay.process(x)));
            assert_eq!(chain.process(x), expected);
        }
    }

    #[test]
    fn test_presets_and_settings() {
        let mut chain = EffectsChain::new(22050.0);
        chain.set_delay_preset(DelayPreset::Long);
        assert!(chain.delay().is_enabled());
        assert_eq!(chain.delay().delay_time_ms(), 600);

        chain.set_reverb_preset(ReverbPreset::Max);
        assert_approx_eq::assert_approx_eq!(chain.reverb().comb_feedback(), 0.94, 0.00001);

        chain.set_delay_preset(DelayPreset::Off);
        assert!(!chain.delay().is_enabled());

        let mut settings = EffectsSettings::default();
        settings.chorus.set_enabled(true);
        settings.chorus.set_depth(42.0);
        chain.apply_settings(&settings);
        assert_eq!(chain.settings(), settings);
    }

    #[test]
    fn test_accessors_reach_the_stages() {
        let mut chain = EffectsChain::new(22050.0);
        chain.delay_mut().set_enabled(true);
        chain.delay_mut().set_feedback(0.4);
        chain.chorus_mut().set_rate(3.0);
        chain.reverb_mut().set_damping(0.9);

        assert_approx_eq::assert_approx_eq!(chain.delay().feedback(), 0.4, 0.00001);
        assert_approx_eq::assert_approx_eq!(chain.chorus().rate(), 3.0, 0.00001);
        assert_approx_eq::assert_approx_eq!(chain.reverb().damping(), 0.9, 0.00001);
    }

    #[test]
    fn test_reset_silences_tails() {
        let mut chain = EffectsChain::new(22050.0);
        chain.set_delay_preset(DelayPreset::Long);
        chain.set_reverb_preset(ReverbPreset::Max);
        for _ in 0..5000 {
            chain.process(20000);
        }
        chain.reset();
        for _ in 0..20000 {
            assert_eq!(chain.process(0), 0);
        }
    }
}
