use crate::building_blocks::{ChorusSettings, DelaySettings, ReverbSettings};

/// Named delay settings. `Off` only disables the stage
/// and leaves the tunables alone.
#[repr(C)]
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum DelayPreset {
    Off,
    Short,
    Medium,
    Long,
}

impl DelayPreset {
    pub fn apply(&self, settings: &mut DelaySettings) {
        let (time_ms, feedback, mix) = match self {
            DelayPreset::Off => {
                settings.set_enabled(false);
                return;
            }
            DelayPreset::Short => (150, 0.3, 0.3),
            DelayPreset::Medium => (300, 0.5, 0.4),
            DelayPreset::Long => (600, 0.6, 0.5),
        };
        *settings = DelaySettings::new(time_ms, feedback, mix);
        settings.set_enabled(true);
    }
}

#[repr(C)]
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ChorusPreset {
    Off,
    Min,
    Medium,
    Max,
}

impl ChorusPreset {
    pub fn apply(&self, settings: &mut ChorusSettings) {
        let (rate, depth_ms, mix) = match self {
            ChorusPreset::Off => {
                settings.set_enabled(false);
                return;
            }
            ChorusPreset::Min => (0.5, 5.0, 0.25),
            ChorusPreset::Medium => (2.0, 15.0, 0.4),
            ChorusPreset::Max => (4.0, 30.0, 0.5),
        };
        *settings = ChorusSettings::new(rate, depth_ms, mix);
        settings.set_enabled(true);
    }
}

#[repr(C)]
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ReverbPreset {
    Off,
    Small,
    Normal,
    Max,
}

impl ReverbPreset {
    pub fn apply(&self, settings: &mut ReverbSettings) {
        let (room_size, damping, mix) = match self {
            ReverbPreset::Off => {
                settings.set_enabled(false);
                return;
            }
            ReverbPreset::Small => (0.3, 0.6, 0.2),
            ReverbPreset::Normal => (0.5, 0.5, 0.3),
            ReverbPreset::Max => (1.0, 0.3, 0.45),
        };
        *settings = ReverbSettings::new(room_size, damping, mix);
        settings.set_enabled(true);
    }
}

/// How quickly the engine follows pitch/volume changes.
#[repr(C)]
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum SmoothingPreset {
    None,
    Normal,
    Extra,
}

impl SmoothingPreset {
    /// EMA factor per buffer, 1.0 means "jump straight to the target"
    pub fn factor(&self) -> f32 {
        match self {
            SmoothingPreset::None => 1.0,
            SmoothingPreset::Normal => 0.8,
            SmoothingPreset::Extra => 0.5,
        }
    }
}

// TEST TEST TEST
#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_delay_presets() {
        let mut settings = DelaySettings::default();
        DelayPreset::Long.apply(&mut settings);
        assert!(settings.is_enabled());
        assert_eq!(settings.delay_time_ms(), 600);
        assert_approx_eq::assert_approx_eq!(settings.feedback(), 0.6, 0.00001);
        assert_approx_eq::assert_approx_eq!(settings.mix(), 0.5, 0.00001);

        DelayPreset::Off.apply(&mut settings);
        assert!(!settings.is_enabled());
        // tunables survive "off"
        assert_eq!(settings.delay_time_ms(), 600);

        DelayPreset::Short.apply(&mut settings);
        assert_eq!(settings.delay_time_ms(), 150);
    }

    #[test]
    fn test_chorus_presets() {
        let mut settings = ChorusSettings::default();
        ChorusPreset::Max.apply(&mut settings);
        assert!(settings.is_enabled());
        assert_approx_eq::assert_approx_eq!(settings.rate(), 4.0, 0.00001);
        assert_approx_eq::assert_approx_eq!(settings.depth(), 30.0, 0.00001);

        ChorusPreset::Min.apply(&mut settings);
        assert_approx_eq::assert_approx_eq!(settings.depth(), 5.0, 0.00001);

        ChorusPreset::Off.apply(&mut settings);
        assert!(!settings.is_enabled());
    }

    #[test]
    fn test_reverb_presets() {
        let mut settings = ReverbSettings::default();
        ReverbPreset::Max.apply(&mut settings);
        assert!(settings.is_enabled());
        assert_approx_eq::assert_approx_eq!(settings.room_size(), 1.0, 0.00001);

        ReverbPreset::Small.apply(&mut settings);
        assert_approx_eq::assert_approx_eq!(settings.room_size(), 0.3, 0.00001);
        assert_approx_eq::assert_approx_eq!(settings.damping(), 0.6, 0.00001);

        ReverbPreset::Off.apply(&mut settings);
        assert!(!settings.is_enabled());
        assert_approx_eq::assert_approx_eq!(settings.mix(), 0.2, 0.00001);
    }

    #[test]
    fn test_smoothing_presets() {
        assert_eq!(SmoothingPreset::None.factor(), 1.0);
        assert!(SmoothingPreset::Extra.factor() < SmoothingPreset::Normal.factor());
    }
}
