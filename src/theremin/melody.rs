use std::thread;
use std::time::Duration;

use crate::building_blocks::Waveform;
use crate::theremin::{ThereminControls, NUM_OSCILLATORS};

/// One step of a melody.
#[derive(Clone, Copy, Debug, PartialEq)]
pub enum MelodyNote {
    Tone { frequency: f32, duration_ms: u32 },
    Rest { duration_ms: u32 },
}

impl MelodyNote {
    pub fn duration_ms(&self) -> u32 {
        match self {
            MelodyNote::Tone { duration_ms, .. } => *duration_ms,
            MelodyNote::Rest { duration_ms } => *duration_ms,
        }
    }
}

/// How a melody is voiced.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct MelodyVoice {
    /// counts from 1, the other oscillators stay silent
    pub oscillator: usize,
    pub waveform: Waveform,
    /// fraction of each note that actually sounds
    pub staccato: f32,
    /// 0 - 100
    pub amplitude: f32,
}

impl Default for MelodyVoice {
    fn default() -> Self {
        MelodyVoice {
            oscillator: 1,
            waveform: Waveform::Sine,
            staccato: 0.8,
            amplitude: 40.0,
        }
    }
}

/// The little fanfare played at power-on.
pub fn startup_fanfare() -> Vec<MelodyNote> {
    const C5: f32 = 523.25;
    const GS4: f32 = 415.3;
    const AS4: f32 = 466.16;

    let tone = |frequency, duration_ms| MelodyNote::Tone {
        frequency,
        duration_ms,
    };

    vec![
        tone(C5, 150),
        tone(C5, 150),
        tone(C5, 150),
        tone(C5, 450),
        tone(GS4, 450),
        tone(AS4, 450),
        tone(C5, 150),
        MelodyNote::Rest { duration_ms: 150 },
        tone(AS4, 150),
        tone(C5, 600),
    ]
}

fn sleep_ms(ms: u32) {
    if ms > 0 {
        thread::sleep(Duration::from_millis(ms as u64));
    }
}

impl ThereminControls {
    /// Play a sequence of notes through the normal control path.
    ///
    /// Blocks the calling thread for the length of the melody. Frequency,
    /// waveforms and oscillator volumes are restored afterwards, the
    /// amplitude is left at 0 so the instrument comes back silent.
    pub fn play_melody(&self, notes: &[MelodyNote], voice: &MelodyVoice) {
        if !(1..=NUM_OSCILLATORS).contains(&voice.oscillator) {
            log::warn!(
                "can't play melody on oscillator {}, valid are 1-3",
                voice.oscillator
            );
            return;
        }

        let saved_frequency = self.frequency();
        let saved: Vec<_> = (1..=NUM_OSCILLATORS)
            .filter_map(|index| self.oscillator(index))
            .collect();

        log::info!("playing melody, {} notes", notes.len());

        for index in 1..=NUM_OSCILLATORS {
            if index == voice.oscillator {
                self.set_oscillator_waveform(index, voice.waveform);
                self.set_oscillator_volume(index, 1.0);
            } else {
                self.set_oscillator_waveform(index, Waveform::Silent);
            }
        }

        let staccato = if voice.staccato.is_nan() {
            1.0
        } else {
            voice.staccato.clamp(0.0, 1.0)
        };

        for note in notes {
            match *note {
                MelodyNote::Rest { duration_ms } => {
                    self.set_amplitude(0.0);
                    sleep_ms(duration_ms);
                }
                MelodyNote::Tone {
                    frequency,
                    duration_ms,
                } => {
                    let sounding = (duration_ms as f32 * staccato) as u32;
                    self.set_frequency(frequency);
                    self.set_amplitude(voice.amplitude);
                    sleep_ms(sounding);

                    if duration_ms > sounding {
                        self.set_amplitude(0.0);
                        sleep_ms(duration_ms - sounding);
                    }
                }
            }
        }

        self.set_frequency(saved_frequency);
        self.set_amplitude(0.0);
        for (slot, osc) in saved.iter().enumerate() {
            self.set_oscillator_waveform(slot + 1, osc.waveform);
            self.set_oscillator_volume(slot + 1, osc.volume);
        }

        log::info!("melody done");
    }
}
