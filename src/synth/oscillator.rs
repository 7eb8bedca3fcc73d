// Oscillators - Waveform generators
//
// `SimpleOscillator` produces the raw shapes. `FmOscillator` pairs a carrier
// with a sine modulator whose output deviates the carrier frequency by a
// fixed number of Hz, which gives the bird presets their chirp.

use serde::{Deserialize, Serialize};
use std::f32::consts::PI;

pub trait Oscillator {
    fn next_sample(&mut self) -> f32;
    fn set_frequency(&mut self, freq: f32);
    fn reset(&mut self);
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum WaveformType {
    Sine,
    Square,
    Saw,
    Triangle,
}

impl WaveformType {
    /// Value of the waveform at `phase` in [0, 1)
    #[inline]
    pub fn sample_at(self, phase: f32) -> f32 {
        match self {
            WaveformType::Sine => (phase * 2.0 * PI).sin(),
            WaveformType::Square => {
                if phase < 0.5 {
                    1.0
                } else {
                    -1.0
                }
            }
            WaveformType::Saw => (phase * 2.0) - 1.0,
            WaveformType::Triangle => {
                if phase < 0.5 {
                    (phase * 4.0) - 1.0
                } else {
                    3.0 - (phase * 4.0)
                }
            }
        }
    }
}

pub struct SimpleOscillator {
    waveform: WaveformType,
    phase: f32,
    phase_increment: f32,
    pub(crate) sample_rate: f32,
}

impl SimpleOscillator {
    pub fn new(waveform: WaveformType, sample_rate: f32) -> Self {
        Self {
            waveform,
            phase: 0.0,
            phase_increment: 0.0,
            sample_rate,
        }
    }

    pub fn waveform(&self) -> WaveformType {
        self.waveform
    }
}

/// Keep a phase accumulator in [0, 1) for any increment sign
#[inline]
fn wrap_phase(phase: f32) -> f32 {
    let wrapped = phase - phase.floor();
    if wrapped.is_finite() && wrapped < 1.0 {
        wrapped
    } else {
        0.0
    }
}

impl Oscillator for SimpleOscillator {
    fn next_sample(&mut self) -> f32 {
        let sample = self.waveform.sample_at(self.phase);
        self.phase = wrap_phase(self.phase + self.phase_increment);
        sample
    }

    fn set_frequency(&mut self, freq: f32) {
        self.phase_increment = freq / self.sample_rate;
    }

    fn reset(&mut self) {
        self.phase = 0.0;
    }
}

/// Frequency-modulated oscillator
///
/// Instantaneous carrier frequency = `carrier + depth * sin(2π * mod_rate * t)`.
/// `pitch_factor` scales the whole result and is how the tape wobble bends
/// pitch without touching the stored parameters.
pub struct FmOscillator {
    carrier: SimpleOscillator,
    modulator: SimpleOscillator,
    carrier_frequency: f32,
    modulation_depth: f32,
}

impl FmOscillator {
    pub fn new(
        waveform: WaveformType,
        carrier_frequency: f32,
        modulation_frequency: f32,
        modulation_depth: f32,
        sample_rate: f32,
    ) -> Self {
        let mut modulator = SimpleOscillator::new(WaveformType::Sine, sample_rate);
        modulator.set_frequency(modulation_frequency.max(0.0));

        let mut carrier = SimpleOscillator::new(waveform, sample_rate);
        carrier.set_frequency(carrier_frequency);

        Self {
            carrier,
            modulator,
            carrier_frequency,
            modulation_depth: modulation_depth.max(0.0),
        }
    }

    #[inline]
    pub fn next_sample_with_pitch(&mut self, pitch_factor: f32) -> f32 {
        let deviation = self.modulator.next_sample() * self.modulation_depth;
        let frequency = (self.carrier_frequency + deviation) * pitch_factor;
        self.carrier.set_frequency(frequency);
        self.carrier.next_sample()
    }

    pub fn carrier_frequency(&self) -> f32 {
        self.carrier_frequency
    }

    pub fn modulation_depth(&self) -> f32 {
        self.modulation_depth
    }
}

impl Oscillator for FmOscillator {
    fn next_sample(&mut self) -> f32 {
        self.next_sample_with_pitch(1.0)
    }

    fn set_frequency(&mut self, freq: f32) {
        self.carrier_frequency = freq;
    }

    fn reset(&mut self) {
        self.carrier.reset();
        self.modulator.reset();
    }
}
