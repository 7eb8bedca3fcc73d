// LFO (Low Frequency Oscillator)
//
// Drives the tape wobble: a slow sine that bends voice pitch (wow) and
// amplitude (flutter). Operates far below audio rates (0.01 Hz - 20 Hz).
// Output is the raw [-1, 1] value; each destination applies its own depth.

use super::oscillator::{Oscillator, SimpleOscillator, WaveformType};

pub const MIN_LFO_RATE: f32 = 0.01;
pub const MAX_LFO_RATE: f32 = 20.0;

/// LFO parameters
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct LfoParams {
    pub waveform: WaveformType,
    /// Frequency in Hz
    pub rate: f32,
}

impl LfoParams {
    /// Create LFO parameters with the rate clamped to the LFO range
    pub fn new(waveform: WaveformType, rate: f32) -> Self {
        Self {
            waveform,
            rate: rate.clamp(MIN_LFO_RATE, MAX_LFO_RATE),
        }
    }
}

impl Default for LfoParams {
    fn default() -> Self {
        Self {
            waveform: WaveformType::Sine,
            rate: 0.1,
        }
    }
}

pub struct Lfo {
    oscillator: SimpleOscillator,
}

impl Lfo {
    pub fn new(params: LfoParams, sample_rate: f32) -> Self {
        let mut oscillator = SimpleOscillator::new(params.waveform, sample_rate);
        oscillator.set_frequency(params.rate);

        Self { oscillator }
    }

    /// Next modulation value in [-1, 1]
    #[inline]
    pub fn process(&mut self) -> f32 {
        self.oscillator.next_sample()
    }
}
