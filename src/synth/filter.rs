// Filter - Fixed-cutoff low-pass stage for bass voices
//
// Chamberlin state variable filter, low-pass output only.
//
// References:
// - Hal Chamberlin's "Musical Applications of Microprocessors" (1985)
// - https://www.earlevel.com/main/2003/03/02/the-digital-state-variable-filter/
//
// Characteristics:
// - 12dB/octave slope (2-pole)
// - Stable up to ~Fs/6
// - Cutoff and Q are fixed when the voice is created

use std::f32::consts::PI;

/// Default cutoff applied to bass presets
pub const BASS_CUTOFF_HZ: f32 = 200.0;

/// Q used for the bass stage (matches a plain biquad low-pass)
pub const BASS_RESONANCE: f32 = 1.0;

/// 2-pole low-pass filter
pub struct LowPassFilter {
    cutoff: f32,
    // State variables
    low: f32,
    band: f32,
    // Coefficients
    f: f32,
    q: f32,
}

impl LowPassFilter {
    /// Create a low-pass filter
    ///
    /// Cutoff is clamped to 20Hz..Fs/6 and Q to 0.5..20 for numerical stability.
    pub fn new(cutoff: f32, resonance: f32, sample_rate: f32) -> Self {
        let max_cutoff = sample_rate / 6.0;
        let safe_cutoff = if cutoff.is_finite() {
            cutoff.clamp(20.0, max_cutoff)
        } else {
            max_cutoff
        };
        let q_factor = if resonance.is_finite() {
            resonance.clamp(0.5, 20.0)
        } else {
            BASS_RESONANCE
        };

        Self {
            cutoff: safe_cutoff,
            low: 0.0,
            band: 0.0,
            // f = 2 * sin(π * fc / Fs)
            f: 2.0 * (PI * safe_cutoff / sample_rate).sin(),
            // q = 1/Q
            q: (1.0 / q_factor).clamp(0.01, 2.0),
        }
    }

    /// Low-pass used by the bass presets
    pub fn bass(sample_rate: f32) -> Self {
        Self::new(BASS_CUTOFF_HZ, BASS_RESONANCE, sample_rate)
    }

    pub fn cutoff(&self) -> f32 {
        self.cutoff
    }

    /// Clear the filter state
    pub fn reset(&mut self) {
        self.low = 0.0;
        self.band = 0.0;
    }

    #[inline]
    pub fn process(&mut self, input: f32) -> f32 {
        let high = input - self.low - self.q * self.band;
        self.band += self.f * high;
        self.low += self.f * self.band;
        self.low
    }
}
