// Attack/Release envelope
//
// Linear two-stage envelope: amplitude ramps 0 → 1 over `attack`, then
// 1 → 0 over `release` immediately after. There is no sustain stage, a
// triggered note always lives exactly `attack + release` seconds.

use crate::audio::parameters::MIN_ATTACK;

/// Envelope times in seconds
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct EnvelopeParams {
    /// Attack time in seconds (> 0)
    pub attack: f64,
    /// Release time in seconds (>= 0)
    pub release: f64,
}

impl EnvelopeParams {
    /// Create envelope parameters with validation
    pub fn new(attack: f64, release: f64) -> Self {
        Self {
            attack: if attack.is_finite() {
                attack.max(MIN_ATTACK)
            } else {
                MIN_ATTACK
            },
            release: if release.is_finite() {
                release.max(0.0)
            } else {
                0.0
            },
        }
    }

    /// Total sounding time
    pub fn lifetime(&self) -> f64 {
        self.attack + self.release
    }

    /// Amplitude `elapsed` seconds after the trigger
    pub fn amplitude_at(&self, elapsed: f64) -> f32 {
        if elapsed <= 0.0 {
            return 0.0;
        }
        if elapsed < self.attack {
            return (elapsed / self.attack) as f32;
        }
        let into_release = elapsed - self.attack;
        if self.release <= 0.0 || into_release >= self.release {
            return 0.0;
        }
        (1.0 - into_release / self.release) as f32
    }
}

impl Default for EnvelopeParams {
    fn default() -> Self {
        Self {
            attack: 0.05,
            release: 0.3,
        }
    }
}

/// Stage of the envelope
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EnvelopeStage {
    Idle,
    Attack,
    Release,
}

/// Per-sample attack/release generator
pub struct AttackReleaseEnvelope {
    params: EnvelopeParams,
    sample_rate: f64,
    elapsed_samples: u64,
    stage: EnvelopeStage,
}

impl AttackReleaseEnvelope {
    pub fn new(params: EnvelopeParams, sample_rate: f32) -> Self {
        Self {
            params,
            sample_rate: sample_rate as f64,
            elapsed_samples: 0,
            stage: EnvelopeStage::Idle,
        }
    }

    pub fn params(&self) -> EnvelopeParams {
        self.params
    }

    /// Start the attack from zero
    pub fn note_on(&mut self) {
        self.elapsed_samples = 0;
        self.stage = EnvelopeStage::Attack;
    }

    /// Silence immediately
    pub fn stop(&mut self) {
        self.stage = EnvelopeStage::Idle;
    }

    /// Process one sample and return the envelope value in [0, 1]
    pub fn process(&mut self) -> f32 {
        if self.stage == EnvelopeStage::Idle {
            return 0.0;
        }

        let elapsed = self.elapsed_samples as f64 / self.sample_rate;
        let value = self.params.amplitude_at(elapsed);
        self.elapsed_samples += 1;

        let next = self.elapsed_samples as f64 / self.sample_rate;
        self.stage = if next < self.params.attack {
            EnvelopeStage::Attack
        } else if next < self.params.lifetime() {
            EnvelopeStage::Release
        } else {
            EnvelopeStage::Idle
        };

        value
    }

    pub fn stage(&self) -> EnvelopeStage {
        self.stage
    }

    pub fn is_active(&self) -> bool {
        self.stage != EnvelopeStage::Idle
    }
}
