// Effect - Process-wide effect sends
//
// The engine has a single "current effect mode". A voice captures the mode
// when it is created and keeps that route for its whole life:
// - None: dry only
// - Echo: dry + send into the shared feedback delay line
// - Tape: dry, with a per-voice slow LFO wobbling pitch and amplitude
//
// The echo delay line is shared by every echo-routed voice and lives here.

use serde::{Deserialize, Serialize};

use super::delay::{Delay, DelayParams};
use super::lfo::{LfoParams, MAX_LFO_RATE, MIN_LFO_RATE};
use super::oscillator::WaveformType;

/// Longest echo the shared delay line can hold (seconds)
pub const MAX_ECHO_TIME: f32 = 1.0;

/// Route applied to voices created while the mode is active
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub enum EffectMode {
    #[default]
    None,
    Echo,
    Tape,
}

impl EffectMode {
    pub fn name(&self) -> &'static str {
        match self {
            EffectMode::None => "none",
            EffectMode::Echo => "echo",
            EffectMode::Tape => "tape",
        }
    }
}

/// Echo send settings
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct EchoParams {
    /// Delay time in seconds
    pub delay: f32,
    pub feedback: f32,
    pub wet: f32,
}

impl Default for EchoParams {
    fn default() -> Self {
        Self {
            delay: 0.3,
            feedback: 0.5,
            wet: 0.5,
        }
    }
}

impl From<EchoParams> for DelayParams {
    fn from(params: EchoParams) -> Self {
        DelayParams::new(params.delay, params.feedback, params.wet)
    }
}

impl From<DelayParams> for EchoParams {
    fn from(params: DelayParams) -> Self {
        Self {
            delay: params.time,
            feedback: params.feedback,
            wet: params.wet,
        }
    }
}

/// Tape wobble settings
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct TapeParams {
    /// LFO rate in Hz
    pub wow_rate: f32,
    /// Pitch deviation as a fraction of the voice frequency
    pub wow_depth: f32,
    /// Amplitude deviation (0..1)
    pub flutter_depth: f32,
}

impl Default for TapeParams {
    fn default() -> Self {
        Self {
            wow_rate: 0.1,
            wow_depth: 0.02,
            flutter_depth: 0.1,
        }
    }
}

impl TapeParams {
    /// Clamp every field to a usable range
    pub fn validated(self) -> Self {
        let finite_or = |value: f32, fallback: f32| {
            if value.is_finite() { value } else { fallback }
        };
        Self {
            wow_rate: finite_or(self.wow_rate, 0.1).clamp(MIN_LFO_RATE, MAX_LFO_RATE),
            wow_depth: finite_or(self.wow_depth, 0.0).clamp(0.0, 0.5),
            flutter_depth: finite_or(self.flutter_depth, 0.0).clamp(0.0, 1.0),
        }
    }

    /// LFO settings for a tape-routed voice
    pub fn lfo_params(&self) -> LfoParams {
        LfoParams::new(WaveformType::Sine, self.wow_rate)
    }
}

/// Shared effect state: current mode, tape settings, echo line
pub struct EffectBus {
    mode: EffectMode,
    tape: TapeParams,
    echo: Delay,
}

impl EffectBus {
    pub fn new(echo: EchoParams, tape: TapeParams, sample_rate: f32) -> Self {
        Self {
            mode: EffectMode::None,
            tape: tape.validated(),
            echo: Delay::new(echo.into(), sample_rate, MAX_ECHO_TIME),
        }
    }

    pub fn mode(&self) -> EffectMode {
        self.mode
    }

    /// Change the route for voices created from now on
    pub fn set_mode(&mut self, mode: EffectMode) {
        self.mode = mode;
    }

    pub fn echo_params(&self) -> EchoParams {
        self.echo.params().into()
    }

    pub fn set_echo_params(&mut self, params: EchoParams) {
        self.echo.set_params(params.into());
    }

    pub fn tape_params(&self) -> TapeParams {
        self.tape
    }

    pub fn set_tape_params(&mut self, params: TapeParams) {
        self.tape = params.validated();
    }

    /// Feed the summed echo send and return the wet return
    #[inline]
    pub fn process_echo(&mut self, send: f32) -> f32 {
        self.echo.process(send)
    }

    /// Clear the echo tail
    pub fn reset(&mut self) {
        self.echo.reset();
    }
}
