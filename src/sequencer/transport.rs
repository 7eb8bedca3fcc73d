// Transport - Playback state, options and the UI-visible snapshot
//
// `TransportState` is the playback state machine's state. `SharedTransport`
// mirrors state and progress into atomics so the UI thread can poll them
// while the engine runs inside the audio callback.

use std::sync::Arc;
use std::sync::atomic::{AtomicU8, Ordering};

use serde::{Deserialize, Serialize};

use crate::audio::parameters::AtomicF64;
use crate::error::{SynthError, SynthResult};

/// Playback state
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum TransportState {
    #[default]
    Stopped,
    Playing,
    Paused,
}

impl TransportState {
    pub fn is_playing(&self) -> bool {
        matches!(self, TransportState::Playing)
    }

    /// A session exists (playing or paused)
    pub fn has_session(&self) -> bool {
        matches!(self, TransportState::Playing | TransportState::Paused)
    }

    pub fn name(&self) -> &'static str {
        match self {
            TransportState::Stopped => "stopped",
            TransportState::Playing => "playing",
            TransportState::Paused => "paused",
        }
    }

    fn to_u8(self) -> u8 {
        match self {
            TransportState::Stopped => 0,
            TransportState::Playing => 1,
            TransportState::Paused => 2,
        }
    }

    fn from_u8(value: u8) -> Self {
        match value {
            1 => TransportState::Playing,
            2 => TransportState::Paused,
            _ => TransportState::Stopped,
        }
    }
}

/// Tape direction
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum Direction {
    #[default]
    Forward,
    Reverse,
}

impl Direction {
    /// +1 forward, -1 reverse
    pub fn sign(&self) -> f64 {
        match self {
            Direction::Forward => 1.0,
            Direction::Reverse => -1.0,
        }
    }
}

/// Tape speed buttons
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum TapeSpeed {
    Slow,
    Normal,
    Fast,
}

impl TapeSpeed {
    pub fn tempo(&self) -> f64 {
        match self {
            TapeSpeed::Slow => 0.5,
            TapeSpeed::Normal => 1.0,
            TapeSpeed::Fast => 2.0,
        }
    }
}

/// How a recording is replayed
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PlaybackOptions {
    /// Speed multiplier (> 0)
    pub tempo: f64,
    pub direction: Direction,
    pub looping: bool,
}

impl Default for PlaybackOptions {
    fn default() -> Self {
        Self {
            tempo: 1.0,
            direction: Direction::Forward,
            looping: false,
        }
    }
}

impl PlaybackOptions {
    pub fn with_tempo(mut self, tempo: f64) -> Self {
        self.tempo = tempo;
        self
    }

    pub fn with_speed(self, speed: TapeSpeed) -> Self {
        self.with_tempo(speed.tempo())
    }

    pub fn with_direction(mut self, direction: Direction) -> Self {
        self.direction = direction;
        self
    }

    pub fn reversed(self) -> Self {
        self.with_direction(Direction::Reverse)
    }

    pub fn looped(mut self, looping: bool) -> Self {
        self.looping = looping;
        self
    }

    pub fn validate(&self) -> SynthResult<()> {
        if self.tempo.is_finite() && self.tempo > 0.0 {
            Ok(())
        } else {
            Err(SynthError::InvalidTempo(self.tempo))
        }
    }
}

/// Lock-free snapshot of the transport for the UI thread
///
/// Cloning shares the same atomics.
#[derive(Clone)]
pub struct SharedTransport {
    state: Arc<AtomicU8>,
    progress: AtomicF64,
}

impl SharedTransport {
    pub fn new() -> Self {
        Self {
            state: Arc::new(AtomicU8::new(TransportState::Stopped.to_u8())),
            progress: AtomicF64::new(0.0),
        }
    }

    /// Publish state and progress (audio thread)
    pub fn publish(&self, state: TransportState, progress: f64) {
        self.state.store(state.to_u8(), Ordering::Relaxed);
        self.progress.set(progress);
    }

    pub fn state(&self) -> TransportState {
        TransportState::from_u8(self.state.load(Ordering::Relaxed))
    }

    pub fn progress(&self) -> f64 {
        self.progress.get()
    }
}

impl Default for SharedTransport {
    fn default() -> Self {
        Self::new()
    }
}
