// Error types for the synth core
//
// Every variant is recoverable. The command boundary
// (`SynthEngine::handle`) logs and reports them instead of propagating.

use thiserror::Error;

#[derive(Debug, Clone, PartialEq, Error)]
pub enum SynthError {
    #[error("Unknown tone: {0}")]
    UnknownTone(String),

    #[error("Cannot {operation} while {state}")]
    InvalidSessionState {
        operation: &'static str,
        state: &'static str,
    },

    #[error("Scheduled action from stale session epoch {epoch}")]
    SchedulerCancellationRace { epoch: u64 },

    #[error("Recording {0} not found")]
    RecordingNotFound(usize),

    #[error("Event {event} not found in recording {recording}")]
    EventNotFound { recording: usize, event: usize },

    #[error("Recording has no events")]
    EmptyRecording,

    #[error("Invalid tempo: {0}")]
    InvalidTempo(f64),

    #[error("Invalid parameter: {0}")]
    InvalidParameter(String),
}

impl SynthError {
    pub(crate) fn invalid_state(operation: &'static str, state: &'static str) -> Self {
        SynthError::InvalidSessionState { operation, state }
    }
}

pub type SynthResult<T> = Result<T, SynthError>;
