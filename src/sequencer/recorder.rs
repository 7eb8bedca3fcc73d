// Recorder - Captures triggers into a Recording
//
// Idle → Recording on start, Recording → Idle on stop. Triggers are only
// captured while recording; stopping with an empty buffer yields nothing.

use super::recording::{Recording, TriggerEvent};
use crate::error::{SynthError, SynthResult};
use crate::synth::voice::VoiceParams;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum RecorderState {
    #[default]
    Idle,
    Recording,
}

#[derive(Debug, Default)]
pub struct Recorder {
    state: RecorderState,
    start_time: f64,
    buffer: Vec<TriggerEvent>,
}

impl Recorder {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn state(&self) -> RecorderState {
        self.state
    }

    pub fn is_recording(&self) -> bool {
        self.state == RecorderState::Recording
    }

    /// Open a capture session at `now`
    pub fn start(&mut self, now: f64) -> SynthResult<()> {
        if self.is_recording() {
            return Err(SynthError::invalid_state("start recording", "recording"));
        }
        self.state = RecorderState::Recording;
        self.start_time = now;
        self.buffer.clear();
        Ok(())
    }

    /// Append a trigger; ignored while idle
    ///
    /// Returns `true` if the trigger was captured.
    pub fn capture(&mut self, params: &VoiceParams, now: f64) -> bool {
        if !self.is_recording() {
            return false;
        }
        self.buffer
            .push(TriggerEvent::from_voice(now - self.start_time, params));
        true
    }

    /// Number of triggers captured in the current session
    pub fn pending(&self) -> usize {
        self.buffer.len()
    }

    /// Close the session
    ///
    /// Returns the recording when at least one trigger was captured.
    pub fn stop(&mut self) -> SynthResult<Option<Recording>> {
        if !self.is_recording() {
            return Err(SynthError::invalid_state("stop recording", "idle"));
        }
        self.state = RecorderState::Idle;
        if self.buffer.is_empty() {
            return Ok(None);
        }
        Ok(Some(Recording::new(std::mem::take(&mut self.buffer))))
    }
}
