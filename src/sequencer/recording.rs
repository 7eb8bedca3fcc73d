// Recording - Timestamped trigger events and the recording collection
//
// A Recording is an ordered list of TriggerEvents with a derived duration:
// last.time + last.attack + last.release (0 when empty). The bank hands out
// shared snapshots; editing a recording that is being played copies it, so
// the running session keeps the events it started with.

use std::sync::Arc;

use crate::error::{SynthError, SynthResult};
use crate::synth::catalog::{ToneCatalog, ToneCategory};
use crate::synth::envelope::EnvelopeParams;
use crate::synth::oscillator::WaveformType;
use crate::synth::voice::VoiceParams;

/// One captured trigger
#[derive(Debug, Clone, PartialEq)]
pub struct TriggerEvent {
    /// Seconds since the recording started
    pub time: f64,
    pub tone: &'static str,
    pub category: ToneCategory,
    pub waveform: WaveformType,
    pub frequency: f32,
    pub modulation_frequency: f32,
    pub modulation_depth: f32,
    pub attack: f64,
    pub release: f64,
}

impl TriggerEvent {
    /// Capture a voice's parameters at `time`
    pub fn from_voice(time: f64, params: &VoiceParams) -> Self {
        Self {
            time: time.max(0.0),
            tone: params.tone,
            category: params.category,
            waveform: params.waveform,
            frequency: params.frequency,
            modulation_frequency: params.modulation_frequency,
            modulation_depth: params.modulation_depth,
            attack: params.envelope.attack,
            release: params.envelope.release,
        }
    }

    /// Sounding time of the event
    pub fn span(&self) -> f64 {
        self.attack + self.release
    }

    /// Time at which the event falls silent
    pub fn end(&self) -> f64 {
        self.time + self.span()
    }

    /// Voice parameters used verbatim on replay
    pub fn voice_params(&self) -> VoiceParams {
        VoiceParams {
            tone: self.tone,
            category: self.category,
            waveform: self.waveform,
            frequency: self.frequency,
            modulation_frequency: self.modulation_frequency,
            modulation_depth: self.modulation_depth,
            envelope: EnvelopeParams::new(self.attack, self.release),
        }
    }
}

/// Per-event edit
#[derive(Debug, Clone, PartialEq)]
pub enum EventEdit {
    /// Switch preset; the modulation rate follows the new preset
    Tone(String),
    Frequency(f32),
    ModulationDepth(f32),
}

#[derive(Debug, Clone, PartialEq, Default)]
pub struct Recording {
    events: Vec<TriggerEvent>,
    duration: f64,
}

impl Recording {
    /// Build a recording, keeping events in chronological order
    pub fn new(mut events: Vec<TriggerEvent>) -> Self {
        events.sort_by(|a, b| a.time.total_cmp(&b.time));
        let mut recording = Self {
            events,
            duration: 0.0,
        };
        recording.recompute_duration();
        recording
    }

    pub fn events(&self) -> &[TriggerEvent] {
        &self.events
    }

    pub fn event(&self, index: usize) -> Option<&TriggerEvent> {
        self.events.get(index)
    }

    pub fn last(&self) -> Option<&TriggerEvent> {
        self.events.last()
    }

    pub fn duration(&self) -> f64 {
        self.duration
    }

    pub fn len(&self) -> usize {
        self.events.len()
    }

    pub fn is_empty(&self) -> bool {
        self.events.is_empty()
    }

    fn recompute_duration(&mut self) {
        self.duration = self.events.last().map_or(0.0, TriggerEvent::end);
    }
}

/// Append-only collection of recordings
#[derive(Debug, Default)]
pub struct RecordingBank {
    recordings: Vec<Arc<Recording>>,
}

impl RecordingBank {
    pub fn new() -> Self {
        Self::default()
    }

    /// Store a recording and return its index
    pub fn push(&mut self, recording: Recording) -> usize {
        self.recordings.push(Arc::new(recording));
        self.recordings.len() - 1
    }

    pub fn get(&self, index: usize) -> SynthResult<&Arc<Recording>> {
        self.recordings
            .get(index)
            .ok_or(SynthError::RecordingNotFound(index))
    }

    pub fn latest_index(&self) -> Option<usize> {
        self.recordings.len().checked_sub(1)
    }

    pub fn iter(&self) -> impl Iterator<Item = &Arc<Recording>> {
        self.recordings.iter()
    }

    pub fn len(&self) -> usize {
        self.recordings.len()
    }

    pub fn is_empty(&self) -> bool {
        self.recordings.is_empty()
    }

    pub fn clear(&mut self) {
        self.recordings.clear();
    }

    /// Apply an edit to one event and recompute the duration
    pub fn edit_event(
        &mut self,
        catalog: &ToneCatalog,
        recording: usize,
        event: usize,
        edit: EventEdit,
    ) -> SynthResult<&Recording> {
        let slot = self
            .recordings
            .get_mut(recording)
            .ok_or(SynthError::RecordingNotFound(recording))?;
        if event >= slot.events.len() {
            return Err(SynthError::EventNotFound { recording, event });
        }

        // Validate before copying the snapshot
        let tone = match &edit {
            EventEdit::Tone(id) => Some(catalog.resolve(id)?),
            EventEdit::Frequency(frequency) if !(frequency.is_finite() && *frequency > 0.0) => {
                return Err(SynthError::InvalidParameter(format!(
                    "frequency must be positive, got {frequency}"
                )));
            }
            EventEdit::ModulationDepth(depth) if !(depth.is_finite() && *depth >= 0.0) => {
                return Err(SynthError::InvalidParameter(format!(
                    "modulation depth must be >= 0, got {depth}"
                )));
            }
            _ => None,
        };

        let data = Arc::make_mut(slot);
        let target = &mut data.events[event];
        match edit {
            EventEdit::Tone(_) => {
                if let Some(tone) = tone {
                    target.tone = tone.id;
                    target.category = tone.category;
                    target.waveform = tone.waveform;
                    target.modulation_frequency = tone.modulation_frequency;
                }
            }
            EventEdit::Frequency(frequency) => target.frequency = frequency,
            EventEdit::ModulationDepth(depth) => target.modulation_depth = depth,
        }
        data.recompute_duration();
        Ok(data)
    }

    /// Remove one event and recompute the duration
    pub fn delete_event(&mut self, recording: usize, event: usize) -> SynthResult<&Recording> {
        let slot = self
            .recordings
            .get_mut(recording)
            .ok_or(SynthError::RecordingNotFound(recording))?;
        if event >= slot.events.len() {
            return Err(SynthError::EventNotFound { recording, event });
        }

        let data = Arc::make_mut(slot);
        data.events.remove(event);
        data.recompute_duration();
        Ok(data)
    }
}
