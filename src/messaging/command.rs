// Commands - UI → audio thread

use crate::sequencer::recording::EventEdit;
use crate::sequencer::transport::PlaybackOptions;
use crate::synth::effect::{EchoParams, EffectMode, TapeParams};

/// Everything the UI can ask of the engine
///
/// Tone identifiers travel as owned strings and are resolved against the
/// catalog by the engine.
#[derive(Debug, Clone, PartialEq)]
pub enum Command {
    Trigger(String),
    PressPad(String),
    ReleasePad(String),

    StartRecording,
    StopRecording,
    EditEvent {
        recording: usize,
        event: usize,
        edit: EventEdit,
    },
    DeleteEvent {
        recording: usize,
        event: usize,
    },
    ClearRecordings,

    Play {
        recording: usize,
        options: PlaybackOptions,
    },
    PlayLatest(PlaybackOptions),
    Stop,
    Pause,
    Resume,
    SetLooping(bool),

    StartPatternRecording,
    StopPatternRecording,
    PlayPattern,
    StopPatternPlayback,
    ClearPattern,

    SetEffectMode(EffectMode),
    SetEchoParams(EchoParams),
    SetTapeParams(TapeParams),
    SetVolume(f32),
}
