// Birdsynth - Library exports for the binary, tests and benchmarks

pub mod audio;
pub mod config;
pub mod engine;
pub mod error;
pub mod messaging;
pub mod sequencer;
pub mod synth;

// Re-export commonly used types for convenience
pub use audio::engine::{AudioEngine, AudioError};
pub use audio::parameters::SharedControls;
pub use audio::timing::SampleClock;
pub use config::{ConfigError, SynthConfig};
pub use engine::{ScheduledAction, SynthEngine, VoiceHandle};
pub use error::{SynthError, SynthResult};
pub use messaging::channels::{create_command_channel, create_notification_channel};
pub use messaging::{Command, Notification, VoiceSource};
pub use sequencer::{
    Direction, EventEdit, Pattern, PlaybackOptions, Recording, TapeSpeed, TransportState,
    TriggerEvent,
};
pub use synth::{EchoParams, EffectMode, TapeParams, ToneCatalog, ToneCategory, VoiceId};
