// Sequencer module - Recording, scheduling and replay of triggered tones

pub mod pattern;
pub mod player;
pub mod recorder;
pub mod recording;
pub mod scheduler;
pub mod transport;

pub use pattern::{Pattern, PatternEvent, PatternLooper};
pub use player::{PlaybackEngine, SessionInfo};
pub use recorder::{Recorder, RecorderState};
pub use recording::{EventEdit, Recording, RecordingBank, TriggerEvent};
pub use scheduler::{EventScheduler, ScheduleHandle};
pub use transport::{Direction, PlaybackOptions, SharedTransport, TapeSpeed, TransportState};
