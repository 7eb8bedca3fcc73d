// Notifications - audio thread → UI

use crate::sequencer::transport::PlaybackOptions;
use crate::synth::voice::VoiceId;

/// Severity of a notification
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NotificationLevel {
    Info,
    Warning,
}

/// Where a voice came from
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum VoiceSource {
    /// Direct tone trigger
    Trigger,
    /// Beat pad, live or replayed by the pattern looper
    Pad,
    /// Recording playback
    Playback,
}

#[derive(Debug, Clone, PartialEq)]
pub enum Notification {
    VoiceStarted {
        voice: VoiceId,
        tone: &'static str,
        source: VoiceSource,
    },
    VoiceReleased {
        voice: VoiceId,
    },

    RecordingStarted,
    RecordingCreated {
        index: usize,
        events: usize,
        duration: f64,
    },
    RecordingUpdated {
        index: usize,
        events: usize,
        duration: f64,
    },
    RecordingsCleared,

    PlaybackStarted {
        recording: Option<usize>,
        options: PlaybackOptions,
    },
    Progress(f64),
    PlaybackLooped {
        pass: u64,
    },
    PlaybackPaused {
        progress: f64,
    },
    PlaybackResumed {
        progress: f64,
    },
    PlaybackStopped,

    PatternRecordingStarted,
    PatternRecordingStopped {
        events: usize,
    },
    PatternPlaybackStarted,
    PatternPlaybackStopped,
    PatternCleared,

    /// An absorbed error
    Warning(String),
}

impl Notification {
    pub fn level(&self) -> NotificationLevel {
        match self {
            Notification::Warning(_) => NotificationLevel::Warning,
            _ => NotificationLevel::Info,
        }
    }

    /// Message for a status line
    pub fn message(&self) -> String {
        match self {
            Notification::VoiceStarted { tone, .. } => format!("Playing {tone}"),
            Notification::VoiceReleased { voice } => format!("Voice {} released", voice.raw()),
            Notification::RecordingStarted => "Recording...".to_string(),
            Notification::RecordingCreated {
                index, duration, ..
            }
            | Notification::RecordingUpdated {
                index, duration, ..
            } => format!("Recording {} ({:.2}s)", index + 1, duration),
            Notification::RecordingsCleared => "Recordings cleared".to_string(),
            Notification::PlaybackStarted { .. } => "Playing".to_string(),
            Notification::Progress(progress) => format!("{:.0}%", progress * 100.0),
            Notification::PlaybackLooped { pass } => format!("Loop {}", pass + 1),
            Notification::PlaybackPaused { .. } => "Paused".to_string(),
            Notification::PlaybackResumed { .. } => "Resumed".to_string(),
            Notification::PlaybackStopped => "Stopped".to_string(),
            Notification::PatternRecordingStarted => "Recording pattern...".to_string(),
            Notification::PatternRecordingStopped { events } => {
                format!("Pattern recorded ({events} hits)")
            }
            Notification::PatternPlaybackStarted => "Playing pattern".to_string(),
            Notification::PatternPlaybackStopped => "Pattern stopped".to_string(),
            Notification::PatternCleared => "Pattern cleared".to_string(),
            Notification::Warning(message) => message.clone(),
        }
    }
}
