// Playback Engine - Replays a Recording on the event scheduler
//
// A session schedules one trigger per event at `start + offset`, a chain of
// progress ticks and a boundary action at `start + length`:
// - forward offset = time / tempo
// - reverse offset = (last.time - time) / tempo
// - length = max(offset + attack + release)
//
// Every scheduled action carries the session epoch. Stop, pause and the end
// of a session move to a new epoch, so an action that fires late is reported
// as a `SchedulerCancellationRace` instead of sounding.

use std::collections::HashSet;
use std::sync::Arc;

use super::recording::Recording;
use super::scheduler::{EventScheduler, ScheduleHandle, TIME_EPSILON};
use super::transport::{Direction, PlaybackOptions, TransportState};
use crate::error::{SynthError, SynthResult};
use crate::synth::voice::{VoiceId, VoiceParams};

/// Default spacing of progress ticks (seconds)
pub const DEFAULT_PROGRESS_INTERVAL: f64 = 0.1;

/// Actions a playback session puts on the scheduler
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PlaybackAction {
    Trigger { epoch: u64, index: usize },
    ProgressTick { epoch: u64 },
    Boundary { epoch: u64 },
}

/// What happened when a session reached its boundary
#[derive(Debug, Clone, PartialEq)]
pub enum BoundaryOutcome {
    /// Looping: the event set was re-scheduled from the boundary
    Looped { pass: u64 },
    /// Session over; these voices must be released
    Finished { voices: Vec<VoiceId> },
}

/// Public view of the running session
#[derive(Debug, Clone, PartialEq)]
pub struct SessionInfo {
    pub recording: Option<usize>,
    pub options: PlaybackOptions,
    pub start: f64,
    pub length: f64,
    pub epoch: u64,
    pub pass: u64,
}

struct Session {
    recording: Arc<Recording>,
    recording_index: Option<usize>,
    options: PlaybackOptions,
    /// Trigger offset of each event, in event order
    offsets: Vec<f64>,
    /// Events already triggered in the current pass
    fired: Vec<bool>,
    length: f64,
    start: f64,
    epoch: u64,
    pass: u64,
    /// Elapsed position when paused
    paused_at: Option<f64>,
    handles: Vec<ScheduleHandle>,
    voices: HashSet<VoiceId>,
}

impl Session {
    fn progress_at(&self, elapsed: f64) -> f64 {
        let fraction = if self.length > 0.0 {
            (elapsed / self.length).clamp(0.0, 1.0)
        } else {
            1.0
        };
        match self.options.direction {
            Direction::Forward => fraction,
            Direction::Reverse => 1.0 - fraction,
        }
    }

    fn start_boundary(&self) -> f64 {
        self.progress_at(0.0)
    }

    fn info(&self) -> SessionInfo {
        SessionInfo {
            recording: self.recording_index,
            options: self.options,
            start: self.start,
            length: self.length,
            epoch: self.epoch,
            pass: self.pass,
        }
    }
}

/// Trigger offsets and session length for a recording
pub fn session_offsets(recording: &Recording, options: &PlaybackOptions) -> (Vec<f64>, f64) {
    let last_time = recording.last().map_or(0.0, |event| event.time);
    let offsets: Vec<f64> = recording
        .events()
        .iter()
        .map(|event| match options.direction {
            Direction::Forward => event.time / options.tempo,
            Direction::Reverse => (last_time - event.time) / options.tempo,
        })
        .collect();
    let length = recording
        .events()
        .iter()
        .zip(&offsets)
        .map(|(event, offset)| offset + event.span())
        .fold(0.0, f64::max);
    (offsets, length)
}

pub struct PlaybackEngine {
    state: TransportState,
    session: Option<Session>,
    next_epoch: u64,
    progress: f64,
    progress_interval: f64,
}

impl PlaybackEngine {
    pub fn new(progress_interval: f64) -> Self {
        let progress_interval = if progress_interval.is_finite() && progress_interval > 0.0 {
            progress_interval
        } else {
            DEFAULT_PROGRESS_INTERVAL
        };
        Self {
            state: TransportState::Stopped,
            session: None,
            next_epoch: 1,
            progress: 0.0,
            progress_interval,
        }
    }

    pub fn state(&self) -> TransportState {
        self.state
    }

    /// Last sampled progress in [0, 1]
    pub fn progress(&self) -> f64 {
        self.progress
    }

    pub fn session(&self) -> Option<SessionInfo> {
        self.session.as_ref().map(Session::info)
    }

    /// Voices spawned by the session and not yet released
    pub fn active_voices(&self) -> Vec<VoiceId> {
        self.session
            .as_ref()
            .map(|session| session.voices.iter().copied().collect())
            .unwrap_or_default()
    }

    fn take_epoch(&mut self) -> u64 {
        let epoch = self.next_epoch;
        self.next_epoch += 1;
        epoch
    }

    /// Start replaying `recording` at `now`
    ///
    /// Only valid while stopped: a second session is rejected.
    pub fn play<A: From<PlaybackAction>>(
        &mut self,
        recording: Arc<Recording>,
        recording_index: Option<usize>,
        options: PlaybackOptions,
        now: f64,
        scheduler: &mut EventScheduler<A>,
    ) -> SynthResult<SessionInfo> {
        if self.state != TransportState::Stopped {
            return Err(SynthError::invalid_state("play", self.state.name()));
        }
        options.validate()?;
        if recording.is_empty() {
            return Err(SynthError::EmptyRecording);
        }

        let (offsets, length) = session_offsets(&recording, &options);
        if !length.is_finite() {
            return Err(SynthError::InvalidTempo(options.tempo));
        }
        let epoch = self.take_epoch();
        let mut session = Session {
            recording,
            recording_index,
            options,
            fired: vec![false; offsets.len()],
            offsets,
            length,
            start: now,
            epoch,
            pass: 0,
            paused_at: None,
            handles: Vec::new(),
            voices: HashSet::new(),
        };
        Self::schedule_pass(&mut session, 0.0, scheduler);

        let info = session.info();
        self.progress = session.start_boundary();
        self.state = TransportState::Playing;
        self.session = Some(session);
        Ok(info)
    }

    /// Schedule the triggers not yet fired this pass, a tick at `from_elapsed` and the boundary
    fn schedule_pass<A: From<PlaybackAction>>(
        session: &mut Session,
        from_elapsed: f64,
        scheduler: &mut EventScheduler<A>,
    ) {
        session.handles.clear();
        let epoch = session.epoch;

        for (index, offset) in session.offsets.iter().enumerate() {
            if !session.fired[index] {
                let handle = scheduler.schedule_at(
                    session.start + offset,
                    PlaybackAction::Trigger { epoch, index }.into(),
                );
                session.handles.push(handle);
            }
        }

        let tick = scheduler.schedule_at(
            session.start + from_elapsed,
            PlaybackAction::ProgressTick { epoch }.into(),
        );
        session.handles.push(tick);

        let boundary = scheduler.schedule_at(
            session.start + session.length,
            PlaybackAction::Boundary { epoch }.into(),
        );
        session.handles.push(boundary);
    }

    fn live_session(&mut self, epoch: u64) -> SynthResult<&mut Session> {
        match self.session.as_mut() {
            Some(session) if session.epoch == epoch && self.state == TransportState::Playing => {
                Ok(session)
            }
            _ => Err(SynthError::SchedulerCancellationRace { epoch }),
        }
    }

    /// A scheduled trigger fired; returns the parameters of the voice to start
    pub fn on_trigger(&mut self, epoch: u64, index: usize) -> SynthResult<VoiceParams> {
        let session = self.live_session(epoch)?;
        if let Some(fired) = session.fired.get_mut(index) {
            *fired = true;
        }
        session
            .recording
            .event(index)
            .map(|event| event.voice_params())
            .ok_or(SynthError::EventNotFound {
                recording: session.recording_index.unwrap_or_default(),
                event: index,
            })
    }

    /// Remember a voice started by this session
    pub fn track_voice(&mut self, voice: VoiceId) {
        if let Some(session) = self.session.as_mut() {
            session.voices.insert(voice);
        }
    }

    /// A session voice reached its end of life
    pub fn forget_voice(&mut self, voice: VoiceId) {
        if let Some(session) = self.session.as_mut() {
            session.voices.remove(&voice);
        }
    }

    /// Sample progress at `time` and chain the next tick
    pub fn on_tick<A: From<PlaybackAction>>(
        &mut self,
        epoch: u64,
        time: f64,
        scheduler: &mut EventScheduler<A>,
    ) -> SynthResult<f64> {
        let interval = self.progress_interval;
        let session = self.live_session(epoch)?;

        let progress = session.progress_at(time - session.start);
        let next = time + interval;
        if next < session.start + session.length - TIME_EPSILON {
            let handle = scheduler.schedule_at(next, PlaybackAction::ProgressTick { epoch }.into());
            session.handles.push(handle);
        }

        self.progress = progress;
        Ok(progress)
    }

    /// The session reached its end boundary at `time`
    pub fn on_boundary<A: From<PlaybackAction>>(
        &mut self,
        epoch: u64,
        time: f64,
        scheduler: &mut EventScheduler<A>,
    ) -> SynthResult<BoundaryOutcome> {
        let session = self.live_session(epoch)?;

        if session.options.looping {
            session.pass += 1;
            session.start = time;
            session.fired.fill(false);
            Self::schedule_pass(session, 0.0, scheduler);
            let pass = session.pass;
            let progress = session.start_boundary();
            self.progress = progress;
            return Ok(BoundaryOutcome::Looped { pass });
        }

        let voices = self.end_session(scheduler);
        Ok(BoundaryOutcome::Finished { voices })
    }

    /// Drop the session, cancel its actions and return its live voices
    fn end_session<A>(&mut self, scheduler: &mut EventScheduler<A>) -> Vec<VoiceId> {
        let voices = match self.session.take() {
            Some(session) => {
                scheduler.cancel_all(session.handles);
                session.voices.into_iter().collect()
            }
            None => Vec::new(),
        };
        self.state = TransportState::Stopped;
        self.progress = 0.0;
        voices
    }

    /// Stop playing or paused session
    ///
    /// Returns the voices to release.
    pub fn stop<A>(&mut self, scheduler: &mut EventScheduler<A>) -> SynthResult<Vec<VoiceId>> {
        if !self.state.has_session() {
            return Err(SynthError::invalid_state("stop", self.state.name()));
        }
        Ok(self.end_session(scheduler))
    }

    /// Pause at `now`, keeping the position
    ///
    /// Returns the progress at the pause point and the voices to release.
    pub fn pause<A>(
        &mut self,
        now: f64,
        scheduler: &mut EventScheduler<A>,
    ) -> SynthResult<(f64, Vec<VoiceId>)> {
        if self.state != TransportState::Playing {
            return Err(SynthError::invalid_state("pause", self.state.name()));
        }
        let epoch = self.take_epoch();
        let Some(session) = self.session.as_mut() else {
            return Err(SynthError::invalid_state("pause", "stopped"));
        };

        let elapsed = (now - session.start).clamp(0.0, session.length);
        scheduler.cancel_all(session.handles.drain(..));
        session.paused_at = Some(elapsed);
        session.epoch = epoch;
        let voices: Vec<VoiceId> = session.voices.drain().collect();
        let progress = session.progress_at(elapsed);

        self.progress = progress;
        self.state = TransportState::Paused;
        Ok((self.progress, voices))
    }

    /// Continue a paused session from its paused position at `now`
    pub fn resume<A: From<PlaybackAction>>(
        &mut self,
        now: f64,
        scheduler: &mut EventScheduler<A>,
    ) -> SynthResult<f64> {
        if self.state != TransportState::Paused {
            return Err(SynthError::invalid_state("resume", self.state.name()));
        }
        let Some(session) = self.session.as_mut() else {
            return Err(SynthError::invalid_state("resume", "stopped"));
        };

        let elapsed = session.paused_at.take().unwrap_or(0.0);
        session.start = now - elapsed;
        Self::schedule_pass(session, elapsed, scheduler);

        self.state = TransportState::Playing;
        Ok(self.progress)
    }

    /// Change looping; applied at the next boundary
    pub fn set_looping(&mut self, looping: bool) -> SynthResult<()> {
        match self.session.as_mut() {
            Some(session) => {
                session.options.looping = looping;
                Ok(())
            }
            None => Err(SynthError::invalid_state("set looping", self.state.name())),
        }
    }
}

impl Default for PlaybackEngine {
    fn default() -> Self {
        Self::new(DEFAULT_PROGRESS_INTERVAL)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::sequencer::recording::TriggerEvent;
    use crate::synth::catalog::ToneCatalog;
    use crate::synth::envelope::EnvelopeParams;

    fn recording(times: &[f64], attack: f64, release: f64) -> Arc<Recording> {
        let tone = ToneCatalog::new().resolve("chirp").unwrap();
        let params = VoiceParams::from_tone(tone, EnvelopeParams::new(attack, release));
        let events = times
            .iter()
            .map(|&time| TriggerEvent::from_voice(time, &params))
            .collect();
        Arc::new(Recording::new(events))
    }

    /// Run the scheduler to `until`, returning fired triggers as (time, index)
    fn run(
        player: &mut PlaybackEngine,
        scheduler: &mut EventScheduler<PlaybackAction>,
        until: f64,
    ) -> Vec<(f64, usize)> {
        let mut fired = Vec::new();
        while let Some((time, action)) = scheduler.pop_due(until) {
            match action {
                PlaybackAction::Trigger { epoch, index } => {
                    if player.on_trigger(epoch, index).is_ok() {
                        fired.push((time, index));
                    }
                }
                PlaybackAction::ProgressTick { epoch } => {
                    let _ = player.on_tick(epoch, time, scheduler);
                }
                PlaybackAction::Boundary { epoch } => {
                    let _ = player.on_boundary(epoch, time, scheduler);
                }
            }
        }
        fired
    }

    #[test]
    fn test_forward_offsets_and_length() {
        let rec = recording(&[0.0, 1.0, 2.0], 0.05, 0.1);
        let (offsets, length) = session_offsets(&rec, &PlaybackOptions::default());
        assert_eq!(offsets, vec![0.0, 1.0, 2.0]);
        assert!((length - rec.duration()).abs() < 1e-12);
    }

    #[test]
    fn test_reverse_fires_last_event_first() {
        let rec = recording(&[0.0, 1.0, 2.0], 0.05, 0.1);
        let mut player = PlaybackEngine::default();
        let mut scheduler = EventScheduler::new();

        player
            .play(rec, None, PlaybackOptions::default().reversed(), 0.0, &mut scheduler)
            .unwrap();
        assert_eq!(player.progress(), 1.0);

        let fired = run(&mut player, &mut scheduler, 5.0);
        let order: Vec<usize> = fired.iter().map(|&(_, index)| index).collect();
        assert_eq!(order, vec![2, 1, 0]);
        assert!(fired.iter().all(|&(time, _)| time >= 0.0));
        assert_eq!(player.state(), TransportState::Stopped);
    }

    #[test]
    fn test_tempo_halves_gaps() {
        let rec = recording(&[0.0, 0.4, 1.0], 0.05, 0.1);
        let options = PlaybackOptions::default().with_tempo(2.0);
        let (offsets, _) = session_offsets(&rec, &options);
        assert_eq!(offsets, vec![0.0, 0.2, 0.5]);
    }

    #[test]
    fn test_play_rejects_second_session() {
        let rec = recording(&[0.0], 0.05, 0.1);
        let mut player = PlaybackEngine::default();
        let mut scheduler: EventScheduler<PlaybackAction> = EventScheduler::new();

        player
            .play(rec.clone(), Some(0), PlaybackOptions::default(), 0.0, &mut scheduler)
            .unwrap();
        let second = player.play(rec, Some(0), PlaybackOptions::default(), 0.0, &mut scheduler);
        assert!(matches!(
            second,
            Err(SynthError::InvalidSessionState {
                operation: "play",
                ..
            })
        ));
    }

    #[test]
    fn test_play_validation() {
        let mut player = PlaybackEngine::default();
        let mut scheduler: EventScheduler<PlaybackAction> = EventScheduler::new();

        let empty = Arc::new(Recording::default());
        assert_eq!(
            player
                .play(empty, None, PlaybackOptions::default(), 0.0, &mut scheduler)
                .err(),
            Some(SynthError::EmptyRecording)
        );

        let rec = recording(&[0.0], 0.05, 0.1);
        assert_eq!(
            player
                .play(rec, None, PlaybackOptions::default().with_tempo(0.0), 0.0, &mut scheduler)
                .err(),
            Some(SynthError::InvalidTempo(0.0))
        );
        assert_eq!(player.state(), TransportState::Stopped);
        assert!(scheduler.is_empty());
    }

    #[test]
    fn test_loop_fires_event_set_twice_in_one_second() {
        // Two events, total duration 1.0s
        let rec = recording(&[0.0, 0.4], 0.1, 0.5);
        assert!((rec.duration() - 1.0).abs() < 1e-12);

        let mut player = PlaybackEngine::default();
        let mut scheduler = EventScheduler::new();
        player
            .play(rec, None, PlaybackOptions::default().looped(true), 0.0, &mut scheduler)
            .unwrap();

        let fired = run(&mut player, &mut scheduler, 1.0);
        let starts = fired.iter().filter(|&&(_, index)| index == 0).count();
        assert_eq!(starts, 2, "Event set should have started twice: {:?}", fired);
        assert_eq!(player.session().map(|s| s.pass), Some(1));

        let fired = run(&mut player, &mut scheduler, 1.45);
        assert_eq!(fired.len(), 1);
        assert!((fired[0].0 - 1.4).abs() < 1e-9);
    }

    #[test]
    fn test_progress_is_monotonic() {
        let rec = recording(&[0.0, 0.5], 0.05, 0.5);
        let mut player = PlaybackEngine::default();
        let mut scheduler = EventScheduler::new();
        player
            .play(rec, None, PlaybackOptions::default(), 0.0, &mut scheduler)
            .unwrap();

        let mut last = -1.0;
        let mut t = 0.0;
        while player.state() == TransportState::Playing && t < 2.0 {
            t += 0.05;
            run(&mut player, &mut scheduler, t);
            if player.state() == TransportState::Playing {
                assert!(player.progress() >= last);
                last = player.progress();
            }
        }
        assert!(last > 0.8);
        assert_eq!(player.progress(), 0.0);
    }

    #[test]
    fn test_stop_cancels_and_invalidates() {
        let rec = recording(&[0.0, 1.0], 0.05, 0.1);
        let mut player = PlaybackEngine::default();
        let mut scheduler = EventScheduler::new();
        let info = player
            .play(rec, None, PlaybackOptions::default(), 0.0, &mut scheduler)
            .unwrap();

        run(&mut player, &mut scheduler, 0.5);
        player.track_voice(VoiceId::new(7));
        assert_eq!(player.active_voices(), vec![VoiceId::new(7)]);
        assert_eq!(player.stop(&mut scheduler).unwrap(), vec![VoiceId::new(7)]);
        assert!(player.active_voices().is_empty());

        assert!(scheduler.is_empty());
        assert!(run(&mut player, &mut scheduler, 5.0).is_empty());
        assert_eq!(
            player.on_trigger(info.epoch, 1).err(),
            Some(SynthError::SchedulerCancellationRace { epoch: info.epoch })
        );

        assert!(player.stop(&mut scheduler).is_err());
        assert_eq!(player.state(), TransportState::Stopped);
        assert_eq!(player.progress(), 0.0);
    }

    #[test]
    fn test_pause_and_resume_skip_played_events() {
        let rec = recording(&[0.0, 0.5, 1.0], 0.05, 0.1);
        let mut player = PlaybackEngine::default();
        let mut scheduler = EventScheduler::new();
        player
            .play(rec, None, PlaybackOptions::default(), 0.0, &mut scheduler)
            .unwrap();

        assert_eq!(run(&mut player, &mut scheduler, 0.7).len(), 2);
        let (progress, _) = player.pause(0.7, &mut scheduler).unwrap();
        assert_eq!(player.state(), TransportState::Paused);
        assert!((progress - 0.7 / 1.15).abs() < 1e-9);

        // Nothing fires while paused
        assert!(run(&mut player, &mut scheduler, 10.0).is_empty());

        player.resume(10.0, &mut scheduler).unwrap();
        let fired = run(&mut player, &mut scheduler, 20.0);
        assert_eq!(fired.len(), 1);
        assert_eq!(fired[0].1, 2);
        assert!((fired[0].0 - 10.3).abs() < 1e-9);
        assert_eq!(player.state(), TransportState::Stopped);
    }

    #[test]
    fn test_pause_on_a_trigger_does_not_refire_it() {
        let rec = recording(&[0.0, 0.5], 0.05, 0.1);
        let mut player = PlaybackEngine::default();
        let mut scheduler = EventScheduler::new();
        player
            .play(rec, None, PlaybackOptions::default(), 2.0, &mut scheduler)
            .unwrap();

        // Second trigger is due exactly at the pause point
        assert_eq!(run(&mut player, &mut scheduler, 2.5).len(), 2);
        player.pause(2.5, &mut scheduler).unwrap();
        player.resume(2.5, &mut scheduler).unwrap();

        assert!(run(&mut player, &mut scheduler, 5.0).is_empty());
        assert_eq!(player.state(), TransportState::Stopped);
    }

    #[test]
    fn test_loop_pass_after_resume_fires_every_event() {
        let rec = recording(&[0.0, 0.5], 0.05, 0.1);
        let mut player = PlaybackEngine::default();
        let mut scheduler = EventScheduler::new();
        player
            .play(rec, None, PlaybackOptions::default().looped(true), 0.0, &mut scheduler)
            .unwrap();

        assert_eq!(run(&mut player, &mut scheduler, 0.5).len(), 2);
        player.pause(0.5, &mut scheduler).unwrap();
        player.resume(1.0, &mut scheduler).unwrap();

        // Boundary at 1.15, next pass fires both events again
        let fired = run(&mut player, &mut scheduler, 1.7);
        let order: Vec<usize> = fired.iter().map(|&(_, index)| index).collect();
        assert_eq!(order, vec![0, 1]);
        assert_eq!(player.session().map(|s| s.pass), Some(1));
    }

    #[test]
    fn test_play_rejects_tempo_with_unbounded_length() {
        let rec = recording(&[0.0, 0.5], 0.05, 0.1);
        let mut player = PlaybackEngine::default();
        let mut scheduler: EventScheduler<PlaybackAction> = EventScheduler::new();

        let tempo = 1e-309;
        assert_eq!(
            player
                .play(rec, None, PlaybackOptions::default().with_tempo(tempo), 0.0, &mut scheduler)
                .err(),
            Some(SynthError::InvalidTempo(tempo))
        );
        assert_eq!(player.state(), TransportState::Stopped);
        assert!(scheduler.is_empty());
    }

    #[test]
    fn test_pause_resume_invalid_states() {
        let mut player = PlaybackEngine::default();
        let mut scheduler: EventScheduler<PlaybackAction> = EventScheduler::new();
        assert!(player.pause(0.0, &mut scheduler).is_err());
        assert!(player.resume(0.0, &mut scheduler).is_err());
        assert!(player.set_looping(true).is_err());
    }

    #[test]
    fn test_set_looping_applies_at_boundary() {
        let rec = recording(&[0.0], 0.05, 0.15);
        let mut player = PlaybackEngine::default();
        let mut scheduler = EventScheduler::new();
        player
            .play(rec, None, PlaybackOptions::default(), 0.0, &mut scheduler)
            .unwrap();

        player.set_looping(true).unwrap();
        run(&mut player, &mut scheduler, 0.25);
        assert_eq!(player.state(), TransportState::Playing);

        player.set_looping(false).unwrap();
        run(&mut player, &mut scheduler, 0.45);
        assert_eq!(player.state(), TransportState::Stopped);
    }
}
