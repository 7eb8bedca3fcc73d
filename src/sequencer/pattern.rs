// Pattern Looper - Beat-pad capture and fire-and-forget replay
//
// While a capture window is open every pad press is appended with its time
// since the window opened and a fixed duration. Replay schedules each press
// and its release at the stored offsets, without tempo or direction, and
// stops itself after the last `time + duration`.

use std::collections::HashSet;

use super::scheduler::{EventScheduler, ScheduleHandle};
use crate::error::{SynthError, SynthResult};

/// Default length of a captured pad hit (seconds)
pub const DEFAULT_PAD_DURATION: f64 = 0.2;

/// One captured pad hit
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PatternEvent {
    /// Seconds since the capture window opened
    pub time: f64,
    pub tone: &'static str,
    pub duration: f64,
}

impl PatternEvent {
    pub fn end(&self) -> f64 {
        self.time + self.duration
    }
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct Pattern {
    events: Vec<PatternEvent>,
}

impl Pattern {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn events(&self) -> &[PatternEvent] {
        &self.events
    }

    /// Append a hit; times never go backwards
    pub fn push(&mut self, event: PatternEvent) {
        let floor = self.events.last().map_or(0.0, |last| last.time);
        self.events.push(PatternEvent {
            time: event.time.max(floor),
            ..event
        });
    }

    /// `time + duration` of the last hit
    pub fn total_duration(&self) -> f64 {
        self.events.last().map_or(0.0, PatternEvent::end)
    }

    pub fn len(&self) -> usize {
        self.events.len()
    }

    pub fn is_empty(&self) -> bool {
        self.events.is_empty()
    }

    pub fn clear(&mut self) {
        self.events.clear();
    }
}

/// Actions a pattern replay puts on the scheduler
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PatternAction {
    Press { epoch: u64, index: usize },
    Release { epoch: u64, index: usize },
    End { epoch: u64 },
}

pub struct PatternLooper {
    pattern: Pattern,
    pad_duration: f64,
    /// Start of the open capture window
    capture_start: Option<f64>,
    /// Epoch of the running replay
    playing: Option<u64>,
    next_epoch: u64,
    handles: Vec<ScheduleHandle>,
    held: HashSet<&'static str>,
    /// Held pads that the replay pressed
    replayed: HashSet<&'static str>,
}

impl PatternLooper {
    pub fn new(pad_duration: f64) -> Self {
        let pad_duration = if pad_duration.is_finite() && pad_duration > 0.0 {
            pad_duration
        } else {
            DEFAULT_PAD_DURATION
        };
        Self {
            pattern: Pattern::new(),
            pad_duration,
            capture_start: None,
            playing: None,
            next_epoch: 1,
            handles: Vec::new(),
            held: HashSet::new(),
            replayed: HashSet::new(),
        }
    }

    pub fn pattern(&self) -> &Pattern {
        &self.pattern
    }

    pub fn is_recording(&self) -> bool {
        self.capture_start.is_some()
    }

    pub fn is_playing(&self) -> bool {
        self.playing.is_some()
    }

    pub fn is_held(&self, tone: &str) -> bool {
        self.held.contains(tone)
    }

    /// Open a capture window at `now`
    ///
    /// Clears the pattern and stops any replay. Returns the pads that were
    /// released by stopping.
    pub fn start_recording<A>(
        &mut self,
        now: f64,
        scheduler: &mut EventScheduler<A>,
    ) -> Vec<&'static str> {
        let released = self.halt(scheduler);
        self.pattern.clear();
        self.capture_start = Some(now);
        released
    }

    /// Close the capture window, returning the number of captured hits
    pub fn stop_recording(&mut self) -> SynthResult<usize> {
        if self.capture_start.take().is_none() {
            return Err(SynthError::invalid_state(
                "stop pattern recording",
                "not recording",
            ));
        }
        Ok(self.pattern.len())
    }

    /// Press a pad at `now`
    ///
    /// Returns `false` when the pad is already held (key repeat). Captures
    /// the hit when a window is open.
    pub fn press(&mut self, tone: &'static str, now: f64) -> bool {
        if !self.held.insert(tone) {
            return false;
        }
        if let Some(start) = self.capture_start {
            self.pattern.push(PatternEvent {
                time: (now - start).max(0.0),
                tone,
                duration: self.pad_duration,
            });
        }
        true
    }

    /// Release a pad; `false` if it was not held
    pub fn release(&mut self, tone: &str) -> bool {
        self.replayed.remove(tone);
        self.held.remove(tone)
    }

    /// Replay the pattern from `now`
    ///
    /// No-op (returns `false`) while already playing or when empty.
    pub fn play<A: From<PatternAction>>(
        &mut self,
        now: f64,
        scheduler: &mut EventScheduler<A>,
    ) -> bool {
        if self.is_playing() || self.pattern.is_empty() {
            return false;
        }

        let epoch = self.next_epoch;
        self.next_epoch += 1;
        self.handles.clear();

        for (index, event) in self.pattern.events().iter().enumerate() {
            let press = scheduler.schedule_at(
                now + event.time,
                PatternAction::Press { epoch, index }.into(),
            );
            let release = scheduler.schedule_at(
                now + event.end(),
                PatternAction::Release { epoch, index }.into(),
            );
            self.handles.push(press);
            self.handles.push(release);
        }
        let end = scheduler.schedule_at(
            now + self.pattern.total_duration(),
            PatternAction::End { epoch }.into(),
        );
        self.handles.push(end);

        self.playing = Some(epoch);
        true
    }

    fn check_epoch(&self, epoch: u64) -> SynthResult<()> {
        if self.playing == Some(epoch) {
            Ok(())
        } else {
            Err(SynthError::SchedulerCancellationRace { epoch })
        }
    }

    fn tone_at(&self, index: usize) -> SynthResult<&'static str> {
        self.pattern
            .events()
            .get(index)
            .map(|event| event.tone)
            .ok_or_else(|| {
                SynthError::InvalidParameter(format!("pattern event {index} out of range"))
            })
    }

    /// A scheduled press fired at `now`
    ///
    /// Returns the pad to sound, or `None` when it is already held.
    pub fn on_press(
        &mut self,
        epoch: u64,
        index: usize,
        now: f64,
    ) -> SynthResult<Option<&'static str>> {
        self.check_epoch(epoch)?;
        let tone = self.tone_at(index)?;
        if !self.press(tone, now) {
            return Ok(None);
        }
        self.replayed.insert(tone);
        Ok(Some(tone))
    }

    /// A scheduled release fired; `false` when the replay does not hold the pad
    pub fn on_release(&mut self, epoch: u64, index: usize) -> SynthResult<bool> {
        self.check_epoch(epoch)?;
        let tone = self.tone_at(index)?;
        Ok(self.replayed.remove(tone) && self.held.remove(tone))
    }

    /// The replay reached its end; returns the pads released
    pub fn on_end<A>(
        &mut self,
        epoch: u64,
        scheduler: &mut EventScheduler<A>,
    ) -> SynthResult<Vec<&'static str>> {
        self.check_epoch(epoch)?;
        Ok(self.halt(scheduler))
    }

    /// Stop the replay, returning the pads released
    pub fn stop_playback<A>(
        &mut self,
        scheduler: &mut EventScheduler<A>,
    ) -> SynthResult<Vec<&'static str>> {
        if !self.is_playing() {
            return Err(SynthError::invalid_state("stop pattern", "not playing"));
        }
        Ok(self.halt(scheduler))
    }

    /// Empty the pattern, stop replay and close any capture window
    pub fn clear<A>(&mut self, scheduler: &mut EventScheduler<A>) -> Vec<&'static str> {
        let released = self.halt(scheduler);
        self.pattern.clear();
        self.capture_start = None;
        released
    }

    fn halt<A>(&mut self, scheduler: &mut EventScheduler<A>) -> Vec<&'static str> {
        scheduler.cancel_all(self.handles.drain(..));
        if self.playing.take().is_none() {
            return Vec::new();
        }
        let released: Vec<&'static str> = self.replayed.drain().collect();
        for tone in &released {
            self.held.remove(tone);
        }
        released
    }
}

impl Default for PatternLooper {
    fn default() -> Self {
        Self::new(DEFAULT_PAD_DURATION)
    }
}
