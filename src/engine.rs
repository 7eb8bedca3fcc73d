// Synth Engine - Owns the whole instrument and drives it from the sample clock
//
// Everything runs on one thread: UI operations mutate state directly, and
// timed work (playback triggers, progress ticks, pattern pads, voice
// end-of-life) goes through the event scheduler and is dispatched when the
// clock reaches it, either sample by sample in `render` or in jumps with
// `advance_to`.

use std::sync::Arc;

use tracing::{debug, info, warn};

use crate::audio::analyser::WaveformAnalyser;
use crate::audio::dsp_utils::{OnePoleSmoother, flush_denormals_to_zero, soft_clip};
use crate::audio::parameters::SharedControls;
use crate::audio::timing::SampleClock;
use crate::config::SynthConfig;
use crate::error::{SynthError, SynthResult};
use crate::messaging::command::Command;
use crate::messaging::notification::{Notification, VoiceSource};
use crate::sequencer::pattern::{Pattern, PatternAction, PatternLooper};
use crate::sequencer::player::{BoundaryOutcome, PlaybackAction, PlaybackEngine, SessionInfo};
use crate::sequencer::recorder::Recorder;
use crate::sequencer::recording::{EventEdit, Recording, RecordingBank};
use crate::sequencer::scheduler::{EventScheduler, TIME_EPSILON};
use crate::sequencer::transport::{PlaybackOptions, SharedTransport, TransportState};
use crate::synth::catalog::ToneCatalog;
use crate::synth::effect::{EchoParams, EffectBus, EffectMode, TapeParams};
use crate::synth::envelope::EnvelopeParams;
use crate::synth::voice::{VoiceId, VoiceParams};
use crate::synth::voice_manager::{Spawned, VoicePool};

/// Master volume smoothing time
const VOLUME_SMOOTHING_MS: f32 = 10.0;

/// Everything the engine puts on its scheduler
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ScheduledAction {
    Playback(PlaybackAction),
    Pattern(PatternAction),
    /// End of a voice's envelope
    ReleaseVoice(VoiceId),
}

impl From<PlaybackAction> for ScheduledAction {
    fn from(action: PlaybackAction) -> Self {
        ScheduledAction::Playback(action)
    }
}

impl From<PatternAction> for ScheduledAction {
    fn from(action: PatternAction) -> Self {
        ScheduledAction::Pattern(action)
    }
}

/// A started voice
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct VoiceHandle {
    pub id: VoiceId,
    pub tone: &'static str,
    pub started_at: f64,
    /// Time at which the envelope reaches silence and the voice is released
    pub ends_at: f64,
}

pub struct SynthEngine {
    clock: SampleClock,
    catalog: ToneCatalog,
    controls: SharedControls,
    voices: VoicePool,
    effects: EffectBus,
    scheduler: EventScheduler<ScheduledAction>,
    recorder: Recorder,
    recordings: RecordingBank,
    player: PlaybackEngine,
    looper: PatternLooper,
    analyser: WaveformAnalyser,
    volume_smoother: OnePoleSmoother,
    notifications: Vec<Notification>,
    transport: SharedTransport,
}

impl SynthEngine {
    /// Engine at the configured sample rate with its own controls
    pub fn new(config: &SynthConfig) -> Self {
        let controls = SharedControls::new(
            config.controls.attack,
            config.controls.release,
            config.controls.volume,
        );
        Self::with_controls(config, config.sample_rate, controls)
    }

    /// Engine at `sample_rate` reading the given (UI-shared) controls
    pub fn with_controls(config: &SynthConfig, sample_rate: f32, controls: SharedControls) -> Self {
        let volume = controls.volume();
        Self {
            clock: SampleClock::new(sample_rate),
            catalog: ToneCatalog::new(),
            voices: VoicePool::new(config.max_voices, sample_rate)
                .with_bass_cutoff(config.bass_cutoff),
            effects: EffectBus::new(config.echo, config.tape, sample_rate),
            scheduler: EventScheduler::new(),
            recorder: Recorder::new(),
            recordings: RecordingBank::new(),
            player: PlaybackEngine::new(config.progress_interval),
            looper: PatternLooper::new(config.pad_duration),
            analyser: WaveformAnalyser::new(config.analyser_size),
            volume_smoother: OnePoleSmoother::new(volume, VOLUME_SMOOTHING_MS, sample_rate),
            notifications: Vec::with_capacity(64),
            transport: SharedTransport::new(),
            controls,
        }
    }

    pub fn controls(&self) -> &SharedControls {
        &self.controls
    }

    /// Transport snapshot for another thread
    pub fn shared_transport(&self) -> SharedTransport {
        self.transport.clone()
    }

    pub fn catalog(&self) -> &ToneCatalog {
        &self.catalog
    }

    pub fn now(&self) -> f64 {
        self.clock.now()
    }

    pub fn sample_rate(&self) -> f32 {
        self.clock.sample_rate()
    }

    pub fn active_voice_count(&self) -> usize {
        self.voices.len()
    }

    pub fn is_voice_active(&self, id: VoiceId) -> bool {
        self.voices.contains(id)
    }

    pub fn effect_mode(&self) -> EffectMode {
        self.effects.mode()
    }

    /// Route of a live voice
    pub fn voice_route(&self, id: VoiceId) -> Option<EffectMode> {
        self.voices.get(id).map(|voice| voice.route())
    }

    pub fn voice_params(&self, id: VoiceId) -> Option<VoiceParams> {
        self.voices.get(id).map(|voice| *voice.params())
    }

    // ===== Voices =====

    fn envelope(&self) -> EnvelopeParams {
        let values = self.controls.control_values();
        EnvelopeParams::new(values.attack, values.release)
    }

    /// Start a catalog tone now with the current envelope controls
    pub fn trigger(&mut self, tone: &str) -> SynthResult<VoiceHandle> {
        let spec = self.catalog.resolve(tone)?;
        let params = VoiceParams::from_tone(spec, self.envelope());
        let now = self.clock.now();
        Ok(self.start_voice(params, VoiceSource::Trigger, now))
    }

    /// Press a beat pad
    ///
    /// Returns `None` when the pad is already held.
    pub fn press_pad(&mut self, tone: &str) -> SynthResult<Option<VoiceHandle>> {
        let spec = self.catalog.resolve(tone)?;
        let now = self.clock.now();
        if !self.looper.press(spec.id, now) {
            debug!(tone = spec.id, "Pad already held");
            return Ok(None);
        }
        let params = VoiceParams::from_tone(spec, self.envelope());
        Ok(Some(self.start_voice(params, VoiceSource::Pad, now)))
    }

    /// Release a beat pad; `false` if it was not held
    pub fn release_pad(&mut self, tone: &str) -> SynthResult<bool> {
        let spec = self.catalog.resolve(tone)?;
        Ok(self.looper.release(spec.id))
    }

    fn start_voice(&mut self, params: VoiceParams, source: VoiceSource, at: f64) -> VoiceHandle {
        let Spawned { id, stolen } =
            self.voices
                .spawn(params, self.effects.mode(), self.effects.tape_params());
        if let Some(victim) = stolen {
            debug!(voice = victim.raw(), "Voice stolen");
            self.player.forget_voice(victim);
            self.notify(Notification::VoiceReleased { voice: victim });
        }

        let ends_at = at + params.lifetime();
        self.scheduler
            .schedule_at(ends_at, ScheduledAction::ReleaseVoice(id));

        if source != VoiceSource::Playback {
            self.recorder.capture(&params, at);
        }
        self.notify(Notification::VoiceStarted {
            voice: id,
            tone: params.tone,
            source,
        });

        VoiceHandle {
            id,
            tone: params.tone,
            started_at: at,
            ends_at,
        }
    }

    fn release_voice(&mut self, id: VoiceId) {
        self.player.forget_voice(id);
        if self.voices.release(id) {
            self.notify(Notification::VoiceReleased { voice: id });
        }
    }

    fn release_voices(&mut self, ids: Vec<VoiceId>) {
        for id in ids {
            self.release_voice(id);
        }
    }

    // ===== Recording =====

    pub fn start_recording(&mut self) -> SynthResult<()> {
        self.recorder.start(self.clock.now())?;
        info!("Recording started");
        self.notify(Notification::RecordingStarted);
        Ok(())
    }

    /// Close the capture session
    ///
    /// Returns the index of the new recording, or `None` when nothing was
    /// captured.
    pub fn stop_recording(&mut self) -> SynthResult<Option<usize>> {
        let Some(recording) = self.recorder.stop()? else {
            info!("Recording stopped with no events");
            return Ok(None);
        };
        let events = recording.len();
        let duration = recording.duration();
        let index = self.recordings.push(recording);
        info!(index, events, duration, "Recording created");
        self.notify(Notification::RecordingCreated {
            index,
            events,
            duration,
        });
        Ok(Some(index))
    }

    pub fn is_recording(&self) -> bool {
        self.recorder.is_recording()
    }

    pub fn recordings(&self) -> &RecordingBank {
        &self.recordings
    }

    pub fn recording(&self, index: usize) -> SynthResult<&Recording> {
        self.recordings.get(index).map(Arc::as_ref)
    }

    pub fn edit_event(&mut self, recording: usize, event: usize, edit: EventEdit) -> SynthResult<()> {
        let updated = self
            .recordings
            .edit_event(&self.catalog, recording, event, edit)?;
        let notification = Notification::RecordingUpdated {
            index: recording,
            events: updated.len(),
            duration: updated.duration(),
        };
        self.notify(notification);
        Ok(())
    }

    pub fn delete_event(&mut self, recording: usize, event: usize) -> SynthResult<()> {
        let updated = self.recordings.delete_event(recording, event)?;
        let notification = Notification::RecordingUpdated {
            index: recording,
            events: updated.len(),
            duration: updated.duration(),
        };
        self.notify(notification);
        Ok(())
    }

    /// Drop every recording, stopping playback first
    pub fn clear_recordings(&mut self) {
        if self.player.state().has_session() {
            self.end_playback();
        }
        self.recordings.clear();
        info!("Recordings cleared");
        self.notify(Notification::RecordingsCleared);
    }

    // ===== Playback =====

    pub fn play(&mut self, index: usize, options: PlaybackOptions) -> SynthResult<SessionInfo> {
        let recording = Arc::clone(self.recordings.get(index)?);
        let now = self.clock.now();
        let info = self
            .player
            .play(recording, Some(index), options, now, &mut self.scheduler)?;
        info!(
            index,
            tempo = options.tempo,
            looping = options.looping,
            length = info.length,
            "Playback started"
        );
        self.notify(Notification::PlaybackStarted {
            recording: Some(index),
            options,
        });
        self.publish_transport();
        Ok(info)
    }

    /// Play the most recent recording
    pub fn play_latest(&mut self, options: PlaybackOptions) -> SynthResult<SessionInfo> {
        let index = self
            .recordings
            .latest_index()
            .ok_or(SynthError::RecordingNotFound(0))?;
        self.play(index, options)
    }

    pub fn stop(&mut self) -> SynthResult<()> {
        let voices = self.player.stop(&mut self.scheduler)?;
        self.release_voices(voices);
        info!("Playback stopped");
        self.notify(Notification::PlaybackStopped);
        self.publish_transport();
        Ok(())
    }

    fn end_playback(&mut self) {
        if let Err(err) = self.stop() {
            debug!(%err, "No playback to stop");
        }
    }

    pub fn pause(&mut self) -> SynthResult<()> {
        let now = self.clock.now();
        let (progress, voices) = self.player.pause(now, &mut self.scheduler)?;
        self.release_voices(voices);
        info!(progress, "Playback paused");
        self.notify(Notification::PlaybackPaused { progress });
        self.publish_transport();
        Ok(())
    }

    pub fn resume(&mut self) -> SynthResult<()> {
        let now = self.clock.now();
        let progress = self.player.resume(now, &mut self.scheduler)?;
        info!(progress, "Playback resumed");
        self.notify(Notification::PlaybackResumed { progress });
        self.publish_transport();
        Ok(())
    }

    /// Takes effect at the next loop boundary
    pub fn set_looping(&mut self, looping: bool) -> SynthResult<()> {
        self.player.set_looping(looping)
    }

    pub fn progress(&self) -> f64 {
        self.player.progress()
    }

    pub fn transport_state(&self) -> TransportState {
        self.player.state()
    }

    pub fn session(&self) -> Option<SessionInfo> {
        self.player.session()
    }

    // ===== Pattern =====

    pub fn start_pattern_recording(&mut self) {
        let was_playing = self.looper.is_playing();
        self.looper
            .start_recording(self.clock.now(), &mut self.scheduler);
        if was_playing {
            self.notify(Notification::PatternPlaybackStopped);
        }
        info!("Pattern recording started");
        self.notify(Notification::PatternRecordingStarted);
    }

    /// Returns the number of captured pad hits
    pub fn stop_pattern_recording(&mut self) -> SynthResult<usize> {
        let events = self.looper.stop_recording()?;
        info!(events, "Pattern recording stopped");
        self.notify(Notification::PatternRecordingStopped { events });
        Ok(events)
    }

    /// Replay the pattern; `false` when already playing or empty
    pub fn play_pattern(&mut self) -> bool {
        let started = self.looper.play(self.clock.now(), &mut self.scheduler);
        if started {
            info!(events = self.looper.pattern().len(), "Pattern playback started");
            self.notify(Notification::PatternPlaybackStarted);
        } else {
            debug!("Pattern playback not started");
        }
        started
    }

    pub fn stop_pattern_playback(&mut self) -> SynthResult<()> {
        self.looper.stop_playback(&mut self.scheduler)?;
        self.notify(Notification::PatternPlaybackStopped);
        Ok(())
    }

    pub fn clear_pattern(&mut self) {
        if self.looper.is_playing() {
            self.notify(Notification::PatternPlaybackStopped);
        }
        self.looper.clear(&mut self.scheduler);
        self.notify(Notification::PatternCleared);
    }

    pub fn pattern(&self) -> &Pattern {
        self.looper.pattern()
    }

    pub fn is_pattern_playing(&self) -> bool {
        self.looper.is_playing()
    }

    // ===== Effects =====

    /// Applies to voices started from now on
    pub fn set_effect_mode(&mut self, mode: EffectMode) {
        debug!(mode = mode.name(), "Effect mode changed");
        self.effects.set_mode(mode);
    }

    pub fn set_echo_params(&mut self, params: EchoParams) {
        self.effects.set_echo_params(params);
    }

    pub fn echo_params(&self) -> EchoParams {
        self.effects.echo_params()
    }

    pub fn set_tape_params(&mut self, params: TapeParams) {
        self.effects.set_tape_params(params);
    }

    pub fn tape_params(&self) -> TapeParams {
        self.effects.tape_params()
    }

    pub fn set_volume(&mut self, volume: f32) {
        self.controls.set_volume(volume);
    }

    // ===== Command boundary =====

    /// Apply a UI command, absorbing any error
    pub fn handle(&mut self, command: Command) {
        let result = match command {
            Command::Trigger(tone) => self.trigger(&tone).map(drop),
            Command::PressPad(tone) => self.press_pad(&tone).map(drop),
            Command::ReleasePad(tone) => self.release_pad(&tone).map(drop),
            Command::StartRecording => self.start_recording(),
            Command::StopRecording => self.stop_recording().map(drop),
            Command::EditEvent {
                recording,
                event,
                edit,
            } => self.edit_event(recording, event, edit),
            Command::DeleteEvent { recording, event } => self.delete_event(recording, event),
            Command::ClearRecordings => {
                self.clear_recordings();
                Ok(())
            }
            Command::Play { recording, options } => self.play(recording, options).map(drop),
            Command::PlayLatest(options) => self.play_latest(options).map(drop),
            Command::Stop => self.stop(),
            Command::Pause => self.pause(),
            Command::Resume => self.resume(),
            Command::SetLooping(looping) => self.set_looping(looping),
            Command::StartPatternRecording => {
                self.start_pattern_recording();
                Ok(())
            }
            Command::StopPatternRecording => self.stop_pattern_recording().map(drop),
            Command::PlayPattern => {
                self.play_pattern();
                Ok(())
            }
            Command::StopPatternPlayback => self.stop_pattern_playback(),
            Command::ClearPattern => {
                self.clear_pattern();
                Ok(())
            }
            Command::SetEffectMode(mode) => {
                self.set_effect_mode(mode);
                Ok(())
            }
            Command::SetEchoParams(params) => {
                self.set_echo_params(params);
                Ok(())
            }
            Command::SetTapeParams(params) => {
                self.set_tape_params(params);
                Ok(())
            }
            Command::SetVolume(volume) => {
                self.set_volume(volume);
                Ok(())
            }
        };

        if let Err(err) = result {
            self.absorb(err);
        }
    }

    fn absorb(&mut self, err: SynthError) {
        match err {
            SynthError::SchedulerCancellationRace { epoch } => {
                debug!(epoch, "Discarded stale scheduled action");
            }
            SynthError::UnknownTone(tone) => {
                debug!(%tone, "Ignored unknown tone");
            }
            err @ SynthError::InvalidSessionState { .. } => {
                debug!(error = %err, "Ignored redundant transport call");
            }
            other => {
                warn!(error = %other, "Operation failed");
                self.notify(Notification::Warning(other.to_string()));
            }
        }
    }

    // ===== Scheduling =====

    /// Dispatch everything due up to `time` without rendering audio
    pub fn advance_to(&mut self, time: f64) {
        if !time.is_finite() {
            return;
        }
        while let Some(due) = self.scheduler.next_due_time() {
            if due > time + TIME_EPSILON {
                break;
            }
            self.clock.advance_to(due);
            self.dispatch_due(due);
        }
        self.clock.advance_to(time);
        self.publish_transport();
    }

    /// Advance by `seconds` without rendering audio
    pub fn advance_by(&mut self, seconds: f64) {
        let target = self.clock.now() + seconds.max(0.0);
        self.advance_to(target);
    }

    fn dispatch_due(&mut self, now: f64) {
        while let Some((time, action)) = self.scheduler.pop_due(now) {
            self.dispatch(time, action);
        }
    }

    fn dispatch(&mut self, time: f64, action: ScheduledAction) {
        let result = match action {
            ScheduledAction::ReleaseVoice(id) => {
                self.release_voice(id);
                Ok(())
            }
            ScheduledAction::Playback(action) => self.dispatch_playback(time, action),
            ScheduledAction::Pattern(action) => self.dispatch_pattern(time, action),
        };
        if let Err(err) = result {
            self.absorb(err);
        }
    }

    fn dispatch_playback(&mut self, time: f64, action: PlaybackAction) -> SynthResult<()> {
        match action {
            PlaybackAction::Trigger { epoch, index } => {
                let params = self.player.on_trigger(epoch, index)?;
                let handle = self.start_voice(params, VoiceSource::Playback, time);
                self.player.track_voice(handle.id);
            }
            PlaybackAction::ProgressTick { epoch } => {
                let progress = self.player.on_tick(epoch, time, &mut self.scheduler)?;
                self.notify(Notification::Progress(progress));
            }
            PlaybackAction::Boundary { epoch } => {
                match self.player.on_boundary(epoch, time, &mut self.scheduler)? {
                    BoundaryOutcome::Looped { pass } => {
                        debug!(pass, "Playback looped");
                        self.notify(Notification::PlaybackLooped { pass });
                    }
                    BoundaryOutcome::Finished { voices } => {
                        self.release_voices(voices);
                        info!("Playback finished");
                        self.notify(Notification::PlaybackStopped);
                    }
                }
                self.publish_transport();
            }
        }
        Ok(())
    }

    fn dispatch_pattern(&mut self, time: f64, action: PatternAction) -> SynthResult<()> {
        match action {
            PatternAction::Press { epoch, index } => {
                if let Some(tone) = self.looper.on_press(epoch, index, time)? {
                    let spec = self.catalog.resolve(tone)?;
                    let params = VoiceParams::from_tone(spec, self.envelope());
                    self.start_voice(params, VoiceSource::Pad, time);
                } else {
                    debug!(epoch, index, "Replayed pad already held");
                }
            }
            PatternAction::Release { epoch, index } => {
                self.looper.on_release(epoch, index)?;
            }
            PatternAction::End { epoch } => {
                self.looper.on_end(epoch, &mut self.scheduler)?;
                debug!("Pattern playback finished");
                self.notify(Notification::PatternPlaybackStopped);
            }
        }
        Ok(())
    }

    // ===== Rendering =====

    /// Render mono samples, dispatching scheduled actions at sample accuracy
    pub fn render(&mut self, output: &mut [f32]) {
        for sample in output.iter_mut() {
            self.dispatch_due(self.clock.now());

            let frame = self.voices.next_frame();
            let wet = self.effects.process_echo(frame.echo_send);
            let gain = self.volume_smoother.process(self.controls.volume());
            let mixed = flush_denormals_to_zero((frame.dry + wet) * gain);
            let out = soft_clip(mixed);

            self.analyser.push(out);
            *sample = out;
            self.clock.advance(1);
        }
        self.publish_transport();
    }

    /// Most recent output window, oldest sample first
    pub fn waveform_frame(&self) -> Vec<f32> {
        self.analyser.frame()
    }

    /// Peak amplitude of the analyser window
    pub fn waveform_peak(&self) -> f32 {
        self.analyser.peak()
    }

    /// Copy the analyser window into `frame` without allocating once sized
    pub fn copy_waveform(&self, frame: &mut Vec<f32>) {
        self.analyser.copy_frame(frame);
    }

    // ===== Notifications =====

    fn notify(&mut self, notification: Notification) {
        self.notifications.push(notification);
    }

    /// Notifications produced since the last drain
    pub fn drain_notifications(&mut self) -> Vec<Notification> {
        std::mem::take(&mut self.notifications)
    }

    /// Hand pending notifications to `sink`, keeping the buffer's capacity
    pub fn forward_notifications(&mut self, mut sink: impl FnMut(Notification)) {
        for notification in self.notifications.drain(..) {
            sink(notification);
        }
    }

    fn publish_transport(&self) {
        self.transport
            .publish(self.player.state(), self.player.progress());
    }
}
