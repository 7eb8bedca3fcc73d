//! End-to-end scenarios driving the SynthEngine on its logical clock
//!
//! Time is advanced with `advance_to` in small steps and voice starts are
//! observed through the notification stream.

use birdsynth::sequencer::recording::EventEdit;
use birdsynth::sequencer::transport::{PlaybackOptions, TapeSpeed, TransportState};
use birdsynth::synth::effect::EffectMode;
use birdsynth::{Notification, SynthConfig, SynthEngine, SynthError, VoiceId, VoiceSource};

const STEP: f64 = 0.001;
const TOLERANCE: f64 = 0.0015;

fn engine() -> SynthEngine {
    SynthEngine::new(&SynthConfig::default())
}

fn engine_with_envelope(attack: f64, release: f64) -> SynthEngine {
    let engine = engine();
    engine.controls().set_attack(attack);
    engine.controls().set_release(release);
    engine
}

/// Record `tones` at the given times (relative to now) and return the recording index
fn record(engine: &mut SynthEngine, hits: &[(f64, &str)]) -> usize {
    let start = engine.now();
    engine.start_recording().unwrap();
    for (time, tone) in hits {
        engine.advance_to(start + time);
        engine.trigger(tone).unwrap();
    }
    let index = engine.stop_recording().unwrap().unwrap();
    engine.drain_notifications();
    index
}

/// Voice starts from `source` seen while stepping the clock up to `until`
fn voice_starts(
    engine: &mut SynthEngine,
    until: f64,
    source: VoiceSource,
) -> Vec<(f64, &'static str, VoiceId)> {
    let mut starts = Vec::new();
    let mut step = 0u64;
    let origin = engine.now();
    while engine.now() < until {
        step += 1;
        let target = (origin + step as f64 * STEP).min(until);
        engine.advance_to(target);
        for notification in engine.drain_notifications() {
            if let Notification::VoiceStarted {
                voice,
                tone,
                source: from,
            } = notification
                && from == source
            {
                starts.push((engine.now(), tone, voice));
            }
        }
    }
    starts
}

fn gaps(starts: &[(f64, &'static str, VoiceId)]) -> Vec<f64> {
    starts.windows(2).map(|w| w[1].0 - w[0].0).collect()
}

#[test]
fn test_chirp_recording_scenario() {
    let mut engine = engine_with_envelope(0.05, 0.1);

    engine.start_recording().unwrap();
    engine.trigger("chirp").unwrap();
    let index = engine.stop_recording().unwrap().expect("one event");

    let recording = engine.recording(index).unwrap();
    assert_eq!(recording.len(), 1);
    let event = &recording.events()[0];
    assert!(event.time.abs() < 1e-9);
    assert_eq!(event.tone, "chirp");
    assert_eq!(event.frequency, 800.0);
    assert_eq!(event.modulation_frequency, 10.0);
    assert_eq!(event.modulation_depth, 50.0);
    assert_eq!(event.attack, 0.05);
    assert_eq!(event.release, 0.1);
    assert!((recording.duration() - 0.15).abs() < 1e-9);

    let notes = engine.drain_notifications();
    assert!(notes.contains(&Notification::RecordingCreated {
        index,
        events: 1,
        duration: recording_duration(&engine, index),
    }));
}

fn recording_duration(engine: &SynthEngine, index: usize) -> f64 {
    engine.recording(index).unwrap().duration()
}

#[test]
fn test_stop_recording_without_events_yields_nothing() {
    let mut engine = engine();
    engine.start_recording().unwrap();
    assert_eq!(engine.stop_recording().unwrap(), None);
    assert!(engine.recordings().is_empty());
}

#[test]
fn test_replay_reproduces_offsets() {
    let mut engine = engine_with_envelope(0.01, 0.05);
    let hits = [(0.0, "chirp"), (0.25, "coo"), (0.7, "peep"), (0.72, "bass")];
    let index = record(&mut engine, &hits);
    engine.advance_to(engine.now() + 1.0);

    let start = engine.now();
    engine.play(index, PlaybackOptions::default()).unwrap();
    let starts = voice_starts(&mut engine, start + 2.0, VoiceSource::Playback);

    assert_eq!(starts.len(), hits.len());
    for ((fired, tone, _), (offset, expected)) in starts.iter().zip(hits.iter()) {
        assert_eq!(tone, expected);
        assert!(
            (fired - start - offset).abs() < TOLERANCE,
            "{tone} fired at {} instead of {offset}",
            fired - start
        );
    }
    assert_eq!(engine.transport_state(), TransportState::Stopped);
    assert_eq!(engine.progress(), 0.0);
}

#[test]
fn test_reverse_playback_order_and_parameters() {
    let mut engine = engine_with_envelope(0.05, 0.3);
    let index = record(&mut engine, &[(0.0, "chirp"), (1.0, "whistle"), (2.0, "trill")]);
    engine
        .edit_event(index, 0, EventEdit::Frequency(555.0))
        .unwrap();
    engine.advance_to(engine.now() + 1.0);

    let start = engine.now();
    engine
        .play(index, PlaybackOptions::default().reversed())
        .unwrap();

    let mut seen = Vec::new();
    let mut step = 0u64;
    while engine.now() < start + 3.0 {
        step += 1;
        engine.advance_to(start + step as f64 * STEP);
        for notification in engine.drain_notifications() {
            if let Notification::VoiceStarted {
                voice,
                tone,
                source: VoiceSource::Playback,
            } = notification
            {
                let params = engine.voice_params(voice).expect("voice is live");
                seen.push((engine.now() - start, tone, params));
            }
        }
    }

    let order: Vec<&str> = seen.iter().map(|(_, tone, _)| *tone).collect();
    assert_eq!(order, vec!["trill", "whistle", "chirp"]);
    assert!(seen[0].0 < TOLERANCE);
    assert!((seen[1].0 - 1.0).abs() < TOLERANCE);
    assert!((seen[2].0 - 2.0).abs() < TOLERANCE);

    let (_, _, chirp) = seen[2];
    assert_eq!(chirp.frequency, 555.0);
    assert_eq!(chirp.modulation_frequency, 10.0);
    assert_eq!(chirp.envelope.attack, 0.05);
    assert_eq!(chirp.envelope.release, 0.3);
}

#[test]
fn test_reverse_progress_runs_downwards() {
    let mut engine = engine_with_envelope(0.05, 0.3);
    let index = record(&mut engine, &[(0.0, "chirp"), (1.0, "whistle")]);
    engine.advance_to(engine.now() + 1.0);

    let start = engine.now();
    engine
        .play(index, PlaybackOptions::default().reversed())
        .unwrap();
    assert_eq!(engine.progress(), 1.0);

    let mut last = 1.0;
    for step in 1..13 {
        engine.advance_to(start + step as f64 * 0.1);
        for notification in engine.drain_notifications() {
            if let Notification::Progress(progress) = notification {
                assert!(progress <= last + 1e-12);
                assert!((0.0..=1.0).contains(&progress));
                last = progress;
            }
        }
    }
    assert!(last < 0.2);
}

#[test]
fn test_tempo_scales_gaps() {
    let mut engine = engine_with_envelope(0.02, 0.1);
    let index = record(&mut engine, &[(0.0, "chirp"), (0.4, "coo"), (1.0, "peep")]);
    engine.advance_to(engine.now() + 1.0);

    let start = engine.now();
    engine.play(index, PlaybackOptions::default()).unwrap();
    let normal = voice_starts(&mut engine, start + 1.5, VoiceSource::Playback);
    assert_eq!(engine.transport_state(), TransportState::Stopped);

    let start = engine.now();
    engine
        .play(index, PlaybackOptions::default().with_speed(TapeSpeed::Fast))
        .unwrap();
    let fast = voice_starts(&mut engine, start + 1.0, VoiceSource::Playback);

    let normal_gaps = gaps(&normal);
    let fast_gaps = gaps(&fast);
    assert_eq!(normal_gaps.len(), 2);
    assert_eq!(fast_gaps.len(), 2);
    for (n, f) in normal_gaps.iter().zip(&fast_gaps) {
        assert!((n / 2.0 - f).abs() < TOLERANCE, "{n} vs {f}");
    }
}

#[test]
fn test_looping_fires_event_set_twice() {
    // Two events, 1 second total: 0.5 + (0.05 + 0.45)
    let mut engine = engine_with_envelope(0.05, 0.45);
    let index = record(&mut engine, &[(0.0, "chirp"), (0.5, "coo")]);
    assert!((engine.recording(index).unwrap().duration() - 1.0).abs() < 1e-9);
    engine.advance_to(engine.now() + 1.0);

    let start = engine.now();
    engine
        .play(index, PlaybackOptions::default().looped(true))
        .unwrap();

    let mut triggers = 0;
    let mut loops = Vec::new();
    let mut step = 0u64;
    while engine.now() < start + 1.0 - STEP / 2.0 {
        step += 1;
        engine.advance_to(start + step as f64 * STEP - STEP / 2.0);
        for notification in engine.drain_notifications() {
            match notification {
                Notification::VoiceStarted {
                    source: VoiceSource::Playback,
                    ..
                } => triggers += 1,
                Notification::PlaybackLooped { pass } => loops.push(pass),
                _ => {}
            }
        }
    }
    assert_eq!(triggers, 2, "first pass within the first second");

    engine.advance_to(start + 2.0 - STEP / 2.0);
    for notification in engine.drain_notifications() {
        match notification {
            Notification::VoiceStarted {
                source: VoiceSource::Playback,
                ..
            } => triggers += 1,
            Notification::PlaybackLooped { pass } => loops.push(pass),
            _ => {}
        }
    }
    assert_eq!(triggers, 4, "event set fired twice");
    assert_eq!(loops, vec![1]);
    assert_eq!(engine.transport_state(), TransportState::Playing);

    engine.stop().unwrap();
    assert_eq!(engine.transport_state(), TransportState::Stopped);
}

#[test]
fn test_set_looping_applies_at_boundary() {
    let mut engine = engine_with_envelope(0.05, 0.45);
    let index = record(&mut engine, &[(0.0, "chirp"), (0.5, "coo")]);
    engine.advance_to(engine.now() + 1.0);

    let start = engine.now();
    engine
        .play(index, PlaybackOptions::default().looped(true))
        .unwrap();
    engine.advance_to(start + 0.5);
    engine.set_looping(false).unwrap();
    engine.advance_to(start + 1.5);

    assert_eq!(engine.transport_state(), TransportState::Stopped);
    assert!(
        engine
            .drain_notifications()
            .iter()
            .all(|n| !matches!(n, Notification::PlaybackLooped { .. }))
    );
}

#[test]
fn test_stop_is_idempotent() {
    let mut engine = engine_with_envelope(0.05, 1.0);
    let index = record(&mut engine, &[(0.0, "chirp"), (0.2, "coo"), (2.0, "trill")]);
    engine.advance_to(engine.now() + 2.0);

    let start = engine.now();
    engine.play(index, PlaybackOptions::default()).unwrap();
    let started = voice_starts(&mut engine, start + 0.5, VoiceSource::Playback);
    assert_eq!(started.len(), 2);

    engine.stop().unwrap();
    let after_first = (engine.transport_state(), engine.progress(), engine.session());

    assert!(matches!(
        engine.stop(),
        Err(SynthError::InvalidSessionState { .. })
    ));
    assert_eq!(
        (engine.transport_state(), engine.progress(), engine.session()),
        after_first
    );
    assert_eq!(after_first.0, TransportState::Stopped);
    for (_, _, voice) in &started {
        assert!(!engine.is_voice_active(*voice));
    }

    // Nothing from the stopped session fires later
    let late = voice_starts(&mut engine, start + 4.0, VoiceSource::Playback);
    assert!(late.is_empty());
}

#[test]
fn test_second_play_is_rejected() {
    let mut engine = engine();
    let index = record(&mut engine, &[(0.0, "chirp")]);
    engine.play(index, PlaybackOptions::default()).unwrap();
    let session = engine.session();

    assert!(matches!(
        engine.play(index, PlaybackOptions::default()),
        Err(SynthError::InvalidSessionState { .. })
    ));
    assert_eq!(engine.session(), session);
}

#[test]
fn test_pause_and_resume_from_position() {
    let mut engine = engine_with_envelope(0.05, 0.3);
    let index = record(&mut engine, &[(0.0, "chirp"), (1.0, "whistle"), (2.0, "trill")]);
    engine.advance_to(engine.now() + 1.0);

    let start = engine.now();
    engine.play(index, PlaybackOptions::default()).unwrap();
    let before = voice_starts(&mut engine, start + 1.5, VoiceSource::Playback);
    assert_eq!(before.len(), 2);

    engine.pause().unwrap();
    assert_eq!(engine.transport_state(), TransportState::Paused);
    let paused_progress = engine.progress();
    assert!((paused_progress - 1.5 / 2.35).abs() < 1e-6);

    // Time passes while paused: nothing fires, progress holds
    let idle = voice_starts(&mut engine, start + 5.0, VoiceSource::Playback);
    assert!(idle.is_empty());
    assert_eq!(engine.progress(), paused_progress);

    let resumed_at = engine.now();
    engine.resume().unwrap();
    let after = voice_starts(&mut engine, resumed_at + 1.0, VoiceSource::Playback);
    assert_eq!(after.len(), 1);
    assert_eq!(after[0].1, "trill");
    assert!((after[0].0 - resumed_at - 0.5).abs() < TOLERANCE);
    assert_eq!(engine.transport_state(), TransportState::Stopped);
}

#[test]
fn test_pause_on_a_trigger_time_replays_each_event_once() {
    let mut engine = engine_with_envelope(0.05, 0.3);
    let index = record(&mut engine, &[(0.0, "chirp"), (0.5, "coo")]);
    engine.advance_to(2.0);

    engine.play(index, PlaybackOptions::default()).unwrap();
    engine.advance_to(2.5);
    engine.pause().unwrap();
    engine.resume().unwrap();
    engine.advance_to(5.0);

    let tones: Vec<&str> = engine
        .drain_notifications()
        .into_iter()
        .filter_map(|n| match n {
            Notification::VoiceStarted {
                tone,
                source: VoiceSource::Playback,
                ..
            } => Some(tone),
            _ => None,
        })
        .collect();
    assert_eq!(tones, vec!["chirp", "coo"]);
    assert_eq!(engine.transport_state(), TransportState::Stopped);
}

#[test]
fn test_redundant_pause_and_resume_are_rejected() {
    let mut engine = engine();
    assert!(engine.pause().is_err());
    assert!(engine.resume().is_err());
    assert!(engine.set_looping(true).is_err());
    assert_eq!(engine.transport_state(), TransportState::Stopped);
}

#[test]
fn test_playback_voices_are_not_recorded() {
    let mut engine = engine();
    let index = record(&mut engine, &[(0.0, "chirp"), (0.2, "coo")]);
    engine.advance_to(engine.now() + 1.0);

    engine.start_recording().unwrap();
    let start = engine.now();
    engine.play(index, PlaybackOptions::default()).unwrap();
    voice_starts(&mut engine, start + 1.0, VoiceSource::Playback);
    engine.trigger("peep").unwrap();

    let second = engine.stop_recording().unwrap().unwrap();
    let recording = engine.recording(second).unwrap();
    assert_eq!(recording.len(), 1);
    assert_eq!(recording.events()[0].tone, "peep");
}

#[test]
fn test_edit_and_delete_events() {
    let mut engine = engine_with_envelope(0.05, 0.1);
    let index = record(&mut engine, &[(0.0, "chirp"), (0.5, "coo")]);

    engine
        .edit_event(index, 1, EventEdit::Tone("squawk".to_string()))
        .unwrap();
    let event = &engine.recording(index).unwrap().events()[1];
    assert_eq!(event.tone, "squawk");
    assert_eq!(event.modulation_frequency, 25.0);
    assert_eq!(event.frequency, 600.0);

    engine.delete_event(index, 1).unwrap();
    let recording = engine.recording(index).unwrap();
    assert_eq!(recording.len(), 1);
    assert!((recording.duration() - 0.15).abs() < 1e-9);

    let notes = engine.drain_notifications();
    assert_eq!(
        notes
            .iter()
            .filter(|n| matches!(n, Notification::RecordingUpdated { .. }))
            .count(),
        2
    );

    assert!(matches!(
        engine.delete_event(index, 7),
        Err(SynthError::EventNotFound { .. })
    ));
}

#[test]
fn test_clear_recordings_stops_playback() {
    let mut engine = engine();
    let index = record(&mut engine, &[(0.0, "chirp"), (0.5, "coo")]);
    engine.play(index, PlaybackOptions::default()).unwrap();

    engine.clear_recordings();
    assert_eq!(engine.transport_state(), TransportState::Stopped);
    assert!(engine.recordings().is_empty());
    let notes = engine.drain_notifications();
    assert!(notes.contains(&Notification::PlaybackStopped));
    assert!(notes.contains(&Notification::RecordingsCleared));
}

#[test]
fn test_pattern_replay_and_auto_stop() {
    let mut engine = engine();
    let origin = engine.now();
    engine.start_pattern_recording();
    engine.press_pad("chirp").unwrap().expect("pad sounds");
    engine.release_pad("chirp").unwrap();
    engine.advance_to(origin + 0.3);
    engine.press_pad("bass").unwrap().expect("pad sounds");
    engine.release_pad("bass").unwrap();
    assert_eq!(engine.stop_pattern_recording().unwrap(), 2);

    let times: Vec<f64> = engine.pattern().events().iter().map(|e| e.time).collect();
    assert!(times[0].abs() < 1e-9);
    assert!((times[1] - 0.3).abs() < 1e-9);
    assert!((engine.pattern().total_duration() - 0.5).abs() < 1e-9);

    engine.advance_to(origin + 2.0);
    engine.drain_notifications();
    let start = engine.now();
    assert!(engine.play_pattern());
    assert!(!engine.play_pattern(), "play while playing is a no-op");

    let pads = voice_starts(&mut engine, start + 1.0, VoiceSource::Pad);
    let tones: Vec<&str> = pads.iter().map(|(_, tone, _)| *tone).collect();
    assert_eq!(tones, vec!["chirp", "bass"]);
    assert!((pads[0].0 - start).abs() < TOLERANCE);
    assert!((pads[1].0 - start - 0.3).abs() < TOLERANCE);
    assert!(!engine.is_pattern_playing());

    engine.clear_pattern();
    assert!(engine.pattern().is_empty());
    assert!(!engine.play_pattern());
}

#[test]
fn test_stop_pattern_playback_cancels_pending_hits() {
    let mut engine = engine();
    let origin = engine.now();
    engine.start_pattern_recording();
    engine.press_pad("chirp").unwrap();
    engine.release_pad("chirp").unwrap();
    engine.advance_to(origin + 0.5);
    engine.press_pad("coo").unwrap();
    engine.release_pad("coo").unwrap();
    engine.stop_pattern_recording().unwrap();

    let start = engine.now();
    engine.play_pattern();
    engine.advance_to(start + 0.1);
    engine.stop_pattern_playback().unwrap();
    engine.drain_notifications();

    let late = voice_starts(&mut engine, start + 1.0, VoiceSource::Pad);
    assert!(late.is_empty());
    assert!(engine.stop_pattern_playback().is_err());
}

#[test]
fn test_stopping_pattern_keeps_user_held_pad() {
    let mut engine = engine();
    engine.start_pattern_recording();
    engine.press_pad("chirp").unwrap();
    engine.release_pad("chirp").unwrap();
    engine.advance_to(engine.now() + 0.5);
    engine.press_pad("coo").unwrap();
    engine.release_pad("coo").unwrap();
    engine.stop_pattern_recording().unwrap();

    let start = engine.now();
    engine.play_pattern();
    engine.advance_to(start + 0.1);
    assert!(engine.press_pad("trill").unwrap().is_some());
    engine.stop_pattern_playback().unwrap();

    // Key repeat of the still-held pad must not sound again
    assert!(engine.press_pad("trill").unwrap().is_none());
    assert!(engine.release_pad("trill").unwrap());
    // The pad the replay held is free again
    assert!(engine.press_pad("chirp").unwrap().is_some());
}

#[test]
fn test_pad_key_repeat_guard() {
    let mut engine = engine();
    assert!(engine.press_pad("trill").unwrap().is_some());
    assert!(engine.press_pad("trill").unwrap().is_none());
    assert_eq!(engine.active_voice_count(), 1);

    assert!(engine.release_pad("trill").unwrap());
    assert!(!engine.release_pad("trill").unwrap());
    assert!(engine.press_pad("trill").unwrap().is_some());
    assert!(matches!(
        engine.press_pad("owl"),
        Err(SynthError::UnknownTone(_))
    ));
}

#[test]
fn test_pad_presses_enter_the_recorder() {
    let mut engine = engine();
    engine.start_recording().unwrap();
    engine.press_pad("growl").unwrap();
    let index = engine.stop_recording().unwrap().unwrap();
    assert_eq!(engine.recording(index).unwrap().events()[0].tone, "growl");
}

#[test]
fn test_effect_mode_does_not_reroute_live_voices() {
    let mut engine = engine_with_envelope(0.5, 0.5);
    let dry = engine.trigger("chirp").unwrap();
    engine.set_effect_mode(EffectMode::Echo);
    let echoed = engine.trigger("whistle").unwrap();
    engine.set_effect_mode(EffectMode::Tape);
    let taped = engine.trigger("coo").unwrap();

    assert_eq!(engine.voice_route(dry.id), Some(EffectMode::None));
    assert_eq!(engine.voice_route(echoed.id), Some(EffectMode::Echo));
    assert_eq!(engine.voice_route(taped.id), Some(EffectMode::Tape));
}

#[test]
fn test_voice_cap_steals_oldest() {
    let config = SynthConfig {
        max_voices: 4,
        ..SynthConfig::default()
    };
    let mut engine = SynthEngine::new(&config);
    engine.controls().set_release(2.0);

    let handles: Vec<_> = (0..6).map(|_| engine.trigger("peep").unwrap()).collect();
    assert_eq!(engine.active_voice_count(), 4);
    assert!(!engine.is_voice_active(handles[0].id));
    assert!(!engine.is_voice_active(handles[1].id));
    assert!(engine.is_voice_active(handles[5].id));

    let released: Vec<_> = engine
        .drain_notifications()
        .into_iter()
        .filter_map(|n| match n {
            Notification::VoiceReleased { voice } => Some(voice),
            _ => None,
        })
        .collect();
    assert_eq!(released, vec![handles[0].id, handles[1].id]);

    // The stolen voices' scheduled end of life is a no-op
    engine.advance_to(engine.now() + 3.0);
    assert_eq!(engine.active_voice_count(), 0);
    let late_releases = engine
        .drain_notifications()
        .into_iter()
        .filter(|n| matches!(n, Notification::VoiceReleased { .. }))
        .count();
    assert_eq!(late_releases, 4);
}
