//! Configuration file round-trips

use birdsynth::config::{ConfigError, SynthConfig};
use birdsynth::synth::effect::EchoParams;
use birdsynth::SynthEngine;
use tempfile::TempDir;

#[test]
fn test_save_and_load_round_trip() {
    let dir = TempDir::new().unwrap();
    let path = dir.path().join("nested").join("config.ron");

    let mut config = SynthConfig::default();
    config.max_voices = 16;
    config.controls.attack = 0.02;
    config.echo = EchoParams {
        delay: 0.4,
        feedback: 0.6,
        wet: 0.3,
    };
    config.save(&path).unwrap();

    let loaded = SynthConfig::load(&path).unwrap();
    assert_eq!(loaded, config);
}

#[test]
fn test_missing_file_yields_defaults() {
    let dir = TempDir::new().unwrap();
    let path = dir.path().join("absent.ron");
    assert_eq!(
        SynthConfig::load_or_default(&path).unwrap(),
        SynthConfig::default()
    );
    assert!(matches!(SynthConfig::load(&path), Err(ConfigError::Io(_))));
}

#[test]
fn test_invalid_file_is_rejected() {
    let dir = TempDir::new().unwrap();
    let path = dir.path().join("config.ron");
    std::fs::write(&path, "(max_voices: 0)").unwrap();
    assert!(matches!(
        SynthConfig::load_or_default(&path),
        Err(ConfigError::Invalid(_))
    ));

    std::fs::write(&path, "not ron at all {").unwrap();
    assert!(matches!(
        SynthConfig::load(&path),
        Err(ConfigError::Parse(_))
    ));
}

#[test]
fn test_invalid_config_is_not_saved() {
    let dir = TempDir::new().unwrap();
    let path = dir.path().join("config.ron");
    let config = SynthConfig {
        pad_duration: -1.0,
        ..SynthConfig::default()
    };
    assert!(config.save(&path).is_err());
    assert!(!path.exists());
}

#[test]
fn test_loaded_config_drives_engine() {
    let dir = TempDir::new().unwrap();
    let path = dir.path().join("config.ron");
    std::fs::write(&path, "(controls: (attack: 0.01, release: 0.02), max_voices: 2)").unwrap();

    let config = SynthConfig::load(&path).unwrap();
    let mut engine = SynthEngine::new(&config);
    let handle = engine.trigger("chirp").unwrap();
    assert!((handle.ends_at - handle.started_at - 0.03).abs() < 1e-9);

    engine.trigger("coo").unwrap();
    engine.trigger("peep").unwrap();
    assert_eq!(engine.active_voice_count(), 2);
}
