use std::thread;
use std::time::Duration;

use birdsynth::messaging::channels::{
    DEFAULT_COMMAND_CAPACITY, DEFAULT_NOTIFICATION_CAPACITY, NotificationConsumer,
};
use birdsynth::{
    AudioEngine, Command, PlaybackOptions, SynthConfig, TapeSpeed, create_command_channel,
    create_notification_channel,
};
use ringbuf::traits::{Consumer, Producer};
use tracing::{error, info, warn};
use tracing_subscriber::EnvFilter;

/// Scripted demo: (delay before sending in ms, command)
fn demo_script() -> Vec<(u64, Command)> {
    vec![
        (0, Command::StartRecording),
        (0, Command::Trigger("chirp".to_string())),
        (300, Command::Trigger("trill".to_string())),
        (300, Command::Trigger("coo".to_string())),
        (300, Command::Trigger("bass".to_string())),
        (600, Command::StopRecording),
        (200, Command::PlayLatest(PlaybackOptions::default())),
        (1800, Command::PlayLatest(PlaybackOptions::default().reversed())),
        (
            1800,
            Command::PlayLatest(PlaybackOptions::default().with_speed(TapeSpeed::Fast).looped(true)),
        ),
        (2000, Command::Stop),
        (100, Command::StartPatternRecording),
        (0, Command::PressPad("chirp".to_string())),
        (150, Command::ReleasePad("chirp".to_string())),
        (100, Command::PressPad("bass".to_string())),
        (150, Command::ReleasePad("bass".to_string())),
        (100, Command::StopPatternRecording),
        (0, Command::PlayPattern),
        (1000, Command::ClearPattern),
    ]
}

fn drain(notification_rx: &mut NotificationConsumer) {
    while let Some(notification) = notification_rx.try_pop() {
        info!("{}", notification.message());
    }
}

fn main() {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    let config = match SynthConfig::default_path() {
        Some(path) => match SynthConfig::load_or_default(&path) {
            Ok(config) => {
                info!(path = %path.display(), "Configuration loaded");
                config
            }
            Err(e) => {
                warn!(error = %e, "Invalid configuration, using defaults");
                SynthConfig::default()
            }
        },
        None => SynthConfig::default(),
    };

    let (mut command_tx, command_rx) = create_command_channel(DEFAULT_COMMAND_CAPACITY);
    let (notification_tx, mut notification_rx) =
        create_notification_channel(DEFAULT_NOTIFICATION_CAPACITY);

    let audio_engine = match AudioEngine::new(&config, command_rx, notification_tx) {
        Ok(engine) => engine,
        Err(e) => {
            error!(error = %e, "Audio engine failed to start");
            return;
        }
    };
    info!(sample_rate = audio_engine.sample_rate(), "Birdsynth started");

    for (delay_ms, command) in demo_script() {
        thread::sleep(Duration::from_millis(delay_ms));
        drain(&mut notification_rx);
        if command_tx.try_push(command).is_err() {
            warn!("Command channel full, dropping command");
        }
    }

    thread::sleep(Duration::from_millis(1500));
    drain(&mut notification_rx);
    info!(
        state = audio_engine.transport().state().name(),
        peak = audio_engine.output_peak(),
        window = audio_engine.waveform_frame().len(),
        "Demo finished"
    );
}
