// Audio engine - cpal output stream hosting the SynthEngine
//
// # Format Support
//
// The device's preferred sample format is used as-is:
// - **F32**: native, no conversion
// - **I16**: common on Windows/WASAPI
// - **U16**: rare
//
// The synth renders mono f32 internally. Each frame is converted through
// cpal's `FromSample<f32>` and written to every output channel.
//
// # Threading
//
// The SynthEngine lives behind a mutex shared with the callback. The callback
// only ever `try_lock`s it and renders silence when the UI side holds the
// lock. Commands arrive through a lock-free ring buffer; notifications leave
// through another one and are dropped (with a log line) when it is full.

use std::sync::{Arc, Mutex};

use cpal::traits::{DeviceTrait, HostTrait, StreamTrait};
use cpal::{Device, FromSample, Sample, SampleFormat, SizedSample, Stream, StreamConfig};
use ringbuf::traits::{Consumer, Producer};
use thiserror::Error;
use tracing::{error, info, warn};

use crate::audio::parameters::SharedControls;
use crate::config::SynthConfig;
use crate::engine::SynthEngine;
use crate::messaging::channels::{CommandConsumer, NotificationProducer};
use crate::sequencer::transport::SharedTransport;

/// Frames rendered per engine call inside the callback
const RENDER_CHUNK: usize = 256;

#[derive(Debug, Error)]
pub enum AudioError {
    #[error("No audio output device found")]
    NoDevice,

    #[error("Audio configuration error: {0}")]
    Config(#[from] cpal::DefaultStreamConfigError),

    #[error("Error in stream creation: {0}")]
    Build(#[from] cpal::BuildStreamError),

    #[error("Error in stream beginning: {0}")]
    Play(#[from] cpal::PlayStreamError),

    #[error("Unsupported sample format: {0:?}")]
    UnsupportedFormat(SampleFormat),
}

pub struct AudioEngine {
    _device: Device,
    _stream: Stream,
    sample_rate: f32,
    channels: usize,
    synth: Arc<Mutex<SynthEngine>>,
    controls: SharedControls,
    transport: SharedTransport,
}

impl AudioEngine {
    /// Open the default output device and start rendering
    pub fn new(
        config: &SynthConfig,
        command_rx: CommandConsumer,
        notification_tx: NotificationProducer,
    ) -> Result<Self, AudioError> {
        let host = cpal::default_host();
        let device = host.default_output_device().ok_or(AudioError::NoDevice)?;
        info!(
            device = %device.name().unwrap_or_else(|_| "Unknown".to_string()),
            "Audio device"
        );

        let supported_config = device.default_output_config()?;
        let sample_format = supported_config.sample_format();
        let sample_rate = supported_config.sample_rate().0 as f32;
        let channels = supported_config.channels() as usize;
        info!(?sample_format, sample_rate, channels, "Audio config");

        let controls = SharedControls::new(
            config.controls.attack,
            config.controls.release,
            config.controls.volume,
        );
        let synth = SynthEngine::with_controls(config, sample_rate, controls.clone());
        let transport = synth.shared_transport();
        let synth = Arc::new(Mutex::new(synth));

        let stream_config: StreamConfig = supported_config.into();
        let stream = match sample_format {
            SampleFormat::F32 => Self::build_stream::<f32>(
                &device,
                &stream_config,
                channels,
                Arc::clone(&synth),
                command_rx,
                notification_tx,
            )?,
            SampleFormat::I16 => Self::build_stream::<i16>(
                &device,
                &stream_config,
                channels,
                Arc::clone(&synth),
                command_rx,
                notification_tx,
            )?,
            SampleFormat::U16 => Self::build_stream::<u16>(
                &device,
                &stream_config,
                channels,
                Arc::clone(&synth),
                command_rx,
                notification_tx,
            )?,
            other => return Err(AudioError::UnsupportedFormat(other)),
        };

        stream.play()?;
        info!(sample_rate, channels, "Audio engine started");

        Ok(Self {
            _device: device,
            _stream: stream,
            sample_rate,
            channels,
            synth,
            controls,
            transport,
        })
    }

    pub fn sample_rate(&self) -> f32 {
        self.sample_rate
    }

    pub fn channels(&self) -> usize {
        self.channels
    }

    /// Attack, release and volume sliders
    pub fn controls(&self) -> &SharedControls {
        &self.controls
    }

    pub fn transport(&self) -> &SharedTransport {
        &self.transport
    }

    /// Latest output window for the oscilloscope
    ///
    /// Returns an empty frame when the callback currently holds the engine.
    pub fn waveform_frame(&self) -> Vec<f32> {
        match self.synth.try_lock() {
            Ok(synth) => synth.waveform_frame(),
            Err(_) => Vec::new(),
        }
    }

    /// Peak of the latest output window (0 when the engine is busy)
    pub fn output_peak(&self) -> f32 {
        self.synth
            .try_lock()
            .map(|synth| synth.waveform_peak())
            .unwrap_or(0.0)
    }

    fn build_stream<T>(
        device: &Device,
        config: &StreamConfig,
        channels: usize,
        synth: Arc<Mutex<SynthEngine>>,
        mut command_rx: CommandConsumer,
        mut notification_tx: NotificationProducer,
    ) -> Result<Stream, AudioError>
    where
        T: SizedSample + FromSample<f32> + Send + 'static,
    {
        let mut mono = [0.0f32; RENDER_CHUNK];
        let channels = channels.max(1);

        let stream = device.build_output_stream(
            config,
            move |data: &mut [T], _: &cpal::OutputCallbackInfo| {
                let Ok(mut synth) = synth.try_lock() else {
                    for sample in data.iter_mut() {
                        *sample = T::from_sample(0.0f32);
                    }
                    return;
                };

                while let Some(command) = command_rx.try_pop() {
                    synth.handle(command);
                }

                for frames in data.chunks_mut(RENDER_CHUNK * channels) {
                    let count = frames.len() / channels;
                    let block = &mut mono[..count];
                    synth.render(block);
                    for (frame, value) in frames.chunks_mut(channels).zip(block.iter()) {
                        let converted = T::from_sample(*value);
                        for channel_sample in frame.iter_mut() {
                            *channel_sample = converted;
                        }
                    }
                }

                synth.forward_notifications(|notification| {
                    if notification_tx.try_push(notification).is_err() {
                        warn!("Notification channel full, dropping message");
                    }
                });
            },
            move |err| {
                error!(%err, "Audio stream error");
            },
            None,
        )?;

        Ok(stream)
    }
}

