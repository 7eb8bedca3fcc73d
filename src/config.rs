// Configuration - Engine settings loaded from RON
//
// Every field has a default, so a partial file only overrides what it names
// and a missing file yields the defaults.

use std::fs;
use std::path::{Path, PathBuf};

use ron::ser::PrettyConfig;
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::audio::analyser::DEFAULT_ANALYSER_SIZE;
use crate::audio::parameters::MIN_ATTACK;
use crate::sequencer::pattern::DEFAULT_PAD_DURATION;
use crate::sequencer::player::DEFAULT_PROGRESS_INTERVAL;
use crate::synth::effect::{EchoParams, TapeParams};
use crate::synth::filter::BASS_CUTOFF_HZ;
use crate::synth::voice_manager::DEFAULT_MAX_VOICES;

const CONFIG_DIR: &str = "birdsynth";
const CONFIG_FILE: &str = "config.ron";

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("RON parse error: {0}")]
    Parse(#[from] ron::error::SpannedError),

    #[error("RON serialization error: {0}")]
    Serialize(#[from] ron::Error),

    #[error("Invalid configuration: {0}")]
    Invalid(String),
}

/// Slider defaults
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ControlDefaults {
    /// Attack in seconds
    pub attack: f64,
    /// Release in seconds
    pub release: f64,
    /// Master volume (0..1)
    pub volume: f32,
}

impl Default for ControlDefaults {
    fn default() -> Self {
        Self {
            attack: 0.05,
            release: 0.3,
            volume: 0.5,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SynthConfig {
    /// Engine sample rate when rendering offline (the audio host uses the device rate)
    pub sample_rate: f32,
    /// Seconds between playback progress samples
    pub progress_interval: f64,
    /// Length of a captured beat-pad hit in seconds
    pub pad_duration: f64,
    pub max_voices: usize,
    /// Samples kept by the waveform analyser
    pub analyser_size: usize,
    /// Low-pass cutoff for bass presets (Hz)
    pub bass_cutoff: f32,
    pub controls: ControlDefaults,
    pub echo: EchoParams,
    pub tape: TapeParams,
}

impl Default for SynthConfig {
    fn default() -> Self {
        Self {
            sample_rate: 44100.0,
            progress_interval: DEFAULT_PROGRESS_INTERVAL,
            pad_duration: DEFAULT_PAD_DURATION,
            max_voices: DEFAULT_MAX_VOICES,
            analyser_size: DEFAULT_ANALYSER_SIZE,
            bass_cutoff: BASS_CUTOFF_HZ,
            controls: ControlDefaults::default(),
            echo: EchoParams::default(),
            tape: TapeParams::default(),
        }
    }
}

impl SynthConfig {
    /// `<config dir>/birdsynth/config.ron`
    pub fn default_path() -> Option<PathBuf> {
        dirs::config_dir().map(|dir| dir.join(CONFIG_DIR).join(CONFIG_FILE))
    }

    /// Parse and validate a RON document
    pub fn from_ron(text: &str) -> Result<Self, ConfigError> {
        let config: SynthConfig = ron::from_str(text)?;
        config.validate()?;
        Ok(config)
    }

    pub fn to_ron(&self) -> Result<String, ConfigError> {
        Ok(ron::ser::to_string_pretty(self, PrettyConfig::default())?)
    }

    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        let text = fs::read_to_string(path)?;
        Self::from_ron(&text)
    }

    /// Load `path`, falling back to defaults when the file does not exist
    pub fn load_or_default(path: &Path) -> Result<Self, ConfigError> {
        if !path.exists() {
            return Ok(Self::default());
        }
        Self::load(path)
    }

    /// Write as pretty RON, creating parent directories
    pub fn save(&self, path: &Path) -> Result<(), ConfigError> {
        self.validate()?;
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent)?;
        }
        fs::write(path, self.to_ron()?)?;
        Ok(())
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        fn positive(name: &str, value: f64) -> Result<(), ConfigError> {
            if value.is_finite() && value > 0.0 {
                Ok(())
            } else {
                Err(ConfigError::Invalid(format!("{name} must be > 0, got {value}")))
            }
        }

        positive("sample_rate", self.sample_rate as f64)?;
        positive("progress_interval", self.progress_interval)?;
        positive("pad_duration", self.pad_duration)?;
        positive("bass_cutoff", self.bass_cutoff as f64)?;
        if self.max_voices == 0 {
            return Err(ConfigError::Invalid("max_voices must be at least 1".into()));
        }
        if self.analyser_size == 0 {
            return Err(ConfigError::Invalid("analyser_size must be at least 1".into()));
        }

        let controls = &self.controls;
        if !(controls.attack.is_finite() && controls.attack >= MIN_ATTACK) {
            return Err(ConfigError::Invalid(format!(
                "controls.attack must be >= {MIN_ATTACK}, got {}",
                controls.attack
            )));
        }
        if !(controls.release.is_finite() && controls.release >= 0.0) {
            return Err(ConfigError::Invalid(format!(
                "controls.release must be >= 0, got {}",
                controls.release
            )));
        }
        if !(0.0..=1.0).contains(&controls.volume) {
            return Err(ConfigError::Invalid(format!(
                "controls.volume must be in 0..=1, got {}",
                controls.volume
            )));
        }

        if !(0.0..1.0).contains(&self.echo.feedback) {
            return Err(ConfigError::Invalid(format!(
                "echo.feedback must be in 0..1, got {}",
                self.echo.feedback
            )));
        }
        if !(self.echo.delay.is_finite() && self.echo.delay >= 0.0) {
            return Err(ConfigError::Invalid(format!(
                "echo.delay must be >= 0, got {}",
                self.echo.delay
            )));
        }
        Ok(())
    }
}
