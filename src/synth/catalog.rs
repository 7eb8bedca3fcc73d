// Tone Catalog - Static registry of the bird and bass presets
//
// Pure lookup table, no mutable state. Bass presets are flagged so the
// voice inserts its fixed low-pass stage.

use serde::{Deserialize, Serialize};

use super::oscillator::WaveformType;
use crate::error::SynthError;

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ToneCategory {
    /// Tonal bird call
    Bird,
    /// Percussive bass, low-passed
    Bass,
}

/// Immutable catalog entry
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct ToneSpec {
    pub id: &'static str,
    pub category: ToneCategory,
    /// Carrier frequency in Hz
    pub base_frequency: f32,
    /// Modulator rate in Hz
    pub modulation_frequency: f32,
    /// Peak carrier deviation in Hz
    pub modulation_depth: f32,
    pub waveform: WaveformType,
}

impl ToneSpec {
    const fn bird(id: &'static str, base: f32, rate: f32, depth: f32) -> Self {
        Self {
            id,
            category: ToneCategory::Bird,
            base_frequency: base,
            modulation_frequency: rate,
            modulation_depth: depth,
            waveform: WaveformType::Sine,
        }
    }

    const fn bass(id: &'static str, base: f32, rate: f32, depth: f32) -> Self {
        Self {
            id,
            category: ToneCategory::Bass,
            base_frequency: base,
            modulation_frequency: rate,
            modulation_depth: depth,
            waveform: WaveformType::Saw,
        }
    }

    /// True when the voice must run the carrier through the bass low-pass
    pub fn requires_lowpass(&self) -> bool {
        self.category == ToneCategory::Bass
    }
}

static TONES: [ToneSpec; 12] = [
    ToneSpec::bird("chirp", 800.0, 10.0, 50.0),
    ToneSpec::bird("whistle", 1200.0, 5.0, 30.0),
    ToneSpec::bird("trill", 1000.0, 20.0, 70.0),
    ToneSpec::bird("tweet", 1500.0, 15.0, 40.0),
    ToneSpec::bird("warble", 900.0, 8.0, 60.0),
    ToneSpec::bird("peep", 2000.0, 12.0, 35.0),
    ToneSpec::bird("coo", 600.0, 3.0, 25.0),
    ToneSpec::bird("squawk", 700.0, 25.0, 80.0),
    ToneSpec::bass("bass", 100.0, 2.0, 20.0),
    ToneSpec::bass("heavyBass", 80.0, 1.0, 30.0),
    ToneSpec::bass("subBass", 60.0, 0.5, 40.0),
    ToneSpec::bass("growl", 120.0, 4.0, 50.0),
];

/// Default beat-pad layout: top rows are birds, bottom row is bass
static PAD_KEYS: [(char, &str); 12] = [
    ('q', "chirp"),
    ('w', "whistle"),
    ('e', "trill"),
    ('r', "tweet"),
    ('a', "warble"),
    ('s', "peep"),
    ('d', "coo"),
    ('f', "squawk"),
    ('z', "bass"),
    ('x', "heavyBass"),
    ('c', "subBass"),
    ('v', "growl"),
];

/// Lookup facade over the static preset table
#[derive(Clone, Copy, Debug, Default)]
pub struct ToneCatalog;

impl ToneCatalog {
    pub fn new() -> Self {
        Self
    }

    /// Find a preset by identifier
    pub fn resolve(&self, id: &str) -> Result<&'static ToneSpec, SynthError> {
        TONES
            .iter()
            .find(|tone| tone.id == id)
            .ok_or_else(|| SynthError::UnknownTone(id.to_string()))
    }

    /// Modulation rate used when an edited event switches tone
    pub fn modulation_frequency_for(&self, id: &str) -> Result<f32, SynthError> {
        self.resolve(id).map(|tone| tone.modulation_frequency)
    }

    pub fn iter(&self) -> impl Iterator<Item = &'static ToneSpec> {
        TONES.iter()
    }

    pub fn birds(&self) -> impl Iterator<Item = &'static ToneSpec> {
        self.by_category(ToneCategory::Bird)
    }

    pub fn basses(&self) -> impl Iterator<Item = &'static ToneSpec> {
        self.by_category(ToneCategory::Bass)
    }

    fn by_category(&self, category: ToneCategory) -> impl Iterator<Item = &'static ToneSpec> {
        TONES.iter().filter(move |tone| tone.category == category)
    }

    /// Preset bound to a beat-pad key (case-insensitive)
    pub fn pad_for_key(&self, key: char) -> Option<&'static ToneSpec> {
        let key = key.to_ascii_lowercase();
        PAD_KEYS
            .iter()
            .find(|(pad_key, _)| *pad_key == key)
            .and_then(|(_, id)| self.resolve(id).ok())
    }

    pub fn len(&self) -> usize {
        TONES.len()
    }

    pub fn is_empty(&self) -> bool {
        TONES.is_empty()
    }
}
