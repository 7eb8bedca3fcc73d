// Voice Pool - Live voices keyed by VoiceId
//
// Every voice is owned here until it is released, either by its scheduled
// end of life or early by a stop. Releasing removes the voice from the pool;
// releasing an unknown or already released id is a harmless no-op.

use std::collections::HashMap;

use super::effect::{EffectMode, TapeParams};
use super::filter::BASS_CUTOFF_HZ;
use super::voice::{Voice, VoiceId, VoiceParams};

pub const DEFAULT_MAX_VOICES: usize = 64;

/// Mix headroom divisor, keeps a handful of overlapping voices out of the clipper
const MIX_HEADROOM: f32 = 4.0;

/// One mixed sample, split into the dry path and the echo send
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct MixFrame {
    pub dry: f32,
    pub echo_send: f32,
}

/// Result of spawning a voice
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Spawned {
    pub id: VoiceId,
    /// Voice released to make room, if the pool was full
    pub stolen: Option<VoiceId>,
}

pub struct VoicePool {
    voices: HashMap<VoiceId, Voice>,
    max_voices: usize,
    next_id: u64,
    sample_rate: f32,
    bass_cutoff: f32,
}

impl VoicePool {
    pub fn new(max_voices: usize, sample_rate: f32) -> Self {
        let max_voices = max_voices.max(1);
        Self {
            voices: HashMap::with_capacity(max_voices),
            max_voices,
            next_id: 0,
            sample_rate,
            bass_cutoff: BASS_CUTOFF_HZ,
        }
    }

    /// Cutoff applied to bass voices created from now on
    pub fn with_bass_cutoff(mut self, cutoff: f32) -> Self {
        self.bass_cutoff = cutoff;
        self
    }

    /// Create and start a voice
    ///
    /// When the pool is full the oldest voice is released first.
    pub fn spawn(&mut self, params: VoiceParams, route: EffectMode, tape: TapeParams) -> Spawned {
        let stolen = if self.voices.len() >= self.max_voices {
            self.oldest().inspect(|&victim| {
                self.release(victim);
            })
        } else {
            None
        };

        let age = self.next_id;
        let id = VoiceId::new(age);
        self.next_id = self.next_id.wrapping_add(1);

        let voice = Voice::new(
            id,
            params,
            route,
            tape,
            self.bass_cutoff,
            self.sample_rate,
            age,
        );
        self.voices.insert(id, voice);

        Spawned { id, stolen }
    }

    fn oldest(&self) -> Option<VoiceId> {
        self.voices
            .values()
            .min_by_key(|voice| voice.age())
            .map(|voice| voice.id())
    }

    /// Release one voice
    ///
    /// Returns `true` if the voice was live, `false` if it was already gone.
    pub fn release(&mut self, id: VoiceId) -> bool {
        match self.voices.remove(&id) {
            Some(mut voice) => voice.release(),
            None => false,
        }
    }

    /// Release every voice in `ids`, returning the ones that were live
    pub fn release_many<'a>(&mut self, ids: impl IntoIterator<Item = &'a VoiceId>) -> Vec<VoiceId> {
        ids.into_iter()
            .copied()
            .filter(|&id| self.release(id))
            .collect()
    }

    /// Release everything
    pub fn release_all(&mut self) -> Vec<VoiceId> {
        let ids: Vec<VoiceId> = self.voices.keys().copied().collect();
        self.release_many(ids.iter())
    }

    pub fn contains(&self, id: VoiceId) -> bool {
        self.voices.contains_key(&id)
    }

    pub fn get(&self, id: VoiceId) -> Option<&Voice> {
        self.voices.get(&id)
    }

    pub fn len(&self) -> usize {
        self.voices.len()
    }

    pub fn is_empty(&self) -> bool {
        self.voices.is_empty()
    }

    pub fn max_voices(&self) -> usize {
        self.max_voices
    }

    /// Mix all voices for one sample
    #[inline]
    pub fn next_frame(&mut self) -> MixFrame {
        let mut frame = MixFrame::default();
        for voice in self.voices.values_mut() {
            let sample = voice.next_sample();
            frame.dry += sample;
            if voice.route() == EffectMode::Echo {
                frame.echo_send += sample;
            }
        }
        frame.dry /= MIX_HEADROOM;
        frame.echo_send /= MIX_HEADROOM;
        frame
    }
}
