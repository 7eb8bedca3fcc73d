// Voice - One sounding note
//
// FM carrier through a linear attack/release envelope. Bass voices add the
// fixed low-pass between carrier and envelope gain. The effect route is
// fixed at creation.

use super::catalog::{ToneCategory, ToneSpec};
use super::effect::{EffectMode, TapeParams};
use super::envelope::{AttackReleaseEnvelope, EnvelopeParams};
use super::filter::{BASS_RESONANCE, LowPassFilter};
use super::lfo::Lfo;
use super::oscillator::{FmOscillator, WaveformType};

/// Identifier of a live voice, unique for the lifetime of an engine
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct VoiceId(u64);

impl VoiceId {
    pub fn new(raw: u64) -> Self {
        Self(raw)
    }

    pub fn raw(&self) -> u64 {
        self.0
    }
}

/// Everything needed to sound a note
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct VoiceParams {
    pub tone: &'static str,
    pub category: ToneCategory,
    pub waveform: WaveformType,
    pub frequency: f32,
    pub modulation_frequency: f32,
    pub modulation_depth: f32,
    pub envelope: EnvelopeParams,
}

impl VoiceParams {
    /// Parameters of a catalog preset with the given envelope
    pub fn from_tone(tone: &'static ToneSpec, envelope: EnvelopeParams) -> Self {
        Self {
            tone: tone.id,
            category: tone.category,
            waveform: tone.waveform,
            frequency: tone.base_frequency,
            modulation_frequency: tone.modulation_frequency,
            modulation_depth: tone.modulation_depth,
            envelope,
        }
    }

    pub fn requires_lowpass(&self) -> bool {
        self.category == ToneCategory::Bass
    }

    /// Seconds from trigger to silence
    pub fn lifetime(&self) -> f64 {
        self.envelope.lifetime()
    }
}

/// Slow pitch/amplitude wobble of a tape-routed voice
struct TapeWobble {
    lfo: Lfo,
    wow_depth: f32,
    flutter_depth: f32,
}

impl TapeWobble {
    fn new(params: TapeParams, sample_rate: f32) -> Self {
        Self {
            lfo: Lfo::new(params.lfo_params(), sample_rate),
            wow_depth: params.wow_depth,
            flutter_depth: params.flutter_depth,
        }
    }

    /// Returns (pitch factor, amplitude factor)
    #[inline]
    fn next(&mut self) -> (f32, f32) {
        let wobble = self.lfo.process();
        (
            1.0 + wobble * self.wow_depth,
            1.0 - self.flutter_depth * 0.5 * (1.0 - wobble),
        )
    }
}

pub struct Voice {
    id: VoiceId,
    params: VoiceParams,
    route: EffectMode,
    oscillator: FmOscillator,
    envelope: AttackReleaseEnvelope,
    lowpass: Option<LowPassFilter>,
    tape: Option<TapeWobble>,
    released: bool,
    /// Creation order, used for stealing (lower = older)
    age: u64,
}

impl Voice {
    pub fn new(
        id: VoiceId,
        params: VoiceParams,
        route: EffectMode,
        tape: TapeParams,
        bass_cutoff: f32,
        sample_rate: f32,
        age: u64,
    ) -> Self {
        let oscillator = FmOscillator::new(
            params.waveform,
            params.frequency,
            params.modulation_frequency,
            params.modulation_depth,
            sample_rate,
        );

        let mut envelope = AttackReleaseEnvelope::new(params.envelope, sample_rate);
        envelope.note_on();

        let lowpass = params
            .requires_lowpass()
            .then(|| LowPassFilter::new(bass_cutoff, BASS_RESONANCE, sample_rate));
        let tape = (route == EffectMode::Tape).then(|| TapeWobble::new(tape, sample_rate));

        Self {
            id,
            params,
            route,
            oscillator,
            envelope,
            lowpass,
            tape,
            released: false,
            age,
        }
    }

    pub fn id(&self) -> VoiceId {
        self.id
    }

    pub fn params(&self) -> &VoiceParams {
        &self.params
    }

    pub fn route(&self) -> EffectMode {
        self.route
    }

    pub fn age(&self) -> u64 {
        self.age
    }

    pub fn has_lowpass(&self) -> bool {
        self.lowpass.is_some()
    }

    /// Stop the voice
    ///
    /// Returns `true` the first time, `false` on every later call.
    pub fn release(&mut self) -> bool {
        if self.released {
            return false;
        }
        self.released = true;
        self.envelope.stop();
        true
    }

    pub fn is_released(&self) -> bool {
        self.released
    }

    /// Still producing sound
    pub fn is_active(&self) -> bool {
        !self.released && self.envelope.is_active()
    }

    #[inline]
    pub fn next_sample(&mut self) -> f32 {
        if self.released {
            return 0.0;
        }

        let envelope_value = self.envelope.process();
        let (pitch, amplitude) = match self.tape.as_mut() {
            Some(wobble) => wobble.next(),
            None => (1.0, 1.0),
        };

        let mut sample = self.oscillator.next_sample_with_pitch(pitch);
        if let Some(filter) = self.lowpass.as_mut() {
            sample = filter.process(sample);
        }

        sample * envelope_value * amplitude
    }
}
