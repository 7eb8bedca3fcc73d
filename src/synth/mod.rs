// Synth module - Tone presets, DSP building blocks and voices

pub mod catalog;
pub mod delay;
pub mod effect;
pub mod envelope;
pub mod filter;
pub mod lfo;
pub mod oscillator;
pub mod voice;
pub mod voice_manager;

pub use catalog::{ToneCatalog, ToneCategory, ToneSpec};
pub use effect::{EchoParams, EffectBus, EffectMode, TapeParams};
pub use envelope::EnvelopeParams;
pub use voice::{Voice, VoiceId, VoiceParams};
pub use voice_manager::VoicePool;
