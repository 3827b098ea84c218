//! chipvoice — a multi-voice synthesis engine with a timeline recorder and
//! an id-addressable sound bank.
//!
//! The [`AudioSystem`] is the front door: a fixed pool of voices (chip
//! oscillators, ADSR envelopes, a shared filter bus, Karplus-Strong
//! physical models, ring modulation and hard sync, per-voice delays), ten
//! procedural sound-effect generators, and a slot-based timeline that
//! records performances into playable, savable assets.
//!
//! ```
//! use chipvoice::{AudioSystem, Waveform};
//!
//! let mut audio = AudioSystem::new(44100.0);
//! audio.set_waveform(0, Waveform::Saw);
//! audio.set_note_name(0, "A4");
//! audio.set_gate(0, true);
//!
//! let mut left = [0.0f32; 512];
//! let mut right = [0.0f32; 512];
//! audio.render(&mut left, &mut right);
//! assert!(left.iter().any(|&s| s != 0.0));
//! ```

pub mod bank;
pub mod dsp;
pub mod error;
pub mod patch;
pub mod sfx;
pub mod system;
pub mod timeline;

pub use bank::{SoundAsset, SoundBank, SoundId, SoundSource};
pub use dsp::engine::{LFO_COUNT, VOICE_COUNT, VoiceEngine};
pub use dsp::filter::FilterType;
pub use dsp::lfo::{LfoWaveform, ModTarget};
pub use dsp::oscillator::Waveform;
pub use dsp::physical::ModelType;
pub use error::AudioError;
pub use patch::VoicePatch;
pub use system::AudioSystem;

/// The crate version, read from Cargo.toml at compile time.
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
