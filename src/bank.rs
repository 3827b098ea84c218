//! Sound bank — id-addressable rendered audio assets.
//!
//! Ids are minted monotonically and never reused, so a stale id held by a
//! script can never silently resolve to a different sound. Entries are
//! `Arc`-shared value objects: playback holds a clone, so deleting an entry
//! mid-playback is safe.

use std::collections::HashMap;
use std::sync::Arc;

use serde::{Deserialize, Serialize};

/// Handle for a bank entry. 0 is never assigned.
pub type SoundId = u32;

/// Where an asset came from; kept for diagnostics and tooling.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SoundSource {
    Beep,
    Blip,
    Click,
    Zap,
    Explode,
    Pickup,
    Hurt,
    SweepDown,
    Coin,
    Powerup,
    Tone,
    /// A whole recorded timeline session.
    Session,
    /// One rendered timeline slot.
    Slot(u32),
}

/// A rendered audio asset.
///
/// `samples` are interleaved frames; `channels` is 1 or 2.
#[derive(Debug, Clone)]
pub struct SoundAsset {
    pub samples: Vec<f32>,
    pub channels: u16,
    pub sample_rate: u32,
    pub source: SoundSource,
}

impl SoundAsset {
    pub fn mono(samples: Vec<f32>, sample_rate: u32, source: SoundSource) -> Self {
        SoundAsset {
            samples,
            channels: 1,
            sample_rate,
            source,
        }
    }

    pub fn stereo(left: &[f32], right: &[f32], sample_rate: u32, source: SoundSource) -> Self {
        let frames = left.len().min(right.len());
        let mut samples = Vec::with_capacity(frames * 2);
        for i in 0..frames {
            samples.push(left[i]);
            samples.push(right[i]);
        }
        SoundAsset {
            samples,
            channels: 2,
            sample_rate,
            source,
        }
    }

    /// Length in frames (samples per channel).
    pub fn frames(&self) -> usize {
        self.samples.len() / self.channels as usize
    }

    /// Frame at `index` as a stereo pair (mono duplicates).
    #[inline]
    pub fn frame(&self, index: usize) -> (f32, f32) {
        match self.channels {
            1 => {
                let s = self.samples[index];
                (s, s)
            }
            _ => (self.samples[index * 2], self.samples[index * 2 + 1]),
        }
    }
}

/// The store of loaded sounds.
#[derive(Debug)]
pub struct SoundBank {
    entries: HashMap<SoundId, Arc<SoundAsset>>,
    next_id: SoundId,
}

impl Default for SoundBank {
    fn default() -> Self {
        Self::new()
    }
}

impl SoundBank {
    pub fn new() -> Self {
        SoundBank {
            entries: HashMap::new(),
            next_id: 1,
        }
    }

    /// Register an asset and mint its id.
    pub fn insert(&mut self, asset: SoundAsset) -> SoundId {
        let id = self.next_id;
        self.next_id += 1;
        self.entries.insert(id, Arc::new(asset));
        id
    }

    pub fn get(&self, id: SoundId) -> Option<Arc<SoundAsset>> {
        self.entries.get(&id).cloned()
    }

    pub fn exists(&self, id: SoundId) -> bool {
        self.entries.contains_key(&id)
    }

    /// Unload an entry. Returns false for unknown ids. The id is retired
    /// permanently; in-flight playback keeps its own reference.
    pub fn remove(&mut self, id: SoundId) -> bool {
        self.entries.remove(&id).is_some()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn asset() -> SoundAsset {
        SoundAsset::mono(vec![0.0, 0.5, -0.5], 44100, SoundSource::Beep)
    }

    #[test]
    fn ids_are_monotonic_and_start_at_one() {
        let mut bank = SoundBank::new();
        let a = bank.insert(asset());
        let b = bank.insert(asset());
        assert_eq!(a, 1);
        assert_eq!(b, 2);
    }

    #[test]
    fn deleted_ids_are_never_reused() {
        let mut bank = SoundBank::new();
        let a = bank.insert(asset());
        assert!(bank.remove(a));
        let b = bank.insert(asset());
        assert_ne!(a, b);
        assert!(!bank.exists(a));
        assert!(bank.exists(b));
    }

    #[test]
    fn remove_unknown_is_false() {
        let mut bank = SoundBank::new();
        assert!(!bank.remove(99));
        assert!(!bank.exists(0));
    }

    #[test]
    fn playback_reference_outlives_deletion() {
        let mut bank = SoundBank::new();
        let id = bank.insert(asset());
        let held = bank.get(id).unwrap();
        bank.remove(id);
        // The Arc keeps the samples alive for whoever is still playing.
        assert_eq!(held.frames(), 3);
        assert_eq!(held.frame(1), (0.5, 0.5));
    }

    #[test]
    fn stereo_interleaving() {
        let a = SoundAsset::stereo(&[0.1, 0.2], &[0.3, 0.4], 44100, SoundSource::Session);
        assert_eq!(a.frames(), 2);
        assert_eq!(a.frame(0), (0.1, 0.3));
        assert_eq!(a.frame(1), (0.2, 0.4));
    }
}
