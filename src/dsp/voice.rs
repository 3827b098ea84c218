//! Voice — one sound-producing unit.
//!
//! A voice owns its oscillator, physical model, envelope, and delay line,
//! plus the per-voice performance state: gate, volume, pan, pitch glide,
//! detune, and the ring-mod/sync source indices that the engine resolves
//! against the pool each tick.

use super::delay::Delay;
use super::envelope::Envelope;
use super::lfo::ModAccumulator;
use super::oscillator::{Oscillator, Waveform};
use super::physical::PhysicalModel;

/// Full-scale volume changes ramp over this many seconds so a setter call
/// between blocks cannot click.
const VOLUME_RAMP_SECONDS: f64 = 0.005;

/// Result of one voice tick, before ring modulation and filtering.
#[derive(Debug, Clone, Copy)]
pub struct VoiceOutput {
    /// Post-envelope, post-volume sample.
    pub sample: f64,
    /// True when the oscillator phase wrapped on this tick.
    pub wrapped: bool,
    /// envelope × volume gain applied to `sample`; kept so hard sync can
    /// re-evaluate the waveform at phase zero under the same gain.
    pub gain: f64,
}

#[derive(Debug, Clone)]
pub struct Voice {
    pub oscillator: Oscillator,
    pub envelope: Envelope,
    pub physical: PhysicalModel,
    pub delay: Delay,

    /// Base duty cycle for `Pulse`; modulated copies land on the
    /// oscillator each tick.
    pub pulse_width: f64,
    /// Stereo position in [-1, 1], 0 = center.
    pub pan: f64,
    /// Send this voice through the shared filter bus.
    pub filter_routed: bool,
    /// Ring-modulation source voice, if any. Never this voice's own index.
    pub ring_mod_source: Option<usize>,
    /// Hard-sync source voice, if any. Never this voice's own index.
    pub sync_source: Option<usize>,
    /// Glide time between frequencies, seconds. 0 = instant.
    pub portamento_time: f64,
    pub detune_cents: f64,

    gate: bool,
    volume: f64,
    volume_target: f64,
    volume_step: f64,
    freq_current: f64,
    freq_target: f64,
    glide_ratio: f64,
    glide_remaining: usize,
    sample_rate: f64,
}

impl Voice {
    pub fn new(sample_rate: f64, index: usize) -> Self {
        // Seeds derive from the pool index so a re-created engine renders
        // identical noise.
        let seed = 0x9E37_79B9_7F4A_7C15_u64.wrapping_add(index as u64);
        Voice {
            oscillator: Oscillator::new(Waveform::Silence, sample_rate, seed),
            envelope: Envelope::new(sample_rate),
            physical: PhysicalModel::new(sample_rate, seed ^ 0x5DEE_CE66),
            delay: Delay::new(sample_rate),
            pulse_width: 0.5,
            pan: 0.0,
            filter_routed: false,
            ring_mod_source: None,
            sync_source: None,
            portamento_time: 0.0,
            detune_cents: 0.0,
            gate: false,
            volume: 1.0,
            volume_target: 1.0,
            volume_step: 1.0 / (VOLUME_RAMP_SECONDS * sample_rate),
            freq_current: 440.0,
            freq_target: 440.0,
            glide_ratio: 1.0,
            glide_remaining: 0,
            sample_rate,
        }
    }

    /// Set the target frequency. With portamento configured the pitch
    /// glides exponentially from the current value; otherwise it steps.
    pub fn set_frequency(&mut self, frequency: f64) {
        self.freq_target = frequency;
        let glide_samples = (self.portamento_time * self.sample_rate) as usize;
        if glide_samples > 0 && self.freq_current > 0.0 && self.freq_current != frequency {
            self.glide_ratio = (frequency / self.freq_current).powf(1.0 / glide_samples as f64);
            self.glide_remaining = glide_samples;
        } else {
            self.freq_current = frequency;
            self.glide_remaining = 0;
        }
    }

    pub fn frequency(&self) -> f64 {
        self.freq_current
    }

    /// Gate edge detection drives the envelope; a held gate is idempotent.
    pub fn set_gate(&mut self, on: bool) {
        if on && !self.gate {
            self.envelope.gate_on();
        } else if !on && self.gate {
            self.envelope.gate_off();
        }
        self.gate = on;
    }

    pub fn gate(&self) -> bool {
        self.gate
    }

    /// Volume setter; the audible level ramps to this over a short window.
    pub fn set_volume(&mut self, volume: f64) {
        self.volume_target = volume.clamp(0.0, 1.0);
    }

    pub fn volume(&self) -> f64 {
        self.volume_target
    }

    /// Generate this voice's raw (pre-ring-mod, pre-filter, pre-delay)
    /// sample for one tick under the given modulation.
    pub fn tick(&mut self, modulation: &ModAccumulator) -> VoiceOutput {
        if self.glide_remaining > 0 {
            self.freq_current *= self.glide_ratio;
            self.glide_remaining -= 1;
            if self.glide_remaining == 0 {
                self.freq_current = self.freq_target;
            }
        }

        // Smooth the volume toward its target.
        let diff = self.volume_target - self.volume;
        self.volume += diff.clamp(-self.volume_step, self.volume_step);

        let cents = self.detune_cents + modulation.pitch_cents;
        let frequency = self.freq_current * (cents / 1200.0).exp2();

        self.oscillator.pulse_width =
            (self.pulse_width + modulation.pulse_width).clamp(0.01, 0.99);

        let (raw, wrapped) = if self.oscillator.waveform == Waveform::Physical {
            (self.physical.tick(frequency), false)
        } else {
            let s = self.oscillator.tick(frequency);
            (s, self.oscillator.wrapped())
        };

        let env = self.envelope.next_sample();
        let gain = env * (self.volume + modulation.volume).clamp(0.0, 1.0);

        VoiceOutput {
            sample: raw * gain,
            wrapped,
            gain,
        }
    }

    /// Re-evaluate this tick's sample at phase zero after a hard-sync
    /// reset. Physical voices have no oscillator phase and return `None`
    /// (their sample stands).
    pub fn resync(&mut self, gain: f64) -> Option<f64> {
        if self.oscillator.waveform == Waveform::Physical {
            return None;
        }
        self.oscillator.sync_reset();
        Some(self.oscillator.value_at(0.0) * gain)
    }

    /// Restore every parameter to its default and silence the voice.
    pub fn reset(&mut self) {
        self.oscillator.waveform = Waveform::Silence;
        self.oscillator.reset();
        self.envelope = Envelope::new(self.sample_rate);
        self.physical.reset();
        self.delay.clear();
        self.delay.enabled = false;
        self.pulse_width = 0.5;
        self.pan = 0.0;
        self.filter_routed = false;
        self.ring_mod_source = None;
        self.sync_source = None;
        self.portamento_time = 0.0;
        self.detune_cents = 0.0;
        self.gate = false;
        self.volume = 1.0;
        self.volume_target = 1.0;
        self.freq_current = 440.0;
        self.freq_target = 440.0;
        self.glide_remaining = 0;
    }
}
