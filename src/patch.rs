//! Voice patches — serializable parameter snapshots.
//!
//! A patch captures everything that defines a voice's sound (but not its
//! transient performance state: gate, envelope position, delay-line
//! contents). Patches round-trip through JSON so hosts can ship sound
//! presets as data.

use serde::{Deserialize, Serialize};

use crate::dsp::oscillator::Waveform;
use crate::dsp::physical::ModelType;
use crate::dsp::voice::Voice;
use crate::error::AudioError;

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct PhysicalPatch {
    pub model: ModelType,
    pub damping: f64,
    pub brightness: f64,
    pub excitation: f64,
    pub resonance: f64,
    pub tension: f64,
    pub pressure: f64,
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct DelayPatch {
    pub enabled: bool,
    pub time: f64,
    pub feedback: f64,
    pub mix: f64,
}

/// Complete sound-defining parameter set for one voice.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct VoicePatch {
    pub waveform: Waveform,
    pub frequency: f64,
    pub pulse_width: f64,
    pub attack: f64,
    pub decay: f64,
    pub sustain: f64,
    pub release: f64,
    pub volume: f64,
    pub pan: f64,
    pub filter_routed: bool,
    pub portamento: f64,
    pub detune_cents: f64,
    pub physical: PhysicalPatch,
    pub delay: DelayPatch,
}

impl VoicePatch {
    /// Snapshot a voice's current parameters.
    pub fn from_voice(voice: &Voice) -> Self {
        VoicePatch {
            waveform: voice.oscillator.waveform,
            frequency: voice.frequency(),
            pulse_width: voice.pulse_width,
            attack: voice.envelope.attack,
            decay: voice.envelope.decay,
            sustain: voice.envelope.sustain,
            release: voice.envelope.release,
            volume: voice.volume(),
            pan: voice.pan,
            filter_routed: voice.filter_routed,
            portamento: voice.portamento_time,
            detune_cents: voice.detune_cents,
            physical: PhysicalPatch {
                model: voice.physical.model,
                damping: voice.physical.damping,
                brightness: voice.physical.brightness,
                excitation: voice.physical.excitation,
                resonance: voice.physical.resonance,
                tension: voice.physical.tension,
                pressure: voice.physical.pressure,
            },
            delay: DelayPatch {
                enabled: voice.delay.enabled,
                time: voice.delay.time(),
                feedback: voice.delay.feedback,
                mix: voice.delay.mix,
            },
        }
    }

    /// Apply this patch onto a voice. Gate and running envelope state are
    /// untouched; the new frequency engages portamento like any setter.
    pub fn apply_to(&self, voice: &mut Voice) {
        voice.oscillator.waveform = self.waveform;
        voice.pulse_width = self.pulse_width.clamp(0.01, 0.99);
        voice.envelope.set_adsr(self.attack, self.decay, self.sustain, self.release);
        voice.set_volume(self.volume);
        voice.pan = self.pan.clamp(-1.0, 1.0);
        voice.filter_routed = self.filter_routed;
        voice.portamento_time = self.portamento.max(0.0);
        voice.detune_cents = self.detune_cents;
        if self.frequency > 0.0 && self.frequency.is_finite() {
            voice.set_frequency(self.frequency);
        }
        voice.physical.model = self.physical.model;
        voice.physical.damping = self.physical.damping.clamp(0.0, 1.0);
        voice.physical.brightness = self.physical.brightness.clamp(0.0, 1.0);
        voice.physical.excitation = self.physical.excitation.clamp(0.0, 1.0);
        voice.physical.resonance = self.physical.resonance.clamp(0.0, 1.0);
        voice.physical.tension = self.physical.tension.clamp(0.0, 1.0);
        voice.physical.pressure = self.physical.pressure.clamp(0.0, 1.0);
        voice.delay.enabled = self.delay.enabled;
        voice.delay.set_time(self.delay.time);
        voice.delay.feedback = self.delay.feedback.clamp(0.0, 0.99);
        voice.delay.mix = self.delay.mix.clamp(0.0, 1.0);
    }

    pub fn to_json(&self) -> Result<String, AudioError> {
        serde_json::to_string_pretty(self).map_err(|e| AudioError::Io(e.to_string()))
    }

    pub fn from_json(json: &str) -> Result<Self, AudioError> {
        serde_json::from_str(json).map_err(|e| AudioError::Io(e.to_string()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn capture_apply_round_trip() {
        let mut original = Voice::new(44100.0, 0);
        original.oscillator.waveform = Waveform::Pulse;
        original.pulse_width = 0.3;
        original.set_frequency(523.25);
        original.envelope.set_adsr(0.02, 0.15, 0.6, 0.4);
        original.set_volume(0.7);
        original.pan = -0.4;
        original.filter_routed = true;
        original.detune_cents = 12.0;
        original.physical.model = ModelType::Wind;
        original.physical.pressure = 0.5;
        original.delay.enabled = true;
        original.delay.set_time(0.375);

        let patch = VoicePatch::from_voice(&original);
        let mut copy = Voice::new(44100.0, 1);
        patch.apply_to(&mut copy);

        assert_eq!(VoicePatch::from_voice(&copy), patch);
    }

    #[test]
    fn json_round_trip() {
        let voice = Voice::new(44100.0, 0);
        let patch = VoicePatch::from_voice(&voice);
        let json = patch.to_json().unwrap();
        let back = VoicePatch::from_json(&json).unwrap();
        assert_eq!(back, patch);
    }

    #[test]
    fn apply_clamps_out_of_range_values() {
        let mut patch = VoicePatch::from_voice(&Voice::new(44100.0, 0));
        patch.pan = 5.0;
        patch.pulse_width = 2.0;
        patch.delay.feedback = 1.5;
        let mut voice = Voice::new(44100.0, 0);
        patch.apply_to(&mut voice);
        assert_eq!(voice.pan, 1.0);
        assert_eq!(voice.pulse_width, 0.99);
        assert_eq!(voice.delay.feedback, 0.99);
    }

    #[test]
    fn malformed_json_is_error() {
        assert!(VoicePatch::from_json("{not json").is_err());
    }
}
