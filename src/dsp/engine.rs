//! Voice engine — the fixed voice/LFO pools and the block render loop.
//!
//! Rendering is a two-pass-per-tick pipeline: pass one generates every
//! voice's raw post-envelope sample and records oscillator wraps; pass two
//! applies hard sync and ring modulation against those results, then runs
//! the shared filter, the per-voice delay, and panning into the stereo
//! mixer. Live output, slot rendering, and playback all pull from this one
//! path, so offline renders match live output exactly.

use tracing::debug;

use crate::error::AudioError;

use super::filter::FilterBus;
use super::lfo::{Lfo, LfoRoute, ModAccumulator, ModTarget};
use super::mixer::StereoMixer;
use super::oscillator::Waveform;
use super::voice::{Voice, VoiceOutput};

/// Size of the voice pool. Indices 0..VOICE_COUNT are the only valid ones.
pub const VOICE_COUNT: usize = 16;
/// Size of the LFO pool.
pub const LFO_COUNT: usize = 4;

/// Parse a note name (e.g. "C4", "F#3", "Bb5") into a MIDI note number.
pub fn note_to_midi(note: &str) -> Option<i32> {
    let bytes = note.as_bytes();
    if bytes.is_empty() {
        return None;
    }

    let base_semitone = match bytes[0] as char {
        'C' => 0,
        'D' => 2,
        'E' => 4,
        'F' => 5,
        'G' => 7,
        'A' => 9,
        'B' => 11,
        _ => return None,
    };

    let mut idx = 1;
    let mut semitone = base_semitone;
    if idx < bytes.len() {
        match bytes[idx] as char {
            '#' => {
                semitone += 1;
                idx += 1;
            }
            'b' => {
                semitone -= 1;
                idx += 1;
            }
            _ => {}
        }
    }

    let octave: i32 = note[idx..].parse().ok()?;

    // MIDI note number: C4 = 60, A4 = 69.
    Some((octave + 1) * 12 + semitone)
}

/// Convert a MIDI note number to frequency (12-TET, A4 = 69 = 440 Hz).
pub fn midi_to_frequency(midi: i32) -> f64 {
    440.0 * ((midi as f64 - 69.0) / 12.0).exp2()
}

/// Note-name to frequency, combining the two conversions above.
pub fn note_to_frequency(note: &str) -> Option<f64> {
    note_to_midi(note).map(midi_to_frequency)
}

/// Master volume steps ramp over this window.
const MASTER_RAMP_SECONDS: f64 = 0.005;

/// The multi-voice synthesis engine.
pub struct VoiceEngine {
    pub sample_rate: f64,
    voices: Vec<Voice>,
    lfos: Vec<Lfo>,
    routes: Vec<LfoRoute>,
    /// The single shared filter stage voices opt into.
    pub filter: FilterBus,

    master: f64,
    master_target: f64,
    master_step: f64,
    mixer: StereoMixer,
    master_scratch: Vec<f64>,
}

impl VoiceEngine {
    pub fn new(sample_rate: f64) -> Self {
        VoiceEngine {
            sample_rate,
            voices: (0..VOICE_COUNT).map(|i| Voice::new(sample_rate, i)).collect(),
            lfos: (0..LFO_COUNT).map(|_| Lfo::new(sample_rate)).collect(),
            routes: Vec::new(),
            filter: FilterBus::new(sample_rate),
            master: 1.0,
            master_target: 1.0,
            master_step: 1.0 / (MASTER_RAMP_SECONDS * sample_rate),
            mixer: StereoMixer::new(),
            master_scratch: Vec::new(),
        }
    }

    fn voice_mut(&mut self, index: usize) -> Result<&mut Voice, AudioError> {
        self.voices.get_mut(index).ok_or(AudioError::InvalidVoice(index))
    }

    /// Read-only view of a voice, used for state inspection.
    pub fn voice(&self, index: usize) -> Option<&Voice> {
        self.voices.get(index)
    }

    /// Run a closure against a voice after index validation. Bulk
    /// parameter application (patches) goes through here.
    pub fn with_voice<R>(
        &mut self,
        index: usize,
        f: impl FnOnce(&mut Voice) -> R,
    ) -> Result<R, AudioError> {
        self.voice_mut(index).map(f)
    }

    fn lfo_mut(&mut self, index: usize) -> Result<&mut Lfo, AudioError> {
        self.lfos.get_mut(index).ok_or(AudioError::InvalidLfo(index))
    }

    // ── per-voice setters ──────────────────────────────────────────────

    pub fn set_waveform(&mut self, voice: usize, waveform: Waveform) -> Result<(), AudioError> {
        self.voice_mut(voice)?.oscillator.waveform = waveform;
        Ok(())
    }

    pub fn set_frequency(&mut self, voice: usize, hz: f64) -> Result<(), AudioError> {
        if !(hz > 0.0) || !hz.is_finite() {
            return Err(AudioError::BadParameter(format!("frequency {hz} Hz")));
        }
        self.voice_mut(voice)?.set_frequency(hz);
        Ok(())
    }

    pub fn set_note(&mut self, voice: usize, midi: i32) -> Result<(), AudioError> {
        if !(0..=127).contains(&midi) {
            return Err(AudioError::BadParameter(format!("MIDI note {midi}")));
        }
        self.voice_mut(voice)?.set_frequency(midi_to_frequency(midi));
        Ok(())
    }

    pub fn set_note_name(&mut self, voice: usize, name: &str) -> Result<(), AudioError> {
        let hz = note_to_frequency(name)
            .ok_or_else(|| AudioError::BadNoteName(name.to_string()))?;
        self.voice_mut(voice)?.set_frequency(hz);
        Ok(())
    }

    pub fn set_envelope(
        &mut self,
        voice: usize,
        attack: f64,
        decay: f64,
        sustain: f64,
        release: f64,
    ) -> Result<(), AudioError> {
        self.voice_mut(voice)?
            .envelope
            .set_adsr(attack, decay, sustain, release);
        Ok(())
    }

    pub fn set_gate(&mut self, voice: usize, on: bool) -> Result<(), AudioError> {
        self.voice_mut(voice)?.set_gate(on);
        debug!(voice, on, "gate");
        Ok(())
    }

    pub fn set_volume(&mut self, voice: usize, volume: f64) -> Result<(), AudioError> {
        self.voice_mut(voice)?.set_volume(volume);
        Ok(())
    }

    pub fn set_pulse_width(&mut self, voice: usize, width: f64) -> Result<(), AudioError> {
        self.voice_mut(voice)?.pulse_width = width.clamp(0.01, 0.99);
        Ok(())
    }

    pub fn set_pan(&mut self, voice: usize, pan: f64) -> Result<(), AudioError> {
        self.voice_mut(voice)?.pan = pan.clamp(-1.0, 1.0);
        Ok(())
    }

    pub fn set_filter_routing(&mut self, voice: usize, routed: bool) -> Result<(), AudioError> {
        self.voice_mut(voice)?.filter_routed = routed;
        Ok(())
    }

    pub fn set_portamento(&mut self, voice: usize, seconds: f64) -> Result<(), AudioError> {
        if seconds < 0.0 {
            return Err(AudioError::BadParameter(format!("portamento {seconds} s")));
        }
        self.voice_mut(voice)?.portamento_time = seconds;
        Ok(())
    }

    pub fn set_detune(&mut self, voice: usize, cents: f64) -> Result<(), AudioError> {
        self.voice_mut(voice)?.detune_cents = cents;
        Ok(())
    }

    /// Bind a ring-modulation source. `None` clears the binding; a voice
    /// can never be its own source.
    pub fn set_ring_mod(&mut self, voice: usize, source: Option<usize>) -> Result<(), AudioError> {
        self.set_mod_source(voice, source, true)
    }

    /// Bind a hard-sync source, same rules as ring modulation.
    pub fn set_sync(&mut self, voice: usize, source: Option<usize>) -> Result<(), AudioError> {
        self.set_mod_source(voice, source, false)
    }

    fn set_mod_source(
        &mut self,
        voice: usize,
        source: Option<usize>,
        ring: bool,
    ) -> Result<(), AudioError> {
        if let Some(src) = source {
            if src == voice {
                return Err(AudioError::SelfReference(voice));
            }
            if src >= VOICE_COUNT {
                return Err(AudioError::InvalidVoice(src));
            }
        }
        let v = self.voice_mut(voice)?;
        if ring {
            v.ring_mod_source = source;
        } else {
            v.sync_source = source;
        }
        Ok(())
    }

    // ── physical model ─────────────────────────────────────────────────

    pub fn set_physical_model(
        &mut self,
        voice: usize,
        model: super::physical::ModelType,
    ) -> Result<(), AudioError> {
        self.voice_mut(voice)?.physical.model = model;
        Ok(())
    }

    pub fn set_physical_damping(&mut self, voice: usize, value: f64) -> Result<(), AudioError> {
        self.voice_mut(voice)?.physical.damping = value.clamp(0.0, 1.0);
        Ok(())
    }

    pub fn set_physical_brightness(&mut self, voice: usize, value: f64) -> Result<(), AudioError> {
        self.voice_mut(voice)?.physical.brightness = value.clamp(0.0, 1.0);
        Ok(())
    }

    pub fn set_physical_excitation(&mut self, voice: usize, value: f64) -> Result<(), AudioError> {
        self.voice_mut(voice)?.physical.excitation = value.clamp(0.0, 1.0);
        Ok(())
    }

    pub fn set_physical_resonance(&mut self, voice: usize, value: f64) -> Result<(), AudioError> {
        self.voice_mut(voice)?.physical.resonance = value.clamp(0.0, 1.0);
        Ok(())
    }

    pub fn set_physical_tension(&mut self, voice: usize, value: f64) -> Result<(), AudioError> {
        self.voice_mut(voice)?.physical.tension = value.clamp(0.0, 1.0);
        Ok(())
    }

    pub fn set_physical_pressure(&mut self, voice: usize, value: f64) -> Result<(), AudioError> {
        self.voice_mut(voice)?.physical.pressure = value.clamp(0.0, 1.0);
        Ok(())
    }

    pub fn physical_trigger(&mut self, voice: usize) -> Result<(), AudioError> {
        self.voice_mut(voice)?.physical.trigger();
        debug!(voice, "physical trigger");
        Ok(())
    }

    // ── delay ──────────────────────────────────────────────────────────

    pub fn set_delay_enabled(&mut self, voice: usize, enabled: bool) -> Result<(), AudioError> {
        self.voice_mut(voice)?.delay.enabled = enabled;
        Ok(())
    }

    pub fn set_delay_time(&mut self, voice: usize, seconds: f64) -> Result<(), AudioError> {
        self.voice_mut(voice)?.delay.set_time(seconds);
        Ok(())
    }

    pub fn set_delay_feedback(&mut self, voice: usize, feedback: f64) -> Result<(), AudioError> {
        self.voice_mut(voice)?.delay.feedback = feedback.clamp(0.0, 0.99);
        Ok(())
    }

    pub fn set_delay_mix(&mut self, voice: usize, mix: f64) -> Result<(), AudioError> {
        self.voice_mut(voice)?.delay.mix = mix.clamp(0.0, 1.0);
        Ok(())
    }

    // ── LFOs and routing ───────────────────────────────────────────────

    pub fn lfo_set_waveform(
        &mut self,
        lfo: usize,
        waveform: super::lfo::LfoWaveform,
    ) -> Result<(), AudioError> {
        self.lfo_mut(lfo)?.waveform = waveform;
        Ok(())
    }

    pub fn lfo_set_rate(&mut self, lfo: usize, rate_hz: f64) -> Result<(), AudioError> {
        if !(rate_hz > 0.0) || !rate_hz.is_finite() {
            return Err(AudioError::BadParameter(format!("LFO rate {rate_hz} Hz")));
        }
        self.lfo_mut(lfo)?.rate_hz = rate_hz;
        Ok(())
    }

    pub fn lfo_reset(&mut self, lfo: usize) -> Result<(), AudioError> {
        self.lfo_mut(lfo)?.reset();
        Ok(())
    }

    /// Install (or, with depth 0, remove) a route from an LFO to one
    /// (voice, target) pair. Re-routing the same triple replaces its depth.
    pub fn lfo_route(
        &mut self,
        lfo: usize,
        voice: usize,
        target: ModTarget,
        depth: f64,
    ) -> Result<(), AudioError> {
        if lfo >= LFO_COUNT {
            return Err(AudioError::InvalidLfo(lfo));
        }
        if voice >= VOICE_COUNT {
            return Err(AudioError::InvalidVoice(voice));
        }
        self.routes
            .retain(|r| !(r.lfo == lfo && r.voice == voice && r.target == target));
        if depth != 0.0 {
            self.routes.push(LfoRoute {
                lfo,
                voice,
                target,
                depth,
            });
        }
        Ok(())
    }

    pub fn routes(&self) -> &[LfoRoute] {
        &self.routes
    }

    // ── master ─────────────────────────────────────────────────────────

    pub fn master_volume(&self) -> f64 {
        self.master_target
    }

    pub fn set_master_volume(&mut self, volume: f64) {
        self.master_target = volume.clamp(0.0, 1.0);
    }

    /// Reset every voice, LFO, and route to power-on state.
    pub fn reset_all(&mut self) {
        for v in &mut self.voices {
            v.reset();
        }
        for lfo in &mut self.lfos {
            *lfo = Lfo::new(self.sample_rate);
        }
        self.routes.clear();
        self.filter.reset();
        debug!("voice engine reset");
    }

    // ── rendering ──────────────────────────────────────────────────────

    /// Render one block of live voice output into equal-length stereo
    /// slices. This is the only signal path in the engine.
    pub fn render(&mut self, left: &mut [f32], right: &mut [f32]) {
        let n = left.len().min(right.len());
        self.mixer.clear(n);
        self.master_scratch.clear();
        self.master_scratch.resize(n, 1.0);

        // Filter cutoff modulation is summed from the LFO values at the
        // block boundary, where coefficients are recomputed.
        let mut cutoff_mod = 0.0;
        for route in &self.routes {
            if route.target == ModTarget::FilterCutoff {
                cutoff_mod += route.depth * self.lfos[route.lfo].value();
            }
        }
        self.filter.begin_block(cutoff_mod);

        let mut lfo_values = [0.0_f64; LFO_COUNT];
        let mut outs = [VoiceOutput {
            sample: 0.0,
            wrapped: false,
            gain: 0.0,
        }; VOICE_COUNT];

        for i in 0..n {
            for (k, lfo) in self.lfos.iter_mut().enumerate() {
                lfo_values[k] = lfo.tick();
            }

            let mut mods = [ModAccumulator::default(); VOICE_COUNT];
            for route in &self.routes {
                let value = route.depth * lfo_values[route.lfo];
                let m = &mut mods[route.voice];
                match route.target {
                    ModTarget::Pitch => m.pitch_cents += value,
                    ModTarget::Volume => m.volume += value,
                    ModTarget::PulseWidth => m.pulse_width += value,
                    ModTarget::FilterCutoff => {} // applied at block start
                }
            }

            // Pass 1: every voice's own sample and wrap flag.
            for (v, voice) in self.voices.iter_mut().enumerate() {
                outs[v] = voice.tick(&mods[v]);
            }

            // Pass 2: inter-voice coupling, filter, delay, pan.
            for v in 0..VOICE_COUNT {
                let mut sample = outs[v].sample;

                if let Some(src) = self.voices[v].sync_source {
                    if outs[src].wrapped {
                        if let Some(resynced) = self.voices[v].resync(outs[v].gain) {
                            sample = resynced;
                        }
                    }
                }
                if let Some(src) = self.voices[v].ring_mod_source {
                    sample *= outs[src].sample;
                }

                if self.voices[v].filter_routed {
                    sample = self.filter.process(sample);
                }
                sample = self.voices[v].delay.process(sample);

                self.mixer.add(i, sample, self.voices[v].pan);
            }

            let diff = self.master_target - self.master;
            self.master += diff.clamp(-self.master_step, self.master_step);
            self.master_scratch[i] = self.master;
        }

        self.mixer.write_out(left, right, &self.master_scratch);
    }

    /// Render `frames` samples offline, allocating fresh stereo buffers.
    pub fn render_frames(&mut self, frames: usize) -> (Vec<f32>, Vec<f32>) {
        let mut left = vec![0.0f32; frames];
        let mut right = vec![0.0f32; frames];
        self.render(&mut left, &mut right);
        (left, right)
    }
}
