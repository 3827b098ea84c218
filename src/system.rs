//! The complete audio surface: voices, LFOs, filter, sound bank, timeline,
//! and playback mixing, behind a no-panic API.
//!
//! Every operation here degrades to a no-op on failure (wrong voice index,
//! malformed note name, missing sound id) and records a descriptive
//! message readable through `last_error`. Hosts drive output by calling
//! `render` with stereo block slices; control calls between blocks take
//! effect at the next block by construction.

use std::path::Path;
use std::sync::Arc;

use tracing::{debug, error};

use crate::bank::{SoundAsset, SoundBank, SoundId, SoundSource};
use crate::dsp::engine::VoiceEngine;
use crate::dsp::filter::FilterType;
use crate::dsp::lfo::{LfoWaveform, ModTarget};
use crate::dsp::oscillator::Waveform;
use crate::dsp::physical::ModelType;
use crate::dsp::renderer;
use crate::dsp::voice::Voice;
use crate::error::AudioError;
use crate::patch::VoicePatch;
use crate::sfx;
use crate::timeline::Timeline;

/// Where live voice output is routed.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum LiveRouting {
    /// Default: voices mix into the rendered output.
    Master,
    /// Same signal path; the name distinguishes a preview/monitor feed.
    Monitor,
    /// Live voices are muted (timeline and bank playback still sound).
    Muted,
}

/// One in-flight playback of a bank asset.
struct PlayingSound {
    asset: Arc<SoundAsset>,
    position: usize,
    volume: f64,
    pan: f64,
    from_timeline: bool,
}

pub struct AudioSystem {
    engine: VoiceEngine,
    bank: SoundBank,
    timeline: Timeline,
    playing: Vec<PlayingSound>,
    routing: LiveRouting,
    synth_waveform: Waveform,
    last_error: Option<String>,
    live_scratch: (Vec<f32>, Vec<f32>),
}

impl AudioSystem {
    pub fn new(sample_rate: f64) -> Self {
        AudioSystem {
            engine: VoiceEngine::new(sample_rate),
            bank: SoundBank::new(),
            timeline: Timeline::new(sample_rate),
            playing: Vec::new(),
            routing: LiveRouting::Master,
            synth_waveform: Waveform::Square,
            last_error: None,
            live_scratch: (Vec::new(), Vec::new()),
        }
    }

    pub fn sample_rate(&self) -> f64 {
        self.engine.sample_rate
    }

    /// Direct access to the underlying engine, for hosts that need more
    /// than the scripted surface.
    pub fn engine_mut(&mut self) -> &mut VoiceEngine {
        &mut self.engine
    }

    // ── error surface ──────────────────────────────────────────────────

    /// The most recent failure, if any.
    pub fn last_error(&self) -> Option<&str> {
        self.last_error.as_deref()
    }

    pub fn clear_error(&mut self) {
        self.last_error = None;
    }

    fn report(&mut self, result: Result<(), AudioError>) -> bool {
        match result {
            Ok(()) => true,
            Err(e) => {
                debug!(error = %e, "audio call ignored");
                self.last_error = Some(e.to_string());
                false
            }
        }
    }

    // ── per-voice setters ──────────────────────────────────────────────

    pub fn set_waveform(&mut self, voice: usize, waveform: Waveform) -> bool {
        let r = self.engine.set_waveform(voice, waveform);
        self.report(r)
    }

    pub fn set_frequency(&mut self, voice: usize, hz: f64) -> bool {
        let r = self.engine.set_frequency(voice, hz);
        self.report(r)
    }

    pub fn set_note(&mut self, voice: usize, midi: i32) -> bool {
        let r = self.engine.set_note(voice, midi);
        self.report(r)
    }

    /// Note-name frequency setter. Parse failures leave the frequency
    /// unchanged and record the error.
    pub fn set_note_name(&mut self, voice: usize, name: &str) -> bool {
        let r = self.engine.set_note_name(voice, name);
        self.report(r)
    }

    pub fn set_envelope(
        &mut self,
        voice: usize,
        attack: f64,
        decay: f64,
        sustain: f64,
        release: f64,
    ) -> bool {
        let r = self.engine.set_envelope(voice, attack, decay, sustain, release);
        self.report(r)
    }

    pub fn set_gate(&mut self, voice: usize, on: bool) -> bool {
        let r = self.engine.set_gate(voice, on);
        self.report(r)
    }

    pub fn set_volume(&mut self, voice: usize, volume: f64) -> bool {
        let r = self.engine.set_volume(voice, volume);
        self.report(r)
    }

    pub fn set_pulse_width(&mut self, voice: usize, width: f64) -> bool {
        let r = self.engine.set_pulse_width(voice, width);
        self.report(r)
    }

    pub fn set_pan(&mut self, voice: usize, pan: f64) -> bool {
        let r = self.engine.set_pan(voice, pan);
        self.report(r)
    }

    pub fn set_filter_routing(&mut self, voice: usize, routed: bool) -> bool {
        let r = self.engine.set_filter_routing(voice, routed);
        self.report(r)
    }

    pub fn set_portamento(&mut self, voice: usize, seconds: f64) -> bool {
        let r = self.engine.set_portamento(voice, seconds);
        self.report(r)
    }

    pub fn set_detune(&mut self, voice: usize, cents: f64) -> bool {
        let r = self.engine.set_detune(voice, cents);
        self.report(r)
    }

    pub fn set_ring_mod(&mut self, voice: usize, source: Option<usize>) -> bool {
        let r = self.engine.set_ring_mod(voice, source);
        self.report(r)
    }

    pub fn set_sync(&mut self, voice: usize, source: Option<usize>) -> bool {
        let r = self.engine.set_sync(voice, source);
        self.report(r)
    }

    // ── physical model ─────────────────────────────────────────────────

    pub fn set_physical_model(&mut self, voice: usize, model: ModelType) -> bool {
        let r = self.engine.set_physical_model(voice, model);
        self.report(r)
    }

    pub fn set_physical_damping(&mut self, voice: usize, value: f64) -> bool {
        let r = self.engine.set_physical_damping(voice, value);
        self.report(r)
    }

    pub fn set_physical_brightness(&mut self, voice: usize, value: f64) -> bool {
        let r = self.engine.set_physical_brightness(voice, value);
        self.report(r)
    }

    pub fn set_physical_excitation(&mut self, voice: usize, value: f64) -> bool {
        let r = self.engine.set_physical_excitation(voice, value);
        self.report(r)
    }

    pub fn set_physical_resonance(&mut self, voice: usize, value: f64) -> bool {
        let r = self.engine.set_physical_resonance(voice, value);
        self.report(r)
    }

    pub fn set_physical_tension(&mut self, voice: usize, value: f64) -> bool {
        let r = self.engine.set_physical_tension(voice, value);
        self.report(r)
    }

    pub fn set_physical_pressure(&mut self, voice: usize, value: f64) -> bool {
        let r = self.engine.set_physical_pressure(voice, value);
        self.report(r)
    }

    pub fn physical_trigger(&mut self, voice: usize) -> bool {
        let r = self.engine.physical_trigger(voice);
        self.report(r)
    }

    // ── per-voice delay ────────────────────────────────────────────────

    pub fn set_delay_enabled(&mut self, voice: usize, enabled: bool) -> bool {
        let r = self.engine.set_delay_enabled(voice, enabled);
        self.report(r)
    }

    pub fn set_delay_time(&mut self, voice: usize, seconds: f64) -> bool {
        let r = self.engine.set_delay_time(voice, seconds);
        self.report(r)
    }

    pub fn set_delay_feedback(&mut self, voice: usize, feedback: f64) -> bool {
        let r = self.engine.set_delay_feedback(voice, feedback);
        self.report(r)
    }

    pub fn set_delay_mix(&mut self, voice: usize, mix: f64) -> bool {
        let r = self.engine.set_delay_mix(voice, mix);
        self.report(r)
    }

    // ── shared filter and master ───────────────────────────────────────

    pub fn set_filter_type(&mut self, filter_type: FilterType) {
        self.engine.filter.set_type(filter_type);
    }

    pub fn set_filter_cutoff(&mut self, cutoff_hz: f64) -> bool {
        if !(cutoff_hz > 0.0) || !cutoff_hz.is_finite() {
            return self.report(Err(AudioError::BadParameter(format!(
                "filter cutoff {cutoff_hz} Hz"
            ))));
        }
        self.engine.filter.set_cutoff(cutoff_hz);
        true
    }

    pub fn set_filter_resonance(&mut self, resonance: f64) {
        self.engine.filter.set_resonance(resonance);
    }

    pub fn set_filter_enabled(&mut self, enabled: bool) {
        self.engine.filter.enabled = enabled;
    }

    pub fn master_volume(&self) -> f64 {
        self.engine.master_volume()
    }

    pub fn set_master_volume(&mut self, volume: f64) {
        self.engine.set_master_volume(volume);
    }

    /// Reset every voice, LFO, and route to power-on defaults.
    pub fn reset_all_voices(&mut self) {
        self.engine.reset_all();
    }

    // ── LFOs ───────────────────────────────────────────────────────────

    pub fn lfo_set_waveform(&mut self, lfo: usize, waveform: LfoWaveform) -> bool {
        let r = self.engine.lfo_set_waveform(lfo, waveform);
        self.report(r)
    }

    pub fn lfo_set_rate(&mut self, lfo: usize, rate_hz: f64) -> bool {
        let r = self.engine.lfo_set_rate(lfo, rate_hz);
        self.report(r)
    }

    pub fn lfo_reset(&mut self, lfo: usize) -> bool {
        let r = self.engine.lfo_reset(lfo);
        self.report(r)
    }

    /// Route an LFO to a voice's pitch; depth in cents.
    pub fn lfo_route_pitch(&mut self, lfo: usize, voice: usize, depth_cents: f64) -> bool {
        let r = self.engine.lfo_route(lfo, voice, ModTarget::Pitch, depth_cents);
        self.report(r)
    }

    /// Route an LFO to a voice's volume; depth is linear gain.
    pub fn lfo_route_volume(&mut self, lfo: usize, voice: usize, depth: f64) -> bool {
        let r = self.engine.lfo_route(lfo, voice, ModTarget::Volume, depth);
        self.report(r)
    }

    /// Route an LFO to the shared filter cutoff; depth in Hz.
    pub fn lfo_route_filter(&mut self, lfo: usize, voice: usize, depth_hz: f64) -> bool {
        let r = self.engine.lfo_route(lfo, voice, ModTarget::FilterCutoff, depth_hz);
        self.report(r)
    }

    /// Route an LFO to a voice's pulse width; depth is a duty fraction.
    pub fn lfo_route_pulse_width(&mut self, lfo: usize, voice: usize, depth: f64) -> bool {
        let r = self.engine.lfo_route(lfo, voice, ModTarget::PulseWidth, depth);
        self.report(r)
    }

    // ── sound bank ─────────────────────────────────────────────────────

    pub fn beep(&mut self, frequency: f64, duration: f64) -> SoundId {
        let asset = sfx::beep(self.sample_rate(), frequency, duration);
        self.bank.insert(asset)
    }

    pub fn blip(&mut self, pitch: f64, duration: f64) -> SoundId {
        let asset = sfx::blip(self.sample_rate(), pitch, duration);
        self.bank.insert(asset)
    }

    pub fn click(&mut self, sharpness: f64, duration: f64) -> SoundId {
        let asset = sfx::click(self.sample_rate(), sharpness, duration);
        self.bank.insert(asset)
    }

    pub fn zap(&mut self, frequency: f64, duration: f64) -> SoundId {
        let asset = sfx::zap(self.sample_rate(), frequency, duration);
        self.bank.insert(asset)
    }

    pub fn explode(&mut self, size: f64, duration: f64) -> SoundId {
        let asset = sfx::explode(self.sample_rate(), size, duration);
        self.bank.insert(asset)
    }

    pub fn pickup(&mut self, brightness: f64, duration: f64) -> SoundId {
        let asset = sfx::pickup(self.sample_rate(), brightness, duration);
        self.bank.insert(asset)
    }

    pub fn hurt(&mut self, severity: f64, duration: f64) -> SoundId {
        let asset = sfx::hurt(self.sample_rate(), severity, duration);
        self.bank.insert(asset)
    }

    pub fn sweep_down(&mut self, start_freq: f64, end_freq: f64, duration: f64) -> SoundId {
        let asset = sfx::sweep_down(self.sample_rate(), start_freq, end_freq, duration);
        self.bank.insert(asset)
    }

    pub fn coin(&mut self, pitch: f64, duration: f64) -> SoundId {
        let asset = sfx::coin(self.sample_rate(), pitch, duration);
        self.bank.insert(asset)
    }

    pub fn powerup(&mut self, intensity: f64, duration: f64) -> SoundId {
        let asset = sfx::powerup(self.sample_rate(), intensity, duration);
        self.bank.insert(asset)
    }

    /// Start playback of a bank sound. Defaults are volume 1.0, pan 0.0
    /// (center); unknown ids are a recorded no-op.
    pub fn play(&mut self, id: SoundId, volume: f64, pan: f64) -> bool {
        match self.bank.get(id) {
            Some(asset) => {
                self.playing.push(PlayingSound {
                    asset,
                    position: 0,
                    volume: volume.clamp(0.0, 1.0),
                    pan: pan.clamp(-1.0, 1.0),
                    from_timeline: false,
                });
                true
            }
            None => self.report(Err(AudioError::UnknownSound(id))),
        }
    }

    pub fn exists(&self, id: SoundId) -> bool {
        self.bank.exists(id)
    }

    /// Unload a sound. In-flight playback of it finishes undisturbed.
    pub fn delete(&mut self, id: SoundId) -> bool {
        if self.bank.remove(id) {
            true
        } else {
            self.report(Err(AudioError::UnknownSound(id)))
        }
    }

    // ── one-shot synth helpers ─────────────────────────────────────────

    /// Waveform used by `synth_note` / `synth_frequency`.
    pub fn synth_set_instrument(&mut self, waveform: Waveform) {
        self.synth_waveform = waveform;
    }

    /// Play a MIDI note immediately with the synth instrument. Default
    /// volume is 0.5.
    pub fn synth_note(&mut self, midi: i32, duration: f64, volume: f64) -> bool {
        if !(0..=127).contains(&midi) {
            return self.report(Err(AudioError::BadParameter(format!("MIDI note {midi}"))));
        }
        let hz = crate::dsp::engine::midi_to_frequency(midi);
        self.synth_frequency(hz, duration, volume)
    }

    /// Play a fixed frequency immediately with the synth instrument.
    pub fn synth_frequency(&mut self, hz: f64, duration: f64, volume: f64) -> bool {
        if !(hz > 0.0) || !hz.is_finite() {
            return self.report(Err(AudioError::BadParameter(format!("frequency {hz} Hz"))));
        }
        let asset = self.render_tone(hz, duration.clamp(0.01, 10.0), volume.clamp(0.0, 1.0));
        self.playing.push(PlayingSound {
            asset: Arc::new(asset),
            position: 0,
            volume: 1.0,
            pan: 0.0,
            from_timeline: false,
        });
        true
    }

    /// Offline-render a gated tone on a scratch voice.
    fn render_tone(&mut self, hz: f64, duration: f64, volume: f64) -> SoundAsset {
        let sr = self.sample_rate();
        let mut voice = Voice::new(sr, 0);
        voice.oscillator.waveform = self.synth_waveform;
        voice.envelope.set_adsr(0.005, 0.02, 0.8, 0.05);
        voice.set_frequency(hz);
        voice.set_volume(volume);
        voice.set_gate(true);

        let gate_frames = (duration * sr) as usize;
        let tail_frames = (0.06 * sr) as usize;
        let modulation = Default::default();
        let mut samples = Vec::with_capacity(gate_frames + tail_frames);
        for i in 0..gate_frames + tail_frames {
            if i == gate_frames {
                voice.set_gate(false);
            }
            samples.push(voice.tick(&modulation).sample as f32);
        }
        SoundAsset::mono(samples, sr as u32, SoundSource::Tone)
    }

    // ── timeline ───────────────────────────────────────────────────────

    /// Begin (or restart) the recording session.
    pub fn timeline_start(&mut self) {
        self.timeline.start();
    }

    pub fn timeline_set_tempo(&mut self, bpm: f64) -> bool {
        let r = self.timeline.set_tempo(bpm);
        self.report(r)
    }

    pub fn timeline_is_recording(&self) -> bool {
        self.timeline.is_recording()
    }

    /// Render one beat of the live voice state into `slot`, scaled by
    /// `volume`. Revisiting a slot layers additively.
    pub fn timeline_end_slot(&mut self, slot: u32, volume: f64) -> bool {
        if !self.timeline.is_recording() {
            return self.report(Err(AudioError::NoSession));
        }
        let beat = self.timeline.beat_samples();
        let (left, right) = self.engine.render_frames(beat);
        let r = self.timeline.mix_slot(slot, &left, &right, volume);
        self.report(r)
    }

    /// Render one beat at the write cursor, advance it, and mint a bank id
    /// for just that slot's audio.
    pub fn timeline_next_slot(&mut self, volume: f64) -> Option<SoundId> {
        if !self.timeline.is_recording() {
            self.report(Err(AudioError::NoSession));
            return None;
        }
        let beat = self.timeline.beat_samples();
        let (left, right) = self.engine.render_frames(beat);
        let slot = self.timeline.take_cursor();
        if let Err(e) = self.timeline.mix_slot(slot, &left, &right, volume) {
            self.report(Err(e));
            return None;
        }
        let asset = SoundAsset::stereo(
            &left,
            &right,
            self.sample_rate() as u32,
            SoundSource::Slot(slot),
        );
        Some(self.bank.insert(asset))
    }

    /// End the session and start playing the accumulated buffer.
    pub fn timeline_end_play(&mut self) -> bool {
        match self.timeline.finish() {
            Ok((left, right)) => {
                let asset =
                    SoundAsset::stereo(&left, &right, self.sample_rate() as u32, SoundSource::Session);
                self.playing.push(PlayingSound {
                    asset: Arc::new(asset),
                    position: 0,
                    volume: 1.0,
                    pan: 0.0,
                    from_timeline: true,
                });
                true
            }
            Err(e) => self.report(Err(e)),
        }
    }

    /// End the session and persist the accumulated buffer as a WAV file.
    pub fn timeline_end_save(&mut self, path: &Path) -> bool {
        let (left, right) = match self.timeline.finish() {
            Ok(buffers) => buffers,
            Err(e) => return self.report(Err(e)),
        };
        match renderer::write_wav(path, &left, &right, self.sample_rate() as u32) {
            Ok(()) => true,
            Err(e) => {
                error!(error = %e, ?path, "timeline save failed");
                self.report(Err(e))
            }
        }
    }

    /// End the session, converting the accumulated buffer into a bank
    /// entry.
    pub fn timeline_end_bank(&mut self) -> Option<SoundId> {
        match self.timeline.finish() {
            Ok((left, right)) => {
                let asset =
                    SoundAsset::stereo(&left, &right, self.sample_rate() as u32, SoundSource::Session);
                Some(self.bank.insert(asset))
            }
            Err(e) => {
                self.report(Err(e));
                None
            }
        }
    }

    /// Is the whole-session playback started by `timeline_end_play` still
    /// sounding?
    pub fn timeline_is_playing(&self) -> bool {
        self.playing.iter().any(|p| p.from_timeline)
    }

    // ── direct routing ─────────────────────────────────────────────────

    /// Route live voice output to a named destination: `"master"`,
    /// `"monitor"`, or `"none"`. Unknown names are a recorded no-op.
    pub fn direct(&mut self, destination: &str) -> bool {
        let routing = match destination {
            "master" => LiveRouting::Master,
            "monitor" => LiveRouting::Monitor,
            "none" => LiveRouting::Muted,
            other => {
                return self.report(Err(AudioError::UnknownDestination(other.to_string())));
            }
        };
        self.routing = routing;
        true
    }

    /// Render the live voice state immediately (for `duration` seconds, or
    /// one beat when `duration <= 0`), scale it by `volume`, play it, and
    /// mint a bank id. Bypasses the timeline buffer entirely.
    pub fn direct_slot(&mut self, slot: u32, volume: f64, duration: f64) -> Option<SoundId> {
        let frames = if duration > 0.0 {
            (duration.min(60.0) * self.sample_rate()) as usize
        } else {
            self.timeline.beat_samples()
        };
        let (mut left, mut right) = self.engine.render_frames(frames);
        let gain = volume.clamp(0.0, 1.0) as f32;
        for s in left.iter_mut().chain(right.iter_mut()) {
            *s *= gain;
        }
        let asset = SoundAsset::stereo(
            &left,
            &right,
            self.sample_rate() as u32,
            SoundSource::Slot(slot),
        );
        let id = self.bank.insert(asset);
        if let Some(shared) = self.bank.get(id) {
            self.playing.push(PlayingSound {
                asset: shared,
                position: 0,
                volume: 1.0,
                pan: 0.0,
                from_timeline: false,
            });
        }
        Some(id)
    }

    // ── patches ────────────────────────────────────────────────────────

    pub fn capture_patch(&mut self, voice: usize) -> Option<VoicePatch> {
        match self.engine.voice(voice) {
            Some(v) => Some(VoicePatch::from_voice(v)),
            None => {
                self.report(Err(AudioError::InvalidVoice(voice)));
                None
            }
        }
    }

    pub fn apply_patch(&mut self, voice: usize, patch: &VoicePatch) -> bool {
        let r = self.engine.with_voice(voice, |v| patch.apply_to(v));
        self.report(r)
    }

    // ── output ─────────────────────────────────────────────────────────

    /// Render one stereo block: live voices (per the direct routing) plus
    /// any in-flight bank/timeline playback.
    pub fn render(&mut self, left: &mut [f32], right: &mut [f32]) {
        let n = left.len().min(right.len());

        // Live voices always advance so gates and delays stay coherent,
        // even while muted.
        self.live_scratch.0.clear();
        self.live_scratch.0.resize(n, 0.0);
        self.live_scratch.1.clear();
        self.live_scratch.1.resize(n, 0.0);
        {
            let (sl, sr) = (&mut self.live_scratch.0, &mut self.live_scratch.1);
            self.engine.render(sl, sr);
        }

        let live_audible = self.routing != LiveRouting::Muted;
        for i in 0..n {
            let (mut l, mut r) = if live_audible {
                (self.live_scratch.0[i], self.live_scratch.1[i])
            } else {
                (0.0, 0.0)
            };

            for sound in &mut self.playing {
                if sound.position < sound.asset.frames() {
                    let (fl, fr) = sound.asset.frame(sound.position);
                    let balance_l = (1.0 - sound.pan.max(0.0)) as f32;
                    let balance_r = (1.0 + sound.pan.min(0.0)) as f32;
                    l += fl * sound.volume as f32 * balance_l;
                    r += fr * sound.volume as f32 * balance_r;
                    sound.position += 1;
                }
            }

            left[i] = l.clamp(-1.0, 1.0);
            right[i] = r.clamp(-1.0, 1.0);
        }

        self.playing.retain(|p| p.position < p.asset.frames());
    }
}
