//! Physical modeling source — excitation + resonant feedback delay line.
//!
//! Karplus-Strong family: a delay line tuned to the fundamental period with
//! a one-pole lowpass in the feedback path. The string variant rings from
//! discrete excitation bursts; the wind variant is additionally fed a
//! continuous breath-noise input scaled by `pressure`, so it can sustain
//! indefinitely without retriggering.

use serde::{Deserialize, Serialize};

/// Lowest supported fundamental, which bounds the delay-line allocation.
const MIN_FREQ_HZ: f64 = 27.5; // A0

/// Physical model variant.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ModelType {
    String,
    Wind,
}

/// Excitation/feedback delay-line model for one voice.
#[derive(Debug, Clone)]
pub struct PhysicalModel {
    pub model: ModelType,
    /// Feedback attenuation per pass, [0, 1]. 0 rings near-forever.
    pub damping: f64,
    /// Feedback lowpass coefficient, [0, 1]. Higher keeps more harmonics.
    pub brightness: f64,
    /// Shapes the trigger burst between a pluck transient (0) and pure
    /// noise (1).
    pub excitation: f64,
    /// Blend of unfiltered feedback, [0, 1]; sharpens the resonance.
    pub resonance: f64,
    /// Shortens the delay line, raising pitch by up to one octave, [0, 1].
    pub tension: f64,
    /// Continuous breath level for the wind variant, [0, 1].
    pub pressure: f64,

    line: Vec<f64>,
    write_pos: usize,
    filter_state: f64,
    burst_remaining: usize,
    burst_len: usize,
    pending_trigger: bool,
    sample_rate: f64,
    rng: fastrand::Rng,
}

impl PhysicalModel {
    pub fn new(sample_rate: f64, noise_seed: u64) -> Self {
        let capacity = (sample_rate / MIN_FREQ_HZ).ceil() as usize + 2;
        PhysicalModel {
            model: ModelType::String,
            damping: 0.3,
            brightness: 0.5,
            excitation: 0.8,
            resonance: 0.3,
            tension: 0.0,
            pressure: 0.0,
            line: vec![0.0; capacity],
            write_pos: 0,
            filter_state: 0.0,
            burst_remaining: 0,
            burst_len: 0,
            pending_trigger: false,
            sample_rate,
            rng: fastrand::Rng::with_seed(noise_seed),
        }
    }

    /// Queue an excitation burst. The burst length depends on the pitch at
    /// the next tick, so injection starts there.
    pub fn trigger(&mut self) {
        self.pending_trigger = true;
    }

    /// Generate one sample at `frequency` Hz.
    pub fn tick(&mut self, frequency: f64) -> f64 {
        let len = self.line.len();

        // Tension shortens the effective period, raising pitch.
        let effective_freq = (frequency * (1.0 + self.tension)).max(MIN_FREQ_HZ);
        let period = (self.sample_rate / effective_freq).clamp(2.0, (len - 2) as f64);

        if self.pending_trigger {
            self.pending_trigger = false;
            self.burst_len = period as usize;
            self.burst_remaining = self.burst_len;
        }

        // Fractional read behind the write head, linear interpolation.
        let read = self.write_pos as f64 - period;
        let read = if read < 0.0 { read + len as f64 } else { read };
        let i0 = read as usize % len;
        let i1 = (i0 + 1) % len;
        let frac = read - read.floor();
        let delayed = self.line[i0] * (1.0 - frac) + self.line[i1] * frac;

        // One-pole lowpass in the feedback path.
        let coeff = 0.2 + 0.75 * self.brightness;
        let filtered = coeff * delayed + (1.0 - coeff) * self.filter_state;
        self.filter_state = filtered;

        // Resonance blends some unfiltered signal back in.
        let loop_sig = filtered + (delayed - filtered) * self.resonance;

        let mut input = 0.0;
        if self.burst_remaining > 0 {
            let noise = self.rng.f64() * 2.0 - 1.0;
            let transient = 1.0 - (self.burst_len - self.burst_remaining) as f64
                / self.burst_len.max(1) as f64;
            input += self.excitation * noise + (1.0 - self.excitation) * transient;
            self.burst_remaining -= 1;
        }
        if self.model == ModelType::Wind && self.pressure > 0.0 {
            input += self.pressure * (self.rng.f64() * 2.0 - 1.0) * 0.2;
        }

        let loop_gain = 0.999 - 0.199 * self.damping.clamp(0.0, 1.0);
        self.line[self.write_pos] = loop_sig * loop_gain + input;
        self.write_pos = (self.write_pos + 1) % len;

        loop_sig + input
    }

    /// Clear the delay line and filter state.
    pub fn reset(&mut self) {
        self.line.fill(0.0);
        self.write_pos = 0;
        self.filter_state = 0.0;
        self.burst_remaining = 0;
        self.pending_trigger = false;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn rms(samples: &[f64]) -> f64 {
        (samples.iter().map(|s| s * s).sum::<f64>() / samples.len() as f64).sqrt()
    }

    fn run(model: &mut PhysicalModel, freq: f64, n: usize) -> Vec<f64> {
        (0..n).map(|_| model.tick(freq)).collect()
    }

    #[test]
    fn silent_without_excitation() {
        let mut pm = PhysicalModel::new(44100.0, 1);
        let out = run(&mut pm, 220.0, 2048);
        assert!(rms(&out) < 1e-9, "untriggered string must stay silent");
    }

    #[test]
    fn trigger_produces_decaying_tone() {
        let mut pm = PhysicalModel::new(44100.0, 1);
        pm.trigger();
        let early = run(&mut pm, 220.0, 4096);
        let late = run(&mut pm, 220.0, 4096);
        assert!(rms(&early) > 0.01, "trigger should produce sound");
        assert!(
            rms(&late) < rms(&early),
            "string energy should decay over time"
        );
    }

    #[test]
    fn damping_shortens_decay() {
        let mut soft = PhysicalModel::new(44100.0, 1);
        soft.damping = 0.05;
        let mut hard = PhysicalModel::new(44100.0, 1);
        hard.damping = 0.9;

        soft.trigger();
        hard.trigger();
        // Skip the shared burst, then compare tails.
        run(&mut soft, 220.0, 4096);
        run(&mut hard, 220.0, 4096);
        let soft_tail = rms(&run(&mut soft, 220.0, 4096));
        let hard_tail = rms(&run(&mut hard, 220.0, 4096));
        assert!(
            soft_tail > hard_tail,
            "low damping must sustain longer ({soft_tail} vs {hard_tail})"
        );
    }

    #[test]
    fn wind_sustains_under_pressure_without_trigger() {
        let mut pm = PhysicalModel::new(44100.0, 1);
        pm.model = ModelType::Wind;
        pm.pressure = 0.8;
        // No trigger at all: breath input alone must keep the pipe singing.
        run(&mut pm, 330.0, 4096);
        let settled = run(&mut pm, 330.0, 8192);
        assert!(rms(&settled) > 0.005, "wind model should sustain from pressure");
    }

    #[test]
    fn tension_raises_pitch() {
        let count_crossings = |out: &[f64]| {
            out.windows(2)
                .filter(|w| (w[0] < 0.0) != (w[1] < 0.0))
                .count()
        };

        let mut slack = PhysicalModel::new(44100.0, 1);
        slack.tension = 0.0;
        slack.damping = 0.05;
        slack.trigger();
        run(&mut slack, 220.0, 4096);
        let slack_crossings = count_crossings(&run(&mut slack, 220.0, 8192));

        let mut tight = PhysicalModel::new(44100.0, 1);
        tight.tension = 1.0;
        tight.damping = 0.05;
        tight.trigger();
        run(&mut tight, 220.0, 4096);
        let tight_crossings = count_crossings(&run(&mut tight, 220.0, 8192));

        assert!(
            tight_crossings > slack_crossings,
            "full tension should raise the fundamental ({slack_crossings} vs {tight_crossings})"
        );
    }

    #[test]
    fn output_stays_finite() {
        let mut pm = PhysicalModel::new(44100.0, 1);
        pm.damping = 0.0;
        pm.resonance = 1.0;
        pm.brightness = 1.0;
        pm.trigger();
        for _ in 0..44100 {
            let s = pm.tick(110.0);
            assert!(s.is_finite());
        }
    }

    #[test]
    fn reset_clears_state() {
        let mut pm = PhysicalModel::new(44100.0, 1);
        pm.trigger();
        run(&mut pm, 220.0, 512);
        pm.reset();
        let out = run(&mut pm, 220.0, 1024);
        assert!(rms(&out) < 1e-9, "reset model must be silent");
    }
}
