//! Chip-style oscillators.
//!
//! Waveforms are the classic non-bandlimited shapes: the engine targets a
//! retro character, so discontinuities are left unsmoothed and noise is
//! redrawn from a seeded generator every tick.

use std::f64::consts::PI;

use serde::{Deserialize, Serialize};

/// Supported waveform shapes.
///
/// `Physical` routes the voice through its physical model instead of the
/// oscillator; the oscillator itself outputs silence for it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Waveform {
    Silence,
    Sine,
    Square,
    Saw,
    Triangle,
    Noise,
    Pulse,
    Physical,
}

/// A single phase-accumulator oscillator.
///
/// Frequency is supplied per tick by the owning voice (which folds in
/// glide, detune, and pitch modulation), so the oscillator itself only
/// tracks phase and duty cycle.
#[derive(Debug, Clone)]
pub struct Oscillator {
    pub waveform: Waveform,
    /// Duty cycle for `Pulse`, in (0, 1).
    pub pulse_width: f64,
    phase: f64,
    sample_rate: f64,
    /// Set for one tick whenever the phase wraps past 1.0.
    wrapped: bool,
    noise: fastrand::Rng,
}

impl Oscillator {
    pub fn new(waveform: Waveform, sample_rate: f64, noise_seed: u64) -> Self {
        Oscillator {
            waveform,
            pulse_width: 0.5,
            phase: 0.0,
            sample_rate,
            wrapped: false,
            noise: fastrand::Rng::with_seed(noise_seed),
        }
    }

    /// Current phase in [0, 1).
    pub fn phase(&self) -> f64 {
        self.phase
    }

    /// Did the phase wrap on the most recent tick? Used for hard sync.
    pub fn wrapped(&self) -> bool {
        self.wrapped
    }

    /// Generate the sample for this tick at `frequency` Hz, then advance.
    pub fn tick(&mut self, frequency: f64) -> f64 {
        let sample = self.value_at(self.phase);
        let inc = frequency / self.sample_rate;
        self.phase += inc;
        self.wrapped = self.phase >= 1.0;
        if self.wrapped {
            self.phase -= self.phase.floor();
        }
        sample
    }

    /// Waveform value at an arbitrary phase.
    ///
    /// `Noise` draws a fresh value on every call; it is not a function of
    /// phase.
    pub fn value_at(&mut self, phase: f64) -> f64 {
        match self.waveform {
            Waveform::Silence | Waveform::Physical => 0.0,
            Waveform::Sine => (2.0 * PI * phase).sin(),
            Waveform::Square => {
                if (2.0 * PI * phase).sin() >= 0.0 {
                    1.0
                } else {
                    -1.0
                }
            }
            Waveform::Pulse => {
                if phase < self.pulse_width {
                    1.0
                } else {
                    -1.0
                }
            }
            Waveform::Saw => 2.0 * phase - 1.0,
            Waveform::Triangle => {
                // Folded saw: -1 → +1 over the first half, back down over
                // the second.
                if phase < 0.5 {
                    4.0 * phase - 1.0
                } else {
                    3.0 - 4.0 * phase
                }
            }
            Waveform::Noise => self.noise.f64() * 2.0 - 1.0,
        }
    }

    /// Force the phase back to the start of the cycle (hard sync).
    pub fn sync_reset(&mut self) {
        self.phase = 0.0;
    }

    /// Reset phase and wrap state.
    pub fn reset(&mut self) {
        self.phase = 0.0;
        self.wrapped = false;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn osc(waveform: Waveform) -> Oscillator {
        Oscillator::new(waveform, 44100.0, 1)
    }

    #[test]
    fn sine_starts_at_zero() {
        let mut o = osc(Waveform::Sine);
        let s = o.tick(440.0);
        assert!(s.abs() < 1e-10, "sine should start near 0, got {s}");
    }

    #[test]
    fn phase_wraps_after_one_period() {
        // After sample_rate / f ticks the phase must return to its start.
        let mut o = osc(Waveform::Sine);
        let freq = 441.0; // exactly 100 ticks per cycle at 44100 Hz
        for _ in 0..100 {
            o.tick(freq);
        }
        assert!(
            o.phase() < 1e-9 || (1.0 - o.phase()) < 1e-9,
            "phase should wrap back to start, got {}",
            o.phase()
        );
    }

    #[test]
    fn wrap_flag_fires_once_per_cycle() {
        let mut o = osc(Waveform::Saw);
        let freq = 441.0;
        let mut wraps = 0;
        for _ in 0..1000 {
            o.tick(freq);
            if o.wrapped() {
                wraps += 1;
            }
        }
        assert_eq!(wraps, 10, "441 Hz over 1000 ticks at 44.1kHz wraps 10x");
    }

    #[test]
    fn square_is_bipolar_unit() {
        let mut o = osc(Waveform::Square);
        for _ in 0..1000 {
            let s = o.tick(440.0);
            assert!(s == 1.0 || s == -1.0, "square must be ±1, got {s}");
        }
    }

    #[test]
    fn pulse_duty_cycle() {
        let mut o = osc(Waveform::Pulse);
        o.pulse_width = 0.25;
        let freq = 441.0; // 100 ticks per cycle
        let mut high = 0;
        for _ in 0..1000 {
            if o.tick(freq) > 0.0 {
                high += 1;
            }
        }
        // 25% duty over 10 full cycles.
        assert!(
            (240..=260).contains(&high),
            "expected ~250 high ticks, got {high}"
        );
    }

    #[test]
    fn saw_spans_full_range() {
        let mut o = osc(Waveform::Saw);
        let mut min = f64::MAX;
        let mut max = f64::MIN;
        for _ in 0..1000 {
            let s = o.tick(441.0);
            min = min.min(s);
            max = max.max(s);
        }
        assert!(min < -0.95 && max > 0.95, "saw range [{min}, {max}]");
    }

    #[test]
    fn triangle_in_range() {
        let mut o = osc(Waveform::Triangle);
        for _ in 0..44100 {
            let s = o.tick(440.0);
            assert!((-1.0..=1.0).contains(&s), "triangle out of range: {s}");
        }
    }

    #[test]
    fn noise_is_deterministic_per_seed() {
        let mut a = Oscillator::new(Waveform::Noise, 44100.0, 7);
        let mut b = Oscillator::new(Waveform::Noise, 44100.0, 7);
        for _ in 0..100 {
            assert_eq!(a.tick(440.0), b.tick(440.0));
        }
    }

    #[test]
    fn silence_is_silent() {
        let mut o = osc(Waveform::Silence);
        for _ in 0..100 {
            assert_eq!(o.tick(440.0), 0.0);
        }
    }

    #[test]
    fn sync_reset_zeroes_phase() {
        let mut o = osc(Waveform::Saw);
        for _ in 0..37 {
            o.tick(440.0);
        }
        o.sync_reset();
        assert_eq!(o.phase(), 0.0);
    }
}
