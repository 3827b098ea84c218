//! Low-frequency oscillators and the modulation routing table.
//!
//! LFOs are plain phase accumulators running at control rates and emitting
//! bipolar [-1, 1] values. Routes bind an LFO to one (voice, target) pair
//! with a depth whose unit depends on the target; several routes onto the
//! same pair sum their contributions.

use std::f64::consts::PI;

use serde::{Deserialize, Serialize};

/// Waveforms available to LFOs (pitched subset of the voice waveforms).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum LfoWaveform {
    Sine,
    Square,
    Saw,
    Triangle,
}

/// Modulation destinations.
///
/// Depth units: `Pitch` cents, `Volume` linear gain, `FilterCutoff` Hz,
/// `PulseWidth` duty fraction.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ModTarget {
    Pitch,
    Volume,
    FilterCutoff,
    PulseWidth,
}

/// One control-rate oscillator.
#[derive(Debug, Clone)]
pub struct Lfo {
    pub waveform: LfoWaveform,
    pub rate_hz: f64,
    phase: f64,
    sample_rate: f64,
}

impl Lfo {
    pub fn new(sample_rate: f64) -> Self {
        Lfo {
            waveform: LfoWaveform::Sine,
            rate_hz: 1.0,
            phase: 0.0,
            sample_rate,
        }
    }

    /// Snap the phase back to the start of the cycle.
    pub fn reset(&mut self) {
        self.phase = 0.0;
    }

    pub fn phase(&self) -> f64 {
        self.phase
    }

    /// The control value at the current phase, without advancing. Block
    /// boundaries use this to sample filter-cutoff modulation.
    pub fn value(&self) -> f64 {
        match self.waveform {
            LfoWaveform::Sine => (2.0 * PI * self.phase).sin(),
            LfoWaveform::Square => {
                if self.phase < 0.5 {
                    1.0
                } else {
                    -1.0
                }
            }
            LfoWaveform::Saw => 2.0 * self.phase - 1.0,
            LfoWaveform::Triangle => {
                if self.phase < 0.5 {
                    4.0 * self.phase - 1.0
                } else {
                    3.0 - 4.0 * self.phase
                }
            }
        }
    }

    /// Advance one tick and return the bipolar control value.
    pub fn tick(&mut self) -> f64 {
        let value = self.value();
        self.phase += self.rate_hz / self.sample_rate;
        if self.phase >= 1.0 {
            self.phase -= self.phase.floor();
        }
        value
    }
}

/// A single modulation routing entry.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct LfoRoute {
    pub lfo: usize,
    pub voice: usize,
    pub target: ModTarget,
    pub depth: f64,
}

/// Per-voice modulation accumulators for one tick, plus the global filter
/// cutoff offset (the filter bus is shared, so its modulation is too).
#[derive(Debug, Clone, Copy, Default)]
pub struct ModAccumulator {
    /// Added to the frequency computation, in cents.
    pub pitch_cents: f64,
    /// Added to voice volume, clamped into [0, 1] at the use site.
    pub volume: f64,
    /// Added to the pulse duty cycle, clamped into (0, 1) at the use site.
    pub pulse_width: f64,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn sine_lfo_is_bipolar() {
        let mut lfo = Lfo::new(1000.0);
        lfo.rate_hz = 10.0;
        let (mut min, mut max) = (f64::MAX, f64::MIN);
        for _ in 0..1000 {
            let v = lfo.tick();
            min = min.min(v);
            max = max.max(v);
        }
        assert!(min < -0.95 && max > 0.95, "range [{min}, {max}]");
    }

    #[test]
    fn rate_sets_period() {
        // 5 Hz at 1000 samples/s: one cycle is 200 ticks.
        let mut lfo = Lfo::new(1000.0);
        lfo.rate_hz = 5.0;
        for _ in 0..200 {
            lfo.tick();
        }
        assert!(
            lfo.phase() < 1e-9 || (1.0 - lfo.phase()) < 1e-9,
            "phase should complete a whole cycle, got {}",
            lfo.phase()
        );
    }

    #[test]
    fn reset_restarts_cycle() {
        let mut lfo = Lfo::new(1000.0);
        lfo.rate_hz = 3.0;
        for _ in 0..77 {
            lfo.tick();
        }
        lfo.reset();
        assert_eq!(lfo.phase(), 0.0);
        // Square starts in its high half.
        lfo.waveform = LfoWaveform::Square;
        assert_eq!(lfo.tick(), 1.0);
    }

    #[test]
    fn triangle_is_continuous() {
        let mut lfo = Lfo::new(1000.0);
        lfo.waveform = LfoWaveform::Triangle;
        lfo.rate_hz = 5.0;
        let mut prev = lfo.tick();
        for _ in 0..1000 {
            let v = lfo.tick();
            assert!((v - prev).abs() < 0.05, "triangle jumped {prev} -> {v}");
            prev = v;
        }
    }
}
