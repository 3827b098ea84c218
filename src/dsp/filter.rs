//! Shared filter bus — one biquad serving every filter-routed voice.
//!
//! The engine exposes a single type/cutoff/resonance control surface;
//! voices opt in individually. Coefficients follow the Audio EQ Cookbook
//! (Robert Bristow-Johnson) and are recomputed only at block boundaries so
//! parameter changes cannot glitch mid-block.

use std::f64::consts::PI;

use serde::{Deserialize, Serialize};

/// Filter response selected on the shared bus.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FilterType {
    None,
    Lowpass,
    Highpass,
    Bandpass,
}

/// The shared second-order filter stage.
///
/// State is Direct Form II Transposed. `resonance` is the public [0, 1]
/// control and maps onto biquad Q in [0.707, 10].
#[derive(Debug, Clone)]
pub struct FilterBus {
    pub filter_type: FilterType,
    pub enabled: bool,
    cutoff_hz: f64,
    resonance: f64,

    b0: f64,
    b1: f64,
    b2: f64,
    a1: f64,
    a2: f64,
    z1: f64,
    z2: f64,

    sample_rate: f64,
    /// Cutoff (including modulation) the coefficients were computed for.
    computed_cutoff: f64,
    dirty: bool,
}

impl FilterBus {
    pub fn new(sample_rate: f64) -> Self {
        let mut bus = FilterBus {
            filter_type: FilterType::None,
            enabled: true,
            cutoff_hz: 1000.0,
            resonance: 0.0,
            b0: 1.0,
            b1: 0.0,
            b2: 0.0,
            a1: 0.0,
            a2: 0.0,
            z1: 0.0,
            z2: 0.0,
            sample_rate,
            computed_cutoff: 1000.0,
            dirty: true,
        };
        bus.recompute(bus.cutoff_hz);
        bus
    }

    pub fn set_type(&mut self, filter_type: FilterType) {
        if self.filter_type != filter_type {
            self.filter_type = filter_type;
            self.dirty = true;
        }
    }

    pub fn set_cutoff(&mut self, cutoff_hz: f64) {
        self.cutoff_hz = cutoff_hz.clamp(10.0, self.sample_rate * 0.45);
        self.dirty = true;
    }

    pub fn cutoff(&self) -> f64 {
        self.cutoff_hz
    }

    pub fn set_resonance(&mut self, resonance: f64) {
        self.resonance = resonance.clamp(0.0, 1.0);
        self.dirty = true;
    }

    pub fn resonance(&self) -> f64 {
        self.resonance
    }

    /// Called once per render block with the summed LFO cutoff offset in
    /// Hz. Coefficients are refreshed here and nowhere else.
    pub fn begin_block(&mut self, cutoff_mod_hz: f64) {
        let target = (self.cutoff_hz + cutoff_mod_hz).clamp(10.0, self.sample_rate * 0.45);
        if self.dirty || target != self.computed_cutoff {
            self.recompute(target);
        }
    }

    /// Whether routed voices should pass through `process`.
    pub fn is_active(&self) -> bool {
        self.enabled && self.filter_type != FilterType::None
    }

    /// Process one sample. Callers check `is_active` first; a `None` type
    /// passes through unchanged regardless.
    #[inline]
    pub fn process(&mut self, input: f64) -> f64 {
        if !self.is_active() {
            return input;
        }
        let output = self.b0 * input + self.z1;
        self.z1 = self.b1 * input - self.a1 * output + self.z2;
        self.z2 = self.b2 * input - self.a2 * output;
        output
    }

    /// Clear the delay state without touching parameters.
    pub fn reset(&mut self) {
        self.z1 = 0.0;
        self.z2 = 0.0;
    }

    fn recompute(&mut self, cutoff: f64) {
        self.computed_cutoff = cutoff;
        self.dirty = false;

        let q = 0.707 + self.resonance * (10.0 - 0.707);
        let w0 = 2.0 * PI * cutoff / self.sample_rate;
        let cos_w0 = w0.cos();
        let sin_w0 = w0.sin();
        let alpha = sin_w0 / (2.0 * q);

        let (b0, b1, b2, a0, a1, a2) = match self.filter_type {
            FilterType::None => (1.0, 0.0, 0.0, 1.0, 0.0, 0.0),
            FilterType::Lowpass => {
                let b1 = 1.0 - cos_w0;
                let b0 = b1 / 2.0;
                (b0, b1, b0, 1.0 + alpha, -2.0 * cos_w0, 1.0 - alpha)
            }
            FilterType::Highpass => {
                let b0 = (1.0 + cos_w0) / 2.0;
                let b1 = -(1.0 + cos_w0);
                (b0, b1, b0, 1.0 + alpha, -2.0 * cos_w0, 1.0 - alpha)
            }
            FilterType::Bandpass => {
                (alpha, 0.0, -alpha, 1.0 + alpha, -2.0 * cos_w0, 1.0 - alpha)
            }
        };

        self.b0 = b0 / a0;
        self.b1 = b1 / a0;
        self.b2 = b2 / a0;
        self.a1 = a1 / a0;
        self.a2 = a2 / a0;
    }
}
