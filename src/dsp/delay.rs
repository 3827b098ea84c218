//! Per-voice feedback delay line.

/// Maximum supported delay time in seconds; sizes the buffer.
pub const MAX_DELAY_SECONDS: f64 = 2.0;

/// A mono delay with feedback and dry/wet mix, owned by a single voice.
///
/// Reads interpolate linearly between adjacent samples when the configured
/// time lands between integer offsets, so time changes at runtime stay
/// glitch-free. All index arithmetic is modulo the buffer length.
#[derive(Debug, Clone)]
pub struct Delay {
    pub enabled: bool,
    /// Delay time in seconds, clamped to [0, MAX_DELAY_SECONDS].
    time: f64,
    /// Feedback in [0, 0.99).
    pub feedback: f64,
    /// Dry/wet mix in [0, 1].
    pub mix: f64,

    buffer: Vec<f64>,
    write_pos: usize,
    sample_rate: f64,
}

impl Delay {
    pub fn new(sample_rate: f64) -> Self {
        let size = (sample_rate * MAX_DELAY_SECONDS) as usize + 2;
        Delay {
            enabled: false,
            time: 0.25,
            feedback: 0.3,
            mix: 0.5,
            buffer: vec![0.0; size],
            write_pos: 0,
            sample_rate,
        }
    }

    pub fn set_time(&mut self, seconds: f64) {
        self.time = seconds.clamp(0.0, MAX_DELAY_SECONDS);
    }

    pub fn time(&self) -> f64 {
        self.time
    }

    /// Process one sample. Disabled delays pass the input straight through
    /// but keep writing, so toggling `enabled` cannot click.
    #[inline]
    pub fn process(&mut self, input: f64) -> f64 {
        let len = self.buffer.len();
        let offset = (self.time * self.sample_rate).clamp(1.0, (len - 2) as f64);

        let read = self.write_pos as f64 - offset;
        let read = if read < 0.0 { read + len as f64 } else { read };
        let i0 = read as usize % len;
        let i1 = (i0 + 1) % len;
        let frac = read - read.floor();
        let delayed = self.buffer[i0] * (1.0 - frac) + self.buffer[i1] * frac;

        self.buffer[self.write_pos] = input + delayed * self.feedback;
        self.write_pos = (self.write_pos + 1) % len;

        if self.enabled {
            input * (1.0 - self.mix) + delayed * self.mix
        } else {
            input
        }
    }

    /// Zero the buffer.
    pub fn clear(&mut self) {
        self.buffer.fill(0.0);
        self.write_pos = 0;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn disabled_passes_through() {
        let mut d = Delay::new(44100.0);
        assert_eq!(d.process(0.5), 0.5);
    }

    #[test]
    fn dry_mix_passes_through() {
        let mut d = Delay::new(44100.0);
        d.enabled = true;
        d.mix = 0.0;
        d.feedback = 0.0;
        let out = d.process(0.5);
        assert!((out - 0.5).abs() < 1e-9);
    }

    #[test]
    fn impulse_appears_after_delay_time() {
        let sr = 44100.0;
        let mut d = Delay::new(sr);
        d.enabled = true;
        d.set_time(0.01); // 441 samples
        d.feedback = 0.0;
        d.mix = 1.0;

        d.process(1.0);
        let delay_samples = (0.01 * sr) as usize;
        for _ in 1..delay_samples {
            let out = d.process(0.0);
            assert!(out.abs() < 1e-6, "early output should be silent");
        }
        let out = d.process(0.0);
        assert!((out - 1.0).abs() < 1e-6, "echo expected at delay time, got {out}");
    }

    #[test]
    fn echoes_scale_by_feedback_powers() {
        // Impulse response: echo n carries feedback^n.
        let sr = 1000.0;
        let mut d = Delay::new(sr);
        d.enabled = true;
        d.set_time(0.01); // 10 samples
        d.feedback = 0.5;
        d.mix = 1.0;

        d.process(1.0);
        let mut echoes = Vec::new();
        for _ in 0..50 {
            let out = d.process(0.0);
            if out.abs() > 1e-9 {
                echoes.push(out);
            }
        }
        assert!(echoes.len() >= 4);
        for (n, &echo) in echoes.iter().take(4).enumerate() {
            let expected = 0.5_f64.powi(n as i32);
            assert!(
                (echo - expected).abs() < 1e-6,
                "echo {n} should be {expected}, got {echo}"
            );
        }
        // And the train decays below a noise floor.
        assert!(echoes.last().unwrap().abs() < 0.1);
    }

    #[test]
    fn fractional_time_interpolates() {
        let sr = 1000.0;
        let mut d = Delay::new(sr);
        d.enabled = true;
        d.set_time(0.0105); // 10.5 samples
        d.feedback = 0.0;
        d.mix = 1.0;

        d.process(1.0);
        let mut peak = 0.0_f64;
        let mut total = 0.0;
        for _ in 0..20 {
            let out = d.process(0.0);
            peak = peak.max(out.abs());
            total += out;
        }
        // The impulse is split across two adjacent taps of ~0.5 each.
        assert!(peak < 0.75, "interpolated echo should be split, peak {peak}");
        assert!((total - 1.0).abs() < 1e-6, "energy must be conserved, got {total}");
    }

    #[test]
    fn runtime_time_change_does_not_blow_up() {
        let mut d = Delay::new(44100.0);
        d.enabled = true;
        d.feedback = 0.9;
        d.mix = 0.5;
        for i in 0..10000 {
            if i % 100 == 0 {
                d.set_time((i % 1900) as f64 / 1000.0);
            }
            let out = d.process(if i == 0 { 1.0 } else { 0.0 });
            assert!(out.is_finite());
        }
    }
}
