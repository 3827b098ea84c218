//! ADSR envelope generator.

/// Envelope stages.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Stage {
    Idle,
    Attack,
    Decay,
    Sustain,
    Release,
}

/// ADSR envelope with linear segments.
///
/// Gate-on enters Attack starting from the *current* level rather than
/// zero, so retriggering an active note never produces a level
/// discontinuity. Gate-off from any non-idle stage enters Release.
#[derive(Debug, Clone)]
pub struct Envelope {
    /// Attack time in seconds.
    pub attack: f64,
    /// Decay time in seconds.
    pub decay: f64,
    /// Sustain level, clamped to [0, 1].
    pub sustain: f64,
    /// Release time in seconds.
    pub release: f64,

    stage: Stage,
    level: f64,
    sample_rate: f64,
    /// Length of the running segment in samples.
    segment_len: usize,
    /// Position within the running segment.
    segment_pos: usize,
    /// Level captured when the running segment began.
    segment_from: f64,
}

impl Envelope {
    pub fn new(sample_rate: f64) -> Self {
        Envelope {
            attack: 0.01,
            decay: 0.1,
            sustain: 0.7,
            release: 0.3,
            stage: Stage::Idle,
            level: 0.0,
            sample_rate,
            segment_len: 0,
            segment_pos: 0,
            segment_from: 0.0,
        }
    }

    /// Configure all four parameters at once. Sustain is clamped to [0, 1];
    /// negative times are treated as zero.
    pub fn set_adsr(&mut self, attack: f64, decay: f64, sustain: f64, release: f64) {
        self.attack = attack.max(0.0);
        self.decay = decay.max(0.0);
        self.sustain = sustain.clamp(0.0, 1.0);
        self.release = release.max(0.0);
    }

    /// Gate rising edge: begin Attack from the current level.
    pub fn gate_on(&mut self) {
        self.begin_segment(Stage::Attack, self.attack);
    }

    /// Gate falling edge: begin Release from the current level.
    pub fn gate_off(&mut self) {
        if self.stage == Stage::Idle {
            return;
        }
        self.begin_segment(Stage::Release, self.release);
    }

    /// Advance one tick and return the level in [0, 1].
    pub fn next_sample(&mut self) -> f64 {
        match self.stage {
            Stage::Idle => {
                self.level = 0.0;
            }
            Stage::Attack => {
                self.step_towards(1.0);
                if self.segment_done() {
                    self.level = 1.0;
                    self.begin_segment(Stage::Decay, self.decay);
                }
            }
            Stage::Decay => {
                let target = self.sustain;
                self.step_towards(target);
                if self.segment_done() {
                    self.level = target;
                    self.stage = Stage::Sustain;
                }
            }
            Stage::Sustain => {
                self.level = self.sustain;
            }
            Stage::Release => {
                self.step_towards(0.0);
                if self.segment_done() {
                    self.level = 0.0;
                    self.stage = Stage::Idle;
                }
            }
        }
        self.level
    }

    /// Current output level without advancing.
    pub fn level(&self) -> f64 {
        self.level
    }

    pub fn stage(&self) -> Stage {
        self.stage
    }

    /// True once Release has run out (or the envelope never started).
    pub fn is_finished(&self) -> bool {
        self.stage == Stage::Idle
    }

    /// True in any stage other than Idle.
    pub fn is_active(&self) -> bool {
        self.stage != Stage::Idle
    }

    /// Hard reset to Idle at level 0.
    pub fn reset(&mut self) {
        self.stage = Stage::Idle;
        self.level = 0.0;
        self.segment_pos = 0;
        self.segment_len = 0;
    }

    fn begin_segment(&mut self, stage: Stage, seconds: f64) {
        self.stage = stage;
        self.segment_len = (seconds * self.sample_rate) as usize;
        self.segment_pos = 0;
        self.segment_from = self.level;
    }

    fn step_towards(&mut self, target: f64) {
        if self.segment_len == 0 {
            self.level = target;
            return;
        }
        self.segment_pos += 1;
        let t = self.segment_pos as f64 / self.segment_len as f64;
        self.level = self.segment_from + (target - self.segment_from) * t;
    }

    fn segment_done(&self) -> bool {
        self.segment_pos >= self.segment_len
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn starts_idle() {
        let env = Envelope::new(44100.0);
        assert!(env.is_finished());
        assert_eq!(env.stage(), Stage::Idle);
    }

    #[test]
    fn attack_reaches_full_level() {
        let mut env = Envelope::new(44100.0);
        env.attack = 0.01; // 441 samples
        env.gate_on();

        let mut max_level: f64 = 0.0;
        for _ in 0..500 {
            max_level = max_level.max(env.next_sample());
        }
        assert!(
            (max_level - 1.0).abs() < 0.01,
            "attack should reach ~1.0, got {max_level}"
        );
    }

    #[test]
    fn sustain_holds_level() {
        let mut env = Envelope::new(44100.0);
        env.set_adsr(0.001, 0.001, 0.6, 0.3);
        env.gate_on();

        for _ in 0..500 {
            env.next_sample();
        }
        let s = env.next_sample();
        assert!((s - 0.6).abs() < 0.01, "should sustain at 0.6, got {s}");
        assert_eq!(env.stage(), Stage::Sustain);
    }

    #[test]
    fn release_reaches_zero_within_release_time() {
        let sr = 44100.0;
        let mut env = Envelope::new(sr);
        env.set_adsr(0.001, 0.001, 0.7, 0.01);
        env.gate_on();
        for _ in 0..500 {
            env.next_sample();
        }

        env.gate_off();
        // release = 0.01s = 441 ticks; allow a couple extra.
        let ticks = (0.01 * sr) as usize + 2;
        for _ in 0..ticks {
            env.next_sample();
        }
        assert!(env.is_finished(), "should be idle after release elapses");
        assert_eq!(env.level(), 0.0);
    }

    #[test]
    fn idle_is_retriggerable() {
        let mut env = Envelope::new(44100.0);
        env.set_adsr(0.001, 0.001, 0.5, 0.001);
        for _ in 0..2 {
            env.gate_on();
            for _ in 0..300 {
                env.next_sample();
            }
            env.gate_off();
            for _ in 0..300 {
                env.next_sample();
            }
            assert!(env.is_finished());
        }
    }

    #[test]
    fn retrigger_continues_from_current_level() {
        let mut env = Envelope::new(44100.0);
        env.set_adsr(0.01, 0.1, 0.8, 0.3);
        env.gate_on();
        for _ in 0..600 {
            env.next_sample();
        }
        let before = env.level();
        assert!(before > 0.5);

        // Retrigger mid-note: the next sample must not collapse to 0.
        env.gate_on();
        let after = env.next_sample();
        assert!(
            after >= before - 0.01,
            "retrigger must not drop the level ({before} -> {after})"
        );
    }

    #[test]
    fn sustain_clamped() {
        let mut env = Envelope::new(44100.0);
        env.set_adsr(0.01, 0.01, 3.5, 0.1);
        assert_eq!(env.sustain, 1.0);
        env.set_adsr(0.01, 0.01, -1.0, 0.1);
        assert_eq!(env.sustain, 0.0);
    }

    #[test]
    fn full_cycle_stays_in_range() {
        let mut env = Envelope::new(44100.0);
        env.set_adsr(0.01, 0.05, 0.5, 0.1);
        env.gate_on();
        for _ in 0..10000 {
            let s = env.next_sample();
            assert!((0.0..=1.0).contains(&s), "envelope out of range: {s}");
        }
        env.gate_off();
        for _ in 0..10000 {
            let s = env.next_sample();
            assert!((0.0..=1.0).contains(&s), "envelope out of range: {s}");
        }
        assert!(env.is_finished());
    }

    #[test]
    fn zero_length_segments_jump_instantly() {
        let mut env = Envelope::new(44100.0);
        env.set_adsr(0.0, 0.0, 0.4, 0.0);
        env.gate_on();
        env.next_sample();
        env.next_sample();
        assert!((env.level() - 0.4).abs() < 1e-9);
        env.gate_off();
        env.next_sample();
        assert!(env.is_finished());
    }
}
