//! Timeline recorder — slot-based accumulation of voice performances.
//!
//! A session buffers beat-sized renders at slot offsets; slots may be
//! revisited, layering additively. The session ends by playing the buffer,
//! saving it, or converting it into a sound bank entry. Only one session
//! exists at a time; the `AudioSystem` drives the actual rendering and
//! hands finished blocks here.

use tracing::{debug, warn};

use crate::error::AudioError;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum SessionState {
    Inactive,
    Recording,
}

#[derive(Debug)]
pub struct Timeline {
    sample_rate: f64,
    state: SessionState,
    tempo_bpm: f64,
    cursor_slot: u32,
    left: Vec<f32>,
    right: Vec<f32>,
}

impl Timeline {
    pub fn new(sample_rate: f64) -> Self {
        Timeline {
            sample_rate,
            state: SessionState::Inactive,
            tempo_bpm: 120.0,
            cursor_slot: 0,
            left: Vec::new(),
            right: Vec::new(),
        }
    }

    /// Begin a session, resetting the accumulation buffer and cursor.
    /// Restarting over an active session discards it.
    pub fn start(&mut self) {
        if self.state == SessionState::Recording {
            warn!("timeline restarted while recording; discarding session");
        }
        self.left.clear();
        self.right.clear();
        self.cursor_slot = 0;
        self.state = SessionState::Recording;
        debug!("timeline session started");
    }

    pub fn is_recording(&self) -> bool {
        self.state == SessionState::Recording
    }

    /// Tempo for the beat-to-sample conversion of subsequent slots.
    pub fn set_tempo(&mut self, bpm: f64) -> Result<(), AudioError> {
        if !(bpm > 0.0) || !bpm.is_finite() {
            return Err(AudioError::BadParameter(format!("tempo {bpm} BPM")));
        }
        self.tempo_bpm = bpm;
        Ok(())
    }

    pub fn tempo(&self) -> f64 {
        self.tempo_bpm
    }

    /// One beat, in samples, at the current tempo.
    pub fn beat_samples(&self) -> usize {
        (self.sample_rate * 60.0 / self.tempo_bpm) as usize
    }

    /// Additively mix a rendered block into the buffer at `slot`'s time
    /// offset, scaled by `volume`. Grows the buffer as needed.
    pub fn mix_slot(
        &mut self,
        slot: u32,
        left: &[f32],
        right: &[f32],
        volume: f64,
    ) -> Result<(), AudioError> {
        if self.state != SessionState::Recording {
            return Err(AudioError::NoSession);
        }
        let offset = slot as usize * self.beat_samples();
        let frames = left.len().min(right.len());
        let needed = offset + frames;
        if self.left.len() < needed {
            self.left.resize(needed, 0.0);
            self.right.resize(needed, 0.0);
        }
        let gain = volume as f32;
        for i in 0..frames {
            self.left[offset + i] += left[i] * gain;
            self.right[offset + i] += right[i] * gain;
        }
        Ok(())
    }

    /// The auto-advance cursor: returns the slot to write, then moves on.
    pub fn take_cursor(&mut self) -> u32 {
        let slot = self.cursor_slot;
        self.cursor_slot += 1;
        slot
    }

    pub fn cursor(&self) -> u32 {
        self.cursor_slot
    }

    pub fn frames(&self) -> usize {
        self.left.len()
    }

    pub fn buffers(&self) -> (&[f32], &[f32]) {
        (&self.left, &self.right)
    }

    /// End the session, handing the accumulated buffers to the caller.
    pub fn finish(&mut self) -> Result<(Vec<f32>, Vec<f32>), AudioError> {
        if self.state != SessionState::Recording {
            return Err(AudioError::NoSession);
        }
        self.state = SessionState::Inactive;
        debug!(frames = self.left.len(), "timeline session finished");
        Ok((
            std::mem::take(&mut self.left),
            std::mem::take(&mut self.right),
        ))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn beat_samples_follow_tempo() {
        let mut t = Timeline::new(44100.0);
        t.set_tempo(120.0).unwrap();
        assert_eq!(t.beat_samples(), 22050);
        t.set_tempo(60.0).unwrap();
        assert_eq!(t.beat_samples(), 44100);
    }

    #[test]
    fn rejects_bad_tempo() {
        let mut t = Timeline::new(44100.0);
        assert!(t.set_tempo(0.0).is_err());
        assert!(t.set_tempo(-10.0).is_err());
        assert_eq!(t.tempo(), 120.0);
    }

    #[test]
    fn slot_operations_require_session() {
        let mut t = Timeline::new(44100.0);
        let err = t.mix_slot(0, &[0.0; 4], &[0.0; 4], 1.0).unwrap_err();
        assert_eq!(err, AudioError::NoSession);
        assert!(t.finish().is_err());
    }

    #[test]
    fn slots_land_at_beat_offsets() {
        let mut t = Timeline::new(44100.0);
        t.start();
        t.set_tempo(120.0).unwrap();
        let beat = t.beat_samples();

        let block = vec![0.5f32; beat];
        t.mix_slot(0, &block, &block, 1.0).unwrap();
        t.mix_slot(1, &block, &block, 0.5).unwrap();

        let (l, _) = t.buffers();
        assert_eq!(l.len(), beat * 2);
        assert_eq!(l[0], 0.5);
        assert_eq!(l[beat - 1], 0.5);
        assert_eq!(l[beat], 0.25);
        assert_eq!(l[2 * beat - 1], 0.25);
    }

    #[test]
    fn revisited_slots_layer_additively() {
        let mut t = Timeline::new(44100.0);
        t.start();
        t.set_tempo(120.0).unwrap();
        let block = vec![0.25f32; 100];
        t.mix_slot(0, &block, &block, 1.0).unwrap();
        t.mix_slot(0, &block, &block, 1.0).unwrap();
        let (l, r) = t.buffers();
        assert_eq!(l[0], 0.5);
        assert_eq!(r[50], 0.5);
    }

    #[test]
    fn cursor_advances() {
        let mut t = Timeline::new(44100.0);
        t.start();
        assert_eq!(t.take_cursor(), 0);
        assert_eq!(t.take_cursor(), 1);
        assert_eq!(t.cursor(), 2);
    }

    #[test]
    fn restart_discards_previous_session() {
        let mut t = Timeline::new(44100.0);
        t.start();
        t.mix_slot(0, &[1.0; 10], &[1.0; 10], 1.0).unwrap();
        t.take_cursor();
        t.start();
        assert_eq!(t.frames(), 0);
        assert_eq!(t.cursor(), 0);
        assert!(t.is_recording());
    }

    #[test]
    fn finish_returns_buffers_and_deactivates() {
        let mut t = Timeline::new(44100.0);
        t.start();
        t.mix_slot(0, &[0.1; 8], &[0.2; 8], 1.0).unwrap();
        let (l, r) = t.finish().unwrap();
        assert_eq!(l.len(), 8);
        assert!((r[0] - 0.2).abs() < 1e-6);
        assert!(!t.is_recording());
        assert!(t.finish().is_err());
    }
}
