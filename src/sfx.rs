//! Procedural one-shot sound effects.
//!
//! Each generator renders a mono buffer directly, touching no voice state,
//! and the caller registers the result in the sound bank. All
//! noise comes from seeded generators so the same call always produces the
//! same asset.

use std::f64::consts::TAU;

use crate::bank::{SoundAsset, SoundSource};

/// Durations are clamped into this range.
const MIN_DURATION: f64 = 0.01;
const MAX_DURATION: f64 = 10.0;

fn frames(sample_rate: f64, duration: f64) -> usize {
    (sample_rate * duration.clamp(MIN_DURATION, MAX_DURATION)) as usize
}

/// Short linear fade-in/out envelope that keeps one-shots click-free.
fn fade_env(t: f64, duration: f64, edge: f64) -> f64 {
    let fade = edge.min(duration / 4.0);
    if t < fade {
        t / fade
    } else if t > duration - fade {
        ((duration - t) / fade).max(0.0)
    } else {
        1.0
    }
}

/// Exponential interpolation between two positive frequencies.
fn exp_sweep(from: f64, to: f64, progress: f64) -> f64 {
    from * (to / from).powf(progress.clamp(0.0, 1.0))
}

/// Render `n` frames by integrating a per-sample frequency function into a
/// phase accumulator, shaping with `wave` and `amp`.
fn render_swept(
    sample_rate: f64,
    n: usize,
    mut freq_at: impl FnMut(f64) -> f64,
    mut wave: impl FnMut(f64) -> f64,
    mut amp: impl FnMut(f64) -> f64,
) -> Vec<f32> {
    let mut out = Vec::with_capacity(n);
    let mut phase = 0.0_f64;
    let duration = n as f64 / sample_rate;
    for i in 0..n {
        let t = i as f64 / sample_rate;
        let progress = t / duration;
        out.push((wave(phase) * amp(progress)) as f32);
        phase += freq_at(progress) / sample_rate;
        if phase >= 1.0 {
            phase -= phase.floor();
        }
    }
    out
}

fn square(phase: f64) -> f64 {
    if phase < 0.5 { 1.0 } else { -1.0 }
}

fn sine(phase: f64) -> f64 {
    (TAU * phase).sin()
}

/// Plain square-wave beep at a fixed frequency.
pub fn beep(sample_rate: f64, frequency: f64, duration: f64) -> SoundAsset {
    let freq = frequency.clamp(20.0, 10_000.0);
    let n = frames(sample_rate, duration);
    let dur = n as f64 / sample_rate;
    let samples = render_swept(
        sample_rate,
        n,
        |_| freq,
        square,
        |p| 0.5 * fade_env(p * dur, dur, 0.005),
    );
    SoundAsset::mono(samples, sample_rate as u32, SoundSource::Beep)
}

/// Short sine blip with a fast decay.
pub fn blip(sample_rate: f64, pitch: f64, duration: f64) -> SoundAsset {
    let freq = pitch.clamp(20.0, 10_000.0);
    let n = frames(sample_rate, duration);
    let samples = render_swept(
        sample_rate,
        n,
        |_| freq,
        sine,
        |p| 0.8 * (-6.0 * p).exp(),
    );
    SoundAsset::mono(samples, sample_rate as u32, SoundSource::Blip)
}

/// Noise click; `sharpness` in [0, 1] shortens the transient.
pub fn click(sample_rate: f64, sharpness: f64, duration: f64) -> SoundAsset {
    let sharp = sharpness.clamp(0.0, 1.0);
    let n = frames(sample_rate, duration);
    let mut rng = fastrand::Rng::with_seed(0xC11C);
    let decay = 20.0 + 200.0 * sharp;
    let mut samples = Vec::with_capacity(n);
    let duration = n as f64 / sample_rate;
    for i in 0..n {
        let p = i as f64 / sample_rate / duration;
        let noise = rng.f64() * 2.0 - 1.0;
        samples.push((noise * (-decay * p).exp() * 0.9) as f32);
    }
    SoundAsset::mono(samples, sample_rate as u32, SoundSource::Click)
}

/// Laser zap: a square wave diving three octaves from `frequency`.
pub fn zap(sample_rate: f64, frequency: f64, duration: f64) -> SoundAsset {
    let start = frequency.clamp(100.0, 10_000.0);
    let n = frames(sample_rate, duration);
    let samples = render_swept(
        sample_rate,
        n,
        |p| exp_sweep(start, start / 8.0, p),
        square,
        |p| 0.5 * (-3.0 * p).exp(),
    );
    SoundAsset::mono(samples, sample_rate as u32, SoundSource::Zap)
}

/// Explosion: decaying noise, lowpassed harder for larger blasts.
pub fn explode(sample_rate: f64, size: f64, duration: f64) -> SoundAsset {
    let size = size.clamp(0.0, 1.0);
    let n = frames(sample_rate, duration);
    let mut rng = fastrand::Rng::with_seed(0xB00F);
    // Bigger explosions are darker: stronger one-pole smoothing.
    let coeff = 0.6 - 0.55 * size;
    let mut state = 0.0_f64;
    let duration = n as f64 / sample_rate;
    let mut samples = Vec::with_capacity(n);
    for i in 0..n {
        let p = i as f64 / sample_rate / duration;
        let noise = rng.f64() * 2.0 - 1.0;
        state = coeff * noise + (1.0 - coeff) * state;
        let amp = (1.0 - p).powi(2) * (0.7 + 0.3 * size);
        samples.push((state * amp * 0.9) as f32);
    }
    SoundAsset::mono(samples, sample_rate as u32, SoundSource::Explode)
}

/// Pickup chime: two ascending tones; `brightness` leans square-ward.
pub fn pickup(sample_rate: f64, brightness: f64, duration: f64) -> SoundAsset {
    let bright = brightness.clamp(0.0, 1.0);
    let base = 700.0 + 500.0 * bright;
    let n = frames(sample_rate, duration);
    let samples = render_swept(
        sample_rate,
        n,
        move |p| if p < 0.4 { base } else { base * 1.5 },
        move |phase| sine(phase) * (1.0 - bright) + square(phase) * bright * 0.6,
        |p| 0.6 * (-2.5 * p).exp(),
    );
    SoundAsset::mono(samples, sample_rate as u32, SoundSource::Pickup)
}

/// Hurt/damage: downward square sweep with noise grit scaled by severity.
pub fn hurt(sample_rate: f64, severity: f64, duration: f64) -> SoundAsset {
    let severity = severity.clamp(0.0, 1.0);
    let start = 400.0 + 400.0 * severity;
    let n = frames(sample_rate, duration);
    let mut rng = fastrand::Rng::with_seed(0x4247);
    let mut samples = render_swept(
        sample_rate,
        n,
        move |p| exp_sweep(start, start * 0.25, p),
        square,
        |p| 0.5 * (-4.0 * p).exp(),
    );
    for s in &mut samples {
        let noise = (rng.f64() * 2.0 - 1.0) as f32;
        *s += noise * (0.15 * severity) as f32;
    }
    SoundAsset::mono(samples, sample_rate as u32, SoundSource::Hurt)
}

/// Sine sweep from `start_freq` down to `end_freq` over the duration.
pub fn sweep_down(
    sample_rate: f64,
    start_freq: f64,
    end_freq: f64,
    duration: f64,
) -> SoundAsset {
    let start = start_freq.clamp(20.0, 15_000.0);
    let end = end_freq.clamp(20.0, 15_000.0);
    let n = frames(sample_rate, duration);
    let dur = n as f64 / sample_rate;
    let samples = render_swept(
        sample_rate,
        n,
        move |p| exp_sweep(start, end, p),
        sine,
        |p| 0.6 * fade_env(p * dur, dur, 0.01),
    );
    SoundAsset::mono(samples, sample_rate as u32, SoundSource::SweepDown)
}

/// Coin jingle: a short square note stepping up a fourth, then ringing out.
pub fn coin(sample_rate: f64, pitch: f64, duration: f64) -> SoundAsset {
    let base = pitch.clamp(100.0, 5_000.0);
    let n = frames(sample_rate, duration);
    let samples = render_swept(
        sample_rate,
        n,
        move |p| if p < 0.15 { base } else { base * 4.0 / 3.0 },
        square,
        |p| {
            let level = if p < 0.15 { 1.0 } else { (-3.0 * (p - 0.15)).exp() };
            0.4 * level
        },
    );
    SoundAsset::mono(samples, sample_rate as u32, SoundSource::Coin)
}

/// Power-up: rising sweep with vibrato; `intensity` widens both.
pub fn powerup(sample_rate: f64, intensity: f64, duration: f64) -> SoundAsset {
    let intensity = intensity.clamp(0.0, 1.0);
    let base = 300.0;
    let top = base * (2.0 + 2.0 * intensity);
    let vibrato_depth = 0.02 + 0.05 * intensity;
    let n = frames(sample_rate, duration);
    let dur = n as f64 / sample_rate;
    let samples = render_swept(
        sample_rate,
        n,
        move |p| {
            let vibrato = 1.0 + vibrato_depth * (TAU * 18.0 * p * dur).sin();
            exp_sweep(base, top, p) * vibrato
        },
        square,
        |p| 0.45 * fade_env(p * dur, dur, 0.01),
    );
    SoundAsset::mono(samples, sample_rate as u32, SoundSource::Powerup)
}
