//! WAV file I/O — 16-bit stereo PCM via `hound`.
//!
//! Used by the timeline's save operation and by round-trip tests. Samples
//! are quantized with round-half-away like the rest of the PCM paths, so a
//! saved file reloads to exactly the values a listener heard.

use std::path::Path;

use crate::error::AudioError;

/// Quantize a float sample to i16 PCM.
#[inline]
pub fn to_pcm_i16(sample: f32) -> i16 {
    (sample as f64 * 32767.0).round().clamp(-32768.0, 32767.0) as i16
}

/// i16 PCM back to float in [-1, 1].
#[inline]
pub fn from_pcm_i16(sample: i16) -> f32 {
    (sample as f64 / 32767.0) as f32
}

/// Write stereo channels to a 16-bit PCM WAV file.
pub fn write_wav(
    path: &Path,
    left: &[f32],
    right: &[f32],
    sample_rate: u32,
) -> Result<(), AudioError> {
    let spec = hound::WavSpec {
        channels: 2,
        sample_rate,
        bits_per_sample: 16,
        sample_format: hound::SampleFormat::Int,
    };
    let mut writer = hound::WavWriter::create(path, spec)?;
    for i in 0..left.len().min(right.len()) {
        writer.write_sample(to_pcm_i16(left[i]))?;
        writer.write_sample(to_pcm_i16(right[i]))?;
    }
    writer.finalize()?;
    Ok(())
}

/// Read a 16-bit PCM WAV file back into stereo channels.
///
/// Mono files duplicate into both channels so everything downstream can
/// assume stereo.
pub fn read_wav(path: &Path) -> Result<(Vec<f32>, Vec<f32>, u32), AudioError> {
    let mut reader = hound::WavReader::open(path)?;
    let spec = reader.spec();
    if spec.bits_per_sample != 16 || spec.sample_format != hound::SampleFormat::Int {
        return Err(AudioError::Io(format!(
            "unsupported WAV format: {}-bit {:?}",
            spec.bits_per_sample, spec.sample_format
        )));
    }

    let samples: Result<Vec<i16>, _> = reader.samples::<i16>().collect();
    let samples = samples.map_err(AudioError::from)?;

    let (mut left, mut right) = (Vec::new(), Vec::new());
    match spec.channels {
        1 => {
            for &s in &samples {
                left.push(from_pcm_i16(s));
                right.push(from_pcm_i16(s));
            }
        }
        2 => {
            for frame in samples.chunks_exact(2) {
                left.push(from_pcm_i16(frame[0]));
                right.push(from_pcm_i16(frame[1]));
            }
        }
        n => return Err(AudioError::Io(format!("unsupported channel count {n}"))),
    }
    Ok((left, right, spec.sample_rate))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn quantization_is_symmetric_at_full_scale() {
        assert_eq!(to_pcm_i16(1.0), 32767);
        assert_eq!(to_pcm_i16(-1.0), -32767);
        assert_eq!(to_pcm_i16(0.0), 0);
    }

    #[test]
    fn pcm_survives_requantization() {
        // Once a value has been through i16 it must round-trip exactly.
        for raw in [-0.8f32, -0.25, 0.0, 0.33, 0.999] {
            let pcm = to_pcm_i16(raw);
            let reloaded = from_pcm_i16(pcm);
            assert_eq!(to_pcm_i16(reloaded), pcm);
        }
    }

    #[test]
    fn wav_round_trip_is_exact() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("roundtrip.wav");

        let left: Vec<f32> = (0..441)
            .map(|i| (i as f32 / 441.0 * std::f32::consts::TAU).sin() * 0.8)
            .collect();
        let right: Vec<f32> = left.iter().map(|s| -s).collect();

        write_wav(&path, &left, &right, 44100).unwrap();
        let (l2, r2, sr) = read_wav(&path).unwrap();

        assert_eq!(sr, 44100);
        assert_eq!(l2.len(), left.len());
        for i in 0..left.len() {
            assert_eq!(to_pcm_i16(l2[i]), to_pcm_i16(left[i]), "sample {i}");
            assert_eq!(to_pcm_i16(r2[i]), to_pcm_i16(right[i]), "sample {i}");
        }
    }

    #[test]
    fn missing_file_is_io_error() {
        let err = read_wav(Path::new("/nonexistent/nope.wav")).unwrap_err();
        assert!(matches!(err, AudioError::Io(_)));
    }
}
