//! Channel mixing and sample-rate conversion.
//!
//! Whisper wants **16 kHz mono `f32`**; microphones deliver whatever their
//! native format is.  Capture downmixes with [`stereo_to_mono`] and the
//! Whisper transcriber converts with [`resample_to_16k`].  The resampler is
//! plain linear interpolation, which is adequate for speech.

/// Sample rate expected by Whisper.
pub const WHISPER_SAMPLE_RATE: u32 = 16_000;

/// Mix interleaved multi-channel audio down to mono by averaging each frame.
///
/// `channels == 0` yields an empty vector; a trailing partial frame is
/// dropped.
///
/// ```rust
/// use voice_chat::audio::stereo_to_mono;
///
/// let stereo = vec![1.0_f32, 0.0, 0.2, 0.4]; // L R L R
/// let mono = stereo_to_mono(&stereo, 2);
/// assert_eq!(mono.len(), 2);
/// assert!((mono[0] - 0.5).abs() < 1e-6);
/// assert!((mono[1] - 0.3).abs() < 1e-6);
/// ```
pub fn stereo_to_mono(samples: &[f32], channels: u16) -> Vec<f32> {
    match channels {
        0 => Vec::new(),
        1 => samples.to_vec(),
        n => {
            let n = usize::from(n);
            samples
                .chunks_exact(n)
                .map(|frame| frame.iter().sum::<f32>() / n as f32)
                .collect()
        }
    }
}

/// Resample `samples` from `from_rate` to `to_rate` Hz.
///
/// Output length is `ceil(len * to_rate / from_rate)`.  Equal rates and empty
/// input are returned unchanged.
pub fn resample_linear(samples: &[f32], from_rate: u32, to_rate: u32) -> Vec<f32> {
    if from_rate == to_rate || samples.is_empty() || from_rate == 0 || to_rate == 0 {
        return samples.to_vec();
    }

    let step = f64::from(from_rate) / f64::from(to_rate);
    let output_len = (samples.len() as f64 / step).ceil() as usize;
    let last = samples.len() - 1;

    (0..output_len)
        .map(|i| {
            let pos = i as f64 * step;
            let idx = (pos as usize).min(last);
            let next = (idx + 1).min(last);
            let frac = (pos - idx as f64) as f32;
            samples[idx] + (samples[next] - samples[idx]) * frac
        })
        .collect()
}

/// Resample to [`WHISPER_SAMPLE_RATE`].
///
/// ```rust
/// use voice_chat::audio::resample_to_16k;
///
/// let hi = vec![0.5_f32; 480]; // 10 ms @ 48 kHz
/// assert_eq!(resample_to_16k(&hi, 48_000).len(), 160);
/// ```
pub fn resample_to_16k(samples: &[f32], source_rate: u32) -> Vec<f32> {
    resample_linear(samples, source_rate, WHISPER_SAMPLE_RATE)
}

/// Root-mean-square amplitude of `samples`, `0.0` for an empty slice.
pub fn rms(samples: &[f32]) -> f32 {
    if samples.is_empty() {
        return 0.0;
    }
    let sum_sq: f32 = samples.iter().map(|s| s * s).sum();
    (sum_sq / samples.len() as f32).sqrt()
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
