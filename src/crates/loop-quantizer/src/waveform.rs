//! Coarse amplitude envelopes for waveform display
//!
//! The sample buffer is split into a fixed number of buckets and each bucket
//! becomes one point whose amplitude blends RMS loudness with the peak, so
//! transients stay visible without dominating the outline.

use log::warn;
use serde::Serialize;

const RMS_WEIGHT: f64 = 0.7;
const PEAK_WEIGHT: f64 = 0.3;
const DISPLAY_GAIN: f64 = 2.0;

/// Amplitude of every point in a fallback envelope
pub const FALLBACK_AMPLITUDE: f32 = 0.1;

/// Span covered by a fallback envelope when the real duration is unknown
pub const FALLBACK_DURATION_SECONDS: f64 = 1.0;

#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct WaveformPoint {
    pub time_seconds: f64,
    /// 0.0..=1.0
    pub amplitude: f32,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct WaveformEnvelope {
    pub points: Vec<WaveformPoint>,
    pub duration_seconds: f64,
    /// Set when there was no audio to analyze and the points are synthetic
    pub is_fallback: bool,
}

impl WaveformEnvelope {
    /// A flat, quiet envelope for audio that could not be analyzed
    pub fn fallback(point_count: usize, duration_seconds: f64) -> Self {
        let point_count = point_count.max(1);
        let duration_seconds = if duration_seconds.is_finite() && duration_seconds > 0.0 {
            duration_seconds
        } else {
            FALLBACK_DURATION_SECONDS
        };

        let points = (0..point_count)
            .map(|i| WaveformPoint {
                time_seconds: point_time(i, point_count, duration_seconds),
                amplitude: FALLBACK_AMPLITUDE,
            })
            .collect();

        WaveformEnvelope {
            points,
            duration_seconds,
            is_fallback: true,
        }
    }

    pub fn len(&self) -> usize {
        self.points.len()
    }

    pub fn is_empty(&self) -> bool {
        self.points.is_empty()
    }

    /// Loudest point
    pub fn peak(&self) -> f32 {
        self.points.iter().map(|p| p.amplitude).fold(0.0, f32::max)
    }

    /// Points with `start <= time < end`, for a zoomed view
    pub fn window(&self, start: f64, end: f64) -> &[WaveformPoint] {
        let from = self.points.partition_point(|p| p.time_seconds < start);
        let to = self.points.partition_point(|p| p.time_seconds < end).max(from);
        &self.points[from..to]
    }
}

fn point_time(index: usize, point_count: usize, duration_seconds: f64) -> f64 {
    index as f64 / point_count as f64 * duration_seconds
}

fn bucket_amplitude(bucket: &[f32]) -> f32 {
    if bucket.is_empty() {
        return 0.0;
    }

    let mut sum_squares = 0.0f64;
    let mut peak = 0.0f64;
    for &sample in bucket {
        // Non-finite samples count as silence
        let sample = if sample.is_finite() {
            f64::from(sample.clamp(-1.0, 1.0))
        } else {
            0.0
        };
        sum_squares += sample * sample;
        peak = peak.max(sample.abs());
    }

    let rms = (sum_squares / bucket.len() as f64).sqrt();
    ((RMS_WEIGHT * rms + PEAK_WEIGHT * peak) * DISPLAY_GAIN).clamp(0.0, 1.0) as f32
}

/// Samples per bucket, rounding up
fn samples_per_bucket(sample_count: usize, point_count: usize) -> usize {
    sample_count.div_ceil(point_count)
}

/// Reduce mono `samples` to `point_count` envelope points.
///
/// Buckets hold `ceil(len / point_count)` samples, so the last non-empty
/// bucket may be short and buckets past the end of the audio are silent.
/// Empty input or an unknown sample rate yields [`WaveformEnvelope::fallback`].
pub fn analyze(samples: &[f32], sample_rate: u32, point_count: usize) -> WaveformEnvelope {
    let point_count = point_count.max(1);

    if samples.is_empty() || sample_rate == 0 {
        warn!(
            "No audio to analyze ({} samples at {} Hz); using a flat waveform",
            samples.len(),
            sample_rate
        );
        return WaveformEnvelope::fallback(point_count, FALLBACK_DURATION_SECONDS);
    }

    let duration_seconds = samples.len() as f64 / f64::from(sample_rate);
    let bucket_size = samples_per_bucket(samples.len(), point_count);

    let points = (0..point_count)
        .map(|i| {
            let start = i.saturating_mul(bucket_size).min(samples.len());
            let end = (start + bucket_size).min(samples.len());
            WaveformPoint {
                time_seconds: point_time(i, point_count, duration_seconds),
                amplitude: bucket_amplitude(&samples[start..end]),
            }
        })
        .collect();

    WaveformEnvelope {
        points,
        duration_seconds,
        is_fallback: false,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    #[test]
    fn test_point_count_and_times() {
        let samples = vec![0.5f32; 1000];
        let envelope = analyze(&samples, 1000, 4);
        assert_eq!(envelope.len(), 4);
        assert_eq!(envelope.duration_seconds, 1.0);
        let times: Vec<_> = envelope.points.iter().map(|p| p.time_seconds).collect();
        assert_eq!(times, vec![0.0, 0.25, 0.5, 0.75]);
    }

    #[test]
    fn test_blended_amplitude() {
        // Constant 0.25: rms = peak = 0.25, so (0.7 + 0.3) * 0.25 * 2 = 0.5
        let envelope = analyze(&[0.25, -0.25, 0.25, -0.25], 4, 1);
        assert!((envelope.points[0].amplitude - 0.5).abs() < 1e-6);

        // A single spike: rms = 0.5, peak = 1.0 → (0.35 + 0.3) * 2 clamps to 1
        let envelope = analyze(&[1.0, 0.0, 0.0, 0.0], 4, 1);
        assert_eq!(envelope.points[0].amplitude, 1.0);

        let envelope = analyze(&[0.0; 8], 4, 2);
        assert_eq!(envelope.peak(), 0.0);
    }

    #[test]
    fn test_uneven_buckets() {
        // 10 samples into 4 buckets of 3: the last bucket holds one sample
        let mut samples = vec![0.0f32; 10];
        samples[9] = 0.1;
        let envelope = analyze(&samples, 10, 4);
        assert_eq!(envelope.len(), 4);
        assert!(envelope.points[3].amplitude > 0.0);
        assert!(envelope.points[..3].iter().all(|p| p.amplitude == 0.0));
    }

    #[test]
    fn test_samples_per_bucket_at_usize_bounds() {
        assert_eq!(samples_per_bucket(10, 4), 3);
        assert_eq!(samples_per_bucket(3, 8), 1);
        assert_eq!(samples_per_bucket(usize::MAX, usize::MAX), 1);
        assert_eq!(samples_per_bucket(usize::MAX, 2), usize::MAX / 2 + 1);
        assert_eq!(samples_per_bucket(0, usize::MAX), 0);
    }

    #[test]
    fn test_more_points_than_samples() {
        let envelope = analyze(&[0.5, 0.5, 0.5], 3, 8);
        assert_eq!(envelope.len(), 8);
        assert!(envelope.points[2].amplitude > 0.0);
        assert!(envelope.points[3..].iter().all(|p| p.amplitude == 0.0));
        assert!(!envelope.is_fallback);
    }

    #[test]
    fn test_empty_input_falls_back() {
        let envelope = analyze(&[], 44_100, 100);
        assert!(envelope.is_fallback);
        assert_eq!(envelope.len(), 100);
        assert!(envelope.points.iter().all(|p| p.amplitude == FALLBACK_AMPLITUDE));

        let envelope = analyze(&[0.3; 16], 0, 4);
        assert!(envelope.is_fallback);
        assert_eq!(envelope.duration_seconds, FALLBACK_DURATION_SECONDS);
    }

    #[test]
    fn test_non_finite_samples_are_silent() {
        let envelope = analyze(&[f32::NAN, f32::INFINITY, 0.0, 0.0], 4, 1);
        assert_eq!(envelope.points[0].amplitude, 0.0);
    }

    #[test]
    fn test_window() {
        let envelope = analyze(&vec![0.2f32; 100], 10, 10);
        let window = envelope.window(1.5, 4.5);
        assert_eq!(window.len(), 3);
        assert!((window[0].time_seconds - 2.0).abs() < 1e-9);
        assert!(envelope.window(5.0, 2.0).is_empty());
        assert_eq!(envelope.window(0.0, 100.0).len(), 10);
    }

    proptest! {
        #[test]
        fn analysis_is_deterministic_and_bounded(
            samples in prop::collection::vec(-2.0f32..2.0, 1..2000),
            sample_rate in 1u32..96_000,
            point_count in 1usize..300,
        ) {
            let first = analyze(&samples, sample_rate, point_count);
            let second = analyze(&samples, sample_rate, point_count);
            prop_assert_eq!(first.len(), point_count);
            for (a, b) in first.points.iter().zip(&second.points) {
                prop_assert_eq!(a.amplitude.to_bits(), b.amplitude.to_bits());
                prop_assert!((0.0..=1.0).contains(&a.amplitude));
            }
            for pair in first.points.windows(2) {
                prop_assert!(pair[0].time_seconds < pair[1].time_seconds);
            }
        }
    }
}
