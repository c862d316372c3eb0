//! Decoded PCM audio handed over by the caller's decoder

use std::borrow::Cow;
use std::sync::Arc;

use crate::waveform::{analyze, WaveformEnvelope};

/// Decoded audio, interleaved when `channels > 1`
#[derive(Debug, Clone)]
pub struct PcmBuffer {
    /// Samples normalized to [-1.0, 1.0]
    pub data: Arc<Vec<f32>>,
    /// Sample rate in Hz
    pub sample_rate: u32,
    /// Number of interleaved channels (1 = mono, 2 = stereo)
    pub channels: u16,
}

impl PcmBuffer {
    pub fn new(data: Vec<f32>, sample_rate: u32, channels: u16) -> Self {
        PcmBuffer {
            data: Arc::new(data),
            sample_rate,
            channels: channels.max(1),
        }
    }

    pub fn mono(data: Vec<f32>, sample_rate: u32) -> Self {
        Self::new(data, sample_rate, 1)
    }

    /// Build from signed integer samples of the given bit depth (8 to 32 bits)
    pub fn from_int_samples(
        samples: &[i32],
        bits_per_sample: u16,
        sample_rate: u32,
        channels: u16,
    ) -> Self {
        let bits = bits_per_sample.clamp(8, 32);
        let full_scale = (1u64 << (bits - 1)) as f32;
        let data = samples.iter().map(|&s| s as f32 / full_scale).collect();
        Self::new(data, sample_rate, channels)
    }

    /// Number of frames (samples per channel)
    pub fn frames(&self) -> usize {
        self.data.len() / self.channels as usize
    }

    /// Duration in seconds, zero when the sample rate is unknown
    pub fn duration(&self) -> f64 {
        if self.sample_rate == 0 {
            return 0.0;
        }
        self.frames() as f64 / f64::from(self.sample_rate)
    }

    /// Average all channels of each frame into one sample
    pub fn to_mono(&self) -> Cow<'_, [f32]> {
        if self.channels == 1 {
            return Cow::Borrowed(self.data.as_slice());
        }
        let channels = self.channels as usize;
        Cow::Owned(
            self.data
                .chunks_exact(channels)
                .map(|frame| frame.iter().sum::<f32>() / channels as f32)
                .collect(),
        )
    }

    /// Waveform envelope of the mono downmix
    pub fn envelope(&self, point_count: usize) -> WaveformEnvelope {
        analyze(&self.to_mono(), self.sample_rate, point_count)
    }
}
