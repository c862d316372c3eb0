//! Waveform envelopes and loop fitting for sampled audio
//!
//! This crate works on PCM decoded elsewhere:
//! - Reduce a buffer to a fixed number of amplitude points for display
//! - Fit a selected region onto a step grid by computing its playback rate

pub mod pcm;
pub mod region;
pub mod waveform;

pub use pcm::PcmBuffer;
pub use region::{quantize, selection_limit, LoopQuantizer, LoopSelection, QuantizationResult};
pub use waveform::{analyze, WaveformEnvelope, WaveformPoint};

pub use stepgrid_core::{GridError, StepGrid};

/// Loop quantization errors
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum LoopError {
    #[error("Loop region {start}..{end}s has no length")]
    DegenerateRegion { start: f64, end: f64 },

    #[error("Loop region {start}..{end}s is too far out to snap to the grid")]
    OutOfRange { start: f64, end: f64 },

    #[error("Invalid grid: {0}")]
    InvalidGrid(#[from] GridError),
}

pub type Result<T> = std::result::Result<T, LoopError>;
