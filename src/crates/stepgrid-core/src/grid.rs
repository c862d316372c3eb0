use serde::Serialize;
use std::fmt;

/// Tempo assumed when a source carries no tempo information
pub const DEFAULT_BPM: f64 = 120.0;

/// Sixteenth-note grid
pub const DEFAULT_STEPS_PER_BEAT: u32 = 4;

/// One 4/4 bar of sixteenth notes; imports never render shorter than this
pub const MIN_STEP_COUNT: u32 = 16;

/// Microseconds per quarter note at [`DEFAULT_BPM`]
pub const DEFAULT_TEMPO_MICROS: u32 = 500_000;

#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum GridError {
    #[error("BPM must be a positive finite number, got {0}")]
    InvalidBpm(f64),

    #[error("steps per beat must be at least 1")]
    InvalidStepsPerBeat,

    #[error("step count must be at least 1")]
    InvalidStepCount,
}

/// Convert an SMF tempo (microseconds per quarter note) to beats per minute
pub fn tempo_to_bpm(micros_per_quarter: u32) -> f64 {
    if micros_per_quarter == 0 {
        return DEFAULT_BPM;
    }
    60_000_000.0 / micros_per_quarter as f64
}

/// A fixed sequencer grid: `step_count` steps of `1 / steps_per_beat` beats at `bpm`.
///
/// Construction validates every field, so the derived durations are always
/// positive and finite.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct StepGrid {
    bpm: f64,
    steps_per_beat: u32,
    step_count: u32,
}

impl StepGrid {
    pub fn new(bpm: f64, steps_per_beat: u32, step_count: u32) -> Result<Self, GridError> {
        if !bpm.is_finite() || bpm <= 0.0 {
            return Err(GridError::InvalidBpm(bpm));
        }
        if steps_per_beat == 0 {
            return Err(GridError::InvalidStepsPerBeat);
        }
        if step_count == 0 {
            return Err(GridError::InvalidStepCount);
        }
        Ok(StepGrid {
            bpm,
            steps_per_beat,
            step_count,
        })
    }

    /// One bar of sixteenths at the given tempo
    pub fn one_bar(bpm: f64) -> Result<Self, GridError> {
        Self::new(bpm, DEFAULT_STEPS_PER_BEAT, MIN_STEP_COUNT)
    }

    pub fn bpm(&self) -> f64 {
        self.bpm
    }

    pub fn steps_per_beat(&self) -> u32 {
        self.steps_per_beat
    }

    pub fn step_count(&self) -> u32 {
        self.step_count
    }

    pub fn seconds_per_beat(&self) -> f64 {
        60.0 / self.bpm
    }

    pub fn seconds_per_step(&self) -> f64 {
        self.seconds_per_beat() / self.steps_per_beat as f64
    }

    /// Length of the whole grid in seconds
    pub fn total_duration(&self) -> f64 {
        self.time_of_step(self.step_count as i64)
    }

    /// Start time of grid line `step`
    pub fn time_of_step(&self, step: i64) -> f64 {
        step as f64 * self.seconds_per_step()
    }

    /// Index of the grid line nearest to `time`, ties rounding away from zero.
    ///
    /// Times beyond the `i64` range saturate at its bounds.
    pub fn nearest_step(&self, time: f64) -> i64 {
        (time / self.seconds_per_step()).round() as i64
    }

    /// Index of the step cell containing `time`, saturating like [`Self::nearest_step`]
    pub fn step_at(&self, time: f64) -> i64 {
        (time / self.seconds_per_step()).floor() as i64
    }

    /// Snap `time` to the nearest grid line
    pub fn snap(&self, time: f64) -> f64 {
        self.time_of_step(self.nearest_step(time))
    }

    pub fn with_step_count(self, step_count: u32) -> Result<Self, GridError> {
        Self::new(self.bpm, self.steps_per_beat, step_count)
    }
}

impl fmt::Display for StepGrid {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{} steps @ {:.2} BPM ({} per beat)",
            self.step_count, self.bpm, self.steps_per_beat
        )
    }
}
