//! Core types shared by the stepgrid crates
//!
//! This crate provides the step grid timing model and the configuration that
//! both the MIDI importer and the loop quantizer are driven by.
//!
//! # Examples
//!
//! ```
//! use stepgrid_core::StepGrid;
//!
//! // One bar of sixteenth notes at 120 BPM lasts two seconds
//! let grid = StepGrid::new(120.0, 4, 16).unwrap();
//! assert_eq!(grid.seconds_per_step(), 0.125);
//! assert_eq!(grid.total_duration(), 2.0);
//! ```

pub mod config;
pub mod grid;

pub use config::{Config, ConfigError, DEFAULT_POINT_COUNT, MAX_POINT_COUNT};
pub use grid::{
    tempo_to_bpm, GridError, StepGrid, DEFAULT_BPM, DEFAULT_STEPS_PER_BEAT, DEFAULT_TEMPO_MICROS,
    MIN_STEP_COUNT,
};
