//! Fitting a selected loop region onto a step grid
//!
//! The selected region is time-stretched so it lasts exactly as long as the
//! grid. The resulting playback rate is `grid duration / region duration`:
//! above 1.0 the region plays faster, below 1.0 slower.

use log::debug;
use serde::{Deserialize, Serialize};

use stepgrid_core::{Config, StepGrid};

use crate::{LoopError, Result};

/// A `[start, end)` region of the source audio in seconds
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct LoopSelection {
    pub start: f64,
    pub end: f64,
}

impl LoopSelection {
    pub fn new(start: f64, end: f64) -> Self {
        LoopSelection { start, end }
    }

    /// The selection covering the whole grid
    pub fn full_grid(grid: &StepGrid) -> Self {
        Self::new(0.0, grid.total_duration())
    }

    pub fn duration(&self) -> f64 {
        self.end - self.start
    }

    /// True when the region has no positive, finite length
    pub fn is_degenerate(&self) -> bool {
        !(self.start.is_finite() && self.end.is_finite() && self.duration() > 0.0)
    }

    /// Clamp both ends into `[0, limit]`, e.g. after dragging a handle.
    ///
    /// The result may be degenerate; callers keep the quantize action
    /// disabled until it is not.
    pub fn clamped(&self, limit: f64) -> Self {
        let limit = limit.max(0.0);
        Self::new(self.start.clamp(0.0, limit), self.end.clamp(0.0, limit))
    }
}

/// Upper bound for a selection's end: the longer of the audio and the grid
pub fn selection_limit(source_duration: f64, grid: &StepGrid) -> f64 {
    source_duration.max(grid.total_duration())
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct QuantizationResult {
    pub effective_start: f64,
    pub effective_end: f64,
    /// Always positive and finite
    pub playback_rate: f64,
}

impl QuantizationResult {
    pub fn region_duration(&self) -> f64 {
        self.effective_end - self.effective_start
    }

    pub fn selection(&self) -> LoopSelection {
        LoopSelection::new(self.effective_start, self.effective_end)
    }
}

/// Computes playback rates against one grid
#[derive(Debug, Clone, Copy)]
pub struct LoopQuantizer {
    grid: StepGrid,
    grid_snap: bool,
}

impl LoopQuantizer {
    /// Grid snapping is on by default
    pub fn new(grid: StepGrid) -> Self {
        LoopQuantizer {
            grid,
            grid_snap: true,
        }
    }

    pub fn from_config(config: &Config, step_count: u32, bpm: f64) -> Result<Self> {
        let grid = StepGrid::new(bpm, config.steps_per_beat, step_count)?;
        Ok(Self::new(grid).with_grid_snap(config.grid_snap))
    }

    pub fn with_grid_snap(mut self, grid_snap: bool) -> Self {
        self.grid_snap = grid_snap;
        self
    }

    pub fn grid(&self) -> &StepGrid {
        &self.grid
    }

    pub fn target_duration(&self) -> f64 {
        self.grid.total_duration()
    }

    /// Round both ends to the nearest grid line, keeping at least one step.
    ///
    /// A region that would collapse onto a single line becomes the step cell
    /// containing its midpoint. Nothing snaps before zero. Regions too far
    /// out to be indexed by step fail with [`LoopError::OutOfRange`].
    pub fn snap_selection(&self, selection: LoopSelection) -> Result<LoopSelection> {
        let out_of_range = || LoopError::OutOfRange {
            start: selection.start,
            end: selection.end,
        };

        let start_step = self.grid.nearest_step(selection.start).max(0);
        let end_step = self.grid.nearest_step(selection.end);

        let (start_step, end_step) = if end_step > start_step {
            (start_step, end_step)
        } else {
            let midpoint = selection.start / 2.0 + selection.end / 2.0;
            let cell = self.grid.step_at(midpoint).max(0);
            debug!(
                "Selection {:.4}..{:.4}s collapses on the grid; using step {}",
                selection.start, selection.end, cell
            );
            (cell, cell.checked_add(1).ok_or_else(out_of_range)?)
        };

        let snapped = LoopSelection::new(
            self.grid.time_of_step(start_step),
            self.grid.time_of_step(end_step),
        );
        // Adjacent lines this far out can round to the same time
        if snapped.is_degenerate() {
            return Err(out_of_range());
        }
        Ok(snapped)
    }

    /// Playback rate that stretches `selection` over the whole grid
    pub fn quantize(&self, selection: LoopSelection) -> Result<QuantizationResult> {
        if selection.is_degenerate() {
            return Err(LoopError::DegenerateRegion {
                start: selection.start,
                end: selection.end,
            });
        }

        let effective = if self.grid_snap {
            self.snap_selection(selection)?
        } else {
            selection
        };

        Ok(QuantizationResult {
            effective_start: effective.start,
            effective_end: effective.end,
            playback_rate: self.target_duration() / effective.duration(),
        })
    }

    /// Select exactly the grid's length from the start of the audio
    pub fn auto_quantize(&self) -> QuantizationResult {
        QuantizationResult {
            effective_start: 0.0,
            effective_end: self.target_duration(),
            playback_rate: 1.0,
        }
    }
}

/// Quantize `selection` against `step_count` steps at `bpm`, with grid snapping
pub fn quantize(
    selection: LoopSelection,
    step_count: u32,
    bpm: f64,
    steps_per_beat: u32,
) -> Result<QuantizationResult> {
    let grid = StepGrid::new(bpm, steps_per_beat, step_count)?;
    LoopQuantizer::new(grid).quantize(selection)
}
