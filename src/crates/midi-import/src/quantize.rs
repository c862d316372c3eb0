//! Tick-to-step quantization
//!
//! Notes are placed on a grid of `steps_per_beat` steps per quarter note.
//! Tick arithmetic is done in integers so a note never lands past the last
//! step because of rounding.

use log::debug;
use serde::Serialize;

use stepgrid_core::{
    tempo_to_bpm, Config, GridError, StepGrid, DEFAULT_BPM, DEFAULT_STEPS_PER_BEAT,
    MIN_STEP_COUNT,
};

use crate::classify::{classify_track, TrackRole};
use crate::error::{ImportError, Result};
use crate::note::note_name;
use crate::track::Track;

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct StepNote {
    pub pitch: u8,
    pub start_step: u32,
    /// Always at least one step
    pub duration_steps: u32,
    pub velocity: f32,
}

impl StepNote {
    /// Note name such as "c4" or "f#2"
    pub fn name(&self) -> String {
        note_name(self.pitch)
    }

    pub fn end_step(&self) -> u32 {
        self.start_step.saturating_add(self.duration_steps)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PatternTrack {
    pub name: String,
    pub role: TrackRole,
    pub color: &'static str,
    /// Index of the `MTrk` chunk this track came from
    pub source_index: usize,
    pub channel: Option<u8>,
    pub notes: Vec<StepNote>,
    pub warnings: Vec<String>,
}

impl PatternTrack {
    /// One flag for each of the first `steps` steps, set where a note starts
    pub fn triggers(&self, steps: u32) -> Vec<bool> {
        let mut flags = vec![false; steps as usize];
        for note in &self.notes {
            if let Some(flag) = flags.get_mut(note.start_step as usize) {
                *flag = true;
            }
        }
        flags
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct QuantizedPattern {
    pub step_count: u32,
    pub ticks_per_step: f64,
    pub steps_per_beat: u32,
    pub bpm: f64,
    pub tracks: Vec<PatternTrack>,
}

impl QuantizedPattern {
    /// The pattern's grid; `bpm` is always positive so this only fails on
    /// hand-edited values
    pub fn grid(&self) -> std::result::Result<StepGrid, GridError> {
        StepGrid::new(self.bpm, self.steps_per_beat, self.step_count)
    }

    pub fn note_count(&self) -> usize {
        self.tracks.iter().map(|t| t.notes.len()).sum()
    }
}

/// Places assembled notes on a step grid
#[derive(Debug, Clone, Copy)]
pub struct Quantizer {
    steps_per_beat: u32,
    min_step_count: u32,
}

impl Default for Quantizer {
    fn default() -> Self {
        Quantizer {
            steps_per_beat: DEFAULT_STEPS_PER_BEAT,
            min_step_count: MIN_STEP_COUNT,
        }
    }
}

impl Quantizer {
    pub fn new(steps_per_beat: u32) -> Result<Self> {
        if steps_per_beat == 0 {
            return Err(GridError::InvalidStepsPerBeat.into());
        }
        Ok(Quantizer {
            steps_per_beat,
            ..Self::default()
        })
    }

    pub fn from_config(config: &Config) -> Result<Self> {
        Ok(Self::new(config.steps_per_beat)?.with_min_step_count(config.min_step_count()))
    }

    /// Raise the step count floor; it never drops below one bar
    pub fn with_min_step_count(mut self, min_step_count: u32) -> Self {
        self.min_step_count = min_step_count.max(MIN_STEP_COUNT);
        self
    }

    pub fn steps_per_beat(&self) -> u32 {
        self.steps_per_beat
    }

    fn floor_steps(&self, ticks: u64, ticks_per_quarter: u16) -> Result<u32> {
        let scaled = u128::from(ticks) * u128::from(self.steps_per_beat);
        to_step(scaled / u128::from(ticks_per_quarter))
    }

    fn ceil_steps(&self, ticks: u64, ticks_per_quarter: u16) -> Result<u32> {
        let scaled = u128::from(ticks) * u128::from(self.steps_per_beat);
        to_step(scaled.div_ceil(u128::from(ticks_per_quarter)))
    }

    /// Quantize `tracks` recorded at `ticks_per_quarter` onto the grid.
    ///
    /// Tracks without notes are dropped. The pattern tempo is the first
    /// tempo found in track order. Fails with [`ImportError::PatternTooLong`]
    /// when a note ends past the last representable step.
    pub fn quantize(&self, tracks: &[Track], ticks_per_quarter: u16) -> Result<QuantizedPattern> {
        let tpq = ticks_per_quarter.max(1);
        let mut step_count = self.min_step_count;
        let mut pattern_tracks = Vec::new();

        for track in tracks {
            if track.is_empty() {
                debug!("Dropping {}: no notes", track.display_name());
                continue;
            }

            // The end step bounds every start and duration step below it
            step_count = step_count.max(self.ceil_steps(track.max_end_tick(), tpq)?);
            let notes = track
                .notes
                .iter()
                .map(|note| -> Result<StepNote> {
                    Ok(StepNote {
                        pitch: note.pitch,
                        start_step: self.floor_steps(note.start_tick, tpq)?,
                        duration_steps: self.ceil_steps(note.duration_tick, tpq)?.max(1),
                        velocity: note.velocity,
                    })
                })
                .collect::<Result<Vec<_>>>()?;

            let role = classify_track(track);
            pattern_tracks.push(PatternTrack {
                name: track.display_name(),
                role,
                color: role.color_hint(),
                source_index: track.index,
                channel: track.channel,
                notes,
                warnings: track.warnings.clone(),
            });
        }

        let bpm = tracks
            .iter()
            .find_map(|t| t.tempo)
            .map_or(DEFAULT_BPM, tempo_to_bpm);

        Ok(QuantizedPattern {
            step_count,
            ticks_per_step: f64::from(tpq) / f64::from(self.steps_per_beat),
            steps_per_beat: self.steps_per_beat,
            bpm,
            tracks: pattern_tracks,
        })
    }
}

fn to_step(steps: u128) -> Result<u32> {
    u32::try_from(steps).map_err(|_| ImportError::PatternTooLong { steps })
}

/// Quantize with the given grid resolution and the default one-bar floor
pub fn quantize(
    tracks: &[Track],
    ticks_per_quarter: u16,
    steps_per_beat: u32,
) -> Result<QuantizedPattern> {
    Quantizer::new(steps_per_beat)?.quantize(tracks, ticks_per_quarter)
}
