//! Standard MIDI File importer for step sequencers
//!
//! This library parses SMF bytes, pairs note events into notes and
//! quantizes them onto a fixed step grid.
//!
//! # Examples
//!
//! ```no_run
//! use midi_import::import;
//! use stepgrid_core::Config;
//!
//! let bytes = std::fs::read("groove.mid").unwrap();
//! let pattern = import(&bytes, &Config::default()).unwrap();
//! println!("{} steps at {} BPM", pattern.step_count, pattern.bpm);
//! ```

pub mod classify;
pub mod cursor;
pub mod error;
pub mod midi;
pub mod note;
pub mod quantize;
pub mod track;

#[cfg(test)]
mod test_support;

pub use classify::{classify, classify_track, TrackRole};
pub use cursor::{read_vlq, ByteCursor};
pub use error::{ImportError, Result};
pub use midi::{parse, MidiFile, MidiHeader, RawEvent, RawTrack, TimedEvent};
pub use quantize::{quantize, PatternTrack, QuantizedPattern, Quantizer, StepNote};
pub use track::{assemble, Note, Track};

use stepgrid_core::Config;

/// Assemble every parsed track into notes
pub fn tracks(file: &MidiFile) -> Vec<Track> {
    file.tracks
        .iter()
        .enumerate()
        .map(|(index, raw)| Track::from_raw(index, raw))
        .collect()
}

/// Parse `bytes` and quantize the result with `config`
pub fn import(bytes: &[u8], config: &Config) -> Result<QuantizedPattern> {
    let quantizer = Quantizer::from_config(config)?;
    let file = parse(bytes)?;
    let tracks = tracks(&file);
    let pattern = quantizer.quantize(&tracks, file.header.ticks_per_quarter)?;

    log::info!(
        "Imported {} of {} tracks: {} notes over {} steps at {:.1} BPM",
        pattern.tracks.len(),
        tracks.len(),
        pattern.note_count(),
        pattern.step_count,
        pattern.bpm
    );
    Ok(pattern)
}
