use log::debug;
use serde::Serialize;
use std::collections::{BTreeMap, VecDeque};

use stepgrid_core::{tempo_to_bpm, DEFAULT_BPM};

use crate::midi::{RawEvent, RawTrack, TimedEvent};

/// A sounding note with its start and length in ticks
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Note {
    pub pitch: u8,
    pub channel: u8,
    pub start_tick: u64,
    /// Always at least one tick
    pub duration_tick: u64,
    /// Note-on velocity scaled to 0.0..=1.0
    pub velocity: f32,
}

impl Note {
    pub fn end_tick(&self) -> u64 {
        self.start_tick + self.duration_tick
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Track {
    /// Position of the source `MTrk` chunk
    pub index: usize,
    pub name: Option<String>,
    /// First tempo event in this track, in microseconds per quarter note
    pub tempo: Option<u32>,
    pub channel: Option<u8>,
    pub program: Option<u8>,
    pub notes: Vec<Note>,
    pub warnings: Vec<String>,
}

impl Track {
    pub fn from_raw(index: usize, raw: &RawTrack) -> Self {
        let channel = raw.events.iter().find_map(|e| match e.event {
            RawEvent::NoteOn { channel, .. } | RawEvent::ProgramChange { channel, .. } => {
                Some(channel)
            }
            _ => None,
        });
        let program = raw.events.iter().find_map(|e| match e.event {
            RawEvent::ProgramChange { program, .. } => Some(program),
            _ => None,
        });

        Track {
            index,
            name: raw.name().map(str::to_string),
            tempo: raw.first_tempo(),
            channel,
            program,
            notes: assemble(&raw.events, raw.end_tick),
            warnings: raw.warnings.clone(),
        }
    }

    /// Tempo hint for this track, 120 BPM if it has no tempo event
    pub fn bpm(&self) -> f64 {
        self.tempo.map_or(DEFAULT_BPM, tempo_to_bpm)
    }

    /// The track's name, or "Track N" when it has none
    pub fn display_name(&self) -> String {
        self.name
            .clone()
            .unwrap_or_else(|| format!("Track {}", self.index + 1))
    }

    pub fn max_end_tick(&self) -> u64 {
        self.notes.iter().map(Note::end_tick).max().unwrap_or(0)
    }

    pub fn is_empty(&self) -> bool {
        self.notes.is_empty()
    }
}

#[derive(Debug, Clone, Copy)]
struct Pending {
    tick: u64,
    channel: u8,
    velocity: u8,
}

fn close(pitch: u8, pending: Pending, off_tick: u64) -> Note {
    Note {
        pitch,
        channel: pending.channel,
        start_tick: pending.tick,
        duration_tick: off_tick.saturating_sub(pending.tick).max(1),
        velocity: f32::from(pending.velocity) / 127.0,
    }
}

/// Pair note-ons with note-offs into notes.
///
/// Each pitch keeps a queue of open note-ons; a note-off closes the oldest
/// one. Notes still open when the track ends are closed at `end_tick`.
/// The result is ordered by start tick, then pitch.
pub fn assemble(events: &[TimedEvent], end_tick: u64) -> Vec<Note> {
    let mut pending: BTreeMap<u8, VecDeque<Pending>> = BTreeMap::new();
    let mut notes = Vec::new();

    for event in events {
        match event.event {
            RawEvent::NoteOn {
                channel,
                pitch,
                velocity,
            } => {
                pending.entry(pitch).or_default().push_back(Pending {
                    tick: event.tick,
                    channel,
                    velocity,
                });
            }
            RawEvent::NoteOff { pitch, .. } => {
                match pending.get_mut(&pitch).and_then(VecDeque::pop_front) {
                    Some(open) => notes.push(close(pitch, open, event.tick)),
                    None => debug!(
                        "Note-off for pitch {} at tick {} has no note-on",
                        pitch, event.tick
                    ),
                }
            }
            _ => {}
        }
    }

    for (pitch, queue) in pending {
        for open in queue {
            debug!(
                "Pitch {} from tick {} never released; closing at tick {}",
                pitch, open.tick, end_tick
            );
            notes.push(close(pitch, open, end_tick));
        }
    }

    notes.sort_by_key(|note| (note.start_tick, note.pitch));
    notes
}
