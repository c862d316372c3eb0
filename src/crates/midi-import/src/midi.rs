//! Standard MIDI File chunk parser
//!
//! Walks the `MThd` header and each `MTrk` chunk, producing per-track event
//! lists stamped with absolute ticks. Only the events the step grid needs are
//! kept; everything else is skipped by its known size so parsing stays aligned.

use log::{debug, warn};
use serde::Serialize;

use crate::cursor::ByteCursor;
use crate::error::{ImportError, Result};

const HEADER_ID: &[u8; 4] = b"MThd";
const TRACK_ID: &[u8; 4] = b"MTrk";
const MIN_HEADER_LEN: usize = 6;

const META_TRACK_NAME: u8 = 0x03;
const META_END_OF_TRACK: u8 = 0x2F;
const META_TEMPO: u8 = 0x51;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct MidiHeader {
    /// 0 = single track, 1 = simultaneous tracks, 2 = independent sequences
    pub format: u16,
    pub track_count: u16,
    pub ticks_per_quarter: u16,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "type", rename_all = "camelCase")]
pub enum RawEvent {
    NoteOn { channel: u8, pitch: u8, velocity: u8 },
    NoteOff { channel: u8, pitch: u8 },
    TempoChange { micros_per_quarter: u32 },
    TrackName { text: String },
    ProgramChange { channel: u8, program: u8 },
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct TimedEvent {
    /// Absolute position from the start of the track
    pub tick: u64,
    pub event: RawEvent,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RawTrack {
    pub events: Vec<TimedEvent>,
    /// Tick of the end-of-track marker, or of the last event read
    pub end_tick: u64,
    /// Problems that cut this track short or dropped part of it
    pub warnings: Vec<String>,
}

impl RawTrack {
    /// First non-empty track name
    pub fn name(&self) -> Option<&str> {
        self.events.iter().find_map(|e| match &e.event {
            RawEvent::TrackName { text } => Some(text.as_str()),
            _ => None,
        })
    }

    /// First tempo, in microseconds per quarter note
    pub fn first_tempo(&self) -> Option<u32> {
        self.events.iter().find_map(|e| match e.event {
            RawEvent::TempoChange { micros_per_quarter } => Some(micros_per_quarter),
            _ => None,
        })
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct MidiFile {
    pub header: MidiHeader,
    pub tracks: Vec<RawTrack>,
}

impl MidiFile {
    pub fn parse(bytes: &[u8]) -> Result<Self> {
        parse(bytes)
    }

    /// First tempo seen in track order
    pub fn first_tempo(&self) -> Option<u32> {
        self.tracks.iter().find_map(RawTrack::first_tempo)
    }
}

/// Parse a complete SMF buffer
pub fn parse(bytes: &[u8]) -> Result<MidiFile> {
    let mut cursor = ByteCursor::new(bytes);
    let header = parse_header(&mut cursor)?;
    debug!(
        "MIDI header: format {}, {} tracks, {} ticks per quarter",
        header.format, header.track_count, header.ticks_per_quarter
    );

    if header.format == 0 && header.track_count != 1 {
        warn!(
            "Format 0 file announces {} tracks; reading all of them",
            header.track_count
        );
    }

    let mut tracks = Vec::with_capacity(header.track_count as usize);
    while tracks.len() < header.track_count as usize {
        let id = cursor.read_bytes(4)?;
        let length = cursor.read_u32()? as usize;
        let body = cursor.split(length)?;

        if id != TRACK_ID {
            warn!(
                "Skipping unknown chunk {:?} ({} bytes)",
                String::from_utf8_lossy(id),
                length
            );
            continue;
        }

        let index = tracks.len();
        let track = TrackParser::new(index, body).run()?;
        debug!(
            "Track {}: {} events, ends at tick {}",
            index + 1,
            track.events.len(),
            track.end_tick
        );
        tracks.push(track);
    }

    if !cursor.is_at_end() {
        debug!("Ignoring {} trailing bytes", cursor.remaining());
    }

    Ok(MidiFile { header, tracks })
}

fn parse_header(cursor: &mut ByteCursor<'_>) -> Result<MidiHeader> {
    let id = cursor
        .read_bytes(4)
        .map_err(|_| ImportError::InvalidHeader("file is too short to hold a header".into()))?;
    if id != HEADER_ID {
        return Err(ImportError::InvalidHeader(format!(
            "expected \"MThd\", found {:02X?}",
            id
        )));
    }

    let length = cursor.read_u32()? as usize;
    if length < MIN_HEADER_LEN {
        return Err(ImportError::InvalidHeader(format!(
            "header length {} is shorter than {}",
            length, MIN_HEADER_LEN
        )));
    }

    // Longer headers are allowed; the extra bytes are skipped with the chunk
    let mut body = cursor.split(length)?;
    let format = body.read_u16()?;
    let track_count = body.read_u16()?;
    let division = body.read_u16()?;

    if division & 0x8000 != 0 {
        return Err(ImportError::UnsupportedFormat(
            "SMPTE time division is not supported".into(),
        ));
    }
    if division == 0 {
        return Err(ImportError::InvalidHeader(
            "time division must be at least one tick per quarter note".into(),
        ));
    }
    if format > 2 {
        return Err(ImportError::UnsupportedFormat(format!(
            "unknown SMF format {}",
            format
        )));
    }

    Ok(MidiHeader {
        format,
        track_count,
        ticks_per_quarter: division,
    })
}

/// Why a track stopped before its chunk ended
enum TrackError {
    /// The byte offset can no longer be trusted for the whole file
    Fatal(ImportError),
    /// Only this track is affected
    Abort(String),
}

impl From<ImportError> for TrackError {
    fn from(err: ImportError) -> Self {
        match err {
            ImportError::MalformedVlq { .. } => TrackError::Fatal(err),
            other => TrackError::Abort(other.to_string()),
        }
    }
}

type TrackResult<T> = std::result::Result<T, TrackError>;

struct TrackParser<'a> {
    index: usize,
    cursor: ByteCursor<'a>,
    tick: u64,
    running_status: Option<u8>,
    track: RawTrack,
}

impl<'a> TrackParser<'a> {
    fn new(index: usize, cursor: ByteCursor<'a>) -> Self {
        Self {
            index,
            cursor,
            tick: 0,
            running_status: None,
            track: RawTrack::default(),
        }
    }

    fn run(mut self) -> Result<RawTrack> {
        while !self.cursor.is_at_end() {
            match self.next_event() {
                Ok(true) => {}
                Ok(false) => {
                    if !self.cursor.is_at_end() {
                        debug!(
                            "Track {}: {} bytes after end-of-track ignored",
                            self.index + 1,
                            self.cursor.remaining()
                        );
                    }
                    break;
                }
                Err(TrackError::Fatal(err)) => return Err(err),
                Err(TrackError::Abort(reason)) => {
                    self.warn(format!("track cut short: {}", reason));
                    break;
                }
            }
        }

        self.track.end_tick = self.tick;
        Ok(self.track)
    }

    fn warn(&mut self, message: String) {
        warn!("Track {}: {}", self.index + 1, message);
        self.track.warnings.push(message);
    }

    fn push(&mut self, event: RawEvent) {
        self.track.events.push(TimedEvent {
            tick: self.tick,
            event,
        });
    }

    /// Read one delta-time/event pair; `false` once end-of-track is reached
    fn next_event(&mut self) -> TrackResult<bool> {
        let delta = self.cursor.read_vlq()?;
        self.tick += u64::from(delta);

        let offset = self.cursor.absolute_position();
        let first = self.cursor.peek_u8()?;
        let status = if first & 0x80 != 0 {
            self.cursor.read_u8()?;
            first
        } else {
            match self.running_status {
                Some(status) => status,
                None => {
                    return Err(TrackError::Abort(format!(
                        "data byte 0x{:02X} at byte {} with no running status",
                        first, offset
                    )))
                }
            }
        };

        match status {
            0xFF => self.meta_event(),
            0xF0 | 0xF7 => {
                let length = self.cursor.read_vlq()? as usize;
                self.cursor.skip(length)?;
                self.running_status = None;
                Ok(true)
            }
            0x80..=0xEF => {
                self.running_status = Some(status);
                self.channel_event(status)?;
                Ok(true)
            }
            _ => Err(TrackError::Abort(format!(
                "unsupported status byte 0x{:02X} at byte {}",
                status, offset
            ))),
        }
    }

    fn meta_event(&mut self) -> TrackResult<bool> {
        let kind = self.cursor.read_u8()?;
        let length = self.cursor.read_vlq()? as usize;
        let payload = self.cursor.read_bytes(length)?;

        match kind {
            META_TRACK_NAME => {
                let text = clean_text(payload);
                if !text.is_empty() {
                    self.push(RawEvent::TrackName { text });
                } else if !payload.is_empty() {
                    self.warn("unreadable track name ignored".into());
                }
            }
            META_TEMPO => {
                if let [a, b, c] = *payload {
                    let micros_per_quarter = u32::from_be_bytes([0, a, b, c]);
                    if micros_per_quarter == 0 {
                        self.warn(format!("zero tempo at tick {} ignored", self.tick));
                    } else {
                        self.push(RawEvent::TempoChange { micros_per_quarter });
                    }
                } else {
                    self.warn(format!(
                        "tempo event with {} byte payload at tick {} ignored",
                        payload.len(),
                        self.tick
                    ));
                }
            }
            META_END_OF_TRACK => return Ok(false),
            _ => {}
        }
        Ok(true)
    }

    fn data_byte(&mut self) -> TrackResult<u8> {
        let offset = self.cursor.absolute_position();
        let byte = self.cursor.read_u8()?;
        if byte & 0x80 != 0 {
            return Err(TrackError::Abort(format!(
                "expected a data byte at byte {}, found 0x{:02X}",
                offset, byte
            )));
        }
        Ok(byte)
    }

    fn channel_event(&mut self, status: u8) -> TrackResult<()> {
        let channel = status & 0x0F;
        match status & 0xF0 {
            0x80 => {
                let pitch = self.data_byte()?;
                self.data_byte()?;
                self.push(RawEvent::NoteOff { channel, pitch });
            }
            0x90 => {
                let pitch = self.data_byte()?;
                let velocity = self.data_byte()?;
                if velocity == 0 {
                    self.push(RawEvent::NoteOff { channel, pitch });
                } else {
                    self.push(RawEvent::NoteOn {
                        channel,
                        pitch,
                        velocity,
                    });
                }
            }
            0xC0 => {
                let program = self.data_byte()?;
                self.push(RawEvent::ProgramChange { channel, program });
            }
            // Channel pressure
            0xD0 => {
                self.data_byte()?;
            }
            // Poly aftertouch, control change, pitch bend
            _ => {
                self.data_byte()?;
                self.data_byte()?;
            }
        }
        Ok(())
    }
}

/// Decode a text meta payload, dropping control characters.
///
/// Payloads that are not UTF-8 are read as Latin-1, which every byte
/// sequence satisfies.
fn clean_text(payload: &[u8]) -> String {
    let decoded = match std::str::from_utf8(payload) {
        Ok(text) => text.to_string(),
        Err(_) => payload.iter().map(|&b| b as char).collect(),
    };
    decoded
        .chars()
        .filter(|c| !c.is_control())
        .collect::<String>()
        .trim()
        .to_string()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_support::{chunk, smf, TrackBytes};

    fn note_events(track: &RawTrack) -> Vec<(u64, RawEvent)> {
        track
            .events
            .iter()
            .filter(|e| matches!(e.event, RawEvent::NoteOn { .. } | RawEvent::NoteOff { .. }))
            .map(|e| (e.tick, e.event.clone()))
            .collect()
    }

    #[test]
    fn test_rejects_missing_mthd() {
        let mut bytes = smf(1, 480, &[TrackBytes::new().end(0).build()]);
        bytes[..4].copy_from_slice(b"RIFF");
        assert!(matches!(parse(&bytes), Err(ImportError::InvalidHeader(_))));
        assert!(matches!(parse(b"MT"), Err(ImportError::InvalidHeader(_))));
        assert!(matches!(parse(&[]), Err(ImportError::InvalidHeader(_))));
    }

    #[test]
    fn test_rejects_smpte_division() {
        // -25 fps, 40 subframes
        let bytes = smf(1, 0xE728, &[TrackBytes::new().end(0).build()]);
        assert!(matches!(parse(&bytes), Err(ImportError::UnsupportedFormat(_))));
    }

    #[test]
    fn test_rejects_bad_header_fields() {
        let bytes = smf(1, 0, &[]);
        assert!(matches!(parse(&bytes), Err(ImportError::InvalidHeader(_))));

        let bytes = smf(3, 96, &[]);
        assert!(matches!(parse(&bytes), Err(ImportError::UnsupportedFormat(_))));

        let short = chunk(b"MThd", &[0, 1, 0, 1]);
        assert!(matches!(parse(&short), Err(ImportError::InvalidHeader(_))));
    }

    #[test]
    fn test_long_header_is_skipped() {
        let mut bytes = chunk(b"MThd", &[0, 0, 0, 1, 0, 96, 0xAB, 0xCD]);
        bytes.extend(chunk(
            b"MTrk",
            &TrackBytes::new().note_on(0, 0, 60, 100).end(96).build(),
        ));
        let file = parse(&bytes).unwrap();
        assert_eq!(file.header.ticks_per_quarter, 96);
        assert_eq!(file.tracks.len(), 1);
        assert_eq!(file.tracks[0].end_tick, 96);
    }

    #[test]
    fn test_truncated_chunk_is_fatal() {
        let mut bytes = smf(1, 480, &[TrackBytes::new().note_on(0, 0, 60, 100).end(0).build()]);
        bytes.truncate(bytes.len() - 2);
        assert!(matches!(parse(&bytes), Err(ImportError::Truncated { .. })));
    }

    #[test]
    fn test_missing_track_chunk_is_fatal() {
        let mut bytes = smf(1, 480, &[TrackBytes::new().end(0).build()]);
        // Announce two tracks but only provide one
        bytes[11] = 2;
        assert!(matches!(parse(&bytes), Err(ImportError::Truncated { .. })));
    }

    #[test]
    fn test_absolute_ticks_and_meta() {
        let track = TrackBytes::new()
            .name(0, "Kick")
            .tempo(0, 600_000)
            .note_on(0, 9, 36, 100)
            .note_off(480, 9, 36)
            .note_on(240, 9, 36, 90)
            .note_off(240, 9, 36)
            .end(0)
            .build();
        let file = parse(&smf(0, 480, &[track])).unwrap();
        let track = &file.tracks[0];

        assert_eq!(track.name(), Some("Kick"));
        assert_eq!(track.first_tempo(), Some(600_000));
        assert_eq!(file.first_tempo(), Some(600_000));
        assert_eq!(track.end_tick, 960);
        assert!(track.warnings.is_empty());
        assert_eq!(
            note_events(track),
            vec![
                (0, RawEvent::NoteOn { channel: 9, pitch: 36, velocity: 100 }),
                (480, RawEvent::NoteOff { channel: 9, pitch: 36 }),
                (720, RawEvent::NoteOn { channel: 9, pitch: 36, velocity: 90 }),
                (960, RawEvent::NoteOff { channel: 9, pitch: 36 }),
            ]
        );
    }

    #[test]
    fn test_running_status_and_zero_velocity() {
        let track = TrackBytes::new()
            .event(0, &[0x91, 60, 100])
            .event(0, &[64, 80])
            .event(120, &[60, 0])
            .event(0, &[64, 0])
            .end(0)
            .build();
        let file = parse(&smf(0, 480, &[track])).unwrap();
        assert_eq!(
            note_events(&file.tracks[0]),
            vec![
                (0, RawEvent::NoteOn { channel: 1, pitch: 60, velocity: 100 }),
                (0, RawEvent::NoteOn { channel: 1, pitch: 64, velocity: 80 }),
                (120, RawEvent::NoteOff { channel: 1, pitch: 60 }),
                (120, RawEvent::NoteOff { channel: 1, pitch: 64 }),
            ]
        );
    }

    #[test]
    fn test_skips_other_channel_messages() {
        let track = TrackBytes::new()
            .event(0, &[0xB0, 7, 100])
            .event(0, &[0xC0, 33])
            .event(0, &[0xD0, 20])
            .event(0, &[0xE0, 0, 64])
            .event(0, &[0xA0, 60, 10])
            .note_on(10, 0, 40, 127)
            .end(10)
            .build();
        let file = parse(&smf(0, 96, &[track])).unwrap();
        let track = &file.tracks[0];
        assert!(track.warnings.is_empty());
        assert_eq!(
            track.events[0].event,
            RawEvent::ProgramChange { channel: 0, program: 33 }
        );
        assert_eq!(
            note_events(track),
            vec![(10, RawEvent::NoteOn { channel: 0, pitch: 40, velocity: 127 })]
        );
        assert_eq!(track.end_tick, 20);
    }

    #[test]
    fn test_sysex_is_skipped() {
        let track = TrackBytes::new()
            .event(0, &[0xF0, 0x05, 0x7E, 0x7F, 0x09, 0x01, 0xF7])
            .note_on(0, 0, 60, 100)
            .end(0)
            .build();
        let file = parse(&smf(0, 96, &[track])).unwrap();
        assert!(file.tracks[0].warnings.is_empty());
        assert_eq!(note_events(&file.tracks[0]).len(), 1);
    }

    #[test]
    fn test_unknown_status_aborts_only_that_track() {
        let broken = TrackBytes::new()
            .note_on(0, 0, 60, 100)
            .event(10, &[0xF4, 1, 2, 3])
            .note_on(0, 0, 62, 100)
            .build();
        let healthy = TrackBytes::new().note_on(0, 1, 48, 90).end(100).build();
        let file = parse(&smf(1, 96, &[broken, healthy])).unwrap();

        assert_eq!(file.tracks.len(), 2);
        assert_eq!(note_events(&file.tracks[0]).len(), 1);
        assert_eq!(file.tracks[0].warnings.len(), 1);
        assert_eq!(file.tracks[0].end_tick, 10);
        assert_eq!(note_events(&file.tracks[1]).len(), 1);
        assert!(file.tracks[1].warnings.is_empty());
    }

    #[test]
    fn test_data_byte_without_status_aborts_track() {
        let track = TrackBytes::new().event(0, &[60, 100]).build();
        let file = parse(&smf(0, 96, &[track])).unwrap();
        assert!(file.tracks[0].events.is_empty());
        assert_eq!(file.tracks[0].warnings.len(), 1);
    }

    #[test]
    fn test_event_running_past_chunk_keeps_earlier_events() {
        let track = TrackBytes::new()
            .note_on(0, 0, 60, 100)
            .event(5, &[0x90, 62])
            .build();
        let file = parse(&smf(0, 96, &[track])).unwrap();
        assert_eq!(note_events(&file.tracks[0]).len(), 1);
        assert_eq!(file.tracks[0].warnings.len(), 1);
    }

    #[test]
    fn test_malformed_delta_is_fatal() {
        let mut track = TrackBytes::new().note_on(0, 0, 60, 100).build();
        // Delta time that never terminates within four bytes
        track.extend([0x81, 0x80, 0x80, 0x80, 0x00]);
        assert!(matches!(
            parse(&smf(0, 96, &[track])),
            Err(ImportError::MalformedVlq { .. })
        ));
    }

    #[test]
    fn test_dirty_track_name_is_cleaned() {
        let track = TrackBytes::new()
            .meta(0, 0x03, b"\x00Bass\x07 Line\x00")
            .meta(0, 0x03, &[0x50, 0x69, 0xE8, 0x63, 0x65])
            .end(0)
            .build();
        let file = parse(&smf(0, 96, &[track])).unwrap();
        let names: Vec<_> = file.tracks[0]
            .events
            .iter()
            .filter_map(|e| match &e.event {
                RawEvent::TrackName { text } => Some(text.clone()),
                _ => None,
            })
            .collect();
        assert_eq!(names, vec!["Bass Line".to_string(), "Pièce".to_string()]);
    }

    #[test]
    fn test_control_only_name_warns() {
        let track = TrackBytes::new().meta(0, 0x03, &[0x01, 0x02]).end(0).build();
        let file = parse(&smf(0, 96, &[track])).unwrap();
        assert_eq!(file.tracks[0].name(), None);
        assert_eq!(file.tracks[0].warnings.len(), 1);
    }

    #[test]
    fn test_bad_tempo_is_ignored() {
        let track = TrackBytes::new()
            .meta(0, 0x51, &[0x07, 0xA1])
            .tempo(0, 0)
            .end(0)
            .build();
        let file = parse(&smf(0, 96, &[track])).unwrap();
        assert_eq!(file.first_tempo(), None);
        assert_eq!(file.tracks[0].warnings.len(), 2);
    }

    #[test]
    fn test_unknown_chunks_are_skipped() {
        let mut bytes = smf(1, 96, &[]);
        bytes[11] = 1;
        bytes.extend(chunk(b"XFIH", &[1, 2, 3, 4, 5]));
        bytes.extend(chunk(b"MTrk", &TrackBytes::new().note_on(0, 0, 60, 1).end(0).build()));
        let file = parse(&bytes).unwrap();
        assert_eq!(file.tracks.len(), 1);
        assert_eq!(note_events(&file.tracks[0]).len(), 1);
    }
}
