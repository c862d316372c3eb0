//! Instrument roles guessed from track names and General MIDI metadata.
//!
//! These are display hints only: classification never fails and an
//! unrecognized track is simply `Other`.

use serde::Serialize;
use std::fmt;

use crate::track::Track;

/// MIDI channel 10, reserved for percussion in General MIDI
pub const GM_DRUM_CHANNEL: u8 = 9;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum TrackRole {
    Kick,
    Snare,
    HiHat,
    Cymbal,
    Tom,
    Bass,
    Melody,
    Pad,
    Arp,
    Fx,
    Vocal,
    Keys,
    Synth,
    Guitar,
    Percussion,
    Other,
}

/// Keyword rules in priority order; the first rule with a matching keyword wins
const NAME_RULES: &[(&[&str], TrackRole)] = &[
    (&["kick"], TrackRole::Kick),
    (&["snare"], TrackRole::Snare),
    (&["hihat", "hat", "cymbal"], TrackRole::HiHat),
    (&["crash", "ride"], TrackRole::Cymbal),
    (&["tom"], TrackRole::Tom),
    (&["bass", "sub", "808"], TrackRole::Bass),
    (&["melody", "lead"], TrackRole::Melody),
    (&["pad", "chord"], TrackRole::Pad),
    (&["arp"], TrackRole::Arp),
    (&["fx", "effect"], TrackRole::Fx),
    (&["vocal"], TrackRole::Vocal),
    (&["piano", "keys"], TrackRole::Keys),
    (&["synth"], TrackRole::Synth),
    (&["guitar"], TrackRole::Guitar),
    (&["percussion", "perc"], TrackRole::Percussion),
];

impl TrackRole {
    pub fn as_str(self) -> &'static str {
        match self {
            TrackRole::Kick => "kick",
            TrackRole::Snare => "snare",
            TrackRole::HiHat => "hihat",
            TrackRole::Cymbal => "cymbal",
            TrackRole::Tom => "tom",
            TrackRole::Bass => "bass",
            TrackRole::Melody => "melody",
            TrackRole::Pad => "pad",
            TrackRole::Arp => "arp",
            TrackRole::Fx => "fx",
            TrackRole::Vocal => "vocal",
            TrackRole::Keys => "keys",
            TrackRole::Synth => "synth",
            TrackRole::Guitar => "guitar",
            TrackRole::Percussion => "percussion",
            TrackRole::Other => "other",
        }
    }

    /// Suggested track color for sequencer lanes (hex RGB)
    pub fn color_hint(self) -> &'static str {
        match self {
            TrackRole::Kick => "#ef4444",
            TrackRole::Snare => "#f97316",
            TrackRole::HiHat | TrackRole::Cymbal => "#eab308",
            TrackRole::Tom | TrackRole::Percussion => "#f59e0b",
            TrackRole::Bass => "#8b5cf6",
            TrackRole::Melody | TrackRole::Synth => "#3b82f6",
            TrackRole::Pad => "#06b6d4",
            TrackRole::Arp => "#14b8a6",
            TrackRole::Fx => "#ec4899",
            TrackRole::Vocal => "#f43f5e",
            TrackRole::Keys | TrackRole::Guitar => "#22c55e",
            TrackRole::Other => "#6b7280",
        }
    }

    pub fn is_drum(self) -> bool {
        matches!(
            self,
            TrackRole::Kick
                | TrackRole::Snare
                | TrackRole::HiHat
                | TrackRole::Cymbal
                | TrackRole::Tom
                | TrackRole::Percussion
        )
    }
}

impl fmt::Display for TrackRole {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Classify a track by its name alone
pub fn classify(track_name: &str) -> TrackRole {
    let name_lower = track_name.to_lowercase();

    NAME_RULES
        .iter()
        .find(|(keywords, _)| keywords.iter().any(|&keyword| name_lower.contains(keyword)))
        .map_or(TrackRole::Other, |&(_, role)| role)
}

/// Map a General MIDI program number (0-127) to the closest role
pub fn gm_program_to_role(program: u8) -> TrackRole {
    match program {
        // Piano, chromatic percussion, organ
        0..=23 => TrackRole::Keys,
        24..=31 => TrackRole::Guitar,
        32..=39 => TrackRole::Bass,
        // Strings and ensembles
        40..=55 => TrackRole::Pad,
        // Brass, reed, pipe, synth lead
        56..=87 => TrackRole::Melody,
        88..=95 => TrackRole::Pad,
        96..=103 => TrackRole::Fx,
        104..=111 => TrackRole::Melody,
        112..=119 => TrackRole::Percussion,
        _ => TrackRole::Fx,
    }
}

/// Classify a track by name, then by drum channel, then by program
pub fn classify_track(track: &Track) -> TrackRole {
    let by_name = track.name.as_deref().map_or(TrackRole::Other, classify);
    if by_name != TrackRole::Other {
        return by_name;
    }
    if track.channel == Some(GM_DRUM_CHANNEL) {
        return TrackRole::Percussion;
    }
    track.program.map_or(TrackRole::Other, gm_program_to_role)
}
