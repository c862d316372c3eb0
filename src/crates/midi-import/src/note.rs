const PITCH_CLASSES: [&str; 12] = [
    "c", "c#", "d", "d#", "e", "f", "f#", "g", "g#", "a", "a#", "b",
];

/// Octave number in scientific pitch notation (MIDI 60 is in octave 4)
pub fn octave(pitch: u8) -> i8 {
    (pitch / 12) as i8 - 1
}

/// Lowercase note name with octave, e.g. 60 → "c4", 42 → "f#2"
pub fn note_name(pitch: u8) -> String {
    format!("{}{}", PITCH_CLASSES[usize::from(pitch % 12)], octave(pitch))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_note_names() {
        assert_eq!(note_name(60), "c4");
        assert_eq!(note_name(69), "a4");
        assert_eq!(note_name(42), "f#2");
        assert_eq!(note_name(0), "c-1");
        assert_eq!(note_name(127), "g9");
    }
}
