use stepgrid_core::GridError;

pub type Result<T> = std::result::Result<T, ImportError>;

/// Failures that stop a whole MIDI import.
///
/// Anomalies confined to one track never surface here; they end that track
/// early and are recorded in its warnings instead.
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum ImportError {
    #[error("Invalid MIDI header: {0}")]
    InvalidHeader(String),

    #[error("Unsupported MIDI file: {0}")]
    UnsupportedFormat(String),

    #[error("File truncated at byte {offset}: needed {needed} bytes, {available} available")]
    Truncated {
        offset: usize,
        needed: usize,
        available: usize,
    },

    #[error("Malformed variable-length quantity at byte {offset}")]
    MalformedVlq { offset: usize },

    #[error("Pattern needs {steps} steps, more than a step index can hold")]
    PatternTooLong { steps: u128 },

    #[error("Invalid step grid: {0}")]
    InvalidGrid(#[from] GridError),
}

impl ImportError {
    /// Message suitable for showing to a user who picked the file
    pub fn user_message(&self) -> &'static str {
        match self {
            ImportError::InvalidGrid(_) => "Import settings are invalid",
            ImportError::PatternTooLong { .. } => "MIDI file is too long for the step grid",
            _ => "File could not be read as MIDI",
        }
    }
}
