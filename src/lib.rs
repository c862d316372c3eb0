//! Import MIDI files and audio loops onto a BPM-relative step grid
//!
//! The work is split across three crates, re-exported here:
//! - [`stepgrid_core`]: the grid itself and shared configuration
//! - [`midi_import`]: Standard MIDI File parsing and tick-to-step quantization
//! - [`loop_quantizer`]: waveform envelopes and loop playback rates

pub mod wav;

pub use loop_quantizer::{
    LoopError, LoopQuantizer, LoopSelection, PcmBuffer, QuantizationResult, WaveformEnvelope,
    WaveformPoint,
};
pub use midi_import::{ImportError, PatternTrack, QuantizedPattern, StepNote, TrackRole};
pub use stepgrid_core::{Config, ConfigError, GridError, StepGrid};

pub use loop_quantizer;
pub use midi_import;
pub use stepgrid_core;

/// Parse an SMF byte buffer into a step pattern
pub fn import_midi(bytes: &[u8], config: &Config) -> midi_import::Result<QuantizedPattern> {
    midi_import::import(bytes, config)
}

/// Waveform envelope of `pcm` at the configured resolution
pub fn analyze_loop(pcm: &PcmBuffer, config: &Config) -> WaveformEnvelope {
    pcm.envelope(config.point_count)
}

/// Fit `selection` onto `step_count` steps at `bpm`, snapping if configured
pub fn quantize_loop(
    selection: LoopSelection,
    step_count: u32,
    bpm: f64,
    config: &Config,
) -> loop_quantizer::Result<QuantizationResult> {
    LoopQuantizer::from_config(config, step_count, bpm)?.quantize(selection)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_quantize_loop_honors_snap_setting() {
        let selection = LoopSelection::new(0.01, 1.01);

        let snapped = quantize_loop(selection, 16, 120.0, &Config::default()).unwrap();
        assert_eq!(snapped.effective_start, 0.0);
        assert_eq!(snapped.playback_rate, 2.0);

        let config = Config {
            grid_snap: false,
            ..Config::default()
        };
        let raw = quantize_loop(selection, 16, 120.0, &config).unwrap();
        assert_eq!(raw.effective_start, 0.01);
    }

    #[test]
    fn test_analyze_loop_uses_point_count() {
        let config = Config {
            point_count: 50,
            ..Config::default()
        };
        let pcm = PcmBuffer::mono(vec![0.25; 4410], 44_100);
        let envelope = analyze_loop(&pcm, &config);
        assert_eq!(envelope.len(), 50);
        assert!((envelope.duration_seconds - 0.1).abs() < 1e-12);
    }

    #[test]
    fn test_import_midi_rejects_garbage() {
        let err = import_midi(b"not a midi file", &Config::default()).unwrap_err();
        assert_eq!(err.user_message(), "File could not be read as MIDI");
    }
}
