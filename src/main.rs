use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use std::fs;
use std::path::{Path, PathBuf};

use stepgrid::{
    analyze_loop, import_midi, quantize_loop, wav, Config, LoopQuantizer, LoopSelection,
    QuantizedPattern, WaveformEnvelope,
};

#[derive(Parser, Debug)]
#[command(name = "stepgrid")]
#[command(about = "Import MIDI files and audio loops onto a step grid", long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// JSON config file (stepsPerBeat, pointCount, gridSnap, targetStepCount)
    #[arg(short, long, global = true)]
    config: Option<PathBuf>,

    /// Print results as pretty JSON
    #[arg(long, global = true)]
    json: bool,

    /// Suppress informational messages (only errors)
    #[arg(short, long, global = true)]
    quiet: bool,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Quantize a Standard MIDI File into a step pattern
    Import {
        /// Path to the .mid file
        file: PathBuf,

        /// Steps per quarter note (4 = sixteenths)
        #[arg(long)]
        steps_per_beat: Option<u32>,

        /// Minimum number of steps in the pattern
        #[arg(long)]
        target_steps: Option<u32>,
    },
    /// Compute the waveform envelope of a WAV file
    Waveform {
        /// Path to the .wav file
        file: PathBuf,

        /// Number of envelope points
        #[arg(short, long)]
        points: Option<usize>,
    },
    /// Compute the playback rate that fits a loop region onto the grid
    Quantize {
        /// Region start in seconds
        #[arg(long, required_unless_present = "auto", allow_negative_numbers = true)]
        start: Option<f64>,

        /// Region end in seconds
        #[arg(long, required_unless_present = "auto", allow_negative_numbers = true)]
        end: Option<f64>,

        /// Grid length in steps (default: targetStepCount or one bar)
        #[arg(long)]
        steps: Option<u32>,

        /// Grid tempo
        #[arg(long, default_value = "120")]
        bpm: f64,

        /// Use the region as selected instead of snapping it to grid lines
        #[arg(long)]
        no_snap: bool,

        /// Select exactly the grid's length from zero (rate 1.0)
        #[arg(long, conflicts_with_all = ["start", "end", "no_snap"])]
        auto: bool,
    },
}

fn main() -> Result<()> {
    let cli = Cli::parse();

    let default_level = if cli.quiet { "error" } else { "info" };
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or(default_level))
        .init();

    let output = run(cli)?;
    println!("{}", output);
    Ok(())
}

fn load_config(path: Option<&Path>) -> Result<Config> {
    match path {
        Some(path) => Config::from_file(path)
            .with_context(|| format!("Failed to load config {}", path.display())),
        None => Ok(Config::default()),
    }
}

fn run(cli: Cli) -> Result<String> {
    let mut config = load_config(cli.config.as_deref())?;

    match cli.command {
        Commands::Import {
            file,
            steps_per_beat,
            target_steps,
        } => {
            if let Some(steps_per_beat) = steps_per_beat {
                config.steps_per_beat = steps_per_beat;
            }
            if target_steps.is_some() {
                config.target_step_count = target_steps;
            }

            config.validate()?;

            let bytes =
                fs::read(&file).with_context(|| format!("Failed to read {}", file.display()))?;
            let pattern = import_midi(&bytes, &config)
                .with_context(|| format!("{} could not be read as MIDI", file.display()))?;

            if cli.json {
                Ok(serde_json::to_string_pretty(&pattern)?)
            } else {
                Ok(render_pattern(&pattern))
            }
        }
        Commands::Waveform { file, points } => {
            if let Some(points) = points {
                config.point_count = points.max(1);
            }
            config.validate()?;

            let pcm = wav::read_wav(&file)
                .with_context(|| format!("Failed to read WAV {}", file.display()))?;
            let envelope = analyze_loop(&pcm, &config);

            if cli.json {
                Ok(serde_json::to_string_pretty(&envelope)?)
            } else {
                Ok(render_envelope(&envelope))
            }
        }
        Commands::Quantize {
            start,
            end,
            steps,
            bpm,
            no_snap,
            auto,
        } => {
            if no_snap {
                config.grid_snap = false;
            }
            let step_count = steps.unwrap_or_else(|| config.step_count());

            let result = if auto {
                LoopQuantizer::from_config(&config, step_count, bpm)?.auto_quantize()
            } else {
                let selection = LoopSelection::new(start.unwrap_or(0.0), end.unwrap_or(0.0));
                quantize_loop(selection, step_count, bpm, &config)
                    .context("Cannot apply quantization")?
            };

            if cli.json {
                Ok(serde_json::to_string_pretty(&result)?)
            } else {
                Ok(format!(
                    "{:.4}s - {:.4}s  rate {:.4}",
                    result.effective_start, result.effective_end, result.playback_rate
                ))
            }
        }
    }
}

/// Steps drawn per row; longer patterns are cut off with a count of the rest
const MAX_ROW_STEPS: u32 = 256;

/// One line per track: name, role, then a step row (`x` on note starts)
fn render_pattern(pattern: &QuantizedPattern) -> String {
    let mut lines = vec![format!(
        "{} steps @ {:.2} BPM, {} ticks per step",
        pattern.step_count, pattern.bpm, pattern.ticks_per_step
    )];

    let shown_steps = pattern.step_count.min(MAX_ROW_STEPS);
    let hidden_steps = pattern.step_count - shown_steps;

    let name_width = pattern.tracks.iter().map(|t| t.name.len()).max().unwrap_or(0);
    for track in &pattern.tracks {
        let mut row: String = track
            .triggers(shown_steps)
            .iter()
            .enumerate()
            .map(|(i, &hit)| match (hit, i as u32 % pattern.steps_per_beat) {
                (true, _) => 'x',
                (false, 0) => '|',
                (false, _) => '.',
            })
            .collect();
        if hidden_steps > 0 {
            row.push_str(&format!(" +{} steps", hidden_steps));
        }
        lines.push(format!(
            "{:<width$}  {:<10} {}",
            track.name,
            track.role.as_str(),
            row,
            width = name_width
        ));
        for warning in &track.warnings {
            lines.push(format!("  warning: {}", warning));
        }
    }

    lines.join("\n")
}

const BAR_WIDTH: usize = 40;
const SUMMARY_ROWS: usize = 16;

/// A short sideways bar chart of the envelope
fn render_envelope(envelope: &WaveformEnvelope) -> String {
    let mut lines = vec![format!(
        "{:.3}s, {} points, peak {:.2}{}",
        envelope.duration_seconds,
        envelope.len(),
        envelope.peak(),
        if envelope.is_fallback { " (no audio)" } else { "" }
    )];

    let stride = (envelope.len() + SUMMARY_ROWS - 1) / SUMMARY_ROWS;
    for chunk in envelope.points.chunks(stride.max(1)) {
        let amplitude = chunk.iter().map(|p| p.amplitude).fold(0.0, f32::max);
        let width = (amplitude * BAR_WIDTH as f32).round() as usize;
        lines.push(format!("{:>8.3}s {}", chunk[0].time_seconds, "#".repeat(width)));
    }

    lines.join("\n")
}
