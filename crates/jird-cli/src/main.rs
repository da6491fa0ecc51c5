//! jird - compile just intonation notation
//!
//! Subcommands:
//! - `jird midi <files>` - Write a MIDI file (plus Scala tables) per file
//! - `jird lilypond <files>` - Write a LilyPond score per file
//! - `jird scale <files>` - Write the scale of each file as a `.scl`
//! - `jird notes <files>` - Print the parsed notes
//! - `jird table <files>` - Print the interval table

use anyhow::{Context, Result};
use clap::{Args, Parser, Subcommand};
use jird::TuningMethod;
use jirdconf::JirdConfig;
use std::path::PathBuf;

mod commands;

#[derive(Parser)]
#[command(name = "jird")]
#[command(about = "Compile music written as just intonation ratios")]
#[command(version)]
struct Cli {
    /// Config file, replacing ./jird.toml
    #[arg(short, long, global = true)]
    config: Option<PathBuf>,

    /// Show info logs
    #[arg(short, long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

/// Files to compile and how to temper them.
#[derive(Args)]
struct Input {
    /// Text files containing music
    #[arg(required = true)]
    files: Vec<PathBuf>,

    /// Temper with this many equal divisions of the octave
    #[arg(short, long)]
    edo: Option<u32>,
}

#[derive(Subcommand)]
enum Commands {
    /// Write FILE.midi, and FILE.scl and FILE.kbm under scala tuning
    Midi {
        #[command(flatten)]
        input: Input,

        /// Seconds per beat
        #[arg(short)]
        t: Option<f64>,

        /// Frequency in Hz of the ratio 1
        #[arg(short)]
        f: Option<f64>,

        /// pitch_bend or scala
        #[arg(long)]
        tuning_method: Option<TuningMethod>,

        /// Semitones covered by a full pitch bend
        #[arg(long)]
        pitch_bend_range: Option<u32>,

        /// Comma-separated MIDI programs, one per part
        #[arg(short, long)]
        programs: Option<String>,
    },

    /// Write FILE.ly
    Lilypond {
        #[command(flatten)]
        input: Input,

        /// Frequency in Hz of the ratio 1
        #[arg(short)]
        f: Option<f64>,
    },

    /// Write the scale of FILE as FILE.scl
    Scale {
        #[command(flatten)]
        input: Input,
    },

    /// Print the notes of each file
    Notes {
        #[command(flatten)]
        input: Input,

        /// Print JSON instead
        #[arg(long)]
        json: bool,
    },

    /// Print the intervals between every pair of frequencies
    Table {
        #[command(flatten)]
        input: Input,
    },
}

impl Commands {
    fn input(&self) -> &Input {
        match self {
            Commands::Midi { input, .. }
            | Commands::Lilypond { input, .. }
            | Commands::Scale { input }
            | Commands::Notes { input, .. }
            | Commands::Table { input } => input,
        }
    }

    /// Layer command line flags over the loaded configuration.
    fn apply_to(&self, config: &mut JirdConfig) -> Result<()> {
        if let Some(edo) = self.input().edo {
            config.edo = Some(edo);
        }
        match self {
            Commands::Midi {
                t,
                f,
                tuning_method,
                pitch_bend_range,
                programs,
                ..
            } => {
                if let Some(t) = t {
                    config.t = *t;
                }
                if let Some(f) = f {
                    config.f = *f;
                }
                if let Some(tuning_method) = tuning_method {
                    config.tuning_method = *tuning_method;
                }
                if let Some(range) = pitch_bend_range {
                    config.pitch_bend_range = *range;
                }
                if let Some(programs) = programs {
                    config.set_programs(programs)?;
                }
            }
            Commands::Lilypond { f: Some(f), .. } => config.f = *f,
            _ => {}
        }
        Ok(())
    }
}

fn init_tracing(verbose: bool) {
    let default = if verbose { "info" } else { "warn" };
    tracing_subscriber::fmt()
        .with_writer(std::io::stderr)
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(default)),
        )
        .init();
}

fn main() -> Result<()> {
    let cli = Cli::parse();

    let (mut config, sources) = JirdConfig::load_with_sources_from(cli.config.as_deref())
        .context("Failed to load configuration")?;
    config.verbose |= cli.verbose;
    cli.command.apply_to(&mut config)?;
    config.validate()?;

    init_tracing(config.verbose);
    tracing::info!(
        files = ?sources.files,
        env = ?sources.env_overrides,
        "loaded configuration"
    );

    let files = &cli.command.input().files;
    match &cli.command {
        Commands::Midi { .. } => {
            commands::midi(files, &config)?;
        }
        Commands::Lilypond { .. } => {
            commands::lilypond(files, &config)?;
        }
        Commands::Scale { .. } => {
            commands::scale(files, &config)?;
        }
        Commands::Notes { json, .. } => {
            for output in commands::notes(files, &config, *json)? {
                if *json {
                    println!("{}", output);
                } else {
                    print!("{}", output);
                }
            }
        }
        Commands::Table { .. } => {
            for output in commands::table(files, &config)? {
                print!("{}", output);
            }
        }
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::CommandFactory;

    #[test]
    fn test_cli_definition() {
        Cli::command().debug_assert();
    }

    #[test]
    fn test_flags_override_config() {
        let cli = Cli::try_parse_from([
            "jird",
            "-v",
            "midi",
            "tune.jird",
            "-t",
            "0.25",
            "-e",
            "31",
            "--tuning-method",
            "pitch_bend",
            "-p",
            "47,48",
        ])
        .unwrap();
        let mut config = JirdConfig::default();
        cli.command.apply_to(&mut config).unwrap();

        assert!(cli.verbose);
        assert_eq!(config.t, 0.25);
        assert_eq!(config.edo, Some(31));
        assert_eq!(config.tuning_method, TuningMethod::PitchBend);
        assert_eq!(config.programs(), vec![Some(47), Some(48)]);
        assert_eq!(cli.command.input().files, vec![PathBuf::from("tune.jird")]);
    }

    #[test]
    fn test_files_are_required() {
        assert!(Cli::try_parse_from(["jird", "notes"]).is_err());
        assert!(Cli::try_parse_from(["jird", "midi", "a.jird", "--tuning-method", "equal"]).is_err());
    }
}
