//! Configuration loading for Jird.
//!
//! Settings describe how ratios become sound: the base frequency and beat
//! length, how MIDI notes are retuned, an optional equal temperament, and a
//! MIDI program per part.
//!
//! # Usage
//!
//! ```rust,no_run
//! use jirdconf::JirdConfig;
//!
//! let config = JirdConfig::load().expect("Failed to load config");
//! println!("1:1 sounds at {} Hz for {} s", config.f, config.t);
//! ```
//!
//! # Config File Locations
//!
//! Files are loaded in order (later wins):
//! 1. `/etc/jird/config.toml` (system)
//! 2. `~/.config/jird/config.toml` (user)
//! 3. `./jird.toml` (local override), or the file given with `--config`
//! 4. Environment variables (`JIRD_*`)
//!
//! # Example Config
//!
//! ```toml
//! t = 0.4
//! f = 264.0
//! tuning_method = "pitch_bend"
//! pitch_bend_range = 12
//! edo = 31
//! verbose = true
//!
//! [[parts]]
//! program = 47
//!
//! [[parts]]
//! program = 1
//! ```
//!
//! `programs = "47,1"` is shorthand for the two `[[parts]]` tables above.

pub mod loader;

pub use loader::{discover_config_files_with_override, expand_path, ConfigSources};

use jird::{LilypondParams, MidiParams, TuningMethod};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use thiserror::Error;

/// Configuration loading errors.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Failed to read config file {path}: {source}")]
    FileRead {
        path: PathBuf,
        source: std::io::Error,
    },

    #[error("Failed to parse config file {path}: {message}")]
    Parse { path: PathBuf, message: String },

    #[error("Invalid value for {key}: {message}")]
    Invalid { key: String, message: String },
}

impl ConfigError {
    fn invalid(key: &str, message: impl Into<String>) -> Self {
        ConfigError::Invalid {
            key: key.to_string(),
            message: message.into(),
        }
    }
}

/// Per-part settings.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct PartConfig {
    /// General MIDI program, counting from 1.
    pub program: Option<u8>,
}

/// Complete Jird configuration.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct JirdConfig {
    /// Seconds per beat; the note `1:1` lasts `t` seconds.
    pub t: f64,
    /// Base frequency in Hz; the note `1:1` sounds at `f`.
    pub f: f64,
    pub tuning_method: TuningMethod,
    /// Semitones covered by a full pitch bend.
    pub pitch_bend_range: u32,
    /// Temper to this many equal divisions of the octave.
    pub edo: Option<u32>,
    pub verbose: bool,
    pub parts: Vec<PartConfig>,
}

impl Default for JirdConfig {
    fn default() -> Self {
        JirdConfig {
            t: 0.5,
            f: 440.0,
            tuning_method: TuningMethod::default(),
            pitch_bend_range: 2,
            edo: None,
            verbose: false,
            parts: Vec::new(),
        }
    }
}

impl JirdConfig {
    /// Load configuration from all sources.
    ///
    /// Load order (later wins):
    /// 1. Compiled defaults
    /// 2. `/etc/jird/config.toml`
    /// 3. `~/.config/jird/config.toml`
    /// 4. `./jird.toml`
    /// 5. Environment variables
    pub fn load() -> Result<Self, ConfigError> {
        let (config, _sources) = Self::load_with_sources_from(None)?;
        Ok(config)
    }

    /// Load configuration from a specific file path, then apply env overrides.
    ///
    /// If `config_path` is provided, it takes precedence over the local
    /// `./jird.toml` override. System and user configs still load first.
    pub fn load_from(config_path: Option<&Path>) -> Result<Self, ConfigError> {
        let (config, _sources) = Self::load_with_sources_from(config_path)?;
        Ok(config)
    }

    /// Load configuration from optional path and return information about sources.
    pub fn load_with_sources_from(
        config_path: Option<&Path>,
    ) -> Result<(Self, ConfigSources), ConfigError> {
        let files = loader::discover_config_files_with_override(config_path);
        Self::load_files(&files, |key| std::env::var(key).ok())
    }

    /// Layer `files` in order over the defaults, then the variables `env`
    /// returns, and validate the result.
    pub fn load_files(
        files: &[PathBuf],
        env: impl Fn(&str) -> Option<String>,
    ) -> Result<(Self, ConfigSources), ConfigError> {
        let mut sources = ConfigSources::default();
        let mut config = JirdConfig::default();

        for path in files {
            loader::load_from_file(path)?.apply_to(&mut config);
            sources.files.push(path.clone());
        }

        loader::apply_env_overrides(&mut config, &mut sources, env)?;
        config.validate()?;

        Ok((config, sources))
    }

    /// Check ranges the types alone do not.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if !(self.t > 0.0 && self.t.is_finite()) {
            return Err(ConfigError::invalid("t", format!("{} is not positive", self.t)));
        }
        if !(self.f > 0.0 && self.f.is_finite()) {
            return Err(ConfigError::invalid("f", format!("{} is not positive", self.f)));
        }
        if self.pitch_bend_range == 0 {
            return Err(ConfigError::invalid("pitch_bend_range", "0 is not positive"));
        }
        if self.edo == Some(0) {
            return Err(ConfigError::invalid("edo", "0 is not positive"));
        }
        for part in &self.parts {
            if let Some(program) = part.program {
                if !(1..=128).contains(&program) {
                    return Err(ConfigError::invalid(
                        "program",
                        format!("{} is outside 1..=128", program),
                    ));
                }
            }
        }
        Ok(())
    }

    /// Set per-part programs from a comma list such as `47,48`.
    pub fn set_programs(&mut self, programs: &str) -> Result<(), ConfigError> {
        self.parts = parse_programs(programs)?;
        Ok(())
    }

    pub fn programs(&self) -> Vec<Option<u8>> {
        self.parts.iter().map(|part| part.program).collect()
    }

    /// MIDI settings for this configuration.
    pub fn midi_params(&self) -> MidiParams {
        MidiParams {
            f0: self.f,
            t0: self.t,
            pitch_bend_range: self.pitch_bend_range,
            tuning: self.tuning_method,
            programs: self.programs(),
            ..MidiParams::default()
        }
    }

    /// LilyPond settings for this configuration.
    pub fn lilypond_params(&self) -> LilypondParams {
        LilypondParams {
            f0: self.f,
            ..LilypondParams::default()
        }
    }

    /// Serialize config to TOML string.
    pub fn to_toml(&self) -> String {
        let mut output = String::new();

        output.push_str("# Jird Configuration\n\n");
        output.push_str(&format!("t = {:?}\n", self.t));
        output.push_str(&format!("f = {:?}\n", self.f));
        output.push_str(&format!("tuning_method = \"{}\"\n", self.tuning_method));
        output.push_str(&format!("pitch_bend_range = {}\n", self.pitch_bend_range));
        if let Some(edo) = self.edo {
            output.push_str(&format!("edo = {}\n", edo));
        }
        output.push_str(&format!("verbose = {}\n", self.verbose));

        for part in &self.parts {
            output.push_str("\n[[parts]]\n");
            if let Some(program) = part.program {
                output.push_str(&format!("program = {}\n", program));
            }
        }

        output
    }
}

pub(crate) fn parse_programs(programs: &str) -> Result<Vec<PartConfig>, ConfigError> {
    programs
        .split(',')
        .map(|program| {
            let program = program.trim();
            program
                .parse::<u8>()
                .map(|program| PartConfig {
                    program: Some(program),
                })
                .map_err(|e| ConfigError::invalid("programs", format!("'{}': {}", program, e)))
        })
        .collect()
}
