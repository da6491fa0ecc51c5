//! CLI command implementations

use anyhow::{Context, Result};
use jird::report::{format_interval_table, format_music};
use jird::scala::standalone_scale;
use jird::midi::render as render_midi;
use jird::{parse, temper, to_lilypond, Piece};
use jirdconf::JirdConfig;
use std::fs;
use std::path::{Path, PathBuf};

/// Read, parse and temper one file. Music with no events at all is skipped.
fn load_piece(path: &Path, config: &JirdConfig) -> Result<Option<Piece>> {
    tracing::info!(path = %path.display(), "processing");
    let text = fs::read_to_string(path)
        .with_context(|| format!("Failed to read {}", path.display()))?;
    let piece = parse(&text).with_context(|| format!("Failed to parse {}", path.display()))?;
    let piece = temper(&piece, config.edo)?;

    if piece.is_empty() {
        tracing::info!(path = %path.display(), "no music, skipping");
        return Ok(None);
    }
    Ok(Some(piece))
}

fn title(path: &Path) -> String {
    path.file_stem()
        .map(|stem| stem.to_string_lossy().into_owned())
        .unwrap_or_default()
}

fn write(path: PathBuf, contents: impl AsRef<[u8]>) -> Result<PathBuf> {
    tracing::info!(path = %path.display(), "writing");
    fs::write(&path, contents).with_context(|| format!("Failed to write {}", path.display()))?;
    Ok(path)
}

/// Write FILE.midi for each file, with FILE.scl and FILE.kbm under scala
/// tuning. Returns the paths written.
pub fn midi(files: &[PathBuf], config: &JirdConfig) -> Result<Vec<PathBuf>> {
    let params = config.midi_params();
    let mut written = Vec::new();
    for file in files {
        let Some(piece) = load_piece(file, config)? else {
            continue;
        };
        let rendered = render_midi(&piece, &params)
            .with_context(|| format!("Failed to build MIDI for {}", file.display()))?;
        tracing::info!(channels = ?rendered.part_channels, "midi channels");

        written.push(write(file.with_extension("midi"), &rendered.bytes)?);
        if let Some(tuning) = &rendered.tuning {
            written.push(write(file.with_extension("scl"), tuning.scl(&title(file)))?);
            written.push(write(file.with_extension("kbm"), tuning.kbm())?);
        }
    }
    Ok(written)
}

/// Write FILE.ly for each file.
pub fn lilypond(files: &[PathBuf], config: &JirdConfig) -> Result<Vec<PathBuf>> {
    let params = config.lilypond_params();
    let mut written = Vec::new();
    for file in files {
        let Some(piece) = load_piece(file, config)? else {
            continue;
        };
        let score = to_lilypond(&piece, &params)
            .with_context(|| format!("Failed to build LilyPond score for {}", file.display()))?;
        written.push(write(file.with_extension("ly"), score)?);
    }
    Ok(written)
}

/// Write the octave-reduced scale of each file as FILE.scl.
pub fn scale(files: &[PathBuf], config: &JirdConfig) -> Result<Vec<PathBuf>> {
    let mut written = Vec::new();
    for file in files {
        let Some(piece) = load_piece(file, config)? else {
            continue;
        };
        let scl = standalone_scale(&piece, &title(file));
        written.push(write(file.with_extension("scl"), scl)?);
    }
    Ok(written)
}

/// The notes of each file, nested, or as JSON.
pub fn notes(files: &[PathBuf], config: &JirdConfig, json: bool) -> Result<Vec<String>> {
    let mut outputs = Vec::new();
    for file in files {
        let Some(piece) = load_piece(file, config)? else {
            continue;
        };
        outputs.push(if json {
            serde_json::to_string_pretty(&piece)?
        } else {
            format_music(&piece)
        });
    }
    Ok(outputs)
}

/// The interval table of each file.
pub fn table(files: &[PathBuf], config: &JirdConfig) -> Result<Vec<String>> {
    let mut outputs = Vec::new();
    for file in files {
        if let Some(piece) = load_piece(file, config)? {
            outputs.push(format_interval_table(&piece));
        }
    }
    Ok(outputs)
}
