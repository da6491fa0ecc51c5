//! MIDI file generation.
//!
//! Produces a format 1 Standard MIDI File: a tempo track followed by one
//! track per part. Exact frequencies are reached one of two ways:
//!
//! - [`TuningMethod::PitchBend`] gives every simultaneous note its own
//!   channel and bends it from the nearest equal-tempered key.
//! - [`TuningMethod::Scala`] maps each distinct frequency to its own key
//!   and relies on the synthesizer loading a matching [`ScalaTuning`].

mod writer;

use std::collections::BTreeMap;
use std::fmt;
use std::str::FromStr;

use num_bigint::BigInt;
use num_rational::BigRational;
use num_traits::ToPrimitive;
use serde::{Deserialize, Serialize};

use crate::error::{ConstraintViolation, Error, Result};
use crate::music::{height, Note, Part, Piece};
use crate::quantity::{Number, Quantity};
use crate::scala::ScalaTuning;

pub use writer::{encode_variable_length, fourteen_bit, MAX_VARIABLE_LENGTH};
use writer::{header_chunk, TrackWriter};

/// Frequency of MIDI note 60, nine semitones below A 440.
pub const MIDDLE_C_FREQUENCY: f64 = 261.625_565_300_598_6;

/// Ticks per quarter note. Divisible by 2⁶, 3, 5, and 7 so common tuplets
/// land on whole ticks.
pub const DEFAULT_TICKS_PER_BEAT: u16 = 960 * 7;

pub const PITCH_BEND_CENTER: u16 = 0x2000;
pub const PITCH_BEND_MAX: u16 = 0x3FFF;

/// Channels available to the pitch bend strategy. Channel 0 may be an MPE
/// master channel and channel 9 is General MIDI percussion.
const PITCH_BEND_CHANNELS: [u8; 14] = [1, 2, 3, 4, 5, 6, 7, 8, 10, 11, 12, 13, 14, 15];

const MIDI_CHANNELS: usize = 16;

/// How exact frequencies are reached.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TuningMethod {
    PitchBend,
    #[default]
    Scala,
}

impl fmt::Display for TuningMethod {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TuningMethod::PitchBend => write!(f, "pitch_bend"),
            TuningMethod::Scala => write!(f, "scala"),
        }
    }
}

impl FromStr for TuningMethod {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "pitch_bend" => Ok(TuningMethod::PitchBend),
            "scala" => Ok(TuningMethod::Scala),
            _ => Err(format!(
                "unknown tuning method '{}' (expected pitch_bend or scala)",
                s
            )),
        }
    }
}

/// Parameters for MIDI generation
#[derive(Debug, Clone, PartialEq)]
pub struct MidiParams {
    /// Frequency in Hz of the ratio 1.
    pub f0: f64,
    /// Seconds per beat.
    pub t0: f64,
    pub ticks_per_beat: u16,
    /// Semitones covered by a full pitch bend.
    pub pitch_bend_range: u32,
    pub tuning: TuningMethod,
    /// 1-based program for each part. Parts past the end reuse the last entry.
    pub programs: Vec<Option<u8>>,
}

impl Default for MidiParams {
    fn default() -> Self {
        MidiParams {
            f0: 440.0,
            t0: 0.5,
            ticks_per_beat: DEFAULT_TICKS_PER_BEAT,
            pitch_bend_range: 2,
            tuning: TuningMethod::default(),
            programs: Vec::new(),
        }
    }
}

/// One note as MIDI values.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct MidiNote {
    pub pitch: u8,
    /// Absent under scala tuning.
    pub bend: Option<u16>,
    pub ticks: u32,
    pub velocity: u8,
}

/// Convert a note for the pitch bend strategy.
///
/// The key is the nearest equal-tempered semitone and the bend covers the
/// remainder. Rests play key 0 silently at the center bend.
pub fn to_midi_note(
    note: &Note,
    f0: f64,
    pitch_bend_range: u32,
    ticks_per_beat: u16,
) -> Result<MidiNote> {
    if pitch_bend_range == 0 {
        return Err(ConstraintViolation::InvalidPitchBendRange.into());
    }
    let ticks = duration_ticks(&note.duration, ticks_per_beat)?;

    let real_frequency = note.frequency.evaluate().to_f64() * f0;
    if real_frequency == 0.0 {
        return Ok(MidiNote {
            pitch: 0,
            bend: Some(PITCH_BEND_CENTER),
            ticks,
            velocity: 0,
        });
    }

    let exact_semitones = 12.0 * (real_frequency / MIDDLE_C_FREQUENCY).log2();
    let semitones = exact_semitones.round_ties_even();
    let remainder = exact_semitones - semitones;

    let pitch = 60 + semitones as i64;
    let bend_per_semitone =
        f64::from(PITCH_BEND_MAX - PITCH_BEND_CENTER) / f64::from(pitch_bend_range);
    let bend = (f64::from(PITCH_BEND_CENTER) + remainder * bend_per_semitone).round_ties_even()
        as i64;

    Ok(MidiNote {
        pitch: midi_pitch(pitch)?,
        bend: Some(pitch_bend(bend)?),
        ticks,
        velocity: velocity(&note.volume)?,
    })
}

/// Convert a note for the scala strategy, looking its key up in
/// `frequency_map`. Rests play key 0 silently.
pub fn scala_midi_note(
    note: &Note,
    frequency_map: &BTreeMap<Number, u8>,
    ticks_per_beat: u16,
) -> Result<MidiNote> {
    let ticks = duration_ticks(&note.duration, ticks_per_beat)?;
    if note.is_rest() {
        return Ok(MidiNote {
            pitch: 0,
            bend: None,
            ticks,
            velocity: 0,
        });
    }

    let frequency = note.frequency.evaluate();
    let pitch = frequency_map.get(&frequency).copied().ok_or_else(|| {
        ConstraintViolation::UnmappedFrequency {
            frequency: frequency.to_string(),
        }
    })?;

    Ok(MidiNote {
        pitch,
        bend: None,
        ticks,
        velocity: velocity(&note.volume)?,
    })
}

fn midi_pitch(pitch: i64) -> Result<u8> {
    u8::try_from(pitch)
        .ok()
        .filter(|p| *p <= 0x7F)
        .ok_or_else(|| ConstraintViolation::PitchOutOfRange { pitch }.into())
}

fn pitch_bend(bend: i64) -> Result<u16> {
    u16::try_from(bend)
        .ok()
        .filter(|b| *b <= PITCH_BEND_MAX)
        .ok_or_else(|| ConstraintViolation::BendOutOfRange { bend }.into())
}

/// Volume 1 is velocity 64; louder volumes saturate at 127.
fn velocity(volume: &Quantity) -> Result<u8> {
    let velocity = (volume.evaluate().to_f64() * 64.0).round_ties_even();
    if velocity.is_nan() || velocity < 0.0 {
        return Err(ConstraintViolation::VelocityOutOfRange {
            velocity: velocity as i64,
        }
        .into());
    }
    Ok(velocity.min(127.0) as u8)
}

/// Ticks for a duration in beats. Must come out whole and fit in a
/// variable-length delta time.
fn duration_ticks(duration: &Quantity, ticks_per_beat: u16) -> Result<u32> {
    let non_integral = || ConstraintViolation::NonIntegralTicks {
        duration: duration.to_string(),
        ticks_per_beat,
    };
    let out_of_range = || ConstraintViolation::TicksOutOfRange {
        duration: duration.to_string(),
    };
    let ticks = match duration.evaluate() {
        Number::Exact(beats) => {
            let ticks = beats * BigRational::from_integer(BigInt::from(ticks_per_beat));
            if !ticks.is_integer() {
                return Err(non_integral().into());
            }
            ticks.to_integer().to_u32().ok_or_else(out_of_range)?
        }
        Number::Float(beats) => {
            let ticks = beats * f64::from(ticks_per_beat);
            if ticks.fract() != 0.0 || !ticks.is_finite() {
                return Err(non_integral().into());
            }
            if !(0.0..=f64::from(MAX_VARIABLE_LENGTH)).contains(&ticks) {
                return Err(out_of_range().into());
            }
            ticks as u32
        }
    };
    if ticks > MAX_VARIABLE_LENGTH {
        return Err(out_of_range().into());
    }
    Ok(ticks)
}

/// Bends first, then note-ons, then note-offs released together.
fn write_pitch_bend_chord(
    track: &mut TrackWriter,
    notes: &[Note],
    channels: &[u8],
    params: &MidiParams,
) -> Result<()> {
    if notes.is_empty() {
        return Ok(());
    }
    if notes.len() > channels.len() {
        return Err(Error::Contract(format!(
            "{} simultaneous notes but {} channels",
            notes.len(),
            channels.len()
        )));
    }

    let midi_notes = notes
        .iter()
        .map(|note| to_midi_note(note, params.f0, params.pitch_bend_range, params.ticks_per_beat))
        .collect::<Result<Vec<_>>>()?;
    let ticks = shared_ticks(&midi_notes)?;

    for (note, &channel) in midi_notes.iter().zip(channels) {
        track.pitch_bend(channel, note.bend.unwrap_or(PITCH_BEND_CENTER));
    }
    for (note, &channel) in midi_notes.iter().zip(channels) {
        track.note_on(channel, note.pitch, note.velocity);
    }
    track.advance(ticks);
    for (note, &channel) in midi_notes.iter().zip(channels) {
        track.note_off(channel, note.pitch);
    }
    Ok(())
}

/// Note-ons then note-offs, all on one channel.
fn write_scala_chord(
    track: &mut TrackWriter,
    notes: &[Note],
    channel: u8,
    frequency_map: &BTreeMap<Number, u8>,
    ticks_per_beat: u16,
) -> Result<()> {
    if notes.is_empty() {
        return Ok(());
    }

    let midi_notes = notes
        .iter()
        .map(|note| scala_midi_note(note, frequency_map, ticks_per_beat))
        .collect::<Result<Vec<_>>>()?;
    let ticks = shared_ticks(&midi_notes)?;

    for note in &midi_notes {
        track.note_on(channel, note.pitch, note.velocity);
    }
    track.advance(ticks);
    for note in &midi_notes {
        track.note_off(channel, note.pitch);
    }
    Ok(())
}

fn shared_ticks(notes: &[MidiNote]) -> Result<u32> {
    let ticks = notes[0].ticks;
    if notes.iter().any(|note| note.ticks != ticks) {
        return Err(Error::Contract(
            "chord notes have different durations".to_string(),
        ));
    }
    Ok(ticks)
}

/// The program for part `index`, checked and converted to its data byte.
fn part_program(programs: &[Option<u8>], index: usize) -> Result<Option<u8>> {
    let program = match programs.get(index).or(programs.last()) {
        Some(program) => *program,
        None => return Ok(None),
    };
    match program {
        Some(p) if (1..=128).contains(&p) => Ok(Some(p - 1)),
        Some(p) => Err(ConstraintViolation::InvalidProgram { program: p }.into()),
        None => Ok(None),
    }
}

fn tempo_track(t0: f64) -> Result<Vec<u8>> {
    let microseconds = (t0 / 1e-6).round_ties_even() as i64;
    let microseconds = u32::try_from(microseconds)
        .ok()
        .filter(|us| *us <= 0xFF_FFFF)
        .ok_or(ConstraintViolation::TempoOutOfRange { microseconds })?;

    let mut track = TrackWriter::new();
    track.tempo(microseconds);
    Ok(track.finish())
}

fn pitch_bend_track(
    part: &Part,
    channels: &[u8],
    program: Option<u8>,
    params: &MidiParams,
) -> Result<Vec<u8>> {
    let mut track = TrackWriter::new();
    if let Some(program) = program {
        for &channel in channels {
            track.program_change(channel, program);
        }
    }
    for event in &part.events {
        write_pitch_bend_chord(&mut track, event.notes(), channels, params)?;
    }
    Ok(track.finish())
}

fn scala_track(
    part: &Part,
    channel: u8,
    program: Option<u8>,
    tuning: &ScalaTuning,
    ticks_per_beat: u16,
) -> Result<Vec<u8>> {
    let mut track = TrackWriter::new();
    if let Some(program) = program {
        track.program_change(channel, program);
    }
    for event in &part.events {
        write_scala_chord(
            &mut track,
            event.notes(),
            channel,
            &tuning.frequency_map,
            ticks_per_beat,
        )?;
    }
    Ok(track.finish())
}

/// A generated MIDI file and what a player needs to sound it correctly.
#[derive(Debug, Clone, PartialEq)]
pub struct MidiRender {
    pub bytes: Vec<u8>,
    /// Channels used by each part, in part order.
    pub part_channels: Vec<Vec<u8>>,
    /// Present under scala tuning; the `.scl` and `.kbm` to load.
    pub tuning: Option<ScalaTuning>,
}

/// Render a piece to a MIDI file.
pub fn render(piece: &Piece, params: &MidiParams) -> Result<MidiRender> {
    let mut tracks = vec![tempo_track(params.t0)?];
    let mut part_channels = Vec::with_capacity(piece.parts.len());

    let tuning = match params.tuning {
        TuningMethod::PitchBend => {
            let mut next = 0;
            for (index, part) in piece.parts.iter().enumerate() {
                let needed = height(part);
                let available = PITCH_BEND_CHANNELS.len() - next;
                if needed > available {
                    return Err(ConstraintViolation::ChannelsExhausted {
                        part: index,
                        needed,
                        available,
                    }
                    .into());
                }
                let channels = &PITCH_BEND_CHANNELS[next..next + needed];
                next += needed;
                tracing::debug!(part = index, ?channels, "assigned pitch bend channels");

                let program = part_program(&params.programs, index)?;
                tracks.push(pitch_bend_track(part, channels, program, params)?);
                part_channels.push(channels.to_vec());
            }
            None
        }
        TuningMethod::Scala => {
            if piece.parts.len() > MIDI_CHANNELS {
                return Err(ConstraintViolation::TooManyParts {
                    parts: piece.parts.len(),
                    available: MIDI_CHANNELS,
                }
                .into());
            }
            let tuning = ScalaTuning::for_music(piece, params.f0)?;
            for (index, part) in piece.parts.iter().enumerate() {
                let channel = index as u8;
                tracing::debug!(part = index, channel, "assigned scala channel");
                let program = part_program(&params.programs, index)?;
                tracks.push(scala_track(
                    part,
                    channel,
                    program,
                    &tuning,
                    params.ticks_per_beat,
                )?);
                part_channels.push(vec![channel]);
            }
            Some(tuning)
        }
    };

    let track_count = u16::try_from(tracks.len()).map_err(|_| ConstraintViolation::TooManyParts {
        parts: piece.parts.len(),
        available: usize::from(u16::MAX) - 1,
    })?;

    let mut bytes = header_chunk(1, track_count, params.ticks_per_beat);
    for track in tracks {
        bytes.extend(track);
    }

    tracing::info!(
        tuning = %params.tuning,
        parts = piece.parts.len(),
        bytes = bytes.len(),
        "rendered midi"
    );

    Ok(MidiRender {
        bytes,
        part_channels,
        tuning,
    })
}

/// Render a piece and keep only the file bytes.
pub fn generate(piece: &Piece, params: &MidiParams) -> Result<Vec<u8>> {
    Ok(render(piece, params)?.bytes)
}
