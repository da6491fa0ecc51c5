//! Music representation: notes, chords, parts, and pieces.
//!
//! A [`Piece`] is a set of simultaneous [`Part`]s. A part is a sequence of
//! [`Event`]s, each either a single [`Note`] or a [`Chord`] of notes that
//! sound together. Frequencies, durations, and volumes are ratios of basic
//! units chosen at output time: a frequency of `5/4` sounds at `5/4 * f0`.

use std::collections::BTreeSet;
use std::convert::Infallible;

use num_rational::Rational64;
use serde::{Deserialize, Serialize};

use crate::quantity::{Number, Quantity};

/// A single note. A zero frequency is a rest.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Note {
    pub frequency: Quantity,
    pub duration: Quantity,
    pub volume: Quantity,
}

impl Note {
    /// A note at unit volume.
    pub fn new(frequency: impl Into<Quantity>, duration: impl Into<Quantity>) -> Self {
        Note {
            frequency: frequency.into(),
            duration: duration.into(),
            volume: Quantity::one(),
        }
    }

    /// A rest of the given duration.
    pub fn rest(duration: impl Into<Quantity>) -> Self {
        Note::new(Rational64::from_integer(0), duration)
    }

    pub fn with_volume(mut self, volume: impl Into<Quantity>) -> Self {
        self.volume = volume.into();
        self
    }

    pub fn is_rest(&self) -> bool {
        self.frequency.evaluate().is_zero()
    }

    /// Cents above the basic frequency; `None` for a rest.
    pub fn cents(&self) -> Option<f64> {
        self.frequency.log2().map(|octaves| 1200.0 * octaves)
    }
}

/// Notes sounding together. Built from one chord literal, so every note
/// shares the chord's duration and volume.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub struct Chord {
    pub notes: Vec<Note>,
}

impl Chord {
    pub fn new(notes: Vec<Note>) -> Self {
        Chord { notes }
    }
}

/// One step of a part.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Event {
    Note(Note),
    Chord(Chord),
}

impl Event {
    /// The notes sounding during this event.
    pub fn notes(&self) -> &[Note] {
        match self {
            Event::Note(note) => std::slice::from_ref(note),
            Event::Chord(chord) => &chord.notes,
        }
    }
}

impl From<Note> for Event {
    fn from(note: Note) -> Self {
        Event::Note(note)
    }
}

impl From<Chord> for Event {
    fn from(chord: Chord) -> Self {
        Event::Chord(chord)
    }
}

/// Events played one after another.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub struct Part {
    pub events: Vec<Event>,
}

impl Part {
    pub fn new(events: Vec<Event>) -> Self {
        Part { events }
    }

    pub fn is_empty(&self) -> bool {
        self.events.is_empty()
    }
}

/// Parts played simultaneously.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub struct Piece {
    pub parts: Vec<Part>,
}

impl Piece {
    pub fn new(parts: Vec<Part>) -> Self {
        Piece { parts }
    }

    /// True when no part holds any event.
    pub fn is_empty(&self) -> bool {
        self.parts.iter().all(Part::is_empty)
    }
}

/// A borrowed view of any level of the music tree.
#[derive(Debug, Clone, Copy)]
pub enum Music<'a> {
    Note(&'a Note),
    Chord(&'a Chord),
    Part(&'a Part),
    Piece(&'a Piece),
}

impl<'a> From<&'a Note> for Music<'a> {
    fn from(note: &'a Note) -> Self {
        Music::Note(note)
    }
}

impl<'a> From<&'a Chord> for Music<'a> {
    fn from(chord: &'a Chord) -> Self {
        Music::Chord(chord)
    }
}

impl<'a> From<&'a Event> for Music<'a> {
    fn from(event: &'a Event) -> Self {
        match event {
            Event::Note(note) => Music::Note(note),
            Event::Chord(chord) => Music::Chord(chord),
        }
    }
}

impl<'a> From<&'a Part> for Music<'a> {
    fn from(part: &'a Part) -> Self {
        Music::Part(part)
    }
}

impl<'a> From<&'a Piece> for Music<'a> {
    fn from(piece: &'a Piece) -> Self {
        Music::Piece(piece)
    }
}

impl<'a> Music<'a> {
    /// Direct children; empty for a note.
    pub fn children(self) -> Vec<Music<'a>> {
        match self {
            Music::Note(_) => Vec::new(),
            Music::Chord(chord) => chord.notes.iter().map(Music::from).collect(),
            Music::Part(part) => part.events.iter().map(Music::from).collect(),
            Music::Piece(piece) => piece.parts.iter().map(Music::from).collect(),
        }
    }
}

/// Total duration. Sequential parts add up; simultaneous chords and pieces
/// last as long as their longest member.
pub fn total_duration<'a>(music: impl Into<Music<'a>>) -> Number {
    match music.into() {
        Music::Note(note) => note.duration.evaluate(),
        Music::Chord(chord) => longest(chord.notes.iter().map(|note| total_duration(note))),
        Music::Part(part) => part
            .events
            .iter()
            .map(|event| total_duration(event))
            .fold(Number::zero(), |total, d| total + d),
        Music::Piece(piece) => longest(piece.parts.iter().map(|part| total_duration(part))),
    }
}

fn longest(durations: impl Iterator<Item = Number>) -> Number {
    durations.max().unwrap_or_else(Number::zero)
}

/// Most notes sounding at once. Chords and pieces stack their members;
/// a part is as high as its highest event.
pub fn height<'a>(music: impl Into<Music<'a>>) -> usize {
    match music.into() {
        Music::Note(_) => 1,
        Music::Chord(chord) => chord.notes.iter().map(|note| height(note)).sum(),
        Music::Part(part) => part.events.iter().map(|event| height(event)).max().unwrap_or(0),
        Music::Piece(piece) => piece.parts.iter().map(|part| height(part)).sum(),
    }
}

/// Distinct non-zero frequencies, as evaluated values.
pub fn frequencies_set<'a>(music: impl Into<Music<'a>>) -> BTreeSet<Number> {
    let mut set = BTreeSet::new();
    collect_frequencies(music.into(), &mut set);
    set
}

fn collect_frequencies(music: Music<'_>, set: &mut BTreeSet<Number>) {
    match music {
        Music::Note(note) => {
            let frequency = note.frequency.evaluate();
            if !frequency.is_zero() {
                set.insert(frequency);
            }
        }
        other => {
            for child in other.children() {
                collect_frequencies(child, set);
            }
        }
    }
}

/// Distinct non-zero frequencies, lowest first.
pub fn all_frequencies<'a>(music: impl Into<Music<'a>>) -> Vec<Number> {
    frequencies_set(music).into_iter().collect()
}

/// Lowest non-zero frequency, or positive infinity when there is none.
pub fn lowest<'a>(music: impl Into<Music<'a>>) -> Number {
    frequencies_set(music)
        .into_iter()
        .next()
        .unwrap_or(Number::Float(f64::INFINITY))
}

/// Rebuild music with a function applied to every note, keeping structure.
pub trait MapNotes: Sized {
    fn try_map_notes<E, F>(&self, f: &mut F) -> Result<Self, E>
    where
        F: FnMut(&Note) -> Result<Note, E>;

    fn map_notes<F>(&self, mut f: F) -> Self
    where
        F: FnMut(&Note) -> Note,
    {
        match self.try_map_notes(&mut |note| Ok::<_, Infallible>(f(note))) {
            Ok(mapped) => mapped,
            Err(never) => match never {},
        }
    }
}

impl MapNotes for Note {
    fn try_map_notes<E, F>(&self, f: &mut F) -> Result<Self, E>
    where
        F: FnMut(&Note) -> Result<Note, E>,
    {
        f(self)
    }
}

impl MapNotes for Chord {
    fn try_map_notes<E, F>(&self, f: &mut F) -> Result<Self, E>
    where
        F: FnMut(&Note) -> Result<Note, E>,
    {
        let notes = self.notes.iter().map(&mut *f).collect::<Result<_, E>>()?;
        Ok(Chord { notes })
    }
}

impl MapNotes for Event {
    fn try_map_notes<E, F>(&self, f: &mut F) -> Result<Self, E>
    where
        F: FnMut(&Note) -> Result<Note, E>,
    {
        Ok(match self {
            Event::Note(note) => Event::Note(note.try_map_notes(f)?),
            Event::Chord(chord) => Event::Chord(chord.try_map_notes(f)?),
        })
    }
}

impl MapNotes for Part {
    fn try_map_notes<E, F>(&self, f: &mut F) -> Result<Self, E>
    where
        F: FnMut(&Note) -> Result<Note, E>,
    {
        let events = self
            .events
            .iter()
            .map(|event| event.try_map_notes(f))
            .collect::<Result<_, E>>()?;
        Ok(Part { events })
    }
}

impl MapNotes for Piece {
    fn try_map_notes<E, F>(&self, f: &mut F) -> Result<Self, E>
    where
        F: FnMut(&Note) -> Result<Note, E>,
    {
        let parts = self
            .parts
            .iter()
            .map(|part| part.try_map_notes(f))
            .collect::<Result<_, E>>()?;
        Ok(Piece { parts })
    }
}

impl MapNotes for Vec<Event> {
    fn try_map_notes<E, F>(&self, f: &mut F) -> Result<Self, E>
    where
        F: FnMut(&Note) -> Result<Note, E>,
    {
        self.iter().map(|event| event.try_map_notes(f)).collect()
    }
}
