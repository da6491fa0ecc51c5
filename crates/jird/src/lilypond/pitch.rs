//! Note names and cent deviations.

use serde::{Deserialize, Serialize};

use crate::error::Result;
use crate::midi::MIDDLE_C_FREQUENCY;
use crate::music::Note;
use crate::temper::temper_note;

const NINETEEN: [&str; 19] = [
    "c", "cs", "df", "d", "ds", "ef", "e", "es", "f", "fs", "gf", "g", "gs", "af", "a", "as",
    "bf", "b", "bs",
];

const TWELVE: [&str; 12] = [
    "c", "cs", "d", "ef", "e", "f", "fs", "g", "af", "a", "bf", "b",
];

/// Which names divide the octave. A pitch is spelled with the nearest name,
/// so finer tables tell apart sharps and flats that twelve names merge.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Spelling {
    #[default]
    Nineteen,
    Twelve,
}

impl Spelling {
    pub fn names(self) -> &'static [&'static str] {
        match self {
            Spelling::Nineteen => &NINETEEN,
            Spelling::Twelve => &TWELVE,
        }
    }
}

/// LilyPond name of a note's pitch, with octave marks; `r` for a rest.
///
/// Unmarked names sit in the octave below middle C, as LilyPond has it.
pub fn spell(note: &Note, f0: f64, spelling: Spelling) -> String {
    if note.is_rest() {
        return "r".to_string();
    }
    let names = spelling.names();
    let size = names.len() as i64;

    let real_frequency = note.frequency.evaluate().to_f64() * f0;
    let steps = (size as f64 * (real_frequency / MIDDLE_C_FREQUENCY).log2()).round_ties_even()
        as i64;
    let octaves = steps.div_euclid(size) + 1;
    let name = names[steps.rem_euclid(size) as usize];

    let mark = if octaves > 0 { "'" } else { "," };
    format!("{}{}", name, mark.repeat(octaves.unsigned_abs() as usize))
}

fn round_to_thousandths(cents: f64) -> f64 {
    (cents * 1000.0).round_ties_even() / 1000.0
}

/// Signed whole cents between a note and the same note tempered to
/// `reference_edo`; empty for a rest.
pub fn cent_deviation(note: &Note, reference_edo: u32) -> Result<String> {
    let Some(cents) = note.cents() else {
        return Ok(String::new());
    };
    let tempered = temper_note(note, reference_edo)?.cents().unwrap_or(cents);
    let deviation = round_to_thousandths(cents) - round_to_thousandths(tempered);
    Ok(format!("{:+}", deviation.round_ties_even() as i64))
}
