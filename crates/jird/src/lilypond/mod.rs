//! LilyPond score generation.
//!
//! Each part becomes a staff. Notes are spelled with the nearest name from
//! a [`Spelling`] table and annotated above with their deviation in cents
//! from a reference equal temperament, and below with the ratios that built
//! the frequency.
//!
//! ```text
//! e'4 $(cents "-14") $(ratios "1" "5/4")
//! ```

mod duration;
mod pitch;

use num_rational::{BigRational, Rational64};
use num_traits::One;

use crate::error::{Error, Result};
use crate::midi::MIDDLE_C_FREQUENCY;
use crate::music::{lowest, Chord, Event, Note, Part, Piece};
use crate::quantity::{product, widen, Number, Quantity};

pub use duration::DurationTemplate;
pub use pitch::{cent_deviation, spell, Spelling};

const VERSION: &str = "2.22.2";

const INDENT: &str = "  ";

const CENTS_MACRO: &str = r#"#(define (cents . args) #{
    ^\markup{
        \teeny
        \override #'(baseline-skip . 1.4)
        \with-color "gray"
        \center-column {
            $(reverse args)
        }
    }
#})
"#;

const RATIOS_MACRO: &str = r#"#(define (ratios . args) #{
    _\markup{
        \teeny
        \override #'(baseline-skip . 1.4)
        \center-column {
            \with-color "blueviolet" $(reverse (cdr args))
            \with-color "orangered" $(car args)
        }
    }
#})
"#;

/// Parameters for score generation
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct LilypondParams {
    /// Frequency in Hz of the ratio 1.
    pub f0: f64,
    /// Equal temperament that cent deviations are measured from.
    pub reference_edo: u32,
    pub spelling: Spelling,
}

impl Default for LilypondParams {
    fn default() -> Self {
        LilypondParams {
            f0: MIDDLE_C_FREQUENCY,
            reference_edo: 12,
            spelling: Spelling::default(),
        }
    }
}

/// The ratio factors of an untempered frequency.
fn factors(frequency: &Quantity) -> Option<Vec<Rational64>> {
    match frequency {
        Quantity::Ratio(r) => Some(vec![*r]),
        Quantity::Product(p) => Some(p.factors().to_vec()),
        Quantity::Power(_) => None,
    }
}

/// One note with its duration and annotations.
pub fn note(note: &Note, params: &LilypondParams) -> Result<String> {
    let template = DurationTemplate::for_duration(&note.duration)?;
    if note.is_rest() {
        return Ok(template.render("r", "").replace('~', " "));
    }

    let name = spell(note, params.f0, params.spelling);
    let cents = format!("$(cents \"{}\")", cent_deviation(note, params.reference_edo)?);

    let ratios = match factors(&note.frequency) {
        Some(factors) => {
            let (base, last) = match factors.split_last() {
                Some((last, init)) if !init.is_empty() => (product(init), widen(last)),
                _ => (BigRational::one(), product(&factors)),
            };
            format!("$(ratios \"{}\" \"{}\")", base, last)
        }
        None => String::new(),
    };

    let annotation = format!(" {} {} ", cents, ratios);
    Ok(template.render(&name, &annotation).trim().to_string())
}

/// Number of leading factors every member shares.
fn shared_prefix(members: &[Vec<Rational64>]) -> usize {
    let Some((first, rest)) = members.split_first() else {
        return 0;
    };
    let shortest = members.iter().map(Vec::len).min().unwrap_or(0);
    (0..shortest)
        .take_while(|&i| rest.iter().all(|member| member[i] == first[i]))
        .count()
}

/// A chord, members ordered from low to high. Empty chords render as
/// nothing.
pub fn chord(chord: &Chord, params: &LilypondParams) -> Result<String> {
    let Some(first) = chord.notes.first() else {
        return Ok(String::new());
    };
    let template = DurationTemplate::for_duration(&first.duration)?;

    let mut members: Vec<&Note> = chord.notes.iter().collect();
    members.sort_by(|a, b| {
        let a = a.cents().unwrap_or(f64::NEG_INFINITY);
        let b = b.cents().unwrap_or(f64::NEG_INFINITY);
        a.total_cmp(&b)
    });

    let names: Vec<String> = members
        .iter()
        .map(|n| spell(n, params.f0, params.spelling))
        .collect();
    let deviations = members
        .iter()
        .map(|n| Ok::<_, Error>(format!("\"{}\"", cent_deviation(n, params.reference_edo)?)))
        .collect::<Result<Vec<_>>>()?;
    let cents = format!("$(cents {})", deviations.join(" "));

    let member_factors: Option<Vec<Vec<Rational64>>> =
        members.iter().map(|n| factors(&n.frequency)).collect();
    let ratios = match member_factors {
        Some(member_factors) => {
            let shared = shared_prefix(&member_factors);
            let base = product(&member_factors[0][..shared]);
            let suffixes: Vec<String> = member_factors
                .iter()
                .map(|f| format!("\"{}\"", product(&f[shared..])))
                .collect();
            format!("$(ratios \"{}\" {})", base, suffixes.join(" "))
        }
        None => String::new(),
    };

    let body = format!("<{}>", names.join(" "));
    let annotation = format!(" {} {} ", cents, ratios);
    Ok(template.render(&body, &annotation).trim().to_string())
}

/// One staff, indented `level` steps. Parts reaching down to half the base
/// frequency use the bass clef.
pub fn part(part: &Part, params: &LilypondParams, level: usize) -> Result<String> {
    let mut body = Vec::with_capacity(part.events.len() + 1);
    if lowest(part) <= Number::from(Rational64::new(1, 2)) {
        body.push("\\clef bass".to_string());
    }
    for event in &part.events {
        let text = match event {
            Event::Note(n) => note(n, params)?,
            Event::Chord(c) => chord(c, params)?,
        };
        if !text.is_empty() {
            body.push(text);
        }
    }

    let indent = INDENT.repeat(level);
    let mut lines = vec![format!("{}\\new Staff{{", indent)];
    lines.extend(body.iter().map(|line| format!("{}{}{}", indent, INDENT, line)));
    lines.push(format!("{}}}", indent));
    Ok(lines.join("\n"))
}

/// A complete score: header, annotation macros, and one staff per part.
pub fn render(piece: &Piece, params: &LilypondParams) -> Result<String> {
    let parts = piece
        .parts
        .iter()
        .map(|p| part(p, params, 2))
        .collect::<Result<Vec<_>>>()?;

    let mut lines = vec![
        format!("\\version \"{}\"", VERSION),
        "\\language \"english\"".to_string(),
        String::new(),
        CENTS_MACRO.to_string(),
        RATIOS_MACRO.to_string(),
        "\\score {".to_string(),
        format!("{}<<", INDENT),
    ];
    lines.extend(parts);
    lines.push(format!("{}>>", INDENT));
    lines.push(format!("{}\\layout{{}}", INDENT));
    lines.push("}".to_string());

    tracing::debug!(parts = piece.parts.len(), "rendered lilypond score");
    Ok(lines.join("\n"))
}
