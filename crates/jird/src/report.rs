//! Human-readable views of music: a nested listing of notes, and a table of
//! the intervals between every pair of frequencies.

use std::fmt;

use crate::music::{all_frequencies, Music, Note};
use crate::quantity::Number;

const INDENT: &str = "  ";

impl fmt::Display for Note {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let cents = match self.cents() {
            Some(cents) => format!("{:?}", (cents * 1000.0).round_ties_even() / 1000.0),
            None => "nan".to_string(),
        };
        write!(
            f,
            "Note(frequency={}, cents={}, duration={}",
            self.frequency, cents, self.duration
        )?;
        if self.volume.evaluate() != Number::one() {
            write!(f, ", volume={}", self.volume)?;
        }
        f.write_str(")")
    }
}

/// Nested listing: notes one per line, chords and pieces in `( )`, parts in
/// `[ ]`, each level indented two spaces.
pub fn format_music<'a>(music: impl Into<Music<'a>>) -> String {
    let mut out = String::new();
    write_music(music.into(), 0, &mut out);
    out
}

fn write_music(music: Music<'_>, level: usize, out: &mut String) {
    let indent = INDENT.repeat(level);
    let (open, close) = match music {
        Music::Note(note) => {
            out.push_str(&format!("{}{},\n", indent, note));
            return;
        }
        Music::Chord(_) | Music::Piece(_) => ("(", ")"),
        Music::Part(_) => ("[", "]"),
    };
    out.push_str(&format!("{}{}\n", indent, open));
    for child in music.children() {
        write_music(child, level + 1, out);
    }
    out.push_str(&format!("{}{},\n", indent, close));
}

/// `table[i][j]` is `frequencies[j] / frequencies[i]`.
pub fn interval_table(frequencies: &[Number]) -> Vec<Vec<Number>> {
    frequencies
        .iter()
        .map(|y| frequencies.iter().map(|x| x.clone() / y.clone()).collect())
        .collect()
}

/// The interval table of every distinct frequency in `music`, laid out with
/// the frequencies as row and column headings:
///
/// ```text
///
///          1  7/6  4/3
///      ---------------
///   1  |   1  7/6  4/3
/// 7/6  | 6/7    1  8/7
/// 4/3  | 3/4  7/8    1
///
/// ```
pub fn format_interval_table<'a>(music: impl Into<Music<'a>>) -> String {
    let frequencies = all_frequencies(music);
    if frequencies.is_empty() {
        return String::new();
    }
    let table = interval_table(&frequencies);

    let width = table
        .iter()
        .flatten()
        .chain(&frequencies)
        .map(|x| x.to_string().len())
        .max()
        .unwrap_or(0);
    let separator = "  ";
    let border = "  | ";
    let row = |values: &[Number]| -> String {
        values
            .iter()
            .map(|x| format!("{:>width$}", x.to_string(), width = width))
            .collect::<Vec<_>>()
            .join(separator)
    };

    let header = row(&frequencies);
    let spaces = " ".repeat(width + border.len());
    let overlap = 2;

    let mut lines = vec![String::new()];
    lines.push(format!("{}{}", spaces, header));
    lines.push(format!(
        "{}{}",
        &spaces[..spaces.len() - overlap],
        "-".repeat(header.len() + overlap)
    ));
    for (frequency, intervals) in frequencies.iter().zip(&table) {
        lines.push(format!(
            "{:>width$}{}{}",
            frequency.to_string(),
            border,
            row(intervals),
            width = width
        ));
    }
    lines.push(String::new());
    lines.join("\n") + "\n"
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::parse;
    use crate::temper::temper;
    use num_rational::Rational64;
    use pretty_assertions::assert_eq;

    fn exact(n: i64, d: i64) -> Number {
        Number::from(Rational64::new(n, d))
    }

    #[test]
    fn test_note_display() {
        let piece = parse("5/4:1 3/2*5/4:1/2:1/2 0:1").unwrap();
        let notes: Vec<String> = piece.parts[0]
            .events
            .iter()
            .map(|e| e.notes()[0].to_string())
            .collect();
        assert_eq!(
            notes,
            vec![
                "Note(frequency=5/4, cents=386.314, duration=1)",
                "Note(frequency=3/2*5/4, cents=1088.269, duration=1/2, volume=1/2)",
                "Note(frequency=0, cents=nan, duration=1)",
            ]
        );
    }

    #[test]
    fn test_tempered_note_display() {
        let piece = temper(&parse("6/5:1").unwrap(), Some(12)).unwrap();
        assert_eq!(
            piece.parts[0].events[0].notes()[0].to_string(),
            "Note(frequency=2**3/12, cents=300.0, duration=1)"
        );
    }

    #[test]
    fn test_format_music() {
        let piece = parse("1:1 <1 5/4>:2; 1/2:3").unwrap();
        let expected = [
            "(",
            "  [",
            "    Note(frequency=1, cents=0.0, duration=1),",
            "    (",
            "      Note(frequency=1, cents=0.0, duration=2),",
            "      Note(frequency=5/4, cents=386.314, duration=2),",
            "    ),",
            "  ],",
            "  [",
            "    Note(frequency=1/2, cents=-1200.0, duration=3),",
            "  ],",
            "),",
            "",
        ]
        .join("\n");
        assert_eq!(format_music(&piece), expected);
    }

    #[test]
    fn test_interval_table() {
        let table = interval_table(&[exact(1, 1), exact(5, 4), exact(3, 2)]);
        assert_eq!(
            table,
            vec![
                vec![exact(1, 1), exact(5, 4), exact(3, 2)],
                vec![exact(4, 5), exact(1, 1), exact(6, 5)],
                vec![exact(2, 3), exact(5, 6), exact(1, 1)],
            ]
        );
    }

    #[test]
    fn test_format_interval_table() {
        let expected = [
            "",
            "         1  7/6  4/3",
            "     ---------------",
            "  1  |   1  7/6  4/3",
            "7/6  | 6/7    1  8/7",
            "4/3  | 3/4  7/8    1",
            "",
            "",
        ]
        .join("\n");
        assert_eq!(
            format_interval_table(&parse("<1 7/6 4/3>:1").unwrap()),
            expected
        );
    }

    #[test]
    fn test_empty_interval_table() {
        assert_eq!(format_interval_table(&parse("0:1").unwrap()), "");
    }
}
