//! Scala scale (`.scl`) and keyboard mapping (`.kbm`) tables.
//!
//! Synthesizers that read Scala files can be retuned to play every distinct
//! frequency in a piece exactly, with no pitch bend. Functions here build
//! the file contents as strings; the caller decides where to write them.

use std::collections::BTreeMap;

use num_rational::BigRational;
use num_traits::One;

use crate::error::{ConstraintViolation, Result};
use crate::music::{all_frequencies, Music};
use crate::quantity::Number;

/// Most frequencies one keyboard map can hold.
pub const MAX_MAPPED_FREQUENCIES: usize = 128;

/// Reduce a frequency into the octave `[1, 2)`. Zero is returned as is.
pub fn octave_reduce(frequency: Number) -> Number {
    if frequency.is_zero() {
        return frequency;
    }
    match frequency {
        Number::Exact(mut r) => {
            let one = BigRational::one();
            let two = BigRational::from_integer(2.into());
            while r >= two {
                r /= &two;
            }
            while r < one {
                r *= &two;
            }
            Number::Exact(r)
        }
        Number::Float(f) => {
            let octaves = f.log2().floor();
            Number::Float(f / 2f64.powf(octaves))
        }
    }
}

/// Distinct non-zero frequencies reduced into one octave, ascending.
pub fn build_scale<'a>(music: impl Into<Music<'a>>) -> Vec<Number> {
    let mut scale: Vec<Number> = all_frequencies(music)
        .into_iter()
        .map(octave_reduce)
        .collect();
    scale.sort();
    scale.dedup();
    scale
}

/// Text of a `.scl` file listing `ratios`.
///
/// Exact ratios are written as `n/d`; tempered values as cents, which Scala
/// recognizes by the decimal point.
pub fn scale_file(ratios: &[Number], title: &str) -> String {
    let mut out = format!(" {}\n {}\n!\n", title, ratios.len());
    for ratio in ratios {
        match ratio {
            Number::Exact(r) => out.push_str(&format!(" {}\n", r)),
            Number::Float(f) => out.push_str(&format!(" {:.5}\n", 1200.0 * f.log2())),
        }
    }
    out
}

/// `.scl` text for the scale of a piece on its own.
///
/// Scala files leave out the unison and end on the octave, so a leading
/// `1` is dropped and `2` appended in its place.
pub fn standalone_scale<'a>(music: impl Into<Music<'a>>, title: &str) -> String {
    let mut scale = build_scale(music);
    if scale.first() == Some(&Number::one()) {
        scale.remove(0);
        scale.push(Number::Exact(BigRational::from_integer(2.into())));
    }
    scale_file(&scale, title)
}

/// A retuning that gives each frequency in a piece its own MIDI note.
///
/// MIDI note `i` plays the `i`-th lowest frequency. The keyboard map has no
/// octave repeat, so the scale lists every frequency relative to the lowest.
#[derive(Debug, Clone, PartialEq)]
pub struct ScalaTuning {
    /// Scale entries, each relative to the lowest frequency.
    pub entries: Vec<Number>,
    pub frequency_map: BTreeMap<Number, u8>,
    /// Frequency in Hz of MIDI note 0.
    pub reference_frequency: f64,
    size: usize,
}

impl ScalaTuning {
    pub fn for_music<'a>(music: impl Into<Music<'a>>, f0: f64) -> Result<Self> {
        let frequencies = all_frequencies(music);
        if frequencies.len() > MAX_MAPPED_FREQUENCIES {
            return Err(ConstraintViolation::TooManyFrequencies {
                count: frequencies.len(),
            }
            .into());
        }

        let lowest = frequencies.first().cloned().unwrap_or_else(Number::one);
        let relative: Vec<Number> = frequencies
            .iter()
            .map(|f| f.clone() / lowest.clone())
            .collect();
        let entries = if relative.len() <= 1 {
            relative
        } else {
            relative[1..].to_vec()
        };

        let frequency_map = frequencies
            .iter()
            .enumerate()
            .map(|(index, frequency)| (frequency.clone(), index as u8))
            .collect();

        tracing::debug!(size = frequencies.len(), "built scala tuning");

        Ok(ScalaTuning {
            entries,
            frequency_map,
            reference_frequency: f0 * lowest.to_f64(),
            size: frequencies.len(),
        })
    }

    /// Number of mapped MIDI notes.
    pub fn len(&self) -> usize {
        self.size
    }

    pub fn is_empty(&self) -> bool {
        self.size == 0
    }

    /// `.scl` text.
    pub fn scl(&self, title: &str) -> String {
        scale_file(&self.entries, title)
    }

    /// `.kbm` text binding MIDI notes `0..n` to consecutive degrees.
    pub fn kbm(&self) -> String {
        let size = self.size as i64;
        let mut out = format!(
            "{}\n0\n{}\n0\n0\n{:?}\n0\n! Mapping\n",
            size,
            size - 1,
            self.reference_frequency
        );
        for degree in 0..self.size {
            out.push_str(&format!("{}\n", degree));
        }
        out
    }
}
