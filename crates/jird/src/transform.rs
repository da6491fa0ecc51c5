//! Fold a syntax tree into music.
//!
//! Each syntax node becomes a sequence of events: a note or chord literal
//! yields one event, a group yields its items in order, and the `*` and `**`
//! operators rewrite every note inside their operand. Parts are the
//! concatenated events of their items.

use num_rational::Rational64;

use crate::error::{Error, Result, SyntaxError};
use crate::music::{Chord, Event, MapNotes, Note, Part, Piece};
use crate::quantity::{Quantity, RatioProduct};
use crate::syntax::{Expr, Integer, RatioLiteral, RatioProductLiteral, SyntaxTree};

/// Folds syntax nodes, holding the source for error positions.
pub struct Transformer<'s> {
    source: &'s str,
}

impl<'s> Transformer<'s> {
    pub fn new(source: &'s str) -> Self {
        Transformer { source }
    }

    pub fn piece(&self, tree: &SyntaxTree) -> Result<Piece> {
        let parts = tree
            .parts
            .iter()
            .map(|items| self.part(items))
            .collect::<Result<Vec<_>>>()?;
        Ok(Piece::new(parts))
    }

    fn part(&self, items: &[Expr]) -> Result<Part> {
        Ok(Part::new(self.sequence(items)?))
    }

    fn sequence(&self, items: &[Expr]) -> Result<Vec<Event>> {
        let mut events = Vec::new();
        for item in items {
            events.extend(self.expr(item)?);
        }
        Ok(events)
    }

    fn expr(&self, expr: &Expr) -> Result<Vec<Event>> {
        match expr {
            Expr::Note {
                frequency,
                duration,
                volume,
            } => {
                let note = Note {
                    frequency: self.ratio_product(frequency)?.into(),
                    duration: self.ratio_product(duration)?.into(),
                    volume: self.volume(volume.as_ref())?,
                };
                Ok(vec![Event::Note(note)])
            }
            Expr::Chord {
                frequencies,
                duration,
                volume,
            } => {
                let duration: Quantity = self.ratio_product(duration)?.into();
                let volume = self.volume(volume.as_ref())?;
                let notes = frequencies
                    .iter()
                    .map(|frequency| {
                        Ok::<_, Error>(Note {
                            frequency: self.ratio_product(frequency)?.into(),
                            duration: duration.clone(),
                            volume: volume.clone(),
                        })
                    })
                    .collect::<Result<Vec<_>>>()?;
                Ok(vec![Event::Chord(Chord::new(notes))])
            }
            Expr::Group(items) => self.sequence(items),
            Expr::Multiply { factor, body } => {
                let factor = self.ratio_product(factor)?;
                self.expr(body)?.try_map_notes(&mut |note: &Note| {
                    Ok::<_, Error>(Note {
                        frequency: note.frequency.prepend(&factor)?,
                        ..note.clone()
                    })
                })
            }
            Expr::Volume { body, factor } => {
                let factor = self.ratio_product(factor)?;
                self.expr(body)?.try_map_notes(&mut |note: &Note| {
                    Ok::<_, Error>(Note {
                        volume: note.volume.prepend(&factor)?,
                        ..note.clone()
                    })
                })
            }
        }
    }

    fn volume(&self, volume: Option<&RatioProductLiteral>) -> Result<Quantity> {
        match volume {
            Some(product) => Ok(self.ratio_product(product)?.into()),
            None => Ok(Quantity::one()),
        }
    }

    fn ratio_product(&self, product: &RatioProductLiteral) -> Result<RatioProduct> {
        product
            .ratios
            .iter()
            .map(|ratio| self.ratio(ratio))
            .collect::<Result<RatioProduct>>()
    }

    fn ratio(&self, ratio: &RatioLiteral) -> Result<Rational64> {
        let numerator = self.integer(&ratio.numerator)?;
        let denominator = match &ratio.denominator {
            Some(d) => {
                let value = self.integer(d)?;
                if value == 0 {
                    return Err(self.error(d, "denominator must not be zero"));
                }
                value
            }
            None => 1,
        };
        Ok(Rational64::new(numerator, denominator))
    }

    fn integer(&self, integer: &Integer) -> Result<i64> {
        integer
            .text
            .parse::<i64>()
            .map_err(|_| self.error(integer, "integer is too large"))
    }

    fn error(&self, integer: &Integer, message: &str) -> Error {
        SyntaxError::at(self.source, integer.span.start, message).into()
    }
}
