//! # Measure Builder
//!
//! Groups the melody tokens of one line into bar-delimited measures.
//!
//! Each `Pitch` starts a note; octave, duration and tie markers attach to the
//! most recent note until the next pitch or bar line. Empty segments (`| |`,
//! a leading or trailing bar) are skipped, so `n` bar lines give `n` or `n + 1`
//! measures.
//!
//! ## Errors
//! All errors are `SongError::Structure` with the 0-based column of the
//! offending token:
//! - `MarkerBeforeNote` - a marker opens a segment
//! - `OctaveOnRest` / `TieOnRest` - markers a rest cannot carry
//! - `MixedDurationMarkers` - dashes and underlines (`_` or `=`) on one note
//! - `UnrepresentableDuration` - more than 16 underlines or dots
//! - `EmptyMelody` - a line with no notes at all
//!
//! Beat-count mismatches are not errors; see `semantic::check_measure`.

use crate::ast::{Accidental, Beats, Measure, Note};
use crate::error::{MeasureWarning, SongError, StructureErrorKind};
use crate::lexer::{DurationKind, LocatedToken, OctaveDirection, Token};
use crate::semantic::check_measure;

/// Upper bound on underlines and dots per note.
pub const MAX_DIVISIONS: u32 = 16;

/// Measures of one melody line plus the beat warnings they raised
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BuiltLine {
    pub measures: Vec<Measure>,
    pub warnings: Vec<MeasureWarning>,
}

/// A note whose markers are still being collected
struct PendingNote {
    degree: u8,
    accidental: Option<Accidental>,
    octave: i8,
    dashes: u32,
    underlines: u32,
    dots: u32,
    triplet: bool,
    tied: bool,
}

impl PendingNote {
    fn finish(self) -> Note {
        let note = Note::new(
            self.degree,
            self.accidental,
            self.octave,
            self.dashes,
            self.underlines,
            self.dots,
            self.tied,
        );
        if self.triplet {
            note.into_triplet()
        } else {
            note
        }
    }
}

struct MeasureBuilder {
    line: usize,
    next_index: usize,
    expected: Beats,
    measures: Vec<Measure>,
    warnings: Vec<MeasureWarning>,
    notes: Vec<Note>,
    pending: Option<PendingNote>,
}

impl MeasureBuilder {
    fn error(&self, position: usize, kind: StructureErrorKind) -> SongError {
        SongError::Structure {
            line: self.line,
            position,
            kind,
        }
    }

    fn finish_note(&mut self) {
        if let Some(note) = self.pending.take() {
            self.notes.push(note.finish());
        }
    }

    fn finish_measure(&mut self) {
        self.finish_note();
        if self.notes.is_empty() {
            return;
        }

        let measure = Measure {
            index: self.next_index,
            notes: std::mem::take(&mut self.notes),
        };
        self.next_index += 1;

        if let Some(warning) = check_measure(&measure, self.expected, self.line) {
            self.warnings.push(warning);
        }
        self.measures.push(measure);
    }

    fn attach(&mut self, token: &Token, position: usize) -> Result<(), SongError> {
        let line = self.line;
        let error = |kind| SongError::Structure {
            line,
            position,
            kind,
        };

        let Some(note) = self.pending.as_mut() else {
            return Err(error(StructureErrorKind::MarkerBeforeNote));
        };

        match *token {
            Token::OctaveMarker { direction, count } => {
                if note.degree == 0 {
                    return Err(error(StructureErrorKind::OctaveOnRest));
                }
                let step = i8::try_from(count).unwrap_or(i8::MAX);
                note.octave = match direction {
                    OctaveDirection::Up => note.octave.saturating_add(step),
                    OctaveDirection::Down => note.octave.saturating_sub(step),
                };
            }
            Token::DurationMarker { kind, count } => {
                match kind {
                    DurationKind::Dash => note.dashes += count,
                    DurationKind::Underline => note.underlines += count,
                    DurationKind::Dot => note.dots += count,
                    DurationKind::Triplet => note.triplet = true,
                }
                if note.dashes > 0 && note.underlines > 0 {
                    return Err(error(StructureErrorKind::MixedDurationMarkers));
                }
                if note.underlines > MAX_DIVISIONS || note.dots > MAX_DIVISIONS {
                    return Err(error(StructureErrorKind::UnrepresentableDuration));
                }
            }
            Token::TieMarker => {
                if note.degree == 0 {
                    return Err(error(StructureErrorKind::TieOnRest));
                }
                note.tied = true;
            }
            _ => {}
        }
        Ok(())
    }
}

/// Build the measures of one melody line.
///
/// `line` is the 1-based source line, `first_index` the document-wide index of
/// the first measure produced, `expected` the configured beats per measure.
pub fn build_measures(
    tokens: &[LocatedToken],
    line: usize,
    first_index: usize,
    expected: Beats,
) -> Result<BuiltLine, SongError> {
    let mut builder = MeasureBuilder {
        line,
        next_index: first_index,
        expected,
        measures: Vec::new(),
        warnings: Vec::new(),
        notes: Vec::new(),
        pending: None,
    };

    for located in tokens {
        match &located.token {
            Token::Pitch { degree, accidental } => {
                builder.finish_note();
                builder.pending = Some(PendingNote {
                    degree: *degree,
                    accidental: *accidental,
                    octave: 0,
                    dashes: 0,
                    underlines: 0,
                    dots: 0,
                    triplet: false,
                    tied: false,
                });
            }
            Token::BarLine => builder.finish_measure(),
            token @ (Token::OctaveMarker { .. } | Token::DurationMarker { .. } | Token::TieMarker) => {
                builder.attach(token, located.position)?;
            }
            // Lyric tokens never come out of the melody lexer
            Token::Syllable { .. } | Token::Melisma => {}
        }
    }
    builder.finish_measure();

    if builder.measures.is_empty() {
        return Err(builder.error(0, StructureErrorKind::EmptyMelody));
    }

    Ok(BuiltLine {
        measures: builder.measures,
        warnings: builder.warnings,
    })
}
