//! # Lyric Aligner
//!
//! Assigns lyric syllables to the notes of one line.
//!
//! A note is *assignable* unless it is a rest or it continues a tie from the
//! previous pitch (which may be the last note of the previous line). Assignable
//! notes take the syllable tokens one-to-one, in order; a `~` token counts as a
//! syllable and holds the previous one over its note. A rest releases the held
//! syllable, so a `~` right after a rest has nothing to extend.
//!
//! Alignment is all-or-nothing: when the counts differ nothing is assigned and
//! `AlignmentErrorKind::SyllableCountMismatch` is returned.

use crate::ast::{Measure, Note, SyllableSlot};
use crate::error::{AlignmentErrorKind, SongError};
use crate::lexer::{LocatedToken, Token};

/// Slot of a note that does not consume a syllable, or `None` if it does.
fn fixed_slot(note: &Note, tied_in: bool) -> Option<SyllableSlot> {
    if note.is_rest() {
        Some(SyllableSlot::Unassigned)
    } else if tied_in {
        Some(SyllableSlot::Tied)
    } else {
        None
    }
}

/// Walk the notes of a line, tracking whether each one is tied into.
fn walk<'a>(measures: &'a [Measure], tied_in: bool) -> impl Iterator<Item = (&'a Note, bool)> {
    measures
        .iter()
        .flat_map(|m| m.notes.iter())
        .scan(tied_in, |tied, note| {
            let incoming = *tied;
            *tied = note.tied_to_next;
            Some((note, incoming))
        })
}

/// Number of notes in the line that take a syllable.
pub fn assignable_count(measures: &[Measure], tied_in: bool) -> usize {
    walk(measures, tied_in)
        .filter(|(note, incoming)| fixed_slot(note, *incoming).is_none())
        .count()
}

/// Align lyric tokens to the notes of one line.
///
/// `lyric_line` is the 1-based source line of the lyrics, `tied_in` whether the
/// last note of the previous line was tied.
pub fn align(
    measures: &[Measure],
    lyrics: &[LocatedToken],
    lyric_line: usize,
    tied_in: bool,
) -> Result<Vec<SyllableSlot>, SongError> {
    let expected = assignable_count(measures, tied_in);
    if expected != lyrics.len() {
        return Err(SongError::Alignment {
            line: lyric_line,
            kind: AlignmentErrorKind::SyllableCountMismatch {
                expected,
                actual: lyrics.len(),
            },
        });
    }

    let mut syllables = lyrics.iter();
    let mut seen_syllable = false;
    let mut slots = Vec::new();

    for (note, incoming) in walk(measures, tied_in) {
        if let Some(slot) = fixed_slot(note, incoming) {
            // A rest ends the held syllable
            if note.is_rest() {
                seen_syllable = false;
            }
            slots.push(slot);
            continue;
        }

        // Counts were checked above
        let Some(located) = syllables.next() else {
            break;
        };
        let slot = match &located.token {
            Token::Melisma if !seen_syllable => {
                return Err(SongError::Alignment {
                    line: lyric_line,
                    kind: AlignmentErrorKind::OrphanMelisma {
                        position: located.position,
                    },
                });
            }
            Token::Melisma => SyllableSlot::Melisma,
            Token::Syllable { text, hyphenated } => {
                seen_syllable = true;
                SyllableSlot::Syllable {
                    text: text.clone(),
                    hyphenated: *hyphenated,
                }
            }
            _ => SyllableSlot::Unassigned,
        };
        slots.push(slot);
    }

    log::trace!("line {}: aligned {} syllables", lyric_line, expected);
    Ok(slots)
}

/// Slots for a line declared instrumental: no syllables, ties still marked.
pub fn instrumental(measures: &[Measure], tied_in: bool) -> Vec<SyllableSlot> {
    walk(measures, tied_in)
        .map(|(note, incoming)| fixed_slot(note, incoming).unwrap_or(SyllableSlot::Unassigned))
        .collect()
}
