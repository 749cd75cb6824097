//! # Error Types
//!
//! This module defines all error types for the nmn pipeline.
//!
//! Every fatal error carries enough location information (source line and
//! column, page and primitive index) for the caller to point the user at the
//! offending text. All of them abort processing of the current file.
//!
//! ## Error Types
//! - `Lex` - unrecognized characters in a melody line
//! - `Structure` - grammatical violations (marker before note, rest invariants)
//! - `Alignment` - syllables that cannot be matched to notes
//! - `Emission` - values the typesetting engine cannot represent
//! - `Metadata` / `Config` - invalid header or layout configuration
//! - `OutputCollision` - two inputs sharing one output directory
//! - `Io` - failures writing the output directory
//!
//! `MeasureWarning` is the one non-fatal diagnostic; it is returned next to a
//! successful result.
//!
//! ## Usage
//! ```rust,ignore
//! use nmn::{compile, LayoutConfig, SongError};
//!
//! match compile(source, &LayoutConfig::default()) {
//!     Ok(output) => println!("{} pages", output.pages.len()),
//!     Err(SongError::Lex { line, position, kind }) => {
//!         eprintln!("{}:{}: {}", line, position, kind);
//!     }
//!     Err(e) => eprintln!("Error: {}", e),
//! }
//! ```

use crate::ast::Beats;
use std::path::PathBuf;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum SongError {
    /// Malformed melody text.
    ///
    /// `line` is 1-based, `position` is the 0-based column of the character.
    ///
    /// # Example
    /// ```
    /// # use nmn::{SongError, LexErrorKind};
    /// let err = SongError::Lex {
    ///     line: 3,
    ///     position: 4,
    ///     kind: LexErrorKind::UnrecognizedCharacter('x'),
    /// };
    /// assert_eq!(err.to_string(), "Lex error at line 3, column 4: unrecognized character 'x'");
    /// ```
    #[error("Lex error at line {line}, column {position}: {kind}")]
    Lex {
        line: usize,
        position: usize,
        kind: LexErrorKind,
    },

    /// Grammatical violation in the melody or in the line pairing.
    #[error("Structure error at line {line}, column {position}: {kind}")]
    Structure {
        line: usize,
        position: usize,
        kind: StructureErrorKind,
    },

    /// Lyrics that cannot be matched one-to-one with the notes of a line.
    ///
    /// `line` is the 1-based source line of the lyric text.
    #[error("Alignment error at line {line}: {kind}")]
    Alignment { line: usize, kind: AlignmentErrorKind },

    /// A drawing primitive the typesetting engine cannot represent.
    ///
    /// `page` is 0-based, `primitive_index` indexes the page's primitive list.
    #[error("Emission error on page {page}, primitive {primitive_index}: {kind}")]
    Emission {
        page: usize,
        primitive_index: usize,
        kind: EmissionErrorKind,
    },

    /// Invalid metadata error.
    ///
    /// Occurs when the YAML header is malformed or contains unsupported values.
    ///
    /// # Example
    /// ```
    /// # use nmn::SongError;
    /// let err = SongError::Metadata("Invalid key: H".to_string());
    /// assert_eq!(err.to_string(), "Invalid metadata: Invalid key: H");
    /// ```
    #[error("Invalid metadata: {0}")]
    Metadata(String),

    #[error("Invalid configuration: {0}")]
    Config(String),

    /// Two input files that would be written to the same output directory.
    #[error(
        "{} and {} would both be written to {}",
        .first.display(),
        .second.display(),
        .dir.display()
    )]
    OutputCollision {
        first: PathBuf,
        second: PathBuf,
        dir: PathBuf,
    },

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

#[derive(Error, Debug, Clone, Copy, PartialEq, Eq)]
pub enum LexErrorKind {
    #[error("unrecognized character '{0}'")]
    UnrecognizedCharacter(char),
    /// An accidental not immediately followed by a pitch digit 1-7, or a `/`
    /// not followed by `3`.
    #[error("incomplete marker: an accidental needs a pitch 1-7 and '/' needs a '3'")]
    UnterminatedMarker,
}

#[derive(Error, Debug, Clone, Copy, PartialEq, Eq)]
pub enum StructureErrorKind {
    #[error("marker appears before any note in the measure")]
    MarkerBeforeNote,
    #[error("a rest cannot carry octave markers")]
    OctaveOnRest,
    #[error("a rest cannot be tied")]
    TieOnRest,
    #[error("a note cannot carry both dashes and underlines")]
    MixedDurationMarkers,
    #[error("too many underlines or dots on one note")]
    UnrepresentableDuration,
    #[error("melody line contains no notes")]
    EmptyMelody,
    #[error("melody line has no lyric line after it")]
    MissingLyricLine,
}

#[derive(Error, Debug, Clone, Copy, PartialEq, Eq)]
pub enum AlignmentErrorKind {
    #[error("expected {expected} syllables for the assignable notes, found {actual}")]
    SyllableCountMismatch { expected: usize, actual: usize },
    #[error("melisma at syllable {position} has no earlier syllable on the line to extend")]
    OrphanMelisma { position: usize },
}

#[derive(Error, Debug, Clone, Copy, PartialEq, Eq)]
pub enum EmissionErrorKind {
    #[error("value is outside the range the typesetting engine supports")]
    OutOfRange,
}

/// A measure whose durations do not add up to the configured beats.
///
/// Never fatal: the song still renders, the warning is reported alongside.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MeasureWarning {
    /// Document-wide, 0-based measure index.
    pub measure_index: usize,
    /// 1-based source line of the melody containing the measure.
    pub line: usize,
    pub expected_beats: Beats,
    pub actual_beats: Beats,
}

impl std::fmt::Display for MeasureWarning {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "measure {} (line {}) has {} beats, expected {}",
            self.measure_index + 1,
            self.line,
            self.actual_beats,
            self.expected_beats
        )
    }
}
