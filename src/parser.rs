//! # Parser Module
//!
//! Assembles a `Song` from a song file.
//!
//! ## File Layout
//! ```text
//! ---                      <- optional YAML header
//! title: Twinkle
//! key: 1=C
//! ---
//! [Verse 1]                <- starts a section
//! 1 1 5 5 | 6 6 5 -        <- melody line
//! twin kle twin kle lit tle star   <- lyric line
//! // comment               <- ignored, as are blank lines
//! ```
//!
//! Melody and lyric lines strictly alternate. A lyric line of a single `-`
//! marks an instrumental line. A line that lexes as a melody is never taken as
//! lyrics; the melody before it is reported as missing its lyric line.
//!
//! ## Pipeline Per Line Pair
//! 1. `Lexer` tokenizes the melody
//! 2. `measures::build_measures` groups notes and checks beats
//! 3. `lyrics::align` attaches syllables, carrying tie state across lines
//!
//! ## Example
//! ```rust
//! use nmn::parse;
//!
//! let source = r#"---
//! title: My Song
//! ---
//! 1 2 3 4
//! do re mi fa
//! "#;
//!
//! let parsed = parse(source, 4).unwrap();
//! assert_eq!(parsed.song.metadata.title, Some("My Song".to_string()));
//! assert_eq!(parsed.song.lines.len(), 1);
//! assert!(parsed.warnings.is_empty());
//! ```

use crate::ast::*;
use crate::error::{MeasureWarning, SongError, StructureErrorKind};
use crate::lexer::{is_instrumental, tokenize_lyrics, Lexer, Token};
use crate::lyrics;
use crate::measures::build_measures;

/// A parsed song plus the non-fatal diagnostics raised while building it
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Parsed {
    pub song: Song,
    pub warnings: Vec<MeasureWarning>,
}

/// A source line with its 1-based line number
type NumberedLine<'a> = (usize, &'a str);

/// Split off the YAML header between two `---` lines at the top of the file.
///
/// Returns the header content (if any) and the remaining lines, keeping their
/// original line numbers.
///
/// # Example
/// ```rust,ignore
/// let source = "---\ntitle: Test\n---\n1 2 3";
/// let (metadata, body) = extract_metadata(source)?;
/// assert_eq!(metadata.as_deref(), Some("title: Test"));
/// assert_eq!(body, vec![(4, "1 2 3")]);
/// ```
pub(crate) fn extract_metadata(
    source: &str,
) -> Result<(Option<String>, Vec<NumberedLine<'_>>), SongError> {
    let lines: Vec<NumberedLine> = source
        .lines()
        .enumerate()
        .map(|(i, line)| (i + 1, line))
        .collect();

    let Some(start) = lines.iter().position(|(_, l)| !l.trim().is_empty()) else {
        return Ok((None, Vec::new()));
    };
    if lines[start].1.trim() != "---" {
        return Ok((None, lines));
    }

    let end = lines[start + 1..]
        .iter()
        .position(|(_, l)| l.trim() == "---")
        .map(|offset| start + 1 + offset)
        .ok_or_else(|| {
            SongError::Metadata(format!(
                "header opened at line {} is never closed with ---",
                lines[start].0
            ))
        })?;

    let content = lines[start + 1..end]
        .iter()
        .map(|(_, l)| *l)
        .collect::<Vec<_>>()
        .join("\n");
    Ok((Some(content), lines[end + 1..].to_vec()))
}

/// Parse the YAML header into `Metadata`.
pub fn parse_metadata(content: &str) -> Result<Metadata, SongError> {
    let raw: RawMetadata = if content.trim().is_empty() {
        RawMetadata::default()
    } else {
        serde_yaml::from_str(content).map_err(|e| SongError::Metadata(e.to_string()))?
    };

    let key = raw.key.as_deref().map(normalize_key).transpose()?;

    Ok(Metadata {
        title: raw.title,
        subtitle: raw.subtitle,
        composer: raw.composer,
        key,
        tempo: raw.tempo,
        time: raw.time,
    })
}

/// Normalize `C`, `1=C`, `1 = Eb` to the `1=X` form.
fn normalize_key(key: &str) -> Result<String, SongError> {
    let trimmed = key.trim();
    let name = match trimmed.split_once('=') {
        Some((degree, name)) if degree.trim() == "1" => name.trim(),
        Some(_) => return Err(SongError::Metadata(format!("Invalid key: {}", key))),
        None => trimmed,
    };

    let mut chars = name.chars();
    let valid = matches!(chars.next(), Some('A'..='G'))
        && matches!(chars.as_str(), "" | "#" | "b");
    if !valid {
        return Err(SongError::Metadata(format!("Invalid key: {}", key)));
    }
    Ok(format!("1={}", name))
}

/// `[Label]` section marker
fn section_label(line: &str) -> Option<&str> {
    line.strip_prefix('[')
        .and_then(|rest| rest.strip_suffix(']'))
        .map(str::trim)
}

/// Whether a line would lex as a melody with at least one note.
///
/// Used to catch a melody line standing where lyrics are expected.
fn is_melody(text: &str, line: usize) -> bool {
    Lexer::new(text, line)
        .tokenize()
        .is_ok_and(|tokens| tokens.iter().any(|t| matches!(t.token, Token::Pitch { .. })))
}

/// Document assembly state
struct SongBuilder {
    expected: Beats,
    lines: Vec<Line>,
    warnings: Vec<MeasureWarning>,
    next_measure: usize,
    tied_in: bool,
    section: Option<String>,
}

impl SongBuilder {
    fn push_pair(&mut self, melody: NumberedLine, lyric: NumberedLine) -> Result<(), SongError> {
        let (melody_line, melody_text) = melody;
        let (lyric_line, lyric_text) = lyric;

        let tokens = Lexer::new(melody_text, melody_line).tokenize()?;
        let built = build_measures(&tokens, melody_line, self.next_measure, self.expected)?;

        let syllables = if is_instrumental(lyric_text) {
            lyrics::instrumental(&built.measures, self.tied_in)
        } else {
            let lyric_tokens = tokenize_lyrics(lyric_text);
            lyrics::align(&built.measures, &lyric_tokens, lyric_line, self.tied_in)?
        };

        self.next_measure += built.measures.len();
        self.tied_in = built
            .measures
            .last()
            .and_then(|m| m.notes.last())
            .is_some_and(|n| n.tied_to_next);
        self.warnings.extend(built.warnings);
        self.lines.push(Line {
            source_line: melody_line,
            section: self.section.take(),
            measures: built.measures,
            syllables,
        });
        Ok(())
    }
}

/// Parse a song file.
///
/// `beats_per_measure` is the expected measure length used for
/// `MeasureWarning`s; the header's `time` field is informational only.
pub fn parse(source: &str, beats_per_measure: u32) -> Result<Parsed, SongError> {
    let (metadata_content, body) = extract_metadata(source)?;

    let metadata = match metadata_content {
        Some(content) => parse_metadata(&content)?,
        None => Metadata::default(),
    };

    let mut builder = SongBuilder {
        expected: Beats::from_integer(i64::from(beats_per_measure)),
        lines: Vec::new(),
        warnings: Vec::new(),
        next_measure: 0,
        tied_in: false,
        section: None,
    };
    let mut pending_melody: Option<NumberedLine> = None;

    for (number, text) in body {
        let trimmed = text.trim();
        if trimmed.is_empty() || trimmed.starts_with("//") {
            continue;
        }

        let label = section_label(trimmed);
        let missing_lyrics = pending_melody.is_some() && is_melody(text, number);
        match (pending_melody.take(), label) {
            (Some((melody_line, _)), label) if label.is_some() || missing_lyrics => {
                return Err(SongError::Structure {
                    line: melody_line,
                    position: 0,
                    kind: StructureErrorKind::MissingLyricLine,
                });
            }
            (Some(melody), None) => builder.push_pair(melody, (number, text))?,
            (None, Some(label)) => builder.section = Some(label.to_string()),
            (None, None) => pending_melody = Some((number, text)),
            // Covered by the guarded arm above (`label.is_some()`).
            (Some(_), Some(_)) => unreachable!(),
        }
    }

    if let Some((melody_line, _)) = pending_melody {
        return Err(SongError::Structure {
            line: melody_line,
            position: 0,
            kind: StructureErrorKind::MissingLyricLine,
        });
    }

    log::debug!(
        "parsed {} lines, {} measures, {} warnings",
        builder.lines.len(),
        builder.next_measure,
        builder.warnings.len()
    );

    Ok(Parsed {
        song: Song {
            metadata,
            lines: builder.lines,
        },
        warnings: builder.warnings,
    })
}
