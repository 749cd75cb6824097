//! # Song Model
//!
//! This module defines the validated document model built from a song file.
//!
//! ## Type Hierarchy
//! ```text
//! Song
//!   ├── Metadata (title, subtitle, composer, key, tempo, time)
//!   └── Vec<Line>
//!         ├── source_line: usize
//!         ├── section: Option<String>
//!         ├── Vec<Measure>
//!         │     └── Vec<Note>
//!         │           ├── degree: 0-7 (0 = rest)
//!         │           ├── accidental: Option<Accidental>
//!         │           ├── octave: i8 (0 = middle)
//!         │           ├── dashes / underlines / dots / triplet
//!         │           ├── duration_units: Beats
//!         │           └── tied_to_next: bool
//!         └── Vec<SyllableSlot> (one per note, document order)
//! ```
//!
//! ## Key Concepts
//!
//! ### Duration
//! Durations are exact rationals in quarter-note units:
//! `(1 + dashes) / 2^underlines * (2 - 1/2^dots)`.
//! - `5` = 1 beat, `5 -` = 2 beats, `5_` = 1/2 beat
//! - `5*` = 3/2 beats, `5_*` = 3/4 beat
//! - `5_/3` = 1/3 beat: a triplet marker scales the whole duration by 2/3
//!
//! ### Ties
//! A note with `tied_to_next` continues into the following pitch. The
//! continuation gets no syllable of its own; its slot is `SyllableSlot::Tied`.
//!
//! ### Ownership
//! The `Song` owns everything below it and is never mutated after assembly.
//! Layout structures borrow it.

use num_rational::Ratio;
use serde::Deserialize;

/// Exact beat count in quarter-note units.
pub type Beats = Ratio<i64>;

/// Explicit accidental written before a pitch
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Accidental {
    Sharp,   // #
    Flat,    // b
    Natural, // %
}

/// A single note or rest
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Note {
    pub degree: u8,
    pub accidental: Option<Accidental>,
    pub octave: i8,
    pub dashes: u32,
    pub underlines: u32,
    pub dots: u32,
    /// Played in the time of two thirds (`/3`).
    pub triplet: bool,
    pub duration_units: Beats,
    pub tied_to_next: bool,
}

impl Note {
    /// Builds a note, deriving its duration from the marker counts.
    ///
    /// Callers guarantee that `dashes` and `underlines` are not both non-zero
    /// and that `underlines` and `dots` stay below 63.
    pub fn new(
        degree: u8,
        accidental: Option<Accidental>,
        octave: i8,
        dashes: u32,
        underlines: u32,
        dots: u32,
        tied_to_next: bool,
    ) -> Self {
        Self {
            degree,
            accidental,
            octave,
            dashes,
            underlines,
            dots,
            triplet: false,
            duration_units: duration_units(dashes, underlines, dots),
            tied_to_next,
        }
    }

    /// The same note as a member of a triplet.
    pub fn into_triplet(mut self) -> Self {
        if !self.triplet {
            self.triplet = true;
            self.duration_units *= TRIPLET_FACTOR;
        }
        self
    }

    pub fn is_rest(&self) -> bool {
        self.degree == 0
    }
}

/// Scale applied to the duration of a triplet note.
pub const TRIPLET_FACTOR: Beats = Ratio::new_raw(2, 3);

/// Duration in quarter-note units for a run of duration markers.
pub fn duration_units(dashes: u32, underlines: u32, dots: u32) -> Beats {
    let base = Ratio::new(1 + dashes as i64, 1i64 << underlines);
    let dotted = Ratio::from_integer(2) - Ratio::new(1, 1i64 << dots);
    base * dotted
}

/// A bar-delimited group of notes
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Measure {
    /// Document-wide, 0-based.
    pub index: usize,
    pub notes: Vec<Note>,
}

impl Measure {
    pub fn total_beats(&self) -> Beats {
        self.notes.iter().map(|n| n.duration_units).sum()
    }
}

/// What a note sings
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SyllableSlot {
    /// A new syllable. `hyphenated` marks a word that continues on the next
    /// syllable (`twin-kle`).
    Syllable { text: String, hyphenated: bool },
    /// The previous syllable is held over this note (`~` in the lyrics).
    Melisma,
    /// Continuation of a tie; no new attack, no new syllable.
    Tied,
    /// Rests, and notes on instrumental lines.
    Unassigned,
}

/// One melody line with its lyrics
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Line {
    /// 1-based source line of the melody text.
    pub source_line: usize,
    /// Section label (`[Verse 1]`) when this line opens a section.
    pub section: Option<String>,
    pub measures: Vec<Measure>,
    /// One slot per note, in the same order as the notes of `measures`.
    pub syllables: Vec<SyllableSlot>,
}

impl Line {
    /// Notes of the line in order, paired with their syllable slot.
    pub fn events(&self) -> impl Iterator<Item = (&Note, &SyllableSlot)> {
        self.measures
            .iter()
            .flat_map(|m| m.notes.iter())
            .zip(self.syllables.iter())
    }

    pub fn note_count(&self) -> usize {
        self.measures.iter().map(|m| m.notes.len()).sum()
    }
}

/// Tempo annotation: either a plain BPM number or free text (`Andante`)
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(untagged)]
pub enum Tempo {
    Bpm(u32),
    Text(String),
}

impl std::fmt::Display for Tempo {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Tempo::Bpm(bpm) => write!(f, "♩ = {}", bpm),
            Tempo::Text(text) => f.write_str(text),
        }
    }
}

/// Document metadata from the YAML header
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Metadata {
    pub title: Option<String>,
    pub subtitle: Option<String>,
    pub composer: Option<String>,
    /// Normalized to the `1=X` form.
    pub key: Option<String>,
    pub tempo: Option<Tempo>,
    pub time: Option<String>,
}

impl Metadata {
    /// Whether the first page needs room for a header.
    ///
    /// Key, time and tempo are printed in the header too, so any of them is
    /// enough.
    pub fn has_heading(&self) -> bool {
        self.title.is_some()
            || self.subtitle.is_some()
            || self.composer.is_some()
            || self.key.is_some()
            || self.time.is_some()
            || self.tempo.is_some()
    }
}

/// Raw metadata for YAML deserialization
#[derive(Deserialize, Debug, Default)]
#[serde(rename_all = "kebab-case", deny_unknown_fields)]
pub struct RawMetadata {
    pub title: Option<String>,
    pub subtitle: Option<String>,
    pub composer: Option<String>,
    pub key: Option<String>,
    pub tempo: Option<Tempo>,
    pub time: Option<String>,
}

/// A complete song
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Song {
    pub metadata: Metadata,
    pub lines: Vec<Line>,
}

impl Song {
    pub fn measures(&self) -> impl Iterator<Item = &Measure> {
        self.lines.iter().flat_map(|l| l.measures.iter())
    }

    pub fn notes(&self) -> impl Iterator<Item = &Note> {
        self.measures().flat_map(|m| m.notes.iter())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_quarter_note_is_one_beat() {
        assert_eq!(duration_units(0, 0, 0), Ratio::from_integer(1));
    }

    #[test]
    fn test_dashes_add_whole_beats() {
        assert_eq!(duration_units(1, 0, 0), Ratio::from_integer(2));
        assert_eq!(duration_units(3, 0, 0), Ratio::from_integer(4));
    }

    #[test]
    fn test_underlines_halve() {
        assert_eq!(duration_units(0, 1, 0), Ratio::new(1, 2));
        assert_eq!(duration_units(0, 2, 0), Ratio::new(1, 4));
    }

    #[test]
    fn test_dots_extend_by_half_then_quarter() {
        assert_eq!(duration_units(0, 0, 1), Ratio::new(3, 2));
        assert_eq!(duration_units(0, 0, 2), Ratio::new(7, 4));
        assert_eq!(duration_units(0, 1, 1), Ratio::new(3, 4));
        assert_eq!(duration_units(1, 0, 1), Ratio::from_integer(3));
    }

    #[test]
    fn test_triplet_is_two_thirds() {
        let eighth = Note::new(3, None, 0, 0, 1, 0, false).into_triplet();
        assert!(eighth.triplet);
        assert_eq!(eighth.duration_units, Ratio::new(1, 3));
        // Applying it twice changes nothing
        assert_eq!(eighth.clone().into_triplet(), eighth);
    }

    #[test]
    fn test_three_triplet_eighths_fill_a_beat() {
        let total: Beats = (0..3)
            .map(|_| Note::new(1, None, 0, 0, 1, 0, false).into_triplet().duration_units)
            .sum();
        assert_eq!(total, Ratio::from_integer(1));
    }

    #[test]
    fn test_key_alone_needs_a_header() {
        let metadata = Metadata {
            key: Some("1=D".to_string()),
            ..Metadata::default()
        };
        assert!(metadata.has_heading());
        assert!(!Metadata::default().has_heading());
    }

    #[test]
    fn test_measure_total_beats() {
        let measure = Measure {
            index: 0,
            notes: vec![
                Note::new(1, None, 0, 0, 1, 0, false),
                Note::new(2, None, 0, 0, 1, 0, false),
                Note::new(3, None, 0, 1, 0, 0, false),
            ],
        };
        assert_eq!(measure.total_beats(), Ratio::from_integer(3));
    }

    #[test]
    fn test_tempo_display() {
        assert_eq!(Tempo::Bpm(96).to_string(), "♩ = 96");
        assert_eq!(Tempo::Text("Andante".to_string()).to_string(), "Andante");
    }
}
