//! Human-readable dump of a parsed song, used by `nmn inspect`.
//!
//! ```text
//! Title: Twinkle
//! Key: 1=C
//!
//! [Verse 1]
//! line 7: | 1 1 5 5 | 6 6 5 - |
//!           twin kle twin kle lit tle star
//! ```

use crate::ast::{Accidental, Note, Song, SyllableSlot};
use std::fmt::Write;

/// Notation of a single note, as it would be written in a melody line.
pub fn format_note(note: &Note) -> String {
    let mut s = String::new();

    match note.accidental {
        Some(Accidental::Sharp) => s.push('#'),
        Some(Accidental::Flat) => s.push('b'),
        Some(Accidental::Natural) => s.push('%'),
        None => {}
    }
    s.push(char::from(b'0' + note.degree));

    let octave_mark = if note.octave > 0 { '\'' } else { '.' };
    s.extend(std::iter::repeat(octave_mark).take(usize::from(note.octave.unsigned_abs())));
    s.extend(std::iter::repeat('_').take(note.underlines as usize));
    s.extend(std::iter::repeat('*').take(note.dots as usize));
    if note.triplet {
        s.push_str("/3");
    }
    if note.tied_to_next {
        s.push('~');
    }
    for _ in 0..note.dashes {
        s.push_str(" -");
    }
    s
}

fn format_slot(slot: &SyllableSlot) -> String {
    match slot {
        SyllableSlot::Syllable { text, hyphenated } => {
            if *hyphenated {
                format!("{}-", text)
            } else {
                text.clone()
            }
        }
        SyllableSlot::Melisma => "~".to_string(),
        SyllableSlot::Tied => "(tied)".to_string(),
        SyllableSlot::Unassigned => "_".to_string(),
    }
}

/// Format the whole song: metadata, then each line's notes and syllables.
pub fn format_song(song: &Song) -> String {
    let mut out = String::new();
    let metadata = &song.metadata;

    let fields = [
        ("Title", metadata.title.clone()),
        ("Subtitle", metadata.subtitle.clone()),
        ("Composer", metadata.composer.clone()),
        ("Key", metadata.key.clone()),
        ("Tempo", metadata.tempo.as_ref().map(|t| t.to_string())),
        ("Time", metadata.time.clone()),
    ];
    // Writing to a String cannot fail
    for (name, value) in fields {
        if let Some(value) = value {
            let _ = writeln!(out, "{}: {}", name, value);
        }
    }

    for line in &song.lines {
        if let Some(section) = &line.section {
            let _ = writeln!(out, "\n[{}]", section);
        }

        let prefix = format!("line {}: ", line.source_line);
        let mut melody = String::from("|");
        for measure in &line.measures {
            for note in &measure.notes {
                melody.push(' ');
                melody.push_str(&format_note(note));
            }
            melody.push_str(" |");
        }
        let lyrics: Vec<String> = line.syllables.iter().map(format_slot).collect();

        let _ = writeln!(out, "{}{}", prefix, melody);
        let _ = writeln!(out, "{}{}", " ".repeat(prefix.len() + 2), lyrics.join(" "));
    }

    out
}
