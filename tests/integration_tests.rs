//! Integration tests for the nmn typesetter
//!
//! Tests the full pipeline from song source to TikZ pages.

use nmn::{
    compile, compile_to_dir, emit_page, layout, output_dirs, parse, AlignmentErrorKind,
    DrawPrimitive, GlyphSymbol, LayoutConfig, LexErrorKind, SongError, StructureErrorKind,
    SyllableSlot,
};
use std::path::{Path, PathBuf};
use num_rational::Ratio;
use proptest::prelude::*;
use rstest::rstest;

const TWINKLE: &str = r#"---
title: Twinkle Twinkle
composer: Traditional
key: 1=C
tempo: 96
time: 4/4
---
[Verse 1]
1 1 5 5 | 6 6 5 -
twin-kle twin-kle lit-tle star
4 4 3 3 | 2 2 1 -
how I won-der what you are
"#;

#[test]
fn test_compile_twinkle() {
    let compiled = compile(TWINKLE, &LayoutConfig::default()).unwrap();
    assert_eq!(compiled.pages.len(), 1);
    assert!(compiled.warnings.is_empty());

    let tex = &compiled.pages[0];
    assert!(tex.starts_with("\\begin{tikzpicture}"));
    assert!(tex.ends_with("\\end{tikzpicture}\n"));
    assert!(tex.contains("{Twinkle Twinkle}"));
    assert!(tex.contains("{Verse 1}"));
    assert!(tex.contains("{won}"));
}

#[test]
fn test_example_two_measures_seven_syllables() {
    let parsed = parse("1 1 5 5 | 6 6 5 -\ntwin kle twin kle lit tle star", 4).unwrap();
    let line = &parsed.song.lines[0];

    assert_eq!(line.measures.len(), 2);
    assert_eq!(line.measures[0].notes.len(), 4);
    assert_eq!(line.measures[1].notes.len(), 4);
    assert_eq!(line.measures[1].notes[3].dashes, 1);

    let syllables: Vec<_> = line
        .syllables
        .iter()
        .filter_map(|s| match s {
            SyllableSlot::Syllable { text, .. } => Some(text.as_str()),
            _ => None,
        })
        .collect();
    assert_eq!(
        syllables,
        vec!["twin", "kle", "twin", "kle", "lit", "tle", "star"]
    );
    assert!(parsed.warnings.is_empty());
}

#[test]
fn test_example_marker_before_note() {
    let err = parse("- 1 2\nla la", 4).unwrap_err();
    assert!(matches!(
        err,
        SongError::Structure {
            line: 1,
            position: 0,
            kind: StructureErrorKind::MarkerBeforeNote
        }
    ));
}

#[test]
fn test_example_too_many_syllables() {
    let err = parse("1 2 3 4\none two three four five", 4).unwrap_err();
    match err {
        SongError::Alignment { line, kind } => {
            assert_eq!(line, 2);
            assert_eq!(
                kind,
                AlignmentErrorKind::SyllableCountMismatch {
                    expected: 4,
                    actual: 5
                }
            );
        }
        _ => panic!("Expected Alignment error, got {:?}", err),
    }
}

#[test]
fn test_example_short_measure_warns() {
    let compiled = compile("1 2 3 | 4 5 6 7\na b c d e f g", &LayoutConfig::default()).unwrap();
    assert_eq!(compiled.pages.len(), 1);
    assert_eq!(compiled.warnings.len(), 1);

    let warning = &compiled.warnings[0];
    assert_eq!(warning.measure_index, 0);
    assert_eq!(warning.expected_beats, Ratio::from_integer(4));
    assert_eq!(warning.actual_beats, Ratio::from_integer(3));
}

#[test]
fn test_beats_per_measure_comes_from_config() {
    let config = LayoutConfig {
        beats_per_measure: 3,
        ..LayoutConfig::default()
    };
    let compiled = compile("1 2 3 | 4 5 6\na b c d e f", &config).unwrap();
    assert!(compiled.warnings.is_empty());
}

#[rstest]
#[case("1 2 x 4\na b c d", 1, 4)]
#[case("1 2 3 4\na b c d\n9\nz", 3, 0)]
#[case("1 # 2\na b", 1, 2)]
fn test_lex_errors_carry_location(#[case] source: &str, #[case] line: usize, #[case] position: usize) {
    match parse(source, 4).unwrap_err() {
        SongError::Lex {
            line: l,
            position: p,
            ..
        } => assert_eq!((l, p), (line, position)),
        other => panic!("Expected Lex error, got {:?}", other),
    }
}

#[rstest]
#[case("0' 1\na", StructureErrorKind::OctaveOnRest)]
#[case("0~ 1\na", StructureErrorKind::TieOnRest)]
#[case("1_ -\na", StructureErrorKind::MixedDurationMarkers)]
#[case("|\n-", StructureErrorKind::EmptyMelody)]
#[case("1 2 3 4\n", StructureErrorKind::MissingLyricLine)]
fn test_structure_errors(#[case] source: &str, #[case] expected: StructureErrorKind) {
    match parse(source, 4).unwrap_err() {
        SongError::Structure { kind, .. } => assert_eq!(kind, expected),
        other => panic!("Expected Structure error, got {:?}", other),
    }
}

#[test]
fn test_unrecognized_character_kind() {
    let err = parse("1 2 3 x\na b c", 4).unwrap_err();
    assert!(matches!(
        err,
        SongError::Lex {
            kind: LexErrorKind::UnrecognizedCharacter('x'),
            ..
        }
    ));
}

#[test]
fn test_tied_continuation_takes_no_syllable() {
    let parsed = parse("5 - 3~ 3 | 2 1 0 1\nhold tie re do fa", 4).unwrap();
    let slots = &parsed.song.lines[0].syllables;
    assert_eq!(slots.len(), 7);
    assert_eq!(slots[2], SyllableSlot::Tied);
    assert_eq!(slots[5], SyllableSlot::Unassigned);
}

#[test]
fn test_emission_error_on_huge_page() {
    let config = LayoutConfig {
        page_width: 100_000.0,
        ..LayoutConfig::default()
    };
    let source = "---\ntitle: Wide\n---\n1\na";
    let err = compile(source, &config).unwrap_err();
    assert!(matches!(
        err,
        SongError::Emission {
            page: 0,
            primitive_index: 0,
            ..
        }
    ));
}

#[test]
fn test_invalid_config_is_rejected_before_parsing() {
    let config = LayoutConfig {
        line_height: 0.0,
        ..LayoutConfig::default()
    };
    assert!(matches!(
        compile("1\na", &config),
        Err(SongError::Config(_))
    ));
}

#[test]
fn test_compile_to_dir_writes_pages_and_index() {
    let dir = tempfile::tempdir().unwrap();
    let source = "[A]\n1 2 3 4\na b c d\n[B]\n5 6 7 1\ne f g h\n";
    let (compiled, written) = compile_to_dir(source, &LayoutConfig::default(), dir.path()).unwrap();

    assert_eq!(compiled.pages.len(), 2);
    assert_eq!(written.len(), 3);
    assert!(dir.path().join("page-01.tex").exists());
    assert!(dir.path().join("page-02.tex").exists());

    let index = std::fs::read_to_string(dir.path().join("song.tex")).unwrap();
    assert_eq!(index, "\\input{page-01.tex}\n\\newpage\n\\input{page-02.tex}\n");
}

#[test]
fn test_failed_compile_writes_nothing() {
    let dir = tempfile::tempdir().unwrap();
    let out = dir.path().join("song");
    let result = compile_to_dir("1 2 3\na b", &LayoutConfig::default(), &out);
    assert!(result.is_err());
    assert!(!out.exists());
}

#[test]
fn test_key_time_and_tempo_reach_the_page() {
    let source = "---\nkey: 1=D\ntime: 3/4\ntempo: 72\n---\n1 2 3\na b c";
    let compiled = compile(source, &LayoutConfig::default()).unwrap();
    let tex = &compiled.pages[0];
    assert!(tex.contains("1=D"));
    assert!(tex.contains("3/4"));
    assert!(tex.contains("\\textmusicalnote{} = 72"));
}

#[test]
fn test_shorter_render_replaces_page_set() {
    let dir = tempfile::tempdir().unwrap();
    let out = dir.path().join("song");
    let long = "[A]\n1 2 3 4\na b c d\n[B]\n1 2 3 4\na b c d\n[C]\n1 2 3 4\na b c d\n";
    let (compiled, _) = compile_to_dir(long, &LayoutConfig::default(), &out).unwrap();
    assert_eq!(compiled.pages.len(), 3);

    compile_to_dir("1 2 3 4\na b c d", &LayoutConfig::default(), &out).unwrap();

    let mut names: Vec<String> = std::fs::read_dir(&out)
        .unwrap()
        .map(|e| e.unwrap().file_name().to_string_lossy().into_owned())
        .collect();
    names.sort();
    assert_eq!(names, vec!["page-01.tex", "song.tex"]);
}

#[test]
fn test_output_dirs_follow_file_stems() {
    let inputs = vec![PathBuf::from("a/hymn.txt"), PathBuf::from("b/carol.nmn")];
    let dirs = output_dirs(&inputs, Path::new("out")).unwrap();
    assert_eq!(dirs, vec![PathBuf::from("out/hymn"), PathBuf::from("out/carol")]);
}

#[test]
fn test_inputs_sharing_a_stem_are_rejected() {
    let inputs = vec![PathBuf::from("a/hymn.txt"), PathBuf::from("b/hymn.txt")];
    match output_dirs(&inputs, Path::new("out")).unwrap_err() {
        SongError::OutputCollision { first, second, dir } => {
            assert_eq!(first, PathBuf::from("a/hymn.txt"));
            assert_eq!(second, PathBuf::from("b/hymn.txt"));
            assert_eq!(dir, PathBuf::from("out/hymn"));
        }
        other => panic!("Expected OutputCollision, got {:?}", other),
    }
}

#[test]
fn test_melisma_cannot_hold_across_a_rest() {
    let err = parse("1 0 2\nah ~", 4).unwrap_err();
    assert!(matches!(
        err,
        SongError::Alignment {
            line: 2,
            kind: AlignmentErrorKind::OrphanMelisma { .. }
        }
    ));
}

#[test]
fn test_triplets_and_double_underlines() {
    let source = "1_/3 2_/3 3_/3 4= 5= 6_ 7 -\na b c d e f g";
    let compiled = compile(source, &LayoutConfig::default()).unwrap();
    assert!(compiled.warnings.is_empty());

    let notes: Vec<_> = compiled.song.notes().collect();
    assert_eq!(notes[0].duration_units, Ratio::new(1, 3));
    assert_eq!(notes[3].underlines, 2);
    assert_eq!(notes[3].duration_units, Ratio::new(1, 4));
    // Triplet mark centred over the first three cells
    assert!(compiled.pages[0].contains("anchor=center] at (15.00,-2.50) {3};"));
}

#[test]
fn test_melody_where_lyrics_expected() {
    let err = parse("1 2 3 4\n\n4 3 2 1\nla la la la", 4).unwrap_err();
    assert!(matches!(
        err,
        SongError::Structure {
            line: 1,
            kind: StructureErrorKind::MissingLyricLine,
            ..
        }
    ));
}

#[test]
fn test_closing_bar_matches_row_width() {
    let song = parse(TWINKLE, 4).unwrap().song;
    let config = LayoutConfig {
        page_width: 60.0,
        ..LayoutConfig::default()
    };
    for page in layout(&song, &config) {
        let primitives = emit_page(&page, &song, &config);
        for row in &page.rows {
            let has_closing_bar = primitives.iter().any(|p| {
                matches!(p, DrawPrimitive::LineSegment { x1, x2, .. } if *x1 == row.width && *x2 == row.width)
            });
            assert!(has_closing_bar, "no bar line at row end {}", row.width);
        }
    }
}

/// A single note in melody syntax
fn note_strategy() -> impl Strategy<Value = String> {
    (1u8..=7, 0usize..3, 0usize..3, 0usize..2, 0usize..3, any::<bool>()).prop_map(
        |(degree, octave, underlines, dots, dashes, high)| {
            let mut s = degree.to_string();
            let mark = if high { "'" } else { "." };
            s.push_str(&mark.repeat(octave));
            s.push_str(&"_".repeat(underlines));
            s.push_str(&"*".repeat(dots));
            // Dashes only on notes without underlines
            if underlines == 0 {
                s.push_str(&" -".repeat(dashes));
            }
            s
        },
    )
}

/// Melody of non-empty measures, optionally ending with a bar line
fn melody_strategy() -> impl Strategy<Value = (String, usize)> {
    (
        prop::collection::vec(prop::collection::vec(note_strategy(), 1..5), 1..8),
        any::<bool>(),
    )
        .prop_map(|(measures, trailing_bar)| {
            let count = measures.len();
            let mut melody = measures
                .iter()
                .map(|m| m.join(" "))
                .collect::<Vec<_>>()
                .join(" | ");
            if trailing_bar {
                melody.push_str(" |");
            }
            (melody, count)
        })
}

proptest! {
    #[test]
    fn prop_measure_count_follows_bar_lines((melody, count) in melody_strategy()) {
        let parsed = parse(&format!("{}\n-", melody), 4).unwrap();
        let bars = melody.matches('|').count();
        let measures = parsed.song.lines[0].measures.len();
        prop_assert_eq!(measures, count);
        prop_assert!(measures == bars || measures == bars + 1);
    }

    #[test]
    fn prop_durations_are_positive((melody, _) in melody_strategy()) {
        let parsed = parse(&format!("{}\n-", melody), 4).unwrap();
        for note in parsed.song.notes() {
            prop_assert!(note.duration_units > Ratio::from_integer(0));
        }
    }

    #[test]
    fn prop_alignment_is_exact(notes in 1usize..12, syllables in 1usize..12) {
        let melody = vec!["5"; notes].join(" ");
        let lyrics = vec!["la"; syllables].join(" ");
        let result = parse(&format!("{}\n{}", melody, lyrics), 4);
        if notes == syllables {
            let parsed = result.unwrap();
            let all_syllables = parsed.song.lines[0]
                .syllables
                .iter()
                .all(|s| matches!(s, SyllableSlot::Syllable { .. }));
            prop_assert!(all_syllables);
        } else {
            let is_mismatch = matches!(
                result,
                Err(SongError::Alignment {
                    kind: AlignmentErrorKind::SyllableCountMismatch { .. },
                    ..
                })
            );
            prop_assert!(is_mismatch);
        }
    }

    #[test]
    fn prop_layout_is_deterministic_and_complete(
        lines in prop::collection::vec(melody_strategy(), 1..6),
        page_width in 10.0f64..300.0,
        page_height in 40.0f64..400.0,
    ) {
        let source: String = lines
            .iter()
            .map(|(melody, _)| format!("{}\n-\n", melody))
            .collect();
        let song = parse(&source, 4).unwrap().song;
        let config = LayoutConfig { page_width, page_height, ..LayoutConfig::default() };

        let first = layout(&song, &config);
        let second = layout(&song, &config);
        prop_assert_eq!(&first, &second);

        // Every measure appears exactly once, in order, never split
        let mut seen = Vec::new();
        for page in &first {
            for row in &page.rows {
                prop_assert!(!row.measures.is_empty());
                for m in row.measures.clone() {
                    seen.push((row.line_index, m));
                }
            }
        }
        let expected: Vec<_> = song
            .lines
            .iter()
            .enumerate()
            .flat_map(|(i, line)| (0..line.measures.len()).map(move |m| (i, m)))
            .collect();
        prop_assert_eq!(seen, expected);

        let pages_a = compile(&source, &config).unwrap().pages;
        let pages_b = compile(&source, &config).unwrap().pages;
        prop_assert_eq!(pages_a, pages_b);
    }

    #[test]
    fn prop_digits_advance_left_to_right((melody, _) in melody_strategy()) {
        let config = LayoutConfig::default();
        let song = parse(&format!("{}\n-", melody), 4).unwrap().song;
        for page in layout(&song, &config) {
            let primitives = emit_page(&page, &song, &config);
            let digits: Vec<(f64, f64)> = primitives
                .iter()
                .filter_map(|p| match p {
                    DrawPrimitive::Glyph { symbol: GlyphSymbol::Digit(_), x, y, .. } => Some((*x, *y)),
                    _ => None,
                })
                .collect();
            // Same y means same row
            for pair in digits.windows(2) {
                if pair[0].1 == pair[1].1 {
                    prop_assert!(pair[1].0 > pair[0].0);
                }
            }
        }
    }
}
