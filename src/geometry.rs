//! # Geometry Emitter
//!
//! Turns one laid-out page into absolute drawing primitives.
//!
//! ## Coordinates
//! Points, origin at the top-left of the page, y grows downward. Row `r`
//! starts at `top + r * line_height`; glyph centres sit `note_baseline` below
//! that.
//!
//! ## Horizontal Rhythm
//! Each note occupies `config::note_width`: the digit cell, then one cell per
//! augmentation dot, then one cell per dash. Measures start at the row offsets
//! computed by the line wrapper, with a bar line centred in the gap between
//! them and a closing bar at the row end. The wrapper and the emitter share the
//! same width function, so the last cell of a row always ends at `row.width`.
//!
//! ## Marks
//! - Octave dots stack above the digit, or below its underlines
//! - Underlines of notes in the same beat are merged (jianpu beaming)
//! - Ties and melisma slurs are arcs above the digits; a tie crossing a row
//!   break is drawn as two open halves
//! - Each group of three triplet notes gets a small `3` above its middle
//! - Syllables are centred below their note; hyphenated ones get a `-` run
//!   halfway to the next syllable of the row

use crate::ast::{Accidental, Beats, Metadata, Note, Song, SyllableSlot};
use crate::config::{note_width, LayoutConfig};
use crate::layout::{PageGroup, Row};

/// Glyphs drawn as a single symbol
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum GlyphSymbol {
    Digit(u8),
    OctaveDot,
    AugmentationDot,
    Sharp,
    Flat,
    Natural,
}

/// Horizontal anchoring of a text run
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Anchor {
    Start,
    Middle,
    End,
}

#[derive(Debug, Clone, PartialEq)]
pub enum DrawPrimitive {
    Glyph {
        symbol: GlyphSymbol,
        x: f64,
        y: f64,
        scale: f64,
    },
    LineSegment {
        x1: f64,
        y1: f64,
        x2: f64,
        y2: f64,
    },
    TextRun {
        text: String,
        x: f64,
        y: f64,
        anchor: Anchor,
    },
    /// Upward-bending arc, used for ties and slurs.
    Arc {
        x1: f64,
        y1: f64,
        x2: f64,
        y2: f64,
    },
}

/// A note with its horizontal position in the row
struct Placed<'a> {
    note: &'a Note,
    slot: Option<&'a SyllableSlot>,
    start: f64,
    centre: f64,
    end: f64,
    /// Position of the measure within the row.
    measure: usize,
    /// Onset within the measure.
    beat: Beats,
}

fn place_notes<'a>(row: &Row<'a>, config: &LayoutConfig) -> Vec<Placed<'a>> {
    let table = &config.symbol_width_table;
    let line = row.line;
    let first_note: usize = line.measures[..row.measures.start]
        .iter()
        .map(|m| m.notes.len())
        .sum();
    let mut slots = line.syllables.iter().skip(first_note);
    let mut placed = Vec::new();

    for (k, measure) in line.measures[row.measures.clone()].iter().enumerate() {
        let mut x = row.offsets.get(k).copied().unwrap_or(0.0);
        let mut beat = Beats::from_integer(0);

        for note in &measure.notes {
            let advance = note_width(note.dashes, note.dots, table);
            placed.push(Placed {
                note,
                slot: slots.next(),
                start: x,
                centre: x + table.note / 2.0,
                end: x + table.note + f64::from(note.dots) * table.augmentation_dot,
                measure: k,
                beat,
            });
            x += advance;
            beat += note.duration_units;
        }
    }
    placed
}

/// First note printed after `measure_end` of the given line, possibly on the
/// next line.
fn note_after(song: &Song, line_index: usize, measure_end: usize) -> Option<&Note> {
    let line = song.lines.get(line_index)?;
    match line.measures.get(measure_end) {
        Some(measure) => measure.notes.first(),
        None => song
            .lines
            .get(line_index + 1)?
            .measures
            .first()?
            .notes
            .first(),
    }
}

struct Emitter<'a> {
    song: &'a Song,
    config: &'a LayoutConfig,
    primitives: Vec<DrawPrimitive>,
}

impl<'a> Emitter<'a> {
    fn glyph(&mut self, symbol: GlyphSymbol, x: f64, y: f64, scale: f64) {
        self.primitives.push(DrawPrimitive::Glyph {
            symbol,
            x,
            y,
            scale,
        });
    }

    fn segment(&mut self, x1: f64, y1: f64, x2: f64, y2: f64) {
        self.primitives
            .push(DrawPrimitive::LineSegment { x1, y1, x2, y2 });
    }

    fn text(&mut self, text: &str, x: f64, y: f64, anchor: Anchor) {
        self.primitives.push(DrawPrimitive::TextRun {
            text: text.to_string(),
            x,
            y,
            anchor,
        });
    }

    fn arc(&mut self, x1: f64, x2: f64, y: f64) {
        self.primitives.push(DrawPrimitive::Arc {
            x1,
            y1: y,
            x2,
            y2: y,
        });
    }

    fn header(&mut self, metadata: &Metadata) {
        let width = self.config.page_width;
        let height = self.config.offset_table.header_height;

        if let Some(title) = &metadata.title {
            self.text(title, width / 2.0, height * 0.4, Anchor::Middle);
        }
        if let Some(subtitle) = &metadata.subtitle {
            self.text(subtitle, width / 2.0, height * 0.8, Anchor::Middle);
        }
        if let Some(composer) = &metadata.composer {
            self.text(composer, width, height * 0.8, Anchor::End);
        }

        let annotation: Vec<String> = [
            metadata.key.clone(),
            metadata.time.clone(),
            metadata.tempo.as_ref().map(|t| t.to_string()),
        ]
        .into_iter()
        .flatten()
        .collect();
        if !annotation.is_empty() {
            self.text(&annotation.join("  "), 0.0, height * 0.8, Anchor::Start);
        }
    }

    fn bar_line(&mut self, x: f64, y: f64) {
        let half = self.config.offset_table.bar_half_height;
        self.segment(x, y - half, x, y + half);
    }

    fn note(&mut self, placed: &Placed, y: f64) {
        let config = self.config;
        let offsets = &config.offset_table;
        let table = &config.symbol_width_table;
        let note = placed.note;
        let x = placed.centre;

        self.glyph(GlyphSymbol::Digit(note.degree), x, y, 1.0);

        if let Some(accidental) = note.accidental {
            let symbol = match accidental {
                Accidental::Sharp => GlyphSymbol::Sharp,
                Accidental::Flat => GlyphSymbol::Flat,
                Accidental::Natural => GlyphSymbol::Natural,
            };
            self.glyph(
                symbol,
                x - offsets.accidental_shift,
                y - offsets.accidental_shift / 2.0,
                offsets.accidental_scale,
            );
        }

        let below = offsets.octave_dot_first + f64::from(note.underlines) * offsets.underline_step;
        for k in 0..note.octave.unsigned_abs() {
            let step = f64::from(k) * offsets.octave_dot_step;
            let dot_y = if note.octave > 0 {
                y - offsets.octave_dot_first - step
            } else {
                y + below + step
            };
            self.glyph(GlyphSymbol::OctaveDot, x, dot_y, 1.0);
        }

        let mut cell = placed.start + table.note;
        for _ in 0..note.dots {
            self.glyph(
                GlyphSymbol::AugmentationDot,
                cell + table.augmentation_dot / 2.0,
                y,
                1.0,
            );
            cell += table.augmentation_dot;
        }
        for _ in 0..note.dashes {
            let centre = cell + table.dash / 2.0;
            let half = offsets.dash_length / 2.0;
            self.segment(centre - half, y, centre + half, y);
            cell += table.dash;
        }
    }

    /// Underlines, merged across the notes of one beat.
    fn underlines(&mut self, placed: &[Placed], y: f64) {
        let config = self.config;
        let offsets = &config.offset_table;
        let inset = config.symbol_width_table.note * 0.1;

        // A note on a whole beat or in another measure opens a new group
        let mut groups: Vec<&[Placed]> = Vec::new();
        let mut start = 0;
        for i in 1..placed.len() {
            if placed[i].measure != placed[i - 1].measure || placed[i].beat.is_integer() {
                groups.push(&placed[start..i]);
                start = i;
            }
        }
        if !placed.is_empty() {
            groups.push(&placed[start..]);
        }

        for group in groups {
            let depth = group.iter().map(|p| p.note.underlines).max().unwrap_or(0);
            for d in 0..depth {
                let line_y = y + offsets.underline_first + f64::from(d) * offsets.underline_step;
                let mut run: Option<(f64, f64)> = None;
                for p in group {
                    if p.note.underlines > d {
                        let begin = run.map_or(p.start, |(s, _)| s);
                        run = Some((begin, p.end));
                    } else if let Some((s, e)) = run.take() {
                        self.segment(s + inset, line_y, e - inset, line_y);
                    }
                }
                if let Some((s, e)) = run {
                    self.segment(s + inset, line_y, e - inset, line_y);
                }
            }
        }
    }

    fn ties(&mut self, row: &Row, placed: &[Placed], y: f64) {
        let tie_y = y - self.config.offset_table.tie_clearance;

        // Tie coming in from the previous row
        if let Some(first) = placed.first() {
            if matches!(first.slot, Some(SyllableSlot::Tied)) {
                self.arc(0.0, first.centre, tie_y);
            }
        }

        for (i, p) in placed.iter().enumerate() {
            if !p.note.tied_to_next {
                continue;
            }
            match placed.get(i + 1) {
                Some(next) => {
                    if !next.note.is_rest() {
                        self.arc(p.centre, next.centre, tie_y);
                    }
                }
                None => {
                    let continues = note_after(self.song, row.line_index, row.measures.end)
                        .is_some_and(|n| !n.is_rest());
                    if continues {
                        self.arc(p.centre, row.width, tie_y);
                    }
                }
            }
        }
    }

    /// `3` over every three consecutive triplet notes of a measure.
    fn triplets(&mut self, placed: &[Placed], y: f64) {
        let offsets = &self.config.offset_table;
        let mark_y = y - offsets.tie_clearance - offsets.octave_dot_step;
        let mut run: Vec<&Placed> = Vec::new();

        for p in placed {
            let breaks = run
                .last()
                .is_some_and(|q| q.measure != p.measure || !p.note.triplet);
            if breaks {
                self.triplet_mark(&run, mark_y);
                run.clear();
            }
            if p.note.triplet {
                run.push(p);
                if run.len() == 3 {
                    self.triplet_mark(&run, mark_y);
                    run.clear();
                }
            }
        }
        self.triplet_mark(&run, mark_y);
    }

    fn triplet_mark(&mut self, run: &[&Placed], y: f64) {
        if let (Some(first), Some(last)) = (run.first(), run.last()) {
            self.text("3", (first.start + last.end) / 2.0, y, Anchor::Middle);
        }
    }

    /// Syllables, hyphens and melisma slurs.
    fn lyrics(&mut self, row: &Row, placed: &[Placed], y: f64) {
        let offsets = &self.config.offset_table;
        let lyric_y = y + offsets.lyric_baseline;
        let slur_y = y - offsets.tie_clearance;

        // Note holding the current syllable, and the last note it is held over
        let mut anchor: Option<f64> = None;
        let mut held: Option<f64> = None;

        for (i, p) in placed.iter().enumerate() {
            match p.slot {
                Some(SyllableSlot::Syllable { text, hyphenated }) => {
                    if let Some(end) = held.take() {
                        self.arc(anchor.unwrap_or(0.0), end, slur_y);
                    }
                    anchor = Some(p.centre);
                    self.text(text, p.centre, lyric_y, Anchor::Middle);

                    if *hyphenated {
                        let next = placed[i + 1..]
                            .iter()
                            .find(|q| matches!(q.slot, Some(SyllableSlot::Syllable { .. })))
                            .map_or(row.width, |q| q.centre);
                        self.text("-", (p.centre + next) / 2.0, lyric_y, Anchor::Middle);
                    }
                }
                Some(SyllableSlot::Melisma) => held = Some(p.centre),
                Some(SyllableSlot::Tied) | Some(SyllableSlot::Unassigned) | None => {}
            }
        }

        if let Some(end) = held {
            self.arc(anchor.unwrap_or(0.0), end, slur_y);
        }
    }

    fn row(&mut self, row: &Row, y0: f64) {
        let config = self.config;
        let y = y0 + config.offset_table.note_baseline;

        if row.starts_section {
            if let Some(label) = &row.line.section {
                self.text(label, 0.0, y0, Anchor::Start);
            }
        }

        let placed = place_notes(row, config);

        let bar = config.symbol_width_table.bar_line;
        for &offset in row.offsets.iter().skip(1) {
            self.bar_line(offset - bar / 2.0, y);
        }
        self.bar_line(row.width, y);

        for p in &placed {
            self.note(p, y);
        }
        self.underlines(&placed, y);
        self.ties(row, &placed, y);
        self.triplets(&placed, y);
        self.lyrics(row, &placed, y);
    }
}

/// Emit the drawing primitives of one page.
pub fn emit_page(page: &PageGroup, song: &Song, config: &LayoutConfig) -> Vec<DrawPrimitive> {
    let mut emitter = Emitter {
        song,
        config,
        primitives: Vec::new(),
    };

    if page.has_header {
        emitter.header(&song.metadata);
    }

    let top = page.top(config);
    for (r, row) in page.rows.iter().enumerate() {
        emitter.row(row, top + r as f64 * config.line_height);
    }

    log::trace!(
        "page {}: {} primitives",
        page.index,
        emitter.primitives.len()
    );
    emitter.primitives
}
