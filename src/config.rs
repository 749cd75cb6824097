//! # Layout Configuration
//!
//! Page geometry, the per-symbol width table shared by the line wrapper and
//! the geometry emitter, and the vertical offsets used when drawing.
//!
//! All lengths are in points. A configuration file is a YAML document with
//! every top-level field present:
//!
//! ```yaml
//! page_width: 400
//! page_height: 240
//! line_height: 40
//! beats_per_measure: 4
//! symbol_width_table:
//!   note: 10
//!   dash: 5
//!   augmentation_dot: 5
//!   bar_line: 5
//! offset_table:
//!   note_baseline: 12
//!   # ...
//! ```
//!
//! `LayoutConfig::default()` is the preset used when no file is given; it is
//! never adjusted from the song being rendered.

use crate::ast::Measure;
use crate::error::SongError;
use crate::tikz::MIN_SCALE;
use serde::Deserialize;
use std::path::Path;

/// Horizontal advance of each symbol
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct SymbolWidthTable {
    /// Digit cell, accidentals and octave dots included.
    pub note: f64,
    pub dash: f64,
    pub augmentation_dot: f64,
    /// Gap between two measures of a row.
    pub bar_line: f64,
}

impl Default for SymbolWidthTable {
    fn default() -> Self {
        Self {
            note: 10.0,
            dash: 5.0,
            augmentation_dot: 5.0,
            bar_line: 5.0,
        }
    }
}

/// Vertical offsets, measured from the glyph centre unless noted
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct OffsetTable {
    /// Glyph centre below the row top.
    pub note_baseline: f64,
    /// First octave dot above (or below) the glyph centre.
    pub octave_dot_first: f64,
    pub octave_dot_step: f64,
    /// First underline below the glyph centre.
    pub underline_first: f64,
    pub underline_step: f64,
    pub lyric_baseline: f64,
    /// Tie and slur end points above the glyph centre.
    pub tie_clearance: f64,
    pub bar_half_height: f64,
    pub dash_length: f64,
    /// Accidental distance left of the glyph centre.
    pub accidental_shift: f64,
    pub accidental_scale: f64,
    /// Room for the title block on the first page.
    pub header_height: f64,
}

impl Default for OffsetTable {
    fn default() -> Self {
        Self {
            note_baseline: 12.0,
            octave_dot_first: 6.0,
            octave_dot_step: 2.5,
            underline_first: 5.0,
            underline_step: 1.5,
            lyric_baseline: 17.0,
            tie_clearance: 7.0,
            bar_half_height: 5.0,
            dash_length: 4.0,
            accidental_shift: 4.0,
            accidental_scale: 0.6,
            header_height: 20.0,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct LayoutConfig {
    pub page_width: f64,
    pub page_height: f64,
    pub line_height: f64,
    pub beats_per_measure: u32,
    pub symbol_width_table: SymbolWidthTable,
    pub offset_table: OffsetTable,
}

impl Default for LayoutConfig {
    fn default() -> Self {
        Self {
            page_width: 400.0,
            page_height: 240.0,
            line_height: 40.0,
            beats_per_measure: 4,
            symbol_width_table: SymbolWidthTable::default(),
            offset_table: OffsetTable::default(),
        }
    }
}

impl LayoutConfig {
    /// Parse and validate a YAML configuration.
    pub fn from_yaml_str(content: &str) -> Result<Self, SongError> {
        let config: LayoutConfig =
            serde_yaml::from_str(content).map_err(|e| SongError::Config(e.to_string()))?;
        config.validate()?;
        Ok(config)
    }

    pub fn from_path(path: &Path) -> Result<Self, SongError> {
        let content = std::fs::read_to_string(path)?;
        Self::from_yaml_str(&content)
    }

    /// Reject values that would make layout meaningless.
    ///
    /// Sizes must be finite and positive; offsets must be finite and not
    /// negative. The accidental scale must be large enough to be printed.
    pub fn validate(&self) -> Result<(), SongError> {
        let widths = &self.symbol_width_table;
        let offsets = &self.offset_table;

        let positive = [
            ("page_width", self.page_width),
            ("page_height", self.page_height),
            ("line_height", self.line_height),
            ("symbol_width_table.note", widths.note),
            ("symbol_width_table.dash", widths.dash),
            ("symbol_width_table.augmentation_dot", widths.augmentation_dot),
            ("symbol_width_table.bar_line", widths.bar_line),
            ("offset_table.accidental_scale", offsets.accidental_scale),
        ];
        for (name, value) in positive {
            if !value.is_finite() || value <= 0.0 {
                return Err(SongError::Config(format!(
                    "{} must be a positive number, got {}",
                    name, value
                )));
            }
        }

        let non_negative = [
            ("offset_table.note_baseline", offsets.note_baseline),
            ("offset_table.octave_dot_first", offsets.octave_dot_first),
            ("offset_table.octave_dot_step", offsets.octave_dot_step),
            ("offset_table.underline_first", offsets.underline_first),
            ("offset_table.underline_step", offsets.underline_step),
            ("offset_table.lyric_baseline", offsets.lyric_baseline),
            ("offset_table.tie_clearance", offsets.tie_clearance),
            ("offset_table.bar_half_height", offsets.bar_half_height),
            ("offset_table.dash_length", offsets.dash_length),
            ("offset_table.accidental_shift", offsets.accidental_shift),
            ("offset_table.header_height", offsets.header_height),
        ];
        for (name, value) in non_negative {
            if !value.is_finite() || value < 0.0 {
                return Err(SongError::Config(format!(
                    "{} must be a non-negative number, got {}",
                    name, value
                )));
            }
        }

        if offsets.accidental_scale < MIN_SCALE {
            return Err(SongError::Config(format!(
                "offset_table.accidental_scale must be at least {}, got {}",
                MIN_SCALE, offsets.accidental_scale
            )));
        }

        if self.beats_per_measure == 0 {
            return Err(SongError::Config(
                "beats_per_measure must be at least 1".to_string(),
            ));
        }
        Ok(())
    }
}

/// Horizontal advance of one note: digit cell, then dots, then dashes.
pub fn note_width(dashes: u32, dots: u32, table: &SymbolWidthTable) -> f64 {
    table.note + f64::from(dashes) * table.dash + f64::from(dots) * table.augmentation_dot
}

/// Width of a measure without the surrounding bar advances.
///
/// The line wrapper packs rows with this and the geometry emitter advances
/// its cursor with `note_width`, so both always agree.
pub fn measure_width(measure: &Measure, table: &SymbolWidthTable) -> f64 {
    measure
        .notes
        .iter()
        .map(|n| note_width(n.dashes, n.dots, table))
        .sum()
}
