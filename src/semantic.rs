//! # Semantic Checks
//!
//! Checks that do not affect whether a song can be typeset.
//!
//! ## Measure Duration
//! - Each measure's total duration (sum of all note/rest durations) should
//!   match the configured beats per measure
//! - Dashes, underlines and augmentation dots are counted exactly
//! - A mismatch is reported as a `MeasureWarning`, never as an error: pickup
//!   bars and free-metre hymns are common in songbooks
//!
//! ## Related Modules
//! - `measures` - calls `check_measure` for every measure it builds
//! - `error` - defines `MeasureWarning`

use crate::ast::{Beats, Measure};
use crate::error::MeasureWarning;

/// Compare one measure against the expected beat count.
pub fn check_measure(measure: &Measure, expected: Beats, line: usize) -> Option<MeasureWarning> {
    let actual = measure.total_beats();
    if actual == expected {
        return None;
    }

    let warning = MeasureWarning {
        measure_index: measure.index,
        line,
        expected_beats: expected,
        actual_beats: actual,
    };
    log::warn!("{}", warning);
    Some(warning)
}
