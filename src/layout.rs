//! # Line Wrapper and Page Layout
//!
//! Packs the measures of each line into printed rows and the rows into pages.
//!
//! ## Rows
//! Every source line starts a new row. Measures are added left to right while
//! `width + bar_line + next` fits in `page_width`; otherwise a new row begins.
//! A measure wider than the page still gets a row of its own, so measures are
//! never split and never dropped.
//!
//! ## Pages
//! `rows_per_page = max(1, floor((page_height - header) / line_height))`,
//! where `header` is the header height on the first page of a song with a
//! title block. A row that opens a section always starts a new page.
//!
//! Layout is a pure function of the song and configuration.

use crate::ast::{Line, Song};
use crate::config::{measure_width, LayoutConfig};
use std::ops::Range;

/// One printed row: a contiguous run of measures from a single line
#[derive(Debug, Clone, PartialEq)]
pub struct Row<'a> {
    /// Index into `Song::lines`.
    pub line_index: usize,
    pub line: &'a Line,
    /// Measure indices within `line.measures`.
    pub measures: Range<usize>,
    /// Left edge of each measure, relative to the row start.
    pub offsets: Vec<f64>,
    pub width: f64,
    /// The row opens a `[Label]` section.
    pub starts_section: bool,
}

/// Rows assigned to one page
#[derive(Debug, Clone, PartialEq)]
pub struct PageGroup<'a> {
    pub index: usize,
    pub rows: Vec<Row<'a>>,
    /// First page of a song with a title block.
    pub has_header: bool,
}

impl PageGroup<'_> {
    /// Top of the first row.
    pub fn top(&self, config: &LayoutConfig) -> f64 {
        if self.has_header {
            config.offset_table.header_height
        } else {
            0.0
        }
    }
}

/// Greedy packing of one line's measures into rows.
fn wrap_line<'a>(line_index: usize, line: &'a Line, config: &LayoutConfig) -> Vec<Row<'a>> {
    let table = &config.symbol_width_table;
    let mut rows = Vec::new();
    let mut start = 0;
    let mut offsets: Vec<f64> = Vec::new();
    let mut width = 0.0;

    for (i, measure) in line.measures.iter().enumerate() {
        let measure_w = measure_width(measure, table);

        if !offsets.is_empty() && width + table.bar_line + measure_w > config.page_width {
            rows.push(Row {
                line_index,
                line,
                measures: start..i,
                offsets: std::mem::take(&mut offsets),
                width,
                starts_section: start == 0 && line.section.is_some(),
            });
            start = i;
            width = 0.0;
        }

        if offsets.is_empty() {
            offsets.push(0.0);
            width = measure_w;
        } else {
            offsets.push(width + table.bar_line);
            width += table.bar_line + measure_w;
        }
    }

    if !offsets.is_empty() {
        rows.push(Row {
            line_index,
            line,
            measures: start..line.measures.len(),
            offsets,
            width,
            starts_section: start == 0 && line.section.is_some(),
        });
    }
    rows
}

/// How many rows fit on a page.
pub fn rows_per_page(config: &LayoutConfig, has_header: bool) -> usize {
    let header = if has_header {
        config.offset_table.header_height
    } else {
        0.0
    };
    let rows = ((config.page_height - header) / config.line_height).floor();
    // Negative and NaN saturate to 0
    (rows as usize).max(1)
}

/// Lay out a song into pages.
pub fn layout<'a>(song: &'a Song, config: &LayoutConfig) -> Vec<PageGroup<'a>> {
    let heading = song.metadata.has_heading();
    let mut pages: Vec<PageGroup<'a>> = Vec::new();
    let mut current = PageGroup {
        index: 0,
        rows: Vec::new(),
        has_header: heading,
    };

    let rows = song
        .lines
        .iter()
        .enumerate()
        .flat_map(|(i, line)| wrap_line(i, line, config));

    for row in rows {
        let capacity = rows_per_page(config, current.has_header);
        let full = current.rows.len() >= capacity;
        let new_section = row.starts_section && !current.rows.is_empty();

        if full || new_section {
            let next = PageGroup {
                index: current.index + 1,
                rows: Vec::new(),
                has_header: false,
            };
            pages.push(std::mem::replace(&mut current, next));
        }
        current.rows.push(row);
    }

    if !current.rows.is_empty() || (pages.is_empty() && heading) {
        pages.push(current);
    }

    log::debug!(
        "laid out {} lines into {} pages",
        song.lines.len(),
        pages.len()
    );
    pages
}
