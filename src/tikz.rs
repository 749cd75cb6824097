//! # TikZ Writer
//!
//! Serializes the drawing primitives of one page into a `tikzpicture` and
//! writes a song's pages to disk.
//!
//! ## Output
//! - Units are points (`x=1pt,y=1pt`) and y is negated, so the page's
//!   downward axis becomes TikZ's upward one
//! - Coordinates and scales are printed with two decimals
//! - Text runs are escaped with `escape_tex`
//!
//! ## Range Checks
//! Every coordinate must be finite and within `MAX_DIMENSION`, TeX's largest
//! dimension. Glyph scales must lie between `MIN_SCALE` and `MAX_DIMENSION`
//! so they survive the two-decimal printing. A failing primitive aborts the
//! page with `SongError::Emission`.
//!
//! ## Files
//! `write_pages` produces `page-01.tex`, `page-02.tex`, ... and a `song.tex`
//! that `\input`s them with a `\newpage` in between.

use crate::error::{EmissionErrorKind, SongError};
use crate::geometry::{Anchor, DrawPrimitive, GlyphSymbol};
use std::path::{Path, PathBuf};

/// Largest dimension TeX can represent, in points.
pub const MAX_DIMENSION: f64 = 16383.99;

/// Smallest glyph scale that still prints as a non-zero value.
pub const MIN_SCALE: f64 = 0.01;

/// Serialize one page of primitives to a TikZ picture.
///
/// Coordinates are flipped so that the page's downward y becomes TikZ's
/// upward y. `page` is only used for error reporting.
pub fn render_page(primitives: &[DrawPrimitive], page: usize) -> Result<String, SongError> {
    let mut tex = String::new();

    tex.push_str("\\begin{tikzpicture}[x=1pt,y=1pt]\n");

    for (i, primitive) in primitives.iter().enumerate() {
        let out_of_range = || SongError::Emission {
            page,
            primitive_index: i,
            kind: EmissionErrorKind::OutOfRange,
        };
        check_primitive(primitive).ok_or_else(out_of_range)?;
        tex.push_str(&primitive_to_tex(primitive));
    }

    tex.push_str("\\end{tikzpicture}\n");

    Ok(tex)
}

/// `Some(())` when every value fits the engine's numeric range.
fn check_primitive(primitive: &DrawPrimitive) -> Option<()> {
    let coordinates = match primitive {
        DrawPrimitive::Glyph { x, y, scale, .. } => {
            if !scale.is_finite() || *scale < MIN_SCALE || *scale > MAX_DIMENSION {
                return None;
            }
            vec![*x, *y]
        }
        DrawPrimitive::LineSegment { x1, y1, x2, y2 } | DrawPrimitive::Arc { x1, y1, x2, y2 } => {
            vec![*x1, *y1, *x2, *y2]
        }
        DrawPrimitive::TextRun { x, y, .. } => vec![*x, *y],
    };

    coordinates
        .iter()
        .all(|v| v.is_finite() && v.abs() <= MAX_DIMENSION)
        .then_some(())
}

fn primitive_to_tex(primitive: &DrawPrimitive) -> String {
    match primitive {
        DrawPrimitive::Glyph {
            symbol,
            x,
            y,
            scale,
        } => format!(
            "  \\node[inner sep=0pt,scale={:.2}] at ({}) {{{}}};\n",
            scale,
            point(*x, *y),
            glyph_to_tex(*symbol)
        ),
        DrawPrimitive::LineSegment { x1, y1, x2, y2 } => format!(
            "  \\draw[line width=0.4pt] ({}) -- ({});\n",
            point(*x1, *y1),
            point(*x2, *y2)
        ),
        DrawPrimitive::TextRun { text, x, y, anchor } => format!(
            "  \\node[inner sep=0pt,anchor={}] at ({}) {{{}}};\n",
            anchor_to_tex(*anchor),
            point(*x, *y),
            escape_tex(text)
        ),
        DrawPrimitive::Arc { x1, y1, x2, y2 } => format!(
            "  \\draw[line width=0.4pt] ({}) to[bend left=30] ({});\n",
            point(*x1, *y1),
            point(*x2, *y2)
        ),
    }
}

fn point(x: f64, y: f64) -> String {
    // -0.0 would print as "-0.00"
    format!("{:.2},{:.2}", x, -y + 0.0)
}

fn glyph_to_tex(symbol: GlyphSymbol) -> String {
    match symbol {
        GlyphSymbol::Digit(d) => d.to_string(),
        GlyphSymbol::OctaveDot => "\\textbullet".to_string(),
        GlyphSymbol::AugmentationDot => "$\\cdot$".to_string(),
        GlyphSymbol::Sharp => "$\\sharp$".to_string(),
        GlyphSymbol::Flat => "$\\flat$".to_string(),
        GlyphSymbol::Natural => "$\\natural$".to_string(),
    }
}

fn anchor_to_tex(anchor: Anchor) -> &'static str {
    match anchor {
        Anchor::Start => "west",
        Anchor::Middle => "center",
        Anchor::End => "east",
    }
}

/// Escape TeX special characters in running text.
pub fn escape_tex(s: &str) -> String {
    let mut escaped = String::with_capacity(s.len());
    for c in s.chars() {
        match c {
            '\\' => escaped.push_str("\\textbackslash{}"),
            '{' | '}' | '#' | '$' | '%' | '&' | '_' => {
                escaped.push('\\');
                escaped.push(c);
            }
            '^' => escaped.push_str("\\textasciicircum{}"),
            '~' => escaped.push_str("\\textasciitilde{}"),
            '♩' => escaped.push_str("\\textmusicalnote{}"),
            _ => escaped.push(c),
        }
    }
    escaped
}

/// File name of a rendered page, 0-based `index`.
pub fn page_file_name(index: usize) -> String {
    format!("page-{:02}.tex", index + 1)
}

/// Page number of a file written by `write_pages`, 1-based.
fn page_number(file_name: &str) -> Option<usize> {
    file_name
        .strip_prefix("page-")?
        .strip_suffix(".tex")?
        .parse()
        .ok()
}

/// Delete page files left over from an earlier render with more pages.
fn remove_stale_pages(dir: &Path, keep: usize) -> Result<(), SongError> {
    for entry in std::fs::read_dir(dir)? {
        let entry = entry?;
        let stale = entry
            .file_name()
            .to_str()
            .and_then(page_number)
            .is_some_and(|n| n == 0 || n > keep);
        if stale {
            std::fs::remove_file(entry.path())?;
            log::debug!("removed stale {}", entry.path().display());
        }
    }
    Ok(())
}

/// Write rendered pages and a `song.tex` index into `dir`.
///
/// The directory is created if needed. Page files from an earlier, longer
/// render are removed, other files are left alone. Returns the written paths,
/// index last.
pub fn write_pages(pages: &[String], dir: &Path) -> Result<Vec<PathBuf>, SongError> {
    std::fs::create_dir_all(dir)?;
    remove_stale_pages(dir, pages.len())?;

    let mut written = Vec::with_capacity(pages.len() + 1);
    let mut index = String::new();

    for (i, page) in pages.iter().enumerate() {
        let name = page_file_name(i);
        let path = dir.join(&name);
        std::fs::write(&path, page)?;
        log::debug!("wrote {}", path.display());

        if i > 0 {
            index.push_str("\\newpage\n");
        }
        index.push_str(&format!("\\input{{{}}}\n", name));
        written.push(path);
    }

    let index_path = dir.join("song.tex");
    std::fs::write(&index_path, index)?;
    written.push(index_path);

    Ok(written)
}
