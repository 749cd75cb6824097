pub mod ast;
pub mod config;
pub mod display;
pub mod error;
pub mod geometry;
pub mod layout;
pub mod lexer;
pub mod lyrics;
pub mod measures;
pub mod parser;
pub mod semantic;
pub mod tikz;

pub use ast::*;
pub use config::{LayoutConfig, OffsetTable, SymbolWidthTable};
pub use display::format_song;
pub use error::*;
pub use geometry::{emit_page, Anchor, DrawPrimitive, GlyphSymbol};
pub use layout::{layout, PageGroup, Row};
pub use parser::{parse, Parsed};
pub use tikz::{render_page, write_pages};

use std::collections::HashMap;
use std::path::{Path, PathBuf};

/// Result of compiling one song
#[derive(Debug, Clone, PartialEq)]
pub struct Compiled {
    pub song: Song,
    /// One TikZ picture per page.
    pub pages: Vec<String>,
    pub warnings: Vec<MeasureWarning>,
}

/// Lay out and render an already parsed song.
pub fn render(song: &Song, config: &LayoutConfig) -> Result<Vec<String>, SongError> {
    layout(song, config)
        .iter()
        .map(|page| render_page(&emit_page(page, song, config), page.index))
        .collect()
}

/// Compile a song source string to TikZ pages.
/// This is the main entry point for the library.
pub fn compile(source: &str, config: &LayoutConfig) -> Result<Compiled, SongError> {
    config.validate()?;
    let Parsed { song, warnings } = parse(source, config.beats_per_measure)?;
    let pages = render(&song, config)?;
    Ok(Compiled {
        song,
        pages,
        warnings,
    })
}

/// Compile and write the pages into `dir`.
///
/// Every page is rendered before anything is written, so a failing song leaves
/// no output behind.
pub fn compile_to_dir(
    source: &str,
    config: &LayoutConfig,
    dir: &Path,
) -> Result<(Compiled, Vec<PathBuf>), SongError> {
    let compiled = compile(source, config)?;
    let written = write_pages(&compiled.pages, dir)?;
    Ok((compiled, written))
}

/// Output directory of each input, `out/<file stem>`, in input order.
///
/// Inputs are rendered concurrently, so two of them sharing a directory is
/// an error rather than a race.
pub fn output_dirs(inputs: &[PathBuf], out: &Path) -> Result<Vec<PathBuf>, SongError> {
    let mut claimed: HashMap<PathBuf, &PathBuf> = HashMap::new();
    let mut dirs = Vec::with_capacity(inputs.len());

    for input in inputs {
        let stem = input
            .file_stem()
            .and_then(|s| s.to_str())
            .unwrap_or("song");
        let dir = out.join(stem);
        if let Some(first) = claimed.insert(dir.clone(), input) {
            return Err(SongError::OutputCollision {
                first: first.clone(),
                second: input.clone(),
                dir,
            });
        }
        dirs.push(dir);
    }
    Ok(dirs)
}
