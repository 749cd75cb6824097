use clap::{Parser, Subcommand};
use nmn::{LayoutConfig, SongError};
use std::fs;
use std::path::{Path, PathBuf};
use std::process;

#[derive(Parser)]
#[command(name = "nmn")]
#[command(about = "Typeset numbered-notation songs with lyrics into TikZ pages")]
struct Args {
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Render songs to TikZ, one output directory per song
    Render {
        /// Song files to render
        #[arg(required = true)]
        inputs: Vec<PathBuf>,
        /// Layout configuration (YAML); the built-in preset if omitted
        #[arg(short, long)]
        config: Option<PathBuf>,
        /// Directory receiving one sub-directory per song
        #[arg(short, long, default_value = "out")]
        out: PathBuf,
    },
    /// Print the parsed song
    Inspect {
        input: PathBuf,
        /// Beats per measure used for the measure warnings
        #[arg(short, long, default_value_t = 4)]
        beats: u32,
    },
}

fn render_file(input: &Path, config: &LayoutConfig, dir: &Path) -> Result<usize, SongError> {
    let source = fs::read_to_string(input)?;
    let (compiled, _) = nmn::compile_to_dir(&source, config, dir)?;

    for warning in &compiled.warnings {
        eprintln!("{}: warning: {}", input.display(), warning);
    }
    Ok(compiled.pages.len())
}

fn render(inputs: &[PathBuf], config: Option<&Path>, out: &Path) -> bool {
    let config = match config {
        Some(path) => match LayoutConfig::from_path(path) {
            Ok(config) => config,
            Err(e) => {
                eprintln!("Error reading config '{}': {}", path.display(), e);
                return false;
            }
        },
        None => LayoutConfig::default(),
    };

    let dirs = match nmn::output_dirs(inputs, out) {
        Ok(dirs) => dirs,
        Err(e) => {
            eprintln!("Error: {}", e);
            return false;
        }
    };

    // Files are independent; only the configuration is shared
    let results: Vec<_> = std::thread::scope(|scope| {
        let handles: Vec<_> = inputs
            .iter()
            .zip(&dirs)
            .map(|(input, dir)| {
                let config = &config;
                scope.spawn(move || (input, render_file(input, config, dir)))
            })
            .collect();
        handles.into_iter().map(|h| h.join()).collect()
    });

    let mut ok = true;
    for result in results {
        match result {
            Ok((input, Ok(pages))) => {
                eprintln!("Wrote {} page(s) for {}", pages, input.display());
            }
            Ok((input, Err(e))) => {
                eprintln!("{}: {}", input.display(), e);
                ok = false;
            }
            Err(_) => {
                eprintln!("Rendering thread panicked");
                ok = false;
            }
        }
    }
    ok
}

fn inspect(input: &Path, beats: u32) -> bool {
    let parsed = fs::read_to_string(input)
        .map_err(SongError::from)
        .and_then(|source| nmn::parse(&source, beats));

    match parsed {
        Ok(parsed) => {
            print!("{}", nmn::format_song(&parsed.song));
            for warning in &parsed.warnings {
                eprintln!("warning: {}", warning);
            }
            true
        }
        Err(e) => {
            eprintln!("{}: {}", input.display(), e);
            false
        }
    }
}

fn main() {
    env_logger::init();
    let args = Args::parse();

    let ok = match &args.command {
        Command::Render {
            inputs,
            config,
            out,
        } => render(inputs, config.as_deref(), out),
        Command::Inspect { input, beats } => inspect(input, *beats),
    };

    if !ok {
        process::exit(1);
    }
}
