use std::io::{self, Write};
use std::path::{Path, PathBuf};
use std::process::ExitCode;

use anyhow::{Context, Result};
use clap::{CommandFactory, Parser};
use colored::Colorize;
use readpe_core::{ImageReader, RunError};

/// Portable Executable header dump
#[derive(Parser)]
#[command(
    name = "readpe",
    about = "Print the DOS, COFF and section headers of a PE image",
    version,
    author
)]
struct Cli {
    /// Path to PE file
    path: Option<PathBuf>,
}

fn main() -> ExitCode {
    env_logger::init();
    let cli = Cli::parse();

    let Some(path) = cli.path else {
        println!("{}", Cli::command().render_usage());
        return ExitCode::FAILURE;
    };

    match dump(&path) {
        Ok(()) => ExitCode::SUCCESS,
        Err(err) => {
            // Validation diagnostics are already part of the report.
            if let Some(RunError::Validation(v)) = err.downcast_ref::<RunError>() {
                log::debug!("stopped at {:?}", v);
            } else {
                eprintln!("{} {:#}", "error:".red().bold(), err);
            }
            ExitCode::FAILURE
        }
    }
}

fn dump(path: &Path) -> Result<()> {
    let mut image = ImageReader::load(path)?;

    let stdout = io::stdout();
    let mut out = stdout.lock();
    let result = image.run(&mut out);
    out.flush().context("failed to flush stdout")?;
    result?;

    log::info!(
        "{}: {} section(s) decoded",
        image.path.display(),
        image.section_headers().len()
    );
    Ok(())
}
