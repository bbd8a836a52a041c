#![forbid(unsafe_code)]

use anyhow::{Context, Result};
use clap::Parser;
use clap::error::ErrorKind;
use std::path::PathBuf;
use vsfs_check::{Mode, run};
use vsfs_image::Image;

#[derive(Parser)]
#[command(name = "vsfsck", about = "Offline consistency checker for VSFS images")]
struct Cli {
    /// Path to the file system image (exactly 262144 bytes).
    image: PathBuf,

    /// Repair inconsistencies in place.
    #[arg(long)]
    fix: bool,

    /// Emit the run report as JSON instead of the diagnostics stream.
    #[arg(long)]
    json: bool,
}

fn main() {
    let cli = match Cli::try_parse() {
        Ok(cli) => cli,
        Err(err)
            if matches!(
                err.kind(),
                ErrorKind::DisplayHelp | ErrorKind::DisplayVersion
            ) =>
        {
            print!("{err}");
            return;
        }
        Err(_) => {
            eprintln!("Usage: vsfsck <image> [--fix] [--json]");
            std::process::exit(1);
        }
    };

    if let Err(error) = run_checker(&cli) {
        eprintln!("error: {error:#}");
        std::process::exit(1);
    }
}

fn run_checker(cli: &Cli) -> Result<()> {
    let mut image = Image::load(&cli.image)
        .with_context(|| format!("failed to load image: {}", cli.image.display()))?;

    let mode = if cli.fix { Mode::Repair } else { Mode::Check };
    let report = run(&mut image, mode);

    if cli.json {
        println!(
            "{}",
            serde_json::to_string_pretty(&report).context("serialize report")?
        );
    } else {
        println!("VSFS Consistency Checker");
        println!("========================");
        println!("File system image: {}", cli.image.display());
        println!("Mode: {mode}");
        print!("{report}");
    }

    // The checks already ran; a failed write-back loses the in-memory
    // repairs but is not an operational failure of the run.
    if cli.fix {
        if let Err(error) = image.flush(&cli.image) {
            eprintln!("error: failed to write repaired image: {error}");
        }
    }

    Ok(())
}
