//! Print a summary of a cascade file and optionally convert it to the native
//! bincode format.
//!
//! Usage:
//!   cascade-inspect haarcascade_frontalface_alt.json.bz2
//!   cascade-inspect haarcascade_frontalface_alt.json --convert face.bin

use std::path::PathBuf;

use anyhow::{Context, Result};
use cascade_detect::{interchange::load_cascade, CascadeClassifier};
use clap::Parser;

#[derive(Parser, Debug)]
#[command(name = "cascade-inspect")]
#[command(author, version, about = "Inspect and convert Haar cascades", long_about = None)]
struct Args {
    /// Cascade file (.json, .json.bz2, or native .bin)
    #[arg(required = true)]
    cascade: PathBuf,

    /// Write the cascade in the native format to this path
    #[arg(long)]
    convert: Option<PathBuf>,

    /// List every stage
    #[arg(short, long)]
    stages: bool,
}

fn main() -> Result<()> {
    let args = Args::parse();
    env_logger::init_from_env(env_logger::Env::new().default_filter_or("info"));

    let native = args.cascade.extension().is_some_and(|ext| ext == "bin");
    let cascade = if native {
        CascadeClassifier::load(&args.cascade)
    } else {
        load_cascade(&args.cascade)
    }
    .with_context(|| format!("failed to load cascade {:?}", args.cascade))?;

    let (w, h) = cascade.window_size();
    println!("Cascade: {}", args.cascade.display());
    println!("  window:   {}x{}", w, h);
    println!("  tilted:   {}", cascade.is_tilted());
    println!("  stages:   {}", cascade.num_stages());
    println!("  stumps:   {}", cascade.num_stumps());
    println!("  features: {}", cascade.num_features());

    if args.stages {
        println!();
        for (i, stage) in cascade.stages().iter().enumerate() {
            let tilted = stage.stumps.iter().filter(|s| s.features.is_tilted()).count();
            println!(
                "  stage {:>2}: threshold {:>9.4}, {:>3} stumps ({} tilted)",
                i,
                stage.threshold,
                stage.stumps.len(),
                tilted
            );
        }
    }

    if let Some(path) = &args.convert {
        cascade
            .save(path)
            .with_context(|| format!("failed to write {:?}", path))?;
        println!("\nWrote native cascade to {}", path.display());
    }

    Ok(())
}
