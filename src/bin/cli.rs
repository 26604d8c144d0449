//! CLI application for cascade object detection.
//!
//! Usage:
//!   cascade-detect <image> --cascade face.json          # Human-readable output
//!   cascade-detect <image> --cascade face.json --json   # JSON output
//!   cascade-detect <image> --cascade face.bin -o out.json

use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use cascade_detect::{
    interchange::load_cascade, open_rgba, CascadeClassifier, Detection, Detector, DetectorConfig, FrameBuffers,
    RgbaFrame, Traversal,
};
use clap::Parser;
use log::info;
use serde::Serialize;

#[derive(Parser, Debug)]
#[command(name = "cascade-detect")]
#[command(author, version, about = "Haar cascade object detection", long_about = None)]
struct Args {
    /// Input image file
    #[arg(required = true)]
    image: PathBuf,

    /// Cascade file (.json, .json.bz2, or native .bin)
    #[arg(short, long)]
    cascade: PathBuf,

    /// Detector configuration (YAML)
    #[arg(long)]
    config: Option<PathBuf>,

    /// Output as JSON
    #[arg(short, long)]
    json: bool,

    /// Output file (default: stdout)
    #[arg(short, long)]
    output: Option<PathBuf>,

    /// Scale multiplier between passes
    #[arg(long)]
    scale_factor: Option<f64>,

    /// Smallest scale relative to the cascade window
    #[arg(long)]
    scale_min: Option<f64>,

    /// Minimum group size for averaging
    #[arg(long)]
    min_neighbors: Option<u32>,

    /// Height the image is resampled to before scanning
    #[arg(long, conflicts_with = "full_resolution")]
    working_height: Option<u32>,

    /// Scan at the image's own resolution
    #[arg(long)]
    full_resolution: bool,

    /// Skip windows by edge density
    #[arg(long)]
    edge_pruning: bool,

    /// Stop at the first scale with any detection
    #[arg(long)]
    finest: bool,

    /// Show verbose output
    #[arg(short, long)]
    verbose: bool,
}

/// Output structure for JSON serialization
#[derive(Serialize)]
struct Output {
    image: String,
    width: u32,
    height: u32,
    cascade: String,
    detections: Vec<DetectionOutput>,
}

#[derive(Serialize)]
struct DetectionOutput {
    /// Detection index (1-based)
    index: usize,
    x: i32,
    y: i32,
    width: u32,
    height: u32,
    /// Number of raw windows merged into this detection
    neighbors: u32,
}

fn main() -> Result<()> {
    let args = Args::parse();

    if args.verbose {
        env_logger::init_from_env(env_logger::Env::new().default_filter_or("debug"));
    } else {
        env_logger::init_from_env(env_logger::Env::new().default_filter_or("info"));
    }

    let config = build_config(&args)?;
    let cascade = open_cascade(&args.cascade)?;
    info!(
        "cascade {:?}: {}x{} window, {} stages",
        args.cascade,
        cascade.window_size().0,
        cascade.window_size().1,
        cascade.num_stages()
    );

    let img = open_rgba(&args.image).with_context(|| format!("failed to open image {:?}", args.image))?;
    let (width, height) = img.dimensions();

    let detector = Detector::new(cascade, config)?;
    let mut buffers = FrameBuffers::new();
    let detections = detector.detect(&RgbaFrame::from_image(&img), &mut buffers)?;
    info!("found {} object(s)", detections.len());

    let output = Output {
        image: args.image.display().to_string(),
        width,
        height,
        cascade: args.cascade.display().to_string(),
        detections: detections.iter().enumerate().map(detection_output).collect(),
    };

    let output_str = if args.json {
        serde_json::to_string_pretty(&output)?
    } else {
        format_human_readable(&output)
    };

    if let Some(ref path) = args.output {
        std::fs::write(path, &output_str).with_context(|| format!("failed to write {:?}", path))?;
        info!("output written to {:?}", path);
    } else {
        println!("{}", output_str);
    }

    Ok(())
}

/// Config file values, overridden by any flags given on the command line.
fn build_config(args: &Args) -> Result<DetectorConfig> {
    let mut config = match &args.config {
        Some(path) => {
            info!("loading configuration from {:?}", path);
            DetectorConfig::from_file(path).with_context(|| format!("failed to load config {:?}", path))?
        }
        None => DetectorConfig::default(),
    };

    if let Some(factor) = args.scale_factor {
        config.scale_factor = factor;
    }
    if let Some(min) = args.scale_min {
        config.scale_min = min;
    }
    if let Some(n) = args.min_neighbors {
        config.min_neighbors = n;
    }
    if args.full_resolution {
        config.working_height = None;
    } else if let Some(h) = args.working_height {
        config.working_height = Some(h);
    }
    if args.edge_pruning {
        config.edge_pruning = true;
    }
    if args.finest {
        config.traversal = Traversal::FinestScale;
    }

    config.validate()?;
    Ok(config)
}

fn open_cascade(path: &Path) -> Result<CascadeClassifier> {
    let native = path.extension().is_some_and(|ext| ext == "bin");
    let cascade = if native {
        CascadeClassifier::load(path)
    } else {
        load_cascade(path)
    };
    cascade.with_context(|| format!("failed to load cascade {:?}", path))
}

fn detection_output((i, d): (usize, &Detection)) -> DetectionOutput {
    DetectionOutput {
        index: i + 1,
        x: d.rect.x as i32,
        y: d.rect.y as i32,
        width: d.rect.width as u32,
        height: d.rect.height as u32,
        neighbors: d.neighbors,
    }
}

fn format_human_readable(output: &Output) -> String {
    let mut s = String::new();

    s.push_str(&format!("Image: {} ({}x{})\n", output.image, output.width, output.height));
    s.push_str(&format!("Cascade: {}\n", output.cascade));
    s.push_str(&format!("Objects detected: {}\n", output.detections.len()));

    if output.detections.is_empty() {
        s.push_str("\nNo objects found.\n");
        return s;
    }

    s.push('\n');
    for d in &output.detections {
        s.push_str(&format!(
            "  #{:<3} {}x{} at ({}, {})  neighbors: {}\n",
            d.index, d.width, d.height, d.x, d.y, d.neighbors
        ));
    }

    s
}
