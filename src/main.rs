use std::path::PathBuf;
use std::time::Instant;

use anyhow::Context;
use clap::Parser;

use particle_inspect_lib::{load_image, run_and_save, Config, OutputOptions};

/// Command-line arguments
#[derive(Parser, Debug)]
#[clap(author, version, about = "Particle inspection - scale calibration, segmentation and defect depth")]
struct Args {
    /// Path to the input image
    #[clap(short, long)]
    input: PathBuf,

    /// Path to output directory
    #[clap(short, long, default_value = "output")]
    output: PathBuf,

    /// Path to configuration file (defaults are used when absent)
    #[clap(short, long)]
    config: Option<PathBuf>,

    /// Physical length represented by the scale bar (overwrites config)
    #[clap(short = 'l', long)]
    scale_length: Option<f64>,

    /// Physical unit name used in reports (overwrites config)
    #[clap(short, long)]
    unit: Option<String>,

    /// Also write a JSON report
    #[clap(long)]
    json: bool,

    /// Enable debug mode (save intermediate images and log more detail)
    #[clap(short, long)]
    debug: bool,

    /// Write the effective configuration to this file and continue
    #[clap(long)]
    write_config: Option<PathBuf>,
}

fn main() -> anyhow::Result<()> {
    let args = Args::parse();

    let default_filter = if args.debug { "debug" } else { "info" };
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or(default_filter)).init();

    // Load configuration
    let mut config = match &args.config {
        Some(path) => Config::from_file(path)
            .with_context(|| format!("loading configuration from {}", path.display()))?,
        None => Config::default(),
    };

    // Override config with command-line arguments
    if let Some(length) = args.scale_length {
        config.scale_bar_length = length;
    }
    if let Some(unit) = args.unit.clone() {
        config.physical_unit = unit;
    }

    config.validate().context("invalid configuration")?;

    if let Some(path) = &args.write_config {
        config
            .save_to_file(path)
            .with_context(|| format!("writing configuration to {}", path.display()))?;
    }

    let start_time = Instant::now();

    let input_image = load_image(&args.input)
        .with_context(|| format!("loading image {}", args.input.display()))?;

    let options = OutputOptions {
        write_json: args.json,
        save_debug_images: args.debug,
    };
    let (report, artifacts) = run_and_save(&input_image, &config, &args.output, options)
        .with_context(|| format!("processing {}", args.input.display()))?;

    println!("--- Particle Analysis: {} ---", report.filename);
    for line in report.summary_lines() {
        println!("{}", line);
    }

    println!("Annotated image: {}", artifacts.annotated_image.display());
    println!("Particle table: {}", artifacts.particle_csv.display());
    if let Some(json) = &artifacts.json_report {
        println!("JSON report: {}", json.display());
    }

    let elapsed = start_time.elapsed();
    println!("Processing completed in {:.2} seconds", elapsed.as_secs_f64());

    Ok(())
}
