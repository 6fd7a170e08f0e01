//! Command-line interface for the skewness balancing filter.

use std::path::PathBuf;
use std::time::Instant;

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use indicatif::{ProgressBar, ProgressStyle};
use log::{error, info};

use crate::core::loaders::load_samples;
use crate::processors::{pipeline, statistics::Moments, threshold};
use crate::PipelineConfig;

#[derive(Parser)]
#[command(name = "skewness-balance")]
#[command(about = "Split elevation samples into ground and object points by skewness balancing", version)]
pub struct Cli {
    /// Path to YAML config file
    #[arg(short, long, global = true)]
    config: Option<PathBuf>,

    /// Increase verbosity
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    verbose: u8,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Remove object points and write the remaining ground rows
    Filter {
        /// Input point file (ID in field 0, elevation in field 3)
        input: Option<PathBuf>,
        /// Output file for the ground rows (overwritten)
        output: Option<PathBuf>,
        /// Acceptable distance from zero skewness
        #[arg(short, long)]
        tolerance: Option<f64>,
        /// Also write the removed points as id,elevation CSV
        #[arg(long)]
        objects: Option<PathBuf>,
        /// Run the search without writing any files
        #[arg(long)]
        dry_run: bool,
    },

    /// Print elevation statistics and the split the search would choose
    Stats {
        /// Input point file
        input: Option<PathBuf>,
        /// Acceptable distance from zero skewness
        #[arg(short, long)]
        tolerance: Option<f64>,
    },
}

/// Create a spinner for indeterminate operations
fn create_spinner(message: &str) -> ProgressBar {
    let pb = ProgressBar::new_spinner();
    pb.set_style(
        ProgressStyle::default_spinner()
            .template("{spinner:.green} {msg}")
            .unwrap_or_else(|_| ProgressStyle::default_spinner()),
    );
    pb.set_message(message.to_string());
    pb.enable_steady_tick(std::time::Duration::from_millis(100));
    pb
}

/// Print a summary box
fn print_summary(title: &str, items: &[(&str, String)]) {
    println!();
    println!("╔══════════════════════════════════════════════════════════════╗");
    println!("║ {:<62} ║", title);
    println!("╠══════════════════════════════════════════════════════════════╣");
    for (key, value) in items {
        let display_value = if value.chars().count() > 39 {
            format!("{}...", value.chars().take(36).collect::<String>())
        } else {
            value.clone()
        };
        println!("║ {:<20}: {:<39} ║", key, display_value);
    }
    println!("╚══════════════════════════════════════════════════════════════╝");
    println!();
}

pub fn run() {
    let cli = Cli::parse();

    // Initialize logging based on verbosity (must come first)
    env_logger::Builder::new()
        .filter_level(match cli.verbose {
            0 => log::LevelFilter::Warn,
            1 => log::LevelFilter::Info,
            _ => log::LevelFilter::Debug,
        })
        .format_timestamp_secs()
        .init();

    let config = match load_config(cli.config.as_ref()) {
        Ok(cfg) => cfg,
        Err(e) => {
            error!("{:#}", e);
            std::process::exit(1);
        }
    };

    // Dispatch to subcommands
    let result = match cli.command {
        Commands::Filter { input, output, tolerance, objects, dry_run } => {
            cmd_filter(config, input, output, tolerance, objects, dry_run)
        }
        Commands::Stats { input, tolerance } => cmd_stats(config, input, tolerance),
    };

    if let Err(e) = result {
        error!("{:#}", e);
        std::process::exit(1);
    }
}

fn load_config(path: Option<&PathBuf>) -> Result<PipelineConfig> {
    match path {
        Some(path) => {
            let cfg = PipelineConfig::from_yaml(path)
                .with_context(|| format!("failed to load config from {}", path.display()))?;
            info!("Loaded config from: {}", path.display());
            Ok(cfg)
        }
        None => Ok(PipelineConfig::default()),
    }
}

fn cmd_filter(
    mut config: PipelineConfig,
    input: Option<PathBuf>,
    output: Option<PathBuf>,
    tolerance: Option<f64>,
    objects: Option<PathBuf>,
    dry_run: bool,
) -> Result<()> {
    let start = Instant::now();

    // Explicit flags override the config file
    if let Some(input) = input {
        config.io.input = input;
    }
    if let Some(output) = output {
        config.io.output = output;
    }
    if let Some(tolerance) = tolerance {
        config.search.tolerance = tolerance;
    }
    if objects.is_some() {
        config.io.objects_output = objects;
    }

    if dry_run {
        println!("DRY RUN: No files will be written");
    }
    println!("Input: {}", config.io.input.display());
    println!("Output: {}", config.io.output.display());
    println!("Tolerance: {}", config.search.tolerance);

    let spinner = create_spinner("Searching for the minimal-skewness split...");
    let result = if dry_run {
        pipeline::analyze(&config)
    } else {
        pipeline::run(&config)
    };
    spinner.finish_and_clear();

    let summary = result.with_context(|| format!("filtering {} failed", config.io.input.display()))?;

    let (kept, removed) = match summary.filtered {
        Some(counts) => (counts.kept, counts.removed),
        None => (summary.bound_index, summary.total_rows - summary.bound_index),
    };
    let split = summary
        .split_elevation
        .map_or_else(|| "-".to_string(), |z| z.to_string());

    print_summary(
        if dry_run { "Dry Run Complete" } else { "Ground Filter Complete" },
        &[
            ("Input file", config.io.input.display().to_string()),
            ("Output file", config.io.output.display().to_string()),
            ("Points loaded", summary.total_rows.to_string()),
            ("Initial skewness", format!("{:.6}", summary.initial_skewness)),
            ("Final skewness", format!("{:.6}", summary.final_skewness)),
            ("Split index", summary.bound_index.to_string()),
            ("Split elevation", split),
            ("Iterations", summary.iterations.to_string()),
            ("Points kept", kept.to_string()),
            ("Points removed", removed.to_string()),
            ("Duration", format!("{:.2?}", start.elapsed())),
        ],
    );

    Ok(())
}

fn cmd_stats(mut config: PipelineConfig, input: Option<PathBuf>, tolerance: Option<f64>) -> Result<()> {
    let start = Instant::now();

    if let Some(input) = input {
        config.io.input = input;
    }
    if let Some(tolerance) = tolerance {
        config.search.tolerance = tolerance;
    }
    config.search.validate().context("invalid search settings")?;
    let input = &config.io.input;

    let spinner = create_spinner("Loading samples...");
    let samples = load_samples(input)
        .with_context(|| format!("failed to load {}", input.display()));
    let samples = match samples {
        Ok(set) => set.into_sorted(),
        Err(e) => {
            spinner.finish_and_clear();
            return Err(e);
        }
    };

    spinner.set_message("Computing statistics...");
    let moments = Moments::of(samples.elevations());
    let search = threshold::find_minimal_skewness_index(samples.elevations(), config.search.tolerance);
    spinner.finish_and_clear();

    let moments = moments.context("elevation statistics are undefined")?;
    let search = search.context("threshold search failed")?;

    let elevations = samples.elevations();
    print_summary(
        "Elevation Statistics",
        &[
            ("Input file", input.display().to_string()),
            ("Points", moments.count.to_string()),
            ("Min elevation", elevations[0].to_string()),
            ("Max elevation", elevations[elevations.len() - 1].to_string()),
            ("Mean", format!("{:.6}", moments.mean)),
            ("Std deviation", format!("{:.6}", moments.std_dev)),
            ("Skewness", format!("{:.6}", moments.skewness)),
            ("Split index", search.bound_index.to_string()),
            ("Split elevation", elevations[search.bound_index].to_string()),
            ("Prefix skewness", format!("{:.6}", search.final_skewness)),
            ("Duration", format!("{:.2?}", start.elapsed())),
        ],
    );

    Ok(())
}
