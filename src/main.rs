// Command-line batch driver for the `visual_complexity` engine.
//
// `init` lays out the data directories, `analyze` scores every image it is given and
// writes one `<stem>_metrics.json` record per image (`<file name>_metrics.json` when
// two images share a stem).

use std::path::PathBuf;
use std::process::ExitCode;

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use visual_complexity::parallel_pipeline::{
    BatchConfig, BatchDriver, DEFAULT_INPUT_DIR, DEFAULT_OUTPUT_DIR, bootstrap_directories,
    expand_inputs,
};
use visual_complexity::{AnalyzerConfig, ComplexityAnalyzer, ThresholdPolicy};

/// Extract visual complexity metrics from images.
#[derive(Parser, Debug)]
#[command(name = "visual_complexity")]
#[command(version, about, long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Enable verbose output.
    #[arg(short, long, global = true)]
    verbose: bool,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Create the data/raw, data/processed and data/output directories
    Init {
        /// Project root to create the directories under
        #[arg(long, value_name = "DIR", default_value = ".")]
        root: PathBuf,
    },

    /// Analyze image files and write one metrics record per image
    Analyze {
        /// Image files or directories (defaults to data/raw)
        #[arg(value_name = "INPUT")]
        inputs: Vec<PathBuf>,

        /// Output directory for the JSON records
        #[arg(short, long, value_name = "DIR", default_value = DEFAULT_OUTPUT_DIR)]
        out: PathBuf,

        /// Number of parallel workers (defaults to the number of CPUs)
        #[arg(short = 'j', long, value_name = "N")]
        threads: Option<usize>,

        /// Keep records that already exist instead of recomputing them
        #[arg(long)]
        skip_existing: bool,

        /// Relative spread of the Canny thresholds around the median intensity
        #[arg(long, value_name = "FLOAT", default_value = "0.33")]
        sigma: f64,
    },
}

#[tokio::main]
async fn main() -> ExitCode {
    let cli = Cli::parse();

    let log_level = if cli.verbose { "debug" } else { "info" };
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| format!("visual_complexity={log_level}").into()),
        )
        .with(tracing_subscriber::fmt::layer().with_target(false))
        .init();

    match run(cli.command).await {
        Ok(code) => code,
        Err(err) => {
            tracing::error!("{err:#}");
            ExitCode::FAILURE
        }
    }
}

async fn run(command: Commands) -> Result<ExitCode> {
    match command {
        Commands::Init { root } => {
            let dirs = bootstrap_directories(&root).with_context(|| {
                format!("Failed to create data directories under {}", root.display())
            })?;
            for dir in dirs {
                println!("{}", dir.display());
            }
            Ok(ExitCode::SUCCESS)
        }
        Commands::Analyze {
            inputs,
            out,
            threads,
            skip_existing,
            sigma,
        } => {
            if !(0.0..1.0).contains(&sigma) {
                anyhow::bail!("--sigma must lie in [0, 1), got {sigma}");
            }

            let inputs = if inputs.is_empty() {
                vec![PathBuf::from(DEFAULT_INPUT_DIR)]
            } else {
                inputs
            };
            let images = expand_inputs(&inputs).context("Failed to list input images")?;
            if images.is_empty() {
                anyhow::bail!("No supported image files found");
            }

            std::fs::create_dir_all(&out)
                .with_context(|| format!("Failed to create output directory {}", out.display()))?;

            let analyzer = ComplexityAnalyzer::new(AnalyzerConfig {
                thresholds: ThresholdPolicy::new(sigma),
                ..AnalyzerConfig::default()
            });
            let mut config = BatchConfig {
                output_dir: out,
                skip_existing,
                ..BatchConfig::default()
            };
            if let Some(workers) = threads {
                config.workers = workers;
            }

            let driver = BatchDriver::new(analyzer, config);
            let summary = driver.run(images).await;
            driver.shutdown().await;

            for failure in &summary.failures {
                eprintln!("{}: {}", failure.image.display(), failure.reason);
            }
            println!(
                "Processed {} images ({} written, {} skipped, {} failed)",
                summary.processed() + summary.failures.len(),
                summary.written.len(),
                summary.skipped.len(),
                summary.failures.len()
            );

            if summary.processed() == 0 && !summary.failures.is_empty() {
                Ok(ExitCode::FAILURE)
            } else {
                Ok(ExitCode::SUCCESS)
            }
        }
    }
}
