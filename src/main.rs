use std::fs::File;
use std::io::{self, BufReader, Write};
use std::path::{Path, PathBuf};

use anyhow::Context;
use clap::{Parser, Subcommand};
use horaculo::{
    BatchRequest, ConflictEngine, HoraculoConfig, Kernel, KernelBackend, LoggingYamlConfig,
    run_batch,
};
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(name = "horaculo")]
#[command(version)]
#[command(about = "Semantic conflict detection over labelled embedding batches", long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Analyze a JSON batch (`{"items":[{"source":..,"embedding":[..]}]}`)
    Analyze {
        /// Batch file, or `-` for stdin
        input: String,

        /// YAML configuration file
        #[arg(short, long)]
        config: Option<PathBuf>,

        /// Override the copy threshold
        #[arg(short, long)]
        threshold: Option<f32>,

        /// Spread the per-item loop over all cores
        #[arg(long)]
        parallel: bool,

        /// Force the portable kernel
        #[arg(long)]
        scalar: bool,

        /// Drop near-duplicates before analysis
        #[arg(long)]
        dedupe: bool,

        /// Pretty-print the JSON report
        #[arg(long)]
        pretty: bool,
    },

    /// Load and validate a configuration file
    CheckConfig { path: PathBuf },

    /// Print the kernel backend selected on this machine
    Kernel,
}

fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    match cli.command {
        Commands::Analyze {
            input,
            config,
            threshold,
            parallel,
            scalar,
            dedupe,
            pretty,
        } => {
            let mut cfg = load_config(config.as_deref())?;
            init_tracing(&cfg.logging);

            if let Some(threshold) = threshold {
                cfg.engine = cfg.engine.with_copy_threshold(threshold);
            }
            if parallel {
                cfg.engine = cfg.engine.with_parallel(true);
            }
            if scalar {
                cfg.engine = cfg.engine.with_kernel(KernelBackend::Scalar);
            }

            let engine = ConflictEngine::new(cfg.engine_config())?;
            let request = read_request(&input)?;
            let report = run_batch(&engine, &request, dedupe)?;

            let stdout = io::stdout();
            let mut out = stdout.lock();
            if pretty {
                serde_json::to_writer_pretty(&mut out, &report)?;
            } else {
                serde_json::to_writer(&mut out, &report)?;
            }
            writeln!(out)?;
        }
        Commands::CheckConfig { path } => {
            let cfg = HoraculoConfig::from_file(&path)
                .with_context(|| format!("invalid config {}", path.display()))?;
            ConflictEngine::new(cfg.engine_config())?;
            println!("{}: ok", path.display());
        }
        Commands::Kernel => {
            println!("{}", Kernel::detect().name());
        }
    }

    Ok(())
}

fn load_config(path: Option<&Path>) -> anyhow::Result<HoraculoConfig> {
    match path {
        Some(path) => HoraculoConfig::from_file(path)
            .with_context(|| format!("failed to load config {}", path.display())),
        None => Ok(HoraculoConfig::default()),
    }
}

fn read_request(input: &str) -> anyhow::Result<BatchRequest> {
    if input == "-" {
        return Ok(BatchRequest::from_reader(io::stdin().lock())?);
    }
    let file = File::open(input).with_context(|| format!("failed to open {input}"))?;
    Ok(BatchRequest::from_reader(BufReader::new(file))?)
}

/// Logs go to stderr so stdout carries only the report. `RUST_LOG` wins over
/// the configured level.
fn init_tracing(logging: &LoggingYamlConfig) {
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(&logging.level));
    let builder = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_writer(io::stderr);

    if logging.json {
        builder.json().init();
    } else {
        builder.init();
    }
}
