//! CLI binary entry point for nar-normalizer

#[cfg(feature = "cli")]
use clap::{Args, Parser, Subcommand};
#[cfg(feature = "cli")]
use nar_normalizer::cli::commands::{
    ConnectionArgs,
    init::{InitArgs, handle_init},
    run::{RunArgs, handle_run},
    validate::{ValidateArgs, handle_validate},
};
#[cfg(feature = "cli")]
use nar_normalizer::cli::{OutputFormat, logging};
#[cfg(feature = "cli")]
use std::path::PathBuf;

#[cfg(feature = "cli")]
#[derive(Parser)]
#[command(name = "nar-normalizer")]
#[command(about = "Normalize a flat address register extract into dimension and fact tables")]
#[command(version)]
struct Cli {
    /// Log level when RUST_LOG is not set
    #[arg(long, global = true, default_value = "info")]
    log_level: String,

    #[command(subcommand)]
    command: Commands,
}

#[cfg(feature = "cli")]
#[derive(Args, Clone)]
struct StoreOpts {
    /// Configuration file (default: ./nar-normalizer.toml)
    #[arg(short, long)]
    config: Option<PathBuf>,
    /// Database backend (memory, duckdb, postgres)
    #[arg(short, long)]
    backend: Option<String>,
    /// DuckDB file path or PostgreSQL connection string
    #[arg(short, long)]
    database: Option<String>,
    /// Output format (text, json)
    #[arg(short, long, default_value = "text", value_parser = parse_format)]
    format: OutputFormat,
}

#[cfg(feature = "cli")]
impl StoreOpts {
    fn connection(&self) -> ConnectionArgs {
        ConnectionArgs {
            config: self.config.clone(),
            backend: self.backend.clone(),
            database: self.database.clone(),
        }
    }
}

#[cfg(feature = "cli")]
#[derive(Subcommand)]
enum Commands {
    /// Stage raw files and run the full normalization pipeline
    Run {
        /// Directory of raw CSV files
        #[arg(short, long, required_unless_present = "skip_ingest")]
        input: Option<PathBuf>,
        /// File pattern inside the input directory
        #[arg(short, long)]
        pattern: Option<String>,
        /// Reuse the existing staging table instead of loading files
        #[arg(long)]
        skip_ingest: bool,
        #[command(flatten)]
        store: StoreOpts,
    },
    /// Reconcile row counts of existing staging and fact tables
    Validate {
        #[command(flatten)]
        store: StoreOpts,
    },
    /// Write a sample configuration file
    Init {
        /// Directory to write nar-normalizer.toml into
        #[arg(default_value = ".")]
        path: PathBuf,
        /// Overwrite an existing file
        #[arg(short, long)]
        force: bool,
    },
}

#[cfg(feature = "cli")]
fn parse_format(s: &str) -> Result<OutputFormat, String> {
    s.parse()
}

#[cfg(feature = "cli")]
fn main() {
    let cli = Cli::parse();
    logging::init(&cli.log_level);

    let result = match cli.command {
        Commands::Run {
            input,
            pattern,
            skip_ingest,
            store,
        } => {
            let args = RunArgs {
                connection: store.connection(),
                input,
                pattern,
                skip_ingest,
                format: store.format,
            };
            handle_run(&args)
        }
        Commands::Validate { store } => {
            let args = ValidateArgs {
                connection: store.connection(),
                format: store.format,
            };
            handle_validate(&args)
        }
        Commands::Init { path, force } => {
            let args = InitArgs { path, force };
            handle_init(&args).map(|_| ())
        }
    };

    if let Err(e) = result {
        eprintln!("Error: {}", e);
        std::process::exit(1);
    }
}

#[cfg(not(feature = "cli"))]
fn main() {
    eprintln!("CLI feature is not enabled. Build with --features cli");
    std::process::exit(1);
}
