//! `run` command: full normalization pipeline

use std::path::PathBuf;

use super::{ConnectionArgs, load_config, open_store, runtime};
use crate::cli::error::CliError;
use crate::cli::output::{OutputFormat, render};
use crate::pipeline::Pipeline;

/// Run command arguments
#[derive(Debug, Clone, Default)]
pub struct RunArgs {
    pub connection: ConnectionArgs,
    /// Directory of raw CSV files
    pub input: Option<PathBuf>,
    /// File pattern override
    pub pattern: Option<String>,
    /// Reuse the existing staging table
    pub skip_ingest: bool,
    pub format: OutputFormat,
}

/// Execute the pipeline and print its report
///
/// A reconciliation mismatch is printed, not returned as an error.
pub fn handle_run(args: &RunArgs) -> Result<(), CliError> {
    println!("{}", run_output(args)?);
    Ok(())
}

/// Execute the pipeline and render its report in the requested format
pub fn run_output(args: &RunArgs) -> Result<String, CliError> {
    let mut config = load_config(&args.connection)?;
    if let Some(pattern) = &args.pattern {
        config.staging.pattern = pattern.clone();
    }

    let input = if args.skip_ingest {
        None
    } else {
        args.input.as_deref()
    };
    if let Some(dir) = input
        && !dir.is_dir()
    {
        return Err(CliError::FileNotFound(dir.to_path_buf()));
    }
    if input.is_none() {
        tracing::info!("Skipping ingest, using staging table {}", config.staging.table);
    }

    let rt = runtime()?;
    let report = rt.block_on(async {
        let store = open_store(&config).await?;
        Pipeline::new(store.as_ref(), &config)
            .run(input)
            .await
            .map_err(CliError::from)
    })?;

    render(&report, args.format)
}
