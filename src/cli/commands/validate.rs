//! `validate` command: reconciliation over existing tables

use super::{ConnectionArgs, load_config, open_store, runtime};
use crate::cli::error::CliError;
use crate::cli::output::{OutputFormat, render};
use crate::pipeline::Pipeline;

/// Validate command arguments
#[derive(Debug, Clone, Default)]
pub struct ValidateArgs {
    pub connection: ConnectionArgs,
    pub format: OutputFormat,
}

pub fn handle_validate(args: &ValidateArgs) -> Result<(), CliError> {
    println!("{}", validate_output(args)?);
    Ok(())
}

/// Reconcile existing tables and render the report
///
/// Mismatched counts are part of the output, not an error.
pub fn validate_output(args: &ValidateArgs) -> Result<String, CliError> {
    let config = load_config(&args.connection)?;

    let rt = runtime()?;
    let report = rt.block_on(async {
        let store = open_store(&config).await?;
        Pipeline::new(store.as_ref(), &config)
            .reconcile()
            .await
            .map_err(CliError::from)
    })?;

    render(&report, args.format)
}
