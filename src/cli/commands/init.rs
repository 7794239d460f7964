//! `init` command: write a starter configuration file

use std::path::PathBuf;

use crate::cli::error::CliError;
use crate::config::{CONFIG_FILENAME, sample_config};

/// Init command arguments
#[derive(Debug, Clone)]
pub struct InitArgs {
    /// Directory receiving the file
    pub path: PathBuf,
    /// Overwrite an existing file
    pub force: bool,
}

/// Write the sample configuration, returning its path
pub fn handle_init(args: &InitArgs) -> Result<PathBuf, CliError> {
    if !args.path.is_dir() {
        return Err(CliError::FileNotFound(args.path.clone()));
    }

    let config_path = args.path.join(CONFIG_FILENAME);
    if config_path.exists() && !args.force {
        return Err(CliError::InvalidArgument(format!(
            "{} already exists. Use --force to overwrite.",
            config_path.display()
        )));
    }

    std::fs::write(&config_path, sample_config())
        .map_err(|e| CliError::FileWriteError(config_path.clone(), e.to_string()))?;

    println!("Wrote {}", config_path.display());
    Ok(config_path)
}
