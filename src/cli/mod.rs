//! Command line front end

pub mod commands;
pub mod error;
pub mod logging;
pub mod output;

pub use error::CliError;
pub use output::OutputFormat;
