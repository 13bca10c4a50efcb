use std::io;

use thiserror::Error;

#[derive(Debug, Error)]
pub enum CliError {
    #[error(transparent)]
    Core(#[from] tally_core::Error),
    #[error(transparent)]
    Io(#[from] io::Error),
    #[error(transparent)]
    Serialization(#[from] serde_json::Error),
    #[error("Invalid id '{0}'")]
    InvalidId(String),
    #[error("No account given; pass --account or set TALLY_ACCOUNT")]
    MissingAccount,
    #[error("Could not determine a data directory; pass --db-path")]
    NoDataDir,
}

pub type Result<T> = std::result::Result<T, CliError>;
