//! Shared error type for the hvst crates

use thiserror::Error;

pub type Result<T> = std::result::Result<T, Error>;

#[derive(Error, Debug)]
pub enum Error {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// Bootstrap TOML could not be read or parsed
    #[error("Configuration error: {0}")]
    Config(String),

    /// A value supplied by the operator was not understood
    #[error("Invalid input: {0}")]
    InvalidInput(String),

    /// The global tracing subscriber could not be installed
    #[error("Logging setup failed: {0}")]
    Logging(String),
}
