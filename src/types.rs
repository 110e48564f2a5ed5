use std::string::FromUtf8Error;
use thiserror::Error;

/// Serious errors and errors from third-party libraries. Recoverable parse
/// errors never show up here; those go to the error logger with a position.
#[derive(Error, Debug)]
pub enum Error {
    #[error("utf8 error: {0}")]
    Utf8(#[from] FromUtf8Error),
}

/// Result that returns the crate error by default
pub type Result<T> = std::result::Result<T, Error>;
