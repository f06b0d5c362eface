//! Fatal errors. Everything recoverable is reported as a [`crate::model::Diagnostic`].

/// Caller contract violations, detected before any parsing starts.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error("invalid input: {0}")]
    InvalidInput(String),
}

pub type Result<T> = std::result::Result<T, Error>;
