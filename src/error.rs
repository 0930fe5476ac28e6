use thiserror::Error;

pub type Result<T> = std::result::Result<T, GravaError>;

/// Errors returned by every fallible operation in the crate.
///
/// `Invalid` reports a broken precondition the library can cheaply detect;
/// `Failed` reports a legitimate denial (full container, empty container,
/// exhausted pool); `Corruption` reports a byte buffer whose recorded
/// structure does not decode. Nothing is caught or retried internally: an
/// operation either succeeds and mutates state, or returns an error and
/// leaves state unchanged.
#[derive(Debug, Error)]
pub enum GravaError {
    #[error("invalid argument: {0}")]
    Invalid(&'static str),
    #[error("operation failed: {0}")]
    Failed(&'static str),
    #[error("corruption: {0}")]
    Corruption(&'static str),
}
