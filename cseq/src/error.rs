//! Error type returned by the fallible entry points of this crate.

use std::fmt;

/// Everything that can go wrong while building or querying a wavelet index.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Error {
    /// A precondition of the called operation was violated (e.g. a symbol does not fit
    /// the declared alphabet, or the alphabet size is zero).
    PreconditionViolation(&'static str),
    /// A `select` was asked for a rank with not enough matching occurrences of the symbol.
    NotFound,
    /// A backing allocation could not be made (the requested structure would not fit in memory).
    AllocationFailure,
}

impl fmt::Display for Error {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Error::PreconditionViolation(msg) => write!(f, "precondition violated: {msg}"),
            Error::NotFound => write!(f, "no matching element"),
            Error::AllocationFailure => write!(f, "allocation failure"),
        }
    }
}

impl std::error::Error for Error {}

/// Convenience alias for `Result<T, Error>`.
pub type Result<T> = std::result::Result<T, Error>;
