//! Error types for the password hashing toolkit.

use std::fmt;

/// Errors produced by the codecs, primitive engines and hash schemes.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Error {
    /// Text does not match the grammar of a scheme or codec.
    Format(String),
    /// A numeric parameter is outside the valid range of a primitive.
    Domain(String),
    /// A transposition offset list is internally inconsistent.
    Structural(String),
    /// The OS random generator could not be read.
    Random,
    /// An accelerated backend failed while computing a hash.
    Backend(String),
}

impl fmt::Display for Error {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Error::Format(msg) => write!(f, "invalid format: {msg}"),
            Error::Domain(msg) => write!(f, "value out of range: {msg}"),
            Error::Structural(msg) => write!(f, "inconsistent offsets: {msg}"),
            Error::Random => write!(f, "OS random generator unavailable"),
            Error::Backend(msg) => write!(f, "backend failure: {msg}"),
        }
    }
}

impl std::error::Error for Error {}
