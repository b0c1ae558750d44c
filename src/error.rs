// Copyright (c) 2026-present
// This source code is licensed under both the Apache 2.0 and MIT License
// (found in the LICENSE-* files in the repository)

//! Crate-wide error type.

use std::fmt;

/// Errors produced by this crate.
#[derive(Debug)]
pub enum Error {
    /// An I/O failure while reading or writing a vector stream.
    Io(std::io::Error),

    /// A line of a document-vector stream did not parse.
    InvalidVectorFormat { line: usize, reason: String },

    /// A vector's dimensionality didn't match the stream/tree's configured
    /// dimensionality.
    DimensionMismatch { expected: usize, found: usize },

    /// A bootstrap (TSVQ or KTree) was asked to build a tree over zero
    /// vectors.
    EmptyBootstrap,
}

impl fmt::Display for Error {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Error::Io(e) => write!(f, "I/O error: {e}"),
            Error::InvalidVectorFormat { line, reason } => {
                write!(f, "invalid vector format at line {line}: {reason}")
            }
            Error::DimensionMismatch { expected, found } => {
                write!(f, "dimension mismatch: expected {expected}, found {found}")
            }
            Error::EmptyBootstrap => write!(f, "cannot bootstrap a tree from zero vectors"),
        }
    }
}

impl std::error::Error for Error {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            Error::Io(e) => Some(e),
            _ => None,
        }
    }
}

impl From<std::io::Error> for Error {
    fn from(e: std::io::Error) -> Self {
        Error::Io(e)
    }
}

/// This crate's `Result` alias.
pub type Result<T> = std::result::Result<T, Error>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn dimension_mismatch_formats_both_sizes() {
        let err = Error::DimensionMismatch {
            expected: 4,
            found: 3,
        };
        assert_eq!(err.to_string(), "dimension mismatch: expected 4, found 3");
    }

    #[test]
    fn io_error_wraps_and_exposes_source() {
        use std::error::Error as _;
        let io = std::io::Error::new(std::io::ErrorKind::NotFound, "missing");
        let err: Error = io.into();
        assert!(err.source().is_some());
    }
}
