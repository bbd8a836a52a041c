#![forbid(unsafe_code)]
//! Error types for the VSFS checker.
//!
//! Defines `VsfsError` and a `Result<T>` alias used throughout the
//! workspace. These cover *operational* failures only: I/O problems and
//! geometry mismatches that prevent the checker from running at all.
//! Structural inconsistencies inside an image are findings, not errors;
//! they live in the checker's report model.

use thiserror::Error;
use vsfs_types::ParseError;

/// Unified error type for operational failures.
#[derive(Debug, Error)]
pub enum VsfsError {
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("image size {actual} does not match expected size {expected}")]
    ImageSize { actual: u64, expected: u64 },

    #[error("invalid on-disk format: {0}")]
    Format(#[from] ParseError),
}

/// Result alias using `VsfsError`.
pub type Result<T> = std::result::Result<T, VsfsError>;
