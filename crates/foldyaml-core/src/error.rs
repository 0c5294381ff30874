//! Error types for the preprocessor.
//!
//! Hard errors (hard failures per the error taxonomy) get their own variant
//! here and bubble all the way to the caller of [`crate::load`]. Soft errors
//! (missing secret, missing include file, malformed `variables`/`vars`
//! shape) never construct an [`Error`] at all — they are logged via the
//! `log` facade at the point of degradation and the pipeline substitutes a
//! graceful fallback (see the `log::warn!` call sites in `secret.rs`,
//! `include.rs`, and `node.rs`).

use std::path::PathBuf;

/// Result type alias for preprocessor operations.
pub type Result<T> = std::result::Result<T, Error>;

#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error("failed to read {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to parse {path}: {source}")]
    Parse {
        path: PathBuf,
        #[source]
        source: yaml_rust2::ScanError,
    },

    #[error("circular inclusion: {path} is already being loaded ({stack:?})")]
    CircularInclusion { path: PathBuf, stack: Vec<PathBuf> },

    #[error("maximum include depth ({max}) exceeded at {path}")]
    MaxDepthExceeded { path: PathBuf, max: usize },

    #[error("variable nesting exceeded {max} rescans while interpolating {raw:?}")]
    VariableNestingTooDeep { raw: String, max: usize },

    #[error("no constructor registered for tag {tag:?} (value {raw:?})")]
    NoConstructorForSubstitutedTag { tag: String, raw: String },

    #[error("{0}")]
    Structural(String),
}

impl Error {
    pub fn io(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        Error::Io { path: path.into(), source }
    }

    pub fn parse(path: impl Into<PathBuf>, source: yaml_rust2::ScanError) -> Self {
        Error::Parse { path: path.into(), source }
    }

    pub fn circular_inclusion(path: impl Into<PathBuf>, stack: &[PathBuf]) -> Self {
        Error::CircularInclusion { path: path.into(), stack: stack.to_vec() }
    }

    pub fn max_depth_exceeded(path: impl Into<PathBuf>, max: usize) -> Self {
        Error::MaxDepthExceeded { path: path.into(), max }
    }

    pub fn variable_nesting_too_deep(raw: impl Into<String>, max: usize) -> Self {
        Error::VariableNestingTooDeep { raw: raw.into(), max }
    }

    pub fn no_constructor(tag: impl Into<String>, raw: impl Into<String>) -> Self {
        Error::NoConstructorForSubstitutedTag { tag: tag.into(), raw: raw.into() }
    }

    pub fn structural(message: impl Into<String>) -> Self {
        Error::Structural(message.into())
    }
}
