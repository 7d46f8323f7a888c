//! Error types for the SheetCompat core library.
//!
//! Each subsystem has its own error type derived with `thiserror`, and a
//! top-level [`CompatError`] enum unifies them for callers of the legacy
//! wrappers.

use thiserror::Error;

// ---------------------------------------------------------------------------
// Top-level error
// ---------------------------------------------------------------------------

/// Unified error type returned by the legacy (v2-shaped) wrappers.
#[derive(Debug, Error)]
pub enum CompatError {
    /// The legacy API had this feature but the underlying client cannot
    /// represent it.
    #[error("not implemented: {0}")]
    NotImplemented(&'static str),

    /// A legacy option that is no longer supported was passed.
    #[error("the {0} option is no longer supported")]
    UnsupportedOption(&'static str),

    /// No worksheet matched the given index / id.
    #[error("worksheet {0} not found")]
    WorksheetNotFound(String),

    #[error(transparent)]
    Backend(#[from] BackendError),

    #[error(transparent)]
    Header(#[from] HeaderError),

    #[error(transparent)]
    Config(#[from] ConfigError),
}

// ---------------------------------------------------------------------------
// Header mapping errors
// ---------------------------------------------------------------------------

/// Errors from the header mapper. Only raised under the `reject` collision
/// policy; the default policy never fails.
#[derive(Debug, Error)]
pub enum HeaderError {
    /// Two distinct headers normalize to the same key.
    #[error("headers '{first}' and '{second}' both normalize to '{key}'")]
    Collision {
        key: String,
        first: String,
        second: String,
    },
}

// ---------------------------------------------------------------------------
// Backend errors
// ---------------------------------------------------------------------------

/// Errors surfaced by a [`crate::backend::SpreadsheetBackend`] or
/// [`crate::backend::WorksheetBackend`] implementation.
#[derive(Debug, Error)]
pub enum BackendError {
    /// The sheet id is unknown to the backend.
    #[error("sheet {0} not found")]
    SheetNotFound(u64),

    /// The sheet row number does not exist.
    #[error("row {0} not found")]
    RowNotFound(usize),

    /// A cell address lies outside the sheet grid.
    #[error("cell ({row}, {col}) is outside the sheet grid")]
    CellOutOfRange { row: usize, col: usize },

    /// A cell was requested before its range was loaded.
    #[error("cell ({row}, {col}) has not been loaded")]
    CellsNotLoaded { row: usize, col: usize },

    /// Shared sheet state lock was poisoned by a panicking writer.
    #[error("{0} lock poisoned")]
    LockPoisoned(&'static str),

    /// A fixture file could not be read or parsed.
    #[error("fixture error at '{path}': {detail}")]
    Fixture { path: String, detail: String },
}

// ---------------------------------------------------------------------------
// Configuration errors
// ---------------------------------------------------------------------------

/// Errors from configuration loading and validation.
#[derive(Debug, Error)]
pub enum ConfigError {
    /// Config file not found.
    #[error("configuration file not found: {0}")]
    FileNotFound(String),

    /// TOML parse error.
    #[error("configuration parse error: {0}")]
    ParseError(String),

    /// A config value is invalid.
    #[error("invalid configuration value for '{field}': {detail}")]
    InvalidValue { field: String, detail: String },

    /// Generic I/O error reading the config file.
    #[error("configuration I/O error: {0}")]
    IoError(#[from] std::io::Error),
}
