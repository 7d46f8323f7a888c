//! SheetCompat core library.
//!
//! Exposes a legacy (v2-shaped) spreadsheet API on top of a newer (v3)
//! spreadsheet client: header-name normalization and mapping, the row
//! facade, worksheet/cell/spreadsheet wrappers, and an in-memory backend
//! for offline use and tests.

pub mod backend;
pub mod config;
pub mod errors;
pub mod header;
pub mod legacy;
pub mod row;

// Re-exports for convenience.
pub use backend::{MemorySpreadsheet, SpreadsheetFixture};
pub use config::CompatConfig;
pub use errors::CompatError;
pub use header::{normalize, HeaderMap, HeaderMapper};
pub use legacy::{Spreadsheet, Worksheet};
pub use row::Row;
