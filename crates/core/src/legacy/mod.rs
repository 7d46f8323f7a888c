//! v2-shaped wrappers over a [`crate::backend::SpreadsheetBackend`].
//!
//! The wrappers translate names and shapes and fail fast with
//! [`crate::errors::CompatError::NotImplemented`] for legacy features the
//! underlying client cannot provide:
//! 1. **Spreadsheet** -- worksheet list, 1-based worksheet addressing, auth.
//! 2. **Worksheet** -- header mapping, row and cell queries.
//! 3. **Cell** -- 1-based coordinates and legacy value/formula accessors.

pub mod cell;
pub mod spreadsheet;
pub mod worksheet;

pub use cell::Cell;
pub use spreadsheet::{AddWorksheetOptions, Spreadsheet, SpreadsheetInfo, WorksheetTarget};
pub use worksheet::{GetCellsOptions, GetRowsOptions, ResizeOptions, Worksheet};
