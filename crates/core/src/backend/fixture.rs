//! TOML fixture reader for the in-memory backend.
//!
//! The fixture format:
//!
//! ```toml
//! id = "abc123"
//! title = "Contacts"
//!
//! [[worksheets]]
//! title = "People"
//! headers = ["Full Name", "E-mail"]
//! rows = [["Ada", "ada@example.com"]]
//! ```

use std::path::Path;

use serde::{Deserialize, Serialize};
use tracing::{debug, info};

use super::memory::MemorySpreadsheet;
use crate::errors::BackendError;

/// One worksheet in a fixture file.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WorksheetFixture {
    pub title: String,
    #[serde(default)]
    pub headers: Vec<String>,
    #[serde(default)]
    pub rows: Vec<Vec<String>>,
    /// Minimum grid height; defaults to the data size.
    #[serde(default)]
    pub row_count: Option<usize>,
    /// Minimum grid width; defaults to the data size.
    #[serde(default)]
    pub column_count: Option<usize>,
}

/// A whole spreadsheet document in a fixture file.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SpreadsheetFixture {
    pub id: String,
    #[serde(default)]
    pub title: String,
    #[serde(default)]
    pub worksheets: Vec<WorksheetFixture>,
}

impl SpreadsheetFixture {
    /// Load and parse a fixture file.
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self, BackendError> {
        let path = path.as_ref();
        info!(path = %path.display(), "loading spreadsheet fixture");

        let fixture_error = |detail: String| BackendError::Fixture {
            path: path.display().to_string(),
            detail,
        };

        let contents = std::fs::read_to_string(path).map_err(|e| fixture_error(e.to_string()))?;
        let fixture: SpreadsheetFixture =
            toml::from_str(&contents).map_err(|e| fixture_error(e.to_string()))?;

        debug!(worksheets = fixture.worksheets.len(), "parsed spreadsheet fixture");
        Ok(fixture)
    }

    /// Build an in-memory spreadsheet holding the fixture's data.
    pub fn into_spreadsheet(self) -> MemorySpreadsheet {
        let mut doc = MemorySpreadsheet::new(self.id, self.title);
        for ws in self.worksheets {
            doc.insert_sheet(&ws.title, ws.headers, ws.rows, ws.row_count, ws.column_count);
        }
        doc
    }
}
