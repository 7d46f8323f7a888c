//! The seam to the underlying (v3-style) spreadsheet client.
//!
//! The legacy wrappers only ever talk to a spreadsheet through
//! [`SpreadsheetBackend`] and [`WorksheetBackend`]. Worksheet handles are
//! cheap to clone and share state with the spreadsheet that produced them,
//! so every worksheet operation takes `&self`.
//!
//! [`memory::MemorySpreadsheet`] implements both traits in memory and
//! [`fixture`] loads one from a TOML file.

pub mod fixture;
pub mod memory;

use std::collections::HashMap;
use std::fmt;

use serde::{Deserialize, Serialize};

use crate::errors::BackendError;

pub use fixture::SpreadsheetFixture;
pub use memory::{MemorySheet, MemorySpreadsheet};

// ---------------------------------------------------------------------------
// Records
// ---------------------------------------------------------------------------

/// One data row as the underlying client returns it.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RowRecord {
    /// 1-based row number in the sheet (the header row is row 1).
    pub row_number: usize,
    /// A1 range covering the row, e.g. `'People'!A2:C2`.
    pub a1_range: String,
    /// Cell values keyed by canonical header.
    pub values: HashMap<String, String>,
}

/// A saved cell value.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CellValue {
    #[default]
    Empty,
    Text(String),
    Number(f64),
    Bool(bool),
}

impl CellValue {
    pub fn is_empty(&self) -> bool {
        matches!(self, Self::Empty)
    }

    /// Text for user input: empty input clears the cell.
    pub fn from_input(input: &str) -> Self {
        if input.is_empty() {
            Self::Empty
        } else {
            Self::Text(input.to_string())
        }
    }
}

impl fmt::Display for CellValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Empty => Ok(()),
            Self::Text(s) => f.write_str(s),
            // Whole numbers print without a fractional part.
            Self::Number(n) if n.fract() == 0.0 && n.abs() < 1e15 => write!(f, "{}", *n as i64),
            Self::Number(n) => write!(f, "{}", n),
            Self::Bool(b) => write!(f, "{}", if *b { "TRUE" } else { "FALSE" }),
        }
    }
}

/// An unsaved edit on a cell.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CellDraft {
    Value(CellValue),
    Formula(String),
}

/// One cell as the underlying client returns it.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct CellRecord {
    /// 0-based row index.
    pub row_index: usize,
    /// 0-based column index.
    pub column_index: usize,
    pub value: CellValue,
    pub formula: Option<String>,
    /// Pending edit, applied by [`WorksheetBackend::save_cells`].
    pub draft: Option<CellDraft>,
}

impl CellRecord {
    pub fn new(row_index: usize, column_index: usize) -> Self {
        Self {
            row_index,
            column_index,
            ..Self::default()
        }
    }

    /// A1 address, e.g. `C7`.
    pub fn a1_address(&self) -> String {
        format!("{}{}", column_letter(self.column_index), self.row_index + 1)
    }

    pub fn has_draft(&self) -> bool {
        self.draft.is_some()
    }

    /// Move the draft into the saved value / formula.
    pub fn commit_draft(&mut self) {
        match self.draft.take() {
            Some(CellDraft::Value(value)) => {
                self.value = value;
                self.formula = None;
            }
            Some(CellDraft::Formula(formula)) => {
                self.value = CellValue::Empty;
                self.formula = Some(formula);
            }
            None => {}
        }
    }
}

// ---------------------------------------------------------------------------
// Queries & auth
// ---------------------------------------------------------------------------

/// Data-row window for [`WorksheetBackend::get_rows`].
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct RowQuery {
    /// 0-based number of data rows to skip.
    pub offset: Option<usize>,
    pub limit: Option<usize>,
}

/// Half-open, 0-based cell window for [`WorksheetBackend::load_cells`].
/// Missing bounds extend to the edge of the sheet.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct CellRange {
    pub start_row: Option<usize>,
    pub end_row: Option<usize>,
    pub start_col: Option<usize>,
    pub end_col: Option<usize>,
}

impl CellRange {
    pub fn contains(&self, row: usize, col: usize) -> bool {
        self.start_row.map_or(true, |s| row >= s)
            && self.end_row.map_or(true, |e| row < e)
            && self.start_col.map_or(true, |s| col >= s)
            && self.end_col.map_or(true, |e| col < e)
    }

    /// `true` if every cell of `other` is inside this range.
    pub fn covers(&self, other: &CellRange) -> bool {
        fn start_ok(outer: Option<usize>, inner: Option<usize>) -> bool {
            outer.map_or(true, |o| inner.is_some_and(|i| i >= o))
        }
        fn end_ok(outer: Option<usize>, inner: Option<usize>) -> bool {
            outer.map_or(true, |o| inner.is_some_and(|i| i <= o))
        }
        start_ok(self.start_row, other.start_row)
            && end_ok(self.end_row, other.end_row)
            && start_ok(self.start_col, other.start_col)
            && end_ok(self.end_col, other.end_col)
    }
}

/// Service-account credentials handed through to the backend untouched.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ServiceAccountCredentials {
    pub client_email: String,
    pub private_key: String,
}

/// How the backend is currently authenticated.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AuthMode {
    ServiceAccount { client_email: String },
}

// ---------------------------------------------------------------------------
// Traits
// ---------------------------------------------------------------------------

/// A spreadsheet document in the underlying client.
pub trait SpreadsheetBackend {
    type Sheet: WorksheetBackend;

    fn spreadsheet_id(&self) -> &str;

    /// Document title; `None` until [`load_info`](Self::load_info).
    fn title(&self) -> Option<&str>;

    fn is_info_loaded(&self) -> bool;

    /// Fetch document properties and the sheet list.
    fn load_info(&mut self) -> Result<(), BackendError>;

    /// Handles for every sheet, in tab order.
    fn sheets_by_index(&self) -> Vec<Self::Sheet>;

    fn add_sheet(&mut self, title: Option<&str>) -> Result<Self::Sheet, BackendError>;

    fn auth_mode(&self) -> Option<AuthMode>;

    fn use_service_account_auth(
        &mut self,
        creds: &ServiceAccountCredentials,
    ) -> Result<(), BackendError>;
}

/// A single sheet (tab) in the underlying client.
pub trait WorksheetBackend: Clone {
    fn sheet_id(&self) -> u64;

    /// 0-based tab position.
    fn index(&self) -> Result<usize, BackendError>;

    fn title(&self) -> Result<String, BackendError>;

    fn row_count(&self) -> Result<usize, BackendError>;

    fn column_count(&self) -> Result<usize, BackendError>;

    /// Header row as last loaded; `None` until
    /// [`load_header_row`](Self::load_header_row).
    fn header_values(&self) -> Result<Option<Vec<String>>, BackendError>;

    fn load_header_row(&self) -> Result<(), BackendError>;

    fn set_header_row(&self, headers: &[String]) -> Result<(), BackendError>;

    /// Append a row; `values` is keyed by canonical header.
    fn add_row(&self, values: HashMap<String, String>) -> Result<RowRecord, BackendError>;

    fn get_rows(&self, query: RowQuery) -> Result<Vec<RowRecord>, BackendError>;

    fn save_row(&self, row: &RowRecord) -> Result<(), BackendError>;

    fn delete_row(&self, row_number: usize) -> Result<(), BackendError>;

    fn load_cells(&self, range: CellRange) -> Result<(), BackendError>;

    /// A loaded cell, by 0-based indices.
    fn cell(&self, row: usize, col: usize) -> Result<CellRecord, BackendError>;

    /// Persist the drafts of `cells` and commit them in place.
    fn save_cells(&self, cells: &mut [CellRecord]) -> Result<(), BackendError>;

    fn resize(
        &self,
        row_count: Option<usize>,
        column_count: Option<usize>,
    ) -> Result<(), BackendError>;

    fn clear(&self) -> Result<(), BackendError>;

    fn update_title(&self, title: &str) -> Result<(), BackendError>;

    /// Remove this sheet from its spreadsheet.
    fn delete(&self) -> Result<(), BackendError>;
}

// ---------------------------------------------------------------------------
// Helpers
// ---------------------------------------------------------------------------

/// Spreadsheet column letters for a 0-based column index (`0` -> `A`,
/// `26` -> `AA`).
pub fn column_letter(column_index: usize) -> String {
    let mut n = column_index + 1;
    let mut letters = Vec::new();
    while n > 0 {
        let rem = (n - 1) % 26;
        letters.push(b'A' + rem as u8);
        n = (n - 1) / 26;
    }
    letters.reverse();
    String::from_utf8_lossy(&letters).into_owned()
}

/// Sheet name quoted for use in an A1 range.
pub fn a1_sheet_name(title: &str) -> String {
    format!("'{}'", title.replace('\'', "''"))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_column_letter() {
        assert_eq!(column_letter(0), "A");
        assert_eq!(column_letter(25), "Z");
        assert_eq!(column_letter(26), "AA");
        assert_eq!(column_letter(27), "AB");
        assert_eq!(column_letter(701), "ZZ");
        assert_eq!(column_letter(702), "AAA");
    }

    #[test]
    fn test_a1_sheet_name_escapes_quotes() {
        assert_eq!(a1_sheet_name("People"), "'People'");
        assert_eq!(a1_sheet_name("Bob's"), "'Bob''s'");
    }

    #[test]
    fn test_cell_value_display() {
        assert_eq!(CellValue::Empty.to_string(), "");
        assert_eq!(CellValue::Number(3.0).to_string(), "3");
        assert_eq!(CellValue::Number(2.5).to_string(), "2.5");
        assert_eq!(CellValue::Bool(true).to_string(), "TRUE");
        assert_eq!(CellValue::Text("hi".into()).to_string(), "hi");
    }

    #[test]
    fn test_commit_draft() {
        let mut cell = CellRecord::new(1, 2);
        assert_eq!(cell.a1_address(), "C2");

        cell.draft = Some(CellDraft::Formula("=1+1".into()));
        cell.commit_draft();
        assert_eq!(cell.formula.as_deref(), Some("=1+1"));
        assert!(!cell.has_draft());

        cell.draft = Some(CellDraft::Value(CellValue::Number(4.0)));
        cell.commit_draft();
        assert_eq!(cell.value, CellValue::Number(4.0));
        assert_eq!(cell.formula, None);
    }

    #[test]
    fn test_cell_range_contains() {
        let range = CellRange {
            start_row: Some(1),
            end_row: Some(3),
            start_col: None,
            end_col: Some(2),
        };
        assert!(range.contains(1, 0));
        assert!(range.contains(2, 1));
        assert!(!range.contains(3, 0));
        assert!(!range.contains(0, 0));
        assert!(!range.contains(1, 2));
        assert!(CellRange::default().contains(999, 999));
    }

    #[test]
    fn test_cell_range_covers() {
        let window = CellRange {
            start_row: Some(1),
            end_row: Some(4),
            start_col: None,
            end_col: Some(2),
        };
        let inner = CellRange {
            start_row: Some(2),
            end_row: Some(3),
            start_col: Some(0),
            end_col: Some(1),
        };
        assert!(window.covers(&inner));
        assert!(window.covers(&window));
        assert!(!inner.covers(&window));
        // An open end reaches past any bounded one.
        assert!(!window.covers(&CellRange::default()));
        assert!(CellRange::default().covers(&window));
    }
}
