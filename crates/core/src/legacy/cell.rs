//! Legacy cell wrapper.
//!
//! Coordinates are 1-based. Getters prefer an unsaved draft over the saved
//! state, so a cell reads back what was just set on it.

use serde_json::{json, Value};

use crate::backend::{CellDraft, CellRecord, CellValue, WorksheetBackend};
use crate::errors::CompatError;

/// A v2-shaped cell backed by a v3 cell record.
#[derive(Debug, Clone)]
pub struct Cell<S: WorksheetBackend> {
    record: CellRecord,
    sheet: S,
    spreadsheet_id: String,
}

impl<S: WorksheetBackend> Cell<S> {
    pub fn new(record: CellRecord, sheet: S, spreadsheet_id: impl Into<String>) -> Self {
        Self {
            record,
            sheet,
            spreadsheet_id: spreadsheet_id.into(),
        }
    }

    /// 1-based row.
    pub fn row(&self) -> usize {
        self.record.row_index + 1
    }

    /// 1-based column.
    pub fn col(&self) -> usize {
        self.record.column_index + 1
    }

    /// `R{row}C{col}`.
    pub fn batch_id(&self) -> String {
        format!("R{}C{}", self.row(), self.col())
    }

    /// The cell id. This is the A1 address, not the legacy feed URL.
    pub fn id(&self) -> String {
        self.record.a1_address()
    }

    /// Spreadsheet id.
    pub fn ss(&self) -> &str {
        &self.spreadsheet_id
    }

    /// 1-based position of the worksheet holding this cell.
    pub fn ws_id(&self) -> Result<usize, CompatError> {
        Ok(self.sheet.index()? + 1)
    }

    /// Display value. `None` while a formula edit is pending.
    pub fn value(&self) -> Option<String> {
        match &self.record.draft {
            Some(CellDraft::Formula(_)) => None,
            Some(CellDraft::Value(v)) => Some(v.to_string()),
            None => Some(self.record.value.to_string()),
        }
    }

    /// Set the value as text; an empty string clears the cell.
    pub fn set_value(&mut self, value: &str) {
        self.record.draft = Some(CellDraft::Value(CellValue::from_input(value)));
    }

    /// Formula, as written (A1 notation; never converted to R1C1).
    pub fn formula(&self) -> Option<&str> {
        match &self.record.draft {
            Some(CellDraft::Formula(f)) => Some(f.as_str()),
            Some(CellDraft::Value(_)) => None,
            None => self.record.formula.as_deref(),
        }
    }

    /// Set a formula; `None` clears the cell.
    pub fn set_formula(&mut self, formula: Option<&str>) {
        self.record.draft = Some(match formula {
            Some(f) => CellDraft::Formula(f.to_string()),
            None => CellDraft::Value(CellValue::Empty),
        });
    }

    pub fn numeric_value(&self) -> Option<f64> {
        match &self.record.draft {
            Some(CellDraft::Value(CellValue::Number(n))) => Some(*n),
            Some(_) => None,
            None => match self.record.value {
                CellValue::Number(n) => Some(n),
                _ => None,
            },
        }
    }

    pub fn set_numeric_value(&mut self, value: f64) {
        self.record.draft = Some(CellDraft::Value(CellValue::Number(value)));
    }

    /// What a save would write: the formula if there is one, else the value.
    pub fn value_for_save(&self) -> Option<String> {
        match self.formula() {
            Some(f) => Some(f.to_string()),
            None => self.value(),
        }
    }

    pub fn has_draft(&self) -> bool {
        self.record.has_draft()
    }

    pub fn record(&self) -> &CellRecord {
        &self.record
    }

    pub(crate) fn record_mut(&mut self) -> &mut CellRecord {
        &mut self.record
    }

    /// Persist any pending edit.
    pub fn save(&mut self) -> Result<(), CompatError> {
        self.sheet
            .save_cells(std::slice::from_mut(&mut self.record))?;
        Ok(())
    }

    pub fn set_value_and_save(&mut self, value: &str) -> Result<(), CompatError> {
        self.set_value(value);
        self.save()
    }

    /// Clear the cell and save.
    pub fn del(&mut self) -> Result<(), CompatError> {
        self.set_value_and_save("")
    }

    pub fn to_json(&self) -> Result<Value, CompatError> {
        Ok(json!({
            "id": self.id(),
            "row": self.row(),
            "col": self.col(),
            "value": self.value(),
            "formula": self.formula(),
            "numericValue": self.numeric_value(),
            "valueForSave": self.value_for_save(),
            "ss": self.ss(),
            "ws_id": self.ws_id()?,
        }))
    }
}
