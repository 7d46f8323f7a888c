//! Legacy worksheet wrapper.
//!
//! Owns the [`HeaderMapper`] for its sheet. Every row-level operation first
//! makes sure the header row has been loaded and the header map matches it.

use std::collections::HashMap;
use std::sync::Arc;

use serde_json::{json, Value};
use tracing::{debug, info};

use super::cell::Cell;
use crate::backend::{CellRange, RowQuery, WorksheetBackend};
use crate::config::MapperConfig;
use crate::errors::CompatError;
use crate::header::{HeaderMap, HeaderMapper};
use crate::row::Row;

/// Options for [`Worksheet::get_rows`].
///
/// `order_by`, `reverse` and `query` are accepted only so they can be
/// rejected; the underlying client has no equivalent.
#[derive(Debug, Clone, Default)]
pub struct GetRowsOptions {
    /// 1-based index of the first data row to return.
    pub offset: Option<usize>,
    pub limit: Option<usize>,
    pub order_by: Option<String>,
    pub reverse: bool,
    pub query: Option<String>,
}

/// Options for [`Worksheet::get_cells`]. Bounds are 1-based and
/// inclusive; a missing or zero bound means "edge of the sheet".
#[derive(Debug, Clone, Copy, Default)]
pub struct GetCellsOptions {
    pub min_row: Option<usize>,
    pub max_row: Option<usize>,
    pub min_col: Option<usize>,
    pub max_col: Option<usize>,
    /// Also return cells without a value.
    pub return_empty: bool,
}

/// Options for [`Worksheet::resize`].
#[derive(Debug, Clone, Copy, Default)]
pub struct ResizeOptions {
    pub row_count: Option<usize>,
    pub col_count: Option<usize>,
}

/// A v2-shaped worksheet backed by a v3 sheet handle.
#[derive(Debug)]
pub struct Worksheet<S: WorksheetBackend> {
    sheet: S,
    spreadsheet_id: String,
    mapper: HeaderMapper,
}

fn positive(n: Option<usize>) -> Option<usize> {
    n.filter(|&n| n > 0)
}

impl<S: WorksheetBackend> Worksheet<S> {
    pub fn new(sheet: S, spreadsheet_id: impl Into<String>, config: &MapperConfig) -> Self {
        Self {
            sheet,
            spreadsheet_id: spreadsheet_id.into(),
            mapper: HeaderMapper::from_config(config),
        }
    }

    /// The v3 sheet id (not the legacy `od6`-style id).
    pub fn id(&self) -> u64 {
        self.sheet.sheet_id()
    }

    pub fn title(&self) -> Result<String, CompatError> {
        Ok(self.sheet.title()?)
    }

    pub fn row_count(&self) -> Result<usize, CompatError> {
        Ok(self.sheet.row_count()?)
    }

    pub fn col_count(&self) -> Result<usize, CompatError> {
        Ok(self.sheet.column_count()?)
    }

    /// Legacy worksheet feed URL; not available from the underlying client.
    pub fn url(&self) -> Result<String, CompatError> {
        Err(CompatError::NotImplemented("worksheet url"))
    }

    pub fn sheet(&self) -> &S {
        &self.sheet
    }

    pub fn mapper(&self) -> &HeaderMapper {
        &self.mapper
    }

    /// Current header map snapshot (empty before the first row operation).
    pub fn header_map(&self) -> Arc<HeaderMap> {
        self.mapper.current()
    }

    /// Reload the header row from the sheet and refresh the header map.
    pub fn update_header_row(&mut self) -> Result<Arc<HeaderMap>, CompatError> {
        self.sheet.load_header_row()?;
        self.ensure_columns_loaded()
    }

    /// Load the header row if it never was, then rebuild the header map if
    /// the header row changed.
    pub fn ensure_columns_loaded(&mut self) -> Result<Arc<HeaderMap>, CompatError> {
        let headers = match self.sheet.header_values()? {
            Some(headers) => headers,
            None => {
                self.sheet.load_header_row()?;
                self.sheet.header_values()?.unwrap_or_default()
            }
        };
        Ok(self.mapper.rebuild_if_stale(&headers)?)
    }

    /// Append a row. Keys may use any spelling of a column name; keys that
    /// match no column are dropped.
    pub fn add_row<I, K, V>(&mut self, data: I) -> Result<Row<S>, CompatError>
    where
        I: IntoIterator<Item = (K, V)>,
        K: AsRef<str>,
        V: Into<String>,
    {
        let map = self.ensure_columns_loaded()?;

        let mut values = HashMap::new();
        for (key, value) in data {
            match map.lookup(key.as_ref()) {
                Some(header) => {
                    values.insert(header.to_string(), value.into());
                }
                None => debug!(key = key.as_ref(), "dropping field with no matching column"),
            }
        }

        let record = self.sheet.add_row(values)?;
        Ok(Row::new(record, self.sheet.clone(), map))
    }

    /// Fetch data rows.
    pub fn get_rows(&mut self, opts: &GetRowsOptions) -> Result<Vec<Row<S>>, CompatError> {
        if opts.order_by.is_some() {
            return Err(CompatError::UnsupportedOption("orderBy"));
        }
        if opts.reverse {
            return Err(CompatError::UnsupportedOption("reverse"));
        }
        if opts.query.is_some() {
            return Err(CompatError::UnsupportedOption("query"));
        }

        let map = self.ensure_columns_loaded()?;
        let records = self.sheet.get_rows(RowQuery {
            offset: positive(opts.offset).map(|o| o - 1),
            limit: opts.limit,
        })?;

        Ok(records
            .into_iter()
            .map(|record| Row::new(record, self.sheet.clone(), Arc::clone(&map)))
            .collect())
    }

    /// Fetch cells in an inclusive 1-based window, clamped to the sheet.
    pub fn get_cells(&self, opts: &GetCellsOptions) -> Result<Vec<Cell<S>>, CompatError> {
        let (min_row, max_row) = (positive(opts.min_row), positive(opts.max_row));
        let (min_col, max_col) = (positive(opts.min_col), positive(opts.max_col));

        self.sheet.load_cells(CellRange {
            start_row: min_row.map(|r| r - 1),
            end_row: max_row,
            start_col: min_col.map(|c| c - 1),
            end_col: max_col,
        })?;

        let rows = self.sheet.row_count()?;
        let cols = self.sheet.column_count()?;
        let min_row = min_row.unwrap_or(1);
        let max_row = max_row.filter(|&r| r <= rows).unwrap_or(rows);
        let min_col = min_col.unwrap_or(1);
        let max_col = max_col.filter(|&c| c <= cols).unwrap_or(cols);

        let mut cells = Vec::new();
        for r in min_row..=max_row {
            for c in min_col..=max_col {
                let record = self.sheet.cell(r - 1, c - 1)?;
                if record.value.is_empty() && record.formula.is_none() && !opts.return_empty {
                    continue;
                }
                cells.push(Cell::new(record, self.sheet.clone(), &self.spreadsheet_id));
            }
        }
        Ok(cells)
    }

    /// Save every cell carrying an unsaved edit, in one call. Cells without
    /// edits are left alone.
    pub fn bulk_update_cells(&self, cells: &mut [Cell<S>]) -> Result<(), CompatError> {
        let mut records: Vec<_> = cells
            .iter()
            .filter(|c| c.has_draft())
            .map(|c| c.record().clone())
            .collect();
        if records.is_empty() {
            return Ok(());
        }

        self.sheet.save_cells(&mut records)?;
        for cell in cells.iter_mut().filter(|c| c.has_draft()) {
            cell.record_mut().commit_draft();
        }
        debug!(saved = records.len(), "bulk updated cells");
        Ok(())
    }

    pub fn clear(&self) -> Result<(), CompatError> {
        self.sheet.clear()?;
        Ok(())
    }

    pub fn resize(&self, opts: ResizeOptions) -> Result<(), CompatError> {
        self.sheet.resize(opts.row_count, opts.col_count)?;
        Ok(())
    }

    /// Overwrite the header row. The header map follows on the next row
    /// operation.
    pub fn set_header_row<H: AsRef<str>>(&self, headers: &[H]) -> Result<(), CompatError> {
        let headers: Vec<String> = headers.iter().map(|h| h.as_ref().to_string()).collect();
        self.sheet.set_header_row(&headers)?;
        info!(sheet_id = self.id(), columns = headers.len(), "set header row");
        Ok(())
    }

    /// Delete this worksheet's sheet. The owning spreadsheet drops the
    /// wrapper on its next call.
    pub fn del(&self) -> Result<(), CompatError> {
        self.sheet.delete()?;
        info!(sheet_id = self.id(), "deleted worksheet");
        Ok(())
    }

    pub fn set_title(&self, title: &str) -> Result<(), CompatError> {
        self.sheet.update_title(title)?;
        Ok(())
    }

    pub fn to_json(&self) -> Result<Value, CompatError> {
        Ok(json!({
            "id": self.id(),
            "title": self.title()?,
            "rowCount": self.row_count()?,
            "colCount": self.col_count()?,
        }))
    }
}
