//! In-memory spreadsheet backend.
//!
//! Sheet state lives behind `Arc<RwLock<_>>` so that every [`MemorySheet`]
//! handle cloned out of a [`MemorySpreadsheet`] sees the same grid. The
//! sheet list is shared the same way, with sheets holding only a weak
//! reference back to it. Nothing is persisted.

use std::collections::HashMap;
use std::sync::{Arc, PoisonError, RwLock, RwLockReadGuard, RwLockWriteGuard, Weak};

use tracing::{debug, info};

use super::{
    a1_sheet_name, column_letter, AuthMode, CellRange, CellRecord, CellValue, RowQuery,
    RowRecord, ServiceAccountCredentials, SpreadsheetBackend, WorksheetBackend,
};
use crate::errors::BackendError;

/// Grid size of a sheet created without explicit dimensions.
pub const DEFAULT_ROW_COUNT: usize = 1000;
pub const DEFAULT_COLUMN_COUNT: usize = 26;

type SheetList = Arc<RwLock<Vec<MemorySheet>>>;

#[derive(Debug, Clone, Default)]
struct StoredCell {
    value: CellValue,
    formula: Option<String>,
}

#[derive(Debug)]
struct SheetData {
    index: usize,
    title: String,
    /// `row_count` rows of `column_count` cells each.
    grid: Vec<Vec<StoredCell>>,
    column_count: usize,
    header_values: Option<Vec<String>>,
    loaded_ranges: Vec<CellRange>,
}

impl SheetData {
    fn new(index: usize, title: String, row_count: usize, column_count: usize) -> Self {
        Self {
            index,
            title,
            grid: vec![vec![StoredCell::default(); column_count]; row_count],
            column_count,
            header_values: None,
            loaded_ranges: Vec::new(),
        }
    }

    fn row_count(&self) -> usize {
        self.grid.len()
    }

    /// First grid row as text, without trailing empty cells.
    fn read_header_row(&self) -> Vec<String> {
        let mut headers: Vec<String> = self
            .grid
            .first()
            .map(|row| row.iter().map(|c| c.value.to_string()).collect())
            .unwrap_or_default();
        while headers.last().is_some_and(|h| h.is_empty()) {
            headers.pop();
        }
        headers
    }

    fn headers(&self) -> Vec<String> {
        self.header_values
            .clone()
            .unwrap_or_else(|| self.read_header_row())
    }

    /// 0-based index of the last data row holding any value, or 0 when the
    /// sheet has no data rows.
    fn last_data_row(&self) -> usize {
        self.grid
            .iter()
            .enumerate()
            .skip(1)
            .rev()
            .find(|(_, row)| row.iter().any(|c| !c.value.is_empty() || c.formula.is_some()))
            .map(|(r, _)| r)
            .unwrap_or(0)
    }

    fn resize(&mut self, row_count: usize, column_count: usize) {
        self.grid.resize_with(row_count, Vec::new);
        for row in &mut self.grid {
            row.resize_with(column_count, StoredCell::default);
        }
        self.column_count = column_count;
    }

    fn row_record(&self, row_index: usize, headers: &[String]) -> RowRecord {
        let row = &self.grid[row_index];
        let values = headers
            .iter()
            .enumerate()
            .filter(|(_, h)| !h.is_empty())
            .map(|(i, h)| {
                let value = row.get(i).map(|c| c.value.to_string()).unwrap_or_default();
                (h.clone(), value)
            })
            .collect();
        let row_number = row_index + 1;
        let last_col = column_letter(headers.len().max(1) - 1);
        RowRecord {
            row_number,
            a1_range: format!(
                "{}!A{}:{}{}",
                a1_sheet_name(&self.title),
                row_number,
                last_col,
                row_number
            ),
            values,
        }
    }

    fn write_row(&mut self, row_index: usize, headers: &[String], values: &HashMap<String, String>) {
        for (i, header) in headers.iter().enumerate() {
            if header.is_empty() || i >= self.column_count {
                continue;
            }
            if let Some(value) = values.get(header) {
                self.grid[row_index][i] = StoredCell {
                    value: CellValue::from_input(value),
                    formula: None,
                };
            }
        }
    }

    fn data_row_index(&self, row_number: usize) -> Result<usize, BackendError> {
        if row_number < 2 || row_number > self.row_count() {
            return Err(BackendError::RowNotFound(row_number));
        }
        Ok(row_number - 1)
    }
}

// ---------------------------------------------------------------------------
// Sheet handle
// ---------------------------------------------------------------------------

/// Shared handle to one in-memory sheet.
#[derive(Debug, Clone)]
pub struct MemorySheet {
    sheet_id: u64,
    data: Arc<RwLock<SheetData>>,
    /// The owning spreadsheet's sheet list.
    siblings: Weak<RwLock<Vec<MemorySheet>>>,
}

impl MemorySheet {
    fn new(sheet_id: u64, data: SheetData, siblings: &SheetList) -> Self {
        Self {
            sheet_id,
            data: Arc::new(RwLock::new(data)),
            siblings: Arc::downgrade(siblings),
        }
    }

    fn read(&self) -> Result<RwLockReadGuard<'_, SheetData>, BackendError> {
        self.data
            .read()
            .map_err(|_| BackendError::LockPoisoned("sheet"))
    }

    fn write(&self) -> Result<RwLockWriteGuard<'_, SheetData>, BackendError> {
        self.data
            .write()
            .map_err(|_| BackendError::LockPoisoned("sheet"))
    }

    /// Write a saved value straight into the grid, growing it if needed.
    pub fn put_value(&self, row: usize, col: usize, value: CellValue) -> Result<(), BackendError> {
        let mut data = self.write()?;
        let rows = data.row_count().max(row + 1);
        let cols = data.column_count.max(col + 1);
        data.resize(rows, cols);
        data.grid[row][col] = StoredCell {
            value,
            formula: None,
        };
        Ok(())
    }
}

impl WorksheetBackend for MemorySheet {
    fn sheet_id(&self) -> u64 {
        self.sheet_id
    }

    fn index(&self) -> Result<usize, BackendError> {
        Ok(self.read()?.index)
    }

    fn title(&self) -> Result<String, BackendError> {
        Ok(self.read()?.title.clone())
    }

    fn row_count(&self) -> Result<usize, BackendError> {
        Ok(self.read()?.row_count())
    }

    fn column_count(&self) -> Result<usize, BackendError> {
        Ok(self.read()?.column_count)
    }

    fn header_values(&self) -> Result<Option<Vec<String>>, BackendError> {
        Ok(self.read()?.header_values.clone())
    }

    fn load_header_row(&self) -> Result<(), BackendError> {
        let mut data = self.write()?;
        let headers = data.read_header_row();
        debug!(sheet_id = self.sheet_id, columns = headers.len(), "loaded header row");
        data.header_values = Some(headers);
        Ok(())
    }

    fn set_header_row(&self, headers: &[String]) -> Result<(), BackendError> {
        let mut data = self.write()?;
        if headers.len() > data.column_count {
            return Err(BackendError::CellOutOfRange {
                row: 0,
                col: headers.len() - 1,
            });
        }
        if data.row_count() == 0 {
            let cols = data.column_count;
            data.resize(1, cols);
        }
        for (i, cell) in data.grid[0].iter_mut().enumerate() {
            *cell = StoredCell {
                value: headers
                    .get(i)
                    .map(|h| CellValue::from_input(h))
                    .unwrap_or_default(),
                formula: None,
            };
        }
        let stored = data.read_header_row();
        data.header_values = Some(stored);
        Ok(())
    }

    fn add_row(&self, values: HashMap<String, String>) -> Result<RowRecord, BackendError> {
        let mut data = self.write()?;
        let headers = data.headers();
        let target = data.last_data_row() + 1;
        if target >= data.row_count() {
            let cols = data.column_count;
            data.resize(target + 1, cols);
        }
        data.write_row(target, &headers, &values);
        debug!(sheet_id = self.sheet_id, row = target + 1, "appended row");
        Ok(data.row_record(target, &headers))
    }

    fn get_rows(&self, query: RowQuery) -> Result<Vec<RowRecord>, BackendError> {
        let data = self.read()?;
        let headers = data.headers();
        let last = data.last_data_row();
        Ok((1..=last)
            .skip(query.offset.unwrap_or(0))
            .take(query.limit.unwrap_or(usize::MAX))
            .map(|r| data.row_record(r, &headers))
            .collect())
    }

    fn save_row(&self, row: &RowRecord) -> Result<(), BackendError> {
        let mut data = self.write()?;
        let row_index = data.data_row_index(row.row_number)?;
        let headers = data.headers();
        data.write_row(row_index, &headers, &row.values);
        Ok(())
    }

    fn delete_row(&self, row_number: usize) -> Result<(), BackendError> {
        let mut data = self.write()?;
        let row_index = data.data_row_index(row_number)?;
        data.grid.remove(row_index);
        Ok(())
    }

    fn load_cells(&self, range: CellRange) -> Result<(), BackendError> {
        let mut data = self.write()?;
        if data.loaded_ranges.iter().any(|r| r.covers(&range)) {
            return Ok(());
        }
        data.loaded_ranges.retain(|r| !range.covers(r));
        data.loaded_ranges.push(range);
        Ok(())
    }

    fn cell(&self, row: usize, col: usize) -> Result<CellRecord, BackendError> {
        let data = self.read()?;
        if row >= data.row_count() || col >= data.column_count {
            return Err(BackendError::CellOutOfRange { row, col });
        }
        if !data.loaded_ranges.iter().any(|r| r.contains(row, col)) {
            return Err(BackendError::CellsNotLoaded { row, col });
        }
        let stored = &data.grid[row][col];
        Ok(CellRecord {
            row_index: row,
            column_index: col,
            value: stored.value.clone(),
            formula: stored.formula.clone(),
            draft: None,
        })
    }

    fn save_cells(&self, cells: &mut [CellRecord]) -> Result<(), BackendError> {
        let mut data = self.write()?;
        // All or nothing: check every target before writing any of them.
        if let Some(cell) = cells.iter().filter(|c| c.has_draft()).find(|c| {
            c.row_index >= data.row_count() || c.column_index >= data.column_count
        }) {
            return Err(BackendError::CellOutOfRange {
                row: cell.row_index,
                col: cell.column_index,
            });
        }

        for cell in cells.iter_mut().filter(|c| c.has_draft()) {
            let (row, col) = (cell.row_index, cell.column_index);
            cell.commit_draft();
            data.grid[row][col] = StoredCell {
                value: cell.value.clone(),
                formula: cell.formula.clone(),
            };
        }
        Ok(())
    }

    fn resize(
        &self,
        row_count: Option<usize>,
        column_count: Option<usize>,
    ) -> Result<(), BackendError> {
        let mut data = self.write()?;
        let rows = row_count.unwrap_or(data.row_count());
        let cols = column_count.unwrap_or(data.column_count);
        data.resize(rows, cols);
        debug!(sheet_id = self.sheet_id, rows, cols, "resized sheet");
        Ok(())
    }

    fn clear(&self) -> Result<(), BackendError> {
        let mut data = self.write()?;
        for row in &mut data.grid {
            row.fill(StoredCell::default());
        }
        data.header_values = None;
        data.loaded_ranges.clear();
        Ok(())
    }

    fn update_title(&self, title: &str) -> Result<(), BackendError> {
        self.write()?.title = title.to_string();
        Ok(())
    }

    fn delete(&self) -> Result<(), BackendError> {
        let sheets = self
            .siblings
            .upgrade()
            .ok_or(BackendError::SheetNotFound(self.sheet_id))?;
        remove_sheet(&sheets, self.sheet_id)?;
        info!(sheet_id = self.sheet_id, "deleted sheet");
        Ok(())
    }
}

// ---------------------------------------------------------------------------
// Spreadsheet
// ---------------------------------------------------------------------------

/// An in-memory spreadsheet document.
#[derive(Debug)]
pub struct MemorySpreadsheet {
    id: String,
    title: String,
    info_loaded: bool,
    sheets: SheetList,
    next_sheet_id: u64,
    auth: Option<AuthMode>,
}

/// Drop a sheet from a sheet list and renumber the rest.
fn remove_sheet(sheets: &RwLock<Vec<MemorySheet>>, sheet_id: u64) -> Result<(), BackendError> {
    let mut sheets = sheets
        .write()
        .map_err(|_| BackendError::LockPoisoned("sheet list"))?;
    let pos = sheets
        .iter()
        .position(|s| s.sheet_id == sheet_id)
        .ok_or(BackendError::SheetNotFound(sheet_id))?;
    sheets.remove(pos);
    for (index, sheet) in sheets.iter().enumerate() {
        sheet.write()?.index = index;
    }
    Ok(())
}

impl MemorySpreadsheet {
    pub fn new(id: impl Into<String>, title: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            title: title.into(),
            info_loaded: false,
            sheets: Arc::new(RwLock::new(Vec::new())),
            next_sheet_id: 0,
            auth: None,
        }
    }

    // A poisoned list is still well-formed: every edit is a single push or
    // remove.
    fn sheet_list(&self) -> RwLockReadGuard<'_, Vec<MemorySheet>> {
        self.sheets.read().unwrap_or_else(PoisonError::into_inner)
    }

    fn sheet_list_mut(&self) -> RwLockWriteGuard<'_, Vec<MemorySheet>> {
        self.sheets.write().unwrap_or_else(PoisonError::into_inner)
    }

    /// Builder-style [`insert_sheet`](Self::insert_sheet) sized to its data.
    pub fn with_sheet(mut self, title: &str, headers: &[&str], rows: &[&[&str]]) -> Self {
        let headers = headers.iter().map(|h| h.to_string()).collect();
        let rows = rows
            .iter()
            .map(|r| r.iter().map(|v| v.to_string()).collect())
            .collect();
        self.insert_sheet(title, headers, rows, None, None);
        self
    }

    /// Add a sheet pre-filled with a header row and data rows. The grid is
    /// at least as large as the data and at least the requested size.
    pub fn insert_sheet(
        &mut self,
        title: &str,
        headers: Vec<String>,
        rows: Vec<Vec<String>>,
        row_count: Option<usize>,
        column_count: Option<usize>,
    ) -> MemorySheet {
        let widest = rows.iter().map(Vec::len).max().unwrap_or(0);
        let cols = headers
            .len()
            .max(widest)
            .max(column_count.unwrap_or(0))
            .max(1);
        let total_rows = (rows.len() + 1).max(row_count.unwrap_or(0));

        let mut sheets = self.sheet_list_mut();
        let mut data = SheetData::new(sheets.len(), title.to_string(), total_rows, cols);
        for (r, row) in std::iter::once(&headers).chain(rows.iter()).enumerate() {
            for (c, value) in row.iter().enumerate() {
                data.grid[r][c].value = CellValue::from_input(value);
            }
        }

        let sheet = MemorySheet::new(self.next_sheet_id, data, &self.sheets);
        sheets.push(sheet.clone());
        drop(sheets);
        self.next_sheet_id += 1;
        sheet
    }

    /// Handle for a sheet by id.
    pub fn sheet(&self, sheet_id: u64) -> Option<MemorySheet> {
        self.sheet_list()
            .iter()
            .find(|s| s.sheet_id == sheet_id)
            .cloned()
    }
}

impl SpreadsheetBackend for MemorySpreadsheet {
    type Sheet = MemorySheet;

    fn spreadsheet_id(&self) -> &str {
        &self.id
    }

    fn title(&self) -> Option<&str> {
        self.info_loaded.then_some(self.title.as_str())
    }

    fn is_info_loaded(&self) -> bool {
        self.info_loaded
    }

    fn load_info(&mut self) -> Result<(), BackendError> {
        debug!(spreadsheet_id = %self.id, sheets = self.sheet_list().len(), "loaded spreadsheet info");
        self.info_loaded = true;
        Ok(())
    }

    fn sheets_by_index(&self) -> Vec<MemorySheet> {
        self.sheet_list().clone()
    }

    fn add_sheet(&mut self, title: Option<&str>) -> Result<MemorySheet, BackendError> {
        let mut sheets = self.sheet_list_mut();
        let title = title
            .map(str::to_string)
            .unwrap_or_else(|| format!("Sheet{}", sheets.len() + 1));
        let data = SheetData::new(sheets.len(), title, DEFAULT_ROW_COUNT, DEFAULT_COLUMN_COUNT);
        let sheet = MemorySheet::new(self.next_sheet_id, data, &self.sheets);
        sheets.push(sheet.clone());
        drop(sheets);
        self.next_sheet_id += 1;
        info!(spreadsheet_id = %self.id, sheet_id = sheet.sheet_id, "added sheet");
        Ok(sheet)
    }

    fn auth_mode(&self) -> Option<AuthMode> {
        self.auth.clone()
    }

    fn use_service_account_auth(
        &mut self,
        creds: &ServiceAccountCredentials,
    ) -> Result<(), BackendError> {
        info!(client_email = %creds.client_email, "using service account auth");
        self.auth = Some(AuthMode::ServiceAccount {
            client_email: creds.client_email.clone(),
        });
        Ok(())
    }
}
