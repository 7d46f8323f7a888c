//! Legacy spreadsheet wrapper.
//!
//! Worksheets are addressed the legacy way: 1-based indices for row and
//! cell access. The worksheet list is loaded lazily and re-synced after
//! structural changes, reusing existing [`Worksheet`] wrappers so their
//! header maps survive.

use std::collections::HashMap;

use serde_json::{json, Value};
use tracing::{debug, info};

use super::cell::Cell;
use super::worksheet::{GetCellsOptions, GetRowsOptions, ResizeOptions, Worksheet};
use crate::backend::{ServiceAccountCredentials, SpreadsheetBackend, WorksheetBackend};
use crate::config::MapperConfig;
use crate::errors::CompatError;
use crate::row::Row;

/// Options for [`Spreadsheet::add_worksheet`].
#[derive(Debug, Clone, Default)]
pub struct AddWorksheetOptions {
    pub title: Option<String>,
    pub row_count: Option<usize>,
    pub col_count: Option<usize>,
    pub headers: Option<Vec<String>>,
}

/// Which worksheet [`Spreadsheet::remove_worksheet`] should delete.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WorksheetTarget {
    /// By v3 sheet id ([`Worksheet::id`]).
    Id(u64),
    /// By 0-based position in [`Spreadsheet::worksheets`].
    Position(usize),
}

type SheetOf<B> = <B as SpreadsheetBackend>::Sheet;

/// A v2-shaped spreadsheet backed by a v3 document.
pub struct Spreadsheet<B: SpreadsheetBackend> {
    backend: B,
    worksheets: Vec<Worksheet<SheetOf<B>>>,
    mapper_config: MapperConfig,
}

impl<B: SpreadsheetBackend> Spreadsheet<B> {
    pub fn new(backend: B) -> Self {
        Self::with_config(backend, MapperConfig::default())
    }

    pub fn with_config(backend: B, mapper_config: MapperConfig) -> Self {
        Self {
            backend,
            worksheets: Vec::new(),
            mapper_config,
        }
    }

    pub fn backend(&self) -> &B {
        &self.backend
    }

    pub fn id(&self) -> &str {
        self.backend.spreadsheet_id()
    }

    /// Legacy worksheets feed URL, which also served as the v2 info id.
    pub fn url(&self) -> String {
        format!(
            "https://spreadsheets.google.com/feeds/worksheets/{}/private/full",
            self.id()
        )
    }

    /// Worksheets as of the last sync (empty before info is loaded). Any
    /// other call on the spreadsheet re-syncs first.
    pub fn worksheets(&self) -> &[Worksheet<SheetOf<B>>] {
        &self.worksheets
    }

    // -----------------------------------------------------------------------
    // Auth
    // -----------------------------------------------------------------------

    pub fn use_service_account_auth(
        &mut self,
        creds: &ServiceAccountCredentials,
    ) -> Result<(), CompatError> {
        self.backend.use_service_account_auth(creds)?;
        Ok(())
    }

    pub fn is_auth_active(&self) -> bool {
        self.backend.auth_mode().is_some()
    }

    /// Legacy ClientLogin auth; long since removed upstream.
    pub fn set_auth(&mut self, _username: &str, _password: &str) -> Result<(), CompatError> {
        Err(CompatError::NotImplemented(
            "setAuth (deprecated by Google a long time ago)",
        ))
    }

    pub fn set_auth_token(&mut self, _token: &str) -> Result<(), CompatError> {
        Err(CompatError::NotImplemented("setAuthToken"))
    }

    pub fn make_feed_request(&mut self, _url: &str, _method: &str) -> Result<Value, CompatError> {
        Err(CompatError::NotImplemented("makeFeedRequest"))
    }

    // -----------------------------------------------------------------------
    // Info & worksheet list
    // -----------------------------------------------------------------------

    /// Load info on first use, then re-sync the worksheet list so sheets
    /// deleted through [`Worksheet::del`] drop out.
    fn ensure_info_loaded(&mut self) -> Result<(), CompatError> {
        if !self.backend.is_info_loaded() {
            self.backend.load_info()?;
        }
        self.update_worksheets();
        Ok(())
    }

    /// Re-sync the wrapper list with the backend's sheets, keeping existing
    /// wrappers for sheets that are still there.
    fn update_worksheets(&mut self) {
        let mut existing: HashMap<u64, Worksheet<SheetOf<B>>> = self
            .worksheets
            .drain(..)
            .map(|ws| (ws.id(), ws))
            .collect();

        let spreadsheet_id = self.backend.spreadsheet_id().to_string();
        self.worksheets = self
            .backend
            .sheets_by_index()
            .into_iter()
            .map(|sheet| {
                existing
                    .remove(&sheet.sheet_id())
                    .unwrap_or_else(|| Worksheet::new(sheet, &spreadsheet_id, &self.mapper_config))
            })
            .collect();
        debug!(worksheets = self.worksheets.len(), "synced worksheet list");
    }

    /// Spreadsheet info, loading it on first use.
    pub fn get_info(&mut self) -> Result<SpreadsheetInfo<'_, B>, CompatError> {
        self.ensure_info_loaded()?;
        Ok(SpreadsheetInfo { spreadsheet: self })
    }

    /// Worksheet by 1-based index.
    pub fn worksheet(&mut self, index: usize) -> Result<&mut Worksheet<SheetOf<B>>, CompatError> {
        self.ensure_info_loaded()?;
        index
            .checked_sub(1)
            .and_then(|i| self.worksheets.get_mut(i))
            .ok_or_else(|| CompatError::WorksheetNotFound(format!("index {}", index)))
    }

    fn worksheet_by_id(&mut self, sheet_id: u64) -> Option<&mut Worksheet<SheetOf<B>>> {
        self.worksheets.iter_mut().find(|ws| ws.id() == sheet_id)
    }

    // -----------------------------------------------------------------------
    // Worksheet-indexed operations
    // -----------------------------------------------------------------------

    pub fn add_row<I, K, V>(
        &mut self,
        worksheet_index: usize,
        data: I,
    ) -> Result<Row<SheetOf<B>>, CompatError>
    where
        I: IntoIterator<Item = (K, V)>,
        K: AsRef<str>,
        V: Into<String>,
    {
        self.worksheet(worksheet_index)?.add_row(data)
    }

    pub fn get_rows(
        &mut self,
        worksheet_index: usize,
        opts: &GetRowsOptions,
    ) -> Result<Vec<Row<SheetOf<B>>>, CompatError> {
        self.worksheet(worksheet_index)?.get_rows(opts)
    }

    pub fn get_cells(
        &mut self,
        worksheet_index: usize,
        opts: &GetCellsOptions,
    ) -> Result<Vec<Cell<SheetOf<B>>>, CompatError> {
        self.worksheet(worksheet_index)?.get_cells(opts)
    }

    /// Add a worksheet, sizing it and writing its header row if asked.
    ///
    /// A positive `col_count` smaller than the number of headers is widened
    /// to fit them.
    pub fn add_worksheet(
        &mut self,
        opts: AddWorksheetOptions,
    ) -> Result<&mut Worksheet<SheetOf<B>>, CompatError> {
        self.ensure_info_loaded()?;
        let sheet = self.backend.add_sheet(opts.title.as_deref())?;
        let sheet_id = sheet.sheet_id();

        let row_count = opts.row_count.filter(|&n| n > 0);
        let mut col_count = opts.col_count.filter(|&n| n > 0);
        if row_count.is_some() || col_count.is_some() {
            if let (Some(headers), Some(cols)) = (&opts.headers, col_count) {
                if cols < headers.len() {
                    col_count = Some(headers.len());
                }
            }
            sheet.resize(row_count, col_count)?;
        }
        if let Some(headers) = &opts.headers {
            sheet.set_header_row(headers)?;
        }

        self.update_worksheets();
        info!(sheet_id, "added worksheet");
        self.worksheet_by_id(sheet_id)
            .ok_or_else(|| CompatError::WorksheetNotFound(format!("id {}", sheet_id)))
    }

    /// Delete a worksheet and re-sync the list.
    pub fn remove_worksheet(&mut self, target: WorksheetTarget) -> Result<(), CompatError> {
        self.ensure_info_loaded()?;
        let pos = match target {
            WorksheetTarget::Id(id) => self.worksheets.iter().position(|ws| ws.id() == id),
            WorksheetTarget::Position(pos) => (pos < self.worksheets.len()).then_some(pos),
        }
        .ok_or_else(|| CompatError::WorksheetNotFound(format!("{:?}", target)))?;

        let sheet_id = self.worksheets[pos].id();
        self.worksheets[pos].del()?;
        self.update_worksheets();
        info!(sheet_id, "removed worksheet");
        Ok(())
    }

    /// Resize a worksheet by 1-based index.
    pub fn resize_worksheet(
        &mut self,
        worksheet_index: usize,
        opts: ResizeOptions,
    ) -> Result<(), CompatError> {
        self.worksheet(worksheet_index)?.resize(opts)
    }

    pub fn to_json(&self) -> Result<Value, CompatError> {
        let info = SpreadsheetInfo { spreadsheet: self };
        Ok(json!({
            "id": self.id(),
            "info": info.to_json()?,
        }))
    }
}

// ---------------------------------------------------------------------------
// Info view
// ---------------------------------------------------------------------------

/// Legacy `getInfo()` result: a live view over the spreadsheet.
pub struct SpreadsheetInfo<'a, B: SpreadsheetBackend> {
    spreadsheet: &'a Spreadsheet<B>,
}

impl<'a, B: SpreadsheetBackend> SpreadsheetInfo<'a, B> {
    /// The legacy info id, which is the worksheets feed URL.
    pub fn id(&self) -> String {
        self.spreadsheet.url()
    }

    pub fn title(&self) -> Option<&'a str> {
        self.spreadsheet.backend.title()
    }

    pub fn worksheets(&self) -> &'a [Worksheet<SheetOf<B>>] {
        &self.spreadsheet.worksheets
    }

    pub fn author(&self) -> Result<String, CompatError> {
        Err(CompatError::NotImplemented("info author"))
    }

    pub fn updated(&self) -> Result<String, CompatError> {
        Err(CompatError::NotImplemented("info updated"))
    }

    pub fn to_json(&self) -> Result<Value, CompatError> {
        let worksheets = self
            .worksheets()
            .iter()
            .map(Worksheet::to_json)
            .collect::<Result<Vec<_>, _>>()?;
        Ok(json!({
            "id": self.id(),
            "title": self.title(),
            "worksheets": worksheets,
        }))
    }
}
