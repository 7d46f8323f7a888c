//! Legacy row facade.
//!
//! A [`Row`] wraps one [`RowRecord`] and exposes its columns under their
//! normalized names, the way the legacy API did. There are two ways in:
//!
//! - [`Row::field`] / [`Row::set_field`] take the exact normalized key
//!   (one per entry of [`Row::fields`]).
//! - [`Row::get`] / [`Row::set`] take any spelling, normalize it, and fall
//!   back to an ad-hoc field stored on the row when it is not a column.
//!
//! Both paths read and write the same per-column value store.

use std::collections::HashMap;
use std::sync::Arc;

use serde_json::{Map, Value};
use tracing::debug;

use crate::backend::{RowRecord, WorksheetBackend};
use crate::errors::CompatError;
use crate::header::{normalize, HeaderMap, RESERVED_FIELDS};

/// A v2-shaped row backed by a v3 row record.
#[derive(Debug, Clone)]
pub struct Row<S: WorksheetBackend> {
    record: RowRecord,
    sheet: S,
    header_map: Arc<HeaderMap>,
    /// Non-column fields set through [`Row::set`].
    extra: HashMap<String, String>,
}

impl<S: WorksheetBackend> Row<S> {
    pub fn new(record: RowRecord, sheet: S, header_map: Arc<HeaderMap>) -> Self {
        Self {
            record,
            sheet,
            header_map,
            extra: HashMap::new(),
        }
    }

    /// The row id. This is the v3 A1 range, not the legacy feed URL.
    pub fn id(&self) -> &str {
        &self.record.a1_range
    }

    /// Last-edited timestamp; not available from the underlying client.
    pub fn app_edited(&self) -> Result<String, CompatError> {
        Err(CompatError::NotImplemented("app:edited"))
    }

    /// Normalized keys exposed as row fields.
    pub fn fields(&self) -> Vec<&str> {
        self.header_map.project_fields()
    }

    /// Canonical header for a projected field key.
    fn canonical(&self, key: &str) -> Option<&str> {
        if RESERVED_FIELDS.contains(&key) {
            return None;
        }
        self.header_map.get(key)
    }

    /// Value of the column whose normalized key is exactly `key`.
    pub fn field(&self, key: &str) -> Option<&str> {
        let header = self.canonical(key)?;
        self.record.values.get(header).map(String::as_str)
    }

    /// Set the column whose normalized key is exactly `key`. Returns
    /// `false` (and changes nothing) if `key` is not a field.
    pub fn set_field(&mut self, key: &str, value: impl Into<String>) -> bool {
        let Some(header) = self.canonical(key).map(str::to_string) else {
            return false;
        };
        self.record.values.insert(header, value.into());
        true
    }

    /// Read by any spelling of a column name. Other names resolve, by
    /// exact spelling, to the row's `id` or to an ad-hoc field. The
    /// remaining reserved names (`save`, `del`, ...) are methods and never
    /// resolve to a value.
    pub fn get(&self, name: &str) -> Option<&str> {
        let key = normalize(name);
        if self.canonical(&key).is_some() {
            self.field(&key)
        } else if name == "id" {
            Some(self.id())
        } else {
            self.extra.get(name).map(String::as_str)
        }
    }

    /// Write by any spelling of a column name. Names that do not map to a
    /// column are kept as ad-hoc fields on this row only and are never
    /// saved. `id` is read-only.
    pub fn set(&mut self, name: &str, value: impl Into<String>) {
        let key = normalize(name);
        let value = value.into();
        if name == "id" {
            debug!("row id is read-only, ignoring write");
            return;
        }
        if !self.set_field(&key, value.clone()) {
            debug!(name, "no column for field, storing on row");
            self.extra.insert(name.to_string(), value);
        }
    }

    pub fn record(&self) -> &RowRecord {
        &self.record
    }

    pub fn header_map(&self) -> &Arc<HeaderMap> {
        &self.header_map
    }

    /// Write the row's column values back to the sheet.
    pub fn save(&self) -> Result<(), CompatError> {
        self.sheet.save_row(&self.record)?;
        Ok(())
    }

    /// Delete the row from the sheet.
    pub fn del(self) -> Result<(), CompatError> {
        self.sheet.delete_row(self.record.row_number)?;
        Ok(())
    }

    /// Legacy JSON shape: `id` plus one entry per field.
    pub fn to_json(&self) -> Value {
        let mut obj = Map::new();
        obj.insert("id".into(), Value::String(self.id().to_string()));
        for key in self.fields() {
            let value = self
                .field(key)
                .map(|v| Value::String(v.to_string()))
                .unwrap_or(Value::Null);
            obj.insert(key.to_string(), value);
        }
        Value::Object(obj)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::backend::{MemorySheet, MemorySpreadsheet, RowQuery, SpreadsheetBackend};
    use crate::config::CollisionPolicy;

    fn first_row(headers: &[&str], values: &[&str]) -> (MemorySheet, Row<MemorySheet>) {
        let doc = MemorySpreadsheet::new("doc", "T").with_sheet("S", headers, &[values]);
        let sheet = doc.sheets_by_index().remove(0);
        let record = sheet.get_rows(RowQuery::default()).unwrap().remove(0);
        let map = HeaderMap::build(headers, CollisionPolicy::LastWins).unwrap();
        let row = Row::new(record, sheet.clone(), Arc::new(map));
        (sheet, row)
    }

    #[test]
    fn test_field_access_by_normalized_key() {
        let (_, row) = first_row(&["Full Name", "E-mail"], &["Ada", "ada@example.com"]);
        assert_eq!(row.fields(), vec!["fullname", "e-mail"]);
        assert_eq!(row.field("fullname"), Some("Ada"));
        assert_eq!(row.field("e-mail"), Some("ada@example.com"));
        // Only the exact key works on this path.
        assert_eq!(row.field("Full Name"), None);
    }

    #[test]
    fn test_dynamic_access_by_any_spelling() {
        let (_, mut row) = first_row(&["Full Name", "E-mail"], &["Ada", "ada@example.com"]);
        assert_eq!(row.get("Full Name"), Some("Ada"));
        assert_eq!(row.get("FULLNAME"), Some("Ada"));
        assert_eq!(row.get("E-Mail"), Some("ada@example.com"));

        row.set("full name", "Ada Lovelace");
        assert_eq!(row.field("fullname"), Some("Ada Lovelace"));
        assert_eq!(row.record().values["Full Name"], "Ada Lovelace");

        assert!(row.set_field("e-mail", "ada@new.example"));
        assert_eq!(row.get("E MAIL"), None);
        assert_eq!(row.get("e-mail"), Some("ada@new.example"));
    }

    #[test]
    fn test_unknown_names_fall_back_to_ad_hoc_fields() {
        let (_, mut row) = first_row(&["Name"], &["Ada"]);
        assert_eq!(row.get("nickname"), None);

        row.set("Nick Name", "countess");
        assert_eq!(row.get("Nick Name"), Some("countess"));
        // Ad-hoc fields are keyed by the raw name.
        assert_eq!(row.get("nickname"), None);
        assert!(!row.record().values.contains_key("Nick Name"));
        assert!(!row.set_field("nickname", "x"));
    }

    #[test]
    fn test_reserved_header_is_not_a_field() {
        let (_, mut row) = first_row(&["ID", "Name"], &["7", "Ada"]);
        assert_eq!(row.fields(), vec!["name"]);
        assert_eq!(row.field("id"), None);
        assert_eq!(row.id(), "'S'!A2:B2");

        row.set("id", "x");
        assert_eq!(row.record().values["ID"], "7");
        assert_eq!(row.get("id"), Some("'S'!A2:B2"));
    }

    #[test]
    fn test_get_id_reaches_row_id() {
        let (_, mut row) = first_row(&["Name"], &["Ada"]);
        assert_eq!(row.get("id"), Some("'S'!A2:A2"));

        // Only the exact member name; other spellings are ad-hoc fields.
        assert_eq!(row.get("ID"), None);
        row.set("ID", "custom");
        assert_eq!(row.get("ID"), Some("custom"));
        assert_eq!(row.get("id"), Some("'S'!A2:A2"));
        assert_eq!(row.get("save"), None);
    }

    #[test]
    fn test_app_edited_not_implemented() {
        let (_, row) = first_row(&["Name"], &["Ada"]);
        assert!(matches!(
            row.app_edited(),
            Err(CompatError::NotImplemented("app:edited"))
        ));
    }

    #[test]
    fn test_save_and_del() {
        let (sheet, mut row) = first_row(&["Name"], &["Ada"]);
        row.set("NAME", "Grace");
        row.save().unwrap();
        let rows = sheet.get_rows(RowQuery::default()).unwrap();
        assert_eq!(rows[0].values["Name"], "Grace");

        row.del().unwrap();
        assert!(sheet.get_rows(RowQuery::default()).unwrap().is_empty());
    }

    #[test]
    fn test_to_json() {
        let (_, row) = first_row(&["Full Name", "E-mail"], &["Ada", "ada@example.com"]);
        let json = row.to_json();
        assert_eq!(json["id"], "'S'!A2:B2");
        assert_eq!(json["fullname"], "Ada");
        assert_eq!(json["e-mail"], "ada@example.com");
    }
}
