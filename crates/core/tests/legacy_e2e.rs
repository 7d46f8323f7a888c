//! End-to-end tests for the legacy API over a fixture-backed spreadsheet.
//!
//! Each test writes a TOML fixture to a temp dir, loads it into the
//! in-memory backend and drives it only through the public legacy wrappers.

use std::sync::Arc;

use tempfile::TempDir;

use sheetcompat_core::backend::MemorySpreadsheet;
use sheetcompat_core::config::{CollisionPolicy, CompatConfig, MapperConfig};
use sheetcompat_core::errors::{CompatError, HeaderError};
use sheetcompat_core::legacy::{
    AddWorksheetOptions, GetCellsOptions, GetRowsOptions, Spreadsheet, WorksheetTarget,
};
use sheetcompat_core::SpreadsheetFixture;

// ===========================================================================
// Helpers
// ===========================================================================

const CONTACTS: &str = r#"
id = "contacts-1"
title = "Contacts"

[[worksheets]]
title = "People"
headers = ["Full Name", "E-mail", "", "ID"]
rows = [
    ["Ada", "ada@example.com", "", "1"],
    ["Bob", "bob@example.com", "", "2"],
    ["Cy", "", "", "3"],
]

[[worksheets]]
title = "Totals"
headers = ["Item", "Qty"]
rows = [["pens", "4"], ["pads", "2"]]
"#;

fn load(fixture: &str, mapper: MapperConfig) -> (TempDir, Spreadsheet<MemorySpreadsheet>) {
    let dir = TempDir::new().unwrap();
    let path = dir.path().join("fixture.toml");
    std::fs::write(&path, fixture).unwrap();
    let doc = SpreadsheetFixture::load(&path).unwrap().into_spreadsheet();
    (dir, Spreadsheet::with_config(doc, mapper))
}

fn contacts() -> (TempDir, Spreadsheet<MemorySpreadsheet>) {
    load(CONTACTS, MapperConfig::default())
}

fn all_rows() -> GetRowsOptions {
    GetRowsOptions::default()
}

// ===========================================================================
// Rows
// ===========================================================================

#[test]
fn test_rows_expose_normalized_fields() {
    let (_dir, mut doc) = contacts();
    let rows = doc.get_rows(1, &all_rows()).unwrap();
    assert_eq!(rows.len(), 3);

    let ada = &rows[0];
    // "ID" normalizes to a reserved name and is not a field.
    assert_eq!(ada.fields(), vec!["fullname", "e-mail"]);
    assert_eq!(ada.get("Full Name"), Some("Ada"));
    assert_eq!(ada.get("FULLNAME"), Some("Ada"));
    assert_eq!(ada.get("e-mail"), Some("ada@example.com"));

    let json = ada.to_json();
    assert_eq!(json["id"], "'People'!A2:D2");
    assert_eq!(json["fullname"], "Ada");
}

#[test]
fn test_rows_share_one_header_map_until_headers_change() {
    let (_dir, mut doc) = contacts();
    let first = doc.get_rows(1, &all_rows()).unwrap();
    let second = doc.get_rows(1, &all_rows()).unwrap();
    assert!(Arc::ptr_eq(first[0].header_map(), second[2].header_map()));
    assert_eq!(doc.worksheet(1).unwrap().mapper().rebuild_count(), 1);
}

#[test]
fn test_header_rename_rebuilds_map() {
    let (_dir, mut doc) = load(
        "id = \"x\"\n[[worksheets]]\ntitle = \"S\"\nheaders = [\"Name\"]\nrows = [[\"Ada\"]]\n",
        MapperConfig::default(),
    );
    let before = doc.get_rows(1, &all_rows()).unwrap();
    assert_eq!(before[0].fields(), vec!["name"]);

    doc.worksheet(1)
        .unwrap()
        .set_header_row(&["Full Name"])
        .unwrap();

    let after = doc.get_rows(1, &all_rows()).unwrap();
    let map = after[0].header_map();
    assert!(map.contains_key("fullname"));
    assert!(!map.contains_key("name"));
    assert_eq!(after[0].get("full name"), Some("Ada"));
    assert!(!Arc::ptr_eq(before[0].header_map(), map));
}

#[test]
fn test_offset_and_limit_are_one_based() {
    let (_dir, mut doc) = contacts();
    let opts = GetRowsOptions {
        offset: Some(2),
        limit: Some(1),
        ..Default::default()
    };
    let rows = doc.get_rows(1, &opts).unwrap();
    assert_eq!(rows.len(), 1);
    assert_eq!(rows[0].get("fullname"), Some("Bob"));
}

#[test]
fn test_ordering_options_are_rejected() {
    let (_dir, mut doc) = contacts();
    let opts = GetRowsOptions {
        order_by: Some("fullname".into()),
        ..Default::default()
    };
    assert!(matches!(
        doc.get_rows(1, &opts),
        Err(CompatError::UnsupportedOption("orderBy"))
    ));
}

#[test]
fn test_edit_save_and_delete_rows() {
    let (_dir, mut doc) = contacts();
    let mut rows = doc.get_rows(1, &all_rows()).unwrap();

    rows[2].set("E-Mail", "cy@example.com");
    // Unknown names stay on the row and are never written.
    rows[2].set("nickname", "cyborg");
    rows[2].save().unwrap();

    let reread = doc.get_rows(1, &all_rows()).unwrap();
    assert_eq!(reread[2].get("e-mail"), Some("cy@example.com"));
    assert_eq!(reread[2].get("nickname"), None);

    let bob = reread.into_iter().nth(1).unwrap();
    bob.del().unwrap();
    let names: Vec<_> = doc
        .get_rows(1, &all_rows())
        .unwrap()
        .iter()
        .map(|r| r.get("fullname").unwrap_or_default().to_string())
        .collect();
    assert_eq!(names, vec!["Ada", "Cy"]);
}

#[test]
fn test_add_row_translates_and_drops_keys() {
    let (_dir, mut doc) = contacts();
    let row = doc
        .add_row(
            1,
            [
                ("FULLNAME", "Dee"),
                ("e-mail", "dee@example.com"),
                ("favourite colour", "green"),
            ],
        )
        .unwrap();
    assert_eq!(row.id(), "'People'!A5:D5");
    assert_eq!(row.get("full name"), Some("Dee"));
    assert!(!row.record().values.contains_key("favourite colour"));

    let rows = doc.get_rows(1, &all_rows()).unwrap();
    assert_eq!(rows.len(), 4);
    assert_eq!(rows[3].get("E-Mail"), Some("dee@example.com"));
}

// ===========================================================================
// Collision policy
// ===========================================================================

#[test]
fn test_collision_last_wins_by_default() {
    let fixture = "id = \"x\"\n[[worksheets]]\ntitle = \"S\"\nheaders = [\"Email\", \"E Mail\"]\nrows = [[\"a@x\", \"b@x\"]]\n";
    let (_dir, mut doc) = load(fixture, MapperConfig::default());
    let rows = doc.get_rows(1, &all_rows()).unwrap();
    assert_eq!(rows[0].fields(), vec!["email"]);
    assert_eq!(rows[0].get("email"), Some("b@x"));
}

#[test]
fn test_collision_rejected_when_configured() {
    let fixture = "id = \"x\"\n[[worksheets]]\ntitle = \"S\"\nheaders = [\"Email\", \"E Mail\"]\n";
    let mapper = MapperConfig {
        collision_policy: CollisionPolicy::Reject,
    };
    let (_dir, mut doc) = load(fixture, mapper);
    assert!(matches!(
        doc.get_rows(1, &all_rows()),
        Err(CompatError::Header(HeaderError::Collision { .. }))
    ));
}

#[test]
fn test_collision_policy_from_config_file() {
    let dir = TempDir::new().unwrap();
    let path = dir.path().join("sheetcompat.toml");
    std::fs::write(&path, "[mapper]\ncollision_policy = \"warn\"\n").unwrap();

    let config = CompatConfig::load_and_validate(&path).unwrap();
    assert_eq!(config.mapper.collision_policy, CollisionPolicy::Warn);
    assert_eq!(config.logging.level, "warn");
}

// ===========================================================================
// Cells
// ===========================================================================

#[test]
fn test_cells_window_and_bulk_update() {
    let (_dir, mut doc) = load(CONTACTS, MapperConfig::default());
    let opts = GetCellsOptions {
        min_row: Some(2),
        max_row: Some(3),
        min_col: Some(2),
        max_col: Some(2),
        return_empty: false,
    };
    let mut cells = doc.get_cells(2, &opts).unwrap();
    let values: Vec<_> = cells.iter().map(|c| c.value().unwrap_or_default()).collect();
    assert_eq!(values, vec!["4", "2"]);
    // Fixture values load as text.
    assert_eq!(cells[0].numeric_value(), None);
    assert_eq!(cells[0].batch_id(), "R2C2");

    cells[0].set_numeric_value(10.0);
    cells[1].set_formula(Some("=B2*2"));
    let ws = doc.worksheet(2).unwrap();
    ws.bulk_update_cells(&mut cells).unwrap();
    assert!(cells.iter().all(|c| !c.has_draft()));

    let reread = doc.get_cells(2, &opts).unwrap();
    assert_eq!(reread[0].numeric_value(), Some(10.0));
    assert_eq!(reread[1].formula(), Some("=B2*2"));
}

#[test]
fn test_cells_return_empty() {
    let (_dir, mut doc) = contacts();
    let opts = GetCellsOptions {
        min_row: Some(4),
        max_row: Some(4),
        return_empty: true,
        ..Default::default()
    };
    let cells = doc.get_cells(1, &opts).unwrap();
    assert_eq!(cells.len(), 4);
    assert_eq!(cells[1].value().as_deref(), Some(""));
}

// ===========================================================================
// Spreadsheet
// ===========================================================================

#[test]
fn test_info_and_worksheet_management() {
    let (_dir, mut doc) = contacts();
    {
        let info = doc.get_info().unwrap();
        assert_eq!(info.title(), Some("Contacts"));
        assert_eq!(info.worksheets().len(), 2);
        assert!(info.id().ends_with("/contacts-1/private/full"));
    }

    let ws = doc
        .add_worksheet(AddWorksheetOptions {
            title: Some("Log".into()),
            row_count: Some(10),
            col_count: Some(1),
            headers: Some(vec!["When".into(), "What".into()]),
        })
        .unwrap();
    assert_eq!(ws.col_count().unwrap(), 2);
    let log_id = ws.id();

    doc.add_row(3, [("when", "today"), ("WHAT", "tested")]).unwrap();
    let rows = doc.get_rows(3, &all_rows()).unwrap();
    assert_eq!(rows[0].get("what"), Some("tested"));

    doc.remove_worksheet(WorksheetTarget::Position(0)).unwrap();
    doc.remove_worksheet(WorksheetTarget::Id(log_id)).unwrap();
    assert_eq!(doc.worksheets().len(), 1);
    assert_eq!(doc.worksheet(1).unwrap().title().unwrap(), "Totals");

    let json = doc.to_json().unwrap();
    assert_eq!(json["info"]["worksheets"][0]["title"], "Totals");
}

#[test]
fn test_unknown_worksheet_index() {
    let (_dir, mut doc) = contacts();
    assert!(matches!(
        doc.get_cells(5, &GetCellsOptions::default()),
        Err(CompatError::WorksheetNotFound(_))
    ));
}
