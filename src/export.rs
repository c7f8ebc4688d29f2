use calamine::{open_workbook_from_rs, Data, Reader, Xlsx};
use rust_xlsxwriter::Workbook;
use serde::Serialize;
use std::fs;
use std::io::Cursor;
use std::path::Path;

use crate::config::AppConfig;
use crate::models::tag::{Tag, TagChanges, TagFilter, TagForm, MAX_FIELD_LEN};
use crate::store::Store;
use crate::validation::Validation;

pub const SHEET_NAME: &str = "tags";
const HEADER: [&str; 5] = ["ID", "Name", "Created By", "State", "Created At"];

/// Fallback author for imported rows with an empty "Created By" cell.
const IMPORT_AUTHOR: &str = "import";

/// Outcome of a spreadsheet import.
#[derive(Debug, Default, Serialize, PartialEq)]
pub struct ImportSummary {
    pub created: usize,
    pub updated: usize,
    pub skipped: usize,
}

/// Write every live tag matching `filter` to a new workbook under the export
/// directory and return the generated filename.
pub fn export_tags(store: &dyn Store, config: &AppConfig, filter: &TagFilter) -> Result<String, String> {
    let tags = store.tag_list(filter, 0, 0)?;

    let dir = config.export_dir();
    fs::create_dir_all(&dir).map_err(|e| e.to_string())?;

    let filename = export_filename();
    write_workbook(&dir.join(&filename), &tags)?;
    log::info!("Exported {} tags to {}", tags.len(), filename);
    Ok(filename)
}

/// `tags-<unix seconds>-<8 hex chars>.xlsx`
fn export_filename() -> String {
    let uid = uuid::Uuid::new_v4().simple().to_string();
    format!("tags-{}-{}.xlsx", chrono::Utc::now().timestamp(), &uid[..8])
}

pub fn write_workbook(path: &Path, tags: &[Tag]) -> Result<(), String> {
    let mut workbook = Workbook::new();
    let sheet = workbook.add_worksheet();
    sheet.set_name(SHEET_NAME).map_err(|e| e.to_string())?;

    for (col, title) in HEADER.iter().enumerate() {
        sheet
            .write_string(0, col as u16, *title)
            .map_err(|e| e.to_string())?;
    }

    for (i, tag) in tags.iter().enumerate() {
        let row = (i + 1) as u32;
        sheet.write_number(row, 0, tag.id as f64).map_err(|e| e.to_string())?;
        sheet.write_string(row, 1, &tag.name).map_err(|e| e.to_string())?;
        sheet.write_string(row, 2, &tag.created_by).map_err(|e| e.to_string())?;
        sheet.write_number(row, 3, tag.state as f64).map_err(|e| e.to_string())?;
        sheet
            .write_string(row, 4, tag.created_at.format("%Y-%m-%d %H:%M:%S").to_string())
            .map_err(|e| e.to_string())?;
    }

    workbook.save(path).map_err(|e| e.to_string())
}

/// Upsert tags by name from an uploaded workbook. The first worksheet is read,
/// its first row is treated as the header. Columns: id (ignored), name,
/// created-by, state (blank means enabled).
///
/// Rows with a blank name or a state other than 0/1 are skipped. A store
/// failure aborts the import.
pub fn import_tags(store: &dyn Store, bytes: &[u8]) -> Result<ImportSummary, String> {
    let rows = read_rows(bytes)?;
    let mut summary = ImportSummary::default();

    for (row_idx, row) in rows.iter().skip(1) {
        let line = row_idx + 1;

        let name = row.get(1).map(cell_text).unwrap_or_default();
        let name = name.trim();
        if name.is_empty() {
            log::warn!("Tag import: row {} has no name, skipped", line);
            summary.skipped += 1;
            continue;
        }

        let author = row.get(2).map(cell_text).unwrap_or_default();
        let author = match author.trim() {
            "" => IMPORT_AUTHOR.to_string(),
            a => a.to_string(),
        };

        let mut v = Validation::new();
        v.max_size("name", Some(name), MAX_FIELD_LEN)
            .max_size("created_by", Some(author.as_str()), MAX_FIELD_LEN);
        if let Some(err) = v.error() {
            log::warn!("Tag import: row {} {}, skipped", line, err);
            summary.skipped += 1;
            continue;
        }

        let state = match row.get(3) {
            None | Some(Data::Empty) => 1,
            Some(cell) => match cell_int(cell) {
                Some(s @ 0..=1) => s,
                _ => {
                    log::warn!("Tag import: row {} has invalid state {:?}, skipped", line, cell);
                    summary.skipped += 1;
                    continue;
                }
            },
        };

        match store.tag_find_by_name(name)? {
            Some(existing) => {
                store.tag_update(
                    existing.id,
                    &TagChanges {
                        name: None,
                        state: Some(state),
                        modified_by: author,
                    },
                )?;
                summary.updated += 1;
            }
            None => {
                store.tag_create(&TagForm {
                    name: name.to_string(),
                    created_by: author,
                    state,
                })?;
                summary.created += 1;
            }
        }
    }

    log::info!(
        "Tag import finished: {} created, {} updated, {} skipped",
        summary.created,
        summary.updated,
        summary.skipped
    );
    Ok(summary)
}

/// Rows of the first worksheet keyed by absolute row index. Cells are padded
/// so that `row[col]` is sheet column `col` even when leading columns are blank.
fn read_rows(bytes: &[u8]) -> Result<Vec<(u32, Vec<Data>)>, String> {
    let mut workbook: Xlsx<_> = open_workbook_from_rs(Cursor::new(bytes)).map_err(|e: calamine::XlsxError| e.to_string())?;
    let range = workbook
        .worksheet_range_at(0)
        .ok_or_else(|| "workbook has no worksheets".to_string())?
        .map_err(|e| e.to_string())?;
    let (first_row, first_col) = range.start().unwrap_or((0, 0));

    Ok(range
        .rows()
        .enumerate()
        .map(|(i, cells)| {
            let mut row = vec![Data::Empty; first_col as usize];
            row.extend_from_slice(cells);
            (first_row + i as u32, row)
        })
        .collect())
}

fn cell_text(cell: &Data) -> String {
    match cell {
        Data::Empty => String::new(),
        Data::String(s) => s.clone(),
        Data::Int(i) => i.to_string(),
        Data::Float(f) if f.fract() == 0.0 => format!("{}", *f as i64),
        other => other.to_string(),
    }
}

fn cell_int(cell: &Data) -> Option<i64> {
    match cell {
        Data::Int(i) => Some(*i),
        Data::Float(f) if f.fract() == 0.0 => Some(*f as i64),
        Data::String(s) => s.trim().parse().ok(),
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::sqlite::SqliteStore;

    fn seed(store: &SqliteStore, name: &str, state: i64) -> i64 {
        store
            .tag_create(&TagForm {
                name: name.to_string(),
                created_by: "eddy".to_string(),
                state,
            })
            .unwrap()
    }

    fn config_in(dir: &Path) -> AppConfig {
        AppConfig {
            runtime_root_path: format!("{}/", dir.display()),
            ..AppConfig::default()
        }
    }

    #[test]
    fn export_writes_a_uniquely_named_file() {
        let tmp = tempfile::tempdir().unwrap();
        let cfg = config_in(tmp.path());
        let store = SqliteStore::in_memory();
        seed(&store, "go", 1);

        let a = export_tags(&store, &cfg, &TagFilter::default()).unwrap();
        let b = export_tags(&store, &cfg, &TagFilter::default()).unwrap();
        assert_ne!(a, b);
        assert!(a.starts_with("tags-") && a.ends_with(".xlsx"));
        assert!(cfg.export_dir().join(&a).is_file());
    }

    #[test]
    fn export_then_import_round_trip() {
        let tmp = tempfile::tempdir().unwrap();
        let cfg = config_in(tmp.path());

        let source = SqliteStore::in_memory();
        seed(&source, "go", 1);
        seed(&source, "rust", 0);
        seed(&source, "标签", 1);
        let deleted = seed(&source, "gone", 1);
        source.tag_delete(deleted).unwrap();

        let filename = export_tags(&source, &cfg, &TagFilter::default()).unwrap();
        let bytes = fs::read(cfg.export_dir().join(&filename)).unwrap();

        let target = SqliteStore::in_memory();
        let summary = import_tags(&target, &bytes).unwrap();
        assert_eq!(summary, ImportSummary { created: 3, updated: 0, skipped: 0 });

        let pairs = |s: &SqliteStore| {
            s.tag_list(&TagFilter::default(), 0, 0)
                .unwrap()
                .into_iter()
                .map(|t| (t.name, t.state))
                .collect::<Vec<_>>()
        };
        assert_eq!(pairs(&source), pairs(&target));
    }

    #[test]
    fn export_honours_filter() {
        let tmp = tempfile::tempdir().unwrap();
        let cfg = config_in(tmp.path());
        let store = SqliteStore::in_memory();
        seed(&store, "go", 1);
        seed(&store, "rust", 0);

        let filter = TagFilter { name: None, state: Some(0) };
        let filename = export_tags(&store, &cfg, &filter).unwrap();
        let rows = read_rows(&fs::read(cfg.export_dir().join(filename)).unwrap()).unwrap();
        assert_eq!(rows.len(), 2);
        assert_eq!(cell_text(&rows[1].1[1]), "rust");
    }

    #[test]
    fn import_updates_existing_and_skips_bad_rows() {
        let tmp = tempfile::tempdir().unwrap();
        let path = tmp.path().join("upload.xlsx");

        let mut workbook = Workbook::new();
        let sheet = workbook.add_worksheet();
        for (col, title) in HEADER.iter().enumerate() {
            sheet.write_string(0, col as u16, *title).unwrap();
        }
        // existing tag flips to disabled
        sheet.write_string(1, 1, "go").unwrap();
        sheet.write_string(1, 2, "alice").unwrap();
        sheet.write_number(1, 3, 0).unwrap();
        // blank name
        sheet.write_string(2, 2, "bob").unwrap();
        // out-of-range state
        sheet.write_string(3, 1, "zig").unwrap();
        sheet.write_number(3, 3, 5).unwrap();
        // new tag, no author, no state
        sheet.write_string(4, 1, "rust").unwrap();
        // names and authors are capped like the tag form
        sheet.write_string(5, 1, &"n".repeat(MAX_FIELD_LEN + 1)).unwrap();
        sheet.write_string(6, 1, "kotlin").unwrap();
        sheet.write_string(6, 2, &"a".repeat(MAX_FIELD_LEN + 1)).unwrap();
        workbook.save(&path).unwrap();

        let store = SqliteStore::in_memory();
        seed(&store, "go", 1);

        let summary = import_tags(&store, &fs::read(&path).unwrap()).unwrap();
        assert_eq!(summary, ImportSummary { created: 1, updated: 1, skipped: 4 });

        let go = store.tag_find_by_name("go").unwrap().unwrap();
        assert_eq!(go.state, 0);
        assert_eq!(go.modified_by, "alice");

        let rust = store.tag_find_by_name("rust").unwrap().unwrap();
        assert_eq!(rust.state, 1);
        assert_eq!(rust.created_by, IMPORT_AUTHOR);

        assert!(!store.tag_exists_by_name("zig").unwrap());
        assert!(!store.tag_exists_by_name("kotlin").unwrap());
        assert_eq!(store.tag_count(&TagFilter::default()).unwrap(), 2);
    }

    #[test]
    fn import_reads_columns_by_sheet_position() {
        let tmp = tempfile::tempdir().unwrap();
        let path = tmp.path().join("no-ids.xlsx");

        // column A left blank throughout
        let mut workbook = Workbook::new();
        let sheet = workbook.add_worksheet();
        for (col, title) in HEADER.iter().enumerate().skip(1) {
            sheet.write_string(0, col as u16, *title).unwrap();
        }
        sheet.write_string(1, 1, "go").unwrap();
        sheet.write_string(1, 2, "alice").unwrap();
        sheet.write_number(1, 3, 0).unwrap();
        workbook.save(&path).unwrap();

        let store = SqliteStore::in_memory();
        let summary = import_tags(&store, &fs::read(&path).unwrap()).unwrap();
        assert_eq!(summary, ImportSummary { created: 1, updated: 0, skipped: 0 });

        let go = store.tag_find_by_name("go").unwrap().unwrap();
        assert_eq!(go.created_by, "alice");
        assert_eq!(go.state, 0);
    }

    #[test]
    fn import_rejects_non_spreadsheets() {
        let store = SqliteStore::in_memory();
        assert!(import_tags(&store, b"name,state\ngo,1\n").is_err());
    }

    #[test]
    fn cell_conversions() {
        assert_eq!(cell_text(&Data::Float(3.0)), "3");
        assert_eq!(cell_text(&Data::String("go".into())), "go");
        assert_eq!(cell_int(&Data::String(" 1 ".into())), Some(1));
        assert_eq!(cell_int(&Data::Float(0.5)), None);
        assert_eq!(cell_int(&Data::Bool(true)), None);
    }
}
