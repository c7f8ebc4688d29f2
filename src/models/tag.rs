use chrono::NaiveDateTime;
use rusqlite::{params, OptionalExtension, Row};
use serde::{Deserialize, Serialize};

use super::{now, page_window, Changes, Conditions};
use crate::db::DbPool;

/// Longest accepted name or author, in characters.
pub const MAX_FIELD_LEN: usize = 100;

#[derive(Debug, Serialize, Deserialize, Clone, PartialEq)]
pub struct Tag {
    pub id: i64,
    pub name: String,
    pub created_by: String,
    pub modified_by: String,
    pub state: i64,
    pub created_at: NaiveDateTime,
    pub updated_at: NaiveDateTime,
    pub deleted_at: Option<NaiveDateTime>,
}

/// Fields for a new tag.
#[derive(Debug, Clone)]
pub struct TagForm {
    pub name: String,
    pub created_by: String,
    pub state: i64,
}

/// Partial update. `None` leaves the column untouched; `modified_by` and the
/// modification timestamp are always written.
#[derive(Debug, Clone, Default)]
pub struct TagChanges {
    pub name: Option<String>,
    pub state: Option<i64>,
    pub modified_by: String,
}

/// Equality filters for listing and counting.
#[derive(Debug, Clone, Default)]
pub struct TagFilter {
    pub name: Option<String>,
    pub state: Option<i64>,
}

impl TagFilter {
    fn conditions(&self, scoped: bool) -> Conditions {
        let mut c = Conditions::default();
        if scoped {
            c.raw("deleted_at IS NULL");
        }
        if let Some(ref name) = self.name {
            c.push("name", name.clone());
        }
        if let Some(state) = self.state {
            c.push("state", state);
        }
        c
    }
}

impl Tag {
    pub(crate) fn from_row(row: &Row) -> rusqlite::Result<Self> {
        Ok(Tag {
            id: row.get("id")?,
            name: row.get("name")?,
            created_by: row.get("created_by")?,
            modified_by: row.get("modified_by")?,
            state: row.get("state")?,
            created_at: row.get("created_at")?,
            updated_at: row.get("updated_at")?,
            deleted_at: row.get("deleted_at")?,
        })
    }

    pub fn exists_by_name(pool: &DbPool, name: &str) -> Result<bool, String> {
        let conn = pool.get().map_err(|e| e.to_string())?;
        conn.query_row(
            "SELECT EXISTS(SELECT 1 FROM tags WHERE name = ?1 AND deleted_at IS NULL)",
            params![name],
            |row| row.get(0),
        )
        .map_err(|e| e.to_string())
    }

    pub fn exists_by_id(pool: &DbPool, id: i64) -> Result<bool, String> {
        let conn = pool.get().map_err(|e| e.to_string())?;
        conn.query_row(
            "SELECT EXISTS(SELECT 1 FROM tags WHERE id = ?1 AND deleted_at IS NULL)",
            params![id],
            |row| row.get(0),
        )
        .map_err(|e| e.to_string())
    }

    pub fn find_by_id(pool: &DbPool, id: i64) -> Result<Option<Self>, String> {
        let conn = pool.get().map_err(|e| e.to_string())?;
        conn.query_row(
            "SELECT * FROM tags WHERE id = ?1 AND deleted_at IS NULL",
            params![id],
            Self::from_row,
        )
        .optional()
        .map_err(|e| e.to_string())
    }

    pub fn find_by_name(pool: &DbPool, name: &str) -> Result<Option<Self>, String> {
        let conn = pool.get().map_err(|e| e.to_string())?;
        conn.query_row(
            "SELECT * FROM tags WHERE name = ?1 AND deleted_at IS NULL",
            params![name],
            Self::from_row,
        )
        .optional()
        .map_err(|e| e.to_string())
    }

    /// Live tags matching `filter`, one page at a time.
    pub fn list(pool: &DbPool, filter: &TagFilter, page: i64, page_size: i64) -> Result<Vec<Self>, String> {
        Self::select(pool, filter, true, page_window(page, page_size))
    }

    /// Every matching row, soft-deleted ones included.
    pub fn list_unscoped(pool: &DbPool, filter: &TagFilter) -> Result<Vec<Self>, String> {
        Self::select(pool, filter, false, None)
    }

    fn select(
        pool: &DbPool,
        filter: &TagFilter,
        scoped: bool,
        window: Option<(i64, i64)>,
    ) -> Result<Vec<Self>, String> {
        let conn = pool.get().map_err(|e| e.to_string())?;
        let mut cond = filter.conditions(scoped);
        let mut sql = format!("SELECT * FROM tags{} ORDER BY id", cond.sql());
        cond.paginate(&mut sql, window);

        let mut stmt = conn.prepare(&sql).map_err(|e| e.to_string())?;
        let rows = stmt
            .query_map(cond.params().as_slice(), Self::from_row)
            .map_err(|e| e.to_string())?;
        rows.collect::<rusqlite::Result<Vec<_>>>()
            .map_err(|e| e.to_string())
    }

    pub fn count(pool: &DbPool, filter: &TagFilter) -> Result<i64, String> {
        let conn = pool.get().map_err(|e| e.to_string())?;
        let cond = filter.conditions(true);
        let sql = format!("SELECT COUNT(*) FROM tags{}", cond.sql());
        conn.query_row(&sql, cond.params().as_slice(), |row| row.get(0))
            .map_err(|e| e.to_string())
    }

    pub fn create(pool: &DbPool, form: &TagForm) -> Result<i64, String> {
        let conn = pool.get().map_err(|e| e.to_string())?;
        let ts = now();
        conn.execute(
            "INSERT INTO tags (name, created_by, state, created_at, updated_at)
             VALUES (?1, ?2, ?3, ?4, ?4)",
            params![form.name, form.created_by, form.state, ts],
        )
        .map_err(|e| e.to_string())?;
        Ok(conn.last_insert_rowid())
    }

    pub fn update(pool: &DbPool, id: i64, changes: &TagChanges) -> Result<(), String> {
        let conn = pool.get().map_err(|e| e.to_string())?;
        let mut set = Changes::default();
        set.set("modified_by", changes.modified_by.clone());
        set.set("updated_at", now());
        set.set_opt("name", &changes.name);
        set.set_opt("state", &changes.state);

        let (sql, values) = set.into_update("tags", id);
        let refs: Vec<&dyn rusqlite::types::ToSql> = values.iter().map(|p| p.as_ref()).collect();
        conn.execute(&sql, refs.as_slice()).map_err(|e| e.to_string())?;
        Ok(())
    }

    /// Soft delete: stamp `deleted_at`, keep the row.
    pub fn delete(pool: &DbPool, id: i64) -> Result<(), String> {
        let conn = pool.get().map_err(|e| e.to_string())?;
        conn.execute(
            "UPDATE tags SET deleted_at = ?1 WHERE id = ?2 AND deleted_at IS NULL",
            params![now(), id],
        )
        .map_err(|e| e.to_string())?;
        Ok(())
    }

    /// Permanently remove rows that were already soft-deleted.
    pub fn clean_deleted(pool: &DbPool) -> Result<usize, String> {
        let conn = pool.get().map_err(|e| e.to_string())?;
        conn.execute("DELETE FROM tags WHERE deleted_at IS NOT NULL", [])
            .map_err(|e| e.to_string())
    }
}
