use chrono::NaiveDateTime;
use rusqlite::{params, OptionalExtension, Row};
use serde::{Deserialize, Serialize};

use super::tag::Tag;
use super::{now, page_window, Changes, Conditions};
use crate::db::DbPool;

#[derive(Debug, Serialize, Deserialize, Clone, PartialEq)]
pub struct Article {
    pub id: i64,
    pub tag_id: i64,
    pub title: String,
    #[serde(rename = "desc")]
    pub description: String,
    pub content: String,
    pub cover_image_url: String,
    pub state: i64,
    pub created_by: String,
    pub modified_by: String,
    pub created_at: NaiveDateTime,
    pub updated_at: NaiveDateTime,
    pub deleted_at: Option<NaiveDateTime>,
    /// The referenced tag, when it is still live.
    pub tag: Option<Tag>,
}

#[derive(Debug, Clone)]
pub struct ArticleForm {
    pub tag_id: i64,
    pub title: String,
    pub description: String,
    pub content: String,
    pub cover_image_url: String,
    pub state: i64,
    pub created_by: String,
}

#[derive(Debug, Clone, Default)]
pub struct ArticleChanges {
    pub tag_id: Option<i64>,
    pub title: Option<String>,
    pub description: Option<String>,
    pub content: Option<String>,
    pub cover_image_url: Option<String>,
    pub state: Option<i64>,
    pub modified_by: String,
}

#[derive(Debug, Clone, Default)]
pub struct ArticleFilter {
    pub state: Option<i64>,
    pub tag_id: Option<i64>,
}

impl ArticleFilter {
    fn conditions(&self, scoped: bool) -> Conditions {
        let mut c = Conditions::default();
        if scoped {
            c.raw("a.deleted_at IS NULL");
        }
        if let Some(state) = self.state {
            c.push("a.state", state);
        }
        if let Some(tag_id) = self.tag_id {
            c.push("a.tag_id", tag_id);
        }
        c
    }
}

/// Article columns plus the joined tag under `t_` aliases.
const SELECT_WITH_TAG: &str = "SELECT a.*,
        t.id AS t_id, t.name AS t_name, t.created_by AS t_created_by,
        t.modified_by AS t_modified_by, t.state AS t_state,
        t.created_at AS t_created_at, t.updated_at AS t_updated_at
    FROM articles a
    LEFT JOIN tags t ON t.id = a.tag_id AND t.deleted_at IS NULL";

impl Article {
    fn from_row(row: &Row) -> rusqlite::Result<Self> {
        let tag = match row.get::<_, Option<i64>>("t_id")? {
            Some(tid) => Some(Tag {
                id: tid,
                name: row.get("t_name")?,
                created_by: row.get("t_created_by")?,
                modified_by: row.get("t_modified_by")?,
                state: row.get("t_state")?,
                created_at: row.get("t_created_at")?,
                updated_at: row.get("t_updated_at")?,
                deleted_at: None,
            }),
            None => None,
        };

        Ok(Article {
            id: row.get("id")?,
            tag_id: row.get("tag_id")?,
            title: row.get("title")?,
            description: row.get("description")?,
            content: row.get("content")?,
            cover_image_url: row.get("cover_image_url")?,
            state: row.get("state")?,
            created_by: row.get("created_by")?,
            modified_by: row.get("modified_by")?,
            created_at: row.get("created_at")?,
            updated_at: row.get("updated_at")?,
            deleted_at: row.get("deleted_at")?,
            tag,
        })
    }

    pub fn exists_by_id(pool: &DbPool, id: i64) -> Result<bool, String> {
        let conn = pool.get().map_err(|e| e.to_string())?;
        conn.query_row(
            "SELECT EXISTS(SELECT 1 FROM articles WHERE id = ?1 AND deleted_at IS NULL)",
            params![id],
            |row| row.get(0),
        )
        .map_err(|e| e.to_string())
    }

    pub fn find_by_id(pool: &DbPool, id: i64) -> Result<Option<Self>, String> {
        let conn = pool.get().map_err(|e| e.to_string())?;
        let sql = format!("{} WHERE a.id = ?1 AND a.deleted_at IS NULL", SELECT_WITH_TAG);
        conn.query_row(&sql, params![id], Self::from_row)
            .optional()
            .map_err(|e| e.to_string())
    }

    pub fn list(
        pool: &DbPool,
        filter: &ArticleFilter,
        page: i64,
        page_size: i64,
    ) -> Result<Vec<Self>, String> {
        Self::select(pool, filter, true, page_window(page, page_size))
    }

    pub fn list_unscoped(pool: &DbPool, filter: &ArticleFilter) -> Result<Vec<Self>, String> {
        Self::select(pool, filter, false, None)
    }

    fn select(
        pool: &DbPool,
        filter: &ArticleFilter,
        scoped: bool,
        window: Option<(i64, i64)>,
    ) -> Result<Vec<Self>, String> {
        let conn = pool.get().map_err(|e| e.to_string())?;
        let mut cond = filter.conditions(scoped);
        let mut sql = format!("{}{} ORDER BY a.id", SELECT_WITH_TAG, cond.sql());
        cond.paginate(&mut sql, window);

        let mut stmt = conn.prepare(&sql).map_err(|e| e.to_string())?;
        let rows = stmt
            .query_map(cond.params().as_slice(), Self::from_row)
            .map_err(|e| e.to_string())?;
        rows.collect::<rusqlite::Result<Vec<_>>>()
            .map_err(|e| e.to_string())
    }

    pub fn count(pool: &DbPool, filter: &ArticleFilter) -> Result<i64, String> {
        let conn = pool.get().map_err(|e| e.to_string())?;
        let cond = filter.conditions(true);
        let sql = format!("SELECT COUNT(*) FROM articles a{}", cond.sql());
        conn.query_row(&sql, cond.params().as_slice(), |row| row.get(0))
            .map_err(|e| e.to_string())
    }

    pub fn create(pool: &DbPool, form: &ArticleForm) -> Result<i64, String> {
        let conn = pool.get().map_err(|e| e.to_string())?;
        let ts = now();
        conn.execute(
            "INSERT INTO articles
                (tag_id, title, description, content, cover_image_url, state, created_by, created_at, updated_at)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?8)",
            params![
                form.tag_id,
                form.title,
                form.description,
                form.content,
                form.cover_image_url,
                form.state,
                form.created_by,
                ts,
            ],
        )
        .map_err(|e| e.to_string())?;
        Ok(conn.last_insert_rowid())
    }

    pub fn update(pool: &DbPool, id: i64, changes: &ArticleChanges) -> Result<(), String> {
        let conn = pool.get().map_err(|e| e.to_string())?;
        let mut set = Changes::default();
        set.set("modified_by", changes.modified_by.clone());
        set.set("updated_at", now());
        set.set_opt("tag_id", &changes.tag_id);
        set.set_opt("title", &changes.title);
        set.set_opt("description", &changes.description);
        set.set_opt("content", &changes.content);
        set.set_opt("cover_image_url", &changes.cover_image_url);
        set.set_opt("state", &changes.state);

        let (sql, values) = set.into_update("articles", id);
        let refs: Vec<&dyn rusqlite::types::ToSql> = values.iter().map(|p| p.as_ref()).collect();
        conn.execute(&sql, refs.as_slice()).map_err(|e| e.to_string())?;
        Ok(())
    }

    pub fn delete(pool: &DbPool, id: i64) -> Result<(), String> {
        let conn = pool.get().map_err(|e| e.to_string())?;
        conn.execute(
            "UPDATE articles SET deleted_at = ?1 WHERE id = ?2 AND deleted_at IS NULL",
            params![now(), id],
        )
        .map_err(|e| e.to_string())?;
        Ok(())
    }

    pub fn clean_deleted(pool: &DbPool) -> Result<usize, String> {
        let conn = pool.get().map_err(|e| e.to_string())?;
        conn.execute("DELETE FROM articles WHERE deleted_at IS NOT NULL", [])
            .map_err(|e| e.to_string())
    }
}
