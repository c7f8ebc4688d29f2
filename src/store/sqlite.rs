use crate::db::DbPool;
use crate::models::article::{Article, ArticleChanges, ArticleFilter, ArticleForm};
use crate::models::tag::{Tag, TagChanges, TagFilter, TagForm};

use super::Store;

/// SQLite-backed implementation of the Store trait.
/// Wraps the r2d2 connection pool and delegates to model methods.
pub struct SqliteStore {
    pub pool: DbPool,
}

/// Unique names for shared-cache test databases so parallel tests don't collide.
#[cfg(test)]
static TEST_DB_COUNTER: std::sync::atomic::AtomicU64 = std::sync::atomic::AtomicU64::new(0);

impl SqliteStore {
    pub fn new_at(path: &str) -> Result<Self, String> {
        let pool = crate::db::init_pool(path).map_err(|e| e.to_string())?;
        Ok(Self { pool })
    }

    /// Named shared-cache in-memory store with the schema applied. Every pooled
    /// connection sees the same data.
    #[cfg(test)]
    pub fn in_memory() -> Self {
        let id = TEST_DB_COUNTER.fetch_add(1, std::sync::atomic::Ordering::SeqCst);
        let uri = format!("file:gazette_test_{}?mode=memory&cache=shared", id);
        let manager = r2d2_sqlite::SqliteConnectionManager::file(uri);
        let pool = r2d2::Pool::builder()
            .max_size(2)
            .build(manager)
            .expect("Failed to create test pool");
        let store = Self { pool };
        store.run_migrations().expect("migrations failed");
        store
    }
}

impl Store for SqliteStore {
    // ── Lifecycle ───────────────────────────────────────────────────

    fn run_migrations(&self) -> Result<(), String> {
        crate::db::run_migrations(&self.pool).map_err(|e| e.to_string())
    }

    // ── Tags ────────────────────────────────────────────────────────

    fn tag_exists_by_name(&self, name: &str) -> Result<bool, String> {
        Tag::exists_by_name(&self.pool, name)
    }

    fn tag_exists_by_id(&self, id: i64) -> Result<bool, String> {
        Tag::exists_by_id(&self.pool, id)
    }

    fn tag_find_by_id(&self, id: i64) -> Result<Option<Tag>, String> {
        Tag::find_by_id(&self.pool, id)
    }

    fn tag_find_by_name(&self, name: &str) -> Result<Option<Tag>, String> {
        Tag::find_by_name(&self.pool, name)
    }

    fn tag_list(&self, filter: &TagFilter, page: i64, page_size: i64) -> Result<Vec<Tag>, String> {
        Tag::list(&self.pool, filter, page, page_size)
    }

    fn tag_list_unscoped(&self, filter: &TagFilter) -> Result<Vec<Tag>, String> {
        Tag::list_unscoped(&self.pool, filter)
    }

    fn tag_count(&self, filter: &TagFilter) -> Result<i64, String> {
        Tag::count(&self.pool, filter)
    }

    fn tag_create(&self, form: &TagForm) -> Result<i64, String> {
        Tag::create(&self.pool, form)
    }

    fn tag_update(&self, id: i64, changes: &TagChanges) -> Result<(), String> {
        Tag::update(&self.pool, id, changes)
    }

    fn tag_delete(&self, id: i64) -> Result<(), String> {
        Tag::delete(&self.pool, id)
    }

    fn tag_clean_deleted(&self) -> Result<usize, String> {
        Tag::clean_deleted(&self.pool)
    }

    // ── Articles ────────────────────────────────────────────────────

    fn article_exists_by_id(&self, id: i64) -> Result<bool, String> {
        Article::exists_by_id(&self.pool, id)
    }

    fn article_find_by_id(&self, id: i64) -> Result<Option<Article>, String> {
        Article::find_by_id(&self.pool, id)
    }

    fn article_list(
        &self,
        filter: &ArticleFilter,
        page: i64,
        page_size: i64,
    ) -> Result<Vec<Article>, String> {
        Article::list(&self.pool, filter, page, page_size)
    }

    fn article_list_unscoped(&self, filter: &ArticleFilter) -> Result<Vec<Article>, String> {
        Article::list_unscoped(&self.pool, filter)
    }

    fn article_count(&self, filter: &ArticleFilter) -> Result<i64, String> {
        Article::count(&self.pool, filter)
    }

    fn article_create(&self, form: &ArticleForm) -> Result<i64, String> {
        Article::create(&self.pool, form)
    }

    fn article_update(&self, id: i64, changes: &ArticleChanges) -> Result<(), String> {
        Article::update(&self.pool, id, changes)
    }

    fn article_delete(&self, id: i64) -> Result<(), String> {
        Article::delete(&self.pool, id)
    }

    fn article_clean_deleted(&self) -> Result<usize, String> {
        Article::clean_deleted(&self.pool)
    }
}
