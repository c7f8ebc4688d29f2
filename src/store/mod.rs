use crate::models::article::{Article, ArticleChanges, ArticleFilter, ArticleForm};
use crate::models::tag::{Tag, TagChanges, TagFilter, TagForm};

pub mod sqlite;

/// Unified data-access trait. Handlers receive it as `Arc<dyn Store>` managed state.
/// "No matching row" is never an `Err`: existence checks return `false`,
/// lookups return `None`, listings return an empty vec.
pub trait Store: Send + Sync {
    // ── Lifecycle ───────────────────────────────────────────────────
    fn run_migrations(&self) -> Result<(), String>;

    // ── Tags ────────────────────────────────────────────────────────
    fn tag_exists_by_name(&self, name: &str) -> Result<bool, String>;
    fn tag_exists_by_id(&self, id: i64) -> Result<bool, String>;
    fn tag_find_by_id(&self, id: i64) -> Result<Option<Tag>, String>;
    fn tag_find_by_name(&self, name: &str) -> Result<Option<Tag>, String>;
    fn tag_list(&self, filter: &TagFilter, page: i64, page_size: i64) -> Result<Vec<Tag>, String>;
    fn tag_list_unscoped(&self, filter: &TagFilter) -> Result<Vec<Tag>, String>;
    fn tag_count(&self, filter: &TagFilter) -> Result<i64, String>;
    fn tag_create(&self, form: &TagForm) -> Result<i64, String>;
    fn tag_update(&self, id: i64, changes: &TagChanges) -> Result<(), String>;
    fn tag_delete(&self, id: i64) -> Result<(), String>;
    fn tag_clean_deleted(&self) -> Result<usize, String>;

    // ── Articles ────────────────────────────────────────────────────
    fn article_exists_by_id(&self, id: i64) -> Result<bool, String>;
    fn article_find_by_id(&self, id: i64) -> Result<Option<Article>, String>;
    fn article_list(
        &self,
        filter: &ArticleFilter,
        page: i64,
        page_size: i64,
    ) -> Result<Vec<Article>, String>;
    fn article_list_unscoped(&self, filter: &ArticleFilter) -> Result<Vec<Article>, String>;
    fn article_count(&self, filter: &ArticleFilter) -> Result<i64, String>;
    fn article_create(&self, form: &ArticleForm) -> Result<i64, String>;
    fn article_update(&self, id: i64, changes: &ArticleChanges) -> Result<(), String>;
    fn article_delete(&self, id: i64) -> Result<(), String>;
    fn article_clean_deleted(&self) -> Result<usize, String>;
}
