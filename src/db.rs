use r2d2::Pool;
use r2d2_sqlite::SqliteConnectionManager;
use std::path::Path;

pub type DbPool = Pool<SqliteConnectionManager>;

pub fn init_pool(path: &str) -> Result<DbPool, Box<dyn std::error::Error>> {
    if let Some(parent) = Path::new(path).parent() {
        if !parent.as_os_str().is_empty() {
            std::fs::create_dir_all(parent)?;
        }
    }

    let manager = SqliteConnectionManager::file(path);
    let pool = Pool::builder().max_size(10).build(manager)?;

    // Enable WAL mode for better concurrent read performance
    let conn = pool.get()?;
    conn.execute_batch("PRAGMA journal_mode=WAL; PRAGMA foreign_keys=ON;")?;

    Ok(pool)
}

pub fn run_migrations(pool: &DbPool) -> Result<(), Box<dyn std::error::Error>> {
    let conn = pool.get()?;

    conn.execute_batch(
        "
        -- Tags. Soft-deleted rows keep their name but drop out of the unique index.
        CREATE TABLE IF NOT EXISTS tags (
            id INTEGER PRIMARY KEY,
            name TEXT NOT NULL,
            created_by TEXT NOT NULL DEFAULT '',
            modified_by TEXT NOT NULL DEFAULT '',
            state INTEGER NOT NULL DEFAULT 1,
            created_at DATETIME DEFAULT CURRENT_TIMESTAMP,
            updated_at DATETIME DEFAULT CURRENT_TIMESTAMP,
            deleted_at DATETIME
        );

        CREATE UNIQUE INDEX IF NOT EXISTS idx_tags_live_name
            ON tags(name) WHERE deleted_at IS NULL;

        -- Articles. tag_id is checked by the API layer, not by a foreign key,
        -- so purging deleted tags never fails on orphaned articles.
        CREATE TABLE IF NOT EXISTS articles (
            id INTEGER PRIMARY KEY,
            tag_id INTEGER NOT NULL,
            title TEXT NOT NULL,
            description TEXT NOT NULL DEFAULT '',
            content TEXT NOT NULL DEFAULT '',
            cover_image_url TEXT NOT NULL DEFAULT '',
            state INTEGER NOT NULL DEFAULT 1,
            created_by TEXT NOT NULL DEFAULT '',
            modified_by TEXT NOT NULL DEFAULT '',
            created_at DATETIME DEFAULT CURRENT_TIMESTAMP,
            updated_at DATETIME DEFAULT CURRENT_TIMESTAMP,
            deleted_at DATETIME
        );

        CREATE INDEX IF NOT EXISTS idx_articles_tag ON articles(tag_id);
        CREATE INDEX IF NOT EXISTS idx_articles_deleted ON articles(deleted_at);
        CREATE INDEX IF NOT EXISTS idx_tags_deleted ON tags(deleted_at);
        ",
    )?;

    Ok(())
}
