use rocket::fairing::{Fairing, Info, Kind};
use rocket::tokio;
use rocket::{Orbit, Rocket};
use std::sync::Arc;
use std::time::Duration;

use crate::config::AppConfig;
use crate::store::Store;

/// Periodically purges soft-deleted tags and articles.
pub struct BackgroundTasks;

#[rocket::async_trait]
impl Fairing for BackgroundTasks {
    fn info(&self) -> Info {
        Info {
            name: "Background Tasks",
            kind: Kind::Liftoff,
        }
    }

    async fn on_liftoff(&self, rocket: &Rocket<Orbit>) {
        let interval = rocket
            .state::<AppConfig>()
            .map(|c| c.clean_interval_minutes)
            .unwrap_or(0);
        if interval == 0 {
            log::info!("[task] Soft-delete cleanup disabled");
            return;
        }

        let store = match rocket.state::<Arc<dyn Store>>() {
            Some(s) => Arc::clone(s),
            None => {
                log::error!("[task] Store not found in managed state, cleanup not started");
                return;
            }
        };

        tokio::spawn(async move {
            loop {
                tokio::time::sleep(cleanup_period(interval)).await;
                let s = Arc::clone(&store);
                // SQLite calls block; keep them off the async workers
                match tokio::task::spawn_blocking(move || purge_deleted(&*s)).await {
                    Ok(Ok((tags, articles))) => {
                        if tags + articles > 0 {
                            log::info!(
                                "[task] Purged {} deleted tags and {} deleted articles",
                                tags,
                                articles
                            );
                        }
                    }
                    Ok(Err(e)) => log::error!("[task] Soft-delete cleanup failed: {}", e),
                    Err(e) => log::error!("[task] Soft-delete cleanup panicked: {}", e),
                }
            }
        });

        log::info!("[task] Soft-delete cleanup every {} minute(s)", interval);
    }
}

/// Sleep between purges; absurdly large settings clamp instead of overflowing.
fn cleanup_period(minutes: u64) -> Duration {
    Duration::from_secs(minutes.saturating_mul(60))
}

/// Permanently remove every soft-deleted tag and article.
pub fn purge_deleted(store: &dyn Store) -> Result<(usize, usize), String> {
    let tags = store.tag_clean_deleted()?;
    let articles = store.article_clean_deleted()?;
    Ok((tags, articles))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::sqlite::SqliteStore;
    use crate::models::tag::TagForm;

    #[test]
    fn cleanup_period_saturates() {
        assert_eq!(cleanup_period(2), Duration::from_secs(120));
        assert_eq!(cleanup_period(u64::MAX), Duration::from_secs(u64::MAX));
    }

    #[test]
    fn purge_counts_removed_rows() {
        let store = SqliteStore::in_memory();
        let id = store
            .tag_create(&TagForm {
                name: "go".to_string(),
                created_by: "eddy".to_string(),
                state: 1,
            })
            .unwrap();
        store.tag_delete(id).unwrap();
        assert_eq!(purge_deleted(&store).unwrap(), (1, 0));
        assert_eq!(purge_deleted(&store).unwrap(), (0, 0));
    }
}
