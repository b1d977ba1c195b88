// Read-through cache for query results, invalidated whenever a sync inserts rows

pub mod keys;

pub use keys::CacheKey;

use moka::future::Cache;
use std::future::Future;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use tracing::debug;

use crate::config::Config;
use crate::db::StoreError;
use crate::models::StoredTransaction;

#[derive(Clone)]
pub struct QueryCache {
    cache: Cache<CacheKey, Arc<Vec<StoredTransaction>>>,
    // Bumped on every invalidation; loads that straddle a bump are not kept
    generation: Arc<AtomicU64>,
}

impl QueryCache {
    pub fn new(config: &Config) -> Self {
        let cache = Cache::builder()
            .time_to_live(config.cache_ttl)
            .max_capacity(config.cache_max_capacity)
            .build();

        Self {
            cache,
            generation: Arc::new(AtomicU64::new(0)),
        }
    }

    /// Cached rows for `key`, or the result of `load`.
    ///
    /// A loaded result is cached only on success, and only if no invalidation
    /// happened while it was loading.
    pub async fn get_or_load<F>(
        &self,
        key: CacheKey,
        load: F,
    ) -> Result<Arc<Vec<StoredTransaction>>, StoreError>
    where
        F: Future<Output = Result<Vec<StoredTransaction>, StoreError>>,
    {
        if let Some(rows) = self.cache.get(&key).await {
            debug!("Cache hit for key: {}", key);
            return Ok(rows);
        }

        debug!("Cache miss for key: {}", key);
        let generation = self.generation.load(Ordering::SeqCst);
        let rows = Arc::new(load.await?);

        if self.generation.load(Ordering::SeqCst) == generation {
            self.cache.insert(key.clone(), rows.clone()).await;

            // An invalidation may have landed between the check and the insert
            if self.generation.load(Ordering::SeqCst) != generation {
                self.cache.invalidate(&key).await;
            }
        } else {
            debug!("Discarding stale load for key: {}", key);
        }

        Ok(rows)
    }

    pub fn invalidate_all(&self) {
        self.generation.fetch_add(1, Ordering::SeqCst);
        self.cache.invalidate_all();
        debug!("Invalidated all cached query results");
    }
}
