use std::{
    collections::HashMap,
    sync::{Arc, Mutex, MutexGuard, PoisonError},
    time::Duration,
};

use tokio::time::{self, Instant};

use crate::domain::job::JobRecord;

pub const DEFAULT_TTL: Duration = Duration::from_secs(60 * 60);

struct CacheEntry {
    records: Vec<JobRecord>,
    timestamp: Instant,
}

/// In-memory result sets keyed by compiled query. Lives as long as the
/// process; entries past the TTL are never handed out.
pub struct JobCache {
    entries: Mutex<HashMap<String, CacheEntry>>,
    ttl: Duration,
}

impl Default for JobCache {
    fn default() -> Self {
        JobCache::new(DEFAULT_TTL)
    }
}

impl JobCache {
    pub fn new(ttl: Duration) -> Self {
        JobCache {
            entries: Mutex::new(HashMap::new()),
            ttl,
        }
    }

    fn entries(&self) -> MutexGuard<'_, HashMap<String, CacheEntry>> {
        self.entries.lock().unwrap_or_else(PoisonError::into_inner)
    }

    pub fn set(&self, key: String, records: Vec<JobRecord>) {
        self.entries().insert(
            key,
            CacheEntry {
                records,
                timestamp: Instant::now(),
            },
        );
    }

    pub fn get(&self, key: &str) -> Option<Vec<JobRecord>> {
        let mut entries = self.entries();
        let entry = entries.get(key)?;

        if entry.timestamp.elapsed() > self.ttl {
            entries.remove(key);
            return None;
        }
        Some(entry.records.clone())
    }

    /// Drops expired entries, returning how many went.
    pub fn clear_expired(&self) -> usize {
        let mut entries = self.entries();
        let before = entries.len();
        entries.retain(|_, entry| entry.timestamp.elapsed() <= self.ttl);
        before - entries.len()
    }

    pub fn clear(&self) {
        self.entries().clear();
    }

    pub fn len(&self) -> usize {
        self.entries().len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

pub async fn cache_sweeper_handler(cache: Arc<JobCache>, every: Duration) {
    log::info!("Started cache sweeper, running every {:?}", every);

    let mut interval = time::interval(every);
    loop {
        interval.tick().await;

        let evicted = cache.clear_expired();
        if evicted > 0 {
            log::info!(
                "Evicted {} expired cache entries, {} remain",
                evicted,
                cache.len()
            );
        }
    }
}
