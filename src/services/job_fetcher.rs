use std::{sync::Arc, time::Duration};

use rand::Rng;

use crate::{
    configuration::ScraperSettings,
    domain::{
        filter::{CompiledQuery, RESULTS_PER_PAGE},
        job::JobRecord,
        listing_page::parse_job_list,
    },
};

use super::{FetchError, JobCache, JobSource};

#[derive(Debug, Clone)]
pub struct FetchPolicy {
    pub batch_size: u32,
    pub max_consecutive_errors: u32,
    pub pacing_base: Duration,
    pub pacing_jitter: Duration,
    pub backoff_base: Duration,
}

impl Default for FetchPolicy {
    fn default() -> Self {
        FetchPolicy {
            batch_size: RESULTS_PER_PAGE,
            max_consecutive_errors: 3,
            pacing_base: Duration::from_secs(2),
            pacing_jitter: Duration::from_secs(1),
            backoff_base: Duration::from_secs(1),
        }
    }
}

impl From<&ScraperSettings> for FetchPolicy {
    fn from(settings: &ScraperSettings) -> Self {
        FetchPolicy {
            batch_size: settings.batch_size.max(1),
            max_consecutive_errors: settings.max_consecutive_errors,
            pacing_base: Duration::from_millis(settings.pacing_base_millis),
            pacing_jitter: Duration::from_millis(settings.pacing_jitter_millis),
            backoff_base: Duration::from_millis(settings.backoff_base_millis),
        }
    }
}

impl FetchPolicy {
    fn pacing_delay(&self) -> Duration {
        let jitter_millis = self.pacing_jitter.as_millis() as u64;
        let jitter = match jitter_millis {
            0 => 0,
            max => rand::thread_rng().gen_range(0..=max),
        };
        self.pacing_base + Duration::from_millis(jitter)
    }

    fn backoff_delay(&self, attempt: u32) -> Duration {
        self.backoff_base.saturating_mul(2_u32.saturating_pow(attempt))
    }
}

/// Walks the paginated search one batch at a time, never two at once.
pub struct JobFetcher {
    source: Arc<dyn JobSource>,
    cache: Arc<JobCache>,
    policy: FetchPolicy,
}

impl JobFetcher {
    pub fn new(source: Arc<dyn JobSource>, cache: Arc<JobCache>, policy: FetchPolicy) -> Self {
        JobFetcher {
            source,
            cache,
            policy,
        }
    }

    /// Cached when possible, otherwise fetched and cached if anything came back.
    pub async fn fetch(&self, query: &CompiledQuery) -> Result<Vec<JobRecord>, FetchError> {
        let cache_key = query.cache_key();
        if let Some(records) = self.cache.get(&cache_key) {
            log::info!("Returning {} cached results for {}", records.len(), cache_key);
            return Ok(records);
        }

        let records = self.collect(query).await?;
        if !records.is_empty() {
            self.cache.set(cache_key, records.clone());
        }

        Ok(records)
    }

    /// Fetches batches until upstream runs dry, the limit is met or failures
    /// pile up. Only non-transient errors escape; everything else ends the
    /// walk with what was gathered so far.
    pub async fn collect(&self, query: &CompiledQuery) -> Result<Vec<JobRecord>, FetchError> {
        let mut records: Vec<JobRecord> = vec![];
        let mut start = 0;
        let mut consecutive_errors = 0;

        log::info!("Searching {}", query.url_for(0));

        loop {
            match self.source.fetch_page(&query.url_for(start)).await {
                Ok(markup) => {
                    let batch = parse_job_list(&markup);
                    if batch.is_empty() {
                        log::info!("No more jobs after offset {}", start);
                        break;
                    }

                    records.extend(batch);
                    log::info!("Fetched jobs at offset {}. Total: {}", start, records.len());

                    if let Some(limit) = query.limit() {
                        if records.len() >= limit {
                            records.truncate(limit);
                            break;
                        }
                    }

                    consecutive_errors = 0;
                    start += self.policy.batch_size;
                    tokio::time::sleep(self.policy.pacing_delay()).await;
                }
                Err(e) if e.is_transient() => {
                    consecutive_errors += 1;
                    log::error!(
                        "Error fetching batch at offset {} (attempt {}): {}",
                        start,
                        consecutive_errors,
                        e
                    );

                    if consecutive_errors >= self.policy.max_consecutive_errors {
                        log::warn!(
                            "Max consecutive errors reached. Stopping with {} jobs",
                            records.len()
                        );
                        break;
                    }

                    tokio::time::sleep(self.policy.backoff_delay(consecutive_errors)).await;
                }
                Err(e) => {
                    log::error!("Unrecoverable error fetching batch at offset {}: {}", start, e);
                    return Err(e);
                }
            }
        }

        Ok(records)
    }
}
