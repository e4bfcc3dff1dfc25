use std::sync::Arc;

use crate::domain::{
    filter::{CompiledQuery, FilterRequest, QueryMode},
    job::JobRecord,
};

use super::{
    filter_new_jobs, FetchPolicy, JobCache, JobFetcher, JobNotifier, JobSource, JobStore,
    PersistenceQueue, RetryPolicy,
};

/// Filter in, net-new jobs out. One instance serves every caller; each query
/// runs its own fetch loop while writes funnel through the shared queue.
pub struct JobPipeline {
    fetcher: JobFetcher,
    cache: Arc<JobCache>,
    store: Arc<dyn JobStore>,
    persistence: PersistenceQueue,
    notifier: Arc<dyn JobNotifier>,
    search_host: Option<String>,
}

impl JobPipeline {
    pub fn new(
        source: Arc<dyn JobSource>,
        store: Arc<dyn JobStore>,
        notifier: Arc<dyn JobNotifier>,
        cache: Arc<JobCache>,
        fetch_policy: FetchPolicy,
        retry_policy: RetryPolicy,
    ) -> Self {
        JobPipeline {
            fetcher: JobFetcher::new(source, cache.clone(), fetch_policy),
            persistence: PersistenceQueue::spawn(store.clone(), retry_policy),
            cache,
            store,
            notifier,
            search_host: None,
        }
    }

    /// Host used when a filter does not name one.
    pub fn with_search_host(mut self, host: String) -> Self {
        self.search_host = Some(host);
        self
    }

    fn compile(&self, filter: &FilterRequest, mode: QueryMode) -> CompiledQuery {
        match (&filter.host, &self.search_host) {
            (None, Some(host)) => FilterRequest {
                host: Some(host.clone()),
                ..filter.clone()
            }
            .compile(mode),
            _ => filter.compile(mode),
        }
    }

    /// Jobs the store has not seen before. They are persisted before this
    /// returns; notification happens in the background.
    pub async fn query(&self, filter: &FilterRequest) -> anyhow::Result<Vec<JobRecord>> {
        let query = self.compile(filter, QueryMode::NewOnly);
        let cache_key = query.cache_key();

        if let Some(cached) = self.cache.get(&cache_key) {
            log::info!("Returning cached results (query skipped)");
            return Ok(cached);
        }

        let fetched = self.fetcher.collect(&query).await?;
        if fetched.is_empty() {
            log::info!("No jobs returned from upstream");
            return Ok(vec![]);
        }

        let fetched_count = fetched.len();
        let new_jobs = filter_new_jobs(self.store.as_ref(), fetched).await?;
        if new_jobs.is_empty() {
            log::info!("All {} jobs already exist in database", fetched_count);
            return Ok(new_jobs);
        }

        let new_jobs = self.persistence.insert_batch(new_jobs).await?;
        if new_jobs.is_empty() {
            log::info!("Every new job was stored by a concurrent query");
            return Ok(new_jobs);
        }

        self.cache.set(cache_key, new_jobs.clone());
        self.dispatch_notification(new_jobs.clone(), query.keyword());

        Ok(new_jobs)
    }

    /// Everything upstream returns for the filter, persisted or not.
    pub async fn search(&self, filter: &FilterRequest) -> anyhow::Result<Vec<JobRecord>> {
        let query = self.compile(filter, QueryMode::Plain);
        Ok(self.fetcher.fetch(&query).await?)
    }

    fn dispatch_notification(&self, jobs: Vec<JobRecord>, keyword: Option<String>) {
        let notifier = self.notifier.clone();
        tokio::spawn(async move {
            notifier.notify(&jobs, keyword.as_deref()).await;
        });
    }

    pub fn cache_size(&self) -> usize {
        self.cache.len()
    }

    pub fn clear_expired_cache(&self) -> usize {
        self.cache.clear_expired()
    }

    pub fn clear_cache(&self) {
        self.cache.clear()
    }

    pub fn queue_depth(&self) -> usize {
        self.persistence.depth()
    }
}
