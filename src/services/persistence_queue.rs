use std::{
    collections::HashSet,
    sync::{
        atomic::{AtomicUsize, Ordering},
        Arc,
    },
    time::Duration,
};

use anyhow::Context;
use async_trait::async_trait;
use chrono::Utc;
use itertools::Itertools;
use tokio::sync::{mpsc, oneshot};

use crate::{configuration::PersistenceSettings, domain::job::JobRecord};

/// The persistent side of deduplication. Uniqueness of `base_url` is enforced
/// by the store itself.
#[async_trait]
pub trait JobStore: Send + Sync {
    async fn existing_identity_keys(&self) -> anyhow::Result<HashSet<String>>;

    async fn insert_batch(&self, records: &[JobRecord]) -> anyhow::Result<u64>;
}

/// Candidates whose identity key is not in `known`, order preserved.
pub fn filter_unseen(candidates: Vec<JobRecord>, known: &HashSet<String>) -> Vec<JobRecord> {
    candidates
        .into_iter()
        .filter(|job| !known.contains(&job.base_url))
        .collect()
}

/// First record per identity key wins.
pub fn dedup_batch(records: Vec<JobRecord>) -> Vec<JobRecord> {
    records
        .into_iter()
        .unique_by(|job| job.base_url.clone())
        .collect()
}

pub async fn filter_new_jobs(
    store: &dyn JobStore,
    candidates: Vec<JobRecord>,
) -> anyhow::Result<Vec<JobRecord>> {
    if candidates.is_empty() {
        return Ok(vec![]);
    }

    let known = store
        .existing_identity_keys()
        .await
        .context("Failed to load known job urls")?;
    let new_jobs = filter_unseen(candidates, &known);
    log::info!(
        "Database check: {} new jobs, {} already tracked",
        new_jobs.len(),
        known.len()
    );

    Ok(new_jobs)
}

#[derive(Debug, Clone)]
pub struct RetryPolicy {
    pub max_retries: u32,
    pub backoff_base: Duration,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        RetryPolicy {
            max_retries: 3,
            backoff_base: Duration::from_secs(1),
        }
    }
}

impl From<&PersistenceSettings> for RetryPolicy {
    fn from(settings: &PersistenceSettings) -> Self {
        RetryPolicy {
            max_retries: settings.max_write_retries,
            backoff_base: Duration::from_millis(settings.retry_backoff_base_millis),
        }
    }
}

struct WriteTask {
    records: Vec<JobRecord>,
    reply: oneshot::Sender<anyhow::Result<Vec<JobRecord>>>,
}

/// Single-consumer FIFO in front of the store. Writes run one at a time, in
/// the order they were enqueued.
#[derive(Clone)]
pub struct PersistenceQueue {
    sender: mpsc::UnboundedSender<WriteTask>,
    depth: Arc<AtomicUsize>,
}

impl PersistenceQueue {
    /// Must be called from within a tokio runtime.
    pub fn spawn(store: Arc<dyn JobStore>, policy: RetryPolicy) -> Self {
        let (sender, receiver) = mpsc::unbounded_channel::<WriteTask>();
        let depth = Arc::new(AtomicUsize::new(0));

        tokio::spawn(write_queue_handler(receiver, store, policy, depth.clone()));

        PersistenceQueue { sender, depth }
    }

    /// Resolves once this batch is written or has exhausted its retries, with
    /// the records that were actually stored. Anything another writer stored
    /// while this batch waited in the queue is left out.
    pub async fn insert_batch(&self, records: Vec<JobRecord>) -> anyhow::Result<Vec<JobRecord>> {
        if records.is_empty() {
            return Ok(vec![]);
        }

        let (reply, outcome) = oneshot::channel();
        let depth = self.depth.fetch_add(1, Ordering::SeqCst) + 1;
        log::info!("Write queued (queue depth: {})", depth);

        if self.sender.send(WriteTask { records, reply }).is_err() {
            self.depth.fetch_sub(1, Ordering::SeqCst);
            anyhow::bail!("Write queue handler has stopped");
        }

        outcome
            .await
            .context("Write queue dropped the task before finishing it")?
    }

    /// Writes queued or in flight.
    pub fn depth(&self) -> usize {
        self.depth.load(Ordering::SeqCst)
    }
}

async fn write_queue_handler(
    mut receiver: mpsc::UnboundedReceiver<WriteTask>,
    store: Arc<dyn JobStore>,
    policy: RetryPolicy,
    depth: Arc<AtomicUsize>,
) {
    log::info!("Started write queue handler");

    while let Some(task) = receiver.recv().await {
        let outcome = write_with_retry(store.as_ref(), task.records, &policy).await;
        let remaining = depth.fetch_sub(1, Ordering::SeqCst) - 1;

        match &outcome {
            Ok(written) => log::info!(
                "Write completed, {} rows (queue depth: {})",
                written.len(),
                remaining
            ),
            Err(e) => log::error!("{:?} (queue depth: {})", e, remaining),
        }

        if task.reply.send(outcome).is_err() {
            log::warn!("Caller stopped waiting for its write result");
        }
    }
}

async fn write_with_retry(
    store: &dyn JobStore,
    records: Vec<JobRecord>,
    policy: &RetryPolicy,
) -> anyhow::Result<Vec<JobRecord>> {
    let received = records.len();
    let now = Utc::now();
    let mut unique = dedup_batch(records);
    for job in unique.iter_mut() {
        job.first_seen = Some(now);
        job.last_seen = Some(now);
    }
    if unique.len() < received {
        log::info!(
            "Skipping {} duplicates within batch",
            received - unique.len()
        );
    }

    let max_attempts = policy.max_retries.max(1);
    let mut attempt = 0;

    loop {
        match write_unseen(store, &unique).await {
            Ok(written) => return Ok(written),
            Err(e) => {
                attempt += 1;
                if attempt >= max_attempts {
                    return Err(e.context(format!("Write failed after {} attempts", attempt)));
                }

                let delay = policy
                    .backoff_base
                    .saturating_mul(2_u32.saturating_pow(attempt));
                log::warn!(
                    "Write failed (attempt {}/{}): {}. Retrying in {:?}",
                    attempt,
                    max_attempts,
                    e,
                    delay
                );
                tokio::time::sleep(delay).await;
            }
        }
    }
}

/// Runs inside the queue, so the known keys it reads cannot change before the
/// insert lands.
async fn write_unseen(store: &dyn JobStore, records: &[JobRecord]) -> anyhow::Result<Vec<JobRecord>> {
    let known = store
        .existing_identity_keys()
        .await
        .context("Failed to load known job urls")?;
    let unseen = filter_unseen(records.to_vec(), &known);
    if unseen.len() < records.len() {
        log::info!(
            "Skipping {} jobs stored since this write was queued",
            records.len() - unseen.len()
        );
    }
    if unseen.is_empty() {
        return Ok(unseen);
    }

    store.insert_batch(&unseen).await?;
    Ok(unseen)
}
