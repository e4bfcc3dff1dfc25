//! Fakes shared by the unit tests.

use std::{
    collections::{HashSet, VecDeque},
    ops::Range,
    sync::{
        atomic::{AtomicU32, Ordering},
        Mutex,
    },
};

use async_trait::async_trait;
use tokio::sync::mpsc;

use crate::{
    domain::job::JobRecord,
    services::{FetchError, JobNotifier, JobSource, JobStore},
};

pub fn job_url(id: usize) -> String {
    format!("{}?refId=ref-{id}&trackingId=track-{id}", job_base_url(id))
}

pub fn job_base_url(id: usize) -> String {
    format!("https://www.linkedin.com/jobs/view/software-engineer-{id}")
}

pub fn job_card(id: usize) -> String {
    format!(
        r#"<li>
  <div class="base-card">
    <a class="base-card__full-link" href="{url}"></a>
    <img class="artdeco-entity-image" data-delayed-url="https://media.licdn.com/logo-{id}.png">
    <h3 class="base-search-card__title">
      Software Engineer {id}
    </h3>
    <h4 class="base-search-card__subtitle"><a>Company {id}</a></h4>
    <span class="job-search-card__location">Santa Clara, CA</span>
    <span class="job-search-card__salary-info">
      $40/hr   -
      $50/hr
    </span>
    <time class="job-search-card__listdate" datetime="2025-03-08">2 days ago</time>
  </div>
</li>"#,
        url = job_url(id)
    )
}

pub fn listing_page(ids: Range<usize>) -> String {
    ids.map(job_card).collect::<Vec<String>>().join("\n")
}

pub fn job_record(id: usize) -> JobRecord {
    JobRecord {
        position: format!("Software Engineer {id}"),
        company: format!("Company {id}"),
        location: "Santa Clara, CA".to_string(),
        date: "2025-03-08".to_string(),
        salary: "Not specified".to_string(),
        job_url: job_url(id),
        base_url: job_base_url(id),
        company_logo: None,
        ago_time: "2 days ago".to_string(),
        posted_at: None,
        first_seen: None,
        last_seen: None,
    }
}

/// Replays canned responses in order; an exhausted script answers with an
/// empty page.
#[derive(Default)]
pub struct ScriptedSource {
    responses: Mutex<VecDeque<Result<String, FetchError>>>,
    requested: Mutex<Vec<String>>,
}

impl ScriptedSource {
    pub fn new(responses: Vec<Result<String, FetchError>>) -> Self {
        ScriptedSource {
            responses: Mutex::new(responses.into()),
            requested: Mutex::new(vec![]),
        }
    }

    pub fn requested(&self) -> Vec<String> {
        self.requested.lock().unwrap().clone()
    }
}

#[async_trait]
impl JobSource for ScriptedSource {
    async fn fetch_page(&self, url: &str) -> Result<String, FetchError> {
        self.requested.lock().unwrap().push(url.to_string());
        self.responses
            .lock()
            .unwrap()
            .pop_front()
            .unwrap_or_else(|| Ok(String::new()))
    }
}

/// Enforces identity-key uniqueness like the real table does.
#[derive(Default)]
pub struct MemoryStore {
    rows: Mutex<Vec<JobRecord>>,
    batches: Mutex<Vec<Vec<String>>>,
    failures_left: AtomicU32,
    attempts: AtomicU32,
}

impl MemoryStore {
    pub fn with_known(ids: &[usize]) -> Self {
        let store = MemoryStore::default();
        *store.rows.lock().unwrap() = ids.iter().map(|id| job_record(*id)).collect();
        store
    }

    pub fn failing(times: u32) -> Self {
        let store = MemoryStore::default();
        store.failures_left.store(times, Ordering::SeqCst);
        store
    }

    pub fn rows(&self) -> Vec<JobRecord> {
        self.rows.lock().unwrap().clone()
    }

    /// Base urls of each successful insert, in write order.
    pub fn batches(&self) -> Vec<Vec<String>> {
        self.batches.lock().unwrap().clone()
    }

    pub fn attempts(&self) -> u32 {
        self.attempts.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl JobStore for MemoryStore {
    async fn existing_identity_keys(&self) -> anyhow::Result<HashSet<String>> {
        Ok(self
            .rows
            .lock()
            .unwrap()
            .iter()
            .map(|row| row.base_url.clone())
            .collect())
    }

    async fn insert_batch(&self, records: &[JobRecord]) -> anyhow::Result<u64> {
        self.attempts.fetch_add(1, Ordering::SeqCst);
        let failures_left = self.failures_left.load(Ordering::SeqCst);
        if failures_left > 0 {
            self.failures_left.store(failures_left - 1, Ordering::SeqCst);
            anyhow::bail!("injected write failure");
        }

        let mut rows = self.rows.lock().unwrap();
        let mut keys: HashSet<String> = rows.iter().map(|row| row.base_url.clone()).collect();
        for record in records {
            if !keys.insert(record.base_url.clone()) {
                anyhow::bail!("duplicate key value violates unique constraint: {}", record.base_url);
            }
        }
        rows.extend(records.iter().cloned());
        self.batches
            .lock()
            .unwrap()
            .push(records.iter().map(|r| r.base_url.clone()).collect());

        Ok(records.len() as u64)
    }
}

pub struct RecordingNotifier {
    sender: mpsc::UnboundedSender<(usize, Option<String>)>,
}

impl RecordingNotifier {
    pub fn new() -> (Self, mpsc::UnboundedReceiver<(usize, Option<String>)>) {
        let (sender, receiver) = mpsc::unbounded_channel();
        (RecordingNotifier { sender }, receiver)
    }
}

#[async_trait]
impl JobNotifier for RecordingNotifier {
    async fn notify(&self, jobs: &[JobRecord], keyword: Option<&str>) {
        _ = self.sender.send((jobs.len(), keyword.map(str::to_string)));
    }
}

pub struct PanickingNotifier;

#[async_trait]
impl JobNotifier for PanickingNotifier {
    async fn notify(&self, _jobs: &[JobRecord], _keyword: Option<&str>) {
        panic!("notification backend exploded");
    }
}
