use std::collections::HashSet;

use anyhow::Context;
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::{postgres::PgQueryResult, FromRow, PgPool};

use crate::{domain::job::JobRecord, services::JobStore};

#[derive(FromRow)]
pub struct JobRow {
    pub id: i64,
    pub job_url: String,
    pub job_base_url: String,
    pub position: String,
    pub company: String,
    pub location: String,
    pub date: String,
    pub salary: String,
    pub company_logo: String,
    pub ago_time: String,
    pub first_seen: DateTime<Utc>,
    pub last_seen: DateTime<Utc>,
}

impl From<JobRow> for JobRecord {
    fn from(row: JobRow) -> Self {
        JobRecord {
            position: row.position,
            company: row.company,
            location: row.location,
            date: row.date,
            salary: row.salary,
            job_url: row.job_url,
            base_url: row.job_base_url,
            company_logo: match row.company_logo.is_empty() {
                true => None,
                false => Some(row.company_logo),
            },
            ago_time: row.ago_time,
            posted_at: None,
            first_seen: Some(row.first_seen),
            last_seen: Some(row.last_seen),
        }
    }
}

pub async fn get_job_base_urls(pool: &PgPool) -> Result<HashSet<String>, sqlx::Error> {
    let base_urls: Vec<String> = sqlx::query_scalar(
        r"
        select
            job_base_url
        from
            jobs
        ",
    )
    .fetch_all(pool)
    .await?;

    Ok(HashSet::from_iter(base_urls))
}

pub async fn get_all_jobs(pool: &PgPool) -> Result<Vec<JobRecord>, sqlx::Error> {
    let rows = sqlx::query_as::<_, JobRow>(
        r"
        select
            id, job_url, job_base_url, position, company, location, date,
            salary, company_logo, ago_time, first_seen, last_seen
        from
            jobs
        order by
            first_seen desc, id
        ",
    )
    .fetch_all(pool)
    .await?;

    Ok(rows.into_iter().map(JobRecord::from).collect())
}

/// One multi-row insert in its own transaction, so a uniqueness violation
/// leaves nothing behind.
pub async fn insert_jobs(pool: &PgPool, jobs: &[JobRecord]) -> Result<PgQueryResult, sqlx::Error> {
    let now = Utc::now();

    let mut job_urls = Vec::with_capacity(jobs.len());
    let mut base_urls = Vec::with_capacity(jobs.len());
    let mut positions = Vec::with_capacity(jobs.len());
    let mut companies = Vec::with_capacity(jobs.len());
    let mut locations = Vec::with_capacity(jobs.len());
    let mut dates = Vec::with_capacity(jobs.len());
    let mut salaries = Vec::with_capacity(jobs.len());
    let mut logos = Vec::with_capacity(jobs.len());
    let mut ago_times = Vec::with_capacity(jobs.len());
    let mut first_seen = Vec::with_capacity(jobs.len());
    let mut last_seen = Vec::with_capacity(jobs.len());

    for job in jobs {
        job_urls.push(job.job_url.clone());
        base_urls.push(job.base_url.clone());
        positions.push(job.position.clone());
        companies.push(job.company.clone());
        locations.push(job.location.clone());
        dates.push(job.date.clone());
        salaries.push(job.salary.clone());
        logos.push(job.company_logo.clone().unwrap_or_default());
        ago_times.push(job.ago_time.clone());
        first_seen.push(job.first_seen.unwrap_or(now));
        last_seen.push(job.last_seen.unwrap_or(now));
    }

    let mut transaction = pool.begin().await?;

    let result = sqlx::query(
        r"
        insert into jobs
            (job_url, job_base_url, position, company, location, date,
             salary, company_logo, ago_time, first_seen, last_seen)
        select * from unnest (
            $1::text[],
            $2::text[],
            $3::text[],
            $4::text[],
            $5::text[],
            $6::text[],
            $7::text[],
            $8::text[],
            $9::text[],
            $10::timestamptz[],
            $11::timestamptz[]
        )
        ",
    )
    .bind(&job_urls)
    .bind(&base_urls)
    .bind(&positions)
    .bind(&companies)
    .bind(&locations)
    .bind(&dates)
    .bind(&salaries)
    .bind(&logos)
    .bind(&ago_times)
    .bind(&first_seen)
    .bind(&last_seen)
    .execute(&mut *transaction)
    .await?;

    transaction.commit().await?;

    Ok(result)
}

pub struct PgJobStore {
    pool: PgPool,
}

impl PgJobStore {
    pub fn new(pool: PgPool) -> Self {
        PgJobStore { pool }
    }
}

#[async_trait]
impl JobStore for PgJobStore {
    async fn existing_identity_keys(&self) -> anyhow::Result<HashSet<String>> {
        get_job_base_urls(&self.pool)
            .await
            .context("Failed to select job base urls")
    }

    async fn insert_batch(&self, records: &[JobRecord]) -> anyhow::Result<u64> {
        let result = insert_jobs(&self.pool, records)
            .await
            .context("Failed to insert jobs")?;

        Ok(result.rows_affected())
    }
}
