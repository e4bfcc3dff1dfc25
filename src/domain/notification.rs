use chrono::{DateTime, Utc};
use serde::Serialize;

use super::job::{JobRecord, SALARY_NOT_SPECIFIED};

const EMBED_COLOR: u32 = 0x0a66c2;

/// One webhook message worth of new jobs.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct NotificationBatch {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub content: Option<String>,
    pub embeds: Vec<JobEmbed>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct JobEmbed {
    pub title: String,
    pub url: String,
    pub description: String,
    pub color: u32,
    pub fields: Vec<EmbedField>,
    pub timestamp: String,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct EmbedField {
    pub name: String,
    pub value: String,
    pub inline: bool,
}

impl JobEmbed {
    fn new(job: &JobRecord, now: DateTime<Utc>) -> Self {
        let salary = match job.salary.is_empty() {
            true => SALARY_NOT_SPECIFIED.to_string(),
            false => job.salary.clone(),
        };
        let posted = match job.ago_time.is_empty() {
            true => job.date.clone(),
            false => job.ago_time.clone(),
        };

        JobEmbed {
            title: job.position.clone(),
            url: job.job_url.clone(),
            description: format!("**{}**\n{}", job.company, job.location),
            color: EMBED_COLOR,
            fields: vec![
                EmbedField {
                    name: "Salary".to_string(),
                    value: salary,
                    inline: true,
                },
                EmbedField {
                    name: "Posted".to_string(),
                    value: posted,
                    inline: true,
                },
            ],
            timestamp: now.to_rfc3339(),
        }
    }
}

impl NotificationBatch {
    /// Splits `jobs` into messages of at most `per_message` embeds. Only the
    /// first message carries the summary line.
    pub fn split(
        jobs: &[JobRecord],
        keyword: Option<&str>,
        per_message: usize,
        now: DateTime<Utc>,
    ) -> Vec<NotificationBatch> {
        if jobs.is_empty() {
            return vec![];
        }

        let plural = match jobs.len() {
            1 => "",
            _ => "s",
        };
        let summary = match keyword {
            Some(keyword) => format!(
                "**{} new job{} found** for \"{}\"",
                jobs.len(),
                plural,
                keyword
            ),
            None => format!("**{} new job{} found**", jobs.len(), plural),
        };

        jobs.chunks(per_message.max(1))
            .enumerate()
            .map(|(i, chunk)| NotificationBatch {
                content: match i {
                    0 => Some(summary.clone()),
                    _ => None,
                },
                embeds: chunk.iter().map(|job| JobEmbed::new(job, now)).collect(),
            })
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_support::job_record;

    #[test]
    fn splits_into_messages_of_ten() {
        let jobs: Vec<JobRecord> = (0..23).map(job_record).collect();

        let batches = NotificationBatch::split(&jobs, Some("rust intern"), 10, Utc::now());

        let sizes: Vec<usize> = batches.iter().map(|b| b.embeds.len()).collect();
        assert_eq!(sizes, vec![10, 10, 3]);
        assert_eq!(
            batches[0].content.as_deref(),
            Some("**23 new jobs found** for \"rust intern\"")
        );
        assert!(batches[1..].iter().all(|b| b.content.is_none()));
    }

    #[test]
    fn serializes_as_webhook_payload() {
        let batches = NotificationBatch::split(&[job_record(7)], None, 10, Utc::now());

        let payload = serde_json::to_value(&batches[0]).unwrap();

        assert_eq!(payload["content"], "**1 new job found**");
        let embed = &payload["embeds"][0];
        assert_eq!(embed["title"], "Software Engineer 7");
        assert_eq!(embed["description"], "**Company 7**\nSanta Clara, CA");
        assert_eq!(embed["fields"][0]["value"], "Not specified");
        assert_eq!(embed["fields"][1]["value"], "2 days ago");
        assert_eq!(embed["color"], 0x0a66c2);
    }

    #[test]
    fn later_messages_omit_content_field() {
        let jobs: Vec<JobRecord> = (0..2).map(job_record).collect();

        let batches = NotificationBatch::split(&jobs, None, 1, Utc::now());
        let payload = serde_json::to_value(&batches[1]).unwrap();

        assert!(payload.get("content").is_none());
    }
}
