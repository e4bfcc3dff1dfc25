use std::time::Duration;

use async_trait::async_trait;
use chrono::Utc;
use reqwest::Client;

use crate::{
    configuration::NotificationSettings,
    domain::{job::JobRecord, notification::NotificationBatch},
};

/// Told about net-new jobs after they are persisted. Delivery is best effort,
/// so implementations swallow and log their own failures.
#[async_trait]
pub trait JobNotifier: Send + Sync {
    async fn notify(&self, jobs: &[JobRecord], keyword: Option<&str>);
}

pub struct DiscordNotifier {
    client: Client,
    webhook_url: Option<String>,
    embeds_per_message: usize,
    message_delay: Duration,
}

impl DiscordNotifier {
    pub fn new(settings: &NotificationSettings) -> Self {
        DiscordNotifier {
            client: Client::new(),
            webhook_url: settings
                .discord_webhook
                .clone()
                .filter(|url| !url.trim().is_empty()),
            embeds_per_message: settings.embeds_per_message,
            message_delay: Duration::from_millis(settings.message_delay_millis),
        }
    }
}

#[async_trait]
impl JobNotifier for DiscordNotifier {
    async fn notify(&self, jobs: &[JobRecord], keyword: Option<&str>) {
        let Some(webhook_url) = &self.webhook_url else {
            return;
        };

        let batches = NotificationBatch::split(jobs, keyword, self.embeds_per_message, Utc::now());
        let total = batches.len();

        for (i, batch) in batches.into_iter().enumerate() {
            match self.client.post(webhook_url).json(&batch).send().await {
                Ok(res) if !res.status().is_success() => {
                    log::error!("Discord webhook error: {}", res.status());
                }
                Ok(_) => {}
                Err(e) => {
                    log::error!("Failed to send Discord notification: {:?}", e);
                    return;
                }
            }

            if i + 1 < total {
                tokio::time::sleep(self.message_delay).await;
            }
        }

        log::info!("Sent {} job notification(s) to Discord", jobs.len());
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_support::job_record;

    #[tokio::test]
    async fn without_webhook_nothing_is_sent() {
        let notifier = DiscordNotifier::new(&NotificationSettings {
            discord_webhook: Some("  ".to_string()),
            embeds_per_message: 10,
            message_delay_millis: 1000,
        });

        assert!(notifier.webhook_url.is_none());
        notifier.notify(&[job_record(1)], Some("rust")).await;
    }
}
