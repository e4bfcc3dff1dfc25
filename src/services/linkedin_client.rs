use async_trait::async_trait;
use reqwest::{
    header::{HeaderMap, HeaderValue, ACCEPT, ACCEPT_LANGUAGE, CACHE_CONTROL, PRAGMA, REFERER, USER_AGENT},
    Client, StatusCode,
};

use crate::configuration::ScraperSettings;

const FALLBACK_USER_AGENT: &str = "Mozilla/5.0";

/// Anything that can hand back one raw page of search results.
#[async_trait]
pub trait JobSource: Send + Sync {
    async fn fetch_page(&self, url: &str) -> Result<String, FetchError>;
}

#[derive(Debug, thiserror::Error)]
pub enum FetchError {
    #[error("request timed out")]
    Timeout,
    #[error("rate limit reached")]
    RateLimited,
    #[error("unexpected status {0}")]
    Status(u16),
    #[error("transport error: {0}")]
    Transport(#[source] reqwest::Error),
    #[error("invalid request: {0}")]
    InvalidRequest(String),
}

impl FetchError {
    /// Transient failures are retried with backoff; the rest point at a bug on
    /// our side and abort the query.
    pub fn is_transient(&self) -> bool {
        !matches!(self, FetchError::InvalidRequest(_))
    }
}

impl From<reqwest::Error> for FetchError {
    fn from(e: reqwest::Error) -> Self {
        if e.is_timeout() {
            FetchError::Timeout
        } else if e.is_builder() {
            FetchError::InvalidRequest(e.to_string())
        } else {
            FetchError::Transport(e)
        }
    }
}

pub struct LinkedinClient {
    client: Client,
    referer: String,
}

impl LinkedinClient {
    pub fn new(settings: &ScraperSettings) -> Result<Self, reqwest::Error> {
        let client = reqwest::Client::builder()
            .timeout(settings.request_timeout())
            .build()?;

        Ok(LinkedinClient {
            client,
            referer: format!("https://{}/jobs", settings.search_host),
        })
    }

    /// Browser-like headers with a fresh user agent on every call.
    fn headers(&self) -> HeaderMap {
        let mut headers = HeaderMap::new();

        let user_agent = HeaderValue::from_str(fake_user_agent::get_rua())
            .unwrap_or_else(|_| HeaderValue::from_static(FALLBACK_USER_AGENT));
        headers.insert(USER_AGENT, user_agent);
        headers.insert(
            ACCEPT,
            HeaderValue::from_static("application/json, text/javascript, */*; q=0.01"),
        );
        headers.insert(ACCEPT_LANGUAGE, HeaderValue::from_static("en-US,en;q=0.9"));
        if let Ok(referer) = HeaderValue::from_str(&self.referer) {
            headers.insert(REFERER, referer);
        }
        headers.insert("x-requested-with", HeaderValue::from_static("XMLHttpRequest"));
        headers.insert("sec-fetch-dest", HeaderValue::from_static("empty"));
        headers.insert("sec-fetch-mode", HeaderValue::from_static("cors"));
        headers.insert("sec-fetch-site", HeaderValue::from_static("same-origin"));
        headers.insert(CACHE_CONTROL, HeaderValue::from_static("no-cache"));
        headers.insert(PRAGMA, HeaderValue::from_static("no-cache"));

        headers
    }
}

#[async_trait]
impl JobSource for LinkedinClient {
    async fn fetch_page(&self, url: &str) -> Result<String, FetchError> {
        let response = self.client.get(url).headers(self.headers()).send().await?;

        match response.status() {
            StatusCode::OK => Ok(response.text().await?),
            StatusCode::TOO_MANY_REQUESTS => Err(FetchError::RateLimited),
            status => Err(FetchError::Status(status.as_u16())),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn only_invalid_requests_are_fatal() {
        assert!(FetchError::Timeout.is_transient());
        assert!(FetchError::RateLimited.is_transient());
        assert!(FetchError::Status(503).is_transient());
        assert!(!FetchError::InvalidRequest("bad header".to_string()).is_transient());
    }

    #[test]
    fn every_request_looks_like_a_browser() {
        let settings = ScraperSettings {
            search_host: "www.linkedin.com".to_string(),
            request_timeout_secs: 10,
            batch_size: 25,
            pacing_base_millis: 2000,
            pacing_jitter_millis: 1000,
            backoff_base_millis: 1000,
            max_consecutive_errors: 3,
        };
        let client = LinkedinClient::new(&settings).unwrap();

        let headers = client.headers();

        assert!(!headers[USER_AGENT].is_empty());
        assert_eq!(headers[REFERER], "https://www.linkedin.com/jobs");
        assert_eq!(headers["x-requested-with"], "XMLHttpRequest");
    }
}
