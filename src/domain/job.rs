use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};
use url::Url;

pub const SALARY_NOT_SPECIFIED: &str = "Not specified";

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct JobRecord {
    pub position: String,
    pub company: String,
    pub location: String,
    pub date: String,
    pub salary: String,
    pub job_url: String,
    /// Identity of the listing: `job_url` without its query string.
    pub base_url: String,
    pub company_logo: Option<String>,
    pub ago_time: String,
    /// Display only. Derived from `ago_time`, so it drifts with every fetch.
    pub posted_at: Option<DateTime<Utc>>,
    pub first_seen: Option<DateTime<Utc>>,
    pub last_seen: Option<DateTime<Utc>>,
}

/// Origin plus path. Unparseable input falls back to everything before the
/// first `?`.
pub fn base_url(url: &str) -> String {
    match Url::parse(url) {
        Ok(parsed) => format!("{}{}", parsed.origin().ascii_serialization(), parsed.path()),
        Err(_) => match url.split_once('?') {
            Some((base, _)) => base.to_string(),
            None => url.to_string(),
        },
    }
}

/// Best effort reading of texts like "3 days ago" or "30+ minutes ago".
pub fn parse_posted_ago(text: &str, now: DateTime<Utc>) -> Option<DateTime<Utc>> {
    let text = text.to_lowercase();
    let mut words = text.split_whitespace();

    let value = words
        .by_ref()
        .find_map(|word| word.trim_end_matches('+').parse::<i64>().ok())?;
    let unit = words.next()?;

    let elapsed = match unit.trim_end_matches('s') {
        "second" => Duration::try_seconds(value)?,
        "minute" => Duration::try_minutes(value)?,
        "hour" => Duration::try_hours(value)?,
        "day" => Duration::try_days(value)?,
        "week" => Duration::try_weeks(value)?,
        "month" => Duration::try_days(value.checked_mul(30)?)?,
        _ => return None,
    };

    now.checked_sub_signed(elapsed)
}

#[cfg(test)]
mod tests {
    use chrono::TimeZone;

    use super::*;

    #[test]
    fn base_url_strips_query_string() {
        assert_eq!(
            base_url("https://www.linkedin.com/jobs/view/rust-dev-123?refId=a&trackingId=b"),
            "https://www.linkedin.com/jobs/view/rust-dev-123"
        );
        assert_eq!(
            base_url("https://www.linkedin.com/jobs/view/rust-dev-123?refId=zzz"),
            base_url("https://www.linkedin.com/jobs/view/rust-dev-123")
        );
    }

    #[test]
    fn base_url_falls_back_on_unparseable_input() {
        assert_eq!(base_url("/jobs/view/123?position=1"), "/jobs/view/123");
        assert_eq!(base_url("not a url"), "not a url");
    }

    #[test]
    fn posted_ago_subtracts_from_now() {
        let now = Utc.with_ymd_and_hms(2025, 3, 10, 12, 0, 0).unwrap();

        assert_eq!(
            parse_posted_ago("2 days ago", now),
            Some(Utc.with_ymd_and_hms(2025, 3, 8, 12, 0, 0).unwrap())
        );
        assert_eq!(
            parse_posted_ago("30+ minutes ago", now),
            Some(Utc.with_ymd_and_hms(2025, 3, 10, 11, 30, 0).unwrap())
        );
        assert_eq!(
            parse_posted_ago("1 week ago", now),
            Some(Utc.with_ymd_and_hms(2025, 3, 3, 12, 0, 0).unwrap())
        );
    }

    #[test]
    fn posted_ago_gives_up_on_vague_text() {
        let now = Utc::now();
        assert_eq!(parse_posted_ago("about a month ago", now), None);
        assert_eq!(parse_posted_ago("Just now", now), None);
        assert_eq!(parse_posted_ago("", now), None);
    }
}
