use std::sync::LazyLock;

use chrono::{DateTime, Utc};
use scraper::{ElementRef, Html, Selector};

use super::job::{base_url, parse_posted_ago, JobRecord, SALARY_NOT_SPECIFIED};

struct CardSelectors {
    card: Selector,
    title: Selector,
    company: Selector,
    location: Selector,
    time: Selector,
    salary: Selector,
    link: Selector,
    logo: Selector,
    list_date: Selector,
}

static SELECTORS: LazyLock<CardSelectors> = LazyLock::new(|| {
    let parse = |css: &str| Selector::parse(css).expect("static job card selector");
    CardSelectors {
        card: parse("li"),
        title: parse(".base-search-card__title"),
        company: parse(".base-search-card__subtitle"),
        location: parse(".job-search-card__location"),
        time: parse("time"),
        salary: parse(".job-search-card__salary-info"),
        link: parse(".base-card__full-link"),
        logo: parse(".artdeco-entity-image"),
        list_date: parse(".job-search-card__listdate, .job-search-card__listdate--new"),
    }
});

#[derive(Debug, thiserror::Error, PartialEq)]
pub enum CardError {
    #[error("job card has no listing link")]
    MissingLink,
}

/// Turns one page of search results into records. Broken cards are skipped
/// and a page without any card yields nothing, which the fetcher reads as the
/// end of the results.
pub fn parse_job_list(markup: &str) -> Vec<JobRecord> {
    let document = Html::parse_fragment(markup);
    let now = Utc::now();

    let cards: Vec<ElementRef> = document.select(&SELECTORS.card).collect();
    if cards.is_empty() {
        if !markup.trim().is_empty() {
            log::error!(
                "Listing page had {} bytes but no job cards, markup may have changed",
                markup.len()
            );
        }
        return vec![];
    }

    cards
        .into_iter()
        .enumerate()
        .filter_map(|(index, card)| match parse_job_card(card, now) {
            Ok(job) => job,
            Err(e) => {
                log::warn!("Error parsing job at index {}: {}", index, e);
                None
            }
        })
        .collect()
}

/// `Ok(None)` when the card lacks a position or a company.
pub fn parse_job_card(card: ElementRef, now: DateTime<Utc>) -> Result<Option<JobRecord>, CardError> {
    let position = text_of(card, &SELECTORS.title);
    let company = text_of(card, &SELECTORS.company);
    if position.is_empty() || company.is_empty() {
        return Ok(None);
    }

    let job_url = attr_of(card, &SELECTORS.link, "href").ok_or(CardError::MissingLink)?;

    let time = card.select(&SELECTORS.time).next();
    let date = time
        .and_then(|t| t.value().attr("datetime"))
        .unwrap_or_default()
        .to_string();
    let posted_text: String = time.map(|t| t.text().collect()).unwrap_or_default();

    let salary = text_of(card, &SELECTORS.salary)
        .split_whitespace()
        .collect::<Vec<&str>>()
        .join(" ");

    Ok(Some(JobRecord {
        position,
        company,
        location: text_of(card, &SELECTORS.location),
        date,
        salary: match salary.is_empty() {
            true => SALARY_NOT_SPECIFIED.to_string(),
            false => salary,
        },
        base_url: base_url(&job_url),
        job_url,
        company_logo: attr_of(card, &SELECTORS.logo, "data-delayed-url"),
        ago_time: text_of(card, &SELECTORS.list_date),
        posted_at: parse_posted_ago(&posted_text, now),
        first_seen: None,
        last_seen: None,
    }))
}

fn text_of(card: ElementRef, selector: &Selector) -> String {
    card.select(selector)
        .next()
        .map(|element| element.text().collect::<String>().trim().to_string())
        .unwrap_or_default()
}

fn attr_of(card: ElementRef, selector: &Selector, attr: &str) -> Option<String> {
    card.select(selector)
        .next()
        .and_then(|element| element.value().attr(attr))
        .map(str::trim)
        .filter(|value| !value.is_empty())
        .map(str::to_string)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_support::{job_base_url, job_card, job_url, listing_page};

    #[test]
    fn parses_every_card_on_a_page() {
        let jobs = parse_job_list(&listing_page(0..3));

        assert_eq!(jobs.len(), 3);
        let first = &jobs[0];
        assert_eq!(first.position, "Software Engineer 0");
        assert_eq!(first.company, "Company 0");
        assert_eq!(first.location, "Santa Clara, CA");
        assert_eq!(first.date, "2025-03-08");
        assert_eq!(first.salary, "$40/hr - $50/hr");
        assert_eq!(first.job_url, job_url(0));
        assert_eq!(first.base_url, job_base_url(0));
        assert_eq!(
            first.company_logo.as_deref(),
            Some("https://media.licdn.com/logo-0.png")
        );
        assert_eq!(first.ago_time, "2 days ago");
        assert!(first.posted_at.is_some());
        assert!(first.first_seen.is_none());
    }

    #[test]
    fn missing_salary_uses_placeholder() {
        let markup = r#"<li>
            <a class="base-card__full-link" href="https://www.linkedin.com/jobs/view/9?x=1"></a>
            <h3 class="base-search-card__title">Rust Developer</h3>
            <h4 class="base-search-card__subtitle">Oxide</h4>
        </li>"#;

        let jobs = parse_job_list(markup);

        assert_eq!(jobs.len(), 1);
        assert_eq!(jobs[0].salary, SALARY_NOT_SPECIFIED);
        assert_eq!(jobs[0].company_logo, None);
        assert_eq!(jobs[0].posted_at, None);
    }

    #[test]
    fn cards_without_identity_or_link_are_skipped() {
        let markup = format!(
            r#"{}
            <li><h3 class="base-search-card__title">No company</h3>
                <a class="base-card__full-link" href="https://www.linkedin.com/jobs/view/x"></a></li>
            <li><h4 class="base-search-card__subtitle">No title</h4></li>
            <li><h3 class="base-search-card__title">No link</h3>
                <h4 class="base-search-card__subtitle">Acme</h4></li>
            {}"#,
            job_card(1),
            job_card(2)
        );

        let jobs = parse_job_list(&markup);

        let urls: Vec<&str> = jobs.iter().map(|j| j.base_url.as_str()).collect();
        assert_eq!(urls, vec![job_base_url(1), job_base_url(2)]);
    }

    #[test]
    fn page_without_cards_is_empty() {
        assert!(parse_job_list("").is_empty());
        assert!(parse_job_list("<html><body><p>Please verify you are human</p></body></html>").is_empty());
        assert!(parse_job_list("<<<>>> not even html").is_empty());
    }
}
