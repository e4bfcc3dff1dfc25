use serde::{Deserialize, Deserializer};
use url::form_urlencoded;

/// Upstream always serves this many cards per request.
pub const RESULTS_PER_PAGE: u32 = 25;

pub const DEFAULT_HOST: &str = "www.linkedin.com";
const SEARCH_PATH: &str = "/jobs-guest/jobs/api/seeMoreJobPostings/search";

/// A caller's search, as received. Nothing here is validated; `compile` decides
/// what survives onto the wire.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct FilterRequest {
    pub host: Option<String>,
    pub keyword: Option<String>,
    pub location: Option<String>,
    #[serde(deserialize_with = "deserialize_lenient_number")]
    pub distance: u32,
    pub date_since_posted: Option<String>,
    pub job_type: Option<String>,
    pub remote_filter: Option<String>,
    pub industry: Option<String>,
    pub experience_level: Option<String>,
    pub job_function: Option<String>,
    pub sort_by: Option<String>,
    #[serde(alias = "has_verification")]
    pub has_verification: bool,
    #[serde(alias = "under_10_applicants")]
    pub under_10_applicants: bool,
    pub active: bool,
    pub refresh: bool,
    #[serde(deserialize_with = "deserialize_lenient_number")]
    pub page: u32,
    #[serde(deserialize_with = "deserialize_lenient_number")]
    pub limit: u32,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DatePosted {
    PastMonth,
    PastWeek,
    Past24Hours,
}

impl DatePosted {
    pub fn parse(value: &str) -> Option<Self> {
        match value.trim().to_lowercase().as_str() {
            "past month" => Some(Self::PastMonth),
            "past week" => Some(Self::PastWeek),
            "24hr" => Some(Self::Past24Hours),
            _ => None,
        }
    }

    pub fn code(&self) -> &'static str {
        match self {
            Self::PastMonth => "r2592000",
            Self::PastWeek => "r604800",
            Self::Past24Hours => "r86400",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ExperienceLevel {
    Internship,
    EntryLevel,
    Associate,
    Senior,
    Director,
    Executive,
}

impl ExperienceLevel {
    pub fn parse(value: &str) -> Option<Self> {
        match value.trim().to_lowercase().as_str() {
            "internship" => Some(Self::Internship),
            "entry level" => Some(Self::EntryLevel),
            "associate" => Some(Self::Associate),
            "senior" => Some(Self::Senior),
            "director" => Some(Self::Director),
            "executive" => Some(Self::Executive),
            _ => None,
        }
    }

    pub fn code(&self) -> &'static str {
        match self {
            Self::Internship => "1",
            Self::EntryLevel => "2",
            Self::Associate => "3",
            Self::Senior => "4",
            Self::Director => "5",
            Self::Executive => "6",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum JobType {
    FullTime,
    PartTime,
    Contract,
    Temporary,
    Volunteer,
    Internship,
}

impl JobType {
    pub fn parse(value: &str) -> Option<Self> {
        match value.trim().to_lowercase().as_str() {
            "full time" | "full-time" => Some(Self::FullTime),
            "part time" | "part-time" => Some(Self::PartTime),
            "contract" => Some(Self::Contract),
            "temporary" => Some(Self::Temporary),
            "volunteer" => Some(Self::Volunteer),
            "internship" => Some(Self::Internship),
            _ => None,
        }
    }

    pub fn code(&self) -> &'static str {
        match self {
            Self::FullTime => "F",
            Self::PartTime => "P",
            Self::Contract => "C",
            Self::Temporary => "T",
            Self::Volunteer => "V",
            Self::Internship => "I",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RemoteFilter {
    OnSite,
    Remote,
    Hybrid,
}

impl RemoteFilter {
    pub fn parse(value: &str) -> Option<Self> {
        match value.trim().to_lowercase().as_str() {
            "on-site" | "on site" => Some(Self::OnSite),
            "remote" => Some(Self::Remote),
            "hybrid" => Some(Self::Hybrid),
            _ => None,
        }
    }

    pub fn code(&self) -> &'static str {
        match self {
            Self::OnSite => "1",
            Self::Remote => "2",
            Self::Hybrid => "3",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Industry {
    Marketing,
    Sales,
    BusinessDevelopment,
    InformationTechnology,
    HumanResources,
}

impl Industry {
    pub fn parse(value: &str) -> Option<Self> {
        match value.trim().to_lowercase().as_str() {
            "marketing" => Some(Self::Marketing),
            "sales" => Some(Self::Sales),
            "business development" => Some(Self::BusinessDevelopment),
            "information technology" => Some(Self::InformationTechnology),
            "human resources" => Some(Self::HumanResources),
            _ => None,
        }
    }

    // Sales and business development share a bucket upstream.
    pub fn code(&self) -> &'static str {
        match self {
            Self::Marketing => "4",
            Self::Sales | Self::BusinessDevelopment => "5",
            Self::InformationTechnology => "9",
            Self::HumanResources => "19",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum JobFunction {
    Sales,
    Management,
    Accounting,
    InformationTechnology,
    Marketing,
    HumanResources,
}

impl JobFunction {
    pub fn parse(value: &str) -> Option<Self> {
        match value.trim().to_lowercase().as_str() {
            "sale" => Some(Self::Sales),
            "mgmt" => Some(Self::Management),
            "acct" => Some(Self::Accounting),
            "it" => Some(Self::InformationTechnology),
            "mktg" => Some(Self::Marketing),
            "hr" => Some(Self::HumanResources),
            _ => None,
        }
    }

    pub fn code(&self) -> &'static str {
        match self {
            Self::Sales => "sale",
            Self::Management => "mgmt",
            Self::Accounting => "acct",
            Self::InformationTechnology => "it",
            Self::Marketing => "mktg",
            Self::HumanResources => "hr",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SortBy {
    Recent,
    Relevant,
}

impl SortBy {
    pub fn parse(value: &str) -> Option<Self> {
        match value.trim().to_lowercase().as_str() {
            "recent" => Some(Self::Recent),
            "relevant" => Some(Self::Relevant),
            _ => None,
        }
    }

    pub fn code(&self) -> &'static str {
        match self {
            Self::Recent => "DD",
            Self::Relevant => "R",
        }
    }
}

/// Whether a query hands back everything upstream returned or only listings
/// the store has never seen. The two never share cache entries.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum QueryMode {
    Plain,
    NewOnly,
}

impl QueryMode {
    pub fn as_str(&self) -> &'static str {
        match self {
            QueryMode::Plain => "all",
            QueryMode::NewOnly => "newOnly",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CompiledQuery {
    host: String,
    params: Vec<(&'static str, String)>,
    sort_by: Option<SortBy>,
    page_offset: u32,
    limit: u32,
    keyword: Option<String>,
    mode: QueryMode,
}

impl FilterRequest {
    pub fn compile(&self, mode: QueryMode) -> CompiledQuery {
        let host = self
            .host
            .as_deref()
            .map(str::trim)
            .filter(|h| !h.is_empty())
            .unwrap_or(DEFAULT_HOST)
            .to_string();
        let keyword = join_free_text(self.keyword.as_deref());
        let location = join_free_text(self.location.as_deref());

        let mut params: Vec<(&'static str, String)> = vec![];

        if let Some(keyword) = &keyword {
            params.push(("keywords", keyword.clone()));
        }
        if let Some(location) = location {
            params.push(("location", location));
        }
        if let Some(date) = self.date_since_posted.as_deref().and_then(DatePosted::parse) {
            params.push(("f_TPR", date.code().to_string()));
        }
        if let Some(industry) = self.industry.as_deref().and_then(Industry::parse) {
            params.push(("f_SB2", industry.code().to_string()));
        }
        if let Some(level) = self.experience_level.as_deref().and_then(ExperienceLevel::parse) {
            params.push(("f_E", level.code().to_string()));
        }
        if let Some(remote) = self.remote_filter.as_deref().and_then(RemoteFilter::parse) {
            params.push(("f_WT", remote.code().to_string()));
        }
        if let Some(job_type) = self.job_type.as_deref().and_then(JobType::parse) {
            params.push(("f_JT", job_type.code().to_string()));
        }
        // Upstream reads an explicit "false" differently from a missing flag.
        params.push(("f_VJ", self.has_verification.to_string()));
        params.push(("f_EA", self.under_10_applicants.to_string()));
        if self.distance > 0 {
            params.push(("distance", self.distance.to_string()));
        }
        if self.active {
            params.push(("f_AL", "true".to_string()));
        }
        if let Some(function) = self.job_function.as_deref().and_then(JobFunction::parse) {
            params.push(("f_F", function.code().to_string()));
        }
        if self.refresh {
            params.push(("refresh", "true".to_string()));
        }

        CompiledQuery {
            host,
            params,
            sort_by: self.sort_by.as_deref().and_then(SortBy::parse),
            page_offset: self.page.saturating_mul(RESULTS_PER_PAGE),
            limit: self.limit,
            keyword,
            mode,
        }
    }
}

impl CompiledQuery {
    /// Absolute request URL for the batch starting `batch_start` records past
    /// the requested page.
    pub fn url_for(&self, batch_start: u32) -> String {
        let mut query = form_urlencoded::Serializer::new(String::new());
        for (key, value) in self.params.iter() {
            query.append_pair(key, value);
        }
        query.append_pair(
            "start",
            &batch_start.saturating_add(self.page_offset).to_string(),
        );
        if let Some(sort_by) = self.sort_by {
            query.append_pair("sortBy", sort_by.code());
        }

        format!("https://{}{}?{}", self.host, SEARCH_PATH, query.finish())
    }

    pub fn cache_key(&self) -> String {
        format!(
            "{}_limit:{}_{}",
            self.url_for(0),
            self.limit,
            self.mode.as_str()
        )
    }

    /// `None` means unbounded.
    pub fn limit(&self) -> Option<usize> {
        match self.limit {
            0 => None,
            limit => Some(limit as usize),
        }
    }

    pub fn mode(&self) -> QueryMode {
        self.mode
    }

    /// Keyword as the user would read it, join tokens turned back into spaces.
    pub fn keyword(&self) -> Option<String> {
        self.keyword.as_ref().map(|k| k.replace('+', " "))
    }
}

fn join_free_text(value: Option<&str>) -> Option<String> {
    let joined = value?.split_whitespace().collect::<Vec<&str>>().join("+");
    match joined.is_empty() {
        true => None,
        false => Some(joined),
    }
}

/// Numbers may arrive as JSON numbers or strings; anything unusable is zero.
fn deserialize_lenient_number<'de, D>(deserializer: D) -> Result<u32, D::Error>
where
    D: Deserializer<'de>,
{
    let value = Option::<serde_json::Value>::deserialize(deserializer)?;

    let number = match value {
        Some(serde_json::Value::Number(n)) => n.as_f64(),
        Some(serde_json::Value::String(s)) => s.trim().parse::<f64>().ok(),
        _ => None,
    };

    Ok(match number {
        Some(n) if n.is_finite() && n > 0.0 => n.min(u32::MAX as f64) as u32,
        _ => 0,
    })
}
