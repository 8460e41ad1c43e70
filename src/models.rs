use crate::error::GitHubQueryError;
use chrono::{DateTime, Utc};
use reqwest::header::HeaderMap;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use std::time::Duration;

/// Remaining-call count at which a warning is logged.
pub const LOW_RATE_LIMIT_THRESHOLD: u32 = 10;

/// Slack added after the reported reset before retrying.
pub const RESET_BUFFER: Duration = Duration::from_secs(1);

/// Largest `Retry-After` honoured as-is; longer values are clamped.
pub const MAX_RETRY_AFTER: Duration = Duration::from_secs(24 * 60 * 60);

/// Rate limit state parsed from one response's `X-RateLimit-*` headers
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct RateLimitState {
    pub remaining: Option<u32>,
    pub limit: Option<u32>,
    pub used: Option<u32>,
    pub reset_time: Option<DateTime<Utc>>,
    pub resource: Option<String>,
    pub is_limited: bool,
}

impl RateLimitState {
    pub fn from_headers(headers: &HeaderMap) -> Self {
        let remaining = header_value::<u32>(headers, "X-RateLimit-Remaining");
        let reset_time = header_value::<i64>(headers, "X-RateLimit-Reset")
            .and_then(|timestamp| DateTime::from_timestamp(timestamp, 0));

        RateLimitState {
            remaining,
            limit: header_value(headers, "X-RateLimit-Limit"),
            used: header_value(headers, "X-RateLimit-Used"),
            reset_time,
            resource: header_value(headers, "X-RateLimit-Resource"),
            is_limited: remaining == Some(0),
        }
    }

    pub fn is_low(&self) -> bool {
        self.remaining
            .map(|remaining| remaining < LOW_RATE_LIMIT_THRESHOLD)
            .unwrap_or(false)
    }

    /// Time left until the quota resets, never negative.
    pub fn wait_until_reset(&self, now: DateTime<Utc>) -> Duration {
        self.reset_time
            .and_then(|reset| (reset - now).to_std().ok())
            .unwrap_or(Duration::ZERO)
    }

    /// How long to wait before retrying a rate-limited call, with
    /// [`RESET_BUFFER`] so the retry lands after the quota has reset.
    pub fn retry_wait(&self, now: DateTime<Utc>) -> Duration {
        self.wait_until_reset(now) + RESET_BUFFER
    }
}

fn header_value<T: FromStr>(headers: &HeaderMap, name: &str) -> Option<T> {
    headers
        .get(name)
        .and_then(|h| h.to_str().ok())
        .and_then(|s| s.trim().parse::<T>().ok())
}

/// Seconds requested by a `Retry-After` header (secondary rate limits),
/// capped at [`MAX_RETRY_AFTER`].
pub fn retry_after(headers: &HeaderMap) -> Option<Duration> {
    header_value::<u64>(headers, "Retry-After")
        .map(|secs| Duration::from_secs(secs).min(MAX_RETRY_AFTER))
}

/// State filter accepted by the issue and pull request listings
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum IssueState {
    #[default]
    Open,
    Closed,
    All,
}

impl IssueState {
    pub fn as_str(&self) -> &'static str {
        match self {
            IssueState::Open => "open",
            IssueState::Closed => "closed",
            IssueState::All => "all",
        }
    }
}

impl FromStr for IssueState {
    type Err = GitHubQueryError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim() {
            "open" => Ok(IssueState::Open),
            "closed" => Ok(IssueState::Closed),
            "all" => Ok(IssueState::All),
            other => Err(GitHubQueryError::Validation(format!(
                "State must be 'open', 'closed', or 'all', got '{}'",
                other
            ))),
        }
    }
}

impl fmt::Display for IssueState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Which repository listing an owner name refers to
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum OwnerType {
    Org,
    User,
    /// Probe the organization endpoint first, then the user endpoint.
    #[default]
    Auto,
}

impl FromStr for OwnerType {
    type Err = GitHubQueryError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim() {
            "org" => Ok(OwnerType::Org),
            "user" => Ok(OwnerType::User),
            "auto" => Ok(OwnerType::Auto),
            other => Err(GitHubQueryError::Validation(format!(
                "Owner type must be 'org', 'user', or 'auto', got '{}'",
                other
            ))),
        }
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum SearchSort {
    Stars,
    Forks,
    HelpWantedIssues,
    #[default]
    Updated,
}

impl SearchSort {
    pub fn as_str(&self) -> &'static str {
        match self {
            SearchSort::Stars => "stars",
            SearchSort::Forks => "forks",
            SearchSort::HelpWantedIssues => "help-wanted-issues",
            SearchSort::Updated => "updated",
        }
    }
}

impl FromStr for SearchSort {
    type Err = GitHubQueryError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim() {
            "stars" => Ok(SearchSort::Stars),
            "forks" => Ok(SearchSort::Forks),
            "help-wanted-issues" => Ok(SearchSort::HelpWantedIssues),
            "updated" => Ok(SearchSort::Updated),
            other => Err(GitHubQueryError::Validation(format!(
                "Sort must be one of: stars, forks, help-wanted-issues, updated; got '{}'",
                other
            ))),
        }
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum SortOrder {
    Asc,
    #[default]
    Desc,
}

impl SortOrder {
    pub fn as_str(&self) -> &'static str {
        match self {
            SortOrder::Asc => "asc",
            SortOrder::Desc => "desc",
        }
    }
}

impl FromStr for SortOrder {
    type Err = GitHubQueryError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim() {
            "asc" => Ok(SortOrder::Asc),
            "desc" => Ok(SortOrder::Desc),
            other => Err(GitHubQueryError::Validation(format!(
                "Order must be 'asc' or 'desc', got '{}'",
                other
            ))),
        }
    }
}
