//! Transport core: one request executor that handles auth, retries, rate limits
//! and `Link` header pagination for every query.

use crate::config::ClientConfig;
use crate::error::{GitHubQueryError, Result};
use crate::models::{retry_after, RateLimitState};
use crate::pagination::{parse_link_header, Page};
use crate::retry::{Sleeper, TokioSleeper};
use chrono::{DateTime, Utc};
use reqwest::header::{HeaderMap, HeaderValue, ACCEPT, LINK};
use reqwest::{Client, Method, Response, StatusCode};
use serde::de::DeserializeOwned;
use std::fmt;
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, error, warn, Level};
use url::Url;

const API_VERSION: &str = "2022-11-28";

/// Where a request goes: an API path joined onto the base URL, or a
/// next-page cursor URL handed out by the server.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RequestTarget {
    Path(String),
    Cursor(String),
}

impl From<&str> for RequestTarget {
    fn from(path: &str) -> Self {
        RequestTarget::Path(path.to_string())
    }
}

impl From<String> for RequestTarget {
    fn from(path: String) -> Self {
        RequestTarget::Path(path)
    }
}

/// A successful response with its body read into memory.
#[derive(Debug, Clone)]
pub struct ApiResponse {
    pub status: u16,
    pub body: Vec<u8>,
    pub rate_limit: RateLimitState,
    /// Absolute URL of the next page, from the `Link` header.
    pub next: Option<String>,
    /// Page number of the `rel="last"` link, when present.
    pub last_page: Option<u32>,
}

impl ApiResponse {
    pub fn json<T: DeserializeOwned>(&self) -> Result<T> {
        Ok(serde_json::from_slice(&self.body)?)
    }
}

enum Outcome {
    Success(ApiResponse),
    Retry {
        error: GitHubQueryError,
        delay: Option<Duration>,
    },
    Fatal(GitHubQueryError),
}

#[derive(Clone)]
pub struct GitHubClient {
    http: Client,
    config: Arc<ClientConfig>,
    sleeper: Arc<dyn Sleeper>,
}

impl GitHubClient {
    pub fn new(config: ClientConfig) -> Result<Self> {
        let mut headers = HeaderMap::new();
        headers.insert(ACCEPT, HeaderValue::from_static("application/vnd.github+json"));
        headers.insert("x-github-api-version", HeaderValue::from_static(API_VERSION));

        let http = Client::builder()
            .user_agent(config.user_agent.as_str())
            .default_headers(headers)
            .timeout(config.timeout)
            .build()
            .map_err(|e| GitHubQueryError::Config(format!("Failed to build HTTP client: {}", e)))?;

        if config.token.is_none() {
            warn!("No GitHub token provided; requests use the anonymous rate limit");
        }

        Ok(GitHubClient {
            http,
            config: Arc::new(config),
            sleeper: Arc::new(TokioSleeper),
        })
    }

    /// Replace the sleeper used for backoff and rate-limit waits.
    pub fn with_sleeper(mut self, sleeper: Arc<dyn Sleeper>) -> Self {
        self.sleeper = sleeper;
        self
    }

    pub fn config(&self) -> &ClientConfig {
        &self.config
    }

    /// Execute one logical request, retrying transient failures and short
    /// rate-limit waits up to the configured attempt cap.
    pub async fn execute(
        &self,
        method: Method,
        target: &RequestTarget,
        query: &[(&str, String)],
        body: Option<&serde_json::Value>,
    ) -> Result<ApiResponse> {
        self.send_with_retries(method, target, query, body, false).await
    }

    async fn send_with_retries(
        &self,
        method: Method,
        target: &RequestTarget,
        query: &[(&str, String)],
        body: Option<&serde_json::Value>,
        missing_ok: bool,
    ) -> Result<ApiResponse> {
        let url = self.resolve(target, query)?;
        let policy = self.config.retry;
        let mut attempts = 0u32;

        loop {
            attempts += 1;
            debug!(%method, %url, attempt = attempts, "Issuing GitHub API request");

            let mut request = self.http.request(method.clone(), url.clone());
            if let Some(token) = &self.config.token {
                request = request.bearer_auth(token);
            }
            if let Some(body) = body {
                request = request.json(body);
            }

            let outcome = match request.send().await {
                Ok(response) => self.classify(response, attempts).await,
                // The request could not be built (e.g. a token that is not a
                // valid header value); no retry can fix that
                Err(source) if source.is_builder() => Outcome::Fatal(GitHubQueryError::Config(
                    format!("Failed to build GitHub API request: {}", source),
                )),
                Err(source) => Outcome::Retry {
                    error: GitHubQueryError::TransientNetwork { attempts, source },
                    delay: None,
                },
            };

            match outcome {
                Outcome::Success(response) => return Ok(response),
                Outcome::Fatal(err) => {
                    log_terminal(&url, attempts, &err, missing_ok);
                    return Err(err);
                }
                Outcome::Retry { error: err, delay } => {
                    if !policy.allows_another_attempt(attempts) {
                        error!(%url, attempts, error = %err, "GitHub API request failed after retries");
                        return Err(err);
                    }

                    let delay = delay.unwrap_or_else(|| policy.backoff_delay(attempts));
                    warn!(
                        %url,
                        attempt = attempts,
                        delay_ms = delay.as_millis() as u64,
                        error = %err,
                        "Retrying GitHub API request"
                    );
                    self.sleeper.sleep(delay).await;
                }
            }
        }
    }

    async fn classify(&self, response: Response, attempts: u32) -> Outcome {
        let status = response.status();
        let headers = response.headers().clone();
        let rate_limit = RateLimitState::from_headers(&headers);
        let links = headers
            .get(LINK)
            .and_then(|h| h.to_str().ok())
            .map(parse_link_header)
            .unwrap_or_default();

        let body = match response.bytes().await {
            Ok(bytes) => bytes.to_vec(),
            Err(source) => {
                return Outcome::Retry {
                    error: GitHubQueryError::TransientNetwork { attempts, source },
                    delay: None,
                }
            }
        };

        if status.is_success() {
            if rate_limit.is_low() {
                warn!(
                    remaining = ?rate_limit.remaining,
                    reset_in_secs = rate_limit.wait_until_reset(Utc::now()).as_secs(),
                    "GitHub rate limit nearly exhausted"
                );
            }
            return Outcome::Success(ApiResponse {
                status: status.as_u16(),
                body,
                rate_limit,
                last_page: links.last_page(),
                next: links.next,
            });
        }

        let message = error_message(status, &body);

        if is_rate_limited(status, &headers, &rate_limit, &message) {
            let now = Utc::now();
            let wait = retry_after(&headers).unwrap_or_else(|| rate_limit.retry_wait(now));
            let reset_at = rate_limit.reset_time.unwrap_or_else(|| {
                chrono::Duration::from_std(wait)
                    .ok()
                    .and_then(|delta| now.checked_add_signed(delta))
                    .unwrap_or(DateTime::<Utc>::MAX_UTC)
            });
            let err = GitHubQueryError::RateLimit { reset_at, wait };

            if !self.config.retry.accepts_rate_limit_wait(wait) {
                return Outcome::Fatal(err);
            }

            warn!(%reset_at, wait_secs = wait.as_secs(), "GitHub rate limit hit");
            return Outcome::Retry {
                error: err,
                delay: Some(wait),
            };
        }

        let err = GitHubQueryError::Api {
            status: status.as_u16(),
            message,
        };

        if status.is_server_error() {
            Outcome::Retry {
                error: err,
                delay: None,
            }
        } else {
            Outcome::Fatal(err)
        }
    }

    /// One GET, decoded into `T`.
    pub async fn get_json<T: DeserializeOwned>(
        &self,
        path: &str,
        query: &[(&str, String)],
    ) -> Result<T> {
        self.execute(Method::GET, &RequestTarget::from(path), query, None)
            .await?
            .json()
    }

    /// One GET where 404 means the resource is absent: `Ok(None)`, logged at
    /// debug instead of as a failure.
    pub async fn get_optional_json<T: DeserializeOwned>(
        &self,
        path: &str,
        query: &[(&str, String)],
    ) -> Result<Option<T>> {
        let target = RequestTarget::from(path);
        match self.send_with_retries(Method::GET, &target, query, None, true).await {
            Ok(response) => response.json().map(Some),
            Err(e) if e.is_not_found() => Ok(None),
            Err(e) => Err(e),
        }
    }

    /// Fetch a single page. Pass the previous page's `next` as a
    /// [`RequestTarget::Cursor`] to continue, or the path again to restart.
    pub async fn get_page<T: DeserializeOwned>(
        &self,
        target: &RequestTarget,
        query: &[(&str, String)],
    ) -> Result<Page<T>> {
        let response = self.execute(Method::GET, target, query, None).await?;
        let items: Vec<T> = response.json()?;

        Ok(Page {
            items,
            next: response.next,
            last_page: response.last_page,
            rate_limit: response.rate_limit,
        })
    }

    /// Follow `rel="next"` links from `path` until the last page, concatenating
    /// records in server order. Any failure aborts the whole sweep.
    pub async fn get_all_pages<T: DeserializeOwned>(
        &self,
        path: &str,
        query: &[(&str, String)],
    ) -> Result<Vec<T>> {
        let mut target = RequestTarget::from(path);
        let mut all_items = Vec::new();
        let mut pages = 0u32;

        loop {
            // The cursor URL already carries the original query parameters
            let page_query = if pages == 0 { query } else { &[] };
            let page = self.get_page::<T>(&target, page_query).await?;
            pages += 1;

            if pages == 1 {
                if let Some(last_page) = page.last_page {
                    debug!(path, total_pages = last_page, "Paginated listing");
                }
            }

            let is_last = page.is_last();
            let count = page.items.len();
            all_items.extend(page.items);
            debug!(path, page = pages, records = count, total = all_items.len(), "Fetched page");

            if is_last {
                break;
            }

            if let Some(max_pages) = self.config.max_pages {
                if pages >= max_pages {
                    warn!(path, pages, "Stopping pagination at configured page limit");
                    break;
                }
            }

            match page.next {
                Some(next) => target = RequestTarget::Cursor(next),
                None => break,
            }
        }

        Ok(all_items)
    }

    fn resolve(&self, target: &RequestTarget, query: &[(&str, String)]) -> Result<Url> {
        match target {
            RequestTarget::Path(path) => {
                validate_path(path)?;
                let mut url = self.config.endpoint(path)?;
                if !query.is_empty() {
                    let mut pairs = url.query_pairs_mut();
                    for (key, value) in query {
                        pairs.append_pair(key, value);
                    }
                }
                Ok(url)
            }
            RequestTarget::Cursor(raw) => {
                let url = Url::parse(raw).map_err(|e| {
                    GitHubQueryError::Validation(format!("Invalid page cursor {}: {}", raw, e))
                })?;
                // Never send the token to a host other than the configured API
                if url.origin() != self.config.base_url.origin() {
                    return Err(GitHubQueryError::Validation(format!(
                        "Page cursor {} does not belong to {}",
                        raw, self.config.base_url
                    )));
                }
                Ok(url)
            }
        }
    }
}

impl fmt::Debug for GitHubClient {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("GitHubClient")
            .field("config", &self.config)
            .finish_non_exhaustive()
    }
}

fn validate_path(path: &str) -> Result<()> {
    let valid = path.starts_with('/')
        && !path.contains("//")
        && !path.contains('?')
        && !path.chars().any(char::is_whitespace)
        && !path.split('/').any(|segment| segment == "..");

    if valid {
        Ok(())
    } else {
        Err(GitHubQueryError::Validation(format!("Invalid API path: {:?}", path)))
    }
}

fn is_rate_limited(
    status: StatusCode,
    headers: &HeaderMap,
    rate_limit: &RateLimitState,
    message: &str,
) -> bool {
    match status {
        StatusCode::TOO_MANY_REQUESTS => true,
        StatusCode::FORBIDDEN => {
            rate_limit.is_limited
                || headers.contains_key("Retry-After")
                || message.to_lowercase().contains("rate limit")
        }
        _ => false,
    }
}

/// GitHub error bodies are `{"message": "...", "documentation_url": "..."}`.
fn error_message(status: StatusCode, body: &[u8]) -> String {
    let from_json = serde_json::from_slice::<serde_json::Value>(body)
        .ok()
        .and_then(|v| v.get("message").and_then(|m| m.as_str()).map(str::to_string));

    match from_json {
        Some(message) => message,
        None => {
            let text = String::from_utf8_lossy(body).trim().to_string();
            if text.is_empty() {
                status.canonical_reason().unwrap_or("Unknown error").to_string()
            } else {
                text
            }
        }
    }
}

/// 404 is only routine for lookups that treat it as "absent".
fn terminal_level(err: &GitHubQueryError, missing_ok: bool) -> Level {
    if missing_ok && err.is_not_found() {
        Level::DEBUG
    } else {
        Level::ERROR
    }
}

fn log_terminal(url: &Url, attempts: u32, err: &GitHubQueryError, missing_ok: bool) {
    if terminal_level(err, missing_ok) == Level::DEBUG {
        debug!(%url, "GitHub resource not found");
        return;
    }

    match err {
        GitHubQueryError::RateLimit { reset_at, wait } => error!(
            %url,
            %reset_at,
            wait_secs = wait.as_secs(),
            "GitHub rate limit exhausted; reset is beyond the acceptable wait"
        ),
        err => error!(%url, attempts, error = %err, "GitHub API request failed"),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;

    fn client() -> GitHubClient {
        let config = ClientConfig::builder()
            .base_url("https://api.github.com")
            .build()
            .unwrap();
        GitHubClient::new(config).unwrap()
    }

    #[rstest]
    #[case::org_repos("/orgs/rust-lang/repos", true)]
    #[case::readme("/repos/o/r/readme", true)]
    #[case::relative("orgs/rust-lang/repos", false)]
    #[case::empty("", false)]
    #[case::double_slash("/repos//readme", false)]
    #[case::traversal("/repos/../admin", false)]
    #[case::whitespace("/orgs/rust lang/repos", false)]
    #[case::inline_query("/orgs/x/repos?page=2", false)]
    fn test_validate_path(#[case] path: &str, #[case] valid: bool) {
        assert_eq!(validate_path(path).is_ok(), valid);
    }

    #[test]
    fn test_resolve_path_appends_query() {
        let url = client()
            .resolve(
                &RequestTarget::from("/repos/o/r/issues"),
                &[("state", "all".to_string()), ("per_page", "100".to_string())],
            )
            .unwrap();
        assert_eq!(
            url.as_str(),
            "https://api.github.com/repos/o/r/issues?state=all&per_page=100"
        );
    }

    #[test]
    fn test_resolve_cursor_rejects_foreign_host() {
        let client = client();
        let ok = client.resolve(
            &RequestTarget::Cursor("https://api.github.com/organizations/1/repos?page=2".into()),
            &[],
        );
        assert!(ok.is_ok());

        let foreign = client.resolve(
            &RequestTarget::Cursor("https://evil.example.com/repos?page=2".into()),
            &[],
        );
        assert!(matches!(foreign, Err(GitHubQueryError::Validation(_))));
    }

    #[rstest]
    #[case::missing_readme(GitHubQueryError::Api { status: 404, message: "Not Found".into() }, true, Level::DEBUG)]
    #[case::missing_org(GitHubQueryError::Api { status: 404, message: "Not Found".into() }, false, Level::ERROR)]
    #[case::forbidden(GitHubQueryError::Api { status: 403, message: "Forbidden".into() }, true, Level::ERROR)]
    #[case::config(GitHubQueryError::Config("bad token".into()), false, Level::ERROR)]
    fn test_terminal_level(
        #[case] err: GitHubQueryError,
        #[case] missing_ok: bool,
        #[case] expected: Level,
    ) {
        assert_eq!(terminal_level(&err, missing_ok), expected);
    }

    #[rstest]
    #[case::json_message(br#"{"message":"Not Found","documentation_url":"x"}"#.as_slice(), "Not Found")]
    #[case::plain_text(b"  upstream exploded  ".as_slice(), "upstream exploded")]
    #[case::empty(b"".as_slice(), "Service Unavailable")]
    fn test_error_message(#[case] body: &[u8], #[case] expected: &str) {
        assert_eq!(error_message(StatusCode::SERVICE_UNAVAILABLE, body), expected);
    }

    #[test]
    fn test_rate_limit_detection() {
        let exhausted = RateLimitState {
            remaining: Some(0),
            is_limited: true,
            ..Default::default()
        };
        let headers = HeaderMap::new();

        assert!(is_rate_limited(StatusCode::FORBIDDEN, &headers, &exhausted, "x"));
        assert!(is_rate_limited(StatusCode::TOO_MANY_REQUESTS, &headers, &RateLimitState::default(), ""));
        assert!(is_rate_limited(
            StatusCode::FORBIDDEN,
            &headers,
            &RateLimitState::default(),
            "API rate limit exceeded for 1.2.3.4"
        ));
        assert!(!is_rate_limited(
            StatusCode::FORBIDDEN,
            &headers,
            &RateLimitState::default(),
            "Resource not accessible by integration"
        ));
        assert!(!is_rate_limited(StatusCode::NOT_FOUND, &headers, &exhausted, ""));
    }
}
