use crate::error::{GitHubQueryError, Result};
use crate::pagination::clamp_per_page;
use crate::retry::RetryPolicy;
use reqwest::header::HeaderValue;
use std::fmt;
use std::time::Duration;
use url::Url;

pub const DEFAULT_API_URL: &str = "https://api.github.com";
pub const DEFAULT_USER_AGENT: &str = "github-query-client/0.1.0";
const DEFAULT_TIMEOUT_SECS: u64 = 30;

/// Immutable client configuration, supplied by the caller.
#[derive(Clone)]
pub struct ClientConfig {
    pub base_url: Url,
    pub token: Option<String>,
    pub per_page: u32,
    pub retry: RetryPolicy,
    pub user_agent: String,
    pub timeout: Duration,
    pub max_pages: Option<u32>,
}

impl ClientConfig {
    pub fn builder() -> ClientConfigBuilder {
        ClientConfigBuilder::default()
    }

    /// Join an API path such as `/orgs/rust-lang/repos` onto the base URL.
    pub(crate) fn endpoint(&self, path: &str) -> Result<Url> {
        let joined = format!("{}{}", self.base_url.as_str().trim_end_matches('/'), path);
        Url::parse(&joined)
            .map_err(|e| GitHubQueryError::Validation(format!("Invalid API path {}: {}", path, e)))
    }
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self {
            base_url: Url::parse(DEFAULT_API_URL).expect("default API URL is valid"),
            token: None,
            per_page: 100,
            retry: RetryPolicy::default(),
            user_agent: DEFAULT_USER_AGENT.to_string(),
            timeout: Duration::from_secs(DEFAULT_TIMEOUT_SECS),
            max_pages: None,
        }
    }
}

// Keep the token out of debug output.
impl fmt::Debug for ClientConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ClientConfig")
            .field("base_url", &self.base_url.as_str())
            .field("token", &self.token.as_ref().map(|_| "<redacted>"))
            .field("per_page", &self.per_page)
            .field("retry", &self.retry)
            .field("user_agent", &self.user_agent)
            .field("timeout", &self.timeout)
            .field("max_pages", &self.max_pages)
            .finish()
    }
}

#[derive(Debug, Default)]
pub struct ClientConfigBuilder {
    base_url: Option<String>,
    token: Option<String>,
    per_page: Option<u32>,
    retry: Option<RetryPolicy>,
    user_agent: Option<String>,
    timeout: Option<Duration>,
    max_pages: Option<u32>,
}

impl ClientConfigBuilder {
    pub fn base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = Some(base_url.into());
        self
    }

    /// Bearer token. Empty or whitespace-only tokens are treated as absent.
    pub fn token(mut self, token: impl Into<String>) -> Self {
        let token = token.into();
        self.token = if token.trim().is_empty() {
            None
        } else {
            Some(token.trim().to_string())
        };
        self
    }

    pub fn maybe_token(self, token: Option<String>) -> Self {
        match token {
            Some(token) => self.token(token),
            None => self,
        }
    }

    pub fn per_page(mut self, per_page: u32) -> Self {
        self.per_page = Some(per_page);
        self
    }

    pub fn retry(mut self, retry: RetryPolicy) -> Self {
        self.retry = Some(retry);
        self
    }

    pub fn user_agent(mut self, user_agent: impl Into<String>) -> Self {
        self.user_agent = Some(user_agent.into());
        self
    }

    pub fn timeout(mut self, timeout: Duration) -> Self {
        self.timeout = Some(timeout);
        self
    }

    pub fn max_pages(mut self, max_pages: u32) -> Self {
        self.max_pages = Some(max_pages.max(1));
        self
    }

    pub fn build(self) -> Result<ClientConfig> {
        let defaults = ClientConfig::default();

        let base_url = match self.base_url {
            Some(raw) => {
                let url = Url::parse(raw.trim()).map_err(|e| {
                    GitHubQueryError::Config(format!("Invalid base URL {}: {}", raw, e))
                })?;
                if !matches!(url.scheme(), "http" | "https") {
                    return Err(GitHubQueryError::Config(format!(
                        "Base URL must be http or https: {}",
                        raw
                    )));
                }
                url
            }
            None => defaults.base_url,
        };

        if let Some(token) = &self.token {
            HeaderValue::from_str(&format!("Bearer {}", token)).map_err(|_| {
                GitHubQueryError::Config(
                    "GitHub token contains characters not allowed in an HTTP header".to_string(),
                )
            })?;
        }

        Ok(ClientConfig {
            base_url,
            token: self.token,
            per_page: clamp_per_page(self.per_page.unwrap_or(defaults.per_page)),
            retry: self.retry.unwrap_or(defaults.retry),
            user_agent: self.user_agent.unwrap_or(defaults.user_agent),
            timeout: self.timeout.unwrap_or(defaults.timeout),
            max_pages: self.max_pages,
        })
    }
}
