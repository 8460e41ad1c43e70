//! Read-only resource queries built on the transport core.
//!
//! Every operation validates its input before issuing any HTTP call and
//! returns raw JSON records in server order.

use crate::error::{GitHubQueryError, Result};
use crate::github::GitHubClient;
use crate::models::{IssueState, OwnerType, SearchSort, SortOrder};
use crate::pagination::{clamp_per_page, MAX_PER_PAGE};
use crate::types::{ReadmePayload, SearchResults};
use base64::engine::general_purpose::STANDARD;
use base64::Engine;
use serde_json::Value;
use tracing::{error, info, warn};

/// GitHub search only ever returns the first 1000 results.
pub const SEARCH_RESULT_CEILING: u32 = 1000;

type Query = Vec<(&'static str, String)>;

impl GitHubClient {
    /// All repositories of an organization.
    pub async fn list_org_repositories(
        &self,
        org: &str,
        per_page: Option<u32>,
    ) -> Result<Vec<Value>> {
        let org = require_name("Organization name", org)?;
        self.list_owner_repositories(OwnerType::Org, &org, per_page).await
    }

    /// All repositories of a user account.
    pub async fn list_user_repositories(
        &self,
        user: &str,
        per_page: Option<u32>,
    ) -> Result<Vec<Value>> {
        let user = require_name("User name", user)?;
        self.list_owner_repositories(OwnerType::User, &user, per_page).await
    }

    /// Repositories of an organization or user. [`OwnerType::Auto`] probes the
    /// organization endpoint first and falls back to the user endpoint.
    pub async fn list_repositories(
        &self,
        owner: &str,
        owner_type: OwnerType,
        per_page: Option<u32>,
    ) -> Result<Vec<Value>> {
        let owner = require_name("Owner name", owner)?;
        let owner_type = match owner_type {
            OwnerType::Auto => self.detect_owner_type(&owner).await?,
            explicit => explicit,
        };
        self.list_owner_repositories(owner_type, &owner, per_page).await
    }

    async fn list_owner_repositories(
        &self,
        owner_type: OwnerType,
        owner: &str,
        per_page: Option<u32>,
    ) -> Result<Vec<Value>> {
        let (kind, path) = match owner_type {
            OwnerType::User => ("user", format!("/users/{}/repos", owner)),
            _ => ("organization", format!("/orgs/{}/repos", owner)),
        };

        info!(kind, owner, "Fetching repositories");
        let mut query = self.page_size_query(per_page);
        query.extend(updated_desc());

        let repositories = self.get_all_pages::<Value>(&path, &query).await?;
        info!(kind, owner, count = repositories.len(), "Fetched repositories");
        Ok(repositories)
    }

    /// Resolve whether `owner` is an organization or a user.
    pub async fn detect_owner_type(&self, owner: &str) -> Result<OwnerType> {
        let owner = require_name("Owner name", owner)?;

        let org_path = format!("/orgs/{}", owner);
        if self.get_optional_json::<Value>(&org_path, &[]).await?.is_some() {
            return Ok(OwnerType::Org);
        }

        let user_path = format!("/users/{}", owner);
        match self.get_optional_json::<Value>(&user_path, &[]).await? {
            Some(_) => Ok(OwnerType::User),
            None => {
                let err = GitHubQueryError::Api {
                    status: 404,
                    message: format!("Owner '{}' not found as organization or user", owner),
                };
                error!(%owner, error = %err, "Owner lookup failed");
                Err(err)
            }
        }
    }

    /// Decoded README text, or `None` when the repository has no README.
    pub async fn get_repository_readme(&self, owner: &str, repo: &str) -> Result<Option<String>> {
        let owner = require_name("Owner name", owner)?;
        let repo = require_name("Repository name", repo)?;
        info!(%owner, %repo, "Fetching README");

        let path = format!("/repos/{}/{}/readme", owner, repo);
        let payload = match self.get_optional_json::<ReadmePayload>(&path, &[]).await? {
            Some(payload) => payload,
            None => {
                info!(%owner, %repo, "README not found");
                return Ok(None);
            }
        };

        match payload.content {
            Some(content) => decode_readme(&content, payload.encoding.as_deref()).map(Some),
            None => {
                warn!(%owner, %repo, "README response carried no content");
                Ok(None)
            }
        }
    }

    /// Issues of a repository, excluding pull requests.
    ///
    /// The issues endpoint also lists pull requests; records carrying a
    /// `pull_request` key are always dropped, for every `state` including `all`.
    pub async fn list_repository_issues(
        &self,
        owner: &str,
        repo: &str,
        state: &str,
        per_page: Option<u32>,
    ) -> Result<Vec<Value>> {
        let owner = require_name("Owner name", owner)?;
        let repo = require_name("Repository name", repo)?;
        let state: IssueState = state.parse()?;
        info!(%owner, %repo, %state, "Fetching issues");

        let mut query = vec![("state", state.to_string())];
        query.extend(self.page_size_query(per_page));
        query.extend(updated_desc());

        let path = format!("/repos/{}/{}/issues", owner, repo);
        let records = self.get_all_pages::<Value>(&path, &query).await?;
        let issues = without_pull_requests(records);

        info!(%owner, %repo, %state, count = issues.len(), "Fetched issues");
        Ok(issues)
    }

    pub async fn list_repository_pull_requests(
        &self,
        owner: &str,
        repo: &str,
        state: &str,
        per_page: Option<u32>,
    ) -> Result<Vec<Value>> {
        let owner = require_name("Owner name", owner)?;
        let repo = require_name("Repository name", repo)?;
        let state: IssueState = state.parse()?;
        info!(%owner, %repo, %state, "Fetching pull requests");

        let mut query = vec![("state", state.to_string())];
        query.extend(self.page_size_query(per_page));
        query.extend(updated_desc());

        let path = format!("/repos/{}/{}/pulls", owner, repo);
        let pull_requests = self.get_all_pages::<Value>(&path, &query).await?;

        info!(%owner, %repo, %state, count = pull_requests.len(), "Fetched pull requests");
        Ok(pull_requests)
    }

    pub async fn list_repository_contributors(
        &self,
        owner: &str,
        repo: &str,
        per_page: Option<u32>,
    ) -> Result<Vec<Value>> {
        let owner = require_name("Owner name", owner)?;
        let repo = require_name("Repository name", repo)?;
        info!(%owner, %repo, "Fetching contributors");

        let path = format!("/repos/{}/{}/contributors", owner, repo);
        let contributors = self
            .get_all_pages::<Value>(&path, &self.page_size_query(per_page))
            .await?;

        info!(%owner, %repo, count = contributors.len(), "Fetched contributors");
        Ok(contributors)
    }

    /// One page of repository search results.
    pub async fn search_repositories(
        &self,
        query: &str,
        sort: &str,
        order: &str,
        per_page: Option<u32>,
    ) -> Result<SearchResults> {
        let (query, sort, order) = validate_search(query, sort, order)?;
        info!(%query, "Searching repositories");

        let per_page = clamp_per_page(per_page.unwrap_or(30));
        let params = search_params(&query, sort, order, per_page, None);
        let body = self.get_json::<Value>("/search/repositories", &params).await?;

        match serde_json::from_value::<SearchResults>(body) {
            Ok(results) => {
                info!(%query, total = results.total_count, "Search completed");
                Ok(results)
            }
            Err(_) => {
                warn!(%query, "Unexpected search response format");
                Ok(SearchResults::default())
            }
        }
    }

    /// Up to `max_results` search hits, fetched page by page.
    pub async fn search_repositories_paginated(
        &self,
        query: &str,
        sort: &str,
        order: &str,
        max_results: u32,
    ) -> Result<Vec<Value>> {
        let (query, sort, order) = validate_search(query, sort, order)?;
        let max_results = max_results.min(SEARCH_RESULT_CEILING) as usize;
        // Page numbers only line up when every page has the same size
        let per_page = (max_results as u32).clamp(1, MAX_PER_PAGE);
        let mut repositories: Vec<Value> = Vec::new();
        let mut page = 1u32;

        while repositories.len() < max_results {
            let params = search_params(&query, sort, order, per_page, Some(page));

            let results: SearchResults = self.get_json("/search/repositories", &params).await?;
            let received = results.items.len();
            repositories.extend(results.items);

            if received < per_page as usize {
                break;
            }
            if page * per_page >= SEARCH_RESULT_CEILING {
                warn!(%query, "Reached GitHub search limit of 1000 results");
                break;
            }
            page += 1;
        }

        repositories.truncate(max_results);
        info!(%query, count = repositories.len(), "Retrieved search results");
        Ok(repositories)
    }

    fn page_size_query(&self, per_page: Option<u32>) -> Query {
        let per_page = clamp_per_page(per_page.unwrap_or(self.config().per_page));
        vec![("per_page", per_page.to_string())]
    }
}

/// Trimmed, non-empty single path segment.
fn require_name(kind: &str, value: &str) -> Result<String> {
    let value = value.trim();
    if value.is_empty() {
        return Err(GitHubQueryError::Validation(format!("{} cannot be empty", kind)));
    }
    if value.contains('/') || value.chars().any(char::is_whitespace) {
        return Err(GitHubQueryError::Validation(format!(
            "{} must be a single name, got '{}'",
            kind, value
        )));
    }
    Ok(value.to_string())
}

fn updated_desc() -> Query {
    vec![
        ("sort", "updated".to_string()),
        ("direction", "desc".to_string()),
    ]
}

fn without_pull_requests(records: Vec<Value>) -> Vec<Value> {
    records
        .into_iter()
        .filter(|record| record.get("pull_request").is_none())
        .collect()
}

fn decode_readme(content: &str, encoding: Option<&str>) -> Result<String> {
    if let Some(encoding) = encoding {
        if encoding != "base64" {
            return Err(GitHubQueryError::Decode(format!(
                "Unsupported README encoding: {}",
                encoding
            )));
        }
    }

    // GitHub wraps the base64 payload at 60 columns
    let compact: String = content.chars().filter(|c| !c.is_whitespace()).collect();
    let bytes = STANDARD
        .decode(compact)
        .map_err(|e| GitHubQueryError::Decode(format!("README is not valid base64: {}", e)))?;
    String::from_utf8(bytes)
        .map_err(|e| GitHubQueryError::Decode(format!("README is not valid UTF-8: {}", e)))
}

fn validate_search(query: &str, sort: &str, order: &str) -> Result<(String, SearchSort, SortOrder)> {
    let query = query.trim();
    if query.is_empty() {
        return Err(GitHubQueryError::Validation(
            "Search query cannot be empty".to_string(),
        ));
    }
    Ok((query.to_string(), sort.parse()?, order.parse()?))
}

fn search_params(
    query: &str,
    sort: SearchSort,
    order: SortOrder,
    per_page: u32,
    page: Option<u32>,
) -> Query {
    let mut params = vec![
        ("q", query.to_string()),
        ("sort", sort.as_str().to_string()),
        ("order", order.as_str().to_string()),
        ("per_page", per_page.to_string()),
    ];
    if let Some(page) = page {
        params.push(("page", page.to_string()));
    }
    params
}
