//! Blocking wrapper around the async client.
//!
//! Each call drives the async query to completion on a private current-thread
//! runtime, so backoff and rate-limit waits block the calling thread. Do not use
//! from inside an async context.

use crate::config::ClientConfig;
use crate::error::{GitHubQueryError, Result};
use crate::github;
use crate::models::OwnerType;
use crate::retry::Sleeper;
use crate::types::SearchResults;
use serde_json::Value;
use std::sync::Arc;
use tokio::runtime::{Builder, Runtime};

pub struct GitHubClient {
    inner: github::GitHubClient,
    runtime: Runtime,
}

impl GitHubClient {
    pub fn new(config: ClientConfig) -> Result<Self> {
        Self::from_async(github::GitHubClient::new(config)?)
    }

    pub fn from_async(inner: github::GitHubClient) -> Result<Self> {
        let runtime = Builder::new_current_thread()
            .enable_all()
            .build()
            .map_err(|e| GitHubQueryError::Config(format!("Failed to start runtime: {}", e)))?;

        Ok(GitHubClient { inner, runtime })
    }

    pub fn with_sleeper(mut self, sleeper: Arc<dyn Sleeper>) -> Self {
        self.inner = self.inner.with_sleeper(sleeper);
        self
    }

    pub fn list_org_repositories(&self, org: &str, per_page: Option<u32>) -> Result<Vec<Value>> {
        self.runtime
            .block_on(self.inner.list_org_repositories(org, per_page))
    }

    pub fn list_user_repositories(&self, user: &str, per_page: Option<u32>) -> Result<Vec<Value>> {
        self.runtime
            .block_on(self.inner.list_user_repositories(user, per_page))
    }

    pub fn list_repositories(
        &self,
        owner: &str,
        owner_type: OwnerType,
        per_page: Option<u32>,
    ) -> Result<Vec<Value>> {
        self.runtime
            .block_on(self.inner.list_repositories(owner, owner_type, per_page))
    }

    pub fn get_repository_readme(&self, owner: &str, repo: &str) -> Result<Option<String>> {
        self.runtime
            .block_on(self.inner.get_repository_readme(owner, repo))
    }

    pub fn list_repository_issues(
        &self,
        owner: &str,
        repo: &str,
        state: &str,
        per_page: Option<u32>,
    ) -> Result<Vec<Value>> {
        self.runtime
            .block_on(self.inner.list_repository_issues(owner, repo, state, per_page))
    }

    pub fn list_repository_pull_requests(
        &self,
        owner: &str,
        repo: &str,
        state: &str,
        per_page: Option<u32>,
    ) -> Result<Vec<Value>> {
        self.runtime
            .block_on(self.inner.list_repository_pull_requests(owner, repo, state, per_page))
    }

    pub fn list_repository_contributors(
        &self,
        owner: &str,
        repo: &str,
        per_page: Option<u32>,
    ) -> Result<Vec<Value>> {
        self.runtime
            .block_on(self.inner.list_repository_contributors(owner, repo, per_page))
    }

    pub fn search_repositories(
        &self,
        query: &str,
        sort: &str,
        order: &str,
        per_page: Option<u32>,
    ) -> Result<SearchResults> {
        self.runtime
            .block_on(self.inner.search_repositories(query, sort, order, per_page))
    }

    pub fn search_repositories_paginated(
        &self,
        query: &str,
        sort: &str,
        order: &str,
        max_results: u32,
    ) -> Result<Vec<Value>> {
        self.runtime
            .block_on(self.inner.search_repositories_paginated(query, sort, order, max_results))
    }
}
