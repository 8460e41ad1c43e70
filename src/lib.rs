//! Read-only GitHub REST client for organization, repository, README, issue,
//! pull request and contributor data.
//!
//! ```no_run
//! use github_query::{ClientConfig, GitHubClient};
//!
//! # async fn run() -> github_query::Result<()> {
//! let config = ClientConfig::builder().token("ghp_example").build()?;
//! let client = GitHubClient::new(config)?;
//!
//! let repos = client.list_org_repositories("rust-lang", None).await?;
//! let readme = client.get_repository_readme("rust-lang", "rust").await?;
//! let issues = client.list_repository_issues("rust-lang", "rust", "open", Some(50)).await?;
//! # Ok(())
//! # }
//! ```

pub mod blocking;
pub mod config;
pub mod error;
pub mod github;
pub mod models;
pub mod pagination;
pub mod queries;
pub mod retry;
pub mod types;

pub use config::ClientConfig;
pub use error::{GitHubQueryError, Result};
pub use github::{ApiResponse, GitHubClient, RequestTarget};
pub use models::{IssueState, OwnerType, RateLimitState, SearchSort, SortOrder};
pub use pagination::Page;
pub use retry::{RetryPolicy, Sleeper, TokioSleeper};
