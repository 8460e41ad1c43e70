use clap::{Parser, Subcommand};

#[derive(Parser)]
#[command(name = "github-query")]
#[command(about = "Query GitHub organizations, repositories, READMEs, issues, pull requests and contributors")]
#[command(version = "0.1.0")]
pub struct Cli {
    /// GitHub personal access token (anonymous when unset)
    #[arg(long, env = "GITHUB_TOKEN", hide_env_values = true)]
    pub token: Option<String>,

    /// GitHub API base URL
    #[arg(long, env = "GITHUB_API_URL", default_value = "https://api.github.com")]
    pub api_url: String,

    /// Records per page (max 100)
    #[arg(long, default_value_t = 100)]
    pub per_page: u32,

    /// HTTP calls allowed per request, including retries
    #[arg(long, default_value_t = 3)]
    pub max_attempts: u32,

    /// Longest rate-limit reset to wait for, in seconds
    #[arg(long, default_value_t = 60)]
    pub max_rate_limit_wait: u64,

    /// Print raw JSON instead of a summary
    #[arg(long)]
    pub json: bool,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Subcommand)]
pub enum Command {
    /// List repositories of an organization or user
    Repos {
        owner: String,
        /// org, user or auto
        #[arg(long, default_value = "auto")]
        owner_type: String,
    },
    /// Show a repository README
    Readme { owner: String, repo: String },
    /// List repository issues (pull requests excluded)
    Issues {
        owner: String,
        repo: String,
        /// open, closed or all
        #[arg(long, default_value = "open")]
        state: String,
    },
    /// List repository pull requests
    Pulls {
        owner: String,
        repo: String,
        /// open, closed or all
        #[arg(long, default_value = "open")]
        state: String,
    },
    /// List repository contributors
    Contributors { owner: String, repo: String },
    /// Search repositories
    Search {
        query: String,
        /// stars, forks, help-wanted-issues or updated
        #[arg(long, default_value = "updated")]
        sort: String,
        /// asc or desc
        #[arg(long, default_value = "desc")]
        order: String,
        #[arg(long, default_value_t = 100)]
        max_results: u32,
    },
}
