mod cli;

use anyhow::Context;
use clap::Parser;
use cli::{Cli, Command};
use colored::*;
use github_query::{ClientConfig, GitHubClient, OwnerType, RetryPolicy};
use serde_json::Value;
use std::time::Duration;
use tracing_subscriber::EnvFilter;

const PREVIEW_ITEMS: usize = 5;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Load .env file if it exists
    dotenv::dotenv().ok();

    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| EnvFilter::new("info"))
        )
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();

    let retry = RetryPolicy::new(cli.max_attempts, Duration::from_secs(1))
        .with_max_rate_limit_wait(Duration::from_secs(cli.max_rate_limit_wait));
    let config = ClientConfig::builder()
        .base_url(cli.api_url.clone())
        .maybe_token(cli.token.clone())
        .per_page(cli.per_page)
        .retry(retry)
        .build()?;
    let client = GitHubClient::new(config)?;

    match cli.command {
        Command::Repos { owner, owner_type } => {
            let owner_type: OwnerType = owner_type.parse()?;
            let repos = client
                .list_repositories(&owner, owner_type, None)
                .await
                .with_context(|| format!("Failed to list repositories for {}", owner))?;
            print_records(&format!("Repositories of {}", owner), &repos, cli.json, |repo| {
                format!("{}: {}", field(repo, "name"), field_or(repo, "description", "No description"))
            })?;
        }
        Command::Readme { owner, repo } => {
            let readme = client
                .get_repository_readme(&owner, &repo)
                .await
                .with_context(|| format!("Failed to fetch README for {}/{}", owner, repo))?;
            match readme {
                Some(text) if cli.json => println!("{}", serde_json::to_string(&text)?),
                Some(text) => {
                    println!("{}", format!("README of {}/{} ({} characters)", owner, repo, text.len()).bold().green());
                    println!("{}\n", "=".repeat(50).dimmed());
                    println!("{}", text);
                }
                None if cli.json => println!("null"),
                None => println!("{}", format!("No README found for {}/{}", owner, repo).yellow()),
            }
        }
        Command::Issues { owner, repo, state } => {
            let issues = client
                .list_repository_issues(&owner, &repo, &state, None)
                .await
                .with_context(|| format!("Failed to list issues for {}/{}", owner, repo))?;
            print_records(&format!("{} issues in {}/{}", state, owner, repo), &issues, cli.json, |issue| {
                format!("#{}: {}", field(issue, "number"), field(issue, "title"))
            })?;
        }
        Command::Pulls { owner, repo, state } => {
            let pulls = client
                .list_repository_pull_requests(&owner, &repo, &state, None)
                .await
                .with_context(|| format!("Failed to list pull requests for {}/{}", owner, repo))?;
            print_records(&format!("{} pull requests in {}/{}", state, owner, repo), &pulls, cli.json, |pr| {
                format!("#{}: {}", field(pr, "number"), field(pr, "title"))
            })?;
        }
        Command::Contributors { owner, repo } => {
            let contributors = client
                .list_repository_contributors(&owner, &repo, None)
                .await
                .with_context(|| format!("Failed to list contributors for {}/{}", owner, repo))?;
            print_records(&format!("Contributors to {}/{}", owner, repo), &contributors, cli.json, |c| {
                format!("{}: {} contributions", field(c, "login"), field(c, "contributions"))
            })?;
        }
        Command::Search { query, sort, order, max_results } => {
            let repos = client
                .search_repositories_paginated(&query, &sort, &order, max_results)
                .await
                .with_context(|| format!("Failed to search repositories for '{}'", query))?;
            print_records(&format!("Repositories matching '{}'", query), &repos, cli.json, |repo| {
                format!("{} ({} stars)", field(repo, "full_name"), field(repo, "stargazers_count"))
            })?;
        }
    }

    Ok(())
}

fn print_records(
    title: &str,
    records: &[Value],
    json: bool,
    describe: impl Fn(&Value) -> String,
) -> anyhow::Result<()> {
    if json {
        println!("{}", serde_json::to_string_pretty(records)?);
        return Ok(());
    }

    println!("{}", format!("{} ({} found)", title, records.len()).bold().green());
    println!("{}", "=".repeat(50).dimmed());
    for record in records.iter().take(PREVIEW_ITEMS) {
        println!("- {}", describe(record));
    }
    if records.len() > PREVIEW_ITEMS {
        println!("{}", format!("... and {} more", records.len() - PREVIEW_ITEMS).dimmed());
    }
    Ok(())
}

fn field(record: &Value, key: &str) -> String {
    field_or(record, key, "?")
}

fn field_or(record: &Value, key: &str, fallback: &str) -> String {
    match record.get(key) {
        Some(Value::String(s)) => s.clone(),
        Some(Value::Null) | None => fallback.to_string(),
        Some(other) => other.to_string(),
    }
}
