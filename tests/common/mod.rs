#![allow(dead_code)]

use futures::future::BoxFuture;
use github_query::{ClientConfig, GitHubClient, RetryPolicy, Sleeper};
use serde_json::{json, Value};
use std::sync::{Arc, Mutex};
use std::time::Duration;
use wiremock::MockServer;

/// Records requested waits instead of sleeping.
#[derive(Debug, Default)]
pub struct RecordingSleeper {
    delays: Mutex<Vec<Duration>>,
}

impl RecordingSleeper {
    pub fn delays(&self) -> Vec<Duration> {
        self.delays.lock().unwrap().clone()
    }
}

impl Sleeper for RecordingSleeper {
    fn sleep(&self, duration: Duration) -> BoxFuture<'static, ()> {
        self.delays.lock().unwrap().push(duration);
        Box::pin(async {})
    }
}

pub struct TestContext {
    pub server: MockServer,
    pub client: GitHubClient,
    pub sleeper: Arc<RecordingSleeper>,
}

impl TestContext {
    pub async fn new() -> Self {
        Self::with_config(|builder| builder).await
    }

    pub async fn with_config(
        configure: impl FnOnce(github_query::config::ClientConfigBuilder) -> github_query::config::ClientConfigBuilder,
    ) -> Self {
        let server = MockServer::start().await;
        let builder = ClientConfig::builder()
            .base_url(server.uri())
            .retry(RetryPolicy::new(3, Duration::from_secs(1)));
        let config = configure(builder).build().expect("valid test config");

        let sleeper = Arc::new(RecordingSleeper::default());
        let client = GitHubClient::new(config)
            .expect("Failed to create client")
            .with_sleeper(sleeper.clone());

        TestContext {
            server,
            client,
            sleeper,
        }
    }

    pub async fn request_count(&self) -> usize {
        self.server
            .received_requests()
            .await
            .map(|requests| requests.len())
            .unwrap_or(0)
    }

    /// `Link` header pointing at `path_and_query` on the mock server.
    pub fn next_link(&self, path_and_query: &str) -> String {
        format!("<{}{}>; rel=\"next\"", self.server.uri(), path_and_query)
    }
}

pub fn repo_records(start: usize, count: usize) -> Vec<Value> {
    (start..start + count)
        .map(|i| json!({"id": i, "name": format!("repo-{}", i), "full_name": format!("acme/repo-{}", i)}))
        .collect()
}

pub fn unix_now() -> i64 {
    chrono::Utc::now().timestamp()
}
