use crate::error::{GitHubQueryError, Result};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};

// GitHub API response structures
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Repository {
    pub name: String,
    pub full_name: String,
    pub html_url: String,
    pub description: Option<String>,
    #[serde(default)]
    pub stargazers_count: u32,
    pub language: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Issue {
    pub number: u64,
    pub title: String,
    pub state: String,
    pub html_url: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PullRequest {
    pub number: u64,
    pub title: String,
    pub state: String,
    pub html_url: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Contributor {
    pub login: String,
    pub id: u64,
    pub contributions: u32,
}

/// Body of `GET /repos/{owner}/{repo}/readme`
#[derive(Debug, Deserialize)]
pub struct ReadmePayload {
    pub content: Option<String>,
    pub encoding: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SearchResults<T = serde_json::Value> {
    pub total_count: u64,
    #[serde(default)]
    pub incomplete_results: bool,
    pub items: Vec<T>,
}

impl<T> Default for SearchResults<T> {
    fn default() -> Self {
        Self {
            total_count: 0,
            incomplete_results: false,
            items: Vec::new(),
        }
    }
}

/// Convert raw JSON records into typed ones, e.g. `decode_records::<Issue>(issues)`.
pub fn decode_records<T: DeserializeOwned>(records: Vec<serde_json::Value>) -> Result<Vec<T>> {
    records
        .into_iter()
        .map(|record| serde_json::from_value(record).map_err(GitHubQueryError::from))
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_decode_contributors() {
        let records = vec![
            json!({"login": "octocat", "id": 1, "contributions": 42, "type": "User"}),
            json!({"login": "hubot", "id": 2, "contributions": 7, "type": "Bot"}),
        ];
        let contributors: Vec<Contributor> = decode_records(records).unwrap();
        assert_eq!(contributors.len(), 2);
        assert_eq!(contributors[0].login, "octocat");
        assert_eq!(contributors[1].contributions, 7);
    }

    #[test]
    fn test_decode_rejects_mismatched_shape() {
        let records = vec![json!({"title": "no number"})];
        assert!(decode_records::<Issue>(records).is_err());
    }

    #[test]
    fn test_search_results_tolerate_missing_flag() {
        let results: SearchResults =
            serde_json::from_value(json!({"total_count": 1, "items": [{"name": "x"}]})).unwrap();
        assert_eq!(results.total_count, 1);
        assert!(!results.incomplete_results);
        assert_eq!(results.items.len(), 1);
    }
}
