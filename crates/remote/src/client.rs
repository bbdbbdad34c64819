// crates/remote/src/client.rs
//! Thin GraphQL-over-HTTP transport with bearer auth and a bounded
//! exponential backoff, grounded on the teacher's `reqwest::Client`
//! bearer-auth + status-check pattern (see `crates/server/src/routes/oauth.rs`
//! in the original claude-view tree) and generalized into a retry driver.

use std::time::Duration;

use serde::de::DeserializeOwned;
use serde_json::Value;
use tracing::warn;

use crate::error::{RemoteError, RemoteResult};

const GITHUB_GRAPHQL_URL: &str = "https://api.github.com/graphql";
const BACKOFF_BASE: Duration = Duration::from_secs(1);
const BACKOFF_CAP: Duration = Duration::from_secs(30);
const MAX_ATTEMPTS: u32 = 5;

enum GraphQlErrorKind {
    RateLimited,
    ProjectNotFound,
}

/// Classify a GraphQL `errors` array per spec.md §4.2's error surface:
/// a `RATE_LIMITED` type code anywhere in the array means "retry"; a
/// `NOT_FOUND` type scoped to a `projectV2` path means "skip this
/// target". Anything else is a hard failure the caller reports as-is.
fn classify_graphql_errors(errors: &Value) -> Option<GraphQlErrorKind> {
    let entries = errors.as_array()?;
    for entry in entries {
        let ty = entry.get("type").and_then(Value::as_str).unwrap_or_default();
        if ty == "RATE_LIMITED" {
            return Some(GraphQlErrorKind::RateLimited);
        }
        if ty == "NOT_FOUND" {
            let touches_project = entry
                .get("path")
                .and_then(Value::as_array)
                .map(|path| path.iter().any(|p| p.as_str() == Some("projectV2")))
                .unwrap_or(false);
            if touches_project {
                return Some(GraphQlErrorKind::ProjectNotFound);
            }
        }
    }
    None
}

#[derive(Debug, Clone)]
pub struct GraphQlClient {
    http: reqwest::Client,
    token: String,
    endpoint: String,
}

impl GraphQlClient {
    pub fn new(token: impl Into<String>) -> Self {
        Self {
            http: reqwest::Client::new(),
            token: token.into(),
            endpoint: GITHUB_GRAPHQL_URL.to_string(),
        }
    }

    /// Override the endpoint URL; used by tests to point at a local mock
    /// server instead of the real GitHub API.
    pub fn with_endpoint(token: impl Into<String>, endpoint: impl Into<String>) -> Self {
        Self {
            http: reqwest::Client::new(),
            token: token.into(),
            endpoint: endpoint.into(),
        }
    }

    /// Run one GraphQL request, retrying on transport errors and 5xx/429
    /// responses with doubling backoff up to `MAX_ATTEMPTS`. `on_wait` is
    /// called with the delay before each retry so a caller (the sync
    /// engine) can surface progress without this module depending on a UI
    /// crate.
    pub async fn query<T: DeserializeOwned>(
        &self,
        query: &str,
        variables: Value,
        mut on_wait: impl FnMut(u32, Duration),
    ) -> RemoteResult<T> {
        let body = serde_json::json!({ "query": query, "variables": variables });
        let mut delay = BACKOFF_BASE;

        for attempt in 1..=MAX_ATTEMPTS {
            let result = self
                .http
                .post(&self.endpoint)
                .bearer_auth(&self.token)
                .header("Accept", "application/vnd.github+json")
                .header("Content-Type", "application/json")
                .timeout(Duration::from_secs(30))
                .json(&body)
                .send()
                .await;

            match result {
                Ok(resp) if resp.status().is_success() => {
                    let parsed: Value = resp.json().await?;
                    if let Some(errors) = parsed.get("errors") {
                        if let Some(kind) = classify_graphql_errors(errors) {
                            match kind {
                                GraphQlErrorKind::RateLimited => {
                                    warn!(attempt, "GraphQL reported RATE_LIMITED, retrying");
                                    if attempt == MAX_ATTEMPTS {
                                        return Err(RemoteError::RateLimited { attempts: attempt });
                                    }
                                    on_wait(attempt, delay);
                                    tokio::time::sleep(delay).await;
                                    delay = (delay * 2).min(BACKOFF_CAP);
                                    continue;
                                }
                                GraphQlErrorKind::ProjectNotFound => {
                                    return Err(RemoteError::ProjectNotFound(errors.to_string()));
                                }
                            }
                        }
                        return Err(RemoteError::GraphQl(errors.to_string()));
                    }
                    let data = parsed.get("data").cloned().unwrap_or(Value::Null);
                    return Ok(serde_json::from_value(data)?);
                }
                Ok(resp) if resp.status().as_u16() == 429 || resp.status().is_server_error() => {
                    warn!(status = %resp.status(), attempt, "graphql request failed, retrying");
                }
                Ok(resp) => {
                    let status = resp.status();
                    let text = resp.text().await.unwrap_or_default();
                    return Err(RemoteError::GraphQl(format!("{status}: {text}")));
                }
                Err(e) => {
                    warn!(error = %e, attempt, "graphql transport error, retrying");
                }
            }

            // Only reached by the 429/5xx and transport-error arms above —
            // the RATE_LIMITED GraphQL error code returns or continues
            // directly and never falls through to here.
            if attempt == MAX_ATTEMPTS {
                return Err(RemoteError::NetworkTransient { attempts: attempt });
            }
            on_wait(attempt, delay);
            tokio::time::sleep(delay).await;
            delay = (delay * 2).min(BACKOFF_CAP);
        }

        unreachable!("loop always returns by the final attempt")
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde::Deserialize;

    #[derive(Debug, Deserialize, PartialEq, Eq)]
    struct Echo {
        value: i64,
    }

    #[tokio::test]
    async fn successful_response_is_decoded() {
        let mut server = mockito::Server::new_async().await;
        let _m = server
            .mock("POST", "/")
            .with_status(200)
            .with_body(r#"{"data": {"value": 42}}"#)
            .create_async()
            .await;

        let client = GraphQlClient::with_endpoint("tok", server.url());
        let result: Echo = client.query("query {}", serde_json::json!({}), |_, _| {}).await.unwrap();
        assert_eq!(result, Echo { value: 42 });
    }

    #[tokio::test]
    async fn graphql_errors_surface_as_an_error() {
        let mut server = mockito::Server::new_async().await;
        let _m = server
            .mock("POST", "/")
            .with_status(200)
            .with_body(r#"{"errors": [{"message": "nope"}]}"#)
            .create_async()
            .await;

        let client = GraphQlClient::with_endpoint("tok", server.url());
        let result: RemoteResult<Echo> = client.query("query {}", serde_json::json!({}), |_, _| {}).await;
        assert!(matches!(result, Err(RemoteError::GraphQl(_))));
    }

    #[tokio::test]
    async fn rate_limited_error_code_retries_then_gives_up() {
        let mut server = mockito::Server::new_async().await;
        let _m = server
            .mock("POST", "/")
            .with_status(200)
            .with_body(r#"{"errors": [{"type": "RATE_LIMITED", "message": "slow down"}]}"#)
            .expect(5)
            .create_async()
            .await;

        let client = GraphQlClient::with_endpoint("tok", server.url());
        let mut waits = 0;
        let result: RemoteResult<Echo> = client
            .query("query {}", serde_json::json!({}), |_, _| waits += 1)
            .await;
        assert!(matches!(result, Err(RemoteError::RateLimited { attempts: 5 })));
        assert_eq!(waits, 4);
    }

    #[tokio::test]
    async fn project_not_found_is_classified_without_retrying() {
        let mut server = mockito::Server::new_async().await;
        let _m = server
            .mock("POST", "/")
            .with_status(200)
            .with_body(r#"{"errors": [{"type": "NOT_FOUND", "path": ["organization", "projectV2"], "message": "nope"}]}"#)
            .expect(1)
            .create_async()
            .await;

        let client = GraphQlClient::with_endpoint("tok", server.url());
        let result: RemoteResult<Echo> = client.query("query {}", serde_json::json!({}), |_, _| {}).await;
        assert!(matches!(result, Err(RemoteError::ProjectNotFound(_))));
    }

    #[tokio::test]
    async fn exhausting_retries_on_persistent_5xx_reports_network_transient() {
        let mut server = mockito::Server::new_async().await;
        let _m = server
            .mock("POST", "/")
            .with_status(503)
            .expect(5)
            .create_async()
            .await;

        let client = GraphQlClient::with_endpoint("tok", server.url());
        let mut waits = 0;
        let result: RemoteResult<Echo> = client
            .query("query {}", serde_json::json!({}), |_, _| waits += 1)
            .await;
        assert!(matches!(result, Err(RemoteError::NetworkTransient { attempts: 5 })));
        assert_eq!(waits, 4);
    }
}
