//! Authenticated read access to the GitHub REST API.

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use http::header::{HeaderMap, HeaderValue, ACCEPT, AUTHORIZATION};
use octocrab::service::middleware::retry::RetryConfig;
use serde::de::DeserializeOwned;

use crate::error::GitReviewError;
use crate::session::TokenSource;
use crate::types::{Branch, Commit, PullRequest, RepoInfo};

pub const DEFAULT_API_URL: &str = "https://api.github.com";
const GITHUB_JSON: &str = "application/vnd.github+json";
const MAX_COMMITS: usize = 10;

/// Status and body of a GitHub response, before any interpretation.
#[derive(Debug, Clone)]
pub struct RawResponse {
    pub status: u16,
    pub body: String,
}

/// Issues GET requests against the GitHub API.
///
/// Routes are relative to the API base (e.g. `/repos/octocat/Hello-World`).
#[async_trait]
pub trait Transport: Send + Sync {
    async fn get(&self, route: &str, headers: HeaderMap) -> Result<RawResponse, GitReviewError>;
}

/// Production transport backed by octocrab.
///
/// The octocrab instance carries no credentials of its own; authentication
/// comes from the per-request headers. Retries are disabled so a failed
/// request reaches the caller after one attempt.
pub struct OctocrabTransport {
    github: octocrab::Octocrab,
}

impl OctocrabTransport {
    pub fn new(api_url: &str, timeout: Option<Duration>) -> Result<Self, GitReviewError> {
        let github = octocrab::OctocrabBuilder::new()
            .base_uri(api_url)?
            .set_connect_timeout(timeout)
            .set_read_timeout(timeout)
            .add_retry_config(RetryConfig::None)
            .build()?;
        Ok(Self { github })
    }
}

#[async_trait]
impl Transport for OctocrabTransport {
    async fn get(&self, route: &str, headers: HeaderMap) -> Result<RawResponse, GitReviewError> {
        let response = self.github._get_with_headers(route, Some(headers)).await?;
        let status = response.status().as_u16();
        let body = self.github.body_to_string(response).await?;
        Ok(RawResponse { status, body })
    }
}

/// Fetches repository data and renders it as plain-text summaries.
#[derive(Clone)]
pub struct RepositoryClient {
    transport: Arc<dyn Transport>,
    tokens: Arc<dyn TokenSource>,
}

impl RepositoryClient {
    pub fn new(transport: Arc<dyn Transport>, tokens: Arc<dyn TokenSource>) -> Self {
        Self { transport, tokens }
    }

    fn headers(&self) -> Result<HeaderMap, GitReviewError> {
        let mut headers = HeaderMap::new();
        headers.insert(ACCEPT, HeaderValue::from_static(GITHUB_JSON));
        if let Some(token) = self.tokens.current_token() {
            let mut value = HeaderValue::from_str(&format!("Bearer {}", token))
                .map_err(|_| GitReviewError::InvalidHeader("token contains invalid characters".to_string()))?;
            value.set_sensitive(true);
            headers.insert(AUTHORIZATION, value);
        }
        Ok(headers)
    }

    async fn get_json<T: DeserializeOwned>(&self, route: &str) -> Result<T, GitReviewError> {
        let headers = self.headers()?;
        tracing::debug!(route, authenticated = headers.contains_key(AUTHORIZATION), "GitHub GET");

        let response = self.transport.get(route, headers).await?;
        if response.status != 200 {
            tracing::warn!(route, status = response.status, "GitHub returned an error status");
            return Err(GitReviewError::Api {
                status: response.status,
                body: response.body,
            });
        }
        Ok(serde_json::from_str(&response.body)?)
    }

    pub async fn fetch_commits(&self, repo: &str) -> Result<String, GitReviewError> {
        let mut commits: Vec<Commit> = self.get_json(&format!("/repos/{}/commits", repo)).await?;
        commits.truncate(MAX_COMMITS);
        Ok(render_commits(&commits))
    }

    pub async fn fetch_branches(&self, repo: &str) -> Result<String, GitReviewError> {
        let branches: Vec<Branch> = self.get_json(&format!("/repos/{}/branches", repo)).await?;
        Ok(render_branches(&branches))
    }

    pub async fn fetch_latest_commit_message(&self, repo: &str) -> Result<String, GitReviewError> {
        let commits: Vec<Commit> = self.get_json(&format!("/repos/{}/commits", repo)).await?;
        Ok(render_latest_commit(commits.first()))
    }

    pub async fn fetch_repo_info(&self, repo: &str) -> Result<String, GitReviewError> {
        let info: RepoInfo = self.get_json(&format!("/repos/{}", repo)).await?;
        Ok(render_repo_info(&info))
    }

    pub async fn fetch_pull_requests(&self, repo: &str) -> Result<String, GitReviewError> {
        let pulls: Vec<PullRequest> = self
            .get_json(&format!("/repos/{}/pulls?state=open", repo))
            .await?;
        Ok(render_pull_requests(&pulls))
    }
}

fn render_commits(commits: &[Commit]) -> String {
    let mut out = String::from("Last 10 commits:\n");
    for c in commits {
        out.push_str(&format!(
            "{} - {} ({})\n",
            c.short_sha(),
            c.summary(),
            c.commit.author.name
        ));
    }
    out
}

fn render_branches(branches: &[Branch]) -> String {
    let mut out = String::from("Branches:\n");
    for b in branches {
        out.push_str(&b.name);
        out.push('\n');
    }
    out
}

fn render_latest_commit(commit: Option<&Commit>) -> String {
    match commit {
        Some(c) => format!("Latest commit: {} - {}", c.short_sha(), c.commit.message),
        None => "No commits found".to_string(),
    }
}

fn render_repo_info(info: &RepoInfo) -> String {
    format!(
        "Description: {}\nStars: {} ⭐\nForks: {} 🍴\nOpen Issues: {} 🐞",
        info.description.as_deref().unwrap_or(""),
        info.stargazers_count,
        info.forks_count,
        info.open_issues_count,
    )
}

fn render_pull_requests(pulls: &[PullRequest]) -> String {
    if pulls.is_empty() {
        return "No open pull requests".to_string();
    }
    let mut out = String::from("Open Pull Requests:\n");
    for pr in pulls {
        out.push_str(&format!(
            "- {} (by {}) → {}\n",
            pr.title, pr.user.login, pr.html_url
        ));
    }
    out
}

#[cfg(test)]
pub(crate) mod testing {
    //! Recording fake transport and a local HTTP stub, shared by client and
    //! server tests.

    use std::collections::HashMap;
    use std::sync::Mutex;

    use tokio::io::{AsyncReadExt, AsyncWriteExt};
    use tokio::net::{TcpListener, TcpStream};

    use super::*;

    #[derive(Debug, Clone)]
    pub struct RecordedRequest {
        pub route: String,
        pub headers: HeaderMap,
    }

    #[derive(Default)]
    pub struct FakeTransport {
        responses: Mutex<HashMap<String, RawResponse>>,
        failures: Mutex<HashMap<String, fn() -> GitReviewError>>,
        requests: Mutex<Vec<RecordedRequest>>,
    }

    impl FakeTransport {
        pub fn new() -> Self {
            Self::default()
        }

        pub fn respond(&self, route: &str, status: u16, body: impl Into<String>) {
            self.responses.lock().unwrap().insert(
                route.to_string(),
                RawResponse {
                    status,
                    body: body.into(),
                },
            );
        }

        pub fn respond_json(&self, route: &str, body: serde_json::Value) {
            self.respond(route, 200, body.to_string());
        }

        /// Make requests to `route` fail before any response is produced.
        pub fn fail(&self, route: &str, error: fn() -> GitReviewError) {
            self.failures
                .lock()
                .unwrap()
                .insert(route.to_string(), error);
        }

        pub fn requests(&self) -> Vec<RecordedRequest> {
            self.requests.lock().unwrap().clone()
        }

        pub fn routes(&self) -> Vec<String> {
            self.requests().into_iter().map(|r| r.route).collect()
        }
    }

    #[async_trait]
    impl Transport for FakeTransport {
        async fn get(&self, route: &str, headers: HeaderMap) -> Result<RawResponse, GitReviewError> {
            self.requests.lock().unwrap().push(RecordedRequest {
                route: route.to_string(),
                headers,
            });
            if let Some(error) = self.failures.lock().unwrap().get(route) {
                return Err(error());
            }
            Ok(self
                .responses
                .lock()
                .unwrap()
                .get(route)
                .cloned()
                .unwrap_or(RawResponse {
                    status: 404,
                    body: r#"{"message":"Not Found"}"#.to_string(),
                }))
        }
    }

    /// Minimal HTTP/1.1 server answering every request with one canned
    /// response and closing the connection. Records each request head.
    pub struct StubServer {
        pub url: String,
        requests: Arc<Mutex<Vec<String>>>,
    }

    impl StubServer {
        pub async fn start(status: u16, body: &'static str) -> Self {
            let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
            let url = format!("http://{}", listener.local_addr().unwrap());
            let requests = Arc::new(Mutex::new(Vec::new()));
            let recorded = Arc::clone(&requests);
            tokio::spawn(async move {
                while let Ok((mut socket, _)) = listener.accept().await {
                    let head = read_head(&mut socket).await;
                    recorded.lock().unwrap().push(head);
                    let response = format!(
                        "HTTP/1.1 {} Stub\r\ncontent-type: application/json\r\ncontent-length: {}\r\nconnection: close\r\n\r\n{}",
                        status,
                        body.len(),
                        body
                    );
                    let _ = socket.write_all(response.as_bytes()).await;
                    let _ = socket.shutdown().await;
                }
            });
            Self { url, requests }
        }

        pub fn requests(&self) -> Vec<String> {
            self.requests.lock().unwrap().clone()
        }
    }

    async fn read_head(socket: &mut TcpStream) -> String {
        let mut head = Vec::new();
        let mut chunk = [0u8; 1024];
        loop {
            match socket.read(&mut chunk).await {
                Ok(0) | Err(_) => break,
                Ok(n) => head.extend_from_slice(&chunk[..n]),
            }
            if head.windows(4).any(|w| w == b"\r\n\r\n") {
                break;
            }
        }
        String::from_utf8_lossy(&head).into_owned()
    }

    /// URL of a local port with nothing listening on it.
    pub fn refused_url() -> String {
        let listener = std::net::TcpListener::bind("127.0.0.1:0").unwrap();
        let addr = listener.local_addr().unwrap();
        drop(listener);
        format!("http://{}", addr)
    }

    pub struct FixedToken(pub Option<String>);

    impl TokenSource for FixedToken {
        fn current_token(&self) -> Option<String> {
            self.0.clone()
        }
    }

    pub fn commit_json(sha: &str, message: &str, author: &str) -> serde_json::Value {
        serde_json::json!({
            "sha": sha,
            "commit": {
                "message": message,
                "author": { "name": author, "date": "2024-01-01T00:00:00Z" }
            }
        })
    }
}
