use std::sync::Arc;

use rmcp::handler::server::router::tool::ToolRouter;
use rmcp::handler::server::wrapper::Parameters;
use rmcp::model::*;
use rmcp::{schemars, tool, tool_handler, tool_router, ServerHandler};
use serde::Deserialize;

use crate::client::RepositoryClient;
use crate::error::GitReviewError;
use crate::session::{SessionContext, TOKEN_TTL};

#[derive(Clone)]
pub struct GitReviewServer {
    session: Arc<SessionContext>,
    client: RepositoryClient,
    tool_router: ToolRouter<Self>,
}

// -- Tool parameter types --

#[derive(Debug, Deserialize, schemars::JsonSchema)]
pub struct SetRepositoryParams {
    #[schemars(description = "Repository in 'owner/name' format")]
    #[serde(default)]
    pub repo: String,
}

#[derive(Debug, Deserialize, schemars::JsonSchema)]
pub struct SetTokenParams {
    #[schemars(description = "GitHub personal access token")]
    #[serde(default)]
    pub token: String,
}

#[derive(Debug, Default, Deserialize, schemars::JsonSchema)]
pub struct RepoParam {
    #[schemars(
        description = "Repository in 'owner/name' format (default: the repository set with set_github_repository)"
    )]
    #[serde(default)]
    pub repo: Option<String>,
}

impl GitReviewServer {
    pub fn new(session: Arc<SessionContext>, client: RepositoryClient) -> Self {
        Self {
            session,
            client,
            tool_router: Self::tool_router(),
        }
    }

    /// An explicit non-empty `repo` argument wins over the session repository.
    fn resolve_repo(&self, param: Option<&str>) -> Result<String, GitReviewError> {
        param
            .filter(|r| !r.is_empty())
            .map(String::from)
            .or_else(|| Some(self.session.repository()).filter(|r| !r.is_empty()))
            .ok_or(GitReviewError::MissingRepository)
    }

    fn finish(
        &self,
        what: &str,
        repo: &str,
        result: Result<String, GitReviewError>,
    ) -> Result<CallToolResult, ErrorData> {
        match result {
            Ok(text) => Ok(CallToolResult::success(vec![Content::text(text)])),
            Err(e) => {
                tracing::warn!(repo, error = %e, "Error fetching {}", what);
                Ok(e.to_tool_result_with(&format!("Error fetching {}", what)))
            }
        }
    }
}

// -- MCP tool handlers --

#[tool_router]
impl GitReviewServer {
    #[tool(
        name = "set_github_repository",
        description = "Set GitHub repository for subsequent tools"
    )]
    async fn set_github_repository(
        &self,
        Parameters(params): Parameters<SetRepositoryParams>,
    ) -> Result<CallToolResult, ErrorData> {
        if params.repo.is_empty() {
            return Ok(GitReviewError::MissingParam(
                "Please provide a repo in 'owner/name' format".to_string(),
            )
            .to_tool_result());
        }

        self.session.set_repository(params.repo.clone());
        tracing::info!(repo = %params.repo, "Repository set");
        Ok(CallToolResult::success(vec![Content::text(format!(
            "Repo set to {}",
            params.repo
        ))]))
    }

    #[tool(
        name = "set_github_token",
        description = "Set GitHub Personal Access Token for private repos"
    )]
    async fn set_github_token(
        &self,
        Parameters(params): Parameters<SetTokenParams>,
    ) -> Result<CallToolResult, ErrorData> {
        if params.token.is_empty() {
            return Ok(
                GitReviewError::MissingParam("Please provide a GitHub token".to_string())
                    .to_tool_result(),
            );
        }

        self.session.set_token(params.token, TOKEN_TTL);
        tracing::info!(ttl_secs = TOKEN_TTL.as_secs(), "GitHub token set");
        Ok(CallToolResult::success(vec![Content::text(
            "GitHub token set successfully (valid for 1 hour)",
        )]))
    }

    #[tool(name = "list_commits", description = "Fetch last 10 commits")]
    async fn list_commits(
        &self,
        Parameters(params): Parameters<RepoParam>,
    ) -> Result<CallToolResult, ErrorData> {
        let repo = match self.resolve_repo(params.repo.as_deref()) {
            Ok(repo) => repo,
            Err(e) => return Ok(e.to_tool_result()),
        };
        let result = self.client.fetch_commits(&repo).await;
        self.finish("commits", &repo, result)
    }

    #[tool(name = "list_branches", description = "List all branches")]
    async fn list_branches(
        &self,
        Parameters(params): Parameters<RepoParam>,
    ) -> Result<CallToolResult, ErrorData> {
        let repo = match self.resolve_repo(params.repo.as_deref()) {
            Ok(repo) => repo,
            Err(e) => return Ok(e.to_tool_result()),
        };
        let result = self.client.fetch_branches(&repo).await;
        self.finish("branches", &repo, result)
    }

    #[tool(
        name = "get_latest_commit_message",
        description = "Get latest commit message"
    )]
    async fn get_latest_commit_message(
        &self,
        Parameters(params): Parameters<RepoParam>,
    ) -> Result<CallToolResult, ErrorData> {
        let repo = match self.resolve_repo(params.repo.as_deref()) {
            Ok(repo) => repo,
            Err(e) => return Ok(e.to_tool_result()),
        };
        let result = self.client.fetch_latest_commit_message(&repo).await;
        self.finish("latest commit", &repo, result)
    }

    #[tool(
        name = "get_repository_details",
        description = "Get repository details: description, stars, forks, and open issues"
    )]
    async fn get_repository_details(
        &self,
        Parameters(params): Parameters<RepoParam>,
    ) -> Result<CallToolResult, ErrorData> {
        let repo = match self.resolve_repo(params.repo.as_deref()) {
            Ok(repo) => repo,
            Err(e) => return Ok(e.to_tool_result()),
        };
        let result = self.client.fetch_repo_info(&repo).await;
        self.finish("repo info", &repo, result)
    }

    #[tool(name = "list_pull_requests", description = "List open pull requests")]
    async fn list_pull_requests(
        &self,
        Parameters(params): Parameters<RepoParam>,
    ) -> Result<CallToolResult, ErrorData> {
        let repo = match self.resolve_repo(params.repo.as_deref()) {
            Ok(repo) => repo,
            Err(e) => return Ok(e.to_tool_result()),
        };
        let result = self.client.fetch_pull_requests(&repo).await;
        self.finish("PRs", &repo, result)
    }
}

#[tool_handler]
impl ServerHandler for GitReviewServer {
    fn get_info(&self) -> ServerInfo {
        ServerInfo {
            protocol_version: ProtocolVersion::V_2024_11_05,
            capabilities: ServerCapabilities::builder().enable_tools().build(),
            server_info: Implementation {
                name: "gitreview".to_string(),
                version: env!("CARGO_PKG_VERSION").to_string(),
                ..Default::default()
            },
            instructions: Some(
                "GitHub review server. Call set_github_repository once to pick a repository \
                 (and set_github_token for private repositories), then use list_commits, \
                 list_branches, get_latest_commit_message, get_repository_details and \
                 list_pull_requests. Each of those also accepts an explicit repo argument."
                    .to_string(),
            ),
        }
    }
}
