use std::sync::Arc;
use std::time::Duration;

use anyhow::Result;
use clap::Parser;
use gitreview::client::{OctocrabTransport, RepositoryClient, DEFAULT_API_URL};
use gitreview::server::GitReviewServer;
use gitreview::session::{SessionContext, TOKEN_TTL};
use rmcp::{transport::stdio, ServiceExt};
use tracing_subscriber::EnvFilter;

/// MCP server for reviewing GitHub repositories: commits, branches, and pull requests
#[derive(Parser)]
#[command(name = "gitreview", version, about)]
struct Cli {
    /// GitHub personal access token to start the session with.
    /// Like tokens set through the set_github_token tool, it expires after one hour.
    #[arg(long)]
    token: Option<String>,

    /// Read the startup token from an environment variable.
    /// Default: GITHUB_TOKEN
    #[arg(long = "token-env")]
    token_env: Option<String>,

    /// Repository (owner/name) to select at startup
    #[arg(long)]
    repo: Option<String>,

    /// GitHub API base URL
    #[arg(long = "api-url", default_value = DEFAULT_API_URL)]
    api_url: String,

    /// Connect and read timeout for GitHub requests, in seconds
    #[arg(long = "timeout-secs")]
    timeout_secs: Option<u64>,
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .with_writer(std::io::stderr)
        .init();

    // Resolve token: --token > --token-env > GITHUB_TOKEN
    let token = if let Some(t) = cli.token {
        Some(t)
    } else {
        let env_name = cli.token_env.as_deref().unwrap_or("GITHUB_TOKEN");
        match std::env::var(env_name) {
            Ok(t) if !t.is_empty() => {
                tracing::info!(env = env_name, "Read GitHub token from environment variable");
                Some(t)
            }
            _ => None,
        }
    };

    let session = Arc::new(SessionContext::new());
    if let Some(t) = token {
        session.set_token(t, TOKEN_TTL);
    } else {
        tracing::warn!("No GitHub token provided; requests are unauthenticated until set_github_token is called");
    }
    if let Some(ref repo) = cli.repo {
        session.set_repository(repo.clone());
    }

    let transport = OctocrabTransport::new(&cli.api_url, cli.timeout_secs.map(Duration::from_secs))
        .map_err(|e| anyhow::anyhow!("Failed to create GitHub client: {}", e))?;
    let client = RepositoryClient::new(Arc::new(transport), session.clone());

    tracing::info!(
        authenticated = session.has_token(),
        repo = cli.repo.as_deref().unwrap_or("none"),
        api_url = %cli.api_url,
        "Starting gitreview server"
    );

    let service = GitReviewServer::new(session, client);
    let running = service.serve(stdio()).await?;
    running.waiting().await?;

    Ok(())
}
