//! MCP server that lets LLMs review GitHub repositories: recent commits,
//! branches, open pull requests, and repository details.
//!
//! A [`session::SessionContext`] holds the active repository and a
//! time-limited token; [`client::RepositoryClient`] turns GitHub REST responses
//! into plain-text summaries; [`server::GitReviewServer`] exposes both as tools.

pub mod client;
pub mod error;
pub mod server;
pub mod session;
pub mod types;
