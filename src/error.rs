use rmcp::model::{CallToolResult, Content};

#[derive(Debug, thiserror::Error)]
pub enum GitReviewError {
    #[error("No repository set. Please call `set_github_repository` first.")]
    MissingRepository,

    #[error("{0}")]
    MissingParam(String),

    #[error("GitHub API error: status {status}, body: {body}")]
    Api { status: u16, body: String },

    #[error("failed to decode GitHub response: {0}")]
    Decode(#[from] serde_json::Error),

    #[error("request to GitHub failed: {0}")]
    Transport(#[from] octocrab::Error),

    #[error("invalid request header: {0}")]
    InvalidHeader(String),
}

impl GitReviewError {
    /// Render the error as a tool-level error payload. Tool failures never
    /// surface as protocol errors.
    pub fn to_tool_result(&self) -> CallToolResult {
        CallToolResult::error(vec![Content::text(self.to_string())])
    }

    /// Same as [`to_tool_result`](Self::to_tool_result) with a leading context
    /// such as `"Error fetching commits"`.
    pub fn to_tool_result_with(&self, context: &str) -> CallToolResult {
        CallToolResult::error(vec![Content::text(format!("{}: {}", context, self))])
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_api_error_carries_status_and_body() {
        let err = GitReviewError::Api {
            status: 404,
            body: r#"{"message":"Not Found"}"#.to_string(),
        };
        let text = err.to_string();
        assert!(text.contains("404"));
        assert!(text.contains(r#"{"message":"Not Found"}"#));
    }

    #[test]
    fn test_tool_result_is_error() {
        let result = GitReviewError::MissingRepository.to_tool_result();
        assert_eq!(result.is_error, Some(true));
    }
}
