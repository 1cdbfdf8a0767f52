//! Provider-agnostic types for the fallback client

use async_trait::async_trait;
use reqwest::StatusCode;
use thiserror::Error;

/// Maximum number of characters of an error body kept for diagnostics
pub const ERROR_BODY_LIMIT: usize = 200;

/// Why a single provider attempt failed
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ProviderError {
    /// HTTP 429
    #[error("rate limit exceeded")]
    RateLimited,

    /// HTTP 401 or 403
    #[error("authentication failed (status {status})")]
    Unauthorized { status: u16 },

    /// Any other non-2xx status
    #[error("request failed with status {status}: {body}")]
    Status { status: u16, body: String },

    /// Network failure or timeout
    #[error("transport error: {0}")]
    Transport(String),

    /// 2xx response whose body did not have the expected shape
    #[error("malformed response body: {0}")]
    MalformedBody(String),
}

impl ProviderError {
    /// Map a non-success HTTP status (and its body) to an error kind
    pub fn from_status(status: StatusCode, body: &str) -> Self {
        match status.as_u16() {
            429 => Self::RateLimited,
            code @ (401 | 403) => Self::Unauthorized { status: code },
            code => Self::Status {
                status: code,
                body: truncate_chars(body, ERROR_BODY_LIMIT),
            },
        }
    }

    /// Whether another attempt against the same provider may succeed
    pub fn is_retryable(&self) -> bool {
        matches!(self, Self::RateLimited | Self::Transport(_))
    }
}

impl From<reqwest::Error> for ProviderError {
    fn from(e: reqwest::Error) -> Self {
        if e.is_decode() {
            Self::MalformedBody(e.to_string())
        } else {
            Self::Transport(e.to_string())
        }
    }
}

/// Trait that every LLM backend implements.
///
/// One call to [`LlmProvider::generate`] is exactly one outbound request;
/// retries and failover live in [`super::FallbackClient`].
#[async_trait]
pub trait LlmProvider: Send + Sync {
    /// Human-readable provider name (e.g. "gemini", "claude")
    fn provider_name(&self) -> &str;

    /// Model identifier sent to the provider
    fn model(&self) -> &str;

    /// Send a single-turn prompt and return the trimmed response text
    async fn generate(&self, prompt: &str) -> Result<String, ProviderError>;
}

/// Keep at most `limit` chars of `s`, respecting UTF-8 boundaries
pub fn truncate_chars(s: &str, limit: usize) -> String {
    s.chars().take(limit).collect()
}

/// Build the HTTP client shared by all adapters
pub(crate) fn http_client(timeout: std::time::Duration) -> Result<reqwest::Client, ProviderError> {
    reqwest::Client::builder()
        .timeout(timeout)
        .build()
        .map_err(|e| ProviderError::Transport(format!("failed to build HTTP client: {}", e)))
}

/// Read a response, returning its body on 2xx or the classified error otherwise
pub(crate) async fn check_status(response: reqwest::Response) -> Result<reqwest::Response, ProviderError> {
    let status = response.status();
    if status.is_success() {
        return Ok(response);
    }
    let body = response
        .text()
        .await
        .unwrap_or_else(|_| "Unknown error".to_string());
    Err(ProviderError::from_status(status, &body))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_from_status_rate_limited() {
        let err = ProviderError::from_status(StatusCode::TOO_MANY_REQUESTS, "slow down");
        assert_eq!(err, ProviderError::RateLimited);
    }

    #[test]
    fn test_from_status_auth() {
        assert_eq!(
            ProviderError::from_status(StatusCode::UNAUTHORIZED, ""),
            ProviderError::Unauthorized { status: 401 }
        );
        assert_eq!(
            ProviderError::from_status(StatusCode::FORBIDDEN, ""),
            ProviderError::Unauthorized { status: 403 }
        );
    }

    #[test]
    fn test_from_status_truncates_body() {
        let body = "x".repeat(500);
        match ProviderError::from_status(StatusCode::INTERNAL_SERVER_ERROR, &body) {
            ProviderError::Status { status, body } => {
                assert_eq!(status, 500);
                assert_eq!(body.len(), ERROR_BODY_LIMIT);
            }
            other => panic!("unexpected error kind: {other:?}"),
        }
    }

    #[test]
    fn test_retryable_kinds() {
        assert!(ProviderError::RateLimited.is_retryable());
        assert!(ProviderError::Transport("timed out".into()).is_retryable());
        assert!(!ProviderError::Unauthorized { status: 401 }.is_retryable());
        assert!(!ProviderError::MalformedBody("no candidates".into()).is_retryable());
        assert!(
            !ProviderError::Status {
                status: 500,
                body: String::new()
            }
            .is_retryable()
        );
    }

    #[test]
    fn test_truncate_chars_multibyte() {
        assert_eq!(truncate_chars("héllo", 2), "hé");
        assert_eq!(truncate_chars("ab", 10), "ab");
    }
}
