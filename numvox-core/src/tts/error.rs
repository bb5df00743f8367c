use anyhow::anyhow;
use reqwest::StatusCode;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum TtsError {
    #[error("Rate limited: {0:#}")]
    RateLimited(anyhow::Error),

    #[error("Retryable error: {0:#}")]
    Retryable(anyhow::Error),

    #[error("Unauthorized: {0:#}")]
    Unauthorized(anyhow::Error),

    #[error("Terminal error: {0:#}")]
    Terminal(anyhow::Error),
}

impl TtsError {
    /// Whether another attempt at the same request may succeed.
    pub fn is_retryable(&self) -> bool {
        matches!(self, TtsError::RateLimited(_) | TtsError::Retryable(_))
    }

    pub fn is_unauthorized(&self) -> bool {
        matches!(self, TtsError::Unauthorized(_))
    }
}

impl From<serde_json::Error> for TtsError {
    fn from(source: serde_json::Error) -> Self {
        Self::Terminal(anyhow!(source))
    }
}

/// Map a failed HTTP response onto a [`TtsError`]. `rate_limit_markers` are
/// extra lowercase body fragments the provider uses to signal throttling.
pub fn classify_http_failure(
    provider: &str,
    status: StatusCode,
    body: &str,
    rate_limit_markers: &[&str],
) -> TtsError {
    let error = anyhow!("{provider} API error {status}: {body}");
    let body_lower = body.to_lowercase();

    if matches!(status, StatusCode::UNAUTHORIZED | StatusCode::FORBIDDEN) {
        return TtsError::Unauthorized(error);
    }

    let is_rate_limited = status == StatusCode::TOO_MANY_REQUESTS
        || body_lower.contains("rate limit")
        || rate_limit_markers
            .iter()
            .any(|marker| body_lower.contains(marker));
    if is_rate_limited {
        return TtsError::RateLimited(error);
    }

    if status.is_server_error() || status == StatusCode::REQUEST_TIMEOUT {
        return TtsError::Retryable(error);
    }

    TtsError::Terminal(error)
}

/// Map a transport-level failure (no response received).
pub fn classify_send_failure(provider: &str, error: reqwest::Error) -> TtsError {
    TtsError::Retryable(anyhow!("{provider} network error: {error}"))
}
