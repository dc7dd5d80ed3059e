use thiserror::Error;

/// Errors that can occur while talking to a chat-completion provider
#[derive(Debug, Error)]
pub enum LlmError {
    /// Requested model was not found in any configured provider
    #[error("model not found: {model}")]
    ModelNotFound { model: String },

    /// Named provider does not exist in configuration
    #[error("provider not found: {provider}")]
    ProviderNotFound { provider: String },

    /// Upstream provider returned an error
    #[error("upstream error: {0}")]
    Upstream(String),

    /// Provider reported a fault on its own side (HTTP 5xx, Bedrock internal/model errors)
    #[error("provider internal error: {0}")]
    ProviderInternal(String),

    /// Error during streaming response
    #[error("streaming error: {0}")]
    Streaming(String),

    /// Provider rejected the request as malformed
    #[error("invalid request: {0}")]
    InvalidRequest(String),

    /// Provider rejected the credentials
    #[error("authentication failed: {0}")]
    Unauthorized(String),

    /// Provider throttled the request
    #[error("rate limit exceeded: {message}")]
    RateLimited {
        /// Provider supplied detail
        message: String,
    },

    /// Unexpected internal error
    #[error("internal error: {0}")]
    Internal(#[from] anyhow::Error),
}

/// Coarse classification of an [`LlmError`]
///
/// Callers match on kinds instead of error text when deciding whether a
/// failure is expected.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ErrorKind {
    /// Provider throttled the request
    RateLimited,
    /// Transient fault inside the provider
    ProviderInternal,
    /// Request was malformed or referenced something unknown
    InvalidRequest,
    /// Credentials were rejected
    Unauthorized,
    /// Any other upstream failure
    Upstream,
    /// Failure while consuming a stream
    Streaming,
    /// Failure inside this crate
    Internal,
}

impl ErrorKind {
    /// Stable lowercase name used in logs and reports
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::RateLimited => "rate_limited",
            Self::ProviderInternal => "provider_internal",
            Self::InvalidRequest => "invalid_request",
            Self::Unauthorized => "unauthorized",
            Self::Upstream => "upstream",
            Self::Streaming => "streaming",
            Self::Internal => "internal",
        }
    }
}

impl std::fmt::Display for ErrorKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl LlmError {
    /// Classify this error
    pub const fn kind(&self) -> ErrorKind {
        match self {
            Self::RateLimited { .. } => ErrorKind::RateLimited,
            Self::ProviderInternal(_) => ErrorKind::ProviderInternal,
            Self::ModelNotFound { .. } | Self::ProviderNotFound { .. } | Self::InvalidRequest(_) => {
                ErrorKind::InvalidRequest
            }
            Self::Unauthorized(_) => ErrorKind::Unauthorized,
            Self::Upstream(_) => ErrorKind::Upstream,
            Self::Streaming(_) => ErrorKind::Streaming,
            Self::Internal(_) => ErrorKind::Internal,
        }
    }

    /// Whether repeating the same request may succeed
    pub const fn is_retryable(&self) -> bool {
        matches!(
            self,
            Self::Upstream(_) | Self::ProviderInternal(_) | Self::Streaming(_) | Self::RateLimited { .. }
        )
    }
}
