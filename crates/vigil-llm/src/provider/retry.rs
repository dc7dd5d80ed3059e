//! Provider wrapper that retries transient failures

use std::future::Future;
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;

use super::{CompletionStream, Provider, ProviderCapabilities};
use crate::error::LlmError;
use crate::types::{CompletionRequest, CompletionResponse};

/// How often and how patiently to retry
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetryPolicy {
    /// Extra attempts after the first one
    pub max_retries: u32,
    /// Delay before the first retry; retry `n` waits `backoff * n`
    pub backoff: Duration,
}

impl RetryPolicy {
    /// Policy that never retries
    pub const fn none() -> Self {
        Self {
            max_retries: 0,
            backoff: Duration::ZERO,
        }
    }

    fn delay(&self, retry: u32) -> Duration {
        self.backoff.saturating_mul(retry)
    }

    /// Run `op` until it succeeds, fails with a non-retryable error, or the
    /// retry budget is spent
    pub async fn run<T, F, Fut>(&self, label: &str, mut op: F) -> Result<T, LlmError>
    where
        F: FnMut() -> Fut,
        Fut: Future<Output = Result<T, LlmError>>,
    {
        let mut retry = 0;
        loop {
            match op().await {
                Ok(value) => return Ok(value),
                Err(err) if err.is_retryable() && retry < self.max_retries => {
                    retry += 1;
                    let delay = self.delay(retry);
                    tracing::warn!(
                        op = label,
                        attempt = retry,
                        max_retries = self.max_retries,
                        delay_ms = u64::try_from(delay.as_millis()).unwrap_or(u64::MAX),
                        error = %err,
                        "retrying after transient provider error"
                    );
                    tokio::time::sleep(delay).await;
                }
                Err(err) => return Err(err),
            }
        }
    }
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_retries: 3,
            backoff: Duration::from_millis(500),
        }
    }
}

/// Wraps a provider and retries retryable failures
///
/// Streams are retried only while opening; once events flow, errors are
/// handed to the consumer unchanged.
pub struct RetryingProvider {
    inner: Arc<dyn Provider>,
    policy: RetryPolicy,
}

impl RetryingProvider {
    /// Wrap `inner` with `policy`
    pub fn new(inner: Arc<dyn Provider>, policy: RetryPolicy) -> Self {
        Self { inner, policy }
    }
}

#[async_trait]
impl Provider for RetryingProvider {
    fn name(&self) -> &str {
        self.inner.name()
    }

    fn capabilities(&self) -> ProviderCapabilities {
        self.inner.capabilities()
    }

    async fn complete(&self, request: &CompletionRequest) -> Result<CompletionResponse, LlmError> {
        self.policy.run("complete", || self.inner.complete(request)).await
    }

    async fn complete_stream(&self, request: &CompletionRequest) -> Result<CompletionStream, LlmError> {
        self.policy
            .run("complete_stream", || self.inner.complete_stream(request))
            .await
    }
}
