//! Model routing over configured providers
//!
//! `LlmClient` is itself a [`Provider`], so the harness can drive a routed
//! multi-provider client and a single in-process provider the same way.

use std::sync::Arc;

use async_trait::async_trait;
use indexmap::IndexMap;
use vigil_config::{LlmConfig, LlmProviderType};

use crate::error::LlmError;
use crate::provider::bedrock::BedrockProvider;
use crate::provider::openai::OpenAiProvider;
use crate::provider::retry::{RetryPolicy, RetryingProvider};
use crate::provider::{CompletionStream, Provider, ProviderCapabilities};
use crate::types::{CompletionRequest, CompletionResponse};

/// A provider plus the model id it should receive
#[derive(Clone)]
pub struct ResolvedModel {
    /// Provider name (key in config)
    pub provider_name: String,
    /// Model identifier with any `provider/` prefix removed
    pub model_id: String,
    /// Provider serving the model
    pub provider: Arc<dyn Provider>,
}

impl std::fmt::Debug for ResolvedModel {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ResolvedModel")
            .field("provider_name", &self.provider_name)
            .field("model_id", &self.model_id)
            .finish_non_exhaustive()
    }
}

/// Chat-completion client routing `provider/model` ids to providers
#[derive(Clone, Default)]
pub struct LlmClient {
    providers: IndexMap<String, Arc<dyn Provider>>,
}

impl LlmClient {
    /// Empty client; add providers with [`LlmClient::with_provider`]
    pub fn new() -> Self {
        Self::default()
    }

    /// Build every configured provider, each wrapped in `retry`
    ///
    /// # Errors
    ///
    /// Returns an error if any provider fails to initialize.
    pub async fn from_config(config: &LlmConfig, retry: RetryPolicy) -> Result<Self, LlmError> {
        let mut client = Self::new();

        for (name, provider_config) in &config.providers {
            let provider: Arc<dyn Provider> = match &provider_config.provider_type {
                LlmProviderType::Openai => Arc::new(OpenAiProvider::new(name.clone(), provider_config)?),
                LlmProviderType::Bedrock(_) => Arc::new(BedrockProvider::new(name.clone(), provider_config).await?),
            };

            tracing::debug!(provider = %name, max_retries = retry.max_retries, "provider initialized");
            client = client.with_provider(name.clone(), Arc::new(RetryingProvider::new(provider, retry)));
        }

        Ok(client)
    }

    /// Register a provider under `name`
    ///
    /// The first registered provider receives bare model ids.
    #[must_use]
    pub fn with_provider(mut self, name: impl Into<String>, provider: Arc<dyn Provider>) -> Self {
        self.providers.insert(name.into(), provider);
        self
    }

    /// Names of registered providers in registration order
    pub fn provider_names(&self) -> impl Iterator<Item = &str> {
        self.providers.keys().map(String::as_str)
    }

    /// Resolve a model id to a provider
    ///
    /// - `provider/model` selects the named provider and strips the prefix
    /// - a bare `model` goes to the first registered provider
    ///
    /// # Errors
    ///
    /// Returns `LlmError::ProviderNotFound` for an unknown explicit provider
    /// and `LlmError::ModelNotFound` when no provider is registered.
    pub fn resolve(&self, model: &str) -> Result<ResolvedModel, LlmError> {
        if let Some((provider_name, model_id)) = model.split_once('/') {
            let provider = self
                .providers
                .get(provider_name)
                .ok_or_else(|| LlmError::ProviderNotFound {
                    provider: provider_name.to_owned(),
                })?;

            return Ok(ResolvedModel {
                provider_name: provider_name.to_owned(),
                model_id: model_id.to_owned(),
                provider: Arc::clone(provider),
            });
        }

        let (provider_name, provider) = self.providers.first().ok_or_else(|| LlmError::ModelNotFound {
            model: model.to_owned(),
        })?;

        Ok(ResolvedModel {
            provider_name: provider_name.clone(),
            model_id: model.to_owned(),
            provider: Arc::clone(provider),
        })
    }

    fn routed(&self, request: &CompletionRequest) -> Result<(ResolvedModel, CompletionRequest), LlmError> {
        let resolved = self.resolve(&request.model)?;
        let mut routed = request.clone();
        routed.model.clone_from(&resolved.model_id);

        tracing::debug!(
            model = %request.model,
            provider = %resolved.provider_name,
            model_id = %resolved.model_id,
            "resolved model"
        );

        Ok((resolved, routed))
    }
}

#[async_trait]
impl Provider for LlmClient {
    fn name(&self) -> &str {
        "router"
    }

    fn capabilities(&self) -> ProviderCapabilities {
        let all = |f: fn(&ProviderCapabilities) -> bool| {
            !self.providers.is_empty() && self.providers.values().all(|p| f(&p.capabilities()))
        };

        ProviderCapabilities {
            streaming: all(|c| c.streaming),
            tool_calling: all(|c| c.tool_calling),
            vision: all(|c| c.vision),
        }
    }

    async fn complete(&self, request: &CompletionRequest) -> Result<CompletionResponse, LlmError> {
        let (resolved, routed) = self.routed(request)?;
        let mut response = resolved.provider.complete(&routed).await?;
        // callers see the id they asked for
        response.model.clone_from(&request.model);
        Ok(response)
    }

    async fn complete_stream(&self, request: &CompletionRequest) -> Result<CompletionStream, LlmError> {
        let (resolved, routed) = self.routed(request)?;
        resolved.provider.complete_stream(&routed).await
    }
}
