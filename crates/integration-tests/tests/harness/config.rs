//! Programmatic configuration builder for integration tests

use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use secrecy::SecretString;
use vigil_config::{Config, ImageFixtureConfig, LlmProviderConfig, LlmProviderType, MatrixConfig};
use vigil_harness::{Harness, HarnessSettings};
use vigil_llm::{LlmClient, RetryPolicy};

/// Builder for constructing test configurations
pub struct ConfigBuilder {
    config: Config,
}

impl ConfigBuilder {
    /// Create a new builder with no providers and an empty matrix
    pub fn new() -> Self {
        let mut config = Config::default();
        config.matrix = MatrixConfig {
            models: Vec::new(),
            image_models: Vec::new(),
            images: Vec::new(),
        };
        config.harness.num_retries = 0;
        config.harness.retry_backoff = Duration::from_millis(1);
        Self { config }
    }

    /// Add an OpenAI-compatible provider pointed at a mock backend
    pub fn with_openai_provider(mut self, name: &str, base_url: &str) -> Self {
        self.config.llm.providers.insert(
            name.to_owned(),
            LlmProviderConfig {
                provider_type: LlmProviderType::Openai,
                api_key: Some(SecretString::from("test-key")),
                base_url: Some(base_url.parse().expect("valid URL")),
            },
        );
        self
    }

    /// Provider-level retries with a tiny backoff
    pub fn with_retries(mut self, num_retries: u32) -> Self {
        self.config.harness.num_retries = num_retries;
        self
    }

    /// Text-case models
    pub fn with_models(mut self, models: &[&str]) -> Self {
        self.config.matrix.models = models.iter().map(|m| (*m).to_owned()).collect();
        self
    }

    /// Image-case models
    pub fn with_image_models(mut self, models: &[&str]) -> Self {
        self.config.matrix.image_models = models.iter().map(|m| (*m).to_owned()).collect();
        self
    }

    /// Use the repository's image fixtures
    pub fn with_fixture_images(mut self) -> Self {
        self.config.matrix.images = vec![
            ImageFixtureConfig {
                subtype: "jpeg".to_owned(),
                path: fixture_path("sample.jpeg"),
            },
            ImageFixtureConfig {
                subtype: "png".to_owned(),
                path: fixture_path("gradient.png"),
            },
        ];
        self
    }

    /// Build the final config
    pub fn build(self) -> Config {
        self.config.validate().expect("valid test config");
        self.config
    }
}

/// Absolute path of a file under the repository's `fixtures/`
pub fn fixture_path(name: &str) -> PathBuf {
    PathBuf::from(env!("CARGO_MANIFEST_DIR")).join("../../fixtures").join(name)
}

/// Client plus harness wired from `config`
pub async fn harness_for(config: &Config) -> Harness {
    let retry = RetryPolicy {
        max_retries: config.harness.num_retries,
        backoff: config.harness.retry_backoff,
    };
    let client = LlmClient::from_config(&config.llm, retry).await.expect("client builds");
    Harness::new(Arc::new(client), HarnessSettings::from(&config.harness))
}
