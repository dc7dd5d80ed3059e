use std::path::Path;

use crate::Config;

impl Config {
    /// Load configuration from a TOML file
    ///
    /// Reads the file, expands `{{ env.VAR }}` placeholders, then
    /// deserializes and validates the result. Relative image paths are
    /// resolved against the file's directory.
    ///
    /// # Errors
    ///
    /// Returns an error if the file cannot be read or [`Config::parse`] fails
    pub fn load(path: &Path) -> anyhow::Result<Self> {
        let raw = std::fs::read_to_string(path)
            .map_err(|e| anyhow::anyhow!("failed to read config file {}: {e}", path.display()))?;

        tracing::debug!(path = %path.display(), "loaded config file");

        let mut config = Self::parse(&raw)?;
        if let Some(dir) = path.parent() {
            config.matrix.anchor_images(dir);
        }

        Ok(config)
    }

    /// Parse and validate configuration text
    ///
    /// # Errors
    ///
    /// Returns an error if variable expansion, TOML parsing or validation fails
    pub fn parse(raw: &str) -> anyhow::Result<Self> {
        let expanded =
            crate::env::expand_env(raw).map_err(|e| anyhow::anyhow!("config variable expansion failed: {e}"))?;

        let config: Self = toml::from_str(&expanded).map_err(|e| anyhow::anyhow!("failed to parse config: {e}"))?;

        config.validate()?;

        Ok(config)
    }

    /// Validate that the configuration is internally consistent
    ///
    /// # Errors
    ///
    /// Returns an error if no provider is configured, a matrix model names an
    /// unknown provider, or a harness limit is zero
    pub fn validate(&self) -> anyhow::Result<()> {
        self.validate_providers()?;
        self.validate_matrix()?;
        self.validate_harness()?;
        Ok(())
    }

    fn validate_providers(&self) -> anyhow::Result<()> {
        if self.llm.providers.is_empty() {
            anyhow::bail!("at least one provider must be configured under [llm.providers]");
        }

        for name in self.llm.providers.keys() {
            if name.is_empty() || name.contains('/') {
                anyhow::bail!("provider name '{name}' must be non-empty and must not contain '/'");
            }
        }

        Ok(())
    }

    /// Every `provider/model` id must name a configured provider
    fn validate_matrix(&self) -> anyhow::Result<()> {
        let models = self.matrix.models.iter().chain(&self.matrix.image_models);

        for model in models {
            if let Some((provider, _)) = model.split_once('/')
                && !self.llm.providers.contains_key(provider)
            {
                anyhow::bail!("matrix model '{model}' references unknown provider '{provider}'");
            }
        }

        if !self.matrix.image_models.is_empty() && self.matrix.images.is_empty() {
            tracing::warn!("image models configured without image fixtures; image cases will be skipped");
        }

        Ok(())
    }

    fn validate_harness(&self) -> anyhow::Result<()> {
        if self.harness.max_words == 0 {
            anyhow::bail!("harness.max_words must be greater than 0");
        }

        if self.harness.concurrency == 0 {
            anyhow::bail!("harness.concurrency must be greater than 0");
        }

        Ok(())
    }
}
