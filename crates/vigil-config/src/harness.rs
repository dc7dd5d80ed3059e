use std::time::Duration;

use serde::{Deserialize, Deserializer};

/// Harness behaviour
#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct HarnessConfig {
    /// Log complete responses instead of summaries
    #[serde(default)]
    pub verbose: bool,
    /// Provider-level retries for retryable failures
    #[serde(default = "default_num_retries")]
    pub num_retries: u32,
    /// Base delay between retries (e.g. "500ms", "2s")
    #[serde(default = "default_retry_backoff", deserialize_with = "deserialize_duration")]
    pub retry_backoff: Duration,
    /// Word ceiling for system-prompt completions (exclusive)
    #[serde(default = "default_max_words")]
    pub max_words: usize,
    /// Matrix cases run at once
    #[serde(default = "default_concurrency")]
    pub concurrency: usize,
}

impl Default for HarnessConfig {
    fn default() -> Self {
        Self {
            verbose: false,
            num_retries: default_num_retries(),
            retry_backoff: default_retry_backoff(),
            max_words: default_max_words(),
            concurrency: default_concurrency(),
        }
    }
}

const fn default_num_retries() -> u32 {
    3
}

const fn default_retry_backoff() -> Duration {
    Duration::from_millis(500)
}

const fn default_max_words() -> usize {
    15
}

const fn default_concurrency() -> usize {
    4
}

fn deserialize_duration<'de, D>(deserializer: D) -> Result<Duration, D::Error>
where
    D: Deserializer<'de>,
{
    let raw = String::deserialize(deserializer)?;
    duration_str::parse(&raw).map_err(|e| serde::de::Error::custom(format!("invalid duration '{raw}': {e}")))
}
