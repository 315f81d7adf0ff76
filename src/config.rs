use config::{Config, ConfigError, Environment, File};
use serde::Deserialize;

/// Main resolver configuration structure
#[derive(Debug, Deserialize, Clone)]
pub struct ResolverConfig {
    /// Path of the SQLite recipe store
    #[serde(default = "default_store_path")]
    pub store_path: String,
    /// Paid catalog API settings
    #[serde(default)]
    pub catalog: CatalogConfig,
    /// Completion endpoint settings
    #[serde(default)]
    pub completion: CompletionConfig,
    /// Free seed source settings
    #[serde(default)]
    pub seed: SeedConfig,
    /// Maximum number of persisted generated recipes
    #[serde(default = "default_pool_capacity")]
    pub pool_capacity: usize,
    /// Generated candidates produced per search
    #[serde(default = "default_search_batch")]
    pub search_batch: usize,
    /// Fixed delay between seed fetches during bulk generation
    #[serde(default = "default_seed_fetch_delay_ms")]
    pub seed_fetch_delay_ms: u64,
    /// Retry behavior for retryable failures
    #[serde(default)]
    pub retry: RetryConfig,
}

#[derive(Debug, Deserialize, Clone, Default)]
pub struct CatalogConfig {
    /// API key for the catalog (can also be set via CATALOG_API_KEY)
    pub api_key: Option<String>,
    /// Base URL override (for proxies and tests)
    pub base_url: Option<String>,
}

#[derive(Debug, Deserialize, Clone)]
pub struct CompletionConfig {
    /// API key for the completion endpoint (can also be set via OPENAI_API_KEY)
    pub api_key: Option<String>,
    /// Base URL override (for proxies and tests)
    pub base_url: Option<String>,
    /// Model identifier
    #[serde(default = "default_model")]
    pub model: String,
    /// Temperature for generation (0.0-1.0)
    #[serde(default = "default_temperature")]
    pub temperature: f32,
    /// Maximum tokens to generate
    #[serde(default = "default_max_tokens")]
    pub max_tokens: u32,
}

impl Default for CompletionConfig {
    fn default() -> Self {
        CompletionConfig {
            api_key: None,
            base_url: None,
            model: default_model(),
            temperature: default_temperature(),
            max_tokens: default_max_tokens(),
        }
    }
}

#[derive(Debug, Deserialize, Clone, Default)]
pub struct SeedConfig {
    /// Base URL override (for proxies and tests)
    pub base_url: Option<String>,
}

/// Retry attempts and base delay for retryable failures
#[derive(Debug, Deserialize, Clone)]
pub struct RetryConfig {
    #[serde(default = "default_retry_attempts")]
    pub attempts: u32,
    #[serde(default = "default_retry_delay_ms")]
    pub delay_ms: u64,
}

impl Default for RetryConfig {
    fn default() -> Self {
        RetryConfig {
            attempts: default_retry_attempts(),
            delay_ms: default_retry_delay_ms(),
        }
    }
}

// Default value functions
fn default_store_path() -> String {
    "recipes.db".to_string()
}

fn default_pool_capacity() -> usize {
    crate::pool::DEFAULT_CAPACITY
}

fn default_search_batch() -> usize {
    5
}

fn default_seed_fetch_delay_ms() -> u64 {
    200
}

fn default_model() -> String {
    "gpt-4o-mini".to_string()
}

fn default_temperature() -> f32 {
    0.7
}

fn default_max_tokens() -> u32 {
    2000
}

fn default_retry_attempts() -> u32 {
    3
}

fn default_retry_delay_ms() -> u64 {
    250
}

impl ResolverConfig {
    /// Load configuration from file and environment variables
    ///
    /// Configuration is loaded with the following priority (highest to lowest):
    /// 1. Environment variables with RECIPE_RESOLVER__ prefix
    /// 2. config.toml file in current directory
    /// 3. Default values
    ///
    /// Environment variable format: RECIPE_RESOLVER__CATALOG__API_KEY
    pub fn load() -> Result<Self, ConfigError> {
        let settings = Config::builder()
            // Optional config file (can be missing)
            .add_source(File::with_name("config").required(false))
            // Use double underscore for nested: RECIPE_RESOLVER__CATALOG__API_KEY
            .add_source(
                Environment::with_prefix("RECIPE_RESOLVER")
                    .separator("__")
                    .try_parsing(true),
            )
            .build()?;

        settings.try_deserialize()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_values() {
        assert_eq!(default_store_path(), "recipes.db");
        assert_eq!(default_pool_capacity(), 5);
        assert_eq!(default_search_batch(), 5);
        assert_eq!(default_seed_fetch_delay_ms(), 200);
        assert_eq!(default_retry_attempts(), 3);
        assert_eq!(default_retry_delay_ms(), 250);
    }

    #[test]
    fn test_completion_config_default() {
        let completion = CompletionConfig::default();
        assert!(completion.api_key.is_none());
        assert_eq!(completion.model, "gpt-4o-mini");
        assert_eq!(completion.max_tokens, 2000);
    }

    #[test]
    fn test_config_deserializes_with_defaults() {
        let config: ResolverConfig = serde_json::from_str("{}").unwrap();
        assert_eq!(config.pool_capacity, 5);
        assert_eq!(config.search_batch, 5);
        assert!(config.catalog.api_key.is_none());
        assert_eq!(config.retry.attempts, 3);
    }
}
