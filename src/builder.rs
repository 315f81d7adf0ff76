use std::sync::Arc;
use std::time::Duration;

use crate::catalog::CatalogClient;
use crate::config::ResolverConfig;
use crate::error::ResolveError;
use crate::generate::{CompletionProvider, GenerativeAdapter, OpenAiCompletion};
use crate::resolver::RecipeResolver;
use crate::retry::RetryPolicy;
use crate::seed::SeedClient;
use crate::store::{RecipeStore, SqliteStore};

/// Builder for wiring a [`RecipeResolver`] out of its collaborators.
///
/// Every part can be injected; anything left unset is built from
/// [`ResolverConfig`] (file + environment).
///
/// # Example
/// ```no_run
/// use recipe_resolver::RecipeResolver;
///
/// # fn main() -> Result<(), recipe_resolver::ResolveError> {
/// let resolver = RecipeResolver::builder()
///     .catalog_api_key("spoon-key")
///     .pool_capacity(5)
///     .build()?;
/// # Ok(())
/// # }
/// ```
#[derive(Default)]
pub struct RecipeResolverBuilder {
    config: Option<ResolverConfig>,
    store: Option<Arc<dyn RecipeStore>>,
    provider: Option<Box<dyn CompletionProvider>>,
    catalog: Option<CatalogClient>,
    seeds: Option<SeedClient>,
    catalog_api_key: Option<String>,
    pool_capacity: Option<usize>,
    search_batch: Option<usize>,
}

impl RecipeResolverBuilder {
    /// Use a pre-loaded configuration instead of reading file/environment.
    pub fn config(mut self, config: ResolverConfig) -> Self {
        self.config = Some(config);
        self
    }

    /// Inject a store implementation (e.g. [`crate::store::MemoryStore`]).
    pub fn store(mut self, store: Arc<dyn RecipeStore>) -> Self {
        self.store = Some(store);
        self
    }

    /// Inject a completion provider implementation.
    pub fn completion_provider(mut self, provider: Box<dyn CompletionProvider>) -> Self {
        self.provider = Some(provider);
        self
    }

    /// Inject a fully-built catalog client.
    pub fn catalog_client(mut self, catalog: CatalogClient) -> Self {
        self.catalog = Some(catalog);
        self
    }

    /// Inject a fully-built seed source client.
    pub fn seed_client(mut self, seeds: SeedClient) -> Self {
        self.seeds = Some(seeds);
        self
    }

    /// Set the catalog API key directly.
    pub fn catalog_api_key(mut self, api_key: impl Into<String>) -> Self {
        self.catalog_api_key = Some(api_key.into());
        self
    }

    /// Override the generation pool capacity.
    pub fn pool_capacity(mut self, capacity: usize) -> Self {
        self.pool_capacity = Some(capacity);
        self
    }

    /// Override the per-search generation batch size.
    pub fn search_batch(mut self, batch: usize) -> Self {
        self.search_batch = Some(batch);
        self
    }

    pub fn build(self) -> Result<RecipeResolver, ResolveError> {
        let config = match self.config {
            Some(config) => config,
            None => ResolverConfig::load()?,
        };

        let store: Arc<dyn RecipeStore> = match self.store {
            Some(store) => store,
            None => Arc::new(SqliteStore::open(&config.store_path)?),
        };

        let catalog = match self.catalog {
            Some(catalog) => catalog,
            None => {
                // Try config first, then fall back to environment variable
                let api_key = self
                    .catalog_api_key
                    .or_else(|| config.catalog.api_key.clone())
                    .or_else(|| std::env::var("CATALOG_API_KEY").ok())
                    .ok_or_else(|| missing("catalog API key (catalog.api_key)"))?;
                match &config.catalog.base_url {
                    Some(base_url) => CatalogClient::with_base_url(api_key, base_url.clone()),
                    None => CatalogClient::new(api_key),
                }
            }
        };

        let seeds = match self.seeds {
            Some(seeds) => seeds,
            None => match &config.seed.base_url {
                Some(base_url) => SeedClient::with_base_url(base_url.clone()),
                None => SeedClient::new(),
            },
        };

        let provider: Box<dyn CompletionProvider> = match self.provider {
            Some(provider) => provider,
            None => {
                let api_key = config
                    .completion
                    .api_key
                    .clone()
                    .or_else(|| std::env::var("OPENAI_API_KEY").ok())
                    .ok_or_else(|| missing("completion API key (completion.api_key)"))?;
                let completion = match &config.completion.base_url {
                    Some(base_url) => OpenAiCompletion::with_base_url(
                        api_key,
                        base_url.clone(),
                        config.completion.model.clone(),
                    ),
                    None => OpenAiCompletion::new(api_key, config.completion.model.clone()),
                };
                Box::new(
                    completion
                        .with_sampling(config.completion.temperature, config.completion.max_tokens),
                )
            }
        };

        Ok(RecipeResolver::assemble(
            store,
            catalog,
            seeds,
            GenerativeAdapter::new(provider),
            self.pool_capacity.unwrap_or(config.pool_capacity),
            self.search_batch.unwrap_or(config.search_batch),
            Duration::from_millis(config.seed_fetch_delay_ms),
            RetryPolicy {
                attempts: config.retry.attempts,
                delay: Duration::from_millis(config.retry.delay_ms),
            },
        ))
    }
}

fn missing(what: &str) -> ResolveError {
    ResolveError::ConfigError(config::ConfigError::Message(format!(
        "{} not found in config or environment",
        what
    )))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::MemoryStore;

    fn test_config() -> ResolverConfig {
        serde_json::from_str("{}").unwrap()
    }

    #[test]
    fn test_build_with_injected_parts() {
        let mut config = test_config();
        config.catalog.api_key = Some("catalog-key".to_string());
        config.completion.api_key = Some("completion-key".to_string());

        let resolver = RecipeResolver::builder()
            .config(config)
            .store(Arc::new(MemoryStore::new()))
            .pool_capacity(3)
            .build();
        assert!(resolver.is_ok());
    }

    #[test]
    fn test_build_without_catalog_key_fails() {
        let mut config = test_config();
        config.completion.api_key = Some("completion-key".to_string());

        let result = RecipeResolver::builder()
            .config(config)
            .store(Arc::new(MemoryStore::new()))
            .build();
        // CATALOG_API_KEY may leak in from the environment; only assert the
        // error kind when construction fails.
        if let Err(e) = result {
            assert!(matches!(e, ResolveError::ConfigError(_)));
        }
    }
}
