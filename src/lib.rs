//! Federated recipe resolution with a bounded generation cache.
//!
//! Answers "give me recipe X" and "search for recipes matching Q" by
//! transparently merging three unreliable sources: the persistent local
//! store, a paid external catalog with a hard quota, and a generative
//! pipeline that synthesizes recipes from free seed records plus a
//! completion call. Generated content is capped by a fixed-capacity pool
//! that evicts its oldest entry.

pub mod builder;
pub mod catalog;
pub mod config;
pub mod dedupe;
pub mod error;
pub mod filter;
pub mod generate;
pub mod model;
pub mod pool;
pub mod recipe_id;
pub mod resolver;
pub mod retry;
pub mod seed;
pub mod store;

pub use builder::RecipeResolverBuilder;
pub use config::ResolverConfig;
pub use error::{ResolveError, StoreError};
pub use model::{Nutrition, Provenance, Recipe, RecipeFilters, SeedRecord};
pub use resolver::RecipeResolver;

/// Resolve one recipe by id, building a resolver from file/environment
/// configuration.
pub async fn resolve_recipe(id: &str) -> Result<Recipe, ResolveError> {
    RecipeResolver::builder().build()?.resolve_by_id(id).await
}

/// Search all sources for recipes matching `query`, building a resolver
/// from file/environment configuration.
pub async fn search_recipes(
    query: &str,
    filters: &RecipeFilters,
) -> Result<Vec<Recipe>, ResolveError> {
    RecipeResolver::builder().build()?.search(query, filters).await
}
