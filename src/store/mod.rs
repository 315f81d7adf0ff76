//! Read/write contract against the persistent recipe store.
//!
//! Not-found is `Ok(None)`; every `Err` is an availability problem the
//! caller may retry. The mapping table tracks which catalog recipes have
//! already been imported so repeat lookups never spend quota twice.

mod memory;
mod sqlite;

pub use memory::MemoryStore;
pub use sqlite::SqliteStore;

use async_trait::async_trait;

use crate::error::StoreError;
use crate::model::Recipe;

/// Unified store interface for all persistence backends
#[async_trait]
pub trait RecipeStore: Send + Sync {
    /// Point lookup by canonical id.
    async fn get_by_id(&self, id: &str) -> Result<Option<Recipe>, StoreError>;

    /// Case-insensitive substring match over title and description.
    async fn search_by_text(&self, query: &str) -> Result<Vec<Recipe>, StoreError>;

    async fn insert(&self, recipe: &Recipe) -> Result<(), StoreError>;

    async fn delete(&self, id: &str) -> Result<(), StoreError>;

    /// All persisted generated recipes, oldest first by creation time.
    /// Ordering is load-bearing: the pool evicts the head of this list.
    async fn list_generated(&self) -> Result<Vec<Recipe>, StoreError>;

    /// The internal id a catalog recipe was imported under, if any.
    async fn find_mapping(&self, external_id: &str) -> Result<Option<String>, StoreError>;

    async fn record_mapping(&self, internal_id: &str, external_id: &str)
        -> Result<(), StoreError>;
}
