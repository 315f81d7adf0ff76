use std::collections::HashMap;
use std::sync::RwLock;

use async_trait::async_trait;
use chrono::{DateTime, Utc};

use crate::error::StoreError;
use crate::model::{Provenance, Recipe};
use crate::store::RecipeStore;

/// In-memory store. Backs tests and small embedded deployments where the
/// SQLite file is not wanted.
#[derive(Default)]
pub struct MemoryStore {
    inner: RwLock<Inner>,
}

#[derive(Default)]
struct Inner {
    recipes: HashMap<String, Recipe>,
    // external id -> (internal id, import time)
    mappings: HashMap<String, (String, DateTime<Utc>)>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    fn lock_read(&self) -> Result<std::sync::RwLockReadGuard<'_, Inner>, StoreError> {
        self.inner
            .read()
            .map_err(|e| StoreError::Unavailable(format!("lock poisoned: {}", e)))
    }

    fn lock_write(&self) -> Result<std::sync::RwLockWriteGuard<'_, Inner>, StoreError> {
        self.inner
            .write()
            .map_err(|e| StoreError::Unavailable(format!("lock poisoned: {}", e)))
    }
}

#[async_trait]
impl RecipeStore for MemoryStore {
    async fn get_by_id(&self, id: &str) -> Result<Option<Recipe>, StoreError> {
        Ok(self.lock_read()?.recipes.get(id).cloned())
    }

    async fn search_by_text(&self, query: &str) -> Result<Vec<Recipe>, StoreError> {
        let needle = query.trim().to_lowercase();
        let inner = self.lock_read()?;
        let mut results: Vec<Recipe> = inner
            .recipes
            .values()
            .filter(|r| {
                needle.is_empty()
                    || r.title.to_lowercase().contains(&needle)
                    || r.description.to_lowercase().contains(&needle)
            })
            .cloned()
            .collect();
        results.sort_by(|a, b| a.created_at.cmp(&b.created_at));
        Ok(results)
    }

    async fn insert(&self, recipe: &Recipe) -> Result<(), StoreError> {
        self.lock_write()?
            .recipes
            .insert(recipe.id.clone(), recipe.clone());
        Ok(())
    }

    async fn delete(&self, id: &str) -> Result<(), StoreError> {
        self.lock_write()?.recipes.remove(id);
        Ok(())
    }

    async fn list_generated(&self) -> Result<Vec<Recipe>, StoreError> {
        let inner = self.lock_read()?;
        let mut pool: Vec<Recipe> = inner
            .recipes
            .values()
            .filter(|r| r.provenance == Provenance::Generated)
            .cloned()
            .collect();
        pool.sort_by(|a, b| a.created_at.cmp(&b.created_at));
        Ok(pool)
    }

    async fn find_mapping(&self, external_id: &str) -> Result<Option<String>, StoreError> {
        Ok(self
            .lock_read()?
            .mappings
            .get(external_id)
            .map(|(internal, _)| internal.clone()))
    }

    async fn record_mapping(
        &self,
        internal_id: &str,
        external_id: &str,
    ) -> Result<(), StoreError> {
        let mut inner = self.lock_write()?;
        // At most one import per external id.
        inner
            .mappings
            .entry(external_id.to_string())
            .or_insert_with(|| (internal_id.to_string(), Utc::now()));
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn recipe(id: &str, title: &str, provenance: Provenance, ts: i64) -> Recipe {
        Recipe {
            id: id.to_string(),
            title: title.to_string(),
            description: format!("{} description", title),
            image_url: String::new(),
            ingredients: vec![],
            instructions: vec![],
            cuisine_type: String::new(),
            diet_type: String::new(),
            cook_time: String::new(),
            cook_time_minutes: None,
            nutrition: None,
            provenance,
            owner_ref: "system".to_string(),
            created_at: Utc.timestamp_opt(ts, 0).unwrap(),
        }
    }

    #[tokio::test]
    async fn test_insert_get_delete() {
        let store = MemoryStore::new();
        let r = recipe("a", "Gnocchi", Provenance::Local, 1);
        store.insert(&r).await.unwrap();
        assert!(store.get_by_id("a").await.unwrap().is_some());
        store.delete("a").await.unwrap();
        assert!(store.get_by_id("a").await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_search_matches_title_and_description() {
        let store = MemoryStore::new();
        store
            .insert(&recipe("a", "Lentil Soup", Provenance::Local, 1))
            .await
            .unwrap();
        store
            .insert(&recipe("b", "Plain Bread", Provenance::Local, 2))
            .await
            .unwrap();

        let by_title = store.search_by_text("LENTIL").await.unwrap();
        assert_eq!(by_title.len(), 1);

        // "description" appears in every test description field
        let by_description = store.search_by_text("description").await.unwrap();
        assert_eq!(by_description.len(), 2);
    }

    #[tokio::test]
    async fn test_list_generated_is_oldest_first() {
        let store = MemoryStore::new();
        store
            .insert(&recipe("g2", "Second", Provenance::Generated, 20))
            .await
            .unwrap();
        store
            .insert(&recipe("g1", "First", Provenance::Generated, 10))
            .await
            .unwrap();
        store
            .insert(&recipe("l1", "Local", Provenance::Local, 5))
            .await
            .unwrap();

        let pool = store.list_generated().await.unwrap();
        let ids: Vec<&str> = pool.iter().map(|r| r.id.as_str()).collect();
        assert_eq!(ids, vec!["g1", "g2"]);
    }

    #[tokio::test]
    async fn test_mapping_is_first_write_wins() {
        let store = MemoryStore::new();
        store.record_mapping("internal-1", "716429").await.unwrap();
        store.record_mapping("internal-2", "716429").await.unwrap();
        assert_eq!(
            store.find_mapping("716429").await.unwrap(),
            Some("internal-1".to_string())
        );
        assert_eq!(store.find_mapping("99999").await.unwrap(), None);
    }
}
