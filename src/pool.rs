//! The bounded pool of persisted generated recipes.
//!
//! Admission is the only mutating, capacity-bounded operation in the
//! subsystem: duplicate titles are rejected, and when the pool is full the
//! single oldest entry is evicted before the candidate is inserted. The
//! read-check-evict-insert sequence runs under one mutex so concurrent
//! admissions within a process cannot break the capacity invariant.

use std::sync::Arc;

use chrono::Utc;
use log::{debug, info};
use tokio::sync::Mutex;

use crate::dedupe::normalize_title;
use crate::error::ResolveError;
use crate::model::{Provenance, Recipe};
use crate::store::RecipeStore;

pub const DEFAULT_CAPACITY: usize = 5;

pub struct GenerationPool {
    store: Arc<dyn RecipeStore>,
    capacity: usize,
    admission: Mutex<()>,
}

impl GenerationPool {
    pub fn new(store: Arc<dyn RecipeStore>, capacity: usize) -> Self {
        GenerationPool {
            store,
            capacity: capacity.max(1),
            admission: Mutex::new(()),
        }
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }

    /// Current pool entries, oldest first.
    pub async fn entries(&self) -> Result<Vec<Recipe>, ResolveError> {
        Ok(self.store.list_generated().await?)
    }

    /// Admit a candidate: reject an exact-title duplicate, evict the oldest
    /// entry if the pool is at capacity, insert, and return the entry as
    /// persisted. The candidate's creation time is stamped at admission.
    pub async fn admit(&self, candidate: Recipe) -> Result<Recipe, ResolveError> {
        let _guard = self.admission.lock().await;
        let title = candidate.title.clone();
        self.admit_locked(candidate, true)
            .await?
            // may_evict admission always inserts
            .ok_or(ResolveError::DuplicateTitle(title))
    }

    /// Admit only if the pool has room: candidates arriving from a search
    /// batch must not evict entries that callers may be about to read.
    /// Returns `Ok(None)` when the pool is full.
    pub async fn admit_if_room(&self, candidate: Recipe) -> Result<Option<Recipe>, ResolveError> {
        let _guard = self.admission.lock().await;
        self.admit_locked(candidate, false).await
    }

    async fn admit_locked(
        &self,
        candidate: Recipe,
        may_evict: bool,
    ) -> Result<Option<Recipe>, ResolveError> {
        let title_key = normalize_title(&candidate.title);
        if title_key.is_empty() {
            return Err(ResolveError::GenerationInvalid(
                "candidate has no title".to_string(),
            ));
        }

        let pool = self.store.list_generated().await?;

        if pool
            .iter()
            .any(|entry| normalize_title(&entry.title) == title_key)
        {
            debug!("rejecting duplicate generated title {:?}", candidate.title);
            return Err(ResolveError::DuplicateTitle(candidate.title));
        }

        if pool.len() >= self.capacity {
            if !may_evict {
                return Ok(None);
            }
            // Oldest first: list_generated orders by creation time.
            if let Some(oldest) = pool.first() {
                info!(
                    "evicting oldest generated recipe {:?} to admit {:?}",
                    oldest.title, candidate.title
                );
                self.store.delete(&oldest.id).await?;
            }
        }

        let entry = Recipe {
            provenance: Provenance::Generated,
            created_at: Utc::now(),
            ..candidate
        };
        self.store.insert(&entry).await?;
        Ok(Some(entry))
    }
}
