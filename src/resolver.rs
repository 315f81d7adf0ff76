//! The resolution facade: the two public operations that merge the local
//! store, the paid catalog, and the generative pipeline behind one API.

use std::collections::HashSet;
use std::sync::Arc;
use std::time::Duration;

use log::{debug, warn};
use tokio::task::JoinHandle;
use tokio::time::sleep;
use uuid::Uuid;

use crate::catalog::CatalogClient;
use crate::dedupe::{dedupe_by_title, normalize_title};
use crate::error::ResolveError;
use crate::filter;
use crate::generate::GenerativeAdapter;
use crate::model::{Provenance, Recipe, RecipeFilters, SeedRecord};
use crate::pool::GenerationPool;
use crate::recipe_id::{self, RecipeId};
use crate::retry::{with_retry, RetryPolicy};
use crate::seed::SeedClient;
use crate::store::RecipeStore;

pub struct RecipeResolver {
    store: Arc<dyn RecipeStore>,
    catalog: CatalogClient,
    seeds: SeedClient,
    generator: Arc<GenerativeAdapter>,
    pool: Arc<GenerationPool>,
    search_batch: usize,
    seed_fetch_delay: Duration,
    retry: RetryPolicy,
}

impl RecipeResolver {
    #[allow(clippy::too_many_arguments)]
    pub(crate) fn assemble(
        store: Arc<dyn RecipeStore>,
        catalog: CatalogClient,
        seeds: SeedClient,
        generator: GenerativeAdapter,
        pool_capacity: usize,
        search_batch: usize,
        seed_fetch_delay: Duration,
        retry: RetryPolicy,
    ) -> Self {
        RecipeResolver {
            store: store.clone(),
            catalog,
            seeds,
            generator: Arc::new(generator),
            pool: Arc::new(GenerationPool::new(store, pool_capacity)),
            search_batch,
            seed_fetch_delay,
            retry,
        }
    }

    /// Start building a resolver. See [`crate::builder::RecipeResolverBuilder`].
    pub fn builder() -> crate::builder::RecipeResolverBuilder {
        crate::builder::RecipeResolverBuilder::default()
    }

    /// Resolve a single recipe by its id. The id's form routes the call to
    /// exactly one source; a failure of that source is the failure of the
    /// whole call.
    pub async fn resolve_by_id(&self, id: &str) -> Result<Recipe, ResolveError> {
        match recipe_id::decode(id) {
            RecipeId::Local(key) => {
                let found = with_retry(&self.retry, "local store", || async {
                    Ok(self.store.get_by_id(&key).await?)
                })
                .await?;
                found.ok_or_else(|| ResolveError::NotFound(key))
            }
            RecipeId::Catalog(external_id) => self.resolve_catalog(&external_id).await,
            RecipeId::Generated(key) => self.resolve_generated(&key).await,
        }
    }

    /// Import-on-miss for catalog ids. The mapping table is checked first so
    /// a repeat lookup never spends quota on an already-imported recipe.
    async fn resolve_catalog(&self, external_id: &str) -> Result<Recipe, ResolveError> {
        let mapped = with_retry(&self.retry, "mapping lookup", || async {
            Ok(self.store.find_mapping(external_id).await?)
        })
        .await?;

        if let Some(internal_id) = &mapped {
            if let Some(recipe) = self.store.get_by_id(internal_id).await? {
                debug!("catalog {} already imported as {}", external_id, internal_id);
                return Ok(recipe);
            }
            debug!("mapping for catalog {} points at a deleted row", external_id);
        }

        let fetched = self.catalog.fetch_by_id(external_id).await?;
        if fetched.title.is_empty() {
            // persisted recipes carry a non-empty title
            return Err(ResolveError::SourceUnavailable(format!(
                "catalog recipe {} has no title",
                external_id
            )));
        }

        // Reuse the mapped internal id if the row was deleted out from
        // under the mapping, so the mapping stays truthful.
        let internal_id = mapped.unwrap_or_else(|| Uuid::new_v4().to_string());
        let imported = Recipe {
            id: internal_id.clone(),
            ..fetched
        };
        self.store.insert(&imported).await?;
        self.store.record_mapping(&internal_id, external_id).await?;
        Ok(imported)
    }

    /// Generate-on-miss for generated ids: a store hit returns the pooled
    /// entry; a miss re-derives the recipe from its seed and admits it.
    async fn resolve_generated(&self, key: &str) -> Result<Recipe, ResolveError> {
        let full_id = recipe_id::encode(Provenance::Generated, key);

        let found = with_retry(&self.retry, "local store", || async {
            Ok(self.store.get_by_id(&full_id).await?)
        })
        .await?;
        if let Some(recipe) = found {
            return Ok(recipe);
        }

        let seed = self.seeds.lookup(recipe_id::seed_id(key)).await?;
        let mut candidate = self.generator.generate_from_seed(&seed).await;
        candidate.id = full_id;
        self.pool.admit(candidate).await
    }

    /// Freeform generation: validate the model's output strictly, then
    /// admit the result to the pool under the usual capacity and
    /// duplicate-title rules.
    pub async fn generate_from_prompt(&self, request: &str) -> Result<Recipe, ResolveError> {
        let candidate = self.generator.generate_freeform(request).await?;
        self.pool.admit(candidate).await
    }

    /// Search all three sources concurrently and merge. An outage of the
    /// catalog or the generative pipeline shrinks the result set instead of
    /// failing the call; only a local-store failure is fatal.
    pub async fn search(
        &self,
        query: &str,
        filters: &RecipeFilters,
    ) -> Result<Vec<Recipe>, ResolveError> {
        let local_task = self.spawn_local_search(query);
        let catalog_task = self.spawn_catalog_search(query, filters);
        let generation_task = self.spawn_generation(query);

        let (local, catalog, generated) = tokio::join!(local_task, catalog_task, generation_task);

        let local = local
            .map_err(|e| ResolveError::StoreUnavailable(format!("search task: {}", e)))??;
        let catalog = degrade("catalog", catalog);
        let generated = degrade("generation", generated);

        // Merge order is load-bearing: first occurrence wins in the
        // deduplicator, and persisted recipes must win over fresh ones.
        let mut merged = local;
        merged.extend(catalog);
        merged.extend(generated);
        let merged = dedupe_by_title(merged);

        let admitted = self.reconcile_with_pool(merged).await?;

        let filtered: Vec<Recipe> = admitted
            .into_iter()
            .filter(|recipe| filter::matches(recipe, filters))
            .collect();

        Ok(self.cap_generated(filtered))
    }

    fn spawn_local_search(&self, query: &str) -> JoinHandle<Result<Vec<Recipe>, ResolveError>> {
        let store = self.store.clone();
        let retry = self.retry.clone();
        let query = query.to_string();
        tokio::spawn(async move {
            with_retry(&retry, "local search", || async {
                Ok(store.search_by_text(&query).await?)
            })
            .await
        })
    }

    fn spawn_catalog_search(
        &self,
        query: &str,
        filters: &RecipeFilters,
    ) -> JoinHandle<Result<Vec<Recipe>, ResolveError>> {
        let catalog = self.catalog.clone();
        let query = query.to_string();
        let filters = filters.clone();
        tokio::spawn(async move { catalog.search_by_text(&query, &filters).await })
    }

    fn spawn_generation(&self, query: &str) -> JoinHandle<Result<Vec<Recipe>, ResolveError>> {
        let seeds = self.seeds.clone();
        let generator = self.generator.clone();
        let query = query.to_string();
        let batch = self.search_batch;
        let delay = self.seed_fetch_delay;
        tokio::spawn(async move {
            let records = sample_seeds(&seeds, &query, batch, delay).await;
            let mut candidates = Vec::with_capacity(records.len());
            for record in &records {
                candidates.push(generator.generate_from_seed(record).await);
            }
            Ok(candidates)
        })
    }

    /// Admit fresh generated candidates one at a time, in production order,
    /// while the pool has room. Candidates whose titles are already pooled
    /// are skipped at admission but stay in the result set; candidates that
    /// find no room are returned unpersisted.
    async fn reconcile_with_pool(&self, merged: Vec<Recipe>) -> Result<Vec<Recipe>, ResolveError> {
        let pool_entries = self.pool.entries().await?;
        let mut pooled_titles: HashSet<String> = pool_entries
            .iter()
            .map(|entry| normalize_title(&entry.title))
            .collect();
        let persisted_ids: HashSet<String> =
            pool_entries.into_iter().map(|entry| entry.id).collect();

        let mut results = Vec::with_capacity(merged.len());
        for recipe in merged {
            let is_fresh_candidate = recipe.provenance == Provenance::Generated
                && !persisted_ids.contains(&recipe.id)
                && !pooled_titles.contains(&normalize_title(&recipe.title));

            if !is_fresh_candidate {
                results.push(recipe);
                continue;
            }

            match self.pool.admit_if_room(recipe.clone()).await {
                Ok(Some(entry)) => {
                    pooled_titles.insert(normalize_title(&entry.title));
                    results.push(entry);
                }
                Ok(None) => results.push(recipe),
                Err(ResolveError::DuplicateTitle(_)) => results.push(recipe),
                Err(e) => return Err(e),
            }
        }

        Ok(results)
    }

    /// The generated slice of a result set never exceeds the pool capacity,
    /// however many candidates survived filtering.
    fn cap_generated(&self, recipes: Vec<Recipe>) -> Vec<Recipe> {
        let capacity = self.pool.capacity();
        let mut generated_kept = 0;
        recipes
            .into_iter()
            .filter(|recipe| {
                if recipe.provenance == Provenance::Generated {
                    generated_kept += 1;
                    generated_kept <= capacity
                } else {
                    true
                }
            })
            .collect()
    }
}

/// Per-branch degradation: any failure becomes an empty contribution.
fn degrade(
    source: &str,
    joined: Result<Result<Vec<Recipe>, ResolveError>, tokio::task::JoinError>,
) -> Vec<Recipe> {
    match joined {
        Ok(Ok(recipes)) => recipes,
        Ok(Err(ResolveError::QuotaExceeded)) => {
            warn!("{} quota exhausted; contributing nothing", source);
            Vec::new()
        }
        Ok(Err(e)) => {
            warn!("{} branch failed: {}", source, e);
            Vec::new()
        }
        Err(e) => {
            warn!("{} branch panicked: {}", source, e);
            Vec::new()
        }
    }
}

/// Keyword-matched seeds first, padded with freshly sampled random records,
/// with a fixed short delay between fetches so bulk generation does not
/// hammer the free source.
async fn sample_seeds(
    seeds: &SeedClient,
    query: &str,
    batch: usize,
    delay: Duration,
) -> Vec<SeedRecord> {
    let mut records = match seeds.search(query).await {
        Ok(records) => records,
        Err(e) => {
            warn!("seed keyword search failed: {}", e);
            Vec::new()
        }
    };
    records.truncate(batch);

    let mut seen: HashSet<String> = records.iter().map(|r| r.id.clone()).collect();
    let mut attempts = 0;
    while records.len() < batch && attempts < batch * 2 {
        attempts += 1;
        sleep(delay).await;
        match seeds.random().await {
            Ok(record) => {
                if seen.insert(record.id.clone()) {
                    records.push(record);
                }
            }
            Err(e) => {
                warn!("seed sampling stopped: {}", e);
                break;
            }
        }
    }

    records
}
