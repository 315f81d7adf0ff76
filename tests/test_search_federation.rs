//! Integration tests for the fan-out search: merging, dedup, partial
//! failure, and the generated-slice cap.

use std::sync::Arc;

use async_trait::async_trait;
use chrono::{TimeZone, Utc};
use mockito::{Matcher, Server, ServerGuard};

use recipe_resolver::catalog::CatalogClient;
use recipe_resolver::generate::OpenAiCompletion;
use recipe_resolver::seed::SeedClient;
use recipe_resolver::store::{MemoryStore, RecipeStore};
use recipe_resolver::{
    Nutrition, Provenance, Recipe, RecipeFilters, RecipeResolver, ResolveError, StoreError,
};

fn test_config() -> recipe_resolver::ResolverConfig {
    let mut config: recipe_resolver::ResolverConfig = serde_json::from_str("{}").unwrap();
    config.seed_fetch_delay_ms = 1;
    config
}

fn local_recipe(id: &str, title: &str, ts: i64) -> Recipe {
    Recipe {
        id: id.to_string(),
        title: title.to_string(),
        description: format!("{} from the neighbourhood", title),
        image_url: String::new(),
        ingredients: vec!["salt".to_string()],
        instructions: vec!["Cook".to_string()],
        cuisine_type: "italian".to_string(),
        diet_type: "none".to_string(),
        cook_time: "20 mins".to_string(),
        cook_time_minutes: Some(20),
        nutrition: Some(Nutrition::default()),
        provenance: Provenance::Local,
        owner_ref: "user-7".to_string(),
        created_at: Utc.timestamp_opt(ts, 0).unwrap(),
    }
}

fn generated_recipe(id: &str, title: &str, ts: i64) -> Recipe {
    Recipe {
        provenance: Provenance::Generated,
        owner_ref: "system".to_string(),
        ..local_recipe(id, title, ts)
    }
}

async fn resolver_against(
    catalog: &ServerGuard,
    seeds: &ServerGuard,
    completion: &ServerGuard,
    store: Arc<MemoryStore>,
    batch: usize,
) -> RecipeResolver {
    RecipeResolver::builder()
        .config(test_config())
        .store(store)
        .catalog_client(CatalogClient::with_base_url("k".to_string(), catalog.url()))
        .seed_client(SeedClient::with_base_url(seeds.url()))
        .completion_provider(Box::new(OpenAiCompletion::with_base_url(
            "k".to_string(),
            completion.url(),
            "test-model".to_string(),
        )))
        .search_batch(batch)
        .build()
        .unwrap()
}

fn seed_search_body(meals: &[(&str, &str)]) -> String {
    let entries: Vec<String> = meals
        .iter()
        .map(|(id, title)| {
            format!(
                r#"{{
                    "idMeal": "{}",
                    "strMeal": "{}",
                    "strCategory": "Pasta",
                    "strArea": "Italian",
                    "strInstructions": "Boil.\r\nServe.",
                    "strMealThumb": "",
                    "strIngredient1": "Pasta",
                    "strMeasure1": "200 g"
                }}"#,
                id, title
            )
        })
        .collect();
    format!(r#"{{"meals": [{}]}}"#, entries.join(","))
}

const COMPLETION_SECTIONS: &str = r#"{
    "choices": [{
        "message": {
            "content": "DESCRIPTION: Comforting and quick.\nCUISINE: italian\nDIET: vegetarian\nCOOKING TIME: 30 mins"
        }
    }]
}"#;

fn mock_completion(server: &mut ServerGuard) -> mockito::Mock {
    server
        .mock("POST", "/v1/chat/completions")
        .with_status(200)
        .with_header("content-type", "application/json")
        .with_body(COMPLETION_SECTIONS)
        .create()
}

#[tokio::test]
async fn test_search_merges_all_three_sources() {
    let mut catalog = Server::new_async().await;
    let mut seeds = Server::new_async().await;
    let mut completion = Server::new_async().await;

    let _catalog = catalog
        .mock("GET", "/recipes/complexSearch")
        .match_query(Matcher::UrlEncoded("query".into(), "pasta".into()))
        .with_status(200)
        .with_header("content-type", "application/json")
        .with_body(
            r#"{"results": [{
                "id": 9001,
                "title": "Catalog Carbonara",
                "summary": "From the <i>catalog</i>.",
                "readyInMinutes": 25,
                "cuisines": ["Italian"],
                "diets": []
            }]}"#,
        )
        .create();
    let _seed_search = seeds
        .mock("GET", "/api/json/v1/1/search.php")
        .match_query(Matcher::UrlEncoded("s".into(), "pasta".into()))
        .with_status(200)
        .with_header("content-type", "application/json")
        .with_body(seed_search_body(&[("11", "Seeded Rigatoni")]))
        .create();
    let _sections = mock_completion(&mut completion);

    let store = Arc::new(MemoryStore::new());
    store
        .insert(&local_recipe("l1", "Local Pasta Bake", 10))
        .await
        .unwrap();

    let resolver = resolver_against(&catalog, &seeds, &completion, store.clone(), 1).await;
    let results = resolver.search("pasta", &RecipeFilters::default()).await.unwrap();

    let titles: Vec<&str> = results.iter().map(|r| r.title.as_str()).collect();
    assert!(titles.contains(&"Local Pasta Bake"));
    assert!(titles.contains(&"Catalog Carbonara"));
    assert!(titles.contains(&"Seeded Rigatoni"));

    // The fresh candidate was admitted to the pool.
    assert_eq!(store.list_generated().await.unwrap().len(), 1);
}

#[tokio::test]
async fn test_catalog_quota_degrades_gracefully() {
    let mut catalog = Server::new_async().await;
    let mut seeds = Server::new_async().await;
    let mut completion = Server::new_async().await;

    let _catalog = catalog
        .mock("GET", Matcher::Regex(r"^/recipes/complexSearch.*$".to_string()))
        .with_status(402)
        .create();
    let _seed_search = seeds
        .mock("GET", Matcher::Regex(r"^/api/json/v1/1/search.php.*$".to_string()))
        .with_status(200)
        .with_header("content-type", "application/json")
        .with_body(seed_search_body(&[("21", "Quota-proof Orzo")]))
        .create();
    let _sections = mock_completion(&mut completion);

    let store = Arc::new(MemoryStore::new());
    store
        .insert(&local_recipe("l1", "Local Orzo Bake", 10))
        .await
        .unwrap();

    let resolver = resolver_against(&catalog, &seeds, &completion, store, 1).await;
    let results = resolver.search("orzo", &RecipeFilters::default()).await.unwrap();

    let titles: Vec<&str> = results.iter().map(|r| r.title.as_str()).collect();
    assert!(titles.contains(&"Local Orzo Bake"));
    assert!(titles.contains(&"Quota-proof Orzo"));
}

#[tokio::test]
async fn test_dedup_prefers_local_over_remote() {
    let mut catalog = Server::new_async().await;
    let mut seeds = Server::new_async().await;
    let mut completion = Server::new_async().await;

    let _catalog = catalog
        .mock("GET", Matcher::Regex(r"^/recipes/complexSearch.*$".to_string()))
        .with_status(200)
        .with_header("content-type", "application/json")
        .with_body(
            r#"{"results": [{
                "id": 9002,
                "title": "minestrone ",
                "readyInMinutes": 40,
                "cuisines": [],
                "diets": []
            }]}"#,
        )
        .create();
    let _seed_search = seeds
        .mock("GET", Matcher::Regex(r"^/api/json/v1/1/search.php.*$".to_string()))
        .with_status(200)
        .with_header("content-type", "application/json")
        .with_body(r#"{"meals": null}"#)
        .create();
    let _random = seeds
        .mock("GET", "/api/json/v1/1/random.php")
        .with_status(200)
        .with_header("content-type", "application/json")
        .with_body(seed_search_body(&[("31", "Minestrone")]))
        .create();
    let _sections = mock_completion(&mut completion);

    let store = Arc::new(MemoryStore::new());
    store
        .insert(&local_recipe("l1", "Minestrone", 10))
        .await
        .unwrap();

    let resolver = resolver_against(&catalog, &seeds, &completion, store.clone(), 1).await;
    let results = resolver
        .search("minestrone", &RecipeFilters::default())
        .await
        .unwrap();

    let minestrones: Vec<&Recipe> = results
        .iter()
        .filter(|r| r.title.trim().eq_ignore_ascii_case("minestrone"))
        .collect();
    assert_eq!(minestrones.len(), 1);
    assert_eq!(minestrones[0].id, "l1");

    // the losing duplicate candidate must not have been admitted
    assert!(store.list_generated().await.unwrap().is_empty());
}

#[tokio::test]
async fn test_search_admission_respects_capacity() {
    let mut catalog = Server::new_async().await;
    let mut seeds = Server::new_async().await;
    let mut completion = Server::new_async().await;

    let _catalog = catalog
        .mock("GET", Matcher::Regex(r"^/recipes/complexSearch.*$".to_string()))
        .with_status(200)
        .with_header("content-type", "application/json")
        .with_body(r#"{"results": []}"#)
        .create();
    let _seed_search = seeds
        .mock("GET", Matcher::Regex(r"^/api/json/v1/1/search.php.*$".to_string()))
        .with_status(200)
        .with_header("content-type", "application/json")
        .with_body(seed_search_body(&[
            ("41", "Fresh Soup One"),
            ("42", "Fresh Soup Two"),
            ("43", "Fresh Soup Three"),
        ]))
        .create();
    let _sections = mock_completion(&mut completion);

    let store = Arc::new(MemoryStore::new());
    // Pool already holds four of five slots.
    for i in 0..4 {
        store
            .insert(&generated_recipe(
                &format!("generated:old{}", i),
                &format!("Old Soup {}", i),
                100 + i,
            ))
            .await
            .unwrap();
    }

    let resolver = resolver_against(&catalog, &seeds, &completion, store.clone(), 3).await;
    let results = resolver.search("soup", &RecipeFilters::default()).await.unwrap();

    // Only one slot was free: exactly one fresh candidate was persisted and
    // nothing was evicted.
    let pool = store.list_generated().await.unwrap();
    assert_eq!(pool.len(), 5);
    assert!(pool.iter().any(|r| r.title == "Old Soup 0"));

    // All candidates may still be returned, but never more generated
    // entries than the pool capacity.
    let generated = results
        .iter()
        .filter(|r| r.provenance == Provenance::Generated)
        .count();
    assert!(generated <= 5);
}

#[tokio::test]
async fn test_filters_apply_to_merged_results() {
    let mut catalog = Server::new_async().await;
    let mut seeds = Server::new_async().await;
    let mut completion = Server::new_async().await;

    let _catalog = catalog
        .mock("GET", Matcher::Regex(r"^/recipes/complexSearch.*$".to_string()))
        .with_status(200)
        .with_header("content-type", "application/json")
        .with_body(r#"{"results": []}"#)
        .create();
    let _seed_search = seeds
        .mock("GET", Matcher::Regex(r"^/api/json/v1/1/search.php.*$".to_string()))
        .with_status(200)
        .with_header("content-type", "application/json")
        .with_body(r#"{"meals": null}"#)
        .create();
    let _random = seeds
        .mock("GET", "/api/json/v1/1/random.php")
        .with_status(500)
        .create();
    let _sections = mock_completion(&mut completion);

    let store = Arc::new(MemoryStore::new());
    let mut quick = local_recipe("quick", "Quick Salad", 10);
    quick.cook_time_minutes = Some(10);
    let mut slow = local_recipe("slow", "Slow Salad Roast", 11);
    slow.cook_time = "2 hours".to_string();
    slow.cook_time_minutes = Some(120);
    // no parseable time at all: must fail closed under a time filter
    let mut unknown = local_recipe("unknown", "Mystery Salad", 12);
    unknown.cook_time = "a while".to_string();
    unknown.cook_time_minutes = None;
    for recipe in [&quick, &slow, &unknown] {
        store.insert(recipe).await.unwrap();
    }

    let resolver = resolver_against(&catalog, &seeds, &completion, store, 1).await;
    let filters = RecipeFilters {
        max_ready_minutes: Some(30),
        ..Default::default()
    };
    let results = resolver.search("salad", &filters).await.unwrap();

    let ids: Vec<&str> = results.iter().map(|r| r.id.as_str()).collect();
    assert_eq!(ids, vec!["quick"]);
}

/// A store whose every operation fails, to prove the local branch is the
/// one source search cannot shrug off.
struct DownStore;

#[async_trait]
impl RecipeStore for DownStore {
    async fn get_by_id(&self, _id: &str) -> Result<Option<Recipe>, StoreError> {
        Err(StoreError::Unavailable("connection refused".to_string()))
    }
    async fn search_by_text(&self, _query: &str) -> Result<Vec<Recipe>, StoreError> {
        Err(StoreError::Unavailable("connection refused".to_string()))
    }
    async fn insert(&self, _recipe: &Recipe) -> Result<(), StoreError> {
        Err(StoreError::Unavailable("connection refused".to_string()))
    }
    async fn delete(&self, _id: &str) -> Result<(), StoreError> {
        Err(StoreError::Unavailable("connection refused".to_string()))
    }
    async fn list_generated(&self) -> Result<Vec<Recipe>, StoreError> {
        Err(StoreError::Unavailable("connection refused".to_string()))
    }
    async fn find_mapping(&self, _external_id: &str) -> Result<Option<String>, StoreError> {
        Err(StoreError::Unavailable("connection refused".to_string()))
    }
    async fn record_mapping(
        &self,
        _internal_id: &str,
        _external_id: &str,
    ) -> Result<(), StoreError> {
        Err(StoreError::Unavailable("connection refused".to_string()))
    }
}

#[tokio::test]
async fn test_store_outage_fails_search() {
    let mut catalog = Server::new_async().await;
    let mut seeds = Server::new_async().await;
    let mut completion = Server::new_async().await;

    let _catalog = catalog
        .mock("GET", Matcher::Regex(r"^/recipes/complexSearch.*$".to_string()))
        .with_status(200)
        .with_header("content-type", "application/json")
        .with_body(r#"{"results": []}"#)
        .create();
    let _seed_search = seeds
        .mock("GET", Matcher::Regex(r"^/api/json/v1/1/search.php.*$".to_string()))
        .with_status(200)
        .with_header("content-type", "application/json")
        .with_body(r#"{"meals": null}"#)
        .create();
    let _random = seeds
        .mock("GET", "/api/json/v1/1/random.php")
        .with_status(500)
        .create();
    let _sections = mock_completion(&mut completion);

    let mut config = test_config();
    config.retry.attempts = 1;
    let resolver = RecipeResolver::builder()
        .config(config)
        .store(Arc::new(DownStore))
        .catalog_client(CatalogClient::with_base_url("k".to_string(), catalog.url()))
        .seed_client(SeedClient::with_base_url(seeds.url()))
        .completion_provider(Box::new(OpenAiCompletion::with_base_url(
            "k".to_string(),
            completion.url(),
            "test-model".to_string(),
        )))
        .search_batch(1)
        .build()
        .unwrap();

    let result = resolver.search("anything", &RecipeFilters::default()).await;
    assert!(matches!(result, Err(ResolveError::StoreUnavailable(_))));
}
