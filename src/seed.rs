//! Client for the free seed source (a public "random meal" style API).
//!
//! Records fetched here are generation input only; they are never returned
//! to callers directly.

use log::debug;
use reqwest::Client;
use serde_json::Value;

use crate::error::ResolveError;
use crate::model::SeedRecord;

const DEFAULT_BASE_URL: &str = "https://www.themealdb.com";

/// The source caps each record at 20 numbered ingredient/measure pairs.
const MAX_INGREDIENT_SLOTS: usize = 20;

#[derive(Clone)]
pub struct SeedClient {
    client: Client,
    base_url: String,
}

impl SeedClient {
    pub fn new() -> Self {
        SeedClient {
            client: Client::new(),
            base_url: DEFAULT_BASE_URL.to_string(),
        }
    }

    #[doc(hidden)]
    pub fn with_base_url(base_url: String) -> Self {
        SeedClient {
            client: Client::new(),
            base_url,
        }
    }

    /// Fetch one freshly sampled random record.
    pub async fn random(&self) -> Result<SeedRecord, ResolveError> {
        let url = format!("{}/api/json/v1/1/random.php", self.base_url);
        let records = self.fetch_records(&url).await?;
        records
            .into_iter()
            .next()
            .ok_or_else(|| ResolveError::SourceUnavailable("empty random sample".to_string()))
    }

    /// Keyword-matched records; may be empty.
    pub async fn search(&self, query: &str) -> Result<Vec<SeedRecord>, ResolveError> {
        let url = format!(
            "{}/api/json/v1/1/search.php?s={}",
            self.base_url,
            urlencode(query)
        );
        self.fetch_records(&url).await
    }

    /// Lookup by seed id.
    pub async fn lookup(&self, seed_id: &str) -> Result<SeedRecord, ResolveError> {
        let url = format!(
            "{}/api/json/v1/1/lookup.php?i={}",
            self.base_url,
            urlencode(seed_id)
        );
        let records = self.fetch_records(&url).await?;
        records
            .into_iter()
            .next()
            .ok_or_else(|| ResolveError::NotFound(format!("seed record {}", seed_id)))
    }

    async fn fetch_records(&self, url: &str) -> Result<Vec<SeedRecord>, ResolveError> {
        let response = self
            .client
            .get(url)
            .send()
            .await
            .map_err(|e| ResolveError::SourceUnavailable(format!("seed source: {}", e)))?;

        if !response.status().is_success() {
            return Err(ResolveError::SourceUnavailable(format!(
                "seed source answered {}",
                response.status()
            )));
        }

        let body: Value = response
            .json()
            .await
            .map_err(|e| ResolveError::SourceUnavailable(format!("seed source: {}", e)))?;
        debug!("seed source response: {:?}", body);

        // "meals" is JSON null when nothing matched.
        Ok(match body["meals"].as_array() {
            Some(meals) => meals.iter().filter_map(parse_record).collect(),
            None => Vec::new(),
        })
    }
}

impl Default for SeedClient {
    fn default() -> Self {
        Self::new()
    }
}

fn parse_record(meal: &Value) -> Option<SeedRecord> {
    let id = non_empty(meal, "idMeal")?;
    let title = non_empty(meal, "strMeal")?;

    Some(SeedRecord {
        id,
        title,
        category: text(meal, "strCategory"),
        area: text(meal, "strArea"),
        instructions: text(meal, "strInstructions"),
        image_url: text(meal, "strMealThumb"),
        ingredients: collect_ingredients(meal),
    })
}

/// Walk the numbered `strIngredient<N>` / `strMeasure<N>` slots, skipping
/// blank or null entries and appending the measure in parentheses when
/// present.
fn collect_ingredients(meal: &Value) -> Vec<String> {
    let mut ingredients = Vec::new();

    for slot in 1..=MAX_INGREDIENT_SLOTS {
        let name = meal[format!("strIngredient{}", slot)]
            .as_str()
            .unwrap_or("")
            .trim()
            .to_string();
        if name.is_empty() {
            continue;
        }

        let measure = meal[format!("strMeasure{}", slot)]
            .as_str()
            .unwrap_or("")
            .trim()
            .to_string();

        if measure.is_empty() {
            ingredients.push(name);
        } else {
            ingredients.push(format!("{} ({})", name, measure));
        }
    }

    ingredients
}

fn non_empty(meal: &Value, field: &str) -> Option<String> {
    let value = meal[field].as_str()?.trim();
    if value.is_empty() {
        None
    } else {
        Some(value.to_string())
    }
}

fn text(meal: &Value, field: &str) -> String {
    meal[field].as_str().unwrap_or("").trim().to_string()
}

fn urlencode(raw: &str) -> String {
    let mut encoded = String::with_capacity(raw.len());
    for byte in raw.bytes() {
        match byte {
            b'A'..=b'Z' | b'a'..=b'z' | b'0'..=b'9' | b'-' | b'_' | b'.' | b'~' => {
                encoded.push(byte as char)
            }
            b' ' => encoded.push_str("%20"),
            _ => encoded.push_str(&format!("%{:02X}", byte)),
        }
    }
    encoded
}
