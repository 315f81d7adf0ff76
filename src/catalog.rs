//! Client for the paid external recipe catalog API.
//!
//! Payloads are deserialized into strict typed structs at this boundary and
//! translated field-by-field into the canonical [`Recipe`] shape. HTTP 402
//! (the provider's quota/payment signal) surfaces as [`ResolveError::QuotaExceeded`],
//! which callers treat as "this source is temporarily out of budget" rather
//! than a hard failure.

use chrono::Utc;
use log::debug;
use reqwest::{Client, StatusCode};
use scraper::Html;
use serde::Deserialize;

use crate::error::ResolveError;
use crate::model::{Nutrition, Provenance, Recipe, RecipeFilters};
use crate::recipe_id;

const DEFAULT_BASE_URL: &str = "https://api.spoonacular.com";

#[derive(Clone)]
pub struct CatalogClient {
    client: Client,
    api_key: String,
    base_url: String,
    page_size: u32,
}

impl CatalogClient {
    pub fn new(api_key: String) -> Self {
        CatalogClient {
            client: Client::new(),
            api_key,
            base_url: DEFAULT_BASE_URL.to_string(),
            page_size: 10,
        }
    }

    #[doc(hidden)]
    pub fn with_base_url(api_key: String, base_url: String) -> Self {
        CatalogClient {
            client: Client::new(),
            api_key,
            base_url,
            page_size: 10,
        }
    }

    /// Keyword search, with filters pushed down to the API where it
    /// supports them.
    pub async fn search_by_text(
        &self,
        query: &str,
        filters: &RecipeFilters,
    ) -> Result<Vec<Recipe>, ResolveError> {
        let mut request = self
            .client
            .get(format!("{}/recipes/complexSearch", self.base_url))
            .query(&[
                ("apiKey", self.api_key.as_str()),
                ("query", query),
                ("addRecipeInformation", "true"),
                ("fillIngredients", "true"),
            ])
            .query(&[("number", self.page_size)]);

        if let Some(cuisine) = &filters.cuisine {
            request = request.query(&[("cuisine", cuisine.as_str())]);
        }
        if let Some(diet) = &filters.diet {
            request = request.query(&[("diet", diet.as_str())]);
        }
        if let Some(max_minutes) = filters.max_ready_minutes {
            request = request.query(&[("maxReadyTime", max_minutes)]);
        }

        let response = request
            .send()
            .await
            .map_err(|e| ResolveError::SourceUnavailable(format!("catalog: {}", e)))?;
        let response = check_status(response)?;

        let page: SearchPage = response
            .json()
            .await
            .map_err(|e| ResolveError::SourceUnavailable(format!("catalog payload: {}", e)))?;
        debug!("catalog search returned {} results", page.results.len());

        Ok(page.results.iter().map(translate).collect())
    }

    /// Fetch one catalog recipe by its external id.
    pub async fn fetch_by_id(&self, external_id: &str) -> Result<Recipe, ResolveError> {
        let response = self
            .client
            .get(format!(
                "{}/recipes/{}/information",
                self.base_url, external_id
            ))
            .query(&[
                ("apiKey", self.api_key.as_str()),
                ("includeNutrition", "true"),
            ])
            .send()
            .await
            .map_err(|e| ResolveError::SourceUnavailable(format!("catalog: {}", e)))?;

        if response.status() == StatusCode::NOT_FOUND {
            return Err(ResolveError::NotFound(format!(
                "catalog recipe {}",
                external_id
            )));
        }
        let response = check_status(response)?;

        let payload: CatalogRecipe = response
            .json()
            .await
            .map_err(|e| ResolveError::SourceUnavailable(format!("catalog payload: {}", e)))?;

        Ok(translate(&payload))
    }
}

fn check_status(response: reqwest::Response) -> Result<reqwest::Response, ResolveError> {
    let status = response.status();
    if status == StatusCode::PAYMENT_REQUIRED {
        return Err(ResolveError::QuotaExceeded);
    }
    if !status.is_success() {
        return Err(ResolveError::SourceUnavailable(format!(
            "catalog answered {}",
            status
        )));
    }
    Ok(response)
}

// Wire shapes, validated at the boundary. Only the fields this subsystem
// consumes are declared; extras are ignored.

#[derive(Debug, Deserialize)]
struct SearchPage {
    #[serde(default)]
    results: Vec<CatalogRecipe>,
}

#[derive(Debug, Deserialize)]
struct CatalogRecipe {
    id: i64,
    title: String,
    #[serde(default)]
    summary: Option<String>,
    #[serde(default)]
    image: Option<String>,
    #[serde(default)]
    cuisines: Vec<String>,
    #[serde(default)]
    diets: Vec<String>,
    #[serde(rename = "readyInMinutes", default)]
    ready_in_minutes: Option<u32>,
    #[serde(rename = "extendedIngredients", default)]
    extended_ingredients: Vec<CatalogIngredient>,
    #[serde(rename = "analyzedInstructions", default)]
    analyzed_instructions: Vec<InstructionBlock>,
    #[serde(default)]
    instructions: Option<String>,
    #[serde(default)]
    nutrition: Option<CatalogNutrition>,
}

#[derive(Debug, Deserialize)]
struct CatalogIngredient {
    #[serde(default)]
    original: Option<String>,
    #[serde(default)]
    name: Option<String>,
}

#[derive(Debug, Deserialize)]
struct InstructionBlock {
    #[serde(default)]
    steps: Vec<InstructionStep>,
}

#[derive(Debug, Deserialize)]
struct InstructionStep {
    step: String,
}

#[derive(Debug, Deserialize)]
struct CatalogNutrition {
    #[serde(default)]
    nutrients: Vec<CatalogNutrient>,
}

#[derive(Debug, Deserialize)]
struct CatalogNutrient {
    name: String,
    amount: f64,
    #[serde(default)]
    unit: String,
}

fn translate(payload: &CatalogRecipe) -> Recipe {
    let external_id = payload.id.to_string();

    let ingredients: Vec<String> = payload
        .extended_ingredients
        .iter()
        .filter_map(|i| i.original.clone().or_else(|| i.name.clone()))
        .filter(|line| !line.trim().is_empty())
        .collect();

    let mut instructions: Vec<String> = payload
        .analyzed_instructions
        .iter()
        .flat_map(|block| block.steps.iter())
        .map(|s| s.step.trim().to_string())
        .filter(|s| !s.is_empty())
        .collect();
    if instructions.is_empty() {
        if let Some(raw) = &payload.instructions {
            instructions = strip_html(raw)
                .split('\n')
                .map(str::trim)
                .filter(|line| !line.is_empty())
                .map(String::from)
                .collect();
        }
    }

    let ready_minutes = payload.ready_in_minutes;
    let cook_time = match ready_minutes {
        Some(minutes) => format!("{} mins", minutes),
        None => String::new(),
    };

    Recipe {
        id: recipe_id::encode(Provenance::Catalog, &external_id),
        title: payload.title.trim().to_string(),
        description: payload
            .summary
            .as_deref()
            .map(strip_html)
            .unwrap_or_default(),
        image_url: payload.image.clone().unwrap_or_default(),
        ingredients,
        instructions,
        cuisine_type: payload
            .cuisines
            .first()
            .map(|c| c.to_lowercase())
            .unwrap_or_default(),
        diet_type: payload
            .diets
            .first()
            .map(|d| d.to_lowercase())
            .unwrap_or_default(),
        cook_time,
        cook_time_minutes: ready_minutes,
        nutrition: payload.nutrition.as_ref().map(translate_nutrition),
        provenance: Provenance::Catalog,
        owner_ref: "system".to_string(),
        created_at: Utc::now(),
    }
}

fn translate_nutrition(payload: &CatalogNutrition) -> Nutrition {
    let mut nutrition = Nutrition::default();
    for nutrient in &payload.nutrients {
        let value = format!("{:.0}{}", nutrient.amount, nutrient.unit);
        match nutrient.name.as_str() {
            "Calories" => nutrition.calories = value,
            "Protein" => nutrition.protein = value,
            "Fat" => nutrition.fat = value,
            "Carbohydrates" => nutrition.carbohydrates = value,
            _ => {}
        }
    }
    nutrition
}

/// Flatten an HTML fragment to its text content.
fn strip_html(raw: &str) -> String {
    let fragment = Html::parse_fragment(raw);
    let text: String = fragment.root_element().text().collect();
    text.trim().to_string()
}
