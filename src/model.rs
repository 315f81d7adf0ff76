use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Which source produced a recipe. Immutable after creation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Provenance {
    Local,
    Catalog,
    Generated,
}

impl Provenance {
    pub fn as_str(&self) -> &'static str {
        match self {
            Provenance::Local => "local",
            Provenance::Catalog => "catalog",
            Provenance::Generated => "generated",
        }
    }

    pub fn parse(s: &str) -> Option<Provenance> {
        match s {
            "local" => Some(Provenance::Local),
            "catalog" => Some(Provenance::Catalog),
            "generated" => Some(Provenance::Generated),
            _ => None,
        }
    }
}

/// Per-serving nutrition facts. Values are free text; "unknown" when the
/// source did not report them.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Nutrition {
    pub calories: String,
    pub protein: String,
    pub fat: String,
    pub carbohydrates: String,
}

impl Default for Nutrition {
    fn default() -> Self {
        Nutrition {
            calories: "unknown".to_string(),
            protein: "unknown".to_string(),
            fat: "unknown".to_string(),
            carbohydrates: "unknown".to_string(),
        }
    }
}

/// Canonical recipe shape, regardless of origin.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Recipe {
    pub id: String,
    pub title: String,
    pub description: String,
    pub image_url: String,
    pub ingredients: Vec<String>,
    pub instructions: Vec<String>,
    pub cuisine_type: String,
    pub diet_type: String,
    /// Free-text label, e.g. "30 mins".
    pub cook_time: String,
    pub cook_time_minutes: Option<u32>,
    pub nutrition: Option<Nutrition>,
    pub provenance: Provenance,
    /// Opaque reference to the creating actor ("system" for imported and
    /// generated recipes).
    pub owner_ref: String,
    pub created_at: DateTime<Utc>,
}

/// A raw record from the free seed source. Used only as generation input,
/// never returned to callers.
#[derive(Debug, Clone)]
pub struct SeedRecord {
    pub id: String,
    pub title: String,
    pub category: String,
    pub area: String,
    pub instructions: String,
    pub image_url: String,
    /// "ingredient (measure)" pairs, blanks already skipped.
    pub ingredients: Vec<String>,
}

/// Search filters. Absent fields always pass.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct RecipeFilters {
    pub cuisine: Option<String>,
    pub diet: Option<String>,
    pub max_ready_minutes: Option<u32>,
}

impl RecipeFilters {
    pub fn is_empty(&self) -> bool {
        self.cuisine.is_none() && self.diet.is_none() && self.max_ready_minutes.is_none()
    }
}
