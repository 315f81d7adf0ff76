//! On-demand recipe generation from a free seed record plus a completion
//! call. This adapter never persists anything; admission to the bounded
//! pool is the pool manager's job.

pub mod parser;
pub mod prompt;
mod provider;

pub use provider::{CompletionProvider, OpenAiCompletion};

use chrono::Utc;
use log::warn;
use rand::seq::SliceRandom;
use uuid::Uuid;

use crate::error::ResolveError;
use crate::filter::parse_minutes;
use crate::generate::parser::{parse_freeform, parse_seed_sections, GENERIC_DESCRIPTION};
use crate::model::{Nutrition, Provenance, Recipe, SeedRecord};
use crate::recipe_id;

/// Diets it is safe to guess when the model gives none. Deliberately the
/// unrestrictive end of the accepted set.
const FALLBACK_DIETS: [&str; 3] = ["none", "omnivore", "vegetarian"];

const FALLBACK_COOK_TIMES: [&str; 4] = ["25 mins", "30 mins", "40 mins", "45 mins"];

pub struct GenerativeAdapter {
    provider: Box<dyn CompletionProvider>,
}

impl GenerativeAdapter {
    pub fn new(provider: Box<dyn CompletionProvider>) -> Self {
        GenerativeAdapter { provider }
    }

    /// Seed-based generation: enrich a raw seed record into a canonical
    /// recipe. Ingredients and instructions come from the seed itself; the
    /// model only supplies description, cuisine, diet, time and optional
    /// nutrition. Total: a failed or unparseable completion degrades to
    /// fields derived from the seed.
    pub async fn generate_from_seed(&self, seed: &SeedRecord) -> Recipe {
        let sections = match self.provider.complete(&prompt::build_seed_prompt(seed)).await {
            Ok(text) => parse_seed_sections(&text),
            Err(e) => {
                warn!(
                    "completion failed for seed {}, deriving fields: {}",
                    seed.id, e
                );
                parser::SeedSections::default()
            }
        };

        let mut rng = rand::thread_rng();

        let description = if sections.description.is_empty() {
            GENERIC_DESCRIPTION.to_string()
        } else {
            sections.description.clone()
        };
        let cuisine_type = if sections.cuisine.is_empty() {
            // The seed's area ("Mexican", "Italian") is the closest thing
            // the record has to a cuisine.
            seed.area.trim().to_lowercase()
        } else {
            sections.cuisine.clone()
        };
        let diet_type = if sections.diet.is_empty() {
            FALLBACK_DIETS.choose(&mut rng).unwrap_or(&"none").to_string()
        } else {
            sections.diet.clone()
        };
        let cook_time = if sections.cook_time.is_empty() {
            FALLBACK_COOK_TIMES
                .choose(&mut rng)
                .unwrap_or(&"30 mins")
                .to_string()
        } else {
            sections.cook_time.clone()
        };

        let nutrition = if sections.has_nutrition() {
            Some(Nutrition {
                calories: or_unknown(&sections.calories),
                protein: or_unknown(&sections.protein),
                fat: or_unknown(&sections.fat),
                carbohydrates: or_unknown(&sections.carbohydrates),
            })
        } else {
            None
        };

        let cook_time_minutes = parse_minutes(&cook_time);

        Recipe {
            id: recipe_id::encode(Provenance::Generated, &seed.id),
            title: seed.title.trim().to_string(),
            description,
            image_url: seed.image_url.clone(),
            ingredients: seed.ingredients.clone(),
            instructions: split_instructions(&seed.instructions),
            cuisine_type,
            diet_type,
            cook_time,
            cook_time_minutes,
            nutrition,
            provenance: Provenance::Generated,
            owner_ref: "system".to_string(),
            created_at: Utc::now(),
        }
    }

    /// Freeform generation: a strict-JSON completion for a free-text
    /// prompt. Malformed output is terminal; the request fails visibly and
    /// is not retried here.
    pub async fn generate_freeform(&self, request: &str) -> Result<Recipe, ResolveError> {
        let full_prompt = format!("{}{}", prompt::FREEFORM_PROMPT, request);
        let completion = self.provider.complete(&full_prompt).await?;
        let fields = parse_freeform(&completion)?;

        let cook_time_minutes = parse_minutes(&fields.cooking_time);

        Ok(Recipe {
            id: recipe_id::encode(Provenance::Generated, &Uuid::new_v4().to_string()),
            title: fields.title,
            description: fields.description,
            image_url: String::new(),
            ingredients: fields.ingredients,
            instructions: fields.instructions,
            cuisine_type: fields.cuisine_type,
            diet_type: fields.diet_type,
            cook_time: fields.cooking_time,
            cook_time_minutes,
            nutrition: None,
            provenance: Provenance::Generated,
            owner_ref: "system".to_string(),
            created_at: Utc::now(),
        })
    }
}

fn or_unknown(value: &str) -> String {
    if value.trim().is_empty() {
        "unknown".to_string()
    } else {
        value.trim().to_string()
    }
}

/// Split a seed record's raw instruction blob into steps. Seed sources
/// delimit with CRLF pairs; numbered prefixes are left as-is.
fn split_instructions(raw: &str) -> Vec<String> {
    raw.replace('\r', "\n")
        .split('\n')
        .map(str::trim)
        .filter(|line| !line.is_empty())
        .map(String::from)
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use std::sync::Mutex;

    /// Scripted provider: pops canned responses in order.
    struct ScriptedProvider {
        responses: Mutex<Vec<Result<String, ResolveError>>>,
    }

    impl ScriptedProvider {
        fn new(responses: Vec<Result<String, ResolveError>>) -> Self {
            ScriptedProvider {
                responses: Mutex::new(responses),
            }
        }
    }

    #[async_trait]
    impl CompletionProvider for ScriptedProvider {
        fn provider_name(&self) -> &str {
            "scripted"
        }

        async fn complete(&self, _prompt: &str) -> Result<String, ResolveError> {
            self.responses
                .lock()
                .unwrap()
                .remove(0)
        }
    }

    fn seed() -> SeedRecord {
        SeedRecord {
            id: "52819".to_string(),
            title: "Cajun spiced fish tacos".to_string(),
            category: "Seafood".to_string(),
            area: "Mexican".to_string(),
            instructions: "Cook the fish.\r\nAssemble the tacos.".to_string(),
            image_url: "https://img.example/taco.jpg".to_string(),
            ingredients: vec!["White fish (4 fillets)".to_string()],
        }
    }

    #[tokio::test]
    async fn test_seed_generation_uses_model_sections() {
        let adapter = GenerativeAdapter::new(Box::new(ScriptedProvider::new(vec![Ok(
            "DESCRIPTION: Smoky, zesty tacos.\nCUISINE: mexican\nDIET: pescatarian\nCOOKING TIME: 25 mins".to_string(),
        )])));

        let recipe = adapter.generate_from_seed(&seed()).await;
        assert_eq!(recipe.id, "generated:52819");
        assert_eq!(recipe.title, "Cajun spiced fish tacos");
        assert_eq!(recipe.description, "Smoky, zesty tacos.");
        assert_eq!(recipe.cuisine_type, "mexican");
        assert_eq!(recipe.diet_type, "pescatarian");
        assert_eq!(recipe.cook_time, "25 mins");
        assert_eq!(recipe.cook_time_minutes, Some(25));
        // seed supplies the body, not the model
        assert_eq!(recipe.ingredients, vec!["White fish (4 fillets)"]);
        assert_eq!(recipe.instructions, vec!["Cook the fish.", "Assemble the tacos."]);
        assert_eq!(recipe.provenance, Provenance::Generated);
    }

    #[tokio::test]
    async fn test_seed_generation_survives_completion_outage() {
        let adapter = GenerativeAdapter::new(Box::new(ScriptedProvider::new(vec![Err(
            ResolveError::SourceUnavailable("down".to_string()),
        )])));

        let recipe = adapter.generate_from_seed(&seed()).await;
        assert_eq!(recipe.description, GENERIC_DESCRIPTION);
        // derived from the seed's area
        assert_eq!(recipe.cuisine_type, "mexican");
        assert!(!recipe.diet_type.is_empty());
        assert!(recipe.cook_time_minutes.is_some());
    }

    #[tokio::test]
    async fn test_freeform_invalid_output_is_terminal() {
        let adapter = GenerativeAdapter::new(Box::new(ScriptedProvider::new(vec![Ok(
            "I'd rather talk about the weather.".to_string(),
        )])));

        let result = adapter.generate_freeform("a cozy soup").await;
        assert!(matches!(result, Err(ResolveError::GenerationInvalid(_))));
    }

    #[tokio::test]
    async fn test_freeform_happy_path() {
        let body = r#"{
            "title": "Cozy Tomato Soup",
            "description": "Warming and simple.",
            "ingredients": ["tomatoes", "stock"],
            "instructions": ["Simmer", "Blend"],
            "cuisine_type": "american",
            "diet_type": "vegan",
            "cooking_time": "35 mins"
        }"#;
        let adapter =
            GenerativeAdapter::new(Box::new(ScriptedProvider::new(vec![Ok(body.to_string())])));

        let recipe = adapter.generate_freeform("a cozy soup").await.unwrap();
        assert!(recipe.id.starts_with("generated:"));
        assert_eq!(recipe.title, "Cozy Tomato Soup");
        assert_eq!(recipe.cook_time_minutes, Some(35));
        assert_eq!(recipe.provenance, Provenance::Generated);
    }

}
