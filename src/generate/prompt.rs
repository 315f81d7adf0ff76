//! Fixed prompts sent to the completion endpoint. All structure in the
//! responses is imposed by this subsystem's parsers; the service enforces
//! nothing.

use crate::model::SeedRecord;

/// Diet labels accepted from freeform generation.
pub const DIET_TYPES: [&str; 9] = [
    "vegetarian",
    "vegan",
    "gluten-free",
    "dairy-free",
    "keto",
    "paleo",
    "omnivore",
    "pescatarian",
    "none",
];

pub const FREEFORM_PROMPT: &str = r#"
You are a recipe developer. Create one original recipe for the request below.
Respond with only a JSON object, no other characters, with exactly these keys:

{
  "title": "<RECIPE TITLE>",
  "description": "<ONE OR TWO SENTENCES>",
  "ingredients": [<LIST OF INGREDIENT STRINGS>],
  "instructions": [<LIST OF STEP STRINGS>],
  "cuisine_type": "<CUISINE, LOWERCASE>",
  "diet_type": "<ONE OF: vegetarian, vegan, gluten-free, dairy-free, keto, paleo, omnivore, pescatarian, none>",
  "cooking_time": "<e.g. 30 mins, or 1 hours 30 mins>"
}

Request:
"#;

/// Build the seed-enrichment prompt. The model must answer with one section
/// per line, in order; ingredients and instructions are taken from the seed
/// record itself, never from the model.
pub fn build_seed_prompt(seed: &SeedRecord) -> String {
    format!(
        r#"You are a food editor. Below is a raw recipe record. Write the requested
fields for it, each on its own line, in this exact order and format:

DESCRIPTION: <one to three appetizing sentences>
CUISINE: <single cuisine word, e.g. italian>
DIET: <single diet word, e.g. vegetarian>
COOKING TIME: <e.g. 30 mins>
CALORIES: <optional, e.g. 450 kcal>
PROTEIN: <optional, e.g. 20 g>
FAT: <optional, e.g. 15 g>
CARBOHYDRATES: <optional, e.g. 50 g>

Do not add any other lines or commentary.

Title: {}
Category: {}
Area: {}
Ingredients: {}
Instructions: {}"#,
        seed.title,
        seed.category,
        seed.area,
        seed.ingredients.join("; "),
        seed.instructions
    )
}
