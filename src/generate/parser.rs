//! Parsers for the two completion-response formats: the line-oriented
//! section format used by seed-based generation, and the strict JSON object
//! used by freeform generation.

use serde_json::Value;

use crate::error::ResolveError;
use crate::generate::prompt::DIET_TYPES;

/// Substituted when the model returns no usable description.
pub const GENERIC_DESCRIPTION: &str =
    "A delicious home-style dish made from simple, satisfying ingredients.";

/// One state per section tag, plus a default state for content before the
/// first recognized header.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Section {
    None,
    Description,
    Cuisine,
    Diet,
    CookTime,
    Calories,
    Protein,
    Fat,
    Carbohydrates,
}

const HEADERS: [(&str, Section); 8] = [
    ("DESCRIPTION:", Section::Description),
    ("CUISINE:", Section::Cuisine),
    ("DIET:", Section::Diet),
    ("COOKING TIME:", Section::CookTime),
    ("CALORIES:", Section::Calories),
    ("PROTEIN:", Section::Protein),
    ("FAT:", Section::Fat),
    ("CARBOHYDRATES:", Section::Carbohydrates),
];

/// Parsed and normalized section values. Empty strings mean the section was
/// absent; nutrition sections are optional by design.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SeedSections {
    pub description: String,
    pub cuisine: String,
    pub diet: String,
    pub cook_time: String,
    pub calories: String,
    pub protein: String,
    pub fat: String,
    pub carbohydrates: String,
}

impl SeedSections {
    pub fn has_nutrition(&self) -> bool {
        !self.calories.is_empty()
            || !self.protein.is_empty()
            || !self.fat.is_empty()
            || !self.carbohydrates.is_empty()
    }
}

/// Parse the line-oriented section response. A recognized header ends the
/// previous section; unrecognized lines are appended (space-joined) to the
/// description while inside it and dropped everywhere else.
pub fn parse_seed_sections(raw: &str) -> SeedSections {
    let mut sections = SeedSections::default();
    let mut state = Section::None;

    for line in raw.lines() {
        let line = line.trim();
        if line.is_empty() {
            continue;
        }

        if let Some((section, rest)) = match_header(line) {
            state = section;
            let rest = rest.trim();
            if !rest.is_empty() {
                append(&mut sections, state, rest);
            }
        } else if state == Section::Description {
            append(&mut sections, state, line);
        }
    }

    sections.cuisine = sections.cuisine.trim().to_lowercase();
    sections.diet = sections.diet.trim().to_lowercase();
    sections.description = sections.description.trim().to_string();
    if sections.description.is_empty() || sections.description.eq_ignore_ascii_case("unknown") {
        sections.description = GENERIC_DESCRIPTION.to_string();
    }

    sections
}

fn match_header(line: &str) -> Option<(Section, &str)> {
    for (header, section) in HEADERS {
        if let Some(prefix) = line.get(..header.len()) {
            if prefix.eq_ignore_ascii_case(header) {
                return Some((section, &line[header.len()..]));
            }
        }
    }
    None
}

fn append(sections: &mut SeedSections, state: Section, content: &str) {
    let slot = match state {
        Section::None => return,
        Section::Description => &mut sections.description,
        Section::Cuisine => &mut sections.cuisine,
        Section::Diet => &mut sections.diet,
        Section::CookTime => &mut sections.cook_time,
        Section::Calories => &mut sections.calories,
        Section::Protein => &mut sections.protein,
        Section::Fat => &mut sections.fat,
        Section::Carbohydrates => &mut sections.carbohydrates,
    };

    if slot.is_empty() {
        slot.push_str(content);
    } else if state == Section::Description {
        slot.push(' ');
        slot.push_str(content);
    }
}

/// Fields a freeform completion must produce.
#[derive(Debug, Clone)]
pub struct GeneratedFields {
    pub title: String,
    pub description: String,
    pub ingredients: Vec<String>,
    pub instructions: Vec<String>,
    pub cuisine_type: String,
    pub diet_type: String,
    pub cooking_time: String,
}

/// Parse and validate the strict JSON object from freeform generation.
/// Any violation is a terminal [`ResolveError::GenerationInvalid`]; the
/// caller does not retry.
pub fn parse_freeform(raw: &str) -> Result<GeneratedFields, ResolveError> {
    let json = extract_json_object(raw)
        .ok_or_else(|| ResolveError::GenerationInvalid("no JSON object in output".to_string()))?;

    let title = required_string(&json, "title")?;
    if title.trim().is_empty() {
        return Err(ResolveError::GenerationInvalid("empty title".to_string()));
    }
    let description = required_string(&json, "description")?;
    let ingredients = required_string_array(&json, "ingredients")?;
    let instructions = required_string_array(&json, "instructions")?;
    let cuisine_type = required_string(&json, "cuisine_type")?.trim().to_lowercase();

    let diet_type = required_string(&json, "diet_type")?.trim().to_lowercase();
    if !DIET_TYPES.contains(&diet_type.as_str()) {
        return Err(ResolveError::GenerationInvalid(format!(
            "diet_type \"{}\" is not a recognized diet",
            diet_type
        )));
    }

    let cooking_time = required_string(&json, "cooking_time")?.trim().to_string();
    if !is_valid_cook_time(&cooking_time) {
        return Err(ResolveError::GenerationInvalid(format!(
            "cooking_time \"{}\" does not match <number> mins/hours",
            cooking_time
        )));
    }

    Ok(GeneratedFields {
        title: title.trim().to_string(),
        description: description.trim().to_string(),
        ingredients,
        instructions,
        cuisine_type,
        diet_type,
        cooking_time,
    })
}

/// Validate `<number> (mins|hours)`, optionally combined, e.g.
/// "30 mins" or "1 hours 30 mins".
pub fn is_valid_cook_time(label: &str) -> bool {
    let tokens: Vec<&str> = label.split_whitespace().collect();
    if tokens.is_empty() || tokens.len() % 2 != 0 {
        return false;
    }

    for pair in tokens.chunks(2) {
        if pair[0].parse::<u32>().is_err() {
            return false;
        }
        let unit = pair[1].to_lowercase();
        if !matches!(unit.as_str(), "min" | "mins" | "hour" | "hours") {
            return false;
        }
    }

    true
}

/// Pull the outermost JSON object out of the completion text, tolerating
/// markdown fences and stray prose around it.
fn extract_json_object(raw: &str) -> Option<Value> {
    let start = raw.find('{')?;
    let end = raw.rfind('}')?;
    if end <= start {
        return None;
    }
    serde_json::from_str(&raw[start..=end]).ok()
}

fn required_string(json: &Value, key: &str) -> Result<String, ResolveError> {
    json[key]
        .as_str()
        .map(str::to_string)
        .ok_or_else(|| ResolveError::GenerationInvalid(format!("missing key \"{}\"", key)))
}

fn required_string_array(json: &Value, key: &str) -> Result<Vec<String>, ResolveError> {
    let array = json[key]
        .as_array()
        .ok_or_else(|| ResolveError::GenerationInvalid(format!("missing key \"{}\"", key)))?;
    Ok(array
        .iter()
        .filter_map(|v| v.as_str())
        .map(str::to_string)
        .collect())
}
