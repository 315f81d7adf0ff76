//! Cuisine/diet/max-cook-time predicates over canonical recipes.

use crate::model::{Recipe, RecipeFilters};

/// Whether a recipe passes the given filters. Absent filters always pass.
/// A time bound excludes recipes whose cook time cannot be derived: an
/// unknown time cannot satisfy a bound.
pub fn matches(recipe: &Recipe, filters: &RecipeFilters) -> bool {
    if let Some(cuisine) = &filters.cuisine {
        if !recipe.cuisine_type.eq_ignore_ascii_case(cuisine.trim()) {
            return false;
        }
    }

    if let Some(diet) = &filters.diet {
        if !recipe.diet_type.eq_ignore_ascii_case(diet.trim()) {
            return false;
        }
    }

    if let Some(max_minutes) = filters.max_ready_minutes {
        match ready_minutes(recipe) {
            Some(minutes) => {
                if minutes > max_minutes {
                    return false;
                }
            }
            None => return false,
        }
    }

    true
}

/// Minutes a recipe takes: the structured field when present, otherwise
/// parsed out of the free-text label.
pub fn ready_minutes(recipe: &Recipe) -> Option<u32> {
    recipe
        .cook_time_minutes
        .or_else(|| parse_minutes(&recipe.cook_time))
}

/// Scan a free-text cook-time label for the first `<number> mins` group.
/// Equivalent to the pattern `(\d+)\s*mins?` without pulling in a regex
/// engine.
pub fn parse_minutes(label: &str) -> Option<u32> {
    let bytes = label.as_bytes();
    let mut i = 0;

    while i < bytes.len() {
        if bytes[i].is_ascii_digit() {
            let start = i;
            while i < bytes.len() && bytes[i].is_ascii_digit() {
                i += 1;
            }
            let digits = &label[start..i];

            let mut j = i;
            while j < bytes.len() && (bytes[j] as char).is_whitespace() {
                j += 1;
            }
            if label[j..].to_lowercase().starts_with("min") {
                return digits.parse().ok();
            }
        } else {
            i += 1;
        }
    }

    None
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;
    use crate::model::Provenance;

    fn recipe(cuisine: &str, diet: &str, cook_time: &str, minutes: Option<u32>) -> Recipe {
        Recipe {
            id: "r1".to_string(),
            title: "Test".to_string(),
            description: String::new(),
            image_url: String::new(),
            ingredients: vec![],
            instructions: vec![],
            cuisine_type: cuisine.to_string(),
            diet_type: diet.to_string(),
            cook_time: cook_time.to_string(),
            cook_time_minutes: minutes,
            nutrition: None,
            provenance: Provenance::Local,
            owner_ref: "system".to_string(),
            created_at: Utc::now(),
        }
    }

    #[test]
    fn test_no_filters_pass() {
        let r = recipe("italian", "vegan", "", None);
        assert!(matches(&r, &RecipeFilters::default()));
    }

    #[test]
    fn test_cuisine_is_case_insensitive() {
        let r = recipe("Italian", "none", "20 mins", None);
        let filters = RecipeFilters {
            cuisine: Some("italian".to_string()),
            ..Default::default()
        };
        assert!(matches(&r, &filters));
    }

    #[test]
    fn test_diet_mismatch_excludes() {
        let r = recipe("italian", "vegan", "20 mins", None);
        let filters = RecipeFilters {
            diet: Some("keto".to_string()),
            ..Default::default()
        };
        assert!(!matches(&r, &filters));
    }

    #[test]
    fn test_time_filter_uses_structured_minutes_first() {
        let r = recipe("", "", "2 hours", Some(25));
        let filters = RecipeFilters {
            max_ready_minutes: Some(30),
            ..Default::default()
        };
        assert!(matches(&r, &filters));
    }

    #[test]
    fn test_time_filter_parses_label() {
        let r = recipe("", "", "45 mins", None);
        let within = RecipeFilters {
            max_ready_minutes: Some(60),
            ..Default::default()
        };
        let over = RecipeFilters {
            max_ready_minutes: Some(30),
            ..Default::default()
        };
        assert!(matches(&r, &within));
        assert!(!matches(&r, &over));
    }

    #[test]
    fn test_unknown_time_fails_closed() {
        let r = recipe("", "", "a while", None);
        assert!(matches(&r, &RecipeFilters::default()));
        let filters = RecipeFilters {
            max_ready_minutes: Some(30),
            ..Default::default()
        };
        assert!(!matches(&r, &filters));
    }

    #[test]
    fn test_parse_minutes_variants() {
        assert_eq!(parse_minutes("30 mins"), Some(30));
        assert_eq!(parse_minutes("45min"), Some(45));
        assert_eq!(parse_minutes("about 15  minutes"), Some(15));
        assert_eq!(parse_minutes("1 hour 20 mins"), Some(20));
        assert_eq!(parse_minutes("2 hours"), None);
        assert_eq!(parse_minutes(""), None);
    }
}
