//! Case-insensitive title-based merge across result sets.

use std::collections::HashSet;

use crate::model::Recipe;

/// Collapse a merged result set so each title appears once. The first
/// occurrence in source order wins; empty-title entries are dropped.
pub fn dedupe_by_title(recipes: Vec<Recipe>) -> Vec<Recipe> {
    let mut seen: HashSet<String> = HashSet::new();
    let mut survivors = Vec::with_capacity(recipes.len());

    for recipe in recipes {
        let key = normalize_title(&recipe.title);
        if key.is_empty() {
            continue;
        }
        if seen.insert(key) {
            survivors.push(recipe);
        }
    }

    survivors
}

/// The dedup/admission key for a title: trimmed and lowercased.
pub fn normalize_title(title: &str) -> String {
    title.trim().to_lowercase()
}
