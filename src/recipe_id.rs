//! Source-ownership codec for recipe id strings.
//!
//! An id takes exactly one of three forms: a raw local identifier,
//! `catalog:<externalId>`, or `generated:<seedId>[-suffix]`. Decoding is
//! total: unrecognized or empty-keyed forms fall open to the local source,
//! which is the cheapest path to answer from.

use crate::model::Provenance;

const CATALOG_PREFIX: &str = "catalog:";
const GENERATED_PREFIX: &str = "generated:";

/// A decoded recipe id: the owning source plus the embedded key.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RecipeId {
    Local(String),
    Catalog(String),
    Generated(String),
}

impl RecipeId {
    pub fn provenance(&self) -> Provenance {
        match self {
            RecipeId::Local(_) => Provenance::Local,
            RecipeId::Catalog(_) => Provenance::Catalog,
            RecipeId::Generated(_) => Provenance::Generated,
        }
    }

    pub fn key(&self) -> &str {
        match self {
            RecipeId::Local(key) | RecipeId::Catalog(key) | RecipeId::Generated(key) => key,
        }
    }
}

/// Decode an id string into its owning source and embedded key. Never fails.
pub fn decode(id: &str) -> RecipeId {
    if let Some(key) = id.strip_prefix(CATALOG_PREFIX) {
        if !key.is_empty() {
            return RecipeId::Catalog(key.to_string());
        }
    }
    if let Some(key) = id.strip_prefix(GENERATED_PREFIX) {
        if !key.is_empty() {
            return RecipeId::Generated(key.to_string());
        }
    }
    RecipeId::Local(id.to_string())
}

/// Encode a source and key back into the single-string id form.
pub fn encode(provenance: Provenance, key: &str) -> String {
    match provenance {
        Provenance::Local => key.to_string(),
        Provenance::Catalog => format!("{}{}", CATALOG_PREFIX, key),
        Provenance::Generated => format!("{}{}", GENERATED_PREFIX, key),
    }
}

/// The seed id embedded in a `generated:` key: everything before the first
/// uniqueness suffix separator.
pub fn seed_id(key: &str) -> &str {
    key.split('-').next().unwrap_or(key)
}
