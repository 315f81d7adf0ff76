use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use rusqlite::{params, Connection, Row};

use crate::error::StoreError;
use crate::model::{Nutrition, Provenance, Recipe};
use crate::store::RecipeStore;

/// SQLite-backed recipe store. Sequence fields are stored as JSON columns;
/// `created_at` is RFC 3339 so lexical ordering matches time ordering.
pub struct SqliteStore {
    conn: Arc<Mutex<Connection>>,
}

impl SqliteStore {
    /// Open (or create) the database at `path` and run schema setup.
    pub fn open(path: &str) -> Result<Self, StoreError> {
        let conn = Connection::open(path)
            .map_err(|e| StoreError::Unavailable(format!("Failed to open database: {}", e)))?;
        Self::from_connection(conn)
    }

    /// Open an in-memory database. Used by tests.
    pub fn open_in_memory() -> Result<Self, StoreError> {
        let conn = Connection::open_in_memory()
            .map_err(|e| StoreError::Unavailable(format!("Failed to open database: {}", e)))?;
        Self::from_connection(conn)
    }

    fn from_connection(conn: Connection) -> Result<Self, StoreError> {
        let store = SqliteStore {
            conn: Arc::new(Mutex::new(conn)),
        };
        store.initialize_schema()?;
        Ok(store)
    }

    fn initialize_schema(&self) -> Result<(), StoreError> {
        let conn = self.lock()?;
        conn.execute_batch(
            "CREATE TABLE IF NOT EXISTS recipes (
                id TEXT PRIMARY KEY,
                title TEXT NOT NULL,
                description TEXT NOT NULL,
                image_url TEXT NOT NULL,
                ingredients TEXT NOT NULL,
                instructions TEXT NOT NULL,
                cuisine_type TEXT NOT NULL,
                diet_type TEXT NOT NULL,
                cook_time TEXT NOT NULL,
                cook_time_minutes INTEGER,
                nutrition TEXT,
                provenance TEXT NOT NULL,
                owner_ref TEXT NOT NULL,
                created_at TEXT NOT NULL
            );
            CREATE INDEX IF NOT EXISTS idx_recipes_provenance
                ON recipes(provenance, created_at);
            CREATE TABLE IF NOT EXISTS external_mappings (
                external_id TEXT PRIMARY KEY,
                internal_id TEXT NOT NULL,
                created_at TEXT NOT NULL
            );",
        )
        .map_err(|e| StoreError::Unavailable(format!("Failed to create schema: {}", e)))
    }

    fn lock(&self) -> Result<std::sync::MutexGuard<'_, Connection>, StoreError> {
        self.conn
            .lock()
            .map_err(|e| StoreError::Unavailable(format!("Failed to acquire lock: {}", e)))
    }
}

fn row_to_recipe(row: &Row<'_>) -> Result<Recipe, StoreError> {
    let corrupt = |field: &str, e: String| StoreError::Corrupt(format!("{}: {}", field, e));

    let get = |idx: usize| -> Result<String, StoreError> {
        row.get::<_, String>(idx)
            .map_err(|e| corrupt("column", e.to_string()))
    };

    let ingredients: Vec<String> = serde_json::from_str(&get(4)?)
        .map_err(|e| corrupt("ingredients", e.to_string()))?;
    let instructions: Vec<String> = serde_json::from_str(&get(5)?)
        .map_err(|e| corrupt("instructions", e.to_string()))?;

    let nutrition: Option<Nutrition> = match row
        .get::<_, Option<String>>(10)
        .map_err(|e| corrupt("nutrition", e.to_string()))?
    {
        Some(json) => {
            Some(serde_json::from_str(&json).map_err(|e| corrupt("nutrition", e.to_string()))?)
        }
        None => None,
    };

    let provenance_text = get(11)?;
    let provenance = Provenance::parse(&provenance_text)
        .ok_or_else(|| corrupt("provenance", provenance_text.clone()))?;

    let created_at_text = get(13)?;
    let created_at = DateTime::parse_from_rfc3339(&created_at_text)
        .map_err(|e| corrupt("created_at", e.to_string()))?
        .with_timezone(&Utc);

    Ok(Recipe {
        id: get(0)?,
        title: get(1)?,
        description: get(2)?,
        image_url: get(3)?,
        ingredients,
        instructions,
        cuisine_type: get(6)?,
        diet_type: get(7)?,
        cook_time: get(8)?,
        cook_time_minutes: row
            .get::<_, Option<u32>>(9)
            .map_err(|e| corrupt("cook_time_minutes", e.to_string()))?,
        nutrition,
        provenance,
        owner_ref: get(12)?,
        created_at,
    })
}

const RECIPE_COLUMNS: &str = "id, title, description, image_url, ingredients, instructions, \
     cuisine_type, diet_type, cook_time, cook_time_minutes, nutrition, \
     provenance, owner_ref, created_at";

fn query_error(e: rusqlite::Error) -> StoreError {
    StoreError::Unavailable(format!("Query failed: {}", e))
}

#[async_trait]
impl RecipeStore for SqliteStore {
    async fn get_by_id(&self, id: &str) -> Result<Option<Recipe>, StoreError> {
        let conn = self.lock()?;
        let mut stmt = conn
            .prepare(&format!(
                "SELECT {} FROM recipes WHERE id = ?1",
                RECIPE_COLUMNS
            ))
            .map_err(query_error)?;
        let mut rows = stmt.query(params![id]).map_err(query_error)?;
        match rows.next().map_err(query_error)? {
            Some(row) => Ok(Some(row_to_recipe(row)?)),
            None => Ok(None),
        }
    }

    async fn search_by_text(&self, query: &str) -> Result<Vec<Recipe>, StoreError> {
        let needle = query.trim().to_lowercase();
        let conn = self.lock()?;
        let mut stmt = conn
            .prepare(&format!(
                "SELECT {} FROM recipes
                 WHERE ?1 = '' OR instr(lower(title), ?1) > 0
                    OR instr(lower(description), ?1) > 0
                 ORDER BY created_at",
                RECIPE_COLUMNS
            ))
            .map_err(query_error)?;
        let mut rows = stmt.query(params![needle]).map_err(query_error)?;
        let mut results = Vec::new();
        while let Some(row) = rows.next().map_err(query_error)? {
            results.push(row_to_recipe(row)?);
        }
        Ok(results)
    }

    async fn insert(&self, recipe: &Recipe) -> Result<(), StoreError> {
        let ingredients = serde_json::to_string(&recipe.ingredients)
            .map_err(|e| StoreError::Corrupt(format!("ingredients: {}", e)))?;
        let instructions = serde_json::to_string(&recipe.instructions)
            .map_err(|e| StoreError::Corrupt(format!("instructions: {}", e)))?;
        let nutrition = match &recipe.nutrition {
            Some(n) => Some(
                serde_json::to_string(n)
                    .map_err(|e| StoreError::Corrupt(format!("nutrition: {}", e)))?,
            ),
            None => None,
        };

        let conn = self.lock()?;
        conn.execute(
            "INSERT OR REPLACE INTO recipes VALUES
             (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11, ?12, ?13, ?14)",
            params![
                recipe.id,
                recipe.title,
                recipe.description,
                recipe.image_url,
                ingredients,
                instructions,
                recipe.cuisine_type,
                recipe.diet_type,
                recipe.cook_time,
                recipe.cook_time_minutes,
                nutrition,
                recipe.provenance.as_str(),
                recipe.owner_ref,
                recipe.created_at.to_rfc3339(),
            ],
        )
        .map_err(query_error)?;
        Ok(())
    }

    async fn delete(&self, id: &str) -> Result<(), StoreError> {
        let conn = self.lock()?;
        conn.execute("DELETE FROM recipes WHERE id = ?1", params![id])
            .map_err(query_error)?;
        Ok(())
    }

    async fn list_generated(&self) -> Result<Vec<Recipe>, StoreError> {
        let conn = self.lock()?;
        let mut stmt = conn
            .prepare(&format!(
                "SELECT {} FROM recipes WHERE provenance = 'generated' ORDER BY created_at",
                RECIPE_COLUMNS
            ))
            .map_err(query_error)?;
        let mut rows = stmt.query([]).map_err(query_error)?;
        let mut pool = Vec::new();
        while let Some(row) = rows.next().map_err(query_error)? {
            pool.push(row_to_recipe(row)?);
        }
        Ok(pool)
    }

    async fn find_mapping(&self, external_id: &str) -> Result<Option<String>, StoreError> {
        let conn = self.lock()?;
        let mut stmt = conn
            .prepare("SELECT internal_id FROM external_mappings WHERE external_id = ?1")
            .map_err(query_error)?;
        let mut rows = stmt.query(params![external_id]).map_err(query_error)?;
        match rows.next().map_err(query_error)? {
            Some(row) => Ok(Some(row.get(0).map_err(query_error)?)),
            None => Ok(None),
        }
    }

    async fn record_mapping(
        &self,
        internal_id: &str,
        external_id: &str,
    ) -> Result<(), StoreError> {
        let conn = self.lock()?;
        // At most one import per external id.
        conn.execute(
            "INSERT OR IGNORE INTO external_mappings (external_id, internal_id, created_at)
             VALUES (?1, ?2, ?3)",
            params![external_id, internal_id, Utc::now().to_rfc3339()],
        )
        .map_err(query_error)?;
        Ok(())
    }
}
