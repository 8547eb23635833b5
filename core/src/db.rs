use std::path::Path;

use anyhow::{Context, Result};
use chrono::{Local, NaiveDate};
use rusqlite::{Connection, OptionalExtension, params};
use uuid::Uuid;

use crate::codec::{
    decode_list, encode_list, join_lines, percent_to_threshold, split_lines, threshold_to_percent,
};
use crate::models::{
    InventoryItem, NewInventoryItem, NewRecipe, NewShoppingListItem, Recipe, ShoppingListItem,
    UpdateShoppingListItem, UserPreferences,
};

const RECIPE_COLUMNS: &str = "id, name, ingredients, instructions, prep_time, cook_time, servings, calories,
     category, cuisine, source, is_saved, created_at, updated_at";

const INVENTORY_COLUMNS: &str = "id, name, quantity, unit, category, expiry_date, added_date";

const SHOPPING_COLUMNS: &str =
    "id, name, quantity, unit, category, purchased, expiry_date, created_at";

const PREFERENCE_COLUMNS: &str = "user_id, dietary_restrictions, allergies, favorite_cuisines,
     disliked_ingredients, servings_default, shopping_day, low_stock_threshold,
     expiry_warning_days, expiry_alerts, low_stock_alerts, shopping_reminders, recipe_suggestions";

pub struct Database {
    conn: Connection,
}

impl Database {
    pub fn open(path: &Path) -> Result<Self> {
        let conn = Connection::open(path)
            .with_context(|| format!("Failed to open database: {}", path.display()))?;
        let db = Database { conn };
        db.migrate()?;
        Ok(db)
    }

    pub fn open_in_memory() -> Result<Self> {
        let conn = Connection::open_in_memory()?;
        let db = Database { conn };
        db.migrate()?;
        Ok(db)
    }

    fn migrate(&self) -> Result<()> {
        let version: i64 = self
            .conn
            .pragma_query_value(None, "user_version", |row| row.get(0))?;

        if version < 1 {
            self.conn.execute_batch(
                "CREATE TABLE IF NOT EXISTS recipes (
                    id TEXT PRIMARY KEY,
                    name TEXT NOT NULL,
                    ingredients TEXT NOT NULL,
                    instructions TEXT NOT NULL,
                    prep_time INTEGER NOT NULL DEFAULT 0,
                    cook_time INTEGER NOT NULL DEFAULT 0,
                    servings INTEGER NOT NULL DEFAULT 4,
                    calories INTEGER NOT NULL DEFAULT 0,
                    category TEXT NOT NULL,
                    source TEXT NOT NULL DEFAULT 'Manual',
                    is_saved INTEGER NOT NULL DEFAULT 0,
                    created_at TEXT NOT NULL,
                    updated_at TEXT NOT NULL
                );

                CREATE TABLE IF NOT EXISTS inventory_items (
                    id TEXT PRIMARY KEY,
                    name TEXT NOT NULL,
                    quantity INTEGER NOT NULL,
                    unit TEXT NOT NULL,
                    category TEXT NOT NULL,
                    expiry_date TEXT NOT NULL,
                    added_date TEXT NOT NULL
                );

                CREATE TABLE IF NOT EXISTS shopping_list_items (
                    id TEXT PRIMARY KEY,
                    name TEXT NOT NULL,
                    quantity REAL NOT NULL,
                    unit TEXT NOT NULL,
                    category TEXT NOT NULL,
                    purchased INTEGER NOT NULL DEFAULT 0,
                    expiry_date TEXT,
                    created_at TEXT NOT NULL
                );

                CREATE INDEX IF NOT EXISTS idx_shopping_list_items_name ON shopping_list_items(name);
                CREATE INDEX IF NOT EXISTS idx_inventory_items_expiry ON inventory_items(expiry_date);

                CREATE TABLE IF NOT EXISTS user_preferences (
                    user_id TEXT PRIMARY KEY,
                    dietary_restrictions TEXT NOT NULL DEFAULT '[]',
                    allergies TEXT NOT NULL DEFAULT '[]',
                    favorite_cuisines TEXT NOT NULL DEFAULT '[]',
                    disliked_ingredients TEXT NOT NULL DEFAULT '[]',
                    servings_default INTEGER NOT NULL DEFAULT 4,
                    shopping_day TEXT NOT NULL DEFAULT 'Sunday',
                    low_stock_threshold INTEGER NOT NULL DEFAULT 20
                        CHECK (low_stock_threshold BETWEEN 0 AND 100),
                    expiry_warning_days INTEGER NOT NULL DEFAULT 3,
                    expiry_alerts INTEGER NOT NULL DEFAULT 1,
                    low_stock_alerts INTEGER NOT NULL DEFAULT 1,
                    shopping_reminders INTEGER NOT NULL DEFAULT 1,
                    recipe_suggestions INTEGER NOT NULL DEFAULT 1,
                    created_at TEXT NOT NULL,
                    updated_at TEXT NOT NULL
                );

                PRAGMA user_version = 1;",
            )?;
        }

        if version < 2 {
            self.conn.execute_batch(
                "ALTER TABLE recipes ADD COLUMN cuisine TEXT NOT NULL DEFAULT 'Unknown';
                 CREATE INDEX IF NOT EXISTS idx_recipes_created_at ON recipes(created_at);
                 PRAGMA user_version = 2;",
            )?;
        }

        Ok(())
    }

    // --- Row mappers ---

    fn date_column(row: &rusqlite::Row, idx: usize) -> rusqlite::Result<NaiveDate> {
        let text: String = row.get(idx)?;
        NaiveDate::parse_from_str(&text, "%Y-%m-%d").map_err(|e| {
            rusqlite::Error::FromSqlConversionFailure(idx, rusqlite::types::Type::Text, Box::new(e))
        })
    }

    fn recipe_from_row(row: &rusqlite::Row) -> rusqlite::Result<Recipe> {
        let ingredients: String = row.get(2)?;
        let instructions: String = row.get(3)?;
        Ok(Recipe {
            id: row.get(0)?,
            name: row.get(1)?,
            ingredients: split_lines(&ingredients),
            instructions: split_lines(&instructions),
            prep_time: row.get(4)?,
            cook_time: row.get(5)?,
            servings: row.get(6)?,
            calories: row.get(7)?,
            category: row.get(8)?,
            cuisine: row.get(9)?,
            source: row.get(10)?,
            is_saved: row.get(11)?,
            created_at: row.get(12)?,
            updated_at: row.get(13)?,
        })
    }

    fn inventory_item_from_row(row: &rusqlite::Row) -> rusqlite::Result<InventoryItem> {
        Ok(InventoryItem {
            id: row.get(0)?,
            name: row.get(1)?,
            quantity: row.get(2)?,
            unit: row.get(3)?,
            category: row.get(4)?,
            expiry_date: Self::date_column(row, 5)?,
            added_date: row.get(6)?,
        })
    }

    fn shopping_item_from_row(row: &rusqlite::Row) -> rusqlite::Result<ShoppingListItem> {
        let expiry: Option<String> = row.get(6)?;
        let expiry_date = match expiry {
            Some(_) => Some(Self::date_column(row, 6)?),
            None => None,
        };
        Ok(ShoppingListItem {
            id: row.get(0)?,
            name: row.get(1)?,
            quantity: row.get(2)?,
            unit: row.get(3)?,
            category: row.get(4)?,
            purchased: row.get(5)?,
            expiry_date,
            created_at: row.get(7)?,
        })
    }

    fn preferences_from_row(row: &rusqlite::Row) -> rusqlite::Result<UserPreferences> {
        let dietary: String = row.get(1)?;
        let allergies: String = row.get(2)?;
        let cuisines: String = row.get(3)?;
        let disliked: String = row.get(4)?;
        Ok(UserPreferences {
            user_id: row.get(0)?,
            dietary_restrictions: decode_list(&dietary),
            allergies: decode_list(&allergies),
            favorite_cuisines: decode_list(&cuisines),
            disliked_ingredients: decode_list(&disliked),
            servings_default: row.get(5)?,
            shopping_day: row.get(6)?,
            low_stock_threshold: percent_to_threshold(row.get(7)?),
            expiry_warning_days: row.get(8)?,
            expiry_alerts: row.get(9)?,
            low_stock_alerts: row.get(10)?,
            shopping_reminders: row.get(11)?,
            recipe_suggestions: row.get(12)?,
        })
    }

    // --- Recipes ---

    pub fn insert_recipe(&self, recipe: &NewRecipe) -> Result<Recipe> {
        let now = Local::now().to_rfc3339();
        let id = Uuid::new_v4().to_string();
        self.conn.execute(
            "INSERT INTO recipes (id, name, ingredients, instructions, prep_time, cook_time, servings, calories, category, cuisine, source, is_saved, created_at, updated_at)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11, 0, ?12, ?12)",
            params![
                id,
                recipe.name,
                join_lines(&recipe.ingredients),
                join_lines(&recipe.instructions),
                recipe.prep_time,
                recipe.cook_time,
                recipe.servings,
                recipe.calories,
                recipe.category,
                recipe.cuisine,
                recipe.source,
                now,
            ],
        )?;
        self.get_recipe(&id)
    }

    pub fn find_recipe(&self, id: &str) -> Result<Option<Recipe>> {
        let recipe = self
            .conn
            .query_row(
                &format!("SELECT {RECIPE_COLUMNS} FROM recipes WHERE id = ?1"),
                params![id],
                Self::recipe_from_row,
            )
            .optional()?;
        Ok(recipe)
    }

    pub fn get_recipe(&self, id: &str) -> Result<Recipe> {
        self.find_recipe(id)?.context("Recipe not found")
    }

    pub fn list_recipes(&self) -> Result<Vec<Recipe>> {
        let mut stmt = self.conn.prepare(&format!(
            "SELECT {RECIPE_COLUMNS} FROM recipes ORDER BY created_at DESC, rowid DESC"
        ))?;
        let recipes = stmt
            .query_map([], Self::recipe_from_row)?
            .collect::<Result<Vec<_>, _>>()?;
        Ok(recipes)
    }

    pub fn recent_recipes(&self, limit: i64) -> Result<Vec<Recipe>> {
        let mut stmt = self.conn.prepare(&format!(
            "SELECT {RECIPE_COLUMNS} FROM recipes ORDER BY created_at DESC, rowid DESC LIMIT ?1"
        ))?;
        let recipes = stmt
            .query_map(params![limit], Self::recipe_from_row)?
            .collect::<Result<Vec<_>, _>>()?;
        Ok(recipes)
    }

    pub fn count_saved_recipes(&self) -> Result<usize> {
        let count: i64 =
            self.conn
                .query_row("SELECT COUNT(*) FROM recipes WHERE is_saved = 1", [], |row| {
                    row.get(0)
                })?;
        Ok(usize::try_from(count).unwrap_or_default())
    }

    /// Overwrites every editable column. `is_saved` and `created_at` are kept.
    pub fn update_recipe(&self, id: &str, recipe: &NewRecipe) -> Result<Recipe> {
        self.get_recipe(id)?;

        let now = Local::now().to_rfc3339();
        self.conn.execute(
            "UPDATE recipes SET name = ?1, ingredients = ?2, instructions = ?3, prep_time = ?4,
                    cook_time = ?5, servings = ?6, calories = ?7, category = ?8, cuisine = ?9,
                    source = ?10, updated_at = ?11
             WHERE id = ?12",
            params![
                recipe.name,
                join_lines(&recipe.ingredients),
                join_lines(&recipe.instructions),
                recipe.prep_time,
                recipe.cook_time,
                recipe.servings,
                recipe.calories,
                recipe.category,
                recipe.cuisine,
                recipe.source,
                now,
                id,
            ],
        )?;
        self.get_recipe(id)
    }

    /// Flip `is_saved`. Read-modify-write with no version check; the last
    /// writer wins.
    pub fn toggle_recipe_saved(&self, id: &str) -> Result<Recipe> {
        let recipe = self.get_recipe(id)?;
        let now = Local::now().to_rfc3339();
        self.conn.execute(
            "UPDATE recipes SET is_saved = ?1, updated_at = ?2 WHERE id = ?3",
            params![!recipe.is_saved, now, id],
        )?;
        self.get_recipe(id)
    }

    pub fn delete_recipe(&self, id: &str) -> Result<bool> {
        let rows = self
            .conn
            .execute("DELETE FROM recipes WHERE id = ?1", params![id])?;
        Ok(rows > 0)
    }

    // --- Inventory ---

    pub fn insert_inventory_item(&self, item: &NewInventoryItem) -> Result<InventoryItem> {
        let now = Local::now().to_rfc3339();
        let id = Uuid::new_v4().to_string();
        self.conn.execute(
            "INSERT INTO inventory_items (id, name, quantity, unit, category, expiry_date, added_date)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7)",
            params![
                id,
                item.name,
                item.quantity,
                item.unit,
                item.category,
                item.expiry_date.format("%Y-%m-%d").to_string(),
                now,
            ],
        )?;
        self.get_inventory_item(&id)
    }

    pub fn find_inventory_item(&self, id: &str) -> Result<Option<InventoryItem>> {
        let item = self
            .conn
            .query_row(
                &format!("SELECT {INVENTORY_COLUMNS} FROM inventory_items WHERE id = ?1"),
                params![id],
                Self::inventory_item_from_row,
            )
            .optional()?;
        Ok(item)
    }

    pub fn get_inventory_item(&self, id: &str) -> Result<InventoryItem> {
        self.find_inventory_item(id)?
            .context("Inventory item not found")
    }

    pub fn list_inventory_items(&self) -> Result<Vec<InventoryItem>> {
        let mut stmt = self.conn.prepare(&format!(
            "SELECT {INVENTORY_COLUMNS} FROM inventory_items ORDER BY added_date DESC, rowid DESC"
        ))?;
        let items = stmt
            .query_map([], Self::inventory_item_from_row)?
            .collect::<Result<Vec<_>, _>>()?;
        Ok(items)
    }

    pub fn update_inventory_item(&self, id: &str, item: &NewInventoryItem) -> Result<InventoryItem> {
        self.get_inventory_item(id)?;

        self.conn.execute(
            "UPDATE inventory_items SET name = ?1, quantity = ?2, unit = ?3, category = ?4, expiry_date = ?5
             WHERE id = ?6",
            params![
                item.name,
                item.quantity,
                item.unit,
                item.category,
                item.expiry_date.format("%Y-%m-%d").to_string(),
                id,
            ],
        )?;
        self.get_inventory_item(id)
    }

    pub fn delete_inventory_item(&self, id: &str) -> Result<bool> {
        let rows = self
            .conn
            .execute("DELETE FROM inventory_items WHERE id = ?1", params![id])?;
        Ok(rows > 0)
    }

    /// One DELETE per id, no enclosing transaction. A failure part way through
    /// leaves the earlier deletes applied.
    pub fn delete_inventory_items(&self, ids: &[String]) -> Result<usize> {
        let mut deleted = 0;
        for id in ids {
            if self.delete_inventory_item(id)? {
                deleted += 1;
            }
        }
        Ok(deleted)
    }

    // --- Shopping list ---

    pub fn insert_shopping_item(&self, item: &NewShoppingListItem) -> Result<ShoppingListItem> {
        let now = Local::now().to_rfc3339();
        let id = Uuid::new_v4().to_string();
        self.conn.execute(
            "INSERT INTO shopping_list_items (id, name, quantity, unit, category, purchased, expiry_date, created_at)
             VALUES (?1, ?2, ?3, ?4, ?5, 0, ?6, ?7)",
            params![
                id,
                item.name,
                item.quantity,
                item.unit,
                item.category,
                item.expiry_date.map(|d| d.format("%Y-%m-%d").to_string()),
                now,
            ],
        )?;
        self.get_shopping_item(&id)
    }

    pub fn find_shopping_item(&self, id: &str) -> Result<Option<ShoppingListItem>> {
        let item = self
            .conn
            .query_row(
                &format!("SELECT {SHOPPING_COLUMNS} FROM shopping_list_items WHERE id = ?1"),
                params![id],
                Self::shopping_item_from_row,
            )
            .optional()?;
        Ok(item)
    }

    pub fn get_shopping_item(&self, id: &str) -> Result<ShoppingListItem> {
        self.find_shopping_item(id)?
            .context("Shopping list item not found")
    }

    /// Exact, case-sensitive name match. The oldest row wins if there are several.
    pub fn find_shopping_item_by_name(&self, name: &str) -> Result<Option<ShoppingListItem>> {
        let item = self
            .conn
            .query_row(
                &format!(
                    "SELECT {SHOPPING_COLUMNS} FROM shopping_list_items WHERE name = ?1
                     ORDER BY created_at, rowid LIMIT 1"
                ),
                params![name],
                Self::shopping_item_from_row,
            )
            .optional()?;
        Ok(item)
    }

    pub fn list_shopping_items(&self) -> Result<Vec<ShoppingListItem>> {
        let mut stmt = self.conn.prepare(&format!(
            "SELECT {SHOPPING_COLUMNS} FROM shopping_list_items ORDER BY purchased, created_at, rowid"
        ))?;
        let items = stmt
            .query_map([], Self::shopping_item_from_row)?
            .collect::<Result<Vec<_>, _>>()?;
        Ok(items)
    }

    pub fn add_shopping_quantity(&self, id: &str, amount: f64) -> Result<ShoppingListItem> {
        let rows = self.conn.execute(
            "UPDATE shopping_list_items SET quantity = quantity + ?1 WHERE id = ?2",
            params![amount, id],
        )?;
        if rows == 0 {
            anyhow::bail!("Shopping list item not found");
        }
        self.get_shopping_item(id)
    }

    pub fn update_shopping_item(
        &self,
        id: &str,
        item: &UpdateShoppingListItem,
    ) -> Result<ShoppingListItem> {
        self.get_shopping_item(id)?;

        self.conn.execute(
            "UPDATE shopping_list_items SET name = ?1, quantity = ?2, unit = ?3, category = ?4,
                    purchased = ?5, expiry_date = ?6
             WHERE id = ?7",
            params![
                item.name,
                item.quantity,
                item.unit,
                item.category,
                item.purchased,
                item.expiry_date.map(|d| d.format("%Y-%m-%d").to_string()),
                id,
            ],
        )?;
        self.get_shopping_item(id)
    }

    pub fn toggle_shopping_purchased(&self, id: &str) -> Result<ShoppingListItem> {
        let item = self.get_shopping_item(id)?;
        self.conn.execute(
            "UPDATE shopping_list_items SET purchased = ?1 WHERE id = ?2",
            params![!item.purchased, id],
        )?;
        self.get_shopping_item(id)
    }

    pub fn delete_shopping_item(&self, id: &str) -> Result<bool> {
        let rows = self
            .conn
            .execute("DELETE FROM shopping_list_items WHERE id = ?1", params![id])?;
        Ok(rows > 0)
    }

    /// Empty the list to start a new cart. Returns the number of rows removed.
    pub fn clear_shopping_list(&self) -> Result<usize> {
        let rows = self.conn.execute("DELETE FROM shopping_list_items", [])?;
        Ok(rows)
    }

    // --- Preferences ---

    pub fn get_preferences(&self, user_id: &str) -> Result<Option<UserPreferences>> {
        let prefs = self
            .conn
            .query_row(
                &format!("SELECT {PREFERENCE_COLUMNS} FROM user_preferences WHERE user_id = ?1"),
                params![user_id],
                Self::preferences_from_row,
            )
            .optional()?;
        Ok(prefs)
    }

    pub fn save_preferences(&self, prefs: &UserPreferences) -> Result<UserPreferences> {
        let now = Local::now().to_rfc3339();
        self.conn.execute(
            "INSERT INTO user_preferences (user_id, dietary_restrictions, allergies, favorite_cuisines,
                    disliked_ingredients, servings_default, shopping_day, low_stock_threshold,
                    expiry_warning_days, expiry_alerts, low_stock_alerts, shopping_reminders,
                    recipe_suggestions, created_at, updated_at)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11, ?12, ?13, ?14, ?14)
             ON CONFLICT(user_id) DO UPDATE SET
                    dietary_restrictions = excluded.dietary_restrictions,
                    allergies = excluded.allergies,
                    favorite_cuisines = excluded.favorite_cuisines,
                    disliked_ingredients = excluded.disliked_ingredients,
                    servings_default = excluded.servings_default,
                    shopping_day = excluded.shopping_day,
                    low_stock_threshold = excluded.low_stock_threshold,
                    expiry_warning_days = excluded.expiry_warning_days,
                    expiry_alerts = excluded.expiry_alerts,
                    low_stock_alerts = excluded.low_stock_alerts,
                    shopping_reminders = excluded.shopping_reminders,
                    recipe_suggestions = excluded.recipe_suggestions,
                    updated_at = excluded.updated_at",
            params![
                prefs.user_id,
                encode_list(&prefs.dietary_restrictions),
                encode_list(&prefs.allergies),
                encode_list(&prefs.favorite_cuisines),
                encode_list(&prefs.disliked_ingredients),
                prefs.servings_default,
                prefs.shopping_day,
                threshold_to_percent(prefs.low_stock_threshold),
                prefs.expiry_warning_days,
                prefs.expiry_alerts,
                prefs.low_stock_alerts,
                prefs.shopping_reminders,
                prefs.recipe_suggestions,
                now,
            ],
        )?;
        self.get_preferences(&prefs.user_id)?
            .context("Preferences not found after save")
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{SOURCE_MANUAL, DEFAULT_USER_ID};

    fn sample_recipe() -> NewRecipe {
        NewRecipe {
            name: "Tomato Soup".to_string(),
            ingredients: vec!["2 tomatoes".to_string(), "1 onion".to_string()],
            instructions: vec!["Chop".to_string(), "Simmer for 20 minutes".to_string()],
            prep_time: 10,
            cook_time: 20,
            servings: 2,
            calories: 180,
            category: "Lunch".to_string(),
            cuisine: "Italian".to_string(),
            source: SOURCE_MANUAL.to_string(),
        }
    }

    fn sample_inventory(name: &str, quantity: i64) -> NewInventoryItem {
        NewInventoryItem {
            name: name.to_string(),
            quantity,
            unit: "pieces".to_string(),
            category: "Vegetables".to_string(),
            expiry_date: NaiveDate::from_ymd_opt(2030, 6, 1).unwrap(),
        }
    }

    fn sample_shopping(name: &str, quantity: f64) -> NewShoppingListItem {
        NewShoppingListItem {
            name: name.to_string(),
            quantity,
            unit: "whole".to_string(),
            category: "Vegetables".to_string(),
            expiry_date: None,
        }
    }

    #[test]
    fn test_insert_and_get_recipe() {
        let db = Database::open_in_memory().unwrap();
        let recipe = db.insert_recipe(&sample_recipe()).unwrap();

        assert_eq!(recipe.name, "Tomato Soup");
        assert_eq!(recipe.ingredients, vec!["2 tomatoes", "1 onion"]);
        assert_eq!(recipe.instructions.len(), 2);
        assert!(!recipe.is_saved);
        assert_eq!(recipe.created_at, recipe.updated_at);
        assert_eq!(recipe.id.len(), 36);

        let fetched = db.get_recipe(&recipe.id).unwrap();
        assert_eq!(fetched, recipe);
    }

    #[test]
    fn test_get_missing_recipe() {
        let db = Database::open_in_memory().unwrap();
        assert!(db.find_recipe("nope").unwrap().is_none());
        let err = db.get_recipe("nope").unwrap_err();
        assert_eq!(err.to_string(), "Recipe not found");
    }

    #[test]
    fn test_update_recipe_keeps_saved_flag() {
        let db = Database::open_in_memory().unwrap();
        let recipe = db.insert_recipe(&sample_recipe()).unwrap();
        db.toggle_recipe_saved(&recipe.id).unwrap();

        let mut changes = sample_recipe();
        changes.name = "Roasted Tomato Soup".to_string();
        changes.ingredients.push("1 tbsp olive oil".to_string());
        let updated = db.update_recipe(&recipe.id, &changes).unwrap();

        assert_eq!(updated.name, "Roasted Tomato Soup");
        assert_eq!(updated.ingredients.len(), 3);
        assert!(updated.is_saved);
        assert_eq!(updated.created_at, recipe.created_at);
    }

    #[test]
    fn test_toggle_recipe_saved() {
        let db = Database::open_in_memory().unwrap();
        let recipe = db.insert_recipe(&sample_recipe()).unwrap();

        let saved = db.toggle_recipe_saved(&recipe.id).unwrap();
        assert!(saved.is_saved);
        assert_eq!(db.count_saved_recipes().unwrap(), 1);

        let unsaved = db.toggle_recipe_saved(&recipe.id).unwrap();
        assert!(!unsaved.is_saved);
        assert_eq!(db.count_saved_recipes().unwrap(), 0);

        assert!(db.toggle_recipe_saved("missing").is_err());
    }

    #[test]
    fn test_delete_recipe() {
        let db = Database::open_in_memory().unwrap();
        let recipe = db.insert_recipe(&sample_recipe()).unwrap();
        assert!(db.delete_recipe(&recipe.id).unwrap());
        assert!(!db.delete_recipe(&recipe.id).unwrap());
        assert!(db.list_recipes().unwrap().is_empty());
    }

    #[test]
    fn test_recent_recipes_newest_first() {
        let db = Database::open_in_memory().unwrap();
        for name in ["First", "Second", "Third", "Fourth"] {
            let mut recipe = sample_recipe();
            recipe.name = name.to_string();
            db.insert_recipe(&recipe).unwrap();
        }
        let recent = db.recent_recipes(3).unwrap();
        let names: Vec<&str> = recent.iter().map(|r| r.name.as_str()).collect();
        assert_eq!(names, vec!["Fourth", "Third", "Second"]);
    }

    #[test]
    fn test_inventory_crud() {
        let db = Database::open_in_memory().unwrap();
        let item = db.insert_inventory_item(&sample_inventory("Carrot", 4)).unwrap();
        assert_eq!(item.quantity, 4);
        assert_eq!(
            item.expiry_date,
            NaiveDate::from_ymd_opt(2030, 6, 1).unwrap()
        );

        let mut changes = sample_inventory("Carrots", 0);
        changes.unit = "kg".to_string();
        let updated = db.update_inventory_item(&item.id, &changes).unwrap();
        assert_eq!(updated.name, "Carrots");
        assert_eq!(updated.quantity, 0);
        assert_eq!(updated.unit, "kg");
        assert_eq!(updated.added_date, item.added_date);

        assert!(db.update_inventory_item("missing", &changes).is_err());
        assert!(db.delete_inventory_item(&item.id).unwrap());
        assert!(db.find_inventory_item(&item.id).unwrap().is_none());
    }

    #[test]
    fn test_bulk_delete_inventory_counts_existing_only() {
        let db = Database::open_in_memory().unwrap();
        let a = db.insert_inventory_item(&sample_inventory("A", 1)).unwrap();
        let b = db.insert_inventory_item(&sample_inventory("B", 1)).unwrap();
        db.insert_inventory_item(&sample_inventory("C", 1)).unwrap();

        let deleted = db
            .delete_inventory_items(&[a.id, "ghost".to_string(), b.id])
            .unwrap();
        assert_eq!(deleted, 2);

        let left = db.list_inventory_items().unwrap();
        assert_eq!(left.len(), 1);
        assert_eq!(left[0].name, "C");
    }

    #[test]
    fn test_shopping_lookup_is_case_sensitive() {
        let db = Database::open_in_memory().unwrap();
        db.insert_shopping_item(&sample_shopping("onion", 1.0)).unwrap();

        assert!(db.find_shopping_item_by_name("onion").unwrap().is_some());
        assert!(db.find_shopping_item_by_name("Onion").unwrap().is_none());
    }

    #[test]
    fn test_add_shopping_quantity() {
        let db = Database::open_in_memory().unwrap();
        let item = db.insert_shopping_item(&sample_shopping("Milk", 1.0)).unwrap();
        let bumped = db.add_shopping_quantity(&item.id, 2.5).unwrap();
        assert_eq!(bumped.quantity, 3.5);
        assert!(db.add_shopping_quantity("missing", 1.0).is_err());
    }

    #[test]
    fn test_shopping_update_toggle_and_clear() {
        let db = Database::open_in_memory().unwrap();
        let item = db.insert_shopping_item(&sample_shopping("Eggs", 12.0)).unwrap();
        db.insert_shopping_item(&sample_shopping("Bread", 1.0)).unwrap();
        assert!(!item.purchased);

        let toggled = db.toggle_shopping_purchased(&item.id).unwrap();
        assert!(toggled.purchased);

        let updated = db
            .update_shopping_item(
                &item.id,
                &UpdateShoppingListItem {
                    name: "Eggs".to_string(),
                    quantity: 6.0,
                    unit: "whole".to_string(),
                    category: "Dairy & Eggs".to_string(),
                    purchased: false,
                    expiry_date: NaiveDate::from_ymd_opt(2030, 1, 2),
                },
            )
            .unwrap();
        assert_eq!(updated.quantity, 6.0);
        assert!(!updated.purchased);
        assert_eq!(updated.expiry_date, NaiveDate::from_ymd_opt(2030, 1, 2));

        // Purchased rows sort last
        db.toggle_shopping_purchased(&item.id).unwrap();
        let items = db.list_shopping_items().unwrap();
        assert_eq!(items[0].name, "Bread");
        assert_eq!(items[1].name, "Eggs");

        assert_eq!(db.clear_shopping_list().unwrap(), 2);
        assert!(db.list_shopping_items().unwrap().is_empty());
    }

    #[test]
    fn test_preferences_upsert() {
        let db = Database::open_in_memory().unwrap();
        assert!(db.get_preferences(DEFAULT_USER_ID).unwrap().is_none());

        let mut prefs = UserPreferences {
            dietary_restrictions: vec!["Vegan".to_string()],
            favorite_cuisines: vec!["Thai".to_string(), "Middle Eastern".to_string()],
            low_stock_threshold: 0.35,
            ..UserPreferences::default()
        };
        let saved = db.save_preferences(&prefs).unwrap();
        assert_eq!(saved, prefs);

        prefs.shopping_day = "Wednesday".to_string();
        prefs.expiry_alerts = false;
        let saved = db.save_preferences(&prefs).unwrap();
        assert_eq!(saved.shopping_day, "Wednesday");
        assert!(!saved.expiry_alerts);
        assert_eq!(saved.favorite_cuisines.len(), 2);
    }

    #[test]
    fn test_preferences_read_comma_separated_lists() {
        let db = Database::open_in_memory().unwrap();
        db.conn
            .execute(
                "INSERT INTO user_preferences (user_id, allergies, created_at, updated_at)
                 VALUES (?1, 'peanuts, shellfish', 'now', 'now')",
                params![DEFAULT_USER_ID],
            )
            .unwrap();
        let prefs = db.get_preferences(DEFAULT_USER_ID).unwrap().unwrap();
        assert_eq!(prefs.allergies, vec!["peanuts", "shellfish"]);
        assert!(prefs.dietary_restrictions.is_empty());
        assert_eq!(prefs.low_stock_threshold, 0.2);
    }

    #[test]
    fn test_reopen_file_database() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("pantry.db");
        {
            let db = Database::open(&path).unwrap();
            db.insert_recipe(&sample_recipe()).unwrap();
        }
        let db = Database::open(&path).unwrap();
        let recipes = db.list_recipes().unwrap();
        assert_eq!(recipes.len(), 1);
        assert_eq!(recipes[0].cuisine, "Italian");
    }

    #[test]
    fn test_failed_shopping_insert_stops_recipe_import() {
        let db = Database::open_in_memory().unwrap();
        db.conn
            .execute_batch(
                "CREATE TRIGGER reject_onion BEFORE INSERT ON shopping_list_items
                 WHEN NEW.name = 'onion'
                 BEGIN SELECT RAISE(ABORT, 'onion rejected'); END;",
            )
            .unwrap();

        let ingredients = vec![
            "2 tomatoes".to_string(),
            "1 onion".to_string(),
            "1 leek".to_string(),
        ];
        let result =
            crate::shopping::add_recipe_to_shopping_list(&db, "r1", "Soup", &ingredients);
        assert!(result.is_err());

        let names: Vec<String> = db
            .list_shopping_items()
            .unwrap()
            .into_iter()
            .map(|item| item.name)
            .collect();
        assert_eq!(names, vec!["tomatoes"]);
    }
}
