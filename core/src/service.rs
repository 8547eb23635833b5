use std::path::Path;
use std::sync::{Mutex, MutexGuard, PoisonError};

use anyhow::Result;
use chrono::NaiveDate;
use tracing::info;

use crate::db::Database;
use crate::filters::{InventoryQuery, RecipeQuery, filter_inventory, filter_recipes};
use crate::models::{
    DEFAULT_USER_ID, EXPIRING_SOON_DAYS, HomeSummary, InventoryItem, NewInventoryItem, NewRecipe,
    NewShoppingListItem, Recipe, SOURCE_AI, ShoppingListImport, ShoppingListItem,
    ShoppingListView, ShoppingProgress, UpdateShoppingListItem, UserPreferences,
    validate_inventory_item, validate_preferences, validate_recipe, validate_shopping_item,
};
use crate::recipe_ai::{
    AiError, GenerationOptions, extraction_prompt, inventory_prompt, parse_generated_recipe,
};
use crate::shopping;

/// Text-generation backend used to write recipes.
pub trait RecipeGenerator: Send + Sync {
    fn generate(&self, prompt: &str) -> impl Future<Output = Result<String, AiError>> + Send;
}

pub struct PantryService {
    db: Database,
}

impl PantryService {
    pub fn new(db: Database) -> Self {
        Self { db }
    }

    pub fn open(db_path: &Path) -> Result<Self> {
        Ok(Self::new(Database::open(db_path)?))
    }

    pub fn open_in_memory() -> Result<Self> {
        Ok(Self::new(Database::open_in_memory()?))
    }

    // --- Dashboard ---

    pub fn home_summary(&self, today: NaiveDate) -> Result<HomeSummary> {
        let inventory = self.db.list_inventory_items()?;
        let shopping = self.db.list_shopping_items()?;

        let expiring_soon = inventory
            .iter()
            .filter(|item| (0..=EXPIRING_SOON_DAYS).contains(&item.days_until_expiry(today)))
            .count();
        let low_stock = inventory.iter().filter(|item| item.is_low_stock()).count();

        Ok(HomeSummary {
            total_inventory_items: inventory.len(),
            saved_recipes: self.db.count_saved_recipes()?,
            expiring_soon,
            low_stock,
            shopping: ShoppingProgress::from_items(&shopping),
            recent_recipes: self.db.recent_recipes(3)?,
        })
    }

    // --- Inventory ---

    pub fn add_inventory_item(&self, item: &NewInventoryItem) -> Result<InventoryItem> {
        validate_inventory_item(item)?;
        self.db.insert_inventory_item(item)
    }

    pub fn find_inventory_item(&self, id: &str) -> Result<Option<InventoryItem>> {
        self.db.find_inventory_item(id)
    }

    pub fn list_inventory(
        &self,
        query: &InventoryQuery,
        today: NaiveDate,
    ) -> Result<Vec<InventoryItem>> {
        let items = self.db.list_inventory_items()?;
        Ok(filter_inventory(items, query, today))
    }

    pub fn update_inventory_item(&self, id: &str, item: &NewInventoryItem) -> Result<InventoryItem> {
        validate_inventory_item(item)?;
        self.db.update_inventory_item(id, item)
    }

    pub fn delete_inventory_item(&self, id: &str) -> Result<bool> {
        self.db.delete_inventory_item(id)
    }

    pub fn delete_inventory_items(&self, ids: &[String]) -> Result<usize> {
        let deleted = self.db.delete_inventory_items(ids)?;
        info!(requested = ids.len(), deleted, "bulk deleted inventory items");
        Ok(deleted)
    }

    // --- Recipes ---

    pub fn create_recipe(&self, recipe: &NewRecipe) -> Result<Recipe> {
        validate_recipe(recipe)?;
        self.db.insert_recipe(recipe)
    }

    pub fn find_recipe(&self, id: &str) -> Result<Option<Recipe>> {
        self.db.find_recipe(id)
    }

    pub fn list_recipes(&self, query: &RecipeQuery) -> Result<Vec<Recipe>> {
        let recipes = self.db.list_recipes()?;
        Ok(filter_recipes(recipes, query))
    }

    pub fn update_recipe(&self, id: &str, recipe: &NewRecipe) -> Result<Recipe> {
        validate_recipe(recipe)?;
        self.db.update_recipe(id, recipe)
    }

    pub fn delete_recipe(&self, id: &str) -> Result<bool> {
        self.db.delete_recipe(id)
    }

    pub fn toggle_recipe_saved(&self, id: &str) -> Result<Recipe> {
        self.db.toggle_recipe_saved(id)
    }

    pub fn add_recipe_to_shopping_list(&self, recipe_id: &str) -> Result<ShoppingListImport> {
        let recipe = self.db.get_recipe(recipe_id)?;
        shopping::add_recipe_to_shopping_list(&self.db, &recipe.id, &recipe.name, &recipe.ingredients)
    }

    // --- AI recipes ---

    /// Prompt for a recipe built from the current inventory.
    pub fn generation_prompt(&self, options: &GenerationOptions) -> Result<String> {
        let items = self.db.list_inventory_items()?;
        Ok(inventory_prompt(&items, options)?)
    }

    /// Parse a model reply and store it as a new, unsaved recipe.
    pub fn save_generated_recipe(&self, reply: &str, source: &str) -> Result<Recipe> {
        let generated = parse_generated_recipe(reply)?;
        let recipe = self.db.insert_recipe(&generated.into_new_recipe(source))?;
        info!(recipe_id = %recipe.id, name = %recipe.name, source, "saved generated recipe");
        Ok(recipe)
    }

    // --- Shopping list ---

    pub fn shopping_list(&self) -> Result<ShoppingListView> {
        let items = self.db.list_shopping_items()?;
        let progress = ShoppingProgress::from_items(&items);
        Ok(ShoppingListView { items, progress })
    }

    pub fn add_shopping_item(&self, item: &NewShoppingListItem) -> Result<ShoppingListItem> {
        validate_shopping_item(&item.name, item.quantity, &item.unit)?;
        self.db.insert_shopping_item(item)
    }

    pub fn update_shopping_item(
        &self,
        id: &str,
        item: &UpdateShoppingListItem,
    ) -> Result<ShoppingListItem> {
        validate_shopping_item(&item.name, item.quantity, &item.unit)?;
        self.db.update_shopping_item(id, item)
    }

    pub fn find_shopping_item(&self, id: &str) -> Result<Option<ShoppingListItem>> {
        self.db.find_shopping_item(id)
    }

    pub fn toggle_shopping_purchased(&self, id: &str) -> Result<ShoppingListItem> {
        self.db.toggle_shopping_purchased(id)
    }

    pub fn delete_shopping_item(&self, id: &str) -> Result<bool> {
        self.db.delete_shopping_item(id)
    }

    pub fn clear_shopping_list(&self) -> Result<usize> {
        let removed = self.db.clear_shopping_list()?;
        info!(removed, "started a new shopping cart");
        Ok(removed)
    }

    pub fn restock_low_stock(&self) -> Result<ShoppingListImport> {
        let inventory = self.db.list_inventory_items()?;
        shopping::restock_from_inventory(&self.db, &inventory)
    }

    // --- Preferences ---

    pub fn preferences(&self) -> Result<UserPreferences> {
        Ok(self
            .db
            .get_preferences(DEFAULT_USER_ID)?
            .unwrap_or_default())
    }

    /// Upsert the single user's preferences. Any `user_id` in the input is ignored.
    pub fn save_preferences(&self, prefs: &UserPreferences) -> Result<UserPreferences> {
        let prefs = UserPreferences {
            user_id: DEFAULT_USER_ID.to_string(),
            ..prefs.clone()
        };
        validate_preferences(&prefs)?;
        self.db.save_preferences(&prefs)
    }
}

fn lock(service: &Mutex<PantryService>) -> MutexGuard<'_, PantryService> {
    service.lock().unwrap_or_else(PoisonError::into_inner)
}

/// Generate a recipe from the current inventory and store it unsaved.
///
/// The service lock is released while the generator runs.
pub async fn generate_recipe<G: RecipeGenerator>(
    service: &Mutex<PantryService>,
    generator: &G,
    options: &GenerationOptions,
) -> Result<Recipe> {
    let prompt = lock(service).generation_prompt(options)?;
    let reply = generator.generate(&prompt).await?;
    lock(service).save_generated_recipe(&reply, SOURCE_AI)
}

/// Extract a recipe from a page (its text when given, else its URL) and
/// store it with the URL as source.
pub async fn extract_recipe<G: RecipeGenerator>(
    service: &Mutex<PantryService>,
    generator: &G,
    url: &str,
    content: Option<&str>,
) -> Result<Recipe> {
    let reply = generator.generate(&extraction_prompt(url, content)).await?;
    lock(service).save_generated_recipe(&reply, url)
}
