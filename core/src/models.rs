use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use thiserror::Error;

pub const SOURCE_MANUAL: &str = "Manual";
pub const SOURCE_AI: &str = "AI Generated";

pub const DEFAULT_USER_ID: &str = "default-user";
pub const DEFAULT_CUISINE: &str = "Unknown";
pub const DEFAULT_RECIPE_CATEGORY: &str = "Main Course";

/// Inventory items at or below this quantity count as low stock.
pub const LOW_STOCK_QUANTITY: i64 = 5;

/// Window used by the dashboard and the `expiring` inventory filter.
pub const EXPIRING_SOON_DAYS: i64 = 7;

pub const DIETARY_OPTIONS: &[&str] = &[
    "Vegetarian",
    "Vegan",
    "Pescatarian",
    "Keto",
    "Paleo",
    "Gluten-Free",
    "Dairy-Free",
    "Low-Carb",
    "Halal",
    "Kosher",
];

pub const CUISINE_OPTIONS: &[&str] = &[
    "Italian",
    "Mexican",
    "Chinese",
    "Japanese",
    "Indian",
    "Thai",
    "Korean",
    "French",
    "Mediterranean",
    "American",
    "Greek",
    "Spanish",
    "Vietnamese",
    "Middle Eastern",
];

pub const SHOPPING_DAYS: &[&str] = &[
    "Monday",
    "Tuesday",
    "Wednesday",
    "Thursday",
    "Friday",
    "Saturday",
    "Sunday",
];

// --- Inventory ---

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct InventoryItem {
    pub id: String,
    pub name: String,
    pub quantity: i64,
    pub unit: String,
    pub category: String,
    pub expiry_date: NaiveDate,
    pub added_date: String,
}

impl InventoryItem {
    /// Whole days from `today` until the item expires. Negative once expired.
    pub fn days_until_expiry(&self, today: NaiveDate) -> i64 {
        (self.expiry_date - today).num_days()
    }

    pub fn is_out_of_stock(&self) -> bool {
        self.quantity == 0
    }

    pub fn is_low_stock(&self) -> bool {
        self.quantity > 0 && self.quantity <= LOW_STOCK_QUANTITY
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct NewInventoryItem {
    pub name: String,
    pub quantity: i64,
    pub unit: String,
    pub category: String,
    pub expiry_date: NaiveDate,
}

// --- Recipes ---

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Recipe {
    pub id: String,
    pub name: String,
    pub ingredients: Vec<String>,
    pub instructions: Vec<String>,
    pub prep_time: i64,
    pub cook_time: i64,
    pub servings: i64,
    pub calories: i64,
    pub category: String,
    pub cuisine: String,
    pub source: String,
    pub is_saved: bool,
    pub created_at: String,
    pub updated_at: String,
}

impl Recipe {
    pub fn is_ai_generated(&self) -> bool {
        self.source == SOURCE_AI
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct NewRecipe {
    pub name: String,
    #[serde(default)]
    pub ingredients: Vec<String>,
    #[serde(default)]
    pub instructions: Vec<String>,
    #[serde(default)]
    pub prep_time: i64,
    #[serde(default)]
    pub cook_time: i64,
    #[serde(default = "default_servings")]
    pub servings: i64,
    #[serde(default)]
    pub calories: i64,
    pub category: String,
    #[serde(default = "default_cuisine")]
    pub cuisine: String,
    #[serde(default = "default_source")]
    pub source: String,
}

fn default_servings() -> i64 {
    4
}

fn default_cuisine() -> String {
    DEFAULT_CUISINE.to_string()
}

fn default_source() -> String {
    SOURCE_MANUAL.to_string()
}

// --- Shopping list ---

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ShoppingListItem {
    pub id: String,
    pub name: String,
    pub quantity: f64,
    pub unit: String,
    pub category: String,
    pub purchased: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub expiry_date: Option<NaiveDate>,
    pub created_at: String,
}

#[derive(Debug, Clone, Deserialize)]
pub struct NewShoppingListItem {
    pub name: String,
    pub quantity: f64,
    pub unit: String,
    pub category: String,
    #[serde(default)]
    pub expiry_date: Option<NaiveDate>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct UpdateShoppingListItem {
    pub name: String,
    pub quantity: f64,
    pub unit: String,
    pub category: String,
    pub purchased: bool,
    #[serde(default)]
    pub expiry_date: Option<NaiveDate>,
}

/// Outcome of merging a batch of ingredient lines into the shopping list.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ShoppingListImport {
    pub added_count: usize,
    pub updated_count: usize,
    pub message: String,
}

#[derive(Debug, Clone, Serialize)]
pub struct ShoppingProgress {
    pub purchased: usize,
    pub total: usize,
    pub percent: f64,
}

impl ShoppingProgress {
    #[allow(clippy::cast_precision_loss)]
    pub fn from_items(items: &[ShoppingListItem]) -> Self {
        let total = items.len();
        let purchased = items.iter().filter(|i| i.purchased).count();
        let percent = if total == 0 {
            0.0
        } else {
            purchased as f64 / total as f64 * 100.0
        };
        Self {
            purchased,
            total,
            percent,
        }
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct ShoppingListView {
    pub items: Vec<ShoppingListItem>,
    pub progress: ShoppingProgress,
}

// --- Preferences ---

/// Per-user settings. `low_stock_threshold` is a fraction in `0.0..=1.0`;
/// storage keeps it as an integer percentage.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct UserPreferences {
    pub user_id: String,
    pub dietary_restrictions: Vec<String>,
    pub allergies: Vec<String>,
    pub favorite_cuisines: Vec<String>,
    pub disliked_ingredients: Vec<String>,
    pub servings_default: i64,
    pub shopping_day: String,
    pub low_stock_threshold: f64,
    pub expiry_warning_days: i64,
    pub expiry_alerts: bool,
    pub low_stock_alerts: bool,
    pub shopping_reminders: bool,
    pub recipe_suggestions: bool,
}

impl Default for UserPreferences {
    fn default() -> Self {
        Self {
            user_id: DEFAULT_USER_ID.to_string(),
            dietary_restrictions: Vec::new(),
            allergies: Vec::new(),
            favorite_cuisines: Vec::new(),
            disliked_ingredients: Vec::new(),
            servings_default: 4,
            shopping_day: "Sunday".to_string(),
            low_stock_threshold: 0.2,
            expiry_warning_days: 3,
            expiry_alerts: true,
            low_stock_alerts: true,
            shopping_reminders: true,
            recipe_suggestions: true,
        }
    }
}

// --- Dashboard ---

#[derive(Debug, Clone, Serialize)]
pub struct HomeSummary {
    pub total_inventory_items: usize,
    pub saved_recipes: usize,
    pub expiring_soon: usize,
    pub low_stock: usize,
    pub shopping: ShoppingProgress,
    pub recent_recipes: Vec<Recipe>,
}

// --- Validation ---

/// Input rejected by one of the `validate_*` checks.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("{0}")]
pub struct ValidationError(pub String);

macro_rules! reject {
    ($($arg:tt)*) => {
        return Err(ValidationError(format!($($arg)*)))
    };
}

pub fn validate_inventory_item(item: &NewInventoryItem) -> Result<(), ValidationError> {
    if item.name.trim().is_empty() {
        reject!("Item name must not be empty");
    }
    if item.quantity < 0 {
        reject!("quantity must not be negative");
    }
    if item.unit.trim().is_empty() {
        reject!("unit must not be empty");
    }
    if item.category.trim().is_empty() {
        reject!("category must not be empty");
    }
    Ok(())
}

pub fn validate_recipe(recipe: &NewRecipe) -> Result<(), ValidationError> {
    if recipe.name.trim().is_empty() {
        reject!("Recipe name must not be empty");
    }
    if recipe.category.trim().is_empty() {
        reject!("category must not be empty");
    }
    if recipe.prep_time < 0 || recipe.cook_time < 0 {
        reject!("prep_time and cook_time must not be negative");
    }
    if recipe.servings < 0 {
        reject!("servings must not be negative");
    }
    if recipe.calories < 0 {
        reject!("calories must not be negative");
    }
    if recipe
        .ingredients
        .iter()
        .chain(&recipe.instructions)
        .any(|line| line.contains('\n'))
    {
        reject!("ingredient and instruction lines must not contain line breaks");
    }
    Ok(())
}

pub fn validate_shopping_item(name: &str, quantity: f64, unit: &str) -> Result<(), ValidationError> {
    if name.trim().is_empty() {
        reject!("Item name must not be empty");
    }
    if !quantity.is_finite() || quantity < 0.0 {
        reject!("quantity must be a non-negative number");
    }
    if unit.trim().is_empty() {
        reject!("unit must not be empty");
    }
    Ok(())
}

pub fn validate_preferences(prefs: &UserPreferences) -> Result<(), ValidationError> {
    if !SHOPPING_DAYS.contains(&prefs.shopping_day.as_str()) {
        reject!(
            "Invalid shopping day '{}'. Must be one of: {}",
            prefs.shopping_day,
            SHOPPING_DAYS.join(", ")
        );
    }
    if !(0.0..=1.0).contains(&prefs.low_stock_threshold) {
        reject!("low_stock_threshold must be between 0 and 1");
    }
    if prefs.servings_default < 1 {
        reject!("servings_default must be at least 1");
    }
    if prefs.expiry_warning_days < 0 {
        reject!("expiry_warning_days must not be negative");
    }
    if let Some(unknown) = prefs
        .dietary_restrictions
        .iter()
        .find(|d| !DIETARY_OPTIONS.contains(&d.as_str()))
    {
        reject!("Unknown dietary restriction '{unknown}'");
    }
    Ok(())
}
