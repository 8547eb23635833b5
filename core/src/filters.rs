//! Filter, search and sort for the inventory and recipe list views.

use std::cmp::Ordering;
use std::str::FromStr;

use anyhow::{Error, bail};
use chrono::NaiveDate;

use crate::models::{EXPIRING_SOON_DAYS, InventoryItem, Recipe};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum SortDirection {
    #[default]
    Asc,
    Desc,
}

impl FromStr for SortDirection {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "asc" => Ok(Self::Asc),
            "desc" => Ok(Self::Desc),
            _ => bail!("Invalid sort direction '{s}'. Use asc or desc"),
        }
    }
}

impl SortDirection {
    fn apply(self, ordering: Ordering) -> Ordering {
        match self {
            Self::Asc => ordering,
            Self::Desc => ordering.reverse(),
        }
    }
}

// --- Inventory ---

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum InventoryFilter {
    #[default]
    All,
    Expiring,
    LowStock,
    OutOfStock,
}

impl FromStr for InventoryFilter {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "all" => Ok(Self::All),
            "expiring" => Ok(Self::Expiring),
            "lowstock" => Ok(Self::LowStock),
            "outofstock" => Ok(Self::OutOfStock),
            _ => bail!(
                "Invalid inventory filter '{s}'. Must be one of: all, expiring, lowstock, outofstock"
            ),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum InventorySortKey {
    #[default]
    Name,
    Quantity,
    Unit,
    Category,
    ExpiryDate,
    AddedDate,
}

impl FromStr for InventorySortKey {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "name" => Ok(Self::Name),
            "quantity" => Ok(Self::Quantity),
            "unit" => Ok(Self::Unit),
            "category" => Ok(Self::Category),
            "expiry_date" => Ok(Self::ExpiryDate),
            "added_date" => Ok(Self::AddedDate),
            _ => bail!("Invalid inventory sort key '{s}'"),
        }
    }
}

#[derive(Debug, Clone, Default)]
pub struct InventoryQuery {
    pub filter: InventoryFilter,
    pub search: Option<String>,
    pub sort_by: InventorySortKey,
    pub direction: SortDirection,
}

fn contains_ignore_case(haystack: &str, needle: &str) -> bool {
    haystack.to_lowercase().contains(&needle.to_lowercase())
}

fn matches_inventory_filter(item: &InventoryItem, filter: InventoryFilter, today: NaiveDate) -> bool {
    match filter {
        InventoryFilter::All => true,
        InventoryFilter::Expiring => {
            (0..=EXPIRING_SOON_DAYS).contains(&item.days_until_expiry(today))
        }
        InventoryFilter::LowStock => item.is_low_stock(),
        InventoryFilter::OutOfStock => item.is_out_of_stock(),
    }
}

fn compare_inventory(a: &InventoryItem, b: &InventoryItem, key: InventorySortKey) -> Ordering {
    match key {
        InventorySortKey::Name => a.name.to_lowercase().cmp(&b.name.to_lowercase()),
        InventorySortKey::Quantity => a.quantity.cmp(&b.quantity),
        InventorySortKey::Unit => a.unit.cmp(&b.unit),
        InventorySortKey::Category => a.category.cmp(&b.category),
        InventorySortKey::ExpiryDate => a.expiry_date.cmp(&b.expiry_date),
        InventorySortKey::AddedDate => a.added_date.cmp(&b.added_date),
    }
}

pub fn filter_inventory(
    mut items: Vec<InventoryItem>,
    query: &InventoryQuery,
    today: NaiveDate,
) -> Vec<InventoryItem> {
    let search = query.search.as_deref().map(str::trim).filter(|s| !s.is_empty());
    items.retain(|item| {
        matches_inventory_filter(item, query.filter, today)
            && search.is_none_or(|needle| contains_ignore_case(&item.name, needle))
    });
    items.sort_by(|a, b| query.direction.apply(compare_inventory(a, b, query.sort_by)));
    items
}

// --- Recipes ---

#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub enum RecipeFilter {
    #[default]
    All,
    Saved,
    AiGenerated,
    Category(String),
}

impl FromStr for RecipeFilter {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Ok(match s {
            "" | "all" => Self::All,
            "saved" => Self::Saved,
            "ai" => Self::AiGenerated,
            category => Self::Category(category.to_string()),
        })
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum RecipeSort {
    #[default]
    Newest,
    Oldest,
    Name,
    Quickest,
    Calories,
}

impl FromStr for RecipeSort {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "newest" => Ok(Self::Newest),
            "oldest" => Ok(Self::Oldest),
            "name" => Ok(Self::Name),
            "quickest" => Ok(Self::Quickest),
            "calories" => Ok(Self::Calories),
            _ => bail!(
                "Invalid recipe sort '{s}'. Must be one of: newest, oldest, name, quickest, calories"
            ),
        }
    }
}

#[derive(Debug, Clone, Default)]
pub struct RecipeQuery {
    pub filter: RecipeFilter,
    pub search: Option<String>,
    pub sort: RecipeSort,
}

fn matches_recipe_search(recipe: &Recipe, needle: &str) -> bool {
    contains_ignore_case(&recipe.name, needle)
        || contains_ignore_case(&recipe.ingredients.join(" "), needle)
}

pub fn filter_recipes(mut recipes: Vec<Recipe>, query: &RecipeQuery) -> Vec<Recipe> {
    let search = query.search.as_deref().map(str::trim).filter(|s| !s.is_empty());
    recipes.retain(|recipe| {
        let keep = match &query.filter {
            RecipeFilter::All => true,
            RecipeFilter::Saved => recipe.is_saved,
            RecipeFilter::AiGenerated => recipe.is_ai_generated(),
            RecipeFilter::Category(category) => &recipe.category == category,
        };
        keep && search.is_none_or(|needle| matches_recipe_search(recipe, needle))
    });
    recipes.sort_by(|a, b| match query.sort {
        RecipeSort::Newest => b.created_at.cmp(&a.created_at),
        RecipeSort::Oldest => a.created_at.cmp(&b.created_at),
        RecipeSort::Name => a.name.to_lowercase().cmp(&b.name.to_lowercase()),
        RecipeSort::Quickest => a.prep_time.cmp(&b.prep_time),
        RecipeSort::Calories => a.calories.cmp(&b.calories),
    });
    recipes
}
