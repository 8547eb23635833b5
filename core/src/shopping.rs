//! Merging ingredient demand into the persisted shopping list.

use anyhow::Result;
use tracing::{debug, info, warn};

use crate::db::Database;
use crate::ingredient::{ParsedIngredient, parse_ingredient};
use crate::models::{InventoryItem, NewShoppingListItem, ShoppingListImport};

enum Merge {
    Added,
    Updated,
}

/// Add or merge one parsed ingredient. Items are the same when their names
/// are byte-for-byte equal; quantities are summed whatever their units.
fn merge_ingredient(db: &Database, parsed: &ParsedIngredient) -> Result<Merge> {
    if let Some(existing) = db.find_shopping_item_by_name(&parsed.name)? {
        if existing.unit != parsed.unit {
            warn!(
                item = %existing.name,
                existing_unit = %existing.unit,
                added_unit = %parsed.unit,
                "summing shopping list quantities with different units"
            );
        }
        db.add_shopping_quantity(&existing.id, parsed.quantity)?;
        return Ok(Merge::Updated);
    }

    db.insert_shopping_item(&NewShoppingListItem {
        name: parsed.name.clone(),
        quantity: parsed.quantity,
        unit: parsed.unit.clone(),
        category: parsed.category.clone(),
        expiry_date: None,
    })?;
    Ok(Merge::Added)
}

fn merge_all<'a>(
    db: &Database,
    parsed: impl IntoIterator<Item = &'a ParsedIngredient>,
) -> Result<(usize, usize)> {
    let mut added = 0;
    let mut updated = 0;
    for ingredient in parsed {
        match merge_ingredient(db, ingredient)? {
            Merge::Added => added += 1,
            Merge::Updated => updated += 1,
        }
    }
    Ok((added, updated))
}

/// Parse each ingredient line of a recipe and merge it into the shopping list.
///
/// Lines are processed one at a time with no surrounding transaction: the
/// first failing write aborts the rest and rows already written stay.
pub fn add_recipe_to_shopping_list(
    db: &Database,
    recipe_id: &str,
    recipe_name: &str,
    ingredients: &[String],
) -> Result<ShoppingListImport> {
    let parsed: Vec<ParsedIngredient> = ingredients
        .iter()
        .filter(|line| !line.trim().is_empty())
        .map(|line| parse_ingredient(line))
        .collect();
    debug!(recipe_id, lines = parsed.len(), "merging recipe ingredients");

    let (added_count, updated_count) = merge_all(db, &parsed)?;
    info!(
        recipe_id,
        added_count, updated_count, "recipe added to shopping list"
    );

    Ok(ShoppingListImport {
        added_count,
        updated_count,
        message: format!(
            "Added {added_count} new and updated {updated_count} existing items from {recipe_name}"
        ),
    })
}

/// Put one unit of every low or out-of-stock inventory item on the list.
pub fn restock_from_inventory(
    db: &Database,
    inventory: &[InventoryItem],
) -> Result<ShoppingListImport> {
    let parsed: Vec<ParsedIngredient> = inventory
        .iter()
        .filter(|item| item.is_low_stock() || item.is_out_of_stock())
        .map(|item| ParsedIngredient {
            quantity: 1.0,
            unit: item.unit.clone(),
            name: item.name.clone(),
            category: item.category.clone(),
        })
        .collect();

    let (added_count, updated_count) = merge_all(db, &parsed)?;
    info!(added_count, updated_count, "restocked shopping list");

    Ok(ShoppingListImport {
        added_count,
        updated_count,
        message: format!(
            "Added {added_count} new and updated {updated_count} existing items from low stock"
        ),
    })
}
