//! Free-text ingredient line parsing ("2 cups flour" -> quantity, unit, name, category).

use once_cell::sync::Lazy;
use regex::Regex;
use serde::Serialize;

pub const DEFAULT_UNIT: &str = "whole";
pub const OTHER_CATEGORY: &str = "Other";

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ParsedIngredient {
    pub quantity: f64,
    pub unit: String,
    pub name: String,
    pub category: String,
}

static LEADING_NUMBER: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^(\d+(?:\.\d+)?)\s*").expect("valid regex"));

// Tried in order; the first token that matches at a word boundary wins.
const UNITS: &[&str] = &[
    "cups",
    "cup",
    "tablespoons",
    "tablespoon",
    "tbsp",
    "teaspoons",
    "teaspoon",
    "tsp",
    "pounds",
    "pound",
    "lbs",
    "lb",
    "ounces",
    "ounce",
    "oz",
    "kilograms",
    "kilogram",
    "kg",
    "grams",
    "gram",
    "g",
    "milliliters",
    "milliliter",
    "mL",
    "liters",
    "liter",
    "L",
    "pieces",
    "piece",
    "cloves",
    "clove",
    "cans",
    "can",
    "slices",
    "slice",
    "pinches",
    "pinch",
    "dashes",
    "dash",
    "bunches",
    "bunch",
    "packages",
    "package",
];

static UNIT_PATTERNS: Lazy<Vec<(&'static str, Regex)>> = Lazy::new(|| {
    UNITS
        .iter()
        .map(|unit| {
            let re = Regex::new(&format!(r"(?i)^{}\b\s*", regex::escape(unit)))
                .expect("valid regex");
            (*unit, re)
        })
        .collect()
});

static CATEGORY_PATTERNS: Lazy<Vec<(&'static str, Regex)>> = Lazy::new(|| {
    [
        (
            "Meat & Seafood",
            r"chicken|beef|pork|lamb|turkey|bacon|sausage|ham|steak|mince|fish|salmon|tuna|cod|shrimp|prawn|crab|lobster|scallop|anchov(?:y|ies)",
        ),
        (
            "Dairy & Eggs",
            r"milk|buttermilk|cheese|butter|cream|yogh?urt|eggs?|parmesan|mozzarella|cheddar|feta|ricotta",
        ),
        (
            "Vegetables",
            r"onion|garlic|tomato(?:es)?|potato(?:es)?|carrot|celery|lettuce|spinach|broccoli|cabbage|cucumber|zucchini|mushroom|bell peppers?|peppers|kale|peas?|beans?|corn|eggplant|leek|shallot|ginger|cauliflower|squash",
        ),
        (
            "Fruits",
            r"apple|banana|orange|lemon|lime|berry|berries|strawberr(?:y|ies)|blueberr(?:y|ies)|grape|mango|pineapple|peach(?:es)?|pear|cherr(?:y|ies)|avocado|coconut|raisin",
        ),
        (
            "Grains & Bakery",
            r"flour|bread|rice|pasta|spaghetti|noodle|oats?|quinoa|barley|tortilla|bun|roll|cracker|couscous|breadcrumbs?|cornstarch",
        ),
        (
            "Condiments & Spices",
            r"salt|pepper|sugar|oil|vinegar|sauce|ketchup|mustard|mayo(?:nnaise)?|honey|spice|cumin|paprika|cinnamon|oregano|basil|thyme|parsley|cilantro|rosemary|chili|syrup|vanilla|stock|broth",
        ),
    ]
    .into_iter()
    .map(|(category, words)| {
        let re = Regex::new(&format!(r"(?i)\b(?:{words})s?\b")).expect("valid regex");
        (category, re)
    })
    .collect()
});

/// Parse one ingredient line.
///
/// Without a leading number the quantity is 1, the unit is `"whole"` and the
/// entire trimmed line is the name.
pub fn parse_ingredient(line: &str) -> ParsedIngredient {
    let trimmed = line.trim();

    // A number glued to '/' or '.' ("1/2", "1.5.2") is not a quantity.
    let caps = LEADING_NUMBER.captures(trimmed).filter(|caps| {
        trimmed[caps[1].len()..]
            .chars()
            .next()
            .is_none_or(|c| c.is_whitespace() || c.is_alphabetic())
    });
    let Some(caps) = caps else {
        return ParsedIngredient {
            quantity: 1.0,
            unit: DEFAULT_UNIT.to_string(),
            name: trimmed.to_string(),
            category: guess_category(trimmed).to_string(),
        };
    };

    let quantity = caps[1].parse::<f64>().unwrap_or(1.0);
    let rest = &trimmed[caps[0].len()..];

    let (unit, name) = match UNIT_PATTERNS
        .iter()
        .find_map(|(unit, re)| re.find(rest).map(|m| (*unit, rest[m.end()..].trim())))
    {
        Some((unit, name)) => (unit.to_string(), name),
        None => (DEFAULT_UNIT.to_string(), rest.trim()),
    };

    // "3 cups" has no name after the unit; keep the line itself.
    let name = if name.is_empty() { trimmed } else { name };

    ParsedIngredient {
        quantity,
        unit,
        name: name.to_string(),
        category: guess_category(name).to_string(),
    }
}

/// Keyword-based category guess. Groups are tested in a fixed order and the
/// first hit wins.
pub fn guess_category(name: &str) -> &'static str {
    CATEGORY_PATTERNS
        .iter()
        .find(|(_, re)| re.is_match(name))
        .map_or(OTHER_CATEGORY, |(category, _)| category)
}
