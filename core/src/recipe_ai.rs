//! Prompt construction and response handling for AI recipe generation.
//!
//! The HTTP call itself lives with the caller; this module only turns pantry
//! state into a prompt and a model reply into a [`NewRecipe`].

use std::fmt::Write;

use serde::Deserialize;
use thiserror::Error;

use crate::models::{DEFAULT_RECIPE_CATEGORY, InventoryItem, NewRecipe};

#[derive(Debug, Error)]
pub enum AiError {
    #[error("No inventory items available. Please add items to your inventory first.")]
    EmptyInventory,
    #[error("No response from AI provider")]
    EmptyResponse,
    #[error("Invalid recipe format from AI. Please try again.")]
    InvalidFormat(#[source] serde_json::Error),
    #[error("AI provider request failed: {0}")]
    Provider(String),
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct GenerationOptions {
    pub cuisine: Option<String>,
    pub difficulty: Option<String>,
    pub dietary: Option<String>,
    pub max_prep_time: Option<i64>,
}

/// The shape the model is asked to reply with.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GeneratedRecipe {
    pub name: String,
    #[serde(default)]
    pub description: Option<String>,
    pub prep_time: i64,
    pub cook_time: i64,
    pub servings: i64,
    #[serde(default)]
    pub difficulty: Option<String>,
    #[serde(default)]
    pub cuisine: String,
    #[serde(default)]
    pub category: String,
    pub ingredients: Vec<String>,
    pub instructions: Vec<String>,
    pub calories: i64,
}

impl GeneratedRecipe {
    pub fn into_new_recipe(self, source: &str) -> NewRecipe {
        let category = if self.category.trim().is_empty() {
            DEFAULT_RECIPE_CATEGORY.to_string()
        } else {
            self.category
        };
        NewRecipe {
            name: self.name,
            ingredients: flatten_lines(self.ingredients),
            instructions: flatten_lines(self.instructions),
            prep_time: self.prep_time,
            cook_time: self.cook_time,
            servings: self.servings,
            calories: self.calories,
            category,
            cuisine: self.cuisine,
            source: source.to_string(),
        }
    }
}

// Models occasionally put several steps in one string.
fn flatten_lines(lines: Vec<String>) -> Vec<String> {
    lines
        .iter()
        .flat_map(|line| line.split('\n'))
        .map(str::trim)
        .filter(|line| !line.is_empty())
        .map(str::to_string)
        .collect()
}

const RESPONSE_FORMAT: &str = r#"Respond ONLY with valid JSON in this exact format (no markdown, no code blocks):
{
  "name": "Recipe Name",
  "description": "Brief description",
  "prepTime": 15,
  "cookTime": 30,
  "servings": 4,
  "difficulty": "Medium",
  "cuisine": "Italian",
  "category": "Dinner",
  "ingredients": ["2 cups flour", "1 tsp salt"],
  "instructions": ["Step 1", "Step 2"],
  "calories": 350
}"#;

pub fn inventory_prompt(
    items: &[InventoryItem],
    options: &GenerationOptions,
) -> Result<String, AiError> {
    if items.is_empty() {
        return Err(AiError::EmptyInventory);
    }

    let mut prompt = String::from(
        "You are a professional chef assistant. Generate a delicious recipe using these available ingredients:\n\n",
    );
    for item in items {
        let _ = writeln!(prompt, "- {} {} {}", item.quantity, item.unit, item.name);
    }
    prompt.push('\n');

    if let Some(cuisine) = options.cuisine.as_deref().filter(|s| !s.is_empty()) {
        let _ = writeln!(prompt, "Cuisine preference: {cuisine}");
    }
    if let Some(difficulty) = options.difficulty.as_deref().filter(|s| !s.is_empty()) {
        let _ = writeln!(prompt, "Difficulty level: {difficulty}");
    }
    if let Some(dietary) = options.dietary.as_deref().filter(|s| !s.is_empty()) {
        let _ = writeln!(prompt, "Dietary restriction: {dietary}");
    }
    if let Some(minutes) = options.max_prep_time.filter(|m| *m > 0) {
        let _ = writeln!(prompt, "Maximum prep time: {minutes} minutes");
    }

    prompt.push_str(
        "\nRequirements:
1. Use as many of the available ingredients as possible
2. Be creative but practical
3. Provide clear step-by-step instructions
4. Include prep time, cook time, and servings
5. Estimate calories per serving
6. Specify difficulty level (Easy, Medium, or Hard)
7. Assign an appropriate category (Breakfast, Lunch, Dinner, or Snack)

",
    );
    prompt.push_str(RESPONSE_FORMAT);
    Ok(prompt)
}

/// Prompt for pulling a recipe out of a page. Page text is used when the
/// caller has it, the bare URL otherwise.
pub fn extraction_prompt(url: &str, content: Option<&str>) -> String {
    let (kind, body) = match content.map(str::trim).filter(|c| !c.is_empty()) {
        Some(text) => ("content", text),
        None => ("URL", url),
    };
    format!(
        "Extract the recipe from this {kind}:

{body}

Extract and structure the recipe information:
- Recipe name and description
- Prep time and cook time (in minutes)
- Number of servings
- Difficulty level (Easy, Medium, or Hard)
- Cuisine type
- Category (Breakfast, Lunch, Dinner, or Snack)
- Complete list of ingredients with quantities
- Step-by-step instructions
- Estimated calories per serving

If information is missing, make reasonable estimates based on similar recipes.

{RESPONSE_FORMAT}"
    )
}

/// Remove Markdown code fences around a reply, if it starts with one.
pub fn strip_code_fences(text: &str) -> String {
    let trimmed = text.trim();
    if !trimmed.starts_with("```") {
        return trimmed.to_string();
    }
    trimmed
        .replace("```json\n", "")
        .replace("```json", "")
        .replace("```\n", "")
        .replace("```", "")
        .trim()
        .to_string()
}

pub fn parse_generated_recipe(reply: &str) -> Result<GeneratedRecipe, AiError> {
    if reply.trim().is_empty() {
        return Err(AiError::EmptyResponse);
    }
    serde_json::from_str(&strip_code_fences(reply)).map_err(AiError::InvalidFormat)
}
