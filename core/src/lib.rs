pub mod codec;
pub mod db;
pub mod filters;
pub mod ingredient;
pub mod models;
pub mod mutation;
pub mod recipe_ai;
pub mod service;
pub mod shopping;
