use std::sync::{Arc, Mutex, MutexGuard};

use anyhow::Context;
use axum::{
    Json, Router,
    extract::{Path, Query, Request, State},
    http::{HeaderValue, StatusCode},
    middleware::{self, Next},
    response::{IntoResponse, Response},
    routing::{get, post, put},
};
use chrono::Local;
use serde::{Deserialize, Serialize};
use tower_http::limit::RequestBodyLimitLayer;
use tower_http::trace::TraceLayer;
use tracing::{error, info, warn};

use crate::gemini::GeminiClient;
use pantry_core::filters::{InventoryQuery, RecipeQuery};
use pantry_core::models::{
    HomeSummary, InventoryItem, NewInventoryItem, NewRecipe, NewShoppingListItem, Recipe,
    ShoppingListImport, ShoppingListItem, ShoppingListView, UpdateShoppingListItem,
    UserPreferences, ValidationError,
};
use pantry_core::recipe_ai::{AiError, GenerationOptions};
use pantry_core::service::{self, PantryService};

const BODY_LIMIT: usize = 2 * 1024 * 1024; // 2 MB, enough for pasted recipe pages

#[derive(Clone)]
struct AppState {
    service: Arc<Mutex<PantryService>>,
    gemini: Option<Arc<GeminiClient>>,
}

impl AppState {
    fn service(&self) -> MutexGuard<'_, PantryService> {
        self.service
            .lock()
            .unwrap_or_else(std::sync::PoisonError::into_inner)
    }

    fn gemini(&self) -> Result<&GeminiClient, ApiError> {
        self.gemini.as_deref().ok_or_else(|| {
            ApiError::Unavailable(
                "AI features are disabled. Set GEMINI_API_KEY to enable them.".to_string(),
            )
        })
    }
}

// --- Request / Response types ---

#[derive(Deserialize)]
struct InventoryListParams {
    filter: Option<String>,
    search: Option<String>,
    sort_by: Option<String>,
    direction: Option<String>,
}

impl InventoryListParams {
    fn into_query(self) -> Result<InventoryQuery, ApiError> {
        Ok(InventoryQuery {
            filter: parse_param(self.filter.as_deref())?,
            search: self.search.filter(|s| !s.trim().is_empty()),
            sort_by: parse_param(self.sort_by.as_deref())?,
            direction: parse_param(self.direction.as_deref())?,
        })
    }
}

#[derive(Deserialize)]
struct RecipeListParams {
    filter: Option<String>,
    search: Option<String>,
    sort: Option<String>,
}

impl RecipeListParams {
    fn into_query(self) -> Result<RecipeQuery, ApiError> {
        Ok(RecipeQuery {
            filter: parse_param(self.filter.as_deref())?,
            search: self.search.filter(|s| !s.trim().is_empty()),
            sort: parse_param(self.sort.as_deref())?,
        })
    }
}

fn parse_param<T>(value: Option<&str>) -> Result<T, ApiError>
where
    T: std::str::FromStr<Err = anyhow::Error> + Default,
{
    value
        .filter(|v| !v.is_empty())
        .map_or_else(|| Ok(T::default()), str::parse)
        .map_err(|e| ApiError::BadRequest(format!("{e}")))
}

#[derive(Deserialize)]
struct BulkDeleteRequest {
    ids: Vec<String>,
}

#[derive(Serialize)]
struct DeletedResponse {
    deleted: usize,
}

#[derive(Deserialize)]
struct ExtractRequest {
    url: String,
    content: Option<String>,
}

#[derive(Serialize)]
struct ErrorResponse {
    error: String,
}

// --- Error handling ---

enum ApiError {
    NotFound(String),
    BadRequest(String),
    Unavailable(String),
    BadGateway(String),
    Internal(anyhow::Error),
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let (status, message) = match self {
            Self::NotFound(msg) => (StatusCode::NOT_FOUND, msg),
            Self::BadRequest(msg) => (StatusCode::BAD_REQUEST, msg),
            Self::Unavailable(msg) => (StatusCode::SERVICE_UNAVAILABLE, msg),
            Self::BadGateway(msg) => {
                warn!(error = %msg, "AI provider error");
                (StatusCode::BAD_GATEWAY, msg)
            }
            Self::Internal(err) => {
                error!("Internal server error: {err:#}");
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    "Internal server error".to_string(),
                )
            }
        };
        (status, Json(ErrorResponse { error: message })).into_response()
    }
}

impl From<AiError> for ApiError {
    fn from(err: AiError) -> Self {
        match err {
            AiError::EmptyInventory => Self::BadRequest(err.to_string()),
            AiError::EmptyResponse | AiError::InvalidFormat(_) | AiError::Provider(_) => {
                Self::BadGateway(err.to_string())
            }
        }
    }
}

impl From<anyhow::Error> for ApiError {
    fn from(err: anyhow::Error) -> Self {
        if let Some(invalid) = err.downcast_ref::<ValidationError>() {
            return Self::BadRequest(invalid.to_string());
        }
        match err.downcast::<AiError>() {
            Ok(ai) => ai.into(),
            Err(err) => Self::Internal(err),
        }
    }
}

// --- Middleware ---

async fn security_headers(request: Request, next: Next) -> Response {
    let mut response = next.run(request).await;
    let headers = response.headers_mut();
    headers.insert(
        "x-content-type-options",
        HeaderValue::from_static("nosniff"),
    );
    headers.insert("x-frame-options", HeaderValue::from_static("DENY"));
    headers.insert(
        "content-security-policy",
        HeaderValue::from_static("default-src 'none'"),
    );
    response
}

// --- Handlers: dashboard ---

async fn get_home(State(state): State<AppState>) -> Result<Json<HomeSummary>, ApiError> {
    let today = Local::now().date_naive();
    let summary = state
        .service()
        .home_summary(today)
        .context("database error")?;
    Ok(Json(summary))
}

// --- Handlers: inventory ---

async fn list_inventory(
    State(state): State<AppState>,
    Query(params): Query<InventoryListParams>,
) -> Result<Json<Vec<InventoryItem>>, ApiError> {
    let query = params.into_query()?;
    let today = Local::now().date_naive();
    let items = state
        .service()
        .list_inventory(&query, today)
        .context("database error")?;
    Ok(Json(items))
}

async fn create_inventory_item(
    State(state): State<AppState>,
    Json(req): Json<NewInventoryItem>,
) -> Result<(StatusCode, Json<InventoryItem>), ApiError> {
    let item = state
        .service()
        .add_inventory_item(&req)
        .context("failed to insert inventory item")?;
    Ok((StatusCode::CREATED, Json(item)))
}

async fn get_inventory_item(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<Json<InventoryItem>, ApiError> {
    let item = state
        .service()
        .find_inventory_item(&id)
        .context("database error")?;
    item.map(Json)
        .ok_or_else(|| ApiError::NotFound(format!("Inventory item {id} not found")))
}

async fn update_inventory_item(
    State(state): State<AppState>,
    Path(id): Path<String>,
    Json(req): Json<NewInventoryItem>,
) -> Result<Json<InventoryItem>, ApiError> {
    let svc = state.service();
    if svc
        .find_inventory_item(&id)
        .context("database error")?
        .is_none()
    {
        return Err(ApiError::NotFound(format!("Inventory item {id} not found")));
    }
    let item = svc
        .update_inventory_item(&id, &req)
        .context("failed to update inventory item")?;
    Ok(Json(item))
}

async fn delete_inventory_item(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<StatusCode, ApiError> {
    let deleted = state
        .service()
        .delete_inventory_item(&id)
        .context("database error")?;
    if deleted {
        Ok(StatusCode::NO_CONTENT)
    } else {
        Err(ApiError::NotFound(format!("Inventory item {id} not found")))
    }
}

async fn bulk_delete_inventory(
    State(state): State<AppState>,
    Json(req): Json<BulkDeleteRequest>,
) -> Result<Json<DeletedResponse>, ApiError> {
    if req.ids.is_empty() {
        return Err(ApiError::BadRequest("ids must not be empty".to_string()));
    }
    let deleted = state
        .service()
        .delete_inventory_items(&req.ids)
        .context("database error")?;
    Ok(Json(DeletedResponse { deleted }))
}

// --- Handlers: recipes ---

async fn list_recipes(
    State(state): State<AppState>,
    Query(params): Query<RecipeListParams>,
) -> Result<Json<Vec<Recipe>>, ApiError> {
    let query = params.into_query()?;
    let recipes = state
        .service()
        .list_recipes(&query)
        .context("database error")?;
    Ok(Json(recipes))
}

async fn create_recipe(
    State(state): State<AppState>,
    Json(req): Json<NewRecipe>,
) -> Result<(StatusCode, Json<Recipe>), ApiError> {
    let recipe = state
        .service()
        .create_recipe(&req)
        .context("failed to insert recipe")?;
    Ok((StatusCode::CREATED, Json(recipe)))
}

async fn get_recipe(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<Json<Recipe>, ApiError> {
    let recipe = state.service().find_recipe(&id).context("database error")?;
    recipe
        .map(Json)
        .ok_or_else(|| ApiError::NotFound("Recipe not found".to_string()))
}

async fn update_recipe(
    State(state): State<AppState>,
    Path(id): Path<String>,
    Json(req): Json<NewRecipe>,
) -> Result<Json<Recipe>, ApiError> {
    let svc = state.service();
    if svc.find_recipe(&id).context("database error")?.is_none() {
        return Err(ApiError::NotFound("Recipe not found".to_string()));
    }
    let recipe = svc
        .update_recipe(&id, &req)
        .context("failed to update recipe")?;
    Ok(Json(recipe))
}

async fn delete_recipe(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<StatusCode, ApiError> {
    let deleted = state
        .service()
        .delete_recipe(&id)
        .context("database error")?;
    if deleted {
        Ok(StatusCode::NO_CONTENT)
    } else {
        Err(ApiError::NotFound("Recipe not found".to_string()))
    }
}

async fn toggle_recipe_saved(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<Json<Recipe>, ApiError> {
    let svc = state.service();
    if svc.find_recipe(&id).context("database error")?.is_none() {
        return Err(ApiError::NotFound("Recipe not found".to_string()));
    }
    let recipe = svc
        .toggle_recipe_saved(&id)
        .context("failed to toggle saved flag")?;
    Ok(Json(recipe))
}

async fn add_recipe_to_shopping_list(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<Json<ShoppingListImport>, ApiError> {
    let svc = state.service();
    if svc.find_recipe(&id).context("database error")?.is_none() {
        return Err(ApiError::NotFound("Recipe not found".to_string()));
    }
    let report = svc
        .add_recipe_to_shopping_list(&id)
        .context("failed to add recipe to shopping list")?;
    info!(
        recipe_id = %id,
        added = report.added_count,
        updated = report.updated_count,
        "added recipe to shopping list"
    );
    Ok(Json(report))
}

async fn generate_recipe(
    State(state): State<AppState>,
    Json(options): Json<GenerationOptions>,
) -> Result<(StatusCode, Json<Recipe>), ApiError> {
    let gemini = state.gemini()?;
    let recipe = service::generate_recipe(&state.service, gemini, &options).await?;
    Ok((StatusCode::CREATED, Json(recipe)))
}

async fn extract_recipe(
    State(state): State<AppState>,
    Json(req): Json<ExtractRequest>,
) -> Result<(StatusCode, Json<Recipe>), ApiError> {
    let url = req.url.trim();
    if url.is_empty() {
        return Err(ApiError::BadRequest("url must not be empty".to_string()));
    }
    let gemini = state.gemini()?;
    let recipe =
        service::extract_recipe(&state.service, gemini, url, req.content.as_deref()).await?;
    Ok((StatusCode::CREATED, Json(recipe)))
}

// --- Handlers: shopping list ---

async fn get_shopping_list(
    State(state): State<AppState>,
) -> Result<Json<ShoppingListView>, ApiError> {
    let view = state.service().shopping_list().context("database error")?;
    Ok(Json(view))
}

async fn add_shopping_item(
    State(state): State<AppState>,
    Json(req): Json<NewShoppingListItem>,
) -> Result<(StatusCode, Json<ShoppingListItem>), ApiError> {
    let item = state
        .service()
        .add_shopping_item(&req)
        .context("failed to insert shopping list item")?;
    Ok((StatusCode::CREATED, Json(item)))
}

async fn update_shopping_item(
    State(state): State<AppState>,
    Path(id): Path<String>,
    Json(req): Json<UpdateShoppingListItem>,
) -> Result<Json<ShoppingListItem>, ApiError> {
    let svc = state.service();
    if svc
        .find_shopping_item(&id)
        .context("database error")?
        .is_none()
    {
        return Err(ApiError::NotFound(format!("Shopping list item {id} not found")));
    }
    let item = svc
        .update_shopping_item(&id, &req)
        .context("failed to update shopping list item")?;
    Ok(Json(item))
}

async fn toggle_shopping_item(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<Json<ShoppingListItem>, ApiError> {
    let svc = state.service();
    if svc
        .find_shopping_item(&id)
        .context("database error")?
        .is_none()
    {
        return Err(ApiError::NotFound(format!("Shopping list item {id} not found")));
    }
    let item = svc
        .toggle_shopping_purchased(&id)
        .context("failed to toggle purchased flag")?;
    Ok(Json(item))
}

async fn delete_shopping_item(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<StatusCode, ApiError> {
    let deleted = state
        .service()
        .delete_shopping_item(&id)
        .context("database error")?;
    if deleted {
        Ok(StatusCode::NO_CONTENT)
    } else {
        Err(ApiError::NotFound(format!("Shopping list item {id} not found")))
    }
}

async fn clear_shopping_list(
    State(state): State<AppState>,
) -> Result<Json<DeletedResponse>, ApiError> {
    let deleted = state
        .service()
        .clear_shopping_list()
        .context("database error")?;
    Ok(Json(DeletedResponse { deleted }))
}

async fn restock_low_stock(
    State(state): State<AppState>,
) -> Result<Json<ShoppingListImport>, ApiError> {
    let report = state
        .service()
        .restock_low_stock()
        .context("failed to restock shopping list")?;
    Ok(Json(report))
}

// --- Handlers: preferences ---

async fn get_preferences(
    State(state): State<AppState>,
) -> Result<Json<UserPreferences>, ApiError> {
    let prefs = state.service().preferences().context("database error")?;
    Ok(Json(prefs))
}

async fn save_preferences(
    State(state): State<AppState>,
    Json(req): Json<UserPreferences>,
) -> Result<Json<UserPreferences>, ApiError> {
    let prefs = state
        .service()
        .save_preferences(&req)
        .context("failed to save preferences")?;
    Ok(Json(prefs))
}

// --- Router ---

fn build_router(state: AppState) -> Router {
    Router::new()
        .route("/api/home", get(get_home))
        .route(
            "/api/inventory",
            get(list_inventory).post(create_inventory_item),
        )
        .route("/api/inventory/bulk-delete", post(bulk_delete_inventory))
        .route(
            "/api/inventory/{id}",
            get(get_inventory_item)
                .put(update_inventory_item)
                .delete(delete_inventory_item),
        )
        .route("/api/recipes", get(list_recipes).post(create_recipe))
        .route("/api/recipes/generate", post(generate_recipe))
        .route("/api/recipes/extract", post(extract_recipe))
        .route(
            "/api/recipes/{id}",
            get(get_recipe).put(update_recipe).delete(delete_recipe),
        )
        .route("/api/recipes/{id}/save", post(toggle_recipe_saved))
        .route(
            "/api/recipes/{id}/shopping-list",
            post(add_recipe_to_shopping_list),
        )
        .route(
            "/api/shopping-list",
            get(get_shopping_list)
                .post(add_shopping_item)
                .delete(clear_shopping_list),
        )
        .route("/api/shopping-list/restock", post(restock_low_stock))
        .route(
            "/api/shopping-list/{id}",
            put(update_shopping_item).delete(delete_shopping_item),
        )
        .route("/api/shopping-list/{id}/toggle", post(toggle_shopping_item))
        .route("/api/preferences", get(get_preferences).put(save_preferences))
        .layer(RequestBodyLimitLayer::new(BODY_LIMIT))
        .layer(TraceLayer::new_for_http())
        .layer(middleware::from_fn(security_headers))
        .with_state(state)
}

// --- Server startup ---

pub async fn start_server(
    service: PantryService,
    gemini: Option<GeminiClient>,
    port: u16,
    bind: &str,
) -> anyhow::Result<()> {
    match &gemini {
        Some(client) => info!(model = client.model(), "AI recipe features enabled"),
        None => warn!("GEMINI_API_KEY not set; AI recipe generation and extraction are disabled"),
    }

    let state = AppState {
        service: Arc::new(Mutex::new(service)),
        gemini: gemini.map(Arc::new),
    };
    let app = build_router(state);

    let listener = tokio::net::TcpListener::bind(format!("{bind}:{port}"))
        .await
        .with_context(|| format!("failed to bind {bind}:{port}"))?;
    info!("Listening on http://{bind}:{port}");
    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;
    info!("server stopped");
    Ok(())
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        error!("failed to listen for shutdown signal: {e}");
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::body::Body;
    use http_body_util::BodyExt;
    use std::time::Duration;
    use tower::ServiceExt;

    fn test_state(gemini: Option<GeminiClient>) -> AppState {
        AppState {
            service: Arc::new(Mutex::new(PantryService::open_in_memory().unwrap())),
            gemini: gemini.map(Arc::new),
        }
    }

    fn test_app() -> Router {
        build_router(test_state(None))
    }

    async fn body_json(response: Response) -> serde_json::Value {
        let body = response.into_body().collect().await.unwrap().to_bytes();
        serde_json::from_slice(&body).unwrap()
    }

    fn post_json(uri: &str, body: &serde_json::Value) -> axum::http::Request<Body> {
        axum::http::Request::post(uri)
            .header("content-type", "application/json")
            .body(Body::from(body.to_string()))
            .unwrap()
    }

    fn get_request(uri: &str) -> axum::http::Request<Body> {
        axum::http::Request::get(uri).body(Body::empty()).unwrap()
    }

    #[tokio::test]
    async fn security_headers_present() {
        let response = test_app().oneshot(get_request("/api/home")).await.unwrap();

        assert_eq!(response.status(), StatusCode::OK);
        assert_eq!(
            response.headers().get("x-content-type-options").unwrap(),
            "nosniff"
        );
        assert_eq!(response.headers().get("x-frame-options").unwrap(), "DENY");
        assert_eq!(
            response.headers().get("content-security-policy").unwrap(),
            "default-src 'none'"
        );
    }

    #[tokio::test]
    async fn body_size_limit_rejects_oversized() {
        let big_body = vec![0u8; BODY_LIMIT + 1];
        let response = test_app()
            .oneshot(
                axum::http::Request::post("/api/recipes")
                    .header("content-type", "application/json")
                    .body(Body::from(big_body))
                    .unwrap(),
            )
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::PAYLOAD_TOO_LARGE);
    }

    #[tokio::test]
    async fn internal_error_does_not_leak_details() {
        let error = ApiError::Internal(anyhow::anyhow!("no such table: recipes at /srv/pantry.db"));
        let response = error.into_response();
        assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);

        let json = body_json(response).await;
        assert_eq!(json["error"], "Internal server error");
    }

    #[tokio::test]
    async fn ai_errors_map_to_status_codes() {
        let response = ApiError::from(anyhow::Error::from(AiError::EmptyInventory)).into_response();
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);

        let malformed = serde_json::from_str::<serde_json::Value>("nope").unwrap_err();
        let response = ApiError::from(anyhow::Error::from(AiError::InvalidFormat(malformed)))
            .into_response();
        assert_eq!(response.status(), StatusCode::BAD_GATEWAY);
        let json = body_json(response).await;
        assert_eq!(json["error"], "Invalid recipe format from AI. Please try again.");
    }

    #[tokio::test]
    async fn get_missing_recipe_returns_404() {
        let response = test_app()
            .oneshot(get_request("/api/recipes/does-not-exist"))
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::NOT_FOUND);
        let json = body_json(response).await;
        assert_eq!(json["error"], "Recipe not found");
    }

    #[tokio::test]
    async fn create_and_fetch_recipe() {
        let app = test_app();

        let response = app
            .clone()
            .oneshot(post_json(
                "/api/recipes",
                &serde_json::json!({
                    "name": "Pancakes",
                    "category": "Breakfast",
                    "ingredients": ["2 cups flour", "2 eggs"],
                    "instructions": ["Mix", "Fry"],
                    "prep_time": 10,
                    "cook_time": 15
                }),
            ))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::CREATED);
        let created = body_json(response).await;
        assert_eq!(created["servings"], 4);
        assert_eq!(created["source"], "Manual");
        assert_eq!(created["is_saved"], false);

        let id = created["id"].as_str().unwrap();
        let response = app
            .clone()
            .oneshot(get_request(&format!("/api/recipes/{id}")))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);
        let fetched = body_json(response).await;
        assert_eq!(fetched["ingredients"][1], "2 eggs");

        let response = app
            .oneshot(post_json(&format!("/api/recipes/{id}/save"), &serde_json::json!({})))
            .await
            .unwrap();
        assert_eq!(body_json(response).await["is_saved"], true);
    }

    #[tokio::test]
    async fn create_recipe_without_name_returns_400() {
        let response = test_app()
            .oneshot(post_json(
                "/api/recipes",
                &serde_json::json!({ "name": "  ", "category": "Dinner" }),
            ))
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
        assert_eq!(body_json(response).await["error"], "Recipe name must not be empty");
    }

    #[tokio::test]
    async fn invalid_shopping_item_returns_400() {
        let response = test_app()
            .oneshot(post_json(
                "/api/shopping-list",
                &serde_json::json!({
                    "name": "Milk",
                    "quantity": -1.0,
                    "unit": "L",
                    "category": "Dairy & Eggs"
                }),
            ))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
        assert_eq!(
            body_json(response).await["error"],
            "quantity must be a non-negative number"
        );
    }

    #[tokio::test]
    async fn validation_error_behind_context_is_bad_request() {
        let err = anyhow::Error::from(ValidationError("unit must not be empty".to_string()))
            .context("failed to insert inventory item");
        let response = ApiError::from(err).into_response();
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
        assert_eq!(body_json(response).await["error"], "unit must not be empty");
    }

    #[tokio::test]
    async fn recipe_ingredients_merge_into_shopping_list() {
        let app = test_app();
        let response = app
            .clone()
            .oneshot(post_json(
                "/api/recipes",
                &serde_json::json!({
                    "name": "Tomato Soup",
                    "category": "Lunch",
                    "ingredients": ["2 tomatoes", "1 onion"]
                }),
            ))
            .await
            .unwrap();
        let id = body_json(response).await["id"].as_str().unwrap().to_string();
        let uri = format!("/api/recipes/{id}/shopping-list");

        let first = body_json(
            app.clone()
                .oneshot(post_json(&uri, &serde_json::json!({})))
                .await
                .unwrap(),
        )
        .await;
        assert_eq!(first["added_count"], 2);
        assert_eq!(first["updated_count"], 0);
        assert_eq!(
            first["message"],
            "Added 2 new and updated 0 existing items from Tomato Soup"
        );

        let second = body_json(
            app.clone()
                .oneshot(post_json(&uri, &serde_json::json!({})))
                .await
                .unwrap(),
        )
        .await;
        assert_eq!(second["added_count"], 0);
        assert_eq!(second["updated_count"], 2);

        let list = body_json(app.oneshot(get_request("/api/shopping-list")).await.unwrap()).await;
        let items = list["items"].as_array().unwrap();
        assert_eq!(items.len(), 2);
        let tomatoes = items.iter().find(|i| i["name"] == "tomatoes").unwrap();
        assert_eq!(tomatoes["quantity"], 4.0);
        assert_eq!(list["progress"]["total"], 2);
    }

    #[tokio::test]
    async fn shopping_list_for_missing_recipe_returns_404() {
        let response = test_app()
            .oneshot(post_json(
                "/api/recipes/missing/shopping-list",
                &serde_json::json!({}),
            ))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::NOT_FOUND);
    }

    #[tokio::test]
    async fn inventory_filter_and_bulk_delete() {
        let app = test_app();
        let mut ids = Vec::new();
        for (name, quantity) in [("Milk", 0), ("Eggs", 3), ("Rice", 40)] {
            let response = app
                .clone()
                .oneshot(post_json(
                    "/api/inventory",
                    &serde_json::json!({
                        "name": name,
                        "quantity": quantity,
                        "unit": "whole",
                        "category": "Other",
                        "expiry_date": "2099-01-01"
                    }),
                ))
                .await
                .unwrap();
            assert_eq!(response.status(), StatusCode::CREATED);
            ids.push(body_json(response).await["id"].as_str().unwrap().to_string());
        }

        let low = body_json(
            app.clone()
                .oneshot(get_request("/api/inventory?filter=lowstock"))
                .await
                .unwrap(),
        )
        .await;
        assert_eq!(low.as_array().unwrap().len(), 1);
        assert_eq!(low[0]["name"], "Eggs");

        let sorted = body_json(
            app.clone()
                .oneshot(get_request("/api/inventory?sort_by=quantity&direction=desc"))
                .await
                .unwrap(),
        )
        .await;
        assert_eq!(sorted[0]["name"], "Rice");

        let response = app
            .clone()
            .oneshot(post_json(
                "/api/inventory/bulk-delete",
                &serde_json::json!({ "ids": [ids[0], ids[1], "unknown"] }),
            ))
            .await
            .unwrap();
        assert_eq!(body_json(response).await["deleted"], 2);

        let remaining = body_json(app.oneshot(get_request("/api/inventory")).await.unwrap()).await;
        assert_eq!(remaining.as_array().unwrap().len(), 1);
    }

    #[tokio::test]
    async fn invalid_filter_returns_400() {
        let response = test_app()
            .oneshot(get_request("/api/inventory?filter=stale"))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);

        let response = test_app()
            .oneshot(get_request("/api/recipes?sort=spiciest"))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    }

    #[tokio::test]
    async fn delete_missing_shopping_item_returns_404() {
        let response = test_app()
            .oneshot(
                axum::http::Request::delete("/api/shopping-list/nope")
                    .body(Body::empty())
                    .unwrap(),
            )
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::NOT_FOUND);
    }

    #[tokio::test]
    async fn preferences_default_then_update() {
        let app = test_app();
        let prefs = body_json(app.clone().oneshot(get_request("/api/preferences")).await.unwrap()).await;
        assert_eq!(prefs["shopping_day"], "Sunday");
        assert_eq!(prefs["servings_default"], 4);

        let response = app
            .clone()
            .oneshot(
                axum::http::Request::put("/api/preferences")
                    .header("content-type", "application/json")
                    .body(Body::from(
                        serde_json::json!({ "shopping_day": "Friday", "allergies": ["shellfish"] })
                            .to_string(),
                    ))
                    .unwrap(),
            )
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);
        let saved = body_json(response).await;
        assert_eq!(saved["shopping_day"], "Friday");
        assert_eq!(saved["user_id"], "default-user");

        let response = app
            .oneshot(
                axum::http::Request::put("/api/preferences")
                    .header("content-type", "application/json")
                    .body(Body::from(
                        serde_json::json!({ "shopping_day": "Someday" }).to_string(),
                    ))
                    .unwrap(),
            )
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    }

    #[tokio::test]
    async fn generate_without_api_key_returns_503() {
        let response = test_app()
            .oneshot(post_json("/api/recipes/generate", &serde_json::json!({})))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::SERVICE_UNAVAILABLE);
    }

    #[tokio::test]
    async fn generate_with_empty_inventory_returns_400() {
        let gemini = GeminiClient::new("unused", "test-model", Duration::from_secs(1)).unwrap();
        let app = build_router(test_state(Some(gemini)));

        let response = app
            .oneshot(post_json("/api/recipes/generate", &serde_json::json!({})))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
        assert_eq!(
            body_json(response).await["error"],
            "No inventory items available. Please add items to your inventory first."
        );
    }

    #[tokio::test]
    async fn extract_requires_url() {
        let response = test_app()
            .oneshot(post_json(
                "/api/recipes/extract",
                &serde_json::json!({ "url": " " }),
            ))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    }
}
