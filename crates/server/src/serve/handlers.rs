//! Core HTTP route handlers: health and catalog CRUD.

use std::sync::Arc;

use axum::extract::{Path, State};
use axum::http::StatusCode;
use axum::response::IntoResponse;
use axum::Json;

use snapcart_catalog::{CatalogError, NewProduct, ProductPatch};

use super::json_error;
use super::state::AppState;

/// Fallback handler for unmatched routes.
pub(crate) async fn handle_not_found() -> impl IntoResponse {
    json_error(StatusCode::NOT_FOUND, "not found")
}

/// GET /health
pub(crate) async fn handle_health() -> impl IntoResponse {
    let response = serde_json::json!({
        "status": "ok",
        "version": env!("CARGO_PKG_VERSION"),
    });
    (StatusCode::OK, Json(response))
}

/// Map a catalog error to an HTTP response.
fn catalog_error(e: CatalogError) -> axum::response::Response {
    match e {
        CatalogError::NotFound { id } => {
            json_error(StatusCode::NOT_FOUND, &format!("product {} not found", id))
                .into_response()
        }
        CatalogError::Backend(msg) => {
            json_error(StatusCode::INTERNAL_SERVER_ERROR, &msg).into_response()
        }
    }
}

/// GET /products
pub(crate) async fn handle_list_products(State(state): State<Arc<AppState>>) -> impl IntoResponse {
    match state.catalog.list_all().await {
        Ok(products) => {
            let response = serde_json::json!({
                "count": products.len(),
                "products": products,
            });
            (StatusCode::OK, Json(response)).into_response()
        }
        Err(e) => catalog_error(e),
    }
}

/// POST /products
pub(crate) async fn handle_create_product(
    State(state): State<Arc<AppState>>,
    Json(new): Json<NewProduct>,
) -> impl IntoResponse {
    if new.name.trim().is_empty() {
        return json_error(StatusCode::BAD_REQUEST, "product name must not be empty")
            .into_response();
    }
    match state.catalog.create(new).await {
        Ok(product) => (StatusCode::CREATED, Json(product)).into_response(),
        Err(e) => catalog_error(e),
    }
}

/// GET /products/{id}
pub(crate) async fn handle_get_product(
    State(state): State<Arc<AppState>>,
    Path(id): Path<i64>,
) -> impl IntoResponse {
    match state.catalog.get(id).await {
        Ok(product) => (StatusCode::OK, Json(product)).into_response(),
        Err(e) => catalog_error(e),
    }
}

/// PUT /products/{id}
pub(crate) async fn handle_update_product(
    State(state): State<Arc<AppState>>,
    Path(id): Path<i64>,
    Json(patch): Json<ProductPatch>,
) -> impl IntoResponse {
    if let Some(name) = &patch.name {
        if name.trim().is_empty() {
            return json_error(StatusCode::BAD_REQUEST, "product name must not be empty")
                .into_response();
        }
    }
    match state.catalog.update(id, patch).await {
        Ok(product) => (StatusCode::OK, Json(product)).into_response(),
        Err(e) => catalog_error(e),
    }
}

/// DELETE /products/{id}
pub(crate) async fn handle_delete_product(
    State(state): State<Arc<AppState>>,
    Path(id): Path<i64>,
) -> impl IntoResponse {
    match state.catalog.delete(id).await {
        Ok(()) => (StatusCode::OK, Json(serde_json::json!({"deleted": id}))).into_response(),
        Err(e) => catalog_error(e),
    }
}
