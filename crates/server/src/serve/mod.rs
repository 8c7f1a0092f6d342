//! `snapcart serve` -- HTTP JSON API for the cashierless checkout backend.
//!
//! Exposes the catalog, the vision recognition pipeline and the checkout
//! orchestrator as an async HTTP service using `axum` + `tokio`.
//!
//! Security features:
//! - CORS headers on all responses (permissive for local dev)
//! - Per-IP rate limiting (default: 60 req/min, configurable)
//! - Optional API key authentication via SNAPCART_API_KEY env var
//!
//! Endpoints:
//! - GET    /health                      - Server status (exempt from auth)
//! - GET    /products                    - List the catalog
//! - POST   /products                    - Create a product
//! - GET    /products/{id}               - Fetch one product
//! - PUT    /products/{id}               - Patch a product
//! - DELETE /products/{id}               - Delete a product
//! - POST   /recognize                   - Recognize products in a base64 image
//! - POST   /recognize/file              - Recognize products in an uploaded image
//! - POST   /checkout/create             - Create an order and a payment page
//! - GET    /checkout/callback           - Gateway redirect target (HTML, exempt from auth)
//! - GET    /checkout/status/{order_id}  - Poll an order's status
//!
//! All responses use Content-Type: application/json except the callback page.

mod checkout;
mod handlers;
mod middleware;
mod recognize;
mod state;

use std::sync::Arc;

use axum::extract::DefaultBodyLimit;
use axum::http::{Method, StatusCode};
use axum::response::IntoResponse;
use axum::routing::{get, post};
use axum::{middleware as axum_middleware, Json, Router};
use tower_http::cors::{Any, CorsLayer};

use snapcart_catalog::{CatalogStore, MemoryCatalog, TrigramCatalog};
use snapcart_checkout::{Checkout, MemoryOrderStore};
use snapcart_gateway::HppClient;
use snapcart_vision::{AnthropicVision, RecognitionPipeline};

use self::checkout::{handle_checkout_callback, handle_checkout_create, handle_checkout_status};
use self::handlers::{
    handle_create_product, handle_delete_product, handle_get_product, handle_health,
    handle_list_products, handle_not_found, handle_update_product,
};
use self::middleware::{auth_middleware, rate_limit_middleware};
use self::recognize::{handle_recognize, handle_recognize_file};
use self::state::{AppState, RateLimiter};
use crate::config::Config;
use crate::seed;
use crate::CatalogBackend;

/// Maximum request body size: 10 MB (large enough for a phone photo).
const MAX_BODY_SIZE: usize = 10 * 1024 * 1024;

/// Rate limit window duration in seconds (1 minute).
const RATE_LIMIT_WINDOW_SECS: u64 = 60;

/// Construct a JSON error response with the given status code and message.
fn json_error(status: StatusCode, message: &str) -> impl IntoResponse {
    (status, Json(serde_json::json!({"error": message})))
}

/// Start the HTTP server on the given port.
///
/// Security:
/// - CORS: Permissive (`Any` origin) for local dev; tighten for production.
/// - Rate limit: Per-IP, configurable via SNAPCART_RATE_LIMIT (default 60 req/min).
/// - API key: If SNAPCART_API_KEY is set, all endpoints except /health and
///   /checkout/callback require auth.
pub(crate) async fn start_server(
    port: u16,
    backend: CatalogBackend,
    seed_demo: bool,
) -> Result<(), Box<dyn std::error::Error>> {
    let config = Config::from_env();

    let catalog: Arc<dyn CatalogStore> = match backend {
        CatalogBackend::Memory => Arc::new(MemoryCatalog::new()),
        CatalogBackend::Trigram => Arc::new(TrigramCatalog::new()),
    };
    eprintln!("Catalog backend: {:?}", backend);

    if seed_demo {
        let count = seed::seed_demo(catalog.as_ref()).await?;
        eprintln!("Seeded {} demo products", count);
    }

    let vision = match (&config.anthropic_api_key, &config.vision_model) {
        (key, Some(model)) => {
            AnthropicVision::with_model(key.clone().unwrap_or_default(), model.clone())
        }
        (key, None) => AnthropicVision::new(key.clone().unwrap_or_default()),
    };
    let pipeline = RecognitionPipeline::new(vision, catalog.clone());

    eprintln!("Payment gateway: {}", config.gateway.base_url);
    let gateway = HppClient::new(config.gateway.clone());
    let checkout = Checkout::new(gateway, MemoryOrderStore::new());

    let callback_base = config
        .callback_base
        .clone()
        .unwrap_or_else(|| format!("http://localhost:{}/checkout/callback", port));

    if config.api_key.is_some() {
        eprintln!("API key authentication enabled");
    }
    eprintln!("Rate limit: {} requests per minute per IP", config.rate_limit);

    let state = Arc::new(AppState {
        catalog,
        pipeline,
        checkout,
        callback_base,
        rate_limiter: RateLimiter::new(config.rate_limit),
        api_key: config.api_key,
    });

    // CORS: permissive for local dev
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods([Method::GET, Method::POST, Method::PUT, Method::DELETE])
        .allow_headers(Any);

    let app = Router::new()
        .route("/health", get(handle_health))
        .route("/products", get(handle_list_products).post(handle_create_product))
        .route(
            "/products/{id}",
            get(handle_get_product)
                .put(handle_update_product)
                .delete(handle_delete_product),
        )
        .route("/recognize", post(handle_recognize))
        .route("/recognize/file", post(handle_recognize_file))
        .route("/checkout/create", post(handle_checkout_create))
        .route("/checkout/callback", get(handle_checkout_callback))
        .route("/checkout/status/{order_id}", get(handle_checkout_status))
        .fallback(handle_not_found)
        .layer(axum_middleware::from_fn_with_state(
            state.clone(),
            auth_middleware,
        ))
        .layer(axum_middleware::from_fn_with_state(
            state.clone(),
            rate_limit_middleware,
        ))
        .layer(cors)
        .layer(DefaultBodyLimit::max(MAX_BODY_SIZE))
        .with_state(state);

    let addr = format!("0.0.0.0:{}", port);
    let listener = tokio::net::TcpListener::bind(&addr).await?;
    eprintln!("Snapcart backend listening on http://0.0.0.0:{}", port);
    axum::serve(
        listener,
        app.into_make_service_with_connect_info::<std::net::SocketAddr>(),
    )
    .with_graceful_shutdown(shutdown_signal())
    .await?;

    eprintln!("\nServer shut down.");
    Ok(())
}

/// Wait for a shutdown signal (Ctrl+C).
async fn shutdown_signal() {
    tokio::signal::ctrl_c()
        .await
        .expect("failed to install Ctrl+C handler");
    eprintln!("\nReceived shutdown signal...");
}
