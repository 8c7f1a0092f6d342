//! Checkout route handlers: create, gateway callback, status poll.

use std::sync::Arc;

use axum::extract::{Path, Query, State};
use axum::http::StatusCode;
use axum::response::{Html, IntoResponse};
use axum::Json;
use rust_decimal::Decimal;
use serde::Deserialize;

use snapcart_checkout::{CartItem, CheckoutError, OrderStatus};
use snapcart_gateway::GatewayError;

use super::json_error;
use super::state::AppState;

#[derive(Deserialize)]
pub(crate) struct CheckoutRequest {
    items: Vec<CartItem>,
    /// Optional client-side total; the server always recomputes from the
    /// line items and uses its own sum.
    #[allow(dead_code)]
    total: Option<Decimal>,
}

/// Query parameters of the gateway redirect. The gateway appends its own
/// uppercase parameters to our redirect URL.
#[derive(Deserialize)]
pub(crate) struct CallbackParams {
    our_order_id: Option<String>,
    #[serde(rename = "STATUS")]
    status: Option<String>,
}

/// Map a checkout error to an HTTP response.
fn checkout_error(e: CheckoutError) -> axum::response::Response {
    match e {
        CheckoutError::OrderNotFound { order_id } => json_error(
            StatusCode::NOT_FOUND,
            &format!("order '{}' not found", order_id),
        )
        .into_response(),
        CheckoutError::Gateway(GatewayError::InvalidAmount(msg)) => {
            json_error(StatusCode::BAD_REQUEST, &msg).into_response()
        }
        CheckoutError::Gateway(e) => {
            json_error(StatusCode::BAD_GATEWAY, &format!("payment gateway: {}", e))
                .into_response()
        }
        CheckoutError::DuplicateOrder { .. } | CheckoutError::InvalidResolution { .. } => {
            json_error(StatusCode::INTERNAL_SERVER_ERROR, &e.to_string()).into_response()
        }
    }
}

/// POST /checkout/create
pub(crate) async fn handle_checkout_create(
    State(state): State<Arc<AppState>>,
    Json(request): Json<CheckoutRequest>,
) -> impl IntoResponse {
    if request.items.is_empty() {
        return json_error(StatusCode::BAD_REQUEST, "cart must not be empty").into_response();
    }

    let total: Decimal = request
        .items
        .iter()
        .map(|item| item.price * Decimal::from(item.quantity))
        .sum();

    match state
        .checkout
        .create(request.items, total, &state.callback_base)
        .await
    {
        Ok(created) => (StatusCode::OK, Json(created)).into_response(),
        Err(e) => checkout_error(e),
    }
}

/// GET /checkout/callback
///
/// The gateway redirects the shopper's browser here after the hosted
/// payment page. The response is HTML, not JSON.
pub(crate) async fn handle_checkout_callback(
    State(state): State<Arc<AppState>>,
    Query(params): Query<CallbackParams>,
) -> impl IntoResponse {
    let order_id = match &params.our_order_id {
        Some(id) if !id.is_empty() => id.clone(),
        _ => {
            return (
                StatusCode::BAD_REQUEST,
                Html(result_page(
                    "Invalid request",
                    "The payment callback is missing the order reference.",
                )),
            )
                .into_response()
        }
    };

    match state
        .checkout
        .handle_callback(&order_id, params.status.as_deref())
        .await
    {
        Ok(view) => {
            let (title, detail) = match view.status {
                OrderStatus::Paid => (
                    "Payment successful",
                    "Thank you for your purchase. You can close this page.",
                ),
                OrderStatus::Failed => (
                    "Payment failed",
                    "The payment was not completed. Please try again.",
                ),
                OrderStatus::Pending => (
                    "Payment processing",
                    "The payment is still being processed. Check the order status shortly.",
                ),
            };
            (StatusCode::OK, Html(result_page(title, detail))).into_response()
        }
        Err(CheckoutError::OrderNotFound { .. }) => (
            StatusCode::NOT_FOUND,
            Html(result_page("Order not found", "This order does not exist.")),
        )
            .into_response(),
        Err(e) => checkout_error(e),
    }
}

/// GET /checkout/status/{order_id}
pub(crate) async fn handle_checkout_status(
    State(state): State<Arc<AppState>>,
    Path(order_id): Path<String>,
) -> impl IntoResponse {
    match state.checkout.poll_status(&order_id).await {
        Ok(view) => (StatusCode::OK, Json(view)).into_response(),
        Err(e) => checkout_error(e),
    }
}

/// Minimal self-contained result page shown after the gateway redirect.
fn result_page(title: &str, detail: &str) -> String {
    format!(
        r#"<!DOCTYPE html>
<html>
<head>
<meta charset="utf-8">
<title>{title}</title>
<style>
  body {{ font-family: sans-serif; text-align: center; margin-top: 4rem; }}
  p {{ color: #555; }}
</style>
</head>
<body>
<h1>{title}</h1>
<p>{detail}</p>
</body>
</html>
"#
    )
}
