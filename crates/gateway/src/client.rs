//! HPP gateway wire client.
//!
//! Uses `ureq` (sync) wrapped in `tokio::task::spawn_blocking` to avoid
//! blocking the async runtime. Both calls are stateless: the merchant
//! credential pair travels in every request body, never in a session.

use std::time::Duration;

use async_trait::async_trait;
use rust_decimal::prelude::ToPrimitive;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use crate::error::GatewayError;
use crate::status::GatewayOrderStatus;

/// Per-call request timeout. A hung gateway surfaces as `Unreachable`,
/// never as an indefinite hang.
const REQUEST_TIMEOUT: Duration = Duration::from_secs(30);

/// In-band error code the gateway uses for an unknown order.
const ERR_ORDER_NOT_FOUND: &str = "order_not_found";

/// Gateway connection settings, read from the environment at startup.
#[derive(Debug, Clone)]
pub struct GatewayConfig {
    /// API base, e.g. `https://sandbox.gateway.example/api/v1`.
    pub base_url: String,
    pub merchant_id: String,
    pub api_password: String,
    /// ISO 4217 currency code for all orders.
    pub currency: String,
}

/// Result of a successful remote order creation.
#[derive(Debug, Clone)]
pub struct CreatedGatewayOrder {
    pub gateway_order_id: String,
    /// Opaque per-order credential. Required for every later status query;
    /// stored server-side and never serialized to clients.
    pub gateway_secret: String,
    /// Ready-to-redirect hosted-payment-page URL. Safe to hand to a browser:
    /// it bears only the single-use order credential pair.
    pub hpp_url: String,
    pub status: GatewayOrderStatus,
}

/// The seam the checkout orchestrator depends on.
#[async_trait]
pub trait PaymentGateway: Send + Sync + 'static {
    /// Create a remote order for `amount` (major currency units) and build
    /// the HPP redirect URL. The gateway redirects the payer to
    /// `redirect_url` once payment concludes.
    async fn create_order(
        &self,
        amount: Decimal,
        description: &str,
        redirect_url: &str,
    ) -> Result<CreatedGatewayOrder, GatewayError>;

    /// Authoritative remote status for a previously created order.
    async fn get_order_status(
        &self,
        gateway_order_id: &str,
        gateway_secret: &str,
    ) -> Result<GatewayOrderStatus, GatewayError>;
}

// ── Wire types ───────────────────────────────────────────────────────────────

#[derive(Serialize)]
struct CreateOrderRequest<'a> {
    merchant: &'a str,
    password: &'a str,
    /// Minor currency units (major × 100).
    amount: i64,
    currency: &'a str,
    description: &'a str,
    back_url: &'a str,
}

#[derive(Serialize)]
struct OrderStatusRequest<'a> {
    merchant: &'a str,
    password: &'a str,
    order_id: &'a str,
    order_password: &'a str,
}

/// One envelope covers both endpoints: a 2xx body is either the payload
/// or an in-band application error. The error form must be distinguished
/// and raised, never read as a status.
#[derive(Deserialize)]
struct ApiEnvelope {
    #[serde(default)]
    order: Option<OrderBody>,
    #[serde(default)]
    status: Option<String>,
    #[serde(default)]
    error_code: Option<String>,
    #[serde(default)]
    error_message: Option<String>,
}

#[derive(Deserialize)]
struct OrderBody {
    id: String,
    password: String,
    /// HPP base URL; the redirect URL adds `id` and `password` parameters.
    hpp_url: String,
    status: String,
}

// ── Conversions ──────────────────────────────────────────────────────────────

/// Convert a major-unit decimal amount to the gateway's integer minor unit.
fn to_minor_units(amount: Decimal) -> Result<i64, GatewayError> {
    let minor = amount
        .checked_mul(Decimal::ONE_HUNDRED)
        .ok_or_else(|| GatewayError::InvalidAmount(amount.to_string()))?;
    if !minor.fract().is_zero() {
        return Err(GatewayError::InvalidAmount(amount.to_string()));
    }
    minor
        .to_i64()
        .ok_or_else(|| GatewayError::InvalidAmount(amount.to_string()))
}

/// Combine the gateway-provided HPP base with the order credential pair.
fn build_hpp_url(hpp_base: &str, order_id: &str, order_password: &str) -> String {
    let sep = if hpp_base.contains('?') { '&' } else { '?' };
    format!(
        "{}{}id={}&password={}",
        hpp_base, sep, order_id, order_password
    )
}

/// Map an in-band application error to a domain error, if present.
fn in_band_error(envelope: &ApiEnvelope, gateway_order_id: Option<&str>) -> Option<GatewayError> {
    let code = envelope.error_code.as_deref()?;
    let message = envelope.error_message.clone().unwrap_or_default();
    if code == ERR_ORDER_NOT_FOUND {
        return Some(GatewayError::OrderNotFound {
            gateway_order_id: gateway_order_id.unwrap_or("?").to_string(),
        });
    }
    Some(GatewayError::Api {
        code: code.to_string(),
        message,
    })
}

fn interpret_create(body: &str) -> Result<CreatedGatewayOrder, GatewayError> {
    let envelope: ApiEnvelope =
        serde_json::from_str(body).map_err(|e| GatewayError::Malformed(e.to_string()))?;
    if let Some(err) = in_band_error(&envelope, None) {
        return Err(err);
    }
    let order = envelope
        .order
        .ok_or_else(|| GatewayError::Malformed("create response missing 'order'".to_string()))?;
    let hpp_url = build_hpp_url(&order.hpp_url, &order.id, &order.password);
    Ok(CreatedGatewayOrder {
        gateway_order_id: order.id,
        gateway_secret: order.password,
        hpp_url,
        status: GatewayOrderStatus::parse(&order.status),
    })
}

fn interpret_status(body: &str, gateway_order_id: &str) -> Result<GatewayOrderStatus, GatewayError> {
    let envelope: ApiEnvelope =
        serde_json::from_str(body).map_err(|e| GatewayError::Malformed(e.to_string()))?;
    if let Some(err) = in_band_error(&envelope, Some(gateway_order_id)) {
        return Err(err);
    }
    let status = envelope
        .status
        .ok_or_else(|| GatewayError::Malformed("status response missing 'status'".to_string()))?;
    Ok(GatewayOrderStatus::parse(&status))
}

// ── Client ───────────────────────────────────────────────────────────────────

/// `ureq`-backed implementation of [`PaymentGateway`].
pub struct HppClient {
    config: GatewayConfig,
}

impl HppClient {
    pub fn new(config: GatewayConfig) -> Self {
        HppClient { config }
    }

    /// POST a JSON body and return the raw response text.
    ///
    /// Runs on the blocking pool. Non-2xx responses become
    /// `GatewayError::Transport` with status and body attached.
    fn post_json<B: Serialize>(url: &str, body: &B) -> Result<String, GatewayError> {
        let agent: ureq::Agent = ureq::Agent::config_builder()
            .timeout_global(Some(REQUEST_TIMEOUT))
            .http_status_as_error(false)
            .build()
            .into();

        let mut response = agent
            .post(url)
            .send_json(body)
            .map_err(|e| GatewayError::Unreachable(e.to_string()))?;

        let status = response.status().as_u16();
        let text = response
            .body_mut()
            .read_to_string()
            .map_err(|e| GatewayError::Malformed(e.to_string()))?;

        if !(200..300).contains(&status) {
            return Err(GatewayError::Transport { status, body: text });
        }
        Ok(text)
    }
}

#[async_trait]
impl PaymentGateway for HppClient {
    async fn create_order(
        &self,
        amount: Decimal,
        description: &str,
        redirect_url: &str,
    ) -> Result<CreatedGatewayOrder, GatewayError> {
        let amount_minor = to_minor_units(amount)?;
        let url = format!("{}/order", self.config.base_url.trim_end_matches('/'));
        let config = self.config.clone();
        let description = description.to_string();
        let redirect_url = redirect_url.to_string();

        tokio::task::spawn_blocking(move || {
            let request = CreateOrderRequest {
                merchant: &config.merchant_id,
                password: &config.api_password,
                amount: amount_minor,
                currency: &config.currency,
                description: &description,
                back_url: &redirect_url,
            };
            let body = Self::post_json(&url, &request)?;
            interpret_create(&body)
        })
        .await
        .map_err(|e| GatewayError::Unreachable(format!("task join error: {}", e)))?
    }

    async fn get_order_status(
        &self,
        gateway_order_id: &str,
        gateway_secret: &str,
    ) -> Result<GatewayOrderStatus, GatewayError> {
        let url = format!(
            "{}/order/status",
            self.config.base_url.trim_end_matches('/')
        );
        let config = self.config.clone();
        let gateway_order_id = gateway_order_id.to_string();
        let gateway_secret = gateway_secret.to_string();

        tokio::task::spawn_blocking(move || {
            let request = OrderStatusRequest {
                merchant: &config.merchant_id,
                password: &config.api_password,
                order_id: &gateway_order_id,
                order_password: &gateway_secret,
            };
            let body = Self::post_json(&url, &request)?;
            interpret_status(&body, &gateway_order_id)
        })
        .await
        .map_err(|e| GatewayError::Unreachable(format!("task join error: {}", e)))?
    }
}
