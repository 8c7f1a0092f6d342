//! The checkout orchestrator: creates orders against the gateway and
//! reconciles their outcome via callback or poll.
//!
//! Reconciliation is deliberately asymmetric:
//!
//! - **Callback** is the gateway telling us payment concluded. If we cannot
//!   determine the outcome (no usable status and the authoritative query
//!   fails), the order fails closed: a possibly-successful payment is never
//!   left silently unresolved when we had reason to check and got no answer.
//! - **Poll** is a passive client retry. A transient gateway error must not
//!   prematurely fail an order the callback might still resolve, so the
//!   order stays `Pending` (fail open) and the client polls again.

use rust_decimal::Decimal;
use serde::Serialize;

use snapcart_gateway::{GatewayOrderStatus, PaymentGateway};

use crate::error::CheckoutError;
use crate::order::{generate_order_id, now_rfc3339, CartItem, Order, OrderStatus, OrderView};
use crate::store::OrderStore;

/// Response to a successful checkout creation.
#[derive(Debug, Clone, Serialize)]
pub struct CheckoutCreated {
    pub order_id: String,
    /// Hosted-payment-page URL the client redirects the payer to.
    pub hpp_url: String,
    pub total: Decimal,
}

pub struct Checkout<G, S> {
    gateway: G,
    store: S,
}

impl<G: PaymentGateway, S: OrderStore> Checkout<G, S> {
    pub fn new(gateway: G, store: S) -> Self {
        Checkout { gateway, store }
    }

    /// Create an internal order backed by a gateway order.
    ///
    /// Atomicity: the local record is inserted only after the gateway call
    /// succeeds. If the gateway fails, no order exists under the generated
    /// id: either both records exist or neither does.
    ///
    /// An order-id collision on insert is retried once with a fresh id and
    /// a fresh gateway order. The redirect URL embeds the id, so the first
    /// gateway order cannot be reused; it is never paid and expires
    /// gateway-side.
    pub async fn create(
        &self,
        items: Vec<CartItem>,
        total: Decimal,
        redirect_base_url: &str,
    ) -> Result<CheckoutCreated, CheckoutError> {
        match self
            .create_once(items.clone(), total, redirect_base_url)
            .await
        {
            Err(CheckoutError::DuplicateOrder { order_id }) => {
                eprintln!("order id collision on {}, retrying with a fresh id", order_id);
                self.create_once(items, total, redirect_base_url).await
            }
            other => other,
        }
    }

    async fn create_once(
        &self,
        items: Vec<CartItem>,
        total: Decimal,
        redirect_base_url: &str,
    ) -> Result<CheckoutCreated, CheckoutError> {
        let order_id = generate_order_id();
        // The callback recovers our order id from this query parameter.
        let redirect_url = format!("{}?our_order_id={}", redirect_base_url, order_id);
        let description = format!("Store purchase: {} items", items.len());

        let created = self
            .gateway
            .create_order(total, &description, &redirect_url)
            .await?;

        let order = Order {
            order_id: order_id.clone(),
            gateway_order_id: created.gateway_order_id,
            gateway_secret: created.gateway_secret,
            status: OrderStatus::Pending,
            items,
            total,
            created_at: now_rfc3339(),
        };
        self.store.insert(order).await?;

        Ok(CheckoutCreated {
            order_id,
            hpp_url: created.hpp_url,
            total,
        })
    }

    /// Apply a gateway redirect callback.
    ///
    /// An unambiguous reported status is applied directly. A missing or
    /// ambiguous status triggers an authoritative status query; if that
    /// query itself fails the order is resolved `Failed` (fail closed).
    /// Idempotent: re-delivery of a terminal resolution is a no-op.
    pub async fn handle_callback(
        &self,
        order_id: &str,
        reported_status: Option<&str>,
    ) -> Result<OrderView, CheckoutError> {
        let order = self.store.get(order_id).await?;
        if order.status.is_terminal() {
            return Ok(order.view());
        }

        let reported = reported_status.map(GatewayOrderStatus::parse);
        let target = match reported {
            Some(s) if s.is_paid() => Some(OrderStatus::Paid),
            Some(s) if s.is_failed() => Some(OrderStatus::Failed),
            // Missing or ambiguous: ask the gateway. The query happens
            // outside any per-order lock.
            _ => match self
                .gateway
                .get_order_status(&order.gateway_order_id, &order.gateway_secret)
                .await
            {
                Ok(s) if s.is_paid() => Some(OrderStatus::Paid),
                Ok(s) if s.is_failed() => Some(OrderStatus::Failed),
                // The gateway answered "still unresolved": leave Pending,
                // the poll path remains available.
                Ok(_) => None,
                // No answer at callback time: fail closed.
                Err(e) => {
                    eprintln!(
                        "callback for {}: status query failed ({}), failing closed",
                        order_id, e
                    );
                    Some(OrderStatus::Failed)
                }
            },
        };

        match target {
            Some(terminal) => Ok(self.store.resolve(order_id, terminal).await?.view()),
            None => Ok(self.store.get(order_id).await?.view()),
        }
    }

    /// Client poll: reconcile a still-pending order against the gateway.
    ///
    /// Covers lost or late callbacks. A failing reconciliation call leaves
    /// the order `Pending` (fail open): the poll is retried by the client.
    pub async fn poll_status(&self, order_id: &str) -> Result<OrderView, CheckoutError> {
        let order = self.store.get(order_id).await?;
        if order.status.is_terminal() {
            return Ok(order.view());
        }

        match self
            .gateway
            .get_order_status(&order.gateway_order_id, &order.gateway_secret)
            .await
        {
            Ok(s) if s.is_paid() => Ok(self.store.resolve(order_id, OrderStatus::Paid).await?.view()),
            Ok(s) if s.is_failed() => Ok(self
                .store
                .resolve(order_id, OrderStatus::Failed)
                .await?
                .view()),
            Ok(_) => Ok(order.view()),
            Err(e) => {
                eprintln!(
                    "poll for {}: status query failed ({}), staying pending",
                    order_id, e
                );
                Ok(order.view())
            }
        }
    }
}
