//! Order store abstraction and the in-memory backend.
//!
//! The store is the one piece of mutable shared state in the system.
//! `resolve` is the concurrency-critical operation: callback and poll may
//! race on the same order, and both funnel through this single atomic
//! check-and-set. A production deployment backs this trait with a
//! transactional store; the in-memory map is valid for a single instance.

use std::collections::HashMap;

use async_trait::async_trait;
use tokio::sync::Mutex;

use crate::error::CheckoutError;
use crate::order::{Order, OrderStatus};

#[async_trait]
pub trait OrderStore: Send + Sync + 'static {
    /// Persist a newly created order. Fails on a duplicate id.
    async fn insert(&self, order: Order) -> Result<(), CheckoutError>;

    /// Read an order by its internal id.
    async fn get(&self, order_id: &str) -> Result<Order, CheckoutError>;

    /// Atomically move a `Pending` order to a terminal status.
    ///
    /// Check-and-set semantics: if the order is still `Pending` the terminal
    /// status is applied; if it is already terminal the stored record is
    /// returned unchanged (idempotent no-op; whichever resolver wrote first
    /// wins). Passing `Pending` as the target is rejected.
    ///
    /// Implementations must not hold the per-order lock across any I/O;
    /// only this final state mutation is locked.
    async fn resolve(&self, order_id: &str, terminal: OrderStatus)
        -> Result<Order, CheckoutError>;
}

/// In-memory order store for a single-instance deployment.
pub struct MemoryOrderStore {
    orders: Mutex<HashMap<String, Order>>,
}

impl MemoryOrderStore {
    pub fn new() -> Self {
        MemoryOrderStore {
            orders: Mutex::new(HashMap::new()),
        }
    }
}

impl Default for MemoryOrderStore {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl OrderStore for MemoryOrderStore {
    async fn insert(&self, order: Order) -> Result<(), CheckoutError> {
        let mut orders = self.orders.lock().await;
        if orders.contains_key(&order.order_id) {
            return Err(CheckoutError::DuplicateOrder {
                order_id: order.order_id,
            });
        }
        orders.insert(order.order_id.clone(), order);
        Ok(())
    }

    async fn get(&self, order_id: &str) -> Result<Order, CheckoutError> {
        let orders = self.orders.lock().await;
        orders
            .get(order_id)
            .cloned()
            .ok_or_else(|| CheckoutError::OrderNotFound {
                order_id: order_id.to_string(),
            })
    }

    async fn resolve(
        &self,
        order_id: &str,
        terminal: OrderStatus,
    ) -> Result<Order, CheckoutError> {
        if !terminal.is_terminal() {
            return Err(CheckoutError::InvalidResolution {
                order_id: order_id.to_string(),
            });
        }
        let mut orders = self.orders.lock().await;
        let order = orders
            .get_mut(order_id)
            .ok_or_else(|| CheckoutError::OrderNotFound {
                order_id: order_id.to_string(),
            })?;
        if order.status == OrderStatus::Pending {
            order.status = terminal;
        }
        Ok(order.clone())
    }
}
