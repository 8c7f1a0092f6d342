use snapcart_gateway::GatewayError;

/// All errors that can be returned by the checkout orchestrator and stores.
#[derive(Debug, thiserror::Error)]
pub enum CheckoutError {
    /// No order with the given internal id exists.
    #[error("order not found: {order_id}")]
    OrderNotFound { order_id: String },

    /// An order with this id already exists. Ids are random, so the
    /// orchestrator retries creation once with a fresh id before
    /// surfacing this.
    #[error("order already exists: {order_id}")]
    DuplicateOrder { order_id: String },

    /// Attempted to resolve an order to a non-terminal status.
    #[error("cannot resolve order {order_id} to non-terminal status")]
    InvalidResolution { order_id: String },

    /// The payment gateway call failed.
    #[error(transparent)]
    Gateway(#[from] GatewayError),
}
