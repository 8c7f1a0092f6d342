/// All errors that can be returned by a payment gateway client.
#[derive(Debug, thiserror::Error)]
pub enum GatewayError {
    /// Non-2xx transport response. Status code and body are always attached,
    /// never swallowed.
    #[error("gateway transport error: status {status}: {body}")]
    Transport { status: u16, body: String },

    /// Network-level failure (connect, DNS, timeout).
    #[error("gateway unreachable: {0}")]
    Unreachable(String),

    /// Application-level error reported in-band inside a 2xx response.
    #[error("gateway error {code}: {message}")]
    Api { code: String, message: String },

    /// The gateway does not know the referenced order.
    #[error("gateway order not found: {gateway_order_id}")]
    OrderNotFound { gateway_order_id: String },

    /// The gateway response did not match the expected shape.
    #[error("malformed gateway response: {0}")]
    Malformed(String),

    /// The amount cannot be expressed in the gateway's integer minor unit.
    #[error("amount not representable in minor units: {0}")]
    InvalidAmount(String),
}
