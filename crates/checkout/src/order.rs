use rand::Rng;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use time::format_description::well_known::Rfc3339;
use time::OffsetDateTime;

/// Internal order status. Coarser than the gateway's vocabulary: the
/// orchestrator maps every terminal gateway failure to `Failed`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum OrderStatus {
    Pending,
    Paid,
    Failed,
}

impl OrderStatus {
    pub fn is_terminal(self) -> bool {
        !matches!(self, OrderStatus::Pending)
    }
}

/// A cart line as supplied by the client. `price` is client-echoed and
/// authoritative only for display; the internal record's `total` is what
/// the gateway order is created for.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CartItem {
    pub product_id: i64,
    pub name: String,
    pub price: Decimal,
    pub quantity: u32,
}

/// The internal order record.
///
/// Deliberately NOT `Serialize`: the record carries `gateway_secret`, which
/// must never leave the process. Everything client-facing goes through
/// [`OrderView`].
#[derive(Debug, Clone)]
pub struct Order {
    pub order_id: String,
    pub gateway_order_id: String,
    /// Per-order gateway credential, set once at creation. Required for
    /// every status query against the gateway; never exposed to clients.
    pub gateway_secret: String,
    pub status: OrderStatus,
    /// Snapshot of the cart at creation time, immutable thereafter.
    pub items: Vec<CartItem>,
    pub total: Decimal,
    /// ISO 8601 / RFC 3339 timestamp string.
    pub created_at: String,
}

impl Order {
    pub fn view(&self) -> OrderView {
        OrderView {
            order_id: self.order_id.clone(),
            status: self.status,
            gateway_order_id: self.gateway_order_id.clone(),
            items: self.items.clone(),
            total: self.total,
        }
    }
}

/// Client-visible projection of an order. No secret field exists here, so
/// no serializer configuration can leak it.
#[derive(Debug, Clone, Serialize)]
pub struct OrderView {
    pub order_id: String,
    pub status: OrderStatus,
    pub gateway_order_id: String,
    pub items: Vec<CartItem>,
    pub total: Decimal,
}

/// Generate a human-readable order token: `ORDER-` plus 8 random uppercase
/// hex characters. Generated exactly once per checkout creation.
pub(crate) fn generate_order_id() -> String {
    const HEX: &[u8] = b"0123456789ABCDEF";
    let mut rng = rand::thread_rng();
    let suffix: String = (0..8)
        .map(|_| HEX[rng.gen_range(0..HEX.len())] as char)
        .collect();
    format!("ORDER-{}", suffix)
}

pub(crate) fn now_rfc3339() -> String {
    OffsetDateTime::now_utc()
        .format(&Rfc3339)
        .unwrap_or_else(|_| String::from("1970-01-01T00:00:00Z"))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn order_ids_have_expected_shape() {
        let id = generate_order_id();
        assert!(id.starts_with("ORDER-"));
        assert_eq!(id.len(), 14);
        assert!(id[6..].chars().all(|c| c.is_ascii_hexdigit()));
    }

    #[test]
    fn view_omits_gateway_secret() {
        let order = Order {
            order_id: "ORDER-AAAA1111".to_string(),
            gateway_order_id: "GW-1".to_string(),
            gateway_secret: "topsecret".to_string(),
            status: OrderStatus::Pending,
            items: vec![],
            total: Decimal::from(320),
            created_at: now_rfc3339(),
        };
        let json = serde_json::to_string(&order.view()).unwrap();
        assert!(!json.contains("topsecret"));
        assert!(!json.contains("gateway_secret"));
        assert!(json.contains("ORDER-AAAA1111"));
    }

    #[test]
    fn terminal_partition() {
        assert!(!OrderStatus::Pending.is_terminal());
        assert!(OrderStatus::Paid.is_terminal());
        assert!(OrderStatus::Failed.is_terminal());
    }
}
