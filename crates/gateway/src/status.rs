use serde::{Deserialize, Serialize};

/// Remote order status as reported by the gateway.
///
/// The vocabulary is small and closed on the gateway side, but unknown
/// strings are carried verbatim in `Other` rather than rejected, so a
/// gateway-side addition degrades to "still unresolved" instead of an error.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum GatewayOrderStatus {
    /// Created, payment not yet attempted or still in progress.
    Preparing,
    /// Payment captured in full.
    FullyPaid,
    Declined,
    Expired,
    Cancelled,
    Refused,
    /// A status string this client does not know.
    Other(String),
}

impl GatewayOrderStatus {
    pub fn parse(raw: &str) -> Self {
        match raw {
            "Preparing" => GatewayOrderStatus::Preparing,
            "FullyPaid" => GatewayOrderStatus::FullyPaid,
            "Declined" => GatewayOrderStatus::Declined,
            "Expired" => GatewayOrderStatus::Expired,
            "Cancelled" => GatewayOrderStatus::Cancelled,
            "Refused" => GatewayOrderStatus::Refused,
            other => GatewayOrderStatus::Other(other.to_string()),
        }
    }

    /// True if the gateway reports the payment succeeded.
    pub fn is_paid(&self) -> bool {
        matches!(self, GatewayOrderStatus::FullyPaid)
    }

    /// True if the gateway reports a terminal failure.
    pub fn is_failed(&self) -> bool {
        matches!(
            self,
            GatewayOrderStatus::Declined
                | GatewayOrderStatus::Expired
                | GatewayOrderStatus::Cancelled
                | GatewayOrderStatus::Refused
        )
    }
}
