//! Payment gateway client for the Snapcart backend.
//!
//! Models one hosted-payment-page (HPP) protocol: create a remote order,
//! hand the user an HPP redirect URL bearing a single-use order credential,
//! then poll the order status until the gateway reports a terminal outcome.
//! The merchant never sees card data; the gateway hosts the payment page.
//!
//! [`PaymentGateway`] is the seam the checkout orchestrator depends on;
//! [`HppClient`] is the wire implementation over `ureq`.

mod client;
mod error;
mod status;

pub use client::{CreatedGatewayOrder, GatewayConfig, HppClient, PaymentGateway};
pub use error::GatewayError;
pub use status::GatewayOrderStatus;
