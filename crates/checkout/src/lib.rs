//! Checkout orchestration for the Snapcart backend.
//!
//! Owns the internal order lifecycle: `Pending` at creation, resolved to
//! `Paid` or `Failed` exactly once by whichever of the gateway callback or
//! the client poll observes the remote outcome first. Terminal states are
//! write-once; the only atomic operation in the system is
//! [`OrderStore::resolve`], a per-order check-and-set.

mod error;
mod order;
mod orchestrator;
mod store;

pub use error::CheckoutError;
pub use orchestrator::{Checkout, CheckoutCreated};
pub use order::{CartItem, Order, OrderStatus, OrderView};
pub use store::{MemoryOrderStore, OrderStore};
