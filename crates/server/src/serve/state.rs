//! Application state and rate limiting.

use std::collections::HashMap;
use std::net::IpAddr;
use std::sync::Arc;
use std::time::Instant;

use tokio::sync::Mutex;

use snapcart_catalog::CatalogStore;
use snapcart_checkout::{Checkout, MemoryOrderStore};
use snapcart_gateway::HppClient;
use snapcart_vision::{AnthropicVision, RecognitionPipeline};

use super::RATE_LIMIT_WINDOW_SECS;

/// Per-IP request tracker: (request count, window start time).
type IpTracker = HashMap<IpAddr, (u64, Instant)>;

/// In-memory per-IP rate limiter.
pub(crate) struct RateLimiter {
    /// Request counts per IP per window.
    tracker: Mutex<IpTracker>,
    /// Maximum requests per window.
    pub(crate) max_requests: u64,
}

impl RateLimiter {
    pub(crate) fn new(max_requests: u64) -> Self {
        Self {
            tracker: Mutex::new(HashMap::new()),
            max_requests,
        }
    }

    /// Check if a request from the given IP is allowed.
    /// Returns Ok(()) if allowed, Err(retry_after_secs) if rate limited.
    pub(crate) async fn check(&self, ip: IpAddr) -> Result<(), u64> {
        self.check_at(ip, Instant::now()).await
    }

    async fn check_at(&self, ip: IpAddr, now: Instant) -> Result<(), u64> {
        let mut tracker = self.tracker.lock().await;

        // Evict every expired window so idle IPs do not accumulate.
        tracker.retain(|_, (_, start)| {
            now.duration_since(*start).as_secs() < RATE_LIMIT_WINDOW_SECS
        });

        let entry = tracker.entry(ip).or_insert((0, now));
        let elapsed = now.duration_since(entry.1).as_secs();

        entry.0 += 1;
        if entry.0 > self.max_requests {
            let retry_after = RATE_LIMIT_WINDOW_SECS.saturating_sub(elapsed);
            Err(retry_after)
        } else {
            Ok(())
        }
    }
}


/// Application state shared across request handlers.
pub(crate) struct AppState {
    /// Product catalog, backend selected at startup.
    pub(crate) catalog: Arc<dyn CatalogStore>,
    /// Vision recognition pipeline over the same catalog.
    pub(crate) pipeline: RecognitionPipeline<AnthropicVision, Arc<dyn CatalogStore>>,
    /// Checkout orchestrator over the payment gateway.
    pub(crate) checkout: Checkout<HppClient, MemoryOrderStore>,
    /// Redirect target handed to the gateway on order creation.
    pub(crate) callback_base: String,
    /// Per-IP rate limiter.
    pub(crate) rate_limiter: RateLimiter,
    /// Optional API key for authentication. None = no auth required.
    pub(crate) api_key: Option<String>,
}
