//! Environment configuration, read once at startup.

use snapcart_gateway::GatewayConfig;

/// Default rate limit: 60 requests per minute per IP.
const DEFAULT_RATE_LIMIT: u64 = 60;

/// Default payment gateway sandbox endpoint.
const DEFAULT_GATEWAY_URL: &str = "https://hpp.sandbox.example.com/api";

/// Runtime configuration assembled from environment variables.
pub(crate) struct Config {
    /// Anthropic API key for the vision pipeline. Missing key leaves
    /// recognition endpoints failing upstream, the rest of the API works.
    pub(crate) anthropic_api_key: Option<String>,
    /// Vision model override (SNAPCART_VISION_MODEL).
    pub(crate) vision_model: Option<String>,
    pub(crate) gateway: GatewayConfig,
    /// Public base URL the gateway redirects the shopper back to.
    /// Defaults to http://localhost:{port}/checkout/callback.
    pub(crate) callback_base: Option<String>,
    pub(crate) rate_limit: u64,
    /// Optional API key for authentication (SNAPCART_API_KEY).
    pub(crate) api_key: Option<String>,
}

fn env_nonempty(name: &str) -> Option<String> {
    std::env::var(name).ok().filter(|v| !v.is_empty())
}

impl Config {
    pub(crate) fn from_env() -> Self {
        let anthropic_api_key = env_nonempty("ANTHROPIC_API_KEY");
        if anthropic_api_key.is_none() {
            eprintln!("Warning: ANTHROPIC_API_KEY not set; /recognize will report upstream errors");
        }

        let gateway_url =
            env_nonempty("SNAPCART_GATEWAY_URL").unwrap_or_else(|| DEFAULT_GATEWAY_URL.to_string());
        let merchant_id = env_nonempty("SNAPCART_GATEWAY_MERCHANT").unwrap_or_else(|| "demo".to_string());
        let api_password = env_nonempty("SNAPCART_GATEWAY_PASSWORD").unwrap_or_else(|| "demo".to_string());

        let rate_limit = env_nonempty("SNAPCART_RATE_LIMIT")
            .and_then(|v| v.parse::<u64>().ok())
            .unwrap_or(DEFAULT_RATE_LIMIT);

        Config {
            anthropic_api_key,
            vision_model: env_nonempty("SNAPCART_VISION_MODEL"),
            gateway: GatewayConfig {
                base_url: gateway_url,
                merchant_id,
                api_password,
                currency: "KZT".to_string(),
            },
            callback_base: env_nonempty("SNAPCART_CALLBACK_BASE"),
            rate_limit,
            api_key: env_nonempty("SNAPCART_API_KEY"),
        }
    }
}
