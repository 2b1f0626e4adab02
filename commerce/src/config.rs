//! Service configuration.

use crate::rate_limit::RateLimitPolicy;
use storefront_core::stock::DEFAULT_LOW_STOCK_THRESHOLD;

/// Settings the services read. The server binary builds this from the
/// environment.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ShopConfig {
    /// Public base URL used for checkout redirects (no trailing slash).
    pub site_url: String,
    /// Stock at or below which a `low` alert fires.
    pub low_stock_threshold: u64,
    /// Inventory alert recipient.
    pub alert_recipient: Option<String>,
    /// Checkout rate limit.
    pub checkout_rate_limit: RateLimitPolicy,
    /// Admin login rate limit.
    pub login_rate_limit: RateLimitPolicy,
}

impl ShopConfig {
    /// Configuration with defaults for everything but the site URL.
    #[must_use]
    pub fn new(site_url: &str) -> Self {
        Self {
            site_url: site_url.trim_end_matches('/').to_string(),
            low_stock_threshold: DEFAULT_LOW_STOCK_THRESHOLD,
            alert_recipient: None,
            checkout_rate_limit: RateLimitPolicy::CHECKOUT,
            login_rate_limit: RateLimitPolicy::LOGIN,
        }
    }

    /// Set the alert recipient.
    #[must_use]
    pub fn with_alert_recipient(mut self, to: Option<String>) -> Self {
        self.alert_recipient = to;
        self
    }

    /// Set the low-stock threshold (at least 1).
    #[must_use]
    pub fn with_low_stock_threshold(mut self, threshold: u64) -> Self {
        self.low_stock_threshold = threshold.max(1);
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_site_url_is_normalized() {
        let config = ShopConfig::new("https://shop.example.com///");
        assert_eq!(config.site_url, "https://shop.example.com");
        assert_eq!(config.low_stock_threshold, 2);
        assert_eq!(config.with_low_stock_threshold(0).low_stock_threshold, 1);
    }
}
