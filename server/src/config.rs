//! Configuration management for the storefront server.
//!
//! Loads configuration from environment variables with sensible defaults.
//! A `.env` file is read first when present. Secrets have no defaults;
//! [`Config::validate`] rejects a configuration that lacks them so the
//! server fails at startup instead of on the first checkout.

use std::env;
use storefront_commerce::{RateLimitPolicy, ShopConfig};
use storefront_core::stock::DEFAULT_LOW_STOCK_THRESHOLD;
use storefront_core::{Result, ShopError};

/// Application configuration loaded from environment variables.
#[derive(Clone)]
pub struct Config {
    /// HTTP server configuration
    pub server: ServerConfig,
    /// Redis connection URL
    pub redis_url: String,
    /// Payment processor configuration
    pub stripe: StripeConfig,
    /// Admin authentication configuration
    pub admin: AdminConfig,
    /// Email configuration
    pub email: EmailConfig,
    /// Storefront behavior
    pub shop: ShopSettings,
}

/// HTTP server configuration
#[derive(Debug, Clone)]
pub struct ServerConfig {
    /// Host to bind to
    pub host: String,
    /// Port to bind to
    pub port: u16,
    /// Prometheus exporter port; no exporter when unset
    pub metrics_port: Option<u16>,
}

/// Payment processor configuration
#[derive(Clone)]
pub struct StripeConfig {
    /// API secret key (`sk_...`)
    pub secret_key: String,
    /// Webhook endpoint secret (`whsec_...`)
    pub webhook_secret: String,
}

/// Admin authentication configuration
#[derive(Clone)]
pub struct AdminConfig {
    /// Admin password
    pub token: String,
    /// Session signing key; falls back to the admin password
    pub session_secret: Option<String>,
    /// Mark the session cookie `Secure`
    pub secure_cookies: bool,
}

/// Email configuration
#[derive(Clone)]
pub struct EmailConfig {
    /// Sender mailbox
    pub from: Option<String>,
    /// SMTP relay host; console logging when unset
    pub smtp_host: Option<String>,
    /// SMTP port
    pub smtp_port: u16,
    /// SMTP username
    pub smtp_username: Option<String>,
    /// SMTP password
    pub smtp_password: Option<String>,
    /// Name used to sign messages
    pub shop_name: String,
}

/// Storefront behavior
#[derive(Debug, Clone)]
pub struct ShopSettings {
    /// Public base URL
    pub site_url: String,
    /// Inventory alert recipient
    pub alert_email: Option<String>,
    /// Stock at or below which a low-stock alert fires
    pub low_stock_threshold: u64,
    /// Checkout attempts per window
    pub checkout_rate_limit: RateLimitPolicy,
    /// Admin login attempts per window
    pub login_rate_limit: RateLimitPolicy,
}

impl std::fmt::Debug for Config {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Config")
            .field("server", &self.server)
            .field("shop", &self.shop)
            .field("smtp_host", &self.email.smtp_host)
            .finish_non_exhaustive()
    }
}

impl Config {
    /// Load configuration from environment variables.
    #[must_use]
    pub fn from_env() -> Self {
        Self::from_lookup(|key| env::var(key).ok())
    }

    /// Load configuration through `lookup`. Empty values count as unset.
    #[must_use]
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Self {
        let text = |key: &str| lookup(key).map(|v| v.trim().to_string()).filter(|v| !v.is_empty());
        let number = |key: &str, default: u64| text(key).and_then(|s| s.parse().ok()).unwrap_or(default);

        Self {
            server: ServerConfig {
                host: text("HOST").unwrap_or_else(|| "0.0.0.0".to_string()),
                port: text("PORT").and_then(|s| s.parse().ok()).unwrap_or(3000),
                metrics_port: text("METRICS_PORT").and_then(|s| s.parse().ok()),
            },
            redis_url: text("REDIS_URL").unwrap_or_else(|| "redis://localhost:6379".to_string()),
            stripe: StripeConfig {
                secret_key: text("STRIPE_SECRET_KEY").unwrap_or_default(),
                webhook_secret: text("STRIPE_WEBHOOK_SECRET").unwrap_or_default(),
            },
            admin: AdminConfig {
                token: text("ADMIN_TOKEN").unwrap_or_default(),
                session_secret: text("ADMIN_SESSION_SECRET"),
                secure_cookies: text("SECURE_COOKIES")
                    .and_then(|s| s.parse().ok())
                    .unwrap_or(true),
            },
            email: EmailConfig {
                from: text("EMAIL_FROM").or_else(|| text("RESEND_FROM")),
                smtp_host: text("SMTP_HOST"),
                smtp_port: text("SMTP_PORT").and_then(|s| s.parse().ok()).unwrap_or(587),
                smtp_username: text("SMTP_USERNAME"),
                smtp_password: text("SMTP_PASSWORD"),
                shop_name: text("SHOP_NAME").unwrap_or_else(|| "Storefront".to_string()),
            },
            shop: ShopSettings {
                site_url: text("SITE_URL").unwrap_or_default(),
                alert_email: text("INVENTORY_ALERT_EMAIL").or_else(|| text("ADMIN_ALERT_EMAIL")),
                low_stock_threshold: number("LOW_STOCK_THRESHOLD", DEFAULT_LOW_STOCK_THRESHOLD),
                checkout_rate_limit: RateLimitPolicy::new(
                    number("RATE_LIMIT_CHECKOUT_MAX", RateLimitPolicy::CHECKOUT.limit),
                    number("RATE_LIMIT_CHECKOUT_WINDOW_SECONDS", RateLimitPolicy::CHECKOUT.window_secs),
                ),
                login_rate_limit: RateLimitPolicy::new(
                    number("RATE_LIMIT_LOGIN_MAX", RateLimitPolicy::LOGIN.limit),
                    number("RATE_LIMIT_LOGIN_WINDOW_SECONDS", RateLimitPolicy::LOGIN.window_secs),
                ),
            },
        }
    }

    /// Check that every required setting is present.
    ///
    /// # Errors
    ///
    /// Returns [`ShopError::Config`] naming every missing variable.
    pub fn validate(&self) -> Result<()> {
        let mut missing = Vec::new();
        if self.shop.site_url.is_empty() {
            missing.push("SITE_URL");
        }
        if self.stripe.secret_key.is_empty() {
            missing.push("STRIPE_SECRET_KEY");
        }
        if self.stripe.webhook_secret.is_empty() {
            missing.push("STRIPE_WEBHOOK_SECRET");
        }
        if self.admin.token.is_empty() {
            missing.push("ADMIN_TOKEN");
        }
        if self.email.smtp_host.is_some() && self.email.from.is_none() {
            missing.push("EMAIL_FROM");
        }

        if missing.is_empty() {
            Ok(())
        } else {
            Err(ShopError::Config(format!("missing {}", missing.join(", "))))
        }
    }

    /// Settings for the storefront services.
    #[must_use]
    pub fn shop_config(&self) -> ShopConfig {
        let mut config = ShopConfig::new(&self.shop.site_url)
            .with_alert_recipient(self.shop.alert_email.clone())
            .with_low_stock_threshold(self.shop.low_stock_threshold);
        config.checkout_rate_limit = self.shop.checkout_rate_limit;
        config.login_rate_limit = self.shop.login_rate_limit;
        config
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn config(vars: &[(&str, &str)]) -> Config {
        let vars: HashMap<String, String> = vars
            .iter()
            .map(|(k, v)| ((*k).to_string(), (*v).to_string()))
            .collect();
        Config::from_lookup(|key| vars.get(key).cloned())
    }

    const REQUIRED: [(&str, &str); 4] = [
        ("SITE_URL", "https://shop.example.com/"),
        ("STRIPE_SECRET_KEY", "sk_test_123"),
        ("STRIPE_WEBHOOK_SECRET", "whsec_123"),
        ("ADMIN_TOKEN", "hunter2"),
    ];

    #[test]
    fn test_defaults() {
        let config = config(&REQUIRED);
        assert!(config.validate().is_ok());
        assert_eq!(config.server.port, 3000);
        assert_eq!(config.server.metrics_port, None);
        assert!(config.admin.secure_cookies);
        assert_eq!(config.email.shop_name, "Storefront");
        assert_eq!(config.shop.checkout_rate_limit, RateLimitPolicy::CHECKOUT);

        let shop = config.shop_config();
        assert_eq!(shop.site_url, "https://shop.example.com");
        assert_eq!(shop.low_stock_threshold, DEFAULT_LOW_STOCK_THRESHOLD);
    }

    #[test]
    fn test_missing_secrets_are_listed() {
        let err = config(&[("SITE_URL", "https://shop.example.com"), ("STRIPE_SECRET_KEY", " ")])
            .validate()
            .unwrap_err();
        assert_eq!(
            err,
            ShopError::Config("missing STRIPE_SECRET_KEY, STRIPE_WEBHOOK_SECRET, ADMIN_TOKEN".into())
        );
    }

    #[test]
    fn test_smtp_requires_sender() {
        let mut vars = REQUIRED.to_vec();
        vars.push(("SMTP_HOST", "smtp.example.com"));
        assert!(config(&vars).validate().is_err());
        vars.push(("EMAIL_FROM", "Shop <orders@example.com>"));
        assert!(config(&vars).validate().is_ok());
    }

    #[test]
    fn test_overrides() {
        let mut vars = REQUIRED.to_vec();
        vars.extend([
            ("RATE_LIMIT_LOGIN_MAX", "3"),
            ("RATE_LIMIT_LOGIN_WINDOW_SECONDS", "900"),
            ("ADMIN_ALERT_EMAIL", "owner@example.com"),
            ("SECURE_COOKIES", "false"),
            ("METRICS_PORT", "9100"),
            ("LOW_STOCK_THRESHOLD", "not-a-number"),
        ]);
        let config = config(&vars);
        assert_eq!(config.shop.login_rate_limit, RateLimitPolicy::new(3, 900));
        assert_eq!(config.shop.alert_email.as_deref(), Some("owner@example.com"));
        assert!(!config.admin.secure_cookies);
        assert_eq!(config.server.metrics_port, Some(9100));
        assert_eq!(config.shop.low_stock_threshold, DEFAULT_LOW_STOCK_THRESHOLD);
    }
}
