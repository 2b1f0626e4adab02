//! Email provider selection.

use crate::config::EmailConfig;
use storefront_core::notification::{InventoryAlert, OrderReceivedEmail, ShippedEmail};
use storefront_core::{EmailProvider, Result, ShopError};
use storefront_email::{ConsoleEmailProvider, SmtpEmailProvider, Templates};

/// The provider chosen at startup: SMTP when a relay is configured,
/// otherwise the console logger.
#[derive(Debug, Clone)]
pub enum Mailer {
    /// Sends through an SMTP relay.
    Smtp(SmtpEmailProvider),
    /// Logs messages.
    Console(ConsoleEmailProvider),
}

impl Mailer {
    /// Build the provider for `config`.
    ///
    /// # Errors
    ///
    /// Returns [`ShopError::Config`] if SMTP is configured without a valid
    /// sender mailbox.
    pub fn from_config(config: &EmailConfig) -> Result<Self> {
        let templates = Templates::new(&config.shop_name);
        let Some(host) = &config.smtp_host else {
            return Ok(Self::Console(ConsoleEmailProvider::new(templates)));
        };

        let from = config
            .from
            .clone()
            .ok_or_else(|| ShopError::Config("missing EMAIL_FROM".into()))?;
        let mut provider = SmtpEmailProvider::new(host.clone(), config.smtp_port, from, templates)?;
        if let (Some(username), Some(password)) = (&config.smtp_username, &config.smtp_password) {
            provider = provider.with_credentials(username.clone(), password.clone());
        }
        Ok(Self::Smtp(provider))
    }

    /// Short name for logs.
    #[must_use]
    pub const fn kind(&self) -> &'static str {
        match self {
            Self::Smtp(_) => "smtp",
            Self::Console(_) => "console",
        }
    }
}

impl EmailProvider for Mailer {
    async fn send_order_received(&self, email: &OrderReceivedEmail) -> Result<()> {
        match self {
            Self::Smtp(provider) => provider.send_order_received(email).await,
            Self::Console(provider) => provider.send_order_received(email).await,
        }
    }

    async fn send_shipped(&self, email: &ShippedEmail) -> Result<()> {
        match self {
            Self::Smtp(provider) => provider.send_shipped(email).await,
            Self::Console(provider) => provider.send_shipped(email).await,
        }
    }

    async fn send_inventory_alert(&self, to: &str, alert: &InventoryAlert) -> Result<()> {
        match self {
            Self::Smtp(provider) => provider.send_inventory_alert(to, alert).await,
            Self::Console(provider) => provider.send_inventory_alert(to, alert).await,
        }
    }
}
