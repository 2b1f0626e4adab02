//! SMTP email provider implementation using Lettre.

use crate::templates::{Rendered, Templates};
use lettre::message::header::ContentType;
use lettre::transport::smtp::authentication::Credentials;
use lettre::{Message, SmtpTransport, Transport};
use storefront_core::notification::{InventoryAlert, OrderReceivedEmail, ShippedEmail};
use storefront_core::{EmailProvider, Result, ShopError};

/// SMTP email provider using Lettre.
///
/// # Configuration
///
/// - `smtp_server`: SMTP server address (e.g., "smtp.gmail.com")
/// - `smtp_port`: SMTP server port (usually 587 for TLS, 465 for SSL)
/// - `credentials`: optional username and password
/// - `from`: sender mailbox, e.g. `Shop <orders@example.com>`
#[derive(Clone)]
pub struct SmtpEmailProvider {
    smtp_server: String,
    smtp_port: u16,
    credentials: Option<Credentials>,
    from: String,
    templates: Templates,
}

impl std::fmt::Debug for SmtpEmailProvider {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SmtpEmailProvider")
            .field("smtp_server", &self.smtp_server)
            .field("smtp_port", &self.smtp_port)
            .field("from", &self.from)
            .finish_non_exhaustive()
    }
}

impl SmtpEmailProvider {
    /// Create a new SMTP email provider.
    ///
    /// # Errors
    ///
    /// Returns [`ShopError::Config`] if `from` is not a valid mailbox.
    pub fn new(smtp_server: String, smtp_port: u16, from: String, templates: Templates) -> Result<Self> {
        from.parse::<lettre::message::Mailbox>()
            .map_err(|e| ShopError::Config(format!("Invalid EMAIL_FROM: {e}")))?;

        Ok(Self {
            smtp_server,
            smtp_port,
            credentials: None,
            from,
            templates,
        })
    }

    /// Authenticate with username and password.
    #[must_use]
    pub fn with_credentials(mut self, username: String, password: String) -> Self {
        self.credentials = Some(Credentials::new(username, password));
        self
    }

    /// Build SMTP transport for sending emails.
    ///
    /// Creates a new transport for each email to avoid connection pooling issues.
    fn build_transport(&self) -> Result<SmtpTransport> {
        let mut builder = SmtpTransport::relay(&self.smtp_server)
            .map_err(|e| ShopError::Email(format!("SMTP relay error: {e}")))?
            .port(self.smtp_port);
        if let Some(credentials) = &self.credentials {
            builder = builder.credentials(credentials.clone());
        }
        Ok(builder.build())
    }

    async fn send(&self, to: &str, rendered: Rendered) -> Result<()> {
        let email = Message::builder()
            .from(
                self.from
                    .parse()
                    .map_err(|e| ShopError::Email(format!("Invalid from address: {e}")))?,
            )
            .to(to
                .parse()
                .map_err(|e| ShopError::Email(format!("Invalid to address: {e}")))?)
            .subject(rendered.subject)
            .header(ContentType::TEXT_PLAIN)
            .body(rendered.body)
            .map_err(|e| ShopError::Email(format!("Failed to build email: {e}")))?;

        let mailer = self.build_transport()?;

        tokio::task::spawn_blocking(move || {
            mailer
                .send(&email)
                .map_err(|e| ShopError::Email(format!("Failed to send email: {e}")))
        })
        .await
        .map_err(|e| ShopError::Email(format!("Email task failed: {e}")))?
        .map(|_| ())
    }
}

impl EmailProvider for SmtpEmailProvider {
    async fn send_order_received(&self, email: &OrderReceivedEmail) -> Result<()> {
        self.send(&email.customer_email, self.templates.order_received(email))
            .await
    }

    async fn send_shipped(&self, email: &ShippedEmail) -> Result<()> {
        self.send(&email.customer_email, self.templates.shipped(email))
            .await
    }

    async fn send_inventory_alert(&self, to: &str, alert: &InventoryAlert) -> Result<()> {
        self.send(to, self.templates.inventory_alert(alert)).await
    }
}
