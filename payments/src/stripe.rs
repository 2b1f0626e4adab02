//! Stripe checkout gateway.

use crate::signature::{verify_at, DEFAULT_TOLERANCE_SECS};
use reqwest::Client;
use serde::Deserialize;
use storefront_core::payment::{
    CheckoutSession, CheckoutSessionRequest, LinePrice, PaymentEvent,
};
use storefront_core::{PaymentGateway, Result, ShopError};

const API_BASE: &str = "https://api.stripe.com/v1";
const DASHBOARD_BASE: &str = "https://dashboard.stripe.com";

/// Stripe [`PaymentGateway`].
///
/// # Configuration
///
/// - `STRIPE_SECRET_KEY`: API key; `sk_test_` keys link to the test dashboard
/// - `STRIPE_WEBHOOK_SECRET`: endpoint signing secret (`whsec_...`)
///
/// # Example
///
/// ```no_run
/// use storefront_payments::StripeGateway;
///
/// let stripe = StripeGateway::new(
///     std::env::var("STRIPE_SECRET_KEY").unwrap_or_default(),
///     std::env::var("STRIPE_WEBHOOK_SECRET").unwrap_or_default(),
/// );
/// ```
#[derive(Clone)]
pub struct StripeGateway {
    secret_key: String,
    webhook_secret: String,
    http_client: Client,
    api_base: String,
    tolerance_secs: i64,
}

impl std::fmt::Debug for StripeGateway {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("StripeGateway")
            .field("api_base", &self.api_base)
            .field("test_mode", &self.is_test_mode())
            .finish_non_exhaustive()
    }
}

#[derive(Debug, Deserialize)]
struct LineItemList {
    data: Vec<LineItem>,
}

#[derive(Debug, Deserialize)]
struct LineItem {
    quantity: Option<u64>,
}

#[derive(Debug, Deserialize)]
struct ApiErrorBody {
    error: ApiError,
}

#[derive(Debug, Deserialize)]
struct ApiError {
    message: Option<String>,
}

impl StripeGateway {
    /// Create a gateway.
    #[must_use]
    pub fn new(secret_key: String, webhook_secret: String) -> Self {
        Self {
            secret_key,
            webhook_secret,
            http_client: Client::new(),
            api_base: API_BASE.to_string(),
            tolerance_secs: DEFAULT_TOLERANCE_SECS,
        }
    }

    /// Point API calls at another base URL, such as a local mock.
    #[must_use]
    pub fn with_api_base(mut self, api_base: impl Into<String>) -> Self {
        self.api_base = api_base.into().trim_end_matches('/').to_string();
        self
    }

    /// Accept signatures up to this many seconds old.
    #[must_use]
    pub const fn with_tolerance_secs(mut self, tolerance_secs: i64) -> Self {
        self.tolerance_secs = tolerance_secs;
        self
    }

    /// Returns `true` for `sk_test_` keys.
    #[must_use]
    pub fn is_test_mode(&self) -> bool {
        self.secret_key.starts_with("sk_test_")
    }

    async fn api_error(response: reqwest::Response) -> ShopError {
        let status = response.status();
        let message = response
            .json::<ApiErrorBody>()
            .await
            .ok()
            .and_then(|body| body.error.message)
            .unwrap_or_else(|| status.to_string());
        tracing::error!(status = %status, message = %message, "Stripe request failed");
        ShopError::Payment(message)
    }
}

/// Stripe's bracketed form encoding of a session request.
#[must_use]
pub fn session_form(request: &CheckoutSessionRequest) -> Vec<(String, String)> {
    let mut form = vec![
        ("mode".to_string(), "payment".to_string()),
        ("success_url".to_string(), request.success_url.clone()),
        ("cancel_url".to_string(), request.cancel_url.clone()),
    ];

    for (index, item) in request.line_items.iter().enumerate() {
        let prefix = format!("line_items[{index}]");
        form.push((format!("{prefix}[quantity]"), item.quantity.to_string()));

        match &item.price {
            LinePrice::Catalog { price_id } => {
                form.push((format!("{prefix}[price]"), price_id.clone()));
            }
            LinePrice::Inline {
                currency,
                unit_amount,
                name,
                description,
            } => {
                form.push((format!("{prefix}[price_data][currency]"), currency.clone()));
                form.push((
                    format!("{prefix}[price_data][unit_amount]"),
                    unit_amount.to_string(),
                ));
                form.push((
                    format!("{prefix}[price_data][product_data][name]"),
                    name.clone(),
                ));
                if !description.is_empty() {
                    form.push((
                        format!("{prefix}[price_data][product_data][description]"),
                        description.clone(),
                    ));
                }
            }
        }

        if let Some(adjustable) = item.adjustable {
            form.push((format!("{prefix}[adjustable_quantity][enabled]"), "true".into()));
            form.push((
                format!("{prefix}[adjustable_quantity][minimum]"),
                adjustable.minimum.to_string(),
            ));
            form.push((
                format!("{prefix}[adjustable_quantity][maximum]"),
                adjustable.maximum.to_string(),
            ));
        }
    }

    for (key, value) in &request.metadata {
        form.push((format!("metadata[{key}]"), value.clone()));
    }

    form
}

impl PaymentGateway for StripeGateway {
    async fn create_checkout_session(&self, request: &CheckoutSessionRequest) -> Result<CheckoutSession> {
        let response = self
            .http_client
            .post(format!("{}/checkout/sessions", self.api_base))
            .bearer_auth(&self.secret_key)
            .form(&session_form(request))
            .send()
            .await
            .map_err(|e| ShopError::Payment(e.to_string()))?;

        if !response.status().is_success() {
            return Err(Self::api_error(response).await);
        }

        let session: CheckoutSession = response
            .json()
            .await
            .map_err(|e| ShopError::Payment(e.to_string()))?;

        tracing::debug!(session_id = %session.id, "Created Stripe checkout session");
        Ok(session)
    }

    async fn line_item_quantity(&self, session_id: &str) -> Result<u64> {
        let response = self
            .http_client
            .get(format!(
                "{}/checkout/sessions/{session_id}/line_items",
                self.api_base
            ))
            .query(&[("limit", "100")])
            .bearer_auth(&self.secret_key)
            .send()
            .await
            .map_err(|e| ShopError::Payment(e.to_string()))?;

        if !response.status().is_success() {
            return Err(Self::api_error(response).await);
        }

        let list: LineItemList = response
            .json()
            .await
            .map_err(|e| ShopError::Payment(e.to_string()))?;

        Ok(list.data.iter().filter_map(|item| item.quantity).sum())
    }

    fn construct_event(&self, payload: &[u8], signature: &str, now_unix: i64) -> Result<PaymentEvent> {
        verify_at(
            payload,
            signature,
            &self.webhook_secret,
            now_unix,
            self.tolerance_secs,
        )?;
        PaymentEvent::from_json(payload)
    }

    fn dashboard_url(&self, session_id: &str) -> Option<String> {
        let base = if self.is_test_mode() {
            format!("{DASHBOARD_BASE}/test")
        } else {
            DASHBOARD_BASE.to_string()
        };
        Some(format!("{base}/checkout/sessions/{session_id}"))
    }
}
