//! Mock payment gateway.

use std::collections::HashMap;
use std::sync::Arc;
use storefront_core::payment::{CheckoutSession, CheckoutSessionRequest, PaymentEvent};
use storefront_core::{PaymentGateway, Result, ShopError};
use tokio::sync::Mutex;

/// The only webhook signature [`MockPaymentGateway`] accepts.
pub const TEST_SIGNATURE: &str = "t=0,v1=test";

#[derive(Debug, Default)]
struct GatewayState {
    sessions: Vec<CheckoutSessionRequest>,
    line_items: HashMap<String, u64>,
    omit_urls: bool,
}

/// Records checkout sessions instead of calling a processor.
///
/// Session ids are `cs_test_{n}` and URLs `https://checkout.test/{id}`.
/// Line-item quantities default to 1 unless set.
#[derive(Debug, Clone, Default)]
pub struct MockPaymentGateway {
    state: Arc<Mutex<GatewayState>>,
}

impl MockPaymentGateway {
    /// Create a gateway.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Sessions created so far.
    pub async fn sessions(&self) -> Vec<CheckoutSessionRequest> {
        self.state.lock().await.sessions.clone()
    }

    /// Set the summed line-item quantity for a session.
    pub async fn set_line_item_quantity(&self, session_id: &str, quantity: u64) {
        self.state
            .lock()
            .await
            .line_items
            .insert(session_id.to_string(), quantity);
    }

    /// Return sessions without a URL.
    pub async fn omit_urls(&self, omit: bool) {
        self.state.lock().await.omit_urls = omit;
    }
}

impl PaymentGateway for MockPaymentGateway {
    async fn create_checkout_session(&self, request: &CheckoutSessionRequest) -> Result<CheckoutSession> {
        let mut state = self.state.lock().await;
        state.sessions.push(request.clone());
        let id = format!("cs_test_{}", state.sessions.len());
        let url = (!state.omit_urls).then(|| format!("https://checkout.test/{id}"));
        Ok(CheckoutSession { id, url })
    }

    async fn line_item_quantity(&self, session_id: &str) -> Result<u64> {
        Ok(self
            .state
            .lock()
            .await
            .line_items
            .get(session_id)
            .copied()
            .unwrap_or(1))
    }

    fn construct_event(&self, payload: &[u8], signature: &str, _now_unix: i64) -> Result<PaymentEvent> {
        if signature != TEST_SIGNATURE {
            return Err(ShopError::InvalidSignature("signature mismatch".into()));
        }
        PaymentEvent::from_json(payload)
    }

    fn dashboard_url(&self, session_id: &str) -> Option<String> {
        Some(format!("https://dashboard.test/checkout/sessions/{session_id}"))
    }
}
