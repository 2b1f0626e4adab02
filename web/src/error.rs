//! Error types for web handlers.
//!
//! [`AppError`] bridges [`ShopError`] and HTTP responses. Every error body
//! is JSON: `{"ok": false, "code": "...", "message": "..."}`.

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde::Serialize;
use std::fmt;
use storefront_core::ShopError;

/// Application error type for web handlers.
///
/// Server errors keep their cause in `source` for logging; the client only
/// sees a generic message.
///
/// # Examples
///
/// ```ignore
/// async fn handler(State(state): State<AppState<K, P, E>>) -> Result<Json<Value>, AppError> {
///     let order = state.shop.orders.read(id).await?
///         .ok_or_else(|| AppError::not_found("Order"))?;
///     Ok(Json(json!({ "ok": true, "order": order })))
/// }
/// ```
#[derive(Debug)]
pub struct AppError {
    /// HTTP status code
    status: StatusCode,
    /// Error message (user-facing)
    message: String,
    /// Error code (for client error handling)
    code: String,
    /// Internal error (for logging, not exposed to client)
    source: Option<anyhow::Error>,
}

impl AppError {
    /// Create a new application error.
    #[must_use]
    pub const fn new(status: StatusCode, message: String, code: String) -> Self {
        Self {
            status,
            message,
            code,
            source: None,
        }
    }

    /// Create a new error with a source error.
    #[must_use]
    pub fn with_source(mut self, source: anyhow::Error) -> Self {
        self.source = Some(source);
        self
    }

    /// HTTP status of this error.
    #[must_use]
    pub const fn status(&self) -> StatusCode {
        self.status
    }

    /// User-facing message.
    #[must_use]
    pub fn message(&self) -> &str {
        &self.message
    }

    /// Create a 400 Bad Request error.
    #[must_use]
    pub fn bad_request(message: impl Into<String>) -> Self {
        Self::new(StatusCode::BAD_REQUEST, message.into(), "BAD_REQUEST".to_string())
    }

    /// Create a 401 Unauthorized error.
    #[must_use]
    pub fn unauthorized(message: impl Into<String>) -> Self {
        Self::new(StatusCode::UNAUTHORIZED, message.into(), "UNAUTHORIZED".to_string())
    }

    /// Create a 404 Not Found error.
    #[must_use]
    pub fn not_found(resource: impl fmt::Display) -> Self {
        Self::new(
            StatusCode::NOT_FOUND,
            format!("{resource} not found"),
            "NOT_FOUND".to_string(),
        )
    }

    /// Create a 409 Conflict error.
    #[must_use]
    pub fn conflict(message: impl Into<String>) -> Self {
        Self::new(StatusCode::CONFLICT, message.into(), "CONFLICT".to_string())
    }

    /// Create a 429 Too Many Requests error.
    #[must_use]
    pub fn too_many_requests(message: impl Into<String>) -> Self {
        Self::new(
            StatusCode::TOO_MANY_REQUESTS,
            message.into(),
            "RATE_LIMITED".to_string(),
        )
    }

    /// Create a 500 Internal Server Error.
    #[must_use]
    pub fn internal(message: impl Into<String>) -> Self {
        Self::new(
            StatusCode::INTERNAL_SERVER_ERROR,
            message.into(),
            "INTERNAL_SERVER_ERROR".to_string(),
        )
    }
}

impl fmt::Display for AppError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "[{}] {}", self.code, self.message)
    }
}

impl std::error::Error for AppError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        self.source
            .as_ref()
            .map(|e| e.as_ref() as &(dyn std::error::Error + 'static))
    }
}

impl From<ShopError> for AppError {
    fn from(err: ShopError) -> Self {
        match err {
            ShopError::NotFound { resource, .. } => Self::not_found(resource),
            ShopError::InvalidInput(message) => Self::bad_request(message),
            ShopError::Conflict(message) => Self::conflict(message),
            ShopError::Unauthorized => Self::unauthorized("Unauthorized"),
            ShopError::InvalidSignature(message) => Self::new(
                StatusCode::BAD_REQUEST,
                format!("Webhook Error: {message}"),
                "INVALID_SIGNATURE".to_string(),
            ),
            other => Self::internal("Internal server error").with_source(anyhow::Error::new(other)),
        }
    }
}

/// Error response body (JSON).
#[derive(Debug, Serialize)]
struct ErrorResponse {
    /// Always `false`.
    ok: bool,
    /// Error code (for client error handling).
    code: String,
    /// Human-readable error message.
    message: String,
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        if self.status.is_server_error() {
            if let Some(source) = &self.source {
                tracing::error!(
                    status = %self.status,
                    code = %self.code,
                    message = %self.message,
                    error = %source,
                    "Internal server error"
                );
            } else {
                tracing::error!(
                    status = %self.status,
                    code = %self.code,
                    message = %self.message,
                    "Internal server error"
                );
            }
        }

        let body = ErrorResponse {
            ok: false,
            code: self.code,
            message: self.message,
        };

        (self.status, Json(body)).into_response()
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn test_shop_error_mapping() {
        let cases = [
            (ShopError::not_found("Order", "cs_1"), StatusCode::NOT_FOUND, "Order not found"),
            (ShopError::InvalidInput("Out of stock".into()), StatusCode::BAD_REQUEST, "Out of stock"),
            (ShopError::Conflict("nope".into()), StatusCode::CONFLICT, "nope"),
            (ShopError::Unauthorized, StatusCode::UNAUTHORIZED, "Unauthorized"),
            (
                ShopError::InvalidSignature("signature mismatch".into()),
                StatusCode::BAD_REQUEST,
                "Webhook Error: signature mismatch",
            ),
        ];
        for (err, status, message) in cases {
            let app: AppError = err.into();
            assert_eq!(app.status(), status);
            assert_eq!(app.message(), message);
        }
    }

    #[test]
    fn test_collaborator_errors_hide_details() {
        let app: AppError = ShopError::Kv("connection refused to 10.0.0.7".into()).into();
        assert_eq!(app.status(), StatusCode::INTERNAL_SERVER_ERROR);
        assert_eq!(app.message(), "Internal server error");
        assert!(std::error::Error::source(&app).is_some());
    }

    #[tokio::test]
    async fn test_error_body_shape() {
        let response = AppError::conflict("Order has stock conflict").into_response();
        assert_eq!(response.status(), StatusCode::CONFLICT);

        let bytes = axum::body::to_bytes(response.into_body(), usize::MAX).await.unwrap();
        let body: serde_json::Value = serde_json::from_slice(&bytes).unwrap();
        assert_eq!(body["ok"], false);
        assert_eq!(body["code"], "CONFLICT");
        assert_eq!(body["message"], "Order has stock conflict");
    }
}
