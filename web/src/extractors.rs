//! Custom Axum extractors.
//!
//! - [`CorrelationId`]: the request's correlation id
//! - [`ClientIp`]: client address from proxy headers, for rate limiting
//! - [`Submission`]: a JSON or form body as one JSON value
//! - [`AdminSession`]: rejects requests without a valid admin cookie

use crate::error::AppError;
use axum::{
    async_trait,
    body::Bytes,
    extract::{FromRef, FromRequest, FromRequestParts, Request},
    http::{header, request::Parts, HeaderMap},
};
use serde_json::{Map, Value};
use std::sync::Arc;
use storefront_commerce::admin_session::{read_cookie, ADMIN_SESSION_COOKIE};
use storefront_commerce::AdminSessions;
use uuid::Uuid;

/// Correlation ID for request tracing.
///
/// Uses the id stored by the correlation middleware, then the
/// `X-Correlation-ID` header, then a fresh UUID v4.
#[derive(Debug, Clone, Copy)]
pub struct CorrelationId(pub Uuid);

#[async_trait]
impl<S> FromRequestParts<S> for CorrelationId
where
    S: Send + Sync,
{
    type Rejection = std::convert::Infallible;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        let correlation_id = parts
            .extensions
            .get::<Uuid>()
            .copied()
            .or_else(|| {
                parts
                    .headers
                    .get(crate::middleware::CORRELATION_ID_HEADER)
                    .and_then(|v| v.to_str().ok())
                    .and_then(|s| Uuid::parse_str(s).ok())
            })
            .unwrap_or_else(Uuid::new_v4);

        Ok(Self(correlation_id))
    }
}

/// Client address as reported by the edge proxy.
///
/// # Priority
///
/// 1. `X-Real-IP`
/// 2. `CF-Connecting-IP`
/// 3. `Fly-Client-IP`
/// 4. `X-Forwarded-For` (first entry)
/// 5. `"unknown"`
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ClientIp(pub String);

#[async_trait]
impl<S> FromRequestParts<S> for ClientIp
where
    S: Send + Sync,
{
    type Rejection = std::convert::Infallible;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        Ok(Self(extract_client_ip(&parts.headers)))
    }
}

fn extract_client_ip(headers: &HeaderMap) -> String {
    let header_value = |name: &str| {
        headers
            .get(name)
            .and_then(|v| v.to_str().ok())
            .map(str::trim)
            .filter(|v| !v.is_empty())
    };

    ["x-real-ip", "cf-connecting-ip", "fly-client-ip"]
        .into_iter()
        .find_map(header_value)
        .or_else(|| {
            header_value("x-forwarded-for")
                .and_then(|list| list.split(',').next())
                .map(str::trim)
                .filter(|v| !v.is_empty())
        })
        .unwrap_or("unknown")
        .to_string()
}

/// A submitted body, JSON or `application/x-www-form-urlencoded`.
///
/// Form fields become string values of a JSON object, so handlers read
/// both the same way. `is_json` tells them which one arrived, since some
/// responses differ (JSON callers get JSON, forms get a redirect).
#[derive(Debug, Clone, PartialEq)]
pub struct Submission {
    /// The body as a JSON value.
    pub value: Value,
    /// `true` if the body was JSON.
    pub is_json: bool,
}

impl Submission {
    /// A non-empty, trimmed string field.
    #[must_use]
    pub fn text(&self, key: &str) -> Option<&str> {
        self.value
            .get(key)
            .and_then(Value::as_str)
            .map(str::trim)
            .filter(|s| !s.is_empty())
    }
}

#[async_trait]
impl<S> FromRequest<S> for Submission
where
    S: Send + Sync,
{
    type Rejection = AppError;

    async fn from_request(req: Request, state: &S) -> Result<Self, Self::Rejection> {
        let is_json = req
            .headers()
            .get(header::CONTENT_TYPE)
            .and_then(|v| v.to_str().ok())
            .is_some_and(|ct| ct.starts_with("application/json"));

        let body = Bytes::from_request(req, state)
            .await
            .map_err(|_| AppError::bad_request("Invalid payload"))?;

        let value = if is_json {
            if body.is_empty() {
                Value::Object(Map::new())
            } else {
                serde_json::from_slice(&body).map_err(|_| AppError::bad_request("Invalid payload"))?
            }
        } else {
            let fields: Vec<(String, String)> =
                serde_urlencoded::from_bytes(&body).map_err(|_| AppError::bad_request("Invalid payload"))?;
            Value::Object(
                fields
                    .into_iter()
                    .map(|(key, value)| (key, Value::String(value)))
                    .collect(),
            )
        };

        Ok(Self { value, is_json })
    }
}

/// Proof of a valid admin session cookie.
///
/// Rejects with 401 when the cookie is missing, expired or forged.
#[derive(Debug, Clone, Copy)]
pub struct AdminSession;

#[async_trait]
impl<S> FromRequestParts<S> for AdminSession
where
    S: Send + Sync,
    Arc<AdminSessions>: FromRef<S>,
{
    type Rejection = AppError;

    async fn from_request_parts(parts: &mut Parts, state: &S) -> Result<Self, Self::Rejection> {
        let sessions = Arc::<AdminSessions>::from_ref(state);
        let valid = parts
            .headers
            .get_all(header::COOKIE)
            .iter()
            .filter_map(|v| v.to_str().ok())
            .filter_map(|cookies| read_cookie(cookies, ADMIN_SESSION_COOKIE))
            .any(|token| sessions.verify(token));

        if valid {
            Ok(Self)
        } else {
            Err(AppError::unauthorized("Unauthorized"))
        }
    }
}
