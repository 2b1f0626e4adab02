//! Response pieces shared by several handlers.

use axum::{
    http::{header, HeaderName, HeaderValue},
    response::{IntoResponseParts, ResponseParts},
};
use storefront_commerce::admin_session::{ADMIN_SESSION_COOKIE, ADMIN_SESSION_TTL_SECS};
use storefront_commerce::RateLimitDecision;

/// `x-ratelimit-limit`
pub const RATE_LIMIT_LIMIT: HeaderName = HeaderName::from_static("x-ratelimit-limit");
/// `x-ratelimit-remaining`
pub const RATE_LIMIT_REMAINING: HeaderName = HeaderName::from_static("x-ratelimit-remaining");

/// Rate-limit headers, added to every response of a limited route.
#[derive(Debug, Clone, Copy)]
pub struct RateLimitHeaders(pub RateLimitDecision);

impl IntoResponseParts for RateLimitHeaders {
    type Error = std::convert::Infallible;

    fn into_response_parts(self, mut res: ResponseParts) -> Result<ResponseParts, Self::Error> {
        let decision = self.0;
        let headers = res.headers_mut();
        headers.insert(RATE_LIMIT_LIMIT, HeaderValue::from(decision.limit));
        headers.insert(RATE_LIMIT_REMAINING, HeaderValue::from(decision.remaining));
        headers.insert(header::RETRY_AFTER, HeaderValue::from(decision.retry_after_secs));
        Ok(res)
    }
}

/// `Set-Cookie` value carrying a session token.
#[must_use]
pub fn session_cookie(token: &str, secure: bool) -> String {
    cookie(token, ADMIN_SESSION_TTL_SECS, secure)
}

/// `Set-Cookie` value that clears the session.
#[must_use]
pub fn cleared_session_cookie(secure: bool) -> String {
    cookie("", 0, secure)
}

fn cookie(value: &str, max_age: i64, secure: bool) -> String {
    let secure = if secure { "; Secure" } else { "" };
    format!("{ADMIN_SESSION_COOKIE}={value}; Path=/; HttpOnly; SameSite=Strict; Max-Age={max_age}{secure}")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_session_cookie_attributes() {
        assert_eq!(
            session_cookie("abc", true),
            "storefront_admin_session=abc; Path=/; HttpOnly; SameSite=Strict; Max-Age=43200; Secure"
        );
        assert_eq!(
            cleared_session_cookie(false),
            "storefront_admin_session=; Path=/; HttpOnly; SameSite=Strict; Max-Age=0"
        );
    }
}
