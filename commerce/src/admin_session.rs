//! Stateless admin sessions.
//!
//! A session token is `{exp}.{nonce}.{sig}`: expiry in unix seconds, a
//! random 16-byte nonce and an HMAC-SHA256 over `{exp}.{nonce}`, both
//! base64url without padding. Nothing is stored server side; rotating the
//! secret logs every admin out.

use base64::engine::general_purpose::URL_SAFE_NO_PAD;
use base64::Engine;
use hmac::{Hmac, Mac};
use rand::RngCore;
use sha2::Sha256;
use std::sync::Arc;
use storefront_core::{Clock, Result, ShopError};
use tracing::{info, warn};

type HmacSha256 = Hmac<Sha256>;

/// Cookie carrying the session token.
pub const ADMIN_SESSION_COOKIE: &str = "storefront_admin_session";

/// Session lifetime: 12 hours.
pub const ADMIN_SESSION_TTL_SECS: i64 = 60 * 60 * 12;

const NONCE_BYTES: usize = 16;

/// Issues and verifies admin session tokens.
#[derive(Clone)]
pub struct AdminSessions {
    admin_token: String,
    secret: Vec<u8>,
    clock: Arc<dyn Clock>,
}

impl std::fmt::Debug for AdminSessions {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AdminSessions").finish_non_exhaustive()
    }
}

impl AdminSessions {
    /// Create the service.
    ///
    /// `session_secret` signs tokens; without one the admin password is
    /// used as the key.
    ///
    /// # Errors
    ///
    /// Returns [`ShopError::Config`] if the admin password is empty.
    pub fn new(admin_token: &str, session_secret: Option<&str>, clock: Arc<dyn Clock>) -> Result<Self> {
        let admin_token = admin_token.trim();
        if admin_token.is_empty() {
            return Err(ShopError::Config("ADMIN_TOKEN is required".into()));
        }
        let secret = session_secret
            .map(str::trim)
            .filter(|s| !s.is_empty())
            .unwrap_or(admin_token);
        Ok(Self {
            admin_token: admin_token.to_string(),
            secret: secret.as_bytes().to_vec(),
            clock,
        })
    }

    /// Check the password and issue a token.
    ///
    /// # Errors
    ///
    /// Returns [`ShopError::Unauthorized`] for a wrong or empty password.
    pub fn login(&self, password: &str) -> Result<String> {
        let password = password.trim();
        if password.is_empty()
            || !constant_time_eq::constant_time_eq(password.as_bytes(), self.admin_token.as_bytes())
        {
            warn!("Admin login rejected");
            return Err(ShopError::Unauthorized);
        }
        let token = self.issue();
        info!("Admin session issued");
        Ok(token)
    }

    /// Issue a token valid for [`ADMIN_SESSION_TTL_SECS`].
    #[must_use]
    pub fn issue(&self) -> String {
        let exp = self.clock.unix_seconds() + ADMIN_SESSION_TTL_SECS;
        let mut nonce = [0u8; NONCE_BYTES];
        rand::thread_rng().fill_bytes(&mut nonce);
        let payload = format!("{exp}.{}", URL_SAFE_NO_PAD.encode(nonce));
        let signature = URL_SAFE_NO_PAD.encode(self.sign(&payload));
        format!("{payload}.{signature}")
    }

    /// Returns `true` for a well-formed, unexpired token with a valid
    /// signature.
    #[must_use]
    pub fn verify(&self, token: &str) -> bool {
        let mut parts = token.split('.');
        let (Some(exp), Some(nonce), Some(signature), None) =
            (parts.next(), parts.next(), parts.next(), parts.next())
        else {
            return false;
        };
        let Ok(exp_secs) = exp.parse::<i64>() else {
            return false;
        };
        if nonce.is_empty() || signature.is_empty() || exp_secs < self.clock.unix_seconds() {
            return false;
        }
        let Ok(signature) = URL_SAFE_NO_PAD.decode(signature) else {
            return false;
        };
        let Ok(mut mac) = HmacSha256::new_from_slice(&self.secret) else {
            return false;
        };
        mac.update(format!("{exp}.{nonce}").as_bytes());
        mac.verify_slice(&signature).is_ok()
    }

    fn sign(&self, payload: &str) -> Vec<u8> {
        // HMAC accepts keys of any length.
        HmacSha256::new_from_slice(&self.secret).map_or_else(
            |_| Vec::new(),
            |mut mac| {
                mac.update(payload.as_bytes());
                mac.finalize().into_bytes().to_vec()
            },
        )
    }
}

/// Find a cookie value in a `Cookie` header.
#[must_use]
pub fn read_cookie<'a>(header: &'a str, name: &str) -> Option<&'a str> {
    header.split(';').find_map(|part| {
        part.trim()
            .strip_prefix(name)
            .and_then(|rest| rest.strip_prefix('='))
    })
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use storefront_testing::FixedClock;

    fn sessions(clock: &Arc<FixedClock>) -> AdminSessions {
        AdminSessions::new("hunter2", Some("session-secret"), clock.clone()).unwrap()
    }

    #[test]
    fn test_login_issues_verifiable_token() {
        let clock = Arc::new(FixedClock::at_unix(1_000));
        let sessions = sessions(&clock);
        let token = sessions.login(" hunter2 ").unwrap();
        assert_eq!(token.split('.').count(), 3);
        assert!(token.starts_with("44200."));
        assert!(sessions.verify(&token));
    }

    #[test]
    fn test_wrong_password_is_rejected() {
        let clock = Arc::new(FixedClock::at_unix(0));
        let sessions = sessions(&clock);
        assert_eq!(sessions.login("hunter3"), Err(ShopError::Unauthorized));
        assert_eq!(sessions.login(""), Err(ShopError::Unauthorized));
    }

    #[test]
    fn test_expired_and_tampered_tokens_fail() {
        let clock = Arc::new(FixedClock::at_unix(0));
        let sessions = sessions(&clock);
        let token = sessions.issue();

        let mut tampered = token.clone();
        tampered.replace_range(0..1, "9");
        assert!(!sessions.verify(&tampered));
        assert!(!sessions.verify("1.2"));
        assert!(!sessions.verify("x.y.z"));
        assert!(!sessions.verify(&format!("{token}.extra")));

        clock.advance_secs(ADMIN_SESSION_TTL_SECS + 1);
        assert!(!sessions.verify(&token));
    }

    #[test]
    fn test_secret_falls_back_to_admin_token() {
        let clock = Arc::new(FixedClock::at_unix(0));
        let a = AdminSessions::new("pw", None, clock.clone()).unwrap();
        let b = AdminSessions::new("pw", Some("pw"), clock.clone()).unwrap();
        assert!(b.verify(&a.issue()));
        assert!(AdminSessions::new(" ", None, clock).is_err());
    }

    #[test]
    fn test_read_cookie() {
        let header = "theme=dark; storefront_admin_session=abc.def.ghi; other=1";
        assert_eq!(read_cookie(header, ADMIN_SESSION_COOKIE), Some("abc.def.ghi"));
        assert_eq!(read_cookie(header, "missing"), None);
        assert_eq!(read_cookie("storefront_admin_sessionX=1", ADMIN_SESSION_COOKIE), None);
    }
}
