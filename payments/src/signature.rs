//! Webhook signature verification.
//!
//! The processor signs `"{timestamp}.{body}"` with HMAC-SHA256 under the
//! endpoint secret and sends `t=<timestamp>,v1=<hex>[,v1=<hex>...]` in the
//! signature header. A signature is accepted when any `v1` entry matches
//! and the timestamp is within the tolerance of the current time.

use constant_time_eq::constant_time_eq;
use hmac::{Hmac, Mac};
use sha2::Sha256;
use storefront_core::{Result, ShopError};

type HmacSha256 = Hmac<Sha256>;

/// Maximum age of a signed payload.
pub const DEFAULT_TOLERANCE_SECS: i64 = 300;

/// Parsed signature header.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SignatureHeader {
    /// Signing time in unix seconds.
    pub timestamp: i64,
    /// Hex-encoded `v1` signatures.
    pub signatures: Vec<String>,
}

impl SignatureHeader {
    /// Parse `t=..,v1=..`. Unknown schemes are skipped.
    ///
    /// # Errors
    ///
    /// Returns [`ShopError::InvalidSignature`] when the timestamp or every
    /// `v1` entry is missing.
    pub fn parse(header: &str) -> Result<Self> {
        let mut timestamp = None;
        let mut signatures = Vec::new();

        for part in header.split(',') {
            let Some((scheme, value)) = part.trim().split_once('=') else {
                continue;
            };
            match scheme {
                "t" => timestamp = value.parse::<i64>().ok(),
                "v1" if !value.is_empty() => signatures.push(value.to_string()),
                _ => {}
            }
        }

        let timestamp = timestamp
            .ok_or_else(|| ShopError::InvalidSignature("missing timestamp".into()))?;
        if signatures.is_empty() {
            return Err(ShopError::InvalidSignature("missing v1 signature".into()));
        }
        Ok(Self { timestamp, signatures })
    }
}

/// Hex HMAC-SHA256 of `"{timestamp}.{payload}"`.
#[must_use]
pub fn compute_signature(secret: &str, timestamp: i64, payload: &[u8]) -> String {
    // HMAC takes keys of any length.
    let Ok(mut mac) = HmacSha256::new_from_slice(secret.as_bytes()) else {
        return String::new();
    };
    mac.update(timestamp.to_string().as_bytes());
    mac.update(b".");
    mac.update(payload);
    hex::encode(mac.finalize().into_bytes())
}

/// Verify a signature header against a payload at `now_unix`.
///
/// # Errors
///
/// Returns [`ShopError::InvalidSignature`] for malformed headers, stale
/// timestamps and mismatched signatures.
pub fn verify_at(
    payload: &[u8],
    header: &str,
    secret: &str,
    now_unix: i64,
    tolerance_secs: i64,
) -> Result<()> {
    let parsed = SignatureHeader::parse(header)?;

    if (now_unix - parsed.timestamp).abs() > tolerance_secs {
        tracing::warn!(
            timestamp = parsed.timestamp,
            now = now_unix,
            "Webhook timestamp outside tolerance"
        );
        return Err(ShopError::InvalidSignature("timestamp outside tolerance".into()));
    }

    let expected = compute_signature(secret, parsed.timestamp, payload);
    let matched = parsed
        .signatures
        .iter()
        .any(|candidate| constant_time_eq(candidate.as_bytes(), expected.as_bytes()));

    if matched {
        Ok(())
    } else {
        tracing::warn!("Webhook signature mismatch");
        Err(ShopError::InvalidSignature("signature mismatch".into()))
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    const SECRET: &str = "whsec_test_secret";
    const NOW: i64 = 1_700_000_000;

    fn header(timestamp: i64, payload: &[u8]) -> String {
        format!("t={timestamp},v1={}", compute_signature(SECRET, timestamp, payload))
    }

    #[test]
    fn test_valid_signature() {
        let payload = br#"{"type":"checkout.session.completed"}"#;
        assert!(verify_at(payload, &header(NOW, payload), SECRET, NOW, 300).is_ok());
    }

    #[test]
    fn test_modified_payload_fails() {
        let payload = br#"{"amount":100}"#;
        let signed = header(NOW, payload);
        let result = verify_at(br#"{"amount":999}"#, &signed, SECRET, NOW, 300);
        assert!(matches!(result, Err(ShopError::InvalidSignature(_))));
    }

    #[test]
    fn test_wrong_secret_fails() {
        let payload = b"{}";
        let result = verify_at(payload, &header(NOW, payload), "whsec_other", NOW, 300);
        assert!(result.is_err());
    }

    #[test]
    fn test_old_timestamp_fails() {
        let payload = b"{}";
        let signed = header(NOW - 600, payload);
        assert!(verify_at(payload, &signed, SECRET, NOW, 300).is_err());
        assert!(verify_at(payload, &signed, SECRET, NOW - 500, 300).is_ok());
    }

    #[test]
    fn test_any_v1_entry_may_match() {
        let payload = b"{}";
        let good = compute_signature(SECRET, NOW, payload);
        let signed = format!("t={NOW},v0=legacy,v1=deadbeef,v1={good}");
        assert!(verify_at(payload, &signed, SECRET, NOW, 300).is_ok());
    }

    #[test]
    fn test_malformed_headers() {
        assert!(SignatureHeader::parse("").is_err());
        assert!(SignatureHeader::parse("v1=abc").is_err());
        assert!(SignatureHeader::parse("t=123").is_err());
        assert!(SignatureHeader::parse("t=abc,v1=def").is_err());
        assert_eq!(
            SignatureHeader::parse("t=123, v1=abc").unwrap(),
            SignatureHeader {
                timestamp: 123,
                signatures: vec!["abc".into()],
            }
        );
    }
}
