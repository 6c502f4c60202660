//! Webhook Basic-Auth verification.
//!
//! The vendor can only authenticate event webhooks with HTTP Basic
//! credentials embedded in the callback URL, so inbound requests are
//! checked against the cached per-account credential set.

use base64::{engine::general_purpose::STANDARD as BASE64, Engine as _};
use tracing::warn;

/// Scheme marker required on the Authorization header.
const BASIC_PREFIX: &str = "Basic";

/// Verify an Authorization header against the credential set.
///
/// Succeeds only when the base64 payload exactly matches the encoding
/// of one `user:pass` entry. Absent, non-Basic, or structurally
/// malformed headers fail.
pub fn authenticate_header(header: Option<&str>, credentials: &[String]) -> bool {
    // No header at all: a stray probe, not worth logging
    let header = match header {
        Some(value) => value,
        None => return false,
    };

    if !header.starts_with(BASIC_PREFIX) {
        return false;
    }

    let mut parts = header.splitn(2, ' ');
    let _scheme = parts.next();
    let payload = match parts.next() {
        Some(payload) => payload,
        None => {
            // Known hardening concern: this logs the raw header value,
            // which may contain credential material.
            warn!(header = %header, "webhook_auth_malformed_header");
            return false;
        }
    };

    for credential in credentials {
        let expected = BASE64.encode(credential);
        if constant_time_compare(&expected, payload) {
            return true;
        }
    }

    warn!("webhook_auth_no_match");
    false
}

/// Constant-time string comparison to prevent timing attacks.
fn constant_time_compare(a: &str, b: &str) -> bool {
    if a.len() != b.len() {
        return false;
    }

    let mut result = 0u8;
    for (x, y) in a.bytes().zip(b.bytes()) {
        result |= x ^ y;
    }
    result == 0
}

#[cfg(test)]
mod tests {
    use super::*;

    fn creds(values: &[&str]) -> Vec<String> {
        values.iter().map(|v| v.to_string()).collect()
    }

    fn basic(credential: &str) -> String {
        format!("Basic {}", BASE64.encode(credential))
    }

    #[test]
    fn test_missing_header_fails() {
        assert!(!authenticate_header(None, &creds(&["user:pass"])));
    }

    #[test]
    fn test_non_basic_scheme_fails() {
        let header = format!("Bearer {}", BASE64.encode("user:pass"));
        assert!(!authenticate_header(Some(&header), &creds(&["user:pass"])));
    }

    #[test]
    fn test_missing_payload_fails() {
        assert!(!authenticate_header(Some("Basic"), &creds(&["user:pass"])));
    }

    #[test]
    fn test_matching_credential_succeeds() {
        let header = basic("user:pass");
        assert!(authenticate_header(
            Some(&header),
            &creds(&["other:cred", "user:pass"])
        ));
    }

    #[test]
    fn test_non_matching_credential_fails() {
        let header = basic("user:wrong");
        assert!(!authenticate_header(Some(&header), &creds(&["user:pass"])));
    }

    #[test]
    fn test_empty_credential_set_fails() {
        let header = basic("user:pass");
        assert!(!authenticate_header(Some(&header), &[]));
    }

    #[test]
    fn test_raw_credential_payload_fails() {
        // Payload must be base64, not the raw user:pass string
        assert!(!authenticate_header(
            Some("Basic user:pass"),
            &creds(&["user:pass"])
        ));
    }

    #[test]
    fn test_constant_time_compare() {
        assert!(constant_time_compare("abc", "abc"));
        assert!(!constant_time_compare("abc", "abd"));
        assert!(!constant_time_compare("abc", "abcd"));
    }
}
