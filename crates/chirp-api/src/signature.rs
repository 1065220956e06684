//! Push webhook signature verification
//!
//! The sender signs the raw request body with HMAC keyed by the shared
//! secret and sends the hex digest in a header:
//!
//! - `X-Hub-Signature-256: sha256=<hex>` (preferred)
//! - `X-Hub-Signature: sha1=<hex>` (legacy)
//!
//! When both are present only the SHA-256 header is checked. Digests are
//! compared in constant time.

use axum::http::HeaderMap;
use hmac::digest::KeyInit;
use hmac::{Hmac, Mac};
use sha1::Sha1;
use sha2::Sha256;

use crate::error::ApiError;

pub const SHA256_HEADER: &str = "x-hub-signature-256";
pub const SHA1_HEADER: &str = "x-hub-signature";

const SHA256_PREFIX: &str = "sha256=";
const SHA1_PREFIX: &str = "sha1=";

/// Check the body against whichever signature header is present.
///
/// # Errors
///
/// - `MissingSignature`: neither header is present
/// - `SignatureMismatch`: the header is malformed or the digest differs
pub fn verify_hub_signature(secret: &str, headers: &HeaderMap, body: &[u8]) -> Result<(), ApiError> {
    if let Some(signature) = header_value(headers, SHA256_HEADER) {
        return verify::<Hmac<Sha256>>(secret, signature, SHA256_PREFIX, body);
    }
    if let Some(signature) = header_value(headers, SHA1_HEADER) {
        return verify::<Hmac<Sha1>>(secret, signature, SHA1_PREFIX, body);
    }
    Err(ApiError::MissingSignature)
}

/// `sha256=<hex>` signature of `body`, as a sender would compute it.
pub fn sign_sha256(secret: &str, body: &[u8]) -> String {
    format!("{}{}", SHA256_PREFIX, hex::encode(digest::<Hmac<Sha256>>(secret, body)))
}

/// `sha1=<hex>` signature of `body`, as a legacy sender would compute it.
pub fn sign_sha1(secret: &str, body: &[u8]) -> String {
    format!("{}{}", SHA1_PREFIX, hex::encode(digest::<Hmac<Sha1>>(secret, body)))
}

fn header_value<'a>(headers: &'a HeaderMap, name: &str) -> Option<&'a str> {
    headers.get(name).and_then(|v| v.to_str().ok())
}

fn keyed<M: Mac + KeyInit>(secret: &str) -> M {
    <M as KeyInit>::new_from_slice(secret.as_bytes()).expect("HMAC accepts keys of any length")
}

fn digest<M: Mac + KeyInit>(secret: &str, body: &[u8]) -> Vec<u8> {
    let mut mac = keyed::<M>(secret);
    mac.update(body);
    mac.finalize().into_bytes().to_vec()
}

fn verify<M: Mac + KeyInit>(
    secret: &str,
    signature: &str,
    prefix: &str,
    body: &[u8],
) -> Result<(), ApiError> {
    let expected = signature
        .trim()
        .strip_prefix(prefix)
        .and_then(|digest| hex::decode(digest).ok())
        .ok_or(ApiError::SignatureMismatch)?;

    let mut mac = keyed::<M>(secret);
    mac.update(body);
    mac.verify_slice(&expected).map_err(|_| ApiError::SignatureMismatch)
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::http::HeaderValue;

    const SECRET: &str = "It's a Secret to Everybody";
    const BODY: &[u8] = b"Hello, World!";

    fn headers(name: &'static str, value: &str) -> HeaderMap {
        let mut headers = HeaderMap::new();
        headers.insert(name, HeaderValue::from_str(value).unwrap());
        headers
    }

    #[test]
    fn test_known_sha256_digest() {
        assert_eq!(
            sign_sha256(SECRET, BODY),
            "sha256=757107ea0eb2509fc211221cce984b8a37570b6d7586c22c46f4379c8b043e17"
        );
    }

    #[test]
    fn test_sha256_round_trip() {
        let signature = sign_sha256(SECRET, BODY);
        assert!(verify_hub_signature(SECRET, &headers(SHA256_HEADER, &signature), BODY).is_ok());
    }

    #[test]
    fn test_sha1_legacy_header() {
        let signature = sign_sha1(SECRET, BODY);
        assert!(verify_hub_signature(SECRET, &headers(SHA1_HEADER, &signature), BODY).is_ok());
    }

    #[test]
    fn test_mismatch() {
        let signature = sign_sha256("other secret", BODY);
        assert!(matches!(
            verify_hub_signature(SECRET, &headers(SHA256_HEADER, &signature), BODY),
            Err(ApiError::SignatureMismatch)
        ));

        let signature = sign_sha256(SECRET, BODY);
        assert!(matches!(
            verify_hub_signature(SECRET, &headers(SHA256_HEADER, &signature), b"tampered"),
            Err(ApiError::SignatureMismatch)
        ));
    }

    #[test]
    fn test_malformed_header() {
        assert!(matches!(
            verify_hub_signature(SECRET, &headers(SHA256_HEADER, "md5=abcd"), BODY),
            Err(ApiError::SignatureMismatch)
        ));
        assert!(matches!(
            verify_hub_signature(SECRET, &headers(SHA256_HEADER, "sha256=zz"), BODY),
            Err(ApiError::SignatureMismatch)
        ));
    }

    #[test]
    fn test_missing_header() {
        assert!(matches!(
            verify_hub_signature(SECRET, &HeaderMap::new(), BODY),
            Err(ApiError::MissingSignature)
        ));
    }
}
