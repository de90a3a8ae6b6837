//! SAPISIDHASH request signing.
//!
//! The remote API authenticates cookie-bearing requests with
//! `Authorization: SAPISIDHASH <timestamp>_<sha1hex>`, where the hash input
//! is exactly `<timestamp><space><secret><space><origin>` as UTF-8. Any
//! deviation in formatting makes the service silently treat the request as
//! unauthenticated, so this module owns the byte-exact construction.

use sha1::{Digest, Sha1};

/// Fixed scheme prefix for the authorization header value.
pub const AUTHORIZATION_SCHEME: &str = "SAPISIDHASH";

/// Errors for request signing.
#[derive(Debug, thiserror::Error)]
pub enum SignerError {
    /// No signing secret was provided. Callers must check
    /// `get_auth_secret` before signing; an empty secret would produce a
    /// well-formed but worthless signature.
    #[error("cannot sign a request without an auth secret")]
    MissingSecret,
}

/// Computes the `<timestamp>_<sha1hex>` signature value.
///
/// `origin` must be the scheme+host origin the request is sent to (see
/// [`origin_of`]); `now` is Unix seconds and is embedded both in the hash
/// input and the output prefix.
///
/// # Errors
///
/// Returns [`SignerError::MissingSecret`] when `secret` is empty.
pub fn sign(secret: &str, origin: &str, now: u64) -> Result<String, SignerError> {
    if secret.is_empty() {
        return Err(SignerError::MissingSecret);
    }

    let input = format!("{now} {secret} {origin}");
    let digest = Sha1::digest(input.as_bytes());
    Ok(format!("{now}_{}", hex_encode(&digest)))
}

/// Builds the full authorization header value, scheme prefix included.
///
/// # Errors
///
/// Returns [`SignerError::MissingSecret`] when `secret` is empty.
pub fn authorization_header(secret: &str, origin: &str, now: u64) -> Result<String, SignerError> {
    let signature = sign(secret, origin, now)?;
    Ok(format!("{AUTHORIZATION_SCHEME} {signature}"))
}

/// Normalizes a request URL to the `scheme://host[:port]` origin used as the
/// signing input.
///
/// Returns `None` for URLs without a host (malformed input never reaches the
/// hash).
#[must_use]
pub fn origin_of(request_url: &str) -> Option<String> {
    let parsed = url::Url::parse(request_url).ok()?;
    let host = parsed.host_str()?.to_lowercase();
    let origin = match parsed.port() {
        Some(port) => format!("{}://{host}:{port}", parsed.scheme()),
        None => format!("{}://{host}", parsed.scheme()),
    };
    Some(origin)
}

fn hex_encode(bytes: &[u8]) -> String {
    const HEX: &[u8; 16] = b"0123456789abcdef";
    let mut out = String::with_capacity(bytes.len() * 2);
    for byte in bytes {
        out.push(char::from(HEX[usize::from(byte >> 4)]));
        out.push(char::from(HEX[usize::from(byte & 0x0f)]));
    }
    out
}
