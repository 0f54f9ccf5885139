//! Verification-free token decoding for constrained execution paths.
//!
//! Middleware running at the platform edge cannot afford (or load) the
//! full signature check on every request, so it peeks at the payload to
//! make coarse routing decisions: redirect to login, pick a portal, warn
//! about imminent expiry. Nothing gated solely on this module may mutate
//! state or disclose data — privileged operations always go through the
//! token service's full verification.

use base64::Engine;
use base64::engine::general_purpose::URL_SAFE_NO_PAD;
use chrono::{Duration, Utc};
use serde::Deserialize;

/// Claims an edge check relies on. All fields are required: a payload
/// missing any of them is rejected rather than partially trusted.
#[derive(Debug, Clone, Deserialize)]
pub struct EdgeClaims {
    pub sub: String,
    pub email: String,
    pub role: String,
    pub exp: i64,
}

/// Decodes the payload segment of a JWT without verifying its signature.
///
/// Returns `None` unless the token has exactly three dot-separated
/// segments, the middle segment is valid base64url JSON, every required
/// field is present, and the expiry is still in the future. Never panics
/// on malformed input.
pub fn decode_unverified(token: &str) -> Option<EdgeClaims> {
    let mut segments = token.split('.');
    let _header = segments.next()?;
    let payload = segments.next()?;
    let _signature = segments.next()?;
    if segments.next().is_some() {
        return None;
    }

    let bytes = URL_SAFE_NO_PAD.decode(payload).ok()?;
    let claims: EdgeClaims = serde_json::from_slice(&bytes).ok()?;

    if claims.exp <= Utc::now().timestamp() {
        return None;
    }

    Some(claims)
}

/// True when the token expires within `buffer_minutes` — or cannot be
/// decoded at all. Failing toward "expiring" sends the client back through
/// re-authentication instead of trusting a malformed token.
pub fn is_expiring_soon(token: &str, buffer_minutes: i64) -> bool {
    match decode_unverified(token) {
        Some(claims) => {
            let threshold = (Utc::now() + Duration::minutes(buffer_minutes)).timestamp();
            claims.exp <= threshold
        }
        None => true,
    }
}
