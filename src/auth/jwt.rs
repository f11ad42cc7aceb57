//! Minimal JWT inspection.
//!
//! Only the `exp` claim is read. Signatures are not verified; the server
//! remains the authority on validity.

use base64::{engine::general_purpose::URL_SAFE_NO_PAD, Engine};
use chrono::{DateTime, TimeZone, Utc};
use serde::Deserialize;

/// JWT claims for extracting expiration time.
#[derive(Deserialize)]
struct JwtClaims {
    exp: i64,
}

/// Extract the `exp` claim of a JWT as a timestamp.
///
/// Returns `None` if the token is not a JWT or has no numeric `exp`.
pub fn expires_at(token: &str) -> Option<DateTime<Utc>> {
    let payload = token.split('.').nth(1)?;
    // Some issuers pad their segments even though the format says not to.
    let bytes = URL_SAFE_NO_PAD.decode(payload.trim_end_matches('=')).ok()?;
    let claims: JwtClaims = serde_json::from_slice(&bytes).ok()?;
    Utc.timestamp_opt(claims.exp, 0).single()
}

#[cfg(test)]
pub(crate) fn make_token(exp: i64) -> String {
    let header = URL_SAFE_NO_PAD.encode(br#"{"alg":"HS256","typ":"JWT"}"#);
    let payload = URL_SAFE_NO_PAD.encode(format!(r#"{{"sub":"u1","exp":{}}}"#, exp));
    format!("{}.{}.sig", header, payload)
}
