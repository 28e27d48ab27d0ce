//! Unverified identity claims, for display only.
//!
//! Nothing here checks a signature. The claims are only as trustworthy as the
//! exchange that produced the token and must never be used to authorize.

use base64::{engine::general_purpose::URL_SAFE_NO_PAD, Engine};
use serde_json::{Map, Value};

/// Decoded JWT payload.
pub type Claims = Map<String, Value>;

/// Decode the payload segment of a three-part dot-separated token.
///
/// Returns `None` for anything malformed: wrong segment count, bad base64,
/// or a payload that is not a JSON object.
pub fn decode_identity_claims(token: &str) -> Option<Claims> {
    let segments: Vec<&str> = token.split('.').collect();
    if segments.len() != 3 {
        return None;
    }

    let payload = segments[1].trim_end_matches('=');
    let bytes = URL_SAFE_NO_PAD.decode(payload).ok()?;
    match serde_json::from_slice(&bytes).ok()? {
        Value::Object(claims) => Some(claims),
        _ => None,
    }
}

/// Pick a user-facing identity for a freshly issued token set.
///
/// Prefers the identity token (`email`, then `preferred_username`); without
/// one, falls back to the access token (`email`, then `sub`).
pub fn resolve_display_identity(id_token: Option<&str>, access_token: &str) -> Option<String> {
    match id_token {
        Some(id_token) => {
            let claims = decode_identity_claims(id_token)?;
            first_claim(&claims, &["email", "preferred_username"])
        }
        None => {
            let claims = decode_identity_claims(access_token)?;
            first_claim(&claims, &["email", "sub"])
        }
    }
}

fn first_claim(claims: &Claims, names: &[&str]) -> Option<String> {
    names
        .iter()
        .filter_map(|name| claims.get(*name).and_then(Value::as_str))
        .find(|value| !value.is_empty())
        .map(str::to_string)
}

#[cfg(test)]
pub(crate) fn encode_test_token(claims: &Value) -> String {
    let header = URL_SAFE_NO_PAD.encode(br#"{"alg":"none","typ":"JWT"}"#);
    let payload = URL_SAFE_NO_PAD.encode(claims.to_string());
    format!("{header}.{payload}.signature")
}
