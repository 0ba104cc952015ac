//! # Authentication Module
//!
//! Two separate concerns live here:
//!
//! - Service access: if `FASHIONOS_API_KEY` is set, every request except
//!   `/health` must carry `Authorization: Bearer <key>`.
//! - Organizer identity: the upstream auth provider forwards the signed-in
//!   user as an `X-User-Id` header, read into an [`AuthContext`].

use axum::{
    body::Body,
    http::{HeaderMap, Request, StatusCode, header},
    middleware::Next,
    response::Response,
};
use fashionos_core::AuthContext;
use subtle::ConstantTimeEq;

/// Header carrying the signed-in organizer id (lower case for `HeaderName`).
pub const USER_ID_HEADER: &str = "x-user-id";

// =============================================================================
// ORGANIZER IDENTITY
// =============================================================================

/// Signed in when `X-User-Id` is present and non-blank, anonymous otherwise.
pub fn auth_context(headers: &HeaderMap) -> AuthContext {
    headers
        .get(USER_ID_HEADER)
        .and_then(|v| v.to_str().ok())
        .map(str::trim)
        .filter(|id| !id.is_empty())
        .map_or_else(AuthContext::anonymous, AuthContext::signed_in)
}

// =============================================================================
// API KEY AUTHENTICATION
// =============================================================================

/// `FASHIONOS_API_KEY`, if set and non-empty.
pub fn get_api_key_from_env() -> Option<String> {
    std::env::var("FASHIONOS_API_KEY")
        .ok()
        .filter(|k| !k.is_empty())
}

/// Constant-time key comparison. Both sides are padded to the same length
/// so the comparison time does not depend on where they differ.
fn keys_match(provided: &[u8], expected: &[u8]) -> bool {
    let width = provided.len().max(expected.len());
    let pad = |bytes: &[u8]| {
        let mut out = vec![0u8; width];
        out[..bytes.len()].copy_from_slice(bytes);
        out
    };
    let same_bytes: bool = pad(provided).ct_eq(&pad(expected)).into();
    same_bytes && provided.len() == expected.len()
}

/// Reject requests without the configured API key. `/health` is exempt.
pub async fn api_key_auth_middleware(
    request: Request<Body>,
    next: Next,
) -> Result<Response, (StatusCode, &'static str)> {
    let Some(expected) = get_api_key_from_env() else {
        return Ok(next.run(request).await);
    };
    if request.uri().path() == "/health" {
        return Ok(next.run(request).await);
    }

    let provided = request
        .headers()
        .get(header::AUTHORIZATION)
        .and_then(|v| v.to_str().ok())
        .map(|v| v.strip_prefix("Bearer ").unwrap_or(v));

    match provided {
        Some(key) if keys_match(key.as_bytes(), expected.as_bytes()) => {
            Ok(next.run(request).await)
        }
        Some(_) => {
            tracing::warn!(
                event = "auth_failure",
                reason = "invalid_api_key",
                "Authentication failed: invalid API key"
            );
            Err((StatusCode::UNAUTHORIZED, "Unauthorized"))
        }
        None => {
            tracing::warn!(
                event = "auth_failure",
                reason = "missing_authorization_header",
                "Missing Authorization header"
            );
            Err((StatusCode::UNAUTHORIZED, "Unauthorized"))
        }
    }
}

// =============================================================================
// TESTS
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use axum::http::HeaderValue;

    #[test]
    fn keys_match_requires_equal_length() {
        assert!(keys_match(b"secret", b"secret"));
        assert!(!keys_match(b"secret", b"secret\0"));
        assert!(!keys_match(b"", b"secret"));
        assert!(!keys_match(b"secreT", b"secret"));
    }

    #[test]
    fn user_header_signs_in() {
        let mut headers = HeaderMap::new();
        assert_eq!(auth_context(&headers), AuthContext::anonymous());

        headers.insert(USER_ID_HEADER, HeaderValue::from_static("   "));
        assert!(!auth_context(&headers).is_signed_in);

        headers.insert(USER_ID_HEADER, HeaderValue::from_static(" user_42 "));
        assert_eq!(auth_context(&headers).user_id(), Some("user_42"));
    }
}
