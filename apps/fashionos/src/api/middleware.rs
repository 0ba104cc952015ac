//! # Middleware Module
//!
//! Global request rate limiting, configured by `FASHIONOS_RATE_LIMIT`
//! (requests per second, default 100, `0` disables the limiter).

use axum::{
    body::Body,
    extract::State,
    http::{Request, StatusCode},
    middleware::Next,
    response::Response,
};
use governor::{
    Quota, RateLimiter,
    clock::DefaultClock,
    state::{InMemoryState, NotKeyed},
};
use std::num::NonZeroU32;
use std::sync::Arc;

const DEFAULT_RPS: u32 = 100;

/// One limiter shared by every route.
pub type GlobalRateLimiter = Arc<RateLimiter<NotKeyed, InMemoryState, DefaultClock>>;

/// Limiter allowing `requests_per_second`; zero falls back to the default.
pub fn create_rate_limiter(requests_per_second: u32) -> GlobalRateLimiter {
    let rps = NonZeroU32::new(requests_per_second)
        .or(NonZeroU32::new(DEFAULT_RPS))
        .unwrap_or(NonZeroU32::MIN);
    Arc::new(RateLimiter::direct(Quota::per_second(rps)))
}

pub fn get_rate_limit_from_env() -> u32 {
    std::env::var("FASHIONOS_RATE_LIMIT")
        .ok()
        .and_then(|s| s.trim().parse().ok())
        .unwrap_or(DEFAULT_RPS)
}

/// Answer 429 once the shared quota is spent.
pub async fn rate_limit_middleware(
    State(limiter): State<GlobalRateLimiter>,
    request: Request<Body>,
    next: Next,
) -> Result<Response, (StatusCode, &'static str)> {
    if limiter.check().is_err() {
        tracing::warn!(path = %request.uri().path(), "Rate limit exceeded");
        return Err((StatusCode::TOO_MANY_REQUESTS, "Too Many Requests"));
    }
    Ok(next.run(request).await)
}

// =============================================================================
// TESTS
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn limiter_allows_first_request() {
        assert!(create_rate_limiter(50).check().is_ok());
    }

    #[test]
    fn zero_uses_default_quota() {
        let limiter = create_rate_limiter(0);
        let allowed = (0..DEFAULT_RPS).filter(|_| limiter.check().is_ok()).count();
        assert_eq!(allowed, DEFAULT_RPS as usize);
        assert!(limiter.check().is_err());
    }

    #[test]
    fn quota_of_one_rejects_second_request() {
        let limiter = create_rate_limiter(1);
        assert!(limiter.check().is_ok());
        assert!(limiter.check().is_err());
    }
}
