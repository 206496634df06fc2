//! Rate limiting middleware using token bucket algorithm

use axum::{extract::Request, middleware::Next, response::Response};
use foodgram_common::errors::AppError;
use governor::{
    clock::QuantaClock,
    state::{InMemoryState, NotKeyed},
    Quota, RateLimiter,
};
use std::num::NonZeroU32;
use std::sync::Arc;

/// Process-wide limiter shared by every route
pub struct GlobalRateLimiter {
    inner: RateLimiter<NotKeyed, InMemoryState, QuantaClock>,
    requests_per_second: u32,
}

impl GlobalRateLimiter {
    pub fn check(&self) -> Result<(), AppError> {
        self.inner.check().map_err(|_| AppError::RateLimited {
            limit: self.requests_per_second,
        })
    }
}

/// Create a new rate limiter; zero values are raised to one
pub fn create_rate_limiter(requests_per_second: u32, burst: u32) -> Arc<GlobalRateLimiter> {
    let rate = NonZeroU32::new(requests_per_second).unwrap_or(NonZeroU32::MIN);
    let burst = NonZeroU32::new(burst).unwrap_or(rate);
    let quota = Quota::per_second(rate).allow_burst(burst);

    Arc::new(GlobalRateLimiter {
        inner: RateLimiter::direct(quota),
        requests_per_second: rate.get(),
    })
}

/// Rate limiting middleware
pub async fn rate_limit_middleware(
    request: Request,
    next: Next,
    limiter: Arc<GlobalRateLimiter>,
) -> Result<Response, AppError> {
    limiter.check()?;
    Ok(next.run(request).await)
}
