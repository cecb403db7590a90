//! Per-caller request quotas.
//!
//! The limiter runs after authentication, so requests are counted against the
//! user an API key resolves to. Every key a user holds shares one bucket.
//! Public traffic (bootstrap, API docs) shares a single anonymous bucket and
//! `/health` is never counted.

use axum::{
    Json,
    body::Body,
    extract::State,
    http::{Request, StatusCode, header},
    middleware::Next,
    response::{IntoResponse, Response},
};
use converter_types::{User, UserId};
use dashmap::DashMap;
use governor::{
    Quota, RateLimiter,
    clock::{Clock, DefaultClock},
    state::{InMemoryState, NotKeyed},
};
use serde_json::json;
use std::{num::NonZeroU32, sync::Arc};

type Bucket = RateLimiter<NotKeyed, InMemoryState, DefaultClock>;

/// Who a request is counted against.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Caller {
    User(UserId),
    Anonymous,
}

impl Caller {
    fn of(request: &Request<Body>) -> Self {
        request
            .extensions()
            .get::<User>()
            .map_or(Caller::Anonymous, |user| Caller::User(user.id))
    }
}

/// Token buckets for every caller seen so far.
pub struct RateLimits {
    buckets: DashMap<Caller, Arc<Bucket>>,
    quota: Quota,
    clock: DefaultClock,
}

impl Default for RateLimits {
    fn default() -> Self {
        Self::per_minute(100)
    }
}

impl RateLimits {
    /// `requests` may arrive in one burst; the bucket then refills evenly over
    /// a minute. Zero is treated as one.
    pub fn per_minute(requests: u32) -> Self {
        let requests = NonZeroU32::new(requests).unwrap_or(NonZeroU32::MIN);
        Self {
            buckets: DashMap::new(),
            quota: Quota::per_minute(requests),
            clock: DefaultClock::default(),
        }
    }

    /// Takes one request from the caller's bucket, or returns the whole
    /// seconds until the next one is admitted.
    pub fn check(&self, caller: Caller) -> Result<(), u64> {
        let bucket = self
            .buckets
            .entry(caller)
            .or_insert_with(|| Arc::new(RateLimiter::direct_with_clock(self.quota, self.clock.clone())))
            .clone();

        bucket.check().map_err(|not_until| {
            let wait = not_until.wait_time_from(self.clock.now());
            wait.as_secs_f64().ceil().max(1.0) as u64
        })
    }
}

pub async fn rate_limit_middleware(
    State(limits): State<Arc<RateLimits>>,
    request: Request<Body>,
    next: Next,
) -> Response {
    if request.uri().path() == "/health" {
        return next.run(request).await;
    }

    let caller = Caller::of(&request);
    match limits.check(caller) {
        Ok(()) => next.run(request).await,
        Err(retry_after) => {
            tracing::warn!(?caller, retry_after, "Rate limit exceeded");
            (
                StatusCode::TOO_MANY_REQUESTS,
                [(header::RETRY_AFTER, retry_after.to_string())],
                Json(json!({
                    "detail": format!("Rate limit exceeded. Try again in {retry_after} seconds."),
                    "retry_after_seconds": retry_after
                })),
            )
                .into_response()
        }
    }
}
