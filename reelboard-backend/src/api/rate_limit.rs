//! Per-client sliding-window rate limiter as an Axum middleware.
//!
//! Tracks request timestamps per client IP in a shared map behind
//! `Arc<Mutex<_>>`. When a client has already made the configured maximum
//! number of requests inside the window, responds with 429 Too Many Requests.

use std::collections::{HashMap, VecDeque};
use std::net::{IpAddr, Ipv4Addr, SocketAddr};
use std::sync::{Arc, Mutex};
use std::time::{Duration, Instant};

use axum::{
    extract::{ConnectInfo, Request, State},
    http::{HeaderMap, StatusCode},
    middleware::Next,
    response::{IntoResponse, Response},
    Json,
};

use super::{insert_header_safe, ErrorResponse};
use crate::config::RateLimitConfig;

pub const RATE_LIMIT_MESSAGE: &str = "Too many requests, please try again later";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RateDecision {
    Allowed { remaining: usize },
    Limited { retry_after: Duration },
}

/// Shared state for all client buckets.
#[derive(Clone)]
pub struct RateLimiter {
    buckets: Arc<Mutex<HashMap<IpAddr, VecDeque<Instant>>>>,
    max_per_window: usize,
    window: Duration,
}

impl RateLimiter {
    pub fn new(max_per_window: usize, window: Duration) -> Self {
        Self {
            buckets: Arc::new(Mutex::new(HashMap::new())),
            max_per_window,
            window,
        }
    }

    pub fn from_config(config: &RateLimitConfig) -> Self {
        Self::new(config.max_requests, Duration::from_secs(config.window_secs))
    }

    pub fn max_per_window(&self) -> usize {
        self.max_per_window
    }

    /// Record a request from `client` at `now` if it is under the limit.
    pub fn check_at(&self, client: IpAddr, now: Instant) -> RateDecision {
        let mut buckets = self.buckets.lock().unwrap_or_else(|e| e.into_inner());

        // Forget clients whose whole window has passed.
        buckets.retain(|_, stamps| {
            stamps
                .back()
                .is_some_and(|&t| now.saturating_duration_since(t) < self.window)
        });

        let stamps = buckets.entry(client).or_default();
        while stamps
            .front()
            .is_some_and(|&t| now.saturating_duration_since(t) >= self.window)
        {
            stamps.pop_front();
        }

        if stamps.len() < self.max_per_window {
            stamps.push_back(now);
            RateDecision::Allowed {
                remaining: self.max_per_window - stamps.len(),
            }
        } else {
            let retry_after = stamps
                .front()
                .map(|&t| self.window.saturating_sub(now.saturating_duration_since(t)))
                .unwrap_or(self.window);
            RateDecision::Limited { retry_after }
        }
    }

    pub fn check(&self, client: IpAddr) -> RateDecision {
        self.check_at(client, Instant::now())
    }
}

fn client_ip(req: &Request) -> IpAddr {
    req.extensions()
        .get::<ConnectInfo<SocketAddr>>()
        .map(|ConnectInfo(addr)| addr.ip())
        .unwrap_or(IpAddr::V4(Ipv4Addr::UNSPECIFIED))
}

/// Axum middleware function that enforces rate limiting.
pub async fn rate_limit_middleware(
    State(limiter): State<RateLimiter>,
    req: Request,
    next: Next,
) -> Response {
    let client = client_ip(&req);
    let limit = limiter.max_per_window.to_string();

    match limiter.check(client) {
        RateDecision::Allowed { remaining } => {
            let mut response = next.run(req).await;
            let headers = response.headers_mut();
            insert_header_safe(headers, "ratelimit-limit", &limit);
            insert_header_safe(headers, "ratelimit-remaining", &remaining.to_string());
            response
        }
        RateDecision::Limited { retry_after } => {
            log::warn!(
                target: "reelboard.api.rate_limit",
                "Rate limit exceeded for {} (max {} per {}s)",
                client,
                limiter.max_per_window,
                limiter.window.as_secs()
            );
            // Round up so clients never retry a moment too early.
            let secs = retry_after.as_secs() + u64::from(retry_after.subsec_nanos() > 0);
            let mut headers = HeaderMap::new();
            insert_header_safe(&mut headers, "retry-after", &secs.max(1).to_string());
            insert_header_safe(&mut headers, "ratelimit-limit", &limit);
            insert_header_safe(&mut headers, "ratelimit-remaining", "0");
            (
                StatusCode::TOO_MANY_REQUESTS,
                headers,
                Json(ErrorResponse::new(RATE_LIMIT_MESSAGE)),
            )
                .into_response()
        }
    }
}
