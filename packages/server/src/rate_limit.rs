//! Fixed-window request limiting per client IP.

use std::net::SocketAddr;
use std::time::{Duration, Instant};

use axum::{
    body::Body,
    extract::{ConnectInfo, State},
    http::Request,
    middleware::Next,
    response::Response,
};
use dashmap::DashMap;

use crate::config::RateLimitConfig;
use crate::error::AppError;
use crate::state::AppState;

#[derive(Debug, Clone, Copy)]
struct Window {
    count: u32,
    started: Instant,
}

/// Rate limit check result.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RateLimitResult {
    Allowed { remaining: u32, reset: u64 },
    Limited { retry_after: u64 },
}

pub struct RateLimiter {
    max_requests: u32,
    window: Duration,
    windows: DashMap<String, Window>,
}

impl RateLimiter {
    pub fn new(config: &RateLimitConfig) -> Self {
        Self {
            max_requests: config.max_requests,
            window: Duration::from_secs(config.window_secs),
            windows: DashMap::new(),
        }
    }

    pub fn is_enabled(&self) -> bool {
        self.max_requests > 0
    }

    /// Record a request for `key` and report whether it may proceed.
    pub fn check(&self, key: &str) -> RateLimitResult {
        self.check_at(key, Instant::now())
    }

    fn check_at(&self, key: &str, now: Instant) -> RateLimitResult {
        let mut window = self.windows.entry(key.to_string()).or_insert(Window {
            count: 0,
            started: now,
        });

        if now.duration_since(window.started) >= self.window {
            window.count = 0;
            window.started = now;
        }

        let left = self.window.saturating_sub(now.duration_since(window.started));
        // Round up so a client never retries into the same window.
        let left_secs = left.as_secs() + u64::from(left.subsec_nanos() > 0);

        if window.count >= self.max_requests {
            return RateLimitResult::Limited {
                retry_after: left_secs.max(1),
            };
        }

        window.count += 1;
        RateLimitResult::Allowed {
            remaining: self.max_requests - window.count,
            reset: left_secs,
        }
    }

    /// Drop windows that ended before `now`.
    pub fn cleanup(&self) {
        let now = Instant::now();
        self.windows
            .retain(|_, w| now.duration_since(w.started) < self.window);
    }

    pub fn key_count(&self) -> usize {
        self.windows.len()
    }
}

/// Rate limiting middleware keyed by the peer address.
pub async fn rate_limit_middleware(
    State(state): State<AppState>,
    req: Request<Body>,
    next: Next,
) -> Result<Response, AppError> {
    let limiter = &state.rate_limiter;
    if !limiter.is_enabled() {
        return Ok(next.run(req).await);
    }

    let key = req
        .extensions()
        .get::<ConnectInfo<SocketAddr>>()
        .map(|ConnectInfo(addr)| format!("ip:{}", addr.ip()))
        .unwrap_or_else(|| "unknown".to_string());

    match limiter.check(&key) {
        RateLimitResult::Allowed { remaining, reset } => {
            let mut response = next.run(req).await;
            let headers = response.headers_mut();
            headers.insert("X-RateLimit-Limit", limiter.max_requests.into());
            headers.insert("X-RateLimit-Remaining", remaining.into());
            headers.insert("X-RateLimit-Reset", reset.into());
            Ok(response)
        }
        RateLimitResult::Limited { retry_after } => {
            tracing::debug!(%key, retry_after, "Rate limit exceeded");
            Err(AppError::RateLimited { retry_after })
        }
    }
}
