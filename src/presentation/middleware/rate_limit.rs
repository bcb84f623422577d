//! Rate Limiting Middleware
//!
//! Fixed-window limiter keyed by client IP, applied to `/api/*`. Counters
//! live in a `DashMap`; each process instance limits independently.
//!
//! Every response carries `X-RateLimit-Limit`, `X-RateLimit-Remaining` and
//! `X-RateLimit-Reset` (seconds until the window resets). Rejected requests
//! get 429 `RATE_LIMITED` with `Retry-After`.

use std::net::{IpAddr, SocketAddr};
use std::time::{Duration, Instant};

use axum::{
    extract::{ConnectInfo, Request, State},
    http::{header, HeaderMap, HeaderValue},
    middleware::Next,
    response::{IntoResponse, Response},
};
use dashmap::DashMap;

use crate::config::RateLimitSettings;
use crate::infrastructure::metrics;
use crate::shared::error::AppError;
use crate::startup::AppState;

#[derive(Debug, Clone, Copy)]
struct Window {
    started: Instant,
    count: u32,
}

/// Outcome of counting one request
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RateLimitInfo {
    pub allowed: bool,
    pub limit: u32,
    pub remaining: u32,
    pub reset_after: Duration,
}

/// In-process fixed-window rate limiter
#[derive(Debug)]
pub struct RateLimiter {
    window: Duration,
    max_requests: u32,
    windows: DashMap<String, Window>,
}

impl RateLimiter {
    pub fn new(window: Duration, max_requests: u32) -> Self {
        Self {
            window,
            max_requests,
            windows: DashMap::new(),
        }
    }

    pub fn from_settings(settings: &RateLimitSettings) -> Self {
        Self::new(settings.window(), settings.max_requests)
    }

    /// Count a request for `key` now.
    pub fn check(&self, key: &str) -> RateLimitInfo {
        self.check_at(key, Instant::now())
    }

    pub fn check_at(&self, key: &str, now: Instant) -> RateLimitInfo {
        let mut entry = self.windows.entry(key.to_owned()).or_insert(Window {
            started: now,
            count: 0,
        });

        if now.saturating_duration_since(entry.started) >= self.window {
            *entry = Window {
                started: now,
                count: 0,
            };
        }

        let allowed = entry.count < self.max_requests;
        if allowed {
            entry.count += 1;
        }

        let elapsed = now.saturating_duration_since(entry.started);
        RateLimitInfo {
            allowed,
            limit: self.max_requests,
            remaining: self.max_requests.saturating_sub(entry.count),
            reset_after: self.window.saturating_sub(elapsed),
        }
    }

    /// Drop windows that have fully elapsed.
    pub fn purge_expired(&self) {
        let now = Instant::now();
        self.windows
            .retain(|_, w| now.saturating_duration_since(w.started) < self.window);
    }

    pub fn tracked_clients(&self) -> usize {
        self.windows.len()
    }
}

/// Client key: first `X-Forwarded-For` hop, then `X-Real-IP`, then the peer
/// address.
fn client_key(headers: &HeaderMap, peer: Option<IpAddr>) -> String {
    let forwarded = headers
        .get("x-forwarded-for")
        .and_then(|h| h.to_str().ok())
        .and_then(|v| v.split(',').next())
        .map(str::trim)
        .filter(|ip| ip.parse::<IpAddr>().is_ok());
    if let Some(ip) = forwarded {
        return format!("ip:{ip}");
    }

    let real_ip = headers
        .get("x-real-ip")
        .and_then(|h| h.to_str().ok())
        .map(str::trim)
        .filter(|ip| ip.parse::<IpAddr>().is_ok());
    if let Some(ip) = real_ip {
        return format!("ip:{ip}");
    }

    match peer {
        Some(ip) => format!("ip:{ip}"),
        None => "ip:unknown".to_owned(),
    }
}

fn add_rate_limit_headers(headers: &mut HeaderMap, info: &RateLimitInfo) {
    headers.insert("X-RateLimit-Limit", HeaderValue::from(info.limit));
    headers.insert("X-RateLimit-Remaining", HeaderValue::from(info.remaining));
    headers.insert("X-RateLimit-Reset", HeaderValue::from(info.reset_after.as_secs()));
}

/// Rate limiting middleware for the `/api` router.
pub async fn rate_limit(State(state): State<AppState>, request: Request, next: Next) -> Response {
    let peer = request
        .extensions()
        .get::<ConnectInfo<SocketAddr>>()
        .map(|ci| ci.0.ip());
    let key = client_key(request.headers(), peer);
    let info = state.rate_limiter.check(&key);

    if !info.allowed {
        tracing::warn!(client = %key, path = %request.uri().path(), "Rate limit exceeded");
        metrics::record_rate_limited();
        let mut response = AppError::RateLimited.into_response();
        add_rate_limit_headers(response.headers_mut(), &info);
        response
            .headers_mut()
            .insert(header::RETRY_AFTER, HeaderValue::from(info.reset_after.as_secs().max(1)));
        return response;
    }

    let mut response = next.run(request).await;
    add_rate_limit_headers(response.headers_mut(), &info);
    response
}
