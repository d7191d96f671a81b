use axum::{
    extract::{ConnectInfo, Request, State},
    middleware::Next,
    response::{IntoResponse, Response},
};
use std::collections::HashMap;
use std::net::{IpAddr, Ipv4Addr, SocketAddr};
use std::sync::Arc;
use std::time::{Duration, Instant};
use tokio::sync::Mutex;

use crate::config::ApiConfig;
use crate::error::ApiError;

#[derive(Debug, Clone, Copy)]
struct Window {
    started: Instant,
    hits: u32,
}

/// Fixed-window request counter keyed by client IP.
#[derive(Clone)]
pub struct RateLimiter {
    windows: Arc<Mutex<HashMap<IpAddr, Window>>>,
    max_requests: u32,
    window: Duration,
    max_entries: usize,
}

impl RateLimiter {
    pub fn new(max_requests: u32, window: Duration, max_entries: usize) -> Self {
        Self {
            windows: Arc::new(Mutex::new(HashMap::new())),
            max_requests,
            window,
            max_entries: max_entries.max(1),
        }
    }

    pub fn from_config(config: &ApiConfig) -> Self {
        Self::new(
            config.rate_limit_requests,
            Duration::from_secs(config.rate_limit_window_secs),
            config.rate_limit_max_entries,
        )
    }

    /// Count one request from `ip`; false once the window's budget is spent.
    pub async fn check(&self, ip: IpAddr) -> bool {
        self.check_at(ip, Instant::now()).await
    }

    /// A new client when the table is full first evicts expired windows; if
    /// none have expired the request is refused.
    async fn check_at(&self, ip: IpAddr, now: Instant) -> bool {
        let mut windows = self.windows.lock().await;
        if !windows.contains_key(&ip) && windows.len() >= self.max_entries {
            windows.retain(|_, w| now.duration_since(w.started) < self.window);
            if windows.len() >= self.max_entries {
                tracing::warn!(entries = windows.len(), "rate limit table full");
                return false;
            }
        }

        let entry = windows.entry(ip).or_insert(Window { started: now, hits: 0 });
        if now.duration_since(entry.started) >= self.window {
            *entry = Window { started: now, hits: 0 };
        }
        entry.hits += 1;
        entry.hits <= self.max_requests
    }
}

pub async fn rate_limit(
    State(limiter): State<RateLimiter>,
    connect: Option<ConnectInfo<SocketAddr>>,
    request: Request,
    next: Next,
) -> Response {
    let ip = connect
        .map(|ConnectInfo(addr)| addr.ip())
        .unwrap_or(IpAddr::V4(Ipv4Addr::UNSPECIFIED));

    if !limiter.check(ip).await {
        tracing::warn!(%ip, "rate limit exceeded");
        return ApiError::too_many_requests("Too many requests, please try again later").into_response();
    }

    next.run(request).await
}
