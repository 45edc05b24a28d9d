use std::collections::HashMap;
use std::sync::Arc;
use std::time::{Duration, Instant};

use axum::{extract::State, http::Request, middleware::Next, response::Response};
use tokio::sync::Mutex;
use tracing::warn;

use crate::{config::RateLimitConfig, error::ApiError, state::AppState};

#[derive(Debug)]
struct WindowEntry {
    count: u32,
    window_start: Instant,
}

/// Fixed-window request limiter keyed by caller identity. State is
/// in-process only; each instance enforces its own window.
#[derive(Clone)]
pub struct RateLimiter {
    config: RateLimitConfig,
    entries: Arc<Mutex<HashMap<String, WindowEntry>>>,
}

impl RateLimiter {
    pub fn new(config: RateLimitConfig) -> Self {
        Self {
            config,
            entries: Arc::new(Mutex::new(HashMap::new())),
        }
    }

    pub async fn is_allowed(&self, key: &str) -> bool {
        let mut entries = self.entries.lock().await;
        let now = Instant::now();
        let window = Duration::from_secs(self.config.window_seconds);

        let entry = entries.entry(key.to_string()).or_insert(WindowEntry {
            count: 0,
            window_start: now,
        });

        if now.duration_since(entry.window_start) >= window {
            entry.count = 0;
            entry.window_start = now;
        }

        if entry.count >= self.config.max_requests {
            return false;
        }

        entry.count += 1;
        true
    }
}

/// Pick a stable key for the caller: proxy-reported address first, then the
/// bearer token, then a shared bucket.
fn client_key<B>(req: &Request<B>) -> String {
    if let Some(forwarded) = req
        .headers()
        .get("x-forwarded-for")
        .and_then(|v| v.to_str().ok())
        .and_then(|v| v.split(',').next())
    {
        let forwarded = forwarded.trim();
        if !forwarded.is_empty() {
            return forwarded.to_string();
        }
    }
    if let Some(auth) = req
        .headers()
        .get(axum::http::header::AUTHORIZATION)
        .and_then(|v| v.to_str().ok())
    {
        return auth.to_string();
    }
    "anonymous".to_string()
}

pub async fn rate_limit_middleware(
    State(state): State<AppState>,
    req: Request<axum::body::Body>,
    next: Next,
) -> Result<Response, ApiError> {
    let key = client_key(&req);
    if !state.limiter.is_allowed(&key).await {
        warn!(key = %key, "rate limit exceeded");
        return Err(ApiError::RateLimited);
    }
    Ok(next.run(req).await)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn limiter(window_seconds: u64, max_requests: u32) -> RateLimiter {
        RateLimiter::new(RateLimitConfig {
            window_seconds,
            max_requests,
        })
    }

    #[tokio::test]
    async fn allows_up_to_ceiling_then_blocks() {
        let rl = limiter(60, 3);
        assert!(rl.is_allowed("10.0.0.1").await);
        assert!(rl.is_allowed("10.0.0.1").await);
        assert!(rl.is_allowed("10.0.0.1").await);
        assert!(!rl.is_allowed("10.0.0.1").await);
    }

    #[tokio::test]
    async fn keys_are_independent() {
        let rl = limiter(60, 1);
        assert!(rl.is_allowed("10.0.0.1").await);
        assert!(!rl.is_allowed("10.0.0.1").await);
        assert!(rl.is_allowed("10.0.0.2").await);
    }

    #[tokio::test]
    async fn window_reset_clears_the_count() {
        let rl = limiter(1, 1);
        assert!(rl.is_allowed("k").await);
        assert!(!rl.is_allowed("k").await);
        tokio::time::sleep(Duration::from_millis(1100)).await;
        assert!(rl.is_allowed("k").await);
    }

    #[test]
    fn client_key_prefers_forwarded_header() {
        let req = Request::builder()
            .header("x-forwarded-for", "203.0.113.9, 10.0.0.1")
            .header("authorization", "Bearer abc")
            .body(())
            .unwrap();
        assert_eq!(client_key(&req), "203.0.113.9");

        let req = Request::builder()
            .header("authorization", "Bearer abc")
            .body(())
            .unwrap();
        assert_eq!(client_key(&req), "Bearer abc");

        let req = Request::builder().body(()).unwrap();
        assert_eq!(client_key(&req), "anonymous");
    }
}
