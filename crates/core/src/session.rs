//! # Ephemeral Cache / Rate Limiter
//!
//! Redis-backed service for everything this system needs out of a
//! process-wide cache: the anonymous channel's sliding-window rate limiter
//! (HinSchG §13 - no IP-based keys, ever) and short-lived lookups like
//! webhook configuration. All keys are namespaced `<purpose>:<tenant>:<id>`
//! (or `<purpose>:anon:<bucket>` for the identity-free anonymous channel) so
//! no key can ever be shared across tenants.
//!
//! The sliding window is a Redis sorted set per key: each request adds the
//! current timestamp as both score and (unique) member, trims entries older
//! than the window, then counts what remains - a standard `ZADD` +
//! `ZREMRANGEBYSCORE` + `ZCARD` pipeline.

use crate::{config::RedisConfig, error::Result, Error};
use redis::aio::ConnectionManager;
use redis::AsyncCommands;
use serde::{Deserialize, Serialize};

/// Wraps a Redis `ConnectionManager`, process-wide and cheaply cloneable.
#[derive(Clone)]
pub struct SessionManager {
    conn: ConnectionManager,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum SessionState {
    Active,
    Expired,
}

/// Ancillary data a caller may stash alongside a rate-limit bucket (e.g. a
/// cached webhook endpoint). Opaque to `SessionManager`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SessionData {
    pub key: String,
    pub payload: serde_json::Value,
}

#[derive(Debug, Clone, Default)]
pub struct SessionStats {
    pub tracked_keys: u64,
}

/// Outcome of a sliding-window rate-limit check.
#[derive(Debug, Clone, Copy)]
pub struct RateLimitDecision {
    pub allowed: bool,
    pub current_count: u64,
    pub limit: u32,
    /// Present only when `allowed` is false.
    pub retry_after_seconds: Option<u64>,
}

pub type SessionConfig = RedisConfig;

impl SessionManager {
    pub async fn new(config: &RedisConfig) -> Result<Self> {
        let client = redis::Client::open(config.url.as_str())?;
        let conn = ConnectionManager::new(client).await?;
        Ok(Self { conn })
    }

    /// Sliding-window rate limit check-and-increment for `key`, namespaced
    /// by the caller (e.g. `anon_lookup:anon:<tor-circuit-or-shared-bucket>`).
    /// Never pass a client IP as part of `key` for the anonymous channel.
    pub async fn check_rate_limit(
        &self,
        key: &str,
        limit: u32,
        window_seconds: i64,
    ) -> Result<RateLimitDecision> {
        let mut conn = self.conn.clone();
        let now_millis = chrono::Utc::now().timestamp_millis();
        let window_start = now_millis - window_seconds * 1000;

        let _: () = conn
            .zrembyscore(key, i64::MIN, window_start)
            .await
            .map_err(Error::from)?;

        let current_count: u64 = conn.zcard(key).await.map_err(Error::from)?;

        if current_count >= limit as u64 {
            // Oldest surviving entry tells us when a slot frees up.
            let oldest: Vec<(String, i64)> = conn
                .zrange_withscores(key, 0, 0)
                .await
                .map_err(Error::from)?;
            let retry_after = oldest
                .first()
                .map(|(_, score)| {
                    let elapsed_ms = now_millis - score;
                    let remaining_ms = (window_seconds * 1000 - elapsed_ms).max(0);
                    (remaining_ms / 1000 + 1) as u64
                })
                .unwrap_or(window_seconds as u64);

            return Ok(RateLimitDecision {
                allowed: false,
                current_count,
                limit,
                retry_after_seconds: Some(retry_after),
            });
        }

        // member must be unique per request even within the same millisecond
        let member = format!("{}:{}", now_millis, uuid::Uuid::new_v4());
        let _: () = conn.zadd(key, member, now_millis).await.map_err(Error::from)?;
        let _: () = conn
            .expire(key, window_seconds)
            .await
            .map_err(Error::from)?;

        Ok(RateLimitDecision {
            allowed: true,
            current_count: current_count + 1,
            limit,
            retry_after_seconds: None,
        })
    }

    /// Store an opaque value with a TTL (webhook config, short-lived lookups).
    pub async fn put(&self, key: &str, value: &serde_json::Value, ttl_seconds: i64) -> Result<()> {
        let mut conn = self.conn.clone();
        let serialized = serde_json::to_string(value)?;
        let _: () = conn
            .set_ex(key, serialized, ttl_seconds as u64)
            .await
            .map_err(Error::from)?;
        Ok(())
    }

    pub async fn get(&self, key: &str) -> Result<Option<serde_json::Value>> {
        let mut conn = self.conn.clone();
        let raw: Option<String> = conn.get(key).await.map_err(Error::from)?;
        match raw {
            Some(s) => Ok(Some(serde_json::from_str(&s)?)),
            None => Ok(None),
        }
    }

    pub async fn health_check(&self) -> Result<()> {
        let mut conn = self.conn.clone();
        let _: String = redis::cmd("PING")
            .query_async(&mut conn)
            .await
            .map_err(Error::from)?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn rate_limit_decision_carries_retry_hint_only_when_denied() {
        let allowed = RateLimitDecision {
            allowed: true,
            current_count: 1,
            limit: 5,
            retry_after_seconds: None,
        };
        assert!(allowed.retry_after_seconds.is_none());

        let denied = RateLimitDecision {
            allowed: false,
            current_count: 5,
            limit: 5,
            retry_after_seconds: Some(42),
        };
        assert!(denied.retry_after_seconds.is_some());
    }
}
