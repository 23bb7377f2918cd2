use dashmap::DashMap;
use std::collections::VecDeque;
use std::sync::Arc;
use std::time::{Duration, Instant};

/// Sliding window in-memory rate limiter (pod local).
#[derive(Clone)]
pub struct InMemoryRateLimiter {
    store: Arc<DashMap<String, VecDeque<Instant>>>,
    pub enabled: bool,
}

impl InMemoryRateLimiter {
    pub fn new(enabled: bool) -> Self {
        Self { store: Arc::new(DashMap::new()), enabled }
    }

    /// Returns true if allowed, false if limited.
    pub fn check(&self, key: &str, limit: usize, window: Duration) -> bool {
        if !self.enabled {
            return true;
        }
        let now = Instant::now();
        let mut entry = self.store.entry(key.to_string()).or_default();
        while let Some(front) = entry.front() {
            if now.duration_since(*front) >= window {
                entry.pop_front();
            } else {
                break;
            }
        }
        if entry.len() < limit {
            entry.push_back(now);
            true
        } else {
            false
        }
    }
}

/// Per-action limits derived from env.
#[derive(Clone, Debug)]
pub struct RateLimitConfig {
    pub vote_limit: usize,
    pub vote_window: Duration,
    pub membership_limit: usize,
    pub membership_window: Duration,
    pub post_limit: usize,
    pub post_window: Duration,
    pub comment_limit: usize,
    pub comment_window: Duration,
    pub like_limit: usize,
    pub like_window: Duration,
}

impl RateLimitConfig {
    pub fn from_env() -> Self {
        fn usize_env(name: &str, default: usize) -> usize {
            std::env::var(name).ok().and_then(|v| v.parse().ok()).unwrap_or(default)
        }
        fn dur_env(name: &str, default: u64) -> Duration {
            Duration::from_secs(std::env::var(name).ok().and_then(|v| v.parse().ok()).unwrap_or(default))
        }
        Self {
            vote_limit: usize_env("RL_VOTE_LIMIT", 30),
            vote_window: dur_env("RL_VOTE_WINDOW", 60),
            membership_limit: usize_env("RL_MEMBERSHIP_LIMIT", 10),
            membership_window: dur_env("RL_MEMBERSHIP_WINDOW", 60),
            post_limit: usize_env("RL_POST_LIMIT", 5),
            post_window: dur_env("RL_POST_WINDOW", 300),
            comment_limit: usize_env("RL_COMMENT_LIMIT", 10),
            comment_window: dur_env("RL_COMMENT_WINDOW", 60),
            like_limit: usize_env("RL_LIKE_LIMIT", 30),
            like_window: dur_env("RL_LIKE_WINDOW", 60),
        }
    }
}

/// High level guard used by handlers, keyed by the caller's user id.
#[derive(Clone)]
pub struct RateLimiterFacade {
    pub limiter: InMemoryRateLimiter,
    pub cfg: RateLimitConfig,
}

impl RateLimiterFacade {
    pub fn new(limiter: InMemoryRateLimiter, cfg: RateLimitConfig) -> Self {
        Self { limiter, cfg }
    }

    pub fn from_env() -> Self {
        let enabled = std::env::var("RL_ENABLED")
            .map(|v| v != "0" && !v.eq_ignore_ascii_case("false"))
            .unwrap_or(true);
        Self::new(InMemoryRateLimiter::new(enabled), RateLimitConfig::from_env())
    }

    /// Limiter that always allows; used by the test suite.
    pub fn disabled() -> Self {
        Self::new(InMemoryRateLimiter::new(false), RateLimitConfig::from_env())
    }

    pub fn allow_vote(&self, user_id: &str) -> bool {
        self.limiter.check(&format!("vote:{user_id}"), self.cfg.vote_limit, self.cfg.vote_window)
    }

    pub fn allow_membership(&self, user_id: &str) -> bool {
        self.limiter.check(
            &format!("membership:{user_id}"),
            self.cfg.membership_limit,
            self.cfg.membership_window,
        )
    }

    pub fn allow_post(&self, user_id: &str) -> bool {
        self.limiter.check(&format!("post:{user_id}"), self.cfg.post_limit, self.cfg.post_window)
    }

    pub fn allow_like(&self, user_id: &str) -> bool {
        self.limiter.check(&format!("like:{user_id}"), self.cfg.like_limit, self.cfg.like_window)
    }

    pub fn allow_comment(&self, user_id: &str) -> bool {
        self.limiter.check(
            &format!("comment:{user_id}"),
            self.cfg.comment_limit,
            self.cfg.comment_window,
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn sliding_window_basic() {
        let rl = InMemoryRateLimiter::new(true);
        let window = Duration::from_millis(50);
        for _ in 0..3 {
            assert!(rl.check("k", 3, window));
        }
        assert!(!rl.check("k", 3, window));
    }

    #[test]
    fn disabled_limiter_always_allows() {
        let facade = RateLimiterFacade::disabled();
        for _ in 0..1000 {
            assert!(facade.allow_vote("u1"));
        }
    }

    #[test]
    fn per_user_keys_are_independent() {
        let rl = InMemoryRateLimiter::new(true);
        let window = Duration::from_secs(60);
        assert!(rl.check("vote:a", 1, window));
        assert!(!rl.check("vote:a", 1, window));
        assert!(rl.check("vote:b", 1, window));
    }
}
