//! 告警限流模块 - 限制单个用户手动创建告警的频率

use chrono::{DateTime, Utc};
use std::collections::HashMap;
use std::time::Duration;
use tracing::debug;

/// 默认冷却时间
pub const DEFAULT_COOLDOWN: Duration = Duration::from_secs(5);

/// 用户级限流器
///
/// 只有被允许的操作才会刷新时间戳；被拒绝时状态不变。
#[derive(Debug)]
pub struct RateLimiter {
    /// 冷却时间（默认 5 秒）
    cooldown: Duration,
    /// 用户 ID -> 上次被允许的时间
    last_action: HashMap<u64, DateTime<Utc>>,
}

impl RateLimiter {
    /// 创建新的限流器
    pub fn new() -> Self {
        Self::with_cooldown(DEFAULT_COOLDOWN)
    }

    /// 创建带自定义冷却时间的限流器
    pub fn with_cooldown(cooldown: Duration) -> Self {
        Self {
            cooldown,
            last_action: HashMap::new(),
        }
    }

    pub fn cooldown(&self) -> Duration {
        self.cooldown
    }

    /// 检查并记录
    ///
    /// 返回 `true` 表示允许，并把 `now` 记为该用户的上次操作时间
    pub fn check_at(&mut self, user_id: u64, now: DateTime<Utc>) -> bool {
        if let Some(last) = self.last_action.get(&user_id) {
            let elapsed = (now - *last).to_std().unwrap_or(Duration::ZERO);
            if elapsed < self.cooldown {
                debug!(
                    user_id,
                    remaining_ms = (self.cooldown - elapsed).as_millis() as u64,
                    "Rate limited"
                );
                return false;
            }
        }

        self.last_action.insert(user_id, now);
        true
    }

    /// 距离下次允许还剩多久（不修改状态）
    pub fn remaining_at(&self, user_id: u64, now: DateTime<Utc>) -> Duration {
        self.last_action
            .get(&user_id)
            .map(|last| {
                let elapsed = (now - *last).to_std().unwrap_or(Duration::ZERO);
                self.cooldown.saturating_sub(elapsed)
            })
            .unwrap_or(Duration::ZERO)
    }
}

impl Default for RateLimiter {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn secs(n: i64) -> chrono::Duration {
        chrono::Duration::seconds(n)
    }

    #[test]
    fn test_second_call_within_cooldown_denied() {
        let mut limiter = RateLimiter::new();
        let t0 = Utc::now();

        assert!(limiter.check_at(42, t0));
        assert!(!limiter.check_at(42, t0 + secs(1)));
        assert!(!limiter.check_at(42, t0 + secs(4)));
    }

    #[test]
    fn test_allowed_after_cooldown() {
        let mut limiter = RateLimiter::new();
        let t0 = Utc::now();

        assert!(limiter.check_at(42, t0));
        assert!(limiter.check_at(42, t0 + secs(5)));
        // 新窗口从第二次允许开始
        assert!(!limiter.check_at(42, t0 + secs(6)));
        assert!(limiter.check_at(42, t0 + secs(10)));
    }

    #[test]
    fn test_denied_call_does_not_extend_window() {
        let mut limiter = RateLimiter::new();
        let t0 = Utc::now();

        assert!(limiter.check_at(42, t0));
        assert!(!limiter.check_at(42, t0 + secs(4)));
        assert!(limiter.check_at(42, t0 + secs(5)));
    }

    #[test]
    fn test_users_are_independent() {
        let mut limiter = RateLimiter::new();
        let t0 = Utc::now();

        assert!(limiter.check_at(1, t0));
        assert!(limiter.check_at(2, t0));
        assert!(!limiter.check_at(1, t0));
    }

    #[test]
    fn test_remaining() {
        let mut limiter = RateLimiter::with_cooldown(Duration::from_secs(10));
        let t0 = Utc::now();
        assert_eq!(limiter.remaining_at(1, t0), Duration::ZERO);

        limiter.check_at(1, t0);
        assert_eq!(limiter.remaining_at(1, t0 + secs(4)), Duration::from_secs(6));
        assert_eq!(limiter.remaining_at(1, t0 + secs(20)), Duration::ZERO);
    }
}
