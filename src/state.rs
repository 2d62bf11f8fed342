//! 进程内共享状态
//!
//! 网关可能并发投递多个事件，每个集合各自加锁；
//! 锁从不跨越 `.await` 持有。

use std::sync::{Mutex, MutexGuard, PoisonError};
use std::time::Duration;

use crate::dungeon::History;
use crate::notification::preferences::PreferenceStore;
use crate::notification::stats::Statistics;
use crate::notification::throttle::RateLimiter;

/// 机器人状态，进程退出即丢失
#[derive(Debug, Default)]
pub struct BotState {
    pub history: Mutex<History>,
    pub preferences: Mutex<PreferenceStore>,
    pub stats: Mutex<Statistics>,
    pub rate_limiter: Mutex<RateLimiter>,
}

impl BotState {
    pub fn new(cooldown: Duration) -> Self {
        Self {
            rate_limiter: Mutex::new(RateLimiter::with_cooldown(cooldown)),
            ..Default::default()
        }
    }

    /// 统计快照
    pub fn stats_snapshot(&self) -> Statistics {
        lock(&self.stats).clone()
    }
}

/// 加锁；持锁线程 panic 后仍继续使用内部数据
pub fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(PoisonError::into_inner)
}
