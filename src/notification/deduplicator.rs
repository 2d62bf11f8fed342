//! 刷新去重器 - 防止同一地牢在短时间内重复播报
//!
//! 同一个地牢通常会被上游机器人转发多次。
//! 此模块通过比较最近的历史记录实现去重。
//!
//! ## 去重策略
//! 1. 只看最近 20 条历史
//! 2. 使用 300 秒时间窗口
//! 3. (island, boss, rank) 完全相同视为重复
//!
//! 这是启发式的：窗口内两次真正不同但三元组相同的刷新会被合并为一次。

use chrono::{DateTime, Utc};
use std::time::Duration;
use tracing::debug;

use crate::dungeon::{DungeonRecord, History};

/// 默认去重窗口
pub const DEFAULT_WINDOW: Duration = Duration::from_secs(300);
/// 默认回看条数
pub const DEFAULT_LOOKBACK: usize = 20;

/// 刷新去重器
#[derive(Debug, Clone)]
pub struct DuplicateFilter {
    /// 去重窗口（默认 300 秒）
    window: Duration,
    /// 回看的历史条数（默认 20）
    lookback: usize,
}

impl DuplicateFilter {
    /// 创建新的去重器，使用默认窗口和回看条数
    pub fn new() -> Self {
        Self {
            window: DEFAULT_WINDOW,
            lookback: DEFAULT_LOOKBACK,
        }
    }

    /// 设置去重窗口时长
    pub fn with_window(mut self, window: Duration) -> Self {
        self.window = window;
        self
    }

    /// 设置回看条数
    pub fn with_lookback(mut self, lookback: usize) -> Self {
        self.lookback = lookback;
        self
    }

    pub fn window(&self) -> Duration {
        self.window
    }

    pub fn lookback(&self) -> usize {
        self.lookback
    }

    /// 检查候选记录是否重复
    ///
    /// 返回 `true` 表示重复，应该跳过
    ///
    /// # 去重规则
    /// - 只扫描最近 `lookback` 条历史，不足时扫描全部
    /// - 历史条目距 `now` 严格小于窗口才参与比较
    /// - 时间戳晚于 `now` 的条目按 0 秒处理
    pub fn is_duplicate(&self, history: &History, candidate: &DungeonRecord, now: DateTime<Utc>) -> bool {
        let key = candidate.dedup_key();

        for entry in history.tail(self.lookback) {
            let age = (now - entry.timestamp).to_std().unwrap_or(Duration::ZERO);
            if age >= self.window {
                continue;
            }
            if entry.record.dedup_key() == key {
                debug!(
                    island = %candidate.island,
                    boss = %candidate.boss,
                    rank = %candidate.rank,
                    age_secs = age.as_secs(),
                    source_id = entry.source_id,
                    "Dungeon deduplicated (same island/boss/rank within window)"
                );
                return true;
            }
        }

        false
    }
}

impl Default for DuplicateFilter {
    fn default() -> Self {
        Self::new()
    }
}
