//! 地牢记录与历史
//!
//! `DungeonRecord` 是提取器和手动告警命令的共同产物；
//! `History` 只追加，进程退出即丢失。

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::rank::Rank;

/// 未匹配字段的默认值
pub const UNKNOWN: &str = "Unknown";

/// 一次地牢刷新
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DungeonRecord {
    pub island: String,
    pub map: String,
    pub boss: String,
    pub rank: Rank,
    /// 红色地牢
    pub is_red_dungeon: bool,
    /// 双倍地牢
    pub is_double_dungeon: bool,
}

impl Default for DungeonRecord {
    fn default() -> Self {
        Self {
            island: UNKNOWN.to_string(),
            map: UNKNOWN.to_string(),
            boss: UNKNOWN.to_string(),
            rank: Rank::E,
            is_red_dungeon: false,
            is_double_dungeon: false,
        }
    }
}

impl DungeonRecord {
    /// 去重比较用的键 (island, boss, rank)
    pub fn dedup_key(&self) -> (&str, &str, Rank) {
        (&self.island, &self.boss, self.rank)
    }
}

/// 手动输入的布尔标记：yes / true / 1 / ✅
pub fn parse_flag(value: &str) -> bool {
    let value = value.trim();
    if value.contains('✅') {
        return true;
    }
    matches!(value.to_lowercase().as_str(), "yes" | "y" | "true" | "1")
}

/// 历史条目
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HistoryEntry {
    pub record: DungeonRecord,
    /// 记录时间
    pub timestamp: DateTime<Utc>,
    /// 来源消息 ID
    pub source_id: u64,
}

/// 只追加的历史记录
#[derive(Debug, Default)]
pub struct History {
    entries: Vec<HistoryEntry>,
}

impl History {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&mut self, record: DungeonRecord, timestamp: DateTime<Utc>, source_id: u64) {
        self.entries.push(HistoryEntry {
            record,
            timestamp,
            source_id,
        });
    }

    /// 最近的 n 条，按时间顺序（最旧在前）
    pub fn tail(&self, n: usize) -> &[HistoryEntry] {
        let start = self.entries.len().saturating_sub(n);
        &self.entries[start..]
    }

    /// 最近的 n 条，最新在前
    pub fn recent(&self, n: usize) -> Vec<HistoryEntry> {
        self.tail(n).iter().rev().cloned().collect()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}
