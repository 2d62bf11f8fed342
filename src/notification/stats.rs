//! 刷新统计 - 总数、按等级计数、按岛屿计数

use serde::Serialize;
use std::collections::{BTreeMap, HashMap};

use crate::dungeon::{DungeonRecord, Rank};

/// 统计聚合器
///
/// 只增不减；岛屿按首次出现顺序保存，用于 top-N 的稳定排序。
#[derive(Debug, Default, Clone, Serialize)]
pub struct Statistics {
    total_spawns: u64,
    rank_counts: BTreeMap<Rank, u64>,
    /// 按首次出现顺序
    island_counts: Vec<(String, u64)>,
    #[serde(skip)]
    island_index: HashMap<String, usize>,
}

impl Statistics {
    pub fn new() -> Self {
        Self::default()
    }

    /// 记录一条已接受的刷新
    pub fn record(&mut self, record: &DungeonRecord) {
        self.total_spawns += 1;
        *self.rank_counts.entry(record.rank).or_insert(0) += 1;

        match self.island_index.get(&record.island) {
            Some(&idx) => self.island_counts[idx].1 += 1,
            None => {
                self.island_index
                    .insert(record.island.clone(), self.island_counts.len());
                self.island_counts.push((record.island.clone(), 1));
            }
        }
    }

    pub fn total_spawns(&self) -> u64 {
        self.total_spawns
    }

    pub fn rank_count(&self, rank: Rank) -> u64 {
        self.rank_counts.get(&rank).copied().unwrap_or(0)
    }

    /// 按等级从低到高
    pub fn rank_counts(&self) -> impl Iterator<Item = (Rank, u64)> + '_ {
        self.rank_counts.iter().map(|(r, c)| (*r, *c))
    }

    pub fn island_count(&self, island: &str) -> u64 {
        self.island_index
            .get(island)
            .map(|&idx| self.island_counts[idx].1)
            .unwrap_or(0)
    }

    /// 出现次数最多的 n 个岛屿
    ///
    /// 次数降序；次数相同时先出现的岛屿在前（稳定排序）。
    pub fn top_islands(&self, n: usize) -> Vec<(String, u64)> {
        let mut islands = self.island_counts.clone();
        islands.sort_by(|a, b| b.1.cmp(&a.1));
        islands.truncate(n);
        islands
    }

    pub fn is_empty(&self) -> bool {
        self.total_spawns == 0
    }
}
