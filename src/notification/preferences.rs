//! 用户偏好 - 决定某个用户是否想收到某条告警

use serde::{Deserialize, Serialize};
use std::collections::{BTreeSet, HashMap};

use crate::dungeon::{DungeonRecord, Rank};

/// 单个用户的偏好
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct UserPreference {
    /// 只接收这些等级
    #[serde(skip_serializing_if = "Option::is_none")]
    pub rank_filter: Option<BTreeSet<Rank>>,
    /// 只接收红色地牢
    #[serde(skip_serializing_if = "Option::is_none")]
    pub red_only: Option<bool>,
}

impl UserPreference {
    pub fn is_empty(&self) -> bool {
        self.rank_filter.is_none() && self.red_only.is_none()
    }

    /// 是否允许发送该记录
    pub fn allows(&self, record: &DungeonRecord) -> bool {
        if let Some(ranks) = &self.rank_filter {
            if !ranks.contains(&record.rank) {
                return false;
            }
        }
        if self.red_only == Some(true) && !record.is_red_dungeon {
            return false;
        }
        true
    }
}

/// 偏好过滤：没有偏好视为不限制
pub fn should_alert_user(prefs: Option<&UserPreference>, record: &DungeonRecord) -> bool {
    prefs.map_or(true, |p| p.allows(record))
}

/// 解析逗号分隔的等级列表，丢弃无效值
pub fn parse_rank_filter(value: &str) -> BTreeSet<Rank> {
    value
        .split(',')
        .filter_map(|r| r.trim().parse::<Rank>().ok())
        .collect()
}

/// 进程内偏好存储
#[derive(Debug, Default)]
pub struct PreferenceStore {
    prefs: HashMap<u64, UserPreference>,
}

impl PreferenceStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn get(&self, user_id: u64) -> Option<&UserPreference> {
        self.prefs.get(&user_id)
    }

    pub fn set_rank_filter(&mut self, user_id: u64, ranks: BTreeSet<Rank>) {
        self.prefs.entry(user_id).or_default().rank_filter = Some(ranks);
    }

    pub fn set_red_only(&mut self, user_id: u64, red_only: bool) {
        self.prefs.entry(user_id).or_default().red_only = Some(red_only);
    }

    /// 应该收到该记录的用户（按 ID 排序，结果稳定）
    pub fn recipients_for(&self, record: &DungeonRecord) -> Vec<u64> {
        let mut users: Vec<u64> = self
            .prefs
            .iter()
            .filter(|(_, p)| p.allows(record))
            .map(|(id, _)| *id)
            .collect();
        users.sort_unstable();
        users
    }

    pub fn len(&self) -> usize {
        self.prefs.len()
    }

    pub fn is_empty(&self) -> bool {
        self.prefs.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn record(rank: Rank, red: bool) -> DungeonRecord {
        DungeonRecord {
            rank,
            is_red_dungeon: red,
            ..Default::default()
        }
    }

    #[test]
    fn test_absent_preferences_allow_everything() {
        for rank in Rank::ALL {
            assert!(should_alert_user(None, &record(rank, false)));
        }
        assert!(should_alert_user(Some(&UserPreference::default()), &record(Rank::E, false)));
    }

    #[test]
    fn test_rank_filter() {
        let prefs = UserPreference {
            rank_filter: Some([Rank::S, Rank::SS].into_iter().collect()),
            red_only: None,
        };
        for rank in Rank::ALL {
            let expected = matches!(rank, Rank::S | Rank::SS);
            assert_eq!(should_alert_user(Some(&prefs), &record(rank, false)), expected, "{}", rank);
        }
    }

    #[test]
    fn test_red_only() {
        let prefs = UserPreference {
            rank_filter: None,
            red_only: Some(true),
        };
        assert!(!should_alert_user(Some(&prefs), &record(Rank::SS, false)));
        assert!(should_alert_user(Some(&prefs), &record(Rank::E, true)));

        let off = UserPreference {
            rank_filter: None,
            red_only: Some(false),
        };
        assert!(should_alert_user(Some(&off), &record(Rank::E, false)));
    }

    #[test]
    fn test_parse_rank_filter_drops_invalid() {
        let ranks = parse_rank_filter(" s, ss ,x,A");
        assert_eq!(ranks.into_iter().collect::<Vec<_>>(), vec![Rank::A, Rank::S, Rank::SS]);
        assert!(parse_rank_filter("nope").is_empty());
    }

    #[test]
    fn test_store_mutates_in_place() {
        let mut store = PreferenceStore::new();
        store.set_rank_filter(7, parse_rank_filter("S"));
        store.set_red_only(7, true);

        let prefs = store.get(7).unwrap();
        assert_eq!(prefs.rank_filter.as_ref().unwrap().len(), 1);
        assert_eq!(prefs.red_only, Some(true));
        assert_eq!(store.len(), 1);
    }

    #[test]
    fn test_recipients_for() {
        let mut store = PreferenceStore::new();
        store.set_rank_filter(3, parse_rank_filter("SS"));
        store.set_red_only(1, true);
        store.set_rank_filter(2, parse_rank_filter("S,SS"));

        assert_eq!(store.recipients_for(&record(Rank::SS, false)), vec![2, 3]);
        assert_eq!(store.recipients_for(&record(Rank::S, true)), vec![1, 2]);
        assert!(store.recipients_for(&record(Rank::E, false)).is_empty());
    }
}
