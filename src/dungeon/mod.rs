//! 地牢领域模型：等级、记录、历史和公告解析

pub mod extractor;
pub mod rank;
pub mod record;

pub use extractor::{is_spawn_announcement, parse_dungeon_info, DungeonExtractor, Field, ParseOutcome};
pub use rank::{Rank, UnknownRank};
pub use record::{parse_flag, DungeonRecord, History, HistoryEntry, UNKNOWN};
