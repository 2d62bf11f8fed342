//! 字段提取器 - 从公告文本中提取地牢信息
//!
//! 公告是 YAML 风格的逐行文本：
//! ```text
//! 🌍 Island: Earth
//! 🗺️ Map: Plains
//! 👹 Boss: Orc
//! 🏅 Rank: SS
//! 🔥 Red Dungeon: ✅
//! ⚔️ Double Dungeon: No
//! ```
//! 每个字段独立匹配，未匹配的字段保留默认值，结果永远是完整记录。

use std::sync::OnceLock;

use regex::Regex;
use tracing::{debug, error};

use super::rank::Rank;
use super::record::DungeonRecord;

/// 判定为刷新公告的关键字
const SPAWN_TOKEN: &str = "spawned";
/// 三个标记字符同时出现也视为公告（🗺 不带 U+FE0F，两种写法都能命中）
const MARKER_GLYPHS: [&str; 3] = ["🌍", "\u{1F5FA}", "👹"];
/// 布尔字段的"是"标记
const CHECK_MARK: char = '✅';

/// 公告中的字段
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Field {
    Island,
    Map,
    Boss,
    Rank,
    RedDungeon,
    DoubleDungeon,
}

impl Field {
    fn pattern(&self) -> &'static str {
        // U+FE0F 在部分客户端会被去掉，所以可选；[^\S\r\n] 不跨行
        match self {
            Field::Island => r"(?i)🌍[^\S\r\n]*Island[^\S\r\n]*:[^\S\r\n]*(.+)",
            Field::Map => r"(?i)🗺\x{FE0F}?[^\S\r\n]*Map[^\S\r\n]*:[^\S\r\n]*(.+)",
            Field::Boss => r"(?i)👹[^\S\r\n]*Boss[^\S\r\n]*:[^\S\r\n]*(.+)",
            Field::Rank => r"(?i)🏅[^\S\r\n]*Rank[^\S\r\n]*:[^\S\r\n]*(.+)",
            Field::RedDungeon => r"(?i)🔥[^\S\r\n]*Red Dungeon[^\S\r\n]*:[^\S\r\n]*(.+)",
            Field::DoubleDungeon => r"(?i)⚔\x{FE0F}?[^\S\r\n]*Double Dungeon[^\S\r\n]*:[^\S\r\n]*(.+)",
        }
    }

    const ALL: [Field; 6] = [
        Field::Island,
        Field::Map,
        Field::Boss,
        Field::Rank,
        Field::RedDungeon,
        Field::DoubleDungeon,
    ];
}

/// 提取结果
#[derive(Debug, Clone, PartialEq)]
pub enum ParseOutcome {
    /// 提取成功（可能全部是默认值）
    Parsed(DungeonRecord),
    /// 无法解析，调用方应丢弃该消息
    Unrecognized(String),
}

impl ParseOutcome {
    pub fn record(self) -> Option<DungeonRecord> {
        match self {
            ParseOutcome::Parsed(record) => Some(record),
            ParseOutcome::Unrecognized(_) => None,
        }
    }
}

/// 地牢信息提取器
pub struct DungeonExtractor {
    patterns: Vec<(Field, Regex)>,
}

impl DungeonExtractor {
    /// 编译所有字段模式
    pub fn new() -> Result<Self, regex::Error> {
        let patterns = Field::ALL
            .iter()
            .map(|field| Regex::new(field.pattern()).map(|re| (*field, re)))
            .collect::<Result<Vec<_>, _>>()?;
        Ok(Self { patterns })
    }

    /// 提取单个字段（已 trim），空值视为未匹配
    pub fn capture<'t>(&self, field: Field, text: &'t str) -> Option<&'t str> {
        let (_, re) = self.patterns.iter().find(|(f, _)| *f == field)?;
        re.captures(text)
            .and_then(|caps| caps.get(1))
            .map(|m| m.as_str().trim())
            .filter(|v| !v.is_empty())
    }

    /// 从文本提取完整记录
    pub fn extract(&self, text: &str) -> ParseOutcome {
        let mut record = DungeonRecord::default();

        for field in Field::ALL {
            let Some(value) = self.capture(field, text) else {
                continue;
            };
            match field {
                Field::Island => record.island = value.to_string(),
                Field::Map => record.map = value.to_string(),
                Field::Boss => record.boss = value.to_string(),
                Field::Rank => record.rank = Rank::parse_lenient(value),
                Field::RedDungeon => record.is_red_dungeon = normalize_flag(value),
                Field::DoubleDungeon => record.is_double_dungeon = normalize_flag(value),
            }
        }

        debug!(
            island = %record.island,
            boss = %record.boss,
            rank = %record.rank,
            "Extracted dungeon record"
        );
        ParseOutcome::Parsed(record)
    }
}

/// 公告里的标记：包含 ✅ 或 "yes"（不区分大小写）即为真
fn normalize_flag(value: &str) -> bool {
    value.contains(CHECK_MARK) || value.to_lowercase().contains("yes")
}

/// 是否像一条刷新公告
pub fn is_spawn_announcement(text: &str) -> bool {
    text.to_lowercase().contains(SPAWN_TOKEN)
        || MARKER_GLYPHS.iter().all(|glyph| text.contains(glyph))
}

/// 使用进程内共享的提取器解析文本
///
/// 模式编译失败时返回 `Unrecognized`，不会 panic。
pub fn parse_dungeon_info(text: &str) -> ParseOutcome {
    static EXTRACTOR: OnceLock<Result<DungeonExtractor, regex::Error>> = OnceLock::new();

    match EXTRACTOR.get_or_init(DungeonExtractor::new) {
        Ok(extractor) => extractor.extract(text),
        Err(e) => {
            error!(error = %e, "Dungeon patterns failed to compile");
            ParseOutcome::Unrecognized(format!("unable to parse: {}", e))
        }
    }
}
