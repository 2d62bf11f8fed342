//! 前缀命令解析
//!
//! 解析只产生 `Command` 或面向用户的 `CommandError`，不执行任何副作用；
//! 执行在 `EventDispatcher::run_command` 中。

use std::collections::BTreeSet;

use crate::dungeon::{parse_flag, DungeonRecord, Rank, UNKNOWN};
use crate::notification::preferences::parse_rank_filter;

/// `!history` 默认条数
pub const DEFAULT_HISTORY_COUNT: usize = 5;
/// `!history` 最大条数
pub const MAX_HISTORY_COUNT: usize = 10;

/// 偏好子命令
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PreferencesAction {
    View,
    SetRankFilter(BTreeSet<Rank>),
    SetRedOnly(bool),
}

/// 已解析的命令
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Command {
    Help,
    Preferences(PreferencesAction),
    Stats,
    History { count: usize },
    /// `!dungeon` / `!alert` 手动告警
    ManualAlert(DungeonRecord),
    BossAlert(DungeonRecord),
    TicketPanel,
}

impl Command {
    /// 是否需要经过限流
    pub fn is_rate_limited(&self) -> bool {
        matches!(self, Command::ManualAlert(_) | Command::BossAlert(_))
    }
}

/// 命令错误，Display 即回复给用户的文本
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum CommandError {
    #[error("❌ Command not found. Use `{prefix}commands` to see available commands.")]
    NotFound { prefix: String },
    #[error("❌ Missing required argument: {0}")]
    MissingArgument(&'static str),
    #[error("❌ Invalid value for {name}: {value}")]
    BadArgument { name: &'static str, value: String },
    #[error("❌ Usage: {0}")]
    Usage(String),
    #[error("❌ Invalid setting. Use `rank_filter` or `red_only`.")]
    InvalidSetting,
    #[error("❌ Please provide at least rank and island. Use `{prefix}commands` for usage.")]
    AlertTooShort { prefix: String },
    #[error("❌ Could not parse arguments: {0}")]
    Quoting(String),
}

/// 解析消息
///
/// 不以前缀开头时返回 `None`
pub fn parse_command(prefix: &str, content: &str) -> Option<Result<Command, CommandError>> {
    let body = content.trim_start().strip_prefix(prefix)?;
    let (name, rest) = split_first_word(body);
    if name.is_empty() {
        return None;
    }

    Some(match name.to_lowercase().as_str() {
        "commands" => Ok(Command::Help),
        "preferences" => parse_preferences(prefix, rest),
        "stats" => Ok(Command::Stats),
        "history" => parse_history(rest),
        "dungeon" => split_args(rest).map(|args| Command::ManualAlert(manual_record(&args))),
        "alert" => parse_alert(prefix, rest),
        "boss" => parse_boss(rest),
        "ticketpanel" => Ok(Command::TicketPanel),
        _ => Err(CommandError::NotFound {
            prefix: prefix.to_string(),
        }),
    })
}

/// 拆出第一个词和剩余部分（均已 trim）
fn split_first_word(text: &str) -> (&str, &str) {
    let text = text.trim();
    match text.split_once(char::is_whitespace) {
        Some((first, rest)) => (first, rest.trim()),
        None => (text, ""),
    }
}

fn split_args(rest: &str) -> Result<Vec<String>, CommandError> {
    shell_words::split(rest).map_err(|e| CommandError::Quoting(e.to_string()))
}

/// `!preferences view` / `!preferences set <setting> <value>`
fn parse_preferences(prefix: &str, rest: &str) -> Result<Command, CommandError> {
    let usage = || {
        CommandError::Usage(format!(
            "`{p}preferences view` or `{p}preferences set <setting> <value>`",
            p = prefix
        ))
    };

    let (action, rest) = split_first_word(rest);
    let (setting, value) = split_first_word(rest);

    match action {
        "view" => Ok(Command::Preferences(PreferencesAction::View)),
        "set" if !setting.is_empty() && !value.is_empty() => match setting {
            "rank_filter" => Ok(Command::Preferences(PreferencesAction::SetRankFilter(
                parse_rank_filter(value),
            ))),
            "red_only" => Ok(Command::Preferences(PreferencesAction::SetRedOnly(
                value.eq_ignore_ascii_case("true"),
            ))),
            _ => Err(CommandError::InvalidSetting),
        },
        _ => Err(usage()),
    }
}

/// `!history [count]`，条数限制在 1..=10
fn parse_history(rest: &str) -> Result<Command, CommandError> {
    let count = match rest.split_whitespace().next() {
        None => DEFAULT_HISTORY_COUNT,
        Some(raw) => {
            let n: i64 = raw.parse().map_err(|_| CommandError::BadArgument {
                name: "count",
                value: raw.to_string(),
            })?;
            n.clamp(1, MAX_HISTORY_COUNT as i64) as usize
        }
    };
    Ok(Command::History { count })
}

/// `!alert` 用空白分隔，至少需要等级和岛屿
fn parse_alert(prefix: &str, rest: &str) -> Result<Command, CommandError> {
    let args: Vec<String> = rest.split_whitespace().map(str::to_string).collect();
    if args.is_empty() {
        return Err(CommandError::MissingArgument("dungeon_info"));
    }
    if args.len() < 2 {
        return Err(CommandError::AlertTooShort {
            prefix: prefix.to_string(),
        });
    }
    Ok(Command::ManualAlert(manual_record(&args)))
}

/// `!boss <boss> <island> [rank]`
fn parse_boss(rest: &str) -> Result<Command, CommandError> {
    let args = split_args(rest)?;
    let boss = args.first().ok_or(CommandError::MissingArgument("boss"))?;
    let island = args.get(1).ok_or(CommandError::MissingArgument("island"))?;
    let rank = match args.get(2) {
        Some(raw) => raw.parse::<Rank>().map_err(|_| CommandError::BadArgument {
            name: "rank",
            value: raw.clone(),
        })?,
        None => Rank::S,
    };

    Ok(Command::BossAlert(DungeonRecord {
        island: island.clone(),
        map: UNKNOWN.to_string(),
        boss: boss.clone(),
        rank,
        is_red_dungeon: false,
        is_double_dungeon: false,
    }))
}

/// 位置参数：rank island city map alienship boss red double
///
/// city 和 alienship 只占位，不进入记录
fn manual_record(args: &[String]) -> DungeonRecord {
    let arg = |i: usize, default: &str| args.get(i).cloned().unwrap_or_else(|| default.to_string());

    DungeonRecord {
        rank: Rank::parse_lenient(&arg(0, "E")),
        island: arg(1, "XZ"),
        map: arg(3, ""),
        boss: arg(5, "Paitama"),
        is_red_dungeon: parse_flag(&arg(6, "No")),
        is_double_dungeon: parse_flag(&arg(7, "No")),
    }
}
