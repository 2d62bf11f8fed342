//! 消息格式化模块 - 将记录和状态渲染为用户可读的通知
//!
//! 所有方法都是纯函数，不修改任何状态。

use chrono::{DateTime, Utc};
use std::collections::BTreeMap;

use super::channel::{channel_mention, user_mention, Button, Notification};
use super::preferences::UserPreference;
use super::stats::Statistics;
use crate::config::{BotConfig, TicketTopic, DEFAULT_COLOR};
use crate::dungeon::{DungeonRecord, HistoryEntry, Rank};

/// Notification text constants
pub mod msg {
    pub const ALERT_DESCRIPTION: &str =
        "✨ A new dungeon has just spawned!\nPrepare your team and dive into battle!";
    pub const COMMUNITY: &str = "🙏 **Thanks for playing!**\nYou're part of the Ascented community! 🆙\n\n";
    pub const FOOTER: &str = "Follow to get this channel's updates in your own server.";
    pub const YES: &str = "✅ Yes";
    pub const NO: &str = "❌ No";
    pub const MODERATION_FOOTER: &str = "AutoMod System";
    pub const NO_HISTORY: &str = "No dungeon history available.";
    pub const NO_PREFERENCES: &str =
        "You have no preferences set. Use `{prefix}commands` to see available options.";
}

/// 完整时间格式（日/月/年, 24 小时制）
pub const TIME_FORMAT: &str = "%d/%m/%Y, %H:%M:%S";
/// 历史列表里的短时间格式
pub const SHORT_TIME_FORMAT: &str = "%H:%M:%S";
/// 审核日志颜色
const MODERATION_COLOR: u32 = 0xE74C3C;
/// `!stats` 展示的岛屿数量
const TOP_ISLANDS: usize = 5;

fn flag(value: bool) -> &'static str {
    if value {
        msg::YES
    } else {
        msg::NO
    }
}

/// 消息格式化器
#[derive(Debug, Clone)]
pub struct NotificationFormatter {
    colors: BTreeMap<Rank, u32>,
    thumbnail: Option<String>,
    prefix: String,
}

impl NotificationFormatter {
    pub fn new(config: &BotConfig) -> Self {
        Self {
            colors: config.colors.clone(),
            thumbnail: config.thumbnail_url.clone(),
            prefix: config.command_prefix.clone(),
        }
    }

    /// 等级颜色，未配置时回退默认色
    pub fn color_for(&self, rank: Rank) -> u32 {
        self.colors.get(&rank).copied().unwrap_or(DEFAULT_COLOR)
    }

    /// 地牢信息代码块
    pub fn dungeon_block(record: &DungeonRecord) -> String {
        format!(
            "```yaml\n🌍 Island        : {}\n🗺️ Map           : {}\n👹 Boss          : {}\n🏅 Rank          : {}\n🔥 Red Dungeon   : {}\n⚔️ Double Dungeon: {}\n```",
            record.island,
            record.map,
            record.boss,
            record.rank,
            flag(record.is_red_dungeon),
            flag(record.is_double_dungeon),
        )
    }

    /// 地牢刷新告警
    ///
    /// `timestamp` 为空时使用当前时间
    pub fn dungeon_alert(&self, record: &DungeonRecord, timestamp: Option<DateTime<Utc>>) -> Notification {
        let time = timestamp.unwrap_or_else(Utc::now);

        Notification::new(
            format!("🎯 NEW DUNGEON ALERT — RANK {} 🌐", record.rank),
            self.color_for(record.rank),
        )
        .description(msg::ALERT_DESCRIPTION)
        .field("📊 Dungeon Information", Self::dungeon_block(record), false)
        .field("🎮 Community", msg::COMMUNITY, false)
        .field("🕒 Time", time.format(TIME_FORMAT).to_string(), false)
        .footer(msg::FOOTER)
        .thumbnail(self.thumbnail.clone())
    }

    /// Boss 告警
    pub fn boss_alert(&self, record: &DungeonRecord, timestamp: Option<DateTime<Utc>>) -> Notification {
        let time = timestamp.unwrap_or_else(Utc::now);

        Notification::new(
            format!("👹 BOSS ALERT — {} (RANK {})", record.boss, record.rank),
            self.color_for(record.rank),
        )
        .description(format!("⚠️ **{}** has appeared on **{}**!\nGather your raid!", record.boss, record.island))
        .field(
            "📊 Boss Information",
            format!(
                "```yaml\n🌍 Island: {}\n👹 Boss  : {}\n🏅 Rank  : {}\n```",
                record.island, record.boss, record.rank
            ),
            false,
        )
        .field("🕒 Time", time.format(TIME_FORMAT).to_string(), false)
        .footer(msg::FOOTER)
        .thumbnail(self.thumbnail.clone())
    }

    /// `!commands` 帮助
    pub fn help(&self) -> Notification {
        let p = &self.prefix;
        let commands = format!(
            "`{p}dungeon <rank> <island> <city> <map> <alienship> <boss> <red> <double>`\n\
             Create a custom dungeon alert\n\n\
             `{p}alert <rank> <island> <city> <map> <alienship> <boss> <red> <double>`\n\
             Quick dungeon alert with space-separated values\n\n\
             `{p}boss <boss> <island> [rank]`\n\
             Announce a boss spawn\n\n\
             `{p}preferences set rank_filter <ranks>`\n\
             Set which ranks you want to be notified about (e.g., S,SS)\n\n\
             `{p}preferences set red_only true/false`\n\
             Only get alerts for red dungeons\n\n\
             `{p}preferences view`\n\
             View your current preferences\n\n\
             `{p}stats`\n\
             View dungeon spawn statistics\n\n\
             `{p}history [count]`\n\
             View recent dungeon history (default: 5)"
        );

        Notification::new("🤖 Dungeon Bot Commands", DEFAULT_COLOR)
            .description("Here are all available commands:")
            .field("📋 Commands", commands, false)
            .field("📊 Ranks", Rank::list(), false)
    }

    /// `!preferences view`，没有偏好时返回 None
    pub fn preferences(&self, prefs: Option<&UserPreference>) -> Option<Notification> {
        let prefs = prefs.filter(|p| !p.is_empty())?;
        let mut n = Notification::new("Your Preferences", DEFAULT_COLOR);
        if let Some(ranks) = &prefs.rank_filter {
            let ranks: Vec<&str> = ranks.iter().map(Rank::as_str).collect();
            n = n.field("Rank Filter", ranks.join(", "), false);
        }
        if let Some(red_only) = prefs.red_only {
            n = n.field("Red Only", red_only.to_string(), false);
        }
        Some(n)
    }

    pub fn no_preferences(&self) -> String {
        msg::NO_PREFERENCES.replace("{prefix}", &self.prefix)
    }

    /// `!stats`
    pub fn stats(&self, stats: &Statistics) -> Notification {
        let mut n = Notification::new("📊 Dungeon Statistics", DEFAULT_COLOR)
            .field("Total Spawns", stats.total_spawns().to_string(), true);

        let ranks: Vec<String> = stats
            .rank_counts()
            .map(|(rank, count)| format!("{}: {}", rank, count))
            .collect();
        if !ranks.is_empty() {
            n = n.field("Ranks", ranks.join("\n"), true);
        }

        let islands: Vec<String> = stats
            .top_islands(TOP_ISLANDS)
            .into_iter()
            .map(|(island, count)| format!("{}: {}", island, count))
            .collect();
        if !islands.is_empty() {
            n = n.field("Top Islands", islands.join("\n"), true);
        }
        n
    }

    /// `!history`，条目应已按最新在前排好
    pub fn history(&self, entries: &[HistoryEntry]) -> Notification {
        let mut n = Notification::new(
            format!("📜 Recent Dungeon History ({})", entries.len()),
            DEFAULT_COLOR,
        );
        for (i, entry) in entries.iter().enumerate() {
            n = n.field(
                format!("{}. {}", i + 1, entry.timestamp.format(SHORT_TIME_FORMAT)),
                format!(
                    "🌍 {} | 👹 {} | 🏅 {}",
                    entry.record.island, entry.record.boss, entry.record.rank
                ),
                false,
            );
        }
        n
    }

    /// 审核日志
    pub fn moderation_log(&self, author_id: u64, channel_id: u64, content: &str) -> Notification {
        Notification::new("🚨 Bad Word Detected", MODERATION_COLOR)
            .description(format!(
                "**User:** {}\n**Channel:** {}\n**Message:** ||{}||",
                user_mention(author_id),
                channel_mention(channel_id),
                content
            ))
            .footer(msg::MODERATION_FOOTER)
    }

    /// 工单面板
    pub fn ticket_panel(&self, topics: &[TicketTopic]) -> (Notification, Vec<Button>) {
        let notification = Notification::new("🎫 Support Tickets", DEFAULT_COLOR)
            .description("Need help from the staff? Pick a topic below and a private channel will be opened for you.");
        let buttons = topics
            .iter()
            .map(|topic| Button {
                custom_id: format!("{}{}", crate::tickets::OPEN_PREFIX, topic.id),
                label: topic.label.clone(),
                danger: false,
            })
            .collect();
        (notification, buttons)
    }

    /// 工单频道里的欢迎消息
    pub fn ticket_welcome(&self, user_id: u64, topic: &str) -> Notification {
        Notification::new(format!("🎫 Ticket: {}", topic), DEFAULT_COLOR).description(format!(
            "Welcome {}! A staff member will be with you shortly.\nPress the button below to close this ticket.",
            user_mention(user_id)
        ))
    }

    /// 工单日志
    pub fn ticket_log(&self, action: &str, user_id: u64, channel: &str) -> Notification {
        Notification::new(format!("📁 Ticket {}", action), DEFAULT_COLOR)
            .description(format!("**User:** {}\n**Channel:** {}", user_mention(user_id), channel))
            .footer("Ticket System")
    }
}
