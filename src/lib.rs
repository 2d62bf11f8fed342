//! Dungeon Alert Bot - 把游戏地牢刷新公告转发成带样式的 Discord 告警

pub mod commands;
pub mod config;
pub mod dungeon;
pub mod gateway;
pub mod moderation;
pub mod notification;
pub mod state;
pub mod tickets;

pub use commands::{parse_command, Command, CommandError, PreferencesAction};
pub use config::{BotConfig, ConfigError, ModerationConfig, TicketConfig, TicketTopic};
pub use dungeon::{
    is_spawn_announcement, parse_dungeon_info, DungeonRecord, History, HistoryEntry, ParseOutcome, Rank,
};
pub use moderation::{AutoModerator, ModerationOutcome};
pub use notification::{
    Author, ChatPlatform, CommandOutcome, DiscordPlatform, DryRunPlatform, EventDispatcher, InboundInteraction,
    InboundMessage, MessageReport, NotificationFormatter, OutboundMessage, SendResult, SpawnOutcome,
};
pub use state::BotState;
pub use tickets::{TicketAction, TicketDesk};
