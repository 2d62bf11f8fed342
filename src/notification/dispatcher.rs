//! 事件分发器 - 接收入站消息/交互，串联提取、去重、统计、格式化和发送
//!
//! 两条独立路径：
//! - 被动路径：来源频道里的刷新公告 -> 目标频道
//! - 主动路径：手动告警命令 -> 限流 -> 当前频道
//!
//! 各步骤返回显式的结果值，日志只在这里统一记录。

use chrono::{DateTime, Utc};
use std::sync::Arc;
use tracing::{debug, error, info, warn};

use super::channel::{ChatPlatform, OutboundMessage, SendResult};
use super::deduplicator::DuplicateFilter;
use super::event::{Author, InboundInteraction, InboundMessage};
use super::formatter::{msg, NotificationFormatter};
use crate::commands::{parse_command, Command, PreferencesAction};
use crate::config::BotConfig;
use crate::dungeon::{is_spawn_announcement, parse_dungeon_info, DungeonRecord, ParseOutcome, Rank};
use crate::moderation::{AutoModerator, ModerationOutcome};
use crate::state::{lock, BotState};
use crate::tickets::{TicketAction, TicketDesk};

/// 被动路径结果
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub enum SpawnOutcome {
    /// 自己发的，或不在来源频道
    #[default]
    Ignored,
    /// 不像刷新公告
    NotSpawn,
    /// 无法解析
    Unparsed(String),
    /// 窗口内重复
    Duplicate,
    /// 已发送到目标频道
    Delivered {
        rank: Rank,
        island: String,
        direct_alerts: usize,
    },
    /// 发送失败，丢弃这一条
    Dropped(String),
}

/// 命令执行结果
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CommandOutcome {
    Replied,
    /// 被限流，未产生副作用
    RateLimited,
    /// 参数错误，已回复用法
    Rejected(String),
    /// 权限不足
    Forbidden,
    /// 回复发送失败
    Failed(String),
}

/// 一条入站消息的处理报告
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct MessageReport {
    pub moderation: ModerationOutcome,
    pub spawn: SpawnOutcome,
    pub command: Option<CommandOutcome>,
}

/// 事件分发器
pub struct EventDispatcher {
    platform: Arc<dyn ChatPlatform>,
    config: Arc<BotConfig>,
    state: BotState,
    duplicates: DuplicateFilter,
    formatter: NotificationFormatter,
    moderator: AutoModerator,
    tickets: TicketDesk,
}

impl EventDispatcher {
    /// 创建分发器；配置应已通过校验
    pub fn new(config: BotConfig, platform: Arc<dyn ChatPlatform>) -> Self {
        let duplicates = DuplicateFilter::new()
            .with_window(config.duplicate_window())
            .with_lookback(config.duplicate_lookback);
        let formatter = NotificationFormatter::new(&config);
        let moderator = AutoModerator::new(&config.moderation);
        let tickets = TicketDesk::new(config.tickets.clone());
        let state = BotState::new(config.cooldown());

        info!(
            platform = platform.name(),
            source_channel_id = config.source_channel_id,
            destination_channel_id = config.destination_channel_id,
            "Dispatcher ready"
        );

        Self {
            platform,
            config: Arc::new(config),
            state,
            duplicates,
            formatter,
            moderator,
            tickets,
        }
    }

    pub fn config(&self) -> &BotConfig {
        &self.config
    }

    pub fn state(&self) -> &BotState {
        &self.state
    }

    pub fn formatter(&self) -> &NotificationFormatter {
        &self.formatter
    }

    /// 处理一条入站消息：审核 -> 被动路径 -> 命令
    ///
    /// 命令分发独立于被动路径，即使被动路径提前返回也会执行。
    pub async fn handle_message(&self, message: &InboundMessage) -> MessageReport {
        if message.author.is_self {
            return MessageReport::default();
        }

        let moderation = self
            .moderator
            .check(self.platform.as_ref(), &self.formatter, message)
            .await;

        let spawn = self.handle_spawn(message).await;
        self.log_spawn_outcome(message, &spawn);

        let command = self.handle_command(message).await;

        MessageReport {
            moderation,
            spawn,
            command,
        }
    }

    /// 被动路径（使用当前时间）
    pub async fn handle_spawn(&self, message: &InboundMessage) -> SpawnOutcome {
        self.handle_spawn_at(message, Utc::now()).await
    }

    /// 被动路径（带时间戳，用于测试）
    pub async fn handle_spawn_at(&self, message: &InboundMessage, now: DateTime<Utc>) -> SpawnOutcome {
        if message.author.is_self || message.channel_id != self.config.source_channel_id {
            return SpawnOutcome::Ignored;
        }
        if !is_spawn_announcement(&message.content) {
            return SpawnOutcome::NotSpawn;
        }

        let record = match parse_dungeon_info(&message.content) {
            ParseOutcome::Parsed(record) => record,
            ParseOutcome::Unrecognized(reason) => return SpawnOutcome::Unparsed(reason),
        };

        // 去重和追加在同一把锁内完成，并发事件不会同时通过
        {
            let mut history = lock(&self.state.history);
            if self.duplicates.is_duplicate(&history, &record, now) {
                return SpawnOutcome::Duplicate;
            }
            lock(&self.state.stats).record(&record);
            history.push(record.clone(), now, message.id);
        }

        let notification = self.formatter.dungeon_alert(&record, Some(message.created_at));
        let outbound = OutboundMessage::notification(notification).with_mention(self.config.mention_for(&record));

        match self
            .platform
            .send(self.config.destination_channel_id, &outbound)
            .await
        {
            Ok(SendResult::Failed(reason)) => return SpawnOutcome::Dropped(reason),
            Ok(_) => {}
            Err(e) => return SpawnOutcome::Dropped(e.to_string()),
        }

        let direct_alerts = if self.config.direct_alerts {
            self.send_direct_alerts(&record, &outbound).await
        } else {
            0
        };

        SpawnOutcome::Delivered {
            rank: record.rank,
            island: record.island,
            direct_alerts,
        }
    }

    /// 按偏好私信订阅用户，返回成功数
    async fn send_direct_alerts(&self, record: &DungeonRecord, outbound: &OutboundMessage) -> usize {
        let recipients = lock(&self.state.preferences).recipients_for(record);
        let mut delivered = 0;
        for user_id in recipients {
            match self.platform.send_direct(user_id, outbound).await {
                Ok(SendResult::Sent(_)) => delivered += 1,
                Ok(other) => debug!(user_id, result = ?other, "Direct alert not sent"),
                Err(e) => warn!(user_id, error = %e, "Direct alert failed"),
            }
        }
        delivered
    }

    fn log_spawn_outcome(&self, message: &InboundMessage, outcome: &SpawnOutcome) {
        match outcome {
            SpawnOutcome::Ignored | SpawnOutcome::NotSpawn => {}
            SpawnOutcome::Unparsed(reason) => {
                warn!(message_id = message.id, reason = %reason, "Failed to parse dungeon info")
            }
            SpawnOutcome::Duplicate => {
                info!(message_id = message.id, "Duplicate dungeon detected, skipping")
            }
            SpawnOutcome::Delivered {
                rank,
                island,
                direct_alerts,
            } => info!(
                rank = %rank,
                island = %island,
                direct_alerts,
                "Sent dungeon alert"
            ),
            SpawnOutcome::Dropped(reason) => error!(
                destination_channel_id = self.config.destination_channel_id,
                reason = %reason,
                "Failed to deliver dungeon alert"
            ),
        }
    }

    /// 命令路径；不是命令时返回 None
    pub async fn handle_command(&self, message: &InboundMessage) -> Option<CommandOutcome> {
        if message.author.is_self || message.author.is_bot {
            return None;
        }

        let outcome = match parse_command(&self.config.command_prefix, &message.content)? {
            Ok(command) => self.run_command(command, message).await,
            Err(e) => {
                let text = e.to_string();
                debug!(author_id = message.author.id, error = %text, "Command rejected");
                match self.reply(message, OutboundMessage::text(text.clone())).await {
                    CommandOutcome::Replied => CommandOutcome::Rejected(text),
                    failed => failed,
                }
            }
        };
        Some(outcome)
    }

    /// 执行已解析的命令
    pub async fn run_command(&self, command: Command, message: &InboundMessage) -> CommandOutcome {
        let author = &message.author;

        if command.is_rate_limited() {
            let waited = {
                let mut limiter = lock(&self.state.rate_limiter);
                let now = Utc::now();
                (!limiter.check_at(author.id, now)).then(|| limiter.remaining_at(author.id, now))
            };
            if let Some(remaining) = waited {
                info!(author_id = author.id, remaining = ?remaining, "Manual alert rate limited");
                self.reply(message, OutboundMessage::text("⏰ Please wait before creating another alert."))
                    .await;
                return CommandOutcome::RateLimited;
            }
        }

        let reply = match command {
            Command::Help => OutboundMessage::notification(self.formatter.help()),
            Command::Preferences(action) => self.preferences_reply(author.id, action),
            Command::Stats => OutboundMessage::notification(self.formatter.stats(&self.state.stats_snapshot())),
            Command::History { count } => {
                let entries = lock(&self.state.history).recent(count);
                if entries.is_empty() {
                    OutboundMessage::text(msg::NO_HISTORY)
                } else {
                    OutboundMessage::notification(self.formatter.history(&entries))
                }
            }
            Command::ManualAlert(record) => {
                info!(author_id = author.id, rank = %record.rank, island = %record.island, "Manual dungeon alert");
                OutboundMessage::notification(self.formatter.dungeon_alert(&record, None))
            }
            Command::BossAlert(record) => {
                info!(author_id = author.id, boss = %record.boss, island = %record.island, "Boss alert");
                OutboundMessage::notification(self.formatter.boss_alert(&record, None))
                    .with_mention(self.config.mention_for(&record))
            }
            Command::TicketPanel => {
                if !self.is_admin(author) {
                    self.reply(message, OutboundMessage::text("❌ You need an admin role to use this command."))
                        .await;
                    return CommandOutcome::Forbidden;
                }
                match self.tickets.config() {
                    Some(tickets) => {
                        let (panel, buttons) = self.formatter.ticket_panel(&tickets.topics);
                        buttons
                            .into_iter()
                            .fold(OutboundMessage::notification(panel), OutboundMessage::with_button)
                    }
                    None => OutboundMessage::text("❌ Tickets are not configured on this server."),
                }
            }
        };

        self.reply(message, reply).await
    }

    fn preferences_reply(&self, user_id: u64, action: PreferencesAction) -> OutboundMessage {
        match action {
            PreferencesAction::View => {
                let prefs = lock(&self.state.preferences);
                match self.formatter.preferences(prefs.get(user_id)) {
                    Some(n) => OutboundMessage::notification(n),
                    None => OutboundMessage::text(self.formatter.no_preferences()),
                }
            }
            PreferencesAction::SetRankFilter(ranks) => {
                let text = ranks.iter().map(Rank::as_str).collect::<Vec<_>>().join(", ");
                lock(&self.state.preferences).set_rank_filter(user_id, ranks);
                OutboundMessage::text(format!("✅ Rank filter set to: {}", text))
            }
            PreferencesAction::SetRedOnly(red_only) => {
                lock(&self.state.preferences).set_red_only(user_id, red_only);
                OutboundMessage::text(format!("✅ Red-only filter set to: {}", red_only))
            }
        }
    }

    fn is_admin(&self, author: &Author) -> bool {
        author
            .role_ids
            .iter()
            .any(|role| self.config.admin_role_ids.contains(role))
    }

    async fn reply(&self, message: &InboundMessage, reply: OutboundMessage) -> CommandOutcome {
        match self.platform.send(message.channel_id, &reply).await {
            Ok(SendResult::Failed(reason)) => {
                warn!(channel_id = message.channel_id, reason = %reason, "Command reply failed");
                CommandOutcome::Failed(reason)
            }
            Ok(_) => CommandOutcome::Replied,
            Err(e) => {
                warn!(channel_id = message.channel_id, error = %e, "Command reply failed");
                CommandOutcome::Failed(e.to_string())
            }
        }
    }

    /// 处理按钮交互，返回给点击者的私密回复
    pub async fn handle_interaction(&self, interaction: &InboundInteraction) -> Option<String> {
        let action = TicketAction::from_custom_id(&interaction.custom_id)?;
        let reply = match self
            .tickets
            .handle(self.platform.as_ref(), &self.formatter, action, interaction)
            .await
        {
            Ok(reply) => reply,
            Err(e) => {
                error!(
                    custom_id = %interaction.custom_id,
                    user_id = interaction.user.id,
                    error = %e,
                    "Ticket interaction failed"
                );
                "❌ Something went wrong while handling your ticket.".to_string()
            }
        };
        Some(reply)
    }
}
