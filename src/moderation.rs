//! 自动审核 - 屏蔽词过滤、删除消息并记录日志

use tracing::{info, warn};

use crate::config::ModerationConfig;
use crate::notification::channel::{ChatPlatform, OutboundMessage, SendResult};
use crate::notification::event::InboundMessage;
use crate::notification::formatter::NotificationFormatter;

/// 审核结果
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub enum ModerationOutcome {
    /// 未命中
    #[default]
    Clean,
    /// 机器人消息或审核关闭
    Skipped,
    /// 已删除
    Removed { words: Vec<String>, logged: bool },
    /// 删除失败（通常是缺少权限）
    Failed(String),
}

/// 自动审核器
#[derive(Debug, Clone)]
pub struct AutoModerator {
    enabled: bool,
    /// 已转小写
    words: Vec<String>,
    log_channel_id: Option<u64>,
}

impl AutoModerator {
    pub fn new(config: &ModerationConfig) -> Self {
        Self {
            enabled: config.enabled,
            words: config
                .words
                .iter()
                .map(|w| w.trim().to_lowercase())
                .filter(|w| !w.is_empty())
                .collect(),
            log_channel_id: config.log_channel_id,
        }
    }

    /// 命中的屏蔽词（子串匹配，不区分大小写）
    pub fn find_bad_words(&self, content: &str) -> Vec<&str> {
        let lower = content.to_lowercase();
        self.words
            .iter()
            .filter(|w| lower.contains(w.as_str()))
            .map(String::as_str)
            .collect()
    }

    /// 检查消息，命中时删除并写审核日志
    pub async fn check(
        &self,
        platform: &dyn ChatPlatform,
        formatter: &NotificationFormatter,
        message: &InboundMessage,
    ) -> ModerationOutcome {
        if !self.enabled || message.author.is_bot || message.author.is_self {
            return ModerationOutcome::Skipped;
        }

        let found = self.find_bad_words(&message.content);
        if found.is_empty() {
            return ModerationOutcome::Clean;
        }
        let words: Vec<String> = found.into_iter().map(str::to_string).collect();

        if let Err(e) = platform.delete_message(message.channel_id, message.id).await {
            warn!(
                message_id = message.id,
                channel_id = message.channel_id,
                error = %e,
                "Missing permission to delete message or platform error"
            );
            return ModerationOutcome::Failed(e.to_string());
        }
        info!(
            author_id = message.author.id,
            channel_id = message.channel_id,
            words = ?words,
            "Deleted message containing blocked words"
        );

        let Some(log_channel) = self.log_channel_id else {
            warn!("Moderation log channel not configured, skipping log");
            return ModerationOutcome::Removed { words, logged: false };
        };

        let log = OutboundMessage::notification(formatter.moderation_log(
            message.author.id,
            message.channel_id,
            &message.content,
        ));
        let logged = match platform.send(log_channel, &log).await {
            Ok(SendResult::Failed(reason)) => {
                warn!(channel_id = log_channel, reason = %reason, "Failed to write moderation log");
                false
            }
            Ok(_) => true,
            Err(e) => {
                warn!(channel_id = log_channel, error = %e, "Failed to write moderation log");
                false
            }
        };

        ModerationOutcome::Removed { words, logged }
    }
}
