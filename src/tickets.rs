//! 工单 - 通过按钮开启私有频道，员工和开单人可见

use anyhow::{anyhow, Result};
use std::collections::HashMap;
use std::sync::Mutex;
use tracing::{info, warn};

use crate::config::TicketConfig;
use crate::notification::channel::{
    channel_mention, Button, ChannelOverwrite, ChannelRequest, ChatPlatform, OutboundMessage,
    PermissionTarget,
};
use crate::notification::event::InboundInteraction;
use crate::notification::formatter::NotificationFormatter;
use crate::state::lock;

/// 开单按钮 custom id 前缀，后接 topic id
pub const OPEN_PREFIX: &str = "ticket:open:";
/// 关单按钮 custom id
pub const CLOSE_ID: &str = "ticket:close";

/// 交互对应的工单动作
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TicketAction {
    Open(String),
    Close,
}

impl TicketAction {
    pub fn from_custom_id(custom_id: &str) -> Option<Self> {
        if custom_id == CLOSE_ID {
            return Some(TicketAction::Close);
        }
        custom_id
            .strip_prefix(OPEN_PREFIX)
            .filter(|topic| !topic.is_empty())
            .map(|topic| TicketAction::Open(topic.to_string()))
    }
}

/// 工单频道名：`ticket-<用户名>`，只保留小写字母数字和 `-`
pub fn ticket_channel_name(username: &str, user_id: u64) -> String {
    let slug: String = username
        .to_lowercase()
        .chars()
        .map(|c| if c.is_ascii_alphanumeric() { c } else { '-' })
        .collect();
    let slug = slug.trim_matches('-');
    if slug.is_empty() {
        format!("ticket-{}", user_id)
    } else {
        format!("ticket-{}", slug)
    }
}

/// 开单人的工单槽位
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Slot {
    /// 频道创建中
    Pending,
    Open(u64),
}

/// 工单台
pub struct TicketDesk {
    config: Option<TicketConfig>,
    /// 开单人 -> 工单槽位；创建频道前先占位，连点不会开出两个
    open: Mutex<HashMap<u64, Slot>>,
}

impl TicketDesk {
    pub fn new(config: Option<TicketConfig>) -> Self {
        Self {
            config,
            open: Mutex::new(HashMap::new()),
        }
    }

    pub fn config(&self) -> Option<&TicketConfig> {
        self.config.as_ref()
    }

    /// 用户当前打开的工单（创建中的不算）
    pub fn open_ticket_of(&self, user_id: u64) -> Option<u64> {
        match lock(&self.open).get(&user_id) {
            Some(Slot::Open(channel_id)) => Some(*channel_id),
            _ => None,
        }
    }

    /// 处理交互，返回给点击者的回复
    pub async fn handle(
        &self,
        platform: &dyn ChatPlatform,
        formatter: &NotificationFormatter,
        action: TicketAction,
        interaction: &InboundInteraction,
    ) -> Result<String> {
        let Some(config) = &self.config else {
            return Ok("❌ Tickets are not configured on this server.".to_string());
        };
        match action {
            TicketAction::Open(topic) => self.open(platform, formatter, config, &topic, interaction).await,
            TicketAction::Close => self.close(platform, formatter, config, interaction).await,
        }
    }

    async fn open(
        &self,
        platform: &dyn ChatPlatform,
        formatter: &NotificationFormatter,
        config: &TicketConfig,
        topic_id: &str,
        interaction: &InboundInteraction,
    ) -> Result<String> {
        let user = &interaction.user;
        let guild_id = interaction
            .guild_id
            .ok_or_else(|| anyhow!("ticket interaction outside a guild"))?;

        // 检查和占位在同一把锁内
        {
            let mut open = lock(&self.open);
            match open.get(&user.id).copied() {
                Some(Slot::Open(existing)) => {
                    return Ok(format!("You already have an open ticket: {}", channel_mention(existing)));
                }
                Some(Slot::Pending) => return Ok("⏳ Your ticket is being created.".to_string()),
                None => {
                    open.insert(user.id, Slot::Pending);
                }
            }
        }

        let topic = config
            .topics
            .iter()
            .find(|t| t.id == topic_id)
            .map(|t| t.label.clone())
            .unwrap_or_else(|| topic_id.to_string());

        let request = ChannelRequest {
            guild_id,
            name: ticket_channel_name(&user.name, user.id),
            category_id: config.category_id,
            overwrites: vec![
                // @everyone 的角色 ID 就是服务器 ID
                ChannelOverwrite {
                    target: PermissionTarget::Role(guild_id),
                    allow_read_write: false,
                },
                ChannelOverwrite {
                    target: PermissionTarget::Member(user.id),
                    allow_read_write: true,
                },
                ChannelOverwrite {
                    target: PermissionTarget::Role(config.staff_role_id),
                    allow_read_write: true,
                },
            ],
        };
        let channel_id = match platform.create_channel(&request).await {
            Ok(id) => id,
            Err(e) => {
                lock(&self.open).remove(&user.id);
                return Err(e);
            }
        };
        lock(&self.open).insert(user.id, Slot::Open(channel_id));
        info!(user_id = user.id, channel_id, topic = %topic, "Ticket opened");

        let welcome = OutboundMessage::notification(formatter.ticket_welcome(user.id, &topic)).with_button(Button {
            custom_id: CLOSE_ID.to_string(),
            label: "🔒 Close Ticket".to_string(),
            danger: true,
        });
        if let Err(e) = platform.send(channel_id, &welcome).await {
            warn!(channel_id, error = %e, "Failed to post ticket welcome");
        }
        self.log(platform, formatter, config, "Opened", user.id, &channel_mention(channel_id))
            .await;

        Ok(format!("✅ Ticket created: {}", channel_mention(channel_id)))
    }

    async fn close(
        &self,
        platform: &dyn ChatPlatform,
        formatter: &NotificationFormatter,
        config: &TicketConfig,
        interaction: &InboundInteraction,
    ) -> Result<String> {
        let channel_id = interaction.channel_id;
        let owner = lock(&self.open)
            .iter()
            .find(|(_, slot)| **slot == Slot::Open(channel_id))
            .map(|(user, _)| *user);
        let Some(owner) = owner else {
            return Ok("❌ This channel is not an open ticket.".to_string());
        };

        let user = &interaction.user;
        if user.id != owner && !user.role_ids.contains(&config.staff_role_id) {
            return Ok("❌ Only the ticket owner or staff can close this ticket.".to_string());
        }

        platform.delete_channel(channel_id).await?;
        lock(&self.open).remove(&owner);
        info!(owner_id = owner, closed_by = user.id, channel_id, "Ticket closed");

        let name = format!("#{}", channel_id);
        self.log(platform, formatter, config, "Closed", owner, &name).await;
        Ok("🔒 Ticket closed.".to_string())
    }

    async fn log(
        &self,
        platform: &dyn ChatPlatform,
        formatter: &NotificationFormatter,
        config: &TicketConfig,
        action: &str,
        user_id: u64,
        channel: &str,
    ) {
        let message = OutboundMessage::notification(formatter.ticket_log(action, user_id, channel));
        if let Err(e) = platform.send(config.log_channel_id, &message).await {
            warn!(channel_id = config.log_channel_id, error = %e, "Failed to write ticket log");
        }
    }
}
