//! Discord 平台（基于 serenity HTTP 客户端）

use anyhow::{anyhow, Context, Result};
use async_trait::async_trait;
use serenity::all::{
    ButtonStyle, ChannelId, ChannelType, CreateActionRow, CreateButton, CreateChannel, CreateEmbed,
    CreateEmbedFooter, CreateMessage, GuildId, MessageId, PermissionOverwrite, PermissionOverwriteType,
    Permissions, RoleId, UserId,
};
use serenity::http::Http;
use std::sync::Arc;
use tracing::{debug, error, info};

use crate::notification::channel::{
    ChannelRequest, ChatPlatform, Notification, OutboundMessage, PermissionTarget, SendResult,
};

/// Discord 平台
pub struct DiscordPlatform {
    http: Arc<Http>,
}

impl DiscordPlatform {
    pub fn new(http: Arc<Http>) -> Self {
        Self { http }
    }

    /// 用 bot token 创建 HTTP 客户端
    pub fn from_token(token: &str) -> Self {
        Self::new(Arc::new(Http::new(token)))
    }
}

/// serenity 的 ID 不能为 0
fn non_zero(kind: &str, id: u64) -> Result<u64> {
    if id == 0 {
        Err(anyhow!("{} id must not be 0", kind))
    } else {
        Ok(id)
    }
}

fn embed(notification: &Notification) -> CreateEmbed {
    let mut embed = CreateEmbed::new()
        .title(&notification.title)
        .colour(notification.color);
    if let Some(description) = &notification.description {
        embed = embed.description(description);
    }
    for field in &notification.fields {
        embed = embed.field(&field.name, &field.value, field.inline);
    }
    if let Some(footer) = &notification.footer {
        embed = embed.footer(CreateEmbedFooter::new(footer));
    }
    if let Some(url) = &notification.thumbnail {
        embed = embed.thumbnail(url);
    }
    embed
}

/// 转成 serenity 的消息构造器
fn build_message(message: &OutboundMessage) -> CreateMessage {
    let mut builder = CreateMessage::new();
    if let Some(content) = &message.content {
        builder = builder.content(content);
    }
    if let Some(notification) = &message.notification {
        builder = builder.embed(embed(notification));
    }
    if !message.buttons.is_empty() {
        let buttons = message
            .buttons
            .iter()
            .map(|b| {
                let style = if b.danger { ButtonStyle::Danger } else { ButtonStyle::Primary };
                CreateButton::new(&b.custom_id).label(&b.label).style(style)
            })
            .collect();
        builder = builder.components(vec![CreateActionRow::Buttons(buttons)]);
    }
    builder
}

fn overwrite(target: PermissionTarget, allow_read_write: bool) -> Result<PermissionOverwrite> {
    let kind = match target {
        PermissionTarget::Member(id) => PermissionOverwriteType::Member(UserId::new(non_zero("user", id)?)),
        PermissionTarget::Role(id) => PermissionOverwriteType::Role(RoleId::new(non_zero("role", id)?)),
    };
    let access = Permissions::VIEW_CHANNEL | Permissions::SEND_MESSAGES;
    let (allow, deny) = if allow_read_write {
        (access, Permissions::empty())
    } else {
        (Permissions::empty(), Permissions::VIEW_CHANNEL)
    };
    Ok(PermissionOverwrite { allow, deny, kind })
}

#[async_trait]
impl ChatPlatform for DiscordPlatform {
    fn name(&self) -> &str {
        "discord"
    }

    async fn send(&self, channel_id: u64, message: &OutboundMessage) -> Result<SendResult> {
        let channel = ChannelId::new(non_zero("channel", channel_id)?);
        match channel.send_message(&*self.http, build_message(message)).await {
            Ok(sent) => {
                debug!(channel = "discord", channel_id, message_id = sent.id.get(), "Message sent");
                Ok(SendResult::Sent(sent.id.get()))
            }
            Err(e) => {
                error!(channel = "discord", channel_id, error = %e, "Failed to send message");
                Ok(SendResult::Failed(e.to_string()))
            }
        }
    }

    async fn send_direct(&self, user_id: u64, message: &OutboundMessage) -> Result<SendResult> {
        let user = UserId::new(non_zero("user", user_id)?);
        match user.direct_message(&*self.http, build_message(message)).await {
            Ok(sent) => Ok(SendResult::Sent(sent.id.get())),
            // 用户关闭了私信很常见，不算错误
            Err(e) => Ok(SendResult::Skipped(e.to_string())),
        }
    }

    async fn delete_message(&self, channel_id: u64, message_id: u64) -> Result<()> {
        let channel = ChannelId::new(non_zero("channel", channel_id)?);
        let message = MessageId::new(non_zero("message", message_id)?);
        channel
            .delete_message(&*self.http, message)
            .await
            .with_context(|| format!("Failed to delete message {} in {}", message_id, channel_id))
    }

    async fn create_channel(&self, request: &ChannelRequest) -> Result<u64> {
        let guild = GuildId::new(non_zero("guild", request.guild_id)?);
        let category = ChannelId::new(non_zero("category", request.category_id)?);
        let overwrites = request
            .overwrites
            .iter()
            .map(|o| overwrite(o.target, o.allow_read_write))
            .collect::<Result<Vec<_>>>()?;

        let builder = CreateChannel::new(&request.name)
            .kind(ChannelType::Text)
            .category(category)
            .permissions(overwrites);
        let channel = guild
            .create_channel(&*self.http, builder)
            .await
            .with_context(|| format!("Failed to create channel {}", request.name))?;

        info!(channel = "discord", name = %request.name, channel_id = channel.id.get(), "Channel created");
        Ok(channel.id.get())
    }

    async fn delete_channel(&self, channel_id: u64) -> Result<()> {
        let channel = ChannelId::new(non_zero("channel", channel_id)?);
        channel
            .delete(&*self.http)
            .await
            .with_context(|| format!("Failed to delete channel {}", channel_id))?;
        info!(channel = "discord", channel_id, "Channel deleted");
        Ok(())
    }
}
