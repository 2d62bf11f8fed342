//! 聊天平台 trait 定义
//!
//! 分发器只通过 `ChatPlatform` 与外部平台交互，
//! Discord 实现见 `channels::discord`，离线回放见 `channels::dry_run`。

use anyhow::Result;
use async_trait::async_trait;
use serde::{Deserialize, Serialize};

/// 通知字段
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NotificationField {
    pub name: String,
    pub value: String,
    pub inline: bool,
}

/// 平台无关的富文本通知（对应 Discord embed）
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Notification {
    pub title: String,
    pub description: Option<String>,
    pub color: u32,
    pub fields: Vec<NotificationField>,
    pub footer: Option<String>,
    pub thumbnail: Option<String>,
}

impl Notification {
    pub fn new(title: impl Into<String>, color: u32) -> Self {
        Self {
            title: title.into(),
            color,
            ..Default::default()
        }
    }

    pub fn description(mut self, description: impl Into<String>) -> Self {
        self.description = Some(description.into());
        self
    }

    pub fn field(mut self, name: impl Into<String>, value: impl Into<String>, inline: bool) -> Self {
        self.fields.push(NotificationField {
            name: name.into(),
            value: value.into(),
            inline,
        });
        self
    }

    pub fn footer(mut self, footer: impl Into<String>) -> Self {
        self.footer = Some(footer.into());
        self
    }

    pub fn thumbnail(mut self, url: Option<String>) -> Self {
        self.thumbnail = url;
        self
    }

    /// 纯文本渲染（日志、dry-run 和 CLI 预览用）
    pub fn to_plain_text(&self) -> String {
        let mut out = self.title.clone();
        if let Some(desc) = &self.description {
            out.push_str("\n");
            out.push_str(desc);
        }
        for field in &self.fields {
            out.push_str(&format!("\n\n{}\n{}", field.name, field.value));
        }
        if let Some(footer) = &self.footer {
            out.push_str(&format!("\n\n{}", footer));
        }
        out
    }
}

/// 按钮
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Button {
    pub custom_id: String,
    pub label: String,
    /// 危险操作（关闭工单）用红色样式
    pub danger: bool,
}

/// 发出的消息
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct OutboundMessage {
    /// 纯文本内容（@ 提及放在这里）
    pub content: Option<String>,
    pub notification: Option<Notification>,
    pub buttons: Vec<Button>,
}

impl OutboundMessage {
    /// 纯文本消息
    pub fn text(content: impl Into<String>) -> Self {
        Self {
            content: Some(content.into()),
            ..Default::default()
        }
    }

    /// 富文本消息
    pub fn notification(notification: Notification) -> Self {
        Self {
            notification: Some(notification),
            ..Default::default()
        }
    }

    /// 设置提及文本，空字符串忽略
    pub fn with_mention(mut self, mention: impl Into<String>) -> Self {
        let mention = mention.into();
        if !mention.is_empty() {
            self.content = Some(mention);
        }
        self
    }

    pub fn with_button(mut self, button: Button) -> Self {
        self.buttons.push(button);
        self
    }

    /// 便于断言和日志的纯文本
    pub fn to_plain_text(&self) -> String {
        let mut parts = Vec::new();
        if let Some(content) = &self.content {
            parts.push(content.clone());
        }
        if let Some(notification) = &self.notification {
            parts.push(notification.to_plain_text());
        }
        parts.join("\n")
    }
}

/// 频道权限覆盖的对象
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum PermissionTarget {
    Member(u64),
    Role(u64),
}

/// 单个权限覆盖：允许或拒绝 查看 + 发送
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChannelOverwrite {
    pub target: PermissionTarget,
    pub allow_read_write: bool,
}

/// 创建频道请求
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChannelRequest {
    pub guild_id: u64,
    pub name: String,
    pub category_id: u64,
    pub overwrites: Vec<ChannelOverwrite>,
}

/// 发送结果
#[derive(Debug, Clone, PartialEq)]
pub enum SendResult {
    /// 发送成功，带平台消息 ID
    Sent(u64),
    /// 跳过（dry-run 等）
    Skipped(String),
    /// 发送失败
    Failed(String),
}

/// 聊天平台 trait
#[async_trait]
pub trait ChatPlatform: Send + Sync {
    /// 平台名称（用于日志）
    fn name(&self) -> &str;

    /// 发送消息到频道
    async fn send(&self, channel_id: u64, message: &OutboundMessage) -> Result<SendResult>;

    /// 私信用户
    async fn send_direct(&self, user_id: u64, message: &OutboundMessage) -> Result<SendResult>;

    /// 删除消息
    async fn delete_message(&self, channel_id: u64, message_id: u64) -> Result<()>;

    /// 创建文字频道，返回新频道 ID
    async fn create_channel(&self, request: &ChannelRequest) -> Result<u64>;

    /// 删除频道
    async fn delete_channel(&self, channel_id: u64) -> Result<()>;
}

/// Discord 风格的频道提及
pub fn channel_mention(channel_id: u64) -> String {
    format!("<#{}>", channel_id)
}

/// Discord 风格的用户提及
pub fn user_mention(user_id: u64) -> String {
    format!("<@{}>", user_id)
}
