//! 入站事件 - 平台适配层转换后的消息和交互

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// 消息作者
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Author {
    pub id: u64,
    #[serde(default)]
    pub name: String,
    /// 作者是机器人
    #[serde(default)]
    pub is_bot: bool,
    /// 作者就是本机器人
    #[serde(default)]
    pub is_self: bool,
    /// 作者在服务器中的角色
    #[serde(default)]
    pub role_ids: Vec<u64>,
}

/// 入站消息
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct InboundMessage {
    pub id: u64,
    pub channel_id: u64,
    #[serde(default)]
    pub guild_id: Option<u64>,
    pub author: Author,
    pub content: String,
    #[serde(default = "Utc::now")]
    pub created_at: DateTime<Utc>,
}

/// 入站交互（按钮点击）
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct InboundInteraction {
    pub custom_id: String,
    pub user: Author,
    pub channel_id: u64,
    #[serde(default)]
    pub guild_id: Option<u64>,
}
