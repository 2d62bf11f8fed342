//! Dry-run 平台 - 不连接 Discord，只记录所有出站操作
//!
//! 用于 `replay` 子命令和测试。

use anyhow::Result;
use async_trait::async_trait;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Mutex;
use tracing::info;

use crate::notification::channel::{ChannelRequest, ChatPlatform, OutboundMessage, SendResult};
use crate::state::lock;

/// 记录下来的出站操作
#[derive(Debug, Clone, PartialEq)]
pub enum Outbound {
    Message { channel_id: u64, message: OutboundMessage },
    Direct { user_id: u64, message: OutboundMessage },
    DeleteMessage { channel_id: u64, message_id: u64 },
    CreateChannel(ChannelRequest),
    DeleteChannel(u64),
}

/// Dry-run 平台
pub struct DryRunPlatform {
    next_id: AtomicU64,
    log: Mutex<Vec<Outbound>>,
}

impl DryRunPlatform {
    pub fn new() -> Self {
        Self {
            next_id: AtomicU64::new(1_000),
            log: Mutex::new(Vec::new()),
        }
    }

    /// 到目前为止的全部操作
    pub fn outbound(&self) -> Vec<Outbound> {
        lock(&self.log).clone()
    }

    /// 发到指定频道的消息
    pub fn messages_to(&self, channel_id: u64) -> Vec<OutboundMessage> {
        lock(&self.log)
            .iter()
            .filter_map(|o| match o {
                Outbound::Message { channel_id: c, message } if *c == channel_id => Some(message.clone()),
                _ => None,
            })
            .collect()
    }

    /// 发给指定用户的私信
    pub fn directs_to(&self, user_id: u64) -> Vec<OutboundMessage> {
        lock(&self.log)
            .iter()
            .filter_map(|o| match o {
                Outbound::Direct { user_id: u, message } if *u == user_id => Some(message.clone()),
                _ => None,
            })
            .collect()
    }

    fn record(&self, outbound: Outbound) -> u64 {
        lock(&self.log).push(outbound);
        self.next_id.fetch_add(1, Ordering::Relaxed)
    }
}

impl Default for DryRunPlatform {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl ChatPlatform for DryRunPlatform {
    fn name(&self) -> &str {
        "dry_run"
    }

    async fn send(&self, channel_id: u64, message: &OutboundMessage) -> Result<SendResult> {
        info!(channel = "dry_run", channel_id, text = %message.to_plain_text(), "Would send message");
        let id = self.record(Outbound::Message {
            channel_id,
            message: message.clone(),
        });
        Ok(SendResult::Sent(id))
    }

    async fn send_direct(&self, user_id: u64, message: &OutboundMessage) -> Result<SendResult> {
        info!(channel = "dry_run", user_id, "Would send direct message");
        let id = self.record(Outbound::Direct {
            user_id,
            message: message.clone(),
        });
        Ok(SendResult::Sent(id))
    }

    async fn delete_message(&self, channel_id: u64, message_id: u64) -> Result<()> {
        info!(channel = "dry_run", channel_id, message_id, "Would delete message");
        self.record(Outbound::DeleteMessage { channel_id, message_id });
        Ok(())
    }

    async fn create_channel(&self, request: &ChannelRequest) -> Result<u64> {
        info!(channel = "dry_run", name = %request.name, "Would create channel");
        Ok(self.record(Outbound::CreateChannel(request.clone())))
    }

    async fn delete_channel(&self, channel_id: u64) -> Result<()> {
        info!(channel = "dry_run", channel_id, "Would delete channel");
        self.record(Outbound::DeleteChannel(channel_id));
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_dry_run_records_messages() {
        let platform = DryRunPlatform::new();
        let result = platform.send(7, &OutboundMessage::text("hi")).await.unwrap();
        assert!(matches!(result, SendResult::Sent(_)));

        platform.send(8, &OutboundMessage::text("other")).await.unwrap();
        platform.send_direct(42, &OutboundMessage::text("dm")).await.unwrap();

        assert_eq!(platform.messages_to(7), vec![OutboundMessage::text("hi")]);
        assert_eq!(platform.directs_to(42).len(), 1);
        assert_eq!(platform.outbound().len(), 3);
    }

    #[tokio::test]
    async fn test_dry_run_ids_are_unique() {
        let platform = DryRunPlatform::new();
        let request = ChannelRequest {
            guild_id: 1,
            name: "ticket-a".into(),
            category_id: 2,
            overwrites: vec![],
        };
        let a = platform.create_channel(&request).await.unwrap();
        let b = platform.send(1, &OutboundMessage::text("x")).await.unwrap();
        assert_ne!(SendResult::Sent(a), b);
    }

    #[tokio::test]
    async fn test_records_channel_deletion() {
        let platform = DryRunPlatform::new();
        platform.delete_channel(5).await.unwrap();
        assert_eq!(platform.outbound(), vec![Outbound::DeleteChannel(5)]);
    }
}
