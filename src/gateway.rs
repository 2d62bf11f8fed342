//! Discord 网关 - 把 serenity 事件转换成入站事件交给分发器

use anyhow::{Context as _, Result};
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serenity::all::{
    ComponentInteraction, Context, CreateInteractionResponse, CreateInteractionResponseMessage, EventHandler,
    GatewayIntents, Interaction, Message, Ready,
};
use serenity::Client;
use std::sync::{Arc, OnceLock};
use tracing::{debug, error, info};

use crate::config::BotConfig;
use crate::notification::{Author, DiscordPlatform, EventDispatcher, InboundInteraction, InboundMessage};

/// 网关需要的 intents
pub fn intents() -> GatewayIntents {
    GatewayIntents::GUILDS
        | GatewayIntents::GUILD_MESSAGES
        | GatewayIntents::DIRECT_MESSAGES
        | GatewayIntents::MESSAGE_CONTENT
}

/// serenity 事件处理器
pub struct Handler {
    dispatcher: Arc<EventDispatcher>,
    /// ready 事件后才知道自己的 ID
    self_id: OnceLock<u64>,
}

impl Handler {
    pub fn new(dispatcher: Arc<EventDispatcher>) -> Self {
        Self {
            dispatcher,
            self_id: OnceLock::new(),
        }
    }

    fn is_self(&self, user_id: u64) -> bool {
        self.self_id.get() == Some(&user_id)
    }

    fn inbound_message(&self, msg: &Message) -> InboundMessage {
        let role_ids = msg
            .member
            .as_ref()
            .map(|m| m.roles.iter().map(|r| r.get()).collect())
            .unwrap_or_default();

        InboundMessage {
            id: msg.id.get(),
            channel_id: msg.channel_id.get(),
            guild_id: msg.guild_id.map(|g| g.get()),
            author: Author {
                id: msg.author.id.get(),
                name: msg.author.name.clone(),
                is_bot: msg.author.bot,
                is_self: self.is_self(msg.author.id.get()),
                role_ids,
            },
            content: msg.content.clone(),
            created_at: DateTime::from_timestamp(msg.timestamp.unix_timestamp(), 0).unwrap_or_else(Utc::now),
        }
    }

    fn inbound_interaction(&self, component: &ComponentInteraction) -> InboundInteraction {
        let role_ids = component
            .member
            .as_ref()
            .map(|m| m.roles.iter().map(|r| r.get()).collect())
            .unwrap_or_default();

        InboundInteraction {
            custom_id: component.data.custom_id.clone(),
            user: Author {
                id: component.user.id.get(),
                name: component.user.name.clone(),
                is_bot: component.user.bot,
                is_self: false,
                role_ids,
            },
            channel_id: component.channel_id.get(),
            guild_id: component.guild_id.map(|g| g.get()),
        }
    }
}

#[async_trait]
impl EventHandler for Handler {
    async fn ready(&self, _ctx: Context, ready: Ready) {
        let _ = self.self_id.set(ready.user.id.get());
        info!(
            user = %ready.user.name,
            guilds = ready.guilds.len(),
            "Bot is online"
        );
    }

    async fn message(&self, _ctx: Context, msg: Message) {
        let inbound = self.inbound_message(&msg);
        let report = self.dispatcher.handle_message(&inbound).await;
        debug!(message_id = inbound.id, report = ?report, "Message handled");
    }

    async fn interaction_create(&self, ctx: Context, interaction: Interaction) {
        let Interaction::Component(component) = interaction else {
            return;
        };
        let inbound = self.inbound_interaction(&component);
        let Some(reply) = self.dispatcher.handle_interaction(&inbound).await else {
            return;
        };

        let response = CreateInteractionResponse::Message(
            CreateInteractionResponseMessage::new().content(reply).ephemeral(true),
        );
        if let Err(e) = component.create_response(&ctx.http, response).await {
            error!(custom_id = %inbound.custom_id, error = %e, "Failed to respond to interaction");
        }
    }
}

/// 连接网关并一直运行
pub async fn run(config: BotConfig) -> Result<()> {
    let token = config.token.clone();
    let platform = Arc::new(DiscordPlatform::from_token(&token));
    let dispatcher = Arc::new(EventDispatcher::new(config, platform));

    let mut client = Client::builder(&token, intents())
        .event_handler(Handler::new(dispatcher))
        .await
        .context("Failed to create Discord client")?;

    info!("Connecting to Discord gateway");
    client.start().await.context("Discord client stopped")?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_intents_include_message_content() {
        let i = intents();
        assert!(i.contains(GatewayIntents::MESSAGE_CONTENT));
        assert!(i.contains(GatewayIntents::GUILD_MESSAGES));
    }

    #[test]
    fn test_self_id_unknown_before_ready() {
        let platform = Arc::new(crate::notification::DryRunPlatform::new());
        let dispatcher = Arc::new(EventDispatcher::new(BotConfig::default(), platform));
        let handler = Handler::new(dispatcher);
        assert!(!handler.is_self(1));
        handler.self_id.set(1).unwrap();
        assert!(handler.is_self(1));
    }
}
