//! 分发器端到端测试 - 用 dry-run 平台走完整条消息链路

use chrono::{Duration, TimeZone, Utc};
use dungeon_alert_bot::notification::{Outbound, PermissionTarget};
use dungeon_alert_bot::{
    Author, BotConfig, CommandOutcome, DryRunPlatform, EventDispatcher, InboundInteraction, InboundMessage,
    ModerationOutcome, Rank, SpawnOutcome, TicketConfig, TicketTopic,
};
use std::sync::Arc;

const GUILD: u64 = 1;
const SOURCE: u64 = 100;
const DEST: u64 = 200;
const CHAT: u64 = 300;
const MOD_LOG: u64 = 400;
const TICKET_CATEGORY: u64 = 500;
const TICKET_LOG: u64 = 600;
const STAFF_ROLE: u64 = 700;
const ADMIN_ROLE: u64 = 800;

const ANNOUNCEMENT: &str = "A dungeon has spawned!\n🌍 Island: Earth\n🗺️ Map: Plains\n👹 Boss: Orc\n🏅 Rank: ss\n🔥 Red Dungeon: ✅\n⚔️ Double Dungeon: No";

fn config() -> BotConfig {
    let mut config = BotConfig {
        token: "token".to_string(),
        source_channel_id: SOURCE,
        destination_channel_id: DEST,
        admin_role_ids: vec![ADMIN_ROLE],
        tickets: Some(TicketConfig {
            category_id: TICKET_CATEGORY,
            staff_role_id: STAFF_ROLE,
            log_channel_id: TICKET_LOG,
            topics: vec![TicketTopic {
                id: "support".to_string(),
                label: "Support".to_string(),
            }],
        }),
        ..Default::default()
    };
    config.moderation.log_channel_id = Some(MOD_LOG);
    config
}

fn setup() -> (Arc<DryRunPlatform>, EventDispatcher) {
    let platform = Arc::new(DryRunPlatform::new());
    let dispatcher = EventDispatcher::new(config(), platform.clone());
    (platform, dispatcher)
}

fn user(id: u64, name: &str) -> Author {
    Author {
        id,
        name: name.to_string(),
        ..Default::default()
    }
}

fn message(id: u64, channel_id: u64, author: Author, content: &str) -> InboundMessage {
    InboundMessage {
        id,
        channel_id,
        guild_id: Some(GUILD),
        author,
        content: content.to_string(),
        created_at: Utc.with_ymd_and_hms(2024, 5, 1, 12, 30, 0).unwrap(),
    }
}

#[tokio::test]
async fn test_announcement_becomes_styled_alert() {
    let (platform, dispatcher) = setup();
    let report = dispatcher
        .handle_message(&message(1, SOURCE, user(9, "announcer"), ANNOUNCEMENT))
        .await;

    assert_eq!(report.moderation, ModerationOutcome::Clean);
    assert!(matches!(report.spawn, SpawnOutcome::Delivered { rank: Rank::SS, .. }));
    assert_eq!(report.command, None);

    let sent = platform.messages_to(DEST);
    assert_eq!(sent.len(), 1);
    let text = sent[0].to_plain_text();
    assert!(text.contains("@Elite-Raiders"));
    assert!(text.contains("Earth"));
    assert!(text.contains("Plains"));
    assert!(text.contains("Orc"));
    assert!(text.contains("01/05/2024, 12:30:00"));
}

#[tokio::test]
async fn test_blank_field_keeps_unknown_in_alert() {
    let (platform, dispatcher) = setup();
    let text = "spawned\n🌍 Island:\n🗺️ Map: Plains\n👹 Boss: Orc\n🏅 Rank: A";
    let report = dispatcher
        .handle_message(&message(1, SOURCE, user(9, "announcer"), text))
        .await;

    assert_eq!(
        report.spawn,
        SpawnOutcome::Delivered {
            rank: Rank::A,
            island: "Unknown".to_string(),
            direct_alerts: 0,
        }
    );
    let alert = platform.messages_to(DEST)[0].to_plain_text();
    assert!(alert.contains("Island        : Unknown"));
    assert!(alert.contains("Map           : Plains"));
}

#[tokio::test]
async fn test_duplicate_announcement_sent_once() {
    let (platform, dispatcher) = setup();
    let now = Utc::now();
    let first = message(1, SOURCE, user(9, "announcer"), ANNOUNCEMENT);
    let second = message(2, SOURCE, user(9, "announcer"), ANNOUNCEMENT);

    dispatcher.handle_spawn_at(&first, now).await;
    let outcome = dispatcher.handle_spawn_at(&second, now + Duration::seconds(60)).await;

    assert_eq!(outcome, SpawnOutcome::Duplicate);
    assert_eq!(platform.messages_to(DEST).len(), 1);
    assert_eq!(dispatcher.state().stats_snapshot().total_spawns(), 1);
}

#[tokio::test]
async fn test_different_rank_is_not_duplicate() {
    let (platform, dispatcher) = setup();
    let now = Utc::now();
    let other = ANNOUNCEMENT.replace("Rank: ss", "Rank: A");

    dispatcher
        .handle_spawn_at(&message(1, SOURCE, user(9, "a"), ANNOUNCEMENT), now)
        .await;
    dispatcher
        .handle_spawn_at(&message(2, SOURCE, user(9, "a"), &other), now)
        .await;

    assert_eq!(platform.messages_to(DEST).len(), 2);
    let stats = dispatcher.state().stats_snapshot();
    assert_eq!(stats.rank_count(Rank::SS), 1);
    assert_eq!(stats.rank_count(Rank::A), 1);
    assert_eq!(stats.island_count("Earth"), 2);
}

#[tokio::test]
async fn test_stats_and_history_commands_reflect_spawns() {
    let (platform, dispatcher) = setup();
    dispatcher
        .handle_message(&message(1, SOURCE, user(9, "a"), ANNOUNCEMENT))
        .await;

    let report = dispatcher
        .handle_message(&message(2, CHAT, user(10, "hunter"), "!stats"))
        .await;
    assert_eq!(report.command, Some(CommandOutcome::Replied));
    assert_eq!(report.spawn, SpawnOutcome::Ignored);

    dispatcher
        .handle_message(&message(3, CHAT, user(10, "hunter"), "!history 50"))
        .await;

    let replies = platform.messages_to(CHAT);
    assert_eq!(replies.len(), 2);
    assert!(replies[0].to_plain_text().contains("Earth"));
    assert!(replies[1].to_plain_text().contains("Orc"));
}

#[tokio::test]
async fn test_unknown_command_gets_help_hint() {
    let (platform, dispatcher) = setup();
    let report = dispatcher
        .handle_message(&message(1, CHAT, user(10, "hunter"), "!xyz"))
        .await;

    assert!(matches!(report.command, Some(CommandOutcome::Rejected(_))));
    let reply = &platform.messages_to(CHAT)[0];
    assert_eq!(
        reply.content.as_deref(),
        Some("❌ Command not found. Use `!commands` to see available commands.")
    );
}

#[tokio::test]
async fn test_manual_dungeon_command() {
    let (platform, dispatcher) = setup();
    dispatcher
        .handle_message(&message(
            1,
            CHAT,
            user(10, "hunter"),
            r#"!dungeon A "Frost Peak" Seoul Tundra none Igris yes no"#,
        ))
        .await;

    let reply = platform.messages_to(CHAT)[0].to_plain_text();
    assert!(reply.contains("RANK A"));
    assert!(reply.contains("Frost Peak"));
    assert!(reply.contains("Tundra"));
    assert!(reply.contains("Igris"));
    // 手动告警不发到目标频道
    assert!(platform.messages_to(DEST).is_empty());
}

#[tokio::test]
async fn test_bad_word_is_removed_and_logged() {
    let (platform, dispatcher) = setup();
    let report = dispatcher
        .handle_message(&message(42, CHAT, user(10, "rude"), "this is STUPID"))
        .await;

    assert_eq!(
        report.moderation,
        ModerationOutcome::Removed {
            words: vec!["stupid".to_string()],
            logged: true,
        }
    );
    assert!(platform.outbound().contains(&Outbound::DeleteMessage {
        channel_id: CHAT,
        message_id: 42,
    }));
    let log = platform.messages_to(MOD_LOG)[0].to_plain_text();
    assert!(log.contains("Bad Word Detected"));
}

#[tokio::test]
async fn test_bots_are_not_moderated() {
    let (platform, dispatcher) = setup();
    let mut author = user(10, "other-bot");
    author.is_bot = true;
    let report = dispatcher
        .handle_message(&message(42, CHAT, author, "stupid"))
        .await;

    assert_eq!(report.moderation, ModerationOutcome::Skipped);
    assert!(platform.outbound().is_empty());
}

#[tokio::test]
async fn test_ticket_panel_for_admin() {
    let (platform, dispatcher) = setup();
    let mut admin = user(10, "admin");
    admin.role_ids = vec![ADMIN_ROLE];

    let report = dispatcher
        .handle_message(&message(1, CHAT, admin, "!ticketpanel"))
        .await;
    assert_eq!(report.command, Some(CommandOutcome::Replied));

    let panel = &platform.messages_to(CHAT)[0];
    assert_eq!(panel.buttons.len(), 1);
    assert_eq!(panel.buttons[0].custom_id, "ticket:open:support");
}

#[tokio::test]
async fn test_ticket_open_and_close() {
    let (platform, dispatcher) = setup();
    let open = InboundInteraction {
        custom_id: "ticket:open:support".to_string(),
        user: user(10, "Sung Jin-Woo"),
        channel_id: CHAT,
        guild_id: Some(GUILD),
    };

    let reply = dispatcher.handle_interaction(&open).await.unwrap();
    assert!(reply.starts_with("✅ Ticket created:"));

    let request = platform
        .outbound()
        .into_iter()
        .find_map(|o| match o {
            Outbound::CreateChannel(r) => Some(r),
            _ => None,
        })
        .unwrap();
    assert_eq!(request.name, "ticket-sung-jin-woo");
    assert_eq!(request.category_id, TICKET_CATEGORY);
    assert!(request
        .overwrites
        .iter()
        .any(|o| o.target == PermissionTarget::Role(GUILD) && !o.allow_read_write));
    assert!(request
        .overwrites
        .iter()
        .any(|o| o.target == PermissionTarget::Member(10) && o.allow_read_write));

    // 同一用户不能再开第二个
    let again = dispatcher.handle_interaction(&open).await.unwrap();
    assert!(again.starts_with("You already have an open ticket"));

    let ticket_channel = dispatcher_ticket_channel(&platform);
    assert_eq!(platform.messages_to(ticket_channel).len(), 1);

    // 其他人不能关闭
    let stranger_close = InboundInteraction {
        custom_id: "ticket:close".to_string(),
        user: user(11, "stranger"),
        channel_id: ticket_channel,
        guild_id: Some(GUILD),
    };
    let denied = dispatcher.handle_interaction(&stranger_close).await.unwrap();
    assert!(denied.starts_with("❌"));

    let mut staff = user(12, "staff");
    staff.role_ids = vec![STAFF_ROLE];
    let close = InboundInteraction {
        user: staff,
        ..stranger_close
    };
    let closed = dispatcher.handle_interaction(&close).await.unwrap();
    assert_eq!(closed, "🔒 Ticket closed.");
    assert!(platform.outbound().contains(&Outbound::DeleteChannel(ticket_channel)));
    assert_eq!(platform.messages_to(TICKET_LOG).len(), 2);
}

/// 从 dry-run 记录里找到新建工单频道的 ID
fn dispatcher_ticket_channel(platform: &DryRunPlatform) -> u64 {
    platform
        .outbound()
        .into_iter()
        .find_map(|o| match o {
            Outbound::Message { channel_id, message }
                if channel_id != TICKET_LOG && !message.buttons.is_empty() =>
            {
                Some(channel_id)
            }
            _ => None,
        })
        .unwrap()
}
