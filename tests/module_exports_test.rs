//! 模块导出测试 - 确认公开类型可以从 crate 根和子模块导入

use dungeon_alert_bot::notification::{DuplicateFilter, RateLimiter, Statistics};
use dungeon_alert_bot::{
    parse_command, BotConfig, Command, DryRunPlatform, EventDispatcher, NotificationFormatter, TicketAction,
};
use std::sync::Arc;

#[test]
fn test_dispatcher_can_be_built_from_defaults() {
    let platform = Arc::new(DryRunPlatform::new());
    let dispatcher = EventDispatcher::new(BotConfig::default(), platform);
    assert_eq!(dispatcher.config().command_prefix, "!");
}

#[test]
fn test_building_blocks_are_exported() {
    let _filter = DuplicateFilter::new();
    let _limiter = RateLimiter::new();
    let _stats = Statistics::default();
    let _formatter = NotificationFormatter::new(&BotConfig::default());
}

#[test]
fn test_command_and_ticket_parsing_are_exported() {
    assert_eq!(parse_command("!", "!stats"), Some(Ok(Command::Stats)));
    assert_eq!(TicketAction::from_custom_id("ticket:close"), Some(TicketAction::Close));
}
