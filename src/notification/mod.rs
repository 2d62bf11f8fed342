//! 通知层 - 地牢告警从入站消息到出站消息的全部环节
//!
//! # 组成
//! 1. 统一接口：所有平台实现 `ChatPlatform` trait
//! 2. 事件分发：`EventDispatcher` 串联审核、去重、统计、格式化和发送
//! 3. 进程内状态：偏好、统计、限流
//!
//! # 使用示例
//! ```ignore
//! use dungeon_alert_bot::notification::{DryRunPlatform, EventDispatcher};
//!
//! let platform = Arc::new(DryRunPlatform::new());
//! let dispatcher = EventDispatcher::new(config, platform.clone());
//! let report = dispatcher.handle_message(&message).await;
//! ```

pub mod channel;
pub mod channels;
pub mod deduplicator;
pub mod dispatcher;
pub mod event;
pub mod formatter;
pub mod preferences;
pub mod stats;
pub mod throttle;

pub use channel::{
    Button, ChannelOverwrite, ChannelRequest, ChatPlatform, Notification, NotificationField, OutboundMessage,
    PermissionTarget, SendResult,
};
pub use channels::{DiscordPlatform, DryRunPlatform, Outbound};
pub use deduplicator::DuplicateFilter;
pub use dispatcher::{CommandOutcome, EventDispatcher, MessageReport, SpawnOutcome};
pub use event::{Author, InboundInteraction, InboundMessage};
pub use formatter::{msg, NotificationFormatter};
pub use preferences::{should_alert_user, PreferenceStore, UserPreference};
pub use stats::Statistics;
pub use throttle::RateLimiter;
