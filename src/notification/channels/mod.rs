//! 具体平台实现

pub mod discord;
pub mod dry_run;

pub use discord::DiscordPlatform;
pub use dry_run::{DryRunPlatform, Outbound};
