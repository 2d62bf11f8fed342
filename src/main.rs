//! Dungeon Alert Bot CLI
//!
//! 运行机器人，或离线解析/回放公告

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use dungeon_alert_bot::{
    gateway, parse_dungeon_info, BotConfig, DryRunPlatform, EventDispatcher, InboundMessage,
    NotificationFormatter, ParseOutcome, SpawnOutcome,
};
use std::io::{BufRead, BufReader, Read};
use std::path::PathBuf;
use std::sync::Arc;
use tracing::{info, warn};
use tracing_subscriber::{fmt, EnvFilter};

#[derive(Parser)]
#[command(name = "dungeon-bot")]
#[command(about = "Dungeon Alert Bot - 转发地牢刷新公告")]
#[command(version)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// 连接 Discord 并运行
    Run {
        /// 配置文件路径 (默认: ~/.config/dungeon-alert-bot/config.json)
        #[arg(long, short)]
        config: Option<PathBuf>,
    },
    /// 解析一条公告（不传 TEXT 则读 stdin）
    Parse {
        text: Option<String>,
        /// 输出 JSON 格式
        #[arg(long)]
        json: bool,
    },
    /// 用 dry-run 平台回放 JSONL 格式的入站消息
    Replay {
        /// 每行一条 InboundMessage
        file: PathBuf,
        #[arg(long, short)]
        config: Option<PathBuf>,
        /// 输出 JSON 格式
        #[arg(long)]
        json: bool,
    },
    /// 载入并校验配置
    CheckConfig {
        #[arg(long, short)]
        config: Option<PathBuf>,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new("dungeon_alert_bot=info,dungeon_bot=info"));

    fmt()
        .with_writer(std::io::stderr)
        .with_env_filter(filter)
        .with_target(false)
        .with_thread_ids(false)
        .init();

    let cli = Cli::parse();

    match cli.command {
        Commands::Run { config } => {
            let config = BotConfig::load(config.as_deref())?;
            info!(config = ?config, "Starting bot");
            gateway::run(config).await?;
        }
        Commands::Parse { text, json } => {
            let text = match text {
                Some(t) => t,
                None => {
                    let mut buf = String::new();
                    std::io::stdin()
                        .read_to_string(&mut buf)
                        .context("Failed to read stdin")?;
                    buf
                }
            };
            let record = match parse_dungeon_info(&text) {
                ParseOutcome::Parsed(record) => record,
                ParseOutcome::Unrecognized(reason) => anyhow::bail!("Failed to parse: {}", reason),
            };
            if json {
                println!("{}", serde_json::to_string_pretty(&record)?);
            } else {
                let formatter = NotificationFormatter::new(&BotConfig::default());
                println!("{}", formatter.dungeon_alert(&record, None).to_plain_text());
            }
        }
        Commands::Replay { file, config, json } => {
            let mut config = BotConfig::resolve(config.as_deref())?;
            if config.token.is_empty() {
                config.token = "dry-run".to_string();
            }
            config.validate()?;

            let platform = Arc::new(DryRunPlatform::new());
            let dispatcher = EventDispatcher::new(config, platform.clone());

            let reader = BufReader::new(
                std::fs::File::open(&file).with_context(|| format!("Failed to open {}", file.display()))?,
            );
            let mut delivered = 0usize;
            let mut duplicates = 0usize;
            for (index, line) in reader.lines().enumerate() {
                let line = line?;
                if line.trim().is_empty() {
                    continue;
                }
                let message: InboundMessage = match serde_json::from_str(&line) {
                    Ok(m) => m,
                    Err(e) => {
                        warn!(line = index + 1, error = %e, "Skipping malformed line");
                        continue;
                    }
                };
                match dispatcher.handle_message(&message).await.spawn {
                    SpawnOutcome::Delivered { .. } => delivered += 1,
                    SpawnOutcome::Duplicate => duplicates += 1,
                    _ => {}
                }
            }

            let stats = dispatcher.state().stats_snapshot();
            if json {
                println!("{}", serde_json::to_string_pretty(&stats)?);
            } else {
                println!("Delivered: {}  Duplicates: {}  Outbound calls: {}", delivered, duplicates, platform.outbound().len());
                println!("{}", dispatcher.formatter().stats(&stats).to_plain_text());
            }
        }
        Commands::CheckConfig { config } => {
            let config = BotConfig::load(config.as_deref())?;
            println!("Config OK");
            println!("  Source channel:      {}", config.source_channel_id);
            println!("  Destination channel: {}", config.destination_channel_id);
            println!("  Command prefix:      {}", config.command_prefix);
            println!("  Cooldown:            {}s", config.cooldown_seconds);
            println!(
                "  Duplicate window:    {}s (last {} alerts)",
                config.duplicate_window_seconds, config.duplicate_lookback
            );
            println!("  Moderation:          {}", if config.moderation.enabled { "on" } else { "off" });
            println!("  Tickets:             {}", if config.tickets.is_some() { "on" } else { "off" });
            println!("  Direct alerts:       {}", if config.direct_alerts { "on" } else { "off" });
        }
    }

    Ok(())
}
