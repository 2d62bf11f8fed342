//! 配置加载 - `.env`、JSON 配置文件、环境变量
//!
//! 优先级（后者覆盖前者）：
//! 1. 内置默认值
//! 2. `--config` 指定的文件，或 `~/.config/dungeon-alert-bot/config.json`
//! 3. 环境变量（`.env` 会先被载入环境）

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;
use tracing::debug;

use crate::dungeon::{DungeonRecord, Rank};

/// 未配置等级颜色时的回退颜色（Discord blurple）
pub const DEFAULT_COLOR: u32 = 0x5865F2;

/// 配置错误
#[derive(Debug, thiserror::Error, PartialEq, Eq)]
pub enum ConfigError {
    #[error("missing required configuration: {0}")]
    Missing(&'static str),
    #[error("invalid value for {key}: {value:?}")]
    Invalid { key: &'static str, value: String },
}

/// 自动审核配置
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(default)]
pub struct ModerationConfig {
    pub enabled: bool,
    /// 屏蔽词（子串匹配，不区分大小写）
    pub words: Vec<String>,
    /// 审核日志频道
    pub log_channel_id: Option<u64>,
}

impl Default for ModerationConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            words: ["badword1", "badword2", "stupid", "dumb"]
                .iter()
                .map(|w| w.to_string())
                .collect(),
            log_channel_id: None,
        }
    }
}

/// 工单面板上的一个按钮
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct TicketTopic {
    pub id: String,
    pub label: String,
}

/// 工单配置
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct TicketConfig {
    /// 工单频道所在分类
    pub category_id: u64,
    /// 可以看到所有工单的员工角色
    pub staff_role_id: u64,
    /// 工单日志频道
    pub log_channel_id: u64,
    #[serde(default = "default_ticket_topics")]
    pub topics: Vec<TicketTopic>,
}

fn default_ticket_topics() -> Vec<TicketTopic> {
    vec![
        TicketTopic {
            id: "support".to_string(),
            label: "🎫 Support".to_string(),
        },
        TicketTopic {
            id: "report".to_string(),
            label: "🚨 Report a player".to_string(),
        },
    ]
}

/// 机器人配置
#[derive(Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(default)]
pub struct BotConfig {
    /// Bot token
    pub token: String,
    /// 命令前缀
    pub command_prefix: String,
    /// 监听的公告频道
    pub source_channel_id: u64,
    /// 转发目标频道
    pub destination_channel_id: u64,
    /// 手动告警冷却（秒）
    pub cooldown_seconds: u64,
    /// 去重窗口（秒）
    pub duplicate_window_seconds: u64,
    /// 去重回看条数
    pub duplicate_lookback: usize,
    /// 等级 -> 颜色
    pub colors: BTreeMap<Rank, u32>,
    /// 等级 -> 提及文本
    pub role_mentions: BTreeMap<Rank, String>,
    /// 红色地牢额外提及
    pub red_dungeon_mention: Option<String>,
    /// 双倍地牢额外提及
    pub double_dungeon_mention: Option<String>,
    pub thumbnail_url: Option<String>,
    /// 按偏好私信订阅用户
    pub direct_alerts: bool,
    /// 可以使用管理命令的角色
    pub admin_role_ids: Vec<u64>,
    pub moderation: ModerationConfig,
    pub tickets: Option<TicketConfig>,
}

impl Default for BotConfig {
    fn default() -> Self {
        let colors = [
            (Rank::E, 0x808080),
            (Rank::D, 0x8B4513),
            (Rank::C, 0x00FF00),
            (Rank::B, 0x0000FF),
            (Rank::A, 0x800080),
            (Rank::S, 0xFF4500),
            (Rank::SS, 0xFF0000),
        ]
        .into_iter()
        .collect();

        let role_mentions = [
            (Rank::S, "@Raid-Team".to_string()),
            (Rank::SS, "@Elite-Raiders".to_string()),
        ]
        .into_iter()
        .collect();

        Self {
            token: String::new(),
            command_prefix: "!".to_string(),
            source_channel_id: 0,
            destination_channel_id: 0,
            cooldown_seconds: 5,
            duplicate_window_seconds: 300,
            duplicate_lookback: 20,
            colors,
            role_mentions,
            red_dungeon_mention: None,
            double_dungeon_mention: None,
            thumbnail_url: None,
            direct_alerts: false,
            admin_role_ids: Vec::new(),
            moderation: ModerationConfig::default(),
            tickets: None,
        }
    }
}

// token 不进日志
impl std::fmt::Debug for BotConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("BotConfig")
            .field("token", &if self.token.is_empty() { "<unset>" } else { "<redacted>" })
            .field("command_prefix", &self.command_prefix)
            .field("source_channel_id", &self.source_channel_id)
            .field("destination_channel_id", &self.destination_channel_id)
            .field("cooldown_seconds", &self.cooldown_seconds)
            .field("duplicate_window_seconds", &self.duplicate_window_seconds)
            .field("duplicate_lookback", &self.duplicate_lookback)
            .field("direct_alerts", &self.direct_alerts)
            .field("moderation", &self.moderation)
            .field("tickets", &self.tickets)
            .finish_non_exhaustive()
    }
}

impl BotConfig {
    /// 默认配置文件路径
    pub fn default_path() -> Option<PathBuf> {
        dirs::home_dir().map(|home| home.join(".config/dungeon-alert-bot/config.json"))
    }

    /// 载入 `.env`、配置文件和环境变量，并校验
    pub fn load(path: Option<&Path>) -> Result<Self> {
        let config = Self::resolve(path)?;
        config.validate()?;
        Ok(config)
    }

    /// 同 [`BotConfig::load`]，但不校验
    pub fn resolve(path: Option<&Path>) -> Result<Self> {
        if let Ok(env_path) = dotenvy::dotenv() {
            debug!(path = %env_path.display(), "Loaded .env");
        }

        let mut config = match path.map(Path::to_path_buf).or_else(Self::default_path) {
            Some(p) if p.exists() => Self::from_file(&p)?,
            Some(p) if path.is_some() => {
                anyhow::bail!("Config file not found: {}", p.display())
            }
            _ => Self::default(),
        };

        config.apply_env(|key| std::env::var(key).ok())?;
        Ok(config)
    }

    /// 读取 JSON 配置文件
    pub fn from_file(path: &Path) -> Result<Self> {
        let content = fs::read_to_string(path)
            .with_context(|| format!("Failed to read config file {}", path.display()))?;
        let config = serde_json::from_str(&content)
            .with_context(|| format!("Failed to parse config file {}", path.display()))?;
        debug!(path = %path.display(), "Loaded config file");
        Ok(config)
    }

    /// 应用环境变量覆盖
    ///
    /// `lookup` 抽象出来便于测试，不必修改进程环境。
    pub fn apply_env<F>(&mut self, lookup: F) -> Result<(), ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let get = |key: &str| lookup(key).map(|v| v.trim().to_string()).filter(|v| !v.is_empty());

        if let Some(token) = get("BOT_TOKEN") {
            self.token = token;
        }
        if let Some(v) = get("GENERAL_CHANNEL_ID") {
            self.source_channel_id = parse_id("GENERAL_CHANNEL_ID", &v)?;
        }
        if let Some(v) = get("PING_CHANNEL_ID") {
            self.destination_channel_id = parse_id("PING_CHANNEL_ID", &v)?;
        }
        if let Some(v) = get("COOLDOWN_SECONDS") {
            self.cooldown_seconds = parse_id("COOLDOWN_SECONDS", &v)?;
        }
        if let Some(v) = get("MODERATION_LOG_CHANNEL_ID") {
            self.moderation.log_channel_id = Some(parse_id("MODERATION_LOG_CHANNEL_ID", &v)?);
        }

        let category = get("TICKET_CATEGORY_ID");
        let staff = get("TICKET_STAFF_ROLE_ID");
        let log = get("TICKET_LOG_CHANNEL_ID");
        if category.is_some() || staff.is_some() || log.is_some() {
            let tickets = self.tickets.get_or_insert_with(|| TicketConfig {
                category_id: 0,
                staff_role_id: 0,
                log_channel_id: 0,
                topics: default_ticket_topics(),
            });
            if let Some(v) = category {
                tickets.category_id = parse_id("TICKET_CATEGORY_ID", &v)?;
            }
            if let Some(v) = staff {
                tickets.staff_role_id = parse_id("TICKET_STAFF_ROLE_ID", &v)?;
            }
            if let Some(v) = log {
                tickets.log_channel_id = parse_id("TICKET_LOG_CHANNEL_ID", &v)?;
            }
        }

        Ok(())
    }

    /// 校验必填项
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.token.trim().is_empty() {
            return Err(ConfigError::Missing("BOT_TOKEN"));
        }
        if self.source_channel_id == 0 {
            return Err(ConfigError::Missing("GENERAL_CHANNEL_ID"));
        }
        if self.destination_channel_id == 0 {
            return Err(ConfigError::Missing("PING_CHANNEL_ID"));
        }
        if self.command_prefix.is_empty() {
            return Err(ConfigError::Invalid {
                key: "command_prefix",
                value: String::new(),
            });
        }
        if self.duplicate_window_seconds == 0 {
            return Err(ConfigError::Invalid {
                key: "duplicate_window_seconds",
                value: "0".to_string(),
            });
        }
        if self.duplicate_lookback == 0 {
            return Err(ConfigError::Invalid {
                key: "duplicate_lookback",
                value: "0".to_string(),
            });
        }
        if let Some(tickets) = &self.tickets {
            if tickets.category_id == 0 {
                return Err(ConfigError::Missing("TICKET_CATEGORY_ID"));
            }
            if tickets.staff_role_id == 0 {
                return Err(ConfigError::Missing("TICKET_STAFF_ROLE_ID"));
            }
            if tickets.log_channel_id == 0 {
                return Err(ConfigError::Missing("TICKET_LOG_CHANNEL_ID"));
            }
        }
        Ok(())
    }

    pub fn cooldown(&self) -> Duration {
        Duration::from_secs(self.cooldown_seconds)
    }

    pub fn duplicate_window(&self) -> Duration {
        Duration::from_secs(self.duplicate_window_seconds)
    }

    /// 根据等级和标记拼出提及文本，可能为空
    pub fn mention_for(&self, record: &DungeonRecord) -> String {
        let mut mentions: Vec<&str> = Vec::new();
        if let Some(m) = self.role_mentions.get(&record.rank) {
            mentions.push(m);
        }
        if record.is_red_dungeon {
            if let Some(m) = &self.red_dungeon_mention {
                mentions.push(m);
            }
        }
        if record.is_double_dungeon {
            if let Some(m) = &self.double_dungeon_mention {
                mentions.push(m);
            }
        }
        mentions.dedup();
        mentions.join(" ")
    }
}

fn parse_id(key: &'static str, value: &str) -> Result<u64, ConfigError> {
    value.parse().map_err(|_| ConfigError::Invalid {
        key,
        value: value.to_string(),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;
    use std::io::Write;

    fn env(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |key| map.get(key).cloned()
    }

    fn valid() -> BotConfig {
        BotConfig {
            token: "t".to_string(),
            source_channel_id: 1,
            destination_channel_id: 2,
            ..Default::default()
        }
    }

    #[test]
    fn test_defaults() {
        let config = BotConfig::default();
        assert_eq!(config.command_prefix, "!");
        assert_eq!(config.cooldown(), Duration::from_secs(5));
        assert_eq!(config.duplicate_window(), Duration::from_secs(300));
        assert_eq!(config.duplicate_lookback, 20);
        assert_eq!(config.colors.get(&Rank::SS), Some(&0xFF0000));
    }

    #[test]
    fn test_missing_required_values() {
        assert_eq!(BotConfig::default().validate(), Err(ConfigError::Missing("BOT_TOKEN")));

        let mut config = valid();
        config.source_channel_id = 0;
        assert_eq!(config.validate(), Err(ConfigError::Missing("GENERAL_CHANNEL_ID")));

        let mut config = valid();
        config.destination_channel_id = 0;
        assert_eq!(config.validate(), Err(ConfigError::Missing("PING_CHANNEL_ID")));

        assert_eq!(valid().validate(), Ok(()));
    }

    #[test]
    fn test_apply_env_overrides() {
        let mut config = BotConfig::default();
        config
            .apply_env(env(&[
                ("BOT_TOKEN", "abc"),
                ("GENERAL_CHANNEL_ID", "111"),
                ("PING_CHANNEL_ID", " 222 "),
                ("COOLDOWN_SECONDS", "9"),
            ]))
            .unwrap();

        assert_eq!(config.token, "abc");
        assert_eq!(config.source_channel_id, 111);
        assert_eq!(config.destination_channel_id, 222);
        assert_eq!(config.cooldown_seconds, 9);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_apply_env_rejects_bad_id() {
        let mut config = BotConfig::default();
        let err = config
            .apply_env(env(&[("GENERAL_CHANNEL_ID", "general")]))
            .unwrap_err();
        assert_eq!(
            err,
            ConfigError::Invalid {
                key: "GENERAL_CHANNEL_ID",
                value: "general".to_string()
            }
        );
    }

    #[test]
    fn test_partial_ticket_config_is_rejected() {
        let mut config = valid();
        config
            .apply_env(env(&[("TICKET_CATEGORY_ID", "5")]))
            .unwrap();
        assert_eq!(config.validate(), Err(ConfigError::Missing("TICKET_STAFF_ROLE_ID")));

        config
            .apply_env(env(&[("TICKET_STAFF_ROLE_ID", "6"), ("TICKET_LOG_CHANNEL_ID", "7")]))
            .unwrap();
        assert!(config.validate().is_ok());
        assert_eq!(config.tickets.as_ref().unwrap().topics.len(), 2);
    }

    #[test]
    fn test_from_file() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        write!(
            file,
            r#"{{
                "token": "file-token",
                "source_channel_id": 10,
                "destination_channel_id": 20,
                "role_mentions": {{ "A": "@A-Team" }},
                "moderation": {{ "words": ["heck"] }}
            }}"#
        )
        .unwrap();

        let config = BotConfig::from_file(file.path()).unwrap();
        assert_eq!(config.token, "file-token");
        assert_eq!(config.destination_channel_id, 20);
        assert_eq!(config.role_mentions.get(&Rank::A).unwrap(), "@A-Team");
        // 未出现的字段保持默认
        assert_eq!(config.cooldown_seconds, 5);
        assert_eq!(config.moderation.words, vec!["heck".to_string()]);
        assert!(config.moderation.enabled);
    }

    #[test]
    fn test_mention_for() {
        let mut config = valid();
        config.red_dungeon_mention = Some("@Red".to_string());

        let mut record = DungeonRecord {
            rank: Rank::SS,
            ..Default::default()
        };
        assert_eq!(config.mention_for(&record), "@Elite-Raiders");

        record.is_red_dungeon = true;
        assert_eq!(config.mention_for(&record), "@Elite-Raiders @Red");

        record.rank = Rank::C;
        record.is_red_dungeon = false;
        assert_eq!(config.mention_for(&record), "");
    }

    #[test]
    fn test_debug_redacts_token() {
        let text = format!("{:?}", valid());
        assert!(text.contains("<redacted>"));
        assert!(!text.contains("token: \"t\""));
    }
}
