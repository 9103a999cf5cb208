//! Warhorn configuration.
//!
//! TOML file at `~/.warhorn/config.toml` with serde defaults for every field,
//! so a missing or partial file still yields a runnable config. The bot token
//! can also come from the environment (`WARHORN_TOKEN` or `DISCORD_TOKEN`),
//! which wins over the file.

use std::path::{Path, PathBuf};

use chrono_tz::Tz;
use serde::{Deserialize, Serialize};

use crate::error::{Result, WarhornError};

/// Top-level configuration.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct WarhornConfig {
    #[serde(default)]
    pub discord: DiscordSection,
    #[serde(default)]
    pub announce: AnnounceSection,
    #[serde(default)]
    pub boss: BossSection,
    #[serde(default)]
    pub commands: CommandSection,
    #[serde(default)]
    pub keepalive: KeepaliveSection,
}

/// Discord connection settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DiscordSection {
    #[serde(default)]
    pub token: String,
    #[serde(default)]
    pub guild_id: u64,
    /// Gateway intents bitmask.
    #[serde(default = "default_intents")]
    pub intents: u64,
}

fn default_intents() -> u64 {
    // GUILDS | GUILD_MESSAGES | GUILD_MESSAGE_REACTIONS | MESSAGE_CONTENT
    (1 << 0) | (1 << 9) | (1 << 10) | (1 << 15)
}

impl Default for DiscordSection {
    fn default() -> Self {
        Self {
            token: String::new(),
            guild_id: 0,
            intents: default_intents(),
        }
    }
}

/// Recurring broadcast settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AnnounceSection {
    /// Destination channel for the recurring cycle.
    #[serde(default)]
    pub channel_id: u64,
    /// IANA timezone name for all local-time schedule math.
    #[serde(default = "default_timezone")]
    pub timezone: String,
    /// Hours of day (local, minute 0) at which the cycle fires.
    #[serde(default = "default_hours")]
    pub hours: Vec<u32>,
    #[serde(default = "default_announce_message")]
    pub message: String,
}

fn default_timezone() -> String {
    "Asia/Manila".into()
}

fn default_hours() -> Vec<u32> {
    vec![11, 14, 17, 20, 23, 2, 5, 8]
}

fn default_announce_message() -> String {
    "REGISTER FFA NOW, FFA START SOON".into()
}

impl Default for AnnounceSection {
    fn default() -> Self {
        Self {
            channel_id: 0,
            timezone: default_timezone(),
            hours: default_hours(),
            message: default_announce_message(),
        }
    }
}

/// World-boss countdown settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BossSection {
    #[serde(default = "default_boss_message")]
    pub message: String,
    /// Default countdown length in minutes.
    #[serde(default = "default_boss_minutes")]
    pub duration_mins: u64,
}

fn default_boss_message() -> String {
    "World Boss Started! Prepare your gear.".into()
}

fn default_boss_minutes() -> u64 {
    120
}

impl Default for BossSection {
    fn default() -> Self {
        Self {
            message: default_boss_message(),
            duration_mins: default_boss_minutes(),
        }
    }
}

/// Prefix-command settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CommandSection {
    #[serde(default = "default_prefix")]
    pub prefix: String,
    /// Role required for mutating commands, matched case-insensitively.
    #[serde(default = "default_creator_role")]
    pub creator_role: String,
}

fn default_prefix() -> String {
    "!".into()
}

fn default_creator_role() -> String {
    "CREATOR".into()
}

impl Default for CommandSection {
    fn default() -> Self {
        Self {
            prefix: default_prefix(),
            creator_role: default_creator_role(),
        }
    }
}

/// Keepalive HTTP listener, for platform health checks.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct KeepaliveSection {
    #[serde(default = "default_true")]
    pub enabled: bool,
    #[serde(default = "default_keepalive_port")]
    pub port: u16,
}

fn default_true() -> bool {
    true
}

fn default_keepalive_port() -> u16 {
    10000
}

impl Default for KeepaliveSection {
    fn default() -> Self {
        Self {
            enabled: true,
            port: default_keepalive_port(),
        }
    }
}

impl WarhornConfig {
    /// Config directory: `~/.warhorn`.
    pub fn home_dir() -> PathBuf {
        dirs::home_dir()
            .unwrap_or_else(|| PathBuf::from("."))
            .join(".warhorn")
    }

    /// Default config file path.
    pub fn default_path() -> PathBuf {
        Self::home_dir().join("config.toml")
    }

    /// Load from the default path, falling back to defaults when the file
    /// does not exist. Environment overrides are applied either way.
    pub fn load() -> Result<Self> {
        let path = Self::default_path();
        if path.exists() {
            Self::load_from(&path)
        } else {
            let mut config = Self::default();
            config.apply_env();
            Ok(config)
        }
    }

    /// Load from an explicit path.
    pub fn load_from(path: &Path) -> Result<Self> {
        let raw = std::fs::read_to_string(path)?;
        let mut config: Self = toml::from_str(&raw)
            .map_err(|e| WarhornError::config(format!("{}: {e}", path.display())))?;
        config.apply_env();
        Ok(config)
    }

    /// Write the current config to the default path.
    pub fn save(&self) -> Result<()> {
        let path = Self::default_path();
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        let raw = toml::to_string_pretty(self)
            .map_err(|e| WarhornError::config(format!("serialize failed: {e}")))?;
        std::fs::write(&path, raw)?;
        Ok(())
    }

    /// Environment wins over file contents for secrets and the health port.
    fn apply_env(&mut self) {
        if let Ok(token) = std::env::var("WARHORN_TOKEN").or_else(|_| std::env::var("DISCORD_TOKEN"))
        {
            let token = token.trim().to_string();
            if !token.is_empty() {
                self.discord.token = token;
            }
        }
        if let Ok(port) = std::env::var("PORT").or_else(|_| std::env::var("KEEP_ALIVE_PORT")) {
            if let Ok(port) = port.trim().parse() {
                self.keepalive.port = port;
            }
        }
    }

    /// Parse the configured timezone.
    pub fn tz(&self) -> Result<Tz> {
        self.announce
            .timezone
            .parse()
            .map_err(|_| WarhornError::config(format!("invalid timezone '{}'", self.announce.timezone)))
    }
}
