//! Outreach configuration system.

use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;

use crate::error::{OutreachError, Result};
use crate::types::OwnerProfile;

/// Root configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OutreachConfig {
    /// Minimum time after a successful initial send before a follow-up is due.
    #[serde(default = "default_followup_delay")]
    pub followup_delay_secs: u64,
    /// How often the scheduler sweeps for due follow-ups.
    #[serde(default = "default_poll_interval")]
    pub poll_interval_secs: u64,
    #[serde(default = "default_send_timeout")]
    pub send_timeout_secs: u64,
    #[serde(default = "default_find_timeout")]
    pub find_timeout_secs: u64,
    /// Pause between consecutive sends in one batch or tick.
    #[serde(default = "default_send_spacing")]
    pub send_spacing_ms: u64,
    #[serde(default)]
    pub followup_retry: FollowupRetry,
    #[serde(default)]
    pub database: DatabaseConfig,
    #[serde(default)]
    pub templates: TemplatesConfig,
    #[serde(default)]
    pub smtp: SmtpConfig,
    #[serde(default)]
    pub people: PeopleConfig,
    #[serde(default)]
    pub profile: OwnerProfile,
    #[serde(default)]
    pub notify: NotifyConfig,
}

/// Ten years.
pub const MAX_FOLLOWUP_DELAY_SECS: u64 = 10 * 365 * 24 * 60 * 60;
pub const MAX_POLL_INTERVAL_SECS: u64 = 7 * 24 * 60 * 60;
pub const MAX_TIMEOUT_SECS: u64 = 60 * 60;
pub const MAX_SEND_SPACING_MS: u64 = 10 * 60 * 1000;

fn default_followup_delay() -> u64 { 24 * 60 * 60 }
fn default_poll_interval() -> u64 { 60 * 60 }
fn default_send_timeout() -> u64 { 30 }
fn default_find_timeout() -> u64 { 30 }
fn default_send_spacing() -> u64 { 2000 }

/// What happens to a contact whose follow-up send failed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FollowupRetry {
    /// The failed follow-up record is final; the contact is never retried.
    #[default]
    OneShot,
    /// Every tick re-claims failed follow-ups until one is sent.
    RetryUntilSent,
}

impl Default for OutreachConfig {
    fn default() -> Self {
        Self {
            followup_delay_secs: default_followup_delay(),
            poll_interval_secs: default_poll_interval(),
            send_timeout_secs: default_send_timeout(),
            find_timeout_secs: default_find_timeout(),
            send_spacing_ms: default_send_spacing(),
            followup_retry: FollowupRetry::default(),
            database: DatabaseConfig::default(),
            templates: TemplatesConfig::default(),
            smtp: SmtpConfig::default(),
            people: PeopleConfig::default(),
            profile: OwnerProfile::default(),
            notify: NotifyConfig::default(),
        }
    }
}

impl OutreachConfig {
    /// Load config from the default path (~/.outreach/config.toml).
    pub fn load() -> Result<Self> {
        let path = Self::default_path();
        if path.exists() {
            Self::load_from(&path)
        } else {
            Ok(Self::default())
        }
    }

    /// Load config from a specific path.
    pub fn load_from(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)
            .map_err(|e| OutreachError::Config(format!("Failed to read config: {e}")))?;
        let config: Self = toml::from_str(&content)
            .map_err(|e| OutreachError::Config(format!("Failed to parse config: {e}")))?;
        config.validate()?;
        Ok(config)
    }

    /// Save config to the default path.
    pub fn save(&self) -> Result<()> {
        self.save_to(&Self::default_path())
    }

    pub fn save_to(&self, path: &Path) -> Result<()> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        let content = toml::to_string_pretty(self)
            .map_err(|e| OutreachError::Config(format!("Failed to serialize config: {e}")))?;
        std::fs::write(path, content)?;
        Ok(())
    }

    /// Reject settings the scheduler cannot run with.
    pub fn validate(&self) -> Result<()> {
        if self.poll_interval_secs == 0 {
            return Err(OutreachError::Config("poll_interval_secs must be greater than 0".into()));
        }
        if self.send_timeout_secs == 0 {
            return Err(OutreachError::Config("send_timeout_secs must be greater than 0".into()));
        }
        if self.find_timeout_secs == 0 {
            return Err(OutreachError::Config("find_timeout_secs must be greater than 0".into()));
        }
        let limits = [
            ("followup_delay_secs", self.followup_delay_secs, MAX_FOLLOWUP_DELAY_SECS),
            ("poll_interval_secs", self.poll_interval_secs, MAX_POLL_INTERVAL_SECS),
            ("send_timeout_secs", self.send_timeout_secs, MAX_TIMEOUT_SECS),
            ("find_timeout_secs", self.find_timeout_secs, MAX_TIMEOUT_SECS),
            ("send_spacing_ms", self.send_spacing_ms, MAX_SEND_SPACING_MS),
        ];
        for (name, value, max) in limits {
            if value > max {
                return Err(OutreachError::Config(format!("{name} must be at most {max}")));
            }
        }
        Ok(())
    }

    /// Get the default config path.
    pub fn default_path() -> PathBuf {
        Self::home_dir().join("config.toml")
    }

    /// Get the Outreach home directory.
    pub fn home_dir() -> PathBuf {
        dirs::home_dir()
            .unwrap_or_else(|| PathBuf::from("."))
            .join(".outreach")
    }

    /// Saturates at `chrono::Duration::MAX` for values no clock can reach.
    pub fn followup_delay(&self) -> chrono::Duration {
        i64::try_from(self.followup_delay_secs)
            .ok()
            .and_then(chrono::Duration::try_seconds)
            .unwrap_or(chrono::Duration::MAX)
    }

    pub fn poll_interval(&self) -> Duration {
        Duration::from_secs(self.poll_interval_secs)
    }

    pub fn send_timeout(&self) -> Duration {
        Duration::from_secs(self.send_timeout_secs)
    }

    pub fn find_timeout(&self) -> Duration {
        Duration::from_secs(self.find_timeout_secs)
    }

    pub fn send_spacing(&self) -> Duration {
        Duration::from_millis(self.send_spacing_ms)
    }
}

/// Database configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DatabaseConfig {
    #[serde(default = "default_db_path")]
    pub path: String,
}

fn default_db_path() -> String { "~/.outreach/outreach.db".into() }

impl Default for DatabaseConfig {
    fn default() -> Self {
        Self { path: default_db_path() }
    }
}

/// Template source. Builtin templates are used when `dir` is unset.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct TemplatesConfig {
    #[serde(default)]
    pub dir: Option<String>,
}

/// SMTP account used to send outreach.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SmtpConfig {
    #[serde(default = "default_smtp_host")]
    pub host: String,
    #[serde(default = "default_smtp_port")]
    pub port: u16,
    #[serde(default)]
    pub email: String,
    #[serde(default)]
    pub password: String,
    #[serde(default)]
    pub display_name: Option<String>,
}

fn default_smtp_host() -> String { "smtp.gmail.com".into() }
fn default_smtp_port() -> u16 { 587 }

impl Default for SmtpConfig {
    fn default() -> Self {
        Self {
            host: default_smtp_host(),
            port: default_smtp_port(),
            email: String::new(),
            password: String::new(),
            display_name: None,
        }
    }
}

/// People-data source for the file-backed finder.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PeopleConfig {
    #[serde(default = "default_people_path")]
    pub path: String,
    /// Maximum contacts kept per search.
    #[serde(default = "default_people_limit")]
    pub limit: usize,
}

fn default_people_path() -> String { "~/.outreach/people.json".into() }
fn default_people_limit() -> usize { 10 }

impl Default for PeopleConfig {
    fn default() -> Self {
        Self {
            path: default_people_path(),
            limit: default_people_limit(),
        }
    }
}

/// Status-update dispatch.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct NotifyConfig {
    #[serde(default)]
    pub webhook_url: Option<String>,
}
