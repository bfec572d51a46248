// src/config.rs
//! Startup configuration: secrets from the environment, tunables from an optional TOML file.

use std::path::{Path, PathBuf};
use std::time::Duration;

use anyhow::{anyhow, bail, Context, Result};
use serde::Deserialize;

use crate::checkpoint::DEFAULT_CHECKPOINT_PATH;
use crate::notify::{DEFAULT_MARGIN, TELEGRAM_MAX_TEXT};
use crate::translate::DEFAULT_MAX_CHUNK;

pub const ENV_CONFIG_PATH: &str = "RELAY_CONFIG_PATH";
pub const DEFAULT_CONFIG_PATH: &str = "config/relay.toml";

pub const ENV_TG_TOKEN: &str = "TG_TOKEN";
pub const ENV_TG_CHAT_ID: &str = "TG_CHAT_ID";
pub const ENV_YANDEX_KEY: &str = "YANDEX_TRANSLATE_KEY";
pub const ENV_YANDEX_FOLDER: &str = "YANDEX_FOLDER_ID";

pub const DEFAULT_FEED_URL: &str = "https://cms.zerohedge.com/fullrss2.xml";

#[derive(Clone)]
pub struct Secrets {
    pub telegram_token: String,
    pub telegram_chat_id: String,
    pub yandex_api_key: String,
    pub yandex_folder_id: String,
}

impl std::fmt::Debug for Secrets {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Secrets")
            .field("telegram_token", &"***")
            .field("telegram_chat_id", &self.telegram_chat_id)
            .field("yandex_api_key", &"***")
            .field("yandex_folder_id", &self.yandex_folder_id)
            .finish()
    }
}

impl Secrets {
    /// All four are required; the first missing one is named in the error.
    pub fn from_env() -> Result<Self> {
        Ok(Self {
            telegram_token: required_env(ENV_TG_TOKEN)?,
            telegram_chat_id: required_env(ENV_TG_CHAT_ID)?,
            yandex_api_key: required_env(ENV_YANDEX_KEY)?,
            yandex_folder_id: required_env(ENV_YANDEX_FOLDER)?,
        })
    }
}

fn required_env(name: &'static str) -> Result<String> {
    match std::env::var(name) {
        Ok(v) if !v.trim().is_empty() => Ok(v.trim().to_string()),
        _ => Err(anyhow!("required environment variable {name} is not set")),
    }
}

fn default_feed_url() -> String {
    DEFAULT_FEED_URL.to_string()
}
fn default_checkpoint_path() -> PathBuf {
    PathBuf::from(DEFAULT_CHECKPOINT_PATH)
}
fn default_log_file() -> Option<PathBuf> {
    Some(PathBuf::from("news-relay.log"))
}
fn default_user_agent() -> String {
    "Mozilla/5.0 (compatible; NewsRelay/0.1)".to_string()
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct RelaySettings {
    pub feed_url: String,
    pub checkpoint_path: PathBuf,
    pub log_file: Option<PathBuf>,
    pub check_interval_secs: u64,
    pub max_articles: usize,
    pub summary_max_len: usize,
    pub summary_sentences: usize,
    pub translate_max_chunk: usize,
    pub target_language: String,
    pub delivery_max_len: usize,
    pub delivery_margin: usize,
    pub segment_delay_ms: u64,
    pub item_delay_ms: u64,
    pub http_timeout_secs: u64,
    pub connect_timeout_secs: u64,
    pub fetch_retries: u32,
    pub fetch_retry_delay_secs: u64,
    pub notify_failures: bool,
    pub metrics_addr: Option<String>,
    pub user_agent: String,
}

impl Default for RelaySettings {
    fn default() -> Self {
        Self {
            feed_url: default_feed_url(),
            checkpoint_path: default_checkpoint_path(),
            log_file: default_log_file(),
            check_interval_secs: 60,
            max_articles: 3,
            summary_max_len: 1000,
            summary_sentences: 5,
            translate_max_chunk: DEFAULT_MAX_CHUNK,
            target_language: "ru".to_string(),
            delivery_max_len: TELEGRAM_MAX_TEXT,
            delivery_margin: DEFAULT_MARGIN,
            segment_delay_ms: 500,
            item_delay_ms: 1000,
            http_timeout_secs: 30,
            connect_timeout_secs: 10,
            fetch_retries: 3,
            fetch_retry_delay_secs: 5,
            notify_failures: true,
            metrics_addr: None,
            user_agent: default_user_agent(),
        }
    }
}

impl RelaySettings {
    pub fn from_toml_str(s: &str) -> Result<Self> {
        let settings: RelaySettings = toml::from_str(s).context("parsing relay settings")?;
        settings.validate()?;
        Ok(settings)
    }

    pub fn load_from(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)
            .with_context(|| format!("reading relay settings from {}", path.display()))?;
        Self::from_toml_str(&content)
    }

    /// Resolution order: explicit path, then $RELAY_CONFIG_PATH, then
    /// `config/relay.toml` if present, then built-in defaults.
    pub fn load(explicit: Option<&Path>) -> Result<Self> {
        if let Some(p) = explicit {
            return Self::load_from(p);
        }
        if let Ok(p) = std::env::var(ENV_CONFIG_PATH) {
            let pb = PathBuf::from(p);
            if !pb.exists() {
                bail!("{ENV_CONFIG_PATH} points to non-existent path {}", pb.display());
            }
            return Self::load_from(&pb);
        }
        let default = PathBuf::from(DEFAULT_CONFIG_PATH);
        if default.exists() {
            return Self::load_from(&default);
        }
        Ok(Self::default())
    }

    pub fn validate(&self) -> Result<()> {
        if self.check_interval_secs == 0 {
            bail!("check_interval_secs must be positive");
        }
        if self.translate_max_chunk == 0 {
            bail!("translate_max_chunk must be positive");
        }
        if self.delivery_margin >= self.delivery_max_len {
            bail!(
                "delivery_margin ({}) must be below delivery_max_len ({})",
                self.delivery_margin,
                self.delivery_max_len
            );
        }
        if self.summary_max_len == 0 {
            bail!("summary_max_len must be positive");
        }
        url::Url::parse(&self.feed_url)
            .with_context(|| format!("feed_url is not a valid URL: {}", self.feed_url))?;
        Ok(())
    }

    pub fn check_interval(&self) -> Duration {
        Duration::from_secs(self.check_interval_secs)
    }
    pub fn segment_delay(&self) -> Duration {
        Duration::from_millis(self.segment_delay_ms)
    }
    pub fn item_delay(&self) -> Duration {
        Duration::from_millis(self.item_delay_ms)
    }
    pub fn http_timeout(&self) -> Duration {
        Duration::from_secs(self.http_timeout_secs)
    }
    pub fn connect_timeout(&self) -> Duration {
        Duration::from_secs(self.connect_timeout_secs)
    }
    pub fn fetch_retry_delay(&self) -> Duration {
        Duration::from_secs(self.fetch_retry_delay_secs)
    }
}

#[derive(Debug, Clone)]
pub struct Config {
    pub secrets: Secrets,
    pub settings: RelaySettings,
}

impl Config {
    /// Shared client for feed, translation and delivery calls.
    pub fn http_client(&self) -> Result<reqwest::Client> {
        reqwest::Client::builder()
            .user_agent(self.settings.user_agent.as_str())
            .connect_timeout(self.settings.connect_timeout())
            .timeout(self.settings.http_timeout())
            .build()
            .context("building http client")
    }
}
