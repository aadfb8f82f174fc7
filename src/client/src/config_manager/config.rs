use std::path::{Path, PathBuf};

use anyhow::{bail, Context, Result};
use serde::{Deserialize, Serialize};

use config::{Config as RConfig, Environment, File, FileFormat};
use sfbridge_common::constants::{CONFIG_DIR_NAME, CONFIG_FILE_NAME};
use sfbridge_common::types::event::DEFAULT_EVENT_TYPE;

const DEFAULT_LOGIN_URL: &str = "https://login.salesforce.com";
const DEFAULT_API_VERSION: &str = "62.0";
const DEFAULT_CHANNEL: &str = "/event/Monitoring_Event__e";
const DEFAULT_BROKER: &str = "localhost:9092";
const DEFAULT_TOPIC: &str = "salesforce_events";
const DEFAULT_SERVER: &str = "127.0.0.1:8787";
const PUBLISH_RETRY_ATTEMPTS: u32 = 2;
const KAFKA_MESSAGE_TIMEOUT_MS: u64 = 30_000;
const GRAFANA_WORKSPACE_URL: &str = "https://sfbridge.grafana.net/d/salesforce-events";

#[derive(Clone, Debug, Deserialize, Serialize)]
pub struct SalesforceConfig {
    pub login_url: String,
    pub api_version: String,
    pub username: String,
    pub password: String,
    pub security_token: Option<String>,
    pub client_id: String,
    pub client_secret: String,
    pub channel: String,
}

#[derive(Clone, Debug, Deserialize, Serialize)]
pub struct KafkaConfig {
    pub brokers: Vec<String>,
    pub topic: String,
    pub message_timeout_ms: u64,
}

#[derive(Clone, Copy, Debug, Deserialize, Serialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum SinkKind {
    Kafka,
    Stdout,
}

#[derive(Clone, Debug, Deserialize, Serialize)]
pub struct Config {
    pub salesforce: SalesforceConfig,
    pub kafka: KafkaConfig,

    pub event_type: String,
    pub publish_retry_attempts: u32,
    pub sink: SinkKind,

    pub server: String,
    pub grafana_workspace_url: String,

    pub config_sources: Vec<String>,
    pub sentry_dsn: Option<String>,
}

impl Config {
    /// Startup validation; the process must not open any connection when
    /// required fields are missing.
    pub fn validate(&self) -> Result<()> {
        if self.salesforce.username.is_empty() {
            bail!("missing required config field: salesforce.username");
        }
        if self.salesforce.password.is_empty() {
            bail!("missing required config field: salesforce.password");
        }
        if self.salesforce.client_id.is_empty() {
            bail!("missing required config field: salesforce.client_id");
        }
        if self.salesforce.client_secret.is_empty() {
            bail!("missing required config field: salesforce.client_secret");
        }
        if self.salesforce.channel.is_empty() {
            bail!("missing required config field: salesforce.channel");
        }
        if self.kafka.brokers.is_empty() {
            bail!("missing required config field: kafka.brokers");
        }
        if self.kafka.topic.is_empty() {
            bail!("missing required config field: kafka.topic");
        }
        Ok(())
    }
}

pub struct ConfigLoader;

impl ConfigLoader {
    /// Loads configuration from defaults, then `sfbridge.json` in the current
    /// directory and the user config dir, then an explicit `--config` path,
    /// then `SFBRIDGE_*` environment overrides. Later sources win.
    pub fn load_config(explicit_path: Option<&Path>) -> Result<Config> {
        let config = Self::load_unchecked(explicit_path)?;
        config.validate()?;
        Ok(config)
    }

    /// Same sources, no validation pass; `setup` starts from a possibly
    /// incomplete file.
    pub fn load_unchecked(explicit_path: Option<&Path>) -> Result<Config> {
        let mut builder = Self::builder_with_defaults()?;

        let mut sources: Vec<String> = Vec::new();
        for candidate in Self::default_config_files() {
            if candidate.is_file() {
                sources.push(candidate.display().to_string());
                builder = builder.add_source(File::from(candidate).format(FileFormat::Json));
            }
        }

        if let Some(path) = explicit_path {
            sources.push(path.display().to_string());
            builder = builder.add_source(File::from(path.to_path_buf()).format(FileFormat::Json));
        }

        builder = builder.add_source(Environment::with_prefix("SFBRIDGE").separator("__"));
        builder = builder.set_override("config_sources", sources)?;

        let config: Config = builder
            .build()?
            .try_deserialize()
            .context("failed to parse config file")?;

        Ok(config)
    }

    /// Defaults only; still subject to environment overrides and validation.
    pub fn load_default_config() -> Result<Config> {
        Self::load_config(None)
    }

    pub fn save_config(config: &Config, path: &Path) -> Result<()> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)
                .with_context(|| format!("failed to create {}", parent.display()))?;
        }
        let rendered = serde_json::to_string_pretty(config)?;
        std::fs::write(path, rendered)
            .with_context(|| format!("failed to write config to {}", path.display()))?;
        Ok(())
    }

    pub fn user_config_path() -> Option<PathBuf> {
        dirs::config_dir().map(|dir| dir.join(CONFIG_DIR_NAME).join(CONFIG_FILE_NAME))
    }

    fn default_config_files() -> Vec<PathBuf> {
        let mut candidates = vec![PathBuf::from(CONFIG_FILE_NAME)];
        if let Some(user_path) = Self::user_config_path() {
            candidates.push(user_path);
        }
        candidates
    }

    fn builder_with_defaults() -> Result<config::ConfigBuilder<config::builder::DefaultState>> {
        let builder = RConfig::builder()
            .set_default("salesforce.login_url", DEFAULT_LOGIN_URL)?
            .set_default("salesforce.api_version", DEFAULT_API_VERSION)?
            .set_default("salesforce.username", "")?
            .set_default("salesforce.password", "")?
            .set_default("salesforce.security_token", Some(None::<String>))?
            .set_default("salesforce.client_id", "")?
            .set_default("salesforce.client_secret", "")?
            .set_default("salesforce.channel", DEFAULT_CHANNEL)?
            .set_default::<&str, Vec<&str>>("kafka.brokers", vec![DEFAULT_BROKER])?
            .set_default("kafka.topic", DEFAULT_TOPIC)?
            .set_default("kafka.message_timeout_ms", KAFKA_MESSAGE_TIMEOUT_MS)?
            .set_default("event_type", DEFAULT_EVENT_TYPE)?
            .set_default("publish_retry_attempts", PUBLISH_RETRY_ATTEMPTS)?
            .set_default("sink", "kafka")?
            .set_default("server", DEFAULT_SERVER)?
            .set_default("grafana_workspace_url", GRAFANA_WORKSPACE_URL)?
            .set_default("sentry_dsn", Some(None::<String>))?
            .set_default::<&str, Vec<&str>>("config_sources", vec![])?;

        Ok(builder)
    }
}
