//! # configs
//!
//! Layered settings for the agora binary. Sources, lowest precedence first:
//!
//! 1. built-in defaults
//! 2. `config/default.toml` (optional)
//! 3. `config/{AGORA_ENV}.toml` (optional, `AGORA_ENV` defaults to `local`)
//! 4. environment variables prefixed `AGORA__`, nested with `__`
//!    (e.g. `AGORA__SERVER__PORT=9000`, `AGORA__FORUM__PROPAGATION__MODE=inline`)
//!
//! A `.env` file is loaded into the environment before anything else.

use std::collections::HashMap;
use std::time::Duration;

use config::{Config, Environment, File};
use secrecy::SecretString;
use serde::Deserialize;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to load configuration: {0}")]
    Load(#[from] config::ConfigError),

    #[error("invalid configuration: {0}")]
    Invalid(String),
}

#[derive(Debug, Deserialize)]
pub struct Settings {
    /// Name of the environment overlay that was applied (`AGORA_ENV`).
    #[serde(skip)]
    pub environment: String,
    pub server: ServerSettings,
    pub store: StoreSettings,
    pub forum: ForumSettings,
    pub log: LogSettings,
}

#[derive(Debug, Deserialize)]
pub struct ServerSettings {
    pub host: String,
    pub port: u16,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum StoreBackend {
    Memory,
    Postgres,
}

#[derive(Debug, Deserialize)]
pub struct StoreSettings {
    pub backend: StoreBackend,
    #[serde(default)]
    pub database_url: Option<SecretString>,
    pub max_connections: u32,
    /// Deadline applied to every individual store call.
    pub op_timeout_secs: u64,
}

impl StoreSettings {
    pub fn op_timeout(&self) -> Duration {
        Duration::from_secs(self.op_timeout_secs)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CommentLayout {
    ChildList,
    ParentPointer,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SiblingOrder {
    BestFirst,
    Insertion,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PropagationMode {
    Background,
    Inline,
}

#[derive(Debug, Deserialize)]
pub struct ForumSettings {
    pub comment_layout: CommentLayout,
    pub sibling_order: SiblingOrder,
    pub propagation: PropagationSettings,
}

#[derive(Debug, Deserialize)]
pub struct PropagationSettings {
    pub mode: PropagationMode,
    pub queue_capacity: usize,
    pub max_attempts: u32,
    pub retry_backoff_ms: u64,
}

impl PropagationSettings {
    pub fn retry_backoff(&self) -> Duration {
        Duration::from_millis(self.retry_backoff_ms)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum LogFormat {
    Json,
    Pretty,
}

#[derive(Debug, Deserialize)]
pub struct LogSettings {
    pub filter: String,
    pub format: LogFormat,
}

impl Settings {
    /// Loads `.env`, then every layered source, then validates.
    pub fn load() -> Result<Self, ConfigError> {
        // A missing .env is the normal case outside development.
        let _ = dotenvy::dotenv();

        let env = std::env::var("AGORA_ENV").unwrap_or_else(|_| "local".to_string());
        Self::build(&env, None)
    }

    /// Builds settings with an explicit environment map instead of the
    /// process environment. Files are still consulted.
    pub fn from_env_map(env: &str, vars: HashMap<String, String>) -> Result<Self, ConfigError> {
        Self::build(env, Some(vars))
    }

    fn build(env: &str, vars: Option<HashMap<String, String>>) -> Result<Self, ConfigError> {
        let mut settings: Settings = Config::builder()
            .set_default("server.host", "0.0.0.0")?
            .set_default("server.port", 8080)?
            .set_default("store.backend", "memory")?
            .set_default("store.max_connections", 5)?
            .set_default("store.op_timeout_secs", 10)?
            .set_default("forum.comment_layout", "child_list")?
            .set_default("forum.sibling_order", "best_first")?
            .set_default("forum.propagation.mode", "background")?
            .set_default("forum.propagation.queue_capacity", 1024)?
            .set_default("forum.propagation.max_attempts", 3)?
            .set_default("forum.propagation.retry_backoff_ms", 200)?
            .set_default("log.filter", "info")?
            .set_default("log.format", "json")?
            .add_source(File::with_name("config/default").required(false))
            .add_source(File::with_name(&format!("config/{env}")).required(false))
            .add_source(
                Environment::with_prefix("AGORA")
                    .prefix_separator("__")
                    .separator("__")
                    .try_parsing(true)
                    .source(vars),
            )
            .build()?
            .try_deserialize()?;

        settings.environment = env.to_string();
        settings.validate()?;
        Ok(settings)
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.store.backend == StoreBackend::Postgres && self.store.database_url.is_none() {
            return Err(ConfigError::Invalid(
                "store.database_url is required for the postgres backend".into(),
            ));
        }
        if self.store.op_timeout_secs == 0 {
            return Err(ConfigError::Invalid("store.op_timeout_secs must be positive".into()));
        }
        if self.store.max_connections == 0 {
            return Err(ConfigError::Invalid("store.max_connections must be positive".into()));
        }
        if self.forum.propagation.queue_capacity == 0 {
            return Err(ConfigError::Invalid(
                "forum.propagation.queue_capacity must be positive".into(),
            ));
        }
        if self.forum.propagation.max_attempts == 0 {
            return Err(ConfigError::Invalid(
                "forum.propagation.max_attempts must be positive".into(),
            ));
        }
        Ok(())
    }

    pub fn bind_address(&self) -> String {
        format!("{}:{}", self.server.host, self.server.port)
    }
}
