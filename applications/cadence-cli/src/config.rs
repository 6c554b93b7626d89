/// CLI configuration
use cadence_playback::{OrchestratorConfig, QueueConfig};
use cadence_remote::{HttpTransportConfig, RetryPolicy};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;

/// Default config file, looked up in the working directory
pub const DEFAULT_CONFIG_FILE: &str = "cadence.toml";

#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Failed to load configuration: {0}")]
    Load(#[from] config::ConfigError),

    #[error("Invalid configuration: {0}")]
    Invalid(String),
}

pub type Result<T> = std::result::Result<T, ConfigError>;

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct CadenceConfig {
    #[serde(default = "default_storage")]
    pub storage: StorageSettings,

    #[serde(default = "default_remote")]
    pub remote: RemoteSettings,

    #[serde(default = "default_retry")]
    pub retry: RetrySettings,

    #[serde(default = "default_queue")]
    pub queue: QueueSettings,

    #[serde(default = "default_orchestrator")]
    pub orchestrator: OrchestratorSettings,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct StorageSettings {
    #[serde(default = "default_database_url")]
    pub database_url: String,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct RemoteSettings {
    #[serde(default = "default_base_url")]
    pub base_url: String,

    #[serde(default)]
    pub access_token: Option<String>,

    #[serde(default = "default_poll_interval_ms")]
    pub poll_interval_ms: u64,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct RetrySettings {
    #[serde(default = "default_max_attempts")]
    pub max_attempts: u32,

    #[serde(default = "default_initial_delay_ms")]
    pub initial_delay_ms: u64,

    #[serde(default = "default_max_delay_ms")]
    pub max_delay_ms: u64,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct QueueSettings {
    #[serde(default = "default_history_limit")]
    pub history_limit: usize,

    #[serde(default = "default_upcoming_limit")]
    pub upcoming_limit: usize,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct OrchestratorSettings {
    #[serde(default = "default_external_control_grace_ms")]
    pub external_control_grace_ms: u64,

    #[serde(default = "default_event_buffer")]
    pub event_buffer: usize,
}

impl CadenceConfig {
    /// Load configuration from file and environment
    ///
    /// `path` must exist when given. Without it, `cadence.toml` in the working
    /// directory is used if present. `CADENCE_*` variables override both, with
    /// `__` between section and key (e.g. `CADENCE_REMOTE__ACCESS_TOKEN`).
    pub fn load(path: Option<&Path>) -> Result<Self> {
        Self::load_from(path, environment())
    }

    fn load_from(path: Option<&Path>, env: config::Environment) -> Result<Self> {
        let mut settings = config::Config::builder();

        settings = match path {
            Some(path) => settings.add_source(config::File::from(path.to_path_buf())),
            None => settings
                .add_source(config::File::from(PathBuf::from(DEFAULT_CONFIG_FILE)).required(false)),
        };

        settings = settings.add_source(env);

        let config = settings.build()?.try_deserialize::<Self>()?;
        config.validate()?;
        Ok(config)
    }

    /// Validate configuration
    pub fn validate(&self) -> Result<()> {
        if self.storage.database_url.trim().is_empty() {
            return Err(ConfigError::Invalid(
                "storage.database_url is required (set CADENCE_STORAGE__DATABASE_URL)".to_string(),
            ));
        }

        let base_url = self.remote.base_url.trim();
        if !(base_url.starts_with("http://") || base_url.starts_with("https://")) {
            return Err(ConfigError::Invalid(format!(
                "remote.base_url must start with http:// or https:// (got {:?})",
                self.remote.base_url
            )));
        }

        if self.remote.poll_interval_ms == 0 {
            return Err(ConfigError::Invalid(
                "remote.poll_interval_ms must be positive".to_string(),
            ));
        }

        if self.queue.upcoming_limit == 0 {
            return Err(ConfigError::Invalid(
                "queue.upcoming_limit must be positive".to_string(),
            ));
        }

        if self.retry.initial_delay_ms > self.retry.max_delay_ms {
            return Err(ConfigError::Invalid(format!(
                "retry.initial_delay_ms ({}) exceeds retry.max_delay_ms ({})",
                self.retry.initial_delay_ms, self.retry.max_delay_ms
            )));
        }

        Ok(())
    }

    pub fn retry_policy(&self) -> RetryPolicy {
        RetryPolicy {
            max_attempts: self.retry.max_attempts,
            initial_delay: Duration::from_millis(self.retry.initial_delay_ms),
            max_delay: Duration::from_millis(self.retry.max_delay_ms),
        }
    }

    pub fn orchestrator_config(&self) -> OrchestratorConfig {
        OrchestratorConfig {
            retry: self.retry_policy(),
            queue: QueueConfig {
                history_limit: self.queue.history_limit,
                upcoming_limit: self.queue.upcoming_limit,
            },
            external_control_grace: Duration::from_millis(
                self.orchestrator.external_control_grace_ms,
            ),
            event_buffer: self.orchestrator.event_buffer.max(1),
        }
    }

    pub fn transport_config(&self) -> HttpTransportConfig {
        let transport = HttpTransportConfig::new(self.remote.base_url.trim())
            .with_poll_interval(Duration::from_millis(self.remote.poll_interval_ms));

        match self.remote.access_token.as_deref().map(str::trim) {
            Some(token) if !token.is_empty() => transport.with_access_token(token),
            _ => transport,
        }
    }
}

fn environment() -> config::Environment {
    config::Environment::with_prefix("CADENCE")
        .prefix_separator("_")
        .separator("__")
        .try_parsing(true)
}

// Default values
fn default_storage() -> StorageSettings {
    StorageSettings {
        database_url: default_database_url(),
    }
}

fn default_database_url() -> String {
    "sqlite://./data/cadence.db".to_string()
}

fn default_remote() -> RemoteSettings {
    RemoteSettings {
        base_url: default_base_url(),
        access_token: None,
        poll_interval_ms: default_poll_interval_ms(),
    }
}

fn default_base_url() -> String {
    "http://127.0.0.1:8080/v1".to_string()
}

fn default_poll_interval_ms() -> u64 {
    3000
}

fn default_retry() -> RetrySettings {
    let policy = RetryPolicy::default();
    RetrySettings {
        max_attempts: policy.max_attempts,
        initial_delay_ms: policy.initial_delay.as_millis() as u64,
        max_delay_ms: policy.max_delay.as_millis() as u64,
    }
}

fn default_max_attempts() -> u32 {
    RetryPolicy::default().max_attempts
}

fn default_initial_delay_ms() -> u64 {
    RetryPolicy::default().initial_delay.as_millis() as u64
}

fn default_max_delay_ms() -> u64 {
    RetryPolicy::default().max_delay.as_millis() as u64
}

fn default_queue() -> QueueSettings {
    QueueSettings {
        history_limit: default_history_limit(),
        upcoming_limit: default_upcoming_limit(),
    }
}

fn default_history_limit() -> usize {
    QueueConfig::default().history_limit
}

fn default_upcoming_limit() -> usize {
    QueueConfig::default().upcoming_limit
}

fn default_orchestrator() -> OrchestratorSettings {
    OrchestratorSettings {
        external_control_grace_ms: default_external_control_grace_ms(),
        event_buffer: default_event_buffer(),
    }
}

fn default_external_control_grace_ms() -> u64 {
    OrchestratorConfig::default().external_control_grace.as_millis() as u64
}

fn default_event_buffer() -> usize {
    OrchestratorConfig::default().event_buffer
}

impl Default for CadenceConfig {
    fn default() -> Self {
        Self {
            storage: default_storage(),
            remote: default_remote(),
            retry: default_retry(),
            queue: default_queue(),
            orchestrator: default_orchestrator(),
        }
    }
}
