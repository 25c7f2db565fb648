use serde::Deserialize;

use crate::domain::cost::CostConfig;
use crate::domain::orchestrator::OrchestratorConfig;
use crate::domain::workflow::MaterializerConfig;
use crate::domain::DomainError;
use crate::infrastructure::catalog::CatalogConfig;
use crate::infrastructure::engine::EngineConfig;
use crate::infrastructure::events::{EventsConfig, NotificationsConfig};
use crate::infrastructure::inference::GatewayConfig;
use crate::infrastructure::llm::{CloudProviderConfig, LocalProviderConfig};
use crate::infrastructure::observability::ObservabilityConfig;
use crate::infrastructure::storage::{PostgresConfig, StorageConfig, StorageType};

/// Application configuration
///
/// Every section is optional; a missing one takes its defaults.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct AppConfig {
    pub server: ServerConfig,
    pub logging: LoggingConfig,
    pub observability: ObservabilityConfig,
    pub storage: StorageSettings,
    pub catalog: CatalogConfig,
    pub orchestrator: OrchestratorConfig,
    pub inference: InferenceConfig,
    pub events: EventsConfig,
    pub notifications: NotificationsConfig,
    pub engine: EngineConfig,
    pub cost: CostConfig,
    pub materializer: MaterializerConfig,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct ServerConfig {
    pub host: String,
    pub port: u16,
    /// Also bounds a turn waiting on the conversation lock
    pub request_timeout_secs: u64,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct LoggingConfig {
    pub level: String,
    pub format: LogFormat,
}

#[derive(Debug, Clone, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum LogFormat {
    #[default]
    Pretty,
    Json,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct StorageSettings {
    /// `memory` or `postgres`
    pub backend: String,
    pub postgres_url: Option<String>,
    pub max_connections: u32,
    pub connect_timeout_secs: u64,
}

/// Providers and routing of the inference gateway
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct InferenceConfig {
    pub cloud: CloudProviderConfig,
    pub local: LocalProviderConfig,
    pub gateway: GatewayConfig,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: "0.0.0.0".to_string(),
            port: 8080,
            request_timeout_secs: 60,
        }
    }
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: "info".to_string(),
            format: LogFormat::default(),
        }
    }
}

impl Default for StorageSettings {
    fn default() -> Self {
        Self {
            backend: "memory".to_string(),
            postgres_url: None,
            max_connections: 10,
            connect_timeout_secs: 30,
        }
    }
}

impl StorageSettings {
    pub fn to_storage_config(&self) -> Result<StorageConfig, DomainError> {
        match self.backend.parse::<StorageType>()? {
            StorageType::InMemory => Ok(StorageConfig::in_memory()),
            StorageType::Postgres => {
                let url = self.postgres_url.as_deref().ok_or_else(|| {
                    DomainError::configuration("storage.postgres_url is required for postgres")
                })?;

                Ok(StorageConfig::Postgres(
                    PostgresConfig::new(url)
                        .with_max_connections(self.max_connections)
                        .with_connect_timeout(self.connect_timeout_secs),
                ))
            }
        }
    }
}

impl AppConfig {
    /// Layers `config/default`, `config/local` and `APP__*` variables
    pub fn load() -> Result<Self, config::ConfigError> {
        let config = config::Config::builder()
            .add_source(config::File::with_name("config/default").required(false))
            .add_source(config::File::with_name("config/local").required(false))
            .add_source(
                config::Environment::with_prefix("APP")
                    .separator("__")
                    .try_parsing(true),
            )
            .build()?;

        config.try_deserialize()
    }
}
