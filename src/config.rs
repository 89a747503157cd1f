use serde::{Deserialize, Serialize};
use std::fs;
use std::path::Path;
use std::time::Duration;

use crate::error::{ChronicleError, Result};

#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct ServerConfig {
    pub host: String,
    pub port: u16,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: "127.0.0.1".to_string(),
            port: 3001,
        }
    }
}

#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct DatabaseConfig {
    pub sqlite_path: String,
    pub max_connections: u32,
    pub busy_timeout_ms: u64,
}

impl Default for DatabaseConfig {
    fn default() -> Self {
        Self {
            sqlite_path: "./data/care-chronicle.db".to_string(),
            max_connections: 8,
            busy_timeout_ms: 5_000,
        }
    }
}

/// Row caps applied by the list endpoints.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct LimitsConfig {
    pub members: i64,
    pub health_metrics: i64,
    pub member_health_metrics: i64,
    pub conversations: i64,
    pub conversation_preview_messages: usize,
    pub episodes: i64,
    pub team_members: i64,
}

impl Default for LimitsConfig {
    fn default() -> Self {
        Self {
            members: 20,
            health_metrics: 50,
            member_health_metrics: 20,
            conversations: 20,
            conversation_preview_messages: 3,
            episodes: 20,
            team_members: 20,
        }
    }
}

#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct ClientConfig {
    pub base_url: String,
    pub timeout_secs: u64,
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self {
            base_url: "http://127.0.0.1:3001".to_string(),
            timeout_secs: 10,
        }
    }
}

impl ClientConfig {
    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs.max(1))
    }
}

#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct LoggingConfig {
    pub filter: String,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            filter: "info,care_chronicle=info".to_string(),
        }
    }
}

#[derive(Debug, Clone, Default, Deserialize, Serialize)]
#[serde(default)]
pub struct Config {
    pub server: ServerConfig,
    pub database: DatabaseConfig,
    pub limits: LimitsConfig,
    pub client: ClientConfig,
    pub logging: LoggingConfig,
}

impl Config {
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let content = fs::read_to_string(path.as_ref())
            .map_err(|e| ChronicleError::Config(e.to_string()))?;
        let config: Config =
            serde_json::from_str(&content).map_err(|e| ChronicleError::Config(e.to_string()))?;
        config.validate()?;
        Ok(config)
    }

    /// Loads `path` when given, otherwise falls back to defaults.
    pub fn load(path: Option<&str>) -> Result<Self> {
        match path.map(str::trim).filter(|p| !p.is_empty()) {
            Some(path) => Self::from_file(path),
            None => Ok(Self::default()),
        }
    }

    pub fn validate(&self) -> Result<()> {
        if self.database.sqlite_path.trim().is_empty() {
            return Err(ChronicleError::Config(
                "database.sqlite_path must not be empty".to_string(),
            ));
        }
        if self.database.max_connections == 0 {
            return Err(ChronicleError::Config(
                "database.max_connections must be at least 1".to_string(),
            ));
        }
        Ok(())
    }

    pub fn bind_addr(&self) -> String {
        format!("{}:{}", self.server.host, self.server.port)
    }
}
