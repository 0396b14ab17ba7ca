//! Configuration management for inventory services.
//!
//! Configuration is loaded from (in priority order):
//! 1. Environment variables (INVENTORY__ prefix, `__` separated)
//! 2. Config file (inventory.toml, or the prefix passed to [`InventoryConfig::load`])
//! 3. Defaults

use serde::Deserialize;

use crate::error::Result;

/// Which storage engine backs the traversal engine.
#[derive(Debug, Clone, Copy, Default, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum BackendKind {
    /// Process-local graph; contents are lost on exit.
    #[default]
    Memory,
    Neo4j,
}

impl std::str::FromStr for BackendKind {
    type Err = crate::InventoryError;

    fn from_str(s: &str) -> Result<Self> {
        match s.to_lowercase().as_str() {
            "memory" => Ok(BackendKind::Memory),
            "neo4j" => Ok(BackendKind::Neo4j),
            _ => Err(crate::InventoryError::IllegalArgument(format!(
                "invalid backend: {s}. Choose: memory, neo4j"
            ))),
        }
    }
}

/// Top-level configuration.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct InventoryConfig {
    #[serde(default)]
    pub backend: BackendKind,

    #[serde(default)]
    pub neo4j: Neo4jSettings,

    #[serde(default)]
    pub paging: PagingSettings,

    #[serde(default)]
    pub events: EventSettings,
}

/// Connection settings for the Neo4j backend.
#[derive(Debug, Clone, Deserialize)]
pub struct Neo4jSettings {
    #[serde(default = "default_uri")]
    pub uri: String,

    #[serde(default = "default_user")]
    pub user: String,

    #[serde(default = "default_password")]
    pub password: String,

    #[serde(default = "default_max_connections")]
    pub max_connections: u32,

    #[serde(default = "default_fetch_size")]
    pub fetch_size: usize,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct PagingSettings {
    /// Page size applied when a caller asks for an unlimited page. `None` keeps it unlimited.
    #[serde(default)]
    pub default_limit: Option<usize>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct EventSettings {
    /// Capacity of the broadcast channel used to fan out domain events.
    #[serde(default = "default_channel_capacity")]
    pub channel_capacity: usize,
}

fn default_uri() -> String {
    "bolt://localhost:7687".to_string()
}

fn default_user() -> String {
    "neo4j".to_string()
}

fn default_password() -> String {
    "inventory-dev".to_string()
}

fn default_max_connections() -> u32 {
    16
}

fn default_fetch_size() -> usize {
    256
}

fn default_channel_capacity() -> usize {
    1024
}

impl Default for Neo4jSettings {
    fn default() -> Self {
        Self {
            uri: default_uri(),
            user: default_user(),
            password: default_password(),
            max_connections: default_max_connections(),
            fetch_size: default_fetch_size(),
        }
    }
}

impl Default for EventSettings {
    fn default() -> Self {
        Self {
            channel_capacity: default_channel_capacity(),
        }
    }
}

impl InventoryConfig {
    /// Load from `{file_prefix}.toml` (optional) layered under `INVENTORY__*` variables.
    pub fn load(file_prefix: &str) -> Result<Self> {
        let cfg = config::Config::builder()
            .add_source(config::File::with_name(file_prefix).required(false))
            .add_source(
                config::Environment::with_prefix("INVENTORY")
                    .prefix_separator("__")
                    .separator("__")
                    .try_parsing(true),
            )
            .build()?;

        let loaded = cfg.try_deserialize::<InventoryConfig>()?;
        tracing::debug!(backend = ?loaded.backend, "Configuration loaded");
        Ok(loaded)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn test_default_config() {
        let config = InventoryConfig::default();
        assert_eq!(config.backend, BackendKind::Memory);
        assert_eq!(config.neo4j.uri, "bolt://localhost:7687");
        assert_eq!(config.neo4j.max_connections, 16);
        assert_eq!(config.events.channel_capacity, 1024);
        assert!(config.paging.default_limit.is_none());
    }

    #[test]
    fn test_load_from_file() {
        let mut file = tempfile::Builder::new().suffix(".toml").tempfile().unwrap();
        writeln!(
            file,
            "backend = \"neo4j\"\n[neo4j]\nuri = \"bolt://graph:7687\"\n[paging]\ndefault_limit = 50"
        )
        .unwrap();

        let prefix = file.path().with_extension("");
        let config = InventoryConfig::load(prefix.to_str().unwrap()).unwrap();
        assert_eq!(config.backend, BackendKind::Neo4j);
        assert_eq!(config.neo4j.uri, "bolt://graph:7687");
        assert_eq!(config.neo4j.user, "neo4j");
        assert_eq!(config.paging.default_limit, Some(50));
    }

    #[test]
    fn test_missing_file_uses_defaults() {
        let config = InventoryConfig::load("/nonexistent/inventory-config").unwrap();
        assert_eq!(config.neo4j.fetch_size, 256);
    }

    #[test]
    fn test_backend_kind_parsing() {
        assert_eq!("Neo4j".parse::<BackendKind>().unwrap(), BackendKind::Neo4j);
        assert!("sqlite".parse::<BackendKind>().is_err());
    }
}
