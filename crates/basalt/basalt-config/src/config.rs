use serde::Deserialize;
use std::path::Path;

/// Bus parameters shared by the demo producer and consumers.
///
/// Every process on a bus must agree on the geometry fields; the attach
/// protocol rejects mismatches at open time.
#[derive(Deserialize, Debug, Clone)]
pub struct BusConfig {
    #[serde(default = "defaults::shm_name")]
    pub shm_name: String,
    #[serde(default = "defaults::log_level")]
    pub log_level: String,
    /// Queue capacity in messages.
    #[serde(default = "defaults::capacity")]
    pub capacity: u32,
    /// Maximum payload bytes per message.
    #[serde(default = "defaults::max_payload")]
    pub max_payload: u32,
    #[serde(default = "defaults::num_consumers")]
    pub num_consumers: u32,
}

#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("failed to read '{path}'")]
    Read {
        path: String,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to parse config")]
    Parse(#[from] toml::de::Error),
}

mod defaults {
    pub fn shm_name() -> String {
        "/dev/shm/basalt_md_bus".into()
    }

    pub fn log_level() -> String {
        "info".into()
    }

    pub fn capacity() -> u32 {
        1024
    }

    pub fn max_payload() -> u32 {
        64
    }

    pub fn num_consumers() -> u32 {
        1
    }
}

impl Default for BusConfig {
    fn default() -> Self {
        BusConfig {
            shm_name: defaults::shm_name(),
            log_level: defaults::log_level(),
            capacity: defaults::capacity(),
            max_payload: defaults::max_payload(),
            num_consumers: defaults::num_consumers(),
        }
    }
}

impl BusConfig {
    pub fn load(path: impl AsRef<Path> + ToString) -> Result<Self, ConfigError> {
        let raw = std::fs::read_to_string(&path).map_err(|source| ConfigError::Read {
            path: path.to_string(),
            source,
        })?;
        let config: BusConfig = toml::from_str(&raw)?;
        Ok(config)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_document_yields_defaults() {
        let config: BusConfig = toml::from_str("").unwrap();
        assert_eq!(config.shm_name, "/dev/shm/basalt_md_bus");
        assert_eq!(config.log_level, "info");
        assert_eq!(config.capacity, 1024);
        assert_eq!(config.max_payload, 64);
        assert_eq!(config.num_consumers, 1);
    }

    #[test]
    fn fields_override_defaults() {
        let config: BusConfig = toml::from_str(
            r#"
            shm_name = "/dev/shm/ticks"
            capacity = 4096
            num_consumers = 3
            "#,
        )
        .unwrap();
        assert_eq!(config.shm_name, "/dev/shm/ticks");
        assert_eq!(config.capacity, 4096);
        assert_eq!(config.num_consumers, 3);
        assert_eq!(config.max_payload, 64);
    }

    #[test]
    fn missing_file_reports_the_path() {
        let err = BusConfig::load("/nonexistent/basalt.toml").unwrap_err();
        assert!(matches!(err, ConfigError::Read { .. }));
        assert!(err.to_string().contains("/nonexistent/basalt.toml"));
    }
}
