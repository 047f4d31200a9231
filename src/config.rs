//! Application configuration for the mediator server and offline runs.
//!
//! Supports YAML configuration files with sensible defaults. The NEAT
//! parameters themselves live in INI files referenced by each experiment.

use crate::experiment::ExperimentConfig;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

/// Main configuration structure
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    #[serde(default)]
    pub server: ServerConfig,
    #[serde(default)]
    pub storage: StorageConfig,
    #[serde(default)]
    pub logging: LoggingConfig,
    #[serde(default = "default_experiments")]
    pub experiments: Vec<ExperimentConfig>,
}

/// HTTP server configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServerConfig {
    pub host: String,
    pub port: u16,
    /// Origins allowed by CORS; empty allows any
    pub allowed_origins: Vec<String>,
}

/// Where session logs and checkpoints are written
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StorageConfig {
    pub session_file: PathBuf,
    pub checkpoint_dir: PathBuf,
    /// Checkpoints kept per experiment
    pub max_checkpoints: usize,
}

/// Logging and checkpoint configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LoggingConfig {
    /// Log level (error, warn, info, debug, trace)
    pub log_level: String,
    /// Generations between checkpoints (0 disables them)
    pub checkpoint_interval: u32,
}

fn default_experiments() -> Vec<ExperimentConfig> {
    vec![ExperimentConfig::default()]
}

impl Default for Config {
    fn default() -> Self {
        Self {
            server: ServerConfig::default(),
            storage: StorageConfig::default(),
            logging: LoggingConfig::default(),
            experiments: default_experiments(),
        }
    }
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: "0.0.0.0".to_string(),
            port: 8000,
            allowed_origins: Vec::new(),
        }
    }
}

impl Default for StorageConfig {
    fn default() -> Self {
        Self {
            session_file: PathBuf::from("session_data.csv"),
            checkpoint_dir: PathBuf::from("checkpoints"),
            max_checkpoints: 5,
        }
    }
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            log_level: "info".to_string(),
            checkpoint_interval: 10,
        }
    }
}

impl Config {
    /// Load configuration from a YAML file
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self, Box<dyn std::error::Error>> {
        let contents = std::fs::read_to_string(path)?;
        let config: Config = serde_yaml::from_str(&contents)?;
        config.validate()?;
        Ok(config)
    }

    /// Save configuration to a YAML file
    pub fn save<P: AsRef<Path>>(&self, path: P) -> Result<(), Box<dyn std::error::Error>> {
        let yaml = serde_yaml::to_string(self)?;
        std::fs::write(path, yaml)?;
        Ok(())
    }

    /// `host:port` for the listener
    pub fn bind_address(&self) -> String {
        format!("{}:{}", self.server.host, self.server.port)
    }

    /// Validate configuration values
    pub fn validate(&self) -> Result<(), String> {
        if self.server.port == 0 {
            return Err("server port must be > 0".to_string());
        }
        if self.storage.max_checkpoints == 0 {
            return Err("max_checkpoints must be > 0".to_string());
        }
        if !["error", "warn", "info", "debug", "trace"].contains(&self.logging.log_level.as_str()) {
            return Err(format!("unknown log_level '{}'", self.logging.log_level));
        }
        if self.experiments.is_empty() {
            return Err("at least one experiment is required".to_string());
        }
        for experiment in &self.experiments {
            experiment.validate()?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::gym::GymKind;

    #[test]
    fn test_default_config_valid() {
        let config = Config::default();
        assert!(config.validate().is_ok());
        assert_eq!(config.bind_address(), "0.0.0.0:8000");
    }

    #[test]
    fn test_config_roundtrip() {
        let config = Config::default();
        let yaml = serde_yaml::to_string(&config).unwrap();
        let loaded: Config = serde_yaml::from_str(&yaml).unwrap();
        assert_eq!(config.server.port, loaded.server.port);
        assert_eq!(config.experiments, loaded.experiments);
    }

    #[test]
    fn test_partial_yaml() {
        let yaml = "server:\n  host: 127.0.0.1\n  port: 9000\n  allowed_origins: []\nexperiments:\n  - name: xor\n    gym: xor\n    fitness: xor\n";
        let config: Config = serde_yaml::from_str(yaml).unwrap();
        assert_eq!(config.server.port, 9000);
        assert_eq!(config.logging.log_level, "info");
        assert_eq!(config.experiments[0].gym, GymKind::Xor);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_invalid_log_level() {
        let mut config = Config::default();
        config.logging.log_level = "loud".to_string();
        assert!(config.validate().is_err());
    }
}
