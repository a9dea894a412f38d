//! # Configuration Management
//!
//! Loads application configuration from multiple sources:
//! - TOML configuration files (config.toml)
//! - Environment variables (with APP_ prefix)
//! - Default values (built into the code)
//!
//! ## Configuration Priority (highest to lowest):
//! 1. Environment variables (APP_SERVER__HOST, APP_SESSION__TTL_SECS, etc.)
//! 2. Configuration file (config.toml)
//! 3. Default values (defined in the Default impl)

use anyhow::Result;
use serde::{Deserialize, Serialize};
use std::env;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AppConfig {
    pub server: ServerConfig,
    pub detector: DetectorConfig,
    pub session: SessionConfig,
}

/// Server binding settings.
///
/// `host = "127.0.0.1"` accepts localhost only; `"0.0.0.0"` accepts any
/// interface.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServerConfig {
    pub host: String,
    pub port: u16,
}

/// Detector backend settings.
///
/// ## Fields:
/// - `backend`: Name of the landmark/emotion backend in use. Informational,
///   surfaced by the status endpoint.
/// - `timeout_ms`: Per-call budget for detector work. A call that exceeds it
///   is reported as a per-frame failure, not a server error.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DetectorConfig {
    pub backend: String,
    pub timeout_ms: u64,
}

/// Session lifecycle settings.
///
/// ## Fields:
/// - `ttl_secs`: A session untouched for this long is eligible for
///   reclamation.
/// - `sweep_interval_secs`: How often the background sweeper scans for
///   expired sessions.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SessionConfig {
    pub ttl_secs: u64,
    pub sweep_interval_secs: u64,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            server: ServerConfig {
                host: "127.0.0.1".to_string(),
                port: 8080,
            },
            detector: DetectorConfig {
                backend: "mediapipe".to_string(),
                timeout_ms: 5000,
            },
            session: SessionConfig {
                ttl_secs: 180,
                sweep_interval_secs: 60,
            },
        }
    }
}

impl AppConfig {
    /// Load configuration in priority order: defaults, then config.toml,
    /// then APP_-prefixed environment variables, then the bare HOST/PORT
    /// variables that deployment platforms set.
    pub fn load() -> Result<Self> {
        let mut settings = config::Config::builder()
            .add_source(config::Config::try_from(&AppConfig::default())?)
            .add_source(config::File::with_name("config").required(false))
            // Double underscore separates sections from keys so snake_case
            // field names survive: APP_SERVER__HOST becomes server.host,
            // APP_SESSION__TTL_SECS becomes session.ttl_secs.
            .add_source(config::Environment::with_prefix("APP").separator("__"));

        if let Ok(host) = env::var("HOST") {
            settings = settings.set_override("server.host", host)?;
        }

        if let Ok(port) = env::var("PORT") {
            settings = settings.set_override("server.port", port)?;
        }

        let config = settings.build()?.try_deserialize()?;
        Ok(config)
    }

    /// Catch nonsensical values before the server starts rather than at
    /// first use.
    pub fn validate(&self) -> Result<()> {
        if self.server.port == 0 {
            return Err(anyhow::anyhow!("Server port cannot be 0"));
        }

        if self.detector.timeout_ms == 0 {
            return Err(anyhow::anyhow!("Detector timeout must be greater than 0"));
        }

        if self.session.ttl_secs == 0 {
            return Err(anyhow::anyhow!("Session TTL must be greater than 0"));
        }

        if self.session.sweep_interval_secs == 0 {
            return Err(anyhow::anyhow!(
                "Session sweep interval must be greater than 0"
            ));
        }

        Ok(())
    }

    /// Apply a partial update from a JSON body. Only the fields present in
    /// the JSON change; the result is re-validated before it takes effect.
    ///
    /// Server host/port changes are accepted but only apply on restart.
    pub fn update_from_json(&mut self, json_str: &str) -> Result<()> {
        let partial_config: serde_json::Value = serde_json::from_str(json_str)?;

        if let Some(server) = partial_config.get("server") {
            if let Some(host) = server.get("host").and_then(|v| v.as_str()) {
                self.server.host = host.to_string();
            }
            if let Some(port) = server.get("port").and_then(|v| v.as_u64()) {
                self.server.port = port as u16;
            }
        }

        if let Some(detector) = partial_config.get("detector") {
            if let Some(backend) = detector.get("backend").and_then(|v| v.as_str()) {
                self.detector.backend = backend.to_string();
            }
            if let Some(timeout) = detector.get("timeout_ms").and_then(|v| v.as_u64()) {
                self.detector.timeout_ms = timeout;
            }
        }

        if let Some(session) = partial_config.get("session") {
            if let Some(ttl) = session.get("ttl_secs").and_then(|v| v.as_u64()) {
                self.session.ttl_secs = ttl;
            }
            if let Some(interval) = session.get("sweep_interval_secs").and_then(|v| v.as_u64()) {
                self.session.sweep_interval_secs = interval;
            }
        }

        self.validate()?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config() {
        let config = AppConfig::default();
        assert_eq!(config.server.host, "127.0.0.1");
        assert_eq!(config.server.port, 8080);
        assert_eq!(config.detector.backend, "mediapipe");
        assert_eq!(config.session.ttl_secs, 180);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_config_validation() {
        let mut config = AppConfig::default();
        config.server.port = 0;
        assert!(config.validate().is_err());

        let mut config = AppConfig::default();
        config.session.ttl_secs = 0;
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_config_update() {
        let mut config = AppConfig::default();
        let json = r#"{"session": {"ttl_secs": 300}}"#;
        assert!(config.update_from_json(json).is_ok());
        assert_eq!(config.session.ttl_secs, 300);
        // Untouched fields keep their values.
        assert_eq!(config.server.host, "127.0.0.1");
        assert_eq!(config.detector.timeout_ms, 5000);
    }

    #[test]
    fn test_env_override_reaches_nested_snake_case_keys() {
        // Same environment source shape as load(), fed from a map instead
        // of the process environment so the test stays isolated.
        let mut vars = std::collections::HashMap::new();
        vars.insert("APP_SESSION__TTL_SECS".to_string(), "240".to_string());
        vars.insert("APP_SERVER__HOST".to_string(), "0.0.0.0".to_string());

        let config: AppConfig = config::Config::builder()
            .add_source(config::Config::try_from(&AppConfig::default()).unwrap())
            .add_source(
                config::Environment::with_prefix("APP")
                    .separator("__")
                    .source(Some(vars)),
            )
            .build()
            .unwrap()
            .try_deserialize()
            .unwrap();

        assert_eq!(config.session.ttl_secs, 240);
        assert_eq!(config.server.host, "0.0.0.0");
        // Untouched keys keep their defaults.
        assert_eq!(config.detector.timeout_ms, 5000);
    }

    #[test]
    fn test_config_update_rejects_invalid() {
        let mut config = AppConfig::default();
        let json = r#"{"detector": {"timeout_ms": 0}}"#;
        assert!(config.update_from_json(json).is_err());
    }
}
