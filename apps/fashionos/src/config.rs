//! # Configuration
//!
//! Settings for the server, storage, wizard timing and AI gateway.
//!
//! Resolution order (highest priority first):
//! 1. CLI flags (applied by the command that needs them)
//! 2. Environment variables (`FASHIONOS_*`)
//! 3. `fashionos.toml` (path given with `--config`)
//! 4. Compiled defaults
//!
//! HTTP security knobs (`FASHIONOS_CORS_ORIGINS`, `FASHIONOS_RATE_LIMIT`,
//! `FASHIONOS_API_KEY`) are read directly by the API layer.

use fashionos_core::WizardError;
use fashionos_core::primitives::{AUTOSAVE_DEBOUNCE_MS, MONITOR_CAPACITY};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;

/// Default OpenAI-compatible chat completions endpoint.
pub const DEFAULT_GATEWAY_URL: &str = "https://ai.gateway.lovable.dev/v1/chat/completions";

/// Default model asked for casting suggestions.
pub const DEFAULT_GATEWAY_MODEL: &str = "google/gemini-2.5-flash";

// =============================================================================
// SECTIONS
// =============================================================================

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ServerConfig {
    pub host: String,
    pub port: u16,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: "127.0.0.1".to_string(),
            port: 8080,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct StorageConfig {
    /// `redb` (persistent) or `memory`.
    pub backend: String,
    pub database: PathBuf,
}

impl Default for StorageConfig {
    fn default() -> Self {
        Self {
            backend: "redb".to_string(),
            database: PathBuf::from("fashionos.redb"),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct WizardConfig {
    /// Debounce delay between the last edit and the draft write.
    pub autosave_delay_ms: u64,
    /// How often the server checks for due autosaves.
    pub flush_interval_ms: u64,
    /// Number of events kept by the monitor.
    pub monitor_capacity: usize,
}

impl Default for WizardConfig {
    fn default() -> Self {
        Self {
            autosave_delay_ms: AUTOSAVE_DEBOUNCE_MS,
            flush_interval_ms: 250,
            monitor_capacity: MONITOR_CAPACITY,
        }
    }
}

impl WizardConfig {
    #[must_use]
    pub fn autosave_delay(&self) -> Duration {
        Duration::from_millis(self.autosave_delay_ms)
    }

    #[must_use]
    pub fn flush_interval(&self) -> Duration {
        Duration::from_millis(self.flush_interval_ms.max(1))
    }
}

#[derive(Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct GatewayConfig {
    pub url: String,
    pub model: String,
    /// Bearer key; casting is unavailable without one.
    pub api_key: Option<String>,
    pub timeout_secs: u64,
}

impl Default for GatewayConfig {
    fn default() -> Self {
        Self {
            url: DEFAULT_GATEWAY_URL.to_string(),
            model: DEFAULT_GATEWAY_MODEL.to_string(),
            api_key: None,
            timeout_secs: 60,
        }
    }
}

impl std::fmt::Debug for GatewayConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("GatewayConfig")
            .field("url", &self.url)
            .field("model", &self.model)
            .field("api_key", &self.api_key.as_ref().map(|_| "<redacted>"))
            .field("timeout_secs", &self.timeout_secs)
            .finish()
    }
}

// =============================================================================
// TOP-LEVEL CONFIG
// =============================================================================

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct FashionConfig {
    pub server: ServerConfig,
    pub storage: StorageConfig,
    pub wizard: WizardConfig,
    pub gateway: GatewayConfig,
}

impl FashionConfig {
    /// Load defaults, then the optional TOML file, then the environment.
    pub fn load(path: Option<&Path>) -> Result<Self, WizardError> {
        let mut config = match path {
            Some(path) => Self::from_file(path)?,
            None => Self::default(),
        };
        config.apply_env_overrides(|key| std::env::var(key).ok());
        config.validate()?;
        Ok(config)
    }

    pub fn from_file(path: &Path) -> Result<Self, WizardError> {
        let content = std::fs::read_to_string(path).map_err(|e| {
            WizardError::Io(format!("Cannot read config '{}': {}", path.display(), e))
        })?;
        Self::from_toml(&content)
    }

    pub fn from_toml(content: &str) -> Result<Self, WizardError> {
        toml::from_str(content)
            .map_err(|e| WizardError::Serialization(format!("Invalid config: {}", e)))
    }

    /// Apply `FASHIONOS_*` overrides. Unparseable numbers are ignored.
    pub fn apply_env_overrides(&mut self, lookup: impl Fn(&str) -> Option<String>) {
        if let Some(host) = lookup("FASHIONOS_HOST") {
            self.server.host = host;
        }
        if let Some(port) = lookup("FASHIONOS_PORT").and_then(|v| v.parse().ok()) {
            self.server.port = port;
        }
        if let Some(backend) = lookup("FASHIONOS_BACKEND") {
            self.storage.backend = backend;
        }
        if let Some(database) = lookup("FASHIONOS_DATABASE") {
            self.storage.database = PathBuf::from(database);
        }
        if let Some(ms) = lookup("FASHIONOS_AUTOSAVE_DELAY_MS").and_then(|v| v.parse().ok()) {
            self.wizard.autosave_delay_ms = ms;
        }
        if let Some(url) = lookup("FASHIONOS_GATEWAY_URL") {
            self.gateway.url = url;
        }
        if let Some(model) = lookup("FASHIONOS_GATEWAY_MODEL") {
            self.gateway.model = model;
        }
        if let Some(key) = lookup("FASHIONOS_GATEWAY_API_KEY").filter(|k| !k.is_empty()) {
            self.gateway.api_key = Some(key);
        }
    }

    pub fn validate(&self) -> Result<(), WizardError> {
        if !matches!(self.storage.backend.as_str(), "redb" | "memory") {
            return Err(WizardError::Serialization(format!(
                "storage.backend must be \"redb\" or \"memory\", got \"{}\"",
                self.storage.backend
            )));
        }
        if self.wizard.monitor_capacity == 0 {
            return Err(WizardError::Serialization(
                "wizard.monitor_capacity must be greater than 0".to_string(),
            ));
        }
        Ok(())
    }
}

// =============================================================================
// TESTS
// =============================================================================

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use std::collections::BTreeMap;

    #[test]
    fn empty_toml_yields_defaults() {
        let config = FashionConfig::from_toml("").unwrap();
        assert_eq!(config, FashionConfig::default());
        assert_eq!(config.wizard.autosave_delay(), Duration::from_millis(1000));
        assert_eq!(config.gateway.url, DEFAULT_GATEWAY_URL);
    }

    #[test]
    fn partial_sections_keep_other_defaults() {
        let config = FashionConfig::from_toml(
            r#"
            [server]
            port = 9090

            [storage]
            backend = "memory"
            "#,
        )
        .unwrap();
        assert_eq!(config.server.port, 9090);
        assert_eq!(config.server.host, "127.0.0.1");
        assert_eq!(config.storage.backend, "memory");
        assert_eq!(config.wizard.flush_interval_ms, 250);
    }

    #[test]
    fn env_overrides_win_over_file() {
        let mut config = FashionConfig::from_toml("[server]\nport = 9090\n").unwrap();
        let env: BTreeMap<&str, &str> = [
            ("FASHIONOS_PORT", "7000"),
            ("FASHIONOS_GATEWAY_API_KEY", "sk-test"),
            ("FASHIONOS_AUTOSAVE_DELAY_MS", "not-a-number"),
        ]
        .into_iter()
        .collect();
        config.apply_env_overrides(|key| env.get(key).map(|v| v.to_string()));

        assert_eq!(config.server.port, 7000);
        assert_eq!(config.gateway.api_key.as_deref(), Some("sk-test"));
        assert_eq!(config.wizard.autosave_delay_ms, 1000);
    }

    #[test]
    fn unknown_backend_is_rejected() {
        let config = FashionConfig::from_toml("[storage]\nbackend = \"sqlite\"\n").unwrap();
        assert!(config.validate().is_err());
    }

    #[test]
    fn debug_output_hides_gateway_key() {
        let gateway = GatewayConfig {
            api_key: Some("sk-secret".to_string()),
            ..GatewayConfig::default()
        };
        let printed = format!("{:?}", gateway);
        assert!(!printed.contains("sk-secret"));
    }
}
