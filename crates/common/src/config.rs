//! Application configuration.

use serde::Deserialize;
use std::collections::HashMap;
use std::path::Path;

/// Application configuration.
#[derive(Debug, Clone, Deserialize)]
pub struct Config {
    /// Site configuration.
    pub site: SiteConfig,
    /// Database configuration.
    pub database: DatabaseConfig,
    /// Dispatch behaviour.
    #[serde(default)]
    pub dispatch: DispatchConfig,
    /// Ordered delivery backend list. Position in the list is the medium id.
    #[serde(default = "default_backends")]
    pub backends: Vec<BackendEntry>,
    /// Observation cascade behaviour.
    #[serde(default)]
    pub observation: ObservationConfig,
    /// Secret used to sign unsubscribe tokens.
    pub signing_secret: String,
    /// Email transport configuration (absent disables the email backend).
    #[serde(default)]
    pub email: Option<EmailConfig>,
}

/// Site configuration.
#[derive(Debug, Clone, Deserialize)]
pub struct SiteConfig {
    /// Public root URL of the site, without trailing slash.
    pub url: String,
    /// Human-readable site name, used in render contexts.
    pub name: String,
}

/// Database connection configuration.
#[derive(Debug, Clone, Deserialize)]
pub struct DatabaseConfig {
    /// `PostgreSQL` connection URL.
    pub url: String,
    /// Maximum number of connections in the pool.
    #[serde(default = "default_max_connections")]
    pub max_connections: u32,
    /// Minimum number of connections in the pool.
    #[serde(default = "default_min_connections")]
    pub min_connections: u32,
}

/// Dispatch behaviour configuration.
#[derive(Debug, Clone, Deserialize)]
pub struct DispatchConfig {
    /// Queue every send, regardless of per-call flags.
    #[serde(default)]
    pub queue_all: bool,
    /// Run "send now" on a background task and hand the caller a join handle.
    #[serde(default = "default_true")]
    pub background_send: bool,
    /// Language used when a user has no notification language configured.
    #[serde(default = "default_language")]
    pub default_language: String,
}

impl Default for DispatchConfig {
    fn default() -> Self {
        Self {
            queue_all: false,
            background_send: true,
            default_language: default_language(),
        }
    }
}

/// One entry in the ordered backend list.
#[derive(Debug, Clone, Deserialize)]
pub struct BackendEntry {
    /// Medium label, e.g. `"email"` or `"website"`.
    pub label: String,
    /// Registered factory name used to construct the backend.
    pub backend: String,
    /// Override for the backend's static spam sensitivity.
    #[serde(default)]
    pub spam_sensitivity: Option<i32>,
}

/// Observation cascade configuration.
#[derive(Debug, Clone, Deserialize)]
pub struct ObservationConfig {
    /// Delete all observations of an entity when the entity is deleted.
    #[serde(default = "default_true")]
    pub auto_delete: bool,
    /// Entity kinds whose deletion cascades to observations on related
    /// entities, keyed by kind with the list of attribute names to follow.
    /// Example: `follow = ["followed", "favorited"]`.
    #[serde(default)]
    pub cascade_attributes: HashMap<String, Vec<String>>,
}

impl Default for ObservationConfig {
    fn default() -> Self {
        Self {
            auto_delete: true,
            cascade_attributes: HashMap::new(),
        }
    }
}

/// Email transport configuration.
#[derive(Debug, Clone, Deserialize)]
pub struct EmailConfig {
    /// SMTP host.
    pub host: String,
    /// SMTP port.
    #[serde(default = "default_smtp_port")]
    pub port: u16,
    /// Username.
    #[serde(default)]
    pub username: Option<String>,
    /// Password.
    #[serde(default)]
    pub password: Option<String>,
    /// From address for notification mail.
    pub from_address: String,
}

fn default_backends() -> Vec<BackendEntry> {
    vec![
        BackendEntry {
            label: "website".to_string(),
            backend: "website".to_string(),
            spam_sensitivity: None,
        },
        BackendEntry {
            label: "email".to_string(),
            backend: "email".to_string(),
            spam_sensitivity: None,
        },
    ]
}

const fn default_max_connections() -> u32 {
    100
}

const fn default_min_connections() -> u32 {
    5
}

const fn default_true() -> bool {
    true
}

fn default_language() -> String {
    "en".to_string()
}

const fn default_smtp_port() -> u16 {
    587
}

impl Config {
    /// Load configuration from files and environment variables.
    ///
    /// Configuration is loaded in the following order:
    /// 1. `config/default.toml`
    /// 2. `config/{environment}.toml` (based on `NOTICEKIT_ENV`)
    /// 3. Environment variables with `NOTICEKIT_` prefix
    pub fn load() -> Result<Self, config::ConfigError> {
        let env = std::env::var("NOTICEKIT_ENV").unwrap_or_else(|_| "development".to_string());
        tracing::debug!(env, "loading configuration");

        let config = config::Config::builder()
            .add_source(config::File::with_name("config/default").required(false))
            .add_source(config::File::with_name(&format!("config/{env}")).required(false))
            .add_source(
                config::Environment::with_prefix("NOTICEKIT")
                    .separator("__")
                    .try_parsing(true),
            )
            .build()?;

        config.try_deserialize()
    }

    /// Load configuration from a specific file path.
    pub fn load_from(path: &Path) -> Result<Self, config::ConfigError> {
        let config = config::Config::builder()
            .add_source(config::File::from(path))
            .add_source(
                config::Environment::with_prefix("NOTICEKIT")
                    .separator("__")
                    .try_parsing(true),
            )
            .build()?;

        config.try_deserialize()
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn test_default_backend_list_order() {
        let backends = default_backends();
        assert_eq!(backends.len(), 2);
        assert_eq!(backends[0].label, "website");
        assert_eq!(backends[1].label, "email");
        assert!(backends[0].spam_sensitivity.is_none());
    }

    #[test]
    fn test_dispatch_defaults() {
        let dispatch = DispatchConfig::default();
        assert!(!dispatch.queue_all);
        assert!(dispatch.background_send);
        assert_eq!(dispatch.default_language, "en");
    }

    #[test]
    fn test_observation_defaults() {
        let observation = ObservationConfig::default();
        assert!(observation.auto_delete);
        assert!(observation.cascade_attributes.is_empty());
    }
}
