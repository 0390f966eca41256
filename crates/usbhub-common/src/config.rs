use serde::Deserialize;

/// Top-level application configuration.
/// Loaded from environment variables (`HUB__SECTION__KEY`); every key has a default.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct AppConfig {
    /// Server settings
    #[serde(default)]
    pub server: ServerConfig,
    /// Database settings
    #[serde(default)]
    pub database: DatabaseConfig,
    /// Event log settings
    #[serde(default)]
    pub events: EventsConfig,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ServerConfig {
    /// Host to bind to (default: 0.0.0.0)
    #[serde(default = "default_host")]
    pub host: String,
    /// HTTP + hub port (default: 5009)
    #[serde(default = "default_port")]
    pub port: u16,
}

#[derive(Debug, Clone, Deserialize)]
pub struct DatabaseConfig {
    /// SQLite connection URL
    #[serde(default = "default_database_url")]
    pub url: String,
    /// Max connections in pool
    #[serde(default = "default_max_connections")]
    pub max_connections: u32,
}

#[derive(Debug, Clone, Deserialize)]
pub struct EventsConfig {
    /// Page size used by `recent` when the caller gives no usable limit
    #[serde(default = "default_event_limit")]
    pub default_limit: i64,
    /// Hard upper bound for a single `recent` query
    #[serde(default = "default_max_event_limit")]
    pub max_limit: i64,
    /// Delete events older than this many days. 0 keeps everything.
    #[serde(default)]
    pub retention_days: u32,
}

impl AppConfig {
    /// Load config from environment variables.
    pub fn load() -> Result<Self, config::ConfigError> {
        Self::from_environment(config::Environment::default())
    }

    /// Build the config from an explicit environment source.
    pub fn from_environment(env: config::Environment) -> Result<Self, config::ConfigError> {
        let cfg = config::Config::builder()
            .add_source(env.prefix("HUB").separator("__").try_parsing(true))
            .build()?;

        cfg.try_deserialize()
    }
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: default_host(),
            port: default_port(),
        }
    }
}

impl Default for DatabaseConfig {
    fn default() -> Self {
        Self {
            url: default_database_url(),
            max_connections: default_max_connections(),
        }
    }
}

impl Default for EventsConfig {
    fn default() -> Self {
        Self {
            default_limit: default_event_limit(),
            max_limit: default_max_event_limit(),
            retention_days: 0,
        }
    }
}

fn default_host() -> String {
    "0.0.0.0".to_string()
}
fn default_port() -> u16 {
    5009
}
fn default_database_url() -> String {
    "sqlite://usbhub.db".to_string()
}
fn default_max_connections() -> u32 {
    5
}
fn default_event_limit() -> i64 {
    100
}
fn default_max_event_limit() -> i64 {
    500
}
