//! Server configuration loading from file and environment variables.

use serde::Deserialize;
use std::fmt;
use std::net::{IpAddr, Ipv4Addr};
use thiserror::Error;
use tribunal_types::{PolicyError, VotePolicy};

/// Top-level server configuration.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct Config {
    /// Server network settings.
    #[serde(default)]
    pub server: ServerConfig,

    /// Logging settings.
    #[serde(default)]
    pub logging: LoggingConfig,

    /// Vote sizing and timing.
    #[serde(default)]
    pub vote: VotePolicy,

    /// Remote platform used for messages and moderation.
    #[serde(default)]
    pub platform: PlatformConfig,
}

/// Network configuration for the HTTP server.
#[derive(Debug, Clone, Deserialize)]
pub struct ServerConfig {
    /// Host address to bind to.
    #[serde(default = "default_host")]
    pub host: IpAddr,

    /// Port to listen on.
    #[serde(default = "default_port")]
    pub port: u16,
}

/// Logging configuration.
#[derive(Debug, Clone, Deserialize)]
pub struct LoggingConfig {
    /// Log level filter (e.g., "info", "debug", "tribunal_vote=debug,info").
    #[serde(default = "default_log_level")]
    pub level: String,

    /// Whether to output logs in JSON format.
    #[serde(default)]
    pub json: bool,
}

/// Connection to the chat platform that hosts the voice rooms.
///
/// When `base_url` is empty, outbound messages and moderation actions are
/// only logged.
#[derive(Clone, Deserialize)]
pub struct PlatformConfig {
    /// Base URL of the platform bridge, e.g. `http://localhost:8090`.
    #[serde(default)]
    pub base_url: String,

    /// Bearer token sent with every outbound request.
    #[serde(default)]
    pub token: String,

    /// Room that receives the startup announcement.
    #[serde(default)]
    pub announce_room: Option<String>,

    /// Per-request timeout in seconds.
    #[serde(default = "default_request_timeout_secs")]
    pub request_timeout_secs: u64,
}

impl fmt::Debug for PlatformConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("PlatformConfig")
            .field("base_url", &self.base_url)
            .field("token", &"[REDACTED]")
            .field("announce_room", &self.announce_room)
            .field("request_timeout_secs", &self.request_timeout_secs)
            .finish()
    }
}

impl PlatformConfig {
    pub fn is_enabled(&self) -> bool {
        !self.base_url.trim().is_empty()
    }
}

fn default_host() -> IpAddr {
    IpAddr::V4(Ipv4Addr::new(127, 0, 0, 1))
}

fn default_port() -> u16 {
    3000
}

fn default_log_level() -> String {
    "info".to_string()
}

fn default_request_timeout_secs() -> u64 {
    10
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: default_host(),
            port: default_port(),
        }
    }
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: default_log_level(),
            json: false,
        }
    }
}

impl Default for PlatformConfig {
    fn default() -> Self {
        Self {
            base_url: String::new(),
            token: String::new(),
            announce_room: None,
            request_timeout_secs: default_request_timeout_secs(),
        }
    }
}

/// Errors that can occur when loading configuration.
#[derive(Debug, Error)]
pub enum ConfigError {
    /// Failed to read the configuration file.
    #[error("failed to read config file: {0}")]
    FileRead(#[from] std::io::Error),

    /// Failed to parse the configuration file.
    #[error("failed to parse config file: {0}")]
    Parse(#[from] toml::de::Error),

    /// The `[vote]` table holds unusable values.
    #[error("invalid vote policy: {0}")]
    Policy(#[from] PolicyError),
}

/// Loads configuration from a TOML file, falling back to defaults.
///
/// Environment variable overrides:
/// - `TRIBUNAL_HOST` overrides `server.host`
/// - `TRIBUNAL_PORT` overrides `server.port`
/// - `TRIBUNAL_LOG_LEVEL` overrides `logging.level`
/// - `TRIBUNAL_LOG_JSON` overrides `logging.json` (set to "true" to enable)
/// - `TRIBUNAL_VOTE_PERCENTAGE` overrides `vote.percentage`
/// - `TRIBUNAL_RESOLVE_ON_QUORUM` overrides `vote.resolve_on_quorum`
/// - `TRIBUNAL_PLATFORM_URL` overrides `platform.base_url`
/// - `TRIBUNAL_PLATFORM_TOKEN` overrides `platform.token`
/// - `TRIBUNAL_ANNOUNCE_ROOM` overrides `platform.announce_room`
///
/// # Errors
///
/// Returns `ConfigError` if the file exists but cannot be read or parsed,
/// or if the resulting vote policy is invalid.
pub fn load_config(path: Option<&str>) -> Result<Config, ConfigError> {
    let mut config = match path {
        Some(p) => match std::fs::read_to_string(p) {
            Ok(contents) => toml::from_str(&contents)?,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                tracing::info!(path = p, "config file not found, using defaults");
                Config::default()
            }
            Err(e) => return Err(ConfigError::FileRead(e)),
        },
        None => Config::default(),
    };

    // Environment variable overrides
    if let Ok(host) = std::env::var("TRIBUNAL_HOST") {
        if let Ok(parsed) = host.parse() {
            config.server.host = parsed;
        }
    }
    if let Ok(port) = std::env::var("TRIBUNAL_PORT") {
        if let Ok(parsed) = port.parse() {
            config.server.port = parsed;
        }
    }
    if let Ok(level) = std::env::var("TRIBUNAL_LOG_LEVEL") {
        config.logging.level = level;
    }
    if let Ok(json) = std::env::var("TRIBUNAL_LOG_JSON") {
        config.logging.json = json == "true" || json == "1";
    }
    if let Ok(percentage) = std::env::var("TRIBUNAL_VOTE_PERCENTAGE") {
        if let Ok(parsed) = percentage.parse() {
            config.vote.percentage = parsed;
        }
    }
    if let Ok(quorum) = std::env::var("TRIBUNAL_RESOLVE_ON_QUORUM") {
        config.vote.resolve_on_quorum = quorum == "true" || quorum == "1";
    }
    if let Ok(url) = std::env::var("TRIBUNAL_PLATFORM_URL") {
        config.platform.base_url = url;
    }
    if let Ok(token) = std::env::var("TRIBUNAL_PLATFORM_TOKEN") {
        config.platform.token = token;
    }
    if let Ok(room) = std::env::var("TRIBUNAL_ANNOUNCE_ROOM") {
        config.platform.announce_room = Some(room).filter(|r| !r.trim().is_empty());
    }

    config.vote.validate()?;

    Ok(config)
}
