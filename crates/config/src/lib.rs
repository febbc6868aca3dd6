use anyhow::Context;
use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use std::time::Duration;
use tracing::debug;

const DEFAULT_CONFIG_FILES: &[&str] = &[
    "courier.toml",
    "config/courier.toml",
    "crates/config/courier.toml",
    "../courier.toml",
    "../config/courier.toml",
];

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct AppConfig {
    pub http: HttpConfig,
    pub database: DatabaseConfig,
    pub auth: AuthConfig,
    #[serde(default)]
    pub delivery: DeliveryConfig,
    #[serde(default)]
    pub media: MediaConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HttpConfig {
    pub address: String,
    pub port: u16,
}

impl Default for HttpConfig {
    fn default() -> Self {
        Self {
            address: "127.0.0.1".to_string(),
            port: 7070,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DatabaseConfig {
    pub url: String,
    pub max_connections: u32,
}

impl Default for DatabaseConfig {
    fn default() -> Self {
        Self {
            url: "sqlite://courier.db".to_string(),
            max_connections: 10,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AuthConfig {
    #[serde(default = "AuthConfig::default_session_ttl")]
    pub session_ttl_seconds: u64,
}

impl Default for AuthConfig {
    fn default() -> Self {
        Self {
            session_ttl_seconds: Self::default_session_ttl(),
        }
    }
}

impl AuthConfig {
    fn default_session_ttl() -> u64 {
        86_400
    }
}

/// Tuning for the live delivery path.
///
/// ```
/// use courier_config::DeliveryConfig;
///
/// let delivery = DeliveryConfig::default();
/// assert_eq!(delivery.channel_capacity, 64);
/// assert_eq!(delivery.send_timeout().as_millis(), 250);
/// ```
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DeliveryConfig {
    /// Records buffered per subscriber before sends start waiting.
    #[serde(default = "DeliveryConfig::default_channel_capacity")]
    pub channel_capacity: usize,
    /// How long a broadcast waits on a full subscriber buffer before evicting it.
    #[serde(default = "DeliveryConfig::default_send_timeout_ms")]
    pub send_timeout_ms: u64,
    /// Default and maximum page size for message history reads.
    #[serde(default = "DeliveryConfig::default_history_page_size")]
    pub history_page_size: u32,
}

impl DeliveryConfig {
    const fn default_channel_capacity() -> usize {
        64
    }

    const fn default_send_timeout_ms() -> u64 {
        250
    }

    const fn default_history_page_size() -> u32 {
        50
    }

    pub fn send_timeout(&self) -> Duration {
        Duration::from_millis(self.send_timeout_ms)
    }
}

impl Default for DeliveryConfig {
    fn default() -> Self {
        Self {
            channel_capacity: Self::default_channel_capacity(),
            send_timeout_ms: Self::default_send_timeout_ms(),
            history_page_size: Self::default_history_page_size(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MediaConfig {
    #[serde(default = "MediaConfig::default_upload_base_url")]
    pub upload_base_url: String,
    #[serde(default = "MediaConfig::default_public_base_url")]
    pub public_base_url: String,
    #[serde(default = "MediaConfig::default_upload_url_ttl")]
    pub upload_url_ttl_seconds: u64,
}

impl MediaConfig {
    fn default_upload_base_url() -> String {
        "http://127.0.0.1:9000/media/upload".to_string()
    }

    fn default_public_base_url() -> String {
        "http://127.0.0.1:9000/media".to_string()
    }

    const fn default_upload_url_ttl() -> u64 {
        3_600
    }
}

impl Default for MediaConfig {
    fn default() -> Self {
        Self {
            upload_base_url: Self::default_upload_base_url(),
            public_base_url: Self::default_public_base_url(),
            upload_url_ttl_seconds: Self::default_upload_url_ttl(),
        }
    }
}

fn clamp_to_i64(value: u64) -> i64 {
    i64::try_from(value).unwrap_or(i64::MAX)
}

/// Load the application configuration by combining defaults, files, and environment overrides.
///
/// ```
/// use courier_config::load;
///
/// std::env::remove_var("COURIER_CONFIG");
///
/// let config = load().expect("configuration should load with defaults");
/// assert!(!config.http.address.is_empty());
/// ```
pub fn load() -> anyhow::Result<AppConfig> {
    let defaults = AppConfig::default();

    let mut builder = config::Config::builder()
        .set_default("http.address", defaults.http.address.clone())?
        .set_default("http.port", i64::from(defaults.http.port))?
        .set_default("database.url", defaults.database.url.clone())?
        .set_default(
            "database.max_connections",
            i64::from(defaults.database.max_connections),
        )?
        .set_default(
            "auth.session_ttl_seconds",
            clamp_to_i64(defaults.auth.session_ttl_seconds),
        )?
        .set_default(
            "delivery.channel_capacity",
            clamp_to_i64(defaults.delivery.channel_capacity as u64),
        )?
        .set_default(
            "delivery.send_timeout_ms",
            clamp_to_i64(defaults.delivery.send_timeout_ms),
        )?
        .set_default(
            "delivery.history_page_size",
            i64::from(defaults.delivery.history_page_size),
        )?
        .set_default("media.upload_base_url", defaults.media.upload_base_url.clone())?
        .set_default("media.public_base_url", defaults.media.public_base_url.clone())?
        .set_default(
            "media.upload_url_ttl_seconds",
            clamp_to_i64(defaults.media.upload_url_ttl_seconds),
        )?;

    let environment_overrides = config::Environment::with_prefix("COURIER").separator("__");

    let mut config_file_attached = false;

    if let Ok(path) = std::env::var("COURIER_CONFIG") {
        builder = builder.add_source(config::File::from(PathBuf::from(&path)));
        config_file_attached = true;
        debug!(path, "loading configuration via COURIER_CONFIG");
    } else if let Ok(cwd) = std::env::current_dir() {
        let fallback = DEFAULT_CONFIG_FILES
            .iter()
            .map(|candidate| cwd.join(candidate))
            .find(|path| path.exists());

        if let Some(path) = fallback {
            debug!(path = %path.display(), "loading configuration file");
            builder = builder.add_source(config::File::from(path));
            config_file_attached = true;
        }
    }

    if !config_file_attached {
        debug!("no configuration file found, relying on defaults and environment overrides");
    }

    builder = builder.add_source(environment_overrides);

    let cfg = builder.build().context("unable to build configuration")?;

    let mut config = cfg
        .try_deserialize::<AppConfig>()
        .context("invalid configuration")?;

    if config.auth.session_ttl_seconds > i64::MAX as u64 {
        config.auth.session_ttl_seconds = i64::MAX as u64;
    }

    if config.delivery.channel_capacity == 0 {
        anyhow::bail!("invalid configuration: delivery.channel_capacity must be at least 1");
    }

    debug!(?config, "loaded backend configuration");
    Ok(config)
}
