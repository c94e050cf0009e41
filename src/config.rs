//! Service configuration: an optional TOML file overridden by environment
//! variables.
//!
//! A missing or empty file yields `Config::default()`. Unknown keys are
//! ignored by serde, though we log a warning for each one.
use crate::util::{validate_url, UrlValidationError};
use serde::Deserialize;
use std::io::Read;
use std::path::Path;
use std::time::Duration;
use thiserror::Error;

// ============================================================================
// Error Types
// ============================================================================

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Failed to read config file: {0}")]
    Io(#[from] std::io::Error),

    #[error("Invalid TOML in config file: {0}")]
    Parse(#[from] toml::de::Error),

    #[error("Config file too large: {0}")]
    TooLarge(String),

    #[error("Invalid value for {key}: {reason}")]
    Invalid { key: &'static str, reason: String },

    #[error("Invalid feed URL '{url}': {source}")]
    InvalidFeed {
        url: String,
        source: UrlValidationError,
    },
}

// ============================================================================
// Configuration Structs
// ============================================================================

/// Top-level service configuration.
///
/// All fields use `#[serde(default)]` so any subset of keys can be specified.
///
/// `notification_endpoint` usually embeds a webhook token, so `Debug`
/// masks it.
#[derive(Clone, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Address the HTTP server binds to.
    pub listen_addr: String,

    /// Seconds between poll cycles.
    pub poll_interval_secs: u64,

    /// Feed URLs to poll from startup. Empty = wait for `POST /config`.
    pub feeds: Vec<String>,

    /// Destination webhook (e.g. Discord) carried in the notification payload.
    pub notification_endpoint: Option<String>,

    /// URL of the notify service the payload is POSTed to.
    pub notification_sender: Option<String>,

    /// Per-request timeout when fetching a feed.
    pub fetch_timeout_secs: u64,

    /// Timeout of one notification round trip.
    pub dispatch_timeout_secs: u64,

    /// Browser origin allowed to call the API (the frontend).
    pub cors_origin: Option<String>,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            listen_addr: "0.0.0.0:3000".to_string(),
            poll_interval_secs: 30,
            feeds: Vec::new(),
            notification_endpoint: None,
            notification_sender: None,
            fetch_timeout_secs: 30,
            dispatch_timeout_secs: 10,
            cors_origin: None,
        }
    }
}

impl std::fmt::Debug for Config {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Config")
            .field("listen_addr", &self.listen_addr)
            .field("poll_interval_secs", &self.poll_interval_secs)
            .field("feeds", &self.feeds)
            .field(
                "notification_endpoint",
                &self.notification_endpoint.as_ref().map(|_| "[REDACTED]"),
            )
            .field("notification_sender", &self.notification_sender)
            .field("fetch_timeout_secs", &self.fetch_timeout_secs)
            .field("dispatch_timeout_secs", &self.dispatch_timeout_secs)
            .field("cors_origin", &self.cors_origin)
            .finish()
    }
}

impl Config {
    /// Maximum config file size (1 MB).
    const MAX_FILE_SIZE: u64 = 1_048_576;

    const KNOWN_KEYS: [&'static str; 8] = [
        "listen_addr",
        "poll_interval_secs",
        "feeds",
        "notification_endpoint",
        "notification_sender",
        "fetch_timeout_secs",
        "dispatch_timeout_secs",
        "cors_origin",
    ];

    /// Loads configuration from a TOML file.
    ///
    /// A missing or blank file gives the defaults. Keys outside
    /// `KNOWN_KEYS` are logged and ignored.
    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        let Some(content) = read_capped(path, Self::MAX_FILE_SIZE)? else {
            tracing::debug!(path = %path.display(), "No config file found, using defaults");
            return Ok(Self::default());
        };
        if content.trim().is_empty() {
            return Ok(Self::default());
        }

        if let Ok(table) = content.parse::<toml::Table>() {
            for key in table.keys().filter(|k| !Self::KNOWN_KEYS.contains(&k.as_str())) {
                tracing::warn!(key = %key, "Unknown key in config file, ignoring");
            }
        }

        let config: Config = toml::from_str(&content)?;
        tracing::info!(path = %path.display(), feeds = config.feeds.len(), "Loaded configuration");
        Ok(config)
    }

    /// Applies the process environment on top of this configuration.
    pub fn with_env(self) -> Result<Self, ConfigError> {
        self.with_env_from(|key| std::env::var(key).ok())
    }

    /// Applies `POLL_INTERVAL`, `NOTIFICATION_ENDPOINT`, `NOTIFICATION_SENDER`,
    /// `LISTEN_ADDR` and `CORS_ORIGIN` as looked up by `lookup`. Blank values
    /// are ignored.
    pub fn with_env_from<F>(mut self, lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let get = |key: &str| lookup(key).filter(|v| !v.trim().is_empty());

        if let Some(value) = get("POLL_INTERVAL") {
            self.poll_interval_secs =
                value.trim().parse().map_err(|_| ConfigError::Invalid {
                    key: "POLL_INTERVAL",
                    reason: format!("'{value}' is not a number of seconds"),
                })?;
        }
        if let Some(value) = get("NOTIFICATION_ENDPOINT") {
            self.notification_endpoint = Some(value);
        }
        if let Some(value) = get("NOTIFICATION_SENDER") {
            self.notification_sender = Some(value);
        }
        if let Some(value) = get("LISTEN_ADDR") {
            self.listen_addr = value;
        }
        if let Some(value) = get("CORS_ORIGIN") {
            self.cors_origin = Some(value);
        }

        Ok(self)
    }

    /// Checks values that would otherwise fail at runtime.
    pub fn validate(&self) -> Result<(), ConfigError> {
        for (key, value) in [
            ("poll_interval_secs", self.poll_interval_secs),
            ("fetch_timeout_secs", self.fetch_timeout_secs),
            ("dispatch_timeout_secs", self.dispatch_timeout_secs),
        ] {
            if value == 0 {
                return Err(ConfigError::Invalid {
                    key,
                    reason: "must be greater than zero".to_string(),
                });
            }
        }

        for url in &self.feeds {
            validate_url(url).map_err(|source| ConfigError::InvalidFeed {
                url: url.clone(),
                source,
            })?;
        }

        if let Some(sender) = self.notification_sender.as_deref() {
            validate_url(sender).map_err(|e| ConfigError::Invalid {
                key: "notification_sender",
                reason: e.to_string(),
            })?;
        }

        Ok(())
    }

    pub fn poll_interval(&self) -> Duration {
        Duration::from_secs(self.poll_interval_secs)
    }

    pub fn fetch_timeout(&self) -> Duration {
        Duration::from_secs(self.fetch_timeout_secs)
    }

    pub fn dispatch_timeout(&self) -> Duration {
        Duration::from_secs(self.dispatch_timeout_secs)
    }
}

/// Reads at most `limit` bytes of `path`. `None` if the file does not exist.
fn read_capped(path: &Path, limit: u64) -> Result<Option<String>, ConfigError> {
    let file = match std::fs::File::open(path) {
        Ok(file) => file,
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(None),
        Err(e) => return Err(e.into()),
    };

    let mut content = String::new();
    file.take(limit + 1).read_to_string(&mut content)?;
    if content.len() as u64 > limit {
        return Err(ConfigError::TooLarge(format!(
            "{} exceeds {limit} bytes",
            path.display()
        )));
    }
    Ok(Some(content))
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn env(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |key| map.get(key).cloned()
    }

    #[test]
    fn test_default_config() {
        let config = Config::default();
        assert_eq!(config.listen_addr, "0.0.0.0:3000");
        assert_eq!(config.poll_interval(), Duration::from_secs(30));
        assert_eq!(config.dispatch_timeout(), Duration::from_secs(10));
        assert!(config.feeds.is_empty());
        assert!(config.notification_endpoint.is_none());
        assert!(config.notification_sender.is_none());
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_missing_file_returns_default() {
        let path = Path::new("/tmp/rss_poller_test_nonexistent_config.toml");
        let config = Config::load(path).unwrap();
        assert_eq!(config.poll_interval_secs, 30);
    }

    #[test]
    fn test_empty_file_returns_default() {
        let dir = std::env::temp_dir().join("rss_poller_config_test_empty");
        std::fs::create_dir_all(&dir).unwrap();
        let path = dir.join("config.toml");
        std::fs::write(&path, "   \n  ").unwrap();

        let config = Config::load(&path).unwrap();
        assert_eq!(config.poll_interval_secs, 30);

        std::fs::remove_dir_all(&dir).ok();
    }

    #[test]
    fn test_full_config() {
        let dir = std::env::temp_dir().join("rss_poller_config_test_full");
        std::fs::create_dir_all(&dir).unwrap();
        let path = dir.join("config.toml");

        let content = r#"
listen_addr = "127.0.0.1:8080"
poll_interval_secs = 60
feeds = ["https://example.com/a.xml", "https://example.com/b.xml"]
notification_endpoint = "https://discord.com/api/webhooks/1/token"
notification_sender = "http://rss-notify:3000/push"
fetch_timeout_secs = 15
dispatch_timeout_secs = 5
cors_origin = "http://localhost:4321"
"#;
        std::fs::write(&path, content).unwrap();

        let config = Config::load(&path).unwrap();
        assert_eq!(config.listen_addr, "127.0.0.1:8080");
        assert_eq!(config.poll_interval(), Duration::from_secs(60));
        assert_eq!(config.feeds.len(), 2);
        assert_eq!(
            config.notification_sender.as_deref(),
            Some("http://rss-notify:3000/push")
        );
        assert_eq!(config.fetch_timeout(), Duration::from_secs(15));
        assert_eq!(config.dispatch_timeout(), Duration::from_secs(5));
        assert_eq!(config.cors_origin.as_deref(), Some("http://localhost:4321"));
        assert!(config.validate().is_ok());

        std::fs::remove_dir_all(&dir).ok();
    }

    #[test]
    fn test_invalid_toml_returns_error() {
        let dir = std::env::temp_dir().join("rss_poller_config_test_invalid");
        std::fs::create_dir_all(&dir).unwrap();
        let path = dir.join("config.toml");
        std::fs::write(&path, "this is not [valid toml").unwrap();

        let err = Config::load(&path).unwrap_err();
        assert!(matches!(err, ConfigError::Parse(_)));
        assert!(err.to_string().contains("Invalid TOML"));

        std::fs::remove_dir_all(&dir).ok();
    }

    #[test]
    fn test_unknown_keys_accepted() {
        let dir = std::env::temp_dir().join("rss_poller_config_test_unknown");
        std::fs::create_dir_all(&dir).unwrap();
        let path = dir.join("config.toml");
        std::fs::write(&path, "poll_interval_secs = 5\ntotally_fake_key = 1\n").unwrap();

        let config = Config::load(&path).unwrap();
        assert_eq!(config.poll_interval_secs, 5);

        std::fs::remove_dir_all(&dir).ok();
    }

    #[test]
    fn test_too_large_file_rejected() {
        let dir = std::env::temp_dir().join("rss_poller_config_test_too_large");
        std::fs::create_dir_all(&dir).unwrap();
        let path = dir.join("config.toml");
        std::fs::write(&path, "a".repeat(1_048_577)).unwrap();

        let err = Config::load(&path).unwrap_err();
        assert!(matches!(err, ConfigError::TooLarge(_)));

        std::fs::remove_dir_all(&dir).ok();
    }

    #[test]
    fn test_env_overrides_file_values() {
        let config = Config::default()
            .with_env_from(env(&[
                ("POLL_INTERVAL", "45"),
                ("NOTIFICATION_ENDPOINT", "https://hook.example.com/x"),
                ("NOTIFICATION_SENDER", "http://notify:3000/push"),
                ("LISTEN_ADDR", "127.0.0.1:9000"),
            ]))
            .unwrap();

        assert_eq!(config.poll_interval_secs, 45);
        assert_eq!(
            config.notification_endpoint.as_deref(),
            Some("https://hook.example.com/x")
        );
        assert_eq!(
            config.notification_sender.as_deref(),
            Some("http://notify:3000/push")
        );
        assert_eq!(config.listen_addr, "127.0.0.1:9000");
    }

    #[test]
    fn test_blank_env_values_ignored() {
        let mut base = Config::default();
        base.notification_sender = Some("http://notify/push".to_string());

        let config = base
            .with_env_from(env(&[("NOTIFICATION_SENDER", "  "), ("POLL_INTERVAL", "")]))
            .unwrap();
        assert_eq!(
            config.notification_sender.as_deref(),
            Some("http://notify/push")
        );
        assert_eq!(config.poll_interval_secs, 30);
    }

    #[test]
    fn test_non_numeric_interval_rejected() {
        let err = Config::default()
            .with_env_from(env(&[("POLL_INTERVAL", "soon")]))
            .unwrap_err();
        assert!(matches!(
            err,
            ConfigError::Invalid {
                key: "POLL_INTERVAL",
                ..
            }
        ));
    }

    #[test]
    fn test_validate_rejects_zero_interval() {
        let mut config = Config::default();
        config.poll_interval_secs = 0;
        assert!(matches!(
            config.validate(),
            Err(ConfigError::Invalid {
                key: "poll_interval_secs",
                ..
            })
        ));
    }

    #[test]
    fn test_validate_rejects_bad_feed() {
        let mut config = Config::default();
        config.feeds = vec!["ftp://example.com/feed".to_string()];
        assert!(matches!(
            config.validate(),
            Err(ConfigError::InvalidFeed { .. })
        ));
    }

    #[test]
    fn test_debug_masks_notification_endpoint() {
        let mut config = Config::default();
        config.notification_endpoint =
            Some("https://discord.com/api/webhooks/123/super-secret".to_string());

        let debug_output = format!("{:?}", config);
        assert!(!debug_output.contains("super-secret"));
        assert!(debug_output.contains("[REDACTED]"));
    }
}
