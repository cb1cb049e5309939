use std::{str::FromStr, time::Duration};

use strum_macros::{Display, EnumString};

use crate::errors::ConfigError;

/// swaps are polled on a fixed cadence
pub const FETCH_INTERVAL: Duration = Duration::from_millis(80_000);

pub const TELEGRAM_API_URL: &str = "https://api.telegram.org";

const DEFAULT_REDIS_URL: &str = "redis://localhost:6379";
const DEFAULT_THRESHOLD: f64 = 500_000.0;
const DEFAULT_NOTIFICATION_INTERVAL_MS: u64 = 60_000;
const DEFAULT_SMTP_PORT: u16 = 465;

/// Which subgraph schema the upstream indexer speaks.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Display, EnumString)]
#[strum(serialize_all = "lowercase")]
pub enum ProtocolVersion {
    V2,
    V3,
}

impl ProtocolVersion {
    /// name of the env var holding the indexer url for this version, ie. `UNISWAP_V3_GRAPH_URL`
    pub fn graph_url_var(&self) -> String {
        format!("UNISWAP_{}_GRAPH_URL", self.to_string().to_uppercase())
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TelegramConfig {
    pub token: String,
    pub chat_id: String,
    pub api_url: String,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SmtpConfig {
    pub host: String,
    pub port: u16,
    pub user: String,
    pub pass: String,
    pub recipient: String,
}

/// The notifier runs in exactly one of these for the lifetime of the process.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum NotificationTarget {
    Email(SmtpConfig),
    Telegram(TelegramConfig),
}

impl NotificationTarget {
    pub fn mode(&self) -> &'static str {
        match self {
            NotificationTarget::Email(_) => "email",
            NotificationTarget::Telegram(_) => "telegram",
        }
    }
}

#[derive(Debug, Clone)]
pub struct NotifierConfig {
    pub version: ProtocolVersion,
    pub graph_url: String,
    pub redis_url: String,
    pub threshold: f64,
    pub notification_interval: Duration,
    pub target: NotificationTarget,
}

impl NotifierConfig {
    /// Loads the configuration from the process environment. Call
    /// `dotenv::dotenv()` first to pick up a `.env` file.
    pub fn from_env() -> Result<Self, ConfigError> {
        let version = parse_or("UNISWAP_VERSION", ProtocolVersion::V3)?;

        let graph_url_var = version.graph_url_var();
        let graph_url = required(&graph_url_var)?;

        let redis_url = optional("REDIS_URL").unwrap_or_else(|| DEFAULT_REDIS_URL.to_string());
        let threshold = parse_or("EMAIL_THRESHOLD", DEFAULT_THRESHOLD)?;
        let interval_ms = parse_or("NOTIFICATION_SEND_INTERVAL", DEFAULT_NOTIFICATION_INTERVAL_MS)?;

        let target = match optional("NOTIFICATION_TYPE").as_deref().unwrap_or("email") {
            "email" => NotificationTarget::Email(SmtpConfig {
                host: required("SMTP_HOST")?,
                port: parse_or("SMTP_PORT", DEFAULT_SMTP_PORT)?,
                user: required("EMAIL_USER")?,
                pass: required("EMAIL_PASS")?,
                recipient: required("RECIPIENT_EMAIL")?,
            }),
            _ => NotificationTarget::Telegram(TelegramConfig {
                token: required("TELEGRAM_TOKEN")?,
                chat_id: required("TELEGRAM_CHAT_ID")?,
                api_url: TELEGRAM_API_URL.to_string(),
            }),
        };

        Ok(Self {
            version,
            graph_url,
            redis_url,
            threshold,
            notification_interval: Duration::from_millis(interval_ms),
            target,
        })
    }
}

fn optional(var: &str) -> Option<String> {
    std::env::var(var).ok().filter(|v| !v.is_empty())
}

fn required(var: &str) -> Result<String, ConfigError> {
    optional(var).ok_or_else(|| ConfigError::Missing(var.to_string()))
}

fn parse_or<T: FromStr>(var: &str, default: T) -> Result<T, ConfigError> {
    match optional(var) {
        Some(value) => value
            .trim()
            .parse()
            .map_err(|_| ConfigError::Invalid { var: var.to_string(), value }),
        None => Ok(default),
    }
}

#[cfg(test)]
mod tests {
    use serial_test::serial;

    use super::*;

    const VARS: &[&str] = &[
        "UNISWAP_VERSION",
        "UNISWAP_V2_GRAPH_URL",
        "UNISWAP_V3_GRAPH_URL",
        "REDIS_URL",
        "EMAIL_THRESHOLD",
        "NOTIFICATION_SEND_INTERVAL",
        "NOTIFICATION_TYPE",
        "SMTP_HOST",
        "SMTP_PORT",
        "EMAIL_USER",
        "EMAIL_PASS",
        "RECIPIENT_EMAIL",
        "TELEGRAM_TOKEN",
        "TELEGRAM_CHAT_ID",
    ];

    fn clear_env() {
        for var in VARS {
            std::env::remove_var(var);
        }
    }

    fn set_smtp_env() {
        std::env::set_var("SMTP_HOST", "smtp.example.com");
        std::env::set_var("EMAIL_USER", "bot@example.com");
        std::env::set_var("EMAIL_PASS", "hunter2");
        std::env::set_var("RECIPIENT_EMAIL", "desk@example.com");
    }

    #[test]
    #[serial]
    fn test_defaults() {
        clear_env();
        set_smtp_env();
        std::env::set_var("UNISWAP_V3_GRAPH_URL", "http://indexer/v3");

        let config = NotifierConfig::from_env().unwrap();

        assert_eq!(config.version, ProtocolVersion::V3);
        assert_eq!(config.graph_url, "http://indexer/v3");
        assert_eq!(config.redis_url, "redis://localhost:6379");
        assert_eq!(config.threshold, 500_000.0);
        assert_eq!(config.notification_interval, Duration::from_millis(60_000));
        assert_eq!(
            config.target,
            NotificationTarget::Email(SmtpConfig {
                host: "smtp.example.com".to_string(),
                port: 465,
                user: "bot@example.com".to_string(),
                pass: "hunter2".to_string(),
                recipient: "desk@example.com".to_string(),
            })
        );
    }

    #[test]
    #[serial]
    fn test_version_selects_graph_url() {
        clear_env();
        set_smtp_env();
        std::env::set_var("UNISWAP_VERSION", "v2");
        std::env::set_var("UNISWAP_V2_GRAPH_URL", "http://indexer/v2");
        std::env::set_var("UNISWAP_V3_GRAPH_URL", "http://indexer/v3");

        let config = NotifierConfig::from_env().unwrap();

        assert_eq!(config.version, ProtocolVersion::V2);
        assert_eq!(config.graph_url, "http://indexer/v2");
    }

    #[test]
    #[serial]
    fn test_missing_graph_url() {
        clear_env();
        set_smtp_env();

        let err = NotifierConfig::from_env().unwrap_err();
        assert!(matches!(err, ConfigError::Missing(var) if var == "UNISWAP_V3_GRAPH_URL"));
    }

    #[test]
    #[serial]
    fn test_unknown_version() {
        clear_env();
        std::env::set_var("UNISWAP_VERSION", "v4");

        assert!(matches!(NotifierConfig::from_env(), Err(ConfigError::Invalid { .. })));
    }

    #[test]
    #[serial]
    fn test_non_email_type_selects_telegram() {
        clear_env();
        std::env::set_var("UNISWAP_V3_GRAPH_URL", "http://indexer/v3");
        std::env::set_var("NOTIFICATION_TYPE", "telegram");
        std::env::set_var("TELEGRAM_TOKEN", "123:abc");
        std::env::set_var("TELEGRAM_CHAT_ID", "-1001");
        std::env::set_var("EMAIL_THRESHOLD", "12.5");
        std::env::set_var("NOTIFICATION_SEND_INTERVAL", "1500");

        let config = NotifierConfig::from_env().unwrap();

        assert_eq!(config.threshold, 12.5);
        assert_eq!(config.notification_interval, Duration::from_millis(1500));
        assert_eq!(
            config.target,
            NotificationTarget::Telegram(TelegramConfig {
                token: "123:abc".to_string(),
                chat_id: "-1001".to_string(),
                api_url: TELEGRAM_API_URL.to_string(),
            })
        );
    }

    #[test]
    #[serial]
    fn test_malformed_threshold() {
        clear_env();
        set_smtp_env();
        std::env::set_var("UNISWAP_V3_GRAPH_URL", "http://indexer/v3");
        std::env::set_var("EMAIL_THRESHOLD", "lots");

        assert!(matches!(
            NotifierConfig::from_env(),
            Err(ConfigError::Invalid { var, .. }) if var == "EMAIL_THRESHOLD"
        ));
    }
}
