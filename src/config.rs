//! Environment-variable configuration.
//!
//! `DISCORD_TOKEN`, `CHANNEL_ID` and `ROLE_ID` are required; everything else
//! has a default. The binary loads a `.env` file through `dotenvy` before
//! calling [`Config::from_env`].

use chrono_tz::Tz;
use std::path::PathBuf;
use thiserror::Error;
use url::Url;

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("missing required environment variable: {0}")]
    MissingVar(&'static str),

    #[error("invalid TIMEZONE value: {0}")]
    InvalidTimezone(String),
}

/// Deployment environment; selects the startup invocation mode.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Environment {
    Development,
    Production,
}

#[derive(Clone)]
pub struct DiscordConfig {
    pub token: String,
    pub channel_id: String,
    pub role_id: String,
}

#[derive(Clone, Debug)]
pub struct Config {
    pub discord: DiscordConfig,
    pub feed_url: String,
    pub timezone: Tz,
    pub environment: Environment,
    pub data_dir: PathBuf,
}

/// Mask the bot token in Debug output so it can't leak through logs or
/// error messages.
impl std::fmt::Debug for DiscordConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("DiscordConfig")
            .field("token", &"[REDACTED]")
            .field("channel_id", &self.channel_id)
            .field("role_id", &self.role_id)
            .finish()
    }
}

impl Config {
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|name| std::env::var(name).ok())
    }

    /// Builds the config from any variable source. Tests pass a closure over
    /// a map instead of mutating the process environment.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self, ConfigError> {
        let require = |name: &'static str| lookup(name).ok_or(ConfigError::MissingVar(name));

        let timezone_raw = lookup("TIMEZONE").unwrap_or_else(|| "Europe/Paris".to_string());
        let timezone: Tz = timezone_raw
            .parse()
            .map_err(|_| ConfigError::InvalidTimezone(timezone_raw))?;

        let environment = match lookup("ENVIRONMENT").as_deref() {
            Some("production") => Environment::Production,
            _ => Environment::Development,
        };

        Ok(Self {
            discord: DiscordConfig {
                token: require("DISCORD_TOKEN")?,
                channel_id: require("CHANNEL_ID")?,
                role_id: require("ROLE_ID")?,
            },
            feed_url: lookup("FEED_URL")
                .unwrap_or_else(|| "https://www.swift.org/atom.xml".to_string()),
            timezone,
            environment,
            data_dir: lookup("DATA_DIR")
                .map(PathBuf::from)
                .unwrap_or_else(|| PathBuf::from("data")),
        })
    }

    /// Human-readable feed origin for the embed footer: the feed URL's host,
    /// or the raw URL if it doesn't parse.
    pub fn feed_source(&self) -> String {
        Url::parse(&self.feed_url)
            .ok()
            .and_then(|u| u.host_str().map(str::to_string))
            .unwrap_or_else(|| self.feed_url.clone())
    }
}
