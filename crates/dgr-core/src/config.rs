//! Configuration management
//!
//! Settings are resolved in this order:
//! 1. Environment variables
//! 2. `dgr-bot.toml` configuration file (or an explicit path)
//! 3. Default values
//!
//! `${VAR_NAME}` inside the configuration file is expanded from the
//! environment before parsing.

use std::path::Path;
use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::Error;

/// Default configuration file looked up in the working directory
pub const DEFAULT_CONFIG_FILE: &str = "dgr-bot.toml";

pub const ENV_TELEGRAM_BOT_TOKEN: &str = "TELEGRAM_BOT_TOKEN";
pub const ENV_SUPABASE_URL: &str = "SUPABASE_URL";
pub const ENV_SUPABASE_ANON_KEY: &str = "SUPABASE_ANON_KEY";
pub const ENV_LOOKUP_TIMEOUT_SECS: &str = "LOOKUP_TIMEOUT_SECS";
pub const ENV_CLASS_LIST_LIMIT: &str = "CLASS_LIST_LIMIT";

/// Telegram bot configuration
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct TelegramConfig {
    /// Bot API token
    pub token: String,
}

/// Hosted data store (Supabase PostgREST) configuration
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct SupabaseConfig {
    /// Project URL, e.g. `https://xyz.supabase.co`
    pub url: String,

    /// Anonymous (public) API key
    pub anon_key: String,
}

/// Lookup behaviour
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LookupConfig {
    /// Upper bound for a single data-store query
    #[serde(default = "default_timeout_secs")]
    pub timeout_secs: u64,

    /// Maximum class entries rendered in one reply (0 = no cap)
    #[serde(default = "default_class_list_limit")]
    pub class_list_limit: usize,
}

impl Default for LookupConfig {
    fn default() -> Self {
        Self {
            timeout_secs: default_timeout_secs(),
            class_list_limit: default_class_list_limit(),
        }
    }
}

fn default_timeout_secs() -> u64 {
    10
}

fn default_class_list_limit() -> usize {
    30
}

/// Main configuration for dgr-bot
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Config {
    #[serde(default)]
    pub telegram: TelegramConfig,

    #[serde(default)]
    pub supabase: SupabaseConfig,

    #[serde(default)]
    pub lookup: LookupConfig,
}

impl Config {
    /// Expand `${VAR_NAME}` references using `lookup`.
    ///
    /// Unknown variables expand to an empty string.
    fn expand_env_vars(value: &str, lookup: &impl Fn(&str) -> Option<String>) -> String {
        let mut result = String::with_capacity(value.len());
        let mut chars = value.chars().peekable();

        while let Some(c) = chars.next() {
            if c == '$' && chars.peek() == Some(&'{') {
                chars.next();

                let mut var_name = String::new();
                for c in chars.by_ref() {
                    if c == '}' {
                        break;
                    }
                    var_name.push(c);
                }

                if let Some(env_value) = lookup(&var_name) {
                    result.push_str(&env_value);
                }
            } else {
                result.push(c);
            }
        }

        result
    }

    /// Load configuration from a TOML file, then apply environment overrides
    /// and validate.
    pub fn from_toml_file<P: AsRef<Path>>(path: P) -> crate::Result<Self> {
        Self::from_toml_file_with(path, env_var)
    }

    fn from_toml_file_with<P: AsRef<Path>>(
        path: P,
        lookup: impl Fn(&str) -> Option<String>,
    ) -> crate::Result<Self> {
        let path = path.as_ref();

        let toml_content = std::fs::read_to_string(path).map_err(|e| {
            Error::Config(format!("Failed to read config file {}: {}", path.display(), e))
        })?;

        let expanded = Self::expand_env_vars(&toml_content, &lookup);

        let mut cfg: Config = toml::from_str(&expanded)
            .map_err(|e| Error::Config(format!("Failed to parse TOML: {}", e)))?;

        cfg.apply_overrides(&lookup)?;
        cfg.validate()?;
        Ok(cfg)
    }

    /// Load configuration.
    ///
    /// Uses `path` when given, otherwise `dgr-bot.toml` if it exists in the
    /// working directory, otherwise the environment only.
    pub fn load(path: Option<&Path>) -> crate::Result<Self> {
        if let Some(path) = path {
            return Self::from_toml_file(path);
        }

        if Path::new(DEFAULT_CONFIG_FILE).exists() {
            return Self::from_toml_file(DEFAULT_CONFIG_FILE);
        }

        Self::from_env()
    }

    /// Load configuration from environment variables only
    pub fn from_env() -> crate::Result<Self> {
        Self::from_vars(env_var)
    }

    /// Build a configuration from an arbitrary variable source
    pub fn from_vars(lookup: impl Fn(&str) -> Option<String>) -> crate::Result<Self> {
        let mut cfg = Config::default();
        cfg.apply_overrides(&lookup)?;
        cfg.validate()?;
        Ok(cfg)
    }

    /// Override fields with any variables present in `lookup`
    fn apply_overrides(&mut self, lookup: &impl Fn(&str) -> Option<String>) -> crate::Result<()> {
        if let Some(token) = lookup(ENV_TELEGRAM_BOT_TOKEN) {
            self.telegram.token = token;
        }
        if let Some(url) = lookup(ENV_SUPABASE_URL) {
            self.supabase.url = url;
        }
        if let Some(key) = lookup(ENV_SUPABASE_ANON_KEY) {
            self.supabase.anon_key = key;
        }

        if let Some(secs) = lookup(ENV_LOOKUP_TIMEOUT_SECS) {
            self.lookup.timeout_secs = secs.trim().parse().map_err(|_| {
                Error::Config(format!(
                    "{} must be a positive integer, got '{}'",
                    ENV_LOOKUP_TIMEOUT_SECS, secs
                ))
            })?;
        }
        if let Some(limit) = lookup(ENV_CLASS_LIST_LIMIT) {
            self.lookup.class_list_limit = limit.trim().parse().map_err(|_| {
                Error::Config(format!(
                    "{} must be a non-negative integer, got '{}'",
                    ENV_CLASS_LIST_LIMIT, limit
                ))
            })?;
        }

        Ok(())
    }

    /// Check that every required value is present and well-formed
    pub fn validate(&self) -> crate::Result<()> {
        let missing: Vec<&str> = [
            (ENV_TELEGRAM_BOT_TOKEN, &self.telegram.token),
            (ENV_SUPABASE_URL, &self.supabase.url),
            (ENV_SUPABASE_ANON_KEY, &self.supabase.anon_key),
        ]
        .into_iter()
        .filter(|(_, value)| value.trim().is_empty())
        .map(|(name, _)| name)
        .collect();

        if !missing.is_empty() {
            return Err(Error::Config(format!(
                "Missing required configuration: {}",
                missing.join(", ")
            )));
        }

        let url = self.supabase.url.trim();
        if !(url.starts_with("https://") || url.starts_with("http://")) {
            return Err(Error::Config(format!(
                "{} must be an http(s) URL, got '{}'",
                ENV_SUPABASE_URL, url
            )));
        }

        if self.lookup.timeout_secs == 0 {
            return Err(Error::Config(format!(
                "{} must be greater than zero",
                ENV_LOOKUP_TIMEOUT_SECS
            )));
        }

        Ok(())
    }

    /// Upper bound for a single lookup
    pub fn lookup_timeout(&self) -> Duration {
        Duration::from_secs(self.lookup.timeout_secs)
    }
}

/// Read a process environment variable, treating blank values as unset
fn env_var(name: &str) -> Option<String> {
    std::env::var(name).ok().filter(|v| !v.trim().is_empty())
}
