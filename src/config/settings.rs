//! Runtime settings read from the environment (optionally via a `.env` file).

use crate::error::ConfigError;
use std::env;
use std::str::FromStr;

pub const DEFAULT_KANBAN_COLUMNS: &[&str] = &["Todo", "In Progress", "Done"];

#[derive(Clone, Debug)]
pub struct AppConfig {
    pub database_url: String,
    /// Schema holding every table. Must be a valid PostgreSQL identifier.
    pub schema: String,
    pub bind_addr: String,
    pub max_connections: u32,
    /// Ordered board columns; tasks whose status matches none are not shown.
    pub kanban_columns: Vec<String>,
    pub default_limit: u32,
    pub max_limit: u32,
    pub body_limit_bytes: usize,
}

impl Default for AppConfig {
    fn default() -> Self {
        AppConfig {
            database_url: "postgres://localhost/shopdesk".into(),
            schema: "shopdesk".into(),
            bind_addr: "0.0.0.0:3000".into(),
            max_connections: 5,
            kanban_columns: DEFAULT_KANBAN_COLUMNS.iter().map(|s| s.to_string()).collect(),
            default_limit: 100,
            max_limit: 1000,
            body_limit_bytes: 1024 * 1024,
        }
    }
}

impl AppConfig {
    /// Load `.env` if present, then read settings from the process environment.
    pub fn load() -> Result<Self, ConfigError> {
        if let Err(e) = dotenvy::dotenv() {
            if !e.not_found() {
                tracing::warn!(error = %e, "could not read .env");
            }
        }
        Self::from_lookup(|key| env::var(key).ok())
    }

    /// Build settings from any key lookup; unset keys keep their defaults.
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let mut config = AppConfig::default();
        if let Some(v) = lookup("DATABASE_URL") {
            config.database_url = v;
        }
        if let Some(v) = lookup("SHOPDESK_SCHEMA") {
            if !is_identifier(&v) {
                return Err(ConfigError::InvalidSetting {
                    key: "SHOPDESK_SCHEMA",
                    reason: format!("'{}' is not a valid identifier", v),
                });
            }
            config.schema = v;
        }
        if let Some(v) = lookup("SHOPDESK_BIND") {
            config.bind_addr = v;
        }
        if let Some(v) = lookup("SHOPDESK_MAX_CONNECTIONS") {
            config.max_connections = parse("SHOPDESK_MAX_CONNECTIONS", &v)?;
        }
        if let Some(v) = lookup("SHOPDESK_KANBAN_COLUMNS") {
            let columns: Vec<String> = v
                .split(',')
                .map(str::trim)
                .filter(|s| !s.is_empty())
                .map(String::from)
                .collect();
            if columns.is_empty() {
                return Err(ConfigError::InvalidSetting {
                    key: "SHOPDESK_KANBAN_COLUMNS",
                    reason: "at least one column required".into(),
                });
            }
            config.kanban_columns = columns;
        }
        if let Some(v) = lookup("SHOPDESK_DEFAULT_LIMIT") {
            config.default_limit = parse("SHOPDESK_DEFAULT_LIMIT", &v)?;
        }
        if let Some(v) = lookup("SHOPDESK_MAX_LIMIT") {
            config.max_limit = parse("SHOPDESK_MAX_LIMIT", &v)?;
        }
        if let Some(v) = lookup("SHOPDESK_BODY_LIMIT") {
            config.body_limit_bytes = parse("SHOPDESK_BODY_LIMIT", &v)?;
        }
        if config.default_limit == 0 || config.default_limit > config.max_limit {
            return Err(ConfigError::InvalidSetting {
                key: "SHOPDESK_DEFAULT_LIMIT",
                reason: format!("must be between 1 and {}", config.max_limit),
            });
        }
        Ok(config)
    }
}

fn parse<T: FromStr>(key: &'static str, value: &str) -> Result<T, ConfigError>
where
    T::Err: std::fmt::Display,
{
    value.trim().parse().map_err(|e: T::Err| ConfigError::InvalidSetting {
        key,
        reason: e.to_string(),
    })
}

fn is_identifier(s: &str) -> bool {
    let mut chars = s.chars();
    matches!(chars.next(), Some(c) if c.is_ascii_alphabetic() || c == '_')
        && chars.all(|c| c.is_ascii_alphanumeric() || c == '_')
}
