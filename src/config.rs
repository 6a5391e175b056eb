//! Guard configuration loaded from the environment

use crate::allowlist::TableAllowList;
use crate::error::GuardError;
use crate::validate::validate_table_identifier;
use crate::validator::DEFAULT_DIALECT;
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

/// Dialect used to parse incoming SQL
pub const DIALECT_ENV: &str = "SQLGUARD_DIALECT";
/// Comma-separated table allow-list; unset disables the check
pub const ALLOWED_TABLES_ENV: &str = "SQLGUARD_ALLOWED_TABLES";

/// Validation settings
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
pub struct GuardConfig {
    /// SQL dialect name (e.g. "postgres", "mysql", "sqlite")
    #[serde(default = "default_dialect")]
    pub dialect: String,

    /// Tables queries may reference (None = no allow-list)
    #[serde(default)]
    pub allowed_tables: Option<Vec<String>>,
}

fn default_dialect() -> String {
    DEFAULT_DIALECT.to_string()
}

impl Default for GuardConfig {
    fn default() -> Self {
        Self {
            dialect: default_dialect(),
            allowed_tables: None,
        }
    }
}

impl GuardConfig {
    /// Read configuration from process environment variables
    ///
    /// - `SQLGUARD_DIALECT`: dialect name, defaults to `postgres`
    /// - `SQLGUARD_ALLOWED_TABLES`: comma-separated table names
    pub fn from_env() -> Result<Self, GuardError> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Read configuration through an arbitrary key lookup
    pub fn from_lookup<F>(lookup: F) -> Result<Self, GuardError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let dialect = match lookup(DIALECT_ENV) {
            Some(value) if !value.trim().is_empty() => value.trim().to_string(),
            _ => {
                log::debug!("{} not set, defaulting to {}", DIALECT_ENV, DEFAULT_DIALECT);
                default_dialect()
            }
        };

        let allowed_tables = match lookup(ALLOWED_TABLES_ENV) {
            Some(value) => Some(parse_table_list(&value)?),
            None => None,
        };

        Ok(Self {
            dialect,
            allowed_tables,
        })
    }

    /// Allow-list built from `allowed_tables`, if configured
    pub fn allow_list(&self) -> Option<TableAllowList> {
        self.allowed_tables
            .as_ref()
            .map(|tables| tables.iter().cloned().collect())
    }
}

/// Split a comma-separated table list, validating every entry
pub fn parse_table_list(value: &str) -> Result<Vec<String>, GuardError> {
    value
        .split(',')
        .map(str::trim)
        .filter(|entry| !entry.is_empty())
        .map(|entry| -> Result<String, GuardError> {
            validate_table_identifier(entry).map_err(|e| match e {
                GuardError::InvalidConfig(message) => {
                    GuardError::InvalidConfig(format!("{}: {}", ALLOWED_TABLES_ENV, message))
                }
                other => other,
            })?;
            Ok(entry.to_string())
        })
        .collect()
}
