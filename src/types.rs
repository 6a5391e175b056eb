//! Type definitions for validation results

use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use std::collections::HashSet;

/// Outcome of a successful validation
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
pub struct ValidationReport {
    /// Dialect the SQL was parsed with
    pub dialect: String,

    /// Base tables referenced by the query, sorted
    pub tables: Vec<String>,
}

impl ValidationReport {
    pub fn new(dialect: impl Into<String>, tables: HashSet<String>) -> Self {
        let mut tables: Vec<String> = tables.into_iter().collect();
        tables.sort();
        Self {
            dialect: dialect.into(),
            tables,
        }
    }
}
