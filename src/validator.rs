//! Validation pipeline: parse, classify, collect CTE names, extract tables

use crate::allowlist::TableAllowList;
use crate::cte::collect_cte_names;
use crate::error::GuardError;
use crate::readonly::classify;
use crate::sql_parser::{Parser, SqlParser};
use crate::tables::extract_tables;
use crate::types::ValidationReport;
use std::collections::HashSet;

/// Dialect used when the caller does not pick one
pub const DEFAULT_DIALECT: &str = "postgres";

/// Runs the validation pipeline over a [`Parser`]
///
/// Holds no state between calls; one instance can serve concurrent callers.
#[derive(Debug, Clone, Default)]
pub struct Validator<P = SqlParser> {
    parser: P,
}

impl Validator<SqlParser> {
    pub fn new() -> Self {
        Self::default()
    }
}

impl<P: Parser> Validator<P> {
    /// Validator backed by a custom parser
    pub fn with_parser(parser: P) -> Self {
        Self { parser }
    }

    /// Validate read-only SQL and return the base tables it references
    ///
    /// Stops at the first failing stage: a parse failure is returned as
    /// [`GuardError::InvalidSyntax`] without classifying, and a disallowed
    /// statement is returned without extracting.
    pub fn validate_and_extract(
        &self,
        sql: &str,
        dialect: &str,
    ) -> Result<HashSet<String>, GuardError> {
        let ast = self
            .parser
            .parse(sql, dialect)
            .map_err(|e| GuardError::from_parse(e, dialect))?;

        classify(&ast)?;

        let cte_names = collect_cte_names(&ast);
        let tables = extract_tables(&ast, &cte_names);

        log::debug!(
            "Validated query: {} table(s), {} CTE alias(es) excluded",
            tables.len(),
            cte_names.len()
        );

        Ok(tables)
    }

    /// [`validate_and_extract`](Self::validate_and_extract), then check the
    /// tables against `allow_list`
    pub fn validate_and_authorize(
        &self,
        sql: &str,
        dialect: &str,
        allow_list: &TableAllowList,
    ) -> Result<HashSet<String>, GuardError> {
        let tables = self.validate_and_extract(sql, dialect)?;
        allow_list.check(&tables)?;
        Ok(tables)
    }

    /// Run the pipeline and package the outcome as a [`ValidationReport`]
    pub fn report(
        &self,
        sql: &str,
        dialect: &str,
        allow_list: Option<&TableAllowList>,
    ) -> Result<ValidationReport, GuardError> {
        let tables = match allow_list {
            Some(allow_list) => self.validate_and_authorize(sql, dialect, allow_list)?,
            None => self.validate_and_extract(sql, dialect)?,
        };
        Ok(ValidationReport::new(dialect, tables))
    }
}

/// Validate read-only SQL with the sqlparser-backed parser
///
/// # Examples
/// ```
/// # use sqlguard::validate_and_extract;
/// # fn main() -> Result<(), Box<dyn std::error::Error>> {
/// let tables = validate_and_extract(
///     "WITH recent AS (SELECT * FROM events) SELECT * FROM recent",
///     "postgres",
/// )?;
/// assert_eq!(tables.len(), 1);
/// assert!(tables.contains("events"));
///
/// # assert!(validate_and_extract("UPDATE accounts SET balance = 0", "postgres").is_err());
/// # Ok(())
/// # }
/// ```
pub fn validate_and_extract(sql: &str, dialect: &str) -> Result<HashSet<String>, GuardError> {
    Validator::new().validate_and_extract(sql, dialect)
}
