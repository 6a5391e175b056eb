//! Read-only SQL guard
//!
//! Parses SQL text under a chosen dialect, rejects any query that contains a
//! mutating or administrative statement anywhere in its parse tree, and
//! reports the base tables it reads, excluding CTE aliases. An optional
//! table allow-list can then authorize the extracted set.

pub mod allowlist;
pub mod ast;
pub mod config;
pub mod cte;
pub mod error;
pub mod readonly;
pub mod sql_parser;
pub mod tables;
pub mod types;
pub mod validate;
pub mod validator;

// Re-exports
pub use allowlist::TableAllowList;
pub use ast::{Node, NodeKind, Slot};
pub use config::GuardConfig;
pub use cte::collect_cte_names;
pub use error::{GuardError, ParseError};
pub use readonly::{classify, is_disallowed, validate_readonly_sql};
pub use sql_parser::{Parser, SqlParser, get_dialect};
pub use tables::extract_tables;
pub use types::ValidationReport;
pub use validate::validate_table_identifier;
pub use validator::{DEFAULT_DIALECT, Validator, validate_and_extract};
