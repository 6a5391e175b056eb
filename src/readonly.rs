//! Read-only classification of parse trees
//!
//! A mutating or administrative statement can hide anywhere in a query: inside
//! a CTE body, a derived table, an expression subquery, or a set-operation
//! branch. The classifier therefore walks the whole tree instead of checking
//! only the top-level statement.

use crate::ast::{Node, NodeKind};
use crate::error::GuardError;
use crate::sql_parser::{Parser, SqlParser};

/// Whether a node kind represents schema/data mutation or administration
///
/// Disallowed: CREATE, ALTER, UPDATE, INSERT, DELETE, DROP, MERGE, GRANT, SET.
pub fn is_disallowed(kind: NodeKind) -> bool {
    match kind {
        NodeKind::Create
        | NodeKind::Alter
        | NodeKind::Update
        | NodeKind::Insert
        | NodeKind::Delete
        | NodeKind::Drop
        | NodeKind::Merge
        | NodeKind::Grant
        | NodeKind::Set => true,

        NodeKind::Script
        | NodeKind::Query
        | NodeKind::Select
        | NodeKind::Union
        | NodeKind::Intersect
        | NodeKind::Except
        | NodeKind::Values
        | NodeKind::Subquery
        | NodeKind::Table
        | NodeKind::Cte
        | NodeKind::Revoke
        | NodeKind::Truncate
        | NodeKind::Copy
        | NodeKind::Explain
        | NodeKind::Show
        | NodeKind::Transaction
        | NodeKind::Command => false,
    }
}

/// Reject the tree if any node, at any depth, is disallowed
///
/// Nodes are visited in pre-order, so when several disallowed nodes exist the
/// first one in that order is reported. The kind is rendered upper-case.
///
/// # Examples
/// ```
/// # use sqlguard::ast::{Node, NodeKind};
/// # use sqlguard::readonly::classify;
/// let select = Node::new(NodeKind::Select).with_children("from", vec![Node::table("users")]);
/// assert!(classify(&select).is_ok());
///
/// let nested = Node::new(NodeKind::Select)
///     .with_child("where", Node::new(NodeKind::Delete).with_child("this", Node::table("t")));
/// assert!(classify(&nested).is_err());
/// ```
pub fn classify(ast: &Node) -> Result<(), GuardError> {
    match ast.walk().find(|node| is_disallowed(node.kind())) {
        Some(node) => {
            let kind = node.kind().key().to_uppercase();
            log::warn!("Rejected query containing disallowed statement: {}", kind);
            Err(GuardError::DisallowedStatement { kind })
        }
        None => Ok(()),
    }
}

/// Parse SQL and classify every statement recursively
///
/// # Examples
/// ```
/// # use sqlguard::readonly::validate_readonly_sql;
/// # fn main() -> Result<(), Box<dyn std::error::Error>> {
/// // Allowed
/// validate_readonly_sql("SELECT * FROM users", "postgres")?;
///
/// // Rejected - top-level write
/// # let result = validate_readonly_sql("DROP TABLE users", "postgres");
/// # assert!(result.is_err());
///
/// // Rejected - nested write in CTE
/// # let result = validate_readonly_sql("WITH d AS (DELETE FROM t RETURNING *) SELECT * FROM d", "postgres");
/// # assert!(result.is_err());
/// # Ok(())
/// # }
/// ```
pub fn validate_readonly_sql(sql: &str, dialect: &str) -> Result<(), GuardError> {
    let ast = SqlParser
        .parse(sql, dialect)
        .map_err(|e| GuardError::from_parse(e, dialect))?;
    classify(&ast)
}
