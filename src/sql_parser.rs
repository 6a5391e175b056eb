//! SQL parsing into the generic [`Node`] tree
//!
//! Uses the sqlparser crate for tokenizing and parsing, then lowers its typed
//! AST into [`Node`]s with sqlparser's `Visitor`, so every position the parser
//! models (CTE bodies, derived tables, expression subqueries, set-operation
//! branches, statements nested in EXPLAIN) is reached without hand-written
//! recursion.

use crate::ast::{ALIAS, CATALOG, DB, Node, NodeKind};
use crate::error::ParseError;
use lazy_regex::{Lazy, Regex, lazy_regex};
use sqlparser::ast::{
    CopySource, ObjectName, ObjectNamePart, Query, SetExpr, SetOperator, Statement, TableFactor,
    Visit, Visitor,
};
use sqlparser::dialect::{Dialect, dialect_from_str};
use std::ops::ControlFlow;

static LEADING_KEYWORD: Lazy<Regex> = lazy_regex!(r"^\s*([A-Za-z_]+)");

/// Turns SQL text into a parse tree
///
/// Any implementation honouring this contract can back the
/// [`Validator`](crate::validator::Validator), for any SQL dialect.
pub trait Parser {
    /// Parse `sql` under `dialect`, returning a tree rooted at a
    /// [`NodeKind::Script`] node holding every statement.
    fn parse(&self, sql: &str, dialect: &str) -> Result<Node, ParseError>;
}

/// [`Parser`] backed by the sqlparser crate
#[derive(Debug, Clone, Copy, Default)]
pub struct SqlParser;

impl SqlParser {
    pub fn new() -> Self {
        Self
    }
}

/// Resolve a dialect name ("postgres", "mysql", "sqlite", "mssql", ...)
pub fn get_dialect(name: &str) -> Result<Box<dyn Dialect>, ParseError> {
    dialect_from_str(name.trim().to_ascii_lowercase())
        .ok_or_else(|| ParseError::UnknownDialect(name.to_string()))
}

impl Parser for SqlParser {
    fn parse(&self, sql: &str, dialect: &str) -> Result<Node, ParseError> {
        let resolved = get_dialect(dialect)?;

        let statements = sqlparser::parser::Parser::parse_sql(&*resolved, sql)
            .map_err(|e| ParseError::Syntax(e.to_string()))?;

        if statements.is_empty() {
            return Err(ParseError::Syntax(format!(
                "No expression was parsed from '{}'",
                sql
            )));
        }

        log::debug!(
            "Parsed {} statement(s) with {} dialect",
            statements.len(),
            dialect
        );

        Ok(lower_statements(&statements))
    }
}

/// Lower parsed sqlparser statements into a [`NodeKind::Script`] tree
pub fn lower_statements(statements: &[Statement]) -> Node {
    let mut lowering = Lowering::new();
    for statement in statements {
        // Break is uninhabited, the walk always runs to completion
        let _ = statement.visit(&mut lowering);
    }
    lowering.finish()
}

/// Builds the tree from visitor events
///
/// Every `pre_visit_*` hook pushes zero or more open nodes and records how many
/// on `marks`; the matching `post_visit_*` closes that many, attaching each to
/// its parent. Hooks are strictly nested, so one mark stack serves all of them.
///
/// `cte_frames` holds one entry per open query: the aliases of its CTEs not yet
/// entered, next alias last. A query's `WITH` is visited before anything else
/// in it, so the first queries entered directly beneath it are the CTE bodies,
/// in order.
///
/// `owned_relations` holds one flag per open statement or table factor. While
/// the innermost flag is set, relation names are skipped: a table factor
/// builds its own node, and `SHOW TABLES FROM s` names a schema.
struct Lowering {
    open: Vec<Node>,
    marks: Vec<usize>,
    cte_frames: Vec<Vec<String>>,
    owned_relations: Vec<bool>,
}

impl Lowering {
    fn new() -> Self {
        Self {
            open: vec![Node::new(NodeKind::Script)],
            marks: Vec::new(),
            cte_frames: Vec::new(),
            owned_relations: Vec::new(),
        }
    }

    fn open(&mut self, nodes: Vec<Node>) {
        self.marks.push(nodes.len());
        self.open.extend(nodes);
    }

    fn close(&mut self) {
        let count = self.marks.pop().unwrap_or(0);
        for _ in 0..count {
            self.close_one();
        }
    }

    fn close_one(&mut self) {
        if self.open.len() < 2 {
            return;
        }
        if let Some(node) = self.open.pop()
            && let Some(parent) = self.open.last_mut()
        {
            parent.push_child(node);
        }
    }

    fn relations_owned(&self) -> bool {
        self.owned_relations.last().copied().unwrap_or(false)
    }

    fn finish(mut self) -> Node {
        while self.open.len() > 1 {
            self.close_one();
        }
        self.open
            .pop()
            .unwrap_or_else(|| Node::new(NodeKind::Script))
    }
}

impl Visitor for Lowering {
    type Break = std::convert::Infallible;

    fn pre_visit_statement(&mut self, statement: &Statement) -> ControlFlow<Self::Break> {
        let kind = statement_kind(statement);
        let mut nodes = Vec::with_capacity(2);
        if let Some(kind) = kind {
            nodes.push(Node::new(kind));
        }

        // COPY's source table is not visited as a relation
        if let Statement::Copy {
            source: CopySource::Table { table_name, .. },
            ..
        } = statement
        {
            nodes.push(table_node(table_name));
        }

        let schema_listing =
            kind == Some(NodeKind::Show) && !matches!(statement, Statement::ShowColumns { .. });
        self.owned_relations.push(schema_listing);
        self.open(nodes);
        ControlFlow::Continue(())
    }

    fn post_visit_statement(&mut self, _statement: &Statement) -> ControlFlow<Self::Break> {
        self.owned_relations.pop();
        self.close();
        ControlFlow::Continue(())
    }

    fn pre_visit_query(&mut self, query: &Query) -> ControlFlow<Self::Break> {
        let cte_alias = self.cte_frames.last_mut().and_then(Vec::pop);

        let pending: Vec<String> = query
            .with
            .iter()
            .flat_map(|with| with.cte_tables.iter().rev())
            .map(|cte| cte.alias.name.value.clone())
            .collect();
        self.cte_frames.push(pending);

        let mut nodes = Vec::with_capacity(3);
        if let Some(alias) = cte_alias {
            nodes.push(Node::new(NodeKind::Cte).with_value(ALIAS, alias));
        }
        nodes.push(Node::new(query_kind(query)));

        // `TABLE t` bodies never reach the table-factor hook
        if let SetExpr::Table(table) = query.body.as_ref()
            && let Some(name) = &table.table_name
        {
            let mut node = Node::table(name.clone());
            if let Some(schema) = &table.schema_name {
                node = node.with_value(DB, schema.clone());
            }
            nodes.push(node);
        }

        self.open(nodes);
        ControlFlow::Continue(())
    }

    fn post_visit_query(&mut self, _query: &Query) -> ControlFlow<Self::Break> {
        self.cte_frames.pop();
        self.close();
        ControlFlow::Continue(())
    }

    fn pre_visit_table_factor(&mut self, table_factor: &TableFactor) -> ControlFlow<Self::Break> {
        let nodes = match table_factor {
            // Table-valued function calls (`generate_series(1, 10)`) are not base tables
            TableFactor::Table {
                name, alias, args, ..
            } if args.is_none() => {
                let mut node = table_node(name);
                if let Some(alias) = alias {
                    node = node.with_value(ALIAS, alias.name.value.clone());
                }
                vec![node]
            }
            TableFactor::Derived { alias, .. } => {
                let mut node = Node::new(NodeKind::Subquery);
                if let Some(alias) = alias {
                    node = node.with_value(ALIAS, alias.name.value.clone());
                }
                vec![node]
            }
            _ => Vec::new(),
        };
        self.owned_relations
            .push(matches!(table_factor, TableFactor::Table { .. }));
        self.open(nodes);
        ControlFlow::Continue(())
    }

    fn post_visit_table_factor(&mut self, _table_factor: &TableFactor) -> ControlFlow<Self::Break> {
        self.owned_relations.pop();
        self.close();
        ControlFlow::Continue(())
    }

    /// Relations named outside a FROM clause: `TRUNCATE t`, `DESCRIBE t`,
    /// `SHOW COLUMNS FROM t`, DML targets
    fn pre_visit_relation(&mut self, relation: &ObjectName) -> ControlFlow<Self::Break> {
        let nodes = if self.relations_owned() {
            Vec::new()
        } else {
            vec![table_node(relation)]
        };
        self.open(nodes);
        ControlFlow::Continue(())
    }

    fn post_visit_relation(&mut self, _relation: &ObjectName) -> ControlFlow<Self::Break> {
        self.close();
        ControlFlow::Continue(())
    }
}

/// Build a `Table` node from a possibly qualified name
///
/// The last identifier is the table name; preceding parts become the schema
/// (`db`) and catalog qualifiers.
fn table_node(name: &ObjectName) -> Node {
    let mut parts: Vec<String> = name.0.iter().map(name_part).collect();

    let table = parts.pop().unwrap_or_default();
    let mut node = Node::table(table);
    if let Some(db) = parts.pop() {
        node = node.with_value(DB, db);
    }
    if let Some(catalog) = parts.pop() {
        node = node.with_value(CATALOG, catalog);
    }
    node
}

#[allow(unreachable_patterns)]
fn name_part(part: &ObjectNamePart) -> String {
    match part {
        ObjectNamePart::Identifier(ident) => ident.value.clone(),
        other => other.to_string(),
    }
}

/// Kind of a query node, taken from its body
fn query_kind(query: &Query) -> NodeKind {
    match query.body.as_ref() {
        SetExpr::Select(_) | SetExpr::Table(_) => NodeKind::Select,
        SetExpr::Query(inner) => query_kind(inner),
        SetExpr::SetOperation { op, .. } => match op {
            SetOperator::Union => NodeKind::Union,
            SetOperator::Intersect => NodeKind::Intersect,
            _ => NodeKind::Except,
        },
        SetExpr::Values(_) => NodeKind::Values,
        // DML bodies produce their own statement node underneath
        _ => NodeKind::Query,
    }
}

/// Kind of a statement node
///
/// Returns `None` for `Statement::Query`, whose query node stands in for it.
pub(crate) fn statement_kind(statement: &Statement) -> Option<NodeKind> {
    let kind = match statement {
        Statement::Query(_) => return None,

        Statement::Insert { .. } => NodeKind::Insert,
        Statement::Update { .. } => NodeKind::Update,
        Statement::Delete { .. } => NodeKind::Delete,
        Statement::Merge { .. } => NodeKind::Merge,

        Statement::CreateTable { .. }
        | Statement::CreateView { .. }
        | Statement::CreateIndex { .. }
        | Statement::CreateSchema { .. }
        | Statement::CreateDatabase { .. }
        | Statement::CreateFunction { .. }
        | Statement::CreateProcedure { .. }
        | Statement::CreateRole { .. }
        | Statement::CreateTrigger { .. }
        | Statement::CreateType { .. }
        | Statement::CreateSequence { .. }
        | Statement::CreatePolicy { .. } => NodeKind::Create,

        Statement::AlterTable { .. }
        | Statement::AlterView { .. }
        | Statement::AlterIndex { .. }
        | Statement::AlterRole { .. }
        | Statement::AlterPolicy { .. } => NodeKind::Alter,

        Statement::Drop { .. }
        | Statement::DropFunction { .. }
        | Statement::DropProcedure { .. }
        | Statement::DropTrigger { .. }
        | Statement::DropPolicy { .. } => NodeKind::Drop,

        Statement::Grant { .. } => NodeKind::Grant,
        Statement::Revoke { .. } => NodeKind::Revoke,
        Statement::Set { .. } => NodeKind::Set,
        Statement::Truncate { .. } => NodeKind::Truncate,
        Statement::Copy { .. } | Statement::CopyIntoSnowflake { .. } => NodeKind::Copy,
        Statement::Explain { .. } => NodeKind::Explain,

        Statement::ShowTables { .. }
        | Statement::ShowColumns { .. }
        | Statement::ShowCreate { .. }
        | Statement::ShowCollation { .. }
        | Statement::ShowVariables { .. }
        | Statement::ShowStatus { .. }
        | Statement::ShowFunctions { .. } => NodeKind::Show,

        Statement::StartTransaction { .. }
        | Statement::Commit { .. }
        | Statement::Rollback { .. } => NodeKind::Transaction,

        other => keyword_kind(&other.to_string()),
    };
    Some(kind)
}

/// Kind from the leading keyword of rendered statement text
///
/// Covers statement variants not named in [`statement_kind`], such as
/// `CREATE EXTENSION` or `ALTER SCHEMA`.
pub(crate) fn keyword_kind(sql: &str) -> NodeKind {
    let keyword = match LEADING_KEYWORD.captures(sql) {
        Some(captures) => captures[1].to_ascii_uppercase(),
        None => return NodeKind::Command,
    };

    match keyword.as_str() {
        "CREATE" => NodeKind::Create,
        "ALTER" | "RENAME" => NodeKind::Alter,
        "DROP" => NodeKind::Drop,
        "INSERT" | "REPLACE" | "UPSERT" => NodeKind::Insert,
        "UPDATE" => NodeKind::Update,
        "DELETE" => NodeKind::Delete,
        "MERGE" => NodeKind::Merge,
        "GRANT" => NodeKind::Grant,
        "SET" => NodeKind::Set,
        "REVOKE" => NodeKind::Revoke,
        "TRUNCATE" => NodeKind::Truncate,
        "COPY" | "UNLOAD" => NodeKind::Copy,
        "EXPLAIN" | "DESCRIBE" | "DESC" => NodeKind::Explain,
        "SHOW" => NodeKind::Show,
        "BEGIN" | "START" | "COMMIT" | "ROLLBACK" | "SAVEPOINT" | "RELEASE" => {
            NodeKind::Transaction
        }
        _ => NodeKind::Command,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn parse(sql: &str) -> Node {
        let result = SqlParser.parse(sql, "postgres");
        assert!(result.is_ok(), "parse failed: {:?}", result.err());
        result.unwrap_or_else(|_| Node::new(NodeKind::Script))
    }

    fn kinds(node: &Node) -> Vec<NodeKind> {
        node.walk().map(Node::kind).collect()
    }

    #[test]
    fn test_root_is_script() {
        let tree = parse("SELECT 1");
        assert_eq!(tree.kind(), NodeKind::Script);
        assert_eq!(kinds(&tree), vec![NodeKind::Script, NodeKind::Select]);
    }

    #[test]
    fn test_statements_kept_in_source_order() {
        let tree = parse("SELECT 1; DROP TABLE users");
        assert_eq!(
            kinds(&tree),
            vec![NodeKind::Script, NodeKind::Select, NodeKind::Drop]
        );
    }

    #[test]
    fn test_join_tables_become_table_nodes() {
        let tree = parse("SELECT * FROM orders o JOIN customers c ON o.cid = c.id");
        let tables: Vec<_> = tree
            .walk()
            .filter(|n| n.kind() == NodeKind::Table)
            .map(|n| (n.name(), n.alias()))
            .collect();
        assert_eq!(
            tables,
            vec![
                (Some("orders"), Some("o")),
                (Some("customers"), Some("c")),
            ]
        );
    }

    #[test]
    fn test_qualified_table_name_splits_parts() {
        let tree = parse("SELECT * FROM warehouse.analytics.events");
        let table = tree.walk().find(|n| n.kind() == NodeKind::Table);
        assert!(table.is_some());
        if let Some(table) = table {
            assert_eq!(table.name(), Some("events"));
            assert_eq!(table.value(DB), Some("analytics"));
            assert_eq!(table.value(CATALOG), Some("warehouse"));
        }
    }

    #[test]
    fn test_quoted_identifier_is_unquoted() {
        let tree = parse("SELECT * FROM \"Order Items\"");
        let names: Vec<_> = tree.walk().filter_map(Node::name).collect();
        assert_eq!(names, vec!["Order Items"]);
    }

    #[test]
    fn test_cte_wraps_its_body() {
        let tree = parse("WITH recent AS (SELECT * FROM events) SELECT * FROM recent");
        assert_eq!(
            kinds(&tree),
            vec![
                NodeKind::Script,
                NodeKind::Select,
                NodeKind::Cte,
                NodeKind::Select,
                NodeKind::Table,
                NodeKind::Table,
            ]
        );
        let cte = tree.walk().find(|n| n.kind() == NodeKind::Cte);
        assert_eq!(cte.and_then(Node::alias), Some("recent"));
    }

    #[test]
    fn test_union_branches_are_children() {
        let tree = parse("SELECT * FROM a UNION SELECT * FROM b");
        assert_eq!(
            kinds(&tree),
            vec![
                NodeKind::Script,
                NodeKind::Union,
                NodeKind::Table,
                NodeKind::Table,
            ]
        );
    }

    #[test]
    fn test_derived_table_is_subquery() {
        let tree = parse("SELECT * FROM (SELECT id FROM users) AS u");
        assert_eq!(
            kinds(&tree),
            vec![
                NodeKind::Script,
                NodeKind::Select,
                NodeKind::Subquery,
                NodeKind::Select,
                NodeKind::Table,
            ]
        );
        let subquery = tree.walk().find(|n| n.kind() == NodeKind::Subquery);
        assert_eq!(subquery.and_then(Node::alias), Some("u"));
    }

    #[test]
    fn test_expression_subquery_is_reached() {
        let tree = parse("SELECT * FROM users WHERE id IN (SELECT user_id FROM orders)");
        let names: Vec<_> = tree.walk().filter_map(Node::name).collect();
        assert_eq!(names, vec!["users", "orders"]);
    }

    #[test]
    fn test_table_function_is_not_a_table() {
        let tree = parse("SELECT * FROM generate_series(1, 10)");
        assert!(tree.walk().all(|n| n.kind() != NodeKind::Table));
    }

    #[test]
    fn test_relation_outside_from_becomes_table() {
        let tree = parse("TRUNCATE TABLE audit.payroll");
        assert_eq!(
            kinds(&tree),
            vec![NodeKind::Script, NodeKind::Truncate, NodeKind::Table]
        );
        let table = tree.walk().find(|n| n.kind() == NodeKind::Table);
        assert_eq!(table.and_then(|t| t.value(DB)), Some("audit"));
    }

    #[test]
    fn test_copy_source_becomes_table() {
        let tree = parse("COPY payroll TO STDOUT");
        assert_eq!(
            kinds(&tree),
            vec![NodeKind::Script, NodeKind::Copy, NodeKind::Table]
        );
    }

    #[test]
    fn test_from_table_is_not_duplicated() {
        let tree = parse("SELECT * FROM orders");
        let count = tree.walk().filter(|n| n.kind() == NodeKind::Table).count();
        assert_eq!(count, 1);
    }

    #[test]
    fn test_show_tables_schema_is_not_a_table() {
        let tree = parse("SHOW TABLES FROM analytics");
        assert!(tree.walk().all(|n| n.kind() != NodeKind::Table));
    }

    #[test]
    fn test_sibling_ctes_and_later_subqueries() {
        let tree = parse(
            "WITH a AS (SELECT * FROM t1), b AS (SELECT * FROM t2) \
             SELECT * FROM a WHERE id IN (SELECT id FROM t3)",
        );
        let aliases: Vec<_> = tree
            .walk()
            .filter(|n| n.kind() == NodeKind::Cte)
            .filter_map(Node::alias)
            .collect();
        assert_eq!(aliases, vec!["a", "b"]);

        let in_ctes: Vec<_> = tree
            .walk()
            .filter(|n| n.kind() == NodeKind::Cte)
            .flat_map(|cte| cte.walk().filter_map(Node::name).collect::<Vec<_>>())
            .collect();
        assert_eq!(in_ctes, vec!["t1", "t2"]);
    }

    #[test]
    fn test_explain_wraps_inner_statement() {
        let tree = parse("EXPLAIN DELETE FROM users WHERE id = 1");
        let found: Vec<_> = kinds(&tree);
        assert_eq!(found[1], NodeKind::Explain);
        assert!(found.contains(&NodeKind::Delete));
    }

    #[test]
    fn test_statement_kinds() {
        let cases = [
            ("INSERT INTO t VALUES (1)", NodeKind::Insert),
            ("UPDATE accounts SET balance = 0", NodeKind::Update),
            ("DELETE FROM t", NodeKind::Delete),
            ("CREATE TABLE t (id INT)", NodeKind::Create),
            ("CREATE VIEW v AS SELECT 1", NodeKind::Create),
            ("ALTER TABLE t ADD COLUMN c INT", NodeKind::Alter),
            ("DROP TABLE t", NodeKind::Drop),
            ("GRANT SELECT ON t TO public", NodeKind::Grant),
            ("SET search_path = analytics", NodeKind::Set),
            ("TRUNCATE TABLE t", NodeKind::Truncate),
        ];
        for (sql, expected) in cases {
            let tree = parse(sql);
            assert_eq!(kinds(&tree).get(1), Some(&expected), "for {}", sql);
        }
    }

    #[test]
    fn test_keyword_fallback() {
        assert_eq!(keyword_kind("CREATE EXTENSION pgcrypto"), NodeKind::Create);
        assert_eq!(keyword_kind("  alter schema s rename to t"), NodeKind::Alter);
        assert_eq!(keyword_kind("VACUUM"), NodeKind::Command);
        assert_eq!(keyword_kind(""), NodeKind::Command);
    }

    #[test]
    fn test_syntax_error_is_reported() {
        let result = SqlParser.parse("SELECT * FROM (", "postgres");
        assert!(matches!(result, Err(ParseError::Syntax(_))));
    }

    #[test]
    fn test_empty_input_is_syntax_error() {
        let result = SqlParser.parse("  ", "postgres");
        assert!(matches!(result, Err(ParseError::Syntax(_))));
    }

    #[test]
    fn test_unknown_dialect() {
        let result = SqlParser.parse("SELECT 1", "cobol");
        assert_eq!(result, Err(ParseError::UnknownDialect("cobol".into())));
    }

    #[test]
    fn test_dialect_names_resolve() {
        for name in ["postgres", "postgresql", "mysql", "sqlite", "mssql", "generic", "Snowflake"] {
            assert!(get_dialect(name).is_ok(), "dialect {} should resolve", name);
        }
    }
}
