//! Base-table reference extraction

use crate::ast::{Node, NodeKind};
use std::collections::HashSet;

/// Names of every base table referenced anywhere in the tree
///
/// Walks the whole tree, including the children of `Table` nodes, and keeps
/// each table name that is not in `cte_names`. Repeated references collapse to
/// one entry.
///
/// # Examples
/// ```
/// # use sqlguard::ast::{Node, NodeKind};
/// # use sqlguard::cte::collect_cte_names;
/// # use sqlguard::tables::extract_tables;
/// let tree = Node::new(NodeKind::Select)
///     .with_children("with", vec![Node::cte("recent", Node::new(NodeKind::Select)
///         .with_children("from", vec![Node::table("events")]))])
///     .with_children("from", vec![Node::table("recent")]);
///
/// let tables = extract_tables(&tree, &collect_cte_names(&tree));
/// assert_eq!(tables.len(), 1);
/// assert!(tables.contains("events"));
/// ```
pub fn extract_tables(ast: &Node, cte_names: &HashSet<String>) -> HashSet<String> {
    ast.walk()
        .filter(|node| node.kind() == NodeKind::Table)
        .filter_map(Node::name)
        .filter(|name| !cte_names.contains(*name))
        .map(str::to_string)
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cte::collect_cte_names;
    use crate::sql_parser::{Parser, SqlParser};

    fn tables(sql: &str) -> HashSet<String> {
        SqlParser
            .parse(sql, "postgres")
            .map(|ast| extract_tables(&ast, &collect_cte_names(&ast)))
            .unwrap_or_default()
    }

    fn set(items: &[&str]) -> HashSet<String> {
        items.iter().map(|s| s.to_string()).collect()
    }

    #[test]
    fn test_join() {
        assert_eq!(
            tables("SELECT * FROM orders o JOIN customers c ON o.cid = c.id"),
            set(&["orders", "customers"])
        );
    }

    #[test]
    fn test_repeated_references_collapse() {
        let sql = "SELECT * FROM orders a JOIN orders b ON a.parent = b.id \
                   WHERE a.id IN (SELECT order_id FROM orders)";
        assert_eq!(tables(sql), set(&["orders"]));
    }

    #[test]
    fn test_union_branches() {
        assert_eq!(
            tables("SELECT * FROM a UNION SELECT * FROM b"),
            set(&["a", "b"])
        );
    }

    #[test]
    fn test_subqueries_everywhere() {
        let sql = "SELECT (SELECT MAX(total) FROM invoices), d.x \
                   FROM (SELECT x FROM derived_source) d \
                   WHERE EXISTS (SELECT 1 FROM audit_log) \
                   GROUP BY d.x HAVING COUNT(*) > (SELECT COUNT(*) FROM thresholds)";
        assert_eq!(
            tables(sql),
            set(&["invoices", "derived_source", "audit_log", "thresholds"])
        );
    }

    #[test]
    fn test_cte_alias_excluded() {
        assert_eq!(
            tables("WITH recent AS (SELECT * FROM events) SELECT * FROM recent"),
            set(&["events"])
        );
    }

    #[test]
    fn test_cte_exclusion_is_tree_wide() {
        // `x` in the outer FROM is a base table, but a CTE named `x` exists in
        // an unrelated subquery, so it is excluded.
        let sql = "SELECT * FROM x WHERE id IN (WITH x AS (SELECT id FROM a) SELECT id FROM x)";
        assert_eq!(tables(sql), set(&["a"]));
    }

    #[test]
    fn test_schema_qualified_name_uses_table_part() {
        assert_eq!(
            tables("SELECT * FROM analytics.page_views"),
            set(&["page_views"])
        );
    }

    #[test]
    fn test_truncate_target() {
        assert_eq!(tables("TRUNCATE TABLE payroll"), set(&["payroll"]));
    }

    #[test]
    fn test_copy_source_table() {
        assert_eq!(tables("COPY payroll TO STDOUT"), set(&["payroll"]));
        assert_eq!(
            tables("COPY (SELECT * FROM payroll) TO STDOUT"),
            set(&["payroll"])
        );
    }

    #[test]
    fn test_describe_and_show_columns() {
        assert_eq!(tables("DESCRIBE payroll"), set(&["payroll"]));
        assert_eq!(tables("SHOW COLUMNS FROM payroll"), set(&["payroll"]));
    }

    #[test]
    fn test_table_function_is_skipped() {
        assert_eq!(
            tables("SELECT * FROM generate_series(1, 3) g JOIN orders o ON o.id = g"),
            set(&["orders"])
        );
    }

    #[test]
    fn test_no_tables() {
        assert!(tables("SELECT 1").is_empty());
    }

    #[test]
    fn test_table_children_are_visited() {
        let tree = Node::table("outer").with_child("joins", Node::table("inner"));
        assert_eq!(
            extract_tables(&tree, &HashSet::new()),
            set(&["outer", "inner"])
        );
    }

    #[test]
    fn test_case_sensitive_exclusion() {
        let tree = Node::new(NodeKind::Select)
            .with_children("from", vec![Node::table("Recent"), Node::table("recent")]);
        assert_eq!(extract_tables(&tree, &set(&["recent"])), set(&["Recent"]));
    }
}
