//! Common Table Expression alias collection

use crate::ast::{Node, NodeKind};
use std::collections::HashSet;

/// Alias of every CTE defined anywhere in the tree
///
/// Collection is tree-wide, not scope-aware: a CTE defined inside one subquery
/// contributes its alias for the whole statement. [`extract_tables`] relies on
/// this set, so a base table that happens to share its name with an unrelated
/// CTE elsewhere in the same input is excluded from the result. This is a
/// known scoping limitation.
///
/// [`extract_tables`]: crate::tables::extract_tables
pub fn collect_cte_names(ast: &Node) -> HashSet<String> {
    ast.walk()
        .filter(|node| node.kind() == NodeKind::Cte)
        .filter_map(Node::alias)
        .map(str::to_string)
        .collect()
}
