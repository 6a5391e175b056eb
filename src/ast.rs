//! Generic parse tree consumed by the classifier and extractors
//!
//! A [`Node`] is a tagged tree node: a closed [`NodeKind`] plus an ordered list
//! of named slots. Each slot holds a single child, a sequence of children, or a
//! plain string value. Slots with no content are simply absent.
//!
//! Trees are built once by a [`Parser`](crate::sql_parser::Parser) and only
//! read afterwards.

use std::fmt;

/// Slot name for the primary value of a node (table name, etc.)
pub const THIS: &str = "this";
/// Slot name for an alias value
pub const ALIAS: &str = "alias";
/// Slot name for schema qualification of a table
pub const DB: &str = "db";
/// Slot name for catalog qualification of a table
pub const CATALOG: &str = "catalog";
/// Slot name for the structural children appended during lowering
pub const EXPRESSIONS: &str = "expressions";

/// Statement and expression kinds a parse tree can contain
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum NodeKind {
    /// Root holding every statement of the input, in source order
    Script,
    /// Query whose body is itself a statement (e.g. a DML CTE body)
    Query,
    Select,
    Union,
    Intersect,
    Except,
    Values,
    /// Derived table in a FROM clause
    Subquery,
    Table,
    Cte,
    Create,
    Alter,
    Update,
    Insert,
    Delete,
    Drop,
    Merge,
    Grant,
    Set,
    Revoke,
    Truncate,
    Copy,
    Explain,
    Show,
    Transaction,
    /// Any other statement the parser understands
    Command,
}

impl NodeKind {
    /// Lower-case textual tag
    pub fn key(self) -> &'static str {
        match self {
            NodeKind::Script => "script",
            NodeKind::Query => "query",
            NodeKind::Select => "select",
            NodeKind::Union => "union",
            NodeKind::Intersect => "intersect",
            NodeKind::Except => "except",
            NodeKind::Values => "values",
            NodeKind::Subquery => "subquery",
            NodeKind::Table => "table",
            NodeKind::Cte => "cte",
            NodeKind::Create => "create",
            NodeKind::Alter => "alter",
            NodeKind::Update => "update",
            NodeKind::Insert => "insert",
            NodeKind::Delete => "delete",
            NodeKind::Drop => "drop",
            NodeKind::Merge => "merge",
            NodeKind::Grant => "grant",
            NodeKind::Set => "set",
            NodeKind::Revoke => "revoke",
            NodeKind::Truncate => "truncate",
            NodeKind::Copy => "copy",
            NodeKind::Explain => "explain",
            NodeKind::Show => "show",
            NodeKind::Transaction => "transaction",
            NodeKind::Command => "command",
        }
    }
}

impl fmt::Display for NodeKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.key())
    }
}

/// Content of a named slot
#[derive(Debug, Clone, PartialEq)]
pub enum Slot {
    Node(Box<Node>),
    Nodes(Vec<Node>),
    Value(String),
}

impl Slot {
    /// Child nodes held by this slot, empty for values
    pub fn nodes(&self) -> &[Node] {
        match self {
            Slot::Node(node) => std::slice::from_ref(node.as_ref()),
            Slot::Nodes(nodes) => nodes.as_slice(),
            Slot::Value(_) => &[],
        }
    }
}

/// Tagged tree node
#[derive(Debug, Clone, PartialEq)]
pub struct Node {
    kind: NodeKind,
    slots: Vec<(&'static str, Slot)>,
}

impl Node {
    pub fn new(kind: NodeKind) -> Self {
        Self {
            kind,
            slots: Vec::new(),
        }
    }

    /// Table reference named `name`
    pub fn table(name: impl Into<String>) -> Self {
        Self::new(NodeKind::Table).with_value(THIS, name)
    }

    /// CTE definition `alias AS (body)`
    pub fn cte(alias: impl Into<String>, body: Node) -> Self {
        Self::new(NodeKind::Cte)
            .with_value(ALIAS, alias)
            .with_child(THIS, body)
    }

    pub fn kind(&self) -> NodeKind {
        self.kind
    }

    /// Set a value slot
    pub fn with_value(mut self, slot: &'static str, value: impl Into<String>) -> Self {
        self.slots.push((slot, Slot::Value(value.into())));
        self
    }

    /// Set a single-child slot
    pub fn with_child(mut self, slot: &'static str, child: Node) -> Self {
        self.slots.push((slot, Slot::Node(Box::new(child))));
        self
    }

    /// Set a sequence slot; an empty sequence leaves the slot absent
    pub fn with_children(mut self, slot: &'static str, children: Vec<Node>) -> Self {
        if !children.is_empty() {
            self.slots.push((slot, Slot::Nodes(children)));
        }
        self
    }

    /// Append a child to the `expressions` sequence slot, creating it on first use
    pub fn push_child(&mut self, child: Node) {
        let existing = self
            .slots
            .iter()
            .position(|(name, slot)| *name == EXPRESSIONS && matches!(slot, Slot::Nodes(_)));

        match existing {
            Some(index) => {
                if let Slot::Nodes(nodes) = &mut self.slots[index].1 {
                    nodes.push(child);
                }
            }
            None => self.slots.push((EXPRESSIONS, Slot::Nodes(vec![child]))),
        }
    }

    /// Slot content by name
    pub fn slot(&self, name: &str) -> Option<&Slot> {
        self.slots
            .iter()
            .find(|(slot_name, _)| *slot_name == name)
            .map(|(_, slot)| slot)
    }

    /// String value of a value slot
    pub fn value(&self, name: &str) -> Option<&str> {
        match self.slot(name) {
            Some(Slot::Value(value)) => Some(value.as_str()),
            _ => None,
        }
    }

    /// Primary name (table name for `Table` nodes)
    pub fn name(&self) -> Option<&str> {
        self.value(THIS)
    }

    pub fn alias(&self) -> Option<&str> {
        self.value(ALIAS)
    }

    /// Direct children, in slot order then sequence order
    pub fn children(&self) -> impl Iterator<Item = &Node> {
        self.slots.iter().flat_map(|(_, slot)| slot.nodes())
    }

    /// Pre-order traversal of this node and every descendant
    ///
    /// Parents come before their children; children come in slot order, and
    /// sequence slots in sequence order. The walk uses an explicit stack, so
    /// deep trees do not grow the call stack.
    pub fn walk(&self) -> Walk<'_> {
        Walk { stack: vec![self] }
    }
}

/// Iterator returned by [`Node::walk`]
pub struct Walk<'a> {
    stack: Vec<&'a Node>,
}

impl<'a> Iterator for Walk<'a> {
    type Item = &'a Node;

    fn next(&mut self) -> Option<Self::Item> {
        let node = self.stack.pop()?;
        let start = self.stack.len();
        self.stack.extend(node.children());
        self.stack[start..].reverse();
        Some(node)
    }
}
