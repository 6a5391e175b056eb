//! Table allow-list authorization
//!
//! Runs after extraction, over the extracted table set. The extractor itself
//! never consults the allow-list.

use crate::error::GuardError;
use std::collections::{BTreeSet, HashSet};

/// Set of table names a caller is permitted to read
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TableAllowList {
    tables: HashSet<String>,
}

impl TableAllowList {
    pub fn new<I, S>(tables: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            tables: tables.into_iter().map(Into::into).collect(),
        }
    }

    pub fn contains(&self, table: &str) -> bool {
        self.tables.contains(table)
    }

    pub fn len(&self) -> usize {
        self.tables.len()
    }

    pub fn is_empty(&self) -> bool {
        self.tables.is_empty()
    }

    /// Fail with every extracted table missing from the allow-list
    ///
    /// Names are compared exactly. The error lists offenders sorted.
    pub fn check(&self, tables: &HashSet<String>) -> Result<(), GuardError> {
        let disallowed: BTreeSet<&String> = tables.difference(&self.tables).collect();
        if disallowed.is_empty() {
            return Ok(());
        }

        let tables: Vec<String> = disallowed.into_iter().cloned().collect();
        log::warn!("Rejected query referencing disallowed tables: {:?}", tables);
        Err(GuardError::DisallowedTable { tables })
    }
}

impl<S: Into<String>> FromIterator<S> for TableAllowList {
    fn from_iter<I: IntoIterator<Item = S>>(iter: I) -> Self {
        Self::new(iter)
    }
}
