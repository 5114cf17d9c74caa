//! The in-memory index of pending changes.
//!
//! The change-tree maps every variable path written since the last reset to
//! the journal record that holds its latest value. It doubles as the dirty
//! set a compaction folds into the database file: only the newest record
//! per path matters, older records for the same path are dead space.
//!
//! ## Invariants
//!
//! - At most one [`ChangedVariable`] per distinct path
//! - A node carries a descriptor only for its own exact path; nodes that
//!   exist because a descendant changed carry none
//! - The tree holds pending paths only, not every variable in the store

use skdb_codec::VariablePath;
use std::collections::HashMap;

/// Location of one physical journal record.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ChangedVariable {
    /// Offset of the record in the journal buffer.
    pub position: u64,
    /// Size of the framed record in bytes.
    pub length: u32,
}

impl ChangedVariable {
    /// Creates a descriptor.
    #[must_use]
    pub const fn new(position: u64, length: u32) -> Self {
        Self { position, length }
    }

    /// Offset one past the last byte of the record.
    #[must_use]
    pub const fn end(&self) -> u64 {
        self.position + self.length as u64
    }
}

/// One node of the change-tree, representing a path prefix.
///
/// The root node is the empty path.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct VariableTree {
    children: HashMap<String, VariableTree>,
    value: Option<ChangedVariable>,
}

impl VariableTree {
    /// Creates an empty tree.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Points `path` at `change`, creating scaffolding nodes as needed.
    ///
    /// Returns the descriptor that was superseded, if any.
    pub fn insert(&mut self, path: &VariablePath, change: ChangedVariable) -> Option<ChangedVariable> {
        let mut node = self;
        for segment in path {
            node = node.children.entry(segment.clone()).or_default();
        }
        node.value.replace(change)
    }

    /// Latest record for exactly `path`.
    #[must_use]
    pub fn get(&self, path: &VariablePath) -> Option<ChangedVariable> {
        self.node(path).and_then(|node| node.value)
    }

    /// The node for `path`, if it exists.
    #[must_use]
    pub fn node(&self, path: &VariablePath) -> Option<&VariableTree> {
        let mut node = self;
        for segment in path {
            node = node.children.get(segment)?;
        }
        Some(node)
    }

    /// Descriptor stored on this node.
    #[must_use]
    pub fn value(&self) -> Option<ChangedVariable> {
        self.value
    }

    /// Direct children of this node.
    pub fn children(&self) -> impl Iterator<Item = (&str, &VariableTree)> {
        self.children.iter().map(|(name, node)| (name.as_str(), node))
    }

    /// Whether the tree holds no nodes below the root and no root value.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.value.is_none() && self.children.is_empty()
    }

    /// Number of pending paths.
    #[must_use]
    pub fn len(&self) -> usize {
        usize::from(self.value.is_some())
            + self.children.values().map(VariableTree::len).sum::<usize>()
    }

    /// Removes every node.
    pub fn clear(&mut self) {
        self.children.clear();
        self.value = None;
    }

    /// All pending `(path, record)` pairs in path order.
    #[must_use]
    pub fn entries(&self) -> Vec<(VariablePath, ChangedVariable)> {
        let mut entries = Vec::with_capacity(self.len());
        let _ = self.for_each::<std::convert::Infallible, _>(|path, change| {
            entries.push((path.clone(), change));
            Ok(true)
        });
        entries
    }

    /// Visits every pending path in path order.
    ///
    /// The callback returns `Ok(true)` to continue or `Ok(false)` to stop.
    /// Returns `Ok(false)` if the walk was stopped early.
    ///
    /// # Errors
    ///
    /// Propagates the first error returned by the callback.
    pub fn for_each<E, F>(&self, mut f: F) -> Result<bool, E>
    where
        F: FnMut(&VariablePath, ChangedVariable) -> Result<bool, E>,
    {
        let mut prefix = Vec::new();
        self.walk(&mut prefix, &mut f)
    }

    fn walk<E, F>(&self, prefix: &mut Vec<String>, f: &mut F) -> Result<bool, E>
    where
        F: FnMut(&VariablePath, ChangedVariable) -> Result<bool, E>,
    {
        if let Some(change) = self.value {
            let path = VariablePath::new(prefix.iter().cloned());
            if !f(&path, change)? {
                return Ok(false);
            }
        }

        let mut names: Vec<&String> = self.children.keys().collect();
        names.sort();
        for name in names {
            prefix.push(name.clone());
            let keep_going = self.children[name].walk(prefix, f)?;
            prefix.pop();
            if !keep_going {
                return Ok(false);
            }
        }
        Ok(true)
    }
}
