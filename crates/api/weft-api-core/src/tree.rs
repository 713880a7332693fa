//! Data trees: ordered branches addressed by integer paths.

use serde::{Deserialize, Serialize};

use crate::Value;

#[derive(Clone, Debug, Default, Serialize, Deserialize, PartialEq)]
pub struct Branch {
    pub path: Vec<u32>,
    pub values: Vec<Value>,
}

/// Multi-branch container. Within one tree a path normally identifies a single
/// branch, but duplicates are tolerated and kept in insertion order.
#[derive(Clone, Debug, Default, Serialize, Deserialize, PartialEq)]
pub struct DataTree {
    pub branches: Vec<Branch>,
}

impl DataTree {
    pub fn new() -> Self {
        Self::default()
    }

    /// Single branch at path `{0}`.
    pub fn from_values(values: Vec<Value>) -> Self {
        Self {
            branches: vec![Branch {
                path: vec![0],
                values,
            }],
        }
    }

    pub fn push_branch(&mut self, path: Vec<u32>, values: Vec<Value>) {
        self.branches.push(Branch { path, values });
    }

    /// First branch stored under `path`.
    pub fn branch(&self, path: &[u32]) -> Option<&Branch> {
        self.branches.iter().find(|b| b.path == path)
    }

    pub fn branch_count(&self) -> usize {
        self.branches.len()
    }

    pub fn item_count(&self) -> usize {
        self.branches.iter().map(|b| b.values.len()).sum()
    }

    /// Iterate all values, branch by branch.
    pub fn values(&self) -> impl Iterator<Item = &Value> {
        self.branches.iter().flat_map(|b| b.values.iter())
    }

    /// Collapse every branch into a single `{0}` branch, preserving order.
    pub fn flatten(&self) -> DataTree {
        DataTree::from_values(self.values().cloned().collect())
    }
}
