use serde::{Deserialize, Serialize};

use crate::ids::DataId;

/// Sort direction for one sort-buffer key.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct SortKey {
    /// Position inside the buffered row.
    pub position: usize,
    pub descending: bool,
}

/// Intermediate stores used by iterators.
///
/// The node describes the store; the rows themselves live in the runtime so
/// a program can be re-run or shipped elsewhere without dragging data along.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum CollectionNode {
    /// Plain replayable tuple store (array-scan source).
    Array { row: Vec<DataId> },
    /// Materialize-then-replay buffer ordered by `keys`.
    Sort {
        row: Vec<DataId>,
        keys: Vec<SortKey>,
    },
    /// Seen-set for duplicate elimination.
    Distinct { row: Vec<DataId> },
    /// Counter backing a limit iterator.
    LimitCounter,
}

impl CollectionNode {
    pub fn row(&self) -> &[DataId] {
        match self {
            CollectionNode::Array { row }
            | CollectionNode::Sort { row, .. }
            | CollectionNode::Distinct { row } => row,
            CollectionNode::LimitCounter => &[],
        }
    }

    pub fn kind_name(&self) -> &'static str {
        match self {
            CollectionNode::Array { .. } => "array",
            CollectionNode::Sort { .. } => "sort buffer",
            CollectionNode::Distinct { .. } => "distinct set",
            CollectionNode::LimitCounter => "limit counter",
        }
    }
}
