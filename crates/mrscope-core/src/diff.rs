//! Graph diffs produced by incremental updates

use crate::model::{EdgeKind, FileKey};
use serde::{Deserialize, Serialize};

/// One edge kind added to or removed from `source -> target`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EdgeChange {
    pub source: FileKey,
    pub target: FileKey,
    pub kind: EdgeKind,
}

/// A file whose vertex status flipped.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct VertexChange {
    pub key: FileKey,
    pub is_vertex: bool,
}

/// Changes made to the graph by one update, for broadcasting to clients.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct GraphDiff {
    /// Monotonically increasing diff sequence number.
    pub sequence: u64,
    /// File whose update produced this diff.
    pub file: Option<FileKey>,
    pub added_edges: Vec<EdgeChange>,
    pub removed_edges: Vec<EdgeChange>,
    pub vertex_changes: Vec<VertexChange>,
    /// Files whose cached resolution was dropped.
    pub invalidated: Vec<FileKey>,
}

impl GraphDiff {
    pub fn new(sequence: u64) -> Self {
        GraphDiff {
            sequence,
            file: None,
            added_edges: Vec::new(),
            removed_edges: Vec::new(),
            vertex_changes: Vec::new(),
            invalidated: Vec::new(),
        }
    }

    /// True when no edge changed.
    pub fn is_empty(&self) -> bool {
        self.added_edges.is_empty() && self.removed_edges.is_empty()
    }

    /// Wire message sent to subscribers.
    pub fn to_message(&self) -> serde_json::Value {
        serde_json::json!({
            "type": "graph_diff",
            "diff": self,
        })
    }
}

/// Hands out diff sequence numbers.
#[derive(Debug, Default)]
pub struct DiffEngine {
    sequence: u64,
}

impl DiffEngine {
    pub fn new() -> Self {
        DiffEngine { sequence: 0 }
    }

    /// Start the next diff.
    pub fn next_diff(&mut self) -> GraphDiff {
        self.sequence += 1;
        GraphDiff::new(self.sequence)
    }

    pub fn sequence(&self) -> u64 {
        self.sequence
    }
}
