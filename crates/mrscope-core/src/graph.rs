//! File registry: every project file keyed by path, with symmetric edges

use std::collections::{HashMap, HashSet, VecDeque};
use std::path::Path;
use std::sync::Arc;

use thiserror::Error;
use tracing::debug;

use crate::diff::{DiffEngine, GraphDiff};
use crate::model::*;
use crate::parser::{ParseOutput, SourceProvider, SourceText};

/// Broken structural guarantee found by [`Registry::check_invariants`].
#[derive(Debug, Error, PartialEq, Eq)]
pub enum InvariantViolation {
    #[error("{from} links to {to}, which is not registered")]
    DanglingEdge { from: FileKey, to: FileKey },
    #[error("edge {from} -> {to} is not mirrored on both ends")]
    AsymmetricEdge { from: FileKey, to: FileKey },
    #[error("edge {from} -> {to} has no kind")]
    EmptyEdge { from: FileKey, to: FileKey },
    #[error("{0} links to itself")]
    SelfEdge(FileKey),
}

/// Arena of file nodes addressed by [`FileKey`].
///
/// All edge mutation goes through [`Registry::connect`] and
/// [`Registry::disconnect`]; both endpoints are updated together.
pub struct Registry<S> {
    nodes: HashMap<FileKey, FileNode<S>>,
    diffs: DiffEngine,
}

impl<S> std::fmt::Debug for Registry<S> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Registry")
            .field("file_count", &self.nodes.len())
            .field("edge_count", &self.edge_count())
            .finish()
    }
}

impl<S> Default for Registry<S> {
    fn default() -> Self {
        Registry {
            nodes: HashMap::new(),
            diffs: DiffEngine::new(),
        }
    }
}

impl<S> Registry<S> {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a node. The first registration of a key wins; returns `false` if
    /// the key was already present.
    pub fn insert(&mut self, node: FileNode<S>) -> bool {
        if self.nodes.contains_key(&node.key) {
            debug!("File already registered, keeping existing: {}", node.key);
            return false;
        }
        self.nodes.insert(node.key.clone(), node);
        true
    }

    pub fn node(&self, key: &FileKey) -> Option<&FileNode<S>> {
        self.nodes.get(key)
    }

    pub fn node_mut(&mut self, key: &FileKey) -> Option<&mut FileNode<S>> {
        self.nodes.get_mut(key)
    }

    /// Look up a file by any spelling of its path.
    pub fn lookup(&self, path: &Path) -> Option<&FileNode<S>> {
        self.nodes.get(&FileKey::new(path))
    }

    pub fn contains(&self, key: &FileKey) -> bool {
        self.nodes.contains_key(key)
    }

    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    pub fn nodes(&self) -> impl Iterator<Item = &FileNode<S>> {
        self.nodes.values()
    }

    /// Keys of every registered file, sorted.
    pub fn keys(&self) -> Vec<FileKey> {
        let mut keys: Vec<FileKey> = self.nodes.keys().cloned().collect();
        keys.sort();
        keys
    }

    /// Ordinary source files with no incoming edge, sorted.
    pub fn vertices(&self) -> Vec<FileKey> {
        let mut keys: Vec<FileKey> = self
            .nodes
            .values()
            .filter(|node| node.kind == SourceFileKind::Source && node.is_vertex())
            .map(|node| node.key.clone())
            .collect();
        keys.sort();
        keys
    }

    /// Number of distinct `source -> target` pairs.
    pub fn edge_count(&self) -> usize {
        self.nodes.values().map(|node| node.includes.len()).sum()
    }

    /// Record that `source` pulls `target` in, for reason `kind`.
    ///
    /// Both files must be registered and distinct. Returns `true` if this
    /// kind was not already recorded on the edge.
    pub fn connect(&mut self, source: &FileKey, target: &FileKey, kind: EdgeKind) -> bool {
        if source == target {
            debug!("Ignoring self edge on {}", source);
            return false;
        }
        if !self.nodes.contains_key(source) || !self.nodes.contains_key(target) {
            debug!("Cannot connect {} -> {}: file not registered", source, target);
            return false;
        }

        let added = match self.nodes.get_mut(source) {
            Some(node) => node.includes.entry(target.clone()).or_default().insert(kind),
            None => false,
        };
        if let Some(node) = self.nodes.get_mut(target) {
            node.references.entry(source.clone()).or_default().insert(kind);
        }
        added
    }

    /// Withdraw reason `kind` from `source -> target`. The edge disappears
    /// from both ends once no kind remains. Returns `true` if `kind` was present.
    pub fn disconnect(&mut self, source: &FileKey, target: &FileKey, kind: EdgeKind) -> bool {
        let removed = match self.nodes.get_mut(source) {
            Some(node) => remove_kind(&mut node.includes, target, kind),
            None => false,
        };
        if let Some(node) = self.nodes.get_mut(target) {
            remove_kind(&mut node.references, source, kind);
        }
        removed
    }

    /// Find the entry point whose compilation contains `key`.
    ///
    /// A vertex resolves to itself. Otherwise the incoming edges are walked
    /// breadth-first and the nearest ordinary source vertex is returned, so a
    /// file reachable from several entry points gets the shallowest one (ties
    /// broken by key order). Every file is visited at most once, so cycles
    /// terminate; a file only reachable through a cycle has no entry.
    pub fn resolve_entry(&self, key: &FileKey) -> Option<FileKey> {
        let start = self.nodes.get(key)?;
        if start.kind != SourceFileKind::Source {
            return None;
        }
        if start.is_vertex() {
            return Some(key.clone());
        }

        let mut visited: HashSet<&FileKey> = HashSet::from([key]);
        let mut queue: VecDeque<&FileNode<S>> = VecDeque::from([start]);

        while let Some(current) = queue.pop_front() {
            for referrer in current.references.keys() {
                if !visited.insert(referrer) {
                    continue;
                }
                let Some(node) = self.nodes.get(referrer) else {
                    continue;
                };
                if node.kind == SourceFileKind::Source && node.is_vertex() {
                    return Some(referrer.clone());
                }
                queue.push_back(node);
            }
        }

        debug!("No entry point reaches {}", key);
        None
    }

    /// Every file reachable from `key` through outgoing edges, excluding `key`.
    pub fn descendants(&self, key: &FileKey) -> Vec<FileKey> {
        let mut visited: HashSet<&FileKey> = HashSet::from([key]);
        let mut stack: Vec<&FileKey> = vec![key];
        let mut out = Vec::new();

        while let Some(current) = stack.pop() {
            let Some(node) = self.nodes.get(current) else {
                continue;
            };
            for target in node.includes.keys() {
                if visited.insert(target) {
                    out.push(target.clone());
                    stack.push(target);
                }
            }
        }
        out.sort();
        out
    }

    /// Attach a parse result to `key` along with the root it was parsed under.
    /// Returns `false` if `key` is not registered.
    pub fn set_resolution(
        &mut self,
        key: &FileKey,
        result: Arc<ParseOutput<S>>,
        root: FileKey,
    ) -> bool {
        match self.nodes.get_mut(key) {
            Some(node) => {
                node.parsed_result = Some(result);
                node.resolved_root = Some(root);
                true
            }
            None => false,
        }
    }

    /// Start a diff with the next sequence number.
    pub fn next_diff(&mut self) -> GraphDiff {
        self.diffs.next_diff()
    }

    /// Verify edge symmetry and well-formedness across the whole registry.
    pub fn check_invariants(&self) -> Result<(), InvariantViolation> {
        for (key, node) in &self.nodes {
            for (target, kinds) in &node.includes {
                if target == key {
                    return Err(InvariantViolation::SelfEdge(key.clone()));
                }
                if kinds.is_empty() {
                    return Err(InvariantViolation::EmptyEdge {
                        from: key.clone(),
                        to: target.clone(),
                    });
                }
                let Some(other) = self.nodes.get(target) else {
                    return Err(InvariantViolation::DanglingEdge {
                        from: key.clone(),
                        to: target.clone(),
                    });
                };
                if other.references.get(key) != Some(kinds) {
                    return Err(InvariantViolation::AsymmetricEdge {
                        from: key.clone(),
                        to: target.clone(),
                    });
                }
            }
            for (source, kinds) in &node.references {
                let mirrored = self
                    .nodes
                    .get(source)
                    .and_then(|other| other.includes.get(key));
                if mirrored != Some(kinds) {
                    return Err(InvariantViolation::AsymmetricEdge {
                        from: source.clone(),
                        to: key.clone(),
                    });
                }
            }
        }
        Ok(())
    }

    /// Drop every node.
    pub fn clear(&mut self) {
        self.nodes.clear();
    }
}

fn remove_kind(edges: &mut EdgeMap, other: &FileKey, kind: EdgeKind) -> bool {
    let Some(kinds) = edges.get_mut(other) else {
        return false;
    };
    let removed = kinds.remove(&kind);
    if kinds.is_empty() {
        edges.remove(other);
    }
    removed
}

impl<S> SourceProvider for Registry<S> {
    fn source(&self, path: &Path) -> Option<SourceText<'_>> {
        self.lookup(path).map(|node| SourceText {
            path: &node.path,
            uri: &node.uri,
            content: &node.content,
            source_type: node.source_type,
        })
    }
}
