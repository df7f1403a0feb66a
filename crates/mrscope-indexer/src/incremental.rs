//! Incremental edge maintenance
//!
//! Applies one file's new text to the registry. Only the edges owned by
//! that file change: its reference mark edge and its include edges. No other
//! file is read or re-extracted.

use std::collections::{BTreeMap, BTreeSet};
use std::path::Path;

use mrscope_core::{
    EdgeChange, EdgeKind, FileKey, FileNode, GraphDiff, Registry, SourceFileKind, VertexChange,
};
use tracing::{debug, info};

use crate::builder::{include_targets, mark_host};
use crate::config::IndexerConfig;
use crate::extractor::{extract_includes, extract_reference_mark, extract_source_type};

/// Replace the text of a registered file and update its edges.
///
/// Returns `None` when `path` is not registered.
pub fn apply_edit<S>(registry: &mut Registry<S>, path: &Path, text: &str) -> Option<GraphDiff> {
    let key = FileKey::new(path);
    let Some(node) = registry.node_mut(&key) else {
        debug!("Edit for unknown file ignored: {}", path.display());
        return None;
    };

    node.content = text.to_string();
    node.source_type = extract_source_type(text);
    let node_path = node.path.clone();
    let kind = node.kind;

    let mut diff = registry.next_diff();
    diff.file = Some(key.clone());

    if kind != SourceFileKind::Source {
        invalidate(registry, &key, &mut diff);
        debug!("Updated {:?} file {} (no edges)", kind, key);
        return Some(diff);
    }

    let old_targets: BTreeSet<FileKey> = registry
        .node(&key)
        .map(|node| include_edges(node))
        .unwrap_or_default();
    let new_targets = include_targets(registry, &node_path, &extract_includes(text));

    let mut touched: BTreeSet<FileKey> = old_targets.union(&new_targets).cloned().collect();
    touched.insert(key.clone());
    let before = vertex_states(registry, &touched);
    let mut reach = registry.descendants(&key);

    sync_reference_mark(registry, &key, &node_path, text, &mut diff);

    for target in old_targets.difference(&new_targets) {
        if registry.disconnect(&key, target, EdgeKind::Include) {
            debug!("Disconnected {} -> {} (include)", key, target);
            diff.removed_edges.push(edge(&key, target, EdgeKind::Include));
        }
    }
    for target in new_targets.difference(&old_targets) {
        if registry.connect(&key, target, EdgeKind::Include) {
            debug!("Connected {} -> {} (include)", key, target);
            diff.added_edges.push(edge(&key, target, EdgeKind::Include));
        }
    }

    invalidate(registry, &key, &mut diff);
    if !diff.is_empty() {
        reach.extend(registry.descendants(&key));
        reach.sort();
        reach.dedup();
        for other in reach {
            invalidate(registry, &other, &mut diff);
        }
    }

    for (changed, was_vertex) in before {
        let is_vertex = registry.node(&changed).is_some_and(|n| n.is_vertex());
        if is_vertex != was_vertex {
            diff.vertex_changes.push(VertexChange {
                key: changed,
                is_vertex,
            });
        }
    }

    debug!(
        "Applied edit to {}: +{} -{} edges, {} vertex changes",
        key,
        diff.added_edges.len(),
        diff.removed_edges.len(),
        diff.vertex_changes.len()
    );
    Some(diff)
}

/// Register a file created after initialization and connect the edges its
/// own text declares. Returns `None` if the file is already registered or
/// not recognized.
pub fn insert_file<S>(
    registry: &mut Registry<S>,
    config: &IndexerConfig,
    path: &Path,
    text: &str,
) -> Option<GraphDiff> {
    let kind = config.classify(path)?;
    let key = FileKey::new(path);
    if !registry.insert(FileNode::new(path, text, kind)) {
        return None;
    }
    info!("Registered new file {}", path.display());

    if kind != SourceFileKind::Source {
        let mut diff = registry.next_diff();
        diff.file = Some(key);
        return Some(diff);
    }

    if let Some(node) = registry.node_mut(&key) {
        node.source_type = extract_source_type(text);
    }

    let mut diff = registry.next_diff();
    diff.file = Some(key.clone());
    sync_reference_mark(registry, &key, path, text, &mut diff);

    for target in include_targets(registry, path, &extract_includes(text)) {
        let was_vertex = registry.node(&target).is_some_and(|n| n.is_vertex());
        if registry.connect(&key, &target, EdgeKind::Include) {
            diff.added_edges.push(edge(&key, &target, EdgeKind::Include));
            if was_vertex {
                diff.vertex_changes.push(VertexChange {
                    key: target,
                    is_vertex: false,
                });
            }
        }
    }
    Some(diff)
}

/// Re-extract the reference mark of `key` and move its edge if the host
/// changed. The old host is read from the existing mark edge, not from the
/// previously stored mark text.
fn sync_reference_mark<S>(
    registry: &mut Registry<S>,
    key: &FileKey,
    path: &Path,
    text: &str,
    diff: &mut GraphDiff,
) {
    let new_mark = extract_reference_mark(text);

    let old_host = registry.node(key).and_then(|n| n.mark_host().cloned());
    let new_host = new_mark.as_ref().and_then(|m| mark_host(registry, path, m));

    if old_host != new_host {
        if let Some(host) = &old_host {
            if registry.disconnect(host, key, EdgeKind::ReferenceMark) {
                debug!("Disconnected {} -> {} (reference mark)", host, key);
                diff.removed_edges.push(edge(host, key, EdgeKind::ReferenceMark));
            }
        }
        if let Some(host) = &new_host {
            if registry.connect(host, key, EdgeKind::ReferenceMark) {
                debug!("Connected {} -> {} (reference mark)", host, key);
                diff.added_edges.push(edge(host, key, EdgeKind::ReferenceMark));
            }
        }
    }

    if let Some(node) = registry.node_mut(key) {
        node.reference_mark = new_mark;
    }
}

fn include_edges<S>(node: &FileNode<S>) -> BTreeSet<FileKey> {
    node.includes()
        .filter(|target| {
            node.include_kinds(target)
                .is_some_and(|kinds| kinds.contains(&EdgeKind::Include))
        })
        .cloned()
        .collect()
}

fn vertex_states<S>(registry: &Registry<S>, keys: &BTreeSet<FileKey>) -> BTreeMap<FileKey, bool> {
    keys.iter()
        .filter_map(|key| registry.node(key).map(|n| (key.clone(), n.is_vertex())))
        .collect()
}

fn invalidate<S>(registry: &mut Registry<S>, key: &FileKey, diff: &mut GraphDiff) {
    if let Some(node) = registry.node_mut(key) {
        if node.resolved_root().is_some() || node.parsed_result().is_some() {
            node.invalidate_resolution();
            diff.invalidated.push(key.clone());
        }
    }
}

fn edge(source: &FileKey, target: &FileKey, kind: EdgeKind) -> EdgeChange {
    EdgeChange {
        source: source.clone(),
        target: target.clone(),
        kind,
    }
}
