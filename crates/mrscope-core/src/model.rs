//! Core data structures for the project file graph

use std::collections::{BTreeMap, BTreeSet};
use std::fmt;
use std::path::{Component, Path, PathBuf};
use std::sync::Arc;

use serde::{Deserialize, Serialize};

use crate::parser::ParseOutput;

/// Canonical, case-insensitive identity of a file.
///
/// Built from the lexically normalized path (`.` and `..` folded, `\` read as a
/// separator), joined with `/` and lower-cased. Two spellings of the same file
/// always produce the same key, whether or not the file exists yet.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct FileKey(String);

impl FileKey {
    pub fn new(path: impl AsRef<Path>) -> Self {
        let normalized = normalize_path(path.as_ref());
        FileKey(to_slash(&normalized).to_lowercase())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for FileKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Fold `.` and `..` components without touching the filesystem.
pub fn normalize_path(path: &Path) -> PathBuf {
    let unified = path.to_string_lossy().replace('\\', "/");
    let mut out = PathBuf::new();
    for component in Path::new(&unified).components() {
        match component {
            Component::CurDir => {}
            Component::ParentDir => {
                if matches!(out.components().next_back(), Some(Component::Normal(_))) {
                    out.pop();
                } else if !out.has_root() {
                    out.push("..");
                }
            }
            other => out.push(other.as_os_str()),
        }
    }
    out
}

/// Resolve a path written inside `base_file` (an include or a reference mark)
/// against the directory that contains `base_file`.
pub fn resolve_relative(base_file: &Path, relative: &str) -> PathBuf {
    let relative = relative.trim().replace('\\', "/");
    let dir = base_file.parent().unwrap_or_else(|| Path::new(""));
    normalize_path(&dir.join(relative))
}

/// Editor-facing `file://` URI for a path.
pub fn file_uri(path: &Path) -> String {
    let slashed = to_slash(&normalize_path(path));
    let mut uri = String::from("file://");
    if !slashed.starts_with('/') {
        uri.push('/');
    }
    for byte in slashed.bytes() {
        match byte {
            b'A'..=b'Z' | b'a'..=b'z' | b'0'..=b'9' | b'-' | b'.' | b'_' | b'~' | b'/' | b':' => {
                uri.push(byte as char)
            }
            _ => uri.push_str(&format!("%{:02X}", byte)),
        }
    }
    uri
}

fn to_slash(path: &Path) -> String {
    path.to_string_lossy().replace('\\', "/")
}

/// Role a file plays in the project, decided by its name at scan time.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum SourceFileKind {
    /// Ordinary script/include file; the only kind that takes part in the edge graph.
    Source,
    /// Declaration-only file merged into the shared base scope.
    Declaration,
    /// Launcher script mined for command-line macro definitions.
    Launcher,
}

/// How the parser should read a file, from its first-line kind mark.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub enum SourceType {
    Metadata,
    #[default]
    Script,
}

/// Leading-comment annotation naming the file that logically hosts this one.
///
/// Written as `' "relative/path"@Name`.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ReferenceMark {
    /// Host path as written, relative to the marked file's directory.
    pub path: String,
    /// Section name after `@`.
    pub mark: String,
}

/// Why an edge exists. An edge is kept while at least one kind justifies it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum EdgeKind {
    /// `#include "…"` in the source file.
    Include,
    /// Reference mark in the target file naming the source as its host.
    ReferenceMark,
}

/// Edge kinds keyed by the file on the other end.
pub type EdgeMap = BTreeMap<FileKey, BTreeSet<EdgeKind>>;

/// One on-disk file known to the project.
///
/// Edge maps are only writable through [`crate::Registry::connect`] and
/// [`crate::Registry::disconnect`], which keep both endpoints in sync.
#[derive(Debug)]
pub struct FileNode<S> {
    pub key: FileKey,
    pub path: PathBuf,
    pub uri: String,
    /// Current text, authoritative after the last update.
    pub content: String,
    pub kind: SourceFileKind,
    /// First-line `'metadata` / `'script` mark, if any.
    pub source_type: Option<SourceType>,
    pub reference_mark: Option<ReferenceMark>,
    pub(crate) includes: EdgeMap,
    pub(crate) references: EdgeMap,
    pub(crate) parsed_result: Option<Arc<ParseOutput<S>>>,
    pub(crate) resolved_root: Option<FileKey>,
}

impl<S> FileNode<S> {
    pub fn new(path: impl Into<PathBuf>, content: impl Into<String>, kind: SourceFileKind) -> Self {
        let path = path.into();
        FileNode {
            key: FileKey::new(&path),
            uri: file_uri(&path),
            path,
            content: content.into(),
            kind,
            source_type: None,
            reference_mark: None,
            includes: BTreeMap::new(),
            references: BTreeMap::new(),
            parsed_result: None,
            resolved_root: None,
        }
    }

    /// A vertex has no incoming edges and may start a parse.
    pub fn is_vertex(&self) -> bool {
        self.references.is_empty()
    }

    /// Files this file pulls into its compilation.
    pub fn includes(&self) -> impl Iterator<Item = &FileKey> {
        self.includes.keys()
    }

    /// Files that pull this file into their compilation.
    pub fn references(&self) -> impl Iterator<Item = &FileKey> {
        self.references.keys()
    }

    pub fn include_count(&self) -> usize {
        self.includes.len()
    }

    pub fn reference_count(&self) -> usize {
        self.references.len()
    }

    pub fn includes_file(&self, key: &FileKey) -> bool {
        self.includes.contains_key(key)
    }

    pub fn referenced_by(&self, key: &FileKey) -> bool {
        self.references.contains_key(key)
    }

    /// Kinds justifying the outgoing edge to `target`.
    pub fn include_kinds(&self, target: &FileKey) -> Option<&BTreeSet<EdgeKind>> {
        self.includes.get(target)
    }

    /// Kinds justifying the incoming edge from `source`.
    pub fn reference_kinds(&self, source: &FileKey) -> Option<&BTreeSet<EdgeKind>> {
        self.references.get(source)
    }

    /// Referrer connected to this file by its reference mark, if any.
    pub fn mark_host(&self) -> Option<&FileKey> {
        self.references
            .iter()
            .find(|(_, kinds)| kinds.contains(&EdgeKind::ReferenceMark))
            .map(|(source, _)| source)
    }

    /// Last parse result attached to this file.
    pub fn parsed_result(&self) -> Option<&Arc<ParseOutput<S>>> {
        self.parsed_result.as_ref()
    }

    /// Entry point used for the parse that produced [`Self::parsed_result`].
    pub fn resolved_root(&self) -> Option<&FileKey> {
        self.resolved_root.as_ref()
    }

    /// Drop the parse result and the root it was produced under.
    pub fn invalidate_resolution(&mut self) {
        self.parsed_result = None;
        self.resolved_root = None;
    }
}
