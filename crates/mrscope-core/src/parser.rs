//! Contract between the project graph and the external script parser
//!
//! The parser itself lives outside this workspace. The project hands it one
//! root file at a time together with the shared base scope and a
//! [`SourceProvider`] it can pull included files from. It hands back a tree of
//! [`ParseOutput`]s mirroring the include structure it followed.

use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use crate::model::{FileKey, SourceType, file_uri};
use crate::symbols::Scope;

/// Text of one file as seen by the parser.
#[derive(Debug, Clone, Copy)]
pub struct SourceText<'a> {
    pub path: &'a Path,
    pub uri: &'a str,
    pub content: &'a str,
    pub source_type: Option<SourceType>,
}

/// Lookup of file text by path, used by the parser to follow `#include`s.
pub trait SourceProvider {
    /// Current text of `path`, or `None` when the file is unknown.
    fn source(&self, path: &Path) -> Option<SourceText<'_>>;
}

/// Everything the parser needs for one top-level parse.
pub struct ParseRequest<'a, S> {
    pub path: &'a Path,
    pub uri: &'a str,
    pub content: &'a str,
    pub source_type: SourceType,
    /// Shared declarations visible to the file. Read-only.
    pub base_scope: Option<&'a S>,
    /// True when `path` is the entry point of the compilation.
    pub is_root: bool,
    pub sources: &'a dyn SourceProvider,
}

/// Result of parsing one file, with one nested output per include followed.
#[derive(Debug)]
pub struct ParseOutput<S> {
    pub path: PathBuf,
    /// Declarations produced by this file, if the parser got that far.
    pub scope: Option<S>,
    pub includes: Vec<Arc<ParseOutput<S>>>,
    /// Set by the parser when the result must not be cached.
    pub excluded: bool,
}

impl<S> ParseOutput<S> {
    pub fn new(path: impl Into<PathBuf>, scope: Option<S>) -> Self {
        ParseOutput {
            path: path.into(),
            scope,
            includes: Vec::new(),
            excluded: false,
        }
    }

    pub fn key(&self) -> FileKey {
        FileKey::new(&self.path)
    }

    /// Find the nested output produced for `key`, searching depth-first.
    /// The output itself is not a candidate.
    pub fn find_included(&self, key: &FileKey) -> Option<Arc<ParseOutput<S>>> {
        let mut stack: Vec<&Arc<ParseOutput<S>>> = self.includes.iter().rev().collect();
        while let Some(sub) = stack.pop() {
            if &sub.key() == key {
                return Some(Arc::clone(sub));
            }
            stack.extend(sub.includes.iter().rev());
        }
        None
    }

    /// Number of nested outputs at every depth.
    pub fn descendant_count(&self) -> usize {
        self.includes
            .iter()
            .map(|sub| 1 + sub.descendant_count())
            .sum()
    }
}

/// External parser driven by the project.
pub trait ScriptParser: Send + Sync {
    type Scope: Scope;
    type Error: std::error::Error + Send + Sync + 'static;

    fn parse(
        &self,
        request: ParseRequest<'_, Self::Scope>,
    ) -> Result<ParseOutput<Self::Scope>, Self::Error>;
}

/// In-memory [`SourceProvider`] for files that are not part of a registry,
/// such as declaration files or a single detached document.
#[derive(Debug, Default)]
pub struct SourceMap {
    entries: HashMap<FileKey, SourceEntry>,
}

#[derive(Debug)]
struct SourceEntry {
    path: PathBuf,
    uri: String,
    content: String,
}

impl SourceMap {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add or replace the text for `path`.
    pub fn insert(&mut self, path: impl Into<PathBuf>, content: impl Into<String>) {
        let path = path.into();
        self.entries.insert(
            FileKey::new(&path),
            SourceEntry {
                uri: file_uri(&path),
                path,
                content: content.into(),
            },
        );
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

impl SourceProvider for SourceMap {
    fn source(&self, path: &Path) -> Option<SourceText<'_>> {
        self.entries.get(&FileKey::new(path)).map(|entry| SourceText {
            path: &entry.path,
            uri: &entry.uri,
            content: &entry.content,
            source_type: None,
        })
    }
}
