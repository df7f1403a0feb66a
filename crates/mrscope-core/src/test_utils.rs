//! Test utilities for mrscope
//!
//! [`FakeParser`] stands in for the real script parser. It understands just
//! enough of the language to exercise the project graph:
//!
//! - `Const NAME` and `Dim NAME` declare `NAME` in the file's scope
//! - `#include "path"` is followed through the [`SourceProvider`]
//! - any occurrence of `#error` fails the parse
//! - any occurrence of `'nocache` marks the result excluded

use std::collections::BTreeMap;
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex};

use tempfile::TempDir;
use thiserror::Error;

use crate::model::{FileKey, resolve_relative};
use crate::parser::{ParseOutput, ParseRequest, ScriptParser, SourceProvider};
use crate::symbols::{MacroConstant, Scope};

/// Create a temporary repository from `(relative path, content)` pairs.
pub fn create_repo_with_structure(files: &[(&str, &str)]) -> TempDir {
    let temp_dir = TempDir::new().unwrap();
    let root = temp_dir.path();

    for (path, content) in files {
        let full_path = root.join(path);
        if let Some(parent) = full_path.parent() {
            fs::create_dir_all(parent).unwrap();
        }
        fs::write(&full_path, content).unwrap();
    }

    temp_dir
}

/// Scope of declared names, keyed by lower-cased name.
#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct FakeScope {
    pub names: BTreeMap<String, String>,
}

impl FakeScope {
    pub fn contains(&self, name: &str) -> bool {
        self.names.contains_key(&name.to_lowercase())
    }

    fn declare(&mut self, name: &str) -> bool {
        let key = name.to_lowercase();
        if self.names.contains_key(&key) {
            return false;
        }
        self.names.insert(key, name.to_string());
        true
    }
}

impl Scope for FakeScope {
    fn merge(&mut self, other: Self) -> Vec<String> {
        let mut refused = Vec::new();
        for (_, name) in other.names {
            if !self.declare(&name) {
                refused.push(name);
            }
        }
        refused
    }

    fn declare_constant(&mut self, constant: &MacroConstant) -> bool {
        self.declare(&constant.name)
    }
}

#[derive(Debug, Error)]
#[error("syntax error in {}", path.display())]
pub struct FakeParseError {
    pub path: PathBuf,
}

/// Minimal parser; see the module docs for what it understands.
#[derive(Debug, Default)]
pub struct FakeParser {
    roots: Mutex<Vec<PathBuf>>,
}

impl FakeParser {
    pub fn new() -> Self {
        Self::default()
    }

    /// Root paths parsed so far, in call order.
    pub fn parsed_roots(&self) -> Vec<PathBuf> {
        self.roots.lock().map(|roots| roots.clone()).unwrap_or_default()
    }

    fn parse_text(
        &self,
        path: &Path,
        content: &str,
        sources: &dyn SourceProvider,
        active: &mut Vec<FileKey>,
    ) -> Result<ParseOutput<FakeScope>, FakeParseError> {
        if content.contains("#error") {
            return Err(FakeParseError {
                path: path.to_path_buf(),
            });
        }

        active.push(FileKey::new(path));
        let mut output = ParseOutput::new(path, None);
        let mut scope = FakeScope::default();

        for line in content.lines() {
            let trimmed = line.trim();
            if trimmed.starts_with('\'') {
                continue;
            }
            let mut words = trimmed.split_whitespace();
            let Some(first) = words.next() else {
                continue;
            };
            match first.to_ascii_lowercase().as_str() {
                "const" | "dim" => {
                    if let Some(name) = words.next() {
                        scope.declare(name);
                    }
                }
                "#include" => {
                    let Some(target) = trimmed.split('"').nth(1) else {
                        continue;
                    };
                    let target_path = resolve_relative(path, target);
                    let Some(text) = sources.source(&target_path) else {
                        continue;
                    };
                    if active.contains(&FileKey::new(text.path)) {
                        continue;
                    }
                    let sub = self.parse_text(text.path, text.content, sources, active)?;
                    output.includes.push(Arc::new(sub));
                }
                _ => {}
            }
        }

        active.pop();
        output.scope = Some(scope);
        output.excluded = content.contains("'nocache");
        Ok(output)
    }
}

impl ScriptParser for FakeParser {
    type Scope = FakeScope;
    type Error = FakeParseError;

    fn parse(
        &self,
        request: ParseRequest<'_, FakeScope>,
    ) -> Result<ParseOutput<FakeScope>, FakeParseError> {
        if let Ok(mut roots) = self.roots.lock() {
            roots.push(request.path.to_path_buf());
        }
        let mut active = Vec::new();
        self.parse_text(request.path, request.content, request.sources, &mut active)
    }
}
