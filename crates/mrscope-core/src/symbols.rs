//! Shared declaration environment
//!
//! Declaration files and launcher macros are folded into one base scope
//! before any source file is parsed. The scope type belongs to the parser;
//! this module only needs to merge scopes and declare synthetic constants.

use std::ops::Range;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

/// Symbol scope produced by the parser.
pub trait Scope: Default + Send + Sync + 'static {
    /// Merge `other` into `self`. Names already present win.
    /// Returns the names from `other` that were refused.
    fn merge(&mut self, other: Self) -> Vec<String>;

    /// Declare a constant built from a launcher macro.
    /// Returns `false` when the name already exists.
    fn declare_constant(&mut self, constant: &MacroConstant) -> bool;
}

/// Type given to a constant synthesized from a launcher macro.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum BindingType {
    Boolean,
    Long,
    String,
    Variant,
}

/// Constant defined on a launcher command line (`/d:NAME=VALUE`).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MacroConstant {
    pub name: String,
    pub binding: BindingType,
    /// Launcher file the definition was found in.
    pub source: PathBuf,
    /// Byte span of the definition in the launcher text.
    pub span: Range<usize>,
}

/// Name refused while building the base scope because an earlier file owned it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DeclarationConflict {
    pub name: String,
    pub file: PathBuf,
}

/// Base scope shared by every parse in a project, plus the record of how it
/// was assembled. Built once during initialization and read-only afterwards.
#[derive(Debug, Default)]
pub struct DeclarationEnv<S> {
    scope: S,
    files: Vec<PathBuf>,
    constants: Vec<MacroConstant>,
    conflicts: Vec<DeclarationConflict>,
}

impl<S: Scope> DeclarationEnv<S> {
    pub fn new() -> Self {
        DeclarationEnv {
            scope: S::default(),
            files: Vec::new(),
            constants: Vec::new(),
            conflicts: Vec::new(),
        }
    }

    /// Merge the scope declared by one file. Refused names are recorded.
    pub fn merge_file(&mut self, file: &Path, scope: S) {
        let refused = self.scope.merge(scope);
        for name in refused {
            warn!("Duplicate declaration '{}' in {} ignored", name, file.display());
            self.conflicts.push(DeclarationConflict {
                name,
                file: file.to_path_buf(),
            });
        }
        self.files.push(file.to_path_buf());
    }

    /// Declare a launcher constant. Returns `false` if the name was taken.
    pub fn declare_constant(&mut self, constant: MacroConstant) -> bool {
        if !self.scope.declare_constant(&constant) {
            debug!(
                "Macro constant '{}' from {} shadowed by an existing declaration",
                constant.name,
                constant.source.display()
            );
            return false;
        }
        self.constants.push(constant);
        true
    }

    /// Scope to hand to the parser, or `None` when nothing was declared.
    pub fn base_scope(&self) -> Option<&S> {
        if self.is_empty() {
            None
        } else {
            Some(&self.scope)
        }
    }

    pub fn scope(&self) -> &S {
        &self.scope
    }

    /// Declaration files merged so far, in merge order.
    pub fn files(&self) -> &[PathBuf] {
        &self.files
    }

    pub fn constants(&self) -> &[MacroConstant] {
        &self.constants
    }

    pub fn conflicts(&self) -> &[DeclarationConflict] {
        &self.conflicts
    }

    pub fn is_empty(&self) -> bool {
        self.files.is_empty() && self.constants.is_empty()
    }
}
