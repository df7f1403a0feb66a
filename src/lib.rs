//! mrscope: project model for mrScript language tooling
//!
//! Re-exports the core model, the indexer and the project session so
//! embedding servers depend on one crate.

pub use mrscope_core::{
    EdgeKind, FileKey, FileNode, GraphDiff, ParseFailure, ParseOutput, Registry, ScriptParser,
    Scope, SourceFileKind, SourceType,
};
pub use mrscope_indexer::IndexerConfig;
pub use mrscope_project::{Project, ProjectError, Resolution, WatcherService, Workspace};
