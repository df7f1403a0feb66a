//! mrscope core: file registry, entry resolution, and the parser contract

pub mod cache;
pub mod diff;
pub mod graph;
pub mod model;
pub mod orchestrator;
pub mod parser;
pub mod symbols;


#[cfg(any(test, feature = "test-utils"))]
pub mod test_utils;

pub use cache::{CacheEntry, CacheStats, ResultCache};
pub use diff::{DiffEngine, EdgeChange, GraphDiff, VertexChange};
pub use graph::{InvariantViolation, Registry};
pub use model::{
    EdgeKind, EdgeMap, FileKey, FileNode, ReferenceMark, SourceFileKind, SourceType, file_uri,
    normalize_path, resolve_relative,
};
pub use orchestrator::{ParseFailure, parse_from};
pub use parser::{ParseOutput, ParseRequest, ScriptParser, SourceMap, SourceProvider, SourceText};
pub use symbols::{BindingType, DeclarationConflict, DeclarationEnv, MacroConstant, Scope};
