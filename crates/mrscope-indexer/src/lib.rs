//! Project scanning, text pattern extraction and graph maintenance

pub mod builder;
pub mod config;
pub mod declarations;
pub mod extractor;
pub mod incremental;
pub mod loader;


pub use builder::{BuildError, BuiltProject, build_project};
pub use config::{ConfigError, IndexerConfig};
pub use declarations::load_declarations;
pub use extractor::{
    LauncherMacro, MacroValueType, extract_includes, extract_launcher_macros,
    extract_reference_mark, extract_source_type,
};
pub use incremental::{apply_edit, insert_file};
pub use loader::{LoadError, LoadedFile, collect_files, decode, load_files, read_file};
