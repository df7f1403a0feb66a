//! Indexer configuration
//!
//! Read from an optional `.mrscope.toml` at the project root. Every field
//! has a default, so a missing file or a partial file is fine.

use std::path::{Path, PathBuf};

use globset::{Glob, GlobSet, GlobSetBuilder};
use mrscope_core::SourceFileKind;
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::{debug, trace};

/// Configuration file name, looked up at the project root.
pub const CONFIG_FILE_NAME: &str = ".mrscope.toml";

/// Custom ignore file honored alongside `.gitignore`.
pub const IGNORE_FILE_NAME: &str = ".mrscopeignore";

/// Errors that can occur while loading configuration.
#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("failed to read config file '{path}': {source}")]
    ReadFile {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to parse config file '{path}': {source}")]
    ParseToml {
        path: PathBuf,
        #[source]
        source: toml::de::Error,
    },

    #[error("invalid exclude pattern '{pattern}': {source}")]
    InvalidGlob {
        pattern: String,
        #[source]
        source: globset::Error,
    },
}

pub type Result<T> = std::result::Result<T, ConfigError>;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct IndexerConfig {
    /// Ordinary source and include extensions, without the dot.
    pub source_extensions: Vec<String>,
    /// Suffix marking declaration files. Checked before `source_extensions`.
    pub declaration_suffix: String,
    /// Launcher script extensions, without the dot.
    pub launcher_extensions: Vec<String>,
    /// Glob patterns, relative to the root, of files to skip.
    pub exclude: Vec<String>,
    /// Honor `.gitignore` and `.mrscopeignore` while walking.
    pub respect_gitignore: bool,
    /// Folder of built-in declaration files loaded before the project's own.
    pub builtin_declarations: Option<PathBuf>,
    /// Read and decode files on the rayon pool.
    pub parallel_read: bool,
}

impl Default for IndexerConfig {
    fn default() -> Self {
        IndexerConfig {
            source_extensions: ["mrs", "dms", "inc", "ini"].map(String::from).to_vec(),
            declaration_suffix: ".d.mrs".to_string(),
            launcher_extensions: vec!["bat".to_string()],
            exclude: Vec::new(),
            respect_gitignore: true,
            builtin_declarations: None,
            parallel_read: true,
        }
    }
}

impl IndexerConfig {
    /// Load `<root>/.mrscope.toml`, falling back to defaults when absent.
    pub fn load(root: &Path) -> Result<Self> {
        let path = root.join(CONFIG_FILE_NAME);
        if !path.exists() {
            trace!("No config at {:?}, using defaults", path);
            return Ok(Self::default());
        }

        debug!("Loading indexer config from {:?}", path);
        let content = std::fs::read_to_string(&path).map_err(|source| ConfigError::ReadFile {
            path: path.clone(),
            source,
        })?;
        let mut config: IndexerConfig =
            toml::from_str(&content).map_err(|source| ConfigError::ParseToml {
                path: path.clone(),
                source,
            })?;

        if let Some(builtin) = config.builtin_declarations.take() {
            config.builtin_declarations = Some(if builtin.is_relative() {
                root.join(builtin)
            } else {
                builtin
            });
        }
        Ok(config)
    }

    /// Classify a file by name; `None` for files the project ignores.
    pub fn classify(&self, path: &Path) -> Option<SourceFileKind> {
        let name = path.file_name()?.to_string_lossy().to_lowercase();
        if name.ends_with(&self.declaration_suffix.to_lowercase()) {
            return Some(SourceFileKind::Declaration);
        }

        let extension = path.extension()?.to_string_lossy().to_lowercase();
        if self.source_extensions.iter().any(|e| e.eq_ignore_ascii_case(&extension)) {
            Some(SourceFileKind::Source)
        } else if self.launcher_extensions.iter().any(|e| e.eq_ignore_ascii_case(&extension)) {
            Some(SourceFileKind::Launcher)
        } else {
            None
        }
    }

    /// Compile `exclude` into a matcher.
    pub fn exclude_set(&self) -> Result<GlobSet> {
        let mut builder = GlobSetBuilder::new();
        for pattern in &self.exclude {
            let glob = Glob::new(pattern).map_err(|source| ConfigError::InvalidGlob {
                pattern: pattern.clone(),
                source,
            })?;
            builder.add(glob);
        }
        builder.build().map_err(|source| ConfigError::InvalidGlob {
            pattern: self.exclude.join(", "),
            source,
        })
    }
}
