//! Folder scan and file decoding
//!
//! Walks a project root with the `ignore` crate, keeps the files
//! [`IndexerConfig::classify`] recognizes, and decodes their text. A file
//! that cannot be read or decoded is skipped with a warning.

use std::borrow::Cow;
use std::path::{Path, PathBuf};

use chardetng::EncodingDetector;
use encoding_rs::Encoding;
use ignore::WalkBuilder;
use mrscope_core::SourceFileKind;
use rayon::prelude::*;
use thiserror::Error;
use tracing::{debug, info, warn};

use crate::config::{ConfigError, IGNORE_FILE_NAME, IndexerConfig};

#[derive(Error, Debug)]
pub enum LoadError {
    #[error("project root '{0}' is not a directory")]
    NotADirectory(PathBuf),

    #[error(transparent)]
    Config(#[from] ConfigError),

    #[error("failed to read '{path}': {source}")]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("'{0}' is not valid UTF-8 or UTF-16 text")]
    Undecodable(PathBuf),
}

pub type Result<T> = std::result::Result<T, LoadError>;

/// A recognized file and its decoded text.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LoadedFile {
    pub path: PathBuf,
    pub kind: SourceFileKind,
    pub content: String,
}

/// Recognized files under `root`, sorted by path.
pub fn collect_files(root: &Path, config: &IndexerConfig) -> Result<Vec<(PathBuf, SourceFileKind)>> {
    if !root.is_dir() {
        return Err(LoadError::NotADirectory(root.to_path_buf()));
    }
    let excludes = config.exclude_set()?;

    let walker = WalkBuilder::new(root)
        .follow_links(false)
        .hidden(true)
        .git_ignore(config.respect_gitignore)
        .git_global(config.respect_gitignore)
        .git_exclude(config.respect_gitignore)
        .ignore(config.respect_gitignore)
        .add_custom_ignore_filename(IGNORE_FILE_NAME)
        .build();

    let mut files = Vec::new();
    for entry in walker {
        let entry = match entry {
            Ok(e) => e,
            Err(e) => {
                debug!("Error walking directory: {}", e);
                continue;
            }
        };
        if !entry.file_type().is_some_and(|ft| ft.is_file()) {
            continue;
        }

        let path = entry.path();
        let Some(kind) = config.classify(path) else {
            continue;
        };

        let rel_path = path.strip_prefix(root).unwrap_or(path).to_string_lossy();
        if excludes.is_match(rel_path.as_ref()) {
            debug!("Skipping excluded file: {}", rel_path);
            continue;
        }

        files.push((path.to_path_buf(), kind));
    }

    files.sort_by(|a, b| a.0.cmp(&b.0));
    Ok(files)
}

/// Read and decode one file.
pub fn read_file(path: &Path) -> Result<String> {
    let bytes = std::fs::read(path).map_err(|source| LoadError::Read {
        path: path.to_path_buf(),
        source,
    })?;
    decode(&bytes).ok_or_else(|| LoadError::Undecodable(path.to_path_buf()))
}

/// Decode file bytes.
///
/// A BOM picks UTF-8 or UTF-16. Without one, valid UTF-8 is taken as is and
/// anything else goes through charset detection (legacy code pages such as
/// windows-1252 or GBK). `None` if the bytes are malformed for the chosen
/// encoding.
pub fn decode(bytes: &[u8]) -> Option<String> {
    if let Some((encoding, bom_len)) = Encoding::for_bom(bytes) {
        return decode_with(encoding, &bytes[bom_len..]);
    }
    if let Ok(text) = std::str::from_utf8(bytes) {
        return Some(text.to_string());
    }

    let mut detector = EncodingDetector::new();
    detector.feed(bytes, true);
    let encoding = detector.guess(None, false);
    debug!("Detected {} for non-UTF-8 text", encoding.name());
    decode_with(encoding, bytes)
}

fn decode_with(encoding: &'static Encoding, bytes: &[u8]) -> Option<String> {
    encoding
        .decode_without_bom_handling_and_without_replacement(bytes)
        .map(Cow::into_owned)
}

/// Collect and read every recognized file under `root`.
pub fn load_files(root: &Path, config: &IndexerConfig) -> Result<Vec<LoadedFile>> {
    let files = collect_files(root, config)?;
    info!("Found {} files under {}", files.len(), root.display());

    let read = |(path, kind): &(PathBuf, SourceFileKind)| match read_file(path) {
        Ok(content) => Some(LoadedFile {
            path: path.clone(),
            kind: *kind,
            content,
        }),
        Err(e) => {
            warn!("Skipping {}: {}", path.display(), e);
            None
        }
    };

    let loaded: Vec<LoadedFile> = if config.parallel_read {
        files.par_iter().filter_map(read).collect()
    } else {
        files.iter().filter_map(read).collect()
    };
    Ok(loaded)
}
