//! Project graph builder
//!
//! Loads a folder, builds the declaration environment, registers one node
//! per file and derives the initial edges. Text extraction runs in parallel;
//! `connect` calls run afterwards on one thread, in path order.

use std::collections::BTreeSet;
use std::path::Path;

use mrscope_core::{
    DeclarationEnv, EdgeKind, FileKey, FileNode, ReferenceMark, Registry, ScriptParser,
    SourceFileKind, SourceType, resolve_relative,
};
use rayon::prelude::*;
use thiserror::Error;
use tracing::{debug, info};

use crate::config::{ConfigError, IndexerConfig};
use crate::declarations::load_declarations;
use crate::extractor::{extract_includes, extract_reference_mark, extract_source_type};
use crate::loader::{LoadError, LoadedFile, load_files};

#[derive(Error, Debug)]
pub enum BuildError {
    #[error(transparent)]
    Config(#[from] ConfigError),

    #[error(transparent)]
    Load(#[from] LoadError),
}

pub type Result<T> = std::result::Result<T, BuildError>;

/// Registry and base scope produced by [`build_project`].
#[derive(Debug)]
pub struct BuiltProject<S> {
    pub registry: Registry<S>,
    pub declarations: DeclarationEnv<S>,
}

/// Patterns pulled out of one ordinary source file.
#[derive(Debug)]
struct Extraction {
    key: FileKey,
    includes: Vec<String>,
    reference_mark: Option<ReferenceMark>,
    source_type: Option<SourceType>,
}

impl Extraction {
    fn of(file: &LoadedFile) -> Self {
        Extraction {
            key: FileKey::new(&file.path),
            includes: extract_includes(&file.content),
            reference_mark: extract_reference_mark(&file.content),
            source_type: extract_source_type(&file.content),
        }
    }
}

/// Scan `root` and build its registry and declaration environment.
pub fn build_project<P: ScriptParser>(
    root: &Path,
    config: &IndexerConfig,
    parser: &P,
) -> Result<BuiltProject<P::Scope>> {
    info!("Building project graph for {}", root.display());

    let files = load_files(root, config)?;
    let declarations = load_declarations(parser, config, &files);

    let extractions: Vec<Extraction> = files
        .par_iter()
        .filter(|file| file.kind == SourceFileKind::Source)
        .map(Extraction::of)
        .collect();

    let mut registry = Registry::new();
    for file in files {
        registry.insert(FileNode::new(file.path, file.content, file.kind));
    }

    for extraction in &extractions {
        if let Some(node) = registry.node_mut(&extraction.key) {
            node.source_type = extraction.source_type;
            node.reference_mark = extraction.reference_mark.clone();
        }
    }

    let mut edges = 0usize;
    for extraction in &extractions {
        let Some(path) = registry.node(&extraction.key).map(|n| n.path.clone()) else {
            continue;
        };
        for target in include_targets(&registry, &path, &extraction.includes) {
            if registry.connect(&extraction.key, &target, EdgeKind::Include) {
                debug!("Connected {} -> {} (include)", extraction.key, target);
                edges += 1;
            }
        }
        if let Some(host) = extraction
            .reference_mark
            .as_ref()
            .and_then(|mark| mark_host(&registry, &path, mark))
        {
            if registry.connect(&host, &extraction.key, EdgeKind::ReferenceMark) {
                debug!("Connected {} -> {} (reference mark)", host, extraction.key);
                edges += 1;
            }
        }
    }

    info!(
        "Project graph built: {} files, {} edges, {} entry points",
        registry.len(),
        edges,
        registry.vertices().len()
    );

    Ok(BuiltProject {
        registry,
        declarations,
    })
}

/// Registered ordinary source files named by `includes`, resolved against
/// the directory of `path`. Unknown targets are dropped.
pub(crate) fn include_targets<S>(
    registry: &Registry<S>,
    path: &Path,
    includes: &[String],
) -> BTreeSet<FileKey> {
    includes
        .iter()
        .filter_map(|relative| {
            let key = FileKey::new(resolve_relative(path, relative));
            match registry.node(&key) {
                Some(node) if node.kind == SourceFileKind::Source => Some(key),
                _ => {
                    debug!(
                        "Dropping include '{}' in {}: no such source file",
                        relative,
                        path.display()
                    );
                    None
                }
            }
        })
        .collect()
}

/// Registered ordinary source file named by a reference mark in `path`.
pub(crate) fn mark_host<S>(
    registry: &Registry<S>,
    path: &Path,
    mark: &ReferenceMark,
) -> Option<FileKey> {
    let key = FileKey::new(resolve_relative(path, &mark.path));
    match registry.node(&key) {
        Some(node) if node.kind == SourceFileKind::Source => Some(key),
        _ => {
            debug!(
                "Dropping reference mark '{}'@{} in {}: no such source file",
                mark.path,
                mark.mark,
                path.display()
            );
            None
        }
    }
}
