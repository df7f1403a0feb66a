//! One project: the registry, declaration environment and result cache of a
//! single root folder, behind the operations request handlers call.

use std::path::{Path, PathBuf};
use std::sync::Arc;

use mrscope_core::{
    DeclarationEnv, FileKey, FileNode, GraphDiff, ParseFailure, ParseOutput, ParseRequest,
    Registry, ResultCache, ScriptParser, SourceMap, file_uri, parse_from,
};
use mrscope_indexer::{
    BuildError, ConfigError, IndexerConfig, apply_edit, build_project, extract_source_type,
    insert_file,
};
use thiserror::Error;
use tracing::{debug, info};

#[derive(Error, Debug)]
pub enum ProjectError {
    #[error(transparent)]
    Config(#[from] ConfigError),

    #[error(transparent)]
    Build(#[from] BuildError),

    #[error("project initialization task failed: {0}")]
    Join(#[from] tokio::task::JoinError),
}

pub type Result<T> = std::result::Result<T, ProjectError>;

/// Outcome of [`Project::resolve_entry_and_parse`].
#[derive(Debug)]
pub struct Resolution<S> {
    /// Entry point the parse started from.
    pub root: FileKey,
    pub root_result: Arc<ParseOutput<S>>,
    /// Result for the requested file, when the parser reached it.
    pub current: Option<Arc<ParseOutput<S>>>,
}

/// Project state for one root folder.
///
/// Mutating operations take `&mut self`; callers sharing a project across
/// tasks wrap it in a lock, so one edit-resolve-parse sequence runs to
/// completion before the next starts.
pub struct Project<P: ScriptParser> {
    root: PathBuf,
    config: IndexerConfig,
    parser: Arc<P>,
    registry: Registry<P::Scope>,
    declarations: DeclarationEnv<P::Scope>,
    cache: ResultCache<P::Scope>,
}

impl<P: ScriptParser> std::fmt::Debug for Project<P> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Project")
            .field("root", &self.root)
            .field("registry", &self.registry)
            .field("cached_roots", &self.cache.len())
            .finish()
    }
}

impl<P: ScriptParser> Project<P> {
    /// Scan `root` using its `.mrscope.toml`, or defaults when there is none.
    pub fn initialize(root: impl AsRef<Path>, parser: Arc<P>) -> Result<Self> {
        let root = root.as_ref();
        let config = IndexerConfig::load(root)?;
        Self::initialize_with_config(root, config, parser)
    }

    pub fn initialize_with_config(
        root: impl AsRef<Path>,
        config: IndexerConfig,
        parser: Arc<P>,
    ) -> Result<Self> {
        let root = root.as_ref().to_path_buf();
        let built = build_project(&root, &config, parser.as_ref())?;
        info!("Project ready: {} ({} files)", root.display(), built.registry.len());

        Ok(Project {
            root,
            config,
            parser,
            registry: built.registry,
            declarations: built.declarations,
            cache: ResultCache::new(),
        })
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    pub fn config(&self) -> &IndexerConfig {
        &self.config
    }

    pub fn registry(&self) -> &Registry<P::Scope> {
        &self.registry
    }

    /// Shared base scope, read-only after initialization.
    pub fn declarations(&self) -> &DeclarationEnv<P::Scope> {
        &self.declarations
    }

    pub fn lookup(&self, path: &Path) -> Option<&FileNode<P::Scope>> {
        self.registry.lookup(path)
    }

    pub fn contains(&self, path: &Path) -> bool {
        self.registry.contains(&FileKey::new(path))
    }

    /// Entry point whose compilation contains `path`.
    pub fn resolve_entry(&self, path: &Path) -> Option<FileKey> {
        let key = FileKey::new(path);
        let entry = self.registry.resolve_entry(&key);
        debug!("Resolved entry for {}: {:?}", key, entry.as_ref().map(FileKey::as_str));
        entry
    }

    /// Resolve the entry point for `path` and parse from it.
    ///
    /// `Ok(None)` means there is nothing to validate: the file is unknown or
    /// no entry point reaches it. Parser errors are returned unchanged.
    pub fn resolve_entry_and_parse(
        &mut self,
        path: &Path,
    ) -> std::result::Result<Option<Resolution<P::Scope>>, ParseFailure<P::Error>> {
        let key = FileKey::new(path);
        let Some(root) = self.resolve_entry(path) else {
            return Ok(None);
        };

        let root_result = parse_from(
            self.parser.as_ref(),
            &mut self.registry,
            &mut self.cache,
            &self.declarations,
            &root,
        )?;
        let current = if root == key {
            Some(Arc::clone(&root_result))
        } else {
            root_result.find_included(&key)
        };

        Ok(Some(Resolution {
            root,
            root_result,
            current,
        }))
    }

    /// Last cached result for `path` as a parse root.
    pub fn cached_result(&self, path: &Path) -> Option<Arc<ParseOutput<P::Scope>>> {
        self.cache.get(&FileKey::new(path)).cloned()
    }

    /// Apply new text for a registered file. `None` if the file is unknown.
    pub fn apply_edit(&mut self, path: &Path, text: &str) -> Option<GraphDiff> {
        apply_edit(&mut self.registry, path, text)
    }

    /// Register a file created after initialization.
    pub fn insert_file(&mut self, path: &Path, text: &str) -> Option<GraphDiff> {
        insert_file(&mut self.registry, &self.config, path, text)
    }

    /// Parse a file outside any project graph, with no base scope.
    pub fn parse_standalone(
        &self,
        path: &Path,
        text: &str,
    ) -> std::result::Result<ParseOutput<P::Scope>, P::Error> {
        let uri = file_uri(path);
        let mut sources = SourceMap::new();
        sources.insert(path, text);

        self.parser.parse(ParseRequest {
            path,
            uri: &uri,
            content: text,
            source_type: extract_source_type(text).unwrap_or_default(),
            base_scope: None,
            is_root: true,
            sources: &sources,
        })
    }

    /// Drop the registry, declarations and cache together.
    pub fn dispose(&mut self) {
        self.registry.clear();
        self.declarations = DeclarationEnv::new();
        self.cache.clear();
        info!("Project disposed: {}", self.root.display());
    }
}
