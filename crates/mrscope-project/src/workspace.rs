//! Multi-folder workspace
//!
//! Holds one [`Project`] per opened root folder. Projects share nothing
//! mutable; each sits behind its own lock.

use std::path::{Path, PathBuf};
use std::sync::Arc;

use dashmap::DashMap;
use mrscope_core::{FileKey, GraphDiff, ParseFailure, ParseOutput, ScriptParser};
use tokio::sync::RwLock;
use tracing::{debug, info};

use crate::project::{Project, Resolution, Result};

pub type SharedProject<P> = Arc<RwLock<Project<P>>>;

pub struct Workspace<P: ScriptParser> {
    parser: Arc<P>,
    projects: DashMap<PathBuf, SharedProject<P>>,
}

impl<P: ScriptParser + 'static> Workspace<P> {
    pub fn new(parser: Arc<P>) -> Self {
        Workspace {
            parser,
            projects: DashMap::new(),
        }
    }

    /// Initialize a project for `root` on the blocking pool and register it.
    /// Reopening a root replaces the previous project.
    pub async fn open_folder(&self, root: impl AsRef<Path>) -> Result<SharedProject<P>> {
        let root = root.as_ref().to_path_buf();
        let parser = Arc::clone(&self.parser);
        let scan_root = root.clone();
        let project =
            tokio::task::spawn_blocking(move || Project::initialize(&scan_root, parser)).await??;

        let shared = Arc::new(RwLock::new(project));
        if let Some(previous) = self.projects.insert(root.clone(), Arc::clone(&shared)) {
            previous.write().await.dispose();
        }
        info!("Opened folder {}", root.display());
        Ok(shared)
    }

    /// Dispose and forget the project for `root`. Returns `false` if none was open.
    pub async fn close_folder(&self, root: &Path) -> bool {
        let Some((_, project)) = self.projects.remove(root) else {
            return false;
        };
        project.write().await.dispose();
        info!("Closed folder {}", root.display());
        true
    }

    /// Project whose root is the longest prefix of `path`.
    pub fn project_for(&self, path: &Path) -> Option<SharedProject<P>> {
        let key = FileKey::new(path);
        let target = Path::new(key.as_str());

        let found = self
            .projects
            .iter()
            .filter_map(|entry| {
                let root_key = FileKey::new(entry.key());
                target
                    .starts_with(root_key.as_str())
                    .then(|| (root_key.as_str().len(), Arc::clone(entry.value())))
            })
            .max_by_key(|(depth, _)| *depth)
            .map(|(_, project)| project);

        if found.is_none() {
            debug!("No open project contains {}", path.display());
        }
        found
    }

    pub async fn apply_edit(&self, path: &Path, text: &str) -> Option<GraphDiff> {
        let project = self.project_for(path)?;
        let mut project = project.write().await;
        project.apply_edit(path, text)
    }

    pub async fn resolve_entry_and_parse(
        &self,
        path: &Path,
    ) -> std::result::Result<Option<Resolution<P::Scope>>, ParseFailure<P::Error>> {
        let Some(project) = self.project_for(path) else {
            return Ok(None);
        };
        let mut project = project.write().await;
        project.resolve_entry_and_parse(path)
    }

    pub async fn cached_result(&self, path: &Path) -> Option<Arc<ParseOutput<P::Scope>>> {
        let project = self.project_for(path)?;
        let project = project.read().await;
        project.cached_result(path)
    }

    /// Roots of every open project.
    pub fn roots(&self) -> Vec<PathBuf> {
        let mut roots: Vec<PathBuf> = self.projects.iter().map(|e| e.key().clone()).collect();
        roots.sort();
        roots
    }

    pub fn len(&self) -> usize {
        self.projects.len()
    }

    pub fn is_empty(&self) -> bool {
        self.projects.is_empty()
    }

    /// Dispose every project and close all folders.
    pub async fn dispose_all(&self) {
        let roots = self.roots();
        for root in roots {
            self.close_folder(&root).await;
        }
    }
}
