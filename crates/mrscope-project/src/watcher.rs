//! Filesystem watcher feeding edits into a project

use anyhow::Result;
use mrscope_core::{GraphDiff, ScriptParser};
use mrscope_indexer::decode;
use notify::{RecommendedWatcher, RecursiveMode, Watcher};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tokio::sync::{RwLock, broadcast, mpsc};
use tracing::{debug, error, info, warn};

use crate::project::Project;

/// Events emitted by the file watcher
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum WatchEvent {
    /// File or directory created
    Created(PathBuf),
    /// File or directory modified
    Modified(PathBuf),
    /// File or directory removed
    Removed(PathBuf),
}

/// File system watcher for a project root
pub struct FileWatcher {
    watcher: RecommendedWatcher,
    event_rx: mpsc::UnboundedReceiver<WatchEvent>,
    root_path: PathBuf,
}

impl FileWatcher {
    /// Create a new file watcher for the given root path
    pub fn new(root_path: impl AsRef<Path>) -> Result<Self> {
        let root_path = root_path.as_ref().to_path_buf();
        let (event_tx, event_rx) = mpsc::unbounded_channel();

        let watcher = notify::recommended_watcher(move |res: notify::Result<notify::Event>| {
            match res {
                Ok(event) => {
                    debug!("File system event: {:?}", event);
                    Self::handle_notify_event(event, &event_tx);
                }
                Err(e) => {
                    error!("File system watch error: {}", e);
                }
            }
        })?;

        Ok(Self {
            watcher,
            event_rx,
            root_path,
        })
    }

    fn handle_notify_event(event: notify::Event, event_tx: &mpsc::UnboundedSender<WatchEvent>) {
        let make: fn(PathBuf) -> WatchEvent = match event.kind {
            notify::EventKind::Create(_) => WatchEvent::Created,
            notify::EventKind::Modify(_) => WatchEvent::Modified,
            notify::EventKind::Remove(_) => WatchEvent::Removed,
            _ => return,
        };
        for path in event.paths {
            if should_ignore_path(&path) {
                continue;
            }
            if let Err(e) = event_tx.send(make(path)) {
                warn!("Failed to forward watch event: {}", e);
            }
        }
    }

    /// Watch a directory recursively
    pub fn watch_directory(&mut self, path: impl AsRef<Path>) -> Result<()> {
        let path = path.as_ref();
        info!("Watching directory: {:?}", path);

        self.watcher.watch(path, RecursiveMode::Recursive)?;
        Ok(())
    }

    pub fn event_receiver(&mut self) -> &mut mpsc::UnboundedReceiver<WatchEvent> {
        &mut self.event_rx
    }

    pub fn root_path(&self) -> &Path {
        &self.root_path
    }
}

/// Turns filesystem events for a project root into project edits
pub struct WatcherService<P: ScriptParser> {
    watcher: Arc<RwLock<FileWatcher>>,
    project: Arc<RwLock<Project<P>>>,
    diff_tx: Option<broadcast::Sender<String>>,
}

impl<P: ScriptParser> WatcherService<P> {
    pub fn new(root_path: impl AsRef<Path>, project: Arc<RwLock<Project<P>>>) -> Result<Self> {
        Ok(Self {
            watcher: Arc::new(RwLock::new(FileWatcher::new(root_path)?)),
            project,
            diff_tx: None,
        })
    }

    /// Create a watcher service that broadcasts every graph diff as JSON
    pub fn with_broadcast(
        root_path: impl AsRef<Path>,
        project: Arc<RwLock<Project<P>>>,
        diff_tx: broadcast::Sender<String>,
    ) -> Result<Self> {
        let mut service = Self::new(root_path, project)?;
        service.diff_tx = Some(diff_tx);
        Ok(service)
    }

    /// Start watching the project directory
    pub async fn start_watching(&self) -> Result<()> {
        let mut watcher = self.watcher.write().await;
        let root_path = watcher.root_path.clone();
        watcher.watch_directory(&root_path)?;

        info!("Started watching project directory: {:?}", root_path);
        Ok(())
    }

    /// Process events until the watcher shuts down
    pub async fn process_events(&self) -> Result<()> {
        let mut watcher = self.watcher.write().await;
        let event_rx = watcher.event_receiver();

        while let Some(event) = event_rx.recv().await {
            debug!("Processing watch event: {:?}", event);
            self.handle_event(event).await?;
        }

        Ok(())
    }

    async fn handle_event(&self, event: WatchEvent) -> Result<()> {
        match event {
            WatchEvent::Created(path) | WatchEvent::Modified(path) => {
                self.handle_file_change(&path).await
            }
            WatchEvent::Removed(path) => {
                // Nodes live until the project is disposed.
                debug!("File removed, keeping node: {:?}", path);
                Ok(())
            }
        }
    }

    /// Re-read a changed file and apply it as an edit or a new file
    async fn handle_file_change(&self, path: &Path) -> Result<()> {
        let recognized = {
            let project = self.project.read().await;
            project.contains(path) || project.config().classify(path).is_some()
        };
        if !recognized {
            return Ok(());
        }

        let bytes = match tokio::fs::read(path).await {
            Ok(bytes) => bytes,
            Err(e) => {
                error!("Failed to read file {}: {}", path.display(), e);
                return Ok(());
            }
        };
        let Some(text) = decode(&bytes) else {
            warn!("Skipping undecodable file {}", path.display());
            return Ok(());
        };

        let diff = {
            let mut project = self.project.write().await;
            if project.contains(path) {
                project.apply_edit(path, &text)
            } else {
                project.insert_file(path, &text)
            }
        };

        if let Some(diff) = diff {
            info!("Applied change to {:?} (diff #{})", path, diff.sequence);
            self.broadcast(&diff);
        }
        Ok(())
    }

    fn broadcast(&self, diff: &GraphDiff) {
        if let Some(ref diff_tx) = self.diff_tx {
            // No receivers just means no client is listening.
            let _ = diff_tx.send(diff.to_message().to_string());
        }
    }
}

/// Check if a path should be ignored (e.g. `.git/`)
fn should_ignore_path(path: &Path) -> bool {
    path.components().any(|component| {
        matches!(
            component.as_os_str().to_str(),
            Some(".git") | Some(".svn") | Some("node_modules")
        )
    })
}
