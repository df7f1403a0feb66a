//! Per-folder projects, the multi-folder workspace and the file watcher

pub mod project;
pub mod watcher;
pub mod workspace;

#[cfg(test)]
pub mod tests;

pub use project::{Project, ProjectError, Resolution};
pub use watcher::{FileWatcher, WatchEvent, WatcherService};
pub use workspace::{SharedProject, Workspace};
