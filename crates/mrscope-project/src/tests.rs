//! Unit tests for mrscope-project

use std::path::Path;
use std::sync::Arc;

use crate::*;
use mrscope_core::test_utils::{FakeParser, create_repo_with_structure};
use mrscope_core::{FileKey, ParseFailure};
use pretty_assertions::assert_eq;
use tempfile::TempDir;

fn sample_project() -> (TempDir, Project<FakeParser>) {
    let dir = create_repo_with_structure(&[
        ("main.mrs", "#include \"inc/a.inc\"\nDim Total\n"),
        ("inc/a.inc", "Const Limit\n"),
        ("child.inc", "' \"main.mrs\"@Body\nDim Child\n"),
        ("other.mrs", "Dim Other\n"),
        ("globals.d.mrs", "Dim SharedName\n"),
    ]);
    let project = Project::initialize(dir.path(), Arc::new(FakeParser::new())).unwrap();
    (dir, project)
}

fn key(dir: &TempDir, relative: &str) -> FileKey {
    FileKey::new(dir.path().join(relative))
}

#[test]
fn test_initialize_registers_files_and_declarations() {
    let (dir, project) = sample_project();

    assert_eq!(project.registry().len(), 5);
    assert!(project.contains(&dir.path().join("INC/A.INC")));
    assert!(project.declarations().scope().contains("sharedname"));
    assert!(project.declarations().base_scope().is_some());
}

#[test]
fn test_resolve_entry_and_parse_from_included_file() {
    let (dir, mut project) = sample_project();
    let included = dir.path().join("inc/a.inc");

    let resolution = project.resolve_entry_and_parse(&included).unwrap().unwrap();
    assert_eq!(resolution.root, key(&dir, "main.mrs"));
    assert!(resolution.root_result.scope.as_ref().unwrap().contains("Total"));

    let current = resolution.current.unwrap();
    assert_eq!(current.key(), key(&dir, "inc/a.inc"));
    assert!(current.scope.as_ref().unwrap().contains("Limit"));

    let node = project.lookup(&included).unwrap();
    assert_eq!(node.resolved_root(), Some(&key(&dir, "main.mrs")));
}

#[test]
fn test_resolve_entry_and_parse_from_root() {
    let (dir, mut project) = sample_project();
    let main = dir.path().join("main.mrs");

    let resolution = project.resolve_entry_and_parse(&main).unwrap().unwrap();
    let current = resolution.current.unwrap();
    assert!(Arc::ptr_eq(&current, &resolution.root_result));

    let cached = project.cached_result(&main).unwrap();
    assert!(Arc::ptr_eq(&cached, &resolution.root_result));
}

#[test]
fn test_marked_file_resolves_to_host() {
    let (dir, project) = sample_project();
    assert_eq!(
        project.resolve_entry(&dir.path().join("child.inc")),
        Some(key(&dir, "main.mrs"))
    );
    assert_eq!(project.resolve_entry(&dir.path().join("globals.d.mrs")), None);
}

#[test]
fn test_resolve_unknown_file_is_nothing_to_validate() {
    let (dir, mut project) = sample_project();
    let outcome = project
        .resolve_entry_and_parse(&dir.path().join("missing.mrs"))
        .unwrap();
    assert!(outcome.is_none());
}

#[test]
fn test_parser_error_is_propagated() {
    let (dir, mut project) = sample_project();
    let main = dir.path().join("main.mrs");
    project.apply_edit(&main, "#error\n").unwrap();

    let outcome = project.resolve_entry_and_parse(&main);
    assert!(matches!(outcome, Err(ParseFailure::Parser(_))));
}

#[test]
fn test_edit_rehosts_marked_file() {
    let (dir, mut project) = sample_project();
    let child = dir.path().join("child.inc");

    let diff = project
        .apply_edit(&child, "' \"other.mrs\"@Body\nDim Child\n")
        .unwrap();
    assert_eq!(diff.added_edges.len(), 1);
    assert_eq!(diff.removed_edges.len(), 1);
    assert_eq!(project.resolve_entry(&child), Some(key(&dir, "other.mrs")));
}

#[test]
fn test_cache_survives_edit() {
    let (dir, mut project) = sample_project();
    let main = dir.path().join("main.mrs");
    project.resolve_entry_and_parse(&main).unwrap();

    project.apply_edit(&main, "Dim Changed\n").unwrap();
    assert!(project.lookup(&main).unwrap().parsed_result().is_none());
    assert!(project.cached_result(&main).is_some());
}

#[test]
fn test_insert_file_after_initialize() {
    let (dir, mut project) = sample_project();
    let late = dir.path().join("late.inc");

    let diff = project
        .insert_file(&late, "' \"other.mrs\"@Tail\n")
        .unwrap();
    assert_eq!(diff.added_edges.len(), 1);
    assert_eq!(project.resolve_entry(&late), Some(key(&dir, "other.mrs")));
    assert!(project.insert_file(&late, "").is_none());
}

#[test]
fn test_parse_standalone_has_no_base_scope() {
    let (dir, project) = sample_project();
    let output = project
        .parse_standalone(&dir.path().join("scratch.mrs"), "Dim Scratch\n")
        .unwrap();

    let scope = output.scope.unwrap();
    assert!(scope.contains("Scratch"));
    assert!(!scope.contains("SharedName"));
}

#[test]
fn test_dispose_clears_state() {
    let (dir, mut project) = sample_project();
    let main = dir.path().join("main.mrs");
    project.resolve_entry_and_parse(&main).unwrap();

    project.dispose();
    assert!(project.registry().is_empty());
    assert!(project.declarations().is_empty());
    assert!(project.cached_result(&main).is_none());
}

// ── Workspace ───────────────────────────────────────────

fn nested_folders() -> TempDir {
    create_repo_with_structure(&[
        ("outer.mrs", "Dim Outer\n"),
        ("sub/inner.mrs", "Dim Inner\n"),
        ("sub/part.inc", "' \"inner.mrs\"@Body\n"),
    ])
}

#[tokio::test]
async fn test_workspace_routes_to_innermost_folder() {
    let dir = nested_folders();
    let workspace = Workspace::new(Arc::new(FakeParser::new()));
    workspace.open_folder(dir.path()).await.unwrap();
    let inner = workspace.open_folder(dir.path().join("sub")).await.unwrap();

    let part = dir.path().join("sub/part.inc");
    let routed = workspace.project_for(&part).unwrap();
    assert!(Arc::ptr_eq(&routed, &inner));

    let outer = workspace.project_for(&dir.path().join("outer.mrs")).unwrap();
    assert!(!Arc::ptr_eq(&outer, &inner));
    assert!(workspace.project_for(Path::new("/elsewhere/x.mrs")).is_none());
}

#[tokio::test]
async fn test_workspace_edit_and_parse() {
    let dir = nested_folders();
    let workspace = Workspace::new(Arc::new(FakeParser::new()));
    workspace.open_folder(dir.path().join("sub")).await.unwrap();

    let part = dir.path().join("sub/part.inc");
    let resolution = workspace
        .resolve_entry_and_parse(&part)
        .await
        .unwrap()
        .unwrap();
    assert_eq!(resolution.root, key(&dir, "sub/inner.mrs"));
    assert!(
        workspace
            .cached_result(&dir.path().join("sub/inner.mrs"))
            .await
            .is_some()
    );

    let diff = workspace.apply_edit(&part, "Dim Loose\n").await.unwrap();
    assert_eq!(diff.removed_edges.len(), 1);
    assert!(workspace.apply_edit(&dir.path().join("outer.mrs"), "").await.is_none());
}

#[tokio::test]
async fn test_workspace_reopen_and_close() {
    let dir = nested_folders();
    let workspace = Workspace::new(Arc::new(FakeParser::new()));

    let first = workspace.open_folder(dir.path()).await.unwrap();
    workspace.open_folder(dir.path()).await.unwrap();
    assert_eq!(workspace.len(), 1);
    assert!(first.read().await.registry().is_empty());

    assert!(workspace.close_folder(dir.path()).await);
    assert!(!workspace.close_folder(dir.path()).await);
    assert!(workspace.is_empty());
}

#[tokio::test]
async fn test_workspace_open_missing_folder_fails() {
    let dir = TempDir::new().unwrap();
    let workspace = Workspace::new(Arc::new(FakeParser::new()));
    let result = workspace.open_folder(dir.path().join("absent")).await;
    assert!(matches!(result, Err(ProjectError::Build(_))));
    assert!(workspace.is_empty());
}
