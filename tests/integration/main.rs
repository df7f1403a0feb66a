//! Integration tests for mrscope
//!
//! These tests drive a project through initialization, edits and parses the
//! way a language server would, checking the graph after every step.

use std::path::{Path, PathBuf};
use std::sync::Arc;

use mrscope::{FileKey, Project, Workspace};
use mrscope_core::BindingType;
use mrscope_core::test_utils::{FakeParser, create_repo_with_structure};
use pretty_assertions::assert_eq;
use tempfile::TempDir;

fn open(files: &[(&str, &str)]) -> (TempDir, Project<FakeParser>) {
    let dir = create_repo_with_structure(files);
    let project = Project::initialize(dir.path(), Arc::new(FakeParser::new())).unwrap();
    (dir, project)
}

fn path(dir: &TempDir, relative: &str) -> PathBuf {
    dir.path().join(relative)
}

fn key(dir: &TempDir, relative: &str) -> FileKey {
    FileKey::new(path(dir, relative))
}

fn is_vertex(project: &Project<FakeParser>, path: &Path) -> bool {
    project.lookup(path).unwrap().is_vertex()
}

/// Included file resolves to the file including it
#[test]
fn test_include_makes_includer_the_entry() {
    let (dir, project) = open(&[
        ("main.mrs", "#include \"lib.inc\"\nDim Total\n"),
        ("lib.inc", "Dim Helper\n"),
    ]);

    assert!(!is_vertex(&project, &path(&dir, "lib.inc")));
    assert!(is_vertex(&project, &path(&dir, "main.mrs")));
    assert_eq!(
        project.resolve_entry(&path(&dir, "lib.inc")),
        Some(key(&dir, "main.mrs"))
    );
    project.registry().check_invariants().unwrap();
}

/// A reference mark hosts the marked file under the named file
#[test]
fn test_reference_mark_connects_host() {
    let (dir, project) = open(&[
        ("main.mrs", "Dim Total\n"),
        ("child.inc", "' \"main.mrs\"@Section1\nDim Child\n"),
    ]);

    let main = project.lookup(&path(&dir, "main.mrs")).unwrap();
    assert!(main.includes_file(&key(&dir, "child.inc")));
    assert!(main.is_vertex());
    assert_eq!(
        project.resolve_entry(&path(&dir, "child.inc")),
        Some(key(&dir, "main.mrs"))
    );
    project.registry().check_invariants().unwrap();
}

/// Removing the mark turns the file into its own entry point
#[test]
fn test_removing_mark_makes_file_its_own_entry() {
    let (dir, mut project) = open(&[
        ("main.mrs", "Dim Total\n"),
        ("child.inc", "' \"main.mrs\"@Section1\nDim Child\n"),
    ]);
    let child = path(&dir, "child.inc");

    let diff = project.apply_edit(&child, "Dim Child\n").unwrap();
    assert_eq!(diff.removed_edges.len(), 1);
    assert!(is_vertex(&project, &child));
    assert_eq!(project.resolve_entry(&child), Some(key(&dir, "child.inc")));
    project.registry().check_invariants().unwrap();
}

/// Pointing the mark at another file moves the edge
#[test]
fn test_moving_mark_moves_edge() {
    let (dir, mut project) = open(&[
        ("main.mrs", "Dim Total\n"),
        ("other.mrs", "Dim Other\n"),
        ("child.inc", "' \"main.mrs\"@Section1\nDim Child\n"),
    ]);
    let child = path(&dir, "child.inc");

    project
        .apply_edit(&child, "' \"other.mrs\"@Section1\nDim Child\n")
        .unwrap();

    let main = project.lookup(&path(&dir, "main.mrs")).unwrap();
    let other = project.lookup(&path(&dir, "other.mrs")).unwrap();
    assert!(!main.includes_file(&key(&dir, "child.inc")));
    assert!(other.includes_file(&key(&dir, "child.inc")));
    assert_eq!(project.resolve_entry(&child), Some(key(&dir, "other.mrs")));
    project.registry().check_invariants().unwrap();
}

/// Launcher macros become constants in the shared declarations
#[test]
fn test_launcher_macros_become_constants() {
    let (_dir, project) = open(&[
        ("x.mrs", "Dim Total\n"),
        ("run.bat", "mrscriptcl \"x.mrs\" /d:Count=3 /d:Flag=true\r\n"),
    ]);
    let env = project.declarations();

    let constants: Vec<(&str, BindingType)> = env
        .constants()
        .iter()
        .map(|c| (c.name.as_str(), c.binding))
        .collect();
    assert_eq!(
        constants,
        vec![("Count", BindingType::Long), ("Flag", BindingType::Boolean)]
    );
    assert!(env.scope().contains("count"));
    assert!(env.scope().contains("flag"));
}

/// Applying the same text twice leaves the graph as after the first edit
#[test]
fn test_repeated_edit_is_idempotent() {
    let (dir, mut project) = open(&[
        ("main.mrs", "Dim Total\n"),
        ("other.mrs", "#include \"lib.inc\"\n"),
        ("lib.inc", "Dim Helper\n"),
        ("child.inc", "Dim Child\n"),
    ]);
    let child = path(&dir, "child.inc");
    let text = "' \"main.mrs\"@Body\n#include \"lib.inc\"\n";

    let first = project.apply_edit(&child, text).unwrap();
    assert_eq!(first.added_edges.len(), 2);
    let edges = project.registry().edge_count();
    let vertices = project.registry().vertices();

    let second = project.apply_edit(&child, text).unwrap();
    assert!(second.is_empty());
    assert!(second.sequence > first.sequence);
    assert_eq!(project.registry().edge_count(), edges);
    assert_eq!(project.registry().vertices(), vertices);
    project.registry().check_invariants().unwrap();
}

/// Only the root result is cached, and excluded results never are
#[test]
fn test_cache_holds_root_results_only() {
    let (dir, mut project) = open(&[
        ("main.mrs", "#include \"lib.inc\"\n"),
        ("lib.inc", "Dim Helper\n"),
        ("scratch.mrs", "'nocache\nDim Scratch\n"),
    ]);

    let resolution = project
        .resolve_entry_and_parse(&path(&dir, "lib.inc"))
        .unwrap()
        .unwrap();
    assert!(resolution.current.is_some());
    assert!(project.cached_result(&path(&dir, "main.mrs")).is_some());
    assert!(project.cached_result(&path(&dir, "lib.inc")).is_none());

    project
        .resolve_entry_and_parse(&path(&dir, "scratch.mrs"))
        .unwrap()
        .unwrap();
    assert!(project.cached_result(&path(&dir, "scratch.mrs")).is_none());
}

/// Entry resolution terminates on include cycles with no vertex
#[test]
fn test_cycle_without_vertex_has_no_entry() {
    let (dir, mut project) = open(&[
        ("a.inc", "#include \"b.inc\"\n"),
        ("b.inc", "#include \"a.inc\"\n"),
    ]);

    assert_eq!(project.resolve_entry(&path(&dir, "a.inc")), None);
    let outcome = project
        .resolve_entry_and_parse(&path(&dir, "b.inc"))
        .unwrap();
    assert!(outcome.is_none());
}

/// Every edit along a chain of changes keeps the graph consistent
#[test]
fn test_edit_sequence_preserves_invariants() {
    let (dir, mut project) = open(&[
        ("main.mrs", "#include \"a.inc\"\n"),
        ("other.mrs", "Dim Other\n"),
        ("a.inc", "Dim A\n"),
        ("b.inc", "' \"main.mrs\"@Tail\n"),
    ]);
    let edits = [
        ("a.inc", "#include \"b.inc\"\n"),
        ("b.inc", "' \"other.mrs\"@Tail\n#include \"a.inc\"\n"),
        ("main.mrs", "Dim Total\n"),
        ("a.inc", "' \"main.mrs\"@Body\n"),
        ("b.inc", ""),
        ("other.mrs", "#include \"b.inc\"\n#include \"b.inc\"\n"),
    ];

    for (file, text) in edits {
        project.apply_edit(&path(&dir, file), text).unwrap();
        project.registry().check_invariants().unwrap();
    }

    assert_eq!(
        project.resolve_entry(&path(&dir, "a.inc")),
        Some(key(&dir, "main.mrs"))
    );
    assert_eq!(
        project.resolve_entry(&path(&dir, "b.inc")),
        Some(key(&dir, "other.mrs"))
    );
}

/// Folders opened in one workspace stay isolated
#[tokio::test]
async fn test_workspace_folders_are_isolated() {
    let first = create_repo_with_structure(&[("shared.d.mrs", "Dim OnlyFirst\n")]);
    let second = create_repo_with_structure(&[("main.mrs", "Dim Main\n")]);
    let workspace = Workspace::new(Arc::new(FakeParser::new()));

    let a = workspace.open_folder(first.path()).await.unwrap();
    let b = workspace.open_folder(second.path()).await.unwrap();

    assert!(a.read().await.declarations().scope().contains("onlyfirst"));
    assert!(b.read().await.declarations().is_empty());
    assert_eq!(workspace.roots().len(), 2);

    workspace.dispose_all().await;
    assert!(workspace.is_empty());
    assert!(a.read().await.registry().is_empty());
}
