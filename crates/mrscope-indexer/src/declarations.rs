//! Declaration environment loader
//!
//! Parses every declaration file with no base scope and folds the results
//! into one [`DeclarationEnv`], then declares a constant for every launcher
//! macro. Built-in declarations, when configured, go in first.

use std::collections::HashSet;
use std::path::Path;

use mrscope_core::{
    DeclarationEnv, MacroConstant, ParseRequest, ScriptParser, SourceFileKind, SourceMap,
    SourceProvider, SourceType,
};
use tracing::{debug, info, warn};

use crate::config::IndexerConfig;
use crate::extractor::{LauncherMacro, extract_launcher_macros};
use crate::loader::{LoadedFile, load_files};

/// Build the shared environment from `project_files`.
///
/// Declaration and launcher files are picked out of `project_files`;
/// ordinary sources are ignored. Files the parser rejects are skipped.
pub fn load_declarations<P: ScriptParser>(
    parser: &P,
    config: &IndexerConfig,
    project_files: &[LoadedFile],
) -> DeclarationEnv<P::Scope> {
    let mut env = DeclarationEnv::new();

    let builtin = config
        .builtin_declarations
        .as_deref()
        .map(|dir| load_builtin_files(dir, config))
        .unwrap_or_default();

    let declarations: Vec<&LoadedFile> = builtin
        .iter()
        .chain(project_files.iter())
        .filter(|file| file.kind == SourceFileKind::Declaration)
        .collect();

    let mut sources = SourceMap::new();
    for file in &declarations {
        sources.insert(file.path.clone(), file.content.clone());
    }

    for file in &declarations {
        merge_declaration_file(parser, &mut env, &sources, &file.path);
    }

    let mut macro_names = HashSet::new();
    for file in project_files.iter().filter(|f| f.kind == SourceFileKind::Launcher) {
        for launcher_macro in extract_launcher_macros(&file.content) {
            if !macro_names.insert(launcher_macro.name.to_lowercase()) {
                debug!(
                    "Macro '{}' in {} already defined by another launcher",
                    launcher_macro.name,
                    file.path.display()
                );
                continue;
            }
            env.declare_constant(to_constant(&file.path, launcher_macro));
        }
    }

    info!(
        "Declarations loaded: {} files, {} macro constants, {} conflicts",
        env.files().len(),
        env.constants().len(),
        env.conflicts().len()
    );
    env
}

fn merge_declaration_file<P: ScriptParser>(
    parser: &P,
    env: &mut DeclarationEnv<P::Scope>,
    sources: &SourceMap,
    path: &Path,
) {
    let Some(text) = sources.source(path) else {
        return;
    };
    let request = ParseRequest {
        path: text.path,
        uri: text.uri,
        content: text.content,
        source_type: SourceType::Script,
        base_scope: None,
        is_root: true,
        sources,
    };

    match parser.parse(request) {
        Ok(output) => match output.scope {
            Some(scope) => env.merge_file(path, scope),
            None => debug!("Declaration file produced no scope: {}", path.display()),
        },
        Err(e) => warn!("Skipping declaration file {}: {}", path.display(), e),
    }
}

fn load_builtin_files(dir: &Path, config: &IndexerConfig) -> Vec<LoadedFile> {
    match load_files(dir, config) {
        Ok(files) => {
            debug!("Loaded {} built-in files from {}", files.len(), dir.display());
            files
        }
        Err(e) => {
            warn!("Built-in declarations unavailable at {}: {}", dir.display(), e);
            Vec::new()
        }
    }
}

fn to_constant(launcher: &Path, launcher_macro: LauncherMacro) -> MacroConstant {
    MacroConstant {
        binding: launcher_macro.value_type.binding(),
        name: launcher_macro.name,
        source: launcher.to_path_buf(),
        span: launcher_macro.span,
    }
}
