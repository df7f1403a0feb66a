//! Drives a root parse and distributes the result over the registry

use std::sync::Arc;

use thiserror::Error;
use tracing::{debug, warn};

use crate::cache::ResultCache;
use crate::graph::Registry;
use crate::model::FileKey;
use crate::parser::{ParseOutput, ParseRequest, ScriptParser};
use crate::symbols::DeclarationEnv;

/// Why a parse could not produce a result.
#[derive(Debug, Error)]
pub enum ParseFailure<E: std::error::Error + 'static> {
    #[error("file is not part of the project: {0}")]
    UnknownFile(FileKey),
    #[error("no entry point reaches {0}")]
    NoEntry(FileKey),
    #[error(transparent)]
    Parser(E),
}

/// Parse the compilation rooted at `root`.
///
/// The root result and every nested include result are attached to their
/// files together with `root` as their resolved entry. The root result goes
/// into `cache` unless the parser flagged it excluded.
pub fn parse_from<P: ScriptParser>(
    parser: &P,
    registry: &mut Registry<P::Scope>,
    cache: &mut ResultCache<P::Scope>,
    env: &DeclarationEnv<P::Scope>,
    root: &FileKey,
) -> Result<Arc<ParseOutput<P::Scope>>, ParseFailure<P::Error>> {
    let output = {
        let node = registry
            .node(root)
            .ok_or_else(|| ParseFailure::UnknownFile(root.clone()))?;
        let request = ParseRequest {
            path: &node.path,
            uri: &node.uri,
            content: &node.content,
            source_type: node.source_type.unwrap_or_default(),
            base_scope: env.base_scope(),
            is_root: true,
            sources: &*registry,
        };
        parser.parse(request).map_err(ParseFailure::Parser)?
    };
    let output = Arc::new(output);

    registry.set_resolution(root, Arc::clone(&output), root.clone());

    let mut attached = 0usize;
    let mut stack: Vec<&Arc<ParseOutput<P::Scope>>> = output.includes.iter().collect();
    while let Some(sub) = stack.pop() {
        let key = sub.key();
        if registry.set_resolution(&key, Arc::clone(sub), root.clone()) {
            attached += 1;
        } else {
            warn!("Parser followed an include outside the project: {}", key);
        }
        stack.extend(sub.includes.iter());
    }

    if cache.store(root.clone(), Arc::clone(&output)) {
        debug!("Parsed {} ({} included results attached)", root, attached);
    } else {
        debug!("Parsed {} ({} included results attached, not cached)", root, attached);
    }
    Ok(output)
}
