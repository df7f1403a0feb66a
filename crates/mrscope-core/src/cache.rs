//! Cache of root parse results

use std::collections::HashMap;
use std::sync::Arc;

use chrono::{DateTime, Utc};

use crate::model::FileKey;
use crate::parser::ParseOutput;

/// A cached root result and when it was stored.
#[derive(Debug)]
pub struct CacheEntry<S> {
    pub result: Arc<ParseOutput<S>>,
    pub stored_at: DateTime<Utc>,
}

/// Root parse results keyed by the entry point they were parsed from.
///
/// Results flagged `excluded` by the parser are never stored.
#[derive(Debug)]
pub struct ResultCache<S> {
    entries: HashMap<FileKey, CacheEntry<S>>,
}

impl<S> Default for ResultCache<S> {
    fn default() -> Self {
        ResultCache {
            entries: HashMap::new(),
        }
    }
}

impl<S> ResultCache<S> {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn get(&self, root: &FileKey) -> Option<&Arc<ParseOutput<S>>> {
        self.entries.get(root).map(|entry| &entry.result)
    }

    pub fn entry(&self, root: &FileKey) -> Option<&CacheEntry<S>> {
        self.entries.get(root)
    }

    /// Store a root result. An excluded result is not stored and evicts
    /// any earlier entry for `root`; returns `false` in that case.
    pub fn store(&mut self, root: FileKey, result: Arc<ParseOutput<S>>) -> bool {
        if result.excluded {
            self.entries.remove(&root);
            return false;
        }
        self.entries.insert(
            root,
            CacheEntry {
                result,
                stored_at: Utc::now(),
            },
        );
        true
    }

    pub fn remove(&mut self, root: &FileKey) -> Option<CacheEntry<S>> {
        self.entries.remove(root)
    }

    pub fn clear(&mut self) {
        self.entries.clear();
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn stats(&self) -> CacheStats {
        CacheStats {
            entries: self.entries.len(),
            oldest: self.entries.values().map(|e| e.stored_at).min(),
            newest: self.entries.values().map(|e| e.stored_at).max(),
        }
    }
}

/// Cache statistics
#[derive(Debug, Clone, Default)]
pub struct CacheStats {
    pub entries: usize,
    pub oldest: Option<DateTime<Utc>>,
    pub newest: Option<DateTime<Utc>>,
}
