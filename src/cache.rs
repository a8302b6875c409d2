//! Build-scoped memo table for expensive compiled content.

use serde_json::Value;
use sheaf_model::Node;
use sheaf_style::{hash_value, StyleContext};
use std::cell::{Cell, RefCell};
use std::collections::hash_map::DefaultHasher;
use std::collections::HashMap;
use std::fmt;
use std::hash::{Hash, Hasher};
use std::sync::Arc;

// --- Cache Keys ---

/// Keys compare by full structure; the digest only picks the bucket.
#[derive(Clone, PartialEq, Eq)]
pub enum CacheKey {
    /// A raw node together with the context it compiles in.
    Structural {
        digest: u64,
        node: Value,
        context: StyleContext,
    },
    /// A named reference; the same id resolves to one value whatever the context.
    Reference(String),
}

impl CacheKey {
    pub fn structural(node: &Value, context: &StyleContext) -> Self {
        let mut hasher = DefaultHasher::new();
        hash_value(node, &mut hasher);
        context.hash(&mut hasher);
        CacheKey::Structural {
            digest: hasher.finish(),
            node: node.clone(),
            context: context.clone(),
        }
    }

    pub fn reference(id: &str) -> Self {
        CacheKey::Reference(id.to_string())
    }
}

impl Hash for CacheKey {
    fn hash<H: Hasher>(&self, state: &mut H) {
        match self {
            CacheKey::Structural { digest, .. } => {
                0u8.hash(state);
                digest.hash(state);
            }
            CacheKey::Reference(id) => {
                1u8.hash(state);
                id.hash(state);
            }
        }
    }
}

impl fmt::Debug for CacheKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            CacheKey::Structural { digest, .. } => write!(f, "Structural({:016x})", digest),
            CacheKey::Reference(id) => f.debug_tuple("Reference").field(id).finish(),
        }
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct CacheStats {
    pub hits: u64,
    pub misses: u64,
    pub entries: usize,
}

/// Holds one compiled instance per key for the duration of a build.
///
/// Entries are never evicted. Lookups go through `&self` so the cache can be
/// shared by a compiler that recurses into itself.
#[derive(Debug, Default)]
pub struct ContentCache {
    entries: RefCell<HashMap<CacheKey, Arc<Node>>>,
    hits: Cell<u64>,
    misses: Cell<u64>,
}

impl ContentCache {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn get(&self, key: &CacheKey) -> Option<Arc<Node>> {
        let found = self.entries.borrow().get(key).cloned();
        if found.is_some() {
            self.hits.set(self.hits.get() + 1);
        }
        found
    }

    /// Returns the stored value for `key`, running `compute` only on a miss.
    ///
    /// `compute` may itself use the cache; no borrow is held while it runs.
    pub fn get_or_compute<E, F>(&self, key: CacheKey, compute: F) -> Result<Arc<Node>, E>
    where
        F: FnOnce() -> Result<Node, E>,
    {
        if let Some(value) = self.get(&key) {
            log::debug!("Cache hit for {:?}", key);
            return Ok(value);
        }
        self.misses.set(self.misses.get() + 1);
        log::debug!("Cache miss for {:?}", key);
        let value = Arc::new(compute()?);
        let stored = self
            .entries
            .borrow_mut()
            .entry(key)
            .or_insert(value)
            .clone();
        Ok(stored)
    }

    pub fn stats(&self) -> CacheStats {
        CacheStats {
            hits: self.hits.get(),
            misses: self.misses.get(),
            entries: self.entries.borrow().len(),
        }
    }
}
