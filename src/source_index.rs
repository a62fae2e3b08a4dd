//! Dense source-file id allocation.
//!
//! A bundler built on top of this resolver wants to refer to a resolved file
//! by a small integer (for arena-style ASTs, parallel work queues, etc.)
//! instead of by its full path. [SourceIndex] hands out one id per distinct
//! `(path, kind)` pair and per glob-parent directory, the same way
//! `CachedPath` hands out one cache entry per distinct path in [crate::cache].
//!
//! This module mirrors that cache's sharding choice (`dashmap`) rather than
//! inventing a new concurrency primitive.

use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicU32, Ordering};

use dashmap::DashMap;
use rustc_hash::FxHasher;
use std::hash::BuildHasherDefault;

/// How a path was imported, used together with the path itself as the
/// allocation key -- the same specifier can be both `require`d and
/// dynamically `import()`ed, and a bundler may want those treated as
/// distinct graph nodes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ImportKind {
    /// `import ... from "specifier"` / `export ... from "specifier"`
    Stmt,
    /// `require("specifier")`
    Require,
    /// `import("specifier")`
    Dynamic,
    /// `require.resolve("specifier")`
    RequireResolve,
    /// `@import "specifier"` (CSS)
    AtImport,
    /// `url(specifier)` (CSS)
    UrlToken,
}

#[derive(Debug, Clone, PartialEq, Eq, Hash)]
struct FileKey {
    path: PathBuf,
    kind: ImportKind,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SourceId(u32);

impl SourceId {
    pub fn index(self) -> u32 {
        self.0
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct GlobParentId(u32);

impl GlobParentId {
    pub fn index(self) -> u32 {
        self.0
    }
}

/// Allocates dense, stable ids for resolved files and for glob-parent
/// directories (the directory a `sideEffects` glob or a bundler's directory
/// watch is rooted at).
///
/// Allocation is monotonic: an id, once handed out for a key, is never
/// reused or invalidated for the lifetime of the allocator.
#[derive(Default)]
pub struct SourceIndex {
    files: DashMap<FileKey, SourceId, BuildHasherDefault<FxHasher>>,
    glob_parents: DashMap<PathBuf, GlobParentId, BuildHasherDefault<FxHasher>>,
    next_file_id: AtomicU32,
    next_glob_parent_id: AtomicU32,
}

impl SourceIndex {
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns the id for `(path, kind)`, allocating one if this is the first
    /// time this pair has been seen.
    pub fn intern(&self, path: &Path, kind: ImportKind) -> SourceId {
        let key = FileKey { path: path.to_path_buf(), kind };
        if let Some(id) = self.files.get(&key) {
            return *id;
        }
        // The id is drawn from a shared counter inside `or_insert_with`, so
        // two threads racing to intern distinct keys can never be handed the
        // same id -- only the thread that actually wins the insert advances
        // the counter for its key.
        let counter = &self.next_file_id;
        *self
            .files
            .entry(key)
            .or_insert_with(|| SourceId(counter.fetch_add(1, Ordering::Relaxed)))
    }

    /// Returns the id for the glob-parent directory `path`, allocating one on
    /// first use.
    pub fn intern_glob_parent(&self, path: &Path) -> GlobParentId {
        let path = path.to_path_buf();
        if let Some(id) = self.glob_parents.get(&path) {
            return *id;
        }
        let counter = &self.next_glob_parent_id;
        *self
            .glob_parents
            .entry(path)
            .or_insert_with(|| GlobParentId(counter.fetch_add(1, Ordering::Relaxed)))
    }

    pub fn len(&self) -> usize {
        self.files.len()
    }

    pub fn is_empty(&self) -> bool {
        self.files.is_empty()
    }
}
