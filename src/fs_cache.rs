//! Content-addressed read-through cache for file contents, keyed by a
//! filesystem "mod key" rather than by the content itself.
//!
//! This is distinct from [crate::cache::Cache] (which memoizes *resolution*
//! bookkeeping -- metadata, realpath, the nearest `node_modules`) and from
//! [crate::package_json]/[crate::tsconfig]'s own dedicated caches, which parse
//! their files once and keep the parsed form. [FsCache] sits one layer below
//! all of those: it is the thing an embedder's JS/CSS parser reads through
//! when it wants "the bytes of this file, re-read only if they changed".

use std::{path::Path, sync::Arc};

use dashmap::DashMap;
use rustc_hash::FxHasher;
use std::hash::BuildHasherDefault;

use crate::file_system::{FileMetadata, FileSystem};

/// A stable identifier derived from a file's metadata (here: modification
/// time and length), opaque to callers. Two reads of an unchanged file
/// produce an equal mod key; this is a heuristic, not a content hash, so it
/// is cheap enough to probe on every lookup.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
struct ModKey {
    mtime: u64,
    size: u64,
}

impl ModKey {
    fn probe(metadata: &FileMetadata) -> Option<Self> {
        let mtime = metadata.mtime_secs()?;
        Some(Self { mtime, size: metadata.size })
    }
}

struct Entry {
    contents: Arc<[u8]>,
    mod_key: Option<ModKey>,
    /// `false` when the mod-key probe itself failed (e.g. the underlying
    /// filesystem doesn't expose mtimes); in that case the entry is always
    /// re-read but a cache slot is still kept so failed probes don't retry
    /// the (also-failing) probe on every call.
    mod_key_usable: bool,
}

/// Read-through cache over a [FileSystem], keyed by path.
pub struct FsCache<Fs> {
    fs: Arc<Fs>,
    entries: DashMap<std::path::PathBuf, Entry, BuildHasherDefault<FxHasher>>,
}

impl<Fs: FileSystem> FsCache<Fs> {
    pub fn new(fs: Arc<Fs>) -> Self {
        Self { fs, entries: DashMap::default() }
    }

    /// Reads `path`, serving a cached copy when the file's mod key hasn't
    /// changed since the last read.
    ///
    /// # Errors
    ///
    /// Propagates the underlying filesystem error as-is; a missing file is
    /// not special-cased here (callers probing for optional files such as
    /// `package.json` treat `Err` as "absent").
    pub async fn read(&self, path: &Path) -> std::io::Result<Arc<[u8]>> {
        if let Some(entry) = self.entries.get(path) {
            if entry.mod_key_usable {
                if let Some(current) = self.probe_mod_key(path).await {
                    if Some(current) == entry.mod_key {
                        return Ok(Arc::clone(&entry.contents));
                    }
                }
            }
        }

        let contents: Arc<[u8]> = Arc::from(self.fs.read(path).await?);
        let mod_key = self.probe_mod_key(path).await;
        let mod_key_usable = mod_key.is_some();
        // Last writer wins: concurrent readers of the same path may each
        // read once, but every read observes identical bytes for identical
        // inputs, so the race is harmless.
        self.entries.insert(
            path.to_path_buf(),
            Entry { contents: Arc::clone(&contents), mod_key, mod_key_usable },
        );
        Ok(contents)
    }

    async fn probe_mod_key(&self, path: &Path) -> Option<ModKey> {
        self.fs.metadata(path).await.ok().as_ref().and_then(ModKey::probe)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::tests::memory_fs::MemoryFS;

    #[tokio::test]
    async fn repeated_read_is_cached() {
        let fs = Arc::new(MemoryFS::new(&[("/a.js", "hello")]));
        let cache = FsCache::new(Arc::clone(&fs));
        let first = cache.read(Path::new("/a.js")).await.unwrap();
        let second = cache.read(Path::new("/a.js")).await.unwrap();
        assert!(Arc::ptr_eq(&first, &second));
        assert_eq!(&*first, b"hello");
    }

    #[tokio::test]
    async fn missing_file_errors() {
        let fs = Arc::new(MemoryFS::new(&[]));
        let cache = FsCache::new(fs);
        assert!(cache.read(Path::new("/missing.js")).await.is_err());
    }
}
