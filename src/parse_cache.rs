//! Generic memoization for the JS/JSON/CSS parsers that live outside this
//! crate (spec.md §4.2 "Parse caches"). The parsers themselves are an
//! out-of-scope collaborator, consumed only through the
//! `Parse(source, options) -> (AST, diagnostics)` interface spec.md
//! describes -- this module is that interface's cache, not the parser.
//!
//! One [ParseCache] instance is shared by a build's JS, JSON and CSS
//! pipelines alike; each instantiates it with its own `(Options, Ast,
//! Diagnostic)` triple, matching the "Interface-based polymorphism" design
//! note: the three languages need the same cache shape, not three separate
//! implementations.

use std::{path::PathBuf, sync::Arc};

use dashmap::DashMap;
use rustc_hash::FxHasher;
use std::hash::BuildHasherDefault;

/// An immutable, parseable unit of source text.
///
/// Two [Source] values are cache-equivalent iff `key_path`, `pretty_path` and
/// `contents` are all equal -- `contents` by pointer identity rather than by
/// byte comparison, because plugins commonly hand back the same buffer for
/// an unchanged file and re-hashing megabytes of source on every lookup
/// would defeat the point of caching it.
#[derive(Debug, Clone)]
pub struct Source {
    pub key_path: PathBuf,
    pub pretty_path: String,
    pub contents: Arc<[u8]>,
}

impl Source {
    pub fn new(key_path: PathBuf, pretty_path: String, contents: Arc<[u8]>) -> Self {
        Self { key_path, pretty_path, contents }
    }

    fn identity_eq(&self, other: &Self) -> bool {
        self.key_path == other.key_path
            && self.pretty_path == other.pretty_path
            && Arc::ptr_eq(&self.contents, &other.contents)
    }
}

struct Entry<O, A, D> {
    source: Source,
    options: O,
    ast: A,
    diagnostics: Vec<D>,
}

/// Memoizes `parse(source, options) -> (ast, diagnostics)` keyed by
/// `source.key_path`, re-parsing only when `source` or `options` change.
///
/// Diagnostics produced by a past parse are replayed into the caller's `log`
/// on every hit, in the same order they were originally emitted, so behavior
/// is deterministic across repeated builds (spec.md §8 property 1).
pub struct ParseCache<O, A, D> {
    entries: DashMap<PathBuf, Entry<O, A, D>, BuildHasherDefault<FxHasher>>,
}

impl<O, A, D> Default for ParseCache<O, A, D> {
    fn default() -> Self {
        Self { entries: DashMap::default() }
    }
}

impl<O, A, D> ParseCache<O, A, D>
where
    O: PartialEq,
    A: Clone,
    D: Clone,
{
    pub fn new() -> Self {
        Self::default()
    }

    /// Looks up `source`/`options` in the cache; on miss, invokes `parse` and
    /// installs the result unconditionally (last writer wins -- concurrent
    /// parses of the same content produce equivalent entries, so the race is
    /// harmless, matching [crate::fs_cache::FsCache]'s policy).
    pub fn parse(
        &self,
        log: &mut Vec<D>,
        source: Source,
        options: O,
        parse: impl FnOnce(&Source, &O) -> (A, Vec<D>),
    ) -> A {
        if let Some(entry) = self.entries.get(&source.key_path) {
            if entry.source.identity_eq(&source) && entry.options == options {
                log.extend(entry.diagnostics.iter().cloned());
                return entry.ast.clone();
            }
        }

        let (ast, diagnostics) = parse(&source, &options);
        log.extend(diagnostics.iter().cloned());
        let key_path = source.key_path.clone();
        self.entries.insert(key_path, Entry { source, options, ast: ast.clone(), diagnostics });
        ast
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn clear(&self) {
        self.entries.clear();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};

    fn source(path: &str, contents: &'static str) -> Source {
        Source::new(PathBuf::from(path), path.to_string(), Arc::from(contents.as_bytes()))
    }

    #[test]
    fn hit_replays_diagnostics_without_reparsing() {
        let cache: ParseCache<(), String, String> = ParseCache::new();
        let calls = AtomicUsize::new(0);
        let parse_it = |src: &Source, _: &()| {
            calls.fetch_add(1, Ordering::SeqCst);
            (src.pretty_path.clone(), vec!["warn: todo".to_string()])
        };

        let src = source("/a.js", "const x = 1;");
        let mut log1 = Vec::new();
        let ast1 = cache.parse(&mut log1, src.clone(), (), parse_it);
        let mut log2 = Vec::new();
        let ast2 = cache.parse(&mut log2, src, (), parse_it);

        assert_eq!(ast1, ast2);
        assert_eq!(log1, log2);
        assert_eq!(calls.load(Ordering::SeqCst), 1, "second parse should be served from cache");
    }

    #[test]
    fn changed_contents_identity_forces_reparse() {
        let cache: ParseCache<(), u32, ()> = ParseCache::new();
        let calls = AtomicUsize::new(0);
        let parse_it = |_: &Source, _: &()| {
            calls.fetch_add(1, Ordering::SeqCst);
            (calls.load(Ordering::SeqCst) as u32, vec![])
        };

        let mut log = Vec::new();
        let first = cache.parse(&mut log, source("/a.js", "a"), (), parse_it);
        // Same path, same bytes, but a distinct Arc allocation: not identity-equal.
        let second_source = source("/a.js", "a");
        let second = cache.parse(&mut log, second_source, (), parse_it);

        assert_ne!(first, second, "a new Arc allocation is a new content identity");
        assert_eq!(calls.load(Ordering::SeqCst), 2);
    }

    #[test]
    fn changed_options_forces_reparse() {
        let cache: ParseCache<u8, u32, ()> = ParseCache::new();
        let calls = AtomicUsize::new(0);
        let parse_it = |_: &Source, _: &u8| {
            calls.fetch_add(1, Ordering::SeqCst);
            (calls.load(Ordering::SeqCst) as u32, vec![])
        };

        let src = source("/a.json", "{}");
        let mut log = Vec::new();
        cache.parse(&mut log, src.clone(), 1, parse_it);
        cache.parse(&mut log, src, 2, parse_it);

        assert_eq!(calls.load(Ordering::SeqCst), 2, "changed options must not hit the cache");
    }

    #[test]
    fn empty_cache_reports_len() {
        let cache: ParseCache<(), (), ()> = ParseCache::new();
        assert!(cache.is_empty());
        cache.parse(&mut Vec::new(), source("/x.css", ".a{}"), (), |_, _| ((), vec![]));
        assert_eq!(cache.len(), 1);
        cache.clear();
        assert!(cache.is_empty());
    }
}
