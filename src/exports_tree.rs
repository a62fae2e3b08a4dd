//! The conditional/pattern tree parsed out of a `package.json` `exports` or
//! `imports` field, plus forward and reverse resolution over it.
//!
//! The forward direction (subpath + active conditions -> target) is already
//! implemented directly against the raw `simd_json` value in
//! [crate::package_exports_resolve] / [crate::package_target_resolve], because
//! that code is load-bearing Node.js-conformance logic ported from the
//! upstream resolver and is not worth destabilizing by routing it through a
//! second representation.
//!
//! This module adds the piece that wasn't there before: a standalone,
//! precomputed tree with a *reverse* query -- given a concrete relative
//! target path, which subpath key(s) of `exports` produce it. Bundlers use
//! this to map a resolved file back to the "public" specifier it was exported
//! under, e.g. for diagnostics ("this file is not part of the package's
//! public API") or for rewriting bare-specifier imports in generated code.

use std::cmp::Ordering;

use simd_json::prelude::*;

use crate::package_json::{JSONMap, JSONValue};

/// One key of an [Node::Object], with its parsed byte range in the source
/// `package.json` kept around for diagnostics.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ObjectEntry {
    pub key: String,
    pub value: Node,
}

/// The conditional/pattern tree node described by spec.md's "Conditional/
/// pattern tree node" -- a tagged variant mirroring the shapes `exports`/
/// `imports` values can take in a `package.json`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Node {
    Null,
    String(String),
    Array(Vec<Node>),
    Object {
        entries: Vec<ObjectEntry>,
        /// Keys containing `*` or ending with `/`, stable-sorted by
        /// specificity (see [expansion_key_order]).
        expansion_keys: Vec<String>,
        /// Whether every key starts with `.` (a subpath map) as opposed to
        /// every key being a bare condition name. Mixed objects are
        /// [Node::Invalid].
        starts_with_dot: bool,
    },
    /// Produced when an object mixes dotted (subpath) and undotted
    /// (condition) keys, which Node.js rejects outright.
    Invalid,
}

/// Orders `expansionKeys` by specificity: longer literal prefix first; on a
/// prefix-length tie, the key without `*` wins over one with `*`; on a
/// further tie, the longer overall key wins.
///
/// This is a free function (rather than an `Ord` impl) because the ordering
/// depends on each key's *literal prefix length*, not on the key's own
/// ordinal value -- it has to be computed per comparison, not derived.
pub fn expansion_key_order(a: &str, b: &str) -> Ordering {
    fn literal_prefix_len(key: &str) -> usize {
        key.find('*').unwrap_or(key.len())
    }
    let a_prefix = literal_prefix_len(a);
    let b_prefix = literal_prefix_len(b);
    b_prefix
        .cmp(&a_prefix)
        .then_with(|| a.contains('*').cmp(&b.contains('*')))
        .then_with(|| b.len().cmp(&a.len()))
}

fn is_expansion_key(key: &str) -> bool {
    key.contains('*') || key.ends_with('/')
}

impl Node {
    /// Builds a [Node] tree from a raw `simd_json` value, the parse phase
    /// described by spec.md's "Tree construction".
    pub fn parse(value: &JSONValue) -> Self {
        if let Some(s) = value.as_str() {
            return Self::String(s.to_string());
        }
        if let Some(arr) = value.as_array() {
            return Self::Array(arr.iter().map(Node::parse).collect());
        }
        if let Some(obj) = value.as_object() {
            return Self::parse_object(obj);
        }
        Self::Null
    }

    fn parse_object(obj: &JSONMap) -> Self {
        let mut entries = Vec::with_capacity(obj.len());
        let mut expansion_keys = Vec::new();
        let mut has_dotted = false;
        let mut has_undotted = false;

        for (key, value) in obj.iter() {
            let key = key.to_string();
            if key.starts_with('.') {
                has_dotted = true;
            } else {
                has_undotted = true;
            }
            if is_expansion_key(&key) {
                expansion_keys.push(key.clone());
            }
            entries.push(ObjectEntry { key, value: Node::parse(value) });
        }

        if has_dotted && has_undotted {
            return Self::Invalid;
        }

        expansion_keys.sort_by(|a, b| expansion_key_order(a, b));

        Self::Object { entries, expansion_keys, starts_with_dot: has_dotted }
    }

    /// Whether this node is an `Object` whose keys are subpaths (start with
    /// `.`) rather than condition names.
    pub fn is_subpath_map(&self) -> bool {
        matches!(self, Self::Object { starts_with_dot: true, .. })
    }

    /// The pattern-map resolver described by spec.md §4: exact-matches first,
    /// falling back to `expansionKeys` in specificity order.
    ///
    /// Returns `(target_node, matched_key, captured_pattern)` where
    /// `matched_key` is the `Object` key that matched (useful for reverse
    /// lookups and diagnostics) and `captured_pattern` is `Some(capture)` when
    /// a `*`-bearing key matched (the substring the `*` captured), or `None`
    /// for an exact match or a trailing-`/` match.
    pub fn match_subpath<'a>(&'a self, query: &str) -> Option<PatternMatch<'a>> {
        let Self::Object { entries, expansion_keys, .. } = self else {
            return None;
        };

        if !is_expansion_key(query) {
            if let Some(entry) = entries.iter().find(|e| e.key == query) {
                return Some(PatternMatch {
                    node: &entry.value,
                    key: &entry.key,
                    capture: None,
                    inexact: false,
                });
            }
        }

        for key in expansion_keys {
            let entry = entries.iter().find(|e| &e.key == key)?;
            if let Some((prefix, suffix)) = key.split_once('*') {
                if query.len() >= key.len() - 1
                    && query.starts_with(prefix)
                    && query.ends_with(suffix)
                {
                    let capture = &query[prefix.len()..query.len() - suffix.len()];
                    return Some(PatternMatch {
                        node: &entry.value,
                        key,
                        capture: Some(capture.to_string()),
                        inexact: false,
                    });
                }
            } else if key.ends_with('/') && query.starts_with(key.as_str()) {
                return Some(PatternMatch {
                    node: &entry.value,
                    key,
                    capture: Some(query[key.len()..].to_string()),
                    inexact: true,
                });
            }
        }

        None
    }

    /// Reverse resolution: given a concrete target string already produced by
    /// forward resolution (e.g. `"./dist/index.js"`), find the subpath key(s)
    /// of this (subpath-map) node that would forward-resolve to it.
    ///
    /// Used for diagnostics and source-to-export mapping; not part of the
    /// Node.js resolution algorithm itself, which never needs to run
    /// backwards.
    pub fn reverse_resolve(&self, target: &str) -> Vec<String> {
        let mut out = Vec::new();
        let Self::Object { entries, .. } = self else { return out };
        for entry in entries {
            match entry.value.leaf_capture_for(target) {
                Some(Some(capture)) if entry.key.contains('*') => {
                    out.push(entry.key.replace('*', &capture));
                }
                Some(Some(_)) => {}
                Some(None) => out.push(entry.key.clone()),
                None => {}
            }
        }
        out
    }

    /// Descends through condition objects and arrays -- the shapes that never
    /// contribute a subpath key of their own -- looking for a `String` leaf
    /// that produces `target`. Returns `Some(None)` for an exact match,
    /// `Some(Some(capture))` for a pattern match (the substring `*` would
    /// have captured), or `None` if no leaf under this node produces `target`.
    ///
    /// The outer subpath key is threaded down by the caller ([Self::reverse_resolve]),
    /// which pushes it only once a leaf match is found -- an inner condition
    /// key (e.g. `"import"`) or array index is never itself part of the
    /// result.
    fn leaf_capture_for(&self, target: &str) -> Option<Option<String>> {
        match self {
            Self::String(value) => {
                if value == target {
                    return Some(None);
                }
                let (prefix, suffix) = value.split_once('*')?;
                let capture = target.strip_prefix(prefix)?.strip_suffix(suffix)?;
                Some(Some(capture.to_string()))
            }
            Self::Object { entries, .. } => {
                // Condition maps: any branch could have produced `target`
                // depending on active conditions at resolve time.
                entries.iter().find_map(|e| e.value.leaf_capture_for(target))
            }
            Self::Array(items) => items.iter().find_map(|item| item.leaf_capture_for(target)),
            Self::Null | Self::Invalid => None,
        }
    }
}

/// Result of [Node::match_subpath].
pub struct PatternMatch<'a> {
    pub node: &'a Node,
    pub key: &'a str,
    /// The substring captured by `*`, or the remainder past a trailing-`/`
    /// key. `None` for an exact match.
    pub capture: Option<String>,
    /// A trailing-`/` match demotes an otherwise-exact result to inexact,
    /// signaling the caller may still need to probe extensions/index files.
    pub inexact: bool,
}

#[cfg(test)]
mod tests {
    use super::*;

    fn obj(pairs: &[(&str, Node)]) -> Node {
        Node::Object {
            entries: pairs.iter().map(|(k, v)| ObjectEntry { key: (*k).to_string(), value: v.clone() }).collect(),
            expansion_keys: {
                let mut keys: Vec<String> =
                    pairs.iter().map(|(k, _)| (*k).to_string()).filter(|k| is_expansion_key(k)).collect();
                keys.sort_by(|a, b| expansion_key_order(a, b));
                keys
            },
            starts_with_dot: pairs.iter().all(|(k, _)| k.starts_with('.')),
        }
    }

    #[test]
    fn expansion_key_order_prefers_longer_prefix() {
        let mut keys = vec!["./a/*".to_string(), "./ab/*".to_string()];
        keys.sort_by(|a, b| expansion_key_order(a, b));
        assert_eq!(keys, vec!["./ab/*", "./a/*"]);
    }

    #[test]
    fn expansion_key_order_prefers_no_star_on_tie() {
        let mut keys = vec!["./a*".to_string(), "./a/".to_string()];
        keys.sort_by(|a, b| expansion_key_order(a, b));
        // Both have literal prefix length 3 ("./a"); the non-star key wins.
        assert_eq!(keys[0], "./a/");
    }

    #[test]
    fn exact_match_wins_over_pattern() {
        let node = obj(&[
            ("./foo", Node::String("./exact.js".into())),
            ("./*", Node::String("./wild/*.js".into())),
        ]);
        let m = node.match_subpath("./foo").unwrap();
        assert_eq!(m.key, "./foo");
        assert!(m.capture.is_none());
    }

    #[test]
    fn pattern_capture() {
        let node = obj(&[("./features/*", Node::String("./lib/features/*.js".into()))]);
        let m = node.match_subpath("./features/a").unwrap();
        assert_eq!(m.capture.as_deref(), Some("a"));
    }

    #[test]
    fn trailing_slash_is_inexact() {
        let node = obj(&[("./dist/", Node::String("./build/".into()))]);
        let m = node.match_subpath("./dist/index").unwrap();
        assert!(m.inexact);
        assert_eq!(m.capture.as_deref(), Some("index"));
    }

    #[test]
    fn reverse_resolve_finds_literal_target() {
        let node = obj(&[
            (".", Node::String("./dist/index.js".into())),
            ("./pkg", Node::String("./dist/pkg.js".into())),
        ]);
        assert_eq!(node.reverse_resolve("./dist/pkg.js"), vec!["./pkg".to_string()]);
    }

    #[test]
    fn reverse_resolve_through_pattern() {
        let node = obj(&[("./features/*", Node::String("./lib/features/*.js".into()))]);
        assert_eq!(node.reverse_resolve("./lib/features/a.js"), vec!["./features/a".to_string()]);
    }

    #[test]
    fn reverse_resolve_through_condition_object_uses_outer_key() {
        let node = obj(&[(
            "./foo",
            obj(&[("import", Node::String("./foo.mjs".into())), ("require", Node::String("./foo.cjs".into()))]),
        )]);
        assert_eq!(node.reverse_resolve("./foo.mjs"), vec!["./foo".to_string()]);
        assert_eq!(node.reverse_resolve("./foo.cjs"), vec!["./foo".to_string()]);
    }

    #[test]
    fn reverse_resolve_through_array_of_strings() {
        let node = obj(&[(
            "./foo",
            Node::Array(vec![Node::String("./a.js".into()), Node::String("./b.js".into())]),
        )]);
        assert_eq!(node.reverse_resolve("./a.js"), vec!["./foo".to_string()]);
        assert_eq!(node.reverse_resolve("./b.js"), vec!["./foo".to_string()]);
    }

    #[test]
    fn mixed_keys_are_invalid() {
        // Build a raw simd_json object mixing "." and "import" keys.
        let mut bytes = br#"{".": "./a.js", "import": "./b.js"}"#.to_vec();
        let value = simd_json::to_borrowed_value(&mut bytes).unwrap();
        let node = Node::parse(&value);
        assert_eq!(node, Node::Invalid);
    }
}
