//! Compiles a `package.json` `"sideEffects"` field into something cheap to
//! query per resolved path, instead of re-interpreting the raw
//! bool/string/array value on every lookup.
//!
//! Glob compilation follows the rules the teacher's upstream (Node.js/
//! webpack's own `sideEffects` handling) settled on: literal patterns go into
//! a set for O(1) lookup, wildcard-bearing patterns are compiled to an
//! anchored regex once and reused.

use std::path::Path;

use rustc_hash::FxHashSet;

use crate::package_json::SideEffects;

/// Compiled form of a package's `"sideEffects"` field.
#[derive(Debug)]
pub enum SideEffectsMatcher {
    /// No `"sideEffects"` field: every file is assumed to have side effects.
    AllFiles,
    /// `"sideEffects": false`, or an array that compiled to nothing: no file
    /// in the package has side effects.
    NoFiles,
    /// `"sideEffects": [...]`: only files matching one of these patterns have
    /// side effects.
    Patterns { literals: FxHashSet<String>, regexes: Vec<regex::Regex> },
}

impl SideEffectsMatcher {
    /// Compiles `side_effects` (as read from a package.json) relative to
    /// `package_dir`, the directory containing that `package.json`.
    pub fn compile(side_effects: Option<&SideEffects>, package_dir: &Path) -> Self {
        match side_effects {
            None => Self::AllFiles,
            Some(SideEffects::Bool(true)) => Self::AllFiles,
            Some(SideEffects::Bool(false)) => Self::NoFiles,
            Some(SideEffects::String(pattern)) => Self::from_patterns(
                std::iter::once(pattern.as_str()),
                package_dir,
            ),
            Some(SideEffects::Array(patterns)) => {
                Self::from_patterns(patterns.iter().map(String::as_str), package_dir)
            }
        }
    }

    fn from_patterns<'a>(
        patterns: impl Iterator<Item = &'a str>,
        package_dir: &Path,
    ) -> Self {
        let mut literals = FxHashSet::default();
        let mut regexes = Vec::new();

        for pattern in patterns {
            // Entries without a path separator are a shorthand for "this
            // filename anywhere under the package", spelled `**/entry`.
            let pattern = if pattern.contains('/') {
                pattern.to_string()
            } else {
                format!("**/{pattern}")
            };
            let joined = package_dir
                .join(pattern.strip_prefix("./").unwrap_or(&pattern))
                .to_string_lossy()
                .replace('\\', "/");

            if pattern.contains('*') || pattern.contains('?') {
                if let Ok(re) = glob_to_regex(&joined) {
                    regexes.push(re);
                }
            } else {
                literals.insert(joined);
            }
        }

        if literals.is_empty() && regexes.is_empty() {
            Self::NoFiles
        } else {
            Self::Patterns { literals, regexes }
        }
    }

    /// Whether `path` (an absolute, resolved file path) has side effects
    /// according to this matcher.
    pub fn has_side_effects(&self, path: &Path) -> bool {
        match self {
            Self::AllFiles => true,
            Self::NoFiles => false,
            Self::Patterns { literals, regexes } => {
                let path_str = path.to_string_lossy().replace('\\', "/");
                literals.contains(path_str.as_str())
                    || regexes.iter().any(|re| re.is_match(&path_str))
            }
        }
    }
}

/// Compiles a glob into an anchored regex.
///
/// Rules: `\ ^ $ . + | ( ) [ ] { }` are literal-escaped. `?` maps to `.`. A
/// run of two or more `*` isolated by `/` or end-of-string (a "globstar")
/// matches `(?:[^/]*(?:/|$))*` and consumes the following `/`; any other run
/// of `*` matches `[^/]*`.
fn glob_to_regex(glob: &str) -> Result<regex::Regex, regex::Error> {
    let chars: Vec<char> = glob.chars().collect();
    let mut out = String::with_capacity(glob.len() + 8);
    out.push('^');

    let mut i = 0;
    while i < chars.len() {
        let c = chars[i];
        match c {
            '*' => {
                let start = i;
                while i < chars.len() && chars[i] == '*' {
                    i += 1;
                }
                let run_len = i - start;
                let preceded_by_slash_or_start = start == 0 || chars[start - 1] == '/';
                let followed_by_slash_or_end = i == chars.len() || chars[i] == '/';

                if run_len >= 2 && preceded_by_slash_or_start && followed_by_slash_or_end {
                    out.push_str("(?:[^/]*(?:/|$))*");
                    if i < chars.len() && chars[i] == '/' {
                        i += 1;
                    }
                } else {
                    out.push_str("[^/]*");
                }
                continue;
            }
            '?' => out.push('.'),
            '\\' | '^' | '$' | '.' | '+' | '|' | '(' | ')' | '[' | ']' | '{' | '}' => {
                out.push('\\');
                out.push(c);
            }
            _ => out.push(c),
        }
        i += 1;
    }

    out.push('$');
    regex::Regex::new(&out)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::path::PathBuf;

    #[test]
    fn no_field_means_all_files() {
        let matcher = SideEffectsMatcher::compile(None, Path::new("/pkg"));
        assert!(matcher.has_side_effects(Path::new("/pkg/anything.js")));
    }

    #[test]
    fn false_means_no_files() {
        let matcher =
            SideEffectsMatcher::compile(Some(&SideEffects::Bool(false)), Path::new("/pkg"));
        assert!(!matcher.has_side_effects(Path::new("/pkg/anything.js")));
    }

    #[test]
    fn literal_entry_without_slash_becomes_globstar() {
        let side_effects = SideEffects::Array(vec!["foo.css".to_string()]);
        let matcher = SideEffectsMatcher::compile(Some(&side_effects), Path::new("/pkg"));
        assert!(matcher.has_side_effects(&PathBuf::from("/pkg/nested/dir/foo.css")));
        assert!(!matcher.has_side_effects(&PathBuf::from("/pkg/nested/dir/bar.css")));
    }

    #[test]
    fn literal_pattern_with_slash_matches_exactly() {
        let side_effects = SideEffects::Array(vec!["./src/polyfill.js".to_string()]);
        let matcher = SideEffectsMatcher::compile(Some(&side_effects), Path::new("/pkg"));
        assert!(matcher.has_side_effects(&PathBuf::from("/pkg/src/polyfill.js")));
        assert!(!matcher.has_side_effects(&PathBuf::from("/pkg/src/other.js")));
    }

    #[test]
    fn wildcard_pattern_matches_within_directory() {
        let side_effects = SideEffects::Array(vec!["./styles/*.css".to_string()]);
        let matcher = SideEffectsMatcher::compile(Some(&side_effects), Path::new("/pkg"));
        assert!(matcher.has_side_effects(&PathBuf::from("/pkg/styles/a.css")));
        assert!(!matcher.has_side_effects(&PathBuf::from("/pkg/styles/nested/a.css")));
    }
}
