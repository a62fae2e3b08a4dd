use std::path::{Component, Path, PathBuf};

/// Characters that can start a "rooted" request fragment, used when trimming
/// the leading slash off a specifier tail (e.g. `roots` resolution, alias
/// tail concatenation). Node accepts both separators when normalizing
/// specifiers on Windows.
pub const SLASH_START: &[char] = &['/', '\\'];

pub trait PathUtil {
    /// Normalizes `.`/`..` components away, without touching the file system
    /// (unlike [Path::canonicalize]).
    fn normalize(&self) -> PathBuf;

    /// Joins `self` with `path` and normalizes the result.
    fn normalize_with<P: AsRef<Path>>(&self, path: P) -> PathBuf;

    /// Whether this (already-normalized-relative) exports/imports target
    /// contains a segment that must never appear in a resolved target:
    /// an empty segment, `.`, `..`, or `node_modules` -- including common
    /// percent-encoded spellings of `.`/`/`/`\`.
    ///
    /// <https://nodejs.org/api/esm.html#resolution-algorithm-specification>
    fn is_invalid_exports_target(&self) -> bool;
}

impl PathUtil for Path {
    fn normalize(&self) -> PathBuf {
        let mut components = Vec::new();
        for component in self.components() {
            match component {
                Component::ParentDir => {
                    match components.last() {
                        Some(Component::Normal(_)) => {
                            components.pop();
                        }
                        _ => components.push(component),
                    }
                }
                Component::CurDir => {}
                _ => components.push(component),
            }
        }
        components.iter().collect()
    }

    fn normalize_with<P: AsRef<Path>>(&self, path: P) -> PathBuf {
        let path = path.as_ref();
        if path.is_absolute() {
            return path.normalize();
        }
        let mut components = self.components().collect::<Vec<_>>();
        for component in path.components() {
            match component {
                Component::ParentDir => {
                    match components.last() {
                        Some(Component::Normal(_)) => {
                            components.pop();
                        }
                        _ => components.push(component),
                    }
                }
                Component::CurDir => {}
                _ => components.push(component),
            }
        }
        components.iter().collect()
    }

    fn is_invalid_exports_target(&self) -> bool {
        const FORBIDDEN_ENCODED: [&str; 6] = ["%2e", "%2E", "%2f", "%2F", "%5c", "%5C"];
        for component in self.components() {
            let Component::Normal(segment) = component else { continue };
            let Some(segment) = segment.to_str() else { return true };
            if segment.is_empty()
                || segment == "."
                || segment == ".."
                || segment.eq_ignore_ascii_case("node_modules")
            {
                return true;
            }
            if FORBIDDEN_ENCODED.iter().any(|needle| segment.contains(needle)) {
                return true;
            }
        }
        false
    }
}
