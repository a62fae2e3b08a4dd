use std::path::{Path, PathBuf};

use crate::ResolveError;

/// Maximum depth of `require`/browser-field/alias recursion before giving up.
///
/// Mirrors the cycle one would hit re-resolving through a `browser` field that
/// maps a module back to itself through a chain of aliases.
const MAX_RECURSION_DEPTH: u8 = 64;

/// Per-call resolution state threaded through the recursive `require` methods.
///
/// This is intentionally cheap to construct: a fresh [ResolveContext] is
/// created for every top-level [crate::ResolverGeneric::resolve] call, and
/// `Ctx::default()` is also used internally whenever a sub-resolution (e.g.
/// tsconfig paths, extended tsconfig lookups) must not leak its own query /
/// fragment / recursion state into the caller's.
#[derive(Debug, Default)]
pub struct ResolveContext {
    pub(crate) query: Option<String>,
    pub(crate) fragment: Option<String>,
    pub(crate) fully_specified: bool,
    pub(crate) resolving_alias: Option<String>,
    depth: u8,

    pub(crate) file_dependencies: Option<Vec<PathBuf>>,
    pub(crate) missing_dependencies: Option<Vec<PathBuf>>,
}

impl ResolveContext {
    pub(crate) fn init_file_dependencies(&mut self) {
        self.file_dependencies = Some(Vec::new());
        self.missing_dependencies = Some(Vec::new());
    }

    pub(crate) fn with_fully_specified(&mut self, fully_specified: bool) -> &mut Self {
        self.fully_specified = fully_specified;
        self
    }

    pub(crate) fn with_query_fragment(
        &mut self,
        query: Option<String>,
        fragment: Option<String>,
    ) -> &mut Self {
        self.query = query;
        self.fragment = fragment;
        self
    }

    pub(crate) fn with_resolving_alias(&mut self, alias: String) -> &mut Self {
        self.resolving_alias = Some(alias);
        self
    }

    pub(crate) fn add_file_dependency(&mut self, path: &Path) {
        if let Some(deps) = &mut self.file_dependencies {
            deps.push(path.to_path_buf());
        }
    }

    pub(crate) fn add_missing_dependency(&mut self, path: &Path) {
        if let Some(deps) = &mut self.missing_dependencies {
            deps.push(path.to_path_buf());
        }
    }

    /// Bumps and checks the recursion depth; called on every `require` entry.
    pub(crate) fn test_for_infinite_recursion(&mut self) -> Result<(), ResolveError> {
        self.depth += 1;
        if self.depth > MAX_RECURSION_DEPTH {
            return Err(ResolveError::Recursion);
        }
        Ok(())
    }
}
