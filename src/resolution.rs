use std::{path::PathBuf, sync::Arc};

use crate::{ModuleType, PackageJson, SideEffects};

/// The final result of a [crate::ResolverGeneric::resolve] call.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Resolution {
    pub(crate) path: PathBuf,

    /// The `?query` part, if any, e.g. `?foo` in `const a = require('./a.js?foo')`
    pub(crate) query: Option<String>,

    /// The `#fragment` part, if any, e.g. `#foo` in `const a = require('./a.js#foo')`
    pub(crate) fragment: Option<String>,

    /// The closest `package.json` enclosing the resolved path, if any.
    pub(crate) package_json: Option<Arc<PackageJson>>,

    /// `compilerOptions.jsxFactory` of the tsconfig in effect for this resolution,
    /// when [ResolveOptions::tsconfig] is configured.
    pub(crate) jsx_factory: Option<String>,

    /// `compilerOptions.jsxFragmentFactory` of the tsconfig in effect for this resolution.
    pub(crate) jsx_fragment_factory: Option<String>,

    /// `compilerOptions.useDefineForClassFields` of the tsconfig in effect for this resolution.
    pub(crate) use_define_for_class_fields: Option<bool>,
}

impl Resolution {
    /// The resolved absolute path.
    ///
    /// * Path does not contain the [Self::query] and [Self::fragment].
    /// * This path may not be the real path (symlinks are not resolved) unless `symlinks` is disabled in [ResolveOptions].
    pub fn path(&self) -> &std::path::Path {
        &self.path
    }

    /// Consumes this [Resolution] and returns its path.
    pub fn into_path_buf(self) -> PathBuf {
        self.path
    }

    pub fn query(&self) -> Option<&str> {
        self.query.as_deref()
    }

    pub fn fragment(&self) -> Option<&str> {
        self.fragment.as_deref()
    }

    /// The closest `package.json` enclosing the resolved path.
    pub fn package_json(&self) -> Option<&Arc<PackageJson>> {
        self.package_json.as_ref()
    }

    /// Whether this resolved path lives under a `node_modules` directory.
    ///
    /// Embedders (bundlers, linters) commonly use this to decide whether to
    /// apply different transform/lint rules to third-party code.
    pub fn inside_node_modules(&self) -> bool {
        self.path.components().any(|c| c.as_os_str() == "node_modules")
    }

    /// Whether this resolution is external to the resolving project, i.e. it
    /// was found via a `node_modules`/Yarn PnP lookup rather than a relative
    /// or `tsconfig`-aliased path within the project.
    pub fn is_external(&self) -> bool {
        self.inside_node_modules()
    }

    pub fn jsx_factory(&self) -> Option<&str> {
        self.jsx_factory.as_deref()
    }

    pub fn jsx_fragment_factory(&self) -> Option<&str> {
        self.jsx_fragment_factory.as_deref()
    }

    pub fn use_define_for_class_fields(&self) -> Option<bool> {
        self.use_define_for_class_fields
    }

    /// The effective module type (`"type"` field) of the enclosing package,
    /// defaulting to CommonJS when there is no enclosing `package.json`.
    pub fn module_type(&self) -> ModuleType {
        self.package_json.as_ref().and_then(|p| p.r#type).unwrap_or_default()
    }

    /// The enclosing package's `"sideEffects"` field, if declared.
    pub fn side_effects(&self) -> Option<&SideEffects> {
        self.package_json.as_ref().and_then(|p| p.side_effects.as_ref())
    }

    /// Whether this resolved path is considered to have side effects,
    /// consulting the enclosing package's compiled `"sideEffects"` matcher.
    /// Defaults to `true` (has side effects) when there's no enclosing
    /// `package.json`, matching the field's own "absent means all files have
    /// side effects" default.
    pub fn has_side_effects(&self) -> bool {
        self.package_json.as_ref().map_or(true, |p| p.has_side_effects(&self.path))
    }
}
