use std::path::PathBuf;

use thiserror::Error;

/// All the errors from this crate.
///
/// Most errors are named after the terminology used in the
/// [Node.js Resolution Algorithm](https://nodejs.org/api/modules.html#all-together).
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum ResolveError {
    /// Ignored path
    ///
    /// This is returned when [ResolveOptions::alias] or [ResolveOptions::fallback] value is set to false.
    #[error("Path is ignored: {0}")]
    Ignored(PathBuf),

    /// Path not found
    #[error("Cannot find module '{0}'")]
    NotFound(String),

    /// Node.js builtin module, e.g. `node:zlib` when [ResolveOptions::builtin_modules] is enabled.
    #[error("Builtin module: {0}")]
    Builtin(String),

    /// Tsconfig not found
    #[error("Cannot find tsconfig at '{0}'")]
    TsconfigNotFound(PathBuf),

    /// A tsconfig's `extends` references itself.
    #[error("Tsconfig circular extend '{0}'")]
    TsconfigSelfReference(PathBuf),

    /// `package.json` or `tsconfig.json` parse error.
    #[error("{0}")]
    JSON(JSONError),

    /// `package.json` "exports" field has both keys starting and not starting with ".".
    #[error("Export field key can't mixed relative path and module name in {0}")]
    InvalidPackageConfig(PathBuf),

    /// Deprecated `"exports": { "./": "./dist/" }` folder mapping.
    #[error("Expecting folder to folder mapping, found package path '{0}' mapping to a module")]
    InvalidPackageConfigDirectory(PathBuf),

    /// `package.json` "exports" field does not contain the subpath being requested.
    #[error("Package path {0} is not exported in {1}")]
    PackagePathNotExported(String, PathBuf),

    /// Target resolved by `exports`/`imports` is outside of the package boundary, or otherwise invalid.
    #[error("Invalid \"exports\" target \"{0}\" defined for \"{1}\" in the package config {2}")]
    InvalidPackageTarget(String, String, PathBuf),

    /// A `#specifier` used with the "imports" field had an invalid shape (e.g. exactly "#" or starting with "#/").
    #[error("Invalid module \"{0}\" specifier is not a valid subpath for the \"imports\" resolution of the package at {1}")]
    InvalidModuleSpecifier(String, PathBuf),

    /// `package.json` "imports" field does not define a match for a `#specifier`.
    #[error("Package import {0} is not defined in {1}")]
    PackageImportNotDefined(String, PathBuf),

    /// All values in [ResolveOptions::alias] or [ResolveOptions::fallback] failed to resolve.
    #[error("Cannot resolve '{0}' with alias '{1}'")]
    MatchedAliasNotFound(String, String),

    /// None of the aliased extensions from [ResolveOptions::extension_alias] were found.
    #[error("Cannot resolve extension alias '{0}' from '{1}' in '{2}'")]
    ExtensionAlias(String, String, PathBuf),

    /// Infinite recursion detected while following `require`/browser field/alias chains.
    #[error("Recursion detected")]
    Recursion,

    /// A malformed `#fragment`/`?query` specifier.
    #[error("{0}")]
    Specifier(SpecifierError),

    /// An I/O error that is not a "file not found".
    #[error("IO error: {0}")]
    IOError(String),

    /// Yarn PnP: the specifier names a dependency the issuing package never
    /// declared, and no top-level fallback resolved it either.
    #[cfg(feature = "yarn_pnp")]
    #[error("Dependency not found for '{0}' via Yarn PnP")]
    PnpDependencyNotFound(String),

    /// Yarn PnP: the specifier names a peer dependency the issuing package
    /// declares, but nothing in the dependency tree provides a reference for it.
    #[cfg(feature = "yarn_pnp")]
    #[error("Unfulfilled peer dependency on '{0}' via Yarn PnP")]
    PnpUnfulfilledPeerDependency(String),

    /// Yarn PnP: `RESOLVE_TO_UNQUALIFIED` failed for a reason other than the two
    /// cases above (malformed manifest, corrupted archive, and the like).
    #[cfg(feature = "yarn_pnp")]
    #[error("Yarn PnP resolution error for '{0}': {1}")]
    PnpResolutionError(String, String),
}

impl ResolveError {
    /// Returns `true` when the error should not be swallowed by `fallback`/`alias` retry logic.
    pub fn is_ignore(&self) -> bool {
        matches!(self, Self::Ignored(_))
    }

    pub fn from_serde_json_error(
        path: PathBuf,
        error: &serde_json::Error,
        content: Option<String>,
    ) -> Self {
        Self::JSON(JSONError {
            path,
            message: error.to_string(),
            line: error.line(),
            column: error.column(),
            content,
        })
    }
}

impl From<std::io::Error> for ResolveError {
    fn from(error: std::io::Error) -> Self {
        Self::IOError(error.to_string())
    }
}

/// A `package.json` or `tsconfig.json` JSON parse failure, with enough context
/// (line/column plus the original content) for a CLI to render a caret diagnostic.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct JSONError {
    pub path: PathBuf,
    pub message: String,
    pub line: usize,
    pub column: usize,
    pub content: Option<String>,
}

impl std::fmt::Display for JSONError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "{} in {} at line {}, column {}",
            self.message,
            self.path.display(),
            self.line,
            self.column
        )
    }
}

/// A malformed request string, e.g. `require("\0#fragment")`.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum SpecifierError {
    #[error("Specifier \"{0}\" is empty")]
    Empty(String),
}
