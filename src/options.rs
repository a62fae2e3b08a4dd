use std::{collections::HashMap, fmt, path::PathBuf, sync::Arc};

/// Alias map for [ResolveOptions::alias] / [ResolveOptions::fallback].
///
/// Key order matters: the first matching key wins.
pub type Alias = Vec<(String, Vec<AliasValue>)>;

/// A single alias target.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AliasValue {
    /// Fall through to this path/specifier instead.
    Path(String),
    /// Fail the resolution with [crate::ResolveError::Ignored].
    Ignore,
}

/// Whether resolved files require an explicit extension.
///
/// <https://github.com/webpack/enhanced-resolve/pull/285>
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum EnforceExtension {
    /// Enabled when [ResolveOptions::extensions] contains an empty string.
    #[default]
    Auto,
    Enabled,
    Disabled,
}

impl EnforceExtension {
    pub fn is_auto(self) -> bool {
        self == Self::Auto
    }

    pub fn is_enabled(self) -> bool {
        self == Self::Enabled
    }

    pub fn is_disabled(self) -> bool {
        self == Self::Disabled
    }
}

/// A single entry of [ResolveOptions::restrictions].
#[derive(Clone)]
pub enum Restriction {
    /// Resolved path must be inside this directory.
    Path(PathBuf),
    /// Resolved path must satisfy this predicate.
    Fn(Arc<dyn Fn(&std::path::Path) -> bool + Send + Sync>),
}

impl From<&str> for AliasValue {
    fn from(value: &str) -> Self {
        Self::Path(value.to_string())
    }
}

impl From<String> for AliasValue {
    fn from(value: String) -> Self {
        Self::Path(value)
    }
}

impl fmt::Debug for Restriction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Path(path) => f.debug_tuple("Path").field(path).finish(),
            Self::Fn(_) => f.write_str("Fn(..)"),
        }
    }
}

impl PartialEq for Restriction {
    fn eq(&self, other: &Self) -> bool {
        match (self, other) {
            (Self::Path(a), Self::Path(b)) => a == b,
            (Self::Fn(a), Self::Fn(b)) => Arc::ptr_eq(a, b),
            _ => false,
        }
    }
}
impl Eq for Restriction {}

/// Support for Typescript Project References, see [TsconfigOptions::references].
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub enum TsconfigReferences {
    /// Do not resolve project references.
    #[default]
    Disabled,
    /// Use the `references` field from the tsconfig at [TsconfigOptions::config_file].
    Auto,
    /// Manually provided relative or absolute paths.
    Paths(Vec<PathBuf>),
}

/// Tsconfig Options
///
/// Derived from [tsconfig-paths-webpack-plugin](https://github.com/dividab/tsconfig-paths-webpack-plugin#options)
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TsconfigOptions {
    /// Path to the TypeScript configuration file, relative to cwd or absolute.
    pub config_file: PathBuf,

    /// Support for Typescript Project References.
    pub references: TsconfigReferences,
}

/// Module Resolution Options
///
/// Options are directly ported from [enhanced-resolve](https://github.com/webpack/enhanced-resolve#resolver-options).
///
/// See [webpack resolve](https://webpack.js.org/configuration/resolve/) for information and examples.
#[derive(Debug, Clone)]
pub struct ResolveOptions {
    /// Path to TypeScript configuration file.
    ///
    /// Default `None`
    pub tsconfig: Option<TsconfigOptions>,

    /// Create aliases to import or require certain modules more easily.
    /// A trailing `$` can also be added to the given object's keys to signify an exact match.
    ///
    /// Default `[]`
    pub alias: Alias,

    /// A list of alias fields in description files.
    /// Specify a field, such as `browser`, to be parsed according to [this specification](https://github.com/defunctzombie/package-browser-field-spec).
    /// Can be a path to a JSON object such as `["path", "to", "exports"]`.
    ///
    /// Default `[]`
    pub alias_fields: Vec<Vec<String>>,

    /// Condition names for the exports field which defines entry points of a package.
    /// The key order in the exports field is significant; earlier entries take precedence.
    ///
    /// Default `[]`
    pub condition_names: Vec<String>,

    /// The JSON files to use for descriptions. (There was once a `bower.json`.)
    ///
    /// Default `["package.json"]`
    pub description_files: Vec<String>,

    /// If true, it will not allow extension-less files.
    /// So by default `require('./foo')` works if `./foo` has a `.js` extension,
    /// but with this enabled only `require('./foo.js')` will work.
    ///
    /// Default `Auto`, resolved to `Enabled` in [Self::sanitize] when
    /// [Self::extensions] contains an empty string.
    pub enforce_extension: EnforceExtension,

    /// A list of exports fields in description files.
    ///
    /// Default `[["exports"]]`.
    pub exports_fields: Vec<Vec<String>>,

    /// Fields from `package.json` which are used to provide the internal requests of a package
    /// (requests starting with `#` are considered internal).
    ///
    /// Default `[["imports"]]`.
    pub imports_fields: Vec<Vec<String>>,

    /// An object which maps extension to extension aliases.
    ///
    /// Default `{}`
    pub extension_alias: Vec<(String, Vec<String>)>,

    /// Attempt to resolve these extensions in order.
    /// If multiple files share the same name but have different extensions,
    /// the one with the extension listed first in the array wins and the rest are skipped.
    ///
    /// Default `[".js", ".json", ".node"]`
    pub extensions: Vec<String>,

    /// Redirect module requests when normal resolving fails.
    ///
    /// Default `[]`
    pub fallback: Alias,

    /// Request passed to resolve is already fully specified and extensions or main files
    /// are not resolved for it (they are still resolved for internal requests).
    ///
    /// See also webpack configuration [resolve.fullySpecified](https://webpack.js.org/configuration/module/#resolvefullyspecified)
    ///
    /// Default `false`
    pub fully_specified: bool,

    /// A list of main fields in description files.
    ///
    /// Default `["main"]`.
    pub main_fields: Vec<String>,

    /// The filename to be used while resolving directories.
    ///
    /// Default `["index"]`
    pub main_files: Vec<String>,

    /// A list of directories to resolve modules from, can be an absolute path or a folder name.
    ///
    /// Default `["node_modules"]`
    pub modules: Vec<String>,

    /// Resolve to a context (directory) instead of a file.
    ///
    /// Default `false`
    pub resolve_to_context: bool,

    /// Prefer to resolve module requests as relative requests instead of using modules
    /// from `node_modules` directories.
    ///
    /// Default `false`
    pub prefer_relative: bool,

    /// Prefer to resolve server-relative urls as absolute paths before falling back to
    /// resolve in [Self::roots].
    ///
    /// Default `false`
    pub prefer_absolute: bool,

    /// A list of resolve restrictions to restrict the paths that a request can be resolved on.
    ///
    /// Default `[]`
    pub restrictions: Vec<Restriction>,

    /// A list of directories where requests of server-relative URLs (starting with `/`) are resolved.
    /// On non-Windows systems these requests are resolved as an absolute path first.
    ///
    /// Default `[]`
    pub roots: Vec<PathBuf>,

    /// Whether to resolve symlinks to their symlinked location.
    /// When enabled, symlinked resources are resolved to their real path, not their symlinked location.
    /// Note that this may cause module resolution to fail when using tools that symlink packages (like npm link).
    ///
    /// Default `true`
    pub symlinks: bool,

    /// Whether to parse [module.builtinModules](https://nodejs.org/api/module.html#modulebuiltinmodules) or not.
    /// For example, `"zlib"` will throw [crate::ResolveError::Builtin] when set to true.
    ///
    /// Default `false`
    pub builtin_modules: bool,

    /// Whether to enable Yarn Plug'n'Play resolution.
    ///
    /// Default `false`
    #[cfg(feature = "yarn_pnp")]
    pub enable_pnp: bool,
}

impl Default for ResolveOptions {
    fn default() -> Self {
        Self {
            tsconfig: None,
            alias: vec![],
            alias_fields: vec![],
            condition_names: vec![],
            description_files: vec!["package.json".into()],
            enforce_extension: EnforceExtension::Auto,
            exports_fields: vec![vec!["exports".into()]],
            imports_fields: vec![vec!["imports".into()]],
            extension_alias: vec![],
            extensions: vec![".js".into(), ".json".into(), ".node".into()],
            fallback: vec![],
            fully_specified: false,
            main_fields: vec!["main".into()],
            main_files: vec!["index".into()],
            modules: vec!["node_modules".into()],
            resolve_to_context: false,
            prefer_relative: false,
            prefer_absolute: false,
            restrictions: vec![],
            roots: vec![],
            symlinks: true,
            builtin_modules: false,
            #[cfg(feature = "yarn_pnp")]
            enable_pnp: false,
        }
    }
}

impl ResolveOptions {
    /// Normalizes cross-field defaults, called once by [crate::ResolverGeneric::new].
    #[must_use]
    pub(crate) fn sanitize(mut self) -> Self {
        if self.enforce_extension.is_auto() {
            self.enforce_extension = if self.extensions.iter().any(String::is_empty) {
                EnforceExtension::Enabled
            } else {
                EnforceExtension::Disabled
            };
        }
        self
    }
}

/// Internal string-or-list convenience used when converting embedder-facing
/// configuration (e.g. an `napi` or JSON driver layer) into [ResolveOptions]
/// fields such as [ResolveOptions::main_fields] or [ResolveOptions::modules].
pub enum StrOrStrList {
    One(String),
    Many(Vec<String>),
}

impl From<StrOrStrList> for Vec<String> {
    fn from(value: StrOrStrList) -> Self {
        match value {
            StrOrStrList::One(s) => vec![s],
            StrOrStrList::Many(v) => v,
        }
    }
}

/// Converts a `{alias: [Option<String>]}`-shaped config map (`None` meaning
/// "ignore this specifier") into [Alias].
pub fn alias_from_map(map: HashMap<String, Vec<Option<String>>>) -> Alias {
    map.into_iter()
        .map(|(key, values)| {
            let values = values
                .into_iter()
                .map(|v| v.map_or(AliasValue::Ignore, AliasValue::Path))
                .collect();
            (key, values)
        })
        .collect()
}
