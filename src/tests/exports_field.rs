//! `package.json` "exports" field resolution.
//!
//! <https://nodejs.org/api/packages.html#exports>

use crate::{ResolveError, ResolveOptions, ResolverGeneric};

use super::memory_fs::MemoryFS;

#[tokio::test]
async fn pattern_key_expands_to_matching_file() {
    let fs = MemoryFS::new(&[
        (
            "/project/node_modules/pkg/package.json",
            r#"{"exports": {"./feature/*": "./src/features/*.js"}}"#,
        ),
        ("/project/node_modules/pkg/src/features/foo.js", ""),
    ]);
    let resolver = ResolverGeneric::new_with_file_system(fs, ResolveOptions::default());

    let resolution = resolver.resolve("/project", "pkg/feature/foo").await.unwrap();
    assert_eq!(
        resolution.path(),
        std::path::Path::new("/project/node_modules/pkg/src/features/foo.js")
    );
}

fn condition_map_fixture() -> &'static [(&'static str, &'static str)] {
    &[
        (
            "/project/node_modules/pkg/package.json",
            r#"{"exports": {".": {"import": "./esm.js", "require": "./cjs.js", "default": "./cjs.js"}}}"#,
        ),
        ("/project/node_modules/pkg/esm.js", ""),
        ("/project/node_modules/pkg/cjs.js", ""),
    ]
}

#[tokio::test]
async fn condition_order_decides_between_alternatives() {
    let require_resolver = ResolverGeneric::new_with_file_system(
        MemoryFS::new(condition_map_fixture()),
        ResolveOptions { condition_names: vec!["require".into()], ..ResolveOptions::default() },
    );
    let resolution = require_resolver.resolve("/project", "pkg").await.unwrap();
    assert_eq!(resolution.path(), std::path::Path::new("/project/node_modules/pkg/cjs.js"));

    let import_resolver = ResolverGeneric::new_with_file_system(
        MemoryFS::new(condition_map_fixture()),
        ResolveOptions { condition_names: vec!["import".into()], ..ResolveOptions::default() },
    );
    let resolution = import_resolver.resolve("/project", "pkg").await.unwrap();
    assert_eq!(resolution.path(), std::path::Path::new("/project/node_modules/pkg/esm.js"));
}

#[tokio::test]
async fn no_matching_condition_and_no_default_is_not_exported() {
    let fs = MemoryFS::new(&[
        (
            "/project/node_modules/pkg/package.json",
            r#"{"exports": {".": {"import": "./esm.js"}}}"#,
        ),
        ("/project/node_modules/pkg/esm.js", ""),
    ]);
    let resolver = ResolverGeneric::new_with_file_system(
        fs,
        ResolveOptions { condition_names: vec!["require".into()], ..ResolveOptions::default() },
    );

    let err = resolver.resolve("/project", "pkg").await.unwrap_err();
    assert_eq!(
        err,
        ResolveError::PackagePathNotExported(
            ".".into(),
            "/project/node_modules/pkg/package.json".into()
        )
    );
}

#[tokio::test]
async fn percent_encoded_slash_in_target_is_rejected() {
    let fs = MemoryFS::new(&[(
        "/project/node_modules/pkg/package.json",
        r#"{"exports": {".": "./dist/%2Findex.js"}}"#,
    )]);
    let resolver = ResolverGeneric::new_with_file_system(fs, ResolveOptions::default());

    let err = resolver.resolve("/project", "pkg").await.unwrap_err();
    assert_eq!(
        err,
        ResolveError::InvalidPackageTarget(
            "./dist/%2Findex.js".into(),
            ".".into(),
            "/project/node_modules/pkg/package.json".into()
        )
    );
}

#[tokio::test]
async fn subpath_outside_of_exports_map_is_not_exported() {
    let fs = MemoryFS::new(&[
        ("/project/node_modules/pkg/package.json", r#"{"exports": {".": "./index.js"}}"#),
        ("/project/node_modules/pkg/index.js", ""),
        ("/project/node_modules/pkg/secret.js", ""),
    ]);
    let resolver = ResolverGeneric::new_with_file_system(fs, ResolveOptions::default());

    let err = resolver.resolve("/project", "pkg/secret.js").await.unwrap_err();
    assert_eq!(
        err,
        ResolveError::PackagePathNotExported(
            "./secret.js".into(),
            "/project/node_modules/pkg/package.json".into()
        )
    );
}

#[tokio::test]
async fn reverse_resolve_finds_the_specifier_for_a_resolved_target() {
    let fs = MemoryFS::new(&[
        (
            "/project/node_modules/pkg/package.json",
            r#"{"exports": {"./feature/*": "./src/features/*.js"}}"#,
        ),
        ("/project/node_modules/pkg/src/features/foo.js", ""),
    ]);
    let resolver = ResolverGeneric::new_with_file_system(fs, ResolveOptions::default());

    let resolution = resolver.resolve("/project", "pkg/feature/foo").await.unwrap();
    let package_json = resolution.package_json().unwrap();
    let specifiers = package_json.reverse_resolve_export("./src/features/foo.js");
    assert_eq!(specifiers, vec!["./feature/foo".to_string()]);
}
