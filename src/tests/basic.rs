//! Baseline CommonJS resolution: relative files, directories with an
//! `index`, and `node_modules` lookups driven by the "main" field.

use crate::{ResolveError, ResolveOptions, ResolverGeneric};

use super::memory_fs::MemoryFS;

#[tokio::test]
async fn relative_file_with_extension() {
    let fs = MemoryFS::new(&[("/src/index.js", "1"), ("/src/foo.js", "2")]);
    let resolver = ResolverGeneric::new_with_file_system(fs, ResolveOptions::default());

    let resolution = resolver.resolve("/src", "./foo.js").await.unwrap();
    assert_eq!(resolution.path(), std::path::Path::new("/src/foo.js"));
}

#[tokio::test]
async fn relative_file_without_extension_tries_extensions_in_order() {
    let fs = MemoryFS::new(&[("/src/foo.json", "{}"), ("/src/foo.js", "2")]);
    let resolver = ResolverGeneric::new_with_file_system(fs, ResolveOptions::default());

    // `.js` is listed before `.json` in the default extensions, so it wins.
    let resolution = resolver.resolve("/src", "./foo").await.unwrap();
    assert_eq!(resolution.path(), std::path::Path::new("/src/foo.js"));
}

#[tokio::test]
async fn directory_resolves_to_index() {
    let fs = MemoryFS::new(&[("/src/dir/index.js", "1")]);
    let resolver = ResolverGeneric::new_with_file_system(fs, ResolveOptions::default());

    let resolution = resolver.resolve("/src", "./dir").await.unwrap();
    assert_eq!(resolution.path(), std::path::Path::new("/src/dir/index.js"));
}

#[tokio::test]
async fn node_modules_lookup_uses_main_field() {
    let fs = MemoryFS::new(&[
        ("/project/node_modules/pkg/package.json", r#"{"main": "./lib/entry.js"}"#),
        ("/project/node_modules/pkg/lib/entry.js", "module.exports = 1;"),
        ("/project/src/index.js", ""),
    ]);
    let resolver = ResolverGeneric::new_with_file_system(fs, ResolveOptions::default());

    let resolution = resolver.resolve("/project/src", "pkg").await.unwrap();
    assert_eq!(resolution.path(), std::path::Path::new("/project/node_modules/pkg/lib/entry.js"));
    assert!(resolution.inside_node_modules());
}

#[tokio::test]
async fn node_modules_lookup_walks_up_ancestors() {
    let fs = MemoryFS::new(&[
        ("/project/node_modules/pkg/package.json", r#"{"main": "index.js"}"#),
        ("/project/node_modules/pkg/index.js", ""),
    ]);
    let resolver = ResolverGeneric::new_with_file_system(fs, ResolveOptions::default());

    // No node_modules directly under /project/src/nested, so the lookup
    // should walk up to /project/node_modules.
    let resolution = resolver.resolve("/project/src/nested", "pkg").await.unwrap();
    assert_eq!(resolution.path(), std::path::Path::new("/project/node_modules/pkg/index.js"));
}

#[tokio::test]
async fn missing_module_is_not_found() {
    let fs = MemoryFS::new(&[("/src/index.js", "")]);
    let resolver = ResolverGeneric::new_with_file_system(fs, ResolveOptions::default());

    let err = resolver.resolve("/src", "./missing").await.unwrap_err();
    assert_eq!(err, ResolveError::NotFound("./missing".into()));
}

#[tokio::test]
async fn query_and_fragment_are_split_off_the_path() {
    let fs = MemoryFS::new(&[("/src/foo.js", "")]);
    let resolver = ResolverGeneric::new_with_file_system(fs, ResolveOptions::default());

    let resolution = resolver.resolve("/src", "./foo.js?raw#frag").await.unwrap();
    assert_eq!(resolution.path(), std::path::Path::new("/src/foo.js"));
    assert_eq!(resolution.query(), Some("?raw"));
    assert_eq!(resolution.fragment(), Some("#frag"));
}
