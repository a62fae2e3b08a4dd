//! <https://github.com/webpack/enhanced-resolve/blob/main/test/extension-alias.test.js>

use crate::{ResolveError, ResolveOptions, ResolverGeneric};

use super::memory_fs::MemoryFS;

fn fixture() -> MemoryFS {
    MemoryFS::new(&[
        ("/project/index.js", ""),
        ("/project/index.ts", ""),
        ("/project/dir/index.js", ""),
        ("/project/dir/index.ts", ""),
        ("/project/dir2/index.js", ""),
        ("/project/dir2/index.mts", ""),
    ])
}

fn options() -> ResolveOptions {
    ResolveOptions {
        extensions: vec![".js".into()],
        main_files: vec!["index.js".into()],
        extension_alias: vec![
            (".js".into(), vec![".ts".into(), ".js".into()]),
            (".mjs".into(), vec![".mts".into()]),
        ],
        ..ResolveOptions::default()
    }
}

#[tokio::test]
async fn aliases_a_fully_specified_file() {
    let resolver = ResolverGeneric::new_with_file_system(fixture(), options());
    let resolution = resolver.resolve("/project", "./index.js").await.unwrap();
    assert_eq!(resolution.path(), std::path::Path::new("/project/index.ts"));
}

#[tokio::test]
async fn aliases_a_fully_specified_file_with_two_alternatives() {
    let resolver = ResolverGeneric::new_with_file_system(fixture(), options());
    let resolution = resolver.resolve("/project", "./dir/index.js").await.unwrap();
    assert_eq!(resolution.path(), std::path::Path::new("/project/dir/index.ts"));
}

#[tokio::test]
async fn falls_through_to_the_second_alternative() {
    let resolver = ResolverGeneric::new_with_file_system(fixture(), options());
    let resolution = resolver.resolve("/project", "./dir2/index.js").await.unwrap();
    assert_eq!(resolution.path(), std::path::Path::new("/project/dir2/index.js"));
}

#[tokio::test]
async fn supports_an_alias_without_an_array_alternative() {
    let resolver = ResolverGeneric::new_with_file_system(fixture(), options());
    let resolution = resolver.resolve("/project", "./dir2/index.mjs").await.unwrap();
    assert_eq!(resolution.path(), std::path::Path::new("/project/dir2/index.mts"));
}

#[tokio::test]
async fn does_not_fall_back_to_the_original_extension() {
    let resolver = ResolverGeneric::new_with_file_system(fixture(), options());
    let err = resolver.resolve("/project", "./index.mjs").await.unwrap_err();
    assert_eq!(
        err,
        ResolveError::ExtensionAlias("index.mjs".into(), "index.mts".into(), "/project".into())
    );
}

#[tokio::test]
async fn not_applied_to_extensions_or_main_files_option() {
    let resolver = ResolverGeneric::new_with_file_system(
        MemoryFS::new(&[("/project/dir2/index.js", "")]),
        ResolveOptions {
            extensions: vec![".js".into()],
            main_files: vec!["index.js".into()],
            extension_alias: vec![(".js".into(), vec![])],
            ..ResolveOptions::default()
        },
    );

    let resolution = resolver.resolve("/project", "./dir2").await.unwrap();
    assert_eq!(resolution.path(), std::path::Path::new("/project/dir2/index.js"));

    let resolution = resolver.resolve("/project", "./dir2/index").await.unwrap();
    assert_eq!(resolution.path(), std::path::Path::new("/project/dir2/index.js"));
}
