use crate::{ResolveError, ResolveOptions, ResolverGeneric};

use super::memory_fs::MemoryFS;

#[tokio::test]
async fn disabled_by_default() {
    let resolver = ResolverGeneric::new_with_file_system(MemoryFS::default(), ResolveOptions::default());
    let err = resolver.resolve("/", "zlib").await.unwrap_err();
    assert_eq!(err, ResolveError::NotFound("zlib".into()));
}

#[tokio::test]
async fn bare_and_node_prefixed_both_error_as_builtin() {
    let resolver = ResolverGeneric::new_with_file_system(
        MemoryFS::default(),
        ResolveOptions { builtin_modules: true, ..ResolveOptions::default() },
    );

    for (request, expected) in [
        ("fs", "node:fs"),
        ("node:fs", "node:fs"),
        ("path/posix", "node:path/posix"),
        ("node:path/posix", "node:path/posix"),
    ] {
        let err = resolver.resolve("/", request).await.unwrap_err();
        assert_eq!(err, ResolveError::Builtin(expected.into()), "{request}");
    }
}

#[tokio::test]
async fn unknown_specifier_still_not_found() {
    let resolver = ResolverGeneric::new_with_file_system(
        MemoryFS::default(),
        ResolveOptions { builtin_modules: true, ..ResolveOptions::default() },
    );
    let err = resolver.resolve("/", "totally-not-a-builtin").await.unwrap_err();
    assert_eq!(err, ResolveError::NotFound("totally-not-a-builtin".into()));
}

#[tokio::test]
async fn subpath_builtins_are_recognized() {
    let resolver = ResolverGeneric::new_with_file_system(
        MemoryFS::default(),
        ResolveOptions { builtin_modules: true, ..ResolveOptions::default() },
    );
    let err = resolver.resolve("/", "fs/promises").await.unwrap_err();
    assert_eq!(err, ResolveError::Builtin("node:fs/promises".into()));
}
