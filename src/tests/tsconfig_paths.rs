//! `tsconfig.json` `baseUrl`/`paths` resolution.

use crate::{ResolveOptions, ResolverGeneric, TsconfigOptions, TsconfigReferences};

use super::memory_fs::MemoryFS;

fn with_tsconfig(config_file: &str) -> ResolveOptions {
    ResolveOptions {
        tsconfig: Some(TsconfigOptions {
            config_file: config_file.into(),
            references: TsconfigReferences::Disabled,
        }),
        ..ResolveOptions::default()
    }
}

#[tokio::test]
async fn base_url_join_is_tried_when_no_path_matches() {
    let fs = MemoryFS::new(&[
        ("/project/tsconfig.json", r#"{"compilerOptions": {"baseUrl": "./src"}}"#),
        ("/project/src/utils/helper.js", ""),
    ]);
    let resolver =
        ResolverGeneric::new_with_file_system(fs, with_tsconfig("/project/tsconfig.json"));

    let resolution = resolver.resolve("/project/src", "utils/helper").await.unwrap();
    assert_eq!(resolution.path(), std::path::Path::new("/project/src/utils/helper.js"));
}

#[tokio::test]
async fn longest_prefix_wins_among_competing_path_patterns() {
    let fs = MemoryFS::new(&[
        (
            "/project/tsconfig.json",
            r#"{"compilerOptions": {"baseUrl": "/project", "paths": {"@/*": ["src/*"], "@/lib/*": ["src/lib/*"]}}}"#,
        ),
        ("/project/src/lib/foo.js", ""),
        ("/project/src/foo.js", ""),
    ]);
    let resolver =
        ResolverGeneric::new_with_file_system(fs, with_tsconfig("/project/tsconfig.json"));

    // Both "@/*" -> "src/*" and "@/lib/*" -> "src/lib/*" match "@/lib/foo";
    // the longer literal prefix ("@/lib/") must be tried first.
    let resolution = resolver.resolve("/project", "@/lib/foo").await.unwrap();
    assert_eq!(resolution.path(), std::path::Path::new("/project/src/lib/foo.js"));
}

#[tokio::test]
async fn extends_chain_inherits_base_url_and_paths() {
    let fs = MemoryFS::new(&[
        (
            "/project/tsconfig.base.json",
            r#"{"compilerOptions": {"baseUrl": "/project", "paths": {"@/*": ["src/*"]}}}"#,
        ),
        ("/project/tsconfig.json", r#"{"extends": "./tsconfig.base.json"}"#),
        ("/project/src/widget.js", ""),
    ]);
    let resolver =
        ResolverGeneric::new_with_file_system(fs, with_tsconfig("/project/tsconfig.json"));

    let resolution = resolver.resolve("/project", "@/widget").await.unwrap();
    assert_eq!(resolution.path(), std::path::Path::new("/project/src/widget.js"));
}

#[tokio::test]
async fn extends_cycle_is_ignored_instead_of_recursing_forever() {
    let fs = MemoryFS::new(&[
        (
            "/project/tsconfig.a.json",
            r#"{"extends": "./tsconfig.b.json", "compilerOptions": {"baseUrl": "/project", "paths": {"@/*": ["src/*"]}}}"#,
        ),
        ("/project/tsconfig.b.json", r#"{"extends": "./tsconfig.a.json"}"#),
        ("/project/src/widget.js", ""),
    ]);
    let resolver =
        ResolverGeneric::new_with_file_system(fs, with_tsconfig("/project/tsconfig.a.json"));

    // `tsconfig.a.json` extends `tsconfig.b.json`, which extends back to
    // `tsconfig.a.json`. The cycle must be detected and the back-reference
    // dropped with a warning rather than recursing forever; `a`'s own
    // `baseUrl`/`paths` still take effect.
    let resolution = resolver.resolve("/project", "@/widget").await.unwrap();
    assert_eq!(resolution.path(), std::path::Path::new("/project/src/widget.js"));
}

#[tokio::test]
async fn relative_specifiers_are_not_rewritten_by_paths() {
    let fs = MemoryFS::new(&[
        (
            "/project/tsconfig.json",
            r#"{"compilerOptions": {"baseUrl": "/project", "paths": {"*": ["src/*"]}}}"#,
        ),
        ("/project/local.js", ""),
    ]);
    let resolver =
        ResolverGeneric::new_with_file_system(fs, with_tsconfig("/project/tsconfig.json"));

    let resolution = resolver.resolve("/project", "./local.js").await.unwrap();
    assert_eq!(resolution.path(), std::path::Path::new("/project/local.js"));
}
