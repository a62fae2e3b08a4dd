//! `package.json` "sideEffects" field, surfaced through
//! [crate::Resolution::has_side_effects].

use crate::{ResolveOptions, ResolverGeneric};

use super::memory_fs::MemoryFS;

#[tokio::test]
async fn defaults_to_true_with_no_sideeffects_field() {
    let fs = MemoryFS::new(&[
        ("/project/node_modules/pkg/package.json", r#"{"name": "pkg"}"#),
        ("/project/node_modules/pkg/index.js", ""),
    ]);
    let resolver = ResolverGeneric::new_with_file_system(fs, ResolveOptions::default());

    let resolution = resolver.resolve("/project", "pkg").await.unwrap();
    assert!(resolution.has_side_effects());
}

#[tokio::test]
async fn false_marks_everything_side_effect_free() {
    let fs = MemoryFS::new(&[
        (
            "/project/node_modules/pkg/package.json",
            r#"{"name": "pkg", "main": "./index.js", "sideEffects": false}"#,
        ),
        ("/project/node_modules/pkg/index.js", ""),
    ]);
    let resolver = ResolverGeneric::new_with_file_system(fs, ResolveOptions::default());

    let resolution = resolver.resolve("/project", "pkg").await.unwrap();
    assert!(!resolution.has_side_effects());
}

#[tokio::test]
async fn array_only_marks_listed_files() {
    let fs = MemoryFS::new(&[
        (
            "/project/node_modules/pkg/package.json",
            r#"{"name": "pkg", "sideEffects": ["./styles.css", "polyfill.js"]}"#,
        ),
        ("/project/node_modules/pkg/index.js", ""),
        ("/project/node_modules/pkg/styles.css", ""),
        ("/project/node_modules/pkg/nested/polyfill.js", ""),
    ]);
    let resolver = ResolverGeneric::new_with_file_system(fs, ResolveOptions::default());

    let index = resolver.resolve("/project", "pkg/index.js").await.unwrap();
    assert!(!index.has_side_effects());

    let styles = resolver.resolve("/project", "pkg/styles.css").await.unwrap();
    assert!(styles.has_side_effects());

    // An entry without a `/` matches anywhere under the package, not just
    // at its root.
    let polyfill = resolver.resolve("/project", "pkg/nested/polyfill.js").await.unwrap();
    assert!(polyfill.has_side_effects());
}
