//! <https://github.com/webpack/enhanced-resolve/blob/main/test/restrictions.test.js>

use std::sync::Arc;

use regex::Regex;

use crate::{ResolveError, ResolveOptions, ResolverGeneric, Restriction};

use super::memory_fs::MemoryFS;

fn style_only() -> Restriction {
    let re = Regex::new(r"\.(sass|scss|css)$").unwrap();
    Restriction::Fn(Arc::new(move |path| {
        path.as_os_str().to_str().is_some_and(|s| re.is_match(s))
    }))
}

#[tokio::test]
async fn regexp_restriction_rejects_a_non_matching_main_field() {
    let fs = MemoryFS::new(&[
        ("/project/node_modules/pck1/package.json", r#"{"main": "index.js"}"#),
        ("/project/node_modules/pck1/index.js", ""),
    ]);
    let resolver = ResolverGeneric::new_with_file_system(
        fs,
        ResolveOptions {
            extensions: vec![".js".into()],
            restrictions: vec![style_only()],
            ..ResolveOptions::default()
        },
    );

    let err = resolver.resolve("/project", "pck1").await.unwrap_err();
    assert_eq!(err, ResolveError::NotFound("pck1".into()));
}

#[tokio::test]
async fn falls_back_to_an_allowed_main_field_alternative() {
    let fs = MemoryFS::new(&[
        (
            "/project/node_modules/pck1/package.json",
            r#"{"main": "index.js", "style": "index.css"}"#,
        ),
        ("/project/node_modules/pck1/index.js", ""),
        ("/project/node_modules/pck1/index.css", ""),
    ]);
    let resolver = ResolverGeneric::new_with_file_system(
        fs,
        ResolveOptions {
            extensions: vec![".js".into(), ".css".into()],
            main_fields: vec!["main".into(), "style".into()],
            restrictions: vec![style_only()],
            ..ResolveOptions::default()
        },
    );

    let resolution = resolver.resolve("/project", "pck1").await.unwrap();
    assert_eq!(
        resolution.path(),
        std::path::Path::new("/project/node_modules/pck1/index.css")
    );
}

#[tokio::test]
async fn path_restriction_rejects_anything_outside_the_directory() {
    let fs = MemoryFS::new(&[
        ("/outside/node_modules/pck2/package.json", r#"{"main": "index.js"}"#),
        ("/outside/node_modules/pck2/index.js", ""),
    ]);
    let resolver = ResolverGeneric::new_with_file_system(
        fs,
        ResolveOptions {
            extensions: vec![".js".into()],
            restrictions: vec![Restriction::Path("/project".into())],
            ..ResolveOptions::default()
        },
    );

    let err = resolver.resolve("/outside", "pck2").await.unwrap_err();
    assert_eq!(err, ResolveError::NotFound("pck2".into()));
}
