//! `package.json` scanning: `main`/`module` fields, `type`, and the
//! `name`-based package self-reference.

use crate::{ModuleType, ResolveOptions, ResolverGeneric};

use super::memory_fs::MemoryFS;

#[tokio::test]
async fn main_field_is_followed() {
    let fs = MemoryFS::new(&[
        ("/project/node_modules/pkg/package.json", r#"{"main": "./lib/index.js"}"#),
        ("/project/node_modules/pkg/lib/index.js", ""),
    ]);
    let resolver = ResolverGeneric::new_with_file_system(fs, ResolveOptions::default());

    let resolution = resolver.resolve("/project", "pkg").await.unwrap();
    assert_eq!(resolution.path(), std::path::Path::new("/project/node_modules/pkg/lib/index.js"));
}

#[tokio::test]
async fn module_type_defaults_to_commonjs() {
    let fs = MemoryFS::new(&[("/project/src/index.js", "")]);
    let resolver = ResolverGeneric::new_with_file_system(fs, ResolveOptions::default());

    let resolution = resolver.resolve("/project/src", "./index.js").await.unwrap();
    assert_eq!(resolution.module_type(), ModuleType::CommonJs);
}

#[tokio::test]
async fn module_type_is_read_from_type_field() {
    let fs = MemoryFS::new(&[
        ("/project/package.json", r#"{"type": "module"}"#),
        ("/project/src/index.js", ""),
    ]);
    let resolver = ResolverGeneric::new_with_file_system(fs, ResolveOptions::default());

    let resolution = resolver.resolve("/project/src", "./index.js").await.unwrap();
    assert_eq!(resolution.module_type(), ModuleType::Module);
}

#[tokio::test]
async fn package_self_reference_uses_exports_map() {
    let fs = MemoryFS::new(&[
        (
            "/project/node_modules/pkg/package.json",
            r#"{"name": "pkg", "exports": {".": "./index.js", "./feature": "./feature.js"}}"#,
        ),
        ("/project/node_modules/pkg/index.js", ""),
        ("/project/node_modules/pkg/feature.js", ""),
        ("/project/node_modules/pkg/consumer.js", ""),
    ]);
    let resolver = ResolverGeneric::new_with_file_system(fs, ResolveOptions::default());

    // A module inside `pkg` importing its own package by name should be
    // resolved through the package's own `exports` map.
    let resolution = resolver.resolve("/project/node_modules/pkg", "pkg/feature").await.unwrap();
    assert_eq!(resolution.path(), std::path::Path::new("/project/node_modules/pkg/feature.js"));
}
