//! Yarn Plug'n'Play `RESOLVE_TO_UNQUALIFIED` behavior and error reporting.
//!
//! `pnp_support::locate_manifest_path`/`load_manifest` call straight through
//! to the `pnp` crate's own filesystem I/O, not through this crate's
//! `FileSystem` trait, so there is no `MemoryFS` seam to hook here the way
//! the other scenario tests do. These write a real `.pnp.data.json` (the
//! plain-JSON manifest form Yarn emits for non-JS consumers, per
//! <https://yarnpkg.com/advanced/pnp-spec>) under the OS temp directory and
//! exercise `pnp_support` against it directly.

use std::{fs, path::PathBuf};

use crate::pnp_support::{load_manifest, resolve_to_unqualified, UnqualifiedResolution};
use crate::ResolveError;

fn write_manifest(case_name: &str, contents: &str) -> PathBuf {
    let mut dir = std::env::temp_dir();
    dir.push("module_resolver_pnp_tests");
    dir.push(case_name);
    fs::create_dir_all(&dir).expect("create temp fixture dir");
    let manifest_path = dir.join(".pnp.data.json");
    fs::write(&manifest_path, contents).expect("write manifest fixture");
    manifest_path
}

/// spec.md §8 scenario S9: `ignorePatternData` matching the importer's
/// relative path makes `RESOLVE_TO_UNQUALIFIED` report `Skipped`, so the
/// top-level resolver falls through to the ordinary `node_modules` walk
/// instead of treating the manifest as authoritative for this request.
#[test]
fn ignore_pattern_skips_resolution() {
    let manifest_path = write_manifest(
        "ignore_pattern",
        r#"{
            "dependencyTreeRoots": [],
            "enableTopLevelFallback": true,
            "fallbackExclusionList": [],
            "fallbackPool": [],
            "ignorePatternData": "ignored",
            "packageRegistryData": []
        }"#,
    );
    let manifest = load_manifest(&manifest_path).expect("manifest should parse");

    let mut issuer_dir = manifest_path.parent().unwrap().to_path_buf();
    issuer_dir.push("ignored");
    issuer_dir.push(""); // resolve_to_unqualified requires a trailing separator

    let resolution = resolve_to_unqualified(&manifest, "lodash", &issuer_dir).unwrap();
    assert!(matches!(resolution, UnqualifiedResolution::Skipped));
}

/// spec.md §8 scenario S8: a locator whose `packageDependencies` map lists
/// `react` with a `null` reference is a declared-but-unfulfilled peer
/// dependency. `RESOLVE_TO_UNQUALIFIED` must report that distinctly from a
/// plain "no such dependency", and this crate must surface
/// `ResolveError::PnpUnfulfilledPeerDependency` rather than collapsing it
/// into a generic not-found.
#[test]
fn unfulfilled_peer_dependency_is_reported_distinctly() {
    let manifest_path = write_manifest(
        "unfulfilled_peer",
        r#"{
            "dependencyTreeRoots": [],
            "enableTopLevelFallback": false,
            "fallbackExclusionList": [],
            "fallbackPool": [],
            "ignorePatternData": null,
            "packageRegistryData": [
                [null, [
                    [null, {
                        "packageLocation": "./",
                        "packageDependencies": [["react", null]],
                        "packagePeers": ["react"],
                        "linkType": "SOFT"
                    }]
                ]]
            ]
        }"#,
    );
    let manifest = load_manifest(&manifest_path).expect("manifest should parse");

    let mut issuer_dir = manifest_path.parent().unwrap().to_path_buf();
    issuer_dir.push(""); // the issuer is the top-level package itself

    let error = resolve_to_unqualified(&manifest, "react", &issuer_dir).unwrap_err();
    assert_eq!(error, ResolveError::PnpUnfulfilledPeerDependency("react".to_string()));
}

/// A specifier with no entry at all in `packageDependencies` (as opposed to
/// an entry with a `null` reference) is the plain "not declared" case and
/// must not be confused with the peer-dependency case above.
#[test]
fn undeclared_dependency_is_reported_as_dependency_not_found() {
    let manifest_path = write_manifest(
        "undeclared_dependency",
        r#"{
            "dependencyTreeRoots": [],
            "enableTopLevelFallback": false,
            "fallbackExclusionList": [],
            "fallbackPool": [],
            "ignorePatternData": null,
            "packageRegistryData": [
                [null, [
                    [null, {
                        "packageLocation": "./",
                        "packageDependencies": [],
                        "linkType": "SOFT"
                    }]
                ]]
            ]
        }"#,
    );
    let manifest = load_manifest(&manifest_path).expect("manifest should parse");

    let mut issuer_dir = manifest_path.parent().unwrap().to_path_buf();
    issuer_dir.push("");

    let error = resolve_to_unqualified(&manifest, "left-pad", &issuer_dir).unwrap_err();
    assert!(
        matches!(error, ResolveError::PnpDependencyNotFound(ref s) if s == "left-pad")
            || matches!(error, ResolveError::PnpResolutionError(ref s, _) if s == "left-pad"),
        "expected a PnP dependency-not-found style error, got {error:?}"
    );
}
