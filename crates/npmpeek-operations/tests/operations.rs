mod common;

use common::{context, FakeRegistry, SEARCH_PATH};
use mockito::Matcher;
use npmpeek_operations::{
    fetch::{fetch_package_code, FetchReport, FileBody},
    info::get_package_info,
    list::list_package_files,
    popular::popular_packages,
    search::search_packages,
    ErrorKind, OperationError,
};
use serde_json::json;
use tempfile::tempdir;

const PACKAGE_JSON: &[u8] = br#"{"name":"demo","version":"1.0.0","main":"lib/main.js"}"#;

fn demo_files() -> Vec<(&'static str, &'static [u8])> {
    let files: [(&'static str, &'static [u8]); 9] = [
        ("package.json", PACKAGE_JSON),
        ("README.md", b"# demo\n"),
        ("lib/main.js", b"module.exports = require('./util');\n"),
        ("lib/util.js", b"exports.pad = (s) => ' ' + s;\n"),
        ("lib/main.js.map", b"{}"),
        ("dist/demo.min.js", b"!function(){}();"),
        ("node_modules/dep/index.js", b"// vendored\n"),
        ("assets/logo.png", b"\x89PNG\r\n\x1a\n\0\0\0\rIHDR"),
        ("types/index.d.ts", b"export declare function pad(s: string): string;\n"),
    ];
    files.to_vec()
}

fn publish_demo(registry: &mut FakeRegistry) {
    registry.publish(
        "demo",
        "1.0.0",
        &demo_files(),
        json!({ "main": "lib/main.js", "description": "Demo package" }),
    );
}

#[test]
fn test_fetch_bundle_orders_and_filters() {
    let mut registry = FakeRegistry::start();
    publish_demo(&mut registry);
    let cache = tempdir().unwrap();
    let ctx = context(&registry, &cache, |_| {});

    let FetchReport::Bundle(bundle) = fetch_package_code(&ctx, "demo", None, None).unwrap() else {
        panic!("expected a bundle");
    };

    let paths: Vec<&str> = bundle.files.iter().map(|f| f.path.as_str()).collect();
    assert_eq!(
        paths,
        vec![
            "package.json",
            "README.md",
            "lib/main.js",
            "lib/util.js",
            "types/index.d.ts"
        ]
    );
    assert_eq!(bundle.matched, 5);
    assert_eq!(bundle.package, "demo@1.0.0");

    let text = bundle.to_string();
    assert!(text.contains("=== lib/util.js ===\nexports.pad"));
    assert!(!text.contains("more files not shown"));
}

#[test]
fn test_fetch_bundle_respects_max_files() {
    let mut registry = FakeRegistry::start();
    publish_demo(&mut registry);
    let cache = tempdir().unwrap();
    let ctx = context(&registry, &cache, |config| config.max_files = Some(2));

    let report = fetch_package_code(&ctx, "demo", Some("latest"), None).unwrap();
    let FetchReport::Bundle(bundle) = &report else {
        panic!("expected a bundle");
    };
    assert_eq!(bundle.files.len(), 2);
    assert_eq!(bundle.remaining(), 3);
    assert!(report.to_string().ends_with(
        "... and 3 more files not shown. Use file_path to fetch a specific file."
    ));
}

#[test]
fn test_fetch_bundle_skips_large_files() {
    let mut registry = FakeRegistry::start();
    let big = vec![b'a'; 4096];
    registry.publish(
        "big",
        "2.0.0",
        &[("index.js", b"1;\n".as_slice()), ("huge.js", big.as_slice())],
        json!({}),
    );
    let cache = tempdir().unwrap();
    let ctx = context(&registry, &cache, |config| {
        config.max_file_size = Some("1KiB".into())
    });

    let FetchReport::Bundle(bundle) = fetch_package_code(&ctx, "big", None, None).unwrap() else {
        panic!("expected a bundle");
    };
    assert_eq!(bundle.files.len(), 2);
    assert_eq!(bundle.files[0].path, "index.js");
    assert_eq!(
        bundle.files[1].body,
        FileBody::TooLarge {
            limit: 1024
        }
    );
    assert!(bundle
        .to_string()
        .contains("=== huge.js ===\n[skipped (too large): 4.0 KiB exceeds the 1.0 KiB limit]"));
}

#[test]
fn test_fetch_single_file() {
    let mut registry = FakeRegistry::start();
    publish_demo(&mut registry);
    let cache = tempdir().unwrap();
    let ctx = context(&registry, &cache, |_| {});

    let report = fetch_package_code(&ctx, "demo", Some("1.0.0"), Some("./lib/../lib/util.js")).unwrap();
    let FetchReport::File {
        package,
        file,
    } = &report
    else {
        panic!("expected a single file");
    };
    assert_eq!(package, "demo@1.0.0");
    assert_eq!(file.path, "lib/util.js");
    assert_eq!(
        report.to_string(),
        "=== lib/util.js ===\nexports.pad = (s) => ' ' + s;\n"
    );

    // Excluded from bundles, still fetchable by path.
    let report = fetch_package_code(&ctx, "demo", None, Some("lib/main.js.map")).unwrap();
    assert!(report.to_string().ends_with("{}"));
}

#[test]
fn test_fetch_single_binary_and_truncated() {
    let mut registry = FakeRegistry::start();
    let long = b"abcdefghij".repeat(300);
    registry.publish(
        "mixed",
        "0.1.0",
        &[("logo.png", b"\x89PNG\0\0data".as_slice()), ("long.txt", long.as_slice())],
        json!({}),
    );
    let cache = tempdir().unwrap();
    let ctx = context(&registry, &cache, |config| {
        config.max_file_size = Some("1KiB".into())
    });

    let FetchReport::File {
        file, ..
    } = fetch_package_code(&ctx, "mixed", None, Some("logo.png")).unwrap()
    else {
        panic!("expected a single file");
    };
    assert_eq!(file.body, FileBody::Binary);
    assert!(file.to_string().contains("[binary file, 10 B; content not shown]"));

    let FetchReport::File {
        file, ..
    } = fetch_package_code(&ctx, "mixed", None, Some("long.txt")).unwrap()
    else {
        panic!("expected a single file");
    };
    match &file.body {
        FileBody::Text {
            content,
            truncated_at,
        } => {
            assert_eq!(content.len(), 1024);
            assert_eq!(*truncated_at, Some(1024));
        }
        other => panic!("unexpected body {other:?}"),
    }
}

#[test]
fn test_fetch_missing_file_and_directory() {
    let mut registry = FakeRegistry::start();
    publish_demo(&mut registry);
    let cache = tempdir().unwrap();
    let ctx = context(&registry, &cache, |_| {});

    let err = fetch_package_code(&ctx, "demo", None, Some("lib/nope.js")).unwrap_err();
    assert!(matches!(&err, OperationError::FileNotFound(path) if path == "lib/nope.js"));
    assert_eq!(err.kind(), ErrorKind::InvalidInput);

    let err = fetch_package_code(&ctx, "demo", None, Some("lib")).unwrap_err();
    assert!(matches!(err, OperationError::NotAFile(_)));
}

#[test]
fn test_traversal_never_reaches_registry() {
    let mut registry = FakeRegistry::start();
    let any_request = registry.server().mock("GET", Matcher::Any).expect(0).create();
    let cache = tempdir().unwrap();
    let ctx = context(&registry, &cache, |_| {});

    for path in ["../../../etc/passwd", "/etc/passwd", "lib/\0x"] {
        let err = fetch_package_code(&ctx, "demo", None, Some(path)).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::InvalidInput);
    }
    any_request.assert();
}

#[test]
fn test_scoped_package() {
    let mut registry = FakeRegistry::start();
    registry.publish(
        "@acme/widget",
        "3.1.4",
        &[
            ("package.json", br#"{"name":"@acme/widget"}"#.as_slice()),
            ("index.js", b"1;".as_slice()),
        ],
        json!({}),
    );
    let cache = tempdir().unwrap();
    let ctx = context(&registry, &cache, |_| {});

    let report = fetch_package_code(&ctx, "@acme/widget", None, None).unwrap();
    assert!(report.to_string().starts_with("# @acme/widget@3.1.4\n"));
    assert!(cache.path().join("packages/acme+widget@3.1.4").is_dir());
}

#[test]
fn test_list_files_unfiltered() {
    let mut registry = FakeRegistry::start();
    publish_demo(&mut registry);
    let cache = tempdir().unwrap();
    let ctx = context(&registry, &cache, |_| {});

    let listing = list_package_files(&ctx, "demo", None).unwrap();
    let paths: Vec<&str> = listing.files.iter().map(|f| f.path.as_str()).collect();
    assert_eq!(
        paths,
        vec![
            "README.md",
            "assets/logo.png",
            "dist/demo.min.js",
            "lib/main.js",
            "lib/main.js.map",
            "lib/util.js",
            "node_modules/dep/index.js",
            "package.json",
            "types/index.d.ts"
        ]
    );
    assert!(listing.to_string().starts_with("# demo@1.0.0\n9 files, "));
}

#[test]
fn test_reextraction_replaces_previous_contents() {
    let mut registry = FakeRegistry::start();
    publish_demo(&mut registry);
    let cache = tempdir().unwrap();
    let ctx = context(&registry, &cache, |_| {});

    list_package_files(&ctx, "demo", None).unwrap();
    let stray = cache.path().join("packages/demo@1.0.0/contents/package/stray.js");
    std::fs::write(&stray, "leftover").unwrap();

    let listing = list_package_files(&ctx, "demo", None).unwrap();
    assert!(!stray.exists());
    assert_eq!(listing.files.len(), 9);
}

#[test]
fn test_integrity_mismatch_is_internal() {
    let mut registry = FakeRegistry::start();
    registry.publish(
        "tampered",
        "1.0.0",
        &[("index.js", b"1;".as_slice())],
        json!({ "dist": { "integrity": "sha512-AAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAA==" } }),
    );
    let cache = tempdir().unwrap();
    let ctx = context(&registry, &cache, |_| {});

    let err = list_package_files(&ctx, "tampered", None).unwrap_err();
    assert_eq!(err.kind(), ErrorKind::Internal);
}

#[test]
fn test_unknown_package_and_version() {
    let mut registry = FakeRegistry::start();
    publish_demo(&mut registry);
    registry.missing("/does-not-exist");
    let cache = tempdir().unwrap();
    let ctx = context(&registry, &cache, |_| {});

    let err = get_package_info(&ctx, "does-not-exist", None).unwrap_err();
    assert_eq!(err.kind(), ErrorKind::InvalidInput);
    assert_eq!(
        err.to_string(),
        "Package `does-not-exist` not found in the registry"
    );

    let err = get_package_info(&ctx, "demo", Some("9.9.9")).unwrap_err();
    assert_eq!(err.kind(), ErrorKind::InvalidInput);

    // A nearby unpublished release is not served in place of the one asked for.
    let err = fetch_package_code(&ctx, "demo", Some("1.0.1"), None).unwrap_err();
    assert_eq!(err.kind(), ErrorKind::InvalidInput);
    assert!(!cache.path().join("packages/demo@1.0.0").exists());
}

#[test]
fn test_package_info() {
    let mut registry = FakeRegistry::start();
    publish_demo(&mut registry);
    let cache = tempdir().unwrap();
    let ctx = context(&registry, &cache, |_| {});

    let info = get_package_info(&ctx, "demo", Some("^1")).unwrap();
    assert_eq!(info.version, "1.0.0");
    assert_eq!(info.main.as_deref(), Some("lib/main.js"));
    assert_eq!(info.file_count, Some(9));
    assert_eq!(info.published.as_deref(), Some("2024-01-02T03:04:05.000Z"));

    let text = info.to_string();
    assert!(text.starts_with("# demo@1.0.0\nDescription: Demo package\nVersion: 1.0.0 (latest)\n"));
    assert!(text.contains("Integrity: sha512-"));
}

#[test]
fn test_search_caps_size() {
    let results = json!({
        "objects": [
            { "package": { "name": "demo", "version": "1.0.0", "description": "Demo package", "links": {} },
              "score": { "final": 0.5, "detail": { "quality": 0.5, "popularity": 0.5, "maintenance": 0.5 } } }
        ],
        "total": 1
    });
    let mut registry = FakeRegistry::start();
    let capped = registry
        .server()
        .mock("GET", SEARCH_PATH)
        .match_query(Matcher::AllOf(vec![
            Matcher::UrlEncoded("text".into(), "demo".into()),
            Matcher::UrlEncoded("size".into(), "250".into()),
            Matcher::UrlEncoded("from".into(), "0".into()),
        ]))
        .with_header("content-type", "application/json")
        .with_body(results.to_string())
        .expect(1)
        .create();
    let defaulted = registry
        .server()
        .mock("GET", SEARCH_PATH)
        .match_query(Matcher::UrlEncoded("size".into(), "20".into()))
        .with_header("content-type", "application/json")
        .with_body(results.to_string())
        .expect(1)
        .create();
    let cache = tempdir().unwrap();
    let ctx = context(&registry, &cache, |_| {});

    let report = search_packages(&ctx, "demo", Some(10_000), Some(0)).unwrap();
    assert_eq!(report.total, 1);
    assert!(report.to_string().contains("\n1. demo@1.0.0\n   Demo package\n"));
    capped.assert();

    search_packages(&ctx, "demo", None, None).unwrap();
    defaulted.assert();
}

#[test]
fn test_search_far_offset() {
    let mut registry = FakeRegistry::start();
    let _results = registry.search_results(
        200,
        &json!({
            "objects": [ { "package": { "name": "demo", "version": "1.0.0", "links": {} } } ],
            "total": 1
        }),
    );
    let cache = tempdir().unwrap();
    let ctx = context(&registry, &cache, |_| {});

    let report = search_packages(&ctx, "demo", Some(5), Some(usize::MAX)).unwrap();
    assert_eq!(report.from, usize::MAX);
    assert!(report.to_string().contains("demo@1.0.0"));
}

#[test]
fn test_popular_digest_is_cached() {
    let mut registry = FakeRegistry::start();
    let search = registry
        .server()
        .mock("GET", SEARCH_PATH)
        .match_query(Matcher::AllOf(vec![
            Matcher::UrlEncoded("text".into(), "keywords:javascript".into()),
            Matcher::UrlEncoded("size".into(), "25".into()),
            Matcher::UrlEncoded("popularity".into(), "1".into()),
            Matcher::UrlEncoded("quality".into(), "0".into()),
        ]))
        .with_header("content-type", "application/json")
        .with_body(
            json!({
                "objects": [
                    { "package": { "name": "react", "version": "18.2.0", "description": "UI", "links": {} } }
                ],
                "total": 1
            })
            .to_string(),
        )
        .expect(2)
        .create();
    let cache = tempdir().unwrap();
    let ctx = context(&registry, &cache, |_| {});

    let first = popular_packages(&ctx).unwrap();
    let second = popular_packages(&ctx).unwrap();
    assert_eq!(first, second);
    assert!(first.contains("1. **react@18.2.0** - UI"));

    ctx.popular().invalidate();
    popular_packages(&ctx).unwrap();
    search.assert();
}

#[test]
fn test_popular_refresh_failure_surfaces() {
    let mut registry = FakeRegistry::start();
    let _failing = registry.search_results(500, &json!({}));
    let cache = tempdir().unwrap();
    let ctx = context(&registry, &cache, |_| {});

    let err = popular_packages(&ctx).unwrap_err();
    assert_eq!(err.kind(), ErrorKind::Internal);
    assert!(ctx.popular().get().is_none());
}
