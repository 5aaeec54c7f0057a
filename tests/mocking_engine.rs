// tests/mocking_engine.rs
//! End-to-end mocking through the loader realm with real files on disk

use modmock_engine::interception::{FsSourceReader, LoadContext, ModuleFormat};
use modmock_engine::runtime::HandshakeState;
use modmock_engine::utils::LoaderConfig;
use modmock_engine::{EngineError, MockEngine, MockRegistry};
use serde_json::{json, Value};
use std::error::Error as _;
use std::fs;
use std::path::Path;
use std::sync::Arc;
use tempfile::TempDir;
use url::Url;

const TARGET: &str = r#"import X from "./dep.js";
import * as ns from './ns.js';
import { helper as h } from "../lib/untouched.js";

export default X + ns.foo + h();
"#;

struct Project {
    dir: TempDir,
}

impl Project {
    fn new() -> Self {
        let dir = tempfile::tempdir().unwrap();
        fs::create_dir_all(dir.path().join("src")).unwrap();
        fs::create_dir_all(dir.path().join("lib")).unwrap();
        fs::create_dir_all(dir.path().join("test")).unwrap();

        fs::write(dir.path().join("src/target.js"), TARGET).unwrap();
        fs::write(dir.path().join("src/dep.js"), "export default 1;\n").unwrap();
        fs::write(dir.path().join("src/ns.js"), "export const foo = 2;\n").unwrap();
        fs::write(
            dir.path().join("lib/untouched.js"),
            "export const helper = () => 3;\n",
        )
        .unwrap();

        Self { dir }
    }

    fn url(&self, relative: &str) -> String {
        file_url(&self.dir.path().join(relative))
    }

    /// Base location as a test file sitting next to the sources
    fn base(&self) -> String {
        self.url("test/suite.test.js")
    }
}

fn file_url(path: &Path) -> String {
    Url::from_file_path(path).unwrap().to_string()
}

fn engine(registry: &Arc<MockRegistry>) -> MockEngine {
    MockEngine::with_parts(
        LoaderConfig::default(),
        Arc::clone(registry),
        Arc::new(FsSourceReader),
    )
    .unwrap()
}

#[tokio::test]
async fn test_mocked_default_and_namespace() {
    let project = Project::new();
    let registry = Arc::new(MockRegistry::new());
    let engine = engine(&registry);

    let module = engine
        .mock_import(
            "../src/target.js",
            &project.base(),
            vec![
                ("../src/dep.js", json!({ "default": 42 })),
                ("../src/ns.js", json!({ "foo": 1 })),
            ],
        )
        .await
        .unwrap();

    assert_eq!(module.format, ModuleFormat::Module);
    assert!(module.specifier.starts_with("modmock:"));
    assert_eq!(registry.len(), 2);

    let bindings = module.evaluate().unwrap();

    assert_eq!(bindings.get("X"), Some(&json!(42)));
    assert_eq!(bindings.get("ns").unwrap()["foo"], json!(1));
    assert_eq!(
        bindings.external_imports,
        vec![project.url("lib/untouched.js")]
    );
}

#[tokio::test]
async fn test_cleanup_after_evaluation() {
    let project = Project::new();
    let registry = Arc::new(MockRegistry::new());
    let engine = engine(&registry);

    let module = engine
        .mock_import(
            "../src/target.js",
            &project.base(),
            vec![
                ("../src/dep.js", json!({ "default": 42 })),
                ("../src/ns.js", json!({ "foo": 1 })),
            ],
        )
        .await
        .unwrap();

    let keys: Vec<String> = module.session().infos().registry_keys().collect();
    assert!(keys.iter().all(|k| registry.contains(k)));

    let bindings = module.evaluate().unwrap();

    assert_eq!(bindings.cleaned_keys, keys);
    assert!(keys.iter().all(|k| !registry.contains(k)));

    // Entries are read-once: a second top-level run has nothing to read
    assert!(matches!(
        module.evaluate(),
        Err(EngineError::Evaluation { .. })
    ));
}

#[tokio::test]
async fn test_untouched_dependency_points_at_absolute_path() {
    let project = Project::new();
    let registry = Arc::new(MockRegistry::new());
    let engine = engine(&registry);

    let module = engine
        .mock_import(
            "../src/target.js",
            &project.base(),
            vec![("../src/dep.js", json!({ "default": 42 }))],
        )
        .await
        .unwrap();

    let expected = format!(
        "import {{ helper as h }} from \"{}\";",
        project.url("lib/untouched.js")
    );
    assert!(module.source.contains(&expected));
    assert!(module
        .source
        .contains(&format!("import * as ns from \"{}\";", project.url("src/ns.js"))));
}

#[tokio::test]
async fn test_dropped_session_releases_entries() {
    let project = Project::new();
    let registry = Arc::new(MockRegistry::new());
    let engine = engine(&registry);

    let module = engine
        .mock_import(
            "../src/target.js",
            &project.base(),
            vec![("../src/dep.js", json!({ "default": 42 }))],
        )
        .await
        .unwrap();
    assert_eq!(registry.len(), 1);

    drop(module);
    assert!(registry.is_empty());
}

#[tokio::test]
async fn test_missing_module_fails_with_cause() {
    let project = Project::new();
    let registry = Arc::new(MockRegistry::new());
    let engine = engine(&registry);

    let result = engine
        .mock_import(
            "../src/nope.js",
            &project.base(),
            vec![("../src/dep.js", json!({ "default": 42 }))],
        )
        .await;

    let err = match result {
        Ok(_) => panic!("loading a missing module must fail"),
        Err(err) => err,
    };

    match &err {
        EngineError::SourceUnavailable { identifier, .. } => {
            assert_eq!(identifier, &project.url("src/nope.js"));
        }
        other => panic!("unexpected error: {:?}", other),
    }
    let cause = err.source().unwrap();
    assert!(cause.downcast_ref::<std::io::Error>().is_some());
    assert!(registry.is_empty());
}

#[tokio::test]
async fn test_plain_specifier_passes_through() {
    let project = Project::new();
    let registry = Arc::new(MockRegistry::new());
    let engine = engine(&registry);

    let result = engine
        .load(&project.url("lib/untouched.js"), LoadContext::default())
        .await
        .unwrap();

    assert_eq!(result.source, "export const helper = () => 3;\n");
    assert!(!result.short_circuit);

    // Same answer straight from the loader realm once the hook is in
    let direct = engine
        .worker()
        .load(&project.url("lib/untouched.js"), LoadContext::default())
        .await
        .unwrap();
    assert_eq!(direct.source, result.source);
}

#[tokio::test]
async fn test_concurrent_sessions_do_not_collide() {
    let project = Project::new();
    let registry = Arc::new(MockRegistry::new());
    let engine = engine(&registry);
    let base = project.base();

    let (a, b) = tokio::join!(
        engine.mock_import(
            "../src/target.js",
            &base,
            vec![("../src/dep.js", json!({ "default": "a" }))],
        ),
        engine.mock_import(
            "../src/target.js",
            &base,
            vec![("../src/dep.js", json!({ "default": "b" }))],
        ),
    );
    let (a, b) = (a.unwrap(), b.unwrap());

    assert_ne!(a.session().token(), b.session().token());
    assert_eq!(a.evaluate().unwrap().get("X"), Some(&Value::from("a")));
    assert_eq!(b.evaluate().unwrap().get("X"), Some(&Value::from("b")));
    assert!(registry.is_empty());
}

#[tokio::test]
async fn test_concurrent_initialize_reaches_ready() {
    let registry = Arc::new(MockRegistry::new());
    let engine = engine(&registry);
    assert_eq!(engine.state(), HandshakeState::NotReady);

    let (a, b) = tokio::join!(engine.initialize(), engine.initialize());
    a.unwrap();
    b.unwrap();

    assert_eq!(engine.state(), HandshakeState::Ready);
}
