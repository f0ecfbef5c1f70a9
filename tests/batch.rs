//! Batch runner integration tests

mod common;

use common::Script;
use std::path::PathBuf;
use uigrab::core::{Config, ErrorKind, SessionMode};
use uigrab::pipeline::{BatchRunner, BatchSpec};

fn spec(json: &str) -> BatchSpec {
    BatchSpec::from_json(json).unwrap()
}

#[tokio::test]
async fn test_failed_job_does_not_stop_batch() {
    let harness = Script::default().build();
    let runner = BatchRunner::new(harness.caps, &Config::default());

    let result = runner
        .run(&spec(
            r#"{"components": [
                {"url": "https://a.test", "selector": ".hero", "name": "Hero"},
                {"url": "not a url", "selector": ".nav", "name": "Nav"},
                {"url": "https://c.test", "find": "footer links", "name": "Footer"}
            ]}"#,
        ))
        .await;

    assert_eq!(result.total, 3);
    assert_eq!(result.succeeded, 2);
    assert_eq!(result.failed, 1);

    let names: Vec<_> = result.results.iter().map(|r| r.name.as_str()).collect();
    assert_eq!(names, vec!["Hero", "Nav", "Footer"]);

    let nav = &result.results[1];
    assert!(!nav.success);
    assert_eq!(nav.error_kind, Some(ErrorKind::Navigation));
    assert!(nav.result.is_none());

    assert!(result.results[0].success);
    assert!(result.results[2].success);
    assert_eq!(
        result.results[2].result.as_ref().unwrap().import_path,
        "./Footer"
    );
}

#[tokio::test]
async fn test_panicking_job_is_isolated() {
    let harness = Script {
        panic_on: Some("Boom".to_string()),
        ..Script::default()
    }
    .build();
    let runner = BatchRunner::new(harness.caps, &Config::default());

    let result = runner
        .run(&spec(
            r##"{"components": [
                {"url": "https://a.test", "selector": "#a", "name": "First"},
                {"url": "https://b.test", "selector": "#b", "name": "Boom"},
                {"url": "https://c.test", "selector": "#c", "name": "Last"}
            ]}"##,
        ))
        .await;

    assert_eq!(result.total, 3);
    assert_eq!(result.succeeded, 2);

    let boom = &result.results[1];
    assert!(!boom.success);
    let error = boom.error.as_deref().unwrap();
    assert!(error.contains("panicked"), "{}", error);
    assert!(error.contains("transformer blew up on Boom"), "{}", error);
    assert_eq!(boom.error_kind, Some(ErrorKind::Unclassified));

    assert_eq!(
        *harness.transformed.lock().unwrap(),
        vec!["First", "Boom", "Last"]
    );
}

#[tokio::test]
async fn test_invalid_entry_fails_alone() {
    let harness = Script::default().build();
    let runner = BatchRunner::new(harness.caps, &Config::default());

    let result = runner
        .run(&spec(
            r##"{"components": [
                {"url": "https://a.test", "selector": "#a", "framework": "angular"},
                {"url": "https://b.test", "selector": "#b", "find": "both modes"},
                {"url": "https://c.test", "selector": "#c"}
            ]}"##,
        ))
        .await;

    assert_eq!(result.failed, 2);
    assert_eq!(result.results[0].name, "component-1");
    assert_eq!(result.results[0].error_kind, Some(ErrorKind::Validation));
    assert_eq!(result.results[1].error_kind, Some(ErrorKind::Validation));
    assert!(result.results[2].success);

    // only the valid job reached the browser
    assert_eq!(harness.counters.launches(), 1);
}

#[tokio::test]
async fn test_job_overrides_batch_defaults() {
    let harness = Script::default().build();
    let runner = BatchRunner::new(harness.caps, &Config::default());

    let result = runner
        .run(&spec(
            r##"{
                "defaults": {"framework": "vue", "outputDir": "ui"},
                "components": [
                    {"url": "https://a.test", "selector": "#a", "name": "Card"},
                    {"url": "https://b.test", "selector": "#b", "name": "Badge",
                     "framework": "svelte", "outputDir": "widgets"}
                ]
            }"##,
        ))
        .await;

    let files = |i: usize| result.results[i].result.as_ref().unwrap().files.clone();
    assert_eq!(files(0), vec![PathBuf::from("ui/Card.vue")]);
    assert_eq!(files(1), vec![PathBuf::from("widgets/Badge.svelte")]);
}

#[tokio::test]
async fn test_per_job_sessions() {
    let harness = Script::default().build();
    let runner = BatchRunner::new(harness.caps, &Config::default());
    assert_eq!(runner.session_mode(), SessionMode::PerJob);

    runner
        .run(&spec(
            r##"{"components": [
                {"url": "https://a.test", "selector": "#a"},
                {"url": "https://b.test", "selector": "#b"},
                {"url": "https://c.test", "selector": "#c"}
            ]}"##,
        ))
        .await;

    assert_eq!(harness.counters.launches(), 3);
    assert_eq!(harness.counters.closes(), 3);
}

#[tokio::test]
async fn test_shared_session_launches_once() {
    let harness = Script::default().build();
    let runner = BatchRunner::new(harness.caps, &Config::default())
        .with_session_mode(SessionMode::Shared);

    let result = runner
        .run(&spec(
            r##"{"components": [
                {"url": "https://a.test", "selector": "#a"},
                {"url": "https://b.test", "selector": "#b"},
                {"url": "https://c.test", "selector": "#c"}
            ]}"##,
        ))
        .await;

    assert_eq!(result.succeeded, 3);
    assert_eq!(harness.counters.launches(), 1);
    assert_eq!(harness.counters.navigations(), 3);
    assert_eq!(harness.counters.closes(), 1);
}

#[test]
fn test_empty_batch_file_rejected() {
    let err = BatchSpec::from_json(r#"{"components": []}"#).unwrap_err();
    assert_eq!(err.kind(), ErrorKind::Validation);
}

#[test]
fn test_batch_file_from_disk() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("batch.json");
    std::fs::write(
        &path,
        r#"{"components": [{"url": "https://a.test", "interactive": true}]}"#,
    )
    .unwrap();

    let spec = BatchSpec::from_file(&path).unwrap();
    assert_eq!(spec.components.len(), 1);
    assert_eq!(spec.components[0].interactive, Some(true));

    let err = BatchSpec::from_file(&dir.path().join("missing.json")).unwrap_err();
    assert_eq!(err.kind(), ErrorKind::Validation);
}
