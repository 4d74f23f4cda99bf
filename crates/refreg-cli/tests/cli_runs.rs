//! Scenario runs through the CLI command layer

#![allow(clippy::expect_used, missing_docs)]

use refreg_cli::{check_config, run_scenario, RunOptions};
use refreg_registry::Identity;
use std::fs;
use std::path::PathBuf;
use tempfile::TempDir;

fn bundled(name: &str) -> PathBuf {
    PathBuf::from(env!("CARGO_MANIFEST_DIR"))
        .join("scenarios")
        .join(name)
}

fn options(scenario: PathBuf) -> RunOptions {
    RunOptions {
        scenario,
        config: None,
        state: None,
        save: None,
    }
}

#[tokio::test]
async fn bundled_scenarios_pass() {
    for name in ["token-manager-read-only.toml", "revoked-creator.toml"] {
        let summary = run_scenario(&options(bundled(name)))
            .await
            .unwrap_or_else(|err| panic!("{name}: {err:#}"));
        assert!(!summary.event_lines.is_empty(), "{name} emitted no events");
    }
}

#[tokio::test]
async fn events_are_printed_as_json_lines() {
    let summary = run_scenario(&options(bundled("token-manager-read-only.toml")))
        .await
        .expect("run");

    let kinds: Vec<String> = summary
        .event_lines
        .iter()
        .map(|line| {
            let value: serde_json::Value = serde_json::from_str(line).expect("json");
            value["kind"].as_str().expect("kind").to_string()
        })
        .collect();
    assert_eq!(
        kinds,
        [
            "record-created",
            "role-changed",
            "content-updated",
            "run-state-changed"
        ]
    );
}

#[tokio::test]
async fn saved_state_resumes_in_a_later_run() {
    let dir = TempDir::new().expect("tempdir");
    let state = dir.path().join("state.json");
    let first = dir.path().join("first.toml");
    let second = dir.path().join("second.toml");

    fs::write(
        &first,
        r#"
owner = "owner"

[metadata]
name = "seed"

[[steps]]
action = "create"
actor = "owner"
uri = "ipfs://a"

[[steps]]
action = "update-ref-spec"
actor = "owner"
record = 1
spec = "sha256"
"#,
    )
    .expect("write first");
    fs::write(
        &second,
        r#"
owner = "owner"

[metadata]
name = "resume"

[[steps]]
action = "read-ref-spec"
record = 1
equals = "sha256"

[[steps]]
action = "create"
actor = "owner"
uri = "ipfs://b"

[[steps]]
action = "read-content"
record = 2
equals = "ipfs://b"
"#,
    )
    .expect("write second");

    let seeded = run_scenario(&RunOptions {
        save: Some(state.clone()),
        ..options(first)
    })
    .await
    .expect("seed run");
    assert!(state.exists());

    let resumed = run_scenario(&RunOptions {
        state: Some(state),
        ..options(second)
    })
    .await
    .expect("resumed run");

    assert_eq!(resumed.snapshot.records.len(), 2);
    assert_eq!(
        resumed.snapshot.next_event_sequence,
        seeded.snapshot.next_event_sequence + 1
    );
}

#[tokio::test]
async fn restored_state_keeps_its_owner_over_the_scenario_owner() {
    let dir = TempDir::new().expect("tempdir");
    let state = dir.path().join("state.json");
    let seed = dir.path().join("seed.toml");
    let resume = dir.path().join("resume.toml");

    fs::write(
        &seed,
        r#"
owner = "owner"

[metadata]
name = "seed"
"#,
    )
    .expect("write seed");
    fs::write(
        &resume,
        r#"
owner = "intruder"

[metadata]
name = "resume with another owner"

[[steps]]
action = "set-state"
actor = "intruder"
state = "paused"
expect = "unauthorized"

[[steps]]
action = "create"
actor = "owner"
uri = "ipfs://a"
"#,
    )
    .expect("write resume");

    run_scenario(&RunOptions {
        save: Some(state.clone()),
        ..options(seed)
    })
    .await
    .expect("seed run");
    let resumed = run_scenario(&RunOptions {
        state: Some(state),
        ..options(resume)
    })
    .await
    .expect("resumed run");

    assert_eq!(resumed.snapshot.owner, Identity::from_name("owner"));
}

#[tokio::test]
async fn failed_expectation_aborts_the_run() {
    let dir = TempDir::new().expect("tempdir");
    let scenario = dir.path().join("bad.toml");
    fs::write(
        &scenario,
        r#"
owner = "owner"

[metadata]
name = "bad"

[[steps]]
action = "destroy"
actor = "owner"
record = 7
"#,
    )
    .expect("write");

    let err = run_scenario(&options(scenario)).await.expect_err("must fail");
    assert!(err.to_string().contains("record-not-found"), "{err}");
}

#[test]
fn check_config_validates_files() {
    let dir = TempDir::new().expect("tempdir");

    let good = dir.path().join("good.toml");
    fs::write(&good, "default_ref_spec = \"sha256\"\nevent_history_limit = 64\n").expect("write");
    let config = check_config(&good).expect("valid");
    assert_eq!(config.event_history_limit, Some(64));

    let bad = dir.path().join("bad.toml");
    fs::write(&bad, "event_history_limit = 0\n").expect("write");
    assert!(check_config(&bad).is_err());

    let json = dir.path().join("config.json");
    fs::write(&json, r#"{"trace_events": false}"#).expect("write");
    assert!(!check_config(&json).expect("json config").trace_events);
}
