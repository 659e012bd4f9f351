//! CLI Dispatch Tests
//!
//! Runs parsed commands against the in-memory backend and checks the JSON
//! documents the tool would print.

use clap::Parser;
use serde_json::Value;

use mirrorgroup::cli::{run_command, write_response_to, Cli, CliErrorCode};
use mirrorgroup::mirror::{
    GroupLifecycleState, MirrorGroupClient, MockBackend, MockGroup, MockSite, PollConfig,
    ReplicaReplayState,
};

fn run(client: &MirrorGroupClient<MockBackend>, args: &[&str]) -> Result<Value, CliErrorCode> {
    let mut argv = vec!["mirrorgroup"];
    argv.extend_from_slice(args);
    let cli = Cli::try_parse_from(argv).unwrap();
    run_command(client, &cli.command, &PollConfig::immediate(5)).map_err(|e| e.code())
}

// =============================================================================
// Lifecycle Round Trip
// =============================================================================

/// enable, wait for primary, demote, wait for secondary.
#[test]
fn test_enable_wait_demote() {
    let backend = MockBackend::new();
    backend.insert_group(MockGroup::new("db").site(MockSite::local(ReplicaReplayState::Stopped)));
    backend.set_transition_polls(1);
    let client = MirrorGroupClient::new(backend);

    let enabled = run(&client, &["enable", "--group", "db", "--mode", "journal"]).unwrap();
    assert_eq!(enabled["accepted"], true);

    let info = run(&client, &["wait", "--group", "db", "--state", "primary"]).unwrap();
    assert_eq!(info["state"], "enabled");
    assert_eq!(info["image_mode"], "journal");

    run(&client, &["demote", "--group", "db"]).unwrap();
    let info = run(&client, &["wait", "--group", "db", "--state", "secondary"]).unwrap();
    assert_eq!(info["primary"], false);
}

/// Status output carries labels and the local entry.
#[test]
fn test_status_document() {
    let backend = MockBackend::new();
    backend.insert_group(
        MockGroup::new("db")
            .lifecycle(GroupLifecycleState::Enabled)
            .site(MockSite::peer("site-b", ReplicaReplayState::Replaying))
            .site(MockSite::local(ReplicaReplayState::StoppingReplay).description("stopping")),
    );
    let client = MirrorGroupClient::new(backend);

    let status = run(&client, &["status", "--group", "db"]).unwrap();
    assert_eq!(status["info"]["state"], "enabled");
    assert_eq!(status["site_statuses"][0]["state"], "replaying");
    assert_eq!(status["skipped_sites"], 0);

    let local = run(&client, &["status", "--group", "db", "--local"]).unwrap();
    assert_eq!(local["state"], "stopping_replay");
    assert_eq!(local["description"], "stopping");

    let mut out = Vec::new();
    write_response_to(&mut out, local).unwrap();
    let printed: Value = serde_json::from_slice(&out).unwrap();
    assert_eq!(printed["status"], "ok");
    assert_eq!(printed["data"]["mirror_uuid"], "");
}

// =============================================================================
// Errors
// =============================================================================

/// Error categories map onto CLI codes.
#[test]
fn test_error_codes() {
    let backend = MockBackend::new();
    backend.insert_group(MockGroup::new("db"));
    let client = MirrorGroupClient::new(backend);

    assert_eq!(
        run(&client, &["promote", "--group", "db@snap"]),
        Err(CliErrorCode::InvalidArgument)
    );
    assert_eq!(
        run(&client, &["info", "--group", "missing"]),
        Err(CliErrorCode::BackendError)
    );
    assert_eq!(
        run(&client, &["wait", "--group", "db", "--state", "enabled"]),
        Err(CliErrorCode::Timeout)
    );
    assert_eq!(
        run(&client, &["status", "--group", "db", "--local"]),
        Err(CliErrorCode::BackendError)
    );
}
