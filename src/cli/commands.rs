//! CLI command implementations
//!
//! Commands are thin: each maps to one client call (or one poll loop for
//! `wait`) and returns the JSON document to print. Dispatch is generic
//! over the backend so the same code runs against a cluster or the
//! in-memory backend.

use serde_json::{json, Value};

use crate::mirror::{
    wait_for_lifecycle_state, wait_for_primary, CommandIssuer, GroupLifecycleState,
    LifecycleOperation, MirrorGroupClient, PollConfig, StatusProvider,
};

use super::args::{Command, WaitTarget};
use super::errors::CliResult;

/// Run one command and return the response data.
pub fn run_command<B>(
    client: &MirrorGroupClient<B>,
    command: &Command,
    poll: &PollConfig,
) -> CliResult<Value>
where
    B: CommandIssuer + StatusProvider,
{
    match command {
        Command::Enable { group, mode } => {
            lifecycle(client, group, LifecycleOperation::Enable { mode: *mode })
        }
        Command::Disable { group, force } => {
            lifecycle(client, group, LifecycleOperation::Disable { force: *force })
        }
        Command::Promote { group, force } => {
            lifecycle(client, group, LifecycleOperation::Promote { force: *force })
        }
        Command::Demote { group } => lifecycle(client, group, LifecycleOperation::Demote),
        Command::Resync { group } => lifecycle(client, group, LifecycleOperation::Resync),
        Command::Info { group } => info(client, group),
        Command::Status { group, local } => status(client, group, *local),
        Command::Wait { group, state } => wait(client, group, *state, poll),
    }
}

fn lifecycle<B: CommandIssuer>(
    client: &MirrorGroupClient<B>,
    group: &str,
    operation: LifecycleOperation,
) -> CliResult<Value> {
    client.execute(group, operation)?;
    Ok(json!({
        "group": group,
        "operation": operation.name(),
        "accepted": true,
    }))
}

/// Mirroring info of one group
pub fn info<B: StatusProvider>(client: &MirrorGroupClient<B>, group: &str) -> CliResult<Value> {
    let info = client.group_info(group)?;
    Ok(serde_json::to_value(info)?)
}

/// Global status, or only the local site entry
pub fn status<B: StatusProvider>(
    client: &MirrorGroupClient<B>,
    group: &str,
    local: bool,
) -> CliResult<Value> {
    if local {
        return Ok(serde_json::to_value(client.local_status(group)?)?);
    }

    let status = client.global_status(group)?;
    let mut value = serde_json::to_value(&status)?;
    if let Value::Object(map) = &mut value {
        map.insert("skipped_sites".into(), json!(status.skipped_sites()));
        map.insert("skipped_images".into(), json!(status.skipped_images()));
    }
    Ok(value)
}

/// Poll until the group reaches `target`
pub fn wait<B: StatusProvider>(
    client: &MirrorGroupClient<B>,
    group: &str,
    target: WaitTarget,
    poll: &PollConfig,
) -> CliResult<Value> {
    let info = match target {
        WaitTarget::Enabled => {
            wait_for_lifecycle_state(client, group, GroupLifecycleState::Enabled, poll)?
        }
        WaitTarget::Disabled => {
            wait_for_lifecycle_state(client, group, GroupLifecycleState::Disabled, poll)?
        }
        WaitTarget::Primary => wait_for_primary(client, group, true, poll)?,
        WaitTarget::Secondary => wait_for_primary(client, group, false, poll)?,
    };
    Ok(serde_json::to_value(info)?)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cli::errors::CliErrorCode;
    use crate::mirror::{
        ImageMirrorMode, MockBackend, MockGroup, MockSite, ReplicaReplayState, OP_ENABLE,
        PARAM_IMAGE_MODE,
    };

    fn client() -> MirrorGroupClient<MockBackend> {
        let backend = MockBackend::new();
        backend.insert_group(MockGroup::new("g1"));
        MirrorGroupClient::new(backend)
    }

    #[test]
    fn test_enable_command() {
        let client = client();
        let data = run_command(
            &client,
            &Command::Enable {
                group: "g1".into(),
                mode: ImageMirrorMode::Journal,
            },
            &PollConfig::immediate(1),
        )
        .unwrap();

        assert_eq!(data["operation"], OP_ENABLE);
        let commands = client.backend().commands();
        assert_eq!(commands.len(), 1);
        assert_eq!(commands[0].get(PARAM_IMAGE_MODE), Some("0"));
    }

    #[test]
    fn test_info_json_labels() {
        let client = client();
        let data = run_command(
            &client,
            &Command::Info { group: "g1".into() },
            &PollConfig::immediate(1),
        )
        .unwrap();

        assert_eq!(data["state"], "disabled");
        assert_eq!(data["image_mode"], "snapshot");
        assert_eq!(data["primary"], false);
    }

    #[test]
    fn test_status_reports_skips() {
        let client = client();
        client.backend().insert_group(
            MockGroup::new("g2")
                .lifecycle(GroupLifecycleState::Enabled)
                .site(MockSite::local(ReplicaReplayState::Replaying))
                .site(MockSite::peer("peer-a", ReplicaReplayState::Replaying).without_pool_id()),
        );

        let data = status(&client, "g2", false).unwrap();
        assert_eq!(data["site_statuses"].as_array().map(Vec::len), Some(1));
        assert_eq!(data["skipped_sites"], 1);

        let local = status(&client, "g2", true).unwrap();
        assert_eq!(local["state"], "replaying");
    }

    #[test]
    fn test_wait_enabled_after_enable() {
        let client = client();
        client.backend().set_transition_polls(2);
        let poll = PollConfig::immediate(5);

        run_command(
            &client,
            &Command::Enable {
                group: "g1".into(),
                mode: ImageMirrorMode::Snapshot,
            },
            &poll,
        )
        .unwrap();
        let data = run_command(
            &client,
            &Command::Wait {
                group: "g1".into(),
                state: WaitTarget::Primary,
            },
            &poll,
        )
        .unwrap();

        assert_eq!(data["state"], "enabled");
        assert_eq!(data["primary"], true);
    }

    #[test]
    fn test_wait_timeout_maps_to_cli_code() {
        let client = client();
        let err = wait(&client, "g1", WaitTarget::Enabled, &PollConfig::immediate(2)).unwrap_err();
        assert_eq!(err.code(), CliErrorCode::Timeout);
    }

    #[test]
    fn test_invalid_group_maps_to_invalid_argument() {
        let client = client();
        let err = run_command(
            &client,
            &Command::Demote {
                group: "pool/g1".into(),
            },
            &PollConfig::immediate(1),
        )
        .unwrap_err();
        assert_eq!(err.code(), CliErrorCode::InvalidArgument);
    }
}
