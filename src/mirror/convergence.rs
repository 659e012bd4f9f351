//! Convergence Polling
//!
//! Lifecycle requests return as soon as the backend accepts them. The
//! helpers here poll status until a condition holds or the attempt budget
//! runs out.
//!
//! - Backend errors end the wait immediately
//! - A status without a local entry counts as "not yet"
//! - A lifecycle state that moves backwards between polls is logged and
//!   counted, never treated as an error

use std::thread;
use std::time::Duration;

use super::backend::StatusProvider;
use super::client::MirrorGroupClient;
use super::errors::{MirrorError, MirrorResult};
use super::state::GroupLifecycleState;
use super::status::{GroupInfo, GroupSiteStatus};
use crate::observability::{log_event_with_fields, Event, MetricsRegistry, ObservationScope};

pub const DEFAULT_POLL_ATTEMPTS: u32 = 30;
pub const DEFAULT_POLL_INTERVAL: Duration = Duration::from_secs(2);

/// How long to keep polling.
///
/// The status is always read at least once, so `attempts == 0` behaves
/// like `attempts == 1`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PollConfig {
    /// Status reads before giving up
    pub attempts: u32,
    /// Pause between reads
    pub interval: Duration,
}

impl Default for PollConfig {
    fn default() -> Self {
        Self {
            attempts: DEFAULT_POLL_ATTEMPTS,
            interval: DEFAULT_POLL_INTERVAL,
        }
    }
}

impl PollConfig {
    pub fn new(attempts: u32, interval: Duration) -> Self {
        Self { attempts, interval }
    }

    /// Poll back to back. Used in tests.
    pub fn immediate(attempts: u32) -> Self {
        Self::new(attempts, Duration::ZERO)
    }
}

/// Tracks consecutive lifecycle observations of one group.
struct TransitionWatch<'a> {
    group: &'a str,
    metrics: &'a MetricsRegistry,
    last: Option<GroupLifecycleState>,
}

impl<'a> TransitionWatch<'a> {
    fn new(group: &'a str, metrics: &'a MetricsRegistry) -> Self {
        Self {
            group,
            metrics,
            last: None,
        }
    }

    fn observe(&mut self, state: GroupLifecycleState) {
        if let Some(last) = self.last {
            if !last.can_transition_to(state) {
                self.metrics.increment_transition_anomalies();
                log_event_with_fields(
                    Event::TransitionAnomaly,
                    &[
                        ("from", &last.to_string()),
                        ("group", self.group),
                        ("to", &state.to_string()),
                    ],
                );
            }
        }
        self.last = Some(state);
    }
}

/// Run `step` until it yields a value, sleeping between attempts.
fn poll<T>(
    group: &str,
    config: &PollConfig,
    mut step: impl FnMut() -> MirrorResult<Option<T>>,
) -> MirrorResult<T> {
    let scope = ObservationScope::new("MIRROR_GROUP_WAIT", &[("group", group)]);
    let attempts = config.attempts.max(1);

    for attempt in 1..=attempts {
        match step() {
            Ok(Some(value)) => {
                log_event_with_fields(
                    Event::ConvergenceReached,
                    &[("attempts", &attempt.to_string()), ("group", group)],
                );
                scope.complete();
                return Ok(value);
            }
            Ok(None) => {}
            Err(err) => {
                scope.fail(&err.to_string());
                return Err(err);
            }
        }

        if attempt < attempts && !config.interval.is_zero() {
            thread::sleep(config.interval);
        }
    }

    let err = MirrorError::ConvergenceTimeout {
        group: group.to_string(),
        attempts,
    };
    log_event_with_fields(
        Event::ConvergenceTimeout,
        &[("attempts", &attempts.to_string()), ("group", group)],
    );
    scope.fail(&err.to_string());
    Err(err)
}

/// Poll group info until `done` holds.
pub fn wait_for_info<B, F>(
    client: &MirrorGroupClient<B>,
    group: &str,
    config: &PollConfig,
    mut done: F,
) -> MirrorResult<GroupInfo>
where
    B: StatusProvider,
    F: FnMut(&GroupInfo) -> bool,
{
    let mut watch = TransitionWatch::new(group, client.metrics());
    poll(group, config, || {
        let info = client.group_info(group)?;
        watch.observe(info.state);
        Ok(done(&info).then_some(info))
    })
}

/// Poll until the group reports `state`.
pub fn wait_for_lifecycle_state<B: StatusProvider>(
    client: &MirrorGroupClient<B>,
    group: &str,
    state: GroupLifecycleState,
    config: &PollConfig,
) -> MirrorResult<GroupInfo> {
    wait_for_info(client, group, config, |info| info.state == state)
}

/// Poll until the group is enabled with the given role at this site.
pub fn wait_for_primary<B: StatusProvider>(
    client: &MirrorGroupClient<B>,
    group: &str,
    primary: bool,
    config: &PollConfig,
) -> MirrorResult<GroupInfo> {
    wait_for_info(client, group, config, |info| {
        info.state == GroupLifecycleState::Enabled && info.primary == primary
    })
}

/// Poll the local site entry until `done` holds.
pub fn wait_for_local_status<B, F>(
    client: &MirrorGroupClient<B>,
    group: &str,
    config: &PollConfig,
    mut done: F,
) -> MirrorResult<GroupSiteStatus>
where
    B: StatusProvider,
    F: FnMut(&GroupSiteStatus) -> bool,
{
    let mut watch = TransitionWatch::new(group, client.metrics());
    poll(group, config, || {
        let status = client.global_status(group)?;
        watch.observe(status.info.state);
        match status.into_local_status() {
            Ok(local) => Ok(done(&local).then_some(local)),
            Err(MirrorError::LocalStatusNotFound) => Ok(None),
            Err(err) => Err(err),
        }
    })
}
