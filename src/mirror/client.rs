//! Mirror Group Client
//!
//! Entry point for callers: lifecycle requests go out through the
//! backend's [`CommandIssuer`], status comes back through its
//! [`StatusProvider`] and is decoded into owned values before the raw
//! record is released.
//!
//! The client holds no locks and no cached state; the backend is the
//! single source of truth and serializes conflicting requests itself.

use std::ffi::CString;
use std::sync::Arc;

use super::backend::{CommandIssuer, RawInfoGuard, RawStatusGuard, StatusProvider};
use super::errors::{MirrorError, MirrorResult};
use super::lifecycle::{validate_group_name, LifecycleOperation};
use super::state::ImageMirrorMode;
use super::status::{GlobalGroupStatus, GroupInfo, GroupSiteStatus};
use crate::observability::{log_event_with_fields, Event, MetricsRegistry, ObservationScope};

/// Client for one backend connection.
pub struct MirrorGroupClient<B> {
    backend: B,
    metrics: Arc<MetricsRegistry>,
}

impl<B> MirrorGroupClient<B> {
    pub fn new(backend: B) -> Self {
        Self::with_metrics(backend, Arc::new(MetricsRegistry::new()))
    }

    /// Share a metrics registry with other clients.
    pub fn with_metrics(backend: B, metrics: Arc<MetricsRegistry>) -> Self {
        Self { backend, metrics }
    }

    pub fn backend(&self) -> &B {
        &self.backend
    }

    pub fn metrics(&self) -> &MetricsRegistry {
        &self.metrics
    }
}

fn group_cstring(group: &str) -> MirrorResult<CString> {
    validate_group_name(group)?;
    CString::new(group).map_err(|_| MirrorError::InvalidGroupName {
        name: group.to_string(),
        reason: "contains a NUL byte",
    })
}

impl<B: CommandIssuer> MirrorGroupClient<B> {
    /// Submit one lifecycle request.
    pub fn execute(&self, group: &str, operation: LifecycleOperation) -> MirrorResult<()> {
        let request = operation.to_request(group)?;
        let scope = ObservationScope::new("MIRROR_GROUP_COMMAND", &[
            ("group", group),
            ("operation", request.name()),
        ]);

        match self.backend.issue(&request) {
            Ok(()) => {
                self.metrics.increment_commands_issued();
                log_event_with_fields(
                    Event::CommandIssued,
                    &[("group", group), ("operation", request.name())],
                );
                scope.complete();
                Ok(())
            }
            Err(err) => {
                self.metrics.increment_commands_failed();
                log_event_with_fields(
                    Event::CommandFailed,
                    &[
                        ("error", &err.to_string()),
                        ("group", group),
                        ("operation", request.name()),
                    ],
                );
                scope.fail(&err.to_string());
                Err(err)
            }
        }
    }

    /// Enable mirroring for a group using the given image mode.
    pub fn enable(&self, group: &str, mode: ImageMirrorMode) -> MirrorResult<()> {
        self.execute(group, LifecycleOperation::Enable { mode })
    }

    /// Disable mirroring for a group.
    pub fn disable(&self, group: &str, force: bool) -> MirrorResult<()> {
        self.execute(group, LifecycleOperation::Disable { force })
    }

    /// Promote the group to primary at this site.
    pub fn promote(&self, group: &str, force: bool) -> MirrorResult<()> {
        self.execute(group, LifecycleOperation::Promote { force })
    }

    /// Demote the group to secondary at this site.
    pub fn demote(&self, group: &str) -> MirrorResult<()> {
        self.execute(group, LifecycleOperation::Demote)
    }

    /// Request a resync to resolve split-brain.
    pub fn resync(&self, group: &str) -> MirrorResult<()> {
        self.execute(group, LifecycleOperation::Resync)
    }
}

impl<B: StatusProvider> MirrorGroupClient<B> {
    /// Mirroring info of a group.
    pub fn group_info(&self, group: &str) -> MirrorResult<GroupInfo> {
        let name = group_cstring(group)?;
        let guard = RawInfoGuard::fetch(&self.backend, &name, &self.metrics)?;
        Ok(guard.decode())
    }

    /// Status of a group across all sites.
    pub fn global_status(&self, group: &str) -> MirrorResult<GlobalGroupStatus> {
        let name = group_cstring(group)?;
        let guard = RawStatusGuard::fetch(&self.backend, &name, &self.metrics)?;
        Ok(guard.decode())
    }

    /// Status of the group at the local site.
    pub fn local_status(&self, group: &str) -> MirrorResult<GroupSiteStatus> {
        let status = self.global_status(group)?;
        status.into_local_status().inspect_err(|_| {
            log_event_with_fields(Event::LocalSiteMissing, &[("group", group)]);
        })
    }
}
