//! Backend Collaborator Seams
//!
//! Two capabilities are consumed from the storage backend:
//! - [`CommandIssuer`]: one-shot named operations with string parameters
//! - [`StatusProvider`]: raw status records in the backend's own layout
//!
//! Raw records are only ever touched through [`RawStatusGuard`] and
//! [`RawInfoGuard`], which hand the record back to the provider exactly
//! once when dropped.

use std::collections::BTreeMap;
use std::ffi::{c_int, CStr};
use std::sync::Arc;

use super::decode;
use super::errors::{check_return, MirrorError, MirrorResult};
use super::ffi::{RawGlobalStatus, RawGroupInfo};
use super::status::{GlobalGroupStatus, GroupInfo};
use crate::observability::{log_event_with_fields, Event, MetricsRegistry};

/// Operation name used in errors for group info requests
pub const OP_GET_INFO: &str = "mirror_group_get_info";
/// Operation name used in errors for global status requests
pub const OP_GET_GLOBAL_STATUS: &str = "mirror_group_get_global_status";

/// A named backend operation with string-keyed parameters.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CommandRequest {
    name: String,
    params: BTreeMap<String, String>,
}

impl CommandRequest {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            params: BTreeMap::new(),
        }
    }

    /// Add a parameter.
    pub fn with_param(mut self, key: impl Into<String>, value: impl ToString) -> Self {
        self.params.insert(key.into(), value.to_string());
        self
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn params(&self) -> &BTreeMap<String, String> {
        &self.params
    }

    pub fn get(&self, key: &str) -> Option<&str> {
        self.params.get(key).map(String::as_str)
    }

    /// A parameter that must be present.
    pub fn require(&self, key: &str) -> MirrorResult<&str> {
        self.get(key)
            .ok_or_else(|| MirrorError::invalid_command(&self.name, format!("missing '{}'", key)))
    }

    /// A `true`/`false` parameter that must be present.
    pub fn require_bool(&self, key: &str) -> MirrorResult<bool> {
        match self.require(key)? {
            "true" => Ok(true),
            "false" => Ok(false),
            other => Err(MirrorError::invalid_command(
                &self.name,
                format!("'{}' is not a boolean: {}", key, other),
            )),
        }
    }

    /// An integer parameter that must be present.
    pub fn require_int(&self, key: &str) -> MirrorResult<i64> {
        let value = self.require(key)?;
        value.parse().map_err(|_| {
            MirrorError::invalid_command(
                &self.name,
                format!("'{}' is not an integer: {}", key, value),
            )
        })
    }
}

/// Sends lifecycle operations to the storage backend.
///
/// Success means the backend accepted the request, not that the group
/// already reached the requested state.
pub trait CommandIssuer {
    fn issue(&self, request: &CommandRequest) -> MirrorResult<()>;
}

impl<T: CommandIssuer + ?Sized> CommandIssuer for &T {
    fn issue(&self, request: &CommandRequest) -> MirrorResult<()> {
        (**self).issue(request)
    }
}

impl<T: CommandIssuer + ?Sized> CommandIssuer for Arc<T> {
    fn issue(&self, request: &CommandRequest) -> MirrorResult<()> {
        (**self).issue(request)
    }
}

/// Produces raw status records in the backend's layout.
///
/// # Safety
///
/// When a fetch returns, every non-null pointer reachable from `out` must
/// be valid for reads for the counts declared next to it, and must stay
/// valid until the matching release is called with that same record.
/// Strings must be NUL-terminated. A failed fetch may leave `out` partly
/// filled; the caller then still releases it.
pub unsafe trait StatusProvider {
    /// Fill `out` with the group's mirroring info. Returns a backend code.
    fn fetch_group_info(&self, group: &CStr, out: &mut RawGroupInfo) -> c_int;

    /// Free whatever a fetch stored in `info`.
    ///
    /// # Safety
    ///
    /// `info` must come from `fetch_group_info` on this provider and must
    /// not have been released before.
    unsafe fn release_group_info(&self, info: &mut RawGroupInfo);

    /// Fill `out` with the group's global status. Returns a backend code.
    fn fetch_global_status(&self, group: &CStr, out: &mut RawGlobalStatus) -> c_int;

    /// Free whatever a fetch stored in `status`.
    ///
    /// # Safety
    ///
    /// `status` must come from `fetch_global_status` on this provider and
    /// must not have been released before.
    unsafe fn release_global_status(&self, status: &mut RawGlobalStatus);
}

unsafe impl<T: StatusProvider + ?Sized> StatusProvider for &T {
    fn fetch_group_info(&self, group: &CStr, out: &mut RawGroupInfo) -> c_int {
        (**self).fetch_group_info(group, out)
    }

    unsafe fn release_group_info(&self, info: &mut RawGroupInfo) {
        unsafe { (**self).release_group_info(info) }
    }

    fn fetch_global_status(&self, group: &CStr, out: &mut RawGlobalStatus) -> c_int {
        (**self).fetch_global_status(group, out)
    }

    unsafe fn release_global_status(&self, status: &mut RawGlobalStatus) {
        unsafe { (**self).release_global_status(status) }
    }
}

unsafe impl<T: StatusProvider + ?Sized> StatusProvider for Arc<T> {
    fn fetch_group_info(&self, group: &CStr, out: &mut RawGroupInfo) -> c_int {
        (**self).fetch_group_info(group, out)
    }

    unsafe fn release_group_info(&self, info: &mut RawGroupInfo) {
        unsafe { (**self).release_group_info(info) }
    }

    fn fetch_global_status(&self, group: &CStr, out: &mut RawGlobalStatus) -> c_int {
        (**self).fetch_global_status(group, out)
    }

    unsafe fn release_global_status(&self, status: &mut RawGlobalStatus) {
        unsafe { (**self).release_global_status(status) }
    }
}

fn report_fetch_failure(operation: &str, group: &CStr, ret: c_int, metrics: &MetricsRegistry) {
    metrics.increment_status_fetch_failures();
    log_event_with_fields(
        Event::StatusFetchFailed,
        &[
            ("code", &ret.to_string()),
            ("group", &group.to_string_lossy()),
            ("operation", operation),
        ],
    );
}

/// Scoped ownership of one raw global status record.
///
/// The record is released through its provider exactly once, on drop.
pub struct RawStatusGuard<'a, P: StatusProvider + ?Sized> {
    provider: &'a P,
    metrics: &'a MetricsRegistry,
    raw: RawGlobalStatus,
    armed: bool,
}

impl<'a, P: StatusProvider + ?Sized> RawStatusGuard<'a, P> {
    /// Fetch a record. On failure any partial fill is released before the
    /// error is returned.
    pub fn fetch(provider: &'a P, group: &CStr, metrics: &'a MetricsRegistry) -> MirrorResult<Self> {
        let mut guard = Self {
            provider,
            metrics,
            raw: RawGlobalStatus::default(),
            armed: false,
        };

        let ret = provider.fetch_global_status(group, &mut guard.raw);
        guard.armed = ret >= 0 || guard.raw.holds_allocation();

        if ret < 0 {
            report_fetch_failure(OP_GET_GLOBAL_STATUS, group, ret, metrics);
        }
        check_return(OP_GET_GLOBAL_STATUS, ret)?;

        Ok(guard)
    }

    /// The raw record as filled by the backend.
    pub fn raw(&self) -> &RawGlobalStatus {
        &self.raw
    }

    /// Copy the record into an owned snapshot.
    pub fn decode(&self) -> GlobalGroupStatus {
        // SAFETY: the provider contract keeps every pointer in `raw` valid
        // until release, which only happens when this guard drops.
        unsafe { decode::decode_global_status(&self.raw, self.metrics) }
    }
}

impl<P: StatusProvider + ?Sized> Drop for RawStatusGuard<'_, P> {
    fn drop(&mut self) {
        if self.armed {
            self.armed = false;
            // SAFETY: `raw` was filled by this provider and `armed` is only
            // ever cleared here.
            unsafe { self.provider.release_global_status(&mut self.raw) };
            self.metrics.increment_buffers_released();
        }
    }
}

/// Scoped ownership of one raw group info record.
pub struct RawInfoGuard<'a, P: StatusProvider + ?Sized> {
    provider: &'a P,
    metrics: &'a MetricsRegistry,
    raw: RawGroupInfo,
    armed: bool,
}

impl<'a, P: StatusProvider + ?Sized> RawInfoGuard<'a, P> {
    /// Fetch a record. On failure any partial fill is released before the
    /// error is returned.
    pub fn fetch(provider: &'a P, group: &CStr, metrics: &'a MetricsRegistry) -> MirrorResult<Self> {
        let mut guard = Self {
            provider,
            metrics,
            raw: RawGroupInfo::default(),
            armed: false,
        };

        let ret = provider.fetch_group_info(group, &mut guard.raw);
        guard.armed = ret >= 0 || guard.raw.holds_allocation();

        if ret < 0 {
            report_fetch_failure(OP_GET_INFO, group, ret, metrics);
        }
        check_return(OP_GET_INFO, ret)?;

        Ok(guard)
    }

    pub fn raw(&self) -> &RawGroupInfo {
        &self.raw
    }

    /// Copy the record into an owned value.
    pub fn decode(&self) -> GroupInfo {
        // SAFETY: see `RawStatusGuard::decode`.
        unsafe { decode::decode_group_info(&self.raw) }
    }
}

impl<P: StatusProvider + ?Sized> Drop for RawInfoGuard<'_, P> {
    fn drop(&mut self) {
        if self.armed {
            self.armed = false;
            // SAFETY: `raw` was filled by this provider and `armed` is only
            // ever cleared here.
            unsafe { self.provider.release_group_info(&mut self.raw) };
            self.metrics.increment_buffers_released();
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_request_params() {
        let request = CommandRequest::new("mirror_group_disable")
            .with_param("group_name", "g1")
            .with_param("force", true)
            .with_param("mirror_image_mode", 1);

        assert_eq!(request.name(), "mirror_group_disable");
        assert_eq!(request.require("group_name").unwrap(), "g1");
        assert!(request.require_bool("force").unwrap());
        assert_eq!(request.require_int("mirror_image_mode").unwrap(), 1);
        assert_eq!(request.params().len(), 3);
    }

    #[test]
    fn test_request_missing_and_malformed_params() {
        let request = CommandRequest::new("op").with_param("force", "maybe");
        assert!(matches!(
            request.require("group_name"),
            Err(MirrorError::InvalidCommand { .. })
        ));
        assert!(request.require_bool("force").is_err());
        assert!(request.require_int("force").is_err());
    }
}
