//! In-memory backend
//!
//! Implements both backend seams without a cluster:
//! - Groups are described with [`MockGroup`], [`MockSite`] and
//!   [`MockImage`]; any pointer the real backend could leave null can be
//!   left null here too
//! - Enable and disable pass through Enabling/Disabling and settle after a
//!   configurable number of status polls
//! - Every raw record handed out is tracked until released, so tests can
//!   assert that nothing leaks and nothing is released twice

use std::collections::HashMap;
use std::ffi::{c_char, c_int, CStr, CString};
use std::ptr;
use std::sync::{Mutex, MutexGuard, PoisonError};

use super::backend::{CommandIssuer, CommandRequest, StatusProvider};
use super::errors::{MirrorError, MirrorResult};
use super::ffi::{RawGlobalStatus, RawGroupInfo, RawGroupSiteStatus, RawImageSiteStatus};
use super::lifecycle::{
    OP_DEMOTE, OP_DISABLE, OP_ENABLE, OP_PROMOTE, OP_RESYNC, PARAM_FORCE, PARAM_GROUP_NAME,
    PARAM_IMAGE_MODE,
};
use super::state::{GroupLifecycleState, ImageMirrorMode, ReplicaReplayState};

/// One image entry of a mock site.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MockImage {
    /// `None` leaves the UUID pointer null
    pub mirror_uuid: Option<String>,
    pub state: ReplicaReplayState,
    pub description: Option<String>,
    pub last_update: i64,
    pub up: bool,
}

impl MockImage {
    pub fn local(state: ReplicaReplayState) -> Self {
        Self::peer("", state)
    }

    pub fn peer(mirror_uuid: &str, state: ReplicaReplayState) -> Self {
        Self {
            mirror_uuid: Some(mirror_uuid.to_string()),
            state,
            description: None,
            last_update: 0,
            up: true,
        }
    }

    pub fn without_uuid(mut self) -> Self {
        self.mirror_uuid = None;
        self
    }

    pub fn description(mut self, description: &str) -> Self {
        self.description = Some(description.to_string());
        self
    }

    pub fn last_update(mut self, epoch: i64) -> Self {
        self.last_update = epoch;
        self
    }

    pub fn down(mut self) -> Self {
        self.up = false;
        self
    }
}

/// One site entry of a mock group.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MockSite {
    /// `None` leaves the UUID pointer null
    pub mirror_uuid: Option<String>,
    pub state: ReplicaReplayState,
    /// `None` leaves the pool id pointer null
    pub pool_id: Option<i64>,
    /// `None` leaves the global id pointer null
    pub image_global_ids: Option<String>,
    /// `None` leaves the image array pointer null
    pub images: Option<Vec<MockImage>>,
    /// Declared image count reported when `images` is `None`
    pub declared_image_count: u32,
    pub description: Option<String>,
    pub last_update: i64,
    pub up: bool,
}

impl MockSite {
    pub fn local(state: ReplicaReplayState) -> Self {
        Self::peer("", state)
    }

    pub fn peer(mirror_uuid: &str, state: ReplicaReplayState) -> Self {
        Self {
            mirror_uuid: Some(mirror_uuid.to_string()),
            state,
            pool_id: Some(1),
            image_global_ids: Some(String::new()),
            images: None,
            declared_image_count: 0,
            description: None,
            last_update: 0,
            up: true,
        }
    }

    pub fn images(mut self, images: Vec<MockImage>) -> Self {
        self.images = Some(images);
        self
    }

    pub fn pool_id(mut self, pool_id: i64) -> Self {
        self.pool_id = Some(pool_id);
        self
    }

    pub fn image_global_ids(mut self, ids: &str) -> Self {
        self.image_global_ids = Some(ids.to_string());
        self
    }

    pub fn description(mut self, description: &str) -> Self {
        self.description = Some(description.to_string());
        self
    }

    pub fn last_update(mut self, epoch: i64) -> Self {
        self.last_update = epoch;
        self
    }

    pub fn down(mut self) -> Self {
        self.up = false;
        self
    }

    pub fn without_uuid(mut self) -> Self {
        self.mirror_uuid = None;
        self
    }

    pub fn without_pool_id(mut self) -> Self {
        self.pool_id = None;
        self
    }

    pub fn without_image_global_ids(mut self) -> Self {
        self.image_global_ids = None;
        self
    }

    /// Null image pointer with a non-zero declared count.
    pub fn null_images_with_count(mut self, declared: u32) -> Self {
        self.images = None;
        self.declared_image_count = declared;
        self
    }

    fn is_local(&self) -> bool {
        self.mirror_uuid.as_deref() == Some("")
    }
}

/// A mock group and everything its status reports.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MockGroup {
    pub name: String,
    pub global_id: String,
    pub state: GroupLifecycleState,
    pub image_mode: ImageMirrorMode,
    pub primary: bool,
    /// `None` leaves the site array pointer null
    pub sites: Option<Vec<MockSite>>,
    /// Declared site count. Used as-is with a null site array, capped at
    /// the array length otherwise.
    pub declared_site_count: Option<u32>,
}

impl MockGroup {
    /// A disabled, secondary group with no site array.
    pub fn new(name: &str) -> Self {
        Self {
            name: name.to_string(),
            global_id: uuid::Uuid::new_v4().to_string(),
            state: GroupLifecycleState::Disabled,
            image_mode: ImageMirrorMode::Snapshot,
            primary: false,
            sites: None,
            declared_site_count: None,
        }
    }

    pub fn lifecycle(mut self, state: GroupLifecycleState) -> Self {
        self.state = state;
        self
    }

    pub fn primary(mut self, primary: bool) -> Self {
        self.primary = primary;
        self
    }

    pub fn global_id(mut self, global_id: &str) -> Self {
        self.global_id = global_id.to_string();
        self
    }

    pub fn image_mode(mut self, mode: ImageMirrorMode) -> Self {
        self.image_mode = mode;
        self
    }

    /// Append a site entry.
    pub fn site(mut self, site: MockSite) -> Self {
        self.sites.get_or_insert_with(Vec::new).push(site);
        self
    }

    pub fn declared_site_count(mut self, count: u32) -> Self {
        self.declared_site_count = Some(count);
        self
    }
}

/// Backing memory of one handed-out global status record.
#[derive(Default)]
struct StatusAllocation {
    strings: Vec<CString>,
    pool_ids: Vec<Box<i64>>,
    global_ids: Vec<Box<*mut c_char>>,
    images: Vec<Vec<RawImageSiteStatus>>,
    sites: Vec<RawGroupSiteStatus>,
}

// The raw pointers only point into buffers owned by the allocation itself.
unsafe impl Send for StatusAllocation {}

impl StatusAllocation {
    fn string(&mut self, s: &str) -> *mut c_char {
        let owned = CString::new(s).unwrap_or_default();
        let ptr = owned.as_ptr().cast_mut();
        self.strings.push(owned);
        ptr
    }

    fn optional_string(&mut self, s: Option<&str>) -> *mut c_char {
        s.map_or(ptr::null_mut(), |s| self.string(s))
    }

    fn raw_site(&mut self, site: &MockSite) -> RawGroupSiteStatus {
        let (mirror_images, mirror_image_count) = match &site.images {
            Some(images) => {
                let mut raw: Vec<RawImageSiteStatus> = images
                    .iter()
                    .map(|image| RawImageSiteStatus {
                        mirror_uuid: self.optional_string(image.mirror_uuid.as_deref()),
                        state: image.state.image_code() as c_int,
                        description: self.optional_string(image.description.as_deref()),
                        last_update: image.last_update as libc::time_t,
                        up: u8::from(image.up),
                    })
                    .collect();
                let ptr = raw.as_mut_ptr();
                let count = raw.len() as u32;
                self.images.push(raw);
                (ptr, count)
            }
            None => (ptr::null_mut(), site.declared_image_count),
        };

        let mirror_image_pool_ids = match site.pool_id {
            Some(id) => {
                let mut boxed = Box::new(id);
                let ptr: *mut i64 = &mut *boxed;
                self.pool_ids.push(boxed);
                ptr
            }
            None => ptr::null_mut(),
        };

        let mirror_image_global_ids = match &site.image_global_ids {
            Some(ids) => {
                let mut boxed = Box::new(self.string(ids));
                let ptr: *mut *mut c_char = &mut *boxed;
                self.global_ids.push(boxed);
                ptr
            }
            None => ptr::null_mut(),
        };

        RawGroupSiteStatus {
            mirror_uuid: self.optional_string(site.mirror_uuid.as_deref()),
            state: site.state.group_code() as c_int,
            mirror_image_count,
            mirror_image_pool_ids,
            mirror_image_global_ids,
            mirror_images,
            description: self.optional_string(site.description.as_deref()),
            last_update: site.last_update as libc::time_t,
            up: u8::from(site.up),
        }
    }
}

struct GroupEntry {
    group: MockGroup,
    polls_until_settled: u32,
}

impl GroupEntry {
    /// Count one status poll and settle a pending transition when due.
    fn poll(&mut self) {
        if !self.group.state.is_transitioning() {
            return;
        }
        if self.polls_until_settled > 0 {
            self.polls_until_settled -= 1;
            return;
        }
        self.group.state = match self.group.state {
            GroupLifecycleState::Enabling => GroupLifecycleState::Enabled,
            GroupLifecycleState::Disabling => GroupLifecycleState::Disabled,
            other => other,
        };
    }
}

#[derive(Default)]
struct MockState {
    groups: HashMap<String, GroupEntry>,
    status_allocations: HashMap<usize, StatusAllocation>,
    info_allocations: HashMap<usize, CString>,
    transition_polls: u32,
    fetches: u64,
    releases: u64,
    double_releases: u64,
    commands: Vec<CommandRequest>,
    fail_next_command: Option<i32>,
    fail_next_fetch: Option<(i32, bool)>,
}

/// In-memory implementation of [`CommandIssuer`] and [`StatusProvider`].
#[derive(Default)]
pub struct MockBackend {
    state: Mutex<MockState>,
}

impl MockBackend {
    pub fn new() -> Self {
        Self::default()
    }

    fn state(&self) -> MutexGuard<'_, MockState> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Add or replace a group.
    pub fn insert_group(&self, group: MockGroup) {
        let mut state = self.state();
        let name = group.name.clone();
        state.groups.insert(
            name,
            GroupEntry {
                group,
                polls_until_settled: 0,
            },
        );
    }

    /// Current description of a group.
    pub fn group(&self, name: &str) -> Option<MockGroup> {
        self.state().groups.get(name).map(|entry| entry.group.clone())
    }

    /// Edit a group in place. Returns false if it does not exist.
    pub fn update_group(&self, name: &str, edit: impl FnOnce(&mut MockGroup)) -> bool {
        match self.state().groups.get_mut(name) {
            Some(entry) => {
                edit(&mut entry.group);
                true
            }
            None => false,
        }
    }

    /// Number of status polls a group stays in Enabling/Disabling.
    pub fn set_transition_polls(&self, polls: u32) {
        self.state().transition_polls = polls;
    }

    /// Make the next command fail with `code`.
    pub fn fail_next_command(&self, code: i32) {
        self.state().fail_next_command = Some(code);
    }

    /// Make the next status or info fetch fail with `code`.
    pub fn fail_next_fetch(&self, code: i32) {
        self.state().fail_next_fetch = Some((code, false));
    }

    /// Make the next status or info fetch fail with `code` after filling
    /// part of the record.
    pub fn fail_next_fetch_after_partial_fill(&self, code: i32) {
        self.state().fail_next_fetch = Some((code, true));
    }

    /// Commands received so far, including rejected ones.
    pub fn commands(&self) -> Vec<CommandRequest> {
        self.state().commands.clone()
    }

    /// Status and info fetches received so far.
    pub fn fetch_count(&self) -> u64 {
        self.state().fetches
    }

    /// Records handed back exactly once.
    pub fn release_count(&self) -> u64 {
        self.state().releases
    }

    /// Releases of records that were not outstanding.
    pub fn double_release_count(&self) -> u64 {
        self.state().double_releases
    }

    /// Records handed out and not yet released.
    pub fn live_allocations(&self) -> usize {
        let state = self.state();
        state.status_allocations.len() + state.info_allocations.len()
    }

    fn apply(state: &mut MockState, request: &CommandRequest) -> MirrorResult<()> {
        let name = request.name();
        let group_name = request.require(PARAM_GROUP_NAME)?;
        let transition_polls = state.transition_polls;

        let entry = state
            .groups
            .get_mut(group_name)
            .ok_or_else(|| MirrorError::backend(name, -libc::ENOENT))?;
        let group = &mut entry.group;
        let invalid = || MirrorError::backend(name, -libc::EINVAL);

        match name {
            OP_ENABLE => {
                let mode = ImageMirrorMode::from_code(request.require_int(PARAM_IMAGE_MODE)? as i32);
                if group.state != GroupLifecycleState::Disabled {
                    return Err(invalid());
                }
                group.image_mode = mode;
                group.primary = true;
                group.state = GroupLifecycleState::Enabling;
                entry.polls_until_settled = transition_polls;
            }
            OP_DISABLE => {
                request.require_bool(PARAM_FORCE)?;
                if group.state != GroupLifecycleState::Enabled {
                    return Err(invalid());
                }
                group.state = GroupLifecycleState::Disabling;
                entry.polls_until_settled = transition_polls;
            }
            OP_PROMOTE => {
                let force = request.require_bool(PARAM_FORCE)?;
                if group.state != GroupLifecycleState::Enabled || (group.primary && !force) {
                    return Err(invalid());
                }
                group.primary = true;
            }
            OP_DEMOTE => {
                if group.state != GroupLifecycleState::Enabled || !group.primary {
                    return Err(invalid());
                }
                group.primary = false;
            }
            OP_RESYNC => {
                if group.state != GroupLifecycleState::Enabled || group.primary {
                    return Err(invalid());
                }
                for site in group.sites.iter_mut().flatten().filter(|s| s.is_local()) {
                    site.state = ReplicaReplayState::StartingReplay;
                }
            }
            other => return Err(MirrorError::UnsupportedCommand(other.to_string())),
        }

        Ok(())
    }

    /// Take a pending fetch failure, if any.
    fn take_fetch_failure(state: &mut MockState) -> Option<(i32, bool)> {
        state.fetches += 1;
        state.fail_next_fetch.take()
    }
}

impl CommandIssuer for MockBackend {
    fn issue(&self, request: &CommandRequest) -> MirrorResult<()> {
        let mut state = self.state();
        state.commands.push(request.clone());

        if let Some(code) = state.fail_next_command.take() {
            return Err(MirrorError::backend(request.name(), code));
        }

        Self::apply(&mut state, request)
    }
}

unsafe impl StatusProvider for MockBackend {
    fn fetch_group_info(&self, group: &CStr, out: &mut RawGroupInfo) -> c_int {
        let mut state = self.state();

        if let Some((code, partial)) = Self::take_fetch_failure(&mut state) {
            if partial {
                let global_id = CString::default();
                out.global_id = global_id.as_ptr().cast_mut();
                state.info_allocations.insert(out.global_id as usize, global_id);
            }
            return code;
        }

        let Some(entry) = state.groups.get_mut(&*group.to_string_lossy()) else {
            return -libc::ENOENT;
        };
        entry.poll();
        let snapshot = entry.group.clone();

        let global_id = CString::new(snapshot.global_id).unwrap_or_default();
        *out = RawGroupInfo {
            global_id: global_id.as_ptr().cast_mut(),
            mirror_image_mode: snapshot.image_mode.code(),
            state: snapshot.state.code(),
            primary: u8::from(snapshot.primary),
        };
        state.info_allocations.insert(out.global_id as usize, global_id);
        0
    }

    unsafe fn release_group_info(&self, info: &mut RawGroupInfo) {
        let mut state = self.state();
        if state.info_allocations.remove(&(info.global_id as usize)).is_some() {
            state.releases += 1;
        } else {
            state.double_releases += 1;
        }
        *info = RawGroupInfo::default();
    }

    fn fetch_global_status(&self, group: &CStr, out: &mut RawGlobalStatus) -> c_int {
        let mut state = self.state();
        let mut allocation = StatusAllocation::default();

        if let Some((code, partial)) = Self::take_fetch_failure(&mut state) {
            if partial {
                out.name = allocation.string(&group.to_string_lossy());
                state.status_allocations.insert(out.name as usize, allocation);
            }
            return code;
        }

        let Some(entry) = state.groups.get_mut(&*group.to_string_lossy()) else {
            return -libc::ENOENT;
        };
        entry.poll();
        let snapshot = entry.group.clone();

        let (site_statuses, site_statuses_count) = match &snapshot.sites {
            Some(sites) => {
                let raw: Vec<RawGroupSiteStatus> =
                    sites.iter().map(|site| allocation.raw_site(site)).collect();
                allocation.sites = raw;
                let len = allocation.sites.len() as u32;
                let count = snapshot.declared_site_count.map_or(len, |d| d.min(len));
                (allocation.sites.as_mut_ptr(), count)
            }
            None => (ptr::null_mut(), snapshot.declared_site_count.unwrap_or(0)),
        };

        *out = RawGlobalStatus {
            name: allocation.string(&snapshot.name),
            info: RawGroupInfo {
                global_id: allocation.string(&snapshot.global_id),
                mirror_image_mode: snapshot.image_mode.code(),
                state: snapshot.state.code(),
                primary: u8::from(snapshot.primary),
            },
            site_statuses_count,
            site_statuses,
        };
        state.status_allocations.insert(out.name as usize, allocation);
        0
    }

    unsafe fn release_global_status(&self, status: &mut RawGlobalStatus) {
        let mut state = self.state();
        if state.status_allocations.remove(&(status.name as usize)).is_some() {
            state.releases += 1;
        } else {
            state.double_releases += 1;
        }
        *status = RawGlobalStatus::default();
    }
}
