//! Mirror Group Status Model
//!
//! Owned values produced by the status decoder. Nothing here borrows from
//! backend memory; a snapshot is built fresh on every poll and discarded
//! after use.
//!
//! The backend marks the observer's own site with an empty mirror UUID.
//! [`is_local_site`] is the only place that convention is spelled out.

use chrono::{DateTime, Utc};
use serde::Serialize;
use uuid::Uuid;

use super::errors::{MirrorError, MirrorResult};
use super::state::{GroupLifecycleState, ImageMirrorMode, ReplicaReplayState};

/// Whether a site mirror UUID denotes the local (observer) site.
pub fn is_local_site(mirror_uuid: &str) -> bool {
    mirror_uuid.is_empty()
}

fn epoch_to_time(epoch: i64) -> Option<DateTime<Utc>> {
    if epoch <= 0 {
        return None;
    }
    DateTime::from_timestamp(epoch, 0)
}

/// Mirroring information of a group as seen by one site.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct GroupInfo {
    /// Identifier shared by the group across all sites
    pub global_id: String,
    pub state: GroupLifecycleState,
    pub image_mode: ImageMirrorMode,
    /// Whether this site currently accepts writes
    pub primary: bool,
}

impl GroupInfo {
    /// The global id parsed as a UUID, when it is one.
    pub fn global_uuid(&self) -> Option<Uuid> {
        Uuid::parse_str(&self.global_id).ok()
    }
}

/// Status of one mirrored image at one site.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ImageSiteStatus {
    /// Site identifier, empty for the local site
    pub mirror_uuid: String,
    pub state: ReplicaReplayState,
    pub description: String,
    /// Seconds since the Unix epoch
    pub last_update: i64,
    pub up: bool,
}

impl ImageSiteStatus {
    pub fn is_local(&self) -> bool {
        is_local_site(&self.mirror_uuid)
    }

    pub fn last_update_time(&self) -> Option<DateTime<Utc>> {
        epoch_to_time(self.last_update)
    }
}

/// Status of a mirrored group at one site.
///
/// `image_count` is the count the backend declared. `images` only holds
/// the entries that could be decoded, so it may be shorter.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct GroupSiteStatus {
    /// Site identifier, empty for the local site
    pub mirror_uuid: String,
    pub state: ReplicaReplayState,
    pub image_count: u32,
    pub pool_id: i64,
    pub image_global_ids: String,
    pub images: Vec<ImageSiteStatus>,
    pub description: String,
    /// Seconds since the Unix epoch
    pub last_update: i64,
    pub up: bool,
}

impl GroupSiteStatus {
    pub fn is_local(&self) -> bool {
        is_local_site(&self.mirror_uuid)
    }

    /// Declared images that were dropped during decode.
    pub fn skipped_images(&self) -> usize {
        (self.image_count as usize).saturating_sub(self.images.len())
    }

    pub fn last_update_time(&self) -> Option<DateTime<Utc>> {
        epoch_to_time(self.last_update)
    }

    /// Up and replaying: the healthy steady state of a secondary site.
    pub fn is_up_and_replaying(&self) -> bool {
        self.up && self.state == ReplicaReplayState::Replaying
    }
}

/// Status of a mirrored group across all participating sites.
///
/// `site_statuses_count` is the count the backend declared.
/// `site_statuses` only holds entries that passed validation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct GlobalGroupStatus {
    pub name: String,
    pub info: GroupInfo,
    pub site_statuses_count: u32,
    pub site_statuses: Vec<GroupSiteStatus>,
}

impl GlobalGroupStatus {
    /// The entry describing the local site.
    ///
    /// Scans in decode order and returns the first entry with an empty
    /// mirror UUID.
    pub fn local_status(&self) -> MirrorResult<&GroupSiteStatus> {
        self.site_statuses
            .iter()
            .find(|site| site.is_local())
            .ok_or(MirrorError::LocalStatusNotFound)
    }

    /// Owned variant of [`local_status`](Self::local_status).
    pub fn into_local_status(self) -> MirrorResult<GroupSiteStatus> {
        self.site_statuses
            .into_iter()
            .find(GroupSiteStatus::is_local)
            .ok_or(MirrorError::LocalStatusNotFound)
    }

    /// Entries describing peer sites, in decode order.
    pub fn peer_statuses(&self) -> impl Iterator<Item = &GroupSiteStatus> {
        self.site_statuses.iter().filter(|site| !site.is_local())
    }

    /// Site entry for a given peer mirror UUID.
    pub fn site_status(&self, mirror_uuid: &str) -> Option<&GroupSiteStatus> {
        self.site_statuses
            .iter()
            .find(|site| site.mirror_uuid == mirror_uuid)
    }

    /// Declared sites that were dropped during decode.
    pub fn skipped_sites(&self) -> usize {
        (self.site_statuses_count as usize).saturating_sub(self.site_statuses.len())
    }

    /// Total images dropped across all decoded sites.
    pub fn skipped_images(&self) -> usize {
        self.site_statuses.iter().map(GroupSiteStatus::skipped_images).sum()
    }
}
