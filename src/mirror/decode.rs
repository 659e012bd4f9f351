//! Status Decoder
//!
//! Turns a backend-owned global status record into an owned
//! [`GlobalGroupStatus`] in one pass.
//!
//! - Null or zero-count arrays decode as empty sequences
//! - Arrays are viewed through a bounded slice of at most
//!   [`MAX_STATUS_ENTRIES`] elements, fewer when the element type is large
//!   enough that the slice would exceed `isize::MAX` bytes
//! - A site entry missing its UUID, image global id or pool id pointer is
//!   skipped; an image entry missing its UUID is skipped
//! - Skips shorten the output below the declared count and are logged and
//!   counted, never returned as errors
//! - Null strings inside a kept entry decode as `""`
//!
//! Nothing returned here borrows from the record.

use std::ffi::{c_char, CStr};
use std::mem;
use std::slice;

use super::ffi::{RawGlobalStatus, RawGroupInfo, RawGroupSiteStatus, RawImageSiteStatus};
use super::state::{GroupLifecycleState, ImageMirrorMode, ReplicaReplayState};
use super::status::{GlobalGroupStatus, GroupInfo, GroupSiteStatus, ImageSiteStatus};
use crate::observability::{log_event_with_fields, Event, MetricsRegistry};

/// Upper bound on the number of elements read from any one backend array.
pub const MAX_STATUS_ENTRIES: usize = (1 << 27) - 1;

/// Element bound for an array of `T`.
///
/// `slice::from_raw_parts` requires the slice to span at most `isize::MAX`
/// bytes, which `MAX_STATUS_ENTRIES` alone does not guarantee on 32-bit
/// targets.
fn entry_limit<T>() -> usize {
    MAX_STATUS_ENTRIES.min(isize::MAX as usize / mem::size_of::<T>().max(1))
}

/// Copy a C string, treating null as empty.
///
/// # Safety
///
/// `ptr` is null or points to a NUL-terminated string.
unsafe fn owned_string(ptr: *const c_char) -> String {
    if ptr.is_null() {
        return String::new();
    }
    unsafe { CStr::from_ptr(ptr) }.to_string_lossy().into_owned()
}

/// View a count-prefixed backend array.
///
/// # Safety
///
/// `ptr` is null or valid for reads of `declared` elements.
unsafe fn bounded_slice<'r, T>(
    ptr: *const T,
    declared: u32,
    array: &str,
    metrics: &MetricsRegistry,
) -> &'r [T] {
    if ptr.is_null() || declared == 0 {
        return &[];
    }

    let limit = entry_limit::<T>();
    let mut len = declared as usize;
    if len > limit {
        metrics.increment_entries_clamped();
        log_event_with_fields(
            Event::EntriesClamped,
            &[
                ("array", array),
                ("declared", &declared.to_string()),
                ("limit", &limit.to_string()),
            ],
        );
        len = limit;
    }

    unsafe { slice::from_raw_parts(ptr, len) }
}

/// Decode a group info record.
///
/// # Safety
///
/// `raw.global_id` is null or a NUL-terminated string.
pub(crate) unsafe fn decode_group_info(raw: &RawGroupInfo) -> GroupInfo {
    GroupInfo {
        global_id: unsafe { owned_string(raw.global_id) },
        state: GroupLifecycleState::from_code(raw.state),
        image_mode: ImageMirrorMode::from_code(raw.mirror_image_mode),
        primary: raw.primary != 0,
    }
}

/// Name of the first required site pointer that is null.
fn missing_site_field(site: &RawGroupSiteStatus) -> Option<&'static str> {
    if site.mirror_uuid.is_null() {
        Some("mirror_uuid")
    } else if site.mirror_image_global_ids.is_null() {
        Some("mirror_image_global_ids")
    } else if site.mirror_image_pool_ids.is_null() {
        Some("mirror_image_pool_ids")
    } else {
        None
    }
}

/// # Safety
///
/// Pointers in `image` are null or valid.
unsafe fn decode_image(image: &RawImageSiteStatus) -> ImageSiteStatus {
    unsafe {
        ImageSiteStatus {
            mirror_uuid: owned_string(image.mirror_uuid),
            state: ReplicaReplayState::from_image_code(i64::from(image.state)),
            description: owned_string(image.description),
            last_update: image.last_update as i64,
            up: image.up != 0,
        }
    }
}

/// # Safety
///
/// Pointers in `site` are null or valid for their declared counts.
unsafe fn decode_site(
    site: &RawGroupSiteStatus,
    index: usize,
    group: &str,
    metrics: &MetricsRegistry,
) -> Option<GroupSiteStatus> {
    if let Some(field) = missing_site_field(site) {
        metrics.increment_sites_skipped();
        log_event_with_fields(
            Event::SiteSkipped,
            &[
                ("group", group),
                ("index", &index.to_string()),
                ("null_field", field),
            ],
        );
        return None;
    }

    let raw_images = unsafe {
        bounded_slice(
            site.mirror_images,
            site.mirror_image_count,
            "mirror_images",
            metrics,
        )
    };

    let mut images = Vec::with_capacity(raw_images.len());
    for (image_index, image) in raw_images.iter().enumerate() {
        if image.mirror_uuid.is_null() {
            metrics.increment_images_skipped();
            log_event_with_fields(
                Event::ImageSkipped,
                &[
                    ("group", group),
                    ("image_index", &image_index.to_string()),
                    ("site_index", &index.to_string()),
                ],
            );
            continue;
        }
        images.push(unsafe { decode_image(image) });
    }

    // The two pointer-to-pointer fields were checked above. The string
    // behind the global id pointer may itself be null.
    let (pool_id, image_global_ids) = unsafe {
        (
            *site.mirror_image_pool_ids,
            owned_string(*site.mirror_image_global_ids),
        )
    };

    Some(GroupSiteStatus {
        mirror_uuid: unsafe { owned_string(site.mirror_uuid) },
        state: ReplicaReplayState::from_group_code(i64::from(site.state)),
        image_count: site.mirror_image_count,
        pool_id,
        image_global_ids,
        images,
        description: unsafe { owned_string(site.description) },
        last_update: site.last_update as i64,
        up: site.up != 0,
    })
}

/// Decode a global status record.
///
/// # Safety
///
/// Every non-null pointer reachable from `raw` is valid for reads for the
/// count declared next to it, and every string is NUL-terminated.
pub(crate) unsafe fn decode_global_status(
    raw: &RawGlobalStatus,
    metrics: &MetricsRegistry,
) -> GlobalGroupStatus {
    let name = unsafe { owned_string(raw.name) };
    let info = unsafe { decode_group_info(&raw.info) };

    let raw_sites = unsafe {
        bounded_slice(
            raw.site_statuses,
            raw.site_statuses_count,
            "site_statuses",
            metrics,
        )
    };

    let mut site_statuses = Vec::with_capacity(raw_sites.len());
    for (index, site) in raw_sites.iter().enumerate() {
        if let Some(decoded) = unsafe { decode_site(site, index, &name, metrics) } {
            site_statuses.push(decoded);
        }
    }

    metrics.increment_status_decodes();

    let status = GlobalGroupStatus {
        name,
        info,
        site_statuses_count: raw.site_statuses_count,
        site_statuses,
    };

    log_event_with_fields(
        Event::StatusDecoded,
        &[
            ("declared_sites", &status.site_statuses_count.to_string()),
            ("group", &status.name),
            ("sites", &status.site_statuses.len().to_string()),
        ],
    );

    status
}
