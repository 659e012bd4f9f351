//! Raw Backend Status Layout
//!
//! `#[repr(C)]` mirrors of the librbd mirror group status structs.
//!
//! Enumerations are carried as `c_int` and booleans as a byte so that any
//! value the backend writes is a valid Rust value. The all-zero default
//! is the "nothing acquired" state handed to a fetch call.

use std::ffi::{c_char, c_int};
use std::ptr;

/// `rbd_mirror_group_info_t`
#[repr(C)]
#[derive(Debug)]
pub struct RawGroupInfo {
    pub global_id: *mut c_char,
    pub mirror_image_mode: c_int,
    pub state: c_int,
    pub primary: u8,
}

impl Default for RawGroupInfo {
    fn default() -> Self {
        Self {
            global_id: ptr::null_mut(),
            mirror_image_mode: 0,
            state: 0,
            primary: 0,
        }
    }
}

impl RawGroupInfo {
    /// Whether the record holds any backend allocation.
    pub fn holds_allocation(&self) -> bool {
        !self.global_id.is_null()
    }
}

/// `rbd_mirror_image_site_status_t`
#[repr(C)]
#[derive(Debug)]
pub struct RawImageSiteStatus {
    pub mirror_uuid: *mut c_char,
    pub state: c_int,
    pub description: *mut c_char,
    pub last_update: libc::time_t,
    pub up: u8,
}

/// `rbd_mirror_group_site_status_t`
#[repr(C)]
#[derive(Debug)]
pub struct RawGroupSiteStatus {
    pub mirror_uuid: *mut c_char,
    pub state: c_int,
    pub mirror_image_count: u32,
    pub mirror_image_pool_ids: *mut i64,
    pub mirror_image_global_ids: *mut *mut c_char,
    pub mirror_images: *mut RawImageSiteStatus,
    pub description: *mut c_char,
    pub last_update: libc::time_t,
    pub up: u8,
}

/// `rbd_mirror_group_global_status_t`
#[repr(C)]
#[derive(Debug)]
pub struct RawGlobalStatus {
    pub name: *mut c_char,
    pub info: RawGroupInfo,
    pub site_statuses_count: u32,
    pub site_statuses: *mut RawGroupSiteStatus,
}

impl Default for RawGlobalStatus {
    fn default() -> Self {
        Self {
            name: ptr::null_mut(),
            info: RawGroupInfo::default(),
            site_statuses_count: 0,
            site_statuses: ptr::null_mut(),
        }
    }
}

impl RawGlobalStatus {
    /// Whether the record holds any backend allocation.
    ///
    /// A failed fetch may still have filled part of the record.
    pub fn holds_allocation(&self) -> bool {
        !self.name.is_null() || !self.site_statuses.is_null() || self.info.holds_allocation()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_holds_nothing() {
        assert!(!RawGlobalStatus::default().holds_allocation());
        assert!(!RawGroupInfo::default().holds_allocation());
    }

    #[test]
    fn test_partial_fill_is_detected() {
        let mut name = *b"g1\0";
        let status = RawGlobalStatus {
            name: name.as_mut_ptr().cast(),
            ..RawGlobalStatus::default()
        };
        assert!(status.holds_allocation());
    }
}
