//! librados / librbd binding
//!
//! Only built with the `librbd` feature. Links against the system
//! `librados` and `librbd` shared libraries.
//!
//! [`RbdPool`] is an open pool io-context and implements both backend
//! seams; [`RadosConnection`] owns the cluster handle and outlives every
//! pool opened from it.

use std::ffi::{c_char, c_int, c_void, CStr, CString};
use std::path::Path;
use std::ptr;
use std::sync::Arc;

use super::backend::{CommandIssuer, CommandRequest, StatusProvider};
use super::errors::{check_return, MirrorError, MirrorResult};
use super::ffi::{RawGlobalStatus, RawGroupInfo};
use super::lifecycle::{
    OP_DEMOTE, OP_DISABLE, OP_ENABLE, OP_PROMOTE, OP_RESYNC, PARAM_FORCE, PARAM_GROUP_NAME,
    PARAM_IMAGE_MODE,
};

type RadosHandle = *mut c_void;
type IoCtxHandle = *mut c_void;

#[link(name = "rados")]
extern "C" {
    fn rados_create(cluster: *mut RadosHandle, id: *const c_char) -> c_int;
    fn rados_conf_read_file(cluster: RadosHandle, path: *const c_char) -> c_int;
    fn rados_connect(cluster: RadosHandle) -> c_int;
    fn rados_shutdown(cluster: RadosHandle);
    fn rados_ioctx_create(cluster: RadosHandle, pool: *const c_char, ioctx: *mut IoCtxHandle) -> c_int;
    fn rados_ioctx_destroy(ioctx: IoCtxHandle);
}

#[link(name = "rbd")]
extern "C" {
    fn rbd_mirror_group_enable(p: IoCtxHandle, name: *const c_char, mode: c_int) -> c_int;
    fn rbd_mirror_group_disable(p: IoCtxHandle, name: *const c_char, force: bool) -> c_int;
    fn rbd_mirror_group_promote(p: IoCtxHandle, name: *const c_char, force: bool) -> c_int;
    fn rbd_mirror_group_demote(p: IoCtxHandle, name: *const c_char) -> c_int;
    fn rbd_mirror_group_resync(p: IoCtxHandle, name: *const c_char) -> c_int;
    fn rbd_mirror_group_get_info(
        p: IoCtxHandle,
        name: *const c_char,
        info: *mut RawGroupInfo,
        info_size: usize,
    ) -> c_int;
    fn rbd_mirror_group_get_info_cleanup(info: *mut RawGroupInfo);
    fn rbd_mirror_group_get_global_status(
        p: IoCtxHandle,
        name: *const c_char,
        status: *mut RawGlobalStatus,
        status_size: usize,
    ) -> c_int;
    fn rbd_mirror_group_global_status_cleanup(status: *mut RawGlobalStatus);
}

fn c_string(operation: &str, value: &str) -> MirrorResult<CString> {
    CString::new(value).map_err(|_| MirrorError::invalid_command(operation, "value contains a NUL byte"))
}

/// A connected cluster handle. Shut down on drop.
pub struct RadosConnection {
    handle: RadosHandle,
}

// librados handles may be used from any thread.
unsafe impl Send for RadosConnection {}
unsafe impl Sync for RadosConnection {}

impl RadosConnection {
    /// Connect as `client.<client_id>`, reading `conf` or the default
    /// search path when `None`.
    pub fn connect(client_id: &str, conf: Option<&Path>) -> MirrorResult<Arc<Self>> {
        let id = c_string("rados_create", client_id)?;
        let mut handle: RadosHandle = ptr::null_mut();
        check_return("rados_create", unsafe { rados_create(&mut handle, id.as_ptr()) })?;

        // Owned from here so every later failure shuts the handle down.
        let connection = Self { handle };

        let conf = conf
            .map(|path| c_string("rados_conf_read_file", &path.to_string_lossy()))
            .transpose()?;
        let conf_ptr = conf.as_ref().map_or(ptr::null(), |c| c.as_ptr());
        check_return("rados_conf_read_file", unsafe {
            rados_conf_read_file(connection.handle, conf_ptr)
        })?;
        check_return("rados_connect", unsafe { rados_connect(connection.handle) })?;

        Ok(Arc::new(connection))
    }

    /// Open an io-context on `pool`.
    pub fn open_pool(self: &Arc<Self>, pool: &str) -> MirrorResult<RbdPool> {
        let name = c_string("rados_ioctx_create", pool)?;
        let mut ioctx: IoCtxHandle = ptr::null_mut();
        check_return("rados_ioctx_create", unsafe {
            rados_ioctx_create(self.handle, name.as_ptr(), &mut ioctx)
        })?;

        Ok(RbdPool {
            ioctx,
            _connection: Arc::clone(self),
        })
    }
}

impl Drop for RadosConnection {
    fn drop(&mut self) {
        unsafe { rados_shutdown(self.handle) };
    }
}

/// An open pool. Implements [`CommandIssuer`] and [`StatusProvider`].
pub struct RbdPool {
    ioctx: IoCtxHandle,
    _connection: Arc<RadosConnection>,
}

unsafe impl Send for RbdPool {}
unsafe impl Sync for RbdPool {}

impl Drop for RbdPool {
    fn drop(&mut self) {
        unsafe { rados_ioctx_destroy(self.ioctx) };
    }
}

impl CommandIssuer for RbdPool {
    fn issue(&self, request: &CommandRequest) -> MirrorResult<()> {
        let operation = request.name();
        let name = c_string(operation, request.require(PARAM_GROUP_NAME)?)?;
        let group = name.as_ptr();

        let ret = match operation {
            OP_ENABLE => {
                let mode = request.require_int(PARAM_IMAGE_MODE)?;
                let mode = c_int::try_from(mode).map_err(|_| {
                    MirrorError::invalid_command(operation, "image mode out of range")
                })?;
                unsafe { rbd_mirror_group_enable(self.ioctx, group, mode) }
            }
            OP_DISABLE => {
                let force = request.require_bool(PARAM_FORCE)?;
                unsafe { rbd_mirror_group_disable(self.ioctx, group, force) }
            }
            OP_PROMOTE => {
                let force = request.require_bool(PARAM_FORCE)?;
                unsafe { rbd_mirror_group_promote(self.ioctx, group, force) }
            }
            OP_DEMOTE => unsafe { rbd_mirror_group_demote(self.ioctx, group) },
            OP_RESYNC => unsafe { rbd_mirror_group_resync(self.ioctx, group) },
            other => return Err(MirrorError::UnsupportedCommand(other.to_string())),
        };

        check_return(operation, ret)
    }
}

// librbd owns every pointer it stores in the records until the matching
// cleanup call.
unsafe impl StatusProvider for RbdPool {
    fn fetch_group_info(&self, group: &CStr, out: &mut RawGroupInfo) -> c_int {
        unsafe {
            rbd_mirror_group_get_info(
                self.ioctx,
                group.as_ptr(),
                out,
                std::mem::size_of::<RawGroupInfo>(),
            )
        }
    }

    unsafe fn release_group_info(&self, info: &mut RawGroupInfo) {
        unsafe { rbd_mirror_group_get_info_cleanup(info) };
    }

    fn fetch_global_status(&self, group: &CStr, out: &mut RawGlobalStatus) -> c_int {
        unsafe {
            rbd_mirror_group_get_global_status(
                self.ioctx,
                group.as_ptr(),
                out,
                std::mem::size_of::<RawGlobalStatus>(),
            )
        }
    }

    unsafe fn release_global_status(&self, status: &mut RawGlobalStatus) {
        unsafe { rbd_mirror_group_global_status_cleanup(status) };
    }
}
