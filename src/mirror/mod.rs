//! Mirror group status and lifecycle
//!
//! Models the mirroring state of an RBD group (a consistency group of
//! block images) as reported by the storage backend:
//! - Lifecycle, replay and image mode enumerations
//! - Decoding of the backend's nested status record into owned values
//! - Resolution of the local site entry
//! - Enable, disable, promote, demote and resync requests
//! - Polling until a requested state is observed
//!
//! The backend is reached through two seams, [`CommandIssuer`] and
//! [`StatusProvider`]. [`MockBackend`] implements both in memory; the
//! `librbd` feature adds a binding to a real cluster.

mod backend;
mod client;
mod convergence;
mod decode;
mod errors;
mod ffi;
mod lifecycle;
mod mock;
mod state;
mod status;

#[cfg(feature = "librbd")]
pub mod librbd;

pub use backend::{
    CommandIssuer, CommandRequest, RawInfoGuard, RawStatusGuard, StatusProvider, OP_GET_GLOBAL_STATUS,
    OP_GET_INFO,
};
pub use client::MirrorGroupClient;
pub use convergence::{
    wait_for_info, wait_for_lifecycle_state, wait_for_local_status, wait_for_primary, PollConfig,
    DEFAULT_POLL_ATTEMPTS, DEFAULT_POLL_INTERVAL,
};
pub use decode::MAX_STATUS_ENTRIES;
pub use errors::{MirrorError, MirrorResult};
pub use ffi::{RawGlobalStatus, RawGroupInfo, RawGroupSiteStatus, RawImageSiteStatus};
pub use lifecycle::{
    validate_group_name, LifecycleOperation, OP_DEMOTE, OP_DISABLE, OP_ENABLE, OP_PROMOTE,
    OP_RESYNC, PARAM_FORCE, PARAM_GROUP_NAME, PARAM_IMAGE_MODE,
};
pub use mock::{MockBackend, MockGroup, MockImage, MockSite};
pub use state::{GroupLifecycleState, ImageMirrorMode, ReplicaReplayState};
pub use status::{is_local_site, GlobalGroupStatus, GroupInfo, GroupSiteStatus, ImageSiteStatus};
