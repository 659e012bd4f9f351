//! Lifecycle Operations
//!
//! Enable, disable, promote, demote and resync are one-shot requests. Each
//! validates the group name, builds a single [`CommandRequest`] and hands
//! it to the backend. None of them waits for the resulting state; callers
//! poll status to observe convergence.
//!
//! Observed lifecycle (driven by the backend, not by these requests):
//!
//! ```text
//! Disabled -> Enabling -> Enabled -> Disabling -> Disabled
//! ```
//!
//! Promote and demote change the primary/secondary role inside Enabled.
//! Resync only makes sense while Enabled and pushes replay back toward
//! starting_replay.

use super::backend::CommandRequest;
use super::errors::{MirrorError, MirrorResult};
use super::state::ImageMirrorMode;

pub const OP_ENABLE: &str = "mirror_group_enable";
pub const OP_DISABLE: &str = "mirror_group_disable";
pub const OP_PROMOTE: &str = "mirror_group_promote";
pub const OP_DEMOTE: &str = "mirror_group_demote";
pub const OP_RESYNC: &str = "mirror_group_resync";

pub const PARAM_GROUP_NAME: &str = "group_name";
pub const PARAM_IMAGE_MODE: &str = "mirror_image_mode";
pub const PARAM_FORCE: &str = "force";

/// Reject names the backend cannot address.
pub fn validate_group_name(name: &str) -> MirrorResult<()> {
    let reason = if name.is_empty() {
        "name is empty"
    } else if name.contains('\0') {
        "contains a NUL byte"
    } else if name.contains('/') {
        "contains '/'"
    } else if name.contains('@') {
        "contains '@'"
    } else {
        return Ok(());
    };

    Err(MirrorError::InvalidGroupName {
        name: name.to_string(),
        reason,
    })
}

/// A lifecycle control action.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LifecycleOperation {
    /// Start mirroring the group's images in the given mode
    Enable { mode: ImageMirrorMode },
    /// Stop mirroring; `force` proceeds even if peers cannot be reached
    Disable { force: bool },
    /// Make this site primary; `force` overrides a detected split-brain
    Promote { force: bool },
    /// Make this site secondary
    Demote,
    /// Throw away local divergence and resync from the primary
    Resync,
}

impl LifecycleOperation {
    /// Backend operation name.
    pub fn name(&self) -> &'static str {
        match self {
            Self::Enable { .. } => OP_ENABLE,
            Self::Disable { .. } => OP_DISABLE,
            Self::Promote { .. } => OP_PROMOTE,
            Self::Demote => OP_DEMOTE,
            Self::Resync => OP_RESYNC,
        }
    }

    /// Build the backend request for `group`.
    pub fn to_request(&self, group: &str) -> MirrorResult<CommandRequest> {
        validate_group_name(group)?;

        let request = CommandRequest::new(self.name()).with_param(PARAM_GROUP_NAME, group);

        let request = match self {
            Self::Enable { mode } => {
                if let ImageMirrorMode::Unknown(code) = mode {
                    return Err(MirrorError::InvalidImageMode(format!("unknown({})", code)));
                }
                request.with_param(PARAM_IMAGE_MODE, mode.code())
            }
            Self::Disable { force } | Self::Promote { force } => {
                request.with_param(PARAM_FORCE, force)
            }
            Self::Demote | Self::Resync => request,
        };

        Ok(request)
    }
}
