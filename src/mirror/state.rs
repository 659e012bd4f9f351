//! Mirror State Enumerations
//!
//! Backend codes are mapped onto closed enums with an explicit fallback
//! variant that keeps the raw code. An unrecognized code never fails a
//! decode; it renders as `unknown(<code>)` so the value is not lost when
//! the backend grows a state this crate does not know yet.

use std::fmt;
use std::str::FromStr;

use serde::{Serialize, Serializer};

use super::errors::MirrorError;

/// Mirroring on/off transition state of a group.
///
/// Driven only by the backend in response to enable/disable requests.
/// Observed through a fresh [`GroupInfo`](super::GroupInfo) decode.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum GroupLifecycleState {
    Disabling,
    Enabling,
    Enabled,
    Disabled,
    /// Code not known to this crate
    Unknown(i32),
}

impl GroupLifecycleState {
    pub const CODE_DISABLING: i32 = 0;
    pub const CODE_ENABLING: i32 = 1;
    pub const CODE_ENABLED: i32 = 2;
    pub const CODE_DISABLED: i32 = 3;

    /// Map a backend `rbd_mirror_group_state_t` value.
    pub fn from_code(code: i32) -> Self {
        match code {
            Self::CODE_DISABLING => Self::Disabling,
            Self::CODE_ENABLING => Self::Enabling,
            Self::CODE_ENABLED => Self::Enabled,
            Self::CODE_DISABLED => Self::Disabled,
            other => Self::Unknown(other),
        }
    }

    /// Backend code for this state.
    pub fn code(&self) -> i32 {
        match self {
            Self::Disabling => Self::CODE_DISABLING,
            Self::Enabling => Self::CODE_ENABLING,
            Self::Enabled => Self::CODE_ENABLED,
            Self::Disabled => Self::CODE_DISABLED,
            Self::Unknown(code) => *code,
        }
    }

    /// Position on the lifecycle cycle
    /// Disabled -> Enabling -> Enabled -> Disabling -> Disabled.
    fn cycle_position(&self) -> Option<u8> {
        match self {
            Self::Disabled => Some(0),
            Self::Enabling => Some(1),
            Self::Enabled => Some(2),
            Self::Disabling => Some(3),
            Self::Unknown(_) => None,
        }
    }

    /// Whether a poller may observe `next` directly after `self`.
    ///
    /// Lifecycle states only move forward along the cycle. A poller can
    /// miss one intermediate state, so up to two forward steps are
    /// accepted; anything further means a state went backwards (for
    /// example Enabling straight to Disabled). Unknown codes are accepted
    /// in either position.
    pub fn can_transition_to(&self, next: GroupLifecycleState) -> bool {
        match (self.cycle_position(), next.cycle_position()) {
            (Some(from), Some(to)) => (to + 4 - from) % 4 <= 2,
            _ => true,
        }
    }

    /// Whether mirroring is fully on.
    pub fn is_enabled(&self) -> bool {
        matches!(self, Self::Enabled)
    }

    /// Whether a transition is in flight.
    pub fn is_transitioning(&self) -> bool {
        matches!(self, Self::Enabling | Self::Disabling)
    }
}

impl fmt::Display for GroupLifecycleState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Disabling => f.write_str("disabling"),
            Self::Enabling => f.write_str("enabling"),
            Self::Enabled => f.write_str("enabled"),
            Self::Disabled => f.write_str("disabled"),
            Self::Unknown(code) => write!(f, "unknown({})", code),
        }
    }
}

/// Replay/sync progress of one site's copy of a group or image.
///
/// Group-level and image-level backend codes use different numbering;
/// pick the matching constructor. `Syncing` only exists at image level.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ReplicaReplayState {
    Unknown,
    Error,
    Syncing,
    StartingReplay,
    Replaying,
    StoppingReplay,
    Stopped,
    /// Code not known to this crate
    Other(i64),
}

impl ReplicaReplayState {
    /// Map a backend `rbd_mirror_group_status_state_t` value.
    pub fn from_group_code(code: i64) -> Self {
        match code {
            0 => Self::Unknown,
            1 => Self::Error,
            2 => Self::StartingReplay,
            3 => Self::Replaying,
            4 => Self::StoppingReplay,
            5 => Self::Stopped,
            other => Self::Other(other),
        }
    }

    /// Map a backend `rbd_mirror_image_status_state_t` value.
    pub fn from_image_code(code: i64) -> Self {
        match code {
            0 => Self::Unknown,
            1 => Self::Error,
            2 => Self::Syncing,
            3 => Self::StartingReplay,
            4 => Self::Replaying,
            5 => Self::StoppingReplay,
            6 => Self::Stopped,
            other => Self::Other(other),
        }
    }

    /// Group-level backend code. `Syncing` has no group-level code and
    /// maps to the image-level value.
    pub fn group_code(&self) -> i64 {
        match self {
            Self::Unknown => 0,
            Self::Error => 1,
            Self::StartingReplay => 2,
            Self::Replaying => 3,
            Self::StoppingReplay => 4,
            Self::Stopped => 5,
            Self::Syncing => 2,
            Self::Other(code) => *code,
        }
    }

    /// Image-level backend code.
    pub fn image_code(&self) -> i64 {
        match self {
            Self::Unknown => 0,
            Self::Error => 1,
            Self::Syncing => 2,
            Self::StartingReplay => 3,
            Self::Replaying => 4,
            Self::StoppingReplay => 5,
            Self::Stopped => 6,
            Self::Other(code) => *code,
        }
    }

    pub fn is_error(&self) -> bool {
        matches!(self, Self::Error)
    }
}

impl fmt::Display for ReplicaReplayState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Unknown => f.write_str("unknown"),
            Self::Error => f.write_str("error"),
            Self::Syncing => f.write_str("syncing"),
            Self::StartingReplay => f.write_str("starting_replay"),
            Self::Replaying => f.write_str("replaying"),
            Self::StoppingReplay => f.write_str("stopping_replay"),
            Self::Stopped => f.write_str("stopped"),
            Self::Other(code) => write!(f, "unknown({})", code),
        }
    }
}

/// How member images of a group are mirrored.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ImageMirrorMode {
    Journal,
    Snapshot,
    /// Code not known to this crate
    Unknown(i32),
}

impl ImageMirrorMode {
    /// Map a backend `rbd_mirror_image_mode_t` value.
    pub fn from_code(code: i32) -> Self {
        match code {
            0 => Self::Journal,
            1 => Self::Snapshot,
            other => Self::Unknown(other),
        }
    }

    pub fn code(&self) -> i32 {
        match self {
            Self::Journal => 0,
            Self::Snapshot => 1,
            Self::Unknown(code) => *code,
        }
    }
}

impl fmt::Display for ImageMirrorMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Journal => f.write_str("journal"),
            Self::Snapshot => f.write_str("snapshot"),
            Self::Unknown(code) => write!(f, "unknown({})", code),
        }
    }
}

impl FromStr for ImageMirrorMode {
    type Err = MirrorError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "journal" => Ok(Self::Journal),
            "snapshot" => Ok(Self::Snapshot),
            other => Err(MirrorError::InvalidImageMode(other.to_string())),
        }
    }
}

macro_rules! serialize_as_label {
    ($($ty:ty),*) => {
        $(
            impl Serialize for $ty {
                fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
                    serializer.collect_str(self)
                }
            }
        )*
    };
}

serialize_as_label!(GroupLifecycleState, ReplicaReplayState, ImageMirrorMode);

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_lifecycle_codes_round_trip() {
        for code in 0..4 {
            assert_eq!(GroupLifecycleState::from_code(code).code(), code);
        }
    }

    #[test]
    fn test_lifecycle_labels() {
        assert_eq!(GroupLifecycleState::Enabling.to_string(), "enabling");
        assert_eq!(GroupLifecycleState::Enabled.to_string(), "enabled");
        assert_eq!(GroupLifecycleState::Disabling.to_string(), "disabling");
        assert_eq!(GroupLifecycleState::Disabled.to_string(), "disabled");
    }

    #[test]
    fn test_unknown_lifecycle_code_keeps_value() {
        let state = GroupLifecycleState::from_code(42);
        assert_eq!(state, GroupLifecycleState::Unknown(42));
        assert_eq!(state.to_string(), "unknown(42)");
        assert_eq!(state.code(), 42);
    }

    #[test]
    fn test_negative_lifecycle_code() {
        assert_eq!(GroupLifecycleState::from_code(-1).to_string(), "unknown(-1)");
    }

    #[test]
    fn test_group_replay_codes() {
        assert_eq!(ReplicaReplayState::from_group_code(0), ReplicaReplayState::Unknown);
        assert_eq!(ReplicaReplayState::from_group_code(1), ReplicaReplayState::Error);
        assert_eq!(ReplicaReplayState::from_group_code(2), ReplicaReplayState::StartingReplay);
        assert_eq!(ReplicaReplayState::from_group_code(3), ReplicaReplayState::Replaying);
        assert_eq!(ReplicaReplayState::from_group_code(4), ReplicaReplayState::StoppingReplay);
        assert_eq!(ReplicaReplayState::from_group_code(5), ReplicaReplayState::Stopped);
    }

    #[test]
    fn test_image_replay_codes_are_shifted() {
        assert_eq!(ReplicaReplayState::from_image_code(2), ReplicaReplayState::Syncing);
        assert_eq!(ReplicaReplayState::from_image_code(4), ReplicaReplayState::Replaying);
        assert_eq!(ReplicaReplayState::from_image_code(6), ReplicaReplayState::Stopped);
        assert_eq!(ReplicaReplayState::Replaying.image_code(), 4);
        assert_eq!(ReplicaReplayState::Replaying.group_code(), 3);
    }

    #[test]
    fn test_unknown_replay_code_label() {
        let state = ReplicaReplayState::from_group_code(17);
        assert_eq!(state, ReplicaReplayState::Other(17));
        assert_eq!(state.to_string(), "unknown(17)");
        assert_eq!(ReplicaReplayState::from_image_code(7).to_string(), "unknown(7)");
    }

    #[test]
    fn test_replay_labels() {
        assert_eq!(ReplicaReplayState::Unknown.to_string(), "unknown");
        assert_eq!(ReplicaReplayState::StartingReplay.to_string(), "starting_replay");
        assert_eq!(ReplicaReplayState::StoppingReplay.to_string(), "stopping_replay");
        assert_eq!(ReplicaReplayState::Stopped.to_string(), "stopped");
    }

    #[test]
    fn test_image_mode_parse() {
        assert_eq!("snapshot".parse::<ImageMirrorMode>().unwrap(), ImageMirrorMode::Snapshot);
        assert_eq!("journal".parse::<ImageMirrorMode>().unwrap(), ImageMirrorMode::Journal);
        assert!("bogus".parse::<ImageMirrorMode>().is_err());
        assert_eq!(ImageMirrorMode::from_code(9).to_string(), "unknown(9)");
    }

    #[test]
    fn test_forward_transitions_allowed() {
        use GroupLifecycleState::*;
        assert!(Disabled.can_transition_to(Enabling));
        assert!(Enabling.can_transition_to(Enabled));
        assert!(Enabled.can_transition_to(Disabling));
        assert!(Disabling.can_transition_to(Disabled));
        assert!(Enabled.can_transition_to(Enabled));
        // one missed sample
        assert!(Disabled.can_transition_to(Enabled));
        assert!(Enabled.can_transition_to(Disabled));
        assert!(Disabling.can_transition_to(Enabling));
        assert!(GroupLifecycleState::Unknown(8).can_transition_to(Disabled));
    }

    #[test]
    fn test_backward_moves_are_forbidden() {
        use GroupLifecycleState::*;
        assert!(!Enabling.can_transition_to(Disabled));
        assert!(!Enabled.can_transition_to(Enabling));
        assert!(!Disabling.can_transition_to(Enabled));
        assert!(!Disabled.can_transition_to(Disabling));
    }

    #[test]
    fn test_serializes_as_label() {
        let json = serde_json::to_string(&GroupLifecycleState::Unknown(9)).unwrap();
        assert_eq!(json, "\"unknown(9)\"");
        let json = serde_json::to_string(&ReplicaReplayState::Replaying).unwrap();
        assert_eq!(json, "\"replaying\"");
    }
}
