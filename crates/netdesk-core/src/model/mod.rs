// ── Domain model ──
//
// The controller is generic over the record shape. `Entity` is the only
// structural requirement: a stable id, plus an optional activation flag
// that enables optimistic patches for activate/deactivate.

pub mod device;
pub mod page;
pub mod user;

use std::fmt::{Debug, Display};
use std::hash::Hash;

use serde::{Deserialize, Serialize};
use strum::{Display as StrumDisplay, EnumString};

pub use device::Device;
pub use page::{Page, PageQuery};
pub use user::{User, UserRole};

/// Bounds every entity id must satisfy. Integers in practice.
pub trait EntityKey: Copy + Ord + Hash + Debug + Display + Send + Sync + 'static {}

impl<K> EntityKey for K where K: Copy + Ord + Hash + Debug + Display + Send + Sync + 'static {}

/// Any server record with a stable unique id.
pub trait Entity: Clone + Send + Sync + 'static {
    type Id: EntityKey;

    fn id(&self) -> Self::Id;

    /// Current activation flag, if this record has one.
    fn active(&self) -> Option<bool> {
        None
    }

    /// Set the activation flag locally. Returns `false` when the record
    /// has no such flag and cannot be patched.
    fn set_active(&mut self, active: bool) -> bool {
        let _ = active;
        false
    }
}

/// Per-item mutation the controller can request from the backend.
#[derive(
    Debug,
    Clone,
    Copy,
    PartialEq,
    Eq,
    Hash,
    PartialOrd,
    Ord,
    Serialize,
    Deserialize,
    StrumDisplay,
    EnumString,
)]
#[serde(rename_all = "kebab-case")]
#[strum(serialize_all = "kebab-case")]
pub enum Action {
    Activate,
    Deactivate,
    Delete,
    /// Single-row only; never dispatched in bulk.
    ResetPassword,
}

impl Action {
    /// Whether this action may be fanned out over a selection.
    pub fn supports_bulk(self) -> bool {
        !matches!(self, Self::ResetPassword)
    }

    /// Target activation state for set-style actions.
    ///
    /// `Some` means the resulting state is fully predictable from the
    /// request, so a local patch can stand in for a refetch.
    pub fn target_active(self) -> Option<bool> {
        match self {
            Self::Activate => Some(true),
            Self::Deactivate => Some(false),
            Self::Delete | Self::ResetPassword => None,
        }
    }
}

impl From<Action> for netdesk_api::Mutation {
    fn from(action: Action) -> Self {
        match action {
            Action::Activate => Self::SetActive(true),
            Action::Deactivate => Self::SetActive(false),
            Action::Delete => Self::Delete,
            Action::ResetPassword => Self::ResetPassword,
        }
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use std::str::FromStr;

    use super::*;

    #[test]
    fn action_names_are_kebab_case() {
        assert_eq!(Action::ResetPassword.to_string(), "reset-password");
        assert_eq!(Action::from_str("deactivate").unwrap(), Action::Deactivate);
    }

    #[test]
    fn reset_password_is_single_row_only() {
        assert!(Action::Delete.supports_bulk());
        assert!(!Action::ResetPassword.supports_bulk());
    }
}
