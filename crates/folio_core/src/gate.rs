//! crates/folio_core/src/gate.rs
//!
//! The entitlement gate: pure admission decisions over (identity, item).

use crate::domain::{CapabilityTier, ContentItem, Identity};

/// The outcome of asking whether an identity may open an item.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Access {
    Granted,
    RequiresLogin,
    RequiresUpgrade,
}

/// Returns `true` if `identity` may open `item`.
///
/// Free items are open to everyone. Premium items need an identity holding
/// the VIP or the author capability; authors preview everything.
pub fn can_access(identity: Option<&Identity>, item: &ContentItem) -> bool {
    let tier = identity.map(|identity| identity.capabilities.tier());
    match (item.is_premium, tier) {
        (false, _) => true,
        (true, None) => false,
        (true, Some(CapabilityTier::Viewer)) => false,
        (true, Some(CapabilityTier::Vip | CapabilityTier::Author | CapabilityTier::VipAuthor)) => true,
    }
}

/// The call to action a details view should present for `item`.
pub fn access_decision(identity: Option<&Identity>, item: &ContentItem) -> Access {
    if can_access(identity, item) {
        Access::Granted
    } else if identity.is_none() {
        Access::RequiresLogin
    } else {
        Access::RequiresUpgrade
    }
}

/// Admission for opening a reading session, which always needs a signed-in reader.
pub fn read_admission(identity: Option<&Identity>, item: &ContentItem) -> Access {
    match identity {
        None => Access::RequiresLogin,
        Some(_) if can_access(identity, item) => Access::Granted,
        Some(_) => Access::RequiresUpgrade,
    }
}

/// Only authors may add items to the catalog.
pub fn can_publish(identity: Option<&Identity>) -> bool {
    matches!(
        identity.map(|identity| identity.capabilities.tier()),
        Some(CapabilityTier::Author | CapabilityTier::VipAuthor)
    )
}
