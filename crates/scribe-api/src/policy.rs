//! Pure access-control decisions. No I/O: every predicate takes the
//! request identity plus the minimum resource facts and returns a bool,
//! called synchronously inline with each handler.

use uuid::Uuid;

use scribe_types::models::Privacy;

use crate::middleware::Identity;

/// What a post listing should contain for a given identity. Listings are
/// filtered, never denied.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ListingScope {
    /// Admins see every post.
    All,
    /// Authenticated non-admins see Public plus their own.
    Visible(Uuid),
    /// Anonymous callers see Public only.
    PublicOnly,
}

pub fn listing_scope(identity: &Identity) -> ListingScope {
    if identity.is_admin {
        ListingScope::All
    } else if let Some(id) = identity.user_id() {
        ListingScope::Visible(id)
    } else {
        ListingScope::PublicOnly
    }
}

pub fn can_view_post(identity: &Identity, owner_id: Uuid, privacy: Privacy) -> bool {
    identity.is_admin || privacy == Privacy::Public || identity.user_id() == Some(owner_id)
}

/// The listing `editable` flag: ownership alone, admin status ignored.
pub fn is_editable(identity: &Identity, owner_id: Uuid) -> bool {
    identity.user_id() == Some(owner_id)
}

/// Edit is owner-only. The admin override applies to delete, not edit;
/// the asymmetry is intentional.
pub fn can_edit(identity: &Identity, owner_id: Uuid) -> bool {
    identity.user_id() == Some(owner_id)
}

pub fn can_delete(identity: &Identity, owner_id: Uuid) -> bool {
    identity.user_id() == Some(owner_id) || identity.is_admin
}

pub fn can_update_user(identity: &Identity, target_id: Uuid) -> bool {
    identity.user_id() == Some(target_id)
}

/// The actor must simultaneously be the target user AND an admin. Only a
/// self-admin can delete an account; admins cannot delete other accounts.
/// Likely intended as OR; kept as observed, see DESIGN.md.
pub fn can_delete_user(identity: &Identity, target_id: Uuid) -> bool {
    identity.user_id() == Some(target_id) && identity.is_admin
}
