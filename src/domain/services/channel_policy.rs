//! Channel membership and administration rules.

use crate::domain::entities::ChannelRecord;

/// Decides which channel mutations an actor may perform.
///
/// Direct-message channels have no admins, so only deletion is restricted
/// there (to the creator).
pub struct ChannelPolicy;

impl ChannelPolicy {
    /// Admins may always add members; other members only when the group
    /// allows member invites.
    pub fn can_add_members(channel: &ChannelRecord, actor: &str) -> bool {
        !channel.is_group() || channel.is_admin(actor) || channel.allows_member_invites()
    }

    /// Only admins remove others from a group. Anyone may remove themselves.
    pub fn can_remove_members(channel: &ChannelRecord, actor: &str, members: &[String]) -> bool {
        if !channel.is_group() || channel.is_admin(actor) {
            return true;
        }
        !members.is_empty() && members.iter().all(|m| m == actor)
    }

    pub fn can_update(channel: &ChannelRecord, actor: &str) -> bool {
        !channel.is_group() || channel.is_admin(actor)
    }

    pub fn can_delete(channel: &ChannelRecord, actor: &str) -> bool {
        channel.created_by == actor || channel.is_admin(actor)
    }
}
