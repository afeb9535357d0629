/// Authorization helpers and permission checks
///
/// Permissions are scoped to one group or game. A caller passes a check by
/// holding a membership of the target; administrative operations further
/// require the `creator` or `moderator` role.
///
/// # Permission Model
///
/// 1. **Membership**: the caller must be a member of the group/game, otherwise
///    the target is treated as not found for them
/// 2. **Role**: request handling, member removal, update and delete require
///    [`MemberRole::can_moderate`]
///
/// # Example
///
/// ```no_run
/// use huddle_shared::auth::authorization::require_moderator;
/// use huddle_shared::models::membership::Target;
/// use huddle_shared::store::Store;
/// use uuid::Uuid;
///
/// async fn check(store: &dyn Store, group_id: Uuid, caller: Uuid) -> Result<(), String> {
///     require_moderator(store, Target::group(group_id), caller)
///         .await
///         .map_err(|e| e.to_string())?;
///     Ok(())
/// }
/// ```

use uuid::Uuid;

use crate::models::membership::{Member, MemberRole, Target};
use crate::store::{Store, StoreError};

/// Error type for authorization checks
#[derive(Debug, thiserror::Error)]
pub enum AuthzError {
    /// Caller holds no membership of the target
    #[error("User is not part of the {}", .0.kind.as_str())]
    NotMember(Target),

    /// Caller is a member but lacks an administrative role
    #[error("User must be a creator or moderator of the {}", .target.kind.as_str())]
    InsufficientRole { target: Target, actual: MemberRole },

    /// Store error
    #[error("Store error: {0}")]
    Store(#[from] StoreError),
}

/// Loads the caller's membership of `target`
///
/// # Errors
///
/// Returns `AuthzError::NotMember` if the caller is not a member
pub async fn require_member(
    store: &dyn Store,
    target: Target,
    user_id: Uuid,
) -> Result<Member, AuthzError> {
    store
        .find_member(target, user_id)
        .await?
        .ok_or(AuthzError::NotMember(target))
}

/// Checks that the caller is a creator or moderator of `target`
///
/// # Errors
///
/// Returns `AuthzError::NotMember` for non-members and
/// `AuthzError::InsufficientRole` for plain members
pub async fn require_moderator(
    store: &dyn Store,
    target: Target,
    user_id: Uuid,
) -> Result<Member, AuthzError> {
    let member = require_member(store, target, user_id).await?;
    check_moderator(target, &member)?;
    Ok(member)
}

/// Role half of [`require_moderator`], for callers that already hold the membership
pub fn check_moderator(target: Target, member: &Member) -> Result<(), AuthzError> {
    if !member.role.can_moderate() {
        return Err(AuthzError::InsufficientRole {
            target,
            actual: member.role,
        });
    }

    Ok(())
}
