/// Request and member operations shared by groups and games
///
/// Every operation takes a [`Target`], so groups and games run through the
/// same code. The only kind-specific rule is that leaving or being removed
/// from a group also drops the user from that group's games.
///
/// # Authorization
///
/// Listing, accepting and denying requests, and removing members, require the
/// caller to be a creator or moderator of the target. Non-members get
/// `NotFound`, plain members get `Unauthorized`.

use std::sync::Arc;

use tracing::{debug, info, warn};
use uuid::Uuid;
use validator::{Validate, ValidationErrors};

use crate::auth::authorization::{require_moderator, AuthzError};
use crate::models::membership::{
    EntityKind, JoinRequest, Member, MemberRole, NewJoinRequest, Target,
};
use crate::store::{Store, StoreError};

/// Error type for group, game and membership operations
#[derive(Debug, thiserror::Error)]
pub enum MembershipError {
    /// Entity, request or membership doesn't exist (or is hidden from the caller)
    #[error("{0}")]
    NotFound(String),

    /// Caller lacks the role the operation requires
    #[error("{0}")]
    Unauthorized(String),

    /// Duplicate request, duplicate membership, taken name, or a lost race
    #[error("{0}")]
    Conflict(String),

    /// Input failed validation
    #[error("Validation failed: {0}")]
    Validation(#[from] ValidationErrors),

    /// Store failure
    #[error("Store error: {0}")]
    Store(StoreError),
}

impl From<StoreError> for MembershipError {
    fn from(err: StoreError) -> Self {
        match err {
            StoreError::Conflict(constraint) | StoreError::Reference(constraint) => {
                MembershipError::Conflict(describe_conflict(&constraint))
            }
            other => MembershipError::Store(other),
        }
    }
}

impl From<AuthzError> for MembershipError {
    fn from(err: AuthzError) -> Self {
        match err {
            AuthzError::NotMember(_) => MembershipError::NotFound(err.to_string()),
            AuthzError::InsufficientRole { .. } => MembershipError::Unauthorized(err.to_string()),
            AuthzError::Store(e) => e.into(),
        }
    }
}

/// Human message for a violated constraint
fn describe_conflict(constraint: &str) -> String {
    match constraint {
        "groups_name_key" => "A group with that name already exists".to_string(),
        "users_email_key" => "Email is already registered".to_string(),
        "group_requests_group_user_key" | "game_requests_game_user_key" => {
            "User already made request".to_string()
        }
        "group_members_pkey" | "game_members_pkey" => "User is already a member".to_string(),
        other => format!("Conflicting change ({other}), please retry"),
    }
}

/// Message for a missing group or game
pub(crate) fn entity_not_found(target: Target) -> MembershipError {
    MembershipError::NotFound(match target.kind {
        EntityKind::Group => format!("Group not found with id of {}", target.id),
        EntityKind::Game => format!("No game with the id of {}", target.id),
    })
}

/// Request and member operations on groups and games
#[derive(Clone)]
pub struct MembershipService {
    store: Arc<dyn Store>,
}

impl MembershipService {
    pub fn new(store: Arc<dyn Store>) -> Self {
        Self { store }
    }

    /// Fails with `NotFound` unless the group or game exists
    pub async fn ensure_exists(&self, target: Target) -> Result<(), MembershipError> {
        let exists = match target.kind {
            EntityKind::Group => self.store.find_group(target.id).await?.is_some(),
            EntityKind::Game => self.store.find_game(target.id).await?.is_some(),
        };

        if !exists {
            return Err(entity_not_found(target));
        }

        Ok(())
    }

    /// Every membership a user loses when leaving `target`
    ///
    /// For a group that is the group itself plus each of its games.
    async fn departure_targets(&self, target: Target) -> Result<Vec<Target>, MembershipError> {
        let mut targets = Vec::new();

        if target.kind == EntityKind::Group {
            targets.extend(
                self.store
                    .list_group_games(target.id)
                    .await?
                    .into_iter()
                    .map(|g| Target::game(g.game_id)),
            );
        }
        targets.push(target);

        Ok(targets)
    }

    /// Files a join request for `requester`
    ///
    /// # Errors
    ///
    /// - `NotFound` if the entity doesn't exist
    /// - `Conflict` if the requester already asked or already belongs
    pub async fn request_join(
        &self,
        target: Target,
        requester: Uuid,
        input: NewJoinRequest,
    ) -> Result<JoinRequest, MembershipError> {
        let input = input.normalized();
        input.validate()?;

        self.ensure_exists(target).await?;

        if self.store.find_member(target, requester).await?.is_some() {
            return Err(MembershipError::Conflict(format!(
                "User is already part of the {}",
                target.kind.as_str()
            )));
        }
        if self
            .store
            .find_request_by_user(target, requester)
            .await?
            .is_some()
        {
            return Err(MembershipError::Conflict("User already made request".to_string()));
        }

        let request = self
            .store
            .create_request(target, requester, input.message)
            .await?;

        info!(%target, user_id = %requester, request_id = %request.id, "Join request filed");

        Ok(request)
    }

    /// Lists pending requests; creator/moderator only
    pub async fn list_requests(
        &self,
        target: Target,
        caller: Uuid,
    ) -> Result<Vec<JoinRequest>, MembershipError> {
        self.ensure_exists(target).await?;
        require_moderator(self.store.as_ref(), target, caller).await?;

        Ok(self.store.list_requests(target).await?)
    }

    /// Fetches one pending request; creator/moderator only
    pub async fn get_request(
        &self,
        target: Target,
        request_id: Uuid,
        caller: Uuid,
    ) -> Result<JoinRequest, MembershipError> {
        self.ensure_exists(target).await?;
        require_moderator(self.store.as_ref(), target, caller).await?;

        self.store
            .find_request(target, request_id)
            .await?
            .ok_or_else(request_not_found)
    }

    /// Turns a request into a plain membership; creator/moderator only
    ///
    /// The request's user joins with role `user` and the request disappears,
    /// in one store operation.
    pub async fn accept_request(
        &self,
        target: Target,
        request_id: Uuid,
        caller: Uuid,
    ) -> Result<Member, MembershipError> {
        self.ensure_exists(target).await?;
        require_moderator(self.store.as_ref(), target, caller).await?;

        let member = self
            .store
            .accept_request(target, request_id)
            .await?
            .ok_or_else(request_not_found)?;

        info!(
            %target,
            user_id = %member.user_id,
            accepted_by = %caller,
            "Join request accepted"
        );

        Ok(member)
    }

    /// Discards a request; creator/moderator only
    pub async fn deny_request(
        &self,
        target: Target,
        request_id: Uuid,
        caller: Uuid,
    ) -> Result<JoinRequest, MembershipError> {
        self.ensure_exists(target).await?;
        require_moderator(self.store.as_ref(), target, caller).await?;

        let request = self
            .store
            .delete_request(target, request_id)
            .await?
            .ok_or_else(request_not_found)?;

        info!(%target, user_id = %request.user_id, denied_by = %caller, "Join request denied");

        Ok(request)
    }

    pub async fn list_members(&self, target: Target) -> Result<Vec<Member>, MembershipError> {
        self.ensure_exists(target).await?;
        Ok(self.store.list_members(target).await?)
    }

    pub async fn get_member(
        &self,
        target: Target,
        user_id: Uuid,
    ) -> Result<Member, MembershipError> {
        self.ensure_exists(target).await?;

        self.store
            .find_member(target, user_id)
            .await?
            .ok_or_else(|| not_a_member(target))
    }

    /// Removes `user_id` from the target; creator/moderator only
    ///
    /// Removing someone from a group also removes them from its games.
    /// Returns the remaining member list.
    pub async fn remove_member(
        &self,
        target: Target,
        user_id: Uuid,
        caller: Uuid,
    ) -> Result<Vec<Member>, MembershipError> {
        self.ensure_exists(target).await?;

        if self.store.find_member(target, user_id).await?.is_none() {
            return Err(not_a_member(target));
        }
        require_moderator(self.store.as_ref(), target, caller).await?;

        let targets = self.departure_targets(target).await?;
        let removed = self.store.remove_memberships(user_id, &targets).await?;

        info!(%target, %user_id, removed_by = %caller, removed, "Member removed");

        Ok(self.store.list_members(target).await?)
    }

    /// Caller leaves the target; no role needed
    ///
    /// Leaving a group also leaves its games.
    pub async fn leave(&self, target: Target, caller: Uuid) -> Result<(), MembershipError> {
        self.ensure_exists(target).await?;

        let member = self
            .store
            .find_member(target, caller)
            .await?
            .ok_or_else(|| not_a_member(target))?;

        if member.role == MemberRole::Creator {
            warn!(%target, user_id = %caller, "Creator left");
        }

        let targets = self.departure_targets(target).await?;
        let removed = self.store.remove_memberships(caller, &targets).await?;

        debug!(%target, user_id = %caller, removed, "Member left");

        Ok(())
    }
}

fn request_not_found() -> MembershipError {
    MembershipError::NotFound("Request not found".to_string())
}

fn not_a_member(target: Target) -> MembershipError {
    MembershipError::NotFound(format!("User is not part of the {}", target.kind.as_str()))
}
