/// Storage abstraction for users, groups, games and memberships
///
/// The service layer only talks to [`Store`]. Two implementations ship with
/// the crate:
///
/// - [`postgres::PgStore`]: the production store, built on the model
///   operations in [`crate::models`]
/// - [`memory::MemoryStore`]: an in-process store used by tests and local
///   experiments
///
/// # Atomicity
///
/// Every method is a single atomic operation. Methods that touch several
/// records (creating an entity together with its creator membership,
/// accepting a request, removing a user from a group and its games, cascade
/// deletes) run inside one transaction in `PgStore` and under one write lock
/// in `MemoryStore`. Races between a check in the service and the write here
/// surface as [`StoreError::Conflict`] or [`StoreError::Reference`].

pub mod memory;
pub mod postgres;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use uuid::Uuid;

use crate::models::game::{Game, GamePatch, NewGame};
use crate::models::group::{Group, GroupGame, GroupPatch, NewGroup};
use crate::models::membership::{JoinRequest, Member, MemberRole, Target, UserGame, UserGroup};
use crate::models::user::{CreateUser, ResetToken, UpdateUser, User};
use crate::models::{Page, Paginated};

pub use memory::MemoryStore;
pub use postgres::PgStore;

/// Error type for store operations
#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    /// A uniqueness rule was violated (email, group name, membership, request)
    #[error("Conflict on {0}")]
    Conflict(String),

    /// A referenced row is missing, or a row is still referenced
    #[error("Broken reference on {0}")]
    Reference(String),

    /// Anything else the database reported
    #[error("Database error: {0}")]
    Database(sqlx::Error),
}

impl From<sqlx::Error> for StoreError {
    fn from(err: sqlx::Error) -> Self {
        if let sqlx::Error::Database(db_err) = &err {
            let constraint = db_err.constraint().unwrap_or("unknown").to_string();

            if db_err.is_unique_violation() {
                return StoreError::Conflict(constraint);
            }
            if db_err.is_foreign_key_violation() {
                return StoreError::Reference(constraint);
            }
        }

        StoreError::Database(err)
    }
}

pub type StoreResult<T> = Result<T, StoreError>;

/// Everything that must disappear when a group is deleted
///
/// Built by the service from the group's current game list and handed to
/// [`Store::delete_group`], which removes the listed games (with their
/// members and requests), then the group's own members and requests, then the
/// group. A game created after the plan was built makes the delete fail with
/// [`StoreError::Reference`] instead of leaving an orphan.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GroupCascade {
    pub group_id: Uuid,

    pub game_ids: Vec<Uuid>,
}

impl GroupCascade {
    /// Every membership target the cascade empties, games first
    pub fn targets(&self) -> Vec<Target> {
        self.game_ids
            .iter()
            .copied()
            .map(Target::game)
            .chain(std::iter::once(Target::group(self.group_id)))
            .collect()
    }
}

/// Persistence operations used by the services
#[async_trait]
pub trait Store: Send + Sync {
    /// Liveness check
    async fn ping(&self) -> StoreResult<()>;

    // Users

    async fn create_user(&self, data: CreateUser) -> StoreResult<User>;

    async fn find_user(&self, id: Uuid) -> StoreResult<Option<User>>;

    async fn find_user_by_email(&self, email: &str) -> StoreResult<Option<User>>;

    /// Finds the user holding `token_hash`, provided it expires after `now`
    async fn find_user_by_reset_token(
        &self,
        token_hash: &str,
        now: DateTime<Utc>,
    ) -> StoreResult<Option<User>>;

    async fn update_user(&self, id: Uuid, data: UpdateUser) -> StoreResult<Option<User>>;

    /// Stores or clears the reset token; false if the user doesn't exist
    async fn set_reset_token(&self, id: Uuid, token: Option<ResetToken>) -> StoreResult<bool>;

    async fn list_user_groups(&self, user_id: Uuid) -> StoreResult<Vec<UserGroup>>;

    async fn list_user_games(&self, user_id: Uuid) -> StoreResult<Vec<UserGame>>;

    // Groups

    /// Inserts the group and makes `owner` its creator
    async fn create_group(&self, owner: Uuid, data: NewGroup) -> StoreResult<Group>;

    async fn find_group(&self, id: Uuid) -> StoreResult<Option<Group>>;

    async fn list_groups(&self, page: Page) -> StoreResult<Paginated<Group>>;

    async fn update_group(&self, id: Uuid, patch: GroupPatch) -> StoreResult<Option<Group>>;

    /// Executes a cascade plan; false if the group was already gone
    async fn delete_group(&self, plan: &GroupCascade) -> StoreResult<bool>;

    async fn list_group_games(&self, group_id: Uuid) -> StoreResult<Vec<GroupGame>>;

    // Games

    /// Inserts the game under `group_id` and makes `owner` its creator
    async fn create_game(&self, owner: Uuid, group_id: Uuid, data: NewGame) -> StoreResult<Game>;

    async fn find_game(&self, id: Uuid) -> StoreResult<Option<Game>>;

    async fn list_games(&self, page: Page) -> StoreResult<Paginated<Game>>;

    async fn list_games_by_group(&self, group_id: Uuid) -> StoreResult<Vec<Game>>;

    async fn update_game(&self, id: Uuid, patch: GamePatch) -> StoreResult<Option<Game>>;

    /// Removes the game with its members and requests; false if already gone
    async fn delete_game(&self, id: Uuid) -> StoreResult<bool>;

    // Memberships and requests

    async fn list_members(&self, target: Target) -> StoreResult<Vec<Member>>;

    async fn find_member(&self, target: Target, user_id: Uuid) -> StoreResult<Option<Member>>;

    /// Changes a member's role; None if the user isn't a member.
    /// No service operation reaches this, it is how moderators get seeded.
    async fn set_member_role(
        &self,
        target: Target,
        user_id: Uuid,
        role: MemberRole,
    ) -> StoreResult<Option<Member>>;

    async fn list_requests(&self, target: Target) -> StoreResult<Vec<JoinRequest>>;

    async fn find_request(&self, target: Target, request_id: Uuid)
        -> StoreResult<Option<JoinRequest>>;

    async fn find_request_by_user(
        &self,
        target: Target,
        user_id: Uuid,
    ) -> StoreResult<Option<JoinRequest>>;

    /// Files a request; a second request by the same user is a `Conflict`
    async fn create_request(
        &self,
        target: Target,
        user_id: Uuid,
        message: Option<String>,
    ) -> StoreResult<JoinRequest>;

    /// Deletes a request, returning it if it existed
    async fn delete_request(
        &self,
        target: Target,
        request_id: Uuid,
    ) -> StoreResult<Option<JoinRequest>>;

    /// Deletes the request and adds its user as a plain member
    ///
    /// Returns `None` if the request no longer exists. Fails with `Conflict`
    /// (and leaves the request in place) if the user is already a member.
    async fn accept_request(&self, target: Target, request_id: Uuid)
        -> StoreResult<Option<Member>>;

    /// Removes `user_id` from every target, returning how many memberships went
    async fn remove_memberships(&self, user_id: Uuid, targets: &[Target]) -> StoreResult<u64>;
}
