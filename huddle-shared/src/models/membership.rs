/// Membership model for user-group and user-game relationships
///
/// A membership is stored exactly once, keyed by `(entity, user)`. The
/// entity's member list and the user's group/game lists are two projections
/// of the same rows, so they can never drift apart.
///
/// # Schema
///
/// ```sql
/// CREATE TYPE member_role AS ENUM ('user', 'moderator', 'creator');
///
/// CREATE TABLE group_members (
///     group_id UUID NOT NULL REFERENCES groups(id),
///     user_id UUID NOT NULL REFERENCES users(id) ON DELETE CASCADE,
///     role member_role NOT NULL DEFAULT 'user',
///     joined_at TIMESTAMPTZ NOT NULL DEFAULT NOW(),
///     PRIMARY KEY (group_id, user_id)
/// );
/// ```
///
/// `game_members`, `group_requests` and `game_requests` follow the same shape.
///
/// # Roles
///
/// - **creator**: assigned to whoever created the group or game
/// - **moderator**: same administrative privileges as the creator
/// - **user**: plain member, the default for accepted requests

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::PgExecutor;
use std::fmt;
use uuid::Uuid;
use validator::Validate;

/// Role a user holds inside one group or game
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, sqlx::Type)]
#[sqlx(type_name = "member_role", rename_all = "lowercase")]
#[serde(rename_all = "lowercase")]
pub enum MemberRole {
    /// Plain member
    User,

    /// Can accept/deny requests, remove members, update and delete
    Moderator,

    /// Created the entity
    Creator,
}

impl Default for MemberRole {
    fn default() -> Self {
        MemberRole::User
    }
}

impl MemberRole {
    /// Converts role to string for display
    pub fn as_str(&self) -> &'static str {
        match self {
            MemberRole::User => "user",
            MemberRole::Moderator => "moderator",
            MemberRole::Creator => "creator",
        }
    }

    /// Whether this role may run administrative operations
    /// (request handling, member removal, update, delete)
    pub fn can_moderate(&self) -> bool {
        matches!(self, MemberRole::Creator | MemberRole::Moderator)
    }
}

/// The two kinds of entity users can be members of
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum EntityKind {
    Group,
    Game,
}

impl EntityKind {
    /// Lowercase label used in messages and logs
    pub fn as_str(&self) -> &'static str {
        match self {
            EntityKind::Group => "group",
            EntityKind::Game => "game",
        }
    }

    pub(crate) fn members_table(&self) -> &'static str {
        match self {
            EntityKind::Group => "group_members",
            EntityKind::Game => "game_members",
        }
    }

    pub(crate) fn requests_table(&self) -> &'static str {
        match self {
            EntityKind::Group => "group_requests",
            EntityKind::Game => "game_requests",
        }
    }

    /// Column referencing the entity in the member and request tables
    pub(crate) fn key_column(&self) -> &'static str {
        match self {
            EntityKind::Group => "group_id",
            EntityKind::Game => "game_id",
        }
    }
}

/// A concrete group or game that membership operations act on
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Target {
    pub kind: EntityKind,
    pub id: Uuid,
}

impl Target {
    pub fn group(id: Uuid) -> Self {
        Self {
            kind: EntityKind::Group,
            id,
        }
    }

    pub fn game(id: Uuid) -> Self {
        Self {
            kind: EntityKind::Game,
            id,
        }
    }
}

impl fmt::Display for Target {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} {}", self.kind.as_str(), self.id)
    }
}

/// One entry of an entity's member list
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, sqlx::FromRow)]
pub struct Member {
    /// Member's user ID
    #[serde(rename = "user")]
    pub user_id: Uuid,

    /// Role within the entity
    pub role: MemberRole,

    /// When the user joined
    pub joined_at: DateTime<Utc>,
}

/// A pending, unapproved ask to join a group or game
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, sqlx::FromRow)]
pub struct JoinRequest {
    /// Request ID (used by accept/deny)
    pub id: Uuid,

    /// Requesting user
    #[serde(rename = "user")]
    pub user_id: Uuid,

    /// Optional note for the moderators
    pub message: Option<String>,

    pub created_at: DateTime<Utc>,
}

/// Entry of a user's group list
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, sqlx::FromRow)]
pub struct UserGroup {
    #[serde(rename = "group")]
    pub group_id: Uuid,

    pub role: MemberRole,

    pub joined_at: DateTime<Utc>,
}

/// Entry of a user's game list
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, sqlx::FromRow)]
pub struct UserGame {
    #[serde(rename = "game")]
    pub game_id: Uuid,

    pub role: MemberRole,

    pub joined_at: DateTime<Utc>,
}

/// Input for asking to join a group or game
#[derive(Debug, Clone, Default, Serialize, Deserialize, Validate)]
pub struct NewJoinRequest {
    #[validate(length(max = 500, message = "Message can not be more than 500 characters"))]
    pub message: Option<String>,
}

impl NewJoinRequest {
    /// Trims the message and drops it when blank
    pub fn normalized(mut self) -> Self {
        self.message = self
            .message
            .map(|m| m.trim().to_string())
            .filter(|m| !m.is_empty());
        self
    }
}

impl Member {
    /// Adds a user to a group or game
    ///
    /// # Errors
    ///
    /// Fails with a primary key violation if the user is already a member,
    /// or a foreign key violation if the entity or user doesn't exist.
    pub async fn insert<'e, E: PgExecutor<'e>>(
        executor: E,
        target: Target,
        user_id: Uuid,
        role: MemberRole,
    ) -> Result<Self, sqlx::Error> {
        let query = format!(
            "INSERT INTO {} ({}, user_id, role) VALUES ($1, $2, $3) \
             RETURNING user_id, role, joined_at",
            target.kind.members_table(),
            target.kind.key_column(),
        );

        sqlx::query_as::<_, Member>(&query)
            .bind(target.id)
            .bind(user_id)
            .bind(role)
            .fetch_one(executor)
            .await
    }

    /// Finds one user's membership of a group or game
    pub async fn find<'e, E: PgExecutor<'e>>(
        executor: E,
        target: Target,
        user_id: Uuid,
    ) -> Result<Option<Self>, sqlx::Error> {
        let query = format!(
            "SELECT user_id, role, joined_at FROM {} WHERE {} = $1 AND user_id = $2",
            target.kind.members_table(),
            target.kind.key_column(),
        );

        sqlx::query_as::<_, Member>(&query)
            .bind(target.id)
            .bind(user_id)
            .fetch_optional(executor)
            .await
    }

    /// Changes a member's role
    ///
    /// # Returns
    ///
    /// The updated membership, or None if the user isn't a member
    pub async fn set_role<'e, E: PgExecutor<'e>>(
        executor: E,
        target: Target,
        user_id: Uuid,
        role: MemberRole,
    ) -> Result<Option<Self>, sqlx::Error> {
        let query = format!(
            "UPDATE {} SET role = $3 WHERE {} = $1 AND user_id = $2 \
             RETURNING user_id, role, joined_at",
            target.kind.members_table(),
            target.kind.key_column(),
        );

        sqlx::query_as::<_, Member>(&query)
            .bind(target.id)
            .bind(user_id)
            .bind(role)
            .fetch_optional(executor)
            .await
    }

    /// Lists the members of a group or game, oldest first
    pub async fn list<'e, E: PgExecutor<'e>>(
        executor: E,
        target: Target,
    ) -> Result<Vec<Self>, sqlx::Error> {
        let query = format!(
            "SELECT user_id, role, joined_at FROM {} WHERE {} = $1 ORDER BY joined_at ASC",
            target.kind.members_table(),
            target.kind.key_column(),
        );

        sqlx::query_as::<_, Member>(&query)
            .bind(target.id)
            .fetch_all(executor)
            .await
    }

    /// Removes a user from a group or game
    ///
    /// # Returns
    ///
    /// True if a membership was deleted
    pub async fn delete<'e, E: PgExecutor<'e>>(
        executor: E,
        target: Target,
        user_id: Uuid,
    ) -> Result<bool, sqlx::Error> {
        let query = format!(
            "DELETE FROM {} WHERE {} = $1 AND user_id = $2",
            target.kind.members_table(),
            target.kind.key_column(),
        );

        let result = sqlx::query(&query)
            .bind(target.id)
            .bind(user_id)
            .execute(executor)
            .await?;

        Ok(result.rows_affected() > 0)
    }

    /// Removes every membership of a group or game
    pub async fn delete_all<'e, E: PgExecutor<'e>>(
        executor: E,
        target: Target,
    ) -> Result<u64, sqlx::Error> {
        let query = format!(
            "DELETE FROM {} WHERE {} = $1",
            target.kind.members_table(),
            target.kind.key_column(),
        );

        let result = sqlx::query(&query).bind(target.id).execute(executor).await?;

        Ok(result.rows_affected())
    }
}

impl JoinRequest {
    /// Files a join request
    ///
    /// # Errors
    ///
    /// Fails with a unique violation if the user already has a pending request.
    pub async fn create<'e, E: PgExecutor<'e>>(
        executor: E,
        target: Target,
        user_id: Uuid,
        message: Option<String>,
    ) -> Result<Self, sqlx::Error> {
        let query = format!(
            "INSERT INTO {} ({}, user_id, message) VALUES ($1, $2, $3) \
             RETURNING id, user_id, message, created_at",
            target.kind.requests_table(),
            target.kind.key_column(),
        );

        sqlx::query_as::<_, JoinRequest>(&query)
            .bind(target.id)
            .bind(user_id)
            .bind(message)
            .fetch_one(executor)
            .await
    }

    /// Finds a request by its ID within a group or game
    pub async fn find<'e, E: PgExecutor<'e>>(
        executor: E,
        target: Target,
        request_id: Uuid,
    ) -> Result<Option<Self>, sqlx::Error> {
        let query = format!(
            "SELECT id, user_id, message, created_at FROM {} WHERE {} = $1 AND id = $2",
            target.kind.requests_table(),
            target.kind.key_column(),
        );

        sqlx::query_as::<_, JoinRequest>(&query)
            .bind(target.id)
            .bind(request_id)
            .fetch_optional(executor)
            .await
    }

    /// Finds the pending request of one user
    pub async fn find_by_user<'e, E: PgExecutor<'e>>(
        executor: E,
        target: Target,
        user_id: Uuid,
    ) -> Result<Option<Self>, sqlx::Error> {
        let query = format!(
            "SELECT id, user_id, message, created_at FROM {} WHERE {} = $1 AND user_id = $2",
            target.kind.requests_table(),
            target.kind.key_column(),
        );

        sqlx::query_as::<_, JoinRequest>(&query)
            .bind(target.id)
            .bind(user_id)
            .fetch_optional(executor)
            .await
    }

    /// Lists pending requests, oldest first
    pub async fn list<'e, E: PgExecutor<'e>>(
        executor: E,
        target: Target,
    ) -> Result<Vec<Self>, sqlx::Error> {
        let query = format!(
            "SELECT id, user_id, message, created_at FROM {} WHERE {} = $1 \
             ORDER BY created_at ASC",
            target.kind.requests_table(),
            target.kind.key_column(),
        );

        sqlx::query_as::<_, JoinRequest>(&query)
            .bind(target.id)
            .fetch_all(executor)
            .await
    }

    /// Deletes a request, returning it if it existed
    pub async fn delete<'e, E: PgExecutor<'e>>(
        executor: E,
        target: Target,
        request_id: Uuid,
    ) -> Result<Option<Self>, sqlx::Error> {
        let query = format!(
            "DELETE FROM {} WHERE {} = $1 AND id = $2 \
             RETURNING id, user_id, message, created_at",
            target.kind.requests_table(),
            target.kind.key_column(),
        );

        sqlx::query_as::<_, JoinRequest>(&query)
            .bind(target.id)
            .bind(request_id)
            .fetch_optional(executor)
            .await
    }

    /// Deletes every pending request of a group or game
    pub async fn delete_all<'e, E: PgExecutor<'e>>(
        executor: E,
        target: Target,
    ) -> Result<u64, sqlx::Error> {
        let query = format!(
            "DELETE FROM {} WHERE {} = $1",
            target.kind.requests_table(),
            target.kind.key_column(),
        );

        let result = sqlx::query(&query).bind(target.id).execute(executor).await?;

        Ok(result.rows_affected())
    }
}
