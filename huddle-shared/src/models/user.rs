/// User model and database operations
///
/// This module provides the User model and CRUD operations for managing user accounts.
/// Group and game memberships live in their own tables (see [`super::membership`]).
///
/// # Schema
///
/// ```sql
/// CREATE TABLE users (
///     id UUID PRIMARY KEY DEFAULT gen_random_uuid(),
///     name VARCHAR(100) NOT NULL,
///     email VARCHAR(255) NOT NULL,
///     password_hash VARCHAR(255) NOT NULL,
///     role site_role NOT NULL DEFAULT 'user',
///     reset_password_token VARCHAR(64),
///     reset_password_expire TIMESTAMPTZ,
///     created_at TIMESTAMPTZ NOT NULL DEFAULT NOW(),
///     updated_at TIMESTAMPTZ NOT NULL DEFAULT NOW(),
///     CONSTRAINT users_email_key UNIQUE (email)
/// );
/// ```
///
/// # Example
///
/// ```no_run
/// use huddle_shared::models::user::{User, CreateUser, SiteRole};
/// use huddle_shared::db::pool::{create_pool, DatabaseConfig};
///
/// # async fn example() -> Result<(), Box<dyn std::error::Error>> {
/// let pool = create_pool(DatabaseConfig::default()).await?;
///
/// let user = User::create(&pool, CreateUser {
///     name: "Jane Doe".to_string(),
///     email: "jane@example.com".to_string(),
///     password_hash: "$argon2id$...".to_string(),
///     role: SiteRole::User,
/// }).await?;
///
/// let found = User::find_by_email(&pool, "jane@example.com").await?;
/// # Ok(())
/// # }
/// ```

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::PgExecutor;
use uuid::Uuid;

use super::membership::{UserGame, UserGroup};

const USER_COLUMNS: &str = "id, name, email, password_hash, role, reset_password_token, \
                            reset_password_expire, created_at, updated_at";

/// Site-level role, independent of any group or game membership
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, sqlx::Type)]
#[sqlx(type_name = "site_role", rename_all = "lowercase")]
#[serde(rename_all = "lowercase")]
pub enum SiteRole {
    User,
    Publisher,
}

impl Default for SiteRole {
    fn default() -> Self {
        SiteRole::User
    }
}

/// User model representing a user account
///
/// Passwords are stored as Argon2id hashes, never in plaintext. Neither the
/// hash nor the reset token ever leave the server.
#[derive(Debug, Clone, Serialize, Deserialize, sqlx::FromRow)]
pub struct User {
    /// Unique user ID
    pub id: Uuid,

    /// Display name
    pub name: String,

    /// Email address, unique across all users
    pub email: String,

    /// Argon2id hash (PHC string)
    #[serde(skip_serializing, default)]
    pub password_hash: String,

    /// Site-level role
    pub role: SiteRole,

    /// SHA-256 hex of the outstanding password reset token
    #[serde(skip_serializing, default)]
    pub reset_password_token: Option<String>,

    /// Expiry of the outstanding reset token
    #[serde(skip_serializing, default)]
    pub reset_password_expire: Option<DateTime<Utc>>,

    pub created_at: DateTime<Utc>,

    pub updated_at: DateTime<Utc>,
}

/// Input for creating a new user
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CreateUser {
    pub name: String,

    pub email: String,

    pub password_hash: String,

    #[serde(default)]
    pub role: SiteRole,
}

/// Input for updating an existing user
///
/// All fields are optional. Only non-None fields will be updated.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct UpdateUser {
    pub name: Option<String>,

    pub email: Option<String>,

    pub password_hash: Option<String>,

    /// Drops any outstanding reset token in the same write
    #[serde(default)]
    pub clear_reset_token: bool,
}

/// A password reset token as persisted (hash only)
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResetToken {
    /// SHA-256 hex of the plaintext token
    pub hash: String,

    /// Token is rejected at or after this instant
    pub expires_at: DateTime<Utc>,
}

impl User {
    /// Creates a new user
    ///
    /// # Errors
    ///
    /// Returns an error if the email already exists (`users_email_key`) or
    /// the database connection fails.
    pub async fn create<'e, E: PgExecutor<'e>>(
        executor: E,
        data: CreateUser,
    ) -> Result<Self, sqlx::Error> {
        let query = format!(
            "INSERT INTO users (name, email, password_hash, role) \
             VALUES ($1, $2, $3, $4) RETURNING {USER_COLUMNS}"
        );

        sqlx::query_as::<_, User>(&query)
            .bind(data.name)
            .bind(data.email)
            .bind(data.password_hash)
            .bind(data.role)
            .fetch_one(executor)
            .await
    }

    /// Finds a user by ID
    pub async fn find_by_id<'e, E: PgExecutor<'e>>(
        executor: E,
        id: Uuid,
    ) -> Result<Option<Self>, sqlx::Error> {
        let query = format!("SELECT {USER_COLUMNS} FROM users WHERE id = $1");

        sqlx::query_as::<_, User>(&query)
            .bind(id)
            .fetch_optional(executor)
            .await
    }

    /// Finds a user by email address (used by login and forgot-password)
    pub async fn find_by_email<'e, E: PgExecutor<'e>>(
        executor: E,
        email: &str,
    ) -> Result<Option<Self>, sqlx::Error> {
        let query = format!("SELECT {USER_COLUMNS} FROM users WHERE email = $1");

        sqlx::query_as::<_, User>(&query)
            .bind(email)
            .fetch_optional(executor)
            .await
    }

    /// Finds the user owning an unexpired reset token
    pub async fn find_by_reset_token<'e, E: PgExecutor<'e>>(
        executor: E,
        token_hash: &str,
        now: DateTime<Utc>,
    ) -> Result<Option<Self>, sqlx::Error> {
        let query = format!(
            "SELECT {USER_COLUMNS} FROM users \
             WHERE reset_password_token = $1 AND reset_password_expire > $2"
        );

        sqlx::query_as::<_, User>(&query)
            .bind(token_hash)
            .bind(now)
            .fetch_optional(executor)
            .await
    }

    /// Updates a user
    ///
    /// Only fields that are `Some` in `data` will be updated.
    ///
    /// # Returns
    ///
    /// The updated user if found, None if user doesn't exist
    pub async fn update<'e, E: PgExecutor<'e>>(
        executor: E,
        id: Uuid,
        data: UpdateUser,
    ) -> Result<Option<Self>, sqlx::Error> {
        // Build dynamic update query based on which fields are present
        let mut query = String::from("UPDATE users SET updated_at = NOW()");
        let mut bind_count = 1;

        if data.name.is_some() {
            bind_count += 1;
            query.push_str(&format!(", name = ${}", bind_count));
        }
        if data.email.is_some() {
            bind_count += 1;
            query.push_str(&format!(", email = ${}", bind_count));
        }
        if data.password_hash.is_some() {
            bind_count += 1;
            query.push_str(&format!(", password_hash = ${}", bind_count));
        }
        if data.clear_reset_token {
            query.push_str(", reset_password_token = NULL, reset_password_expire = NULL");
        }

        query.push_str(&format!(" WHERE id = $1 RETURNING {USER_COLUMNS}"));

        let mut q = sqlx::query_as::<_, User>(&query).bind(id);

        if let Some(name) = data.name {
            q = q.bind(name);
        }
        if let Some(email) = data.email {
            q = q.bind(email);
        }
        if let Some(password_hash) = data.password_hash {
            q = q.bind(password_hash);
        }

        q.fetch_optional(executor).await
    }

    /// Stores (or clears, with `None`) the user's reset token
    pub async fn set_reset_token<'e, E: PgExecutor<'e>>(
        executor: E,
        id: Uuid,
        token: Option<&ResetToken>,
    ) -> Result<bool, sqlx::Error> {
        let result = sqlx::query(
            r#"
            UPDATE users
            SET reset_password_token = $2, reset_password_expire = $3, updated_at = NOW()
            WHERE id = $1
            "#,
        )
        .bind(id)
        .bind(token.map(|t| t.hash.clone()))
        .bind(token.map(|t| t.expires_at))
        .execute(executor)
        .await?;

        Ok(result.rows_affected() > 0)
    }

    /// Lists the groups a user belongs to, oldest membership first
    pub async fn list_groups<'e, E: PgExecutor<'e>>(
        executor: E,
        user_id: Uuid,
    ) -> Result<Vec<UserGroup>, sqlx::Error> {
        sqlx::query_as::<_, UserGroup>(
            r#"
            SELECT group_id, role, joined_at
            FROM group_members
            WHERE user_id = $1
            ORDER BY joined_at ASC
            "#,
        )
        .bind(user_id)
        .fetch_all(executor)
        .await
    }

    /// Lists the games a user belongs to, oldest membership first
    pub async fn list_games<'e, E: PgExecutor<'e>>(
        executor: E,
        user_id: Uuid,
    ) -> Result<Vec<UserGame>, sqlx::Error> {
        sqlx::query_as::<_, UserGame>(
            r#"
            SELECT game_id, role, joined_at
            FROM game_members
            WHERE user_id = $1
            ORDER BY joined_at ASC
            "#,
        )
        .bind(user_id)
        .fetch_all(executor)
        .await
    }
}
