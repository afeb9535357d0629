/// Group model and database operations
///
/// Groups are created by a user (who becomes their creator), host games and
/// accept members through a request/accept workflow.
///
/// # Schema
///
/// ```sql
/// CREATE TABLE groups (
///     id UUID PRIMARY KEY DEFAULT gen_random_uuid(),
///     name VARCHAR(50) NOT NULL,
///     slug VARCHAR(64) NOT NULL,
///     description VARCHAR(500) NOT NULL,
///     photo VARCHAR(255) NOT NULL DEFAULT 'no-photo.jpg',
///     created_at TIMESTAMPTZ NOT NULL DEFAULT NOW(),
///     updated_at TIMESTAMPTZ NOT NULL DEFAULT NOW(),
///     CONSTRAINT groups_name_key UNIQUE (name)
/// );
/// ```

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::PgExecutor;
use uuid::Uuid;
use validator::Validate;

use super::membership::{JoinRequest, Member};
use super::Page;

/// Photo reference given to groups that never uploaded one
pub const DEFAULT_PHOTO: &str = "no-photo.jpg";

const GROUP_COLUMNS: &str = "id, name, slug, description, photo, created_at, updated_at";

/// Group row
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, sqlx::FromRow)]
pub struct Group {
    pub id: Uuid,

    /// Unique display name
    pub name: String,

    /// URL-friendly form of `name`
    pub slug: String,

    pub description: String,

    /// Photo file reference
    pub photo: String,

    pub created_at: DateTime<Utc>,

    pub updated_at: DateTime<Utc>,
}

/// Reference from a group to one of its games
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, sqlx::FromRow)]
pub struct GroupGame {
    #[serde(rename = "game")]
    pub game_id: Uuid,
}

/// A group together with its member, request and game lists
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GroupDetail {
    #[serde(flatten)]
    pub group: Group,

    pub users: Vec<Member>,

    pub requests: Vec<JoinRequest>,

    #[serde(rename = "group_games")]
    pub games: Vec<GroupGame>,
}

/// Input for creating a group
#[derive(Debug, Clone, Serialize, Deserialize, Validate)]
pub struct NewGroup {
    #[validate(length(min = 1, max = 50, message = "Name can not be more than 50 characters"))]
    pub name: String,

    #[validate(length(
        min = 1,
        max = 500,
        message = "Description can not be more than 500 characters"
    ))]
    pub description: String,
}

impl NewGroup {
    /// Trims the name the way it is stored
    pub fn normalized(mut self) -> Self {
        self.name = self.name.trim().to_string();
        self
    }
}

/// Partial update of a group
#[derive(Debug, Clone, Default, Serialize, Deserialize, Validate)]
pub struct GroupPatch {
    #[validate(length(min = 1, max = 50, message = "Name can not be more than 50 characters"))]
    pub name: Option<String>,

    #[validate(length(
        min = 1,
        max = 500,
        message = "Description can not be more than 500 characters"
    ))]
    pub description: Option<String>,
}

impl GroupPatch {
    pub fn normalized(mut self) -> Self {
        self.name = self.name.map(|n| n.trim().to_string());
        self
    }

    pub fn is_empty(&self) -> bool {
        self.name.is_none() && self.description.is_none()
    }
}

/// Derives the slug stored alongside a group name
///
/// Lowercases, keeps alphanumerics and collapses every other run of
/// characters into a single `-`.
///
/// # Example
///
/// ```
/// use huddle_shared::models::group::slugify;
///
/// assert_eq!(slugify("Friday Night  Boardgames!"), "friday-night-boardgames");
/// ```
pub fn slugify(name: &str) -> String {
    let mut slug = String::with_capacity(name.len());
    let mut pending_dash = false;

    for c in name.chars() {
        if c.is_alphanumeric() {
            if pending_dash && !slug.is_empty() {
                slug.push('-');
            }
            pending_dash = false;
            slug.extend(c.to_lowercase());
        } else {
            pending_dash = true;
        }
    }

    slug
}

impl Group {
    /// Inserts a group row
    ///
    /// # Errors
    ///
    /// Fails with a `groups_name_key` constraint violation when the name is taken.
    pub async fn create<'e, E: PgExecutor<'e>>(
        executor: E,
        data: &NewGroup,
    ) -> Result<Self, sqlx::Error> {
        let query = format!(
            "INSERT INTO groups (name, slug, description) VALUES ($1, $2, $3) \
             RETURNING {GROUP_COLUMNS}"
        );

        sqlx::query_as::<_, Group>(&query)
            .bind(&data.name)
            .bind(slugify(&data.name))
            .bind(&data.description)
            .fetch_one(executor)
            .await
    }

    pub async fn find_by_id<'e, E: PgExecutor<'e>>(
        executor: E,
        id: Uuid,
    ) -> Result<Option<Self>, sqlx::Error> {
        let query = format!("SELECT {GROUP_COLUMNS} FROM groups WHERE id = $1");

        sqlx::query_as::<_, Group>(&query)
            .bind(id)
            .fetch_optional(executor)
            .await
    }

    /// Lists groups, newest first
    pub async fn list<'e, E: PgExecutor<'e>>(
        executor: E,
        page: Page,
    ) -> Result<Vec<Self>, sqlx::Error> {
        let query = format!(
            "SELECT {GROUP_COLUMNS} FROM groups ORDER BY created_at DESC LIMIT $1 OFFSET $2"
        );

        sqlx::query_as::<_, Group>(&query)
            .bind(page.limit())
            .bind(page.offset())
            .fetch_all(executor)
            .await
    }

    pub async fn count<'e, E: PgExecutor<'e>>(executor: E) -> Result<i64, sqlx::Error> {
        let (count,): (i64,) = sqlx::query_as("SELECT COUNT(*) FROM groups")
            .fetch_one(executor)
            .await?;

        Ok(count)
    }

    /// Applies a partial update; the slug follows the name
    pub async fn update<'e, E: PgExecutor<'e>>(
        executor: E,
        id: Uuid,
        patch: GroupPatch,
    ) -> Result<Option<Self>, sqlx::Error> {
        let mut query = String::from("UPDATE groups SET updated_at = NOW()");
        let mut bind_count = 1;

        if patch.name.is_some() {
            query.push_str(&format!(", name = ${}, slug = ${}", bind_count + 1, bind_count + 2));
            bind_count += 2;
        }
        if patch.description.is_some() {
            bind_count += 1;
            query.push_str(&format!(", description = ${}", bind_count));
        }

        query.push_str(&format!(" WHERE id = $1 RETURNING {GROUP_COLUMNS}"));

        let mut q = sqlx::query_as::<_, Group>(&query).bind(id);

        if let Some(name) = patch.name {
            let slug = slugify(&name);
            q = q.bind(name).bind(slug);
        }
        if let Some(description) = patch.description {
            q = q.bind(description);
        }

        q.fetch_optional(executor).await
    }

    /// Deletes the group row only; members, requests and games must be gone
    pub async fn delete<'e, E: PgExecutor<'e>>(executor: E, id: Uuid) -> Result<bool, sqlx::Error> {
        let result = sqlx::query("DELETE FROM groups WHERE id = $1")
            .bind(id)
            .execute(executor)
            .await?;

        Ok(result.rows_affected() > 0)
    }

    /// Lists the games owned by a group
    pub async fn list_games<'e, E: PgExecutor<'e>>(
        executor: E,
        id: Uuid,
    ) -> Result<Vec<GroupGame>, sqlx::Error> {
        sqlx::query_as::<_, GroupGame>(
            "SELECT id AS game_id FROM games WHERE group_id = $1 ORDER BY created_at ASC",
        )
        .bind(id)
        .fetch_all(executor)
        .await
    }
}
