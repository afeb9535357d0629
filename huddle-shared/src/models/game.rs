/// Game model and database operations
///
/// A game always belongs to exactly one group (`group_id` is fixed at
/// creation). It keeps its own member and request lists, independent of the
/// owning group's.
///
/// # Schema
///
/// ```sql
/// CREATE TABLE games (
///     id UUID PRIMARY KEY DEFAULT gen_random_uuid(),
///     group_id UUID NOT NULL REFERENCES groups(id),
///     title VARCHAR(100) NOT NULL,
///     description TEXT NOT NULL,
///     created_at TIMESTAMPTZ NOT NULL DEFAULT NOW(),
///     updated_at TIMESTAMPTZ NOT NULL DEFAULT NOW()
/// );
/// ```

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::PgExecutor;
use uuid::Uuid;
use validator::Validate;

use super::membership::{JoinRequest, Member};
use super::Page;

const GAME_COLUMNS: &str = "id, group_id, title, description, created_at, updated_at";

/// Game row
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, sqlx::FromRow)]
pub struct Game {
    pub id: Uuid,

    /// Owning group
    #[serde(rename = "group")]
    pub group_id: Uuid,

    pub title: String,

    pub description: String,

    pub created_at: DateTime<Utc>,

    pub updated_at: DateTime<Utc>,
}

/// A game together with its member and request lists
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GameDetail {
    #[serde(flatten)]
    pub game: Game,

    pub users: Vec<Member>,

    pub requests: Vec<JoinRequest>,
}

/// Input for creating a game
#[derive(Debug, Clone, Serialize, Deserialize, Validate)]
pub struct NewGame {
    #[validate(length(min = 1, max = 100, message = "Please add a game title"))]
    pub title: String,

    #[validate(length(min = 1, message = "Please add a description"))]
    pub description: String,
}

impl NewGame {
    pub fn normalized(mut self) -> Self {
        self.title = self.title.trim().to_string();
        self
    }
}

/// Partial update of a game; the owning group cannot change
#[derive(Debug, Clone, Default, Serialize, Deserialize, Validate)]
pub struct GamePatch {
    #[validate(length(min = 1, max = 100, message = "Please add a game title"))]
    pub title: Option<String>,

    #[validate(length(min = 1, message = "Please add a description"))]
    pub description: Option<String>,
}

impl GamePatch {
    pub fn normalized(mut self) -> Self {
        self.title = self.title.map(|t| t.trim().to_string());
        self
    }

    pub fn is_empty(&self) -> bool {
        self.title.is_none() && self.description.is_none()
    }
}

impl Game {
    /// Inserts a game row under `group_id`
    ///
    /// # Errors
    ///
    /// Fails with a foreign key violation when the group does not exist.
    pub async fn create<'e, E: PgExecutor<'e>>(
        executor: E,
        group_id: Uuid,
        data: &NewGame,
    ) -> Result<Self, sqlx::Error> {
        let query = format!(
            "INSERT INTO games (group_id, title, description) VALUES ($1, $2, $3) \
             RETURNING {GAME_COLUMNS}"
        );

        sqlx::query_as::<_, Game>(&query)
            .bind(group_id)
            .bind(&data.title)
            .bind(&data.description)
            .fetch_one(executor)
            .await
    }

    pub async fn find_by_id<'e, E: PgExecutor<'e>>(
        executor: E,
        id: Uuid,
    ) -> Result<Option<Self>, sqlx::Error> {
        let query = format!("SELECT {GAME_COLUMNS} FROM games WHERE id = $1");

        sqlx::query_as::<_, Game>(&query)
            .bind(id)
            .fetch_optional(executor)
            .await
    }

    /// Lists all games, newest first
    pub async fn list<'e, E: PgExecutor<'e>>(
        executor: E,
        page: Page,
    ) -> Result<Vec<Self>, sqlx::Error> {
        let query = format!(
            "SELECT {GAME_COLUMNS} FROM games ORDER BY created_at DESC LIMIT $1 OFFSET $2"
        );

        sqlx::query_as::<_, Game>(&query)
            .bind(page.limit())
            .bind(page.offset())
            .fetch_all(executor)
            .await
    }

    pub async fn count<'e, E: PgExecutor<'e>>(executor: E) -> Result<i64, sqlx::Error> {
        let (count,): (i64,) = sqlx::query_as("SELECT COUNT(*) FROM games")
            .fetch_one(executor)
            .await?;

        Ok(count)
    }

    /// Lists the games of one group, oldest first
    pub async fn list_by_group<'e, E: PgExecutor<'e>>(
        executor: E,
        group_id: Uuid,
    ) -> Result<Vec<Self>, sqlx::Error> {
        let query = format!(
            "SELECT {GAME_COLUMNS} FROM games WHERE group_id = $1 ORDER BY created_at ASC"
        );

        sqlx::query_as::<_, Game>(&query)
            .bind(group_id)
            .fetch_all(executor)
            .await
    }

    pub async fn update<'e, E: PgExecutor<'e>>(
        executor: E,
        id: Uuid,
        patch: GamePatch,
    ) -> Result<Option<Self>, sqlx::Error> {
        let mut query = String::from("UPDATE games SET updated_at = NOW()");
        let mut bind_count = 1;

        if patch.title.is_some() {
            bind_count += 1;
            query.push_str(&format!(", title = ${}", bind_count));
        }
        if patch.description.is_some() {
            bind_count += 1;
            query.push_str(&format!(", description = ${}", bind_count));
        }

        query.push_str(&format!(" WHERE id = $1 RETURNING {GAME_COLUMNS}"));

        let mut q = sqlx::query_as::<_, Game>(&query).bind(id);

        if let Some(title) = patch.title {
            q = q.bind(title);
        }
        if let Some(description) = patch.description {
            q = q.bind(description);
        }

        q.fetch_optional(executor).await
    }

    /// Deletes the game row only; members and requests must be gone
    pub async fn delete<'e, E: PgExecutor<'e>>(executor: E, id: Uuid) -> Result<bool, sqlx::Error> {
        let result = sqlx::query("DELETE FROM games WHERE id = $1")
            .bind(id)
            .execute(executor)
            .await?;

        Ok(result.rows_affected() > 0)
    }
}
