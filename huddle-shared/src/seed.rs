/// Seed data import and teardown
///
/// A seed file is JSON with three lists. Users come first; groups and games
/// point at their owners and members by email, and games at their group by
/// name:
///
/// ```json
/// {
///   "users": [
///     { "name": "Jane", "email": "jane@example.com", "password": "MyP@ssw0rd!" }
///   ],
///   "groups": [
///     {
///       "name": "Chess Club",
///       "description": "Weekly blitz",
///       "owner": "jane@example.com",
///       "members": [{ "email": "john@example.com", "role": "moderator" }]
///     }
///   ],
///   "games": [
///     {
///       "title": "Friday blitz",
///       "description": "Five minute games",
///       "group": "Chess Club",
///       "owner": "jane@example.com"
///     }
///   ]
/// }
/// ```
///
/// Members join through the same request/accept path the API uses and are
/// then promoted, which is the only way to create moderators.

use std::collections::HashMap;

use serde::Deserialize;
use sqlx::PgPool;
use tracing::info;
use uuid::Uuid;

use crate::auth::password::{hash_password_with, HashParams, PasswordError};
use crate::models::game::NewGame;
use crate::models::group::NewGroup;
use crate::models::membership::{MemberRole, Target};
use crate::models::user::{CreateUser, SiteRole};
use crate::services::identity::normalize_email;
use crate::store::{Store, StoreError};

/// Contents of a seed file
#[derive(Debug, Clone, Default, Deserialize)]
pub struct SeedData {
    #[serde(default)]
    pub users: Vec<SeedUser>,

    #[serde(default)]
    pub groups: Vec<SeedGroup>,

    #[serde(default)]
    pub games: Vec<SeedGame>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct SeedUser {
    pub name: String,
    pub email: String,
    pub password: String,

    #[serde(default)]
    pub role: SiteRole,
}

#[derive(Debug, Clone, Deserialize)]
pub struct SeedGroup {
    pub name: String,
    pub description: String,

    /// Email of the creator
    pub owner: String,

    #[serde(default)]
    pub members: Vec<SeedMember>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct SeedGame {
    pub title: String,
    pub description: String,

    /// Name of the owning group
    pub group: String,

    /// Email of the creator
    pub owner: String,

    #[serde(default)]
    pub members: Vec<SeedMember>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct SeedMember {
    pub email: String,

    #[serde(default = "default_member_role")]
    pub role: MemberRole,
}

fn default_member_role() -> MemberRole {
    MemberRole::User
}

/// What an import created
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct SeedSummary {
    pub users: usize,
    pub groups: usize,
    pub games: usize,
    pub members: usize,
}

#[derive(Debug, thiserror::Error)]
pub enum SeedError {
    #[error("Invalid seed file: {0}")]
    Parse(#[from] serde_json::Error),

    #[error("Seed references unknown user {0}")]
    UnknownUser(String),

    #[error("Seed references unknown group {0}")]
    UnknownGroup(String),

    #[error("{0} is listed as a member with role creator; use owner instead")]
    CreatorMember(String),

    #[error(transparent)]
    Password(#[from] PasswordError),

    #[error(transparent)]
    Store(#[from] StoreError),

    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),
}

impl SeedData {
    pub fn from_json(raw: &str) -> Result<Self, SeedError> {
        Ok(serde_json::from_str(raw)?)
    }
}

/// Imports users, then groups, then games
///
/// Stops at the first failure. Rows created before it stay; run [`destroy`]
/// before retrying.
pub async fn import(
    store: &dyn Store,
    data: &SeedData,
    hash_params: HashParams,
) -> Result<SeedSummary, SeedError> {
    let mut summary = SeedSummary::default();
    let mut users: HashMap<String, Uuid> = HashMap::new();
    let mut groups: HashMap<&str, Uuid> = HashMap::new();

    for seed in &data.users {
        let email = normalize_email(&seed.email);
        let user = store
            .create_user(CreateUser {
                name: seed.name.trim().to_string(),
                email: email.clone(),
                password_hash: hash_password_with(&seed.password, hash_params)?,
                role: seed.role,
            })
            .await?;
        users.insert(email, user.id);
        summary.users += 1;
    }

    for seed in &data.groups {
        let owner = lookup_user(&users, &seed.owner)?;
        let group = store
            .create_group(
                owner,
                NewGroup {
                    name: seed.name.clone(),
                    description: seed.description.clone(),
                }
                .normalized(),
            )
            .await?;
        groups.insert(seed.name.trim(), group.id);
        summary.groups += 1;

        summary.members +=
            add_members(store, Target::group(group.id), &users, &seed.members).await?;
    }

    for seed in &data.games {
        let owner = lookup_user(&users, &seed.owner)?;
        let group_id = *groups
            .get(seed.group.trim())
            .ok_or_else(|| SeedError::UnknownGroup(seed.group.clone()))?;

        let game = store
            .create_game(
                owner,
                group_id,
                NewGame {
                    title: seed.title.clone(),
                    description: seed.description.clone(),
                }
                .normalized(),
            )
            .await?;
        summary.games += 1;

        summary.members +=
            add_members(store, Target::game(game.id), &users, &seed.members).await?;
    }

    info!(
        users = summary.users,
        groups = summary.groups,
        games = summary.games,
        members = summary.members,
        "Seed data imported"
    );

    Ok(summary)
}

async fn add_members(
    store: &dyn Store,
    target: Target,
    users: &HashMap<String, Uuid>,
    members: &[SeedMember],
) -> Result<usize, SeedError> {
    for member in members {
        if member.role == MemberRole::Creator {
            return Err(SeedError::CreatorMember(member.email.clone()));
        }

        let user_id = lookup_user(users, &member.email)?;
        let request = store.create_request(target, user_id, None).await?;
        store.accept_request(target, request.id).await?;

        if member.role != MemberRole::User {
            store.set_member_role(target, user_id, member.role).await?;
        }
    }

    Ok(members.len())
}

fn lookup_user(users: &HashMap<String, Uuid>, email: &str) -> Result<Uuid, SeedError> {
    users
        .get(&normalize_email(email))
        .copied()
        .ok_or_else(|| SeedError::UnknownUser(email.to_string()))
}

/// Deletes every user, group, game, membership and request
pub async fn destroy(pool: &PgPool) -> Result<(), SeedError> {
    sqlx::query(
        "TRUNCATE game_requests, game_members, games, \
         group_requests, group_members, groups, users",
    )
    .execute(pool)
    .await?;

    info!("Seed data destroyed");

    Ok(())
}
