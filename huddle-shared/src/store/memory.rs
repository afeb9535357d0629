/// In-memory implementation of [`Store`]
///
/// All state sits behind one `tokio::sync::RwLock`; every mutating method
/// takes the write lock once and validates before it changes anything, so a
/// failed operation leaves the state untouched. Uniqueness rules mirror the
/// PostgreSQL constraints and report the same constraint names.

use std::collections::HashMap;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use tokio::sync::RwLock;
use uuid::Uuid;

use super::{GroupCascade, Store, StoreError, StoreResult};
use crate::models::game::{Game, GamePatch, NewGame};
use crate::models::group::{slugify, Group, GroupGame, GroupPatch, NewGroup, DEFAULT_PHOTO};
use crate::models::membership::{
    EntityKind, JoinRequest, Member, MemberRole, Target, UserGame, UserGroup,
};
use crate::models::user::{CreateUser, ResetToken, UpdateUser, User};
use crate::models::{Page, Paginated};

/// A value plus its insertion sequence, which breaks timestamp ties in listings
#[derive(Debug, Clone)]
struct Seq<T> {
    seq: u64,
    value: T,
}

#[derive(Debug, Default)]
struct State {
    next_seq: u64,

    users: HashMap<Uuid, Seq<User>>,
    groups: HashMap<Uuid, Seq<Group>>,
    games: HashMap<Uuid, Seq<Game>>,

    /// Keyed by (entity, user)
    members: HashMap<(Target, Uuid), Seq<Member>>,

    /// Keyed by request id
    requests: HashMap<Uuid, Seq<(Target, JoinRequest)>>,
}

impl State {
    fn seq(&mut self) -> u64 {
        self.next_seq += 1;
        self.next_seq
    }

    fn email_taken(&self, email: &str, except: Option<Uuid>) -> bool {
        self.users
            .values()
            .any(|u| u.value.email == email && Some(u.value.id) != except)
    }

    fn group_name_taken(&self, name: &str, except: Option<Uuid>) -> bool {
        self.groups
            .values()
            .any(|g| g.value.name == name && Some(g.value.id) != except)
    }

    fn entity_exists(&self, target: Target) -> bool {
        match target.kind {
            EntityKind::Group => self.groups.contains_key(&target.id),
            EntityKind::Game => self.games.contains_key(&target.id),
        }
    }

    fn has_request(&self, target: Target, user_id: Uuid) -> bool {
        self.requests
            .values()
            .any(|r| r.value.0 == target && r.value.1.user_id == user_id)
    }

    fn insert_member(&mut self, target: Target, user_id: Uuid, role: MemberRole) -> Member {
        let member = Member {
            user_id,
            role,
            joined_at: Utc::now(),
        };
        let seq = self.seq();
        self.members.insert(
            (target, user_id),
            Seq {
                seq,
                value: member.clone(),
            },
        );
        member
    }

    /// Drops every member and request of `target`
    fn clear_target(&mut self, target: Target) {
        self.members.retain(|(t, _), _| *t != target);
        self.requests.retain(|_, r| r.value.0 != target);
    }

    fn members_of(&self, target: Target) -> Vec<Member> {
        let mut members: Vec<&Seq<Member>> = self
            .members
            .iter()
            .filter(|((t, _), _)| *t == target)
            .map(|(_, m)| m)
            .collect();
        members.sort_by_key(|m| m.seq);
        members.into_iter().map(|m| m.value.clone()).collect()
    }

    fn memberships_of(&self, user_id: Uuid, kind: EntityKind) -> Vec<(Target, Member)> {
        let mut found: Vec<(&Target, &Seq<Member>)> = self
            .members
            .iter()
            .filter(|((t, u), _)| *u == user_id && t.kind == kind)
            .map(|((t, _), m)| (t, m))
            .collect();
        found.sort_by_key(|(_, m)| m.seq);
        found
            .into_iter()
            .map(|(t, m)| (*t, m.value.clone()))
            .collect()
    }
}

/// Newest first, like the SQL listings
fn page_of<T: Clone>(rows: &HashMap<Uuid, Seq<T>>, page: Page) -> Paginated<T> {
    let page = page.clamped();
    let mut all: Vec<&Seq<T>> = rows.values().collect();
    all.sort_by_key(|r| std::cmp::Reverse(r.seq));

    let items = all[page.range(all.len())]
        .iter()
        .map(|r| r.value.clone())
        .collect();

    Paginated {
        items,
        total: all.len() as i64,
        page: page.page,
        limit: page.limit,
    }
}

fn conflict(constraint: &str) -> StoreError {
    StoreError::Conflict(constraint.to_string())
}

fn members_key(kind: EntityKind) -> &'static str {
    match kind {
        EntityKind::Group => "group_members_pkey",
        EntityKind::Game => "game_members_pkey",
    }
}

fn requests_key(kind: EntityKind) -> &'static str {
    match kind {
        EntityKind::Group => "group_requests_group_user_key",
        EntityKind::Game => "game_requests_game_user_key",
    }
}

fn entity_fkey(kind: EntityKind) -> &'static str {
    match kind {
        EntityKind::Group => "group_requests_group_id_fkey",
        EntityKind::Game => "game_requests_game_id_fkey",
    }
}

/// Process-local store, see the module docs
#[derive(Debug, Default)]
pub struct MemoryStore {
    state: RwLock<State>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl Store for MemoryStore {
    async fn ping(&self) -> StoreResult<()> {
        let _state = self.state.read().await;
        Ok(())
    }

    async fn create_user(&self, data: CreateUser) -> StoreResult<User> {
        let mut state = self.state.write().await;

        if state.email_taken(&data.email, None) {
            return Err(conflict("users_email_key"));
        }

        let now = Utc::now();
        let user = User {
            id: Uuid::new_v4(),
            name: data.name,
            email: data.email,
            password_hash: data.password_hash,
            role: data.role,
            reset_password_token: None,
            reset_password_expire: None,
            created_at: now,
            updated_at: now,
        };

        let seq = state.seq();
        state.users.insert(
            user.id,
            Seq {
                seq,
                value: user.clone(),
            },
        );

        Ok(user)
    }

    async fn find_user(&self, id: Uuid) -> StoreResult<Option<User>> {
        let state = self.state.read().await;
        Ok(state.users.get(&id).map(|u| u.value.clone()))
    }

    async fn find_user_by_email(&self, email: &str) -> StoreResult<Option<User>> {
        let state = self.state.read().await;
        Ok(state
            .users
            .values()
            .find(|u| u.value.email == email)
            .map(|u| u.value.clone()))
    }

    async fn find_user_by_reset_token(
        &self,
        token_hash: &str,
        now: DateTime<Utc>,
    ) -> StoreResult<Option<User>> {
        let state = self.state.read().await;
        Ok(state
            .users
            .values()
            .map(|u| &u.value)
            .find(|u| {
                u.reset_password_token.as_deref() == Some(token_hash)
                    && u.reset_password_expire.is_some_and(|exp| exp > now)
            })
            .cloned())
    }

    async fn update_user(&self, id: Uuid, data: UpdateUser) -> StoreResult<Option<User>> {
        let mut state = self.state.write().await;

        if let Some(email) = &data.email {
            if state.email_taken(email, Some(id)) {
                return Err(conflict("users_email_key"));
            }
        }

        let Some(user) = state.users.get_mut(&id) else {
            return Ok(None);
        };
        let user = &mut user.value;

        if let Some(name) = data.name {
            user.name = name;
        }
        if let Some(email) = data.email {
            user.email = email;
        }
        if let Some(password_hash) = data.password_hash {
            user.password_hash = password_hash;
        }
        if data.clear_reset_token {
            user.reset_password_token = None;
            user.reset_password_expire = None;
        }
        user.updated_at = Utc::now();

        Ok(Some(user.clone()))
    }

    async fn set_reset_token(&self, id: Uuid, token: Option<ResetToken>) -> StoreResult<bool> {
        let mut state = self.state.write().await;

        let Some(user) = state.users.get_mut(&id) else {
            return Ok(false);
        };
        let user = &mut user.value;

        user.reset_password_expire = token.as_ref().map(|t| t.expires_at);
        user.reset_password_token = token.map(|t| t.hash);
        user.updated_at = Utc::now();

        Ok(true)
    }

    async fn list_user_groups(&self, user_id: Uuid) -> StoreResult<Vec<UserGroup>> {
        let state = self.state.read().await;
        Ok(state
            .memberships_of(user_id, EntityKind::Group)
            .into_iter()
            .map(|(target, m)| UserGroup {
                group_id: target.id,
                role: m.role,
                joined_at: m.joined_at,
            })
            .collect())
    }

    async fn list_user_games(&self, user_id: Uuid) -> StoreResult<Vec<UserGame>> {
        let state = self.state.read().await;
        Ok(state
            .memberships_of(user_id, EntityKind::Game)
            .into_iter()
            .map(|(target, m)| UserGame {
                game_id: target.id,
                role: m.role,
                joined_at: m.joined_at,
            })
            .collect())
    }

    async fn create_group(&self, owner: Uuid, data: NewGroup) -> StoreResult<Group> {
        let mut state = self.state.write().await;

        if state.group_name_taken(&data.name, None) {
            return Err(conflict("groups_name_key"));
        }
        if !state.users.contains_key(&owner) {
            return Err(StoreError::Reference("group_members_user_id_fkey".to_string()));
        }

        let now = Utc::now();
        let group = Group {
            id: Uuid::new_v4(),
            slug: slugify(&data.name),
            name: data.name,
            description: data.description,
            photo: DEFAULT_PHOTO.to_string(),
            created_at: now,
            updated_at: now,
        };

        let seq = state.seq();
        state.groups.insert(
            group.id,
            Seq {
                seq,
                value: group.clone(),
            },
        );
        state.insert_member(Target::group(group.id), owner, MemberRole::Creator);

        Ok(group)
    }

    async fn find_group(&self, id: Uuid) -> StoreResult<Option<Group>> {
        let state = self.state.read().await;
        Ok(state.groups.get(&id).map(|g| g.value.clone()))
    }

    async fn list_groups(&self, page: Page) -> StoreResult<Paginated<Group>> {
        let state = self.state.read().await;
        Ok(page_of(&state.groups, page))
    }

    async fn update_group(&self, id: Uuid, patch: GroupPatch) -> StoreResult<Option<Group>> {
        let mut state = self.state.write().await;

        if let Some(name) = &patch.name {
            if state.group_name_taken(name, Some(id)) {
                return Err(conflict("groups_name_key"));
            }
        }

        let Some(group) = state.groups.get_mut(&id) else {
            return Ok(None);
        };
        let group = &mut group.value;

        if let Some(name) = patch.name {
            group.slug = slugify(&name);
            group.name = name;
        }
        if let Some(description) = patch.description {
            group.description = description;
        }
        group.updated_at = Utc::now();

        Ok(Some(group.clone()))
    }

    async fn delete_group(&self, plan: &GroupCascade) -> StoreResult<bool> {
        let mut state = self.state.write().await;

        if !state.groups.contains_key(&plan.group_id) {
            return Ok(false);
        }

        let unplanned = state
            .games
            .values()
            .any(|g| g.value.group_id == plan.group_id && !plan.game_ids.contains(&g.value.id));
        if unplanned {
            return Err(StoreError::Reference("games_group_id_fkey".to_string()));
        }

        for target in plan.targets() {
            state.clear_target(target);
        }
        for game_id in &plan.game_ids {
            state.games.remove(game_id);
        }
        state.groups.remove(&plan.group_id);

        Ok(true)
    }

    async fn list_group_games(&self, group_id: Uuid) -> StoreResult<Vec<GroupGame>> {
        let games = self.list_games_by_group(group_id).await?;
        Ok(games
            .into_iter()
            .map(|g| GroupGame { game_id: g.id })
            .collect())
    }

    async fn create_game(&self, owner: Uuid, group_id: Uuid, data: NewGame) -> StoreResult<Game> {
        let mut state = self.state.write().await;

        if !state.groups.contains_key(&group_id) {
            return Err(StoreError::Reference("games_group_id_fkey".to_string()));
        }
        if !state.users.contains_key(&owner) {
            return Err(StoreError::Reference("game_members_user_id_fkey".to_string()));
        }

        let now = Utc::now();
        let game = Game {
            id: Uuid::new_v4(),
            group_id,
            title: data.title,
            description: data.description,
            created_at: now,
            updated_at: now,
        };

        let seq = state.seq();
        state.games.insert(
            game.id,
            Seq {
                seq,
                value: game.clone(),
            },
        );
        state.insert_member(Target::game(game.id), owner, MemberRole::Creator);

        Ok(game)
    }

    async fn find_game(&self, id: Uuid) -> StoreResult<Option<Game>> {
        let state = self.state.read().await;
        Ok(state.games.get(&id).map(|g| g.value.clone()))
    }

    async fn list_games(&self, page: Page) -> StoreResult<Paginated<Game>> {
        let state = self.state.read().await;
        Ok(page_of(&state.games, page))
    }

    async fn list_games_by_group(&self, group_id: Uuid) -> StoreResult<Vec<Game>> {
        let state = self.state.read().await;
        let mut games: Vec<&Seq<Game>> = state
            .games
            .values()
            .filter(|g| g.value.group_id == group_id)
            .collect();
        games.sort_by_key(|g| g.seq);
        Ok(games.into_iter().map(|g| g.value.clone()).collect())
    }

    async fn update_game(&self, id: Uuid, patch: GamePatch) -> StoreResult<Option<Game>> {
        let mut state = self.state.write().await;

        let Some(game) = state.games.get_mut(&id) else {
            return Ok(None);
        };
        let game = &mut game.value;

        if let Some(title) = patch.title {
            game.title = title;
        }
        if let Some(description) = patch.description {
            game.description = description;
        }
        game.updated_at = Utc::now();

        Ok(Some(game.clone()))
    }

    async fn delete_game(&self, id: Uuid) -> StoreResult<bool> {
        let mut state = self.state.write().await;

        if state.games.remove(&id).is_none() {
            return Ok(false);
        }
        state.clear_target(Target::game(id));

        Ok(true)
    }

    async fn list_members(&self, target: Target) -> StoreResult<Vec<Member>> {
        let state = self.state.read().await;
        Ok(state.members_of(target))
    }

    async fn find_member(&self, target: Target, user_id: Uuid) -> StoreResult<Option<Member>> {
        let state = self.state.read().await;
        Ok(state.members.get(&(target, user_id)).map(|m| m.value.clone()))
    }

    async fn set_member_role(
        &self,
        target: Target,
        user_id: Uuid,
        role: MemberRole,
    ) -> StoreResult<Option<Member>> {
        let mut state = self.state.write().await;
        Ok(state.members.get_mut(&(target, user_id)).map(|member| {
            member.value.role = role;
            member.value.clone()
        }))
    }

    async fn list_requests(&self, target: Target) -> StoreResult<Vec<JoinRequest>> {
        let state = self.state.read().await;
        let mut requests: Vec<&Seq<(Target, JoinRequest)>> = state
            .requests
            .values()
            .filter(|r| r.value.0 == target)
            .collect();
        requests.sort_by_key(|r| r.seq);
        Ok(requests.into_iter().map(|r| r.value.1.clone()).collect())
    }

    async fn find_request(
        &self,
        target: Target,
        request_id: Uuid,
    ) -> StoreResult<Option<JoinRequest>> {
        let state = self.state.read().await;
        Ok(state
            .requests
            .get(&request_id)
            .filter(|r| r.value.0 == target)
            .map(|r| r.value.1.clone()))
    }

    async fn find_request_by_user(
        &self,
        target: Target,
        user_id: Uuid,
    ) -> StoreResult<Option<JoinRequest>> {
        let state = self.state.read().await;
        Ok(state
            .requests
            .values()
            .find(|r| r.value.0 == target && r.value.1.user_id == user_id)
            .map(|r| r.value.1.clone()))
    }

    async fn create_request(
        &self,
        target: Target,
        user_id: Uuid,
        message: Option<String>,
    ) -> StoreResult<JoinRequest> {
        let mut state = self.state.write().await;

        if !state.entity_exists(target) {
            return Err(StoreError::Reference(entity_fkey(target.kind).to_string()));
        }
        if state.has_request(target, user_id) {
            return Err(conflict(requests_key(target.kind)));
        }

        let request = JoinRequest {
            id: Uuid::new_v4(),
            user_id,
            message,
            created_at: Utc::now(),
        };

        let seq = state.seq();
        state.requests.insert(
            request.id,
            Seq {
                seq,
                value: (target, request.clone()),
            },
        );

        Ok(request)
    }

    async fn delete_request(
        &self,
        target: Target,
        request_id: Uuid,
    ) -> StoreResult<Option<JoinRequest>> {
        let mut state = self.state.write().await;

        let belongs = state
            .requests
            .get(&request_id)
            .is_some_and(|r| r.value.0 == target);
        if !belongs {
            return Ok(None);
        }

        Ok(state.requests.remove(&request_id).map(|r| r.value.1))
    }

    async fn accept_request(
        &self,
        target: Target,
        request_id: Uuid,
    ) -> StoreResult<Option<Member>> {
        let mut state = self.state.write().await;

        let user_id = match state.requests.get(&request_id) {
            Some(r) if r.value.0 == target => r.value.1.user_id,
            _ => return Ok(None),
        };

        if state.members.contains_key(&(target, user_id)) {
            return Err(conflict(members_key(target.kind)));
        }

        state.requests.remove(&request_id);
        Ok(Some(state.insert_member(target, user_id, MemberRole::User)))
    }

    async fn remove_memberships(&self, user_id: Uuid, targets: &[Target]) -> StoreResult<u64> {
        let mut state = self.state.write().await;

        let removed = targets
            .iter()
            .filter(|&&target| state.members.remove(&(target, user_id)).is_some())
            .count();

        Ok(removed as u64)
    }
}
