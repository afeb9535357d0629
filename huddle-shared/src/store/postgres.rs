/// PostgreSQL implementation of [`Store`]
///
/// Single-record operations run straight against the pool. Multi-record
/// operations open a transaction and compose the model operations inside it,
/// so a failure halfway leaves nothing behind.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::PgPool;
use uuid::Uuid;

use super::{GroupCascade, Store, StoreError, StoreResult};
use crate::db::pool::health_check;
use crate::models::game::{Game, GamePatch, NewGame};
use crate::models::group::{Group, GroupGame, GroupPatch, NewGroup};
use crate::models::membership::{JoinRequest, Member, MemberRole, Target, UserGame, UserGroup};
use crate::models::user::{CreateUser, ResetToken, UpdateUser, User};
use crate::models::{Page, Paginated};

/// Store backed by a PostgreSQL connection pool
#[derive(Debug, Clone)]
pub struct PgStore {
    pool: PgPool,
}

impl PgStore {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    pub fn pool(&self) -> &PgPool {
        &self.pool
    }
}

#[async_trait]
impl Store for PgStore {
    async fn ping(&self) -> StoreResult<()> {
        health_check(&self.pool).await.map_err(StoreError::from)
    }

    async fn create_user(&self, data: CreateUser) -> StoreResult<User> {
        Ok(User::create(&self.pool, data).await?)
    }

    async fn find_user(&self, id: Uuid) -> StoreResult<Option<User>> {
        Ok(User::find_by_id(&self.pool, id).await?)
    }

    async fn find_user_by_email(&self, email: &str) -> StoreResult<Option<User>> {
        Ok(User::find_by_email(&self.pool, email).await?)
    }

    async fn find_user_by_reset_token(
        &self,
        token_hash: &str,
        now: DateTime<Utc>,
    ) -> StoreResult<Option<User>> {
        Ok(User::find_by_reset_token(&self.pool, token_hash, now).await?)
    }

    async fn update_user(&self, id: Uuid, data: UpdateUser) -> StoreResult<Option<User>> {
        Ok(User::update(&self.pool, id, data).await?)
    }

    async fn set_reset_token(&self, id: Uuid, token: Option<ResetToken>) -> StoreResult<bool> {
        Ok(User::set_reset_token(&self.pool, id, token.as_ref()).await?)
    }

    async fn list_user_groups(&self, user_id: Uuid) -> StoreResult<Vec<UserGroup>> {
        Ok(User::list_groups(&self.pool, user_id).await?)
    }

    async fn list_user_games(&self, user_id: Uuid) -> StoreResult<Vec<UserGame>> {
        Ok(User::list_games(&self.pool, user_id).await?)
    }

    async fn create_group(&self, owner: Uuid, data: NewGroup) -> StoreResult<Group> {
        let mut tx = self.pool.begin().await?;

        let group = Group::create(&mut *tx, &data).await?;
        Member::insert(&mut *tx, Target::group(group.id), owner, MemberRole::Creator).await?;

        tx.commit().await?;

        Ok(group)
    }

    async fn find_group(&self, id: Uuid) -> StoreResult<Option<Group>> {
        Ok(Group::find_by_id(&self.pool, id).await?)
    }

    async fn list_groups(&self, page: Page) -> StoreResult<Paginated<Group>> {
        let page = page.clamped();
        let items = Group::list(&self.pool, page).await?;
        let total = Group::count(&self.pool).await?;

        Ok(Paginated {
            items,
            total,
            page: page.page,
            limit: page.limit,
        })
    }

    async fn update_group(&self, id: Uuid, patch: GroupPatch) -> StoreResult<Option<Group>> {
        Ok(Group::update(&self.pool, id, patch).await?)
    }

    async fn delete_group(&self, plan: &GroupCascade) -> StoreResult<bool> {
        let mut tx = self.pool.begin().await?;

        for &game_id in &plan.game_ids {
            let target = Target::game(game_id);
            JoinRequest::delete_all(&mut *tx, target).await?;
            Member::delete_all(&mut *tx, target).await?;
            Game::delete(&mut *tx, game_id).await?;
        }

        let target = Target::group(plan.group_id);
        JoinRequest::delete_all(&mut *tx, target).await?;
        Member::delete_all(&mut *tx, target).await?;

        // Fails on games_group_id_fkey if a game slipped in after the plan was built
        let deleted = Group::delete(&mut *tx, plan.group_id).await?;

        tx.commit().await?;

        Ok(deleted)
    }

    async fn list_group_games(&self, group_id: Uuid) -> StoreResult<Vec<GroupGame>> {
        Ok(Group::list_games(&self.pool, group_id).await?)
    }

    async fn create_game(&self, owner: Uuid, group_id: Uuid, data: NewGame) -> StoreResult<Game> {
        let mut tx = self.pool.begin().await?;

        let game = Game::create(&mut *tx, group_id, &data).await?;
        Member::insert(&mut *tx, Target::game(game.id), owner, MemberRole::Creator).await?;

        tx.commit().await?;

        Ok(game)
    }

    async fn find_game(&self, id: Uuid) -> StoreResult<Option<Game>> {
        Ok(Game::find_by_id(&self.pool, id).await?)
    }

    async fn list_games(&self, page: Page) -> StoreResult<Paginated<Game>> {
        let page = page.clamped();
        let items = Game::list(&self.pool, page).await?;
        let total = Game::count(&self.pool).await?;

        Ok(Paginated {
            items,
            total,
            page: page.page,
            limit: page.limit,
        })
    }

    async fn list_games_by_group(&self, group_id: Uuid) -> StoreResult<Vec<Game>> {
        Ok(Game::list_by_group(&self.pool, group_id).await?)
    }

    async fn update_game(&self, id: Uuid, patch: GamePatch) -> StoreResult<Option<Game>> {
        Ok(Game::update(&self.pool, id, patch).await?)
    }

    async fn delete_game(&self, id: Uuid) -> StoreResult<bool> {
        let mut tx = self.pool.begin().await?;

        let target = Target::game(id);
        JoinRequest::delete_all(&mut *tx, target).await?;
        Member::delete_all(&mut *tx, target).await?;
        let deleted = Game::delete(&mut *tx, id).await?;

        tx.commit().await?;

        Ok(deleted)
    }

    async fn list_members(&self, target: Target) -> StoreResult<Vec<Member>> {
        Ok(Member::list(&self.pool, target).await?)
    }

    async fn find_member(&self, target: Target, user_id: Uuid) -> StoreResult<Option<Member>> {
        Ok(Member::find(&self.pool, target, user_id).await?)
    }

    async fn set_member_role(
        &self,
        target: Target,
        user_id: Uuid,
        role: MemberRole,
    ) -> StoreResult<Option<Member>> {
        Ok(Member::set_role(&self.pool, target, user_id, role).await?)
    }

    async fn list_requests(&self, target: Target) -> StoreResult<Vec<JoinRequest>> {
        Ok(JoinRequest::list(&self.pool, target).await?)
    }

    async fn find_request(
        &self,
        target: Target,
        request_id: Uuid,
    ) -> StoreResult<Option<JoinRequest>> {
        Ok(JoinRequest::find(&self.pool, target, request_id).await?)
    }

    async fn find_request_by_user(
        &self,
        target: Target,
        user_id: Uuid,
    ) -> StoreResult<Option<JoinRequest>> {
        Ok(JoinRequest::find_by_user(&self.pool, target, user_id).await?)
    }

    async fn create_request(
        &self,
        target: Target,
        user_id: Uuid,
        message: Option<String>,
    ) -> StoreResult<JoinRequest> {
        Ok(JoinRequest::create(&self.pool, target, user_id, message).await?)
    }

    async fn delete_request(
        &self,
        target: Target,
        request_id: Uuid,
    ) -> StoreResult<Option<JoinRequest>> {
        Ok(JoinRequest::delete(&self.pool, target, request_id).await?)
    }

    async fn accept_request(
        &self,
        target: Target,
        request_id: Uuid,
    ) -> StoreResult<Option<Member>> {
        let mut tx = self.pool.begin().await?;

        let Some(request) = JoinRequest::delete(&mut *tx, target, request_id).await? else {
            return Ok(None);
        };

        // A primary key violation here rolls the request deletion back
        let member = Member::insert(&mut *tx, target, request.user_id, MemberRole::User).await?;

        tx.commit().await?;

        Ok(Some(member))
    }

    async fn remove_memberships(&self, user_id: Uuid, targets: &[Target]) -> StoreResult<u64> {
        let mut tx = self.pool.begin().await?;

        let mut removed = 0;
        for &target in targets {
            if Member::delete(&mut *tx, target, user_id).await? {
                removed += 1;
            }
        }

        tx.commit().await?;

        Ok(removed)
    }
}
