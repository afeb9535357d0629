/// Game lifecycle: create under a group, read, update, delete

use std::sync::Arc;

use tracing::{debug, info};
use uuid::Uuid;
use validator::Validate;

use super::membership::{entity_not_found, MembershipError};
use crate::auth::authorization::require_moderator;
use crate::models::game::{Game, GameDetail, GamePatch, NewGame};
use crate::models::membership::Target;
use crate::models::{Page, Paginated};
use crate::store::Store;

#[derive(Clone)]
pub struct GameService {
    store: Arc<dyn Store>,
}

impl GameService {
    pub fn new(store: Arc<dyn Store>) -> Self {
        Self { store }
    }

    /// Creates a game under `group_id`; `owner` becomes its creator
    ///
    /// Membership of the group is not required, only its existence.
    ///
    /// # Errors
    ///
    /// - `Validation` for a missing title or description
    /// - `NotFound` if the group doesn't exist
    pub async fn create(
        &self,
        owner: Uuid,
        group_id: Uuid,
        input: NewGame,
    ) -> Result<Game, MembershipError> {
        let input = input.normalized();
        input.validate()?;

        if self.store.find_group(group_id).await?.is_none() {
            return Err(MembershipError::NotFound(format!(
                "No group with the id of {group_id}"
            )));
        }

        let game = self.store.create_game(owner, group_id, input).await?;

        info!(game_id = %game.id, %group_id, %owner, "Game created");

        Ok(game)
    }

    pub async fn find(&self, id: Uuid) -> Result<Game, MembershipError> {
        self.store
            .find_game(id)
            .await?
            .ok_or_else(|| entity_not_found(Target::game(id)))
    }

    /// A game with its members and pending requests
    pub async fn get(&self, id: Uuid) -> Result<GameDetail, MembershipError> {
        let game = self.find(id).await?;
        let target = Target::game(id);

        Ok(GameDetail {
            game,
            users: self.store.list_members(target).await?,
            requests: self.store.list_requests(target).await?,
        })
    }

    pub async fn list(&self, page: Page) -> Result<Paginated<Game>, MembershipError> {
        Ok(self.store.list_games(page).await?)
    }

    /// Partial update; creator/moderator only. The owning group never changes.
    pub async fn update(
        &self,
        id: Uuid,
        caller: Uuid,
        patch: GamePatch,
    ) -> Result<Game, MembershipError> {
        let game = self.find(id).await?;
        require_moderator(self.store.as_ref(), Target::game(id), caller).await?;

        let patch = patch.normalized();
        patch.validate()?;

        if patch.is_empty() {
            debug!(game_id = %id, "Empty game patch, nothing to do");
            return Ok(game);
        }

        let game = self
            .store
            .update_game(id, patch)
            .await?
            .ok_or_else(|| entity_not_found(Target::game(id)))?;

        info!(game_id = %id, updated_by = %caller, "Game updated");

        Ok(game)
    }

    /// Deletes the game with its members and requests; creator/moderator only
    pub async fn delete(&self, id: Uuid, caller: Uuid) -> Result<(), MembershipError> {
        let game = self.find(id).await?;
        require_moderator(self.store.as_ref(), Target::game(id), caller).await?;

        if !self.store.delete_game(id).await? {
            return Err(entity_not_found(Target::game(id)));
        }

        info!(game_id = %id, group_id = %game.group_id, deleted_by = %caller, "Game deleted");

        Ok(())
    }
}
