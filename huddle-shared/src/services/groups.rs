/// Group lifecycle: create, read, update, cascade delete

use std::sync::Arc;

use tracing::{debug, info};
use uuid::Uuid;
use validator::Validate;

use super::membership::{entity_not_found, MembershipError};
use crate::auth::authorization::require_moderator;
use crate::models::game::Game;
use crate::models::group::{Group, GroupDetail, GroupPatch, NewGroup};
use crate::models::membership::Target;
use crate::models::{Page, Paginated};
use crate::store::{GroupCascade, Store};

#[derive(Clone)]
pub struct GroupService {
    store: Arc<dyn Store>,
}

impl GroupService {
    pub fn new(store: Arc<dyn Store>) -> Self {
        Self { store }
    }

    /// Creates a group owned by `owner`, who becomes its creator
    ///
    /// # Errors
    ///
    /// - `Validation` for a missing/oversized name or description
    /// - `Conflict` if the name is taken
    pub async fn create(&self, owner: Uuid, input: NewGroup) -> Result<Group, MembershipError> {
        let input = input.normalized();
        input.validate()?;

        let group = self.store.create_group(owner, input).await?;

        info!(group_id = %group.id, name = %group.name, %owner, "Group created");

        Ok(group)
    }

    pub async fn find(&self, id: Uuid) -> Result<Group, MembershipError> {
        self.store
            .find_group(id)
            .await?
            .ok_or_else(|| entity_not_found(Target::group(id)))
    }

    /// A group with its members, pending requests and games
    pub async fn get(&self, id: Uuid) -> Result<GroupDetail, MembershipError> {
        let group = self.find(id).await?;
        let target = Target::group(id);

        Ok(GroupDetail {
            group,
            users: self.store.list_members(target).await?,
            requests: self.store.list_requests(target).await?,
            games: self.store.list_group_games(id).await?,
        })
    }

    pub async fn list(&self, page: Page) -> Result<Paginated<Group>, MembershipError> {
        Ok(self.store.list_groups(page).await?)
    }

    /// Games owned by a group, oldest first
    pub async fn list_games(&self, id: Uuid) -> Result<Vec<Game>, MembershipError> {
        self.find(id).await?;
        Ok(self.store.list_games_by_group(id).await?)
    }

    /// Partial update; creator/moderator only
    ///
    /// An empty patch returns the group unchanged.
    pub async fn update(
        &self,
        id: Uuid,
        caller: Uuid,
        patch: GroupPatch,
    ) -> Result<Group, MembershipError> {
        let group = self.find(id).await?;
        require_moderator(self.store.as_ref(), Target::group(id), caller).await?;

        let patch = patch.normalized();
        patch.validate()?;

        if patch.is_empty() {
            debug!(group_id = %id, "Empty group patch, nothing to do");
            return Ok(group);
        }

        let group = self
            .store
            .update_group(id, patch)
            .await?
            .ok_or_else(|| entity_not_found(Target::group(id)))?;

        info!(group_id = %id, updated_by = %caller, "Group updated");

        Ok(group)
    }

    /// Deletes the group, its games and every membership of either; creator/moderator only
    pub async fn delete(&self, id: Uuid, caller: Uuid) -> Result<(), MembershipError> {
        self.find(id).await?;
        require_moderator(self.store.as_ref(), Target::group(id), caller).await?;

        let plan = GroupCascade {
            group_id: id,
            game_ids: self
                .store
                .list_group_games(id)
                .await?
                .into_iter()
                .map(|g| g.game_id)
                .collect(),
        };

        if !self.store.delete_group(&plan).await? {
            return Err(entity_not_found(Target::group(id)));
        }

        info!(
            group_id = %id,
            deleted_by = %caller,
            games = plan.game_ids.len(),
            "Group deleted"
        );

        Ok(())
    }
}
