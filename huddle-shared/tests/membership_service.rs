/// Integration tests for group, game and membership services
///
/// Everything runs against the in-memory store, so no database is needed.
/// Run with: cargo test --test membership_service

use std::sync::Arc;

use huddle_shared::models::game::{GamePatch, NewGame};
use huddle_shared::models::group::{GroupPatch, NewGroup};
use huddle_shared::models::membership::{MemberRole, NewJoinRequest, Target};
use huddle_shared::models::user::CreateUser;
use huddle_shared::models::Page;
use huddle_shared::services::{GameService, GroupService, MembershipError, MembershipService};
use huddle_shared::store::{MemoryStore, Store};
use uuid::Uuid;

struct Fixture {
    store: Arc<MemoryStore>,
    groups: GroupService,
    games: GameService,
    membership: MembershipService,
}

impl Fixture {
    fn new() -> Self {
        let store = Arc::new(MemoryStore::new());
        let dyn_store: Arc<dyn Store> = store.clone();

        Self {
            groups: GroupService::new(dyn_store.clone()),
            games: GameService::new(dyn_store.clone()),
            membership: MembershipService::new(dyn_store),
            store,
        }
    }

    async fn user(&self, name: &str) -> Uuid {
        self.store
            .create_user(CreateUser {
                name: name.to_string(),
                email: format!("{}@example.com", name.to_lowercase()),
                password_hash: "not-a-real-hash".to_string(),
                role: Default::default(),
            })
            .await
            .expect("Failed to create user")
            .id
    }

    async fn group(&self, owner: Uuid, name: &str) -> Uuid {
        self.groups
            .create(
                owner,
                NewGroup {
                    name: name.to_string(),
                    description: "A place to meet".to_string(),
                },
            )
            .await
            .expect("Failed to create group")
            .id
    }

    async fn game(&self, owner: Uuid, group_id: Uuid, title: &str) -> Uuid {
        self.games
            .create(
                owner,
                group_id,
                NewGame {
                    title: title.to_string(),
                    description: "Bring snacks".to_string(),
                },
            )
            .await
            .expect("Failed to create game")
            .id
    }

    /// Files a request for `user` and has `moderator` accept it
    async fn join(&self, target: Target, user: Uuid, moderator: Uuid) {
        let request = self
            .membership
            .request_join(target, user, NewJoinRequest::default())
            .await
            .expect("Failed to request join");
        self.membership
            .accept_request(target, request.id, moderator)
            .await
            .expect("Failed to accept request");
    }
}

#[tokio::test]
async fn test_create_group_has_only_creator() {
    let fx = Fixture::new();
    let owner = fx.user("Owner").await;
    let group_id = fx.group(owner, "Chess Club").await;

    let detail = fx.groups.get(group_id).await.unwrap();
    assert_eq!(detail.users.len(), 1);
    assert_eq!(detail.users[0].user_id, owner);
    assert_eq!(detail.users[0].role, MemberRole::Creator);
    assert!(detail.requests.is_empty());
    assert!(detail.games.is_empty());
}

#[tokio::test]
async fn test_create_game_has_only_creator() {
    let fx = Fixture::new();
    let owner = fx.user("Owner").await;
    let host = fx.user("Host").await;
    let group_id = fx.group(owner, "Chess Club").await;

    // Group membership isn't needed to create a game
    let game_id = fx.game(host, group_id, "Friday blitz").await;

    let detail = fx.games.get(game_id).await.unwrap();
    assert_eq!(detail.game.group_id, group_id);
    assert_eq!(detail.users.len(), 1);
    assert_eq!(detail.users[0].user_id, host);
    assert_eq!(detail.users[0].role, MemberRole::Creator);
    assert!(detail.requests.is_empty());

    let games = fx.groups.list_games(group_id).await.unwrap();
    assert_eq!(games.len(), 1);
    assert_eq!(games[0].id, game_id);
}

#[tokio::test]
async fn test_create_game_in_missing_group() {
    let fx = Fixture::new();
    let owner = fx.user("Owner").await;

    let err = fx
        .games
        .create(
            owner,
            Uuid::new_v4(),
            NewGame {
                title: "Orphan".to_string(),
                description: "No group".to_string(),
            },
        )
        .await
        .unwrap_err();

    assert!(matches!(err, MembershipError::NotFound(ref m) if m.starts_with("No group with the id of")));
}

#[tokio::test]
async fn test_duplicate_group_name_conflicts() {
    let fx = Fixture::new();
    let owner = fx.user("Owner").await;
    fx.group(owner, "Chess Club").await;

    let err = fx
        .groups
        .create(
            owner,
            NewGroup {
                name: "Chess Club".to_string(),
                description: "Again".to_string(),
            },
        )
        .await
        .unwrap_err();

    assert!(matches!(err, MembershipError::Conflict(_)));
}

#[tokio::test]
async fn test_second_request_conflicts() {
    let fx = Fixture::new();
    let owner = fx.user("Owner").await;
    let user = fx.user("Jane").await;
    let target = Target::group(fx.group(owner, "Chess Club").await);

    fx.membership
        .request_join(
            target,
            user,
            NewJoinRequest {
                message: Some("Let me in".to_string()),
            },
        )
        .await
        .unwrap();

    let err = fx
        .membership
        .request_join(target, user, NewJoinRequest::default())
        .await
        .unwrap_err();
    assert!(matches!(err, MembershipError::Conflict(ref m) if m == "User already made request"));

    let requests = fx.membership.list_requests(target, owner).await.unwrap();
    assert_eq!(requests.len(), 1);
    assert_eq!(requests[0].message.as_deref(), Some("Let me in"));
}

#[tokio::test]
async fn test_member_cannot_request_again() {
    let fx = Fixture::new();
    let owner = fx.user("Owner").await;
    let target = Target::group(fx.group(owner, "Chess Club").await);

    let err = fx
        .membership
        .request_join(target, owner, NewJoinRequest::default())
        .await
        .unwrap_err();

    assert!(matches!(err, MembershipError::Conflict(ref m) if m == "User is already part of the group"));
}

#[tokio::test]
async fn test_accept_request_adds_plain_member() {
    let fx = Fixture::new();
    let owner = fx.user("Owner").await;
    let user = fx.user("Jane").await;
    let group_id = fx.group(owner, "Chess Club").await;
    let target = Target::group(group_id);

    let request = fx
        .membership
        .request_join(target, user, NewJoinRequest::default())
        .await
        .unwrap();

    let member = fx
        .membership
        .accept_request(target, request.id, owner)
        .await
        .unwrap();
    assert_eq!(member.user_id, user);
    assert_eq!(member.role, MemberRole::User);

    let fetched = fx.membership.get_member(target, user).await.unwrap();
    assert_eq!(fetched.role, MemberRole::User);

    let mine = fx.store.list_user_groups(user).await.unwrap();
    assert_eq!(mine.len(), 1);
    assert_eq!(mine[0].group_id, group_id);

    assert!(fx.membership.list_requests(target, owner).await.unwrap().is_empty());
}

#[tokio::test]
async fn test_moderator_can_accept_requests() {
    let fx = Fixture::new();
    let owner = fx.user("Owner").await;
    let moderator = fx.user("Mod").await;
    let user = fx.user("Jane").await;
    let target = Target::game({
        let group_id = fx.group(owner, "Chess Club").await;
        fx.game(owner, group_id, "Friday blitz").await
    });

    fx.join(target, moderator, owner).await;
    let promoted = fx
        .store
        .set_member_role(target, moderator, MemberRole::Moderator)
        .await
        .unwrap()
        .expect("moderator should be a member");
    assert_eq!(promoted.role, MemberRole::Moderator);

    fx.join(target, user, moderator).await;

    let members = fx.membership.list_members(target).await.unwrap();
    assert_eq!(members.len(), 3);
}

#[tokio::test]
async fn test_plain_member_is_unauthorized() {
    let fx = Fixture::new();
    let owner = fx.user("Owner").await;
    let member = fx.user("Member").await;
    let outsider = fx.user("Outsider").await;
    let group_id = fx.group(owner, "Chess Club").await;
    let target = Target::group(group_id);

    fx.join(target, member, owner).await;
    let request = fx
        .membership
        .request_join(target, outsider, NewJoinRequest::default())
        .await
        .unwrap();

    let unauthorized = |result: Result<_, MembershipError>| {
        matches!(result, Err(MembershipError::Unauthorized(_)))
    };

    assert!(unauthorized(
        fx.membership.list_requests(target, member).await.map(|_| ())
    ));
    assert!(unauthorized(
        fx.membership
            .accept_request(target, request.id, member)
            .await
            .map(|_| ())
    ));
    assert!(unauthorized(
        fx.membership
            .deny_request(target, request.id, member)
            .await
            .map(|_| ())
    ));
    assert!(unauthorized(
        fx.membership
            .remove_member(target, owner, member)
            .await
            .map(|_| ())
    ));
    assert!(unauthorized(
        fx.groups
            .update(
                group_id,
                member,
                GroupPatch {
                    name: Some("Hijacked".to_string()),
                    ..Default::default()
                },
            )
            .await
            .map(|_| ())
    ));
    assert!(unauthorized(fx.groups.delete(group_id, member).await));

    // Nothing changed
    assert_eq!(fx.membership.list_requests(target, owner).await.unwrap().len(), 1);
    assert_eq!(fx.membership.list_members(target).await.unwrap().len(), 2);
    assert_eq!(fx.groups.find(group_id).await.unwrap().name, "Chess Club");
}

#[tokio::test]
async fn test_non_member_gets_not_found() {
    let fx = Fixture::new();
    let owner = fx.user("Owner").await;
    let outsider = fx.user("Outsider").await;
    let group_id = fx.group(owner, "Chess Club").await;
    let game_id = fx.game(owner, group_id, "Friday blitz").await;

    let err = fx
        .membership
        .list_requests(Target::game(game_id), outsider)
        .await
        .unwrap_err();
    assert!(matches!(err, MembershipError::NotFound(ref m) if m == "User is not part of the game"));

    let err = fx.games.delete(game_id, outsider).await.unwrap_err();
    assert!(matches!(err, MembershipError::NotFound(_)));
}

#[tokio::test]
async fn test_deny_twice_is_not_found() {
    let fx = Fixture::new();
    let owner = fx.user("Owner").await;
    let user = fx.user("Jane").await;
    let target = Target::group(fx.group(owner, "Chess Club").await);

    let request = fx
        .membership
        .request_join(target, user, NewJoinRequest::default())
        .await
        .unwrap();

    let denied = fx
        .membership
        .deny_request(target, request.id, owner)
        .await
        .unwrap();
    assert_eq!(denied.user_id, user);

    let err = fx
        .membership
        .deny_request(target, request.id, owner)
        .await
        .unwrap_err();
    assert!(matches!(err, MembershipError::NotFound(ref m) if m == "Request not found"));

    assert_eq!(fx.membership.list_members(target).await.unwrap().len(), 1);
    assert!(fx.membership.list_requests(target, owner).await.unwrap().is_empty());
}

#[tokio::test]
async fn test_request_from_other_target_is_not_found() {
    let fx = Fixture::new();
    let owner = fx.user("Owner").await;
    let user = fx.user("Jane").await;
    let chess = Target::group(fx.group(owner, "Chess Club").await);
    let go = Target::group(fx.group(owner, "Go Club").await);

    let request = fx
        .membership
        .request_join(chess, user, NewJoinRequest::default())
        .await
        .unwrap();

    let err = fx
        .membership
        .get_request(go, request.id, owner)
        .await
        .unwrap_err();
    assert!(matches!(err, MembershipError::NotFound(_)));

    let fetched = fx.membership.get_request(chess, request.id, owner).await.unwrap();
    assert_eq!(fetched.id, request.id);
}

#[tokio::test]
async fn test_delete_group_cascades_to_games_and_members() {
    let fx = Fixture::new();
    let owner = fx.user("Owner").await;
    let u1 = fx.user("Alice").await;
    let u2 = fx.user("Bob").await;
    let group_id = fx.group(owner, "Chess Club").await;
    let g1 = fx.game(owner, group_id, "Friday blitz").await;
    let g2 = fx.game(owner, group_id, "Sunday classical").await;

    for user in [u1, u2] {
        fx.join(Target::group(group_id), user, owner).await;
        fx.join(Target::game(g1), user, owner).await;
        fx.join(Target::game(g2), user, owner).await;
    }
    assert_eq!(fx.store.list_user_games(u1).await.unwrap().len(), 2);

    fx.groups.delete(group_id, owner).await.unwrap();

    assert!(matches!(
        fx.groups.find(group_id).await,
        Err(MembershipError::NotFound(_))
    ));
    for game_id in [g1, g2] {
        assert!(matches!(
            fx.games.find(game_id).await,
            Err(MembershipError::NotFound(_))
        ));
    }
    for user in [owner, u1, u2] {
        assert!(fx.store.list_user_groups(user).await.unwrap().is_empty());
        assert!(fx.store.list_user_games(user).await.unwrap().is_empty());
    }
}

#[tokio::test]
async fn test_delete_game_keeps_group() {
    let fx = Fixture::new();
    let owner = fx.user("Owner").await;
    let group_id = fx.group(owner, "Chess Club").await;
    let game_id = fx.game(owner, group_id, "Friday blitz").await;

    fx.games.delete(game_id, owner).await.unwrap();

    assert!(fx.groups.list_games(group_id).await.unwrap().is_empty());
    assert!(fx.store.list_user_games(owner).await.unwrap().is_empty());
    assert_eq!(fx.store.list_user_groups(owner).await.unwrap().len(), 1);
}

#[tokio::test]
async fn test_remove_member_from_group_prunes_its_games() {
    let fx = Fixture::new();
    let owner = fx.user("Owner").await;
    let user = fx.user("Jane").await;
    let group_id = fx.group(owner, "Chess Club").await;
    let game_id = fx.game(owner, group_id, "Friday blitz").await;

    let other_group = fx.group(owner, "Go Club").await;
    let other_game = fx.game(owner, other_group, "Weekend tournament").await;

    fx.join(Target::group(group_id), user, owner).await;
    fx.join(Target::game(game_id), user, owner).await;
    fx.join(Target::game(other_game), user, owner).await;

    let remaining = fx
        .membership
        .remove_member(Target::group(group_id), user, owner)
        .await
        .unwrap();
    assert_eq!(remaining.len(), 1);
    assert_eq!(remaining[0].user_id, owner);

    assert!(fx.store.list_user_groups(user).await.unwrap().is_empty());

    let games = fx.store.list_user_games(user).await.unwrap();
    assert_eq!(games.len(), 1);
    assert_eq!(games[0].game_id, other_game);
}

#[tokio::test]
async fn test_remove_non_member_is_not_found() {
    let fx = Fixture::new();
    let owner = fx.user("Owner").await;
    let stranger = fx.user("Stranger").await;
    let target = Target::group(fx.group(owner, "Chess Club").await);

    let err = fx
        .membership
        .remove_member(target, stranger, owner)
        .await
        .unwrap_err();
    assert!(matches!(err, MembershipError::NotFound(ref m) if m == "User is not part of the group"));
}

#[tokio::test]
async fn test_leave_group_also_leaves_games() {
    let fx = Fixture::new();
    let owner = fx.user("Owner").await;
    let user = fx.user("Jane").await;
    let group_id = fx.group(owner, "Chess Club").await;
    let game_id = fx.game(owner, group_id, "Friday blitz").await;

    fx.join(Target::group(group_id), user, owner).await;
    fx.join(Target::game(game_id), user, owner).await;

    fx.membership.leave(Target::group(group_id), user).await.unwrap();

    assert!(fx.store.list_user_groups(user).await.unwrap().is_empty());
    assert!(fx.store.list_user_games(user).await.unwrap().is_empty());
    assert_eq!(
        fx.membership.list_members(Target::game(game_id)).await.unwrap().len(),
        1
    );

    let err = fx
        .membership
        .leave(Target::group(group_id), user)
        .await
        .unwrap_err();
    assert!(matches!(err, MembershipError::NotFound(_)));
}

#[tokio::test]
async fn test_update_group_and_game() {
    let fx = Fixture::new();
    let owner = fx.user("Owner").await;
    let group_id = fx.group(owner, "Chess Club").await;
    let game_id = fx.game(owner, group_id, "Friday blitz").await;

    let group = fx
        .groups
        .update(
            group_id,
            owner,
            GroupPatch {
                name: Some("Chess & Go Club".to_string()),
                ..Default::default()
            },
        )
        .await
        .unwrap();
    assert_eq!(group.name, "Chess & Go Club");
    assert_eq!(group.description, "A place to meet");

    let unchanged = fx
        .games
        .update(game_id, owner, GamePatch::default())
        .await
        .unwrap();
    assert_eq!(unchanged.title, "Friday blitz");

    let game = fx
        .games
        .update(
            game_id,
            owner,
            GamePatch {
                description: Some("Bring boards".to_string()),
                ..Default::default()
            },
        )
        .await
        .unwrap();
    assert_eq!(game.description, "Bring boards");
    assert_eq!(game.group_id, group_id);
}

#[tokio::test]
async fn test_operations_on_missing_entities() {
    let fx = Fixture::new();
    let owner = fx.user("Owner").await;
    let missing = Uuid::new_v4();

    let err = fx
        .membership
        .request_join(Target::group(missing), owner, NewJoinRequest::default())
        .await
        .unwrap_err();
    assert!(matches!(err, MembershipError::NotFound(ref m) if m.starts_with("Group not found")));

    let err = fx
        .membership
        .list_members(Target::game(missing))
        .await
        .unwrap_err();
    assert!(matches!(err, MembershipError::NotFound(ref m) if m.starts_with("No game with the id of")));
}

#[tokio::test]
async fn test_list_groups_paginates() {
    let fx = Fixture::new();
    let owner = fx.user("Owner").await;
    for i in 0..5 {
        fx.group(owner, &format!("Club {i}")).await;
    }

    let page = fx.groups.list(Page::new(2, 2)).await.unwrap();
    assert_eq!(page.total, 5);
    assert_eq!(page.items.len(), 2);
    assert!(page.has_next());
    assert!(page.has_prev());

    let last = fx.groups.list(Page::new(3, 2)).await.unwrap();
    assert_eq!(last.items.len(), 1);
    assert!(!last.has_next());
}
