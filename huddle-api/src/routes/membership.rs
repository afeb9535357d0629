/// Join request and member endpoints
///
/// Groups and games expose the same routes; each handler is instantiated
/// once per [`Scope`]:
///
/// - `POST   /:id/request` - Ask to join
/// - `GET    /:id/request` - Pending requests (creator/moderator)
/// - `GET    /:id/request/:request_id` - One request (creator/moderator)
/// - `PUT    /:id/request/:request_id` - Accept (creator/moderator)
/// - `DELETE /:id/request/:request_id` - Deny (creator/moderator)
/// - `GET    /:id/users` - Members
/// - `GET    /:id/users/:user_id` - One member
/// - `DELETE /:id/users/:user_id` - Remove a member (creator/moderator)

use super::{data, list, DataResponse, ListResponse};
use crate::{
    app::AppState,
    error::ApiResult,
    extract::ApiPath,
};
use axum::{
    extract::State,
    http::StatusCode,
    Extension, Json,
};
use huddle_shared::{
    auth::middleware::AuthContext,
    models::membership::{EntityKind, JoinRequest, Member, NewJoinRequest, Target},
};
use serde_json::{json, Value};
use uuid::Uuid;

/// Which kind of entity a route operates on
pub trait Scope: Send + Sync + 'static {
    const KIND: EntityKind;

    fn target(id: Uuid) -> Target {
        Target { kind: Self::KIND, id }
    }
}

pub struct Groups;

impl Scope for Groups {
    const KIND: EntityKind = EntityKind::Group;
}

pub struct Games;

impl Scope for Games {
    const KIND: EntityKind = EntityKind::Game;
}

/// Ask to join; the body is optional
///
/// ```text
/// POST /api/v1/groups/:id/request
///
/// { "message": "I play on Fridays" }
/// ```
///
/// # Errors
///
/// - `404 Not Found`: No such group/game
/// - `409 Conflict`: Already requested or already a member
pub async fn request_join<K: Scope>(
    State(state): State<AppState>,
    Extension(auth): Extension<AuthContext>,
    ApiPath(id): ApiPath<Uuid>,
    body: Option<Json<NewJoinRequest>>,
) -> ApiResult<(StatusCode, Json<DataResponse<JoinRequest>>)> {
    let input = body.map(|Json(b)| b).unwrap_or_default();

    let request = state
        .services
        .membership
        .request_join(K::target(id), auth.user_id, input)
        .await?;
    Ok((StatusCode::CREATED, data(request)))
}

pub async fn list_requests<K: Scope>(
    State(state): State<AppState>,
    Extension(auth): Extension<AuthContext>,
    ApiPath(id): ApiPath<Uuid>,
) -> ApiResult<Json<ListResponse<JoinRequest>>> {
    let requests = state
        .services
        .membership
        .list_requests(K::target(id), auth.user_id)
        .await?;
    Ok(list(requests))
}

pub async fn get_request<K: Scope>(
    State(state): State<AppState>,
    Extension(auth): Extension<AuthContext>,
    ApiPath((id, request_id)): ApiPath<(Uuid, Uuid)>,
) -> ApiResult<Json<DataResponse<JoinRequest>>> {
    let request = state
        .services
        .membership
        .get_request(K::target(id), request_id, auth.user_id)
        .await?;
    Ok(data(request))
}

/// Accept a request; answers with the new membership
pub async fn accept_request<K: Scope>(
    State(state): State<AppState>,
    Extension(auth): Extension<AuthContext>,
    ApiPath((id, request_id)): ApiPath<(Uuid, Uuid)>,
) -> ApiResult<Json<DataResponse<Member>>> {
    let member = state
        .services
        .membership
        .accept_request(K::target(id), request_id, auth.user_id)
        .await?;
    Ok(data(member))
}

pub async fn deny_request<K: Scope>(
    State(state): State<AppState>,
    Extension(auth): Extension<AuthContext>,
    ApiPath((id, request_id)): ApiPath<(Uuid, Uuid)>,
) -> ApiResult<Json<DataResponse<Value>>> {
    state
        .services
        .membership
        .deny_request(K::target(id), request_id, auth.user_id)
        .await?;
    Ok(data(json!({})))
}

pub async fn list_members<K: Scope>(
    State(state): State<AppState>,
    ApiPath(id): ApiPath<Uuid>,
) -> ApiResult<Json<ListResponse<Member>>> {
    let members = state.services.membership.list_members(K::target(id)).await?;
    Ok(list(members))
}

pub async fn get_member<K: Scope>(
    State(state): State<AppState>,
    ApiPath((id, user_id)): ApiPath<(Uuid, Uuid)>,
) -> ApiResult<Json<DataResponse<Member>>> {
    let member = state
        .services
        .membership
        .get_member(K::target(id), user_id)
        .await?;
    Ok(data(member))
}

/// Remove a member; answers with the members that remain
///
/// Removing someone from a group also removes them from its games.
pub async fn remove_member<K: Scope>(
    State(state): State<AppState>,
    Extension(auth): Extension<AuthContext>,
    ApiPath((id, user_id)): ApiPath<(Uuid, Uuid)>,
) -> ApiResult<Json<ListResponse<Member>>> {
    let members = state
        .services
        .membership
        .remove_member(K::target(id), user_id, auth.user_id)
        .await?;
    Ok(list(members))
}
