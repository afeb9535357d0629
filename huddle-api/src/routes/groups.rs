/// Group endpoints
///
/// # Endpoints
///
/// - `GET    /api/v1/groups?page&limit` - List groups (public)
/// - `POST   /api/v1/groups` - Create a group, caller becomes creator
/// - `GET    /api/v1/groups/:id` - Group with members, requests and games (public)
/// - `PUT    /api/v1/groups/:id` - Update (creator/moderator)
/// - `DELETE /api/v1/groups/:id` - Delete with its games (creator/moderator)
/// - `GET    /api/v1/groups/:id/games` - Games of the group (public)
///
/// Game creation under `/:id/games` lives in [`super::games`].

use super::{data, list, page, DataResponse, ListResponse, PageResponse};
use crate::{
    app::AppState,
    error::ApiResult,
    extract::{ApiJson, ApiPath, ApiQuery},
};
use axum::{
    extract::State,
    http::StatusCode,
    Extension, Json,
};
use huddle_shared::{
    auth::middleware::AuthContext,
    models::{
        game::Game,
        group::{Group, GroupDetail, GroupPatch, NewGroup},
        Page,
    },
};
use serde_json::{json, Value};
use uuid::Uuid;

pub async fn list_groups(
    State(state): State<AppState>,
    ApiQuery(query): ApiQuery<Page>,
) -> ApiResult<Json<PageResponse<Group>>> {
    let groups = state.services.groups.list(query.clamped()).await?;
    Ok(page(groups))
}

/// Create a group
///
/// # Endpoint
///
/// ```text
/// POST /api/v1/groups
/// Authorization: Bearer <token>
///
/// { "name": "Chess Club", "description": "Weekly blitz" }
/// ```
///
/// # Errors
///
/// - `400 Bad Request`: Missing or oversized name/description
/// - `409 Conflict`: Name already taken
pub async fn create_group(
    State(state): State<AppState>,
    Extension(auth): Extension<AuthContext>,
    ApiJson(req): ApiJson<NewGroup>,
) -> ApiResult<(StatusCode, Json<DataResponse<Group>>)> {
    let group = state.services.groups.create(auth.user_id, req).await?;
    Ok((StatusCode::CREATED, data(group)))
}

pub async fn get_group(
    State(state): State<AppState>,
    ApiPath(id): ApiPath<Uuid>,
) -> ApiResult<Json<DataResponse<GroupDetail>>> {
    let group = state.services.groups.get(id).await?;
    Ok(data(group))
}

pub async fn update_group(
    State(state): State<AppState>,
    Extension(auth): Extension<AuthContext>,
    ApiPath(id): ApiPath<Uuid>,
    ApiJson(req): ApiJson<GroupPatch>,
) -> ApiResult<Json<DataResponse<Group>>> {
    let group = state.services.groups.update(id, auth.user_id, req).await?;
    Ok(data(group))
}

pub async fn delete_group(
    State(state): State<AppState>,
    Extension(auth): Extension<AuthContext>,
    ApiPath(id): ApiPath<Uuid>,
) -> ApiResult<Json<DataResponse<Value>>> {
    state.services.groups.delete(id, auth.user_id).await?;
    Ok(data(json!({})))
}

pub async fn list_group_games(
    State(state): State<AppState>,
    ApiPath(id): ApiPath<Uuid>,
) -> ApiResult<Json<ListResponse<Game>>> {
    let games = state.services.groups.list_games(id).await?;
    Ok(list(games))
}
