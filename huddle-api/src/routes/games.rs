/// Game endpoints
///
/// # Endpoints
///
/// - `GET    /api/v1/games?page&limit` - List games (public)
/// - `POST   /api/v1/groups/:id/games` - Create a game in a group
/// - `GET    /api/v1/games/:id` - Game with members and requests
/// - `PUT    /api/v1/games/:id` - Update (creator/moderator)
/// - `DELETE /api/v1/games/:id` - Delete (creator/moderator)

use super::{data, page, DataResponse, PageResponse};
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
        game::{Game, GameDetail, GamePatch, NewGame},
        Page,
    },
};
use serde_json::{json, Value};
use uuid::Uuid;

pub async fn list_games(
    State(state): State<AppState>,
    ApiQuery(query): ApiQuery<Page>,
) -> ApiResult<Json<PageResponse<Game>>> {
    let games = state.services.games.list(query.clamped()).await?;
    Ok(page(games))
}

/// Create a game under a group; the caller becomes its creator
///
/// # Errors
///
/// - `400 Bad Request`: Missing title or description
/// - `404 Not Found`: No such group
pub async fn create_game(
    State(state): State<AppState>,
    Extension(auth): Extension<AuthContext>,
    ApiPath(group_id): ApiPath<Uuid>,
    ApiJson(req): ApiJson<NewGame>,
) -> ApiResult<(StatusCode, Json<DataResponse<Game>>)> {
    let game = state
        .services
        .games
        .create(auth.user_id, group_id, req)
        .await?;
    Ok((StatusCode::CREATED, data(game)))
}

pub async fn get_game(
    State(state): State<AppState>,
    ApiPath(id): ApiPath<Uuid>,
) -> ApiResult<Json<DataResponse<GameDetail>>> {
    let game = state.services.games.get(id).await?;
    Ok(data(game))
}

pub async fn update_game(
    State(state): State<AppState>,
    Extension(auth): Extension<AuthContext>,
    ApiPath(id): ApiPath<Uuid>,
    ApiJson(req): ApiJson<GamePatch>,
) -> ApiResult<Json<DataResponse<Game>>> {
    let game = state.services.games.update(id, auth.user_id, req).await?;
    Ok(data(game))
}

pub async fn delete_game(
    State(state): State<AppState>,
    Extension(auth): Extension<AuthContext>,
    ApiPath(id): ApiPath<Uuid>,
) -> ApiResult<Json<DataResponse<Value>>> {
    state.services.games.delete(id, auth.user_id).await?;
    Ok(data(json!({})))
}
