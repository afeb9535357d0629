/// Authentication endpoints
///
/// This module provides account endpoints:
/// - Registration and login
/// - Profile and password updates
/// - Password reset by email
/// - The caller's group and game memberships
///
/// # Endpoints
///
/// - `POST /api/v1/auth/register` - Register new user
/// - `POST /api/v1/auth/login` - Login and get a token
/// - `GET  /api/v1/auth/me` - Current user
/// - `PUT  /api/v1/auth/updatedetails` - Change name/email
/// - `PUT  /api/v1/auth/updatepassword` - Change password
/// - `POST /api/v1/auth/forgotpassword` - Mail a reset link
/// - `PUT  /api/v1/auth/resetpassword/:token` - Set a new password
/// - `GET  /api/v1/auth/groups[/:id]` - Caller's groups
/// - `DELETE /api/v1/auth/groups/:id` - Leave a group
/// - `GET  /api/v1/auth/games` - Caller's games

use super::{data, list, token, DataResponse, ListResponse, TokenResponse};
use crate::{
    app::AppState,
    error::ApiResult,
    extract::{ApiJson, ApiPath},
};
use axum::{
    extract::State,
    Extension, Json,
};
use huddle_shared::{
    auth::middleware::AuthContext,
    models::{
        membership::{Target, UserGame, UserGroup},
        user::User,
    },
    services::identity::{
        normalize_email, Credentials, DetailsUpdate, PasswordChange, Registration,
    },
};
use serde::Deserialize;
use serde_json::{json, Value};
use uuid::Uuid;
use validator::Validate;

/// Forgot password request
#[derive(Debug, Deserialize, Validate)]
pub struct ForgotPasswordRequest {
    #[validate(email(message = "Please add a valid email"))]
    pub email: String,
}

/// Reset password request
#[derive(Debug, Deserialize)]
pub struct ResetPasswordRequest {
    pub password: String,
}

/// Register a new user
///
/// # Endpoint
///
/// ```text
/// POST /api/v1/auth/register
/// Content-Type: application/json
///
/// {
///   "name": "Jane Doe",
///   "email": "jane@example.com",
///   "password": "MyP@ssw0rd!",
///   "role": "user"
/// }
/// ```
///
/// # Response
///
/// ```json
/// { "success": true, "token": "eyJ..." }
/// ```
///
/// # Errors
///
/// - `400 Bad Request`: Validation failed or weak password
/// - `409 Conflict`: Email already registered
pub async fn register(
    State(state): State<AppState>,
    ApiJson(req): ApiJson<Registration>,
) -> ApiResult<Json<TokenResponse>> {
    let session = state.services.identity.register(req).await?;
    Ok(token(session.token))
}

/// Login with email and password
///
/// # Errors
///
/// - `400 Bad Request`: Email or password missing
/// - `401 Unauthorized`: Invalid credentials
pub async fn login(
    State(state): State<AppState>,
    ApiJson(req): ApiJson<Credentials>,
) -> ApiResult<Json<TokenResponse>> {
    let session = state.services.identity.login(req).await?;
    Ok(token(session.token))
}

pub async fn me(
    State(state): State<AppState>,
    Extension(auth): Extension<AuthContext>,
) -> ApiResult<Json<DataResponse<User>>> {
    let user = state.services.identity.me(auth.user_id).await?;
    Ok(data(user))
}

/// Update name and/or email; absent fields are left alone
pub async fn update_details(
    State(state): State<AppState>,
    Extension(auth): Extension<AuthContext>,
    ApiJson(req): ApiJson<DetailsUpdate>,
) -> ApiResult<Json<DataResponse<User>>> {
    let user = state
        .services
        .identity
        .update_details(auth.user_id, req)
        .await?;
    Ok(data(user))
}

/// Change password; answers with a fresh token
///
/// # Errors
///
/// - `401 Unauthorized`: Current password is incorrect
/// - `400 Bad Request`: New password too weak
pub async fn update_password(
    State(state): State<AppState>,
    Extension(auth): Extension<AuthContext>,
    ApiJson(req): ApiJson<PasswordChange>,
) -> ApiResult<Json<TokenResponse>> {
    let session = state
        .services
        .identity
        .update_password(auth.user_id, req)
        .await?;
    Ok(token(session.token))
}

/// Mail a password reset link
///
/// # Errors
///
/// - `404 Not Found`: No user with that email
/// - `500 Internal Server Error`: Email could not be sent
pub async fn forgot_password(
    State(state): State<AppState>,
    ApiJson(req): ApiJson<ForgotPasswordRequest>,
) -> ApiResult<Json<DataResponse<&'static str>>> {
    let req = ForgotPasswordRequest {
        email: normalize_email(&req.email),
    };
    req.validate()?;
    state.services.identity.forgot_password(&req.email).await?;
    Ok(data("Email sent"))
}

/// Set a new password with a mailed reset token
///
/// # Errors
///
/// - `400 Bad Request`: Unknown or expired token, or weak password
pub async fn reset_password(
    State(state): State<AppState>,
    ApiPath(reset_token): ApiPath<String>,
    ApiJson(req): ApiJson<ResetPasswordRequest>,
) -> ApiResult<Json<TokenResponse>> {
    let session = state
        .services
        .identity
        .reset_password(&reset_token, &req.password)
        .await?;
    Ok(token(session.token))
}

pub async fn my_groups(
    State(state): State<AppState>,
    Extension(auth): Extension<AuthContext>,
) -> ApiResult<Json<ListResponse<UserGroup>>> {
    let groups = state.services.identity.my_groups(auth.user_id).await?;
    Ok(list(groups))
}

pub async fn my_group(
    State(state): State<AppState>,
    Extension(auth): Extension<AuthContext>,
    ApiPath(group_id): ApiPath<Uuid>,
) -> ApiResult<Json<DataResponse<UserGroup>>> {
    let group = state
        .services
        .identity
        .my_group(auth.user_id, group_id)
        .await?;
    Ok(data(group))
}

/// Leave a group, and with it the group's games
pub async fn leave_group(
    State(state): State<AppState>,
    Extension(auth): Extension<AuthContext>,
    ApiPath(group_id): ApiPath<Uuid>,
) -> ApiResult<Json<DataResponse<Value>>> {
    state
        .services
        .membership
        .leave(Target::group(group_id), auth.user_id)
        .await?;
    Ok(data(json!({})))
}

pub async fn my_games(
    State(state): State<AppState>,
    Extension(auth): Extension<AuthContext>,
) -> ApiResult<Json<ListResponse<UserGame>>> {
    let games = state.services.identity.my_games(auth.user_id).await?;
    Ok(list(games))
}
