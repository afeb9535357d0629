/// Request authentication helpers for Axum
///
/// Extracts the bearer token from a request, validates it and produces the
/// [`AuthContext`] that handlers read from request extensions. The API crate
/// wires these into its middleware layer, where it also confirms the user
/// still exists.
///
/// # Request Extensions
///
/// After successful authentication the middleware adds:
/// - `AuthContext`: the authenticated user's ID
///
/// # Example
///
/// ```
/// use axum::Extension;
/// use huddle_shared::auth::middleware::AuthContext;
///
/// async fn handler(Extension(auth): Extension<AuthContext>) -> String {
///     format!("User: {}", auth.user_id)
/// }
/// ```

use axum::http::{header, HeaderMap};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::jwt::{validate_token, JwtError};

/// Authentication context added to request extensions
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct AuthContext {
    /// Authenticated user ID
    pub user_id: Uuid,
}

/// Error type for request authentication
#[derive(Debug, thiserror::Error)]
pub enum AuthError {
    /// No Authorization header
    #[error("Not authorized to access this route")]
    MissingCredentials,

    /// Authorization header present but not `Bearer <token>`
    #[error("Expected Bearer token")]
    InvalidFormat,

    /// Token validation failed
    #[error("Invalid token: {0}")]
    InvalidToken(#[from] JwtError),
}

/// Pulls the token out of an `Authorization: Bearer <token>` header
///
/// # Errors
///
/// Returns `AuthError::MissingCredentials` without a header and
/// `AuthError::InvalidFormat` for other schemes or an empty token
pub fn bearer_token(headers: &HeaderMap) -> Result<&str, AuthError> {
    let auth_header = headers
        .get(header::AUTHORIZATION)
        .and_then(|v| v.to_str().ok())
        .ok_or(AuthError::MissingCredentials)?;

    let token = auth_header
        .strip_prefix("Bearer ")
        .map(str::trim)
        .ok_or(AuthError::InvalidFormat)?;

    if token.is_empty() {
        return Err(AuthError::InvalidFormat);
    }

    Ok(token)
}

/// Validates the request's bearer token
pub fn authenticate(headers: &HeaderMap, secret: &str) -> Result<AuthContext, AuthError> {
    let token = bearer_token(headers)?;
    let claims = validate_token(token, secret)?;

    Ok(AuthContext {
        user_id: claims.sub,
    })
}
