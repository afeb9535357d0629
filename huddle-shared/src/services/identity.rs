/// Accounts: registration, login, profile, passwords and membership lists
///
/// Successful register, login, password update and password reset all return
/// an [`AuthSession`] carrying a freshly signed access token.
///
/// # Password reset
///
/// `forgot_password` stores the SHA-256 of a random token with a short expiry
/// and mails the plaintext as part of a reset URL. If the mail can't be
/// delivered the token is cleared again. `reset_password` accepts the
/// plaintext, looks up the unexpired hash, sets the new password and clears
/// the token.

use std::sync::Arc;

use chrono::{Duration, Utc};
use serde::{Deserialize, Serialize};
use tracing::{debug, error, info, warn};
use uuid::Uuid;
use validator::{Validate, ValidationError, ValidationErrors};

use crate::auth::jwt::{issue_token, JwtError};
use crate::auth::password::{
    hash_password_with, validate_password_strength, verify_password, HashParams, PasswordError,
};
use crate::auth::reset_token::{generate_reset_token, hash_reset_token};
use crate::mail::{Email, MailError, Mailer};
use crate::models::membership::{UserGame, UserGroup};
use crate::models::user::{CreateUser, ResetToken, SiteRole, UpdateUser, User};
use crate::store::{Store, StoreError};

/// Error type for identity operations
#[derive(Debug, thiserror::Error)]
pub enum IdentityError {
    #[error("{0}")]
    NotFound(String),

    /// Bad credentials
    #[error("{0}")]
    Unauthorized(String),

    /// Email already registered
    #[error("{0}")]
    Conflict(String),

    /// Invalid or expired reset token
    #[error("{0}")]
    BadRequest(String),

    #[error("Validation failed: {0}")]
    Validation(#[from] ValidationErrors),

    #[error("Store error: {0}")]
    Store(StoreError),

    #[error("Password error: {0}")]
    Password(#[from] PasswordError),

    #[error("Token error: {0}")]
    Token(#[from] JwtError),

    #[error("Email could not be sent: {0}")]
    Mail(#[from] MailError),
}

impl From<StoreError> for IdentityError {
    fn from(err: StoreError) -> Self {
        match err {
            StoreError::Conflict(constraint) if constraint == "users_email_key" => {
                IdentityError::Conflict("Email is already registered".to_string())
            }
            other => IdentityError::Store(other),
        }
    }
}

/// Settings the identity service needs from configuration
#[derive(Debug, Clone)]
pub struct IdentitySettings {
    /// HS256 signing secret
    pub jwt_secret: String,

    /// Lifetime of issued access tokens
    pub token_lifetime: Duration,

    /// Lifetime of password reset tokens
    pub reset_ttl: Duration,

    /// Externally visible base URL, used to build reset links
    pub public_url: String,

    /// Argon2id cost for new password hashes
    pub hash_params: HashParams,
}

/// A user plus a freshly issued access token
#[derive(Debug, Clone, Serialize)]
pub struct AuthSession {
    pub user: User,

    pub token: String,
}

/// Registration input
#[derive(Debug, Clone, Deserialize, Validate)]
pub struct Registration {
    #[validate(length(min = 1, max = 100, message = "Please add a name"))]
    pub name: String,

    #[validate(email(message = "Please add a valid email"))]
    pub email: String,

    pub password: String,

    #[serde(default)]
    pub role: SiteRole,
}

/// Login input
#[derive(Debug, Clone, Deserialize, Validate)]
pub struct Credentials {
    #[validate(length(min = 1, message = "Please provide an email and password"))]
    pub email: String,

    #[validate(length(min = 1, message = "Please provide an email and password"))]
    pub password: String,
}

/// Profile update input; absent fields are left alone
#[derive(Debug, Clone, Default, Deserialize, Validate)]
pub struct DetailsUpdate {
    #[validate(length(min = 1, max = 100, message = "Please add a name"))]
    pub name: Option<String>,

    #[validate(email(message = "Please add a valid email"))]
    pub email: Option<String>,
}

/// Password change input
#[derive(Debug, Clone, Deserialize)]
pub struct PasswordChange {
    #[serde(alias = "currentPassword")]
    pub current_password: String,

    #[serde(alias = "newPassword")]
    pub new_password: String,
}

/// Trims and lowercases an email the way it is stored
pub fn normalize_email(email: &str) -> String {
    email.trim().to_lowercase()
}

/// Runs the strength rules and reports failures against `field`
fn check_password(field: &'static str, password: &str) -> Result<(), IdentityError> {
    validate_password_strength(password).map_err(|message| {
        let mut error = ValidationError::new("password_strength");
        error.message = Some(message.into());

        let mut errors = ValidationErrors::new();
        errors.add(field, error);
        IdentityError::Validation(errors)
    })
}

fn invalid_credentials() -> IdentityError {
    IdentityError::Unauthorized("Invalid credentials".to_string())
}

#[derive(Clone)]
pub struct IdentityService {
    store: Arc<dyn Store>,
    mailer: Arc<dyn Mailer>,
    settings: Arc<IdentitySettings>,
}

impl IdentityService {
    pub fn new(store: Arc<dyn Store>, mailer: Arc<dyn Mailer>, settings: IdentitySettings) -> Self {
        Self {
            store,
            mailer,
            settings: Arc::new(settings),
        }
    }

    pub fn settings(&self) -> &IdentitySettings {
        &self.settings
    }

    fn session(&self, user: User) -> Result<AuthSession, IdentityError> {
        let token = issue_token(user.id, self.settings.token_lifetime, &self.settings.jwt_secret)?;
        Ok(AuthSession { user, token })
    }

    /// Creates an account and signs the new user in
    ///
    /// # Errors
    ///
    /// - `Validation` for a bad name, email or weak password
    /// - `Conflict` if the email is taken
    pub async fn register(&self, input: Registration) -> Result<AuthSession, IdentityError> {
        let input = Registration {
            name: input.name.trim().to_string(),
            email: normalize_email(&input.email),
            ..input
        };
        input.validate()?;
        check_password("password", &input.password)?;

        let password_hash = hash_password_with(&input.password, self.settings.hash_params)?;

        let user = self
            .store
            .create_user(CreateUser {
                name: input.name,
                email: input.email,
                password_hash,
                role: input.role,
            })
            .await?;

        info!(user_id = %user.id, role = ?user.role, "User registered");

        self.session(user)
    }

    /// Checks credentials and issues a token
    ///
    /// Unknown email and wrong password fail the same way.
    pub async fn login(&self, input: Credentials) -> Result<AuthSession, IdentityError> {
        input.validate()?;

        let Some(user) = self
            .store
            .find_user_by_email(&normalize_email(&input.email))
            .await?
        else {
            debug!("Login attempt for unknown email");
            return Err(invalid_credentials());
        };

        if !verify_password(&input.password, &user.password_hash)? {
            warn!(user_id = %user.id, "Login attempt with wrong password");
            return Err(invalid_credentials());
        }

        debug!(user_id = %user.id, "User logged in");

        self.session(user)
    }

    /// The user behind an authenticated request
    pub async fn me(&self, user_id: Uuid) -> Result<User, IdentityError> {
        self.store
            .find_user(user_id)
            .await?
            .ok_or_else(|| IdentityError::NotFound("User not found".to_string()))
    }

    /// Updates name and/or email
    pub async fn update_details(
        &self,
        user_id: Uuid,
        input: DetailsUpdate,
    ) -> Result<User, IdentityError> {
        let input = DetailsUpdate {
            name: input.name.map(|n| n.trim().to_string()),
            email: input.email.as_deref().map(normalize_email),
        };
        input.validate()?;

        let user = self
            .store
            .update_user(
                user_id,
                UpdateUser {
                    name: input.name,
                    email: input.email,
                    ..Default::default()
                },
            )
            .await?
            .ok_or_else(|| IdentityError::NotFound("User not found".to_string()))?;

        info!(%user_id, "User details updated");

        Ok(user)
    }

    /// Changes the password after verifying the current one
    pub async fn update_password(
        &self,
        user_id: Uuid,
        input: PasswordChange,
    ) -> Result<AuthSession, IdentityError> {
        let user = self.me(user_id).await?;

        if !verify_password(&input.current_password, &user.password_hash)? {
            return Err(IdentityError::Unauthorized("Password is incorrect".to_string()));
        }
        check_password("new_password", &input.new_password)?;

        let user = self
            .set_password(user_id, &input.new_password, false)
            .await?;

        info!(%user_id, "Password updated");

        self.session(user)
    }

    async fn set_password(
        &self,
        user_id: Uuid,
        password: &str,
        clear_reset_token: bool,
    ) -> Result<User, IdentityError> {
        let password_hash = hash_password_with(password, self.settings.hash_params)?;

        self.store
            .update_user(
                user_id,
                UpdateUser {
                    password_hash: Some(password_hash),
                    clear_reset_token,
                    ..Default::default()
                },
            )
            .await?
            .ok_or_else(|| IdentityError::NotFound("User not found".to_string()))
    }

    /// Link the reset email points at
    pub fn reset_url(&self, token: &str) -> String {
        format!(
            "{}/api/v1/auth/resetpassword/{}",
            self.settings.public_url.trim_end_matches('/'),
            token
        )
    }

    /// Issues a reset token and mails it to the user
    ///
    /// # Errors
    ///
    /// - `NotFound` if no account uses the email
    /// - `Mail` if delivery fails, after the token was cleared again
    pub async fn forgot_password(&self, email: &str) -> Result<(), IdentityError> {
        let user = self
            .store
            .find_user_by_email(&normalize_email(email))
            .await?
            .ok_or_else(|| IdentityError::NotFound("There is no user with that email".to_string()))?;

        let (token, hash) = generate_reset_token();
        let stored = ResetToken {
            hash,
            expires_at: Utc::now() + self.settings.reset_ttl,
        };
        self.store.set_reset_token(user.id, Some(stored)).await?;

        let body = format!(
            "You are receiving this email because you (or someone else) has requested \
             the reset of a password. Please make a PUT request to: \n\n {}",
            self.reset_url(&token)
        );

        let sent = self
            .mailer
            .send(Email {
                to: user.email.clone(),
                subject: "Password reset token".to_string(),
                body,
            })
            .await;

        if let Err(err) = sent {
            error!(user_id = %user.id, error = %err, "Reset email failed, clearing token");
            self.store.set_reset_token(user.id, None).await?;
            return Err(err.into());
        }

        info!(user_id = %user.id, "Password reset email sent");

        Ok(())
    }

    /// Sets a new password using a mailed reset token
    ///
    /// # Errors
    ///
    /// `BadRequest` ("Invalid token") for unknown or expired tokens
    pub async fn reset_password(
        &self,
        token: &str,
        password: &str,
    ) -> Result<AuthSession, IdentityError> {
        let user = self
            .store
            .find_user_by_reset_token(&hash_reset_token(token), Utc::now())
            .await?
            .ok_or_else(|| IdentityError::BadRequest("Invalid token".to_string()))?;

        check_password("password", password)?;

        let user = self.set_password(user.id, password, true).await?;

        info!(user_id = %user.id, "Password reset");

        self.session(user)
    }

    pub async fn my_groups(&self, user_id: Uuid) -> Result<Vec<UserGroup>, IdentityError> {
        Ok(self.store.list_user_groups(user_id).await?)
    }

    /// One of the caller's group memberships
    pub async fn my_group(&self, user_id: Uuid, group_id: Uuid) -> Result<UserGroup, IdentityError> {
        self.my_groups(user_id)
            .await?
            .into_iter()
            .find(|g| g.group_id == group_id)
            .ok_or_else(|| IdentityError::NotFound("Group not found".to_string()))
    }

    pub async fn my_games(&self, user_id: Uuid) -> Result<Vec<UserGame>, IdentityError> {
        Ok(self.store.list_user_games(user_id).await?)
    }
}
