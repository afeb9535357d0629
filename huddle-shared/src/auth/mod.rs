/// Authentication and authorization utilities
///
/// # Modules
///
/// - [`password`]: Argon2id password hashing and strength validation
/// - [`jwt`]: JWT access token generation and validation
/// - [`reset_token`]: Password reset token generation and hashing
/// - [`middleware`]: Bearer token extraction and the request `AuthContext`
/// - [`authorization`]: Creator/moderator checks on groups and games
///
/// # Security Features
///
/// - **Password Hashing**: Argon2id with 64 MB memory, 3 iterations
/// - **JWT Tokens**: HS256 signing with configurable expiration
/// - **Reset Tokens**: Random 20 byte tokens, stored as SHA-256 digests
///
/// # Example
///
/// ```no_run
/// use huddle_shared::auth::password::{hash_password, verify_password};
/// use huddle_shared::auth::jwt::{create_token, Claims};
/// use uuid::Uuid;
///
/// # fn example() -> Result<(), Box<dyn std::error::Error>> {
/// let hash = hash_password("MyP@ssw0rd!")?;
/// assert!(verify_password("MyP@ssw0rd!", &hash)?);
///
/// let token = create_token(&Claims::new(Uuid::new_v4()), "secret-key-at-least-32-bytes-long")?;
/// # Ok(())
/// # }
/// ```

pub mod authorization;
pub mod jwt;
pub mod middleware;
pub mod password;
pub mod reset_token;
