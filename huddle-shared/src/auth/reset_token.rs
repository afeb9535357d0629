/// Password reset token utilities
///
/// A reset token is 20 random bytes, hex encoded (40 chars). Only its SHA-256
/// digest is persisted; the plaintext goes out in the reset email and comes
/// back as a path segment of the reset endpoint.
///
/// # Example
///
/// ```
/// use huddle_shared::auth::reset_token::{generate_reset_token, hash_reset_token};
///
/// let (token, hash) = generate_reset_token();
/// assert_eq!(token.len(), 40);
/// assert_eq!(hash.len(), 64);
/// assert_eq!(hash_reset_token(&token), hash);
/// ```

use rand::RngCore;
use sha2::{Digest, Sha256};

/// Number of random bytes in a reset token
const TOKEN_BYTES: usize = 20;

/// Generates a new reset token
///
/// # Returns
///
/// Tuple of (plaintext_token, sha256_hex)
pub fn generate_reset_token() -> (String, String) {
    let mut bytes = [0u8; TOKEN_BYTES];
    rand::thread_rng().fill_bytes(&mut bytes);

    let token = hex::encode(bytes);
    let hash = hash_reset_token(&token);

    (token, hash)
}

/// Hex-encoded SHA-256 of a plaintext token, as stored on the user row
pub fn hash_reset_token(token: &str) -> String {
    hex::encode(Sha256::digest(token.as_bytes()))
}
