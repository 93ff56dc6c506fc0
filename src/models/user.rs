//! User model for storage and API.

use serde::{Deserialize, Serialize};

/// Argon2 PHC string of a user's password.
///
/// Only produced by [`crate::services::password::hash_password`] or read back
/// from the store, so a plaintext password never reaches persistence.
#[derive(Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct PasswordHash(String);

impl PasswordHash {
    pub(crate) fn from_phc(phc: String) -> Self {
        Self(phc)
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl std::fmt::Debug for PasswordHash {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str("PasswordHash(..)")
    }
}

/// User record stored in the `users` collection.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct User {
    /// Internal identifier (also used as document ID)
    pub id: String,
    /// Unique, lower-cased
    pub user_name: String,
    /// Unique
    pub email: String,
    pub full_name: String,
    /// Media URL, always present
    pub avatar: String,
    pub cover_image: Option<String>,
    pub password: PasswordHash,
    /// The single active refresh token, if logged in
    pub refresh_token: Option<String>,
    /// Video IDs in append order
    #[serde(default)]
    pub watch_history: Vec<String>,
    pub created_at: String,
    pub updated_at: String,
}

/// User as returned by the API: no password, no refresh token.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PublicUser {
    #[serde(rename = "_id")]
    pub id: String,
    pub user_name: String,
    pub email: String,
    pub full_name: String,
    pub avatar: String,
    pub cover_image: Option<String>,
    pub watch_history: Vec<String>,
    pub created_at: String,
    pub updated_at: String,
}

impl From<User> for PublicUser {
    fn from(user: User) -> Self {
        Self {
            id: user.id,
            user_name: user.user_name,
            email: user.email,
            full_name: user.full_name,
            avatar: user.avatar,
            cover_image: user.cover_image,
            watch_history: user.watch_history,
            created_at: user.created_at,
            updated_at: user.updated_at,
        }
    }
}

/// Normalize a username the way it is stored.
pub fn normalize_user_name(raw: &str) -> String {
    raw.trim().to_lowercase()
}
