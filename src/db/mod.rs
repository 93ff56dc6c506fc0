//! Database layer.
//!
//! [`Store`] is the seam between the services and persistence. Production
//! runs on Firestore; [`MemoryDb`] backs local runs and tests.

pub mod firestore;
pub mod memory;

pub use self::firestore::FirestoreDb;
pub use memory::MemoryDb;

use crate::error::AppError;
use crate::models::{PasswordHash, Subscription, User, Video};
use async_trait::async_trait;

/// Collection names as constants.
pub mod collections {
    pub const USERS: &str = "users";
    pub const VIDEOS: &str = "videos";
    pub const SUBSCRIPTIONS: &str = "subscriptions";
}

/// Which profile media field an update targets.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MediaSlot {
    Avatar,
    CoverImage,
}

impl MediaSlot {
    /// Human-readable name used in messages.
    pub fn label(self) -> &'static str {
        match self {
            MediaSlot::Avatar => "Avatar",
            MediaSlot::CoverImage => "Cover image",
        }
    }

    /// Current URL held by the user for this slot.
    pub fn current(self, user: &User) -> Option<&str> {
        match self {
            MediaSlot::Avatar => Some(user.avatar.as_str()),
            MediaSlot::CoverImage => user.cover_image.as_deref(),
        }
    }

    pub(crate) fn apply(self, user: &mut User, url: String) {
        match self {
            MediaSlot::Avatar => user.avatar = url,
            MediaSlot::CoverImage => user.cover_image = Some(url),
        }
    }
}

/// Persistence operations used by the services.
///
/// Every mutating user operation is a single atomic document update; none of
/// them is a read followed by an unconditional write.
#[async_trait]
pub trait Store: Send + Sync {
    // ─── Users ──────────────────────────────────────────────────

    async fn get_user(&self, id: &str) -> Result<Option<User>, AppError>;

    /// Look up by (already normalized) username.
    async fn find_user_by_user_name(&self, user_name: &str) -> Result<Option<User>, AppError>;

    async fn find_user_by_email(&self, email: &str) -> Result<Option<User>, AppError>;

    /// Insert a new user.
    ///
    /// Fails with [`AppError::Conflict`] if the username or email is taken.
    async fn insert_user(&self, user: &User) -> Result<(), AppError>;

    /// Replace full name and email. Returns `None` if the user does not exist.
    ///
    /// Fails with [`AppError::Conflict`] if another user holds the email.
    async fn update_account(
        &self,
        id: &str,
        full_name: &str,
        email: &str,
    ) -> Result<Option<User>, AppError>;

    /// Returns `false` if the user does not exist.
    async fn set_password(&self, id: &str, password: &PasswordHash) -> Result<bool, AppError>;

    async fn set_media(
        &self,
        id: &str,
        slot: MediaSlot,
        url: &str,
    ) -> Result<Option<User>, AppError>;

    /// Unconditionally set (login) or clear (logout) the refresh token.
    async fn set_refresh_token(&self, id: &str, token: Option<&str>) -> Result<bool, AppError>;

    /// Replace the refresh token with `next` only if it currently equals `expected`.
    ///
    /// Returns `false` when the user is gone or holds a different token.
    async fn swap_refresh_token(
        &self,
        id: &str,
        expected: &str,
        next: &str,
    ) -> Result<bool, AppError>;

    async fn push_watch_history(&self, id: &str, video_id: &str) -> Result<bool, AppError>;

    // ─── Videos ─────────────────────────────────────────────────

    async fn insert_video(&self, video: &Video) -> Result<(), AppError>;

    async fn get_video(&self, id: &str) -> Result<Option<Video>, AppError>;

    // ─── Subscriptions ──────────────────────────────────────────

    async fn insert_subscription(&self, subscription: &Subscription) -> Result<(), AppError>;

    /// Inbound edges: who subscribes to `channel_id`.
    async fn subscriptions_to_channel(
        &self,
        channel_id: &str,
    ) -> Result<Vec<Subscription>, AppError>;

    /// Outbound edges: what `subscriber_id` subscribes to.
    async fn subscriptions_by_subscriber(
        &self,
        subscriber_id: &str,
    ) -> Result<Vec<Subscription>, AppError>;
}

/// Constant-time comparison of a stored refresh token against a presented one.
pub(crate) fn refresh_token_matches(stored: Option<&str>, presented: &str) -> bool {
    use subtle::ConstantTimeEq;

    match stored {
        Some(stored) => stored.as_bytes().ct_eq(presented.as_bytes()).into(),
        None => false,
    }
}

pub(crate) fn conflict_error() -> AppError {
    AppError::Conflict("User with email or username already exists".to_string())
}
