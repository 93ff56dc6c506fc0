// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Account lifecycle: registration, sessions and profile updates.
//!
//! Session handling:
//! - Login verifies the password, issues a token pair and stores the refresh token
//! - Refresh rotates the pair with a compare-and-swap on the stored refresh token
//! - Logout clears the stored refresh token
//!
//! Passwords are hashed before every write and never returned.

use crate::db::{MediaSlot, Store};
use crate::error::{AppError, Result};
use crate::models::user::normalize_user_name;
use crate::models::{PublicUser, User};
use crate::services::media::{delete_quietly, upload_staged, MediaStorage, TempUpload};
use crate::services::password::{hash_password, verify_password};
use crate::services::tokens::{TokenIssuer, TokenPair};
use crate::time_utils::now_rfc3339;
use std::sync::Arc;
use validator::ValidateEmail;

/// Registration form. Every field is optional so presence is checked here.
#[derive(Debug, Default)]
pub struct RegisterInput {
    pub email: Option<String>,
    pub full_name: Option<String>,
    pub user_name: Option<String>,
    pub password: Option<String>,
    pub avatar: Option<TempUpload>,
    pub cover_image: Option<TempUpload>,
}

/// Login credentials: username or email, plus password.
#[derive(Debug, Default, Clone)]
pub struct LoginInput {
    pub email: Option<String>,
    pub user_name: Option<String>,
    pub password: Option<String>,
}

/// Result of a successful login.
#[derive(Debug, Clone)]
pub struct LoginOutcome {
    pub user: PublicUser,
    pub tokens: TokenPair,
}

/// Account and session operations.
#[derive(Clone)]
pub struct AccountService {
    db: Arc<dyn Store>,
    tokens: TokenIssuer,
    media: Arc<dyn MediaStorage>,
}

/// Trimmed value if present and non-blank.
fn present(value: &Option<String>) -> Option<&str> {
    value.as_deref().map(str::trim).filter(|v| !v.is_empty())
}

fn check_email(email: &str) -> Result<()> {
    if email.validate_email() {
        Ok(())
    } else {
        Err(AppError::validation("Invalid email address"))
    }
}

impl AccountService {
    pub fn new(db: Arc<dyn Store>, tokens: TokenIssuer, media: Arc<dyn MediaStorage>) -> Self {
        Self { db, tokens, media }
    }

    // ─── Registration ────────────────────────────────────────────

    /// Create a user. Returns the stored record without secrets.
    pub async fn register(&self, input: RegisterInput) -> Result<PublicUser> {
        let (Some(email), Some(full_name), Some(user_name), Some(_)) = (
            present(&input.email),
            present(&input.full_name),
            present(&input.user_name),
            present(&input.password),
        ) else {
            return Err(AppError::validation("All fields are required"));
        };
        check_email(email)?;
        let user_name = normalize_user_name(user_name);

        if self.db.find_user_by_user_name(&user_name).await?.is_some()
            || self.db.find_user_by_email(email).await?.is_some()
        {
            return Err(AppError::Conflict(
                "User with email or username already exists".to_string(),
            ));
        }

        let RegisterInput {
            password,
            avatar,
            cover_image,
            ..
        } = input;
        let password = password.unwrap_or_default();

        let Some(avatar) = avatar else {
            return Err(AppError::validation("Avatar file is required"));
        };

        let avatar = upload_staged(self.media.as_ref(), avatar)
            .await
            .map_err(|e| {
                tracing::warn!(error = %e, "Avatar upload failed during registration");
                AppError::Upload("Avatar file upload error".to_string())
            })?;

        let cover_image = match cover_image {
            Some(staged) => match upload_staged(self.media.as_ref(), staged).await {
                Ok(uploaded) => Some(uploaded.url),
                Err(e) => {
                    tracing::warn!(error = %e, "Cover image upload failed, continuing without it");
                    None
                }
            },
            None => None,
        };

        let now = now_rfc3339();
        let user = User {
            id: uuid::Uuid::new_v4().to_string(),
            user_name,
            email: email.to_string(),
            full_name: full_name.to_string(),
            avatar: avatar.url,
            cover_image,
            password: hash_password(&password).await?,
            refresh_token: None,
            watch_history: Vec::new(),
            created_at: now.clone(),
            updated_at: now,
        };

        if let Err(e) = self.db.insert_user(&user).await {
            // Lost a uniqueness race or the write failed: drop the orphaned media.
            delete_quietly(self.media.as_ref(), &user.avatar).await;
            if let Some(cover) = &user.cover_image {
                delete_quietly(self.media.as_ref(), cover).await;
            }
            return Err(e);
        }

        tracing::info!(user_id = %user.id, username = %user.user_name, "User registered");

        Ok(PublicUser::from(user))
    }

    // ─── Sessions ────────────────────────────────────────────────

    /// Verify credentials and open a session.
    pub async fn login(&self, input: LoginInput) -> Result<LoginOutcome> {
        let user_name = present(&input.user_name).map(normalize_user_name);
        let email = present(&input.email);
        if user_name.is_none() && email.is_none() {
            return Err(AppError::validation("Either email or username are required"));
        }
        let Some(password) = input.password.as_deref().filter(|p| !p.trim().is_empty()) else {
            return Err(AppError::validation("Password is required"));
        };

        let mut found = None;
        if let Some(user_name) = &user_name {
            found = self.db.find_user_by_user_name(user_name).await?;
        }
        if found.is_none() {
            if let Some(email) = email {
                found = self.db.find_user_by_email(email).await?;
            }
        }
        let user = found.ok_or_else(|| AppError::NotFound("User does not exist".to_string()))?;

        if !verify_password(password, &user.password).await? {
            tracing::info!(user_id = %user.id, "Login rejected: bad password");
            return Err(AppError::unauthorized("Invalid user credentials"));
        }

        let tokens = self.open_session(&user).await?;
        tracing::info!(user_id = %user.id, "User logged in");

        Ok(LoginOutcome {
            user: PublicUser::from(user),
            tokens,
        })
    }

    /// Issue a pair and persist its refresh token, reporting any failure as
    /// a single internal error.
    async fn open_session(&self, user: &User) -> Result<TokenPair> {
        let tokens = self.tokens.issue(user)?;

        match self
            .db
            .set_refresh_token(&user.id, Some(&tokens.refresh_token))
            .await
        {
            Ok(true) => Ok(tokens),
            Ok(false) => Err(token_generation_failed("user vanished before session was stored")),
            Err(e) => Err(token_generation_failed(&e.to_string())),
        }
    }

    /// Close the session of an authenticated user.
    pub async fn logout(&self, user_id: &str) -> Result<()> {
        if !self.db.set_refresh_token(user_id, None).await? {
            tracing::warn!(user_id, "Logout for a user that no longer exists");
        }
        tracing::info!(user_id, "User logged out");
        Ok(())
    }

    /// Exchange a refresh token for a new pair.
    ///
    /// The stored token is replaced only if it still equals the presented one,
    /// so a replayed or concurrently rotated token is rejected.
    pub async fn refresh(&self, presented: Option<&str>) -> Result<TokenPair> {
        let presented = presented
            .map(str::trim)
            .filter(|t| !t.is_empty())
            .ok_or_else(|| AppError::unauthorized("Unauthorized request"))?;

        let claims = self.tokens.verify_refresh(presented)?;

        let user = self
            .db
            .get_user(&claims.sub)
            .await?
            .ok_or_else(|| AppError::unauthorized("Invalid refresh token"))?;

        let tokens = self.tokens.issue(&user)?;

        if !self
            .db
            .swap_refresh_token(&user.id, presented, &tokens.refresh_token)
            .await?
        {
            tracing::warn!(user_id = %user.id, "Rejected stale refresh token");
            return Err(AppError::unauthorized("Refresh token is expired or used"));
        }

        tracing::debug!(user_id = %user.id, "Refresh token rotated");
        Ok(tokens)
    }

    // ─── Profile updates ─────────────────────────────────────────

    pub async fn change_password(
        &self,
        user_id: &str,
        old_password: Option<&str>,
        new_password: Option<&str>,
    ) -> Result<()> {
        let (Some(old_password), Some(new_password)) = (
            old_password.filter(|p| !p.trim().is_empty()),
            new_password.filter(|p| !p.trim().is_empty()),
        ) else {
            return Err(AppError::validation("Old and new password are required"));
        };

        let user = self
            .db
            .get_user(user_id)
            .await?
            .ok_or_else(|| AppError::NotFound("User not found".to_string()))?;

        if !verify_password(old_password, &user.password).await? {
            return Err(AppError::unauthorized("Incorrect old password"));
        }

        let hash = hash_password(new_password).await?;
        if !self.db.set_password(user_id, &hash).await? {
            return Err(AppError::NotFound("User not found".to_string()));
        }

        tracing::info!(user_id, "Password changed");
        Ok(())
    }

    pub async fn update_account(
        &self,
        user_id: &str,
        full_name: Option<String>,
        email: Option<String>,
    ) -> Result<PublicUser> {
        let (Some(full_name), Some(email)) = (present(&full_name), present(&email)) else {
            return Err(AppError::validation("All fields are required"));
        };
        check_email(email)?;

        let user = self
            .db
            .update_account(user_id, full_name, email)
            .await?
            .ok_or_else(|| AppError::NotFound("User not found".to_string()))?;

        tracing::info!(user_id, "Account details updated");
        Ok(PublicUser::from(user))
    }

    /// Replace the avatar or cover image.
    ///
    /// The new file is uploaded and persisted before the old remote object is
    /// deleted; a failed upload leaves the stored URL untouched.
    pub async fn update_media(
        &self,
        user_id: &str,
        slot: MediaSlot,
        file: Option<TempUpload>,
    ) -> Result<PublicUser> {
        let Some(file) = file else {
            return Err(AppError::validation(format!("{} file is missing", slot.label())));
        };

        let user = self
            .db
            .get_user(user_id)
            .await?
            .ok_or_else(|| AppError::NotFound("User not found".to_string()))?;
        let previous = slot.current(&user).map(str::to_string);

        let uploaded = upload_staged(self.media.as_ref(), file)
            .await
            .map_err(|e| {
                tracing::warn!(user_id, error = %e, "Media upload failed");
                AppError::Upload(format!(
                    "Error while updating {} file",
                    slot.label().to_lowercase()
                ))
            })?;

        let Some(updated) = self.db.set_media(user_id, slot, &uploaded.url).await? else {
            delete_quietly(self.media.as_ref(), &uploaded.url).await;
            return Err(AppError::NotFound("User not found".to_string()));
        };

        if let Some(previous) = previous.filter(|old| *old != uploaded.url) {
            delete_quietly(self.media.as_ref(), &previous).await;
        }

        tracing::info!(user_id, slot = slot.label(), "Profile media updated");
        Ok(PublicUser::from(updated))
    }
}

fn token_generation_failed(detail: &str) -> AppError {
    tracing::error!(detail, "Failed to open session");
    AppError::Internal(anyhow::Error::msg(AppError::TOKEN_GENERATION_FAILED))
}
