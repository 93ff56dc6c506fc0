// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Firestore client wrapper with typed operations.
//!
//! Provides high-level operations for:
//! - Users (credentials, refresh token, profile media, watch history)
//! - Videos (watch-history targets)
//! - Subscriptions (channel edges, read for counting)
//!
//! Firestore has no unique indexes, so username/email uniqueness is checked
//! inside the same transaction that writes the user document. Every
//! read-modify-write of a user runs in a transaction, which Firestore retries
//! on contention.

use crate::db::{collections, conflict_error, refresh_token_matches, MediaSlot, Store};
use crate::error::AppError;
use crate::models::{PasswordHash, Subscription, User, Video};
use crate::time_utils::now_rfc3339;
use async_trait::async_trait;
use futures_util::FutureExt;

/// Firestore database client.
#[derive(Clone)]
pub struct FirestoreDb {
    client: ::firestore::FirestoreDb,
}

/// Result of a transactional insert or email change.
enum Claim<T> {
    Written(T),
    Missing,
    Taken,
}

impl FirestoreDb {
    /// Create a new Firestore client.
    ///
    /// For local development with emulator, set FIRESTORE_EMULATOR_HOST.
    pub async fn new(project_id: &str) -> Result<Self, AppError> {
        if std::env::var("FIRESTORE_EMULATOR_HOST").is_ok() {
            return Self::create_emulator_client(project_id).await;
        }

        let client = ::firestore::FirestoreDb::new(project_id)
            .await
            .map_err(|e| AppError::Database(format!("Failed to connect to Firestore: {}", e)))?;

        tracing::info!(project = project_id, "Connected to Firestore");

        Ok(Self { client })
    }

    /// Create a Firestore client for the emulator with unauthenticated access.
    async fn create_emulator_client(project_id: &str) -> Result<Self, AppError> {
        tracing::info!("Using unauthenticated connection for Firestore Emulator");

        let token_source = gcloud_sdk::ExternalJwtFunctionSource::new(|| async {
            Ok(gcloud_sdk::Token {
                token_type: "Bearer".to_string(),
                token: gcloud_sdk::SecretValue::new(
                    "eyJhbGciOiJub25lIn0.eyJ1aWQiOiJ0ZXN0In0."
                        .to_string()
                        .into(),
                ),
                expiry: chrono::Utc::now() + chrono::Duration::hours(1),
            })
        });

        let options = ::firestore::FirestoreDbOptions::new(project_id.to_string());

        let client = ::firestore::FirestoreDb::with_options_token_source(
            options,
            gcloud_sdk::GCP_DEFAULT_SCOPES.clone(),
            gcloud_sdk::TokenSourceType::ExternalSource(Box::new(token_source)),
        )
        .await
        .map_err(|e| {
            AppError::Database(format!("Failed to connect to Firestore Emulator: {}", e))
        })?;

        tracing::info!(project = project_id, "Connected to Firestore (Emulator)");

        Ok(Self { client })
    }

    /// Find the first user whose `field` equals `value`.
    async fn find_user_by(&self, field: &str, value: &str) -> Result<Option<User>, AppError> {
        let users: Vec<User> = self
            .client
            .fluent()
            .select()
            .from(collections::USERS)
            .filter(|q| q.field(field).eq(value))
            .limit(1)
            .obj()
            .query()
            .await
            .map_err(|e| AppError::Database(e.to_string()))?;

        Ok(users.into_iter().next())
    }

    /// Read a user, let `apply` decide whether and how to change it, and write
    /// it back within one transaction.
    ///
    /// Returns the written document, or `None` if the user is missing or
    /// `apply` declined.
    async fn modify_user<F>(&self, id: &str, apply: F) -> Result<Option<User>, AppError>
    where
        F: Fn(&mut User) -> bool + Clone + Send + Sync + 'static,
    {
        let id = id.to_string();

        self.client
            .run_transaction(|db, transaction| {
                let id = id.clone();
                let apply = apply.clone();
                async move {
                    let current: Option<User> = db
                        .fluent()
                        .select()
                        .by_id_in(collections::USERS)
                        .obj()
                        .one(&id)
                        .await?;

                    let Some(mut user) = current else {
                        return Ok(None);
                    };
                    if !apply(&mut user) {
                        return Ok(None);
                    }
                    user.updated_at = now_rfc3339();

                    db.fluent()
                        .update()
                        .in_col(collections::USERS)
                        .document_id(&id)
                        .object(&user)
                        .add_to_transaction(transaction)?;

                    Ok(Some(user))
                }
                .boxed()
            })
            .await
            .map_err(|e| AppError::Database(format!("User update transaction failed: {}", e)))
    }

    async fn set_object<T>(&self, collection: &str, id: &str, object: &T) -> Result<(), AppError>
    where
        T: serde::Serialize + serde::de::DeserializeOwned + Send + Sync,
    {
        let _: () = self
            .client
            .fluent()
            .update()
            .in_col(collection)
            .document_id(id)
            .object(object)
            .execute()
            .await
            .map_err(|e| AppError::Database(e.to_string()))?;
        Ok(())
    }

    async fn subscriptions_where(
        &self,
        field: &str,
        user_id: &str,
    ) -> Result<Vec<Subscription>, AppError> {
        self.client
            .fluent()
            .select()
            .from(collections::SUBSCRIPTIONS)
            .filter(|q| q.field(field).eq(user_id))
            .obj()
            .query()
            .await
            .map_err(|e| AppError::Database(e.to_string()))
    }
}

#[async_trait]
impl Store for FirestoreDb {
    // ─── User Operations ─────────────────────────────────────────

    async fn get_user(&self, id: &str) -> Result<Option<User>, AppError> {
        self.client
            .fluent()
            .select()
            .by_id_in(collections::USERS)
            .obj()
            .one(id)
            .await
            .map_err(|e| AppError::Database(e.to_string()))
    }

    async fn find_user_by_user_name(&self, user_name: &str) -> Result<Option<User>, AppError> {
        self.find_user_by("userName", user_name).await
    }

    async fn find_user_by_email(&self, email: &str) -> Result<Option<User>, AppError> {
        self.find_user_by("email", email).await
    }

    async fn insert_user(&self, user: &User) -> Result<(), AppError> {
        let user = user.clone();

        let outcome = self
            .client
            .run_transaction(|db, transaction| {
                let user = user.clone();
                async move {
                    let same_name: Vec<User> = db
                        .fluent()
                        .select()
                        .from(collections::USERS)
                        .filter(|q| q.field("userName").eq(user.user_name.as_str()))
                        .limit(1)
                        .obj()
                        .query()
                        .await?;
                    let same_email: Vec<User> = db
                        .fluent()
                        .select()
                        .from(collections::USERS)
                        .filter(|q| q.field("email").eq(user.email.as_str()))
                        .limit(1)
                        .obj()
                        .query()
                        .await?;

                    if !same_name.is_empty() || !same_email.is_empty() {
                        return Ok(Claim::Taken);
                    }

                    db.fluent()
                        .update()
                        .in_col(collections::USERS)
                        .document_id(&user.id)
                        .object(&user)
                        .add_to_transaction(transaction)?;

                    Ok(Claim::Written(()))
                }
                .boxed()
            })
            .await
            .map_err(|e| AppError::Database(format!("User insert transaction failed: {}", e)))?;

        match outcome {
            Claim::Written(()) => Ok(()),
            Claim::Missing | Claim::Taken => Err(conflict_error()),
        }
    }

    async fn update_account(
        &self,
        id: &str,
        full_name: &str,
        email: &str,
    ) -> Result<Option<User>, AppError> {
        let id = id.to_string();
        let full_name = full_name.to_string();
        let email = email.to_string();

        let outcome = self
            .client
            .run_transaction(|db, transaction| {
                let id = id.clone();
                let full_name = full_name.clone();
                let email = email.clone();
                async move {
                    let current: Option<User> = db
                        .fluent()
                        .select()
                        .by_id_in(collections::USERS)
                        .obj()
                        .one(&id)
                        .await?;
                    let Some(mut user) = current else {
                        return Ok(Claim::Missing);
                    };

                    let holders: Vec<User> = db
                        .fluent()
                        .select()
                        .from(collections::USERS)
                        .filter(|q| q.field("email").eq(email.as_str()))
                        .obj()
                        .query()
                        .await?;
                    if holders.iter().any(|holder| holder.id != id) {
                        return Ok(Claim::Taken);
                    }

                    user.full_name = full_name;
                    user.email = email;
                    user.updated_at = now_rfc3339();

                    db.fluent()
                        .update()
                        .in_col(collections::USERS)
                        .document_id(&id)
                        .object(&user)
                        .add_to_transaction(transaction)?;

                    Ok(Claim::Written(user))
                }
                .boxed()
            })
            .await
            .map_err(|e| AppError::Database(format!("Account update transaction failed: {}", e)))?;

        match outcome {
            Claim::Written(user) => Ok(Some(user)),
            Claim::Missing => Ok(None),
            Claim::Taken => Err(AppError::Conflict(
                "Email is already in use by another account".to_string(),
            )),
        }
    }

    async fn set_password(&self, id: &str, password: &PasswordHash) -> Result<bool, AppError> {
        let password = password.clone();
        let updated = self
            .modify_user(id, move |user| {
                user.password = password.clone();
                true
            })
            .await?;
        Ok(updated.is_some())
    }

    async fn set_media(
        &self,
        id: &str,
        slot: MediaSlot,
        url: &str,
    ) -> Result<Option<User>, AppError> {
        let url = url.to_string();
        self.modify_user(id, move |user| {
            slot.apply(user, url.clone());
            true
        })
        .await
    }

    async fn set_refresh_token(&self, id: &str, token: Option<&str>) -> Result<bool, AppError> {
        let token = token.map(str::to_string);
        let updated = self
            .modify_user(id, move |user| {
                user.refresh_token = token.clone();
                true
            })
            .await?;
        Ok(updated.is_some())
    }

    async fn swap_refresh_token(
        &self,
        id: &str,
        expected: &str,
        next: &str,
    ) -> Result<bool, AppError> {
        let expected = expected.to_string();
        let next = next.to_string();
        let swapped = self
            .modify_user(id, move |user| {
                if !refresh_token_matches(user.refresh_token.as_deref(), &expected) {
                    return false;
                }
                user.refresh_token = Some(next.clone());
                true
            })
            .await?;
        Ok(swapped.is_some())
    }

    async fn push_watch_history(&self, id: &str, video_id: &str) -> Result<bool, AppError> {
        let video_id = video_id.to_string();
        let updated = self
            .modify_user(id, move |user| {
                user.watch_history.push(video_id.clone());
                true
            })
            .await?;
        Ok(updated.is_some())
    }

    // ─── Video Operations ────────────────────────────────────────

    async fn insert_video(&self, video: &Video) -> Result<(), AppError> {
        self.set_object(collections::VIDEOS, &video.id, video).await
    }

    async fn get_video(&self, id: &str) -> Result<Option<Video>, AppError> {
        self.client
            .fluent()
            .select()
            .by_id_in(collections::VIDEOS)
            .obj()
            .one(id)
            .await
            .map_err(|e| AppError::Database(e.to_string()))
    }

    // ─── Subscription Operations ─────────────────────────────────

    async fn insert_subscription(&self, subscription: &Subscription) -> Result<(), AppError> {
        self.set_object(collections::SUBSCRIPTIONS, &subscription.id, subscription)
            .await
    }

    async fn subscriptions_to_channel(
        &self,
        channel_id: &str,
    ) -> Result<Vec<Subscription>, AppError> {
        self.subscriptions_where("channel", channel_id).await
    }

    async fn subscriptions_by_subscriber(
        &self,
        subscriber_id: &str,
    ) -> Result<Vec<Subscription>, AppError> {
        self.subscriptions_where("subscriber", subscriber_id).await
    }
}
