// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! In-process store backed by `DashMap`s.
//!
//! Used for local runs (`DATABASE_BACKEND=memory`) and by the test-suite.
//! Uniqueness is enforced through index maps claimed with the entry API, and
//! single-user updates happen under the shard write lock, so the same
//! atomicity guarantees as the Firestore backend hold.

use crate::db::{conflict_error, refresh_token_matches, MediaSlot, Store};
use crate::error::AppError;
use crate::models::{PasswordHash, Subscription, User, Video};
use crate::time_utils::now_rfc3339;
use async_trait::async_trait;
use dashmap::mapref::entry::Entry;
use dashmap::DashMap;
use std::sync::Arc;

#[derive(Default)]
struct Collections {
    users: DashMap<String, User>,
    /// userName -> user id
    user_names: DashMap<String, String>,
    /// email -> user id
    emails: DashMap<String, String>,
    videos: DashMap<String, Video>,
    subscriptions: DashMap<String, Subscription>,
}

/// In-memory database. Clones share the same data.
#[derive(Clone, Default)]
pub struct MemoryDb {
    inner: Arc<Collections>,
}

impl MemoryDb {
    pub fn new() -> Self {
        Self::default()
    }

    /// Mutate a user under its entry lock; `apply` returning `false` aborts.
    fn modify_user(&self, id: &str, apply: impl FnOnce(&mut User) -> bool) -> Option<User> {
        let mut user = self.inner.users.get_mut(id)?;
        if !apply(&mut user) {
            return None;
        }
        user.updated_at = now_rfc3339();
        Some(user.clone())
    }

    fn find_indexed(&self, index: &DashMap<String, String>, key: &str) -> Option<User> {
        let id = index.get(key)?.value().clone();
        self.inner.users.get(&id).map(|user| user.clone())
    }
}

#[async_trait]
impl Store for MemoryDb {
    async fn get_user(&self, id: &str) -> Result<Option<User>, AppError> {
        Ok(self.inner.users.get(id).map(|user| user.clone()))
    }

    async fn find_user_by_user_name(&self, user_name: &str) -> Result<Option<User>, AppError> {
        Ok(self.find_indexed(&self.inner.user_names, user_name))
    }

    async fn find_user_by_email(&self, email: &str) -> Result<Option<User>, AppError> {
        Ok(self.find_indexed(&self.inner.emails, email))
    }

    async fn insert_user(&self, user: &User) -> Result<(), AppError> {
        match self.inner.user_names.entry(user.user_name.clone()) {
            Entry::Occupied(_) => return Err(conflict_error()),
            Entry::Vacant(slot) => {
                slot.insert(user.id.clone());
            }
        }

        match self.inner.emails.entry(user.email.clone()) {
            Entry::Occupied(_) => {
                self.inner.user_names.remove(&user.user_name);
                return Err(conflict_error());
            }
            Entry::Vacant(slot) => {
                slot.insert(user.id.clone());
            }
        }

        self.inner.users.insert(user.id.clone(), user.clone());
        Ok(())
    }

    async fn update_account(
        &self,
        id: &str,
        full_name: &str,
        email: &str,
    ) -> Result<Option<User>, AppError> {
        let Some(old_email) = self.inner.users.get(id).map(|user| user.email.clone()) else {
            return Ok(None);
        };

        if old_email != email {
            match self.inner.emails.entry(email.to_string()) {
                Entry::Occupied(holder) if holder.get() != id => {
                    return Err(AppError::Conflict(
                        "Email is already in use by another account".to_string(),
                    ));
                }
                Entry::Occupied(_) => {}
                Entry::Vacant(slot) => {
                    slot.insert(id.to_string());
                }
            }
        }

        let updated = self.modify_user(id, |user| {
            user.full_name = full_name.to_string();
            user.email = email.to_string();
            true
        });

        if updated.is_some() && old_email != email {
            self.inner
                .emails
                .remove_if(&old_email, |_, holder| holder == id);
        }

        Ok(updated)
    }

    async fn set_password(&self, id: &str, password: &PasswordHash) -> Result<bool, AppError> {
        Ok(self
            .modify_user(id, |user| {
                user.password = password.clone();
                true
            })
            .is_some())
    }

    async fn set_media(
        &self,
        id: &str,
        slot: MediaSlot,
        url: &str,
    ) -> Result<Option<User>, AppError> {
        Ok(self.modify_user(id, |user| {
            slot.apply(user, url.to_string());
            true
        }))
    }

    async fn set_refresh_token(&self, id: &str, token: Option<&str>) -> Result<bool, AppError> {
        Ok(self
            .modify_user(id, |user| {
                user.refresh_token = token.map(str::to_string);
                true
            })
            .is_some())
    }

    async fn swap_refresh_token(
        &self,
        id: &str,
        expected: &str,
        next: &str,
    ) -> Result<bool, AppError> {
        Ok(self
            .modify_user(id, |user| {
                if !refresh_token_matches(user.refresh_token.as_deref(), expected) {
                    return false;
                }
                user.refresh_token = Some(next.to_string());
                true
            })
            .is_some())
    }

    async fn push_watch_history(&self, id: &str, video_id: &str) -> Result<bool, AppError> {
        Ok(self
            .modify_user(id, |user| {
                user.watch_history.push(video_id.to_string());
                true
            })
            .is_some())
    }

    async fn insert_video(&self, video: &Video) -> Result<(), AppError> {
        self.inner.videos.insert(video.id.clone(), video.clone());
        Ok(())
    }

    async fn get_video(&self, id: &str) -> Result<Option<Video>, AppError> {
        Ok(self.inner.videos.get(id).map(|video| video.clone()))
    }

    async fn insert_subscription(&self, subscription: &Subscription) -> Result<(), AppError> {
        self.inner
            .subscriptions
            .insert(subscription.id.clone(), subscription.clone());
        Ok(())
    }

    async fn subscriptions_to_channel(
        &self,
        channel_id: &str,
    ) -> Result<Vec<Subscription>, AppError> {
        Ok(self
            .inner
            .subscriptions
            .iter()
            .filter(|entry| entry.channel == channel_id)
            .map(|entry| entry.value().clone())
            .collect())
    }

    async fn subscriptions_by_subscriber(
        &self,
        subscriber_id: &str,
    ) -> Result<Vec<Subscription>, AppError> {
        Ok(self
            .inner
            .subscriptions
            .iter()
            .filter(|entry| entry.subscriber == subscriber_id)
            .map(|entry| entry.value().clone())
            .collect())
    }
}
