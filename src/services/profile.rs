// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Read-only profile views: channel profile and watch history.

use crate::config::HistoryOrder;
use crate::db::Store;
use crate::error::{AppError, Result};
use crate::models::user::normalize_user_name;
use crate::models::{ChannelProfile, OwnerSummary, Video, WatchedVideo};
use futures_util::{stream, StreamExt};
use std::collections::{HashMap, HashSet};
use std::sync::Arc;

/// Maximum concurrent document reads when resolving history entries.
const MAX_CONCURRENT_READS: usize = 8;

#[derive(Clone)]
pub struct ProfileService {
    db: Arc<dyn Store>,
    history_order: HistoryOrder,
}

impl ProfileService {
    pub fn new(db: Arc<dyn Store>, history_order: HistoryOrder) -> Self {
        Self { db, history_order }
    }

    /// Public channel view of `user_name` as seen by `requester_id`.
    pub async fn channel_profile(
        &self,
        user_name: &str,
        requester_id: &str,
    ) -> Result<ChannelProfile> {
        let user_name = user_name.trim();
        if user_name.is_empty() {
            return Err(AppError::validation("User name is missing"));
        }

        let channel = self
            .db
            .find_user_by_user_name(&normalize_user_name(user_name))
            .await?
            .ok_or_else(|| AppError::NotFound("Channel does not exist".to_string()))?;

        let (subscribers, subscribed_to) = tokio::try_join!(
            self.db.subscriptions_to_channel(&channel.id),
            self.db.subscriptions_by_subscriber(&channel.id),
        )?;

        let is_subscribed = subscribers
            .iter()
            .any(|edge| edge.subscriber == requester_id);

        Ok(ChannelProfile {
            id: channel.id,
            full_name: channel.full_name,
            user_name: channel.user_name,
            subscribers_count: subscribers.len(),
            channels_subscribed_to_count: subscribed_to.len(),
            is_subscribed,
            avatar: channel.avatar,
            cover_image: channel.cover_image,
        })
    }

    /// Resolve the user's watch history into videos with owner summaries.
    ///
    /// References to videos that no longer exist are skipped; repeated
    /// references yield repeated entries.
    pub async fn watch_history(&self, user_id: &str) -> Result<Vec<WatchedVideo>> {
        let user = self
            .db
            .get_user(user_id)
            .await?
            .ok_or_else(|| AppError::NotFound("User not found".to_string()))?;

        let mut references = user.watch_history;
        if self.history_order == HistoryOrder::MostRecentFirst {
            references.reverse();
        }

        let db = &self.db;
        let videos: Vec<Video> = stream::iter(references)
            .map(|video_id| async move { db.get_video(&video_id).await })
            .buffered(MAX_CONCURRENT_READS)
            .collect::<Vec<Result<Option<Video>>>>()
            .await
            .into_iter()
            .collect::<Result<Vec<Option<Video>>>>()?
            .into_iter()
            .flatten()
            .collect();

        let owners = self.owner_summaries(&videos).await?;

        Ok(videos
            .into_iter()
            .map(|video| {
                let owner = owners.get(&video.owner).cloned();
                WatchedVideo::new(video, owner)
            })
            .collect())
    }

    async fn owner_summaries(&self, videos: &[Video]) -> Result<HashMap<String, OwnerSummary>> {
        let owner_ids: HashSet<String> = videos.iter().map(|v| v.owner.clone()).collect();

        let db = &self.db;
        let owners = stream::iter(owner_ids)
            .map(|owner_id| async move { db.get_user(&owner_id).await })
            .buffer_unordered(MAX_CONCURRENT_READS)
            .collect::<Vec<Result<_>>>()
            .await
            .into_iter()
            .collect::<Result<Vec<_>>>()?;

        Ok(owners
            .into_iter()
            .flatten()
            .map(|owner| {
                (
                    owner.id,
                    OwnerSummary {
                        user_name: owner.user_name,
                        avatar: owner.avatar,
                    },
                )
            })
            .collect())
    }
}
