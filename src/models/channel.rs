//! Read-only views produced by the profile queries.

use super::Video;
use serde::Serialize;

/// Public channel view with subscription counts.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ChannelProfile {
    #[serde(rename = "_id")]
    pub id: String,
    pub full_name: String,
    pub user_name: String,
    pub subscribers_count: usize,
    pub channels_subscribed_to_count: usize,
    /// Whether the requesting user subscribes to this channel
    pub is_subscribed: bool,
    pub avatar: String,
    pub cover_image: Option<String>,
}

/// Owner projection embedded in watch-history entries.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct OwnerSummary {
    pub user_name: String,
    pub avatar: String,
}

/// A video from the watch history with its owner reduced to a summary.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct WatchedVideo {
    #[serde(rename = "_id")]
    pub id: String,
    pub video_file: String,
    pub thumbnail: Option<String>,
    /// Absent when the owning user no longer exists
    #[serde(skip_serializing_if = "Option::is_none")]
    pub owner: Option<OwnerSummary>,
    pub title: String,
    pub description: Option<String>,
    pub duration: f64,
    pub views: u64,
    pub is_published: bool,
    pub created_at: String,
    pub updated_at: String,
}

impl WatchedVideo {
    pub fn new(video: Video, owner: Option<OwnerSummary>) -> Self {
        Self {
            id: video.id,
            video_file: video.video_file,
            thumbnail: video.thumbnail,
            owner,
            title: video.title,
            description: video.description,
            duration: video.duration,
            views: video.views,
            is_published: video.is_published,
            created_at: video.created_at,
            updated_at: video.updated_at,
        }
    }
}
