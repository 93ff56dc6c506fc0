//! Video model (referenced by watch history).

use serde::{Deserialize, Serialize};

/// Video stored in the `videos` collection.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Video {
    pub id: String,
    pub video_file: String,
    pub thumbnail: Option<String>,
    /// Owning user ID
    pub owner: String,
    pub title: String,
    pub description: Option<String>,
    /// Seconds
    pub duration: f64,
    #[serde(default)]
    pub views: u64,
    #[serde(default = "default_published")]
    pub is_published: bool,
    pub created_at: String,
    pub updated_at: String,
}

fn default_published() -> bool {
    true
}
