//! Subscription edge between two users.

use serde::{Deserialize, Serialize};

/// `subscriber` follows `channel`. Read-only for this service.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Subscription {
    pub id: String,
    pub subscriber: String,
    pub channel: String,
    pub created_at: String,
}
