// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@kernel.org>

//! Data models for the application.

pub mod channel;
pub mod subscription;
pub mod user;
pub mod video;

pub use channel::{ChannelProfile, OwnerSummary, WatchedVideo};
pub use subscription::Subscription;
pub use user::{PasswordHash, PublicUser, User};
pub use video::Video;
