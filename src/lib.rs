// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@kernel.org>

//! Video-Accounts: user accounts for a video-sharing application
//!
//! This crate provides the backend API for registration, token-based
//! sessions, profile media and the channel/watch-history views.

pub mod config;
pub mod db;
pub mod error;
pub mod middleware;
pub mod models;
pub mod routes;
pub mod services;
pub mod time_utils;

use config::Config;
use db::Store;
use services::{AccountService, MediaStorage, ProfileService, TokenIssuer};
use std::sync::Arc;

/// Shared application state.
pub struct AppState {
    pub config: Config,
    pub db: Arc<dyn Store>,
    pub tokens: TokenIssuer,
    pub accounts: AccountService,
    pub profiles: ProfileService,
}

impl AppState {
    /// Wire the services over a store and a media backend.
    pub fn new(config: Config, db: Arc<dyn Store>, media: Arc<dyn MediaStorage>) -> Self {
        let tokens = TokenIssuer::from_config(&config);
        let accounts = AccountService::new(db.clone(), tokens.clone(), media);
        let profiles = ProfileService::new(db.clone(), config.history_order);

        Self {
            config,
            db,
            tokens,
            accounts,
            profiles,
        }
    }
}
