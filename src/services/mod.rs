// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Services module - business logic layer.

pub mod account;
pub mod media;
pub mod password;
pub mod profile;
pub mod tokens;

pub use account::{AccountService, LoginInput, LoginOutcome, RegisterInput};
pub use media::{CloudinaryClient, MediaStorage, TempUpload, UploadedMedia};
pub use profile::ProfileService;
pub use tokens::{AccessClaims, RefreshClaims, TokenIssuer, TokenPair};
