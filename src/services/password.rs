// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Password hashing and verification (Argon2id).
//!
//! Both operations are CPU-bound and run on the blocking pool.

use crate::error::AppError;
use crate::models::PasswordHash;
use anyhow::Context;
use argon2::password_hash::{rand_core::OsRng, PasswordHasher, PasswordVerifier, SaltString};
use argon2::Argon2;
use tokio::task;

/// Hash a plaintext password into a [`PasswordHash`].
pub async fn hash_password(plain: &str) -> Result<PasswordHash, AppError> {
    let plain = plain.to_string();

    let phc = task::spawn_blocking(move || {
        let salt = SaltString::generate(&mut OsRng);
        Argon2::default()
            .hash_password(plain.as_bytes(), &salt)
            .map(|hash| hash.to_string())
            .map_err(|e| anyhow::anyhow!("Failed to hash password: {e}"))
    })
    .await
    .context("Password hashing task panicked")??;

    Ok(PasswordHash::from_phc(phc))
}

/// Check a plaintext password against a stored hash.
///
/// A malformed stored hash is an internal error, not a mismatch.
pub async fn verify_password(plain: &str, hash: &PasswordHash) -> Result<bool, AppError> {
    let plain = plain.to_string();
    let phc = hash.as_str().to_string();

    let is_valid = task::spawn_blocking(move || {
        let parsed = argon2::PasswordHash::new(&phc)
            .map_err(|e| anyhow::anyhow!("Invalid password hash format: {e}"))?;
        Ok::<bool, anyhow::Error>(
            Argon2::default()
                .verify_password(plain.as_bytes(), &parsed)
                .is_ok(),
        )
    })
    .await
    .context("Password verification task panicked")??;

    Ok(is_valid)
}
