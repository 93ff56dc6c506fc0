// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! External media storage (avatars and cover images).
//!
//! Handles:
//! - Forwarding a staged local file to the media service
//! - Best-effort deletion of replaced remote objects
//! - Removal of the staged local file after every attempt

use crate::error::AppError;
use async_trait::async_trait;
use serde::Deserialize;
use sha2::{Digest, Sha256};
use std::path::{Path, PathBuf};

/// A stored remote object.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UploadedMedia {
    /// Public URL persisted on the user record
    pub url: String,
    pub public_id: String,
}

/// Remote object storage consumed by the account flows.
#[async_trait]
pub trait MediaStorage: Send + Sync {
    /// Upload a local file and return its public location.
    async fn upload(&self, path: &Path) -> Result<UploadedMedia, AppError>;

    /// Delete a previously uploaded object by its public URL.
    async fn delete(&self, url: &str) -> Result<(), AppError>;
}

// ─────────────────────────────────────────────────────────────────────────────
// Staged uploads
// ─────────────────────────────────────────────────────────────────────────────

/// A multipart file written to the upload directory.
///
/// The file is removed when this value is dropped.
#[derive(Debug)]
pub struct TempUpload {
    path: PathBuf,
}

impl TempUpload {
    pub fn new(path: PathBuf) -> Self {
        Self { path }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

impl Drop for TempUpload {
    fn drop(&mut self) {
        match std::fs::remove_file(&self.path) {
            Ok(()) => tracing::debug!(path = %self.path.display(), "Removed staged upload"),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {}
            Err(e) => tracing::warn!(
                path = %self.path.display(),
                error = %e,
                "Failed to remove staged upload"
            ),
        }
    }
}

/// Upload a staged file. The local file is gone when this returns.
pub async fn upload_staged(
    storage: &dyn MediaStorage,
    staged: TempUpload,
) -> Result<UploadedMedia, AppError> {
    let result = storage.upload(staged.path()).await;
    drop(staged);
    result
}

/// Delete a remote object, logging instead of failing.
pub async fn delete_quietly(storage: &dyn MediaStorage, url: &str) {
    if url.is_empty() {
        return;
    }
    match storage.delete(url).await {
        Ok(()) => tracing::info!(url, "Deleted replaced media"),
        Err(e) => tracing::warn!(url, error = %e, "Failed to delete replaced media"),
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Cloudinary
// ─────────────────────────────────────────────────────────────────────────────

/// Cloudinary upload API client.
#[derive(Clone)]
pub struct CloudinaryClient {
    http: reqwest::Client,
    base_url: String,
    cloud_name: String,
    api_key: String,
    api_secret: String,
}

#[derive(Debug, Deserialize)]
struct UploadResponse {
    secure_url: Option<String>,
    url: String,
    public_id: String,
}

#[derive(Debug, Deserialize)]
struct DestroyResponse {
    result: String,
}

impl CloudinaryClient {
    pub fn new(cloud_name: String, api_key: String, api_secret: String) -> Self {
        Self {
            http: reqwest::Client::new(),
            base_url: "https://api.cloudinary.com/v1_1".to_string(),
            cloud_name,
            api_key,
            api_secret,
        }
    }

    /// SHA-256 request signature over the sorted parameters.
    fn sign(&self, params: &[(&str, &str)]) -> String {
        sign_params(params, &self.api_secret)
    }

    async fn check_response(response: reqwest::Response) -> Result<reqwest::Response, AppError> {
        if response.status().is_success() {
            return Ok(response);
        }

        let status = response.status();
        let body = response.text().await.unwrap_or_default();
        Err(AppError::Upload(format!("Media service HTTP {}: {}", status, body)))
    }
}

#[async_trait]
impl MediaStorage for CloudinaryClient {
    async fn upload(&self, path: &Path) -> Result<UploadedMedia, AppError> {
        let bytes = tokio::fs::read(path)
            .await
            .map_err(|e| AppError::Upload(format!("Failed to read staged file: {}", e)))?;
        let file_name = path
            .file_name()
            .and_then(|name| name.to_str())
            .unwrap_or("upload")
            .to_string();

        let timestamp = chrono::Utc::now().timestamp().to_string();
        let signature = self.sign(&[("timestamp", timestamp.as_str())]);

        let form = reqwest::multipart::Form::new()
            .text("api_key", self.api_key.clone())
            .text("timestamp", timestamp)
            .text("signature", signature)
            .text("signature_algorithm", "sha256")
            .part(
                "file",
                reqwest::multipart::Part::bytes(bytes).file_name(file_name),
            );

        let url = format!("{}/{}/auto/upload", self.base_url, self.cloud_name);
        let response = self
            .http
            .post(&url)
            .multipart(form)
            .send()
            .await
            .map_err(|e| AppError::Upload(format!("Upload request failed: {}", e)))?;

        let uploaded: UploadResponse = Self::check_response(response)
            .await?
            .json()
            .await
            .map_err(|e| AppError::Upload(format!("JSON parse error: {}", e)))?;

        tracing::info!(public_id = %uploaded.public_id, "Uploaded media");

        Ok(UploadedMedia {
            url: uploaded.secure_url.unwrap_or(uploaded.url),
            public_id: uploaded.public_id,
        })
    }

    async fn delete(&self, url: &str) -> Result<(), AppError> {
        let (resource_type, public_id) = public_id_from_url(url)
            .ok_or_else(|| AppError::Upload(format!("Not a media service URL: {}", url)))?;

        let timestamp = chrono::Utc::now().timestamp().to_string();
        let signature = self.sign(&[
            ("public_id", public_id.as_str()),
            ("timestamp", timestamp.as_str()),
        ]);

        let endpoint = format!(
            "{}/{}/{}/destroy",
            self.base_url, self.cloud_name, resource_type
        );
        let response = self
            .http
            .post(&endpoint)
            .form(&[
                ("public_id", public_id.as_str()),
                ("timestamp", timestamp.as_str()),
                ("api_key", self.api_key.as_str()),
                ("signature", signature.as_str()),
                ("signature_algorithm", "sha256"),
            ])
            .send()
            .await
            .map_err(|e| AppError::Upload(format!("Destroy request failed: {}", e)))?;

        let destroyed: DestroyResponse = Self::check_response(response)
            .await?
            .json()
            .await
            .map_err(|e| AppError::Upload(format!("JSON parse error: {}", e)))?;

        if destroyed.result != "ok" {
            return Err(AppError::Upload(format!(
                "Media service refused deletion: {}",
                destroyed.result
            )));
        }
        Ok(())
    }
}

/// `key=value` pairs sorted by key, joined by `&`, followed by the secret.
fn sign_params(params: &[(&str, &str)], secret: &str) -> String {
    let mut sorted = params.to_vec();
    sorted.sort_by(|a, b| a.0.cmp(b.0));

    let payload = sorted
        .iter()
        .map(|(key, value)| format!("{}={}", key, value))
        .collect::<Vec<_>>()
        .join("&");

    let mut hasher = Sha256::new();
    hasher.update(payload.as_bytes());
    hasher.update(secret.as_bytes());
    hex::encode(hasher.finalize())
}

/// Split a delivery URL into `(resource_type, public_id)`.
///
/// `https://res.cloudinary.com/<cloud>/image/upload/v123/folder/name.png`
/// yields `("image", "folder/name")`.
pub fn public_id_from_url(url: &str) -> Option<(String, String)> {
    let (prefix, rest) = url.split_once("/upload/")?;
    let resource_type = prefix.rsplit('/').next().filter(|t| !t.is_empty())?;
    let rest = rest.split(|c: char| c == '?' || c == '#').next()?;

    let mut segments: Vec<&str> = rest.split('/').filter(|s| !s.is_empty()).collect();
    let is_version = |s: &str| {
        s.len() > 1 && s.starts_with('v') && s[1..].chars().all(|c| c.is_ascii_digit())
    };
    if segments.len() > 1 && is_version(segments[0]) {
        segments.remove(0);
    }

    let last = segments.pop()?;
    let stem = match last.rsplit_once('.') {
        Some((stem, _)) if resource_type != "raw" && !stem.is_empty() => stem,
        _ => last,
    };
    segments.push(stem);

    Some((resource_type.to_string(), segments.join("/")))
}
