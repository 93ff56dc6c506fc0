// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Multipart form handling.
//!
//! File parts are streamed into the upload directory and handed to the
//! services as [`TempUpload`]s; text parts are collected by name.

use crate::error::{AppError, Result};
use crate::services::TempUpload;
use axum::extract::multipart::{Field, Multipart, MultipartError};
use std::collections::HashMap;
use std::path::Path;
use tokio::io::AsyncWriteExt;

/// A parsed multipart body.
#[derive(Debug, Default)]
pub struct UploadForm {
    fields: HashMap<String, String>,
    files: HashMap<String, TempUpload>,
}

impl UploadForm {
    pub fn text(&mut self, name: &str) -> Option<String> {
        self.fields.remove(name)
    }

    pub fn file(&mut self, name: &str) -> Option<TempUpload> {
        self.files.remove(name)
    }
}

fn multipart_error(e: MultipartError) -> AppError {
    tracing::debug!(error = %e, status = %e.status(), "Rejected multipart body");
    AppError::validation(format!("Invalid multipart body: {}", e.body_text()))
}

/// Keep only characters that are safe in a file name.
fn sanitize_file_name(name: &str) -> String {
    let cleaned: String = name
        .rsplit(|c: char| c == '/' || c == '\\')
        .next()
        .unwrap_or_default()
        .chars()
        .filter(|c| c.is_ascii_alphanumeric() || matches!(c, '.' | '-' | '_'))
        .take(64)
        .collect();

    if cleaned.trim_matches('.').is_empty() {
        "upload".to_string()
    } else {
        cleaned
    }
}

/// Stream one file part to disk. Returns `None` for an empty part.
async fn stage_file(mut field: Field<'_>, upload_dir: &Path) -> Result<Option<TempUpload>> {
    let file_name = sanitize_file_name(field.file_name().unwrap_or_default());
    let path = upload_dir.join(format!("{}-{}", uuid::Uuid::new_v4(), file_name));

    let mut file = tokio::fs::File::create(&path).await.map_err(|e| {
        AppError::Internal(anyhow::anyhow!(
            "Failed to create {}: {}",
            path.display(),
            e
        ))
    })?;
    // From here on the file is removed on every exit path.
    let staged = TempUpload::new(path);

    let mut written = 0usize;
    while let Some(chunk) = field.chunk().await.map_err(multipart_error)? {
        file.write_all(&chunk)
            .await
            .map_err(|e| AppError::Internal(anyhow::anyhow!("Failed to stage upload: {}", e)))?;
        written += chunk.len();
    }
    file.flush()
        .await
        .map_err(|e| AppError::Internal(anyhow::anyhow!("Failed to stage upload: {}", e)))?;

    if written == 0 {
        return Ok(None);
    }

    tracing::debug!(path = %staged.path().display(), bytes = written, "Staged upload");
    Ok(Some(staged))
}

/// Read the whole multipart body, staging every non-empty file part.
///
/// Repeated names keep the first occurrence.
pub async fn read_form(mut multipart: Multipart, upload_dir: &Path) -> Result<UploadForm> {
    let mut form = UploadForm::default();

    while let Some(field) = multipart.next_field().await.map_err(multipart_error)? {
        let Some(name) = field.name().map(str::to_string) else {
            continue;
        };

        if field.file_name().is_some() {
            if form.files.contains_key(&name) {
                continue;
            }
            if let Some(staged) = stage_file(field, upload_dir).await? {
                form.files.insert(name, staged);
            }
        } else {
            let value = field.text().await.map_err(multipart_error)?;
            form.fields.entry(name).or_insert(value);
        }
    }

    Ok(form)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_sanitize_file_name() {
        assert_eq!(sanitize_file_name("avatar.png"), "avatar.png");
        assert_eq!(sanitize_file_name("../../etc/passwd"), "passwd");
        assert_eq!(sanitize_file_name("C:\\Users\\me\\pic 1.jpg"), "pic1.jpg");
        assert_eq!(sanitize_file_name(".."), "upload");
        assert_eq!(sanitize_file_name(""), "upload");
    }
}
