// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

use async_trait::async_trait;
use axum::{
    body::Body,
    http::{header, Method, Request, Response},
};
use serde_json::Value;
use std::path::Path;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use tempfile::TempDir;
use tower::ServiceExt;
use video_accounts::config::Config;
use video_accounts::db::{FirestoreDb, MemoryDb};
use video_accounts::error::AppError;
use video_accounts::routes::create_router;
use video_accounts::services::{MediaStorage, UploadedMedia};
use video_accounts::AppState;

/// Check if emulator is available via environment variable.
#[allow(dead_code)]
pub fn emulator_available() -> bool {
    std::env::var("FIRESTORE_EMULATOR_HOST").is_ok()
}

/// Skip test with message if emulator not available.
#[macro_export]
macro_rules! require_emulator {
    () => {
        if !crate::common::emulator_available() {
            eprintln!("⚠️  Skipping: FIRESTORE_EMULATOR_HOST not set");
            return;
        }
    };
}

/// Create a test database connection.
#[allow(dead_code)]
pub async fn test_db() -> FirestoreDb {
    FirestoreDb::new("test-project")
        .await
        .expect("Failed to connect to Firestore emulator")
}

// ─── Fake media service ─────────────────────────────────────────

/// Media storage that records calls instead of talking to the network.
#[derive(Default)]
pub struct FakeMedia {
    counter: AtomicUsize,
    pub fail_uploads: AtomicBool,
    pub uploaded: Mutex<Vec<String>>,
    pub deleted: Mutex<Vec<String>>,
}

#[allow(dead_code)]
impl FakeMedia {
    pub fn uploads(&self) -> Vec<String> {
        self.uploaded.lock().unwrap().clone()
    }

    pub fn deletions(&self) -> Vec<String> {
        self.deleted.lock().unwrap().clone()
    }

    pub fn set_failing(&self, failing: bool) {
        self.fail_uploads.store(failing, Ordering::SeqCst);
    }
}

#[async_trait]
impl MediaStorage for FakeMedia {
    async fn upload(&self, path: &Path) -> Result<UploadedMedia, AppError> {
        assert!(path.exists(), "staged file must exist while uploading");
        if self.fail_uploads.load(Ordering::SeqCst) {
            return Err(AppError::Upload("media service unavailable".to_string()));
        }

        let n = self.counter.fetch_add(1, Ordering::SeqCst);
        let public_id = format!("media-{n}");
        let url = format!("https://res.cloudinary.com/test/image/upload/v1/{public_id}.png");
        self.uploaded.lock().unwrap().push(url.clone());

        Ok(UploadedMedia { url, public_id })
    }

    async fn delete(&self, url: &str) -> Result<(), AppError> {
        self.deleted.lock().unwrap().push(url.to_string());
        Ok(())
    }
}

// ─── Test application ───────────────────────────────────────────

#[allow(dead_code)]
pub struct TestApp {
    pub router: axum::Router,
    pub state: Arc<AppState>,
    pub db: MemoryDb,
    pub media: Arc<FakeMedia>,
    pub upload_dir: TempDir,
}

#[allow(dead_code)]
impl TestApp {
    /// Send a request through a clone of the router.
    pub async fn send(&self, request: Request<Body>) -> Response<Body> {
        self.router.clone().oneshot(request).await.unwrap()
    }

    /// Number of files left in the staging directory.
    pub fn staged_files(&self) -> usize {
        std::fs::read_dir(self.upload_dir.path()).unwrap().count()
    }
}

/// Create a test app over an in-memory store and fake media.
#[allow(dead_code)]
pub fn create_test_app() -> TestApp {
    create_test_app_with(|_| {})
}

/// Same as [`create_test_app`], with a config tweak applied first.
#[allow(dead_code)]
pub fn create_test_app_with(tweak: impl FnOnce(&mut Config)) -> TestApp {
    let upload_dir = tempfile::tempdir().unwrap();
    let mut config = Config {
        upload_dir: upload_dir.path().to_path_buf(),
        ..Config::default()
    };
    tweak(&mut config);

    let db = MemoryDb::new();
    let media = Arc::new(FakeMedia::default());
    let state = Arc::new(AppState::new(config, Arc::new(db.clone()), media.clone()));

    TestApp {
        router: create_router(state.clone()),
        state,
        db,
        media,
        upload_dir,
    }
}

// ─── Request helpers ────────────────────────────────────────────

const BOUNDARY: &str = "video-accounts-test-boundary";

/// Builder for `multipart/form-data` bodies.
#[derive(Default)]
pub struct MultipartBody {
    bytes: Vec<u8>,
}

#[allow(dead_code)]
impl MultipartBody {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn text(mut self, name: &str, value: &str) -> Self {
        self.bytes.extend_from_slice(
            format!(
                "--{BOUNDARY}\r\nContent-Disposition: form-data; name=\"{name}\"\r\n\r\n{value}\r\n"
            )
            .as_bytes(),
        );
        self
    }

    pub fn file(mut self, name: &str, file_name: &str, content: &[u8]) -> Self {
        self.bytes.extend_from_slice(
            format!(
                "--{BOUNDARY}\r\nContent-Disposition: form-data; name=\"{name}\"; filename=\"{file_name}\"\r\nContent-Type: image/png\r\n\r\n"
            )
            .as_bytes(),
        );
        self.bytes.extend_from_slice(content);
        self.bytes.extend_from_slice(b"\r\n");
        self
    }

    pub fn request(mut self, method: Method, uri: &str, token: Option<&str>) -> Request<Body> {
        self.bytes
            .extend_from_slice(format!("--{BOUNDARY}--\r\n").as_bytes());

        let mut builder = Request::builder().method(method).uri(uri).header(
            header::CONTENT_TYPE,
            format!("multipart/form-data; boundary={BOUNDARY}"),
        );
        if let Some(token) = token {
            builder = builder.header(header::AUTHORIZATION, format!("Bearer {token}"));
        }
        builder.body(Body::from(self.bytes)).unwrap()
    }
}

/// JSON request, optionally authenticated with a bearer token.
#[allow(dead_code)]
pub fn json_request(method: Method, uri: &str, body: Value, token: Option<&str>) -> Request<Body> {
    let mut builder = Request::builder()
        .method(method)
        .uri(uri)
        .header(header::CONTENT_TYPE, "application/json");
    if let Some(token) = token {
        builder = builder.header(header::AUTHORIZATION, format!("Bearer {token}"));
    }
    builder.body(Body::from(body.to_string())).unwrap()
}

/// Bodiless request, optionally authenticated with a bearer token.
#[allow(dead_code)]
pub fn empty_request(method: Method, uri: &str, token: Option<&str>) -> Request<Body> {
    let mut builder = Request::builder().method(method).uri(uri);
    if let Some(token) = token {
        builder = builder.header(header::AUTHORIZATION, format!("Bearer {token}"));
    }
    builder.body(Body::empty()).unwrap()
}

#[allow(dead_code)]
pub async fn body_json(response: Response<Body>) -> Value {
    let body = axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .unwrap();
    serde_json::from_slice(&body).unwrap()
}

/// All `Set-Cookie` header values.
#[allow(dead_code)]
pub fn set_cookies(response: &Response<Body>) -> Vec<String> {
    response
        .headers()
        .get_all(header::SET_COOKIE)
        .iter()
        .map(|v| v.to_str().unwrap().to_string())
        .collect()
}

// ─── Account helpers ────────────────────────────────────────────

/// Register through the API and return the `data` payload.
#[allow(dead_code)]
pub async fn register(app: &TestApp, user_name: &str, email: &str, password: &str) -> Value {
    let request = MultipartBody::new()
        .text("email", email)
        .text("fullName", "Test User")
        .text("userName", user_name)
        .text("password", password)
        .file("avatar", "avatar.png", b"\x89PNG avatar")
        .request(Method::POST, "/api/v1/users/register", None);

    let response = app.send(request).await;
    assert_eq!(response.status(), 200, "registration of {user_name} failed");
    body_json(response).await["data"].clone()
}

/// Log in by username and return `(access_token, refresh_token)`.
#[allow(dead_code)]
pub async fn login(app: &TestApp, user_name: &str, password: &str) -> (String, String) {
    let response = app
        .send(json_request(
            Method::POST,
            "/api/v1/users/login",
            serde_json::json!({ "userName": user_name, "password": password }),
            None,
        ))
        .await;
    assert_eq!(response.status(), 200, "login of {user_name} failed");

    let data = body_json(response).await["data"].clone();
    (
        data["accessToken"].as_str().unwrap().to_string(),
        data["refreshToken"].as_str().unwrap().to_string(),
    )
}

/// Register and log in, returning `(user_id, access_token, refresh_token)`.
#[allow(dead_code)]
pub async fn signed_in_user(app: &TestApp, user_name: &str) -> (String, String, String) {
    let user = register(app, user_name, &format!("{user_name}@example.com"), "pass-123").await;
    let (access, refresh) = login(app, user_name, "pass-123").await;
    (user["_id"].as_str().unwrap().to_string(), access, refresh)
}
