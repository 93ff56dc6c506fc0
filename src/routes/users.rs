// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! User account routes, mounted under `/api/v1/users`.

use crate::db::MediaSlot;
use crate::error::{AppError, Result};
use crate::middleware::auth::{
    require_auth, AuthUser, ACCESS_TOKEN_COOKIE, REFRESH_TOKEN_COOKIE,
};
use crate::models::{ChannelProfile, PublicUser, WatchedVideo};
use crate::routes::uploads::read_form;
use crate::routes::ApiResponse;
use crate::services::{LoginInput, RegisterInput, TokenPair};
use crate::AppState;
use axum::{
    body::Bytes,
    extract::{DefaultBodyLimit, Multipart, Path, State},
    middleware,
    routing::{get, patch, post},
    Extension, Json, Router,
};
use axum_extra::extract::cookie::{Cookie, CookieJar};
use axum_extra::extract::WithRejection;
use serde::{Deserialize, Serialize};
use std::sync::Arc;

pub fn routes(state: Arc<AppState>) -> Router<Arc<AppState>> {
    let upload_limit = DefaultBodyLimit::max(state.config.max_upload_bytes);

    let public = Router::new()
        .route("/register", post(register).layer(upload_limit))
        .route("/login", post(login))
        .route("/refresh-token", post(refresh_token));

    let protected = Router::new()
        .route("/logout", post(logout))
        .route("/change-password", post(change_password))
        .route("/current-user", get(current_user))
        .route("/update-account", patch(update_account))
        .route("/avatar", patch(update_avatar).layer(upload_limit))
        .route("/cover-image", patch(update_cover_image).layer(upload_limit))
        .route("/c/{user_name}", get(channel_profile))
        .route("/history", get(watch_history))
        .route_layer(middleware::from_fn_with_state(state, require_auth));

    public.merge(protected)
}

// ─── Cookies ─────────────────────────────────────────────────

fn session_cookie(name: &'static str, value: String) -> Cookie<'static> {
    Cookie::build((name, value))
        .http_only(true)
        .secure(true)
        .path("/")
        .build()
}

fn with_session(jar: CookieJar, tokens: &TokenPair) -> CookieJar {
    jar.add(session_cookie(ACCESS_TOKEN_COOKIE, tokens.access_token.clone()))
        .add(session_cookie(REFRESH_TOKEN_COOKIE, tokens.refresh_token.clone()))
}

/// Expired cookies are sent even when the request carried none.
fn removal_cookie(name: &'static str) -> Cookie<'static> {
    let mut cookie = session_cookie(name, String::new());
    cookie.make_removal();
    cookie
}

fn without_session(jar: CookieJar) -> CookieJar {
    jar.add(removal_cookie(ACCESS_TOKEN_COOKIE))
        .add(removal_cookie(REFRESH_TOKEN_COOKIE))
}

// ─── Registration and sessions ───────────────────────────────

/// Register a user from a multipart form with an avatar file.
async fn register(
    State(state): State<Arc<AppState>>,
    WithRejection(multipart, _): WithRejection<Multipart, AppError>,
) -> Result<ApiResponse<PublicUser>> {
    let mut form = read_form(multipart, &state.config.upload_dir).await?;

    let input = RegisterInput {
        email: form.text("email"),
        full_name: form.text("fullName"),
        user_name: form.text("userName"),
        password: form.text("password"),
        avatar: form.file("avatar"),
        cover_image: form.file("coverImage"),
    };

    let user = state.accounts.register(input).await?;
    Ok(ApiResponse::ok(user, "User registered successfully"))
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LoginRequest {
    email: Option<String>,
    user_name: Option<String>,
    password: Option<String>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct LoginResponse {
    pub user: PublicUser,
    pub access_token: String,
    pub refresh_token: String,
}

async fn login(
    State(state): State<Arc<AppState>>,
    jar: CookieJar,
    WithRejection(Json(body), _): WithRejection<Json<LoginRequest>, AppError>,
) -> Result<(CookieJar, ApiResponse<LoginResponse>)> {
    let outcome = state
        .accounts
        .login(LoginInput {
            email: body.email,
            user_name: body.user_name,
            password: body.password,
        })
        .await?;

    let jar = with_session(jar, &outcome.tokens);
    let data = LoginResponse {
        user: outcome.user,
        access_token: outcome.tokens.access_token,
        refresh_token: outcome.tokens.refresh_token,
    };
    Ok((jar, ApiResponse::ok(data, "User logged in successfully")))
}

async fn logout(
    State(state): State<Arc<AppState>>,
    Extension(user): Extension<AuthUser>,
    jar: CookieJar,
) -> Result<(CookieJar, ApiResponse<serde_json::Value>)> {
    state.accounts.logout(&user.id).await?;
    Ok((
        without_session(jar),
        ApiResponse::ok(serde_json::json!({}), "User logged out"),
    ))
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
struct RefreshRequest {
    refresh_token: Option<String>,
}

/// Rotate the token pair. The refresh token comes from the cookie or,
/// failing that, a JSON body.
async fn refresh_token(
    State(state): State<Arc<AppState>>,
    jar: CookieJar,
    body: Bytes,
) -> Result<(CookieJar, ApiResponse<TokenPair>)> {
    let from_body = if body.is_empty() {
        None
    } else {
        serde_json::from_slice::<RefreshRequest>(&body)
            .unwrap_or_default()
            .refresh_token
    };
    let presented = jar
        .get(REFRESH_TOKEN_COOKIE)
        .map(|c| c.value().to_string())
        .filter(|v| !v.is_empty())
        .or(from_body);

    let tokens = state.accounts.refresh(presented.as_deref()).await?;

    let jar = with_session(jar, &tokens);
    Ok((jar, ApiResponse::ok(tokens, "Access token refreshed")))
}

// ─── Profile updates ─────────────────────────────────────────

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ChangePasswordRequest {
    old_password: Option<String>,
    new_password: Option<String>,
}

async fn change_password(
    State(state): State<Arc<AppState>>,
    Extension(user): Extension<AuthUser>,
    WithRejection(Json(body), _): WithRejection<Json<ChangePasswordRequest>, AppError>,
) -> Result<ApiResponse<serde_json::Value>> {
    state
        .accounts
        .change_password(
            &user.id,
            body.old_password.as_deref(),
            body.new_password.as_deref(),
        )
        .await?;
    Ok(ApiResponse::ok(
        serde_json::json!({}),
        "Password changed successfully",
    ))
}

async fn current_user(Extension(user): Extension<AuthUser>) -> ApiResponse<PublicUser> {
    ApiResponse::ok(user.user, "User fetched successfully")
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UpdateAccountRequest {
    full_name: Option<String>,
    email: Option<String>,
}

async fn update_account(
    State(state): State<Arc<AppState>>,
    Extension(user): Extension<AuthUser>,
    WithRejection(Json(body), _): WithRejection<Json<UpdateAccountRequest>, AppError>,
) -> Result<ApiResponse<PublicUser>> {
    let updated = state
        .accounts
        .update_account(&user.id, body.full_name, body.email)
        .await?;
    Ok(ApiResponse::ok(updated, "Account details updated successfully"))
}

async fn update_media(
    state: &AppState,
    user: &AuthUser,
    slot: MediaSlot,
    field: &str,
    multipart: Multipart,
) -> Result<ApiResponse<PublicUser>> {
    let mut form = read_form(multipart, &state.config.upload_dir).await?;
    let updated = state
        .accounts
        .update_media(&user.id, slot, form.file(field))
        .await?;
    Ok(ApiResponse::ok(
        updated,
        format!("{} updated successfully", slot.label()),
    ))
}

async fn update_avatar(
    State(state): State<Arc<AppState>>,
    Extension(user): Extension<AuthUser>,
    WithRejection(multipart, _): WithRejection<Multipart, AppError>,
) -> Result<ApiResponse<PublicUser>> {
    update_media(&state, &user, MediaSlot::Avatar, "avatar", multipart).await
}

async fn update_cover_image(
    State(state): State<Arc<AppState>>,
    Extension(user): Extension<AuthUser>,
    WithRejection(multipart, _): WithRejection<Multipart, AppError>,
) -> Result<ApiResponse<PublicUser>> {
    update_media(&state, &user, MediaSlot::CoverImage, "coverImage", multipart).await
}

// ─── Profile views ───────────────────────────────────────────

async fn channel_profile(
    State(state): State<Arc<AppState>>,
    Extension(user): Extension<AuthUser>,
    WithRejection(Path(user_name), _): WithRejection<Path<String>, AppError>,
) -> Result<ApiResponse<ChannelProfile>> {
    let profile = state.profiles.channel_profile(&user_name, &user.id).await?;
    Ok(ApiResponse::ok(profile, "User channel fetched successfully"))
}

async fn watch_history(
    State(state): State<Arc<AppState>>,
    Extension(user): Extension<AuthUser>,
) -> Result<ApiResponse<Vec<WatchedVideo>>> {
    let history = state.profiles.watch_history(&user.id).await?;
    Ok(ApiResponse::ok(history, "Watch history fetched successfully"))
}
