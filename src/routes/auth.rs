// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Email/password authentication routes.

use axum::{
    extract::{rejection::JsonRejection, State},
    http::StatusCode,
    routing::post,
    Json, Router,
};
use axum_extra::extract::cookie::{Cookie, CookieJar, SameSite};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use validator::Validate;
#[cfg(feature = "binding-generation")]
use ts_rs::TS;

use crate::error::{AppError, Result};
use crate::middleware::auth::{create_jwt, TOKEN_COOKIE};
use crate::models::user::normalize_email;
use crate::models::Account;
use crate::services::password;
use crate::AppState;

pub fn routes() -> Router<Arc<AppState>> {
    Router::new()
        .route("/api/auth/register", post(register))
        .route("/api/auth/login", post(login))
        .route("/api/auth/logout", post(logout))
}

#[derive(Debug, Deserialize, Validate)]
pub struct RegisterRequest {
    #[validate(length(min = 1, max = 100, message = "name must be 1-100 characters"))]
    pub name: String,
    #[validate(email(message = "email is not valid"))]
    pub email: String,
    #[validate(length(min = 6, max = 128, message = "password must be 6-128 characters"))]
    pub password: String,
}

#[derive(Debug, Deserialize)]
pub struct LoginRequest {
    pub email: String,
    pub password: String,
}

#[derive(Serialize)]
#[cfg_attr(feature = "binding-generation", derive(TS))]
#[cfg_attr(
    feature = "binding-generation",
    ts(export, export_to = "web/src/lib/generated/")
)]
pub struct MessageResponse {
    pub message: String,
}

#[derive(Serialize)]
#[cfg_attr(feature = "binding-generation", derive(TS))]
#[cfg_attr(
    feature = "binding-generation",
    ts(export, export_to = "web/src/lib/generated/")
)]
pub struct LoginResponse {
    pub token: String,
    pub user: AccountSummary,
}

#[derive(Serialize)]
#[cfg_attr(feature = "binding-generation", derive(TS))]
#[cfg_attr(
    feature = "binding-generation",
    ts(export, export_to = "web/src/lib/generated/")
)]
pub struct AccountSummary {
    pub id: String,
    pub name: String,
    pub email: String,
}

impl From<&Account> for AccountSummary {
    fn from(account: &Account) -> Self {
        Self {
            id: account.account_id.clone(),
            name: account.name.clone(),
            email: account.email.clone(),
        }
    }
}

/// Unwrap a JSON body, reporting malformed input as a 400.
pub(crate) fn json_body<T>(body: std::result::Result<Json<T>, JsonRejection>) -> Result<T> {
    body.map(|Json(value)| value)
        .map_err(|e| AppError::BadRequest(e.body_text()))
}

/// Register a new account.
async fn register(
    State(state): State<Arc<AppState>>,
    body: std::result::Result<Json<RegisterRequest>, JsonRejection>,
) -> Result<(StatusCode, Json<MessageResponse>)> {
    let request = json_body(body)?;
    request
        .validate()
        .map_err(|e| AppError::BadRequest(e.to_string()))?;

    let email = normalize_email(&request.email);

    // Cheap pre-check; the create below is what enforces uniqueness.
    if state.db.get_account_by_email(&email).await?.is_some() {
        tracing::info!(email = %email, "Registration for existing email");
        return Err(AppError::UserExists);
    }

    let password_hash = password::hash_password_blocking(request.password).await?;
    let account = Account::new(&request.name, &email, password_hash, chrono::Utc::now());
    state.db.insert_account(&account).await?;

    tracing::info!(account_id = %account.account_id, "Account registered");

    Ok((
        StatusCode::CREATED,
        Json(MessageResponse {
            message: "User registered successfully".to_string(),
        }),
    ))
}

/// Log in with email and password; returns a bearer token and sets the
/// session cookie.
async fn login(
    State(state): State<Arc<AppState>>,
    jar: CookieJar,
    body: std::result::Result<Json<LoginRequest>, JsonRejection>,
) -> Result<(CookieJar, Json<LoginResponse>)> {
    let request = json_body(body)?;

    let account = state
        .db
        .get_account_by_email(&request.email)
        .await?
        .ok_or_else(|| AppError::NotFound("User not found".to_string()))?;

    let matches =
        password::verify_password_blocking(request.password, account.password_hash.clone())
            .await?;
    if !matches {
        tracing::info!(account_id = %account.account_id, "Login with wrong password");
        return Err(AppError::InvalidCredentials);
    }

    let token = create_jwt(
        &account.account_id,
        &state.config.jwt_signing_key,
        state.config.jwt_ttl_hours,
    )
    .map_err(|e| AppError::Internal(anyhow::anyhow!("JWT creation failed: {}", e)))?;

    tracing::info!(account_id = %account.account_id, "Login successful");

    let cookie = Cookie::build((TOKEN_COOKIE, token.clone()))
        .path("/")
        .http_only(true)
        .secure(!state.config.frontend_url.starts_with("http://localhost"))
        .same_site(SameSite::Lax)
        .max_age(time::Duration::hours(state.config.jwt_ttl_hours as i64))
        .build();

    Ok((
        jar.add(cookie),
        Json(LoginResponse {
            token,
            user: AccountSummary::from(&account),
        }),
    ))
}

/// Clear the session cookie. Bearer tokens are dropped client-side.
async fn logout(jar: CookieJar) -> (CookieJar, StatusCode) {
    (
        jar.remove(Cookie::build(TOKEN_COOKIE).path("/")),
        StatusCode::NO_CONTENT,
    )
}
