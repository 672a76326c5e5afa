// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Admin route guard.

use crate::middleware::auth::AuthUser;
use crate::AppState;
use axum::{
    extract::{Request, State},
    http::StatusCode,
    middleware::Next,
    response::Response,
};
use std::sync::Arc;

/// Require an authenticated account listed in `ADMIN_EMAILS`.
///
/// Runs inside `require_auth`, which provides the `AuthUser`.
pub async fn require_admin(
    State(state): State<Arc<AppState>>,
    request: Request,
    next: Next,
) -> Result<Response, StatusCode> {
    let account_id = request
        .extensions()
        .get::<AuthUser>()
        .map(|user| user.account_id.clone())
        .ok_or(StatusCode::UNAUTHORIZED)?;

    let account = state
        .db
        .get_account(&account_id)
        .await
        .map_err(|e| {
            tracing::error!(error = %e, "Admin check failed to load account");
            StatusCode::INTERNAL_SERVER_ERROR
        })?;

    let is_admin = account.is_some_and(|a| state.config.admin_emails.contains(&a.email));
    if !is_admin {
        tracing::warn!(account_id = %account_id, "Blocked admin request");
        return Err(StatusCode::FORBIDDEN);
    }

    Ok(next.run(request).await)
}
