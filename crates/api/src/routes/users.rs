//! Profile and user administration endpoints.

use std::sync::Arc;

use axum::Json;
use axum::extract::{Path, State};
use domain::{ProfileUpdate, User};
use store::UserId;

use crate::auth::{AdminUser, CurrentUser};
use crate::error::ApiError;
use crate::state::{AppState, Backend};

/// GET /users/me: the caller's profile.
pub async fn me<B: Backend>(
    State(state): State<Arc<AppState<B>>>,
    caller: CurrentUser,
) -> Result<Json<User>, ApiError> {
    Ok(Json(state.accounts.profile(caller.user.id).await?))
}

/// PATCH /users/me: change name and/or password.
#[tracing::instrument(skip(state, caller, update), fields(user_id = %caller.user.id))]
pub async fn update_me<B: Backend>(
    State(state): State<Arc<AppState<B>>>,
    caller: CurrentUser,
    Json(update): Json<ProfileUpdate>,
) -> Result<Json<User>, ApiError> {
    Ok(Json(
        state
            .accounts
            .update_profile(caller.user.id, update)
            .await?,
    ))
}

/// DELETE /users/me: delete the caller's account.
#[tracing::instrument(skip(state, caller), fields(user_id = %caller.user.id))]
pub async fn delete_me<B: Backend>(
    State(state): State<Arc<AppState<B>>>,
    caller: CurrentUser,
) -> Result<Json<User>, ApiError> {
    Ok(Json(state.accounts.delete_account(caller.user.id).await?))
}

/// GET /users: all users (admin).
pub async fn list<B: Backend>(
    State(state): State<Arc<AppState<B>>>,
    _admin: AdminUser,
) -> Result<Json<Vec<User>>, ApiError> {
    Ok(Json(state.accounts.list_users().await?))
}

/// GET /users/{id}: one user (admin).
pub async fn get<B: Backend>(
    State(state): State<Arc<AppState<B>>>,
    _admin: AdminUser,
    Path(id): Path<String>,
) -> Result<Json<User>, ApiError> {
    let user_id = UserId::parse(&id)
        .map_err(|e| ApiError::BadRequest(format!("Invalid user id: {e}")))?;
    Ok(Json(state.accounts.get_user(user_id).await?))
}
