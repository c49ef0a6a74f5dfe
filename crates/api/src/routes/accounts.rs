//! Signup, login and logout endpoints.

use std::sync::Arc;

use axum::Json;
use axum::extract::State;
use axum::http::StatusCode;
use domain::{Session, Signup, User};
use serde::Deserialize;

use crate::auth::CurrentUser;
use crate::error::ApiError;
use crate::state::{AppState, Backend};

#[derive(Deserialize)]
pub struct LoginRequest {
    pub email: String,
    pub password: String,
}

/// POST /signup: create an account and open its first session.
#[tracing::instrument(skip(state, req))]
pub async fn signup<B: Backend>(
    State(state): State<Arc<AppState<B>>>,
    Json(req): Json<Signup>,
) -> Result<(StatusCode, Json<Session>), ApiError> {
    let session = state.accounts.signup(req).await?;
    state.mailer.send_welcome(&session.user);
    Ok((StatusCode::CREATED, Json(session)))
}

/// POST /login: open a new session.
#[tracing::instrument(skip(state, req))]
pub async fn login<B: Backend>(
    State(state): State<Arc<AppState<B>>>,
    Json(req): Json<LoginRequest>,
) -> Result<Json<Session>, ApiError> {
    let session = state.accounts.login(&req.email, &req.password).await?;
    Ok(Json(session))
}

/// POST /logout: revoke the token used for this request.
#[tracing::instrument(skip(state, caller), fields(user_id = %caller.user.id))]
pub async fn logout<B: Backend>(
    State(state): State<Arc<AppState<B>>>,
    caller: CurrentUser,
) -> Result<Json<User>, ApiError> {
    let user = state.accounts.logout(caller.user.id, &caller.token).await?;
    Ok(Json(user))
}

/// POST /logout-all: revoke every session of the caller.
#[tracing::instrument(skip(state, caller), fields(user_id = %caller.user.id))]
pub async fn logout_all<B: Backend>(
    State(state): State<Arc<AppState<B>>>,
    caller: CurrentUser,
) -> Result<Json<User>, ApiError> {
    let user = state.accounts.logout_all(caller.user.id).await?;
    Ok(Json(user))
}
