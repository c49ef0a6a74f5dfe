//! Bearer-token authentication extractors.

use std::sync::Arc;

use axum::extract::FromRequestParts;
use axum::http::header::AUTHORIZATION;
use axum::http::request::Parts;
use domain::{DomainError, Role, User};

use crate::error::ApiError;
use crate::state::{AppState, Backend};

/// The caller, resolved from `Authorization: Bearer <token>`.
#[derive(Debug, Clone)]
pub struct CurrentUser {
    pub user: User,
    pub token: String,
}

impl<B: Backend> FromRequestParts<Arc<AppState<B>>> for CurrentUser {
    type Rejection = ApiError;

    async fn from_request_parts(
        parts: &mut Parts,
        state: &Arc<AppState<B>>,
    ) -> Result<Self, Self::Rejection> {
        let Some(token) = bearer_token(parts) else {
            metrics::counter!("auth_rejections_total", "reason" => "missing_token").increment(1);
            return Err(DomainError::Unauthenticated.into());
        };
        let user = state.accounts.authenticate(&token).await.inspect_err(|_| {
            metrics::counter!("auth_rejections_total", "reason" => "invalid_token").increment(1);
        })?;
        Ok(CurrentUser { user, token })
    }
}

/// A caller holding the admin role.
#[derive(Debug, Clone)]
pub struct AdminUser(pub User);

impl<B: Backend> FromRequestParts<Arc<AppState<B>>> for AdminUser {
    type Rejection = ApiError;

    async fn from_request_parts(
        parts: &mut Parts,
        state: &Arc<AppState<B>>,
    ) -> Result<Self, Self::Rejection> {
        let CurrentUser { user, .. } = CurrentUser::from_request_parts(parts, state).await?;
        user.require_role(Role::Admin)?;
        Ok(AdminUser(user))
    }
}

fn bearer_token(parts: &Parts) -> Option<String> {
    let value = parts.headers.get(AUTHORIZATION)?.to_str().ok()?;
    let (scheme, token) = value.split_once(' ')?;
    let token = token.trim();
    (scheme.eq_ignore_ascii_case("bearer") && !token.is_empty()).then(|| token.to_string())
}
