//! Order placement and history endpoints.

use std::sync::Arc;

use axum::Json;
use axum::extract::State;
use axum::http::StatusCode;
use fulfillment::{EnrichedOrder, LineItemRequest};
use serde::Deserialize;

use crate::auth::CurrentUser;
use crate::error::ApiError;
use crate::state::{AppState, Backend};

#[derive(Debug, Deserialize)]
pub struct PlaceOrderRequest {
    pub items: Vec<LineItemRequest>,
}

/// POST /orders: place an order for the caller.
///
/// Stock is committed on a task of its own, so a client that disconnects
/// mid-request cannot leave the order half done.
#[tracing::instrument(skip(state, caller, req), fields(user_id = %caller.user.id))]
pub async fn place<B: Backend>(
    State(state): State<Arc<AppState<B>>>,
    caller: CurrentUser,
    Json(req): Json<PlaceOrderRequest>,
) -> Result<(StatusCode, Json<EnrichedOrder>), ApiError> {
    let order = state
        .fulfillment
        .place_order(caller.user.id, req.items)
        .await?;
    Ok((StatusCode::CREATED, Json(order)))
}

/// GET /orders: the caller's order history, oldest first.
pub async fn list<B: Backend>(
    State(state): State<Arc<AppState<B>>>,
    caller: CurrentUser,
) -> Result<Json<Vec<EnrichedOrder>>, ApiError> {
    Ok(Json(state.fulfillment.list_orders(caller.user.id).await?))
}
