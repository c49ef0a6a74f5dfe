//! Catalog endpoints.

use std::sync::Arc;

use axum::Json;
use axum::extract::{Path, Query, State};
use axum::http::StatusCode;
use domain::product::{NewProduct, Product, ProductPatch};
use serde::Deserialize;
use store::{PageRequest, ProductId};

use crate::auth::{AdminUser, CurrentUser};
use crate::error::ApiError;
use crate::state::{AppState, Backend};

#[derive(Debug, Deserialize)]
pub struct PageQuery {
    pub page: Option<u32>,
    pub limit: Option<u32>,
}

#[derive(Debug, Deserialize)]
pub struct RestockRequest {
    pub amount: u32,
}

/// GET /products: one page of the catalog.
pub async fn list<B: Backend>(
    State(state): State<Arc<AppState<B>>>,
    _caller: CurrentUser,
    Query(query): Query<PageQuery>,
) -> Result<Json<Vec<Product>>, ApiError> {
    let page = PageRequest::from_query(query.page, query.limit);
    Ok(Json(state.products.list(page).await?))
}

/// GET /products/{id}
pub async fn get<B: Backend>(
    State(state): State<Arc<AppState<B>>>,
    _caller: CurrentUser,
    Path(id): Path<String>,
) -> Result<Json<Product>, ApiError> {
    let product_id = parse_product_id(&id)?;
    Ok(Json(state.products.get(product_id).await?))
}

/// POST /products: add a product (admin).
#[tracing::instrument(skip(state, admin, product), fields(admin_id = %admin.0.id))]
pub async fn create<B: Backend>(
    State(state): State<Arc<AppState<B>>>,
    admin: AdminUser,
    Json(product): Json<NewProduct>,
) -> Result<(StatusCode, Json<Product>), ApiError> {
    let product = state.products.create(product).await?;
    Ok((StatusCode::CREATED, Json(product)))
}

/// PATCH /products/{id}: change display fields (admin).
#[tracing::instrument(skip(state, _admin, patch))]
pub async fn update<B: Backend>(
    State(state): State<Arc<AppState<B>>>,
    _admin: AdminUser,
    Path(id): Path<String>,
    Json(patch): Json<ProductPatch>,
) -> Result<Json<Product>, ApiError> {
    let product_id = parse_product_id(&id)?;
    Ok(Json(state.products.update(product_id, patch).await?))
}

/// DELETE /products/{id} (admin)
#[tracing::instrument(skip(state, _admin))]
pub async fn delete<B: Backend>(
    State(state): State<Arc<AppState<B>>>,
    _admin: AdminUser,
    Path(id): Path<String>,
) -> Result<Json<Product>, ApiError> {
    let product_id = parse_product_id(&id)?;
    Ok(Json(state.products.delete(product_id).await?))
}

/// POST /products/{id}/restock: add stock (admin).
#[tracing::instrument(skip(state, _admin, req))]
pub async fn restock<B: Backend>(
    State(state): State<Arc<AppState<B>>>,
    _admin: AdminUser,
    Path(id): Path<String>,
    Json(req): Json<RestockRequest>,
) -> Result<Json<Product>, ApiError> {
    let product_id = parse_product_id(&id)?;
    Ok(Json(state.products.restock(product_id, req.amount).await?))
}

fn parse_product_id(id: &str) -> Result<ProductId, ApiError> {
    ProductId::parse(id).map_err(|e| ApiError::BadRequest(format!("Invalid product id: {e}")))
}
