use axum::extract::{Path, State};
use axum::Json;
use serde::Deserialize;
use std::sync::Arc;
use uuid::Uuid;

use motora_shared::errors::{AppError, AppResult};
use motora_shared::middleware::AdminUser;
use motora_shared::types::api::ApiResponse;

use crate::models::Listing;
use crate::services::featured_service;
use crate::services::featured_service::SetFeatured;
use crate::AppState;

// --- Request DTOs ---

#[derive(Debug, Deserialize)]
pub struct FeatureListingRequest {
    pub featured: bool,
    pub days: Option<i64>,
    pub featured_order: Option<i32>,
}

#[derive(Debug, Deserialize)]
pub struct ReorderRequest {
    pub order: i32,
}

// --- Handlers ---

/// GET /listings/featured - public read path for the featured rail.
pub async fn featured_listings(
    State(state): State<Arc<AppState>>,
) -> AppResult<Json<ApiResponse<Vec<Listing>>>> {
    let mut conn = state.db.get().map_err(|e| AppError::Internal(e.into()))?;
    let items = featured_service::featured_listings(&mut conn)?;
    Ok(Json(ApiResponse::ok(items)))
}

/// GET /admin/featured-listings - curation console view, expired rows
/// included.
pub async fn admin_featured_listings(
    AdminUser(_admin): AdminUser,
    State(state): State<Arc<AppState>>,
) -> AppResult<Json<ApiResponse<Vec<Listing>>>> {
    let mut conn = state.db.get().map_err(|e| AppError::Internal(e.into()))?;
    let items = featured_service::admin_featured_listings(&mut conn)?;
    Ok(Json(ApiResponse::ok(items)))
}

/// POST /admin/listings/:id/feature - turn featuring on or off. Rejections
/// name the cap (dealer plan vs global ceiling) that was hit.
pub async fn feature_listing(
    AdminUser(admin): AdminUser,
    State(state): State<Arc<AppState>>,
    Path(listing_id): Path<Uuid>,
    Json(req): Json<FeatureListingRequest>,
) -> AppResult<Json<ApiResponse<Listing>>> {
    let mut conn = state.db.get().map_err(|e| AppError::Internal(e.into()))?;
    let listing = featured_service::set_featured(
        &mut conn,
        SetFeatured {
            listing_id,
            featured: req.featured,
            days: req.days,
            explicit_order: req.featured_order,
        },
        admin.id,
    )?;
    Ok(Json(ApiResponse::ok(listing)))
}

/// PUT /admin/listings/:id/featured-order - splice the listing into the new
/// slot and renumber the set densely.
pub async fn reorder_listing(
    AdminUser(admin): AdminUser,
    State(state): State<Arc<AppState>>,
    Path(listing_id): Path<Uuid>,
    Json(req): Json<ReorderRequest>,
) -> AppResult<Json<ApiResponse<Vec<Listing>>>> {
    let mut conn = state.db.get().map_err(|e| AppError::Internal(e.into()))?;
    let changed = featured_service::reorder(&mut conn, listing_id, req.order, admin.id)?;
    Ok(Json(ApiResponse::ok(changed)))
}
