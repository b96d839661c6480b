use axum::extract::{Path, Query, State};
use axum::Json;
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use uuid::Uuid;
use validator::Validate;

use motora_shared::errors::{AppError, AppResult};
use motora_shared::middleware::{DealerUser, OptionalAuthUser};
use motora_shared::types::api::ApiResponse;
use motora_shared::types::auth::AuthUser;

use crate::enums::InquiryStatus;
use crate::models::Inquiry;
use crate::services::{dealer_service, inquiry_service};
use crate::services::inquiry_service::{
    InquiryFilter, InquiryWithListing, SubmitInquiry, ThreadSide,
};
use crate::AppState;

// --- Request DTOs ---

#[derive(Debug, Deserialize, Validate)]
pub struct SubmitInquiryRequest {
    pub listing_id: Uuid,
    pub dealer_id: Option<Uuid>,
    #[validate(length(min = 1, max = 200))]
    pub name: String,
    #[validate(email)]
    pub email: String,
    pub phone: Option<String>,
    #[validate(length(min = 1))]
    pub message: String,
}

#[derive(Debug, Deserialize)]
pub struct UpdateInquiryStatusRequest {
    pub status: InquiryStatus,
    pub reply: Option<String>,
}

#[derive(Debug, Deserialize, Validate)]
pub struct FollowupMessageRequest {
    #[validate(length(min = 1))]
    pub message: String,
}

#[derive(Debug, Deserialize, Default)]
pub struct InquiryListParams {
    #[serde(default)]
    pub filter: InquiryFilter,
}

// --- Response DTOs ---

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct InquirySubmittedResponse {
    pub success: bool,
    pub message: String,
    pub inquiry_id: Uuid,
    pub listing_id: Uuid,
    pub inquiry: InquiryWithListing,
}

// --- Handlers ---

/// POST /listings/inquiry - buyer (guest or registered) contacts a dealer
/// about a listing. Repeated messages for the same thread tuple merge into
/// one conversation row.
pub async fn submit_inquiry(
    OptionalAuthUser(auth_user): OptionalAuthUser,
    State(state): State<Arc<AppState>>,
    Json(req): Json<SubmitInquiryRequest>,
) -> AppResult<Json<InquirySubmittedResponse>> {
    req.validate().map_err(|e| AppError::Validation(e.to_string()))?;

    let mut conn = state.db.get().map_err(|e| AppError::Internal(e.into()))?;

    let inquiry = inquiry_service::submit_message(&mut conn, &state.io, SubmitInquiry {
        listing_id: req.listing_id,
        dealer_id: req.dealer_id,
        user_id: auth_user.map(|u| u.id),
        name: req.name,
        email: req.email,
        phone: req.phone,
        message: req.message,
    })?;

    Ok(Json(InquirySubmittedResponse {
        success: true,
        message: "inquiry sent".to_string(),
        inquiry_id: inquiry.inquiry.id,
        listing_id: inquiry.inquiry.listing_id,
        inquiry,
    }))
}

/// GET /users/me/inquiries - buyer's threads, excluding buyer-archived ones
/// unless the archived filter is requested.
pub async fn list_user_inquiries(
    auth_user: AuthUser,
    State(state): State<Arc<AppState>>,
    Query(params): Query<InquiryListParams>,
) -> AppResult<Json<ApiResponse<Vec<Inquiry>>>> {
    let mut conn = state.db.get().map_err(|e| AppError::Internal(e.into()))?;
    let items = inquiry_service::list_for_user(&mut conn, auth_user.id, params.filter)?;
    Ok(Json(ApiResponse::ok(items)))
}

/// POST /users/me/inquiries/:id/message - buyer follow-up on an existing
/// thread.
pub async fn user_followup(
    auth_user: AuthUser,
    State(state): State<Arc<AppState>>,
    Path(inquiry_id): Path<Uuid>,
    Json(req): Json<FollowupMessageRequest>,
) -> AppResult<Json<ApiResponse<InquiryWithListing>>> {
    req.validate().map_err(|e| AppError::Validation(e.to_string()))?;

    let mut conn = state.db.get().map_err(|e| AppError::Internal(e.into()))?;
    let inquiry = inquiry_service::buyer_followup(
        &mut conn,
        &state.io,
        inquiry_id,
        auth_user.id,
        req.message,
    )?;
    Ok(Json(ApiResponse::ok(inquiry)))
}

/// PUT /users/me/inquiries/:id/archive - buyer-side soft delete only.
pub async fn user_archive(
    auth_user: AuthUser,
    State(state): State<Arc<AppState>>,
    Path(inquiry_id): Path<Uuid>,
) -> AppResult<Json<ApiResponse<Inquiry>>> {
    let mut conn = state.db.get().map_err(|e| AppError::Internal(e.into()))?;
    let inquiry = inquiry_service::archive(&mut conn, inquiry_id, ThreadSide::Buyer, auth_user.id)?;
    Ok(Json(ApiResponse::ok(inquiry)))
}

/// PUT /users/me/inquiries/:id/read - idempotent buyer-side read receipt.
pub async fn user_mark_read(
    auth_user: AuthUser,
    State(state): State<Arc<AppState>>,
    Path(inquiry_id): Path<Uuid>,
) -> AppResult<Json<ApiResponse<Inquiry>>> {
    let mut conn = state.db.get().map_err(|e| AppError::Internal(e.into()))?;
    let inquiry = inquiry_service::mark_read(
        &mut conn,
        &state.io,
        inquiry_id,
        ThreadSide::Buyer,
        auth_user.id,
    )?;
    Ok(Json(ApiResponse::ok(inquiry)))
}

/// GET /dealers/me/inquiries - dealer's threads, dealer-side archive flags.
pub async fn list_dealer_inquiries(
    DealerUser(auth_user): DealerUser,
    State(state): State<Arc<AppState>>,
    Query(params): Query<InquiryListParams>,
) -> AppResult<Json<ApiResponse<Vec<Inquiry>>>> {
    let mut conn = state.db.get().map_err(|e| AppError::Internal(e.into()))?;
    let dealer = dealer_service::dealer_for_user(&mut conn, auth_user.id)?;
    let items = inquiry_service::list_for_dealer(&mut conn, dealer.id, params.filter)?;
    Ok(Json(ApiResponse::ok(items)))
}

/// PUT /dealers/me/inquiries/:id/status - dealer reply/status update.
/// ARCHIVED only flips the dealer-side flag; any other status marks the
/// thread read and optionally appends a reply.
pub async fn dealer_update_status(
    DealerUser(auth_user): DealerUser,
    State(state): State<Arc<AppState>>,
    Path(inquiry_id): Path<Uuid>,
    Json(req): Json<UpdateInquiryStatusRequest>,
) -> AppResult<Json<ApiResponse<Inquiry>>> {
    let mut conn = state.db.get().map_err(|e| AppError::Internal(e.into()))?;
    let dealer = dealer_service::dealer_for_user(&mut conn, auth_user.id)?;
    let inquiry = inquiry_service::dealer_update(
        &mut conn,
        &state.io,
        inquiry_id,
        &dealer,
        req.status,
        req.reply.as_deref(),
    )?;
    Ok(Json(ApiResponse::ok(inquiry)))
}

/// PUT /dealers/me/inquiries/:id/archive
pub async fn dealer_archive(
    DealerUser(auth_user): DealerUser,
    State(state): State<Arc<AppState>>,
    Path(inquiry_id): Path<Uuid>,
) -> AppResult<Json<ApiResponse<Inquiry>>> {
    let mut conn = state.db.get().map_err(|e| AppError::Internal(e.into()))?;
    let inquiry = inquiry_service::archive(&mut conn, inquiry_id, ThreadSide::Dealer, auth_user.id)?;
    Ok(Json(ApiResponse::ok(inquiry)))
}

/// PUT /dealers/me/inquiries/:id/read
pub async fn dealer_mark_read(
    DealerUser(auth_user): DealerUser,
    State(state): State<Arc<AppState>>,
    Path(inquiry_id): Path<Uuid>,
) -> AppResult<Json<ApiResponse<Inquiry>>> {
    let mut conn = state.db.get().map_err(|e| AppError::Internal(e.into()))?;
    let inquiry = inquiry_service::mark_read(
        &mut conn,
        &state.io,
        inquiry_id,
        ThreadSide::Dealer,
        auth_user.id,
    )?;
    Ok(Json(ApiResponse::ok(inquiry)))
}
