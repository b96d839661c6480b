use axum::extract::{Path, State};
use axum::Json;
use serde::Deserialize;
use std::sync::Arc;
use uuid::Uuid;

use motora_shared::errors::{AppError, AppResult};
use motora_shared::middleware::{AdminUser, DealerUser};
use motora_shared::types::api::ApiResponse;

use crate::enums::{BillingCycle, SubscriptionPlan};
use crate::models::Subscription;
use crate::plans::PlanLimits;
use crate::services::{dealer_service, subscription_service};
use crate::services::subscription_service::SubscriptionOwner;
use crate::AppState;

#[derive(Debug, Deserialize)]
pub struct UpgradeRequest {
    pub plan: SubscriptionPlan,
    pub billing_cycle: BillingCycle,
}

/// GET /dealers/me/limits - the caller's effective entitlement (active
/// subscription snapshot or FREE defaults).
pub async fn my_limits(
    DealerUser(auth_user): DealerUser,
    State(state): State<Arc<AppState>>,
) -> AppResult<Json<ApiResponse<PlanLimits>>> {
    let mut conn = state.db.get().map_err(|e| AppError::Internal(e.into()))?;
    let dealer = dealer_service::dealer_for_user(&mut conn, auth_user.id)?;
    let limits = subscription_service::effective_limits(&mut conn, dealer.id)?;
    Ok(Json(ApiResponse::ok(limits)))
}

/// POST /admin/dealers/:id/subscription - admin override upgrade with no
/// payment attached. Shares the subscription-creation logic with the paid
/// checkout path.
pub async fn admin_upgrade_dealer(
    AdminUser(admin): AdminUser,
    State(state): State<Arc<AppState>>,
    Path(dealer_id): Path<Uuid>,
    Json(req): Json<UpgradeRequest>,
) -> AppResult<Json<ApiResponse<Subscription>>> {
    let mut conn = state.db.get().map_err(|e| AppError::Internal(e.into()))?;
    let dealer = dealer_service::get_dealer(&mut conn, dealer_id)?;

    let subscription = subscription_service::upgrade(
        &mut conn,
        &state.plans,
        SubscriptionOwner::Dealer(dealer.id),
        req.plan,
        req.billing_cycle,
        admin.id,
    )?;
    Ok(Json(ApiResponse::ok(subscription)))
}
