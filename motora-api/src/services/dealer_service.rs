use diesel::prelude::*;
use uuid::Uuid;

use motora_shared::errors::{AppError, AppResult, ErrorCode};

use crate::models::Dealer;
use crate::schema::dealers;

/// Resolve the dealer record owned by the authenticated account.
pub fn dealer_for_user(conn: &mut PgConnection, user_id: Uuid) -> AppResult<Dealer> {
    dealers::table
        .filter(dealers::user_id.eq(user_id))
        .first::<Dealer>(conn)
        .optional()?
        .ok_or_else(|| AppError::new(ErrorCode::DealerNotFound, "no dealer profile for this account"))
}

pub fn get_dealer(conn: &mut PgConnection, dealer_id: Uuid) -> AppResult<Dealer> {
    dealers::table
        .find(dealer_id)
        .first::<Dealer>(conn)
        .optional()?
        .ok_or_else(|| AppError::new(ErrorCode::DealerNotFound, "dealer not found"))
}
