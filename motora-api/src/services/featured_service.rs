use chrono::{DateTime, Duration, Utc};
use diesel::dsl::max;
use diesel::prelude::*;
use serde_json::json;
use uuid::Uuid;

use motora_shared::errors::{AppError, AppResult, ErrorCode};

use crate::enums::{FeaturedRequestStatus, ListingStatus};
use crate::models::{Listing, NewFeaturedAuditEntry};
use crate::plans::UNLIMITED;
use crate::schema::{featured_audit_log, listings};
use crate::services::subscription_service;

/// Hard platform-wide ceiling on concurrently featured listings. This is a
/// curation constraint on the above-the-fold slots, not plan-derived.
pub const GLOBAL_FEATURED_CAP: i64 = 10;

/// Highest valid `featured_order` value.
pub const MAX_FEATURED_ORDER: i32 = 9;

#[derive(Debug)]
pub struct SetFeatured {
    pub listing_id: Uuid,
    pub featured: bool,
    pub days: Option<i64>,
    pub explicit_order: Option<i32>,
}

/// Per-dealer cap check against the dealer's *other* active-featured count.
/// A cap of [`UNLIMITED`] always passes.
pub fn check_dealer_cap(other_active_featured: i64, cap: i32) -> AppResult<()> {
    if cap == UNLIMITED {
        return Ok(());
    }
    if other_active_featured >= i64::from(cap) {
        return Err(AppError::with_details(
            ErrorCode::DealerFeaturedCapReached,
            format!("dealer plan allows at most {cap} featured listings"),
            json!({ "cap": cap, "scope": "dealer" }),
        ));
    }
    Ok(())
}

/// Platform-wide cap check. `active_featured` excludes the listing being
/// transitioned if it was already featured.
pub fn check_global_cap(active_featured: i64) -> AppResult<()> {
    if active_featured >= GLOBAL_FEATURED_CAP {
        return Err(AppError::with_details(
            ErrorCode::GlobalFeaturedCapReached,
            format!("platform allows at most {GLOBAL_FEATURED_CAP} featured listings"),
            json!({ "cap": GLOBAL_FEATURED_CAP, "scope": "global" }),
        ));
    }
    Ok(())
}

/// Pick the order slot for a newly featured listing: a validated explicit
/// position, or one past the current maximum.
pub fn assign_order(explicit: Option<i32>, current_max: Option<i32>) -> AppResult<i32> {
    match explicit {
        Some(order) => {
            if !(0..=MAX_FEATURED_ORDER).contains(&order) {
                return Err(AppError::new(
                    ErrorCode::InvalidFeaturedOrder,
                    format!("featured order must be between 0 and {MAX_FEATURED_ORDER}"),
                ));
            }
            Ok(order)
        }
        None => Ok(current_max.map_or(0, |m| m + 1)),
    }
}

/// Splice `target` into `ordered` at `new_index` and renumber the whole
/// sequence densely from 0. Returns the full `(id, order)` assignment; the
/// caller diffs against current positions and persists only the changes.
pub fn splice_renumber(ordered: &[Uuid], target: Uuid, new_index: usize) -> Vec<(Uuid, i32)> {
    let mut sequence: Vec<Uuid> = ordered.iter().copied().filter(|id| *id != target).collect();
    let index = new_index.min(sequence.len());
    sequence.insert(index, target);

    sequence
        .into_iter()
        .enumerate()
        .map(|(i, id)| (id, i as i32))
        .collect()
}

fn count_active_featured(
    conn: &mut PgConnection,
    now: DateTime<Utc>,
    exclude: Uuid,
    dealer_id: Option<Uuid>,
) -> AppResult<i64> {
    let mut query = listings::table
        .filter(listings::featured.eq(true))
        .filter(listings::id.ne(exclude))
        .filter(
            listings::featured_until
                .is_null()
                .or(listings::featured_until.gt(now)),
        )
        .into_boxed();

    if let Some(dealer_id) = dealer_id {
        query = query.filter(listings::dealer_id.eq(dealer_id));
    }

    Ok(query.count().get_result(conn)?)
}

fn get_listing(conn: &mut PgConnection, listing_id: Uuid) -> AppResult<Listing> {
    listings::table
        .find(listing_id)
        .first::<Listing>(conn)
        .optional()?
        .ok_or_else(|| AppError::new(ErrorCode::ListingNotFound, "listing not found"))
}

fn audit(
    conn: &mut PgConnection,
    action: &str,
    actor_id: Uuid,
    old: &Listing,
    new: &Listing,
) -> AppResult<()> {
    diesel::insert_into(featured_audit_log::table)
        .values(&NewFeaturedAuditEntry {
            listing_id: old.id,
            actor_id,
            action: action.to_string(),
            old_featured: old.featured,
            new_featured: new.featured,
            old_featured_until: old.featured_until,
            new_featured_until: new.featured_until,
            old_order: old.featured_order,
            new_order: new.featured_order,
        })
        .execute(conn)?;
    Ok(())
}

/// Feature or unfeature a listing. Enabling enforces the dealer's plan cap
/// and the global ceiling, in that order, and reports which one was hit.
/// Every transition writes an audit entry.
pub fn set_featured(
    conn: &mut PgConnection,
    req: SetFeatured,
    actor_id: Uuid,
) -> AppResult<Listing> {
    let listing = get_listing(conn, req.listing_id)?;
    let now = Utc::now();

    let updated: Listing = if req.featured {
        if let Some(dealer_id) = listing.dealer_id {
            let limits = subscription_service::effective_limits(conn, dealer_id)?;
            let dealer_active = count_active_featured(conn, now, listing.id, Some(dealer_id))?;
            check_dealer_cap(dealer_active, limits.featured_listings)?;
        }

        let global_active = count_active_featured(conn, now, listing.id, None)?;
        check_global_cap(global_active)?;

        let featured_until = req.days.map(|d| now + Duration::days(d));

        let current_max: Option<i32> = listings::table
            .filter(listings::featured.eq(true))
            .filter(
                listings::featured_until
                    .is_null()
                    .or(listings::featured_until.gt(now)),
            )
            .select(max(listings::featured_order))
            .first(conn)?;
        let order = assign_order(req.explicit_order, current_max)?;

        diesel::update(listings::table.find(listing.id))
            .set((
                listings::featured.eq(true),
                listings::featured_until.eq(featured_until),
                listings::featured_order.eq(order),
                listings::featured_request_status.eq(FeaturedRequestStatus::Approved),
                listings::updated_at.eq(now),
            ))
            .get_result(conn)?
    } else {
        diesel::update(listings::table.find(listing.id))
            .set((
                listings::featured.eq(false),
                listings::featured_until.eq(None::<DateTime<Utc>>),
                listings::featured_order.eq(None::<i32>),
                listings::featured_request_status.eq(FeaturedRequestStatus::None),
                listings::updated_at.eq(now),
            ))
            .get_result(conn)?
    };

    let action = if req.featured { "feature" } else { "unfeature" };
    audit(conn, action, actor_id, &listing, &updated)?;

    tracing::info!(
        listing_id = %listing.id,
        actor_id = %actor_id,
        featured = req.featured,
        order = ?updated.featured_order,
        "featured transition"
    );

    Ok(updated)
}

/// Move a featured listing to a new slot, renumbering the whole ordered set
/// densely so no gaps or duplicates remain.
pub fn reorder(
    conn: &mut PgConnection,
    listing_id: Uuid,
    new_order: i32,
    actor_id: Uuid,
) -> AppResult<Vec<Listing>> {
    let listing = get_listing(conn, listing_id)?;
    let now = Utc::now();

    if !listing.is_actively_featured(now) {
        return Err(AppError::new(
            ErrorCode::NotFeatured,
            "listing is not currently featured",
        ));
    }
    if !(0..=MAX_FEATURED_ORDER).contains(&new_order) {
        return Err(AppError::new(
            ErrorCode::InvalidFeaturedOrder,
            format!("featured order must be between 0 and {MAX_FEATURED_ORDER}"),
        ));
    }

    let current: Vec<(Uuid, Option<i32>)> = listings::table
        .filter(listings::featured.eq(true))
        .filter(
            listings::featured_until
                .is_null()
                .or(listings::featured_until.gt(now)),
        )
        .filter(listings::featured_order.is_not_null())
        .order(listings::featured_order.asc())
        .select((listings::id, listings::featured_order))
        .load(conn)?;

    let ordered: Vec<Uuid> = current.iter().map(|(id, _)| *id).collect();
    let assignment = splice_renumber(&ordered, listing.id, new_order as usize);

    // Batch of independent updates; only rows whose slot actually moved.
    let mut updated = Vec::new();
    for (id, order) in &assignment {
        let previous = current
            .iter()
            .find(|(cid, _)| cid == id)
            .and_then(|(_, o)| *o);
        if previous == Some(*order) {
            continue;
        }
        let row: Listing = diesel::update(listings::table.find(*id))
            .set((
                listings::featured_order.eq(*order),
                listings::updated_at.eq(now),
            ))
            .get_result(conn)?;
        updated.push(row);
    }

    let moved = get_listing(conn, listing.id)?;
    audit(conn, "reorder", actor_id, &listing, &moved)?;

    // 1-indexed positions for the human-readable trail.
    tracing::info!(
        listing_id = %listing.id,
        actor_id = %actor_id,
        from = ?listing.featured_order.map(|o| o + 1),
        to = new_order + 1,
        changed = updated.len(),
        "featured reorder"
    );

    Ok(updated)
}

/// Public read path: active, unexpired featured listings in display order.
pub fn featured_listings(conn: &mut PgConnection) -> AppResult<Vec<Listing>> {
    let now = Utc::now();
    Ok(listings::table
        .filter(listings::featured.eq(true))
        .filter(listings::status.eq(ListingStatus::Active))
        .filter(
            listings::featured_until
                .is_null()
                .or(listings::featured_until.gt(now)),
        )
        .order((
            listings::featured_order.asc().nulls_last(),
            listings::created_at.desc(),
        ))
        .load::<Listing>(conn)?)
}

/// Admin read path: every featured row, including expired and non-active
/// listings, for the curation console.
pub fn admin_featured_listings(conn: &mut PgConnection) -> AppResult<Vec<Listing>> {
    Ok(listings::table
        .filter(listings::featured.eq(true))
        .order((
            listings::featured_order.asc().nulls_last(),
            listings::created_at.desc(),
        ))
        .load::<Listing>(conn)?)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn ids(n: usize) -> Vec<Uuid> {
        (0..n).map(|_| Uuid::new_v4()).collect()
    }

    #[test]
    fn dealer_cap_blocks_at_limit() {
        assert!(check_dealer_cap(1, 2).is_ok());
        let err = check_dealer_cap(2, 2).unwrap_err();
        assert_eq!(err.code(), Some(ErrorCode::DealerFeaturedCapReached));
    }

    #[test]
    fn unlimited_dealer_cap_always_passes() {
        assert!(check_dealer_cap(1_000, UNLIMITED).is_ok());
    }

    #[test]
    fn global_cap_is_a_hard_ten() {
        assert!(check_global_cap(9).is_ok());
        let err = check_global_cap(10).unwrap_err();
        assert_eq!(err.code(), Some(ErrorCode::GlobalFeaturedCapReached));
    }

    #[test]
    fn caps_report_which_scope_was_hit() {
        let dealer = check_dealer_cap(5, 5).unwrap_err();
        let global = check_global_cap(10).unwrap_err();
        assert_ne!(dealer.code(), global.code());
    }

    #[test]
    fn explicit_order_is_validated() {
        assert_eq!(assign_order(Some(0), Some(4)).unwrap(), 0);
        assert_eq!(assign_order(Some(9), None).unwrap(), 9);
        assert!(assign_order(Some(10), None).is_err());
        assert!(assign_order(Some(-1), None).is_err());
    }

    #[test]
    fn implicit_order_appends_after_current_max() {
        assert_eq!(assign_order(None, None).unwrap(), 0);
        assert_eq!(assign_order(None, Some(2)).unwrap(), 3);
    }

    #[test]
    fn moving_last_to_front_shifts_everything() {
        let abc = ids(3);
        let (a, b, c) = (abc[0], abc[1], abc[2]);

        let assignment = splice_renumber(&[a, b, c], c, 0);
        assert_eq!(assignment, vec![(c, 0), (a, 1), (b, 2)]);
    }

    #[test]
    fn renumbering_is_dense_for_any_permutation_and_target() {
        let set = ids(6);
        for target_pos in 0..set.len() {
            for new_index in 0..set.len() {
                let assignment = splice_renumber(&set, set[target_pos], new_index);

                let mut orders: Vec<i32> = assignment.iter().map(|(_, o)| *o).collect();
                orders.sort_unstable();
                assert_eq!(orders, (0..set.len() as i32).collect::<Vec<_>>());
                assert_eq!(
                    assignment.iter().position(|(id, _)| *id == set[target_pos]),
                    Some(new_index)
                );
            }
        }
    }

    #[test]
    fn untouched_items_keep_their_relative_order() {
        let set = ids(5);
        let assignment = splice_renumber(&set, set[1], 4);

        let rest: Vec<Uuid> = assignment
            .iter()
            .filter(|(id, _)| *id != set[1])
            .map(|(id, _)| *id)
            .collect();
        assert_eq!(rest, vec![set[0], set[2], set[3], set[4]]);
    }

    #[test]
    fn newly_featured_listing_splices_in_even_when_absent() {
        let set = ids(3);
        let newcomer = Uuid::new_v4();
        let assignment = splice_renumber(&set, newcomer, 1);

        assert_eq!(assignment.len(), 4);
        assert_eq!(assignment[1].0, newcomer);
        assert_eq!(assignment.last().map(|(_, o)| *o), Some(3));
    }

    #[test]
    fn out_of_range_index_clamps_to_end() {
        let set = ids(2);
        let assignment = splice_renumber(&set, set[0], 9);
        assert_eq!(assignment.last(), Some(&(set[0], 1)));
    }
}
