use chrono::{DateTime, Months, Utc};
use diesel::prelude::*;
use uuid::Uuid;

use motora_shared::errors::{AppError, AppResult, ErrorCode};

use crate::enums::{BillingCycle, SubscriptionPlan, SubscriptionStatus};
use crate::models::{NewSubscription, Subscription};
use crate::plans::{PlanCatalog, PlanLimits, PlanSpec};
use crate::schema::subscriptions;

/// Subscriptions normally belong to a dealer; admins can also assign one
/// directly to a user account.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SubscriptionOwner {
    Dealer(Uuid),
    User(Uuid),
}

/// Resolve the limits a subscription row grants right now. The row's
/// snapshotted fields are returned verbatim; anything not currently active
/// falls back to the FREE defaults.
pub fn limits_from(subscription: Option<&Subscription>, now: DateTime<Utc>) -> PlanLimits {
    match subscription {
        Some(sub) if sub.is_active(now) => PlanLimits {
            max_listings: sub.max_listings,
            max_photos_per_listing: sub.max_photos_per_listing,
            featured_listings: sub.featured_listings,
            xml_import: sub.xml_import,
            analytics: sub.analytics,
        },
        _ => PlanLimits::FREE,
    }
}

/// Effective entitlement of a dealer: the newest ACTIVE, unexpired
/// subscription's snapshot, or the FREE tier.
pub fn effective_limits(conn: &mut PgConnection, dealer_id: Uuid) -> AppResult<PlanLimits> {
    let now = Utc::now();
    let subscription: Option<Subscription> = subscriptions::table
        .filter(subscriptions::dealer_id.eq(dealer_id))
        .filter(subscriptions::status.eq(SubscriptionStatus::Active))
        .filter(subscriptions::end_date.gt(now))
        .order(subscriptions::created_at.desc())
        .first(conn)
        .optional()?;

    Ok(limits_from(subscription.as_ref(), now))
}

/// Price charged for a billing period. Yearly is ten monthly payments, a
/// fixed two-months-free discount.
pub fn price_for(spec: &PlanSpec, cycle: BillingCycle) -> i64 {
    match cycle {
        BillingCycle::Monthly => spec.monthly_price_cents,
        BillingCycle::Yearly => spec.monthly_price_cents * 10,
    }
}

pub fn period_end(now: DateTime<Utc>, cycle: BillingCycle) -> DateTime<Utc> {
    let months = match cycle {
        BillingCycle::Monthly => Months::new(1),
        BillingCycle::Yearly => Months::new(12),
    };
    now.checked_add_months(months).unwrap_or(now)
}

/// Build the insertable row for a new subscription, snapshotting the plan's
/// current limits so later catalog edits do not touch it.
pub fn snapshot(
    owner: SubscriptionOwner,
    plan: SubscriptionPlan,
    cycle: BillingCycle,
    spec: &PlanSpec,
    now: DateTime<Utc>,
) -> NewSubscription {
    let (dealer_id, user_id) = match owner {
        SubscriptionOwner::Dealer(id) => (Some(id), None),
        SubscriptionOwner::User(id) => (None, Some(id)),
    };

    NewSubscription {
        dealer_id,
        user_id,
        plan,
        status: SubscriptionStatus::Active,
        billing_cycle: cycle,
        price_cents: price_for(spec, cycle),
        max_listings: spec.limits.max_listings,
        max_photos_per_listing: spec.limits.max_photos_per_listing,
        featured_listings: spec.limits.featured_listings,
        xml_import: spec.limits.xml_import,
        analytics: spec.limits.analytics,
        start_date: now,
        end_date: period_end(now, cycle),
    }
}

fn newest_for_owner(
    conn: &mut PgConnection,
    owner: SubscriptionOwner,
) -> AppResult<Option<Subscription>> {
    let query = subscriptions::table
        .order(subscriptions::created_at.desc())
        .into_boxed();

    let query = match owner {
        SubscriptionOwner::Dealer(id) => query.filter(subscriptions::dealer_id.eq(id)),
        SubscriptionOwner::User(id) => query.filter(subscriptions::user_id.eq(id)),
    };

    Ok(query.first::<Subscription>(conn).optional()?)
}

/// Move an owner to a new plan. The previous row is cancelled (idempotent
/// against an already-cancelled one) and a fresh ACTIVE row is created with
/// the catalog's current limits snapshotted in. Both the paid checkout
/// completion path and the admin override converge here.
pub fn upgrade(
    conn: &mut PgConnection,
    catalog: &PlanCatalog,
    owner: SubscriptionOwner,
    plan: SubscriptionPlan,
    cycle: BillingCycle,
    actor_id: Uuid,
) -> AppResult<Subscription> {
    let spec = catalog.get(plan)?;
    let now = Utc::now();

    if let Some(previous) = newest_for_owner(conn, owner)? {
        if previous.is_active(now) && previous.plan == plan && previous.billing_cycle == cycle {
            return Err(AppError::new(
                ErrorCode::SubscriptionAlreadyActive,
                format!("an active {plan} subscription already exists"),
            ));
        }

        diesel::update(subscriptions::table.find(previous.id))
            .set((
                subscriptions::status.eq(SubscriptionStatus::Cancelled),
                subscriptions::cancelled_at.eq(now),
            ))
            .execute(conn)?;
    }

    let subscription: Subscription = diesel::insert_into(subscriptions::table)
        .values(&snapshot(owner, plan, cycle, &spec, now))
        .get_result(conn)?;

    tracing::info!(
        subscription_id = %subscription.id,
        plan = %plan,
        cycle = %cycle,
        actor_id = %actor_id,
        "subscription upgraded"
    );

    Ok(subscription)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::plans::UNLIMITED;
    use chrono::{Duration, TimeZone};

    fn now() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2026, 6, 1, 12, 0, 0).unwrap()
    }

    fn starter_row(status: SubscriptionStatus, end_date: DateTime<Utc>) -> Subscription {
        Subscription {
            id: Uuid::new_v4(),
            dealer_id: Some(Uuid::new_v4()),
            user_id: None,
            plan: SubscriptionPlan::Starter,
            status,
            billing_cycle: BillingCycle::Monthly,
            price_cents: 2_900,
            max_listings: 25,
            max_photos_per_listing: 10,
            featured_listings: 2,
            xml_import: false,
            analytics: false,
            start_date: now() - Duration::days(10),
            end_date,
            cancelled_at: None,
            created_at: now() - Duration::days(10),
        }
    }

    #[test]
    fn no_subscription_resolves_to_free_defaults() {
        let limits = limits_from(None, now());
        assert_eq!(limits, PlanLimits::FREE);
        assert_eq!(limits.max_listings, 3);
        assert_eq!(limits.featured_listings, 0);
    }

    #[test]
    fn expired_subscription_is_not_active() {
        let sub = starter_row(SubscriptionStatus::Active, now() - Duration::days(1));
        assert_eq!(limits_from(Some(&sub), now()), PlanLimits::FREE);
    }

    #[test]
    fn cancelled_subscription_is_not_active() {
        let sub = starter_row(SubscriptionStatus::Cancelled, now() + Duration::days(20));
        assert_eq!(limits_from(Some(&sub), now()), PlanLimits::FREE);
    }

    #[test]
    fn active_subscription_returns_snapshot_verbatim() {
        let sub = starter_row(SubscriptionStatus::Active, now() + Duration::days(20));
        let limits = limits_from(Some(&sub), now());
        assert_eq!(limits.max_listings, 25);
        assert_eq!(limits.max_photos_per_listing, 10);
        assert_eq!(limits.featured_listings, 2);
    }

    #[test]
    fn snapshot_survives_catalog_edits() {
        let mut catalog = PlanCatalog::default();
        let spec = catalog.get(SubscriptionPlan::Starter).unwrap();
        let row = snapshot(
            SubscriptionOwner::Dealer(Uuid::new_v4()),
            SubscriptionPlan::Starter,
            BillingCycle::Monthly,
            &spec,
            now(),
        );
        assert_eq!(row.max_listings, 25);

        // Retroactive tier change: existing snapshot must not move.
        let mut bumped = spec;
        bumped.limits.max_listings = 30;
        catalog.set(SubscriptionPlan::Starter, bumped);

        assert_eq!(row.max_listings, 25);
        assert_eq!(
            catalog.get(SubscriptionPlan::Starter).unwrap().limits.max_listings,
            30
        );
    }

    #[test]
    fn yearly_price_is_ten_monthly_payments() {
        let spec = PlanCatalog::default().get(SubscriptionPlan::Professional).unwrap();
        assert_eq!(price_for(&spec, BillingCycle::Monthly), 5_900);
        assert_eq!(price_for(&spec, BillingCycle::Yearly), 59_000);
    }

    #[test]
    fn period_end_matches_billing_cycle() {
        assert_eq!(
            period_end(now(), BillingCycle::Monthly),
            Utc.with_ymd_and_hms(2026, 7, 1, 12, 0, 0).unwrap()
        );
        assert_eq!(
            period_end(now(), BillingCycle::Yearly),
            Utc.with_ymd_and_hms(2027, 6, 1, 12, 0, 0).unwrap()
        );
    }

    #[test]
    fn enterprise_snapshot_carries_unlimited_sentinel() {
        let catalog = PlanCatalog::default();
        let spec = catalog.get(SubscriptionPlan::Enterprise).unwrap();
        let row = snapshot(
            SubscriptionOwner::User(Uuid::new_v4()),
            SubscriptionPlan::Enterprise,
            BillingCycle::Yearly,
            &spec,
            now(),
        );
        assert_eq!(row.max_listings, UNLIMITED);
        assert_eq!(row.featured_listings, UNLIMITED);
        assert!(row.dealer_id.is_none());
        assert!(row.user_id.is_some());
    }
}
