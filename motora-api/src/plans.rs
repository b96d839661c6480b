use std::collections::HashMap;

use motora_shared::errors::{AppError, AppResult, ErrorCode};
use serde::Serialize;

use crate::enums::SubscriptionPlan;

/// Sentinel for "no limit" in numeric limit fields. Comparison call sites
/// must special-case it rather than compare numerically.
pub const UNLIMITED: i32 = -1;

/// Entitlements of a plan tier. These are snapshotted onto a subscription
/// row at creation time; later catalog edits never affect existing rows.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct PlanLimits {
    pub max_listings: i32,
    pub max_photos_per_listing: i32,
    pub featured_listings: i32,
    pub xml_import: bool,
    pub analytics: bool,
}

impl PlanLimits {
    /// Static defaults applied to dealers with no active subscription.
    pub const FREE: Self = Self {
        max_listings: 3,
        max_photos_per_listing: 5,
        featured_listings: 0,
        xml_import: false,
        analytics: false,
    };
}

#[derive(Debug, Clone, Copy)]
pub struct PlanSpec {
    pub limits: PlanLimits,
    pub monthly_price_cents: i64,
}

/// Current plan tier definitions. Held in application state so admin tooling
/// can adjust tiers without touching already-issued subscriptions.
#[derive(Debug, Clone)]
pub struct PlanCatalog {
    specs: HashMap<SubscriptionPlan, PlanSpec>,
}

impl PlanCatalog {
    pub fn get(&self, plan: SubscriptionPlan) -> AppResult<PlanSpec> {
        self.specs.get(&plan).copied().ok_or_else(|| {
            AppError::new(ErrorCode::UnknownPlan, format!("unknown plan: {plan}"))
        })
    }

    pub fn set(&mut self, plan: SubscriptionPlan, spec: PlanSpec) {
        self.specs.insert(plan, spec);
    }
}

impl Default for PlanCatalog {
    fn default() -> Self {
        let mut specs = HashMap::new();
        specs.insert(
            SubscriptionPlan::Free,
            PlanSpec { limits: PlanLimits::FREE, monthly_price_cents: 0 },
        );
        specs.insert(
            SubscriptionPlan::Starter,
            PlanSpec {
                limits: PlanLimits {
                    max_listings: 25,
                    max_photos_per_listing: 10,
                    featured_listings: 2,
                    xml_import: false,
                    analytics: false,
                },
                monthly_price_cents: 2_900,
            },
        );
        specs.insert(
            SubscriptionPlan::Professional,
            PlanSpec {
                limits: PlanLimits {
                    max_listings: 100,
                    max_photos_per_listing: 20,
                    featured_listings: 5,
                    xml_import: true,
                    analytics: true,
                },
                monthly_price_cents: 5_900,
            },
        );
        specs.insert(
            SubscriptionPlan::Enterprise,
            PlanSpec {
                limits: PlanLimits {
                    max_listings: UNLIMITED,
                    max_photos_per_listing: 50,
                    featured_listings: UNLIMITED,
                    xml_import: true,
                    analytics: true,
                },
                monthly_price_cents: 9_900,
            },
        );
        Self { specs }
    }
}
