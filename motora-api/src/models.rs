use chrono::{DateTime, Utc};
use diesel::prelude::*;
use serde::Serialize;
use uuid::Uuid;

use crate::enums::{
    BillingCycle, FeaturedRequestStatus, InquiryStatus, ListingStatus, SubscriptionPlan,
    SubscriptionStatus,
};
use crate::schema::{dealers, featured_audit_log, inquiries, listings, notifications, subscriptions};

// --- Dealer ---

#[derive(Debug, Queryable, Identifiable, Serialize, Clone)]
#[diesel(table_name = dealers)]
pub struct Dealer {
    pub id: Uuid,
    pub user_id: Uuid,
    pub name: String,
    pub email: String,
    pub phone: Option<String>,
    pub created_at: DateTime<Utc>,
}

// --- Listing ---

#[derive(Debug, Queryable, Identifiable, Serialize, Clone)]
#[diesel(table_name = listings)]
pub struct Listing {
    pub id: Uuid,
    pub user_id: Uuid,
    pub dealer_id: Option<Uuid>,
    pub title: String,
    pub make: String,
    pub model: String,
    pub year: i32,
    pub price_cents: i64,
    pub mileage: i32,
    pub status: ListingStatus,
    pub featured: bool,
    pub featured_until: Option<DateTime<Utc>>,
    pub featured_order: Option<i32>,
    pub featured_request_status: FeaturedRequestStatus,
    pub inquiry_count: i32,
    pub primary_photo_url: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Listing {
    /// Whether the listing currently occupies a featured slot (enabled and
    /// not past its expiry).
    pub fn is_actively_featured(&self, now: DateTime<Utc>) -> bool {
        self.featured && self.featured_until.map_or(true, |until| until > now)
    }
}

// --- Inquiry ---

#[derive(Debug, Queryable, Identifiable, Serialize, Clone)]
#[diesel(table_name = inquiries)]
pub struct Inquiry {
    pub id: Uuid,
    pub listing_id: Uuid,
    pub dealer_id: Uuid,
    pub user_id: Option<Uuid>,
    pub name: String,
    pub email: String,
    pub phone: Option<String>,
    pub message: String,
    pub reply: Option<String>,
    pub status: InquiryStatus,
    pub user_archived: bool,
    pub dealer_archived: bool,
    pub user_read_at: Option<DateTime<Utc>>,
    pub dealer_read_at: Option<DateTime<Utc>>,
    pub is_read: bool,
    pub read_at: Option<DateTime<Utc>>,
    pub replied_at: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Insertable)]
#[diesel(table_name = inquiries)]
pub struct NewInquiry {
    pub listing_id: Uuid,
    pub dealer_id: Uuid,
    pub user_id: Option<Uuid>,
    pub name: String,
    pub email: String,
    pub phone: Option<String>,
    pub message: String,
    pub status: InquiryStatus,
}

// --- Notification ---

#[derive(Debug, Queryable, Identifiable, Serialize, Clone)]
#[diesel(table_name = notifications)]
pub struct Notification {
    pub id: Uuid,
    pub user_id: Uuid,
    pub notification_type: String,
    pub title: String,
    pub body: String,
    pub data: Option<serde_json::Value>,
    pub is_read: bool,
    pub read_at: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Insertable)]
#[diesel(table_name = notifications)]
pub struct NewNotification {
    pub user_id: Uuid,
    pub notification_type: String,
    pub title: String,
    pub body: String,
    pub data: Option<serde_json::Value>,
}

// --- Subscription ---

#[derive(Debug, Queryable, Identifiable, Serialize, Clone)]
#[diesel(table_name = subscriptions)]
pub struct Subscription {
    pub id: Uuid,
    pub dealer_id: Option<Uuid>,
    pub user_id: Option<Uuid>,
    pub plan: SubscriptionPlan,
    pub status: SubscriptionStatus,
    pub billing_cycle: BillingCycle,
    pub price_cents: i64,
    pub max_listings: i32,
    pub max_photos_per_listing: i32,
    pub featured_listings: i32,
    pub xml_import: bool,
    pub analytics: bool,
    pub start_date: DateTime<Utc>,
    pub end_date: DateTime<Utc>,
    pub cancelled_at: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
}

impl Subscription {
    pub fn is_active(&self, now: DateTime<Utc>) -> bool {
        self.status == SubscriptionStatus::Active && self.end_date > now
    }
}

#[derive(Debug, Insertable)]
#[diesel(table_name = subscriptions)]
pub struct NewSubscription {
    pub dealer_id: Option<Uuid>,
    pub user_id: Option<Uuid>,
    pub plan: SubscriptionPlan,
    pub status: SubscriptionStatus,
    pub billing_cycle: BillingCycle,
    pub price_cents: i64,
    pub max_listings: i32,
    pub max_photos_per_listing: i32,
    pub featured_listings: i32,
    pub xml_import: bool,
    pub analytics: bool,
    pub start_date: DateTime<Utc>,
    pub end_date: DateTime<Utc>,
}

// --- Featured audit log ---

#[derive(Debug, Queryable, Identifiable, Serialize, Clone)]
#[diesel(table_name = featured_audit_log)]
pub struct FeaturedAuditEntry {
    pub id: Uuid,
    pub listing_id: Uuid,
    pub actor_id: Uuid,
    pub action: String,
    pub old_featured: bool,
    pub new_featured: bool,
    pub old_featured_until: Option<DateTime<Utc>>,
    pub new_featured_until: Option<DateTime<Utc>>,
    pub old_order: Option<i32>,
    pub new_order: Option<i32>,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Insertable)]
#[diesel(table_name = featured_audit_log)]
pub struct NewFeaturedAuditEntry {
    pub listing_id: Uuid,
    pub actor_id: Uuid,
    pub action: String,
    pub old_featured: bool,
    pub new_featured: bool,
    pub old_featured_until: Option<DateTime<Utc>>,
    pub new_featured_until: Option<DateTime<Utc>>,
    pub old_order: Option<i32>,
    pub new_order: Option<i32>,
}
