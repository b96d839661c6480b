pub mod featured;
pub mod health;
pub mod inquiries;
pub mod notifications;
pub mod subscriptions;
