pub mod dealer_service;
pub mod featured_service;
pub mod inquiry_service;
pub mod notification_service;
pub mod subscription_service;
