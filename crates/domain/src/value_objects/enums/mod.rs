pub mod billing_intervals;
pub mod categories;
pub mod currencies;
pub mod subscription_statuses;
