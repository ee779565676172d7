pub mod subscriptions;
pub mod users;
