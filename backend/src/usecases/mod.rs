pub mod accounts;
pub mod subscriptions;
pub mod users;
