use chrono::{DateTime, Utc};
use diesel::prelude::*;
use uuid::Uuid;

use crate::schema::subscriptions;

#[derive(Debug, Clone, PartialEq, Identifiable, Selectable, Queryable)]
#[diesel(table_name = subscriptions)]
pub struct SubscriptionEntity {
    pub id: Uuid,
    pub user_id: Uuid,
    pub name: String,
    pub price: f64,
    pub currency: String,
    pub billing_interval: String,
    pub category: Option<String>,
    pub payment_method: String,
    pub status: String,
    pub start_date: DateTime<Utc>,
    pub renewal_date: DateTime<Utc>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq, Insertable)]
#[diesel(table_name = subscriptions)]
pub struct InsertSubscriptionEntity {
    pub user_id: Uuid,
    pub name: String,
    pub price: f64,
    pub currency: String,
    pub billing_interval: String,
    pub category: Option<String>,
    pub payment_method: String,
    pub status: String,
    pub start_date: DateTime<Utc>,
    pub renewal_date: DateTime<Utc>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Full rewrite of the mutable columns. `user_id` is deliberately absent.
#[derive(Debug, Clone, PartialEq, AsChangeset)]
#[diesel(table_name = subscriptions, treat_none_as_null = true)]
pub struct UpdateSubscriptionEntity {
    pub name: String,
    pub price: f64,
    pub currency: String,
    pub billing_interval: String,
    pub category: Option<String>,
    pub payment_method: String,
    pub status: String,
    pub start_date: DateTime<Utc>,
    pub renewal_date: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}
