use chrono::{DateTime, Duration, Utc};
use serde::Serialize;

use crate::value_objects::{
    enums::{categories::Category, subscription_statuses::SubscriptionStatus},
    subscriptions::SubscriptionRecord,
};

const UPCOMING_WINDOW_DAYS: i64 = 7;

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CategorySpend {
    pub category: Category,
    pub monthly_spend: f64,
}

/// Dashboard figures for one user's active subscriptions. Prices of
/// different currencies are added at face value.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SpendingSummary {
    pub active_count: usize,
    pub monthly_spend: f64,
    pub yearly_spend: f64,
    pub upcoming_renewals: usize,
    pub by_category: Vec<CategorySpend>,
}

pub fn monthly_amount(record: &SubscriptionRecord) -> f64 {
    record.interval.monthly_amount(record.price)
}

pub fn summarize<T>(records: &[T], now: DateTime<Utc>) -> SpendingSummary
where
    T: AsRef<SubscriptionRecord>,
{
    let window_start = now - Duration::days(1);
    let window_end = now + Duration::days(UPCOMING_WINDOW_DAYS);

    let mut active_count = 0;
    let mut monthly_spend = 0.0;
    let mut upcoming_renewals = 0;
    let mut by_category: Vec<CategorySpend> = Vec::new();

    for record in records.iter().map(AsRef::as_ref) {
        if record.status != SubscriptionStatus::Active {
            continue;
        }

        let amount = monthly_amount(record);
        active_count += 1;
        monthly_spend += amount;

        // Whole days left, rounded up, must fall in 0..=7.
        if record.renewal_date > window_start && record.renewal_date <= window_end {
            upcoming_renewals += 1;
        }

        let category = record.category.unwrap_or(Category::Other);
        match by_category.iter_mut().find(|entry| entry.category == category) {
            Some(entry) => entry.monthly_spend += amount,
            None => by_category.push(CategorySpend {
                category,
                monthly_spend: amount,
            }),
        }
    }

    for entry in &mut by_category {
        entry.monthly_spend = round_cents(entry.monthly_spend);
    }

    SpendingSummary {
        active_count,
        monthly_spend: round_cents(monthly_spend),
        yearly_spend: round_cents(monthly_spend * 12.0),
        upcoming_renewals,
        by_category,
    }
}

fn round_cents(amount: f64) -> f64 {
    (amount * 100.0).round() / 100.0
}
