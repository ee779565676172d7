//! Renewal-date and status resolution for subscriptions.
//!
//! Both entry points take `now` explicitly and never read the clock, so the
//! same inputs always produce the same output.

use chrono::{DateTime, Utc};

use crate::{
    errors::ValidationError,
    value_objects::{
        enums::subscription_statuses::SubscriptionStatus,
        subscriptions::{SubscriptionDraft, SubscriptionRecord},
    },
};

/// Completes a draft before it is persisted.
///
/// A missing renewal date becomes `start_date + interval.look_ahead()`. The
/// renewal date must be strictly after the start date. A renewal date already
/// in the past forces `Expired`, whatever status the caller supplied. The
/// draft is consumed, so a rejected call leaves nothing half-applied.
pub fn finalize(
    draft: SubscriptionDraft,
    now: DateTime<Utc>,
) -> Result<SubscriptionRecord, ValidationError> {
    if draft.start_date.date_naive() > now.date_naive() {
        return Err(ValidationError::StartDateInFuture);
    }

    let renewal_date = match draft.renewal_date {
        Some(renewal_date) => renewal_date,
        None => draft
            .start_date
            .checked_add_signed(draft.interval.look_ahead())
            .ok_or(ValidationError::DateOutOfRange)?,
    };

    if renewal_date <= draft.start_date {
        return Err(ValidationError::RenewalNotAfterStart);
    }

    let status = if renewal_date < now {
        SubscriptionStatus::Expired
    } else {
        draft.status
    };

    Ok(SubscriptionRecord {
        name: draft.name,
        price: draft.price,
        currency: draft.currency,
        interval: draft.interval,
        category: draft.category,
        payment_method: draft.payment_method,
        status,
        start_date: draft.start_date,
        renewal_date,
    })
}

/// Whether an active subscription renews inside `[now, now + look-ahead]`.
pub fn is_upcoming(record: &SubscriptionRecord, now: DateTime<Utc>) -> bool {
    if record.status != SubscriptionStatus::Active {
        return false;
    }

    match now.checked_add_signed(record.interval.look_ahead()) {
        Some(look_ahead_date) => record.renewal_date >= now && record.renewal_date <= look_ahead_date,
        None => false,
    }
}

/// Keeps the subscriptions that renew within their interval's look-ahead
/// window, preserving input order.
pub fn filter_upcoming<T>(records: Vec<T>, now: DateTime<Utc>) -> Vec<T>
where
    T: AsRef<SubscriptionRecord>,
{
    records
        .into_iter()
        .filter(|record| is_upcoming(record.as_ref(), now))
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::value_objects::enums::{
        billing_intervals::BillingInterval, categories::Category, currencies::Currency,
    };
    use chrono::{Duration, TimeZone};
    use proptest::prelude::*;

    fn at(y: i32, m: u32, d: u32) -> DateTime<Utc> {
        Utc.with_ymd_and_hms(y, m, d, 0, 0, 0).unwrap()
    }

    fn draft(interval: BillingInterval, start_date: DateTime<Utc>) -> SubscriptionDraft {
        SubscriptionDraft {
            name: "Netflix".to_string(),
            price: 15.49,
            currency: Currency::USD,
            interval,
            category: Some(Category::Entertainment),
            payment_method: "Visa".to_string(),
            status: SubscriptionStatus::Active,
            start_date,
            renewal_date: None,
        }
    }

    fn active(interval: BillingInterval, renewal_date: DateTime<Utc>) -> SubscriptionRecord {
        SubscriptionRecord {
            name: format!("{interval} plan"),
            price: 5.0,
            currency: Currency::EUR,
            interval,
            category: None,
            payment_method: "Card".to_string(),
            status: SubscriptionStatus::Active,
            start_date: renewal_date - Duration::days(400),
            renewal_date,
        }
    }

    #[test]
    fn monthly_without_renewal_date_renews_thirty_days_later() {
        let record = finalize(draft(BillingInterval::Monthly, at(2024, 1, 1)), at(2024, 1, 15)).unwrap();

        assert_eq!(record.renewal_date, at(2024, 1, 31));
        assert_eq!(record.status, SubscriptionStatus::Active);
    }

    #[test]
    fn monthly_without_renewal_date_expires_once_now_passes_it() {
        let record = finalize(draft(BillingInterval::Monthly, at(2024, 1, 1)), at(2024, 2, 1)).unwrap();

        assert_eq!(record.renewal_date, at(2024, 1, 31));
        assert_eq!(record.status, SubscriptionStatus::Expired);
    }

    #[test]
    fn renewal_equal_to_now_is_not_expired() {
        let record = finalize(draft(BillingInterval::Monthly, at(2024, 1, 1)), at(2024, 1, 31)).unwrap();

        assert_eq!(record.status, SubscriptionStatus::Active);
    }

    #[test]
    fn yearly_uses_fixed_365_days_across_leap_year() {
        let record = finalize(draft(BillingInterval::Yearly, at(2024, 1, 1)), at(2024, 6, 1)).unwrap();

        assert_eq!(record.renewal_date, at(2024, 12, 31));
    }

    #[test]
    fn renewal_before_start_is_rejected() {
        let mut candidate = draft(BillingInterval::Monthly, at(2024, 1, 1));
        candidate.renewal_date = Some(at(2023, 12, 31));

        assert_eq!(
            finalize(candidate, at(2024, 1, 10)),
            Err(ValidationError::RenewalNotAfterStart)
        );
    }

    #[test]
    fn renewal_equal_to_start_is_rejected() {
        let mut candidate = draft(BillingInterval::Daily, at(2024, 1, 1));
        candidate.renewal_date = Some(at(2024, 1, 1));

        assert_eq!(
            finalize(candidate, at(2024, 1, 10)),
            Err(ValidationError::RenewalNotAfterStart)
        );
    }

    #[test]
    fn start_date_after_today_is_rejected() {
        let candidate = draft(BillingInterval::Weekly, at(2024, 3, 2));

        assert_eq!(
            finalize(candidate, at(2024, 3, 1) + Duration::hours(23)),
            Err(ValidationError::StartDateInFuture)
        );
    }

    #[test]
    fn start_date_later_today_is_accepted() {
        let now = at(2024, 3, 1) + Duration::hours(9);
        let candidate = draft(BillingInterval::Weekly, now + Duration::hours(3));

        assert!(finalize(candidate, now).is_ok());
    }

    #[test]
    fn supplied_renewal_date_is_kept() {
        let mut candidate = draft(BillingInterval::Monthly, at(2024, 1, 1));
        candidate.renewal_date = Some(at(2024, 1, 20));

        let record = finalize(candidate, at(2024, 1, 5)).unwrap();

        assert_eq!(record.renewal_date, at(2024, 1, 20));
    }

    #[test]
    fn canceled_stays_canceled_until_renewal_passes() {
        let mut candidate = draft(BillingInterval::Monthly, at(2024, 1, 1));
        candidate.status = SubscriptionStatus::Canceled;

        let before = finalize(candidate.clone(), at(2024, 1, 10)).unwrap();
        let after = finalize(candidate, at(2024, 3, 1)).unwrap();

        assert_eq!(before.status, SubscriptionStatus::Canceled);
        assert_eq!(after.status, SubscriptionStatus::Expired);
    }

    #[test]
    fn expiry_is_one_way() {
        let record = finalize(draft(BillingInterval::Daily, at(2024, 1, 1)), at(2024, 1, 5)).unwrap();
        assert_eq!(record.status, SubscriptionStatus::Expired);

        // Finalizing again with an earlier clock never revives it.
        let again = finalize(record.into(), at(2024, 1, 1)).unwrap();
        assert_eq!(again.status, SubscriptionStatus::Expired);
    }

    #[test]
    fn weekly_window_includes_three_days_and_excludes_ten() {
        let now = at(2024, 5, 1);
        let soon = active(BillingInterval::Weekly, now + Duration::days(3));
        let later = active(BillingInterval::Weekly, now + Duration::days(10));

        let upcoming = filter_upcoming(vec![soon.clone(), later], now);

        assert_eq!(upcoming, vec![soon]);
    }

    #[test]
    fn window_bounds_are_inclusive() {
        let now = at(2024, 5, 1);
        let at_now = active(BillingInterval::Daily, now);
        let at_edge = active(BillingInterval::Monthly, now + Duration::days(30));
        let past_edge = active(BillingInterval::Monthly, now + Duration::days(30) + Duration::seconds(1));
        let yesterday = active(BillingInterval::Yearly, now - Duration::days(1));

        let upcoming = filter_upcoming(
            vec![at_now.clone(), at_edge.clone(), past_edge, yesterday],
            now,
        );

        assert_eq!(upcoming, vec![at_now, at_edge]);
    }

    #[test]
    fn filter_preserves_input_order() {
        let now = at(2024, 5, 1);
        let records = vec![
            active(BillingInterval::Yearly, now + Duration::days(200)),
            active(BillingInterval::Daily, now + Duration::hours(12)),
            active(BillingInterval::Monthly, now + Duration::days(2)),
        ];

        let upcoming = filter_upcoming(records.clone(), now);

        assert_eq!(upcoming, records);
    }

    #[test]
    fn filter_never_returns_inactive_subscriptions() {
        let now = at(2024, 5, 1);
        let mut canceled = active(BillingInterval::Weekly, now + Duration::days(1));
        canceled.status = SubscriptionStatus::Canceled;
        let mut expired = active(BillingInterval::Weekly, now + Duration::days(1));
        expired.status = SubscriptionStatus::Expired;

        assert!(filter_upcoming(vec![canceled, expired], now).is_empty());
    }

    fn interval_strategy() -> impl Strategy<Value = BillingInterval> {
        prop::sample::select(BillingInterval::ALL.to_vec())
    }

    fn status_strategy() -> impl Strategy<Value = SubscriptionStatus> {
        prop::sample::select(vec![
            SubscriptionStatus::Active,
            SubscriptionStatus::Canceled,
            SubscriptionStatus::Expired,
        ])
    }

    proptest! {
        #![proptest_config(ProptestConfig::with_cases(256))]

        #[test]
        fn derived_renewal_matches_look_ahead_table(
            interval in interval_strategy(),
            start_offset_days in 0i64..3_000,
            now_offset_days in 0i64..3_000,
        ) {
            let start_date = at(2020, 1, 1) + Duration::days(start_offset_days);
            let now = start_date + Duration::days(now_offset_days);

            let record = finalize(draft(interval, start_date), now).unwrap();

            prop_assert_eq!(record.renewal_date, start_date + Duration::days(interval.look_ahead_days()));
        }

        #[test]
        fn finalized_renewal_is_after_start_or_rejected(
            interval in interval_strategy(),
            renewal_offset_hours in -2_000i64..2_000,
            now_offset_hours in 0i64..4_000,
        ) {
            let start_date = at(2022, 6, 1);
            let mut candidate = draft(interval, start_date);
            candidate.renewal_date = Some(start_date + Duration::hours(renewal_offset_hours));

            match finalize(candidate, start_date + Duration::hours(now_offset_hours)) {
                Ok(record) => {
                    prop_assert!(record.renewal_date > start_date);
                }
                Err(err) => {
                    prop_assert_eq!(err, ValidationError::RenewalNotAfterStart);
                }
            }
        }

        #[test]
        fn past_renewal_always_expires_and_future_keeps_status(
            interval in interval_strategy(),
            status in status_strategy(),
            now_offset_hours in 0i64..20_000,
        ) {
            let start_date = at(2021, 3, 1);
            let mut candidate = draft(interval, start_date);
            candidate.status = status;
            let now = start_date + Duration::hours(now_offset_hours);

            let record = finalize(candidate, now).unwrap();

            if record.renewal_date < now {
                prop_assert_eq!(record.status, SubscriptionStatus::Expired);
            } else {
                prop_assert_eq!(record.status, status);
            }
        }

        #[test]
        fn finalize_is_idempotent(
            interval in interval_strategy(),
            status in status_strategy(),
            now_offset_hours in 0i64..20_000,
        ) {
            let start_date = at(2021, 3, 1);
            let mut candidate = draft(interval, start_date);
            candidate.status = status;
            let now = start_date + Duration::hours(now_offset_hours);

            let once = finalize(candidate, now).unwrap();
            let twice = finalize(once.clone().into(), now).unwrap();

            prop_assert_eq!(twice, once);
        }

        #[test]
        fn filter_only_returns_active(
            statuses in prop::collection::vec(status_strategy(), 0..20),
            offsets in prop::collection::vec(-5i64..40, 20),
        ) {
            let now = at(2024, 5, 1);
            let records: Vec<SubscriptionRecord> = statuses
                .iter()
                .zip(offsets.iter())
                .map(|(status, days)| {
                    let mut record = active(BillingInterval::Monthly, now + Duration::days(*days));
                    record.status = *status;
                    record
                })
                .collect();

            for record in filter_upcoming(records, now) {
                prop_assert_eq!(record.status, SubscriptionStatus::Active);
            }
        }
    }
}
