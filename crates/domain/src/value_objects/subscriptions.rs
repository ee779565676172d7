use chrono::{DateTime, Utc};
use serde::{Deserialize, Deserializer, Serialize};
use uuid::Uuid;

use crate::{
    entities::subscriptions::{
        InsertSubscriptionEntity, SubscriptionEntity, UpdateSubscriptionEntity,
    },
    errors::ValidationError,
    value_objects::enums::{
        billing_intervals::BillingInterval, categories::Category, currencies::Currency,
        subscription_statuses::SubscriptionStatus,
    },
};

const NAME_MIN_CHARS: usize = 3;
const NAME_MAX_CHARS: usize = 50;

/// A subscription whose renewal date may still need deriving.
#[derive(Debug, Clone, PartialEq)]
pub struct SubscriptionDraft {
    pub name: String,
    pub price: f64,
    pub currency: Currency,
    pub interval: BillingInterval,
    pub category: Option<Category>,
    pub payment_method: String,
    pub status: SubscriptionStatus,
    pub start_date: DateTime<Utc>,
    pub renewal_date: Option<DateTime<Utc>>,
}

impl SubscriptionDraft {
    /// Field-level checks. Temporal consistency is left to `lifecycle::finalize`.
    pub fn validate(&self) -> Result<(), ValidationError> {
        let name_len = self.name.chars().count();
        if !(NAME_MIN_CHARS..=NAME_MAX_CHARS).contains(&name_len) {
            return Err(ValidationError::SubscriptionNameLength);
        }
        if !self.price.is_finite() || self.price < 0.0 {
            return Err(ValidationError::NegativePrice);
        }
        if self.payment_method.trim().is_empty() {
            return Err(ValidationError::MissingPaymentMethod);
        }
        Ok(())
    }
}

/// A finalized subscription: renewal date resolved and status consistent with it.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SubscriptionRecord {
    pub name: String,
    pub price: f64,
    pub currency: Currency,
    pub interval: BillingInterval,
    pub category: Option<Category>,
    pub payment_method: String,
    pub status: SubscriptionStatus,
    pub start_date: DateTime<Utc>,
    pub renewal_date: DateTime<Utc>,
}

impl AsRef<SubscriptionRecord> for SubscriptionRecord {
    fn as_ref(&self) -> &SubscriptionRecord {
        self
    }
}

impl From<SubscriptionRecord> for SubscriptionDraft {
    fn from(record: SubscriptionRecord) -> Self {
        Self {
            name: record.name,
            price: record.price,
            currency: record.currency,
            interval: record.interval,
            category: record.category,
            payment_method: record.payment_method,
            status: record.status,
            start_date: record.start_date,
            renewal_date: Some(record.renewal_date),
        }
    }
}

impl SubscriptionRecord {
    pub fn to_insert_entity(&self, user_id: Uuid, now: DateTime<Utc>) -> InsertSubscriptionEntity {
        InsertSubscriptionEntity {
            user_id,
            name: self.name.clone(),
            price: self.price,
            currency: self.currency.to_string(),
            billing_interval: self.interval.to_string(),
            category: self.category.map(|category| category.to_string()),
            payment_method: self.payment_method.clone(),
            status: self.status.to_string(),
            start_date: self.start_date,
            renewal_date: self.renewal_date,
            created_at: now,
            updated_at: now,
        }
    }

    pub fn to_update_entity(&self, now: DateTime<Utc>) -> UpdateSubscriptionEntity {
        UpdateSubscriptionEntity {
            name: self.name.clone(),
            price: self.price,
            currency: self.currency.to_string(),
            billing_interval: self.interval.to_string(),
            category: self.category.map(|category| category.to_string()),
            payment_method: self.payment_method.clone(),
            status: self.status.to_string(),
            start_date: self.start_date,
            renewal_date: self.renewal_date,
            updated_at: now,
        }
    }
}

/// Stored subscription as returned to API callers.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SubscriptionModel {
    pub id: Uuid,
    #[serde(rename = "user")]
    pub user_id: Uuid,
    #[serde(flatten)]
    pub record: SubscriptionRecord,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl AsRef<SubscriptionRecord> for SubscriptionModel {
    fn as_ref(&self) -> &SubscriptionRecord {
        &self.record
    }
}

impl TryFrom<SubscriptionEntity> for SubscriptionModel {
    type Error = ValidationError;

    fn try_from(entity: SubscriptionEntity) -> Result<Self, Self::Error> {
        let category = entity
            .category
            .as_deref()
            .map(str::parse::<Category>)
            .transpose()?;

        Ok(Self {
            id: entity.id,
            user_id: entity.user_id,
            record: SubscriptionRecord {
                name: entity.name,
                price: entity.price,
                currency: entity.currency.parse()?,
                interval: entity.billing_interval.parse()?,
                category,
                payment_method: entity.payment_method,
                status: entity.status.parse()?,
                start_date: entity.start_date,
                renewal_date: entity.renewal_date,
            },
            created_at: entity.created_at,
            updated_at: entity.updated_at,
        })
    }
}

/// Create request. Enumerated fields arrive as text so that unknown values
/// surface as `ValidationError` rather than a body rejection.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct InsertSubscriptionModel {
    pub name: String,
    pub price: f64,
    pub currency: Option<String>,
    pub interval: String,
    pub category: Option<String>,
    pub payment_method: String,
    pub status: Option<String>,
    pub start_date: DateTime<Utc>,
    pub renewal_date: Option<DateTime<Utc>>,
}

impl InsertSubscriptionModel {
    pub fn to_draft(&self) -> Result<SubscriptionDraft, ValidationError> {
        let draft = SubscriptionDraft {
            name: self.name.clone(),
            price: self.price,
            currency: parse_or_default(self.currency.as_deref())?,
            interval: self.interval.parse()?,
            category: self
                .category
                .as_deref()
                .map(str::parse::<Category>)
                .transpose()?,
            payment_method: self.payment_method.trim().to_string(),
            status: parse_or_default(self.status.as_deref())?,
            start_date: self.start_date,
            renewal_date: self.renewal_date,
        };
        draft.validate()?;
        Ok(draft)
    }
}

/// Partial update request. Absent fields keep their stored values. An
/// explicit `"category": null` clears the category.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UpdateSubscriptionModel {
    pub name: Option<String>,
    pub price: Option<f64>,
    pub currency: Option<String>,
    pub interval: Option<String>,
    #[serde(
        default,
        deserialize_with = "present_or_null",
        skip_serializing_if = "Option::is_none"
    )]
    pub category: Option<Option<String>>,
    pub payment_method: Option<String>,
    pub status: Option<String>,
    pub start_date: Option<DateTime<Utc>>,
    pub renewal_date: Option<DateTime<Utc>>,
}

impl UpdateSubscriptionModel {
    /// Whether the patch touches a field the lifecycle resolver depends on.
    pub fn touches_schedule(&self) -> bool {
        self.start_date.is_some() || self.interval.is_some() || self.renewal_date.is_some()
    }

    /// Applies the patch over `current`. When the start date or interval
    /// changes without an explicit renewal date, the stored renewal date is
    /// dropped so it gets derived again.
    pub fn apply_to(&self, current: SubscriptionRecord) -> Result<SubscriptionDraft, ValidationError> {
        let mut draft = SubscriptionDraft::from(current);

        if let Some(name) = &self.name {
            draft.name = name.clone();
        }
        if let Some(price) = self.price {
            draft.price = price;
        }
        if let Some(currency) = &self.currency {
            draft.currency = currency.parse()?;
        }
        match &self.category {
            Some(Some(category)) => draft.category = Some(category.parse()?),
            Some(None) => draft.category = None,
            None => {}
        }
        if let Some(payment_method) = &self.payment_method {
            draft.payment_method = payment_method.trim().to_string();
        }
        if let Some(status) = &self.status {
            draft.status = status.parse()?;
        }

        let mut reschedule = false;
        if let Some(interval) = &self.interval {
            let interval = interval.parse()?;
            reschedule |= interval != draft.interval;
            draft.interval = interval;
        }
        if let Some(start_date) = self.start_date {
            reschedule |= start_date != draft.start_date;
            draft.start_date = start_date;
        }
        match self.renewal_date {
            Some(renewal_date) => draft.renewal_date = Some(renewal_date),
            None if reschedule => draft.renewal_date = None,
            None => {}
        }

        draft.validate()?;
        Ok(draft)
    }
}

/// Tells a field sent as `null` (`Some(None)`) apart from an absent one
/// (`None`, through `#[serde(default)]`).
fn present_or_null<'de, D, T>(deserializer: D) -> Result<Option<Option<T>>, D::Error>
where
    D: Deserializer<'de>,
    T: Deserialize<'de>,
{
    Option::<T>::deserialize(deserializer).map(Some)
}

fn parse_or_default<T>(raw: Option<&str>) -> Result<T, ValidationError>
where
    T: std::str::FromStr<Err = ValidationError> + Default,
{
    raw.map(str::parse::<T>).transpose().map(Option::unwrap_or_default)
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn at(y: i32, m: u32, d: u32) -> DateTime<Utc> {
        Utc.with_ymd_and_hms(y, m, d, 0, 0, 0).unwrap()
    }

    fn insert_model() -> InsertSubscriptionModel {
        InsertSubscriptionModel {
            name: "Netflix".to_string(),
            price: 15.49,
            currency: None,
            interval: "monthly".to_string(),
            category: Some("entertainment".to_string()),
            payment_method: "  Visa 4242 ".to_string(),
            status: None,
            start_date: at(2024, 1, 1),
            renewal_date: None,
        }
    }

    fn stored_record() -> SubscriptionRecord {
        SubscriptionRecord {
            name: "Netflix".to_string(),
            price: 15.49,
            currency: Currency::USD,
            interval: BillingInterval::Monthly,
            category: Some(Category::Entertainment),
            payment_method: "Visa".to_string(),
            status: SubscriptionStatus::Active,
            start_date: at(2024, 1, 1),
            renewal_date: at(2024, 1, 31),
        }
    }

    #[test]
    fn insert_model_applies_defaults_and_trims_payment_method() {
        let draft = insert_model().to_draft().unwrap();

        assert_eq!(draft.currency, Currency::USD);
        assert_eq!(draft.status, SubscriptionStatus::Active);
        assert_eq!(draft.payment_method, "Visa 4242");
        assert_eq!(draft.category, Some(Category::Entertainment));
    }

    #[test]
    fn insert_model_rejects_unknown_interval() {
        let mut model = insert_model();
        model.interval = "fortnightly".to_string();

        assert_eq!(
            model.to_draft(),
            Err(ValidationError::UnknownInterval("fortnightly".to_string()))
        );
    }

    #[test]
    fn insert_model_rejects_unknown_currency() {
        let mut model = insert_model();
        model.currency = Some("JPY".to_string());

        assert_eq!(
            model.to_draft(),
            Err(ValidationError::UnknownCurrency("JPY".to_string()))
        );
    }

    #[test]
    fn validate_enforces_name_bounds() {
        let mut model = insert_model();
        model.name = "TV".to_string();
        assert_eq!(model.to_draft(), Err(ValidationError::SubscriptionNameLength));

        model.name = "x".repeat(51);
        assert_eq!(model.to_draft(), Err(ValidationError::SubscriptionNameLength));

        model.name = "x".repeat(50);
        assert!(model.to_draft().is_ok());
    }

    #[test]
    fn validate_rejects_negative_or_non_finite_price() {
        let mut model = insert_model();
        model.price = -0.01;
        assert_eq!(model.to_draft(), Err(ValidationError::NegativePrice));

        model.price = f64::NAN;
        assert_eq!(model.to_draft(), Err(ValidationError::NegativePrice));

        model.price = 0.0;
        assert!(model.to_draft().is_ok());
    }

    #[test]
    fn validate_requires_payment_method() {
        let mut model = insert_model();
        model.payment_method = "   ".to_string();

        assert_eq!(model.to_draft(), Err(ValidationError::MissingPaymentMethod));
    }

    #[test]
    fn patch_without_schedule_fields_keeps_renewal_date() {
        let patch = UpdateSubscriptionModel {
            price: Some(17.99),
            ..Default::default()
        };

        let draft = patch.apply_to(stored_record()).unwrap();

        assert!(!patch.touches_schedule());
        assert_eq!(draft.price, 17.99);
        assert_eq!(draft.renewal_date, Some(at(2024, 1, 31)));
    }

    #[test]
    fn patch_changing_interval_drops_stored_renewal_date() {
        let patch = UpdateSubscriptionModel {
            interval: Some("yearly".to_string()),
            ..Default::default()
        };

        let draft = patch.apply_to(stored_record()).unwrap();

        assert!(patch.touches_schedule());
        assert_eq!(draft.interval, BillingInterval::Yearly);
        assert_eq!(draft.renewal_date, None);
    }

    #[test]
    fn patch_with_same_interval_keeps_renewal_date() {
        let patch = UpdateSubscriptionModel {
            interval: Some("monthly".to_string()),
            ..Default::default()
        };

        let draft = patch.apply_to(stored_record()).unwrap();

        assert_eq!(draft.renewal_date, Some(at(2024, 1, 31)));
    }

    #[test]
    fn patch_with_explicit_renewal_date_wins_over_reschedule() {
        let patch = UpdateSubscriptionModel {
            start_date: Some(at(2024, 2, 1)),
            renewal_date: Some(at(2024, 2, 10)),
            ..Default::default()
        };

        let draft = patch.apply_to(stored_record()).unwrap();

        assert_eq!(draft.start_date, at(2024, 2, 1));
        assert_eq!(draft.renewal_date, Some(at(2024, 2, 10)));
    }

    #[test]
    fn patch_with_null_category_clears_it() {
        let patch: UpdateSubscriptionModel =
            serde_json::from_str(r#"{"category": null}"#).unwrap();

        let draft = patch.apply_to(stored_record()).unwrap();

        assert_eq!(patch.category, Some(None));
        assert_eq!(draft.category, None);
    }

    #[test]
    fn patch_without_category_keeps_it() {
        let patch: UpdateSubscriptionModel = serde_json::from_str(r#"{"price": 17.99}"#).unwrap();

        let draft = patch.apply_to(stored_record()).unwrap();

        assert_eq!(patch.category, None);
        assert_eq!(draft.category, Some(Category::Entertainment));
    }

    #[test]
    fn patch_with_category_replaces_it() {
        let patch: UpdateSubscriptionModel =
            serde_json::from_str(r#"{"category": "education"}"#).unwrap();

        let draft = patch.apply_to(stored_record()).unwrap();

        assert_eq!(draft.category, Some(Category::Education));
    }

    #[test]
    fn entity_with_unknown_status_fails_conversion() {
        let entity = SubscriptionEntity {
            id: Uuid::new_v4(),
            user_id: Uuid::new_v4(),
            name: "Spotify".to_string(),
            price: 9.99,
            currency: "EUR".to_string(),
            billing_interval: "monthly".to_string(),
            category: None,
            payment_method: "Visa".to_string(),
            status: "paused".to_string(),
            start_date: at(2024, 1, 1),
            renewal_date: at(2024, 1, 31),
            created_at: at(2024, 1, 1),
            updated_at: at(2024, 1, 1),
        };

        assert_eq!(
            SubscriptionModel::try_from(entity),
            Err(ValidationError::UnknownStatus("paused".to_string()))
        );
    }

    #[test]
    fn model_serializes_flat_camel_case() {
        let model = SubscriptionModel {
            id: Uuid::nil(),
            user_id: Uuid::nil(),
            record: stored_record(),
            created_at: at(2024, 1, 1),
            updated_at: at(2024, 1, 1),
        };

        let json = serde_json::to_value(&model).unwrap();

        assert_eq!(json["user"], Uuid::nil().to_string());
        assert_eq!(json["interval"], "monthly");
        assert_eq!(json["currency"], "USD");
        assert_eq!(json["paymentMethod"], "Visa");
        assert_eq!(json["renewalDate"], "2024-01-31T00:00:00Z");
    }
}
