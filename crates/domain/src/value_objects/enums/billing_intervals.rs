use std::{fmt::Display, str::FromStr};

use chrono::Duration;
use serde::{Deserialize, Serialize};

use crate::errors::ValidationError;

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "lowercase")]
pub enum BillingInterval {
    Daily,
    Weekly,
    Monthly,
    Yearly,
}

impl BillingInterval {
    pub const ALL: [BillingInterval; 4] = [
        BillingInterval::Daily,
        BillingInterval::Weekly,
        BillingInterval::Monthly,
        BillingInterval::Yearly,
    ];

    /// Fixed day count used to derive a default renewal date and to size the
    /// upcoming-renewal window. Months are 30 days and years 365, with no
    /// calendar arithmetic.
    pub fn look_ahead_days(self) -> i64 {
        match self {
            BillingInterval::Daily => 1,
            BillingInterval::Weekly => 7,
            BillingInterval::Monthly => 30,
            BillingInterval::Yearly => 365,
        }
    }

    pub fn look_ahead(self) -> Duration {
        Duration::days(self.look_ahead_days())
    }

    /// Normalizes one charge of this interval to a monthly amount
    /// (30 days, 4 weeks or a twelfth of a year per month).
    pub fn monthly_amount(self, price: f64) -> f64 {
        match self {
            BillingInterval::Daily => price * 30.0,
            BillingInterval::Weekly => price * 4.0,
            BillingInterval::Monthly => price,
            BillingInterval::Yearly => price / 12.0,
        }
    }
}

impl Display for BillingInterval {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let interval = match self {
            BillingInterval::Daily => "daily",
            BillingInterval::Weekly => "weekly",
            BillingInterval::Monthly => "monthly",
            BillingInterval::Yearly => "yearly",
        };
        write!(f, "{}", interval)
    }
}

impl FromStr for BillingInterval {
    type Err = ValidationError;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        match value {
            "daily" => Ok(BillingInterval::Daily),
            "weekly" => Ok(BillingInterval::Weekly),
            "monthly" => Ok(BillingInterval::Monthly),
            "yearly" => Ok(BillingInterval::Yearly),
            other => Err(ValidationError::UnknownInterval(other.to_string())),
        }
    }
}
