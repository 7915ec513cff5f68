use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::{Cents, round_cents};

/// A dated conversion fact: one per currency pair per day. Same-day
/// reciprocal rates are derivable (rate' = 1/rate); there is no
/// historical interpolation.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ExchangeRate {
    pub id: Uuid,
    pub from_currency: String,
    pub to_currency: String,
    pub rate: f64,
    pub effective_date: NaiveDate,
}

impl ExchangeRate {
    pub fn new(
        from_currency: impl Into<String>,
        to_currency: impl Into<String>,
        rate: f64,
        effective_date: NaiveDate,
    ) -> Self {
        Self {
            id: Uuid::new_v4(),
            from_currency: from_currency.into().to_uppercase(),
            to_currency: to_currency.into().to_uppercase(),
            rate,
            effective_date,
        }
    }

    /// Apply this rate to an amount.
    pub fn apply(&self, amount: Cents) -> Cents {
        round_cents(amount as f64 * self.rate)
    }

    /// Apply the reciprocal of this rate (for inverse-pair lookups).
    pub fn apply_inverse(&self, amount: Cents) -> Cents {
        round_cents(amount as f64 / self.rate)
    }
}
