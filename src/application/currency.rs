use chrono::NaiveDate;
use tracing::info;

use crate::application::error::AppError;
use crate::domain::{Cents, ExchangeRate};
use crate::storage::Repository;

/// Dated currency conversion over stored rate facts. Absence of a rate
/// is a soft failure (`None`); reporting callers fall back to the
/// unconverted amount and flag the caveat.
#[derive(Clone)]
pub struct CurrencyService {
    repo: Repository,
}

impl CurrencyService {
    pub fn new(repo: Repository) -> Self {
        Self { repo }
    }

    /// Record the day's rate fact for a pair, overwriting any earlier
    /// fact for the same pair and date.
    pub async fn set_rate(
        &self,
        from: &str,
        to: &str,
        rate: f64,
        effective_date: NaiveDate,
    ) -> Result<ExchangeRate, AppError> {
        if rate <= 0.0 || !rate.is_finite() {
            return Err(AppError::InvalidAmount(format!("exchange rate {rate}")));
        }
        let fact = ExchangeRate::new(from, to, rate, effective_date);
        self.repo.upsert_rate(&fact).await?;
        info!(from = %fact.from_currency, to = %fact.to_currency, rate, %effective_date, "rate set");
        Ok(fact)
    }

    /// Convert an amount between currencies as of a date. Identity on
    /// the same currency; direct pair at the most recent effective date
    /// on or before the requested one; else the reciprocal of the
    /// inverse pair. No interpolation.
    pub async fn convert(
        &self,
        amount: Cents,
        from: &str,
        to: &str,
        as_of: NaiveDate,
    ) -> Result<Option<Cents>, AppError> {
        let from = from.to_uppercase();
        let to = to.to_uppercase();
        if from == to {
            return Ok(Some(amount));
        }

        if let Some(rate) = self.repo.latest_rate(&from, &to, as_of).await? {
            return Ok(Some(rate.apply(amount)));
        }
        if let Some(rate) = self.repo.latest_rate(&to, &from, as_of).await? {
            return Ok(Some(rate.apply_inverse(amount)));
        }
        Ok(None)
    }
}
