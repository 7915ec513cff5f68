use chrono::{DateTime, Datelike, Months, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::Cents;

pub type AssetId = Uuid;

/// Straight-line is the only supported method in current scope.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DepreciationMethod {
    StraightLine,
}

impl DepreciationMethod {
    pub fn as_str(&self) -> &'static str {
        match self {
            DepreciationMethod::StraightLine => "straight_line",
        }
    }

    pub fn from_str(s: &str) -> Option<Self> {
        match s {
            "straight_line" => Some(DepreciationMethod::StraightLine),
            _ => None,
        }
    }
}

/// A capitalized asset depreciated monthly down to its residual value.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FixedAsset {
    pub id: AssetId,
    pub name: String,
    pub purchase_date: NaiveDate,
    pub cost: Cents,
    pub residual_value: Cents,
    pub useful_life_months: u32,
    pub method: DepreciationMethod,
    pub created_at: DateTime<Utc>,
}

/// One row of a depreciation schedule.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DepreciationRow {
    pub period: NaiveDate,
    pub depreciation: Cents,
    pub accumulated: Cents,
    pub book_value: Cents,
}

impl FixedAsset {
    pub fn new(
        name: impl Into<String>,
        purchase_date: NaiveDate,
        cost: Cents,
        residual_value: Cents,
        useful_life_months: u32,
    ) -> Self {
        Self {
            id: Uuid::new_v4(),
            name: name.into(),
            purchase_date,
            cost,
            residual_value,
            useful_life_months,
            method: DepreciationMethod::StraightLine,
            created_at: Utc::now(),
        }
    }

    /// Total amount that will ever be depreciated.
    pub fn depreciable_base(&self) -> Cents {
        (self.cost - self.residual_value).max(0)
    }

    /// Straight-line monthly charge: (cost - residual) / useful life.
    pub fn monthly_depreciation(&self) -> Cents {
        if self.useful_life_months == 0 {
            return 0;
        }
        self.depreciable_base() / self.useful_life_months as Cents
    }

    /// Accumulated depreciation after `months_elapsed` full months,
    /// capped at the depreciable base.
    pub fn accumulated_after(&self, months_elapsed: u32) -> Cents {
        (self.monthly_depreciation() * months_elapsed as Cents).min(self.depreciable_base())
    }

    /// Book value as of a date: cost - accumulated, never below residual.
    pub fn book_value_as_of(&self, as_of: NaiveDate) -> Cents {
        self.cost - self.accumulated_after(months_elapsed(self.purchase_date, as_of))
    }

    /// Monthly schedule rows. Rows stop once book value reaches the
    /// residual value; a shorter final row absorbs integer remainder.
    pub fn schedule(&self) -> Vec<DepreciationRow> {
        let monthly = self.monthly_depreciation();
        let base = self.depreciable_base();
        if monthly == 0 || base == 0 {
            return Vec::new();
        }

        let mut rows = Vec::new();
        let mut accumulated: Cents = 0;
        let mut month: u32 = 1;
        while accumulated < base {
            let charge = if month >= self.useful_life_months {
                base - accumulated
            } else {
                monthly.min(base - accumulated)
            };
            accumulated += charge;
            let period = self
                .purchase_date
                .checked_add_months(Months::new(month))
                .unwrap_or(self.purchase_date);
            rows.push(DepreciationRow {
                period,
                depreciation: charge,
                accumulated,
                book_value: self.cost - accumulated,
            });
            month += 1;
        }
        rows
    }
}

/// Full months elapsed between two dates (0 when `as_of` precedes the
/// start or the month-day has not come around yet).
pub fn months_elapsed(start: NaiveDate, as_of: NaiveDate) -> u32 {
    if as_of <= start {
        return 0;
    }
    let mut months =
        (as_of.year() - start.year()) * 12 + (as_of.month() as i32 - start.month() as i32);
    if as_of.day() < start.day() {
        months -= 1;
    }
    months.max(0) as u32
}
