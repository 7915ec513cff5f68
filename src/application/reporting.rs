use chrono::NaiveDate;

use crate::application::currency::CurrencyService;
use crate::application::error::AppError;
use crate::application::settings::SettingsCache;
use crate::domain::{
    AccountType, Cents, DepreciationRow, DocumentKind, FixedAsset, NormalBalance,
};
use crate::storage::Repository;

#[derive(Debug, Clone)]
pub struct TrialBalanceRow {
    pub code: String,
    pub name: String,
    pub debit: Cents,
    pub credit: Cents,
}

#[derive(Debug, Clone)]
pub struct TrialBalance {
    pub as_of: NaiveDate,
    pub rows: Vec<TrialBalanceRow>,
    pub total_debits: Cents,
    pub total_credits: Cents,
}

impl TrialBalance {
    pub fn is_balanced(&self) -> bool {
        self.total_debits == self.total_credits
    }
}

#[derive(Debug, Clone)]
pub struct ReportRow {
    pub code: String,
    pub name: String,
    pub amount: Cents,
}

#[derive(Debug, Clone)]
pub struct ProfitAndLoss {
    pub from: NaiveDate,
    pub to: NaiveDate,
    pub revenue: Vec<ReportRow>,
    pub expenses: Vec<ReportRow>,
    pub total_revenue: Cents,
    pub total_expenses: Cents,
    pub net_income: Cents,
}

#[derive(Debug, Clone)]
pub struct BalanceSheet {
    pub as_of: NaiveDate,
    pub assets: Vec<ReportRow>,
    pub liabilities: Vec<ReportRow>,
    pub equity: Vec<ReportRow>,
    /// Cumulative net income folded into equity
    pub retained_earnings: Cents,
    pub total_assets: Cents,
    pub total_liabilities: Cents,
    pub total_equity: Cents,
}

impl BalanceSheet {
    pub fn balances(&self) -> bool {
        self.total_assets == self.total_liabilities + self.total_equity
    }
}

/// Days-overdue buckets for receivable/payable aging.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AgingBucket {
    Current,
    Days1To30,
    Days31To60,
    Days61To90,
    Over90,
}

impl AgingBucket {
    pub fn for_days_overdue(days: i64) -> Self {
        match days {
            i64::MIN..=0 => AgingBucket::Current,
            1..=30 => AgingBucket::Days1To30,
            31..=60 => AgingBucket::Days31To60,
            61..=90 => AgingBucket::Days61To90,
            _ => AgingBucket::Over90,
        }
    }

    pub fn label(&self) -> &'static str {
        match self {
            AgingBucket::Current => "current",
            AgingBucket::Days1To30 => "1-30",
            AgingBucket::Days31To60 => "31-60",
            AgingBucket::Days61To90 => "61-90",
            AgingBucket::Over90 => ">90",
        }
    }

    pub const ALL: [AgingBucket; 5] = [
        AgingBucket::Current,
        AgingBucket::Days1To30,
        AgingBucket::Days31To60,
        AgingBucket::Days61To90,
        AgingBucket::Over90,
    ];

    fn index(&self) -> usize {
        match self {
            AgingBucket::Current => 0,
            AgingBucket::Days1To30 => 1,
            AgingBucket::Days31To60 => 2,
            AgingBucket::Days61To90 => 3,
            AgingBucket::Over90 => 4,
        }
    }
}

#[derive(Debug, Clone)]
pub struct AgingRow {
    pub number: String,
    pub party_name: String,
    pub due_date: NaiveDate,
    pub days_overdue: i64,
    pub currency: String,
    /// Outstanding amount in the document's currency
    pub outstanding: Cents,
    /// Converted to the reporting currency; None when no rate exists
    pub outstanding_converted: Option<Cents>,
    pub bucket: AgingBucket,
}

#[derive(Debug, Clone)]
pub struct AgingReport {
    pub kind: DocumentKind,
    pub as_of: NaiveDate,
    /// Reporting currency for the bucket totals
    pub currency: String,
    pub rows: Vec<AgingRow>,
    /// Totals per bucket in `AgingBucket::ALL` order. Unconverted
    /// amounts are added at face value and flagged below.
    pub bucket_totals: [Cents; 5],
    pub total: Cents,
    /// True when any row could not be converted to the reporting
    /// currency
    pub has_unconverted: bool,
}

/// Read-side aggregation over posted ledger lines and open documents.
/// Never mutates anything.
#[derive(Clone)]
pub struct ReportingEngine {
    repo: Repository,
    currency: CurrencyService,
    settings: SettingsCache,
}

impl ReportingEngine {
    pub fn new(repo: Repository, currency: CurrencyService, settings: SettingsCache) -> Self {
        Self {
            repo,
            currency,
            settings,
        }
    }

    /// Trial balance as of a date. Net debit balances land in the debit
    /// column and vice versa; zero-activity accounts are omitted.
    pub async fn trial_balance(&self, as_of: NaiveDate) -> Result<TrialBalance, AppError> {
        let sums = self.repo.account_sums(None, as_of).await?;
        let mut rows = Vec::new();
        let mut total_debits = 0;
        let mut total_credits = 0;
        for sum in sums {
            let net = sum.debit - sum.credit;
            if net == 0 {
                continue;
            }
            let (debit, credit) = if net > 0 { (net, 0) } else { (0, -net) };
            total_debits += debit;
            total_credits += credit;
            rows.push(TrialBalanceRow {
                code: sum.code,
                name: sum.name,
                debit,
                credit,
            });
        }
        Ok(TrialBalance {
            as_of,
            rows,
            total_debits,
            total_credits,
        })
    }

    /// Profit and loss over a period: revenue and expense activity,
    /// each stated on its normal side.
    pub async fn profit_and_loss(
        &self,
        from: NaiveDate,
        to: NaiveDate,
    ) -> Result<ProfitAndLoss, AppError> {
        let sums = self.repo.account_sums(Some(from), to).await?;
        let mut revenue = Vec::new();
        let mut expenses = Vec::new();
        let mut total_revenue = 0;
        let mut total_expenses = 0;
        for sum in sums {
            match sum.account_type {
                AccountType::Revenue => {
                    let amount = sum.credit - sum.debit;
                    if amount != 0 {
                        total_revenue += amount;
                        revenue.push(ReportRow {
                            code: sum.code,
                            name: sum.name,
                            amount,
                        });
                    }
                }
                AccountType::Expense => {
                    let amount = sum.debit - sum.credit;
                    if amount != 0 {
                        total_expenses += amount;
                        expenses.push(ReportRow {
                            code: sum.code,
                            name: sum.name,
                            amount,
                        });
                    }
                }
                _ => {}
            }
        }
        Ok(ProfitAndLoss {
            from,
            to,
            revenue,
            expenses,
            total_revenue,
            total_expenses,
            net_income: total_revenue - total_expenses,
        })
    }

    /// Balance sheet as of a date. Cumulative net income to date is
    /// folded into equity as retained earnings, which is what keeps
    /// assets equal to liabilities plus equity.
    pub async fn balance_sheet(&self, as_of: NaiveDate) -> Result<BalanceSheet, AppError> {
        let sums = self.repo.account_sums(None, as_of).await?;
        let mut assets = Vec::new();
        let mut liabilities = Vec::new();
        let mut equity = Vec::new();
        let mut total_assets = 0;
        let mut total_liabilities = 0;
        let mut total_equity = 0;
        let mut retained_earnings = 0;

        for sum in sums {
            let amount = match sum.account_type.normal_balance() {
                NormalBalance::Debit => sum.debit - sum.credit,
                NormalBalance::Credit => sum.credit - sum.debit,
            };
            match sum.account_type {
                AccountType::Asset => {
                    if amount != 0 {
                        total_assets += amount;
                        assets.push(ReportRow {
                            code: sum.code,
                            name: sum.name,
                            amount,
                        });
                    }
                }
                AccountType::Liability => {
                    if amount != 0 {
                        total_liabilities += amount;
                        liabilities.push(ReportRow {
                            code: sum.code,
                            name: sum.name,
                            amount,
                        });
                    }
                }
                AccountType::Equity => {
                    if amount != 0 {
                        total_equity += amount;
                        equity.push(ReportRow {
                            code: sum.code,
                            name: sum.name,
                            amount,
                        });
                    }
                }
                AccountType::Revenue => retained_earnings += amount,
                AccountType::Expense => retained_earnings -= amount,
            }
        }
        total_equity += retained_earnings;

        Ok(BalanceSheet {
            as_of,
            assets,
            liabilities,
            equity,
            retained_earnings,
            total_assets,
            total_liabilities,
            total_equity,
        })
    }

    /// Receivable/payable aging: open documents bucketed by days
    /// overdue, amounts converted to the base currency where a rate
    /// exists. Missing rates fall back to face value and raise the
    /// `has_unconverted` caveat.
    pub async fn aging(
        &self,
        kind: DocumentKind,
        as_of: NaiveDate,
    ) -> Result<AgingReport, AppError> {
        let base = self.settings.get().await?.base_currency.clone();
        let documents = self.repo.open_documents(kind).await?;

        let mut rows = Vec::with_capacity(documents.len());
        let mut bucket_totals = [0; 5];
        let mut total = 0;
        let mut has_unconverted = false;

        for document in documents {
            let outstanding = document.outstanding();
            let days_overdue = (as_of - document.due_date).num_days();
            let bucket = AgingBucket::for_days_overdue(days_overdue);
            let converted = self
                .currency
                .convert(outstanding, &document.currency, &base, as_of)
                .await?;
            let contribution = match converted {
                Some(amount) => amount,
                None => {
                    has_unconverted = true;
                    outstanding
                }
            };
            bucket_totals[bucket.index()] += contribution;
            total += contribution;
            rows.push(AgingRow {
                number: document.number,
                party_name: document.party_name,
                due_date: document.due_date,
                days_overdue,
                currency: document.currency,
                outstanding,
                outstanding_converted: converted,
                bucket,
            });
        }

        Ok(AgingReport {
            kind,
            as_of,
            currency: base,
            rows,
            bucket_totals,
            total,
            has_unconverted,
        })
    }

    /// Straight-line depreciation schedules for every registered asset.
    pub async fn depreciation_schedules(
        &self,
    ) -> Result<Vec<(FixedAsset, Vec<DepreciationRow>)>, AppError> {
        let assets = self.repo.list_assets().await?;
        Ok(assets
            .into_iter()
            .map(|asset| {
                let schedule = asset.schedule();
                (asset, schedule)
            })
            .collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_bucket_boundaries() {
        assert_eq!(AgingBucket::for_days_overdue(-5), AgingBucket::Current);
        assert_eq!(AgingBucket::for_days_overdue(0), AgingBucket::Current);
        assert_eq!(AgingBucket::for_days_overdue(1), AgingBucket::Days1To30);
        assert_eq!(AgingBucket::for_days_overdue(30), AgingBucket::Days1To30);
        assert_eq!(AgingBucket::for_days_overdue(31), AgingBucket::Days31To60);
        assert_eq!(AgingBucket::for_days_overdue(60), AgingBucket::Days31To60);
        assert_eq!(AgingBucket::for_days_overdue(61), AgingBucket::Days61To90);
        assert_eq!(AgingBucket::for_days_overdue(90), AgingBucket::Days61To90);
        assert_eq!(AgingBucket::for_days_overdue(91), AgingBucket::Over90);
    }
}
