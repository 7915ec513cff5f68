use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

pub type AccountId = Uuid;

/// Chart-of-accounts classification. Determines the normal balance side
/// and the leading digit of the account code.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AccountType {
    /// Cash, bank, receivables, inventory - things the business owns
    Asset,
    /// Payables, loans, tax owed - debts of the business
    Liability,
    /// Owner capital and retained earnings
    Equity,
    /// Sales and other income
    Revenue,
    /// Cost of goods sold, operating expenses
    Expense,
}

/// Which side increases an account of a given type.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum NormalBalance {
    Debit,
    Credit,
}

impl AccountType {
    pub fn as_str(&self) -> &'static str {
        match self {
            AccountType::Asset => "asset",
            AccountType::Liability => "liability",
            AccountType::Equity => "equity",
            AccountType::Revenue => "revenue",
            AccountType::Expense => "expense",
        }
    }

    pub fn from_str(s: &str) -> Option<Self> {
        match s.to_lowercase().as_str() {
            "asset" => Some(AccountType::Asset),
            "liability" => Some(AccountType::Liability),
            "equity" => Some(AccountType::Equity),
            "revenue" => Some(AccountType::Revenue),
            "expense" => Some(AccountType::Expense),
            _ => None,
        }
    }

    pub fn normal_balance(&self) -> NormalBalance {
        match self {
            AccountType::Asset | AccountType::Expense => NormalBalance::Debit,
            AccountType::Liability | AccountType::Equity | AccountType::Revenue => {
                NormalBalance::Credit
            }
        }
    }

    /// Leading code digit for this type. Code ranges partition types:
    /// 1xxx asset, 2xxx liability, 3xxx equity, 4xxx revenue, 5xxx expense.
    pub fn code_prefix(&self) -> char {
        match self {
            AccountType::Asset => '1',
            AccountType::Liability => '2',
            AccountType::Equity => '3',
            AccountType::Revenue => '4',
            AccountType::Expense => '5',
        }
    }

    /// Infer the type from a code's leading digit.
    pub fn for_code(code: &str) -> Option<Self> {
        match code.chars().next()? {
            '1' => Some(AccountType::Asset),
            '2' => Some(AccountType::Liability),
            '3' => Some(AccountType::Equity),
            '4' => Some(AccountType::Revenue),
            '5' => Some(AccountType::Expense),
            _ => None,
        }
    }
}

impl std::fmt::Display for AccountType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// A chart-of-accounts node. Created at setup, rarely mutated, never
/// deleted once referenced by a journal line.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Account {
    pub id: AccountId,
    /// Sortable code, e.g. "1200". The leading digit matches the type.
    pub code: String,
    pub name: String,
    pub account_type: AccountType,
    pub created_at: DateTime<Utc>,
}

impl Account {
    pub fn new(code: impl Into<String>, name: impl Into<String>, account_type: AccountType) -> Self {
        Self {
            id: Uuid::new_v4(),
            code: code.into(),
            name: name.into(),
            account_type,
            created_at: Utc::now(),
        }
    }

    /// True when the code's leading digit matches the declared type.
    pub fn code_matches_type(&self) -> bool {
        self.code.starts_with(self.account_type.code_prefix())
    }

    pub fn normal_balance(&self) -> NormalBalance {
        self.account_type.normal_balance()
    }

    /// Default chart seeded by `init`. Codes are referenced by the
    /// default posting settings.
    pub fn default_chart() -> Vec<Account> {
        vec![
            Account::new("1000", "Cash", AccountType::Asset),
            Account::new("1100", "Accounts Receivable", AccountType::Asset),
            Account::new("1200", "Inventory", AccountType::Asset),
            Account::new("1500", "Fixed Assets", AccountType::Asset),
            Account::new("2000", "Accounts Payable", AccountType::Liability),
            Account::new("2100", "Tax Payable", AccountType::Liability),
            Account::new("3000", "Owner Equity", AccountType::Equity),
            Account::new("4000", "Sales Revenue", AccountType::Revenue),
            Account::new("5000", "Operating Expenses", AccountType::Expense),
            Account::new("5100", "Cost of Goods Sold", AccountType::Expense),
        ]
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_account_type_roundtrip() {
        for at in [
            AccountType::Asset,
            AccountType::Liability,
            AccountType::Equity,
            AccountType::Revenue,
            AccountType::Expense,
        ] {
            let s = at.as_str();
            let parsed = AccountType::from_str(s).unwrap();
            assert_eq!(at, parsed);
        }
    }

    #[test]
    fn test_normal_balances() {
        assert_eq!(AccountType::Asset.normal_balance(), NormalBalance::Debit);
        assert_eq!(AccountType::Expense.normal_balance(), NormalBalance::Debit);
        assert_eq!(
            AccountType::Liability.normal_balance(),
            NormalBalance::Credit
        );
        assert_eq!(AccountType::Equity.normal_balance(), NormalBalance::Credit);
        assert_eq!(AccountType::Revenue.normal_balance(), NormalBalance::Credit);
    }

    #[test]
    fn test_code_ranges_partition_types() {
        assert_eq!(AccountType::for_code("1200"), Some(AccountType::Asset));
        assert_eq!(AccountType::for_code("2100"), Some(AccountType::Liability));
        assert_eq!(AccountType::for_code("3000"), Some(AccountType::Equity));
        assert_eq!(AccountType::for_code("4000"), Some(AccountType::Revenue));
        assert_eq!(AccountType::for_code("5100"), Some(AccountType::Expense));
        assert_eq!(AccountType::for_code("9999"), None);
    }

    #[test]
    fn test_default_chart_codes_match_types() {
        for account in Account::default_chart() {
            assert!(
                account.code_matches_type(),
                "account {} violates its code range",
                account.code
            );
        }
    }
}
