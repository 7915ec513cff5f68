mod assets;
mod currency;
mod documents;
mod error;
mod inventory;
mod ledger;
mod payments;
mod reporting;
mod service;
mod settings;

pub use assets::AssetRegistry;
pub use currency::CurrencyService;
pub use documents::{
    DocumentEngine, FinalizeOutcome, NewDocument, NewDocumentLine, StockOutcome, VoidOutcome,
};
pub use error::AppError;
pub use inventory::{ConsumeResult, InventoryEngine, ReverseResult};
pub use ledger::{LedgerEngine, NewEntry};
pub use payments::{PaymentEngine, PaymentResult};
pub use reporting::{
    AgingBucket, AgingReport, AgingRow, BalanceSheet, ProfitAndLoss, ReportRow, ReportingEngine,
    TrialBalance, TrialBalanceRow,
};
pub use service::Books;
pub use settings::{Clock, PostingAccounts, Settings, SettingsCache};
