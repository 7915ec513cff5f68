use tracing::info;

use crate::application::assets::AssetRegistry;
use crate::application::currency::CurrencyService;
use crate::application::documents::DocumentEngine;
use crate::application::error::AppError;
use crate::application::inventory::InventoryEngine;
use crate::application::ledger::LedgerEngine;
use crate::application::payments::PaymentEngine;
use crate::application::reporting::ReportingEngine;
use crate::application::settings::SettingsCache;
use crate::domain::Account;
use crate::storage::Repository;

/// The whole engine behind one handle: a repository plus every engine
/// wired over it. The CLI and the integration tests both consume this.
#[derive(Clone)]
pub struct Books {
    repo: Repository,
    pub settings: SettingsCache,
    pub ledger: LedgerEngine,
    pub currency: CurrencyService,
    pub inventory: InventoryEngine,
    pub payments: PaymentEngine,
    pub documents: DocumentEngine,
    pub assets: AssetRegistry,
    pub reporting: ReportingEngine,
}

fn database_url(path: &str) -> String {
    format!("sqlite://{path}?mode=rwc")
}

impl Books {
    /// Create (or migrate) the database at `path` and seed the default
    /// chart of accounts and settings.
    pub async fn init(path: &str) -> Result<Self, AppError> {
        let repo = Repository::init(&database_url(path)).await?;
        let books = Self::wire(repo);
        books.seed_defaults().await?;
        info!(path, "books initialized");
        Ok(books)
    }

    /// Open an existing database at `path`.
    pub async fn connect(path: &str) -> Result<Self, AppError> {
        let repo = Repository::connect(&database_url(path)).await?;
        Ok(Self::wire(repo))
    }

    fn wire(repo: Repository) -> Self {
        let settings = SettingsCache::new(repo.clone());
        let ledger = LedgerEngine::new(repo.clone());
        let currency = CurrencyService::new(repo.clone());
        let inventory = InventoryEngine::new(repo.clone(), ledger.clone(), settings.clone());
        let payments = PaymentEngine::new(repo.clone(), ledger.clone(), settings.clone());
        let documents = DocumentEngine::new(
            repo.clone(),
            ledger.clone(),
            inventory.clone(),
            payments.clone(),
            settings.clone(),
        );
        let assets = AssetRegistry::new(repo.clone());
        let reporting = ReportingEngine::new(repo.clone(), currency.clone(), settings.clone());
        Self {
            repo,
            settings,
            ledger,
            currency,
            inventory,
            payments,
            documents,
            assets,
            reporting,
        }
    }

    /// Seed the default chart and base currency. Safe to re-run:
    /// existing accounts and settings are left alone.
    async fn seed_defaults(&self) -> Result<(), AppError> {
        for account in Account::default_chart() {
            if self
                .repo
                .get_account_by_code(&account.code)
                .await?
                .is_none()
            {
                self.repo.save_account(&account).await?;
            }
        }
        if self.repo.get_setting("base_currency").await?.is_none() {
            self.repo.put_setting("base_currency", "USD").await?;
        }
        Ok(())
    }

    pub fn repository(&self) -> &Repository {
        &self.repo
    }
}
