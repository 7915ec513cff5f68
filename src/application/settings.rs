use std::sync::{Arc, Mutex};

use chrono::{DateTime, Duration, Utc};

use crate::application::error::AppError;
use crate::storage::Repository;

/// Account codes the engines post against. Stored per-company in the
/// settings table; these defaults match the seeded chart.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PostingAccounts {
    pub cash: String,
    pub receivable: String,
    pub inventory: String,
    pub payable: String,
    pub tax: String,
    pub sales: String,
    pub expenses: String,
    pub cogs: String,
}

impl Default for PostingAccounts {
    fn default() -> Self {
        Self {
            cash: "1000".to_string(),
            receivable: "1100".to_string(),
            inventory: "1200".to_string(),
            payable: "2000".to_string(),
            tax: "2100".to_string(),
            sales: "4000".to_string(),
            expenses: "5000".to_string(),
            cogs: "5100".to_string(),
        }
    }
}

/// Company-wide settings read by every engine.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Settings {
    pub base_currency: String,
    pub accounts: PostingAccounts,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            base_currency: "USD".to_string(),
            accounts: PostingAccounts::default(),
        }
    }
}

impl Settings {
    /// Build settings from stored key/value pairs, falling back to the
    /// defaults for anything missing.
    pub fn from_pairs(pairs: &[(String, String)]) -> Self {
        let mut settings = Settings::default();
        for (key, value) in pairs {
            match key.as_str() {
                "base_currency" => settings.base_currency = value.to_uppercase(),
                "account.cash" => settings.accounts.cash = value.clone(),
                "account.receivable" => settings.accounts.receivable = value.clone(),
                "account.inventory" => settings.accounts.inventory = value.clone(),
                "account.payable" => settings.accounts.payable = value.clone(),
                "account.tax" => settings.accounts.tax = value.clone(),
                "account.sales" => settings.accounts.sales = value.clone(),
                "account.expenses" => settings.accounts.expenses = value.clone(),
                "account.cogs" => settings.accounts.cogs = value.clone(),
                _ => {}
            }
        }
        settings
    }
}

/// Clock used by the cache, injectable so tests can control expiry.
pub type Clock = Arc<dyn Fn() -> DateTime<Utc> + Send + Sync>;

struct CacheState {
    loaded_at: DateTime<Utc>,
    settings: Arc<Settings>,
}

/// Read-through settings cache with a TTL. Writers go through `put`,
/// which invalidates, so stale reads last at most one TTL.
#[derive(Clone)]
pub struct SettingsCache {
    repo: Repository,
    ttl: Duration,
    clock: Clock,
    state: Arc<Mutex<Option<CacheState>>>,
}

impl SettingsCache {
    pub const DEFAULT_TTL_SECS: i64 = 60;

    pub fn new(repo: Repository) -> Self {
        Self::with_clock(repo, Duration::seconds(Self::DEFAULT_TTL_SECS), Arc::new(Utc::now))
    }

    pub fn with_clock(repo: Repository, ttl: Duration, clock: Clock) -> Self {
        Self {
            repo,
            ttl,
            clock,
            state: Arc::new(Mutex::new(None)),
        }
    }

    /// Current settings, served from cache while fresh.
    pub async fn get(&self) -> Result<Arc<Settings>, AppError> {
        let now = (self.clock)();
        {
            let state = self.state.lock().unwrap();
            if let Some(cached) = state.as_ref() {
                if now - cached.loaded_at < self.ttl {
                    return Ok(Arc::clone(&cached.settings));
                }
            }
        }

        let pairs = self.repo.all_settings().await?;
        let settings = Arc::new(Settings::from_pairs(&pairs));
        let mut state = self.state.lock().unwrap();
        *state = Some(CacheState {
            loaded_at: now,
            settings: Arc::clone(&settings),
        });
        Ok(settings)
    }

    /// Drop the cached value so the next `get` reloads.
    pub fn invalidate(&self) {
        let mut state = self.state.lock().unwrap();
        *state = None;
    }

    /// Persist one setting and invalidate the cache.
    pub async fn put(&self, key: &str, value: &str) -> Result<(), AppError> {
        self.repo.put_setting(key, value).await?;
        self.invalidate();
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let settings = Settings::default();
        assert_eq!(settings.base_currency, "USD");
        assert_eq!(settings.accounts.cash, "1000");
        assert_eq!(settings.accounts.cogs, "5100");
    }

    #[test]
    fn test_from_pairs_overrides_and_normalizes() {
        let pairs = vec![
            ("base_currency".to_string(), "eur".to_string()),
            ("account.cash".to_string(), "1010".to_string()),
            ("unknown.key".to_string(), "ignored".to_string()),
        ];
        let settings = Settings::from_pairs(&pairs);
        assert_eq!(settings.base_currency, "EUR");
        assert_eq!(settings.accounts.cash, "1010");
        assert_eq!(settings.accounts.sales, "4000");
    }
}
