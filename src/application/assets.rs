use chrono::NaiveDate;
use tracing::info;

use crate::application::error::AppError;
use crate::domain::{AssetId, Cents, FixedAsset};
use crate::storage::Repository;

/// Fixed-asset registry. Depreciation itself is a read-side
/// computation on the domain type; nothing here posts entries.
#[derive(Clone)]
pub struct AssetRegistry {
    repo: Repository,
}

impl AssetRegistry {
    pub fn new(repo: Repository) -> Self {
        Self { repo }
    }

    pub async fn register(
        &self,
        name: &str,
        purchase_date: NaiveDate,
        cost: Cents,
        residual_value: Cents,
        useful_life_months: u32,
    ) -> Result<FixedAsset, AppError> {
        if cost <= 0 {
            return Err(AppError::InvalidAmount(format!("asset cost {cost}")));
        }
        if residual_value < 0 || residual_value > cost {
            return Err(AppError::InvalidAmount(format!(
                "residual value {residual_value}"
            )));
        }
        if useful_life_months == 0 {
            return Err(AppError::InvalidAmount("useful life of 0 months".into()));
        }
        let asset = FixedAsset::new(name, purchase_date, cost, residual_value, useful_life_months);
        self.repo.save_asset(&asset).await?;
        info!(name = %asset.name, cost, useful_life_months, "fixed asset registered");
        Ok(asset)
    }

    pub async fn get(&self, id: AssetId) -> Result<FixedAsset, AppError> {
        self.repo
            .get_asset(id)
            .await?
            .ok_or_else(|| AppError::AssetNotFound(id.to_string()))
    }

    pub async fn list(&self) -> Result<Vec<FixedAsset>, AppError> {
        Ok(self.repo.list_assets().await?)
    }
}
