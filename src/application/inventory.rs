use std::collections::HashMap;

use tracing::{info, warn};

use crate::application::error::AppError;
use crate::application::ledger::LedgerEngine;
use crate::application::settings::SettingsCache;
use crate::domain::{
    AdjustmentKind, Cents, Document, EntryId, InventoryMovement, JournalLine, MovementKind,
    Product, ProductId, weighted_average_cost,
};
use crate::storage::Repository;

/// Movements written plus the cost entry they produced, if any.
#[derive(Debug, Clone)]
pub struct ConsumeResult {
    pub movements: Vec<InventoryMovement>,
    pub total_cost: Cents,
    pub journal_entry_id: Option<EntryId>,
}

pub type ReverseResult = ConsumeResult;

/// Owner of inventory movements and the quantity/cost fields on
/// products. Nobody else writes those.
#[derive(Clone)]
pub struct InventoryEngine {
    repo: Repository,
    ledger: LedgerEngine,
    settings: SettingsCache,
}

impl InventoryEngine {
    pub fn new(repo: Repository, ledger: LedgerEngine, settings: SettingsCache) -> Self {
        Self {
            repo,
            ledger,
            settings,
        }
    }

    // ---- product registry ----

    pub async fn create_product(
        &self,
        sku: &str,
        name: &str,
        unit_price: Cents,
        cost_price: Cents,
        tracked: bool,
    ) -> Result<Product, AppError> {
        if self.repo.get_product_by_sku(sku).await?.is_some() {
            return Err(AppError::ProductAlreadyExists(sku.to_string()));
        }
        let mut product = Product::new(sku, name, unit_price, cost_price);
        if !tracked {
            product = product.untracked();
        }
        self.repo.save_product(&product).await?;
        info!(sku = %product.sku, tracked, "product created");
        Ok(product)
    }

    pub async fn get_product_by_sku(&self, sku: &str) -> Result<Product, AppError> {
        self.repo
            .get_product_by_sku(sku)
            .await?
            .ok_or_else(|| AppError::ProductNotFound(sku.to_string()))
    }

    pub async fn list_products(&self) -> Result<Vec<Product>, AppError> {
        Ok(self.repo.list_products().await?)
    }

    pub async fn movements_for_product(
        &self,
        sku: &str,
    ) -> Result<Vec<InventoryMovement>, AppError> {
        let product = self.get_product_by_sku(sku).await?;
        Ok(self.repo.movements_for_product(product.id).await?)
    }

    // ---- document-driven consumption ----

    /// Consume stock for a finalized document's tracked lines.
    /// All-or-nothing: requested quantities are summed per product and
    /// checked against quantity-on-hand before any movement is written.
    /// Costs use the product's current weighted-average cost; one
    /// aggregate COGS entry is posted at the document's issue date.
    pub async fn consume(
        &self,
        document: &Document,
        actor: &str,
    ) -> Result<ConsumeResult, AppError> {
        let mut products: HashMap<ProductId, Product> = HashMap::new();
        let mut requested: HashMap<ProductId, f64> = HashMap::new();
        let mut movements = Vec::new();
        for line in document.tracked_lines() {
            let product_id = line.product_id.unwrap();
            if !products.contains_key(&product_id) {
                let product = self
                    .repo
                    .get_product(product_id)
                    .await?
                    .ok_or_else(|| AppError::ProductNotFound(product_id.to_string()))?;
                products.insert(product_id, product);
            }
            let product = &products[&product_id];
            if !product.tracked {
                continue;
            }
            let total = requested.entry(product_id).or_insert(0.0);
            *total += line.quantity;
            // the same product may appear on several lines
            if *total > product.quantity_on_hand {
                return Err(AppError::InsufficientStock {
                    sku: product.sku.clone(),
                    available: product.quantity_on_hand,
                    requested: *total,
                });
            }
            movements.push(
                InventoryMovement::new(
                    product.id,
                    -line.quantity,
                    product.cost_price,
                    MovementKind::Consume,
                    actor,
                )
                .with_document(document.id),
            );
        }

        if movements.is_empty() {
            return Ok(ConsumeResult {
                movements,
                total_cost: 0,
                journal_entry_id: None,
            });
        }

        self.repo.apply_movements(&movements).await?;
        let total_cost: Cents = movements.iter().map(|m| m.total_cost()).sum();
        info!(document = %document.number, total_cost, "stock consumed");

        let journal_entry_id = if total_cost > 0 {
            Some(
                self.post_cost_entry(document, actor, total_cost, false)
                    .await?,
            )
        } else {
            None
        };

        Ok(ConsumeResult {
            movements,
            total_cost,
            journal_entry_id,
        })
    }

    /// Reverse a document's prior consumption: re-create each consume
    /// movement with positive quantity at the original unit cost and
    /// post the mirror entry. Originals are never deleted.
    pub async fn reverse(
        &self,
        document: &Document,
        actor: &str,
    ) -> Result<ReverseResult, AppError> {
        let consumed = self
            .repo
            .movements_for_document(document.id, Some(MovementKind::Consume))
            .await?;

        let movements: Vec<InventoryMovement> = consumed
            .iter()
            .map(|m| {
                InventoryMovement::new(
                    m.product_id,
                    -m.quantity,
                    m.unit_cost,
                    MovementKind::Return,
                    actor,
                )
                .with_document(document.id)
            })
            .collect();

        if movements.is_empty() {
            return Ok(ReverseResult {
                movements,
                total_cost: 0,
                journal_entry_id: None,
            });
        }

        self.repo.apply_movements(&movements).await?;
        let total_cost: Cents = movements.iter().map(|m| m.total_cost()).sum();
        info!(document = %document.number, total_cost, "consumption reversed");

        let journal_entry_id = if total_cost > 0 {
            Some(
                self.post_cost_entry(document, actor, total_cost, true)
                    .await?,
            )
        } else {
            None
        };

        Ok(ReverseResult {
            movements,
            total_cost,
            journal_entry_id,
        })
    }

    async fn post_cost_entry(
        &self,
        document: &Document,
        actor: &str,
        total_cost: Cents,
        reversal: bool,
    ) -> Result<EntryId, AppError> {
        let settings = self.settings.get().await?;
        let (description, lines) = if reversal {
            (
                format!("COGS reversal for {}", document.number),
                vec![
                    JournalLine::debit(settings.accounts.inventory.clone(), total_cost),
                    JournalLine::credit(settings.accounts.cogs.clone(), total_cost),
                ],
            )
        } else {
            (
                format!("COGS for {}", document.number),
                vec![
                    JournalLine::debit(settings.accounts.cogs.clone(), total_cost),
                    JournalLine::credit(settings.accounts.inventory.clone(), total_cost),
                ],
            )
        };
        // dated alongside the accrual entry so revenue and its cost
        // land in the same period
        let entry = self
            .ledger
            .post_generated(
                document.issue_date,
                description,
                document.id,
                actor.to_string(),
                lines,
            )
            .await?;
        Ok(entry.id)
    }

    // ---- manual adjustments ----

    /// Apply one manual stock adjustment. Receiving with a unit cost
    /// re-derives the weighted-average cost; consuming kinds require
    /// available >= requested; `Adjustment` targets an absolute
    /// quantity. Exactly one movement per call, no ledger entry.
    pub async fn adjust(
        &self,
        sku: &str,
        kind: AdjustmentKind,
        quantity: f64,
        unit_cost: Option<Cents>,
        actor: &str,
    ) -> Result<InventoryMovement, AppError> {
        if quantity < 0.0 || !quantity.is_finite() {
            return Err(AppError::InvalidAmount(format!("quantity {quantity}")));
        }
        let product = self.get_product_by_sku(sku).await?;
        if !product.tracked {
            return Err(AppError::InvalidAmount(format!(
                "product {sku} is not stock-tracked"
            )));
        }

        let delta = kind.quantity_delta(quantity, product.quantity_on_hand);
        if kind.is_consuming() && product.quantity_on_hand + delta < 0.0 {
            return Err(AppError::InsufficientStock {
                sku: product.sku,
                available: product.quantity_on_hand,
                requested: quantity,
            });
        }
        if delta < 0.0 && product.quantity_on_hand + delta < 0.0 {
            // absolute adjustments below zero are equally rejected
            return Err(AppError::InsufficientStock {
                sku: product.sku,
                available: product.quantity_on_hand,
                requested: -delta,
            });
        }

        let new_cost = match (kind.movement_kind(), unit_cost) {
            (MovementKind::Receive, Some(cost)) if delta > 0.0 => Some(weighted_average_cost(
                product.quantity_on_hand,
                product.cost_price,
                delta,
                cost,
            )),
            _ => None,
        };

        let movement = InventoryMovement::new(
            product.id,
            delta,
            unit_cost.unwrap_or(product.cost_price),
            kind.movement_kind(),
            actor,
        );
        self.repo.apply_movement(&movement, new_cost).await?;

        if delta == 0.0 {
            warn!(sku = %sku, kind = %kind.as_str(), "adjustment produced no quantity change");
        }
        info!(sku = %sku, kind = %kind.as_str(), delta, "stock adjusted");
        Ok(movement)
    }
}
