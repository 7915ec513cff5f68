use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::{Cents, round_cents};

pub type ProductId = Uuid;
pub type MovementId = Uuid;

/// A stock-tracked product. The inventory engine is the only writer of
/// `quantity_on_hand` and `cost_price`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Product {
    pub id: ProductId,
    pub sku: String,
    pub name: String,
    /// Selling price per unit
    pub unit_price: Cents,
    /// Weighted-average cost per unit, re-derived on receipts
    pub cost_price: Cents,
    pub quantity_on_hand: f64,
    /// Untracked products never move stock or post COGS
    pub tracked: bool,
    pub created_at: DateTime<Utc>,
}

impl Product {
    pub fn new(
        sku: impl Into<String>,
        name: impl Into<String>,
        unit_price: Cents,
        cost_price: Cents,
    ) -> Self {
        Self {
            id: Uuid::new_v4(),
            sku: sku.into(),
            name: name.into(),
            unit_price,
            cost_price,
            quantity_on_hand: 0.0,
            tracked: true,
            created_at: Utc::now(),
        }
    }

    pub fn untracked(mut self) -> Self {
        self.tracked = false;
        self
    }
}

/// Weighted-average cost after receiving `quantity` units at `unit_cost`
/// into a holding of `on_hand` units valued at `current_cost`.
pub fn weighted_average_cost(
    on_hand: f64,
    current_cost: Cents,
    quantity: f64,
    unit_cost: Cents,
) -> Cents {
    let new_qty = on_hand + quantity;
    if new_qty <= 0.0 {
        return unit_cost;
    }
    round_cents((on_hand * current_cost as f64 + quantity * unit_cost as f64) / new_qty)
}

/// Stored movement category.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MovementKind {
    /// Stock in (purchases, additions)
    Receive,
    /// Stock out for a finalized document
    Consume,
    /// Stock back in when a document is voided or goods returned
    Return,
    /// Manual correction (count adjustments, damage, shrinkage)
    Adjust,
}

impl MovementKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            MovementKind::Receive => "receive",
            MovementKind::Consume => "consume",
            MovementKind::Return => "return",
            MovementKind::Adjust => "adjust",
        }
    }

    pub fn from_str(s: &str) -> Option<Self> {
        match s {
            "receive" => Some(MovementKind::Receive),
            "consume" => Some(MovementKind::Consume),
            "return" => Some(MovementKind::Return),
            "adjust" => Some(MovementKind::Adjust),
            _ => None,
        }
    }
}

/// Caller-facing adjustment verbs, mapped onto signed deltas and a
/// stored `MovementKind`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AdjustmentKind {
    Add,
    Remove,
    /// Sets quantity-on-hand to an absolute target
    Adjustment,
    Receive,
    Return,
    Damage,
    Shrinkage,
}

impl AdjustmentKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            AdjustmentKind::Add => "add",
            AdjustmentKind::Remove => "remove",
            AdjustmentKind::Adjustment => "adjustment",
            AdjustmentKind::Receive => "receive",
            AdjustmentKind::Return => "return",
            AdjustmentKind::Damage => "damage",
            AdjustmentKind::Shrinkage => "shrinkage",
        }
    }

    pub fn from_str(s: &str) -> Option<Self> {
        match s {
            "add" => Some(AdjustmentKind::Add),
            "remove" => Some(AdjustmentKind::Remove),
            "adjustment" => Some(AdjustmentKind::Adjustment),
            "receive" => Some(AdjustmentKind::Receive),
            "return" => Some(AdjustmentKind::Return),
            "damage" => Some(AdjustmentKind::Damage),
            "shrinkage" => Some(AdjustmentKind::Shrinkage),
            _ => None,
        }
    }

    /// Kinds that take stock out and must not drive quantity-on-hand
    /// below zero.
    pub fn is_consuming(&self) -> bool {
        matches!(
            self,
            AdjustmentKind::Remove | AdjustmentKind::Damage | AdjustmentKind::Shrinkage
        )
    }

    /// Signed quantity delta for this adjustment. `Adjustment` computes
    /// the delta against the current quantity-on-hand (may be negative).
    pub fn quantity_delta(&self, quantity: f64, on_hand: f64) -> f64 {
        match self {
            AdjustmentKind::Add | AdjustmentKind::Receive | AdjustmentKind::Return => quantity,
            AdjustmentKind::Remove | AdjustmentKind::Damage | AdjustmentKind::Shrinkage => {
                -quantity
            }
            AdjustmentKind::Adjustment => quantity - on_hand,
        }
    }

    /// Stored movement category for this adjustment.
    pub fn movement_kind(&self) -> MovementKind {
        match self {
            AdjustmentKind::Add | AdjustmentKind::Receive => MovementKind::Receive,
            AdjustmentKind::Return => MovementKind::Return,
            AdjustmentKind::Remove
            | AdjustmentKind::Adjustment
            | AdjustmentKind::Damage
            | AdjustmentKind::Shrinkage => MovementKind::Adjust,
        }
    }
}

/// One stock movement. Movements are immutable; reversals add opposite
/// movements rather than deleting history.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct InventoryMovement {
    pub id: MovementId,
    pub product_id: ProductId,
    /// Signed: negative takes stock out, positive puts it back
    pub quantity: f64,
    /// Cost per unit at the time of the movement
    pub unit_cost: Cents,
    pub kind: MovementKind,
    /// Originating document for consume/return movements
    pub document_id: Option<Uuid>,
    pub actor: String,
    pub occurred_at: DateTime<Utc>,
}

impl InventoryMovement {
    pub fn new(
        product_id: ProductId,
        quantity: f64,
        unit_cost: Cents,
        kind: MovementKind,
        actor: impl Into<String>,
    ) -> Self {
        Self {
            id: Uuid::new_v4(),
            product_id,
            quantity,
            unit_cost,
            kind,
            document_id: None,
            actor: actor.into(),
            occurred_at: Utc::now(),
        }
    }

    pub fn with_document(mut self, document_id: Uuid) -> Self {
        self.document_id = Some(document_id);
        self
    }

    /// Total cost of the moved quantity (always positive).
    pub fn total_cost(&self) -> Cents {
        round_cents(self.quantity.abs() * self.unit_cost as f64)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_weighted_average_cost() {
        // 10 on hand at 2.00, receive 10 at 4.00 -> 3.00
        assert_eq!(weighted_average_cost(10.0, 200, 10.0, 400), 300);
        // empty holding takes the incoming cost
        assert_eq!(weighted_average_cost(0.0, 0, 5.0, 250), 250);
        // uneven quantities round to the nearest cent
        assert_eq!(weighted_average_cost(3.0, 100, 1.0, 150), 113);
    }

    #[test]
    fn test_adjustment_deltas() {
        assert_eq!(AdjustmentKind::Add.quantity_delta(5.0, 10.0), 5.0);
        assert_eq!(AdjustmentKind::Receive.quantity_delta(5.0, 10.0), 5.0);
        assert_eq!(AdjustmentKind::Return.quantity_delta(2.0, 10.0), 2.0);
        assert_eq!(AdjustmentKind::Remove.quantity_delta(5.0, 10.0), -5.0);
        assert_eq!(AdjustmentKind::Damage.quantity_delta(1.0, 10.0), -1.0);
        assert_eq!(AdjustmentKind::Shrinkage.quantity_delta(1.0, 10.0), -1.0);
        // absolute target: delta = target - current
        assert_eq!(AdjustmentKind::Adjustment.quantity_delta(4.0, 10.0), -6.0);
        assert_eq!(AdjustmentKind::Adjustment.quantity_delta(12.0, 10.0), 2.0);
    }

    #[test]
    fn test_consuming_kinds() {
        assert!(AdjustmentKind::Remove.is_consuming());
        assert!(AdjustmentKind::Damage.is_consuming());
        assert!(AdjustmentKind::Shrinkage.is_consuming());
        assert!(!AdjustmentKind::Add.is_consuming());
        assert!(!AdjustmentKind::Adjustment.is_consuming());
    }

    #[test]
    fn test_movement_total_cost_is_positive() {
        let movement = InventoryMovement::new(
            Uuid::new_v4(),
            -3.0,
            250,
            MovementKind::Consume,
            "system",
        );
        assert_eq!(movement.total_cost(), 750);
    }
}
