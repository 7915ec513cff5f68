use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::{Cents, round_cents};

pub type DocumentId = Uuid;

/// Invoices and bills share one shape; the kind flips the direction of
/// money (receivable vs payable).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DocumentKind {
    /// Money owed to us by a customer
    Invoice,
    /// Money we owe a vendor
    Bill,
}

impl DocumentKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            DocumentKind::Invoice => "invoice",
            DocumentKind::Bill => "bill",
        }
    }

    pub fn from_str(s: &str) -> Option<Self> {
        match s {
            "invoice" => Some(DocumentKind::Invoice),
            "bill" => Some(DocumentKind::Bill),
            _ => None,
        }
    }

    pub fn number_prefix(&self) -> &'static str {
        match self {
            DocumentKind::Invoice => "INV",
            DocumentKind::Bill => "BILL",
        }
    }
}

impl std::fmt::Display for DocumentKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Document status state machine:
/// draft -> {sent, pending_approval, paid, overdue} (finalize) -> partial -> paid,
/// with void reachable from any state except paid; void is terminal.
/// Except for explicit void, partial/paid are a pure function of
/// amount_paid vs total.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DocumentStatus {
    Draft,
    Sent,
    PendingApproval,
    Overdue,
    Partial,
    Paid,
    Void,
}

impl DocumentStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            DocumentStatus::Draft => "draft",
            DocumentStatus::Sent => "sent",
            DocumentStatus::PendingApproval => "pending_approval",
            DocumentStatus::Overdue => "overdue",
            DocumentStatus::Partial => "partial",
            DocumentStatus::Paid => "paid",
            DocumentStatus::Void => "void",
        }
    }

    pub fn from_str(s: &str) -> Option<Self> {
        match s {
            "draft" => Some(DocumentStatus::Draft),
            "sent" => Some(DocumentStatus::Sent),
            "pending_approval" => Some(DocumentStatus::PendingApproval),
            "overdue" => Some(DocumentStatus::Overdue),
            "partial" => Some(DocumentStatus::Partial),
            "paid" => Some(DocumentStatus::Paid),
            "void" => Some(DocumentStatus::Void),
            _ => None,
        }
    }

    /// Line edits are rejected once a document is paid or void.
    pub fn allows_line_edits(&self) -> bool {
        !matches!(self, DocumentStatus::Paid | DocumentStatus::Void)
    }

    /// Statuses a finalize may target when leaving draft.
    pub fn is_finalize_target(&self) -> bool {
        matches!(
            self,
            DocumentStatus::Sent
                | DocumentStatus::PendingApproval
                | DocumentStatus::Paid
                | DocumentStatus::Overdue
        )
    }
}

impl std::fmt::Display for DocumentStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// One line of an invoice or bill. `line_total` is net of the line
/// discount and includes the line tax.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DocumentLine {
    pub id: Uuid,
    pub document_id: DocumentId,
    pub line_no: i64,
    /// Tracked product, when the line moves stock.
    pub product_id: Option<Uuid>,
    pub description: String,
    pub quantity: f64,
    pub unit_price: Cents,
    pub discount_pct: f64,
    pub tax_pct: f64,
    pub line_total: Cents,
}

impl DocumentLine {
    pub fn new(
        description: impl Into<String>,
        quantity: f64,
        unit_price: Cents,
        discount_pct: f64,
        tax_pct: f64,
    ) -> Self {
        let mut line = Self {
            id: Uuid::new_v4(),
            document_id: Uuid::nil(), // assigned when attached to a document
            line_no: 0,
            product_id: None,
            description: description.into(),
            quantity,
            unit_price,
            discount_pct,
            tax_pct,
            line_total: 0,
        };
        line.line_total = line.net_amount() + line.tax_amount();
        line
    }

    pub fn with_product(mut self, product_id: Uuid) -> Self {
        self.product_id = Some(product_id);
        self
    }

    /// Gross amount before discount: quantity x unit price.
    pub fn gross_amount(&self) -> Cents {
        round_cents(self.quantity * self.unit_price as f64)
    }

    /// Net amount after the line discount.
    pub fn net_amount(&self) -> Cents {
        round_cents(self.quantity * self.unit_price as f64 * (1.0 - self.discount_pct / 100.0))
    }

    /// Tax charged on the net amount.
    pub fn tax_amount(&self) -> Cents {
        round_cents(self.net_amount() as f64 * self.tax_pct / 100.0)
    }
}

/// Header totals derived from the line set. Recomputed on every line
/// change; never edited directly.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct DocumentTotals {
    /// Sum of line nets (after line discounts)
    pub subtotal: Cents,
    /// Sum of discount amounts, kept for display
    pub discount_total: Cents,
    pub tax_total: Cents,
    /// subtotal + tax_total
    pub total: Cents,
}

/// Recompute header totals from a line set.
pub fn compute_totals(lines: &[DocumentLine]) -> DocumentTotals {
    let mut subtotal = 0;
    let mut discount_total = 0;
    let mut tax_total = 0;
    for line in lines {
        subtotal += line.net_amount();
        discount_total += line.gross_amount() - line.net_amount();
        tax_total += line.tax_amount();
    }
    DocumentTotals {
        subtotal,
        discount_total,
        tax_total,
        total: subtotal + tax_total,
    }
}

/// Derive the status implied by the paid amount. Only moves the status
/// forward to partial/paid; anything else is left as-is (void and the
/// finalize targets are explicit transitions, not derived ones).
pub fn derived_status(current: DocumentStatus, amount_paid: Cents, total: Cents) -> DocumentStatus {
    if current == DocumentStatus::Void || current == DocumentStatus::Draft {
        return current;
    }
    if amount_paid >= total && total > 0 {
        DocumentStatus::Paid
    } else if amount_paid > 0 {
        DocumentStatus::Partial
    } else {
        current
    }
}

/// An invoice or bill: header plus ordered lines.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Document {
    pub id: DocumentId,
    pub kind: DocumentKind,
    pub number: String,
    /// Customer or vendor, depending on kind. Party records themselves
    /// live outside the core; we keep the id plus a display name.
    pub party_id: Uuid,
    pub party_name: String,
    pub issue_date: NaiveDate,
    pub due_date: NaiveDate,
    pub currency: String,
    pub exchange_rate: f64,
    pub subtotal: Cents,
    pub discount_total: Cents,
    pub tax_total: Cents,
    pub total: Cents,
    pub amount_paid: Cents,
    pub status: DocumentStatus,
    /// Optimistic concurrency stamp; bumped on every header write.
    pub version: i64,
    pub created_at: DateTime<Utc>,
    pub lines: Vec<DocumentLine>,
}

impl Document {
    pub fn new(
        kind: DocumentKind,
        number: impl Into<String>,
        party_id: Uuid,
        party_name: impl Into<String>,
        issue_date: NaiveDate,
        due_date: NaiveDate,
        currency: impl Into<String>,
        mut lines: Vec<DocumentLine>,
    ) -> Self {
        let id = Uuid::new_v4();
        for (i, line) in lines.iter_mut().enumerate() {
            line.document_id = id;
            line.line_no = (i + 1) as i64;
        }
        let totals = compute_totals(&lines);
        Self {
            id,
            kind,
            number: number.into(),
            party_id,
            party_name: party_name.into(),
            issue_date,
            due_date,
            currency: currency.into(),
            exchange_rate: 1.0,
            subtotal: totals.subtotal,
            discount_total: totals.discount_total,
            tax_total: totals.tax_total,
            total: totals.total,
            amount_paid: 0,
            status: DocumentStatus::Draft,
            version: 0,
            created_at: Utc::now(),
            lines,
        }
    }

    pub fn with_exchange_rate(mut self, rate: f64) -> Self {
        self.exchange_rate = rate;
        self
    }

    /// Unpaid remainder: total - amount_paid.
    pub fn outstanding(&self) -> Cents {
        self.total - self.amount_paid
    }

    pub fn is_void(&self) -> bool {
        self.status == DocumentStatus::Void
    }

    /// Lines that move stock on finalize/void.
    pub fn tracked_lines(&self) -> impl Iterator<Item = &DocumentLine> {
        self.lines.iter().filter(|l| l.product_id.is_some())
    }
}
