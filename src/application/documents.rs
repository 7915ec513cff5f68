use chrono::NaiveDate;
use tracing::{info, warn};
use uuid::Uuid;

use crate::application::error::AppError;
use crate::application::inventory::InventoryEngine;
use crate::application::ledger::LedgerEngine;
use crate::application::payments::{PaymentEngine, PaymentResult};
use crate::application::settings::SettingsCache;
use crate::domain::{
    Cents, Document, DocumentKind, DocumentLine, DocumentStatus, JournalLine, compute_totals,
};
use crate::storage::Repository;

/// One requested line. When a SKU is given the product is linked and
/// its unit price used unless one is supplied.
#[derive(Debug, Clone)]
pub struct NewDocumentLine {
    pub product_sku: Option<String>,
    pub description: String,
    pub quantity: f64,
    pub unit_price: Option<Cents>,
    pub discount_pct: f64,
    pub tax_pct: f64,
}

/// Request for a new invoice or bill. Number is assigned from a
/// per-kind sequence when not supplied.
#[derive(Debug, Clone)]
pub struct NewDocument {
    pub kind: DocumentKind,
    pub number: Option<String>,
    pub party_id: Option<Uuid>,
    pub party_name: String,
    pub issue_date: NaiveDate,
    pub due_date: NaiveDate,
    pub currency: Option<String>,
    pub exchange_rate: Option<f64>,
    pub lines: Vec<NewDocumentLine>,
}

/// How the stock side of a finalize or void went. Stock failures are
/// reported here, never by blocking the status commit.
#[derive(Debug, Clone)]
pub enum StockOutcome {
    /// No tracked lines (or a bill), nothing to move
    NotApplicable,
    Applied { total_cost: Cents },
    Failed { reason: String },
}

#[derive(Debug, Clone)]
pub struct FinalizeOutcome {
    pub document: Document,
    pub consumption: StockOutcome,
}

#[derive(Debug, Clone)]
pub struct VoidOutcome {
    /// None when a draft was deleted outright
    pub document: Option<Document>,
    pub reversal: StockOutcome,
}

/// Owner of documents and their lines; the sole writer of document
/// status.
#[derive(Clone)]
pub struct DocumentEngine {
    repo: Repository,
    ledger: LedgerEngine,
    inventory: InventoryEngine,
    payments: PaymentEngine,
    settings: SettingsCache,
}

impl DocumentEngine {
    pub fn new(
        repo: Repository,
        ledger: LedgerEngine,
        inventory: InventoryEngine,
        payments: PaymentEngine,
        settings: SettingsCache,
    ) -> Self {
        Self {
            repo,
            ledger,
            inventory,
            payments,
            settings,
        }
    }

    /// Create a draft document with computed totals.
    pub async fn create_document(&self, request: NewDocument) -> Result<Document, AppError> {
        let number = match request.number {
            Some(number) => {
                if self.repo.get_document_by_number(&number).await?.is_some() {
                    return Err(AppError::DuplicateDocumentNumber(number));
                }
                number
            }
            None => {
                let count = self.repo.count_documents(request.kind).await?;
                format!("{}-{:04}", request.kind.number_prefix(), count + 1)
            }
        };

        let lines = self.build_lines(&request.lines).await?;
        let currency = match request.currency {
            Some(currency) => currency.to_uppercase(),
            None => self.settings.get().await?.base_currency.clone(),
        };

        let mut document = Document::new(
            request.kind,
            number,
            request.party_id.unwrap_or_else(Uuid::new_v4),
            request.party_name,
            request.issue_date,
            request.due_date,
            currency,
            lines,
        );
        if let Some(rate) = request.exchange_rate {
            if rate <= 0.0 || !rate.is_finite() {
                return Err(AppError::InvalidAmount(format!("exchange rate {rate}")));
            }
            document = document.with_exchange_rate(rate);
        }

        self.repo.save_document(&document).await?;
        info!(number = %document.number, kind = %document.kind, "document created");
        Ok(document)
    }

    /// Replace the full line set and recompute totals. Rejected once
    /// the document is paid or void.
    pub async fn replace_lines(
        &self,
        number: &str,
        new_lines: Vec<NewDocumentLine>,
    ) -> Result<Document, AppError> {
        let document = self.get_by_number(number).await?;
        if !document.status.allows_line_edits() {
            return Err(AppError::ImmutableDocument {
                number: document.number,
                status: document.status.to_string(),
            });
        }

        let mut lines = self.build_lines(&new_lines).await?;
        for (i, line) in lines.iter_mut().enumerate() {
            line.document_id = document.id;
            line.line_no = (i + 1) as i64;
        }
        let totals = compute_totals(&lines);
        if totals.total < document.amount_paid {
            return Err(AppError::InvalidAmount(format!(
                "new total {} is below the amount already paid {}",
                totals.total, document.amount_paid
            )));
        }

        let updated = self
            .repo
            .replace_document_lines(document.id, document.version, &lines, totals)
            .await?;
        if !updated {
            return Err(AppError::ConcurrentModification(number.to_string()));
        }
        info!(number = %number, line_count = lines.len(), "document lines replaced");
        self.get_by_number(number).await
    }

    /// Finalize a draft: recompute totals, commit the target status,
    /// post the accrual entry, then consume stock for tracked lines.
    /// A consumption failure lands in the outcome and does not roll
    /// back the status.
    pub async fn finalize(
        &self,
        number: &str,
        target: DocumentStatus,
        actor: &str,
    ) -> Result<FinalizeOutcome, AppError> {
        let document = self.get_by_number(number).await?;
        if document.status != DocumentStatus::Draft {
            return Err(AppError::InvalidTransition {
                number: document.number,
                from: document.status.to_string(),
                to: target.to_string(),
            });
        }
        if !target.is_finalize_target() {
            return Err(AppError::InvalidTransition {
                number: document.number,
                from: document.status.to_string(),
                to: target.to_string(),
            });
        }
        if document.lines.is_empty() {
            return Err(AppError::EmptyDocument(document.number));
        }

        let totals = compute_totals(&document.lines);
        let updated = self
            .repo
            .update_document_finalized(document.id, document.version, totals, target)
            .await?;
        if !updated {
            return Err(AppError::ConcurrentModification(number.to_string()));
        }

        self.post_accrual(&document, totals.subtotal, totals.tax_total, totals.total, actor, false)
            .await?;
        info!(number = %number, status = %target, "document finalized");

        let consumption = if document.kind == DocumentKind::Invoice {
            match self.inventory.consume(&document, actor).await {
                Ok(result) if result.movements.is_empty() => StockOutcome::NotApplicable,
                Ok(result) => StockOutcome::Applied {
                    total_cost: result.total_cost,
                },
                Err(err) => {
                    warn!(number = %number, %err, "consumption failed after finalize");
                    StockOutcome::Failed {
                        reason: err.to_string(),
                    }
                }
            }
        } else {
            StockOutcome::NotApplicable
        };

        Ok(FinalizeOutcome {
            document: self.get_by_number(number).await?,
            consumption,
        })
    }

    /// Void a document. A draft is deleted outright with no side
    /// effects. Otherwise the status commits first, then the ledger
    /// effects are reversed with mirror entries and consumed stock is
    /// restored; a stock failure is reported in the outcome.
    pub async fn void(&self, number: &str, actor: &str) -> Result<VoidOutcome, AppError> {
        let document = self.get_by_number(number).await?;
        if document.is_void() {
            return Err(AppError::AlreadyVoid(document.number));
        }
        if document.status == DocumentStatus::Paid {
            return Err(AppError::ImmutableDocument {
                number: document.number,
                status: document.status.to_string(),
            });
        }

        if document.status == DocumentStatus::Draft {
            self.repo.delete_document(document.id).await?;
            info!(number = %number, "draft document deleted");
            return Ok(VoidOutcome {
                document: None,
                reversal: StockOutcome::NotApplicable,
            });
        }

        let updated = self
            .repo
            .update_document_status(document.id, document.version, DocumentStatus::Void)
            .await?;
        if !updated {
            return Err(AppError::ConcurrentModification(number.to_string()));
        }
        info!(number = %number, "document voided");

        self.post_accrual(
            &document,
            document.subtotal,
            document.tax_total,
            document.total,
            actor,
            true,
        )
        .await?;
        if document.amount_paid > 0 {
            self.post_payment_reversal(&document, actor).await?;
        }

        let reversal = if document.kind == DocumentKind::Invoice {
            match self.inventory.reverse(&document, actor).await {
                Ok(result) if result.movements.is_empty() => StockOutcome::NotApplicable,
                Ok(result) => StockOutcome::Applied {
                    total_cost: result.total_cost,
                },
                Err(err) => {
                    warn!(number = %number, %err, "stock reversal failed after void");
                    StockOutcome::Failed {
                        reason: err.to_string(),
                    }
                }
            }
        } else {
            StockOutcome::NotApplicable
        };

        Ok(VoidOutcome {
            document: Some(self.get_by_number(number).await?),
            reversal,
        })
    }

    /// Apply a payment by document number. Delegates to the payment
    /// engine.
    pub async fn apply_payment(
        &self,
        number: &str,
        amount: Cents,
        date: NaiveDate,
        method: &str,
        reference: Option<&str>,
        actor: &str,
    ) -> Result<PaymentResult, AppError> {
        let document = self.get_by_number(number).await?;
        self.payments
            .apply(&document, amount, date, method, reference, actor)
            .await
    }

    pub async fn get_by_number(&self, number: &str) -> Result<Document, AppError> {
        self.repo
            .get_document_by_number(number)
            .await?
            .ok_or_else(|| AppError::DocumentNotFound(number.to_string()))
    }

    pub async fn list(&self, kind: DocumentKind) -> Result<Vec<Document>, AppError> {
        Ok(self.repo.list_documents(kind).await?)
    }

    async fn build_lines(
        &self,
        requested: &[NewDocumentLine],
    ) -> Result<Vec<DocumentLine>, AppError> {
        let mut lines = Vec::with_capacity(requested.len());
        for request in requested {
            if request.quantity <= 0.0 || !request.quantity.is_finite() {
                return Err(AppError::InvalidAmount(format!(
                    "line quantity {}",
                    request.quantity
                )));
            }
            let product = match &request.product_sku {
                Some(sku) => Some(
                    self.repo
                        .get_product_by_sku(sku)
                        .await?
                        .ok_or_else(|| AppError::ProductNotFound(sku.clone()))?,
                ),
                None => None,
            };
            let unit_price = match request.unit_price {
                Some(price) => price,
                None => product
                    .as_ref()
                    .map(|p| p.unit_price)
                    .ok_or_else(|| AppError::InvalidAmount("line without a unit price".into()))?,
            };
            let description = if request.description.is_empty() {
                product
                    .as_ref()
                    .map(|p| p.name.clone())
                    .unwrap_or_default()
            } else {
                request.description.clone()
            };

            let mut line = DocumentLine::new(
                description,
                request.quantity,
                unit_price,
                request.discount_pct,
                request.tax_pct,
            );
            if let Some(product) = &product {
                if product.tracked {
                    line = line.with_product(product.id);
                }
            }
            lines.push(line);
        }
        Ok(lines)
    }

    /// Accrual entry posted on finalize (or its mirror on void).
    /// Invoice: debit AR for the total, credit sales for the subtotal
    /// and tax payable for the tax. Bill: the payable-side dual.
    async fn post_accrual(
        &self,
        document: &Document,
        subtotal: Cents,
        tax_total: Cents,
        total: Cents,
        actor: &str,
        reversal: bool,
    ) -> Result<(), AppError> {
        if total == 0 {
            return Ok(());
        }
        let settings = self.settings.get().await?;
        let accounts = &settings.accounts;

        let mut lines = match document.kind {
            DocumentKind::Invoice => {
                let mut lines = vec![
                    JournalLine::debit(accounts.receivable.clone(), total),
                    JournalLine::credit(accounts.sales.clone(), subtotal),
                ];
                if tax_total > 0 {
                    lines.push(JournalLine::credit(accounts.tax.clone(), tax_total));
                }
                lines
            }
            DocumentKind::Bill => {
                let mut lines = vec![
                    JournalLine::debit(accounts.expenses.clone(), subtotal),
                    JournalLine::credit(accounts.payable.clone(), total),
                ];
                if tax_total > 0 {
                    lines.insert(1, JournalLine::debit(accounts.tax.clone(), tax_total));
                }
                lines
            }
        };

        let description = if reversal {
            for line in &mut lines {
                std::mem::swap(&mut line.debit, &mut line.credit);
            }
            format!("Void of {}", document.number)
        } else {
            format!("{} {}", capitalized_kind(document.kind), document.number)
        };

        self.ledger
            .post_generated(
                document.issue_date,
                description,
                document.id,
                actor.to_string(),
                lines,
            )
            .await?;
        Ok(())
    }

    /// Mirror of the cash entries when voiding a partially paid
    /// document.
    async fn post_payment_reversal(
        &self,
        document: &Document,
        actor: &str,
    ) -> Result<(), AppError> {
        let settings = self.settings.get().await?;
        let accounts = &settings.accounts;
        let amount = document.amount_paid;
        let lines = match document.kind {
            DocumentKind::Invoice => vec![
                JournalLine::debit(accounts.receivable.clone(), amount),
                JournalLine::credit(accounts.cash.clone(), amount),
            ],
            DocumentKind::Bill => vec![
                JournalLine::debit(accounts.cash.clone(), amount),
                JournalLine::credit(accounts.payable.clone(), amount),
            ],
        };
        self.ledger
            .post_generated(
                document.issue_date,
                format!("Payment reversal on void of {}", document.number),
                document.id,
                actor.to_string(),
                lines,
            )
            .await?;
        Ok(())
    }
}

fn capitalized_kind(kind: DocumentKind) -> &'static str {
    match kind {
        DocumentKind::Invoice => "Invoice",
        DocumentKind::Bill => "Bill",
    }
}
