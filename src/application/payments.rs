use chrono::NaiveDate;
use tracing::{error, info};

use crate::application::error::AppError;
use crate::application::ledger::LedgerEngine;
use crate::application::settings::SettingsCache;
use crate::domain::{
    Cents, Document, DocumentKind, DocumentStatus, JournalLine, Payment, derived_status,
};
use crate::storage::Repository;

/// What a payment application produced.
#[derive(Debug, Clone)]
pub struct PaymentResult {
    pub payment: Payment,
    pub new_balance: Cents,
    pub new_status: DocumentStatus,
}

/// Applies cash to invoices and bills. The only writer of payment rows
/// and, via the version check, the amount_paid field.
#[derive(Clone)]
pub struct PaymentEngine {
    repo: Repository,
    ledger: LedgerEngine,
    settings: SettingsCache,
}

impl PaymentEngine {
    pub fn new(repo: Repository, ledger: LedgerEngine, settings: SettingsCache) -> Self {
        Self {
            repo,
            ledger,
            settings,
        }
    }

    /// Apply a payment to a document. Preconditions are checked before
    /// any write; the ledger posting after the balance update is the
    /// one partial-failure path, compensated by deleting the payment
    /// and restoring the balance.
    pub async fn apply(
        &self,
        document: &Document,
        amount: Cents,
        date: NaiveDate,
        method: &str,
        reference: Option<&str>,
        actor: &str,
    ) -> Result<PaymentResult, AppError> {
        if amount <= 0 {
            return Err(AppError::InvalidAmount(format!(
                "payment amount must be positive, got {amount}"
            )));
        }
        if document.is_void() {
            return Err(AppError::VoidedDocument(document.number.clone()));
        }
        if document.status == DocumentStatus::Draft {
            return Err(AppError::InvalidTransition {
                number: document.number.clone(),
                from: "draft".to_string(),
                to: "partial".to_string(),
            });
        }
        let outstanding = document.outstanding();
        if amount > outstanding {
            return Err(AppError::Overpayment {
                outstanding,
                requested: amount,
            });
        }

        let mut payment = Payment::new(document.id, amount, date, method);
        if let Some(reference) = reference {
            payment = payment.with_reference(reference);
        }
        self.repo.save_payment(&payment).await?;

        let new_paid = document.amount_paid + amount;
        let new_status = derived_status(document.status, new_paid, document.total);
        let updated = self
            .repo
            .update_document_payment(document.id, document.version, new_paid, new_status)
            .await?;
        if !updated {
            // another writer touched the document between our read and
            // this write; the overpayment check may no longer hold
            self.repo.delete_payment(payment.id).await?;
            return Err(AppError::ConcurrentModification(document.number.clone()));
        }

        let settings = self.settings.get().await?;
        let lines = match document.kind {
            DocumentKind::Invoice => vec![
                JournalLine::debit(settings.accounts.cash.clone(), amount),
                JournalLine::credit(settings.accounts.receivable.clone(), amount),
            ],
            DocumentKind::Bill => vec![
                JournalLine::debit(settings.accounts.payable.clone(), amount),
                JournalLine::credit(settings.accounts.cash.clone(), amount),
            ],
        };
        let posting = self
            .ledger
            .post_generated(
                date,
                format!("Payment on {}", document.number),
                document.id,
                actor.to_string(),
                lines,
            )
            .await;

        if let Err(err) = posting {
            error!(document = %document.number, %err, "payment posting failed, rolling back");
            self.repo.delete_payment(payment.id).await?;
            let restored = self
                .repo
                .update_document_payment(
                    document.id,
                    document.version + 1,
                    document.amount_paid,
                    document.status,
                )
                .await?;
            if !restored {
                error!(document = %document.number, "payment rollback lost a version race");
            }
            return Err(err);
        }

        info!(
            document = %document.number,
            amount,
            new_status = %new_status,
            "payment applied"
        );
        Ok(PaymentResult {
            payment,
            new_balance: document.total - new_paid,
            new_status,
        })
    }

    pub async fn payments_for_document(&self, document: &Document) -> Result<Vec<Payment>, AppError> {
        Ok(self.repo.payments_for_document(document.id).await?)
    }
}
