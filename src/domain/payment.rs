use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::{Cents, DocumentId};

pub type PaymentId = Uuid;

/// Cash applied to a document. Immutable once created - corrections
/// happen via new payments or a document void, never edits.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Payment {
    pub id: PaymentId,
    pub document_id: DocumentId,
    pub amount: Cents,
    pub date: NaiveDate,
    /// e.g. "cash", "bank_transfer", "card"
    pub method: String,
    /// External reference (bank transaction id, gateway charge id)
    pub reference: Option<String>,
    pub created_at: DateTime<Utc>,
}

impl Payment {
    pub fn new(
        document_id: DocumentId,
        amount: Cents,
        date: NaiveDate,
        method: impl Into<String>,
    ) -> Self {
        Self {
            id: Uuid::new_v4(),
            document_id,
            amount,
            date,
            method: method.into(),
            reference: None,
            created_at: Utc::now(),
        }
    }

    pub fn with_reference(mut self, reference: impl Into<String>) -> Self {
        self.reference = Some(reference.into());
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_payment_builder() {
        let doc_id = Uuid::new_v4();
        let payment = Payment::new(
            doc_id,
            11000,
            NaiveDate::from_ymd_opt(2024, 3, 15).unwrap(),
            "bank_transfer",
        )
        .with_reference("TXN-42");

        assert_eq!(payment.document_id, doc_id);
        assert_eq!(payment.amount, 11000);
        assert_eq!(payment.method, "bank_transfer");
        assert_eq!(payment.reference.as_deref(), Some("TXN-42"));
    }
}
