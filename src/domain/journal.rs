use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::{BALANCE_TOLERANCE, Cents};

pub type EntryId = Uuid;

/// Lifecycle of a journal entry. Draft entries may be edited; posted
/// entries are immutable except for the terminal transition to void.
/// Voided entries stay on file for audit - nothing is deleted or
/// renumbered.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum EntryStatus {
    Draft,
    Posted,
    Void,
}

impl EntryStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            EntryStatus::Draft => "draft",
            EntryStatus::Posted => "posted",
            EntryStatus::Void => "void",
        }
    }

    pub fn from_str(s: &str) -> Option<Self> {
        match s {
            "draft" => Some(EntryStatus::Draft),
            "posted" => Some(EntryStatus::Posted),
            "void" => Some(EntryStatus::Void),
            _ => None,
        }
    }
}

impl std::fmt::Display for EntryStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Whether an entry was keyed in by hand or generated by a module
/// (document finalize, payment, inventory consumption).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum EntrySource {
    Manual,
    Module,
}

impl EntrySource {
    pub fn as_str(&self) -> &'static str {
        match self {
            EntrySource::Manual => "manual",
            EntrySource::Module => "module",
        }
    }

    pub fn from_str(s: &str) -> Option<Self> {
        match s {
            "manual" => Some(EntrySource::Manual),
            "module" => Some(EntrySource::Module),
            _ => None,
        }
    }
}

/// One side of a journal entry. Exactly one of debit/credit is non-zero.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct JournalLine {
    pub id: Uuid,
    pub entry_id: EntryId,
    pub line_no: i64,
    pub account_code: String,
    pub debit: Cents,
    pub credit: Cents,
    pub description: Option<String>,
}

impl JournalLine {
    pub fn debit(account_code: impl Into<String>, amount: Cents) -> Self {
        Self::new(account_code, amount, 0)
    }

    pub fn credit(account_code: impl Into<String>, amount: Cents) -> Self {
        Self::new(account_code, 0, amount)
    }

    fn new(account_code: impl Into<String>, debit: Cents, credit: Cents) -> Self {
        Self {
            id: Uuid::new_v4(),
            entry_id: Uuid::nil(), // assigned when attached to an entry
            line_no: 0,
            account_code: account_code.into(),
            debit,
            credit,
            description: None,
        }
    }

    pub fn with_description(mut self, description: impl Into<String>) -> Self {
        self.description = Some(description.into());
        self
    }

    /// A line is valid when exactly one side carries a positive amount.
    pub fn is_valid(&self) -> bool {
        (self.debit > 0 && self.credit == 0) || (self.credit > 0 && self.debit == 0)
    }
}

/// A balanced set of debit/credit lines recording one financial event.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct JournalEntry {
    pub id: EntryId,
    pub date: NaiveDate,
    pub description: String,
    pub memo: Option<String>,
    pub source: EntrySource,
    /// Originating document (invoice/bill) for module-generated entries.
    pub source_document: Option<Uuid>,
    pub status: EntryStatus,
    /// Identity performing the mutation, supplied by the caller for audit.
    pub actor: String,
    pub created_at: DateTime<Utc>,
    pub lines: Vec<JournalLine>,
}

impl JournalEntry {
    pub fn new(
        date: NaiveDate,
        description: impl Into<String>,
        source: EntrySource,
        actor: impl Into<String>,
        mut lines: Vec<JournalLine>,
    ) -> Self {
        let id = Uuid::new_v4();
        for (i, line) in lines.iter_mut().enumerate() {
            line.entry_id = id;
            line.line_no = (i + 1) as i64;
        }
        Self {
            id,
            date,
            description: description.into(),
            memo: None,
            source,
            source_document: None,
            status: EntryStatus::Draft,
            actor: actor.into(),
            created_at: Utc::now(),
            lines,
        }
    }

    pub fn with_memo(mut self, memo: impl Into<String>) -> Self {
        self.memo = Some(memo.into());
        self
    }

    pub fn with_source_document(mut self, document_id: Uuid) -> Self {
        self.source_document = Some(document_id);
        self
    }

    /// Sum of debits and credits across all lines.
    pub fn totals(&self) -> (Cents, Cents) {
        self.lines.iter().fold((0, 0), |(d, c), line| {
            (d + line.debit, c + line.credit)
        })
    }

    /// The posting invariant: debits equal credits within one cent.
    pub fn is_balanced(&self) -> bool {
        let (debits, credits) = self.totals();
        (debits - credits).abs() <= BALANCE_TOLERANCE
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn today() -> NaiveDate {
        Utc::now().date_naive()
    }

    #[test]
    fn test_balanced_entry() {
        let entry = JournalEntry::new(
            today(),
            "Cash sale",
            EntrySource::Manual,
            "tester",
            vec![
                JournalLine::debit("1000", 11000),
                JournalLine::credit("4000", 10000),
                JournalLine::credit("2100", 1000),
            ],
        );
        assert!(entry.is_balanced());
        assert_eq!(entry.totals(), (11000, 11000));
    }

    #[test]
    fn test_unbalanced_entry() {
        let entry = JournalEntry::new(
            today(),
            "Broken",
            EntrySource::Manual,
            "tester",
            vec![
                JournalLine::debit("1000", 10000),
                JournalLine::credit("4000", 9000),
            ],
        );
        assert!(!entry.is_balanced());
    }

    #[test]
    fn test_one_cent_drift_is_within_tolerance() {
        let entry = JournalEntry::new(
            today(),
            "Rounding drift",
            EntrySource::Module,
            "system",
            vec![
                JournalLine::debit("5100", 3334),
                JournalLine::credit("1200", 3333),
            ],
        );
        assert!(entry.is_balanced());
    }

    #[test]
    fn test_lines_are_numbered_in_order() {
        let entry = JournalEntry::new(
            today(),
            "Numbering",
            EntrySource::Manual,
            "tester",
            vec![
                JournalLine::debit("1000", 100),
                JournalLine::credit("4000", 100),
            ],
        );
        assert_eq!(entry.lines[0].line_no, 1);
        assert_eq!(entry.lines[1].line_no, 2);
        assert!(entry.lines.iter().all(|l| l.entry_id == entry.id));
    }

    #[test]
    fn test_line_validity() {
        assert!(JournalLine::debit("1000", 100).is_valid());
        assert!(JournalLine::credit("4000", 100).is_valid());
        assert!(!JournalLine::debit("1000", 0).is_valid());

        let mut both = JournalLine::debit("1000", 100);
        both.credit = 100;
        assert!(!both.is_valid());
    }
}
