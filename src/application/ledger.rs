use chrono::NaiveDate;
use tracing::info;
use uuid::Uuid;

use crate::application::error::AppError;
use crate::domain::{
    Account, AccountType, Cents, EntryId, EntrySource, EntryStatus, JournalEntry, JournalLine,
};
use crate::storage::Repository;

/// Request for a new journal entry. Lines are built with
/// `JournalLine::debit` / `JournalLine::credit`.
#[derive(Debug, Clone)]
pub struct NewEntry {
    pub date: NaiveDate,
    pub description: String,
    pub memo: Option<String>,
    pub actor: String,
    pub lines: Vec<JournalLine>,
}

/// Owner of journal entries and the chart of accounts. Every other
/// engine posts through `post_generated`.
#[derive(Clone)]
pub struct LedgerEngine {
    repo: Repository,
}

impl LedgerEngine {
    pub fn new(repo: Repository) -> Self {
        Self { repo }
    }

    // ---- chart of accounts ----

    /// Add an account. The code's leading digit must match the type.
    pub async fn add_account(
        &self,
        code: &str,
        name: &str,
        account_type: AccountType,
    ) -> Result<Account, AppError> {
        let account = Account::new(code, name, account_type);
        if !account.code_matches_type() {
            return Err(AppError::AccountCodeMismatch {
                code: code.to_string(),
                account_type: account_type.to_string(),
            });
        }
        if self.repo.get_account_by_code(code).await?.is_some() {
            return Err(AppError::AccountAlreadyExists(code.to_string()));
        }
        self.repo.save_account(&account).await?;
        info!(code = %account.code, account_type = %account.account_type, "account created");
        Ok(account)
    }

    pub async fn list_accounts(&self) -> Result<Vec<Account>, AppError> {
        Ok(self.repo.list_accounts().await?)
    }

    // ---- journal entries ----

    /// Create a manual entry, optionally posting it in the same call.
    pub async fn create_entry(
        &self,
        new_entry: NewEntry,
        post_immediately: bool,
    ) -> Result<JournalEntry, AppError> {
        let mut entry = JournalEntry::new(
            new_entry.date,
            new_entry.description,
            EntrySource::Manual,
            new_entry.actor,
            new_entry.lines,
        );
        if let Some(memo) = new_entry.memo {
            entry = entry.with_memo(memo);
        }

        self.validate_entry(&entry).await?;
        if post_immediately {
            entry.status = EntryStatus::Posted;
        }
        self.repo.save_entry(&entry).await?;
        info!(entry_id = %entry.id, status = %entry.status, "journal entry created");
        Ok(entry)
    }

    /// Post a draft entry. The balance invariant was checked at creation
    /// and lines are immutable, so only the status gate applies here.
    pub async fn post_entry(&self, id: EntryId) -> Result<JournalEntry, AppError> {
        let entry = self
            .repo
            .get_entry(id)
            .await?
            .ok_or_else(|| AppError::EntryNotFound(id.to_string()))?;

        let moved = self
            .repo
            .update_entry_status(id, EntryStatus::Draft, EntryStatus::Posted)
            .await?;
        if !moved {
            return Err(AppError::InvalidEntryStatus {
                current: entry.status.to_string(),
                expected: "draft",
            });
        }
        info!(entry_id = %id, "journal entry posted");
        self.get_entry(id).await
    }

    /// Void a posted entry. Voided entries stay on file; nothing is
    /// deleted or renumbered.
    pub async fn void_entry(&self, id: EntryId) -> Result<JournalEntry, AppError> {
        let entry = self
            .repo
            .get_entry(id)
            .await?
            .ok_or_else(|| AppError::EntryNotFound(id.to_string()))?;

        let moved = self
            .repo
            .update_entry_status(id, EntryStatus::Posted, EntryStatus::Void)
            .await?;
        if !moved {
            return Err(AppError::InvalidEntryStatus {
                current: entry.status.to_string(),
                expected: "posted",
            });
        }
        info!(entry_id = %id, "journal entry voided");
        self.get_entry(id).await
    }

    pub async fn get_entry(&self, id: EntryId) -> Result<JournalEntry, AppError> {
        self.repo
            .get_entry(id)
            .await?
            .ok_or_else(|| AppError::EntryNotFound(id.to_string()))
    }

    pub async fn list_entries(&self) -> Result<Vec<JournalEntry>, AppError> {
        Ok(self.repo.list_entries().await?)
    }

    /// Derived balance: debits minus credits over posted lines up to a
    /// date. Sign interpretation (normal balance) is the reader's job.
    pub async fn account_balance(&self, code: &str, as_of: NaiveDate) -> Result<Cents, AppError> {
        if self.repo.get_account_by_code(code).await?.is_none() {
            return Err(AppError::AccountNotFound(code.to_string()));
        }
        Ok(self.repo.account_balance(code, as_of).await?)
    }

    /// Validate and post a module-generated entry (finalize, payment,
    /// consumption). Written directly as posted.
    pub(crate) async fn post_generated(
        &self,
        date: NaiveDate,
        description: String,
        source_document: Uuid,
        actor: String,
        lines: Vec<JournalLine>,
    ) -> Result<JournalEntry, AppError> {
        let mut entry = JournalEntry::new(date, description, EntrySource::Module, actor, lines)
            .with_source_document(source_document);
        self.validate_entry(&entry).await?;
        entry.status = EntryStatus::Posted;
        self.repo.save_entry(&entry).await?;
        info!(entry_id = %entry.id, document_id = %source_document, "module entry posted");
        Ok(entry)
    }

    /// Post preconditions: non-empty, every line valid, every account
    /// code resolves, debits equal credits within one cent. Nothing is
    /// written when any of these fail.
    async fn validate_entry(&self, entry: &JournalEntry) -> Result<(), AppError> {
        if entry.lines.is_empty() {
            return Err(AppError::EmptyEntry);
        }
        for line in &entry.lines {
            if !line.is_valid() {
                return Err(AppError::InvalidLine(line.line_no));
            }
            if self
                .repo
                .get_account_by_code(&line.account_code)
                .await?
                .is_none()
            {
                return Err(AppError::AccountNotFound(line.account_code.clone()));
            }
        }
        if !entry.is_balanced() {
            let (debits, credits) = entry.totals();
            return Err(AppError::ImbalancedEntry { debits, credits });
        }
        Ok(())
    }
}
