use anyhow::{Context, Result};
use chrono::{DateTime, NaiveDate, Utc};
use sqlx::{Row, SqlitePool};
use uuid::Uuid;

use crate::domain::{
    Account, AccountType, AssetId, Cents, DepreciationMethod, Document, DocumentId, DocumentKind,
    DocumentLine, DocumentStatus, DocumentTotals, EntryId, EntrySource, EntryStatus, ExchangeRate,
    FixedAsset, InventoryMovement, JournalEntry, JournalLine, MovementKind, Payment, PaymentId,
    Product, ProductId,
};

use super::MIGRATION_001_INITIAL;

/// Per-account debit/credit sums over posted journal lines, used by the
/// reporting engine.
#[derive(Debug, Clone)]
pub struct AccountSums {
    pub code: String,
    pub name: String,
    pub account_type: AccountType,
    pub debit: Cents,
    pub credit: Cents,
}

/// Repository for persisting and querying all accounting records.
#[derive(Clone)]
pub struct Repository {
    pool: SqlitePool,
}

fn parse_date(s: &str) -> Result<NaiveDate> {
    NaiveDate::parse_from_str(s, "%Y-%m-%d").context("Invalid date")
}

fn parse_timestamp(s: &str) -> Result<DateTime<Utc>> {
    Ok(DateTime::parse_from_rfc3339(s)
        .context("Invalid timestamp")?
        .with_timezone(&Utc))
}

impl Repository {
    /// Create a new repository with the given SQLite connection pool.
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }

    /// Connect to a SQLite database at the given path.
    /// Creates the database file if it doesn't exist.
    pub async fn connect(database_url: &str) -> Result<Self> {
        let pool = SqlitePool::connect(database_url)
            .await
            .context("Failed to connect to database")?;
        Ok(Self::new(pool))
    }

    /// Run database migrations.
    pub async fn migrate(&self) -> Result<()> {
        sqlx::raw_sql(MIGRATION_001_INITIAL)
            .execute(&self.pool)
            .await
            .context("Failed to run migration 001")?;
        Ok(())
    }

    /// Initialize a new database (connect + migrate).
    pub async fn init(database_url: &str) -> Result<Self> {
        let repo = Self::connect(database_url).await?;
        repo.migrate().await?;
        Ok(repo)
    }

    // ========================
    // Account operations
    // ========================

    /// Save a new account to the chart.
    pub async fn save_account(&self, account: &Account) -> Result<()> {
        sqlx::query(
            r#"
            INSERT INTO accounts (id, code, name, account_type, created_at)
            VALUES (?, ?, ?, ?, ?)
            "#,
        )
        .bind(account.id.to_string())
        .bind(&account.code)
        .bind(&account.name)
        .bind(account.account_type.as_str())
        .bind(account.created_at.to_rfc3339())
        .execute(&self.pool)
        .await
        .context("Failed to save account")?;
        Ok(())
    }

    /// Get an account by its code.
    pub async fn get_account_by_code(&self, code: &str) -> Result<Option<Account>> {
        let row = sqlx::query(
            "SELECT id, code, name, account_type, created_at FROM accounts WHERE code = ?",
        )
        .bind(code)
        .fetch_optional(&self.pool)
        .await
        .context("Failed to fetch account")?;

        match row {
            Some(row) => Ok(Some(Self::row_to_account(&row)?)),
            None => Ok(None),
        }
    }

    /// List the chart of accounts ordered by code.
    pub async fn list_accounts(&self) -> Result<Vec<Account>> {
        let rows = sqlx::query(
            "SELECT id, code, name, account_type, created_at FROM accounts ORDER BY code",
        )
        .fetch_all(&self.pool)
        .await
        .context("Failed to list accounts")?;

        rows.iter().map(Self::row_to_account).collect()
    }

    fn row_to_account(row: &sqlx::sqlite::SqliteRow) -> Result<Account> {
        let id_str: String = row.get("id");
        let type_str: String = row.get("account_type");
        let created_at_str: String = row.get("created_at");

        Ok(Account {
            id: Uuid::parse_str(&id_str).context("Invalid account ID")?,
            code: row.get("code"),
            name: row.get("name"),
            account_type: AccountType::from_str(&type_str)
                .ok_or_else(|| anyhow::anyhow!("Invalid account type: {}", type_str))?,
            created_at: parse_timestamp(&created_at_str)?,
        })
    }

    // ========================
    // Journal operations
    // ========================

    /// Save a journal entry with its lines as one atomic unit.
    pub async fn save_entry(&self, entry: &JournalEntry) -> Result<()> {
        let mut tx = self.pool.begin().await.context("Failed to begin tx")?;

        sqlx::query(
            r#"
            INSERT INTO journal_entries (id, entry_date, description, memo, source, source_document, status, actor, created_at)
            VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?)
            "#,
        )
        .bind(entry.id.to_string())
        .bind(entry.date.to_string())
        .bind(&entry.description)
        .bind(&entry.memo)
        .bind(entry.source.as_str())
        .bind(entry.source_document.map(|id| id.to_string()))
        .bind(entry.status.as_str())
        .bind(&entry.actor)
        .bind(entry.created_at.to_rfc3339())
        .execute(&mut *tx)
        .await
        .context("Failed to save journal entry")?;

        for line in &entry.lines {
            sqlx::query(
                r#"
                INSERT INTO journal_lines (id, entry_id, line_no, account_code, debit_cents, credit_cents, description)
                VALUES (?, ?, ?, ?, ?, ?, ?)
                "#,
            )
            .bind(line.id.to_string())
            .bind(entry.id.to_string())
            .bind(line.line_no)
            .bind(&line.account_code)
            .bind(line.debit)
            .bind(line.credit)
            .bind(&line.description)
            .execute(&mut *tx)
            .await
            .context("Failed to save journal line")?;
        }

        tx.commit().await.context("Failed to commit journal entry")?;
        Ok(())
    }

    /// Get a journal entry by ID with its lines.
    pub async fn get_entry(&self, id: EntryId) -> Result<Option<JournalEntry>> {
        let row = sqlx::query(
            r#"
            SELECT id, entry_date, description, memo, source, source_document, status, actor, created_at
            FROM journal_entries
            WHERE id = ?
            "#,
        )
        .bind(id.to_string())
        .fetch_optional(&self.pool)
        .await
        .context("Failed to fetch journal entry")?;

        match row {
            Some(row) => {
                let mut entry = Self::row_to_entry(&row)?;
                entry.lines = self.entry_lines(id).await?;
                Ok(Some(entry))
            }
            None => Ok(None),
        }
    }

    /// List journal entries ordered by date, with lines attached.
    pub async fn list_entries(&self) -> Result<Vec<JournalEntry>> {
        let rows = sqlx::query(
            r#"
            SELECT id, entry_date, description, memo, source, source_document, status, actor, created_at
            FROM journal_entries
            ORDER BY entry_date, created_at
            "#,
        )
        .fetch_all(&self.pool)
        .await
        .context("Failed to list journal entries")?;

        let mut entries = Vec::with_capacity(rows.len());
        for row in &rows {
            let mut entry = Self::row_to_entry(row)?;
            entry.lines = self.entry_lines(entry.id).await?;
            entries.push(entry);
        }
        Ok(entries)
    }

    async fn entry_lines(&self, entry_id: EntryId) -> Result<Vec<JournalLine>> {
        let rows = sqlx::query(
            r#"
            SELECT id, entry_id, line_no, account_code, debit_cents, credit_cents, description
            FROM journal_lines
            WHERE entry_id = ?
            ORDER BY line_no
            "#,
        )
        .bind(entry_id.to_string())
        .fetch_all(&self.pool)
        .await
        .context("Failed to fetch journal lines")?;

        rows.iter().map(Self::row_to_journal_line).collect()
    }

    /// Transition an entry's status with a precondition on the current
    /// status. Returns false when the entry was not in `from`.
    pub async fn update_entry_status(
        &self,
        id: EntryId,
        from: EntryStatus,
        to: EntryStatus,
    ) -> Result<bool> {
        let result = sqlx::query("UPDATE journal_entries SET status = ? WHERE id = ? AND status = ?")
            .bind(to.as_str())
            .bind(id.to_string())
            .bind(from.as_str())
            .execute(&self.pool)
            .await
            .context("Failed to update entry status")?;
        Ok(result.rows_affected() > 0)
    }

    /// Derived balance of an account: debits minus credits over posted
    /// lines dated on or before `as_of`.
    pub async fn account_balance(&self, code: &str, as_of: NaiveDate) -> Result<Cents> {
        let row = sqlx::query(
            r#"
            SELECT COALESCE(SUM(l.debit_cents - l.credit_cents), 0) as balance
            FROM journal_lines l
            JOIN journal_entries e ON e.id = l.entry_id
            WHERE l.account_code = ? AND e.status = 'posted' AND e.entry_date <= ?
            "#,
        )
        .bind(code)
        .bind(as_of.to_string())
        .fetch_one(&self.pool)
        .await
        .context("Failed to compute account balance")?;

        Ok(row.get("balance"))
    }

    /// Per-account debit/credit sums over posted lines in a date window.
    /// Accounts with no activity are included with zero sums.
    pub async fn account_sums(
        &self,
        from: Option<NaiveDate>,
        to: NaiveDate,
    ) -> Result<Vec<AccountSums>> {
        let from_str = from.map(|d| d.to_string()).unwrap_or_default();
        let rows = sqlx::query(
            r#"
            SELECT a.code, a.name, a.account_type,
                   COALESCE(SUM(l.debit_cents), 0) as debit,
                   COALESCE(SUM(l.credit_cents), 0) as credit
            FROM accounts a
            LEFT JOIN journal_lines l ON l.account_code = a.code
                AND l.entry_id IN (
                    SELECT id FROM journal_entries
                    WHERE status = 'posted' AND entry_date >= ? AND entry_date <= ?
                )
            GROUP BY a.code, a.name, a.account_type
            ORDER BY a.code
            "#,
        )
        .bind(&from_str)
        .bind(to.to_string())
        .fetch_all(&self.pool)
        .await
        .context("Failed to compute account sums")?;

        rows.iter()
            .map(|row| {
                let type_str: String = row.get("account_type");
                Ok(AccountSums {
                    code: row.get("code"),
                    name: row.get("name"),
                    account_type: AccountType::from_str(&type_str)
                        .ok_or_else(|| anyhow::anyhow!("Invalid account type: {}", type_str))?,
                    debit: row.get("debit"),
                    credit: row.get("credit"),
                })
            })
            .collect()
    }

    fn row_to_entry(row: &sqlx::sqlite::SqliteRow) -> Result<JournalEntry> {
        let id_str: String = row.get("id");
        let date_str: String = row.get("entry_date");
        let source_str: String = row.get("source");
        let source_document_str: Option<String> = row.get("source_document");
        let status_str: String = row.get("status");
        let created_at_str: String = row.get("created_at");

        Ok(JournalEntry {
            id: Uuid::parse_str(&id_str).context("Invalid entry ID")?,
            date: parse_date(&date_str)?,
            description: row.get("description"),
            memo: row.get("memo"),
            source: EntrySource::from_str(&source_str)
                .ok_or_else(|| anyhow::anyhow!("Invalid entry source: {}", source_str))?,
            source_document: source_document_str
                .map(|s| Uuid::parse_str(&s))
                .transpose()
                .context("Invalid source document ID")?,
            status: EntryStatus::from_str(&status_str)
                .ok_or_else(|| anyhow::anyhow!("Invalid entry status: {}", status_str))?,
            actor: row.get("actor"),
            created_at: parse_timestamp(&created_at_str)?,
            lines: Vec::new(),
        })
    }

    fn row_to_journal_line(row: &sqlx::sqlite::SqliteRow) -> Result<JournalLine> {
        let id_str: String = row.get("id");
        let entry_id_str: String = row.get("entry_id");

        Ok(JournalLine {
            id: Uuid::parse_str(&id_str).context("Invalid line ID")?,
            entry_id: Uuid::parse_str(&entry_id_str).context("Invalid entry ID")?,
            line_no: row.get("line_no"),
            account_code: row.get("account_code"),
            debit: row.get("debit_cents"),
            credit: row.get("credit_cents"),
            description: row.get("description"),
        })
    }

    // ========================
    // Document operations
    // ========================

    /// Save a document with its lines as one atomic unit.
    pub async fn save_document(&self, document: &Document) -> Result<()> {
        let mut tx = self.pool.begin().await.context("Failed to begin tx")?;

        sqlx::query(
            r#"
            INSERT INTO documents (id, kind, number, party_id, party_name, issue_date, due_date,
                currency, exchange_rate, subtotal_cents, discount_cents, tax_cents, total_cents,
                amount_paid_cents, status, version, created_at)
            VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?)
            "#,
        )
        .bind(document.id.to_string())
        .bind(document.kind.as_str())
        .bind(&document.number)
        .bind(document.party_id.to_string())
        .bind(&document.party_name)
        .bind(document.issue_date.to_string())
        .bind(document.due_date.to_string())
        .bind(&document.currency)
        .bind(document.exchange_rate)
        .bind(document.subtotal)
        .bind(document.discount_total)
        .bind(document.tax_total)
        .bind(document.total)
        .bind(document.amount_paid)
        .bind(document.status.as_str())
        .bind(document.version)
        .bind(document.created_at.to_rfc3339())
        .execute(&mut *tx)
        .await
        .context("Failed to save document")?;

        for line in &document.lines {
            Self::insert_line(&mut tx, line).await?;
        }

        tx.commit().await.context("Failed to commit document")?;
        Ok(())
    }

    async fn insert_line(
        tx: &mut sqlx::Transaction<'_, sqlx::Sqlite>,
        line: &DocumentLine,
    ) -> Result<()> {
        sqlx::query(
            r#"
            INSERT INTO document_lines (id, document_id, line_no, product_id, description,
                quantity, unit_price_cents, discount_pct, tax_pct, line_total_cents)
            VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?)
            "#,
        )
        .bind(line.id.to_string())
        .bind(line.document_id.to_string())
        .bind(line.line_no)
        .bind(line.product_id.map(|id| id.to_string()))
        .bind(&line.description)
        .bind(line.quantity)
        .bind(line.unit_price)
        .bind(line.discount_pct)
        .bind(line.tax_pct)
        .bind(line.line_total)
        .execute(&mut **tx)
        .await
        .context("Failed to save document line")?;
        Ok(())
    }

    /// Get a document by its human-facing number.
    pub async fn get_document_by_number(&self, number: &str) -> Result<Option<Document>> {
        let row = sqlx::query(
            r#"
            SELECT id, kind, number, party_id, party_name, issue_date, due_date, currency,
                exchange_rate, subtotal_cents, discount_cents, tax_cents, total_cents,
                amount_paid_cents, status, version, created_at
            FROM documents
            WHERE number = ?
            "#,
        )
        .bind(number)
        .fetch_optional(&self.pool)
        .await
        .context("Failed to fetch document by number")?;

        match row {
            Some(row) => {
                let mut document = Self::row_to_document(&row)?;
                document.lines = self.document_lines(document.id).await?;
                Ok(Some(document))
            }
            None => Ok(None),
        }
    }

    /// List documents of a kind, newest first.
    pub async fn list_documents(&self, kind: DocumentKind) -> Result<Vec<Document>> {
        let rows = sqlx::query(
            r#"
            SELECT id, kind, number, party_id, party_name, issue_date, due_date, currency,
                exchange_rate, subtotal_cents, discount_cents, tax_cents, total_cents,
                amount_paid_cents, status, version, created_at
            FROM documents
            WHERE kind = ?
            ORDER BY created_at DESC
            "#,
        )
        .bind(kind.as_str())
        .fetch_all(&self.pool)
        .await
        .context("Failed to list documents")?;

        let mut documents = Vec::with_capacity(rows.len());
        for row in &rows {
            let mut document = Self::row_to_document(row)?;
            document.lines = self.document_lines(document.id).await?;
            documents.push(document);
        }
        Ok(documents)
    }

    /// Finalized, non-void documents with an outstanding balance. Used
    /// by the aging report.
    pub async fn open_documents(&self, kind: DocumentKind) -> Result<Vec<Document>> {
        let rows = sqlx::query(
            r#"
            SELECT id, kind, number, party_id, party_name, issue_date, due_date, currency,
                exchange_rate, subtotal_cents, discount_cents, tax_cents, total_cents,
                amount_paid_cents, status, version, created_at
            FROM documents
            WHERE kind = ?
              AND status NOT IN ('draft', 'void')
              AND total_cents - amount_paid_cents > 0
            ORDER BY due_date
            "#,
        )
        .bind(kind.as_str())
        .fetch_all(&self.pool)
        .await
        .context("Failed to list open documents")?;

        let mut documents = Vec::with_capacity(rows.len());
        for row in &rows {
            let mut document = Self::row_to_document(row)?;
            document.lines = self.document_lines(document.id).await?;
            documents.push(document);
        }
        Ok(documents)
    }

    /// Count documents of a kind (used for number assignment).
    pub async fn count_documents(&self, kind: DocumentKind) -> Result<i64> {
        let row = sqlx::query("SELECT COUNT(*) as count FROM documents WHERE kind = ?")
            .bind(kind.as_str())
            .fetch_one(&self.pool)
            .await
            .context("Failed to count documents")?;
        Ok(row.get("count"))
    }

    async fn document_lines(&self, document_id: DocumentId) -> Result<Vec<DocumentLine>> {
        let rows = sqlx::query(
            r#"
            SELECT id, document_id, line_no, product_id, description, quantity,
                unit_price_cents, discount_pct, tax_pct, line_total_cents
            FROM document_lines
            WHERE document_id = ?
            ORDER BY line_no
            "#,
        )
        .bind(document_id.to_string())
        .fetch_all(&self.pool)
        .await
        .context("Failed to fetch document lines")?;

        rows.iter().map(Self::row_to_document_line).collect()
    }

    /// Replace a document's full line set and rewrite header totals, all
    /// in one transaction guarded by the version stamp. Returns false on
    /// a version conflict (nothing is changed).
    pub async fn replace_document_lines(
        &self,
        id: DocumentId,
        version: i64,
        lines: &[DocumentLine],
        totals: DocumentTotals,
    ) -> Result<bool> {
        let mut tx = self.pool.begin().await.context("Failed to begin tx")?;

        let result = sqlx::query(
            r#"
            UPDATE documents
            SET subtotal_cents = ?, discount_cents = ?, tax_cents = ?, total_cents = ?,
                version = version + 1
            WHERE id = ? AND version = ?
            "#,
        )
        .bind(totals.subtotal)
        .bind(totals.discount_total)
        .bind(totals.tax_total)
        .bind(totals.total)
        .bind(id.to_string())
        .bind(version)
        .execute(&mut *tx)
        .await
        .context("Failed to update document totals")?;

        if result.rows_affected() == 0 {
            tx.rollback().await.ok();
            return Ok(false);
        }

        sqlx::query("DELETE FROM document_lines WHERE document_id = ?")
            .bind(id.to_string())
            .execute(&mut *tx)
            .await
            .context("Failed to delete old document lines")?;

        for line in lines {
            Self::insert_line(&mut tx, line).await?;
        }

        tx.commit().await.context("Failed to commit line replacement")?;
        Ok(true)
    }

    /// Status + totals write used by finalize, version-guarded.
    pub async fn update_document_finalized(
        &self,
        id: DocumentId,
        version: i64,
        totals: DocumentTotals,
        status: DocumentStatus,
    ) -> Result<bool> {
        let result = sqlx::query(
            r#"
            UPDATE documents
            SET subtotal_cents = ?, discount_cents = ?, tax_cents = ?, total_cents = ?,
                status = ?, version = version + 1
            WHERE id = ? AND version = ?
            "#,
        )
        .bind(totals.subtotal)
        .bind(totals.discount_total)
        .bind(totals.tax_total)
        .bind(totals.total)
        .bind(status.as_str())
        .bind(id.to_string())
        .bind(version)
        .execute(&self.pool)
        .await
        .context("Failed to finalize document")?;
        Ok(result.rows_affected() > 0)
    }

    /// Status-only write (void), version-guarded.
    pub async fn update_document_status(
        &self,
        id: DocumentId,
        version: i64,
        status: DocumentStatus,
    ) -> Result<bool> {
        let result = sqlx::query(
            "UPDATE documents SET status = ?, version = version + 1 WHERE id = ? AND version = ?",
        )
        .bind(status.as_str())
        .bind(id.to_string())
        .bind(version)
        .execute(&self.pool)
        .await
        .context("Failed to update document status")?;
        Ok(result.rows_affected() > 0)
    }

    /// Balance write used by payment application, version-guarded.
    pub async fn update_document_payment(
        &self,
        id: DocumentId,
        version: i64,
        amount_paid: Cents,
        status: DocumentStatus,
    ) -> Result<bool> {
        let result = sqlx::query(
            r#"
            UPDATE documents
            SET amount_paid_cents = ?, status = ?, version = version + 1
            WHERE id = ? AND version = ?
            "#,
        )
        .bind(amount_paid)
        .bind(status.as_str())
        .bind(id.to_string())
        .bind(version)
        .execute(&self.pool)
        .await
        .context("Failed to update document payment")?;
        Ok(result.rows_affected() > 0)
    }

    /// Delete a draft document and its lines. Drafts have no payments or
    /// ledger entries, so this is a plain removal.
    pub async fn delete_document(&self, id: DocumentId) -> Result<()> {
        let mut tx = self.pool.begin().await.context("Failed to begin tx")?;

        sqlx::query("DELETE FROM document_lines WHERE document_id = ?")
            .bind(id.to_string())
            .execute(&mut *tx)
            .await
            .context("Failed to delete document lines")?;

        sqlx::query("DELETE FROM documents WHERE id = ?")
            .bind(id.to_string())
            .execute(&mut *tx)
            .await
            .context("Failed to delete document")?;

        tx.commit().await.context("Failed to commit document delete")?;
        Ok(())
    }

    fn row_to_document(row: &sqlx::sqlite::SqliteRow) -> Result<Document> {
        let id_str: String = row.get("id");
        let kind_str: String = row.get("kind");
        let party_id_str: String = row.get("party_id");
        let issue_date_str: String = row.get("issue_date");
        let due_date_str: String = row.get("due_date");
        let status_str: String = row.get("status");
        let created_at_str: String = row.get("created_at");

        Ok(Document {
            id: Uuid::parse_str(&id_str).context("Invalid document ID")?,
            kind: DocumentKind::from_str(&kind_str)
                .ok_or_else(|| anyhow::anyhow!("Invalid document kind: {}", kind_str))?,
            number: row.get("number"),
            party_id: Uuid::parse_str(&party_id_str).context("Invalid party ID")?,
            party_name: row.get("party_name"),
            issue_date: parse_date(&issue_date_str)?,
            due_date: parse_date(&due_date_str)?,
            currency: row.get("currency"),
            exchange_rate: row.get("exchange_rate"),
            subtotal: row.get("subtotal_cents"),
            discount_total: row.get("discount_cents"),
            tax_total: row.get("tax_cents"),
            total: row.get("total_cents"),
            amount_paid: row.get("amount_paid_cents"),
            status: DocumentStatus::from_str(&status_str)
                .ok_or_else(|| anyhow::anyhow!("Invalid document status: {}", status_str))?,
            version: row.get("version"),
            created_at: parse_timestamp(&created_at_str)?,
            lines: Vec::new(),
        })
    }

    fn row_to_document_line(row: &sqlx::sqlite::SqliteRow) -> Result<DocumentLine> {
        let id_str: String = row.get("id");
        let document_id_str: String = row.get("document_id");
        let product_id_str: Option<String> = row.get("product_id");

        Ok(DocumentLine {
            id: Uuid::parse_str(&id_str).context("Invalid line ID")?,
            document_id: Uuid::parse_str(&document_id_str).context("Invalid document ID")?,
            line_no: row.get("line_no"),
            product_id: product_id_str
                .map(|s| Uuid::parse_str(&s))
                .transpose()
                .context("Invalid product ID")?,
            description: row.get("description"),
            quantity: row.get("quantity"),
            unit_price: row.get("unit_price_cents"),
            discount_pct: row.get("discount_pct"),
            tax_pct: row.get("tax_pct"),
            line_total: row.get("line_total_cents"),
        })
    }

    // ========================
    // Payment operations
    // ========================

    /// Save a new payment record.
    pub async fn save_payment(&self, payment: &Payment) -> Result<()> {
        sqlx::query(
            r#"
            INSERT INTO payments (id, document_id, amount_cents, paid_on, method, reference, created_at)
            VALUES (?, ?, ?, ?, ?, ?, ?)
            "#,
        )
        .bind(payment.id.to_string())
        .bind(payment.document_id.to_string())
        .bind(payment.amount)
        .bind(payment.date.to_string())
        .bind(&payment.method)
        .bind(&payment.reference)
        .bind(payment.created_at.to_rfc3339())
        .execute(&self.pool)
        .await
        .context("Failed to save payment")?;
        Ok(())
    }

    /// Remove a payment record. Only used by the compensating rollback
    /// when ledger posting fails after the payment write.
    pub async fn delete_payment(&self, id: PaymentId) -> Result<()> {
        sqlx::query("DELETE FROM payments WHERE id = ?")
            .bind(id.to_string())
            .execute(&self.pool)
            .await
            .context("Failed to delete payment")?;
        Ok(())
    }

    /// List payments applied to a document, oldest first.
    pub async fn payments_for_document(&self, document_id: DocumentId) -> Result<Vec<Payment>> {
        let rows = sqlx::query(
            r#"
            SELECT id, document_id, amount_cents, paid_on, method, reference, created_at
            FROM payments
            WHERE document_id = ?
            ORDER BY created_at
            "#,
        )
        .bind(document_id.to_string())
        .fetch_all(&self.pool)
        .await
        .context("Failed to list payments")?;

        rows.iter().map(Self::row_to_payment).collect()
    }

    fn row_to_payment(row: &sqlx::sqlite::SqliteRow) -> Result<Payment> {
        let id_str: String = row.get("id");
        let document_id_str: String = row.get("document_id");
        let paid_on_str: String = row.get("paid_on");
        let created_at_str: String = row.get("created_at");

        Ok(Payment {
            id: Uuid::parse_str(&id_str).context("Invalid payment ID")?,
            document_id: Uuid::parse_str(&document_id_str).context("Invalid document ID")?,
            amount: row.get("amount_cents"),
            date: parse_date(&paid_on_str)?,
            method: row.get("method"),
            reference: row.get("reference"),
            created_at: parse_timestamp(&created_at_str)?,
        })
    }

    // ========================
    // Product & inventory operations
    // ========================

    /// Save a new product.
    pub async fn save_product(&self, product: &Product) -> Result<()> {
        sqlx::query(
            r#"
            INSERT INTO products (id, sku, name, unit_price_cents, cost_price_cents, quantity_on_hand, tracked, created_at)
            VALUES (?, ?, ?, ?, ?, ?, ?, ?)
            "#,
        )
        .bind(product.id.to_string())
        .bind(&product.sku)
        .bind(&product.name)
        .bind(product.unit_price)
        .bind(product.cost_price)
        .bind(product.quantity_on_hand)
        .bind(product.tracked)
        .bind(product.created_at.to_rfc3339())
        .execute(&self.pool)
        .await
        .context("Failed to save product")?;
        Ok(())
    }

    /// Get a product by ID.
    pub async fn get_product(&self, id: ProductId) -> Result<Option<Product>> {
        let row = sqlx::query(
            r#"
            SELECT id, sku, name, unit_price_cents, cost_price_cents, quantity_on_hand, tracked, created_at
            FROM products
            WHERE id = ?
            "#,
        )
        .bind(id.to_string())
        .fetch_optional(&self.pool)
        .await
        .context("Failed to fetch product")?;

        match row {
            Some(row) => Ok(Some(Self::row_to_product(&row)?)),
            None => Ok(None),
        }
    }

    /// Get a product by SKU.
    pub async fn get_product_by_sku(&self, sku: &str) -> Result<Option<Product>> {
        let row = sqlx::query(
            r#"
            SELECT id, sku, name, unit_price_cents, cost_price_cents, quantity_on_hand, tracked, created_at
            FROM products
            WHERE sku = ?
            "#,
        )
        .bind(sku)
        .fetch_optional(&self.pool)
        .await
        .context("Failed to fetch product by SKU")?;

        match row {
            Some(row) => Ok(Some(Self::row_to_product(&row)?)),
            None => Ok(None),
        }
    }

    /// List all products ordered by SKU.
    pub async fn list_products(&self) -> Result<Vec<Product>> {
        let rows = sqlx::query(
            r#"
            SELECT id, sku, name, unit_price_cents, cost_price_cents, quantity_on_hand, tracked, created_at
            FROM products
            ORDER BY sku
            "#,
        )
        .fetch_all(&self.pool)
        .await
        .context("Failed to list products")?;

        rows.iter().map(Self::row_to_product).collect()
    }

    /// Apply one movement: insert the record and shift quantity-on-hand
    /// (optionally rewriting the weighted-average cost), atomically. The
    /// quantity guard in the UPDATE keeps stock from going negative even
    /// if a concurrent writer got in after the engine's precheck.
    pub async fn apply_movement(
        &self,
        movement: &InventoryMovement,
        new_cost: Option<Cents>,
    ) -> Result<()> {
        let mut tx = self.pool.begin().await.context("Failed to begin tx")?;
        Self::apply_movement_tx(&mut tx, movement, new_cost).await?;
        tx.commit().await.context("Failed to commit movement")?;
        Ok(())
    }

    /// Apply several movements as a single atomic unit (consume/reverse).
    pub async fn apply_movements(&self, movements: &[InventoryMovement]) -> Result<()> {
        let mut tx = self.pool.begin().await.context("Failed to begin tx")?;
        for movement in movements {
            Self::apply_movement_tx(&mut tx, movement, None).await?;
        }
        tx.commit().await.context("Failed to commit movements")?;
        Ok(())
    }

    async fn apply_movement_tx(
        tx: &mut sqlx::Transaction<'_, sqlx::Sqlite>,
        movement: &InventoryMovement,
        new_cost: Option<Cents>,
    ) -> Result<()> {
        sqlx::query(
            r#"
            INSERT INTO inventory_movements (id, product_id, quantity, unit_cost_cents, kind, document_id, actor, occurred_at)
            VALUES (?, ?, ?, ?, ?, ?, ?, ?)
            "#,
        )
        .bind(movement.id.to_string())
        .bind(movement.product_id.to_string())
        .bind(movement.quantity)
        .bind(movement.unit_cost)
        .bind(movement.kind.as_str())
        .bind(movement.document_id.map(|id| id.to_string()))
        .bind(&movement.actor)
        .bind(movement.occurred_at.to_rfc3339())
        .execute(&mut **tx)
        .await
        .context("Failed to save inventory movement")?;

        let result = if let Some(cost) = new_cost {
            sqlx::query(
                r#"
                UPDATE products
                SET quantity_on_hand = quantity_on_hand + ?, cost_price_cents = ?
                WHERE id = ? AND quantity_on_hand + ? >= -1e-9
                "#,
            )
            .bind(movement.quantity)
            .bind(cost)
            .bind(movement.product_id.to_string())
            .bind(movement.quantity)
            .execute(&mut **tx)
            .await
        } else {
            sqlx::query(
                r#"
                UPDATE products
                SET quantity_on_hand = quantity_on_hand + ?
                WHERE id = ? AND quantity_on_hand + ? >= -1e-9
                "#,
            )
            .bind(movement.quantity)
            .bind(movement.product_id.to_string())
            .bind(movement.quantity)
            .execute(&mut **tx)
            .await
        }
        .context("Failed to update quantity on hand")?;

        if result.rows_affected() == 0 {
            anyhow::bail!(
                "stock update rejected for product {} (would go negative)",
                movement.product_id
            );
        }
        Ok(())
    }

    /// Movements recorded against a document, optionally filtered by kind.
    pub async fn movements_for_document(
        &self,
        document_id: DocumentId,
        kind: Option<MovementKind>,
    ) -> Result<Vec<InventoryMovement>> {
        let rows = match kind {
            Some(kind) => {
                sqlx::query(
                    r#"
                    SELECT id, product_id, quantity, unit_cost_cents, kind, document_id, actor, occurred_at
                    FROM inventory_movements
                    WHERE document_id = ? AND kind = ?
                    ORDER BY occurred_at
                    "#,
                )
                .bind(document_id.to_string())
                .bind(kind.as_str())
                .fetch_all(&self.pool)
                .await
            }
            None => {
                sqlx::query(
                    r#"
                    SELECT id, product_id, quantity, unit_cost_cents, kind, document_id, actor, occurred_at
                    FROM inventory_movements
                    WHERE document_id = ?
                    ORDER BY occurred_at
                    "#,
                )
                .bind(document_id.to_string())
                .fetch_all(&self.pool)
                .await
            }
        }
        .context("Failed to list movements for document")?;

        rows.iter().map(Self::row_to_movement).collect()
    }

    /// Movement history for a product, oldest first.
    pub async fn movements_for_product(
        &self,
        product_id: ProductId,
    ) -> Result<Vec<InventoryMovement>> {
        let rows = sqlx::query(
            r#"
            SELECT id, product_id, quantity, unit_cost_cents, kind, document_id, actor, occurred_at
            FROM inventory_movements
            WHERE product_id = ?
            ORDER BY occurred_at
            "#,
        )
        .bind(product_id.to_string())
        .fetch_all(&self.pool)
        .await
        .context("Failed to list movements for product")?;

        rows.iter().map(Self::row_to_movement).collect()
    }

    fn row_to_product(row: &sqlx::sqlite::SqliteRow) -> Result<Product> {
        let id_str: String = row.get("id");
        let created_at_str: String = row.get("created_at");

        Ok(Product {
            id: Uuid::parse_str(&id_str).context("Invalid product ID")?,
            sku: row.get("sku"),
            name: row.get("name"),
            unit_price: row.get("unit_price_cents"),
            cost_price: row.get("cost_price_cents"),
            quantity_on_hand: row.get("quantity_on_hand"),
            tracked: row.get::<i32, _>("tracked") != 0,
            created_at: parse_timestamp(&created_at_str)?,
        })
    }

    fn row_to_movement(row: &sqlx::sqlite::SqliteRow) -> Result<InventoryMovement> {
        let id_str: String = row.get("id");
        let product_id_str: String = row.get("product_id");
        let kind_str: String = row.get("kind");
        let document_id_str: Option<String> = row.get("document_id");
        let occurred_at_str: String = row.get("occurred_at");

        Ok(InventoryMovement {
            id: Uuid::parse_str(&id_str).context("Invalid movement ID")?,
            product_id: Uuid::parse_str(&product_id_str).context("Invalid product ID")?,
            quantity: row.get("quantity"),
            unit_cost: row.get("unit_cost_cents"),
            kind: MovementKind::from_str(&kind_str)
                .ok_or_else(|| anyhow::anyhow!("Invalid movement kind: {}", kind_str))?,
            document_id: document_id_str
                .map(|s| Uuid::parse_str(&s))
                .transpose()
                .context("Invalid document ID")?,
            actor: row.get("actor"),
            occurred_at: parse_timestamp(&occurred_at_str)?,
        })
    }

    // ========================
    // Exchange rate operations
    // ========================

    /// Insert or overwrite the rate fact for (from, to, date).
    pub async fn upsert_rate(&self, rate: &ExchangeRate) -> Result<()> {
        sqlx::query(
            r#"
            INSERT INTO exchange_rates (id, from_currency, to_currency, rate, effective_date)
            VALUES (?, ?, ?, ?, ?)
            ON CONFLICT(from_currency, to_currency, effective_date)
            DO UPDATE SET rate = excluded.rate
            "#,
        )
        .bind(rate.id.to_string())
        .bind(&rate.from_currency)
        .bind(&rate.to_currency)
        .bind(rate.rate)
        .bind(rate.effective_date.to_string())
        .execute(&self.pool)
        .await
        .context("Failed to upsert exchange rate")?;
        Ok(())
    }

    /// Most recent rate fact for a pair on or before the given date.
    pub async fn latest_rate(
        &self,
        from: &str,
        to: &str,
        on_or_before: NaiveDate,
    ) -> Result<Option<ExchangeRate>> {
        let row = sqlx::query(
            r#"
            SELECT id, from_currency, to_currency, rate, effective_date
            FROM exchange_rates
            WHERE from_currency = ? AND to_currency = ? AND effective_date <= ?
            ORDER BY effective_date DESC
            LIMIT 1
            "#,
        )
        .bind(from)
        .bind(to)
        .bind(on_or_before.to_string())
        .fetch_optional(&self.pool)
        .await
        .context("Failed to fetch exchange rate")?;

        match row {
            Some(row) => {
                let id_str: String = row.get("id");
                let date_str: String = row.get("effective_date");
                Ok(Some(ExchangeRate {
                    id: Uuid::parse_str(&id_str).context("Invalid rate ID")?,
                    from_currency: row.get("from_currency"),
                    to_currency: row.get("to_currency"),
                    rate: row.get("rate"),
                    effective_date: parse_date(&date_str)?,
                }))
            }
            None => Ok(None),
        }
    }

    // ========================
    // Fixed asset operations
    // ========================

    /// Save a new fixed asset.
    pub async fn save_asset(&self, asset: &FixedAsset) -> Result<()> {
        sqlx::query(
            r#"
            INSERT INTO fixed_assets (id, name, purchase_date, cost_cents, residual_cents, useful_life_months, method, created_at)
            VALUES (?, ?, ?, ?, ?, ?, ?, ?)
            "#,
        )
        .bind(asset.id.to_string())
        .bind(&asset.name)
        .bind(asset.purchase_date.to_string())
        .bind(asset.cost)
        .bind(asset.residual_value)
        .bind(asset.useful_life_months as i64)
        .bind(asset.method.as_str())
        .bind(asset.created_at.to_rfc3339())
        .execute(&self.pool)
        .await
        .context("Failed to save fixed asset")?;
        Ok(())
    }

    /// Get a fixed asset by ID.
    pub async fn get_asset(&self, id: AssetId) -> Result<Option<FixedAsset>> {
        let row = sqlx::query(
            r#"
            SELECT id, name, purchase_date, cost_cents, residual_cents, useful_life_months, method, created_at
            FROM fixed_assets
            WHERE id = ?
            "#,
        )
        .bind(id.to_string())
        .fetch_optional(&self.pool)
        .await
        .context("Failed to fetch fixed asset")?;

        match row {
            Some(row) => Ok(Some(Self::row_to_asset(&row)?)),
            None => Ok(None),
        }
    }

    /// List all fixed assets by purchase date.
    pub async fn list_assets(&self) -> Result<Vec<FixedAsset>> {
        let rows = sqlx::query(
            r#"
            SELECT id, name, purchase_date, cost_cents, residual_cents, useful_life_months, method, created_at
            FROM fixed_assets
            ORDER BY purchase_date
            "#,
        )
        .fetch_all(&self.pool)
        .await
        .context("Failed to list fixed assets")?;

        rows.iter().map(Self::row_to_asset).collect()
    }

    fn row_to_asset(row: &sqlx::sqlite::SqliteRow) -> Result<FixedAsset> {
        let id_str: String = row.get("id");
        let purchase_date_str: String = row.get("purchase_date");
        let method_str: String = row.get("method");
        let created_at_str: String = row.get("created_at");

        Ok(FixedAsset {
            id: Uuid::parse_str(&id_str).context("Invalid asset ID")?,
            name: row.get("name"),
            purchase_date: parse_date(&purchase_date_str)?,
            cost: row.get("cost_cents"),
            residual_value: row.get("residual_cents"),
            useful_life_months: row.get::<i64, _>("useful_life_months") as u32,
            method: DepreciationMethod::from_str(&method_str)
                .ok_or_else(|| anyhow::anyhow!("Invalid depreciation method: {}", method_str))?,
            created_at: parse_timestamp(&created_at_str)?,
        })
    }

    // ========================
    // Settings operations
    // ========================

    /// Read one settings value.
    pub async fn get_setting(&self, key: &str) -> Result<Option<String>> {
        let row = sqlx::query("SELECT value FROM settings WHERE key = ?")
            .bind(key)
            .fetch_optional(&self.pool)
            .await
            .context("Failed to fetch setting")?;
        Ok(row.map(|r| r.get("value")))
    }

    /// Write one settings value (insert or overwrite).
    pub async fn put_setting(&self, key: &str, value: &str) -> Result<()> {
        sqlx::query(
            "INSERT INTO settings (key, value) VALUES (?, ?) ON CONFLICT(key) DO UPDATE SET value = excluded.value",
        )
        .bind(key)
        .bind(value)
        .execute(&self.pool)
        .await
        .context("Failed to save setting")?;
        Ok(())
    }

    /// Read the whole settings table as key/value pairs.
    pub async fn all_settings(&self) -> Result<Vec<(String, String)>> {
        let rows = sqlx::query("SELECT key, value FROM settings ORDER BY key")
            .fetch_all(&self.pool)
            .await
            .context("Failed to list settings")?;
        Ok(rows
            .iter()
            .map(|r| (r.get("key"), r.get("value")))
            .collect())
    }
}
