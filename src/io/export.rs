use anyhow::Result;
use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use std::io::Write;

use crate::application::Books;
use crate::domain::{Account, Document, DocumentKind, JournalEntry, Product, format_cents};

/// Database snapshot for full export
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BooksSnapshot {
    pub version: String,
    pub exported_at: DateTime<Utc>,
    pub accounts: Vec<Account>,
    pub entries: Vec<JournalEntry>,
    pub invoices: Vec<Document>,
    pub bills: Vec<Document>,
    pub products: Vec<Product>,
}

/// Exporter for writing reports as CSV
pub struct Exporter<'a> {
    books: &'a Books,
}

impl<'a> Exporter<'a> {
    pub fn new(books: &'a Books) -> Self {
        Self { books }
    }

    /// Export the trial balance to CSV format
    pub async fn export_trial_balance_csv<W: Write>(
        &self,
        writer: W,
        as_of: NaiveDate,
    ) -> Result<usize> {
        let report = self.books.reporting.trial_balance(as_of).await?;
        let mut csv_writer = csv::Writer::from_writer(writer);

        csv_writer.write_record(["code", "name", "debit", "credit"])?;

        let mut count = 0;
        for row in &report.rows {
            csv_writer.write_record([
                row.code.clone(),
                row.name.clone(),
                format_cents(row.debit),
                format_cents(row.credit),
            ])?;
            count += 1;
        }
        csv_writer.write_record([
            String::new(),
            "TOTAL".to_string(),
            format_cents(report.total_debits),
            format_cents(report.total_credits),
        ])?;

        csv_writer.flush()?;
        Ok(count)
    }

    /// Export an aging report to CSV format
    pub async fn export_aging_csv<W: Write>(
        &self,
        writer: W,
        kind: DocumentKind,
        as_of: NaiveDate,
    ) -> Result<usize> {
        let report = self.books.reporting.aging(kind, as_of).await?;
        let mut csv_writer = csv::Writer::from_writer(writer);

        csv_writer.write_record([
            "number",
            "party",
            "due_date",
            "days_overdue",
            "bucket",
            "currency",
            "outstanding",
            "outstanding_converted",
        ])?;

        let mut count = 0;
        for row in &report.rows {
            csv_writer.write_record([
                row.number.clone(),
                row.party_name.clone(),
                row.due_date.to_string(),
                row.days_overdue.to_string(),
                row.bucket.label().to_string(),
                row.currency.clone(),
                format_cents(row.outstanding),
                row.outstanding_converted
                    .map(format_cents)
                    .unwrap_or_default(),
            ])?;
            count += 1;
        }

        csv_writer.flush()?;
        Ok(count)
    }

    /// Export the journal (entries with their lines) to CSV format
    pub async fn export_journal_csv<W: Write>(&self, writer: W) -> Result<usize> {
        let entries = self.books.ledger.list_entries().await?;
        let mut csv_writer = csv::Writer::from_writer(writer);

        csv_writer.write_record([
            "entry_id",
            "date",
            "description",
            "status",
            "source",
            "line_no",
            "account",
            "debit",
            "credit",
        ])?;

        let mut count = 0;
        for entry in &entries {
            for line in &entry.lines {
                csv_writer.write_record([
                    entry.id.to_string(),
                    entry.date.to_string(),
                    entry.description.clone(),
                    entry.status.to_string(),
                    entry.source.as_str().to_string(),
                    line.line_no.to_string(),
                    line.account_code.clone(),
                    format_cents(line.debit),
                    format_cents(line.credit),
                ])?;
                count += 1;
            }
        }

        csv_writer.flush()?;
        Ok(count)
    }

    /// Export the full database as a JSON snapshot
    pub async fn export_full_json<W: Write>(&self, mut writer: W) -> Result<BooksSnapshot> {
        let snapshot = BooksSnapshot {
            version: env!("CARGO_PKG_VERSION").to_string(),
            exported_at: Utc::now(),
            accounts: self.books.ledger.list_accounts().await?,
            entries: self.books.ledger.list_entries().await?,
            invoices: self.books.documents.list(DocumentKind::Invoice).await?,
            bills: self.books.documents.list(DocumentKind::Bill).await?,
            products: self.books.inventory.list_products().await?,
        };

        let json = serde_json::to_string_pretty(&snapshot)?;
        writer.write_all(json.as_bytes())?;
        writer.flush()?;

        Ok(snapshot)
    }
}
