// Allow dead_code because these helpers are used across different test files
// which are compiled separately
#![allow(dead_code)]

use anyhow::Result;
use chrono::{NaiveDate, Utc};
use tallybook::application::{Books, NewDocument, NewDocumentLine};
use tallybook::domain::{AdjustmentKind, Cents, DocumentKind};
use tempfile::TempDir;

/// Helper to create a test service with a temporary database
pub async fn test_books() -> Result<(Books, TempDir)> {
    let temp_dir = TempDir::new()?;
    let db_path = temp_dir.path().join("test.db");
    let books = Books::init(db_path.to_str().unwrap()).await?;
    Ok((books, temp_dir))
}

/// Helper to parse a date string into NaiveDate
pub fn date(date_str: &str) -> NaiveDate {
    NaiveDate::parse_from_str(date_str, "%Y-%m-%d").unwrap()
}

pub fn today() -> NaiveDate {
    Utc::now().date_naive()
}

/// A plain service line with no product link
pub fn service_line(quantity: f64, unit_price: Cents, tax_pct: f64) -> NewDocumentLine {
    NewDocumentLine {
        product_sku: None,
        description: "Services".to_string(),
        quantity,
        unit_price: Some(unit_price),
        discount_pct: 0.0,
        tax_pct,
    }
}

/// A line linked to a tracked product by SKU
pub fn product_line(sku: &str, quantity: f64, unit_price: Cents, tax_pct: f64) -> NewDocumentLine {
    NewDocumentLine {
        product_sku: Some(sku.to_string()),
        description: String::new(),
        quantity,
        unit_price: Some(unit_price),
        discount_pct: 0.0,
        tax_pct,
    }
}

/// Request for a document due 30 days after issue
pub fn document_request(
    kind: DocumentKind,
    party: &str,
    issue: &str,
    lines: Vec<NewDocumentLine>,
) -> NewDocument {
    let issue_date = date(issue);
    NewDocument {
        kind,
        number: None,
        party_id: None,
        party_name: party.to_string(),
        issue_date,
        due_date: issue_date + chrono::Duration::days(30),
        currency: None,
        exchange_rate: None,
        lines,
    }
}

pub fn invoice_request(party: &str, issue: &str, lines: Vec<NewDocumentLine>) -> NewDocument {
    document_request(DocumentKind::Invoice, party, issue, lines)
}

pub fn bill_request(party: &str, issue: &str, lines: Vec<NewDocumentLine>) -> NewDocument {
    document_request(DocumentKind::Bill, party, issue, lines)
}

/// Create a tracked product and receive opening stock at a unit cost
pub async fn seed_product(
    books: &Books,
    sku: &str,
    unit_price: Cents,
    opening_qty: f64,
    unit_cost: Cents,
) -> Result<()> {
    books
        .inventory
        .create_product(sku, &format!("Product {sku}"), unit_price, 0, true)
        .await?;
    if opening_qty > 0.0 {
        books
            .inventory
            .adjust(sku, AdjustmentKind::Receive, opening_qty, Some(unit_cost), "test")
            .await?;
    }
    Ok(())
}
