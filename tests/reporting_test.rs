mod common;

use anyhow::Result;
use common::{
    date, invoice_request, product_line, seed_product, service_line, test_books, today,
};
use tallybook::application::AgingBucket;
use tallybook::domain::{DocumentKind, DocumentStatus};
use tallybook::io::Exporter;

#[tokio::test]
async fn test_trial_balance_stays_balanced_through_a_full_flow() -> Result<()> {
    let (books, _temp) = test_books().await?;
    seed_product(&books, "WID-1", 5000, 10.0, 2000).await?;

    let invoice = books
        .documents
        .create_document(invoice_request(
            "Acme Ltd",
            "2024-03-01",
            vec![product_line("WID-1", 2.0, 5000, 10.0)],
        ))
        .await?;
    books
        .documents
        .finalize(&invoice.number, DocumentStatus::Sent, "test")
        .await?;
    books
        .documents
        .apply_payment(
            &invoice.number,
            4000,
            date("2024-03-10"),
            "cash",
            None,
            "test",
        )
        .await?;

    let report = books.reporting.trial_balance(today()).await?;
    assert!(report.is_balanced());
    assert!(report.total_debits > 0);
    Ok(())
}

#[tokio::test]
async fn test_profit_and_loss_nets_revenue_against_cogs() -> Result<()> {
    let (books, _temp) = test_books().await?;
    seed_product(&books, "WID-1", 5000, 10.0, 2000).await?;

    let invoice = books
        .documents
        .create_document(invoice_request(
            "Acme Ltd",
            "2024-03-01",
            vec![product_line("WID-1", 2.0, 5000, 0.0)],
        ))
        .await?;
    books
        .documents
        .finalize(&invoice.number, DocumentStatus::Sent, "test")
        .await?;

    let report = books
        .reporting
        .profit_and_loss(date("2024-01-01"), today())
        .await?;
    assert_eq!(report.total_revenue, 10000);
    assert_eq!(report.total_expenses, 4000); // COGS 2 x 20.00
    assert_eq!(report.net_income, 6000);
    Ok(())
}

#[tokio::test]
async fn test_balance_sheet_balances_via_retained_earnings() -> Result<()> {
    let (books, _temp) = test_books().await?;
    seed_product(&books, "WID-1", 5000, 10.0, 2000).await?;

    let invoice = books
        .documents
        .create_document(invoice_request(
            "Acme Ltd",
            "2024-03-01",
            vec![product_line("WID-1", 2.0, 5000, 10.0)],
        ))
        .await?;
    books
        .documents
        .finalize(&invoice.number, DocumentStatus::Sent, "test")
        .await?;
    books
        .documents
        .apply_payment(
            &invoice.number,
            11000,
            date("2024-03-15"),
            "bank_transfer",
            None,
            "test",
        )
        .await?;

    let report = books.reporting.balance_sheet(today()).await?;
    assert!(report.balances());
    assert_eq!(report.retained_earnings, 6000);
    // cash 110.00 less the 40.00 COGS credit on inventory; the opening
    // receive is a stock adjustment and posts no entry
    assert_eq!(report.total_assets, 7000);
    assert_eq!(report.total_liabilities, 1000);
    Ok(())
}

#[tokio::test]
async fn test_aging_buckets_by_days_overdue() -> Result<()> {
    let (books, _temp) = test_books().await?;
    let as_of = date("2024-06-30");

    // due 2024-06-30: current. due 2024-06-10: 20 days. due 2024-03-15: >90.
    for (issue, due) in [
        ("2024-06-01", "2024-06-30"),
        ("2024-05-11", "2024-06-10"),
        ("2024-02-14", "2024-03-15"),
    ] {
        let mut request = invoice_request("Acme Ltd", issue, vec![service_line(1.0, 10000, 0.0)]);
        request.due_date = date(due);
        let invoice = books.documents.create_document(request).await?;
        books
            .documents
            .finalize(&invoice.number, DocumentStatus::Sent, "test")
            .await?;
    }

    let report = books.reporting.aging(DocumentKind::Invoice, as_of).await?;
    assert_eq!(report.rows.len(), 3);
    assert!(!report.has_unconverted);
    assert_eq!(report.total, 30000);

    let buckets: Vec<AgingBucket> = report.rows.iter().map(|r| r.bucket).collect();
    assert!(buckets.contains(&AgingBucket::Current));
    assert!(buckets.contains(&AgingBucket::Days1To30));
    assert!(buckets.contains(&AgingBucket::Over90));
    assert_eq!(report.bucket_totals[0], 10000);
    assert_eq!(report.bucket_totals[1], 10000);
    assert_eq!(report.bucket_totals[4], 10000);
    Ok(())
}

#[tokio::test]
async fn test_aging_flags_unconvertible_currencies() -> Result<()> {
    let (books, _temp) = test_books().await?;

    let mut request = invoice_request("Overseas Co", "2024-03-01", vec![service_line(1.0, 10000, 0.0)]);
    request.currency = Some("EUR".to_string());
    let invoice = books.documents.create_document(request).await?;
    books
        .documents
        .finalize(&invoice.number, DocumentStatus::Sent, "test")
        .await?;

    // no EUR/USD rate on file: face value plus the caveat
    let report = books
        .reporting
        .aging(DocumentKind::Invoice, date("2024-03-31"))
        .await?;
    assert!(report.has_unconverted);
    assert_eq!(report.rows[0].outstanding_converted, None);
    assert_eq!(report.total, 10000);

    // once a rate exists the caveat clears
    books
        .currency
        .set_rate("EUR", "USD", 1.1, date("2024-03-01"))
        .await?;
    let report = books
        .reporting
        .aging(DocumentKind::Invoice, date("2024-03-31"))
        .await?;
    assert!(!report.has_unconverted);
    assert_eq!(report.rows[0].outstanding_converted, Some(11000));
    Ok(())
}

#[tokio::test]
async fn test_aging_excludes_paid_void_and_draft() -> Result<()> {
    let (books, _temp) = test_books().await?;

    // draft: never in aging
    books
        .documents
        .create_document(invoice_request(
            "Draft Co",
            "2024-03-01",
            vec![service_line(1.0, 1000, 0.0)],
        ))
        .await?;

    // paid
    let paid = books
        .documents
        .create_document(invoice_request(
            "Paid Co",
            "2024-03-01",
            vec![service_line(1.0, 1000, 0.0)],
        ))
        .await?;
    books
        .documents
        .finalize(&paid.number, DocumentStatus::Sent, "test")
        .await?;
    books
        .documents
        .apply_payment(&paid.number, 1000, date("2024-03-05"), "cash", None, "test")
        .await?;

    // void
    let void = books
        .documents
        .create_document(invoice_request(
            "Void Co",
            "2024-03-01",
            vec![service_line(1.0, 1000, 0.0)],
        ))
        .await?;
    books
        .documents
        .finalize(&void.number, DocumentStatus::Sent, "test")
        .await?;
    books.documents.void(&void.number, "test").await?;

    let report = books
        .reporting
        .aging(DocumentKind::Invoice, date("2024-03-31"))
        .await?;
    assert!(report.rows.is_empty());
    Ok(())
}

#[tokio::test]
async fn test_depreciation_schedules_for_registered_assets() -> Result<()> {
    let (books, _temp) = test_books().await?;
    books
        .assets
        .register("Laptop", date("2024-01-15"), 120000, 12000, 36)
        .await?;

    let schedules = books.reporting.depreciation_schedules().await?;
    assert_eq!(schedules.len(), 1);
    let (asset, rows) = &schedules[0];
    assert_eq!(asset.monthly_depreciation(), 3000);
    assert_eq!(rows.len(), 36);
    assert_eq!(rows.last().unwrap().book_value, 12000);
    Ok(())
}

#[tokio::test]
async fn test_csv_exports() -> Result<()> {
    let (books, _temp) = test_books().await?;

    let invoice = books
        .documents
        .create_document(invoice_request(
            "Acme Ltd",
            "2024-03-01",
            vec![service_line(2.0, 5000, 10.0)],
        ))
        .await?;
    books
        .documents
        .finalize(&invoice.number, DocumentStatus::Sent, "test")
        .await?;

    let exporter = Exporter::new(&books);

    let mut buffer = Vec::new();
    let rows = exporter
        .export_trial_balance_csv(&mut buffer, today())
        .await?;
    let csv = String::from_utf8(buffer)?;
    assert!(rows > 0);
    assert!(csv.starts_with("code,name,debit,credit"));
    assert!(csv.contains("1100"));

    let mut buffer = Vec::new();
    let rows = exporter
        .export_aging_csv(&mut buffer, DocumentKind::Invoice, today())
        .await?;
    assert_eq!(rows, 1);
    assert!(String::from_utf8(buffer)?.contains("INV-0001"));

    let mut buffer = Vec::new();
    let rows = exporter.export_journal_csv(&mut buffer).await?;
    assert!(rows >= 3); // the accrual entry's lines
    Ok(())
}
