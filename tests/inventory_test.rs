mod common;

use anyhow::Result;
use common::{date, invoice_request, product_line, seed_product, test_books};
use tallybook::application::{AppError, StockOutcome};
use tallybook::domain::{AdjustmentKind, DocumentStatus};

#[tokio::test]
async fn test_finalize_consumes_stock_and_posts_cogs() -> Result<()> {
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
    let outcome = books
        .documents
        .finalize(&invoice.number, DocumentStatus::Sent, "test")
        .await?;

    assert!(matches!(
        outcome.consumption,
        StockOutcome::Applied { total_cost: 4000 }
    ));
    let product = books.inventory.get_product_by_sku("WID-1").await?;
    assert_eq!(product.quantity_on_hand, 8.0);

    let as_of = date("2024-12-31");
    assert_eq!(books.ledger.account_balance("5100", as_of).await?, 4000);
    // the opening receive posts no entry, so 1200 carries only the COGS credit
    assert_eq!(books.ledger.account_balance("1200", as_of).await?, -4000);

    // the COGS entry carries the issue date, so it lands in the same
    // period as the revenue accrual
    assert_eq!(
        books
            .ledger
            .account_balance("5100", date("2024-03-01"))
            .await?,
        4000
    );
    assert_eq!(
        books
            .ledger
            .account_balance("5100", date("2024-02-28"))
            .await?,
        0
    );
    Ok(())
}

#[tokio::test]
async fn test_insufficient_stock_fails_consumption_but_not_finalize() -> Result<()> {
    let (books, _temp) = test_books().await?;
    seed_product(&books, "WID-1", 5000, 1.0, 2000).await?;

    let invoice = books
        .documents
        .create_document(invoice_request(
            "Acme Ltd",
            "2024-03-01",
            vec![product_line("WID-1", 5.0, 5000, 0.0)],
        ))
        .await?;
    let outcome = books
        .documents
        .finalize(&invoice.number, DocumentStatus::Sent, "test")
        .await?;

    // the status commit survives; the stock failure is in the outcome
    assert_eq!(outcome.document.status, DocumentStatus::Sent);
    assert!(matches!(outcome.consumption, StockOutcome::Failed { .. }));

    // nothing moved
    let product = books.inventory.get_product_by_sku("WID-1").await?;
    assert_eq!(product.quantity_on_hand, 1.0);
    assert_eq!(
        books
            .ledger
            .account_balance("5100", date("2024-12-31"))
            .await?,
        0
    );
    Ok(())
}

#[tokio::test]
async fn test_multi_line_consumption_is_all_or_nothing() -> Result<()> {
    let (books, _temp) = test_books().await?;
    seed_product(&books, "WID-1", 5000, 10.0, 2000).await?;
    seed_product(&books, "GAD-1", 3000, 1.0, 1000).await?;

    let invoice = books
        .documents
        .create_document(invoice_request(
            "Acme Ltd",
            "2024-03-01",
            vec![
                product_line("WID-1", 2.0, 5000, 0.0),
                product_line("GAD-1", 5.0, 3000, 0.0),
            ],
        ))
        .await?;
    let outcome = books
        .documents
        .finalize(&invoice.number, DocumentStatus::Sent, "test")
        .await?;
    assert!(matches!(outcome.consumption, StockOutcome::Failed { .. }));

    // the line with enough stock was not consumed either
    let wid = books.inventory.get_product_by_sku("WID-1").await?;
    assert_eq!(wid.quantity_on_hand, 10.0);
    Ok(())
}

#[tokio::test]
async fn test_repeated_product_lines_are_checked_in_aggregate() -> Result<()> {
    let (books, _temp) = test_books().await?;
    seed_product(&books, "WID-1", 5000, 4.0, 2000).await?;

    // each line fits on its own; together they exceed stock
    let invoice = books
        .documents
        .create_document(invoice_request(
            "Acme Ltd",
            "2024-03-01",
            vec![
                product_line("WID-1", 3.0, 5000, 0.0),
                product_line("WID-1", 3.0, 5000, 0.0),
            ],
        ))
        .await?;
    let err = books.inventory.consume(&invoice, "test").await.unwrap_err();
    assert!(matches!(
        err,
        AppError::InsufficientStock { requested, .. } if requested == 6.0
    ));
    assert_eq!(
        books
            .inventory
            .get_product_by_sku("WID-1")
            .await?
            .quantity_on_hand,
        4.0
    );
    Ok(())
}

#[tokio::test]
async fn test_void_reverses_consumption_and_nets_cogs_to_zero() -> Result<()> {
    let (books, _temp) = test_books().await?;
    seed_product(&books, "WID-1", 5000, 10.0, 2000).await?;

    let invoice = books
        .documents
        .create_document(invoice_request(
            "Acme Ltd",
            "2024-03-01",
            vec![product_line("WID-1", 3.0, 5000, 0.0)],
        ))
        .await?;
    books
        .documents
        .finalize(&invoice.number, DocumentStatus::Sent, "test")
        .await?;
    assert_eq!(
        books
            .inventory
            .get_product_by_sku("WID-1")
            .await?
            .quantity_on_hand,
        7.0
    );

    let outcome = books.documents.void(&invoice.number, "test").await?;
    assert!(matches!(
        outcome.reversal,
        StockOutcome::Applied { total_cost: 6000 }
    ));

    // stock restored and the ledger nets to zero
    assert_eq!(
        books
            .inventory
            .get_product_by_sku("WID-1")
            .await?
            .quantity_on_hand,
        10.0
    );
    let as_of = date("2024-12-31");
    assert_eq!(books.ledger.account_balance("5100", as_of).await?, 0);
    assert_eq!(books.ledger.account_balance("1200", as_of).await?, 0);

    // history is append-only: consume and return both on file
    let movements = books.inventory.movements_for_product("WID-1").await?;
    assert_eq!(movements.len(), 3); // receive, consume, return
    Ok(())
}

#[tokio::test]
async fn test_receive_rederives_weighted_average_cost() -> Result<()> {
    let (books, _temp) = test_books().await?;
    seed_product(&books, "WID-1", 5000, 10.0, 200).await?;

    books
        .inventory
        .adjust("WID-1", AdjustmentKind::Receive, 10.0, Some(400), "test")
        .await?;

    let product = books.inventory.get_product_by_sku("WID-1").await?;
    assert_eq!(product.quantity_on_hand, 20.0);
    // 10 @ 2.00 + 10 @ 4.00 -> 3.00
    assert_eq!(product.cost_price, 300);
    Ok(())
}

#[tokio::test]
async fn test_consuming_adjustments_cannot_go_negative() -> Result<()> {
    let (books, _temp) = test_books().await?;
    seed_product(&books, "WID-1", 5000, 3.0, 200).await?;

    for kind in [
        AdjustmentKind::Remove,
        AdjustmentKind::Damage,
        AdjustmentKind::Shrinkage,
    ] {
        let err = books
            .inventory
            .adjust("WID-1", kind, 5.0, None, "test")
            .await
            .unwrap_err();
        assert!(matches!(err, AppError::InsufficientStock { .. }));
    }
    assert_eq!(
        books
            .inventory
            .get_product_by_sku("WID-1")
            .await?
            .quantity_on_hand,
        3.0
    );

    books
        .inventory
        .adjust("WID-1", AdjustmentKind::Remove, 2.0, None, "test")
        .await?;
    assert_eq!(
        books
            .inventory
            .get_product_by_sku("WID-1")
            .await?
            .quantity_on_hand,
        1.0
    );
    Ok(())
}

#[tokio::test]
async fn test_absolute_adjustment_targets_a_quantity() -> Result<()> {
    let (books, _temp) = test_books().await?;
    seed_product(&books, "WID-1", 5000, 10.0, 200).await?;

    // count came up short: set the quantity to 7
    let movement = books
        .inventory
        .adjust("WID-1", AdjustmentKind::Adjustment, 7.0, None, "test")
        .await?;
    assert_eq!(movement.quantity, -3.0);
    assert_eq!(
        books
            .inventory
            .get_product_by_sku("WID-1")
            .await?
            .quantity_on_hand,
        7.0
    );

    // and back up to 12
    books
        .inventory
        .adjust("WID-1", AdjustmentKind::Adjustment, 12.0, None, "test")
        .await?;
    assert_eq!(
        books
            .inventory
            .get_product_by_sku("WID-1")
            .await?
            .quantity_on_hand,
        12.0
    );
    Ok(())
}

#[tokio::test]
async fn test_untracked_products_never_move_stock() -> Result<()> {
    let (books, _temp) = test_books().await?;
    books
        .inventory
        .create_product("SVC-1", "Consulting", 10000, 0, false)
        .await?;

    let err = books
        .inventory
        .adjust("SVC-1", AdjustmentKind::Add, 5.0, None, "test")
        .await
        .unwrap_err();
    assert!(matches!(err, AppError::InvalidAmount(_)));

    // lines on untracked products don't consume anything
    let invoice = books
        .documents
        .create_document(invoice_request(
            "Acme Ltd",
            "2024-03-01",
            vec![product_line("SVC-1", 1.0, 10000, 0.0)],
        ))
        .await?;
    let outcome = books
        .documents
        .finalize(&invoice.number, DocumentStatus::Sent, "test")
        .await?;
    assert!(matches!(outcome.consumption, StockOutcome::NotApplicable));
    Ok(())
}

#[tokio::test]
async fn test_duplicate_sku_is_rejected() -> Result<()> {
    let (books, _temp) = test_books().await?;
    books
        .inventory
        .create_product("WID-1", "Widget", 5000, 2000, true)
        .await?;
    let err = books
        .inventory
        .create_product("WID-1", "Widget Again", 5000, 2000, true)
        .await
        .unwrap_err();
    assert!(matches!(err, AppError::ProductAlreadyExists(_)));
    Ok(())
}
