mod common;

use anyhow::Result;
use common::{date, test_books};
use tallybook::application::{AppError, NewEntry};
use tallybook::domain::{AccountType, EntryStatus, JournalLine};

fn entry(description: &str, lines: Vec<JournalLine>) -> NewEntry {
    NewEntry {
        date: date("2024-03-01"),
        description: description.to_string(),
        memo: None,
        actor: "test".to_string(),
        lines,
    }
}

#[tokio::test]
async fn test_posted_entry_moves_account_balances() -> Result<()> {
    let (books, _temp) = test_books().await?;

    books
        .ledger
        .create_entry(
            entry(
                "Cash sale",
                vec![
                    JournalLine::debit("1000", 11000),
                    JournalLine::credit("4000", 10000),
                    JournalLine::credit("2100", 1000),
                ],
            ),
            true,
        )
        .await?;

    let as_of = date("2024-03-31");
    assert_eq!(books.ledger.account_balance("1000", as_of).await?, 11000);
    assert_eq!(books.ledger.account_balance("4000", as_of).await?, -10000);
    assert_eq!(books.ledger.account_balance("2100", as_of).await?, -1000);
    Ok(())
}

#[tokio::test]
async fn test_imbalanced_entry_writes_nothing() -> Result<()> {
    let (books, _temp) = test_books().await?;

    let err = books
        .ledger
        .create_entry(
            entry(
                "Broken",
                vec![
                    JournalLine::debit("1000", 10000),
                    JournalLine::credit("4000", 9000),
                ],
            ),
            true,
        )
        .await
        .unwrap_err();
    assert!(matches!(err, AppError::ImbalancedEntry { .. }));

    assert!(books.ledger.list_entries().await?.is_empty());
    assert_eq!(
        books
            .ledger
            .account_balance("1000", date("2024-12-31"))
            .await?,
        0
    );
    Ok(())
}

#[tokio::test]
async fn test_one_cent_drift_is_tolerated() -> Result<()> {
    let (books, _temp) = test_books().await?;

    books
        .ledger
        .create_entry(
            entry(
                "Rounding drift",
                vec![
                    JournalLine::debit("5100", 3334),
                    JournalLine::credit("1200", 3333),
                ],
            ),
            true,
        )
        .await?;
    assert_eq!(books.ledger.list_entries().await?.len(), 1);
    Ok(())
}

#[tokio::test]
async fn test_empty_entry_is_rejected() -> Result<()> {
    let (books, _temp) = test_books().await?;

    let err = books
        .ledger
        .create_entry(entry("Nothing", vec![]), true)
        .await
        .unwrap_err();
    assert!(matches!(err, AppError::EmptyEntry));
    Ok(())
}

#[tokio::test]
async fn test_unknown_account_is_rejected() -> Result<()> {
    let (books, _temp) = test_books().await?;

    let err = books
        .ledger
        .create_entry(
            entry(
                "Bad account",
                vec![
                    JournalLine::debit("9999", 100),
                    JournalLine::credit("4000", 100),
                ],
            ),
            true,
        )
        .await
        .unwrap_err();
    assert!(matches!(err, AppError::AccountNotFound(code) if code == "9999"));
    Ok(())
}

#[tokio::test]
async fn test_draft_post_void_lifecycle() -> Result<()> {
    let (books, _temp) = test_books().await?;

    let draft = books
        .ledger
        .create_entry(
            entry(
                "Accrual",
                vec![
                    JournalLine::debit("5000", 500),
                    JournalLine::credit("2000", 500),
                ],
            ),
            false,
        )
        .await?;
    assert_eq!(draft.status, EntryStatus::Draft);

    // drafts don't contribute to balances
    assert_eq!(
        books
            .ledger
            .account_balance("5000", date("2024-12-31"))
            .await?,
        0
    );

    let posted = books.ledger.post_entry(draft.id).await?;
    assert_eq!(posted.status, EntryStatus::Posted);
    assert_eq!(
        books
            .ledger
            .account_balance("5000", date("2024-12-31"))
            .await?,
        500
    );

    // posting twice is rejected
    let err = books.ledger.post_entry(draft.id).await.unwrap_err();
    assert!(matches!(err, AppError::InvalidEntryStatus { .. }));

    // voiding removes the effect but keeps the entry on file
    let voided = books.ledger.void_entry(draft.id).await?;
    assert_eq!(voided.status, EntryStatus::Void);
    assert_eq!(
        books
            .ledger
            .account_balance("5000", date("2024-12-31"))
            .await?,
        0
    );
    assert_eq!(books.ledger.list_entries().await?.len(), 1);
    Ok(())
}

#[tokio::test]
async fn test_void_requires_posted() -> Result<()> {
    let (books, _temp) = test_books().await?;

    let draft = books
        .ledger
        .create_entry(
            entry(
                "Draft",
                vec![
                    JournalLine::debit("1000", 100),
                    JournalLine::credit("3000", 100),
                ],
            ),
            false,
        )
        .await?;
    let err = books.ledger.void_entry(draft.id).await.unwrap_err();
    assert!(matches!(err, AppError::InvalidEntryStatus { .. }));
    Ok(())
}

#[tokio::test]
async fn test_account_code_must_match_type() -> Result<()> {
    let (books, _temp) = test_books().await?;

    let err = books
        .ledger
        .add_account("4500", "Misfiled", AccountType::Asset)
        .await
        .unwrap_err();
    assert!(matches!(err, AppError::AccountCodeMismatch { .. }));

    let err = books
        .ledger
        .add_account("1000", "Duplicate Cash", AccountType::Asset)
        .await
        .unwrap_err();
    assert!(matches!(err, AppError::AccountAlreadyExists(_)));

    books
        .ledger
        .add_account("1300", "Prepaid Expenses", AccountType::Asset)
        .await?;
    Ok(())
}

#[tokio::test]
async fn test_balance_respects_as_of_date() -> Result<()> {
    let (books, _temp) = test_books().await?;

    books
        .ledger
        .create_entry(
            NewEntry {
                date: date("2024-06-15"),
                description: "Later sale".to_string(),
                memo: None,
                actor: "test".to_string(),
                lines: vec![
                    JournalLine::debit("1000", 5000),
                    JournalLine::credit("4000", 5000),
                ],
            },
            true,
        )
        .await?;

    assert_eq!(
        books
            .ledger
            .account_balance("1000", date("2024-06-14"))
            .await?,
        0
    );
    assert_eq!(
        books
            .ledger
            .account_balance("1000", date("2024-06-15"))
            .await?,
        5000
    );
    Ok(())
}
