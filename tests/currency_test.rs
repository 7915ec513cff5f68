mod common;

use anyhow::Result;
use common::{date, test_books};
use tallybook::application::AppError;

#[tokio::test]
async fn test_same_currency_is_identity() -> Result<()> {
    let (books, _temp) = test_books().await?;
    let converted = books
        .currency
        .convert(10000, "usd", "USD", date("2024-03-01"))
        .await?;
    assert_eq!(converted, Some(10000));
    Ok(())
}

#[tokio::test]
async fn test_direct_rate_applies() -> Result<()> {
    let (books, _temp) = test_books().await?;
    books
        .currency
        .set_rate("EUR", "USD", 1.1, date("2024-03-01"))
        .await?;

    let converted = books
        .currency
        .convert(10000, "EUR", "USD", date("2024-03-01"))
        .await?;
    assert_eq!(converted, Some(11000));
    Ok(())
}

#[tokio::test]
async fn test_inverse_rate_is_derived() -> Result<()> {
    let (books, _temp) = test_books().await?;
    // only USD->EUR is on file; EUR->USD uses the reciprocal
    books
        .currency
        .set_rate("USD", "EUR", 0.9, date("2024-03-01"))
        .await?;

    let converted = books
        .currency
        .convert(10000, "EUR", "USD", date("2024-03-01"))
        .await?;
    // 100.00 / 0.9 = 111.11
    assert_eq!(converted, Some(11111));
    Ok(())
}

#[tokio::test]
async fn test_most_recent_rate_on_or_before_date_wins() -> Result<()> {
    let (books, _temp) = test_books().await?;
    books
        .currency
        .set_rate("EUR", "USD", 1.0, date("2024-03-01"))
        .await?;
    books
        .currency
        .set_rate("EUR", "USD", 1.2, date("2024-03-10"))
        .await?;

    assert_eq!(
        books
            .currency
            .convert(10000, "EUR", "USD", date("2024-03-05"))
            .await?,
        Some(10000)
    );
    assert_eq!(
        books
            .currency
            .convert(10000, "EUR", "USD", date("2024-03-15"))
            .await?,
        Some(12000)
    );
    // no fact on or before this date
    assert_eq!(
        books
            .currency
            .convert(10000, "EUR", "USD", date("2024-02-28"))
            .await?,
        None
    );
    Ok(())
}

#[tokio::test]
async fn test_missing_rate_is_a_soft_none() -> Result<()> {
    let (books, _temp) = test_books().await?;
    let converted = books
        .currency
        .convert(10000, "GBP", "JPY", date("2024-03-01"))
        .await?;
    assert_eq!(converted, None);
    Ok(())
}

#[tokio::test]
async fn test_same_day_fact_is_overwritten() -> Result<()> {
    let (books, _temp) = test_books().await?;
    books
        .currency
        .set_rate("EUR", "USD", 1.1, date("2024-03-01"))
        .await?;
    books
        .currency
        .set_rate("EUR", "USD", 1.15, date("2024-03-01"))
        .await?;

    assert_eq!(
        books
            .currency
            .convert(10000, "EUR", "USD", date("2024-03-01"))
            .await?,
        Some(11500)
    );
    Ok(())
}

#[tokio::test]
async fn test_non_positive_rates_are_rejected() -> Result<()> {
    let (books, _temp) = test_books().await?;
    for rate in [0.0, -1.5] {
        let err = books
            .currency
            .set_rate("EUR", "USD", rate, date("2024-03-01"))
            .await
            .unwrap_err();
        assert!(matches!(err, AppError::InvalidAmount(_)));
    }
    Ok(())
}
