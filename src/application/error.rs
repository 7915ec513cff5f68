use thiserror::Error;

use crate::domain::{Cents, format_cents};

#[derive(Error, Debug)]
pub enum AppError {
    #[error("Journal entry does not balance: debits {}, credits {}", format_cents(*.debits), format_cents(*.credits))]
    ImbalancedEntry { debits: Cents, credits: Cents },

    #[error("Journal entry has no lines")]
    EmptyEntry,

    #[error("Invalid journal line {0}: exactly one of debit/credit must be positive")]
    InvalidLine(i64),

    #[error("Journal entry is {current}, expected {expected}")]
    InvalidEntryStatus {
        current: String,
        expected: &'static str,
    },

    #[error("Account not found: {0}")]
    AccountNotFound(String),

    #[error("Account code {code} does not match type {account_type}")]
    AccountCodeMismatch { code: String, account_type: String },

    #[error("Account already exists: {0}")]
    AccountAlreadyExists(String),

    #[error("Journal entry not found: {0}")]
    EntryNotFound(String),

    #[error("Document not found: {0}")]
    DocumentNotFound(String),

    #[error("Document number already in use: {0}")]
    DuplicateDocumentNumber(String),

    #[error("Document {0} has no lines")]
    EmptyDocument(String),

    #[error("Document {number} is {status} and cannot be modified")]
    ImmutableDocument { number: String, status: String },

    #[error("Document {0} is already void")]
    AlreadyVoid(String),

    #[error("Document {number} cannot go from {from} to {to}")]
    InvalidTransition {
        number: String,
        from: String,
        to: String,
    },

    #[error("Payment on voided document: {0}")]
    VoidedDocument(String),

    #[error("Payment of {} exceeds outstanding balance {}", format_cents(*.requested), format_cents(*.outstanding))]
    Overpayment {
        outstanding: Cents,
        requested: Cents,
    },

    #[error("Insufficient stock for {sku}: {available} on hand, {requested} requested")]
    InsufficientStock {
        sku: String,
        available: f64,
        requested: f64,
    },

    #[error("Product not found: {0}")]
    ProductNotFound(String),

    #[error("Product already exists: {0}")]
    ProductAlreadyExists(String),

    #[error("Fixed asset not found: {0}")]
    AssetNotFound(String),

    #[error("Invalid amount: {0}")]
    InvalidAmount(String),

    #[error("Concurrent modification of document {0}, retry the operation")]
    ConcurrentModification(String),

    #[error("Database error: {0}")]
    Database(#[from] anyhow::Error),
}
