use anyhow::{Context, Result, bail};
use chrono::{NaiveDate, Utc};
use clap::{Parser, Subcommand};
use uuid::Uuid;

use crate::application::{Books, NewDocument, NewDocumentLine, NewEntry, StockOutcome};
use crate::domain::{
    AccountType, AdjustmentKind, Cents, DocumentKind, DocumentStatus, JournalLine, format_cents,
    parse_cents,
};
use crate::io::Exporter;

/// Tallybook - Small Business Accounting
#[derive(Parser)]
#[command(name = "tallybook")]
#[command(about = "A double-entry accounting engine for small businesses")]
#[command(version)]
pub struct Cli {
    /// Database file path
    #[arg(short, long, default_value = "tallybook.db")]
    pub database: String,

    /// Actor recorded on mutations (for audit)
    #[arg(long, global = true, default_value = "cli")]
    pub actor: String,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Initialize a new database with the default chart of accounts
    Init,

    /// Chart of accounts commands
    #[command(subcommand)]
    Account(AccountCommands),

    /// Manual journal entry commands
    #[command(subcommand)]
    Entry(EntryCommands),

    /// Invoice lifecycle commands
    #[command(subcommand)]
    Invoice(DocumentCommands),

    /// Bill lifecycle commands
    #[command(subcommand)]
    Bill(DocumentCommands),

    /// Apply a payment to an invoice or bill
    Pay {
        /// Document number (e.g., INV-0001)
        number: String,

        /// Amount to pay (e.g., "110.00")
        amount: String,

        /// Payment date (YYYY-MM-DD, defaults to today)
        #[arg(long)]
        date: Option<String>,

        /// Payment method: cash, bank_transfer, card, ...
        #[arg(short, long, default_value = "bank_transfer")]
        method: String,

        /// External reference (bank transaction id)
        #[arg(short, long)]
        reference: Option<String>,
    },

    /// Product registry commands
    #[command(subcommand)]
    Product(ProductCommands),

    /// Stock adjustment commands
    #[command(subcommand)]
    Stock(StockCommands),

    /// Exchange rate commands
    #[command(subcommand)]
    Rate(RateCommands),

    /// Fixed asset commands
    #[command(subcommand)]
    Asset(AssetCommands),

    /// Reports
    #[command(subcommand)]
    Report(ReportCommands),

    /// Export a report or the journal to CSV
    Export {
        /// What to export: trial-balance, aging-receivable, aging-payable, journal, full
        export_type: String,

        /// Output file (stdout if omitted)
        #[arg(short, long)]
        output: Option<String>,

        /// Report date (YYYY-MM-DD, defaults to today)
        #[arg(long)]
        as_of: Option<String>,
    },
}

#[derive(Subcommand)]
pub enum AccountCommands {
    /// Create an account
    Create {
        /// Account code, leading digit must match the type (e.g., 1300)
        code: String,

        /// Account name
        name: String,

        /// Account type: asset, liability, equity, revenue, expense
        #[arg(short = 't', long = "type")]
        account_type: String,
    },

    /// List the chart of accounts
    List,

    /// Show an account's balance as of a date
    Balance {
        /// Account code
        code: String,

        /// Date (YYYY-MM-DD, defaults to today)
        #[arg(long)]
        as_of: Option<String>,
    },
}

#[derive(Subcommand)]
pub enum EntryCommands {
    /// Add a journal entry
    Add {
        /// Entry description
        description: String,

        /// Debit line as "code:amount" (repeatable)
        #[arg(long)]
        debit: Vec<String>,

        /// Credit line as "code:amount" (repeatable)
        #[arg(long)]
        credit: Vec<String>,

        /// Entry date (YYYY-MM-DD, defaults to today)
        #[arg(long)]
        date: Option<String>,

        /// Optional memo
        #[arg(short, long)]
        memo: Option<String>,

        /// Save as draft instead of posting immediately
        #[arg(long)]
        draft: bool,
    },

    /// Post a draft entry
    Post {
        /// Entry ID
        id: String,
    },

    /// Void a posted entry
    Void {
        /// Entry ID
        id: String,
    },

    /// List journal entries
    List,
}

#[derive(Subcommand)]
pub enum DocumentCommands {
    /// Create a draft document
    Create {
        /// Customer or vendor name
        party: String,

        /// Line as "qty:unit_price:description[:discount%[:tax%[:sku]]]" (repeatable)
        #[arg(short, long)]
        line: Vec<String>,

        /// Document number (assigned from a sequence if omitted)
        #[arg(short, long)]
        number: Option<String>,

        /// Issue date (YYYY-MM-DD, defaults to today)
        #[arg(long)]
        issue_date: Option<String>,

        /// Due date (YYYY-MM-DD, defaults to 30 days after issue)
        #[arg(long)]
        due_date: Option<String>,

        /// Currency code (defaults to the base currency)
        #[arg(short, long)]
        currency: Option<String>,

        /// Exchange rate to the base currency
        #[arg(long)]
        rate: Option<f64>,
    },

    /// Replace the full line set of a document
    SetLines {
        /// Document number
        number: String,

        /// Line as "qty:unit_price:description[:discount%[:tax%[:sku]]]" (repeatable)
        #[arg(short, long)]
        line: Vec<String>,
    },

    /// Finalize a draft (commits totals, posts the accrual, moves stock)
    Finalize {
        /// Document number
        number: String,

        /// Target status: sent, pending_approval, paid, overdue
        #[arg(short, long, default_value = "sent")]
        status: String,
    },

    /// Void a document (drafts are deleted; finalized documents are
    /// reversed)
    Void {
        /// Document number
        number: String,
    },

    /// Show a document with its lines and payments
    Show {
        /// Document number
        number: String,
    },

    /// List documents
    List,
}

#[derive(Subcommand)]
pub enum ProductCommands {
    /// Create a product
    Create {
        /// Stock-keeping unit (must be unique)
        sku: String,

        /// Product name
        name: String,

        /// Selling price per unit (e.g., "50.00")
        #[arg(short, long)]
        price: String,

        /// Cost price per unit (e.g., "20.00")
        #[arg(long, default_value = "0")]
        cost: String,

        /// Do not track stock for this product
        #[arg(long)]
        untracked: bool,
    },

    /// List products with quantity on hand
    List,
}

#[derive(Subcommand)]
pub enum StockCommands {
    /// Adjust stock for a product
    Adjust {
        /// Product SKU
        sku: String,

        /// Kind: add, remove, adjustment, receive, return, damage, shrinkage
        kind: String,

        /// Quantity (absolute target for "adjustment")
        quantity: f64,

        /// Unit cost for receipts (re-derives the weighted-average cost)
        #[arg(long)]
        cost: Option<String>,
    },

    /// Show movement history for a product
    History {
        /// Product SKU
        sku: String,
    },
}

#[derive(Subcommand)]
pub enum RateCommands {
    /// Record an exchange rate fact for a date
    Set {
        /// Source currency (e.g., EUR)
        from: String,

        /// Target currency (e.g., USD)
        to: String,

        /// Rate (target units per source unit)
        rate: f64,

        /// Effective date (YYYY-MM-DD, defaults to today)
        #[arg(long)]
        date: Option<String>,
    },

    /// Convert an amount between currencies
    Convert {
        /// Amount (e.g., "100.00")
        amount: String,

        /// Source currency
        from: String,

        /// Target currency
        to: String,

        /// Conversion date (YYYY-MM-DD, defaults to today)
        #[arg(long)]
        date: Option<String>,
    },
}

#[derive(Subcommand)]
pub enum AssetCommands {
    /// Register a fixed asset
    Register {
        /// Asset name
        name: String,

        /// Acquisition cost (e.g., "1200.00")
        cost: String,

        /// Purchase date (YYYY-MM-DD, defaults to today)
        #[arg(long)]
        purchase_date: Option<String>,

        /// Residual value (e.g., "120.00")
        #[arg(long, default_value = "0")]
        residual: String,

        /// Useful life in months
        #[arg(long)]
        life_months: u32,
    },

    /// List assets with current book value
    List,

    /// Show depreciation schedules
    Schedule,
}

#[derive(Subcommand)]
pub enum ReportCommands {
    /// Trial balance as of a date
    TrialBalance {
        /// Date (YYYY-MM-DD, defaults to today)
        #[arg(long)]
        as_of: Option<String>,
    },

    /// Profit and loss over a period
    Pnl {
        /// Start date (YYYY-MM-DD)
        #[arg(long)]
        from: String,

        /// End date (YYYY-MM-DD, defaults to today)
        #[arg(long)]
        to: Option<String>,
    },

    /// Balance sheet as of a date
    BalanceSheet {
        /// Date (YYYY-MM-DD, defaults to today)
        #[arg(long)]
        as_of: Option<String>,
    },

    /// Receivable or payable aging
    Aging {
        /// Side: receivable (invoices) or payable (bills)
        side: String,

        /// Report date (YYYY-MM-DD, defaults to today)
        #[arg(long)]
        as_of: Option<String>,
    },
}

impl Cli {
    pub async fn run(self) -> Result<()> {
        match self.command {
            Commands::Init => {
                Books::init(&self.database).await?;
                println!("Database initialized: {}", self.database);
            }

            Commands::Account(cmd) => {
                let books = Books::connect(&self.database).await?;
                run_account_command(&books, cmd).await?;
            }

            Commands::Entry(cmd) => {
                let books = Books::connect(&self.database).await?;
                run_entry_command(&books, cmd, &self.actor).await?;
            }

            Commands::Invoice(cmd) => {
                let books = Books::connect(&self.database).await?;
                run_document_command(&books, DocumentKind::Invoice, cmd, &self.actor).await?;
            }

            Commands::Bill(cmd) => {
                let books = Books::connect(&self.database).await?;
                run_document_command(&books, DocumentKind::Bill, cmd, &self.actor).await?;
            }

            Commands::Pay {
                number,
                amount,
                date,
                method,
                reference,
            } => {
                let books = Books::connect(&self.database).await?;
                let amount = parse_amount(&amount)?;
                let date = parse_date_or_today(date.as_deref())?;
                let result = books
                    .documents
                    .apply_payment(
                        &number,
                        amount,
                        date,
                        &method,
                        reference.as_deref(),
                        &self.actor,
                    )
                    .await?;
                println!(
                    "Payment of {} applied to {} (balance {}, status {})",
                    format_cents(result.payment.amount),
                    number,
                    format_cents(result.new_balance),
                    result.new_status
                );
            }

            Commands::Product(cmd) => {
                let books = Books::connect(&self.database).await?;
                run_product_command(&books, cmd).await?;
            }

            Commands::Stock(cmd) => {
                let books = Books::connect(&self.database).await?;
                run_stock_command(&books, cmd, &self.actor).await?;
            }

            Commands::Rate(cmd) => {
                let books = Books::connect(&self.database).await?;
                run_rate_command(&books, cmd).await?;
            }

            Commands::Asset(cmd) => {
                let books = Books::connect(&self.database).await?;
                run_asset_command(&books, cmd).await?;
            }

            Commands::Report(cmd) => {
                let books = Books::connect(&self.database).await?;
                run_report_command(&books, cmd).await?;
            }

            Commands::Export {
                export_type,
                output,
                as_of,
            } => {
                let books = Books::connect(&self.database).await?;
                run_export(&books, &export_type, output.as_deref(), as_of.as_deref()).await?;
            }
        }

        Ok(())
    }
}

async fn run_account_command(books: &Books, cmd: AccountCommands) -> Result<()> {
    match cmd {
        AccountCommands::Create {
            code,
            name,
            account_type,
        } => {
            let account_type = AccountType::from_str(&account_type)
                .with_context(|| format!("Invalid account type '{account_type}'"))?;
            let account = books.ledger.add_account(&code, &name, account_type).await?;
            println!("Created account {} {}", account.code, account.name);
        }
        AccountCommands::List => {
            for account in books.ledger.list_accounts().await? {
                println!(
                    "{}  {:<30} {}",
                    account.code, account.name, account.account_type
                );
            }
        }
        AccountCommands::Balance { code, as_of } => {
            let as_of = parse_date_or_today(as_of.as_deref())?;
            let balance = books.ledger.account_balance(&code, as_of).await?;
            println!("{} balance as of {}: {}", code, as_of, format_cents(balance));
        }
    }
    Ok(())
}

async fn run_entry_command(books: &Books, cmd: EntryCommands, actor: &str) -> Result<()> {
    match cmd {
        EntryCommands::Add {
            description,
            debit,
            credit,
            date,
            memo,
            draft,
        } => {
            let mut lines = Vec::new();
            for spec in &debit {
                let (code, amount) = parse_code_amount(spec)?;
                lines.push(JournalLine::debit(code, amount));
            }
            for spec in &credit {
                let (code, amount) = parse_code_amount(spec)?;
                lines.push(JournalLine::credit(code, amount));
            }
            let entry = books
                .ledger
                .create_entry(
                    NewEntry {
                        date: parse_date_or_today(date.as_deref())?,
                        description,
                        memo,
                        actor: actor.to_string(),
                        lines,
                    },
                    !draft,
                )
                .await?;
            println!("Created entry {} ({})", entry.id, entry.status);
        }
        EntryCommands::Post { id } => {
            let id = Uuid::parse_str(&id).context("Invalid entry ID")?;
            let entry = books.ledger.post_entry(id).await?;
            println!("Posted entry {}", entry.id);
        }
        EntryCommands::Void { id } => {
            let id = Uuid::parse_str(&id).context("Invalid entry ID")?;
            let entry = books.ledger.void_entry(id).await?;
            println!("Voided entry {}", entry.id);
        }
        EntryCommands::List => {
            for entry in books.ledger.list_entries().await? {
                let (debits, _) = entry.totals();
                println!(
                    "{}  {}  {:<10} {:<40} {}",
                    entry.date,
                    entry.id,
                    entry.status,
                    entry.description,
                    format_cents(debits)
                );
            }
        }
    }
    Ok(())
}

async fn run_document_command(
    books: &Books,
    kind: DocumentKind,
    cmd: DocumentCommands,
    actor: &str,
) -> Result<()> {
    match cmd {
        DocumentCommands::Create {
            party,
            line,
            number,
            issue_date,
            due_date,
            currency,
            rate,
        } => {
            let issue_date = parse_date_or_today(issue_date.as_deref())?;
            let due_date = match due_date {
                Some(s) => parse_date(&s)?,
                None => issue_date + chrono::Duration::days(30),
            };
            let lines = line
                .iter()
                .map(|spec| parse_line_spec(spec))
                .collect::<Result<Vec<_>>>()?;
            let document = books
                .documents
                .create_document(NewDocument {
                    kind,
                    number,
                    party_id: None,
                    party_name: party,
                    issue_date,
                    due_date,
                    currency,
                    exchange_rate: rate,
                    lines,
                })
                .await?;
            println!(
                "Created {} {} for {} (total {})",
                kind,
                document.number,
                document.party_name,
                format_cents(document.total)
            );
        }
        DocumentCommands::SetLines { number, line } => {
            let lines = line
                .iter()
                .map(|spec| parse_line_spec(spec))
                .collect::<Result<Vec<_>>>()?;
            let document = books.documents.replace_lines(&number, lines).await?;
            println!(
                "Updated {} lines on {} (total {})",
                document.lines.len(),
                document.number,
                format_cents(document.total)
            );
        }
        DocumentCommands::Finalize { number, status } => {
            let target = DocumentStatus::from_str(&status)
                .with_context(|| format!("Invalid status '{status}'"))?;
            let outcome = books.documents.finalize(&number, target, actor).await?;
            println!(
                "Finalized {} as {} (total {})",
                number,
                outcome.document.status,
                format_cents(outcome.document.total)
            );
            print_stock_outcome("Stock", &outcome.consumption);
        }
        DocumentCommands::Void { number } => {
            let outcome = books.documents.void(&number, actor).await?;
            match &outcome.document {
                Some(document) => println!("Voided {}", document.number),
                None => println!("Deleted draft {}", number),
            }
            print_stock_outcome("Stock reversal", &outcome.reversal);
        }
        DocumentCommands::Show { number } => {
            let document = books.documents.get_by_number(&number).await?;
            println!(
                "{} {}  {}  {}",
                capitalize(document.kind.as_str()),
                document.number,
                document.party_name,
                document.status
            );
            println!(
                "  issued {}  due {}  currency {} (rate {})",
                document.issue_date, document.due_date, document.currency, document.exchange_rate
            );
            for line in &document.lines {
                println!(
                    "  {}. {} x {} {}  disc {}%  tax {}%  = {}",
                    line.line_no,
                    line.quantity,
                    format_cents(line.unit_price),
                    line.description,
                    line.discount_pct,
                    line.tax_pct,
                    format_cents(line.line_total)
                );
            }
            println!(
                "  subtotal {}  tax {}  total {}  paid {}  outstanding {}",
                format_cents(document.subtotal),
                format_cents(document.tax_total),
                format_cents(document.total),
                format_cents(document.amount_paid),
                format_cents(document.outstanding())
            );
            let payments = books.payments.payments_for_document(&document).await?;
            for payment in &payments {
                println!(
                    "  payment {}  {}  {}",
                    payment.date,
                    format_cents(payment.amount),
                    payment.method
                );
            }
        }
        DocumentCommands::List => {
            for document in books.documents.list(kind).await? {
                println!(
                    "{}  {:<20} {:<16} total {}  paid {}",
                    document.number,
                    document.party_name,
                    document.status.to_string(),
                    format_cents(document.total),
                    format_cents(document.amount_paid)
                );
            }
        }
    }
    Ok(())
}

async fn run_product_command(books: &Books, cmd: ProductCommands) -> Result<()> {
    match cmd {
        ProductCommands::Create {
            sku,
            name,
            price,
            cost,
            untracked,
        } => {
            let price = parse_amount(&price)?;
            let cost = parse_amount(&cost)?;
            let product = books
                .inventory
                .create_product(&sku, &name, price, cost, !untracked)
                .await?;
            println!("Created product {} {}", product.sku, product.name);
        }
        ProductCommands::List => {
            for product in books.inventory.list_products().await? {
                println!(
                    "{:<12} {:<30} price {}  cost {}  on hand {}",
                    product.sku,
                    product.name,
                    format_cents(product.unit_price),
                    format_cents(product.cost_price),
                    product.quantity_on_hand
                );
            }
        }
    }
    Ok(())
}

async fn run_stock_command(books: &Books, cmd: StockCommands, actor: &str) -> Result<()> {
    match cmd {
        StockCommands::Adjust {
            sku,
            kind,
            quantity,
            cost,
        } => {
            let kind = AdjustmentKind::from_str(&kind)
                .with_context(|| format!("Invalid adjustment kind '{kind}'"))?;
            let cost = cost.as_deref().map(parse_amount).transpose()?;
            let movement = books
                .inventory
                .adjust(&sku, kind, quantity, cost, actor)
                .await?;
            println!(
                "Adjusted {}: {:+} units at {}",
                sku,
                movement.quantity,
                format_cents(movement.unit_cost)
            );
        }
        StockCommands::History { sku } => {
            for movement in books.inventory.movements_for_product(&sku).await? {
                println!(
                    "{}  {:<8} {:+}  at {}  {}",
                    movement.occurred_at.format("%Y-%m-%d %H:%M"),
                    movement.kind.as_str(),
                    movement.quantity,
                    format_cents(movement.unit_cost),
                    movement
                        .document_id
                        .map(|id| id.to_string())
                        .unwrap_or_default()
                );
            }
        }
    }
    Ok(())
}

async fn run_rate_command(books: &Books, cmd: RateCommands) -> Result<()> {
    match cmd {
        RateCommands::Set {
            from,
            to,
            rate,
            date,
        } => {
            let date = parse_date_or_today(date.as_deref())?;
            let fact = books.currency.set_rate(&from, &to, rate, date).await?;
            println!(
                "Set rate {} -> {} = {} on {}",
                fact.from_currency, fact.to_currency, fact.rate, fact.effective_date
            );
        }
        RateCommands::Convert {
            amount,
            from,
            to,
            date,
        } => {
            let date = parse_date_or_today(date.as_deref())?;
            let amount = parse_amount(&amount)?;
            match books.currency.convert(amount, &from, &to, date).await? {
                Some(converted) => println!(
                    "{} {} = {} {}",
                    format_cents(amount),
                    from.to_uppercase(),
                    format_cents(converted),
                    to.to_uppercase()
                ),
                None => println!(
                    "No rate available for {} -> {} on or before {}",
                    from.to_uppercase(),
                    to.to_uppercase(),
                    date
                ),
            }
        }
    }
    Ok(())
}

async fn run_asset_command(books: &Books, cmd: AssetCommands) -> Result<()> {
    match cmd {
        AssetCommands::Register {
            name,
            cost,
            purchase_date,
            residual,
            life_months,
        } => {
            let cost = parse_amount(&cost)?;
            let residual = parse_amount(&residual)?;
            let purchase_date = parse_date_or_today(purchase_date.as_deref())?;
            let asset = books
                .assets
                .register(&name, purchase_date, cost, residual, life_months)
                .await?;
            println!(
                "Registered asset {} ({} over {} months)",
                asset.name,
                format_cents(asset.cost),
                asset.useful_life_months
            );
        }
        AssetCommands::List => {
            let today = Utc::now().date_naive();
            for asset in books.assets.list().await? {
                println!(
                    "{:<30} cost {}  book value {}",
                    asset.name,
                    format_cents(asset.cost),
                    format_cents(asset.book_value_as_of(today))
                );
            }
        }
        AssetCommands::Schedule => {
            for (asset, rows) in books.reporting.depreciation_schedules().await? {
                println!("{} ({} months)", asset.name, asset.useful_life_months);
                for row in rows {
                    println!(
                        "  {}  charge {}  accumulated {}  book value {}",
                        row.period,
                        format_cents(row.depreciation),
                        format_cents(row.accumulated),
                        format_cents(row.book_value)
                    );
                }
            }
        }
    }
    Ok(())
}

async fn run_report_command(books: &Books, cmd: ReportCommands) -> Result<()> {
    match cmd {
        ReportCommands::TrialBalance { as_of } => {
            let as_of = parse_date_or_today(as_of.as_deref())?;
            let report = books.reporting.trial_balance(as_of).await?;
            println!("Trial balance as of {}", report.as_of);
            for row in &report.rows {
                println!(
                    "{}  {:<30} {:>12} {:>12}",
                    row.code,
                    row.name,
                    format_cents(row.debit),
                    format_cents(row.credit)
                );
            }
            println!(
                "      {:<30} {:>12} {:>12}",
                "TOTAL",
                format_cents(report.total_debits),
                format_cents(report.total_credits)
            );
        }
        ReportCommands::Pnl { from, to } => {
            let from = parse_date(&from)?;
            let to = parse_date_or_today(to.as_deref())?;
            let report = books.reporting.profit_and_loss(from, to).await?;
            println!("Profit and loss {} to {}", report.from, report.to);
            println!("Revenue:");
            for row in &report.revenue {
                println!("  {}  {:<30} {}", row.code, row.name, format_cents(row.amount));
            }
            println!("Expenses:");
            for row in &report.expenses {
                println!("  {}  {:<30} {}", row.code, row.name, format_cents(row.amount));
            }
            println!(
                "Net income: {} ({} revenue - {} expenses)",
                format_cents(report.net_income),
                format_cents(report.total_revenue),
                format_cents(report.total_expenses)
            );
        }
        ReportCommands::BalanceSheet { as_of } => {
            let as_of = parse_date_or_today(as_of.as_deref())?;
            let report = books.reporting.balance_sheet(as_of).await?;
            println!("Balance sheet as of {}", report.as_of);
            println!("Assets ({}):", format_cents(report.total_assets));
            for row in &report.assets {
                println!("  {}  {:<30} {}", row.code, row.name, format_cents(row.amount));
            }
            println!("Liabilities ({}):", format_cents(report.total_liabilities));
            for row in &report.liabilities {
                println!("  {}  {:<30} {}", row.code, row.name, format_cents(row.amount));
            }
            println!("Equity ({}):", format_cents(report.total_equity));
            for row in &report.equity {
                println!("  {}  {:<30} {}", row.code, row.name, format_cents(row.amount));
            }
            println!(
                "  retained earnings: {}",
                format_cents(report.retained_earnings)
            );
        }
        ReportCommands::Aging { side, as_of } => {
            let kind = match side.as_str() {
                "receivable" | "ar" => DocumentKind::Invoice,
                "payable" | "ap" => DocumentKind::Bill,
                other => bail!("Invalid aging side '{other}', use receivable or payable"),
            };
            let as_of = parse_date_or_today(as_of.as_deref())?;
            let report = books.reporting.aging(kind, as_of).await?;
            println!(
                "{} aging as of {} (in {})",
                if kind == DocumentKind::Invoice {
                    "Receivable"
                } else {
                    "Payable"
                },
                report.as_of,
                report.currency
            );
            for row in &report.rows {
                println!(
                    "{}  {:<20} due {}  [{}]  {} {}{}",
                    row.number,
                    row.party_name,
                    row.due_date,
                    row.bucket.label(),
                    format_cents(row.outstanding),
                    row.currency,
                    match row.outstanding_converted {
                        Some(amount) => format!("  = {} {}", format_cents(amount), report.currency),
                        None => "  (no rate)".to_string(),
                    }
                );
            }
            for (bucket, total) in crate::application::AgingBucket::ALL
                .iter()
                .zip(report.bucket_totals.iter())
            {
                println!("  {:>8}: {}", bucket.label(), format_cents(*total));
            }
            println!("  total: {}", format_cents(report.total));
            if report.has_unconverted {
                println!("  note: some amounts lack a rate and are shown at face value");
            }
        }
    }
    Ok(())
}

async fn run_export(
    books: &Books,
    export_type: &str,
    output: Option<&str>,
    as_of: Option<&str>,
) -> Result<()> {
    let as_of = parse_date_or_today(as_of)?;
    let exporter = Exporter::new(books);

    let mut buffer = Vec::new();
    let count = match export_type {
        "trial-balance" => exporter.export_trial_balance_csv(&mut buffer, as_of).await?,
        "aging-receivable" => {
            exporter
                .export_aging_csv(&mut buffer, DocumentKind::Invoice, as_of)
                .await?
        }
        "aging-payable" => {
            exporter
                .export_aging_csv(&mut buffer, DocumentKind::Bill, as_of)
                .await?
        }
        "journal" => exporter.export_journal_csv(&mut buffer).await?,
        "full" => {
            let snapshot = exporter.export_full_json(&mut buffer).await?;
            snapshot.entries.len()
        }
        other => bail!(
            "Invalid export type '{other}', use trial-balance, aging-receivable, aging-payable, journal or full"
        ),
    };

    match output {
        Some(path) => {
            std::fs::write(path, &buffer)
                .with_context(|| format!("Failed to write export to {path}"))?;
            println!("Exported {count} rows to {path}");
        }
        None => {
            use std::io::Write;
            std::io::stdout().write_all(&buffer)?;
        }
    }
    Ok(())
}

fn print_stock_outcome(label: &str, outcome: &StockOutcome) {
    match outcome {
        StockOutcome::NotApplicable => {}
        StockOutcome::Applied { total_cost } => {
            println!("{label}: applied at cost {}", format_cents(*total_cost));
        }
        StockOutcome::Failed { reason } => {
            println!("{label} FAILED: {reason}");
        }
    }
}

fn parse_date(s: &str) -> Result<NaiveDate> {
    NaiveDate::parse_from_str(s, "%Y-%m-%d")
        .with_context(|| format!("Invalid date '{s}'. Use YYYY-MM-DD"))
}

fn parse_date_or_today(s: Option<&str>) -> Result<NaiveDate> {
    match s {
        Some(s) => parse_date(s),
        None => Ok(Utc::now().date_naive()),
    }
}

fn parse_amount(s: &str) -> Result<Cents> {
    parse_cents(s).with_context(|| format!("Invalid amount '{s}'. Use '50.00' or '50'"))
}

/// Parse "code:amount" for manual entry lines.
fn parse_code_amount(spec: &str) -> Result<(String, Cents)> {
    let (code, amount) = spec
        .split_once(':')
        .with_context(|| format!("Invalid line '{spec}', expected 'code:amount'"))?;
    Ok((code.to_string(), parse_amount(amount)?))
}

/// Parse a document line spec:
/// "qty:unit_price:description[:discount%[:tax%[:sku]]]"
fn parse_line_spec(spec: &str) -> Result<NewDocumentLine> {
    let parts: Vec<&str> = spec.split(':').collect();
    if parts.len() < 3 {
        bail!("Invalid line '{spec}', expected 'qty:unit_price:description[:disc[:tax[:sku]]]'");
    }
    let quantity: f64 = parts[0]
        .parse()
        .with_context(|| format!("Invalid quantity '{}'", parts[0]))?;
    let unit_price = parse_amount(parts[1])?;
    let description = parts[2].to_string();
    let discount_pct: f64 = match parts.get(3) {
        Some(s) if !s.is_empty() => s
            .parse()
            .with_context(|| format!("Invalid discount '{s}'"))?,
        _ => 0.0,
    };
    let tax_pct: f64 = match parts.get(4) {
        Some(s) if !s.is_empty() => s.parse().with_context(|| format!("Invalid tax '{s}'"))?,
        _ => 0.0,
    };
    let product_sku = parts
        .get(5)
        .filter(|s| !s.is_empty())
        .map(|s| s.to_string());

    Ok(NewDocumentLine {
        product_sku,
        description,
        quantity,
        unit_price: Some(unit_price),
        discount_pct,
        tax_pct,
    })
}

fn capitalize(s: &str) -> String {
    let mut chars = s.chars();
    match chars.next() {
        Some(first) => first.to_uppercase().collect::<String>() + chars.as_str(),
        None => String::new(),
    }
}
