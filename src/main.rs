use clap::Parser;
use miette::{IntoDiagnostic, Result};
use std::fs::File;
use std::io::{self, IsTerminal};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;
use tracing::warn;
use tracing_subscriber::EnvFilter;
use txnledger::application::bootstrap::bootstrap;
use txnledger::application::engine::TransferEngine;
use txnledger::config::LedgerConfig;
use txnledger::domain::ports::{AccountStoreRef, TransferStoreRef};
use txnledger::infrastructure::in_memory::{InMemoryAccountStore, InMemoryTransferStore};
use txnledger::interfaces::csv::account_writer::AccountWriter;
use txnledger::interfaces::csv::journal_writer::JournalWriter;
use txnledger::interfaces::csv::operation_reader::OperationReader;

#[derive(Parser)]
#[command(author, version, about, long_about = None)]
struct Cli {
    /// Input operations CSV file
    input: PathBuf,

    /// Path to persistent database (optional). If provided, uses RocksDB.
    #[arg(long)]
    db_path: Option<PathBuf>,

    /// Drop the accounts collection and journal, then install the schema, before processing
    #[arg(long)]
    reset: bool,

    /// JSON schema declaration installed on a fresh collection
    #[arg(long)]
    schema: Option<PathBuf>,

    /// How long a transfer may wait for its account locks, in milliseconds
    #[arg(long, default_value_t = 500)]
    lock_timeout_ms: u64,

    /// Also write the transfer journal as CSV to this path
    #[arg(long)]
    journal: Option<PathBuf>,
}

fn in_memory_stores() -> (AccountStoreRef, TransferStoreRef) {
    (
        Arc::new(InMemoryAccountStore::new()),
        Arc::new(InMemoryTransferStore::new()),
    )
}

#[cfg(feature = "storage-rocksdb")]
fn open_stores(db_path: Option<&Path>, reset: bool) -> Result<(AccountStoreRef, TransferStoreRef)> {
    use txnledger::infrastructure::rocksdb::RocksDBStore;

    let Some(path) = db_path else {
        return Ok(in_memory_stores());
    };
    if reset && path.exists() {
        RocksDBStore::destroy(path).into_diagnostic()?;
    }
    let store = RocksDBStore::open(path).into_diagnostic()?;
    let accounts: AccountStoreRef = Arc::new(store.clone());
    let transfers: TransferStoreRef = Arc::new(store);
    Ok((accounts, transfers))
}

#[cfg(not(feature = "storage-rocksdb"))]
fn open_stores(db_path: Option<&Path>, _reset: bool) -> Result<(AccountStoreRef, TransferStoreRef)> {
    if db_path.is_some() {
        warn!(
            "WARNING: Persistent storage requested via --db-path, but 'storage-rocksdb' feature is not enabled. Falling back to In-Memory storage."
        );
    }
    Ok(in_memory_stores())
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn")),
        )
        .with_writer(io::stderr)
        .with_ansi(io::stderr().is_terminal())
        .init();

    let mut config =
        LedgerConfig::default().with_lock_timeout(Duration::from_millis(cli.lock_timeout_ms));
    if let Some(schema_path) = &cli.schema {
        config = config.with_schema_file(schema_path).into_diagnostic()?;
    }

    let (accounts, transfers) = open_stores(cli.db_path.as_deref(), cli.reset)?;
    if cli.reset {
        bootstrap(accounts.as_ref(), transfers.as_ref(), &config.schema)
            .await
            .into_diagnostic()?;
    }
    let engine = TransferEngine::open(accounts, transfers, &config)
        .await
        .into_diagnostic()?;

    // Process operations; the header is line 1
    let file = File::open(&cli.input).into_diagnostic()?;
    let reader = OperationReader::new(file);
    for (row, op_result) in reader.operations().enumerate() {
        let line = row + 2;
        match op_result {
            Ok(op) => {
                if let Err(e) = engine.process_operation(op).await {
                    warn!(line, error = %e, "Error processing operation");
                }
            }
            Err(e) => {
                warn!(line, error = %e, "Error reading operation");
            }
        }
    }

    // Output final state
    let accounts = engine.accounts().await.into_diagnostic()?;
    let stdout = io::stdout();
    let mut writer = AccountWriter::new(stdout.lock());
    writer.write_accounts(accounts).into_diagnostic()?;

    if let Some(journal_path) = &cli.journal {
        let file = File::create(journal_path).into_diagnostic()?;
        JournalWriter::new(file)
            .write_transfers(engine.transfers().await.into_diagnostic()?)
            .into_diagnostic()?;
    }

    Ok(())
}
