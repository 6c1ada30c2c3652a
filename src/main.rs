use canteen::application::canteen::Canteen;
use canteen::auth::InMemoryTokenValidator;
use canteen::config::AppConfig;
use canteen::domain::ports::StorageEngineBox;
use canteen::infrastructure::in_memory::InMemoryStorage;
#[cfg(feature = "storage-rocksdb")]
use canteen::infrastructure::rocksdb::RocksDBStorage;
use canteen::interfaces::batch::BatchRunner;
use canteen::interfaces::csv::balance_writer::BalanceWriter;
use canteen::interfaces::csv::command_reader::CommandReader;
use canteen::interfaces::seed::SeedData;
use canteen::logging::init_logging;
use clap::Parser;
use miette::{IntoDiagnostic, Result};
use std::fs::File;
use std::io;
use std::path::{Path, PathBuf};
use std::sync::Arc;

#[derive(Parser)]
#[command(author, version, about, long_about = None)]
struct Cli {
    /// Input commands CSV file
    input: PathBuf,

    /// YAML configuration file (optional)
    #[arg(long)]
    config: Option<PathBuf>,

    /// Path to persistent database (optional). If provided, uses RocksDB.
    #[arg(long)]
    db_path: Option<PathBuf>,

    /// YAML seed file with users, stands and products (optional)
    #[arg(long)]
    seed: Option<PathBuf>,
}

fn open_storage(db_path: Option<&Path>) -> Result<StorageEngineBox> {
    match db_path {
        #[cfg(feature = "storage-rocksdb")]
        Some(path) => Ok(Box::new(RocksDBStorage::open(path).into_diagnostic()?)),
        #[cfg(not(feature = "storage-rocksdb"))]
        Some(_) => {
            eprintln!(
                "WARNING: Persistent storage requested via --db-path, but 'storage-rocksdb' feature is not enabled. Falling back to In-Memory storage."
            );
            Ok(Box::new(InMemoryStorage::new()))
        }
        None => Ok(Box::new(InMemoryStorage::new())),
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    let mut config = match &cli.config {
        Some(path) => AppConfig::load(path).into_diagnostic()?,
        None => AppConfig::default(),
    };
    if cli.db_path.is_some() {
        config.db_path = cli.db_path;
    }
    if cli.seed.is_some() {
        config.seed_path = cli.seed;
    }
    init_logging(&config);

    let engine = open_storage(config.db_path.as_deref())?;
    let canteen = Canteen::new(engine, Arc::new(InMemoryTokenValidator::new()));

    if let Some(seed_path) = &config.seed_path {
        SeedData::load(seed_path)
            .into_diagnostic()?
            .apply(&canteen)
            .await
            .into_diagnostic()?;
    }

    // Process commands
    let file = File::open(cli.input).into_diagnostic()?;
    let runner = BatchRunner::new(&canteen);
    for cmd_result in CommandReader::new(file).commands() {
        match cmd_result {
            Ok(cmd) => {
                if let Err(e) = runner.execute(&cmd).await {
                    eprintln!("Error processing command: {}", e);
                }
            }
            Err(e) => {
                eprintln!("Error reading command: {}", e);
            }
        }
    }

    // Output final balances
    let users = canteen.users().await.into_diagnostic()?;
    let stdout = io::stdout();
    let mut writer = BalanceWriter::new(stdout.lock());
    writer.write_balances(users).into_diagnostic()?;

    Ok(())
}
