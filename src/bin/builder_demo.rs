//! Catalog walkthrough through the query-builder layer.

use clap::Parser;
use rel::cli::{Args, DemoConfig};
use rel::demo::{self, Snapshot};
use rel::error::{RelError, Stage};
use rel::pool::Database;

#[tokio::main]
async fn main() {
    let config = DemoConfig::from_args(Args::parse());
    if let Err(err) = config.init_logging("builder-demo") {
        eprintln!("failed to open run log: {err}");
        std::process::exit(1);
    }
    config.log_config();

    if let Err(err) = run(&config).await {
        tracing::error!("{err}");
        std::process::exit(1);
    }
}

async fn run(config: &DemoConfig) -> Result<Snapshot, RelError> {
    let db = Database::open(&config.db)
        .await
        .map_err(|e| e.during(Stage::Open))?;
    let outcome = demo::builder::run(&db, config.run).await;
    db.close();
    outcome
}
