// SPDX-License-Identifier: MPL-2.0

use paddock::booru::Rule34Client;
use paddock::runtime;
use paddock::store::Db;
use paddock::sync::{LogSink, SyncEngine};
use tracing_subscriber::EnvFilter;

fn main() {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .init();

    if let Err(e) = runtime::block_on(run()) {
        tracing::error!(error = %e, "failed to start sync");
        std::process::exit(1);
    }
}

async fn run() -> Result<(), Box<dyn std::error::Error>> {
    let db = Db::open()?;
    let client = Rule34Client::new()?;
    let engine = SyncEngine::new(db, client, LogSink);

    engine.sync_all().await;
    Ok(())
}
