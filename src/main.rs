use std::sync::Arc;

use anyhow::Context;
use clap::Parser;
use tracing::info;

use tabular_uploader::config::ServerConfig;
use tabular_uploader::import::Importer;
use tabular_uploader::logging;
use tabular_uploader::materialize::postgres::{build_pool, spawn_idle_reaper, PostgresWriter};
use tabular_uploader::server::{self, AppState};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let config = ServerConfig::parse();
    logging::init(&config.log_filter)?;

    let base = config.base_descriptor().context("invalid DATABASE_URI")?;
    let addr = config.bind_addr().context("invalid bind address")?;

    let pool = build_pool(&base, config.pool_size)?;
    let _reaper = spawn_idle_reaper(pool.clone(), config.pool_idle());
    info!(database = %base, pool_size = config.pool_size, "connection pool ready");

    let writer = PostgresWriter::new(pool.clone(), base.clone());
    let state = AppState {
        importer: Importer::new(Arc::new(writer)),
        base,
        pool,
        upload_limit_bytes: config.upload_limit_bytes(),
    };

    server::serve(state, addr).await?;
    Ok(())
}
