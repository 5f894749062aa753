use anyhow::{Context, Result};
use clap::Parser;
use robot_live_data::api::{self, AppState};
use robot_live_data::bulk::BulkData;
use robot_live_data::catalog::SchemaCatalog;
use robot_live_data::config;
use robot_live_data::db::Store;
use robot_live_data::shift::{ShiftLookup, ShiftSource};
use std::path::PathBuf;
use std::sync::Arc;
use tracing::{info, warn};

#[derive(Debug, Parser)]
#[command(author, version, about)]
struct Args {
    /// Path to YAML config file
    #[arg(long, default_value = "config.yaml")]
    config: PathBuf,
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .with_target(false)
        .compact()
        .init();

    let args = Args::parse();
    let cfg = config::load(Some(&args.config))?;

    let mut settings = cfg.database.store_settings();
    if let Ok(url) = std::env::var("DATABASE_URL") {
        settings.url = url;
    }
    let store = Store::connect(&settings).await?;
    store.run_migrations().await?;

    let catalog = SchemaCatalog::with_ttl(store, cfg.database.schema_cache_ttl());

    // The shift feed is optional; the live-data API runs without it.
    let shift: Option<Arc<dyn ShiftLookup>> = if cfg.shift.endpoints.is_empty() {
        None
    } else {
        match ShiftSource::connect(
            &cfg.shift.endpoints,
            cfg.shift.pool_size,
            cfg.shift.statement_timeout(),
        )
        .await
        {
            Ok(source) => Some(Arc::new(source) as Arc<dyn ShiftLookup>),
            Err(err) => {
                warn!(%err, "shift database unavailable; /shift disabled");
                None
            }
        }
    };

    let app = api::build_router(AppState::new(BulkData::new(catalog), shift));
    let listener = tokio::net::TcpListener::bind(&cfg.server.bind_addr)
        .await
        .with_context(|| format!("failed to bind {}", cfg.server.bind_addr))?;

    info!(addr = %cfg.server.bind_addr, "serving robot live data");
    axum::serve(listener, app).await?;
    Ok(())
}
