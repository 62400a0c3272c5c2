use std::sync::Arc;
use std::time::Duration;

use almanac_app::app::api::routes;
use almanac_app::config::{ConfigHandler, expand_options};
use almanac_app::db_handler::DbProviderHandler;
use almanac_app::fetch_handler::FetcherHandler;
use almanac_core::config::load_config;
use almanac_db::db::connection::create_pool;
use almanac_db::db::migrations::run_migrations;
use almanac_service::import::ReqwestFetcher;
use salvo::conn::TcpListener;
use salvo::{Listener, Router};
use tracing_subscriber::{EnvFilter, fmt, layer::SubscriberExt, reload, util::SubscriberInitExt};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let (filter_layer, filter_handle) = reload::Layer::new(EnvFilter::new("debug"));

    tracing_subscriber::registry()
        .with(filter_layer)
        .with(
            fmt::layer()
                .with_target(true)
                .with_thread_ids(true)
                .with_file(true)
                .with_line_number(true),
        )
        .init();

    tracing::info!("Starting Almanac events calendar");

    let config = load_config()?;

    tracing::info!(config = ?config, "Configuration loaded");

    if let Ok(filter) = EnvFilter::try_new(config.logging.level.as_str()) {
        if let Err(e) = filter_handle.modify(|current| *current = filter) {
            tracing::warn!(error = %e, "Failed to update log filter from config");
        }
    } else {
        tracing::warn!(level = %config.logging.level, "Invalid log level in config, keeping debug");
    }

    // Fail on a bad timezone before accepting requests
    let options = expand_options(&config)?;
    tracing::info!(timezone = %options.timezone, "Calendar timezone resolved");

    run_migrations(&config.database.url).await?;

    let pool = create_pool(
        &config.database.url,
        u32::from(config.database.max_connections),
    )
    .await?;

    tracing::info!("Database connection pool created.");

    let fetcher = ReqwestFetcher::new(Duration::from_secs(config.import.timeout_secs))?;

    let bind_addr = format!("{}:{}", config.server.host, config.server.port);
    let acceptor = TcpListener::new(bind_addr.clone()).bind().await;

    let router = Router::new()
        .hoop(DbProviderHandler::new(pool))
        .hoop(ConfigHandler {
            settings: config.clone(),
        })
        .hoop(FetcherHandler {
            fetcher: Arc::new(fetcher),
        })
        .push(routes());

    tracing::info!("Server listening on {bind_addr}");

    salvo::Server::new(acceptor).serve(router).await;

    Ok(())
}
