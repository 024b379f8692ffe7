mod config;

use std::net::SocketAddr;
use std::sync::Arc;

use tower_http::cors::CorsLayer;
use tower_http::services::{ServeDir, ServeFile};
use tower_http::trace::TraceLayer;
use tracing::info;

use beacon_api::AppStateInner;
use beacon_dispatch::DispatchConfig;
use beacon_geo::{OverpassPlaceFinder, PlaceFinder};
use beacon_sms::{Fast2SmsConfig, Fast2SmsTransport, LogOnlyTransport, PacedTransport, Pacing, SmsTransport};

use crate::config::Config;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Load .env if present
    let _ = dotenvy::dotenv();

    // Init logging
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "beacon=debug,tower_http=debug".into()),
        )
        .init();

    let config = Config::from_env()?;

    // Init database
    let db = Arc::new(beacon_db::Database::open(&config.db_path)?);

    // Outbound providers
    let pacing = Pacing::fixed(config.sms_interval);
    let transport: Arc<dyn SmsTransport> = match &config.fast2sms_api_key {
        Some(api_key) => {
            let fast2sms = Fast2SmsTransport::new(Fast2SmsConfig {
                api_key: api_key.clone(),
                endpoint: config.fast2sms_endpoint.clone(),
                timeout: config.sms_timeout,
            })?;
            info!("SMS via Fast2SMS at {}, {:?} between sends", config.fast2sms_endpoint, pacing.min_interval());
            Arc::new(PacedTransport::new(fast2sms, pacing))
        }
        None => Arc::new(PacedTransport::new(LogOnlyTransport, pacing)),
    };
    let places: Arc<dyn PlaceFinder> =
        Arc::new(OverpassPlaceFinder::new(config.overpass_endpoint.clone(), config.places_timeout)?);

    let dispatch_config = DispatchConfig {
        send_timeout: config.sms_timeout,
        time_budget: config.dispatch_budget,
        alert_offset: config.alert_offset,
    };

    let state = AppStateInner::new(db, config.jwt_secret.clone(), transport, places, dispatch_config);

    // Static pages fall back to index.html
    let index = config.public_dir.join("index.html");
    let pages = ServeDir::new(&config.public_dir).not_found_service(ServeFile::new(index));

    let app = beacon_api::router(state)
        .fallback_service(pages)
        .layer(CorsLayer::permissive())
        .layer(TraceLayer::new_for_http());

    let addr: SocketAddr = format!("{}:{}", config.host, config.port).parse()?;
    info!("Beacon server listening on {}", addr);
    info!(
        "SOS send timeout {:?}, dispatch budget {:?}",
        config.sms_timeout, config.dispatch_budget
    );

    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    Ok(())
}

async fn shutdown_signal() {
    let ctrl_c = tokio::signal::ctrl_c();
    #[cfg(unix)]
    {
        match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
            Ok(mut sigterm) => {
                tokio::select! {
                    _ = ctrl_c => info!("Received Ctrl+C, shutting down..."),
                    _ = sigterm.recv() => info!("Received SIGTERM, shutting down..."),
                }
            }
            Err(e) => {
                tracing::warn!("failed to install SIGTERM handler: {}", e);
                ctrl_c.await.ok();
                info!("Received Ctrl+C, shutting down...");
            }
        }
    }
    #[cfg(not(unix))]
    {
        ctrl_c.await.ok();
        info!("Received Ctrl+C, shutting down...");
    }
}
