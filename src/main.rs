use std::{net::SocketAddr, sync::Arc, time::Duration};

use tokio::signal;
use tower_http::{
    cors::{Any, CorsLayer},
    timeout::TimeoutLayer,
    trace::TraceLayer,
};
use tracing::{error, info};

use arbitrage_api as api;

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let cfg = api::config::load_config()?;
    api::config::init_tracing(cfg.log_level(), cfg.log_json);

    // Init DB
    let db_pool = api::db::establish_connection_from_app_config(&cfg).await?;
    if cfg.auto_migrate {
        api::db::run_migrations(&db_pool).await.map_err(|e| {
            error!("Failed running migrations: {}", e);
            e
        })?;
    }

    // Build the analysis pipeline once; it is shared across all requests.
    let pipeline = Arc::new(api::build_pipeline(&cfg));
    if pipeline.marketplace_count() == 0 {
        info!("no marketplace credentials configured; items will carry empty marketplace data");
    }
    if cfg.ai.api_key.is_none() {
        info!("no AI backend configured; every item takes the heuristic assessment path");
    }

    let state = api::AppState {
        db: Arc::new(db_pool),
        config: cfg.clone(),
        pipeline,
    };

    // Request timeout sits above the run deadline so the pipeline, not the
    // HTTP layer, decides how a slow run degrades.
    let request_timeout = cfg.pipeline.run_deadline() + Duration::from_secs(10);

    let app = api::app_router(state)
        .layer(TraceLayer::new_for_http())
        .layer(TimeoutLayer::new(request_timeout))
        .layer(
            CorsLayer::new()
                .allow_origin(Any)
                .allow_methods(Any)
                .allow_headers(Any),
        );

    let addr: SocketAddr = cfg.server_addr().parse()?;
    info!("arbitrage-api listening on http://{}", addr);
    let listener = tokio::net::TcpListener::bind(addr).await?;

    axum::serve(listener, app.into_make_service())
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    Ok(())
}

async fn shutdown_signal() {
    let ctrl_c = async {
        signal::ctrl_c()
            .await
            .expect("failed to install Ctrl+C handler");
    };

    #[cfg(unix)]
    let terminate = async {
        use tokio::signal::unix::{signal, SignalKind};

        let mut sigterm =
            signal(SignalKind::terminate()).expect("failed to install signal handler");
        sigterm.recv().await;
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {},
        _ = terminate => {},
    }
}
