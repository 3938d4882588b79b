//! CommunityWatch server entry point.

use std::net::SocketAddr;
use std::sync::Arc;

use axum::middleware;
use communitywatch_api::{AppState, auth_middleware, router as api_router};
use communitywatch_common::Config;
use communitywatch_core::{
    GeminiClient, GenerativeModel, Geocoder, NominatimGeocoder, UnconfiguredModel,
};
use communitywatch_db::repositories::IssueRepository;
use communitywatch_queue::{RetentionExecutor, SchedulerConfig, run_scheduler};
use tokio::signal;
use tower_http::{
    cors::{Any, CorsLayer},
    trace::TraceLayer,
};
use tracing::{error, info, warn};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

/// Waits for a shutdown signal (SIGINT or SIGTERM).
///
/// On Unix systems, this listens for both SIGINT (Ctrl+C) and SIGTERM.
/// On Windows, this only listens for Ctrl+C.
async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = signal::ctrl_c().await {
            error!(error = %e, "Failed to install Ctrl+C handler");
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match signal::unix::signal(signal::unix::SignalKind::terminate()) {
            Ok(mut sigterm) => {
                sigterm.recv().await;
            }
            Err(e) => {
                error!(error = %e, "Failed to install SIGTERM handler");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        () = ctrl_c => {
            info!("Received SIGINT, initiating graceful shutdown...");
        },
        () = terminate => {
            info!("Received SIGTERM, initiating graceful shutdown...");
        },
    }
}

/// Gemini when a key is configured, otherwise a model whose calls all fail.
fn build_model(config: &Config) -> Result<Arc<dyn GenerativeModel>, Box<dyn std::error::Error>> {
    match config.ai.api_key.as_deref().map(str::trim) {
        Some(key) if !key.is_empty() => {
            info!(model = %config.ai.generation_model, "Using Gemini");
            Ok(Arc::new(GeminiClient::new(&config.ai, key.to_string())?))
        }
        _ => {
            warn!("No AI API key; AI features will use their fallbacks");
            Ok(Arc::new(UnconfiguredModel))
        }
    }
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    // .env is optional
    dotenvy::dotenv().ok();

    // Initialize tracing
    tracing_subscriber::registry()
        .with(tracing_subscriber::fmt::layer())
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "communitywatch=debug,tower_http=debug".into()),
        )
        .init();

    info!("Starting CommunityWatch server...");

    // Load configuration
    let config = Config::load()?;
    config.validate()?;

    // Connect to database
    let db = communitywatch_db::init(&config).await?;
    info!("Connected to database");

    // Run migrations
    info!("Running database migrations...");
    communitywatch_db::migrate(&db).await?;
    info!("Migrations completed");

    let db = Arc::new(db);

    // External capabilities
    let model = build_model(&config)?;
    let geocoder: Arc<dyn Geocoder> = Arc::new(NominatimGeocoder::new(&config.geocoding)?);

    // Retention sweep
    let scheduler_config = SchedulerConfig::from(&config.retention);
    info!(
        retention_days = scheduler_config.issue_retention_days,
        interval_secs = scheduler_config.retention_interval.as_secs(),
        "Starting retention scheduler"
    );
    let scheduler = run_scheduler(
        scheduler_config,
        Arc::new(RetentionExecutor::new(IssueRepository::new(Arc::clone(
            &db,
        )))),
    );

    let state = AppState::new(db, model, geocoder);

    // Layers run outermost first: trace, CORS, then token authentication.
    let app = api_router()
        .layer(middleware::from_fn_with_state(
            state.clone(),
            auth_middleware,
        ))
        .layer(
            CorsLayer::new()
                .allow_origin(Any)
                .allow_methods(Any)
                .allow_headers(Any),
        )
        .layer(TraceLayer::new_for_http())
        .with_state(state);

    // Start server with graceful shutdown
    let ip: std::net::IpAddr = config.server.host.parse()?;
    let addr = SocketAddr::new(ip, config.server.port);
    info!("Listening on {}", addr);

    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    scheduler.abort();
    info!("Server shutdown complete");
    Ok(())
}
