use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;

use tokio_util::sync::CancellationToken;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use rkids_api::background::code_sweeper;
use rkids_api::codes::{MemoryCodeStore, PendingCodeStore, PgCodeStore};
use rkids_api::config::{CodeStoreKind, ServerConfig};
use rkids_api::router::build_app_router;
use rkids_api::state::AppState;
use rkids_events::{
    EmailConfig, EmailDelivery, EventBus, NotificationDispatcher, SmsConfig, SmsDelivery,
};

#[tokio::main]
async fn main() {
    dotenvy::dotenv().ok();

    // --- Tracing ---
    let json_logs = std::env::var("LOG_FORMAT").is_ok_and(|v| v.eq_ignore_ascii_case("json"));
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "rkids_api=debug,tower_http=debug".into()),
        )
        .with(json_logs.then(|| tracing_subscriber::fmt::layer().json()))
        .with((!json_logs).then(tracing_subscriber::fmt::layer))
        .init();

    // --- Configuration ---
    let config = ServerConfig::from_env();
    tracing::info!(host = %config.host, port = %config.port, "Loaded server configuration");

    // --- Database ---
    let database_url = std::env::var("DATABASE_URL").expect("DATABASE_URL must be set");

    let pool = rkids_db::create_pool(&database_url)
        .await
        .expect("Failed to connect to database");
    tracing::info!("Database connection pool created");

    rkids_db::health_check(&pool)
        .await
        .expect("Database health check failed");
    tracing::info!("Database health check passed");

    rkids_db::run_migrations(&pool)
        .await
        .expect("Failed to run database migrations");
    tracing::info!("Database migrations applied");

    // --- Pending codes ---
    let codes: Arc<dyn PendingCodeStore> = match config.codes.store {
        CodeStoreKind::Postgres => Arc::new(PgCodeStore::new(pool.clone())),
        CodeStoreKind::Memory => {
            tracing::warn!("Using in-memory code store; codes are lost on restart");
            Arc::new(MemoryCodeStore::new())
        }
    };

    let sweeper_cancel = CancellationToken::new();
    let sweeper_handle = tokio::spawn(code_sweeper::run(
        Arc::clone(&codes),
        sweeper_cancel.clone(),
    ));

    // --- Event bus + notification delivery ---
    let event_bus = Arc::new(EventBus::default());

    let mut dispatcher = NotificationDispatcher::new(pool.clone());
    match EmailConfig::from_env() {
        Some(email) => dispatcher = dispatcher.with_channel(Arc::new(EmailDelivery::new(email))),
        None => tracing::info!("SMTP_HOST not set, email delivery disabled"),
    }
    match SmsConfig::from_env().map(SmsDelivery::new) {
        Some(Ok(sms)) => dispatcher = dispatcher.with_channel(Arc::new(sms)),
        Some(Err(e)) => tracing::error!(error = %e, "SMS delivery disabled: client setup failed"),
        None => tracing::info!("SMS gateway not configured, SMS delivery disabled"),
    }
    tracing::info!(
        channels = dispatcher.channel_count(),
        "Notification dispatcher configured"
    );
    let dispatcher_handle = tokio::spawn(dispatcher.run(event_bus.subscribe()));

    // --- App state ---
    let state = AppState {
        pool,
        config: Arc::new(config.clone()),
        codes,
        event_bus: Arc::clone(&event_bus),
    };

    let app = build_app_router(state, &config);

    // --- Start server ---
    let addr = SocketAddr::new(
        config.host.parse().expect("Invalid HOST address"),
        config.port,
    );
    tracing::info!(%addr, "Starting server");

    let listener = tokio::net::TcpListener::bind(addr)
        .await
        .expect("Failed to bind to address");

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await
        .expect("Server error");

    // --- Post-shutdown cleanup ---
    tracing::info!("Server stopped accepting connections, cleaning up");
    let grace = Duration::from_secs(config.shutdown_timeout_secs);

    sweeper_cancel.cancel();
    let _ = tokio::time::timeout(grace, sweeper_handle).await;
    tracing::info!("Pending code sweeper stopped");

    // The router (and its AppState clone of the bus) is gone by now, so
    // dropping this last sender closes the channel and ends the dispatcher.
    drop(event_bus);
    let _ = tokio::time::timeout(grace, dispatcher_handle).await;
    tracing::info!("Notification dispatcher shut down");

    tracing::info!("Graceful shutdown complete");
}

/// Wait for SIGINT (Ctrl-C) or, on Unix, SIGTERM.
async fn shutdown_signal() {
    let ctrl_c = async {
        tokio::signal::ctrl_c()
            .await
            .expect("Failed to install Ctrl-C handler");
    };

    #[cfg(unix)]
    let terminate = async {
        tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate())
            .expect("Failed to install SIGTERM handler")
            .recv()
            .await;
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        () = ctrl_c => {
            tracing::info!("Received SIGINT (Ctrl-C), starting graceful shutdown");
        }
        () = terminate => {
            tracing::info!("Received SIGTERM, starting graceful shutdown");
        }
    }
}
