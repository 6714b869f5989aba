use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;

use gather_cloud::{
    CloudinaryClient, CloudinaryConfig, MediaProvider, PaymentProvider, StripeClient, StripeConfig,
};
use gather_events::{EmailConfig, EmailDelivery};
use tokio_util::sync::CancellationToken;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, Layer};

use gather_api::config::{LogFormat, ServerConfig};
use gather_api::notifications::NotificationRouter;
use gather_api::router::build_app_router;
use gather_api::state::AppState;

#[tokio::main]
async fn main() {
    dotenvy::dotenv().ok();

    // --- Configuration ---
    let config = ServerConfig::from_env();

    // --- Tracing ---
    let fmt_layer = match config.log_format {
        LogFormat::Json => tracing_subscriber::fmt::layer().json().boxed(),
        LogFormat::Pretty => tracing_subscriber::fmt::layer().boxed(),
    };
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "gather_api=debug,gather_events=info,tower_http=debug".into()),
        )
        .with(fmt_layer)
        .init();

    tracing::info!(host = %config.host, port = %config.port, "Loaded server configuration");

    // --- Database ---
    let database_url = std::env::var("DATABASE_URL").expect("DATABASE_URL must be set");

    let pool = gather_db::create_pool(&database_url)
        .await
        .expect("Failed to connect to database");
    tracing::info!("Database connection pool created");

    gather_db::health_check(&pool)
        .await
        .expect("Database health check failed");
    tracing::info!("Database health check passed");

    gather_db::run_migrations(&pool)
        .await
        .expect("Failed to run database migrations");
    tracing::info!("Database migrations applied");

    // --- External providers ---
    let payments: Option<Arc<dyn PaymentProvider>> = match StripeConfig::from_env() {
        Some(cfg) => Some(Arc::new(StripeClient::new(cfg))),
        None => {
            tracing::warn!("STRIPE_SECRET_KEY not set, checkout is disabled");
            None
        }
    };
    if config.stripe_webhook_secret.is_none() {
        tracing::warn!("STRIPE_WEBHOOK_SECRET not set, payment webhooks are refused");
    }
    let media: Option<Arc<dyn MediaProvider>> = match CloudinaryConfig::from_env() {
        Some(cfg) => Some(Arc::new(CloudinaryClient::new(cfg))),
        None => {
            tracing::warn!("Cloudinary credentials not set, media uploads are disabled");
            None
        }
    };
    let email = EmailConfig::from_env().map(EmailDelivery::new);
    if email.is_none() {
        tracing::warn!("SMTP_HOST not set, notifications are logged only");
    }

    // --- Event bus ---
    let event_bus = Arc::new(gather_events::EventBus::default());
    tracing::info!("Event bus created");

    // Spawn event persistence (writes all events to the database).
    let persistence_handle = tokio::spawn(gather_events::EventPersistence::run(
        pool.clone(),
        event_bus.subscribe(),
    ));

    // Spawn notification router (emails the users an event concerns).
    let notification_router = NotificationRouter::new(pool.clone(), email);
    let router_handle = tokio::spawn(notification_router.run(event_bus.subscribe()));

    // Spawn housekeeping (rate-limit hits, dead sessions).
    let housekeeping_cancel = CancellationToken::new();
    let housekeeping_handle = tokio::spawn(gather_api::background::housekeeping::run(
        pool.clone(),
        housekeeping_cancel.clone(),
    ));

    tracing::info!("Background services started (persistence, notifications, housekeeping)");

    // --- App state ---
    let state = AppState {
        pool,
        config: Arc::new(config.clone()),
        event_bus: Arc::clone(&event_bus),
        payments,
        media,
    };

    // --- Router ---
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
    let drain = Duration::from_secs(config.shutdown_timeout_secs);

    housekeeping_cancel.cancel();
    let _ = tokio::time::timeout(drain, housekeeping_handle).await;
    tracing::info!("Housekeeping stopped");

    // Dropping the last bus handle closes the channel, which ends the
    // persistence and notification loops.
    drop(event_bus);
    let _ = tokio::time::timeout(drain, persistence_handle).await;
    let _ = tokio::time::timeout(drain, router_handle).await;
    tracing::info!("Event services shut down");

    tracing::info!("Graceful shutdown complete");
}

/// Wait for SIGINT or SIGTERM to initiate graceful shutdown.
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
