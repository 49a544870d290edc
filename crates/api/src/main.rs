use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;

use jobwire_core::store::{InMemoryJobStore, JobStore};
use jobwire_events::{InMemoryBus, MessageBus, RedisBus, ReconnectConfig};
use tokio_util::sync::CancellationToken;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use jobwire_api::config::ServerConfig;
use jobwire_api::relay::EventRelay;
use jobwire_api::router::build_app_router;
use jobwire_api::state::AppState;
use jobwire_api::ws;

#[tokio::main]
async fn main() {
    dotenvy::dotenv().ok();

    // --- Configuration ---
    let config = ServerConfig::from_env();

    // --- Tracing ---
    init_tracing(config.json_logs);
    tracing::info!(host = %config.host, port = %config.port, "Loaded server configuration");

    // --- Job store ---
    let jobs: Arc<dyn JobStore> = match &config.database_url {
        Some(database_url) => {
            let pool = jobwire_db::create_pool(database_url)
                .await
                .expect("Failed to connect to database");
            tracing::info!("Database connection pool created");

            jobwire_db::health_check(&pool)
                .await
                .expect("Database health check failed");

            jobwire_db::run_migrations(&pool)
                .await
                .expect("Failed to run database migrations");
            tracing::info!("Database migrations applied");

            Arc::new(jobwire_db::PgJobStore::new(pool))
        }
        None => {
            tracing::warn!("DATABASE_URL not set; jobs are kept in memory only");
            Arc::new(InMemoryJobStore::new())
        }
    };

    // --- Message bus ---
    let reconnect = ReconnectConfig::default();
    let bus: Arc<dyn MessageBus> = match &config.redis_url {
        Some(redis_url) => {
            tracing::info!("Using Redis message bus");
            let bus = RedisBus::new(redis_url).expect("Invalid REDIS_URL");
            Arc::new(bus.with_reconnect(reconnect.clone()))
        }
        None => {
            tracing::warn!("REDIS_URL not set; using in-process bus (no external worker can connect)");
            Arc::new(InMemoryBus::default())
        }
    };

    // --- App state ---
    let state = AppState::new(config.clone(), jobs, Arc::clone(&bus));

    // --- Event relay ---
    let relay_cancel = CancellationToken::new();
    let relay_handle = EventRelay::new(Arc::clone(&state.registry), config.topics()).spawn(
        Arc::clone(&bus),
        reconnect,
        relay_cancel.clone(),
    );

    // --- Heartbeat ---
    let heartbeat_handle = ws::start_heartbeat(
        Arc::clone(&state.ws_manager),
        Duration::from_secs(config.heartbeat_interval_secs),
    );

    // --- Router ---
    let ws_manager = Arc::clone(&state.ws_manager);
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

    relay_cancel.cancel();
    bus.close();
    let _ = tokio::time::timeout(Duration::from_secs(5), relay_handle).await;
    tracing::info!("Event relay stopped");

    let ws_count = ws_manager.connection_count().await;
    tracing::info!(ws_count, "Closing remaining WebSocket connections");
    ws_manager.shutdown_all().await;

    heartbeat_handle.abort();
    tracing::info!("Graceful shutdown complete");
}

/// Install the global subscriber. `RUST_LOG` overrides the default filter.
fn init_tracing(json: bool) {
    let filter = tracing_subscriber::EnvFilter::try_from_default_env().unwrap_or_else(|_| {
        "jobwire_api=debug,jobwire_events=debug,jobwire_db=info,tower_http=debug".into()
    });
    let registry = tracing_subscriber::registry().with(filter);

    if json {
        registry.with(tracing_subscriber::fmt::layer().json()).init();
    } else {
        registry.with(tracing_subscriber::fmt::layer()).init();
    }
}

/// Wait for a termination signal to initiate graceful shutdown.
///
/// Handles both SIGINT (Ctrl-C) and SIGTERM (on Unix).
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
