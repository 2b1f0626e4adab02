//! Storefront HTTP server.

use std::net::SocketAddr;
use std::sync::Arc;
use storefront_commerce::{AdminSessions, Shop};
use storefront_core::{Clock, SystemClock};
use storefront_payments::StripeGateway;
use storefront_redis::RedisKvStore;
use storefront_server::{metrics::install_exporter, Config, Mailer};
use storefront_web::{build_router, AppState};
use tokio::signal;
use tracing::{error, info, warn};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let _ = dotenvy::dotenv();

    // Initialize tracing
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "storefront=info,tower_http=debug".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    info!("Starting storefront server");

    // Load configuration
    let config = Config::from_env();
    config.validate()?;
    info!(?config, "Configuration loaded");

    if let Some(port) = config.server.metrics_port {
        install_exporter(SocketAddr::from(([0, 0, 0, 0], port)))?;
        info!(port, "Prometheus exporter listening");
    }

    info!(redis_url = %config.redis_url, "Connecting to Redis...");
    let kv = RedisKvStore::new(&config.redis_url).await?;
    if let Err(err) = kv.ping().await {
        warn!(error = %err, "Redis did not answer PING; continuing");
    }

    let payments = StripeGateway::new(
        config.stripe.secret_key.clone(),
        config.stripe.webhook_secret.clone(),
    );
    let mailer = Mailer::from_config(&config.email)?;
    info!(provider = mailer.kind(), "Email provider ready");

    let clock: Arc<dyn Clock> = Arc::new(SystemClock);
    let sessions = AdminSessions::new(
        &config.admin.token,
        config.admin.session_secret.as_deref(),
        Arc::clone(&clock),
    )?;
    let shop = Shop::new(kv, payments, mailer, clock, config.shop_config());
    let state = AppState::new(shop, sessions, config.admin.secure_cookies);

    let app = build_router(state);

    let addr = format!("{}:{}", config.server.host, config.server.port);
    let listener = tokio::net::TcpListener::bind(&addr).await?;
    info!(address = %addr, "Server listening");

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    info!("Server stopped");
    Ok(())
}

/// Resolves on Ctrl+C or SIGTERM. A handler that cannot be installed is
/// logged and never fires.
async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(err) = signal::ctrl_c().await {
            error!(error = %err, "Failed to install Ctrl+C handler");
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match signal::unix::signal(signal::unix::SignalKind::terminate()) {
            Ok(mut stream) => {
                stream.recv().await;
            }
            Err(err) => {
                error!(error = %err, "Failed to install SIGTERM handler");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        () = ctrl_c => {
            info!("Received Ctrl+C signal, shutting down gracefully...");
        },
        () = terminate => {
            info!("Received SIGTERM signal, shutting down gracefully...");
        },
    }
}
