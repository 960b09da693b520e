//! Help-desk HTTP server.

use helpdesk::{
    api::{self, AppState},
    config::{AdminBootstrap, Config},
    desk::{DeskEnvironment, DeskStore},
    types::Role,
    validation::Registration,
    HelpdeskError,
};
use helpdesk_core::environment::SystemClock;
use std::sync::Arc;
use tokio::signal;
use tower_http::{cors::CorsLayer, trace::TraceLayer};
use tracing::{error, info, warn};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();
    let config = Config::from_env()?;

    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| config.server.log_level.clone().into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    info!(
        address = %config.server.bind_address(),
        default_page_size = config.paging.default_size,
        max_page_size = config.paging.max_size,
        session_ttl_secs = config.auth.session_ttl.num_seconds(),
        "Configuration loaded"
    );

    let env = DeskEnvironment::new(Arc::new(SystemClock)).with_session_ttl(config.auth.session_ttl);
    let store = Arc::new(DeskStore::new(env));

    if let Some(admin) = config.auth.admin.clone() {
        bootstrap_admin(&store, admin).await?;
    }

    let app = api::router(AppState::new(store, config.paging))
        .layer(TraceLayer::new_for_http())
        .layer(CorsLayer::permissive());

    let addr = config.server.bind_address();
    let listener = tokio::net::TcpListener::bind(&addr).await?;
    info!(address = %addr, "Server listening");

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    info!("Server stopped");
    Ok(())
}

async fn bootstrap_admin(store: &DeskStore, admin: AdminBootstrap) -> anyhow::Result<()> {
    let username = admin.username.clone();
    let registration = Registration {
        username: admin.username,
        email: admin.email,
        password: admin.password,
    };
    match store.create_account(registration, Role::Admin).await {
        Ok(view) => info!(user_id = %view.id, username = %view.username, "Admin account created"),
        Err(HelpdeskError::Conflict(reason)) => {
            warn!(username = %username, reason = %reason, "Admin account not created");
        },
        Err(error) => return Err(error.into()),
    }
    Ok(())
}

async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(error) = signal::ctrl_c().await {
            error!(%error, "Failed to install Ctrl+C handler");
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match signal::unix::signal(signal::unix::SignalKind::terminate()) {
            Ok(mut stream) => {
                stream.recv().await;
            },
            Err(error) => {
                error!(%error, "Failed to install SIGTERM handler");
                std::future::pending::<()>().await;
            },
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
