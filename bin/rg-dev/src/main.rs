//! Rolegate Development Server
//!
//! Single binary for local development:
//! - Role management API (admin only)
//! - Route rules from config, each guarded by its own roles group
//! - Health and Prometheus metrics endpoints

mod api;
mod auth;
mod roles;

use std::path::PathBuf;
use std::sync::Arc;

use anyhow::Result;
use clap::Parser;
use metrics_exporter_prometheus::PrometheusBuilder;
use tokio::net::TcpListener;
use tokio::signal;
use tower_http::trace::TraceLayer;
use tracing::{error, info, warn};

use rg_common::PrincipalId;
use rg_config::{ConfigLoader, RouteRule, StoreBackend, StoreConfig};
use rg_store::memory::InMemoryAssociationStore;
use rg_store::sqlite::SqliteAssociationStore;
use rg_store::StoreError;

use crate::api::{Manager, Store};
use crate::auth::HeaderPrincipalSource;
use crate::roles::AppRole;

/// Rolegate Development Server
#[derive(Parser, Debug)]
#[command(name = "rg-dev")]
#[command(about = "Rolegate Development Server - role management and guarded routes")]
struct Args {
    /// Config file (otherwise ROLEGATE_CONFIG or the standard locations)
    #[arg(long)]
    config: Option<PathBuf>,

    /// HTTP port, overriding the config file
    #[arg(long, env = "RG_PORT")]
    port: Option<u16>,

    /// Grant the admin role to this principal at startup
    #[arg(long, env = "RG_BOOTSTRAP_ADMIN")]
    bootstrap_admin: Option<String>,

    /// Extra guarded route as `path:include,...:exclude,...` (repeatable)
    #[arg(long = "route")]
    routes: Vec<RouteRule>,
}

#[tokio::main]
async fn main() -> Result<()> {
    // Initialize logging (JSON if LOG_FORMAT=json, text otherwise)
    rg_common::logging::init_logging("rg-dev");

    let args = Args::parse();

    let loader = match &args.config {
        Some(path) => ConfigLoader::with_path(path),
        None => ConfigLoader::new(),
    };
    let mut config = loader.load()?;
    if let Some(port) = args.port {
        config.http.port = port;
    }
    config.routes.extend(args.routes);
    config.validate()?;

    info!("Starting Rolegate Dev Server");
    info!(
        backend = ?config.store.backend,
        routes = config.routes.len(),
        "Configuration loaded"
    );

    let metrics = PrometheusBuilder::new().install_recorder()?;

    let store = build_store(&config.store).await?;
    let manager = Arc::new(Manager::new(store));

    if let Some(admin) = &args.bootstrap_admin {
        bootstrap_admin(&manager, admin).await?;
    }

    let source = HeaderPrincipalSource::new(&config.auth.principal_header)?;
    let app = api::build_router(manager, source, &config.routes, Some(metrics))?
        .layer(TraceLayer::new_for_http());

    let addr = format!("{}:{}", config.http.host, config.http.port);
    let listener = TcpListener::bind(&addr).await?;
    info!("HTTP server listening on http://{}", addr);

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    info!("Rolegate Dev Server shutdown complete");
    Ok(())
}

async fn build_store(config: &StoreConfig) -> Result<Store> {
    match config.backend {
        StoreBackend::Memory => {
            warn!("Using in-memory role store; associations are lost on restart");
            Ok(Arc::new(InMemoryAssociationStore::<AppRole>::new()))
        }
        StoreBackend::Sqlite => {
            info!(url = %config.sqlite_url, "Connecting SQLite role store");
            let store = SqliteAssociationStore::<AppRole>::connect(
                &config.sqlite_url,
                config.max_connections,
                config.query_timeout(),
            )
            .await?;
            store.init_schema().await?;
            Ok(Arc::new(store))
        }
    }
}

/// Grant admin to `id`; already holding it is fine
async fn bootstrap_admin(manager: &Manager, id: &str) -> Result<()> {
    match manager.add_role(&PrincipalId::new(id), AppRole::Admin).await {
        Ok(_) => info!(principal_id = id, "Bootstrap admin granted"),
        Err(StoreError::DuplicateRole { .. }) => {
            info!(principal_id = id, "Bootstrap admin already present")
        }
        Err(e) => return Err(e.into()),
    }
    Ok(())
}

async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = signal::ctrl_c().await {
            error!("Failed to listen for Ctrl+C: {}", e);
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
                error!("Failed to install SIGTERM handler: {}", e);
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {},
        _ = terminate => {},
    }

    info!("Shutdown signal received");
}
