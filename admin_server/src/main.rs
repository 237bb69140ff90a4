//! Admin server: serves the tenant-admin API over HTTP.
//!
//! Run from repo root: `cargo run -p admin-server`

use tenant_admin::{app_routes, ensure_catalog_tables, ensure_database_exists, AppState, Settings, DEFAULT_BODY_LIMIT};
use tokio::net::TcpListener;

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    dotenvy::dotenv().ok();
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("tenant_admin=info,admin_server=info")),
        )
        .init();

    let settings = Settings::from_env()?;
    ensure_database_exists(&settings.database_url).await?;
    let pool = sqlx::postgres::PgPoolOptions::new()
        .max_connections(10)
        .connect(&settings.database_url)
        .await?;
    ensure_catalog_tables(&pool, &settings.catalog_schema).await?;

    let state = AppState::from_settings(pool.clone(), &settings)?;
    let reconciled = state.backups.workflow().reconcile_interrupted().await?;
    if reconciled > 0 {
        tracing::warn!(count = reconciled, "marked interrupted backups as failed");
    }

    let app = app_routes(state.clone(), DEFAULT_BODY_LIMIT);
    let listener = TcpListener::bind(&settings.bind_addr).await?;
    tracing::info!("admin server listening on {}", listener.local_addr()?);
    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    tracing::info!("draining background work");
    state.backups.workflow().shutdown(settings.shutdown_grace).await;
    state.admin.clients().close_all().await;
    pool.close().await;
    Ok(())
}

async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            tracing::error!(error = %e, "failed to listen for ctrl-c");
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
            Ok(mut signal) => {
                signal.recv().await;
            }
            Err(e) => {
                tracing::error!(error = %e, "failed to install SIGTERM handler");
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
}
