//! SNS backend API server binary.
//!
//! Loads configuration, migrates the database, starts the background sweeps
//! and serves the HTTP API until Ctrl-C.

use std::net::SocketAddr;
use std::sync::Arc;

use clap::Parser;
use sns_api::AppState;
use sns_api::config::ApiConfig;
use sns_core::auth::queries::{PgRefreshTokenRepository, PgUserDirectory};
use sqlx::postgres::PgPoolOptions;
use tokio_util::sync::CancellationToken;
use tracing::{error, info};
use tracing_subscriber::EnvFilter;

const DEFAULT_LOG_FILTER: &str = "info,sns_api=debug,sns_core=debug";

/// CLI arguments for the API server.
#[derive(Parser, Debug)]
#[command(name = "sns_api_server", about = "SNS backend API server", version)]
struct Args {
    /// Port to listen on (0 = ephemeral).
    #[arg(long, env = "PORT", default_value_t = 8080)]
    port: u16,

    /// PostgreSQL connection URL.
    #[arg(
        long,
        env = "DATABASE_URL",
        default_value = "postgres://localhost:5432/sns"
    )]
    database_url: String,

    /// Maximum number of database connections in the pool.
    #[arg(long, default_value_t = 10)]
    max_connections: u32,
}

async fn shutdown_signal(token: CancellationToken) {
    if let Err(e) = tokio::signal::ctrl_c().await {
        error!(error = %e, "failed to listen for ctrl-c");
    }
    info!("shutdown requested");
    token.cancel();
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    dotenvy::dotenv().ok();

    tracing_subscriber::fmt()
        .with_writer(std::io::stderr)
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(DEFAULT_LOG_FILTER)),
        )
        .init();

    let args = Args::parse();

    // Weak or missing secrets stop the process here.
    let config = ApiConfig::from_env()?;

    info!(
        port = args.port,
        deployment = %config.deployment,
        auth_limit = config.rate_limit.auth_limit,
        general_limit = config.rate_limit.general_limit,
        "starting sns_api_server"
    );

    let pool = PgPoolOptions::new()
        .max_connections(args.max_connections)
        .acquire_timeout(std::time::Duration::from_secs(30))
        .connect(&args.database_url)
        .await?;

    info!("running database migrations");
    sns_api::migrate(&pool).await?;

    let cleanup_interval = config.token_cleanup_interval;
    let state = AppState::new(
        config,
        Arc::new(PgRefreshTokenRepository::new(pool.clone())),
        Arc::new(PgUserDirectory::new(pool)),
    );

    let shutdown = CancellationToken::new();
    let token_sweep = state
        .sessions
        .store()
        .spawn_cleanup_task(cleanup_interval, shutdown.clone());
    let limiter_sweep = state.limiter.spawn_cleanup_task(shutdown.clone());

    let app = sns_api::router(state);

    let listener = tokio::net::TcpListener::bind(SocketAddr::from(([0, 0, 0, 0], args.port))).await?;
    info!(addr = %listener.local_addr()?, "REST API listening");

    tokio::spawn(shutdown_signal(shutdown.clone()));

    let serve_result = axum::serve(
        listener,
        app.into_make_service_with_connect_info::<SocketAddr>(),
    )
    .with_graceful_shutdown({
        let shutdown = shutdown.clone();
        async move { shutdown.cancelled().await }
    })
    .await;

    // The server may also stop on its own; make sure the sweeps follow.
    shutdown.cancel();
    let (token_joined, limiter_joined) = tokio::join!(token_sweep, limiter_sweep);
    report_failed_tasks([("token sweep", token_joined), ("rate limit sweep", limiter_joined)]);

    serve_result?;
    info!("server stopped");
    Ok(())
}

/// Log background tasks that ended in a panic or cancellation. Returns how many.
fn report_failed_tasks<const N: usize>(
    joined: [(&'static str, Result<(), tokio::task::JoinError>); N],
) -> usize {
    let mut failed = 0;
    for (task, result) in joined {
        if let Err(e) = result {
            error!(task, error = %e, "background task failed");
            failed += 1;
        }
    }
    failed
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn panicked_sweep_is_reported() {
        let healthy = tokio::spawn(async {}).await;
        let panicked = tokio::spawn(async { panic!("sweep blew up") }).await;

        assert_eq!(
            report_failed_tasks([("token sweep", healthy), ("rate limit sweep", panicked)]),
            1
        );
    }
}
