// Import and re-export the `error` module
pub use self::error::{Error, Result};
mod error;

use std::sync::Arc;

use base64::Engine;
use base64::engine::general_purpose::URL_SAFE_NO_PAD;
use chrono::Duration;
use clap::Parser;
use cli::{Cli, Commands};
use rand::{RngCore, rng};
use sns_core::auth::RefreshTokenStore;
use sns_core::auth::config::DEFAULT_REFRESH_TOKEN_TTL_SECS;
use sns_core::auth::queries::PgRefreshTokenRepository;
use sqlx::PgPool;

mod cli;
mod logging;

fn main() -> Result<()> {
    if let Err(e) = run() {
        log::error!("{}", e);
        std::process::exit(1);
    }
    Ok(())
}

fn run() -> Result<()> {
    dotenvy::dotenv().ok();
    logging::init()?;

    let args = Cli::parse();

    match args.command {
        Commands::Version => {
            println!("{} {}", env!("CARGO_PKG_NAME"), env!("CARGO_PKG_VERSION"));
        }
        Commands::GenSecret { bytes } => {
            let mut buf = vec![0u8; usize::from(bytes)];
            rng().fill_bytes(&mut buf);
            println!("{}", URL_SAFE_NO_PAD.encode(&buf));
        }
        Commands::CleanupTokens { database_url } => {
            block_on(async {
                let store = token_store(&database_url).await?;
                let deleted = store.cleanup_expired().await?;
                log::info!("deleted {deleted} expired refresh tokens");
                println!("{deleted}");
                Ok::<(), Error>(())
            })?;
        }
        Commands::RevokeSessions {
            user_id,
            database_url,
        } => {
            block_on(async {
                let store = token_store(&database_url).await?;
                let revoked = store.revoke_all(user_id).await?;
                log::info!("revoked {revoked} refresh tokens for user {user_id}");
                println!("{revoked}");
                Ok::<(), Error>(())
            })?;
        }
    }

    Ok(())
}

fn block_on<F>(fut: F) -> Result<()>
where
    F: std::future::Future<Output = Result<()>>,
{
    tokio::runtime::Builder::new_current_thread()
        .enable_all()
        .build()?
        .block_on(fut)
}

async fn token_store(database_url: &str) -> Result<RefreshTokenStore> {
    let pool = PgPool::connect(database_url).await?;
    Ok(RefreshTokenStore::new(
        Arc::new(PgRefreshTokenRepository::new(pool)),
        Duration::seconds(DEFAULT_REFRESH_TOKEN_TTL_SECS),
    ))
}
