use clap::{Parser, Subcommand};

/// Minimum secret length accepted by the server in production.
pub const MIN_SECRET_BYTES: usize = 32;

#[derive(Parser, Debug)]
#[command(name = "sns_cli", about = "SNS backend maintenance commands", version)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Print version.
    Version,

    /// Print a random secret suitable for `JWT_SECRET`.
    GenSecret {
        /// Bytes of entropy before encoding.
        #[arg(long, default_value_t = 48, value_parser = clap::value_parser!(u16).range(MIN_SECRET_BYTES as i64..=1024))]
        bytes: u16,
    },

    /// Delete expired refresh tokens.
    CleanupTokens {
        /// PostgreSQL connection URL.
        #[arg(long, env = "DATABASE_URL", default_value = "postgres://localhost:5432/sns")]
        database_url: String,
    },

    /// Revoke every refresh token of a user ("log out everywhere").
    RevokeSessions {
        #[arg(long)]
        user_id: i64,

        /// PostgreSQL connection URL.
        #[arg(long, env = "DATABASE_URL", default_value = "postgres://localhost:5432/sns")]
        database_url: String,
    },
}
