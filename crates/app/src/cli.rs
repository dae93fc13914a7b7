//! Command-line arguments.

use std::path::PathBuf;

use clap::{Parser, Subcommand};

/// Signs in to a Fylinde GraphQL API and sends authenticated requests.
///
/// The refresh token and session state persist between runs; the access
/// token lives only for one run and is refreshed on demand.
#[derive(Debug, Parser)]
#[command(name = "fylinde-auth", version)]
pub struct Cli {
    /// Configuration file (TOML, JSON or YAML).
    #[arg(long, env = "FYLINDE_AUTH_CONFIG", default_value = "fylinde-auth.toml")]
    pub config: PathBuf,

    /// Session file. Defaults to the platform data directory.
    #[arg(long, env = "FYLINDE_AUTH_STORAGE")]
    pub storage: Option<PathBuf>,

    #[command(subcommand)]
    pub command: Command,
}

/// Session operations.
#[derive(Debug, Subcommand)]
pub enum Command {
    /// Print the session state.
    Status,

    /// Sign in with email and password.
    SignIn {
        /// Account email.
        #[arg(long, env = "FYLINDE_AUTH_EMAIL")]
        email: String,

        /// Account password.
        #[arg(long, env = "FYLINDE_AUTH_PASSWORD", hide_env_values = true)]
        password: String,
    },

    /// Set a new password with a reset token and sign in.
    ResetPassword {
        /// Account email.
        #[arg(long)]
        email: String,

        /// New password.
        #[arg(long, env = "FYLINDE_AUTH_PASSWORD", hide_env_values = true)]
        password: String,

        /// Reset token from the password reset email.
        #[arg(long)]
        token: String,
    },

    /// Send a GraphQL query with the session's credentials.
    Fetch {
        /// GraphQL document.
        query: String,

        /// Target URL. Defaults to the configured API URL.
        #[arg(long)]
        url: Option<String>,

        /// Send the token even if the URL is not the token's issuer.
        #[arg(long)]
        allow_third_party: bool,
    },

    /// Refresh the access token now.
    Refresh,

    /// Forget the session on this machine.
    SignOut,
}
