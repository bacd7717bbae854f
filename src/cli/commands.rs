//! CLI command definitions

use clap::{Parser, Subcommand};

#[derive(Parser)]
#[command(name = "gatepass")]
#[command(about = "Service-token gateway for multi-service trust", long_about = None)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,

    /// Token signing secret
    #[arg(long, env = "GATEPASS_SECRET", global = true)]
    pub secret: Option<String>,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Start the gateway server
    Serve {
        /// Address to bind to
        #[arg(short, long, default_value = "0.0.0.0:8080")]
        bind: String,

        /// Origin allowed to open realtime connections (can be repeated)
        #[arg(
            long = "allow-origin",
            env = "GATEPASS_ALLOWED_ORIGINS",
            value_delimiter = ','
        )]
        allowed_origins: Vec<String>,

        /// Token lifetime in seconds
        #[arg(long, default_value_t = 900)]
        token_lifetime: i64,

        /// Seed a development session: user[:role[:email[:name]]]
        #[arg(long = "dev-session")]
        dev_sessions: Vec<String>,
    },

    /// Mint a service token
    ///
    /// Examples:
    ///   gatepass mint --user u1 --role admin
    ///   gatepass mint --user u2 --lifetime 60
    Mint {
        /// Subject user id
        #[arg(long)]
        user: String,

        /// Role to embed (defaults to "user")
        #[arg(long)]
        role: Option<String>,

        /// Email to embed
        #[arg(long)]
        email: Option<String>,

        /// Display name to embed
        #[arg(long)]
        name: Option<String>,

        /// Lifetime in seconds
        #[arg(long, default_value_t = 900)]
        lifetime: i64,
    },

    /// Verify a token and print its claims
    Inspect {
        /// The token to verify
        token: String,
    },
}
