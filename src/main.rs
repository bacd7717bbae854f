//! Gatepass CLI entry point

mod cli;

use crate::cli::{Cli, Commands};
use anyhow::{Context, Result};
use clap::Parser;
use gatepass::auth::{SigningSecret, TokenIssuer, TokenVerifier};
use gatepass::config::GatewayConfig;
use gatepass::server::GatewayServer;
use gatepass::session::{InMemorySessions, Session};
use std::sync::Arc;
use tracing::info;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

#[tokio::main]
async fn main() -> Result<()> {
    // Load .env file if present
    dotenvy::dotenv().ok();

    // Initialize tracing
    tracing_subscriber::registry()
        .with(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .with(tracing_subscriber::fmt::layer())
        .init();

    let cli = Cli::parse();

    let secret = cli
        .secret
        .context("GATEPASS_SECRET or --secret required")?;
    let secret = SigningSecret::new(secret.into_bytes());

    match cli.command {
        Commands::Serve {
            bind,
            allowed_origins,
            token_lifetime,
            dev_sessions,
        } => serve(secret, bind, allowed_origins, token_lifetime, dev_sessions).await,
        Commands::Mint {
            user,
            role,
            email,
            name,
            lifetime,
        } => mint(secret, user, role, email, name, lifetime),
        Commands::Inspect { token } => inspect(secret, token),
    }
}

async fn serve(
    secret: SigningSecret,
    bind: String,
    allowed_origins: Vec<String>,
    token_lifetime: i64,
    dev_sessions: Vec<String>,
) -> Result<()> {
    let bind_addr = bind.parse().context("Invalid bind address")?;

    let sessions = Arc::new(InMemorySessions::new());
    for spec in &dev_sessions {
        let session = parse_dev_session(spec)?;
        let user = session.user_id.clone();
        let id = sessions.insert(session);
        info!(user = %user, session_id = %id, "seeded development session");
    }

    let mut config = GatewayConfig::new(bind_addr, secret);
    config.allowed_origins = allowed_origins;
    config.token_lifetime_secs = token_lifetime;

    let server = GatewayServer::new(config, sessions);

    info!("Starting gatepass server...");
    server.run().await
}

fn mint(
    secret: SigningSecret,
    user: String,
    role: Option<String>,
    email: Option<String>,
    name: Option<String>,
    lifetime: i64,
) -> Result<()> {
    let mut session = Session::new(user);
    session.role = role;
    session.email = email;
    session.display_name = name;

    let issuer = TokenIssuer::new(secret);
    let token = issuer
        .issue_with_lifetime(&session, lifetime)
        .context("Cannot mint token")?;

    println!("{}", token);
    Ok(())
}

fn inspect(secret: SigningSecret, token: String) -> Result<()> {
    let verifier = TokenVerifier::new(secret);
    let claims = verifier.verify(&token).context("Token rejected")?;

    println!("Subject: {}", claims.sub);
    println!("Role:    {}", claims.role);
    if let Some(email) = &claims.email {
        println!("Email:   {}", email);
    }
    if let Some(name) = &claims.name {
        println!("Name:    {}", name);
    }
    println!("Issued:  {}", claims.iat);
    println!("Expires: {}", claims.exp);

    Ok(())
}

fn parse_dev_session(spec: &str) -> Result<Session> {
    let mut parts = spec.splitn(4, ':');
    let user = parts
        .next()
        .filter(|s| !s.is_empty())
        .context("dev session needs a user id")?;

    let mut session = Session::new(user);
    session.role = parts.next().filter(|s| !s.is_empty()).map(str::to_string);
    session.email = parts.next().filter(|s| !s.is_empty()).map(str::to_string);
    session.display_name = parts.next().filter(|s| !s.is_empty()).map(str::to_string);

    Ok(session)
}
