use clap::Parser;
use std::net::SocketAddr;
use tracing_subscriber::EnvFilter;

use forum::auth::{password, session, totp::Totp};
use forum::config::{Cli, Command, Config};
use forum::db;
use forum::state::AppState;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Initialize logging
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    // Parse CLI args and load config
    let cli = Cli::parse();
    let data_dir = Config::data_dir(&cli);
    std::fs::create_dir_all(&data_dir)?;
    tracing::info!("Data directory: {}", data_dir.display());

    let config = Config::load(&cli)?;

    // Initialize database
    let pool = db::create_pool(&config.db_path())?;
    db::run_migrations(&pool)?;

    match cli.command.clone().unwrap_or(Command::Serve) {
        Command::Serve => serve(AppState { db: pool, config }).await,
        Command::AddUser {
            username,
            name,
            password: plaintext,
            totp,
        } => {
            let conn = pool.get()?;
            let hash = password::hash(&plaintext)?;
            let enrollment = if totp {
                Some(Totp::enroll(&config.auth.totp_issuer, &username)?)
            } else {
                None
            };

            let id = db::users::create_user(
                &conn,
                &username,
                &name,
                &hash,
                enrollment.as_ref().map(|e| e.secret.as_str()),
            )?;
            tracing::info!("Created user {} with id {}", username, id);

            if let Some(enrollment) = enrollment {
                println!("TOTP secret: {}", enrollment.secret);
                println!("Provisioning URL: {}", enrollment.url);
            }
            Ok(())
        }
    }
}

async fn serve(state: AppState) -> anyhow::Result<()> {
    {
        let conn = state.db.get()?;
        let purged = session::purge_expired(&conn)?;
        if purged > 0 {
            tracing::info!("Purged {} expired sessions", purged);
        }
    }

    // Warm the unknown-user hash before the first login.
    password::verify_missing_user("");

    let addr: SocketAddr =
        format!("{}:{}", state.config.server.host, state.config.server.port).parse()?;
    let app = forum::app(state);

    tracing::info!("Listening on http://{}", addr);
    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, app).await?;

    Ok(())
}
