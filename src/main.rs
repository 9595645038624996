use clap::{Parser, Subcommand};

mod app;
mod auth;
mod config;
mod db;
mod error;
mod guests;
mod progress;
mod responses;
mod state;
mod store;

#[derive(Parser)]
#[command(author, version, about = "Wedding RSVP backend")]
struct Cli {
    #[command(subcommand)]
    command: Option<Command>,
}

#[derive(Subcommand)]
enum Command {
    /// Run the HTTP server (default).
    Serve,
    /// Create an admin account directly in the database and exit.
    CreateUser {
        #[arg(long)]
        username: String,
        #[arg(long, env = "NEW_USER_PASSWORD", hide_env_values = true)]
        password: String,
    },
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();

    let env_filter = std::env::var("RUST_LOG")
        .unwrap_or_else(|_| "wedding_rsvp=debug,axum=info,tower_http=info".to_string());
    let json_logs = std::env::var("LOG_FORMAT")
        .map(|v| v == "json")
        .unwrap_or(false);

    if json_logs {
        tracing_subscriber::fmt()
            .with_env_filter(env_filter)
            .with_target(false)
            .json()
            .init();
    } else {
        tracing_subscriber::fmt().with_env_filter(env_filter).init();
    }

    match Cli::parse().command.unwrap_or(Command::Serve) {
        Command::Serve => {
            let state = state::AppState::init().await?;
            let config = state.config.clone();
            app::serve(app::build_app(state), &config).await
        }
        Command::CreateUser { username, password } => {
            let db = db::connect(&config::DatabaseConfig::from_env()?).await?;
            db::migrate(&db).await?;

            let mut conn = db.acquire().await?;
            let user = auth::services::create_user(&mut conn, &username, &password)
                .await
                .map_err(|e| anyhow::anyhow!("could not create user: {e}"))?;
            tracing::info!(user_id = %user.id, username = %user.username, "user created");
            Ok(())
        }
    }
}
