//! confman-server - conference management REST API
//!
//! `serve` (default) runs the HTTP service; `create-admin` bootstraps the
//! first administrator account.

use anyhow::{Context, Result};
use clap::{Args, Parser, Subcommand};
use confman_common::config::{AppConfig, ConfigOverrides};
use confman_common::db::{init_database, Role};
use std::path::PathBuf;
use tokio::signal;
use tracing::{error, info};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

use confman_server::db::users::{insert_user, NewUser};
use confman_server::{build_router, validation, AppState};

/// Command-line arguments
#[derive(Parser, Debug)]
#[command(name = "confman-server")]
#[command(about = "Conference management REST API")]
#[command(version)]
struct Cli {
    #[command(flatten)]
    global: GlobalArgs,

    #[command(subcommand)]
    command: Option<Command>,
}

#[derive(Args, Debug)]
struct GlobalArgs {
    /// Path to TOML configuration file
    #[arg(short, long, env = "CONFMAN_CONFIG", global = true)]
    config: Option<PathBuf>,

    /// Path to the SQLite database file
    #[arg(long, env = "CONFMAN_DATABASE", global = true)]
    database: Option<PathBuf>,

    /// Log filter directives (RUST_LOG takes precedence)
    #[arg(long, env = "CONFMAN_LOG", global = true)]
    log_filter: Option<String>,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Run the HTTP service
    Serve(ServeArgs),
    /// Create a pre-verified Admin account
    CreateAdmin(CreateAdminArgs),
}

#[derive(Args, Debug, Default)]
struct ServeArgs {
    /// Address to listen on
    #[arg(short, long, env = "CONFMAN_BIND")]
    bind: Option<String>,

    /// Token signing secret (generated and stored in the database if unset)
    #[arg(long, env = "CONFMAN_TOKEN_SECRET", hide_env_values = true)]
    token_secret: Option<String>,

    /// Endpoint that relays verification emails
    #[arg(long, env = "CONFMAN_NOTIFIER_URL")]
    notifier_url: Option<String>,
}

#[derive(Args, Debug)]
struct CreateAdminArgs {
    #[arg(long)]
    username: String,
    #[arg(long)]
    email: String,
    #[arg(long, env = "CONFMAN_ADMIN_PASSWORD", hide_env_values = true)]
    password: String,
    #[arg(long)]
    phone: String,
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();
    let command = cli.command.unwrap_or(Command::Serve(ServeArgs::default()));

    let mut overrides = ConfigOverrides {
        config_file: cli.global.config,
        database_path: cli.global.database,
        log_filter: cli.global.log_filter,
        ..ConfigOverrides::default()
    };
    if let Command::Serve(args) = &command {
        overrides.bind = args.bind.clone();
        overrides.token_secret = args.token_secret.clone();
        overrides.notifier_url = args.notifier_url.clone();
    }

    let config = AppConfig::load(overrides).context("Failed to load configuration")?;

    // Initialize tracing
    let filter = EnvFilter::try_from_default_env()
        .or_else(|_| EnvFilter::try_new(&config.logging.filter))
        .context("Invalid log filter")?;
    tracing_subscriber::registry()
        .with(filter)
        .with(tracing_subscriber::fmt::layer())
        .init();

    info!("Starting confman-server v{}", env!("CARGO_PKG_VERSION"));
    info!("Database path: {}", config.database_path.display());

    let pool = match init_database(&config.database_path).await {
        Ok(pool) => pool,
        Err(e) => {
            error!("Failed to open database: {}", e);
            return Err(e.into());
        }
    };

    match command {
        Command::Serve(_) => serve(pool, config).await,
        Command::CreateAdmin(args) => create_admin(pool, config, args).await,
    }
}

async fn serve(pool: sqlx::SqlitePool, config: AppConfig) -> Result<()> {
    let bind = config.bind;
    let state = AppState::from_config(pool, config)
        .await
        .context("Failed to initialize application state")?;
    let app = build_router(state);

    let listener = tokio::net::TcpListener::bind(bind)
        .await
        .with_context(|| format!("Failed to bind {}", bind))?;
    info!("Listening on http://{}", bind);

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await
        .context("Server error")?;

    info!("Server shutdown complete");
    Ok(())
}

async fn create_admin(pool: sqlx::SqlitePool, config: AppConfig, args: CreateAdminArgs) -> Result<()> {
    let username = args.username.trim();
    let email = args.email.trim();
    let phone = args.phone.trim();
    validation::username(username)?;
    validation::email(email)?;
    validation::password(&args.password)?;
    validation::phone(phone)?;

    let hasher = confman_common::auth::PasswordHasher::new(
        config.auth.argon2_memory_kib,
        config.auth.argon2_iterations,
    )?;
    let password_hash = hasher.hash(&args.password)?;

    let user = insert_user(
        &pool,
        &NewUser {
            username: username.to_string(),
            email: email.to_string(),
            password_hash,
            phone: phone.to_string(),
            role: Role::Admin,
            verified: true,
        },
    )
    .await
    .context("Failed to create admin")?;

    info!(user_id = %user.id, username = %user.username, "Admin account created");
    println!("Created admin {} ({})", user.username, user.id);
    Ok(())
}

/// Graceful shutdown signal handler
async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = signal::ctrl_c().await {
            error!("Failed to install Ctrl+C handler: {}", e);
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match signal::unix::signal(signal::unix::SignalKind::terminate()) {
            Ok(mut stream) => {
                stream.recv().await;
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
        _ = ctrl_c => {
            info!("Received Ctrl+C, shutting down");
        },
        _ = terminate => {
            info!("Received terminate signal, shutting down");
        },
    }
}
