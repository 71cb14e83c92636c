use clap::Parser;
use std::path::{Path, PathBuf};
use std::process;
use std::sync::Arc;
use thiserror::Error;
use tokio::net::TcpListener;
use tokio::signal;
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

use taskhub_api::create_router;
use taskhub_db::{Database, DbError};

/// Environment variable for overriding the database path
const TASKHUB_DB_PATH_ENV: &str = "TASKHUB_DB_PATH";

/// Taskhub - a REST backend for tasks and their assigned users
#[derive(Parser, Debug)]
#[command(name = "taskhub")]
#[command(version = "0.1.0")]
#[command(about = "A REST backend for tasks and their assigned users", long_about = None)]
struct Args {
    /// Path to the database directory (can also be set via TASKHUB_DB_PATH env var)
    #[arg(long)]
    db: Option<PathBuf>,

    /// Keep all data in memory; `--db` is ignored
    #[arg(long)]
    memory: bool,

    /// Address to listen on
    #[arg(long, env = "HOST", default_value = "0.0.0.0")]
    host: String,

    /// Port to listen on
    #[arg(long, env = "PORT", default_value_t = 3000)]
    port: u16,
}

/// Errors that stop the server
#[derive(Debug, Error)]
enum AppError {
    #[error(transparent)]
    Db(#[from] DbError),

    #[error("Failed to serve on {addr}: {source}")]
    Io {
        addr: String,
        #[source]
        source: std::io::Error,
    },
}

/// Get the database path from command line, environment variable, or default.
///
/// Priority:
/// 1. Command line --db argument
/// 2. TASKHUB_DB_PATH environment variable (if non-empty)
/// 3. Default path (<data dir>/taskhub/data)
fn resolve_db_path(cli_db: Option<PathBuf>) -> PathBuf {
    if let Some(path) = cli_db {
        return path;
    }

    if let Ok(env_path) = std::env::var(TASKHUB_DB_PATH_ENV)
        && !env_path.is_empty()
    {
        return PathBuf::from(env_path);
    }

    Database::default_path()
}

/// Load a `.env` file into the environment (the nearest one when `path` is
/// `None`). Variables already set are kept; a missing file is not an error.
fn load_dotenv(path: Option<&Path>) -> Result<(), dotenvy::Error> {
    let loaded = match path {
        Some(path) => dotenvy::from_path(path),
        None => dotenvy::dotenv().map(|_| ()),
    };

    match loaded {
        Err(e) if e.not_found() => Ok(()),
        other => other,
    }
}

/// Initialize logging from RUST_LOG, defaulting to `info`
fn init_logging() {
    let env_filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));

    tracing_subscriber::fmt()
        .with_env_filter(env_filter)
        .with_target(true)
        .with_level(true)
        .init();
}

#[tokio::main]
async fn main() {
    let dotenv = load_dotenv(None);
    init_logging();

    if let Err(e) = dotenv {
        warn!("Ignoring unreadable .env file: {}", e);
    }

    if let Err(e) = run_app().await {
        eprintln!("Error: {}", e);
        process::exit(1);
    }
}

/// Main application logic - separated for testability
async fn run_app() -> Result<(), AppError> {
    let args = Args::parse();
    let db = open_database(&args).await?;
    serve(&args, db).await
}

/// Open and initialize the store selected by the arguments
async fn open_database(args: &Args) -> Result<Database, AppError> {
    let db = if args.memory {
        Database::in_memory().await?
    } else {
        Database::connect(&resolve_db_path(args.db.clone())).await?
    };

    db.init().await?;
    Ok(db)
}

async fn serve(args: &Args, db: Database) -> Result<(), AppError> {
    let addr = format!("{}:{}", args.host, args.port);
    let app = create_router(Arc::new(db));

    let listener = TcpListener::bind(&addr).await.map_err(|e| AppError::Io {
        addr: addr.clone(),
        source: e,
    })?;
    info!("Listening on {}", addr);

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await
        .map_err(|e| AppError::Io { addr, source: e })?;

    info!("Server stopped");
    Ok(())
}

/// Resolves on Ctrl+C or SIGTERM
async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(error) = signal::ctrl_c().await {
            warn!(%error, "Failed to install Ctrl+C handler");
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match signal::unix::signal(signal::unix::SignalKind::terminate()) {
            Ok(mut sigterm) => {
                sigterm.recv().await;
            }
            Err(error) => {
                warn!(%error, "Failed to install SIGTERM handler");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        () = ctrl_c => {},
        () = terminate => {},
    }

    info!("Shutdown signal received");
}
