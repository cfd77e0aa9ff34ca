// AgroCoop Server - Main Entry Point
//
// Bootstrap, CLI commands and tracing setup. Handlers, routes and business
// logic live in the library crate.

use std::{
    env, fs,
    path::{Path, PathBuf},
    sync::OnceLock,
};

use agrocoop_core::{config::AppConfig, db::Database, permissions::PermissionTable};
use agrocoop_server::{build_state, router};
use anyhow::{Context, anyhow, bail};
use clap::{Args, Parser, Subcommand};
use dotenvy::{Error as DotenvError, dotenv, from_filename};
use tokio::net::TcpListener;
use tracing::{error, info, warn};
use tracing_appender::non_blocking;
use tracing_subscriber::EnvFilter;

static TRACING_FILE_GUARD: OnceLock<non_blocking::WorkerGuard> = OnceLock::new();

#[derive(Parser, Debug)]
#[command(author, version, about = "AgroCoop cooperative management server", long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Option<Command>,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Start the HTTP server
    Serve,
    /// Run database migrations
    Migrate,
    /// Create a workspace owned by the given user id
    CreateWorkspace(CreateWorkspaceArgs),
    /// Print the role permission table
    Roles,
}

#[derive(Args, Debug)]
struct CreateWorkspaceArgs {
    /// Owner user ID to associate with the workspace
    #[arg(long = "owner-id", value_name = "ID")]
    owner_id: String,
    /// Display name for the workspace
    #[arg(long, value_name = "NAME")]
    name: String,
    /// Optional description
    #[arg(long, value_name = "TEXT")]
    description: Option<String>,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let env_status = load_env_file();
    init_tracing()?;
    report_env_status(&env_status);

    let cli = Cli::parse();
    let config = AppConfig::load()?;

    match cli.command.unwrap_or(Command::Serve) {
        Command::Serve => run_serve(config).await,
        Command::Migrate => run_migrate(config).await,
        Command::CreateWorkspace(args) => run_create_workspace(config, args).await,
        Command::Roles => run_roles(),
    }
}

async fn run_serve(config: AppConfig) -> anyhow::Result<()> {
    info!(
        database_path = %config.database_path,
        database_max_connections = config.database_max_connections,
        blob_store_backend = ?config.blob_store_backend,
        storage_bucket = %config.storage_bucket,
        base_path = %config.base_path,
        "Starting server"
    );
    let database = Database::connect(&config).await?;
    let state = build_state(&database, &config)?;
    info!(
        name = state.metadata.name,
        version = state.metadata.version,
        "Loaded server metadata"
    );

    let app = router::build_router(state, &config);

    let listener = TcpListener::bind(config.bind_address)
        .await
        .context("failed to bind socket")?;
    let actual_addr = listener
        .local_addr()
        .context("failed to read local address")?;

    info!("listening on {actual_addr}");

    if let Err(error) = axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await
    {
        error!(?error, "server terminated with error");
    }

    Ok(())
}

async fn run_migrate(config: AppConfig) -> anyhow::Result<()> {
    let database = Database::connect(&config).await?;
    info!(path = %database.database_path().display(), "migrations completed");
    Ok(())
}

async fn run_create_workspace(config: AppConfig, args: CreateWorkspaceArgs) -> anyhow::Result<()> {
    let CreateWorkspaceArgs {
        owner_id,
        name,
        description,
    } = args;

    let owner_id = owner_id.trim();
    if owner_id.is_empty() {
        bail!("owner-id must not be empty");
    }
    let trimmed_name = name.trim();
    if trimmed_name.is_empty() {
        bail!("workspace name must not be empty");
    }

    let database = Database::connect(&config).await?;
    let state = build_state(&database, &config)?;

    let workspace = state
        .workspace_service
        .create_workspace(owner_id, trimmed_name, description.as_deref())
        .await
        .map_err(|err| anyhow!("failed to create workspace: {err}"))?;

    info!(
        workspace_id = %workspace.id,
        owner_id = %workspace.owner_id,
        "created workspace"
    );
    println!(
        "Created workspace '{}' ({}) for owner {}",
        workspace.name, workspace.id, workspace.owner_id
    );

    Ok(())
}

fn run_roles() -> anyhow::Result<()> {
    let table = PermissionTable::standard();
    for role in table.roles() {
        let permissions: Vec<&str> = role
            .permissions
            .iter()
            .map(|permission| permission.as_str())
            .collect();
        println!("{:<8} {}", role.name.as_str(), permissions.join(", "));
    }
    Ok(())
}

/// JSON logs to stdout when `AGROCOOP_LOG_TO_STDOUT` is set (and not "0"),
/// otherwise to a daily rolling file under `AGROCOOP_LOG_DIR`. `RUST_LOG`
/// controls the level.
fn init_tracing() -> anyhow::Result<()> {
    let env_filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));

    let log_to_stdout = env::var("AGROCOOP_LOG_TO_STDOUT")
        .map(|v| !v.trim().is_empty() && v.trim() != "0")
        .unwrap_or(false);

    if log_to_stdout {
        return tracing_subscriber::fmt()
            .with_env_filter(env_filter)
            .with_ansi(false)
            .json()
            .with_writer(std::io::stdout)
            .try_init()
            .map_err(|err| anyhow!("failed to initialise tracing: {err}"));
    }

    let log_dir = env::var("AGROCOOP_LOG_DIR").unwrap_or_else(|_| "logs".to_string());
    fs::create_dir_all(&log_dir)
        .with_context(|| format!("failed to create log dir '{log_dir}'"))?;
    let file_appender = tracing_appender::rolling::daily(&log_dir, "server.log");
    let (writer, guard) = non_blocking(file_appender);

    tracing_subscriber::fmt()
        .with_env_filter(env_filter)
        .with_ansi(false)
        .json()
        .with_writer(writer)
        .try_init()
        .map_err(|err| anyhow!("failed to initialise tracing: {err}"))?;
    let _ = TRACING_FILE_GUARD.set(guard);
    Ok(())
}

enum EnvLoadStatus {
    Loaded(PathBuf),
    NotFound,
    Failed(DotenvError),
}

fn load_env_file() -> EnvLoadStatus {
    if let Ok(env_file) = env::var("AGROCOOP_ENV_FILE") {
        let trimmed = env_file.trim();
        if !trimmed.is_empty() {
            let path = PathBuf::from(trimmed);
            return match from_filename(&path) {
                Ok(_) => {
                    let display_path = make_relative(&path).unwrap_or_else(|| path.clone());
                    EnvLoadStatus::Loaded(display_path)
                }
                Err(err) => EnvLoadStatus::Failed(err),
            };
        }
    }

    match dotenv() {
        Ok(path) => {
            let display_path = make_relative(&path).unwrap_or_else(|| path.clone());
            EnvLoadStatus::Loaded(display_path)
        }
        Err(DotenvError::Io(err)) if err.kind() == std::io::ErrorKind::NotFound => {
            EnvLoadStatus::NotFound
        }
        Err(err) => EnvLoadStatus::Failed(err),
    }
}

fn report_env_status(status: &EnvLoadStatus) {
    match status {
        EnvLoadStatus::Loaded(path) => {
            info!("Loaded environment variables from {}", path.display());
        }
        EnvLoadStatus::NotFound => {
            info!("No .env file found; using process environment only");
        }
        EnvLoadStatus::Failed(err) => {
            warn!("Failed to load .env file: {err:?}");
        }
    }
}

fn make_relative(path: &Path) -> Option<PathBuf> {
    let cwd = env::current_dir().ok()?;
    path.strip_prefix(&cwd).map(|p| p.to_path_buf()).ok()
}

async fn shutdown_signal() {
    #[cfg(unix)]
    {
        use tokio::signal::unix::{SignalKind, signal};

        match (
            signal(SignalKind::terminate()),
            signal(SignalKind::interrupt()),
        ) {
            (Ok(mut term), Ok(mut int)) => {
                tokio::select! {
                    _ = term.recv() => {},
                    _ = int.recv() => {},
                }
            }
            _ => {
                warn!("failed to install unix signal handlers; falling back to ctrl-c");
                let _ = tokio::signal::ctrl_c().await;
            }
        }
    }

    #[cfg(not(unix))]
    {
        let _ = tokio::signal::ctrl_c().await;
    }
}
