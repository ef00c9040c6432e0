use std::path::PathBuf;
use std::time::{SystemTime, UNIX_EPOCH};

use clap::{Parser, ValueEnum};
use db_infra::config::file::DEFAULT_CONFIG_PATH;
use db_infra::{
    build_admin_pool, check_schema, orchestrate_migration, DbInfraError, MigrationConfig,
    SchemaDrift,
};
use migration::{bookkeeping_sql, defined_migration_names, MigrationCommand};
use sea_orm::{DatabaseConnection, DbBackend};
use shared_models::metadata::{metadata, render_ddl};
use tokio_util::sync::CancellationToken;
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

const DEFAULT_LOG_FILTER: &str = "migration=info,db_infra=info,sqlx=warn";

#[derive(Clone, Copy, Debug, PartialEq, Eq, ValueEnum)]
enum Command {
    Up,
    Down,
    Fresh,
    Reset,
    Refresh,
    Status,
    /// Compare the live schema with the shared models
    Check,
}

#[derive(Clone, Copy, Debug, ValueEnum)]
enum Dialect {
    Postgres,
    Sqlite,
}

impl From<Dialect> for DbBackend {
    fn from(dialect: Dialect) -> Self {
        match dialect {
            Dialect::Postgres => DbBackend::Postgres,
            Dialect::Sqlite => DbBackend::Sqlite,
        }
    }
}

#[derive(Parser, Debug)]
#[command(name = "migration")]
#[command(about = "Schema migrations for the shared users database")]
struct Args {
    /// Migration command to run
    #[arg(value_enum)]
    command: Command,

    /// Env file to load instead of ./.env
    #[arg(long, value_name = "PATH")]
    env_file: Option<PathBuf>,

    /// Migration config file
    #[arg(long, value_name = "PATH", default_value = DEFAULT_CONFIG_PATH)]
    config: PathBuf,

    /// Print the SQL plan instead of connecting (only with `up`)
    #[arg(long)]
    offline: bool,

    /// SQL dialect for --offline [default: postgres]
    #[arg(long, value_enum)]
    dialect: Option<Dialect>,
}

/// Flag combinations clap cannot express; exit code 2.
fn usage_error(args: &Args) -> Option<&'static str> {
    if args.offline && args.command != Command::Up {
        return Some("--offline is only supported with `up`");
    }
    if args.dialect.is_some() && !args.offline {
        return Some("--dialect only applies to --offline");
    }
    None
}

#[tokio::main]
async fn main() {
    let args = Args::parse();

    // Loaded before logging so RUST_LOG from the env file applies.
    let env_file_result = match &args.env_file {
        Some(path) => dotenvy::from_path(path).map(|_| Some(path.clone())),
        None => Ok(dotenvy::dotenv().ok()),
    };

    tracing_subscriber::fmt()
        .with_writer(std::io::stderr)
        .without_time()
        .with_target(false)
        .with_thread_ids(false)
        .with_thread_names(false)
        .with_line_number(false)
        .with_file(false)
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(DEFAULT_LOG_FILTER)),
        )
        .init();

    match env_file_result {
        Ok(Some(path)) => info!(env_file = %path.display(), "environment file loaded"),
        Ok(None) => {}
        Err(e) => {
            eprintln!("Failed to load env file: {e}");
            std::process::exit(1);
        }
    }

    if let Some(message) = usage_error(&args) {
        eprintln!("{message}");
        std::process::exit(2);
    }

    if let Err(e) = run(args).await {
        eprintln!("Migration failed: {e}");
        std::process::exit(1);
    }
}

async fn run(args: Args) -> Result<(), DbInfraError> {
    if args.offline {
        let backend: DbBackend = args.dialect.unwrap_or(Dialect::Postgres).into();
        let applied_at = SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .map(|d| d.as_secs() as i64)
            .unwrap_or_default();
        println!("{}", offline_plan(backend, applied_at));
        return Ok(());
    }

    let config = MigrationConfig::load(&args.config)?.resolve()?;

    let cancellation_token = CancellationToken::new();
    let ctrl_c_token = cancellation_token.clone();
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            warn!("interrupt received, cancelling");
            ctrl_c_token.cancel();
        }
    });

    let command = match args.command {
        Command::Up => MigrationCommand::Up,
        Command::Down => MigrationCommand::Down,
        Command::Fresh => MigrationCommand::Fresh,
        Command::Reset => MigrationCommand::Reset,
        Command::Refresh => MigrationCommand::Refresh,
        Command::Status => MigrationCommand::Status,
        Command::Check => {
            return tokio::select! {
                result = async {
                    let pool = build_admin_pool(&config).await?;
                    run_check(&pool).await
                } => result,
                _ = cancellation_token.cancelled() => {
                    Err(DbInfraError::migration("schema check cancelled"))
                }
            };
        }
    };

    orchestrate_migration(&config, command, cancellation_token).await
}

/// Print the drift report; any drift is an error.
async fn run_check(pool: &DatabaseConnection) -> Result<(), DbInfraError> {
    let drift = check_schema(pool).await?;
    println!("{}", render_drift(&drift));
    if drift.is_clean() {
        return Ok(());
    }
    Err(DbInfraError::Drift {
        count: drift.items.len(),
    })
}

fn render_drift(drift: &SchemaDrift) -> String {
    if drift.is_clean() {
        return format!("schema matches shared models ({})", metadata().fingerprint());
    }
    drift
        .items
        .iter()
        .map(|item| format!("drift: {item}"))
        .collect::<Vec<_>>()
        .join("\n")
}

/// SQL that brings an empty database to the current schema and records the
/// migrations as applied.
fn offline_plan(backend: DbBackend, applied_at: i64) -> String {
    let mut plan = vec![
        format!("-- offline plan ({backend:?})"),
        format!("-- shared models fingerprint: {}", metadata().fingerprint()),
    ];
    plan.extend(
        defined_migration_names()
            .into_iter()
            .map(|name| format!("-- migration: {name}")),
    );
    plan.push(render_ddl(backend));
    plan.push(bookkeeping_sql(backend, applied_at));
    plan.join("\n")
}
