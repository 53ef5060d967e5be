//! Waypoint - GraphQL data service with Relay global IDs.
//!
//! # Usage
//!
//! ```bash
//! # Start with default config (PostgreSQL)
//! waypoint
//!
//! # Start without a database
//! waypoint --storage memory
//!
//! # Start with environment overrides
//! DATABASE_URL=postgres://localhost/waypoint GRAPHQL_PORT=8080 waypoint
//! ```

use std::io::{self, Write};
use std::sync::Arc;
use std::time::Duration;

use anyhow::{bail, Context, Result};
use clap::Parser;
use metrics_exporter_prometheus::PrometheusBuilder;
use tokio::signal;
use tokio::sync::watch;
use tracing::{debug, error, info, info_span, warn, Instrument};
use tracing_subscriber::{fmt, EnvFilter};

use waypoint_core::metrics::init_metrics;
use waypoint_core::ports::{PaginationConfig, Repositories};
use waypoint_graphql::{build_node_registry, build_schema, serve_with_shutdown, ServerConfig};
use waypoint_storage::{Database, DatabaseConfig, MemoryRepositories, PgRepositories};

/// Storage backend.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum StorageKind {
    Postgres,
    Memory,
}

/// Waypoint CLI - Relay-compliant GraphQL data service.
#[derive(Parser, Debug)]
#[command(name = "waypoint")]
#[command(about = "Waypoint - GraphQL data service with Relay global IDs and cursor pagination")]
#[command(version)]
struct Cli {
    /// PostgreSQL database URL.
    #[arg(
        long,
        env = "DATABASE_URL",
        default_value = "postgres://localhost/waypoint"
    )]
    database_url: String,

    /// Storage backend: postgres or memory (data is lost on exit).
    #[arg(long, env = "STORAGE", default_value = "postgres", value_parser = parse_storage)]
    storage: StorageKind,

    /// GraphQL server port.
    #[arg(long, env = "GRAPHQL_PORT", default_value = "4000")]
    graphql_port: u16,

    /// Prometheus metrics port.
    #[arg(long, env = "METRICS_PORT", default_value = "9090")]
    metrics_port: u16,

    /// Enable JSON log output.
    #[arg(long, env = "JSON_LOGS")]
    json_logs: bool,

    /// Log level (trace, debug, info, warn, error).
    #[arg(long, env = "LOG_LEVEL", default_value = "info")]
    log_level: String,

    /// Page size of connections queried without `first` or `last`.
    #[arg(long, env = "DEFAULT_PAGE_SIZE", default_value = "20")]
    default_page_size: usize,

    /// Largest accepted `first`/`last`; larger values are clamped.
    #[arg(long, env = "MAX_PAGE_SIZE", default_value = "100")]
    max_page_size: usize,

    /// Maximum execution time of one GraphQL request, in seconds.
    #[arg(long, env = "REQUEST_TIMEOUT_SECS", default_value = "30")]
    request_timeout_secs: u64,

    /// Disable the GraphiQL playground.
    #[arg(long, env = "NO_PLAYGROUND")]
    no_playground: bool,

    /// Run database migrations and exit.
    #[arg(long)]
    migrate_only: bool,

    /// Purge all users and videos from the database and exit.
    ///
    /// Schema/migrations are preserved.
    #[arg(long)]
    purge: bool,

    /// Skip confirmation prompt for destructive operations (like --purge).
    #[arg(long, short = 'y')]
    yes: bool,
}

/// Parse storage backend from string.
fn parse_storage(s: &str) -> Result<StorageKind, String> {
    match s.to_lowercase().as_str() {
        "postgres" | "postgresql" => Ok(StorageKind::Postgres),
        "memory" => Ok(StorageKind::Memory),
        _ => Err(format!(
            "Invalid storage '{}'. Use 'postgres' or 'memory'.",
            s
        )),
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    dotenvy::dotenv().ok();
    let cli = Cli::parse();
    init_tracing(&cli.log_level, cli.json_logs);

    // Prometheus metrics exporter (optional - failures don't crash the app)
    let metrics_enabled = match format!("0.0.0.0:{}", cli.metrics_port).parse::<std::net::SocketAddr>() {
        Ok(metrics_addr) => {
            match PrometheusBuilder::new()
                .with_http_listener(metrics_addr)
                .install()
            {
                Ok(()) => {
                    init_metrics();
                    true
                }
                Err(e) => {
                    warn!("⚠️  Failed to start metrics exporter: {}. Continuing without metrics.", e);
                    false
                }
            }
        }
        Err(e) => {
            warn!("⚠️  Invalid metrics address: {}. Continuing without metrics.", e);
            false
        }
    };

    // ─────────────────────────────────────────────────────────────────────────
    // 🚀 STARTUP
    // ─────────────────────────────────────────────────────────────────────────
    info!("🚀 Starting Waypoint");

    let pagination = pagination_config(&cli)?;
    debug!(
        default_page_size = pagination.default_page_size,
        max_page_size = pagination.max_page_size,
        "Pagination limits"
    );

    match cli.storage {
        StorageKind::Postgres => run_postgres(&cli, pagination, metrics_enabled).await,
        StorageKind::Memory => {
            if cli.migrate_only || cli.purge {
                warn!("⚠️  --migrate-only and --purge have no effect with in-memory storage");
                return Ok(());
            }
            warn!("⚠️  In-memory storage: data is lost on exit");
            let repositories = Arc::new(MemoryRepositories::new());
            run_api(repositories, &cli, pagination, metrics_enabled).await
        }
    }
}

/// Validate page size limits.
fn pagination_config(cli: &Cli) -> Result<PaginationConfig> {
    if cli.max_page_size == 0 {
        bail!("MAX_PAGE_SIZE must be at least 1");
    }
    if cli.default_page_size > cli.max_page_size {
        bail!(
            "DEFAULT_PAGE_SIZE ({}) cannot exceed MAX_PAGE_SIZE ({})",
            cli.default_page_size,
            cli.max_page_size
        );
    }
    Ok(PaginationConfig {
        default_page_size: cli.default_page_size,
        max_page_size: cli.max_page_size,
    })
}

/// Connect to PostgreSQL, apply migrations, then serve.
async fn run_postgres(cli: &Cli, pagination: PaginationConfig, metrics_enabled: bool) -> Result<()> {
    // ─────────────────────────────────────────────────────────────────────────
    // 🗄️ DATABASE
    // ─────────────────────────────────────────────────────────────────────────
    debug!(database_url = %mask_password(&cli.database_url), "Database endpoint");
    let db_config = DatabaseConfig::for_api(&cli.database_url);

    info!("🗄️  Connecting to database...");
    let db = Database::connect(&db_config)
        .await
        .context("Failed to connect to database")?;

    db.migrate().await.context("Failed to run migrations")?;
    info!("🗄️  Database ready (migrations applied)");

    if cli.migrate_only {
        info!("🛑 --migrate-only flag set, exiting");
        return Ok(());
    }

    if cli.purge {
        return handle_purge(&db, cli.yes).await;
    }

    let db = Arc::new(db);
    let repositories = Arc::new(PgRepositories::new(Arc::clone(&db)));

    let result = run_api(repositories, cli, pagination, metrics_enabled).await;
    db.close().await;
    result
}

/// Register node types, serve the API and wait for shutdown.
async fn run_api<R: Repositories + 'static>(
    repositories: Arc<R>,
    cli: &Cli,
    pagination: PaginationConfig,
    metrics_enabled: bool,
) -> Result<()> {
    // ─────────────────────────────────────────────────────────────────────────
    // 🧩 NODE TYPES
    // ─────────────────────────────────────────────────────────────────────────
    let registry = build_node_registry(Arc::clone(&repositories))
        .context("Failed to register node types")?;
    info!(types = ?registry.type_tags(), "🧩 Node registry ready");

    let schema = build_schema(repositories, Arc::new(registry), pagination);

    // ─────────────────────────────────────────────────────────────────────────
    // ⚡ SERVICES START
    // ─────────────────────────────────────────────────────────────────────────
    let (shutdown_tx, mut graphql_shutdown_rx) = watch::channel(false);

    let graphql_config = ServerConfig {
        host: "0.0.0.0".to_string(),
        port: cli.graphql_port,
        enable_playground: !cli.no_playground,
        request_timeout: Duration::from_secs(cli.request_timeout_secs),
    };

    let graphql_handle = tokio::spawn(
        async move {
            let shutdown_signal = async move {
                while !*graphql_shutdown_rx.borrow() {
                    if graphql_shutdown_rx.changed().await.is_err() {
                        break;
                    }
                }
            };

            if let Err(e) = serve_with_shutdown(schema, graphql_config, shutdown_signal).await {
                error!(error = %e, "❌ Server error");
            }
            debug!("Server stopped");
        }
        .instrument(info_span!("graphql")),
    );

    // ─────────────────────────────────────────────────────────────────────────
    // ✅ READY
    // ─────────────────────────────────────────────────────────────────────────
    info!("✅ Waypoint ready");
    info!("   ⚡ GraphQL:  http://localhost:{}/graphql", cli.graphql_port);
    if metrics_enabled {
        info!(
            "   📊 Metrics:  http://localhost:{}/metrics",
            cli.metrics_port
        );
    } else {
        info!("   📊 Metrics:  disabled");
    }
    info!("   Press Ctrl+C to stop");

    shutdown_signal().await;

    // ─────────────────────────────────────────────────────────────────────────
    // 🛑 SHUTDOWN
    // ─────────────────────────────────────────────────────────────────────────
    info!("🛑 Shutting down...");
    let _ = shutdown_tx.send(true);

    match tokio::time::timeout(Duration::from_secs(10), graphql_handle).await {
        Ok(_) => debug!("GraphQL stopped"),
        Err(_) => warn!("⚠️  GraphQL shutdown timed out"),
    }

    info!("🛑 Shutdown complete");
    Ok(())
}

/// Initialize tracing subscriber.
fn init_tracing(level: &str, json: bool) {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(level));

    if json {
        fmt().with_env_filter(filter).json().init();
    } else {
        fmt()
            .with_env_filter(filter)
            .with_target(false)
            .with_thread_ids(false)
            .with_file(false)
            .with_line_number(false)
            .init();
    }
}

/// Mask password in database URL for logging.
fn mask_password(url_str: &str) -> String {
    match url::Url::parse(url_str) {
        Ok(mut url) => {
            if url.password().is_some() {
                let _ = url.set_password(Some("****"));
            }
            url.to_string()
        }
        Err(_) => url_str.to_string(),
    }
}

/// Wait for shutdown signal (Ctrl+C or SIGTERM).
async fn shutdown_signal() {
    let ctrl_c = async {
        signal::ctrl_c()
            .await
            .expect("Failed to install Ctrl+C handler");
    };

    #[cfg(unix)]
    let terminate = async {
        signal::unix::signal(signal::unix::SignalKind::terminate())
            .expect("Failed to install SIGTERM handler")
            .recv()
            .await;
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {},
        _ = terminate => {},
    }
}

/// Handle the --purge command.
async fn handle_purge(db: &Database, skip_confirmation: bool) -> Result<()> {
    warn!("⚠️  PURGE MODE: This will delete ALL users and videos!");
    warn!("   - Global IDs issued so far will resolve to null");
    warn!("   - Schema and migrations will be preserved");

    if !skip_confirmation {
        print!("\n🔴 Are you sure you want to purge all data? [y/N] ");
        io::stdout().flush()?;

        let mut input = String::new();
        io::stdin().read_line(&mut input)?;

        if !input.trim().eq_ignore_ascii_case("y") {
            info!("❌ Purge cancelled");
            return Ok(());
        }
    }

    info!("🗑️  Purging database...");

    let stats = db.purge().await.context("Failed to purge database")?;

    info!("✅ Database purged successfully");
    info!("   👤 Users removed: {}", stats.users_removed);
    info!("   🎬 Videos removed: {}", stats.videos_removed);

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_storage() {
        assert_eq!(parse_storage("memory"), Ok(StorageKind::Memory));
        assert_eq!(parse_storage("PostgreSQL"), Ok(StorageKind::Postgres));
        assert!(parse_storage("sqlite").is_err());
    }

    #[test]
    fn test_mask_password() {
        let masked = mask_password("postgres://app:secret@db:5432/waypoint");
        assert!(!masked.contains("secret"));
        assert!(masked.contains("****"));
        assert_eq!(mask_password("not a url"), "not a url");
    }

    // Test critique: une taille par défaut supérieure au maximum est refusée
    #[test]
    fn test_pagination_config_validation() {
        let cli = Cli::parse_from(["waypoint", "--default-page-size", "50", "--max-page-size", "10"]);
        assert!(pagination_config(&cli).is_err());

        let cli = Cli::parse_from(["waypoint"]);
        let config = pagination_config(&cli).unwrap();
        assert_eq!(config.max_page_size, 100);
    }
}
