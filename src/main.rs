//! Tilapia Gateway - pond water-quality monitoring
//!
//! Consumes sensor readings, forecasts 6 hours ahead and raises Danger
//! alerts.
//!
//! # Usage
//!
//! ```bash
//! # Live: subscribe to the configured MQTT topic
//! ./tilapia-gateway
//!
//! # JSON messages from a simulator on stdin
//! python normal.py | ./tilapia-gateway --stdin
//!
//! # Replay a CSV export, 200 ms between rows
//! ./tilapia-gateway --csv data/pond.csv --speed-ms 200
//!
//! # Validate configuration and the model bundle
//! ./tilapia-gateway check-config
//! ```
//!
//! # Environment Variables
//!
//! - `TILAPIA_CONFIG`: path to the TOML config (default: ./gateway_config.toml)
//! - `MQTT_BROKER`, `MQTT_PORT`, `MQTT_TOPIC`, `DATABASE_PATH`, `MODELS_DIR`,
//!   `ALERT_INTERVAL_MIN`, `ALERT_WEBHOOK_URL`, threshold overrides
//! - `RUST_LOG`: Logging level (default: info)

use anyhow::{Context, Result};
use clap::Parser;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tokio::sync::RwLock;
use tokio::task::JoinSet;
use tokio_util::sync::CancellationToken;
use tracing::{error, info, warn};

use tilapia_gateway::alerts::build_notifier;
use tilapia_gateway::api::{self, DashboardState};
use tilapia_gateway::config::{ConfigSource, GatewayConfig};
use tilapia_gateway::ml_engine::{ForecastEngine, ModelArtifacts};
use tilapia_gateway::pipeline::{
    CsvSource, GatewayStatus, MqttSource, PipelineCoordinator, ProcessingLoop, ReadingSource,
    StdinSource,
};
use tilapia_gateway::storage::{self, InMemoryRecordStore, RecordStore, SledRecordStore};

// ============================================================================
// CLI Arguments
// ============================================================================

#[derive(Parser, Debug)]
#[command(name = "tilapia-gateway")]
#[command(about = "Tilapia pond water-quality gateway")]
#[command(version)]
struct CliArgs {
    /// Path to the TOML configuration file
    #[arg(long, env = "TILAPIA_CONFIG", global = true)]
    config: Option<PathBuf>,

    /// Read JSON messages from stdin (one per line) instead of MQTT
    #[arg(long, conflicts_with = "csv")]
    stdin: bool,

    /// Replay readings from a CSV file instead of MQTT
    #[arg(long, value_name = "PATH")]
    csv: Option<PathBuf>,

    /// Delay between CSV rows in milliseconds (0 = as fast as possible)
    #[arg(long, default_value = "0")]
    speed_ms: u64,

    /// Keep records in memory only
    #[arg(long)]
    no_persist: bool,

    /// Override the read API bind address
    #[arg(short, long)]
    addr: Option<String>,

    /// Emit JSON log lines
    #[arg(long, global = true)]
    log_json: bool,

    #[command(subcommand)]
    command: Option<SubCommand>,
}

#[derive(clap::Subcommand, Debug)]
enum SubCommand {
    /// Print the effective configuration and validate the model bundle
    CheckConfig,
    /// Export persisted records as CSV, newest first
    ExportCsv {
        /// Output file (stdout when omitted)
        #[arg(long, short)]
        output: Option<PathBuf>,
        /// Maximum number of records
        #[arg(long)]
        limit: Option<usize>,
    },
    /// Print risk statistics and store info as JSON
    Stats,
}

// ============================================================================
// Logging
// ============================================================================

fn env_filter() -> tracing_subscriber::EnvFilter {
    tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info"))
}

fn init_tracing(json: bool) {
    let builder = tracing_subscriber::fmt()
        .with_env_filter(env_filter())
        .with_target(false);
    if json {
        builder.json().init();
    } else {
        builder.init();
    }
}

/// Load configuration under a temporary subscriber so its warnings are
/// visible before the final log format is known.
fn load_config(explicit: Option<&Path>) -> Result<(GatewayConfig, ConfigSource)> {
    let bootstrap = tracing_subscriber::fmt()
        .with_env_filter(env_filter())
        .with_target(false)
        .finish();
    tracing::subscriber::with_default(bootstrap, || match explicit {
        Some(path) => GatewayConfig::load_path(path),
        None => GatewayConfig::load(),
    })
    .context("Failed to load gateway configuration")
}

// ============================================================================
// Task Names for Supervisor Logging
// ============================================================================

#[derive(Debug, Clone, Copy)]
enum TaskName {
    HttpServer,
    ReadingProcessor,
}

impl std::fmt::Display for TaskName {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            TaskName::HttpServer => write!(f, "HttpServer"),
            TaskName::ReadingProcessor => write!(f, "ReadingProcessor"),
        }
    }
}

// ============================================================================
// Startup
// ============================================================================

fn load_engine(config: &GatewayConfig) -> Result<ForecastEngine> {
    info!("🧠 Loading model bundle from {}...", config.models.dir.display());
    let artifacts = ModelArtifacts::load(&config.models.dir, &config.features)
        .with_context(|| format!("Failed to load model bundle from {}", config.models.dir.display()))?;
    info!(
        "✓ Model bundle loaded ({} features, {}h horizon)",
        artifacts.reconstructor.schema().len(),
        artifacts.manifest.horizon_hours
    );
    Ok(ForecastEngine::new(artifacts, config.pipeline.forecast_decimals))
}

fn open_store(config: &GatewayConfig) -> Result<SledRecordStore> {
    SledRecordStore::open(&config.storage.path)
        .with_context(|| format!("Failed to open record store at {}", config.storage.path.display()))
}

fn open_pipeline_store(config: &GatewayConfig, no_persist: bool) -> Result<Arc<dyn RecordStore>> {
    if no_persist {
        info!(
            "💾 Persistence disabled (--no-persist), keeping the latest {} records in memory",
            config.storage.memory_max_records
        );
        return Ok(Arc::new(InMemoryRecordStore::bounded(config.storage.memory_max_records)));
    }

    info!("💾 Opening record store...");
    let store = open_store(config)?;
    if config.storage.retention_days > 0 {
        let cutoff = chrono::Local::now().naive_local()
            - chrono::Duration::days(i64::from(config.storage.retention_days));
        match store.delete_older_than(cutoff) {
            Ok(0) => {}
            Ok(n) => info!("Pruned {} records older than {} days", n, config.storage.retention_days),
            Err(e) => warn!("Failed to prune old records: {}", e),
        }
    }
    info!("✓ Record store ready ({})", config.storage.path.display());
    Ok(Arc::new(store))
}

// ============================================================================
// Supervisor
// ============================================================================

async fn run_supervisor(
    task_set: &mut JoinSet<Result<TaskName>>,
    cancel_token: CancellationToken,
) -> Result<()> {
    info!("🔒 Supervisor: All tasks spawned, monitoring...");

    while let Some(result) = task_set.join_next().await {
        match result {
            Ok(Ok(TaskName::ReadingProcessor)) => {
                info!("🔒 Supervisor: Reading processor finished, shutting down");
                cancel_token.cancel();
            }
            Ok(Ok(task_name)) => {
                info!("🔒 Supervisor: Task {} completed normally", task_name);
            }
            Ok(Err(e)) => {
                error!("🔒 Supervisor: Task failed with error: {:#}", e);
                cancel_token.cancel();
                return Err(e);
            }
            Err(e) => {
                error!("🔒 Supervisor: Task panicked: {}", e);
                cancel_token.cancel();
                return Err(anyhow::anyhow!("Task panicked: {}", e));
            }
        }
    }

    info!("🔒 Supervisor: All tasks completed");
    Ok(())
}

// ============================================================================
// Unified Pipeline Runner
// ============================================================================

/// Run the gateway with any reading source.
async fn run_pipeline<S: ReadingSource>(
    mut source: S,
    config: GatewayConfig,
    args: &CliArgs,
    cancel_token: CancellationToken,
) -> Result<()> {
    info!("🚀 Starting ingestion pipeline");
    info!("");
    info!("   Step 1: Sensor risk classification");
    info!("   Step 2: Rolling history ({} readings)", config.features.retention);
    info!("   Step 3: Feature reconstruction + 6h forecast");
    info!("   Step 4: Risk merge (max of sensor / forecast)");
    info!("   Step 5: Alert throttling ({} min)", config.alerts.interval_min);
    info!("   Step 6: Persistence");
    info!("");

    let engine = load_engine(&config)?;
    let store = open_pipeline_store(&config, args.no_persist)?;
    let notifier = build_notifier(&config.notifier).context("Failed to build alert notifier")?;
    info!("✓ Alert notifier: {}", notifier.name());

    let status = Arc::new(RwLock::new(GatewayStatus::new(
        config.deployment.name.clone(),
        engine.min_history(),
    )));
    let coordinator = PipelineCoordinator::new(&config, engine);

    info!("🔒 Supervisor: Initializing task monitoring");
    let mut task_set: JoinSet<Result<TaskName>> = JoinSet::new();

    // Task 1: HTTP Server
    if config.server.enabled {
        let addr = args.addr.clone().unwrap_or_else(|| config.server.addr.clone());
        let listener = tokio::net::TcpListener::bind(&addr)
            .await
            .with_context(|| format!("Failed to bind to {}", addr))?;
        let dashboard = DashboardState::new(Arc::clone(&status), Arc::clone(&store));
        let server_cancel = cancel_token.clone();
        task_set.spawn(async move {
            info!("[HttpServer] Task starting");
            api::serve(listener, dashboard, server_cancel)
                .await
                .context("HTTP server error")?;
            info!("[HttpServer] Graceful shutdown complete");
            Ok(TaskName::HttpServer)
        });
    } else {
        info!("🌐 Read API disabled");
    }

    // Task 2: Reading Processor
    let processing_loop = ProcessingLoop::new(
        coordinator,
        status,
        store,
        notifier,
        config.notifier.clone(),
        cancel_token.clone(),
    );
    task_set.spawn(async move {
        info!("[ReadingProcessor] Task starting");
        let _stats = processing_loop.run(&mut source).await;
        Ok(TaskName::ReadingProcessor)
    });

    run_supervisor(&mut task_set, cancel_token).await
}

// ============================================================================
// Subcommands
// ============================================================================

fn run_check_config(config: &GatewayConfig, source: &ConfigSource) -> Result<()> {
    println!("Configuration source: {source}");
    for (key, value) in config.summary() {
        println!("  {key:<20} {value}");
    }
    println!(
        "  {:<20} {} (lags {:?}, windows {:?})",
        "min_history",
        config.features.min_history(),
        config.features.lags,
        config.features.rolling_windows
    );

    let engine = load_engine(config)?;
    println!(
        "Model bundle OK: {} ({}h horizon, forecasts after {} readings)",
        config.models.dir.display(),
        engine.horizon_hours(),
        engine.min_history()
    );
    Ok(())
}

fn run_export_csv(config: &GatewayConfig, output: Option<&Path>, limit: Option<usize>) -> Result<()> {
    let store = open_store(config)?;
    let written = match output {
        Some(path) => {
            let file = std::fs::File::create(path)
                .with_context(|| format!("Failed to create {}", path.display()))?;
            storage::export_csv(&store, file, limit)?
        }
        None => storage::export_csv(&store, std::io::stdout().lock(), limit)?,
    };
    info!("Exported {} records", written);
    Ok(())
}

fn run_stats(config: &GatewayConfig) -> Result<()> {
    let store = open_store(config)?;
    let report = serde_json::json!({
        "statistics": store.risk_statistics()?,
        "store": store.info()?,
    });
    println!("{}", serde_json::to_string_pretty(&report)?);
    Ok(())
}

// ============================================================================
// Main
// ============================================================================

#[tokio::main]
async fn main() -> Result<()> {
    dotenvy::dotenv().ok();
    let args = CliArgs::parse();

    let (config, config_source) = load_config(args.config.as_deref())?;
    init_tracing(args.log_json || config.logging.json);

    match &args.command {
        Some(SubCommand::CheckConfig) => return run_check_config(&config, &config_source),
        Some(SubCommand::ExportCsv { output, limit }) => {
            return run_export_csv(&config, output.as_deref(), *limit)
        }
        Some(SubCommand::Stats) => return run_stats(&config),
        None => {}
    }

    info!("━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━");
    info!("  Tilapia Gateway");
    info!("  Water-quality risk + 6h forecast");
    info!("━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━");
    info!("Config: {}", config_source);
    for (key, value) in config.summary() {
        info!("   {:<20} {}", key, value);
    }
    info!("");

    // Graceful shutdown via Ctrl+C
    let cancel_token = CancellationToken::new();
    let shutdown_token = cancel_token.clone();
    tokio::spawn(async move {
        tokio::signal::ctrl_c().await.ok();
        info!("🛑 Received Ctrl+C, initiating shutdown...");
        shutdown_token.cancel();
    });

    if args.stdin {
        info!("📥 Input: stdin (JSON messages)");
        run_pipeline(StdinSource::new(), config, &args, cancel_token).await?;
    } else if let Some(path) = &args.csv {
        info!("📥 Input: CSV replay {} ({}ms delay)", path.display(), args.speed_ms);
        let source = CsvSource::from_path(path, args.speed_ms)?;
        run_pipeline(source, config, &args, cancel_token).await?;
    } else {
        info!(
            "📥 Input: MQTT {}:{} topic {}",
            config.mqtt.broker, config.mqtt.port, config.mqtt.topic
        );
        let source = MqttSource::new(config.mqtt.clone());
        run_pipeline(source, config, &args, cancel_token).await?;
    }

    info!("");
    info!("✓ Tilapia Gateway shutdown complete");
    Ok(())
}
