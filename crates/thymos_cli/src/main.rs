use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use anyhow::{Context, Result};
use chrono::Utc;
use clap::{Parser, Subcommand};
use tracing::{error, info, warn};
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;
use tracing_subscriber::EnvFilter;

use thymos_core::ThymosConfig;
use thymos_engine::{Engine, ProcessOutcome, ProcessingPath};
use thymos_gateway::GatewayServer;
use thymos_reasoning::build_client;
use thymos_store::SqliteStore;

#[derive(Parser, Debug)]
#[command(name = "thymos", author, version, about = "Behavioral and emotional state engine", long_about = None)]
struct Args {
    /// Path to the TOML config file
    #[arg(short, long, default_value = "thymos.toml")]
    config: PathBuf,

    /// Database path; overrides the config and is used verbatim
    #[arg(long)]
    db: Option<String>,

    /// Emit logs as JSON
    #[arg(long)]
    log_json: bool,

    /// Also write logs to a daily-rolled file in this directory
    #[arg(long)]
    log_dir: Option<PathBuf>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Run the HTTP gateway plus the decay and proactive scan loops
    Serve,
    /// Run one bond decay pass and print the summary
    DecayScan,
    /// Run one proactive evaluation pass over all active pairs
    ProactiveScan,
    /// Interactive message loop against one agent
    Repl {
        /// Agent to converse with
        #[arg(long, default_value = "agent-main")]
        agent: String,

        /// User id attached to typed messages
        #[arg(long, default_value = "local-user")]
        user: String,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    dotenv::dotenv().ok();
    let args = Args::parse();

    let _log_guard = init_tracing(&args);

    let mut config = ThymosConfig::load_or_default(&args.config);
    if let Some(db) = args.db.clone() {
        config.store.db_path = db;
    }

    let db_path = match args.db {
        Some(ref db) => PathBuf::from(db),
        None => resolve_db_path(&config.store.db_path)?,
    };
    info!("Opening store at {}", db_path.display());
    let store = Arc::new(SqliteStore::new(&db_path).await?);

    match args.command {
        Command::Serve => serve(store, config).await,
        Command::DecayScan => decay_scan(store, &config).await,
        Command::ProactiveScan => proactive_scan(store).await,
        Command::Repl { agent, user } => repl(store, config, &agent, &user).await,
    }
}

/// RUST_LOG-driven filter (default `info`), console output as text or JSON,
/// optional daily-rolled file copy. The returned guard must stay alive for
/// the file writer to flush.
fn init_tracing(args: &Args) -> Option<tracing_appender::non_blocking::WorkerGuard> {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));

    let (file_layer, guard) = match &args.log_dir {
        Some(dir) => {
            let appender = tracing_appender::rolling::daily(dir, "thymos.log");
            let (writer, guard) = tracing_appender::non_blocking(appender);
            let layer = tracing_subscriber::fmt::layer()
                .with_writer(writer)
                .with_ansi(false);
            (Some(layer), Some(guard))
        }
        None => (None, None),
    };

    let registry = tracing_subscriber::registry().with(filter).with(file_layer);
    if args.log_json {
        registry
            .with(tracing_subscriber::fmt::layer().json())
            .init();
    } else {
        registry.with(tracing_subscriber::fmt::layer()).init();
    }

    guard
}

/// Bare filenames land in the platform data directory; anything carrying a
/// path component is used as-is.
fn resolve_db_path(configured: &str) -> Result<PathBuf> {
    let path = PathBuf::from(configured);
    if path.is_absolute() || path.components().count() > 1 {
        return Ok(path);
    }

    let base = dirs::data_dir().unwrap_or_else(|| PathBuf::from("."));
    let dir = base.join("thymos");
    std::fs::create_dir_all(&dir)
        .with_context(|| format!("Failed to create data directory {}", dir.display()))?;
    Ok(dir.join(path))
}

// ============================================================================
// Subcommands
// ============================================================================

/// Gateway plus the two scheduler loops. Scan failures are logged and the
/// next tick tries again.
async fn serve(store: Arc<SqliteStore>, config: ThymosConfig) -> Result<()> {
    let llm = build_client(&config.llm)?;
    let engine = Arc::new(Engine::new(store.clone(), llm, &config));

    let server = GatewayServer::new(store.clone(), engine, &config).start();

    let decay_store = store.clone();
    let decay_settings = config.bonds;
    tokio::spawn(async move {
        // Thresholds are day-granularity; one pass per day.
        let mut tick = tokio::time::interval(Duration::from_secs(86_400));
        loop {
            tick.tick().await;
            if let Err(error) =
                thymos_bonds::scan_all(&decay_store, &decay_settings, Utc::now()).await
            {
                warn!(%error, "decay scan failed");
            }
        }
    });

    let proactive_store = store.clone();
    let scan_secs = config.proactive.scan_interval_secs.max(1);
    tokio::spawn(async move {
        let mut tick = tokio::time::interval(Duration::from_secs(scan_secs));
        loop {
            tick.tick().await;
            let now = Utc::now();
            if let Err(error) =
                thymos_bonds::queue::expire_stale_offers(&proactive_store, now).await
            {
                warn!(%error, "queue offer expiry failed");
            }
            if let Err(error) = thymos_proactive::scan_all(&proactive_store, now).await {
                warn!(%error, "proactive scan failed");
            }
        }
    });

    server.await.context("gateway task failed")?;
    Ok(())
}

async fn decay_scan(store: Arc<SqliteStore>, config: &ThymosConfig) -> Result<()> {
    let summary = thymos_bonds::scan_all(&store, &config.bonds, Utc::now()).await?;
    println!(
        "decay scan: {} bonds processed, {} warned, {} dormant, {} fragile, {} released",
        summary.processed, summary.warned, summary.dormant, summary.fragile, summary.released
    );
    Ok(())
}

async fn proactive_scan(store: Arc<SqliteStore>) -> Result<()> {
    let now = Utc::now();

    let expired = thymos_bonds::queue::expire_stale_offers(&store, now).await?;
    if expired > 0 {
        println!("expired {} stale queue offers", expired);
    }

    let summary = thymos_proactive::scan_all(&store, now).await?;
    println!(
        "proactive scan: {} pairs evaluated, {} messages queued",
        summary.pairs, summary.fired
    );
    Ok(())
}

/// Local message loop for poking at one agent. Prints the routing metadata
/// the gateway would return.
async fn repl(
    store: Arc<SqliteStore>,
    config: ThymosConfig,
    agent_id: &str,
    user_id: &str,
) -> Result<()> {
    let llm = build_client(&config.llm)?;
    let engine = Engine::new(store, llm, &config);

    println!(
        "Thymos online. Agent {}, user {}. Type 'quit' to exit.",
        agent_id, user_id
    );

    let mut rl = rustyline::DefaultEditor::new()?;
    loop {
        let line = match rl.readline("> ") {
            Ok(line) => line,
            Err(rustyline::error::ReadlineError::Interrupted)
            | Err(rustyline::error::ReadlineError::Eof) => break,
            Err(e) => return Err(e.into()),
        };

        let trimmed = line.trim();
        if trimmed.is_empty() {
            continue;
        }
        if trimmed == "quit" || trimmed == "exit" {
            break;
        }
        rl.add_history_entry(trimmed)?;

        match engine.process_message(agent_id, user_id, trimmed).await {
            Ok(outcome) => print_outcome(&outcome),
            Err(e) => {
                error!("Failed to process message: {}", e);
                println!("[error] {}", e);
            }
        }
    }

    Ok(())
}

fn print_outcome(outcome: &ProcessOutcome) {
    let path = match outcome.path {
        ProcessingPath::Deep => "deep",
        ProcessingPath::Fast => "fast",
    };
    println!(
        "[{}{}] complexity {:.2}, {}ms, est ${:.4}",
        path,
        if outcome.degraded { ", degraded" } else { "" },
        outcome.complexity_score,
        outcome.processing_time_ms,
        outcome.cost_estimate,
    );
    println!(
        "  feeling {} at {:.2}, stability {:.2}, mood v{:+.2} a{:.2} d{:.2}",
        outcome.primary_emotion.as_str(),
        outcome.primary_intensity,
        outcome.stability,
        outcome.mood.valence,
        outcome.mood.arousal,
        outcome.mood.dominance,
    );
    if let Some(dyad) = &outcome.dominant_dyad {
        println!("  dominant dyad {} at {:.2}", dyad.dyad.as_str(), dyad.level);
    }
    for trigger in &outcome.triggers {
        println!(
            "  trigger {} (weight {:+.2}, confidence {:.2})",
            trigger.trigger_type.as_str(),
            trigger.weight,
            trigger.confidence,
        );
    }
    for change in &outcome.phase_changes {
        let flags = change
            .safety_flags
            .iter()
            .map(|f| f.as_str())
            .collect::<Vec<_>>()
            .join(", ");
        println!(
            "  phase change: {} {} -> {}{}",
            change.behavior_type.as_str(),
            change.from_phase,
            change.to_phase,
            if flags.is_empty() {
                String::new()
            } else {
                format!(" [{}]", flags)
            },
        );
    }
    for behavior in &outcome.display_behaviors {
        println!(
            "  displaying {} (phase {}, intensity {:.2})",
            behavior.behavior_type.as_str(),
            behavior.current_phase,
            behavior.intensity,
        );
    }
}
