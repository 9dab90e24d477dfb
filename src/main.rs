//! NeuroGraph - Incremental knowledge graph synchronization engine
//!
//! Serves the HTTP API, ingests one-off text from the command line, or runs
//! a live voice session fed from raw PCM on stdin.

use anyhow::Result;
use clap::{Parser, Subcommand};
use neurograph::{
    config::NeuroGraphConfig,
    engine::SyncEngine,
    extraction::{ExtractionGateway, GeminiClient, UnavailableService},
    live::{spawn_forwarder, LiveBridge, PcmReader},
};
use std::path::PathBuf;
use std::sync::Arc;
use tokio::sync::mpsc;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[derive(Parser)]
#[command(name = "neurograph")]
#[command(author = "NeuroGraph Team")]
#[command(version)]
#[command(about = "Incremental knowledge graph synchronization engine")]
struct Cli {
    /// Configuration file path
    #[arg(short, long, env = "NEUROGRAPH_CONFIG")]
    config: Option<PathBuf>,

    /// Enable verbose logging
    #[arg(short, long)]
    verbose: bool,

    /// Emit logs as JSON
    #[arg(long)]
    log_json: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Start the HTTP API
    Serve {
        /// Host to bind to (overrides config)
        #[arg(long)]
        host: Option<String>,

        /// Port to listen on (overrides config)
        #[arg(long)]
        port: Option<u16>,
    },

    /// Ingest one piece of text and print the resulting graph and state
    Ingest {
        /// Text to ingest
        text: String,
    },

    /// Stream raw PCM from stdin through the live voice bridge
    Live,

    /// Show configuration
    Config {
        /// Show default configuration
        #[arg(long)]
        default: bool,
    },
}

// One scheduler thread: suspension points are the only interleavings.
#[tokio::main(flavor = "current_thread")]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    let log_level = if cli.verbose { "debug" } else { "info" };
    let filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| format!("neurograph={},tower_http=debug", log_level).into());
    let registry = tracing_subscriber::registry().with(filter);
    if cli.log_json {
        registry
            .with(tracing_subscriber::fmt::layer().json().with_writer(std::io::stderr))
            .init();
    } else {
        registry
            .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
            .init();
    }

    let config = NeuroGraphConfig::load_or_default(cli.config.as_deref())?;

    match cli.command {
        Commands::Serve { host, port } => run_serve(config, host, port).await?,
        Commands::Ingest { text } => run_ingest(config, text).await?,
        Commands::Live => run_live(config).await?,
        Commands::Config { default } => {
            show_config(if default { None } else { Some(&config) })?;
        }
    }

    Ok(())
}

/// Build the engine, falling back to an offline gateway without an API key.
fn build_engine(config: &NeuroGraphConfig) -> Result<SyncEngine> {
    let gateway = match config.models.resolve_api_key() {
        Some(key) => ExtractionGateway::new(Arc::new(GeminiClient::from_config(&config.models, key)?)),
        None => {
            tracing::warn!(
                env = %config.models.api_key_env,
                "No API key found, every extraction will degrade"
            );
            ExtractionGateway::new(Arc::new(UnavailableService::new("no API key configured")))
        }
    };
    Ok(SyncEngine::builder(gateway).config(&config.pipeline).build())
}

async fn run_serve(mut config: NeuroGraphConfig, host: Option<String>, port: Option<u16>) -> Result<()> {
    if let Some(host) = host {
        config.server.host = host;
    }
    if let Some(port) = port {
        config.server.port = port;
    }

    let engine = build_engine(&config)?;
    tracing::info!("Starting NeuroGraph. Press Ctrl+C to stop.");
    neurograph::server::serve(engine, &config.server, async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            tracing::error!(error = %e, "Failed to listen for Ctrl+C");
        }
        tracing::info!("Shutting down...");
    })
    .await?;
    Ok(())
}

async fn run_ingest(config: NeuroGraphConfig, text: String) -> Result<()> {
    let engine = build_engine(&config)?;
    let mut events = engine.subscribe_events();

    let artifact = engine.process_text(text).await?;
    engine.wait_until_idle().await;

    while let Ok(event) = events.try_recv() {
        tracing::debug!(?event, "Engine event");
        if let neurograph::engine::EngineEvent::DeepResponse { text, .. } = event {
            println!("{}", text);
        }
    }

    let output = serde_json::json!({
        "source": artifact,
        "graph": engine.graph().as_ref(),
        "state": engine.state(),
    });
    println!("{}", serde_json::to_string_pretty(&output)?);
    Ok(())
}

async fn run_live(config: NeuroGraphConfig) -> Result<()> {
    let api_key = config.models.resolve_api_key();
    if api_key.is_none() {
        anyhow::bail!("live mode needs an API key in ${}", config.models.api_key_env);
    }

    let engine = build_engine(&config)?;
    let bridge = LiveBridge::new(config.live.clone(), config.models.live_model.clone(), api_key);
    let (tx, rx) = mpsc::channel(config.pipeline.event_capacity.max(1));
    let forwarder = spawn_forwarder(engine.clone(), rx);

    let input = PcmReader::new(tokio::io::stdin(), config.live.input_format, "stdin");
    bridge.connect(Box::new(input), tx).await?;
    tracing::info!("Live session open. Press Ctrl+C to stop.");

    tokio::signal::ctrl_c().await?;
    bridge.disconnect().await;
    // Dropping the bridge releases the last event sender.
    drop(bridge);

    let forwarded = forwarder.await?;
    engine.wait_until_idle().await;
    tracing::info!(forwarded, nodes = engine.graph().node_count(), "Live session finished");
    Ok(())
}

fn show_config(config: Option<&NeuroGraphConfig>) -> Result<()> {
    let config = config.cloned().unwrap_or_default();
    let toml = toml::to_string_pretty(&config)?;
    println!("{}", toml);
    Ok(())
}
