mod logging;

use std::path::{Path, PathBuf};
use std::sync::Arc;

use anyhow::{Context, Result, bail};
use clap::{Parser, Subcommand};
use serde_json::{Value, json};
use tokio_util::sync::CancellationToken;
use tracing::info;
use url::Url;

use augur_config::NodeConfig;
use augur_engine::JobEngine;
use augur_job::JobSpecV2;
use augur_pipeline::{Pipeline, Runner};
use augur_store::{Bridge, SqliteStore, Store};
use augur_task::{HttpClient, HttpSettings, TaskContext, TaskResult};

/// Augur - oracle node job execution
#[derive(Parser)]
#[command(name = "augur")]
#[command(version, about, long_about = None)]
struct Cli {
  /// Path to the node configuration file (TOML)
  #[arg(long, global = true)]
  config: Option<PathBuf>,

  /// Log filter, overrides AUGUR_LOG and the configured log_level
  #[arg(long, global = true)]
  log_level: Option<String>,

  #[command(subcommand)]
  command: Option<Commands>,
}

#[derive(Subcommand)]
enum Commands {
  /// Serve the job spec HTTP surface
  Serve,

  /// Run a pipeline or an observation source once and print the result
  Run {
    #[command(subcommand)]
    target: RunTarget,
  },

  /// Manage registered bridges
  Bridges {
    #[command(subcommand)]
    action: BridgeAction,
  },
}

#[derive(Subcommand)]
enum RunTarget {
  /// Run a JSON array of task documents
  Pipeline {
    /// Path to the task file (JSON)
    file: PathBuf,
  },

  /// Fetch the observation source of a V2 job spec
  Observation {
    /// Path to the job spec (TOML)
    file: PathBuf,
  },
}

#[derive(Subcommand)]
enum BridgeAction {
  /// Register or replace a bridge
  Add { name: String, url: Url },
}

fn main() -> Result<()> {
  let cli = Cli::parse();
  let config = load_config(cli.config.as_deref())?;
  logging::init(cli.log_level.as_deref(), &config.log_level)?;

  let rt = tokio::runtime::Runtime::new()?;
  match cli.command {
    Some(Commands::Serve) => rt.block_on(serve(config)),
    Some(Commands::Run { target }) => rt.block_on(run(config, target)),
    Some(Commands::Bridges {
      action: BridgeAction::Add { name, url },
    }) => rt.block_on(add_bridge(config, name, url)),
    None => {
      println!("augur - use --help to see available commands");
      Ok(())
    }
  }
}

fn load_config(path: Option<&Path>) -> Result<NodeConfig> {
  let mut config = match path {
    Some(path) => NodeConfig::load_from_path(path)
      .with_context(|| format!("failed to load config: {}", path.display()))?,
    None => NodeConfig::default(),
  };
  config
    .apply_env_overrides()
    .context("invalid environment override")?;
  config.validate().context("invalid configuration")?;
  Ok(config)
}

async fn open_store(config: &NodeConfig) -> Result<Arc<SqliteStore>> {
  let store = SqliteStore::connect(&config.database_url)
    .await
    .with_context(|| format!("failed to open database: {}", config.database_url))?;
  Ok(Arc::new(store))
}

async fn serve(config: NodeConfig) -> Result<()> {
  let store = open_store(&config).await?;
  let http = HttpClient::new(HttpSettings::from(&config)).context("failed to build http client")?;
  let listener = tokio::net::TcpListener::bind(&config.listen_addr)
    .await
    .with_context(|| format!("failed to bind {}", config.listen_addr))?;

  let engine = Arc::new(JobEngine::new(store, Arc::new(config), http));
  let cancel = CancellationToken::new();
  let shutdown = cancel.clone();
  tokio::spawn(async move {
    if tokio::signal::ctrl_c().await.is_ok() {
      info!("shutting down");
      shutdown.cancel();
    }
  });

  augur_web::serve(listener, augur_web::router(engine), cancel)
    .await
    .context("server error")
}

async fn run(config: NodeConfig, target: RunTarget) -> Result<()> {
  let store = open_store(&config).await?;
  let http = HttpClient::new(HttpSettings::from(&config)).context("failed to build http client")?;
  let ctx = TaskContext::new(store, http);

  let output = match target {
    RunTarget::Pipeline { file } => {
      let bytes = tokio::fs::read(&file)
        .await
        .with_context(|| format!("failed to read task file: {}", file.display()))?;
      let pipeline = Pipeline::decode(&bytes)
        .with_context(|| format!("failed to decode task file: {}", file.display()))?;
      eprintln!("Loaded pipeline with {} tasks", pipeline.len());

      let run = Runner::new(ctx).run(&pipeline).await.context("pipeline run failed")?;
      json!({ "runId": run.run_id, "output": render(&run.output) })
    }
    RunTarget::Observation { file } => {
      let document = tokio::fs::read_to_string(&file)
        .await
        .with_context(|| format!("failed to read job spec: {}", file.display()))?;
      let spec = JobSpecV2::from_toml(&document)
        .with_context(|| format!("failed to decode job spec: {}", file.display()))?;
      let Some(root) = spec.observation_source.first() else {
        bail!("job spec has no observation source");
      };
      eprintln!("Fetching {}", root.describe());

      json!({ "output": render(&root.fetch(&ctx).await) })
    }
  };

  println!("{}", serde_json::to_string_pretty(&output)?);
  Ok(())
}

fn render(result: &TaskResult) -> Value {
  match result {
    TaskResult::Value(value) => json!({ "value": value.to_json() }),
    TaskResult::Error(failure) => json!({
      "error": failure.to_string(),
      "origin": failure.origin().to_string(),
    }),
  }
}

async fn add_bridge(config: NodeConfig, name: String, url: Url) -> Result<()> {
  let store = open_store(&config).await?;
  let bridge = Bridge::new(&name, url, chrono::Utc::now());
  store
    .create_bridge(&bridge)
    .await
    .with_context(|| format!("failed to register bridge '{}'", name))?;
  eprintln!("Registered bridge {} -> {}", bridge.name, bridge.url);
  Ok(())
}
