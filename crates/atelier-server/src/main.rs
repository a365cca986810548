//! `atelier` binary.
//!
//! Reads `atelier.toml` (or the path given with `--config`), loads the
//! dataset, opens the SQLite decision log and then either serves the JSON API
//! or runs requests straight from the command line.
//!
//! ```text
//! atelier serve
//! atelier run req-001 req-002
//! atelier decisions --request-id req-001
//! ```

use std::{path::PathBuf, sync::Arc};

use anyhow::Context as _;
use atelier_core::store::DecisionQuery;
use atelier_server::{ServerConfig, open_engine};
use clap::{Parser, Subcommand};
use tokio::net::TcpListener;
use tracing::level_filters::LevelFilter;
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(author, version, about = "Atelier decision engine")]
struct Cli {
  /// Path to the TOML configuration file.
  #[arg(short, long, default_value = "atelier.toml")]
  config: PathBuf,

  #[command(subcommand)]
  command: Command,
}

#[derive(Subcommand)]
enum Command {
  /// Serve the JSON API.
  Serve,

  /// Run the full pipeline for the given requests (all of them if none are
  /// given) and print each outcome as JSON.
  Run {
    request_ids: Vec<String>,
  },

  /// Print recorded decisions as JSON.
  Decisions {
    #[arg(long)]
    request_id: Option<String>,
    #[arg(long)]
    limit:      Option<usize>,
  },
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
  // Logs go to stderr so stdout stays machine-readable.
  tracing_subscriber::fmt()
    .with_writer(std::io::stderr)
    .with_env_filter(
      EnvFilter::builder()
        .with_default_directive(LevelFilter::INFO.into())
        .from_env_lossy(),
    )
    .init();

  let cli = Cli::parse();
  let cfg = ServerConfig::load(&cli.config)?;
  let engine = open_engine(&cfg).await?;

  match cli.command {
    Command::Serve => {
      let app = atelier_api::api_router(Arc::new(engine));
      let address = cfg.address();

      tracing::info!(capacity_mode = %cfg.capacity_mode, "Listening on http://{address}");
      let listener = TcpListener::bind(&address)
        .await
        .with_context(|| format!("failed to bind {address}"))?;

      axum::serve(listener, app).await.context("server error")?;
    }

    Command::Run { request_ids } => {
      let ids = if request_ids.is_empty() {
        engine.dataset().requests_all().map(|r| r.id.clone()).collect()
      } else {
        request_ids
      };

      let mut outcomes = Vec::with_capacity(ids.len());
      for id in &ids {
        outcomes.push(engine.process(id).await.with_context(|| format!("processing {id}"))?);
      }
      println!("{}", serde_json::to_string_pretty(&outcomes)?);
    }

    Command::Decisions { request_id, limit } => {
      let decisions = engine.decisions(&DecisionQuery { request_id, limit }).await?;
      println!("{}", serde_json::to_string_pretty(&decisions)?);
    }
  }

  Ok(())
}
