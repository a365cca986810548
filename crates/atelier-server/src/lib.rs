//! Host wiring for the `atelier` binary: configuration and engine assembly.

use std::{
  path::{Path, PathBuf},
  sync::Arc,
};

use anyhow::Context as _;
use atelier_core::{
  assign::CapacityMode,
  dataset::{Dataset, DatasetPaths},
  engine::Engine,
  events::TracingSink,
};
use atelier_store_sqlite::SqliteStore;
use serde::Deserialize;

// ─── Configuration ────────────────────────────────────────────────────────────

/// Runtime configuration, deserialised from `atelier.toml` and `ATELIER_*`
/// environment variables.
#[derive(Debug, Deserialize, Clone, PartialEq)]
pub struct ServerConfig {
  #[serde(default = "default_host")]
  pub host:          String,
  #[serde(default = "default_port")]
  pub port:          u16,
  /// Directory holding the four dataset files.
  #[serde(default = "default_data_dir")]
  pub data_dir:      PathBuf,
  #[serde(default = "default_store_path")]
  pub store_path:    PathBuf,
  #[serde(default)]
  pub capacity_mode: CapacityMode,
}

fn default_host() -> String { "127.0.0.1".to_owned() }

fn default_port() -> u16 { 5280 }

fn default_data_dir() -> PathBuf { PathBuf::from("data") }

fn default_store_path() -> PathBuf { PathBuf::from("atelier.db") }

impl ServerConfig {
  /// Read `path` if it exists, then overlay the environment.
  pub fn load(path: &Path) -> anyhow::Result<Self> {
    let settings = config::Config::builder()
      .add_source(config::File::from(path).required(false))
      .add_source(config::Environment::with_prefix("ATELIER"))
      .build()
      .context("failed to read config file")?;

    settings
      .try_deserialize()
      .context("failed to deserialise ServerConfig")
  }

  pub fn address(&self) -> String { format!("{}:{}", self.host, self.port) }
}

/// Expand a leading `~` to the user's home directory.
pub fn expand_tilde(path: &Path) -> PathBuf {
  let s = path.to_string_lossy();
  if let Some(rest) = s.strip_prefix("~/")
    && let Ok(home) = std::env::var("HOME")
  {
    return PathBuf::from(home).join(rest);
  }
  path.to_path_buf()
}

// ─── Engine ───────────────────────────────────────────────────────────────────

/// Load the dataset, open the decision store and build the engine.
pub async fn open_engine(cfg: &ServerConfig) -> anyhow::Result<Engine<SqliteStore>> {
  let data_dir = expand_tilde(&cfg.data_dir);
  let dataset = Dataset::load(&DatasetPaths::in_dir(&data_dir))
    .with_context(|| format!("failed to load dataset from {data_dir:?}"))?;
  tracing::info!(
    requests = dataset.requests_all().count(),
    artists = dataset.artists_all().len(),
    presets = dataset.presets_all().len(),
    rules = dataset.rules_all().len(),
    "dataset loaded"
  );

  let store_path = expand_tilde(&cfg.store_path);
  if let Some(parent) = store_path.parent().filter(|p| !p.as_os_str().is_empty()) {
    std::fs::create_dir_all(parent)
      .with_context(|| format!("failed to create {parent:?}"))?;
  }
  let store = SqliteStore::open(&store_path)
    .await
    .with_context(|| format!("failed to open store at {store_path:?}"))?;

  Ok(
    Engine::new(Arc::new(dataset), store)
      .with_capacity_mode(cfg.capacity_mode)
      .with_events(Arc::new(TracingSink)),
  )
}
