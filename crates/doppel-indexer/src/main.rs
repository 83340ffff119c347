//! `doppel` — dedup index maintenance.
//!
//! Reads `doppel.toml` (or the path given with `--config`), opens the SQLite
//! store and runs one command:
//!
//! ```text
//! doppel update [--force] [--type 2]
//! doppel clean [--force] [--type 2]
//! doppel optimize
//! doppel reindex 42 [--type 2] [--force]
//! doppel remove 42 [--type 2]
//! ```

use std::path::{Path, PathBuf};

use anyhow::Context as _;
use clap::{Parser, Subcommand};
use doppel_core::{resource::ResourceType, service::DedupService};
use doppel_indexer::IndexerConfig;
use doppel_store_sqlite::{SqliteConnector, SqliteStore};
use tracing::{info, level_filters::LevelFilter};
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(author, version, about = "Doppel dedup index maintenance")]
struct Cli {
  /// Path to the TOML configuration file.
  #[arg(short, long, default_value = "doppel.toml")]
  config: PathBuf,

  #[command(subcommand)]
  command: Command,
}

#[derive(Subcommand)]
enum Command {
  /// Rebuild the index for one resource type, or for all of them.
  Update {
    /// Delete the existing records first.
    #[arg(short, long)]
    force:         bool,
    #[arg(short = 't', long = "type")]
    resource_type: Option<i32>,
  },
  /// Remove records of resources that no longer exist.
  Clean {
    /// Delete every record instead of sweeping.
    #[arg(short, long)]
    force:         bool,
    #[arg(short = 't', long = "type")]
    resource_type: Option<i32>,
  },
  /// Compact the index.
  Optimize,
  /// Reindex a single resource.
  Reindex {
    id:            i32,
    #[arg(short = 't', long = "type", default_value_t = ResourceType::ITEM.code())]
    resource_type: i32,
    /// Reindex even if the resource is unchanged.
    #[arg(short, long)]
    force:         bool,
  },
  /// Remove every record of a single resource.
  Remove {
    id:            i32,
    #[arg(short = 't', long = "type", default_value_t = ResourceType::ITEM.code())]
    resource_type: i32,
  },
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
  tracing_subscriber::fmt()
    .with_env_filter(
      EnvFilter::builder()
        .with_default_directive(LevelFilter::INFO.into())
        .from_env_lossy(),
    )
    .init();

  let cli = Cli::parse();

  let settings = config::Config::builder()
    .add_source(config::File::from(cli.config).required(false))
    .add_source(config::Environment::with_prefix("DOPPEL").separator("__"))
    .build()
    .context("failed to read config file")?;

  let indexer_cfg: IndexerConfig = settings
    .try_deserialize()
    .context("failed to deserialise IndexerConfig")?;

  let store_path = expand_tilde(&indexer_cfg.store_path);
  let store = SqliteStore::open(&store_path)
    .await
    .with_context(|| format!("failed to open store at {store_path:?}"))?;

  let connector = match &indexer_cfg.index_path {
    Some(path) => SqliteConnector::path(expand_tilde(path)),
    None => SqliteConnector::store(store.clone()),
  };
  let service = DedupService::new(
    connector,
    store.clone(),
    store,
    indexer_cfg.registry(),
    indexer_cfg.dedup.clone(),
  );

  match cli.command {
    Command::Update { force, resource_type: Some(code) } => {
      let report = service
        .update_index_type(force, ResourceType(code))
        .await
        .context("rebuild failed")?;
      info!(
        resources = report.seeded.total(),
        seeded = report.seeded.processed,
        matched = report.matched.processed,
        skipped = report.seeded.skipped,
        failed = report.seeded.failed + report.matched.failed,
        "rebuild finished"
      );
    }
    Command::Update { force, resource_type: None } => service.update_index(force).await,
    Command::Clean { force, resource_type } => {
      let removed = match resource_type {
        Some(code) => service.clean_index_type(force, ResourceType(code)).await,
        None => service.clean_index(force).await,
      };
      service.commit().await;
      info!(removed, "clean finished");
    }
    Command::Optimize => service.optimize().await,
    Command::Reindex { id, resource_type, force } => {
      let outcome = service
        .index_resource(id, ResourceType(resource_type), force)
        .await
        .with_context(|| format!("failed to reindex resource {id}"))?;
      service.commit().await;
      info!(id, ?outcome, "reindex finished");
    }
    Command::Remove { id, resource_type } => {
      let removed = service.un_index(id, ResourceType(resource_type)).await;
      service.commit().await;
      info!(id, removed, "remove finished");
    }
  }

  Ok(())
}

/// Resolve `~/...` store paths against `$HOME`. Other paths, and every path
/// when `$HOME` is unset, come back unchanged.
fn expand_tilde(path: &Path) -> PathBuf {
  match (path.strip_prefix("~"), std::env::var_os("HOME")) {
    (Ok(rest), Some(home)) => PathBuf::from(home).join(rest),
    _ => path.to_path_buf(),
  }
}

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn only_leading_tilde_is_expanded() {
    let Some(home) = std::env::var_os("HOME") else {
      return;
    };
    assert_eq!(
      expand_tilde(Path::new("~/doppel/index.db")),
      PathBuf::from(home).join("doppel/index.db")
    );
    assert_eq!(
      expand_tilde(Path::new("data/~/index.db")),
      PathBuf::from("data/~/index.db")
    );
    assert_eq!(expand_tilde(Path::new("~user/x")), PathBuf::from("~user/x"));
  }
}
