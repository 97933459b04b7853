//! Server startup: catalog, checkpoint store and session recovery.

use std::sync::Arc;

use anyhow::Context;
use tracing::info;

use loader_core::{Catalog, Config};
use loader_pipeline::{FileCheckpointStore, Orchestrator, OrchestratorSettings};
use loader_store::RedisConnector;

use crate::live::SocketRegistry;
use crate::state::AppState;

/// Build `AppState`, restoring any sessions checkpointed by a previous run.
pub async fn build_app_state(config: Config) -> anyhow::Result<Arc<AppState>> {
    let catalog = Catalog::load(&config.storage.catalog_path)
        .with_context(|| format!("loading catalog {}", config.storage.catalog_path.display()))?;

    let checkpoint_dir = config.storage.checkpoint_dir();
    let checkpoints = FileCheckpointStore::open(&checkpoint_dir)
        .await
        .with_context(|| format!("opening checkpoint dir {}", checkpoint_dir.display()))?;
    info!("Checkpoint store ready (dir: {})", checkpoint_dir.display());

    let settings = OrchestratorSettings::from_config(&config).context("invalid encryption key")?;
    let sockets = Arc::new(SocketRegistry::new());
    let orchestrator = Orchestrator::new(settings, Arc::new(RedisConnector::new()), Arc::new(checkpoints))
        .with_reporter(sockets.clone())
        .with_catalog(Arc::new(catalog));

    let restored = orchestrator.recover().await.context("recovering import sessions")?;
    if restored > 0 {
        info!("Restored {} import session(s) from checkpoints", restored);
    }

    Ok(Arc::new(AppState {
        config,
        orchestrator,
        sockets,
    }))
}
