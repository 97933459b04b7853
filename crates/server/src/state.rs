use std::sync::Arc;

use loader_core::Config;
use loader_pipeline::Orchestrator;

use crate::live::SocketRegistry;

pub struct AppState {
    pub config: Config,
    pub orchestrator: Orchestrator,
    /// Open WebSocket connections, keyed by the session id they own.
    pub sockets: Arc<SocketRegistry>,
}
