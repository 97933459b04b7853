use loader_core::ProgressSnapshot;

/// Pushes session snapshots to whoever is watching.
///
/// Fire-and-forget: implementations must not block and must silently drop
/// snapshots for sessions without a registered channel.
pub trait ProgressReporter: Send + Sync {
    fn report(&self, snapshot: &ProgressSnapshot);

    /// Whether a client channel is registered for `session_id`. Sessions
    /// without one are removed as soon as they reach a terminal status.
    fn is_connected(&self, _session_id: &str) -> bool {
        false
    }
}

/// Reporter for headless runs (catalog preloads, tests).
#[derive(Debug, Default, Clone, Copy)]
pub struct NoopReporter;

impl ProgressReporter for NoopReporter {
    fn report(&self, _snapshot: &ProgressSnapshot) {}
}
