//! Import sessions and the batch loop that drives them.
//!
//! An [`Orchestrator`] owns the session registry and wires the stages
//! together: credentials, record source, transform sandbox and key-value
//! store. Every committed batch is checkpointed so a session can be paused,
//! resumed or recovered after a restart from its cursor.

pub mod checkpoint;
pub mod error;
pub mod orchestrator;
pub mod progress;
pub mod registry;
pub mod session;
pub mod writer;

pub use checkpoint::{Checkpoint, CheckpointError, CheckpointStore, FileCheckpointStore, MemoryCheckpointStore};
pub use error::{ImportError, SessionError};
pub use orchestrator::{ImportOutcome, Orchestrator, OrchestratorSettings, PreloadOutcome};
pub use progress::{NoopReporter, ProgressReporter};
pub use registry::SessionRegistry;
pub use session::{ImportSession, LoopGuard, SessionConfig, Signal, StoredCredential};
pub use writer::{BatchResult, BatchWriter, PendingWrite, WriteFailure};
